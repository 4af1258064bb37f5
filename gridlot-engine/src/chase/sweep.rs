use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

use crate::grid::GridTopology;

use super::{ChaseConfig, ChaseSimulator, ChaseSummary, ResetRule, StakeProgression, TargetSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    pub label: String,
    pub config: ChaseConfig,
    pub summary: ChaseSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResults {
    pub results: Vec<SweepEntry>,
    pub best_config: ChaseConfig,
}

/// Produit cartésien progression × règle de remise à zéro × cote × source.
/// 5 * 5 * 3 * 3 = 225 configurations.
pub fn generate_grid() -> Vec<ChaseConfig> {
    let progressions = [
        StakeProgression::Fibonacci,
        StakeProgression::ClassicFibonacci,
        StakeProgression::Repeated,
        StakeProgression::Doubled,
        StakeProgression::Staggered,
    ];
    let resets = [
        ResetRule::None,
        ResetRule::BreakevenPlus { margin: 0.43 },
        ResetRule::BreakevenPlus { margin: 0.5 },
        ResetRule::SessionProfit { threshold: 100.0 },
        ResetRule::Yield { fraction: 0.5 },
    ];
    let odds = [4.3, 5.7, 11.5];
    let sources = [TargetSource::IsolatedClusters, TargetSource::SeedOrigins, TargetSource::SeedPairs];

    let mut configs = Vec::with_capacity(225);
    for stakes in &progressions {
        for &reset in &resets {
            for &o in &odds {
                for &source in &sources {
                    configs.push(ChaseConfig {
                        stakes: stakes.clone(),
                        odds: o,
                        required_hits: 2,
                        max_steps: 27,
                        reset,
                        source,
                        top_n: None,
                    });
                }
            }
        }
    }
    configs
}

fn roi(entry: &SweepEntry) -> f64 {
    entry.summary.roi
}

/// Évalue toutes les configurations en parallèle et classe par ROI.
/// Le fichier existant n'est remplacé que si le nouveau meilleur ROI est au moins aussi bon.
pub fn run_sweep(
    draws: &[Draw],
    configs: &[ChaseConfig],
    grid: &GridTopology,
    output_path: &str,
) -> Result<SweepResults> {
    let pb = ProgressBar::new(configs.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("template de progression valide")
            .progress_chars("=> "),
    );

    let start = std::time::Instant::now();

    let results: Vec<SweepEntry> = configs
        .par_iter()
        .filter_map(|config| {
            let sim = ChaseSimulator::new(config.clone());
            pb.inc(1);
            match sim {
                Ok(sim) => {
                    let report = sim.with_grid(*grid).run(draws);
                    Some(SweepEntry {
                        label: config.label(),
                        config: report.config,
                        summary: report.summary,
                    })
                }
                Err(e) => {
                    log::warn!("Configuration rejetée : {}: {}", config.label(), e);
                    None
                }
            }
        })
        .collect();

    let elapsed = start.elapsed();
    pb.finish_and_clear();

    let total_secs = elapsed.as_secs();
    let ok = results.len();
    let failed = configs.len() - ok;
    println!(
        "Balayage terminé : {ok}/{} configs en {}m{:02}s ({failed} échecs)",
        configs.len(),
        total_secs / 60,
        total_secs % 60,
    );

    if results.is_empty() {
        anyhow::bail!("Toutes les configurations ont échoué");
    }

    let mut sorted = results;
    sorted.sort_by(|a, b| roi(b).partial_cmp(&roi(a)).unwrap_or(std::cmp::Ordering::Equal));
    let best_config = sorted[0].config.clone();
    let sweep = SweepResults { results: sorted, best_config };

    let new_roi = roi(&sweep.results[0]);
    let should_save = match std::fs::read_to_string(output_path) {
        Ok(existing) => match serde_json::from_str::<SweepResults>(&existing) {
            Ok(old) if !old.results.is_empty() => {
                let old_roi = roi(&old.results[0]);
                if new_roi >= old_roi {
                    println!("Résultats sauvegardés (ROI : {new_roi:.2}%, ancien : {old_roi:.2}%)");
                    true
                } else {
                    println!("Résultats non sauvegardés : ROI {new_roi:.2}% < ancien {old_roi:.2}%");
                    false
                }
            }
            _ => true,
        },
        Err(_) => true,
    };

    if should_save {
        let json = serde_json::to_string_pretty(&sweep)?;
        std::fs::write(output_path, json)?;
        log::info!("Balayage sauvegardé dans {output_path}");
    }

    Ok(sweep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;

    #[test]
    fn test_grid_size() {
        let grid = generate_grid();
        assert_eq!(grid.len(), 225, "taille de grille attendue 225, obtenu {}", grid.len());
        assert!(grid.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn test_mini_sweep() {
        let draws = make_test_draws(80);
        let mut configs: Vec<ChaseConfig> = generate_grid().into_iter().take(3).collect();
        configs.push(ChaseConfig { odds: -1.0, ..Default::default() });

        let tmp = std::env::temp_dir().join("gridlot_test_sweep.json");
        let _ = std::fs::remove_file(&tmp);
        let results = run_sweep(&draws, &configs, &GridTopology::default(), tmp.to_str().unwrap()).unwrap();
        assert_eq!(results.results.len(), 3, "la configuration invalide est écartée");
        assert!(results.results.windows(2).all(|w| w[0].summary.roi >= w[1].summary.roi));
        assert!(tmp.exists());
        let _ = std::fs::remove_file(&tmp);
    }

    #[test]
    fn test_sweep_uses_given_grid() {
        let draws: Vec<Draw> = make_test_draws(80)
            .into_iter()
            .map(|mut d| {
                d.numbers.retain(|&n| n <= 25);
                d
            })
            .collect();
        let grid = GridTopology::new(5, 25);
        let configs: Vec<ChaseConfig> = generate_grid().into_iter().take(6).collect();

        let tmp = std::env::temp_dir().join("gridlot_test_sweep_grid.json");
        let _ = std::fs::remove_file(&tmp);
        let results = run_sweep(&draws, &configs, &grid, tmp.to_str().unwrap()).unwrap();
        for entry in &results.results {
            let replay = ChaseSimulator::new(entry.config.clone()).unwrap().with_grid(grid).run(&draws);
            assert_eq!(replay.summary.total_investment, entry.summary.total_investment, "{}", entry.label);
            assert_eq!(replay.summary.wins, entry.summary.wins, "{}", entry.label);
            assert_eq!(replay.summary.resets, entry.summary.resets, "{}", entry.label);
        }
        let _ = std::fs::remove_file(&tmp);
    }
}
