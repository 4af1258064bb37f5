//! Banc d'essai des origines de graines : pour des tirages d'origine échantillonnés,
//! attente (en tirages) avant la première sortie de chaque cible.

use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

use crate::clusters::detect_seed_origins;
use crate::grid::GridTopology;

pub const HIT_WINDOWS: [usize; 4] = [5, 10, 15, 20];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Horizon de recherche après le tirage d'origine.
    pub window: usize,
    pub step: usize,
    pub skip: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self { window: 20, step: 5, skip: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetBenchmark {
    pub label: String,
    pub origins: usize,
    /// Nombre d'origines touchées en ≤ 5, 10, 15, 20 tirages.
    pub hits_within: [usize; 4],
    pub hit_rates: [f64; 4],
    pub avg_wait: Option<f64>,
    pub median_wait: Option<f64>,
}

impl TargetBenchmark {
    fn from_waits(label: &str, waits: &[Option<usize>]) -> Self {
        let origins = waits.len();
        let mut found: Vec<usize> = waits.iter().flatten().copied().collect();
        found.sort_unstable();
        let hits_within = HIT_WINDOWS.map(|w| found.iter().filter(|&&x| x <= w).count());
        let hit_rates = hits_within.map(|h| if origins > 0 { h as f64 / origins as f64 * 100.0 } else { 0.0 });
        let avg_wait = (!found.is_empty()).then(|| found.iter().sum::<usize>() as f64 / found.len() as f64);
        let median_wait = match found.len() {
            0 => None,
            n if n % 2 == 1 => Some(found[n / 2] as f64),
            n => Some((found[n / 2 - 1] + found[n / 2]) as f64 / 2.0),
        };
        Self {
            label: label.to_string(),
            origins,
            hits_within,
            hit_rates,
            avg_wait,
            median_wait,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub sampled_draws: usize,
    pub pair_both: TargetBenchmark,
    pub seed_two: TargetBenchmark,
    pub seed_three: TargetBenchmark,
}

/// Attente jusqu'au premier tirage où `needed` numéros de `target` sortent ensemble.
fn first_wait(chrono: &[&Draw], origin: usize, window: usize, target: &[u8], needed: usize) -> Option<usize> {
    (1..=window)
        .take_while(|k| origin + k < chrono.len())
        .find(|&k| target.iter().filter(|&&n| chrono[origin + k].contains(n)).count() >= needed)
}

/// `draws` du plus récent au plus ancien.
pub fn run_benchmark(draws: &[Draw], config: &BenchmarkConfig, grid: &GridTopology) -> BenchmarkReport {
    let chrono: Vec<&Draw> = draws.iter().rev().collect();
    let mut pair_waits = Vec::new();
    let mut two_waits = Vec::new();
    let mut three_waits = Vec::new();
    let mut sampled = 0;

    for i in (config.skip..chrono.len()).step_by(config.step.max(1)) {
        sampled += 1;
        for origin in detect_seed_origins(&chrono[i].numbers, grid) {
            pair_waits.push(first_wait(&chrono, i, config.window, &origin.pair, 2));
            two_waits.push(first_wait(&chrono, i, config.window, &origin.seed, 2));
            three_waits.push(first_wait(&chrono, i, config.window, &origin.seed, 3));
        }
    }

    BenchmarkReport {
        sampled_draws: sampled,
        pair_both: TargetBenchmark::from_waits("paire (A+B)", &pair_waits),
        seed_two: TargetBenchmark::from_waits("graine 2/3", &two_waits),
        seed_three: TargetBenchmark::from_waits("graine 3/3", &three_waits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;

    #[test]
    fn test_from_waits() {
        let b = TargetBenchmark::from_waits("x", &[Some(3), Some(12), None, Some(7)]);
        assert_eq!(b.origins, 4);
        assert_eq!(b.hits_within, [1, 2, 3, 3]);
        assert!((b.hit_rates[0] - 25.0).abs() < 1e-9);
        assert!((b.avg_wait.unwrap() - 22.0 / 3.0).abs() < 1e-9);
        assert_eq!(b.median_wait, Some(7.0));

        let empty = TargetBenchmark::from_waits("y", &[None]);
        assert_eq!(empty.avg_wait, None);
        assert_eq!(empty.median_wait, None);
        assert_eq!(empty.hit_rates, [0.0; 4]);
    }

    #[test]
    fn test_first_wait_records_first_hit() {
        let draws = [Draw::new(1, vec![1]), Draw::new(2, vec![9]), Draw::new(3, vec![1, 2]), Draw::new(4, vec![1, 2])];
        let chrono: Vec<&Draw> = draws.iter().collect();
        assert_eq!(first_wait(&chrono, 0, 20, &[1, 2], 2), Some(2));
        assert_eq!(first_wait(&chrono, 0, 1, &[1, 2], 2), None);
        assert_eq!(first_wait(&chrono, 3, 20, &[1, 2], 2), None, "pas de tirage après l'origine");
    }

    #[test]
    fn test_benchmark_sampling() {
        let draws = make_test_draws(130);
        let report = run_benchmark(&draws, &BenchmarkConfig::default(), &GridTopology::default());
        // index 100, 105, …, 125
        assert_eq!(report.sampled_draws, 6);
        assert_eq!(report.pair_both.origins, report.seed_two.origins);
        assert_eq!(report.seed_two.origins, report.seed_three.origins);
        // 3/3 est plus strict que 2/3
        for k in 0..4 {
            assert!(report.seed_three.hits_within[k] <= report.seed_two.hits_within[k]);
        }
    }
}
