//! Analyseurs additionnels branchés sur `analyze_lottery_data`. Un analyseur qui
//! échoue produit une entrée d'erreur sans interrompre l'analyse.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use gridlot_db::models::Draw;

use crate::bonds::{detect_algebraic_bonds, echo_stats, partial_bond_resolution, strongest_missing_results};
use crate::grid::GridTopology;

pub trait DrawAnalyzer: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// draws[0] = tirage le plus récent.
    fn run(&self, draws: &[Draw]) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginOutcome {
    pub id: String,
    pub name: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

pub fn run_analyzers(analyzers: &[Box<dyn DrawAnalyzer>], draws: &[Draw]) -> Vec<PluginOutcome> {
    analyzers
        .iter()
        .map(|a| {
            let (result, error) = match a.run(draws) {
                Ok(v) => (Some(v), None),
                Err(e) => {
                    log::warn!("Analyseur {} en échec : {:#}", a.id(), e);
                    (None, Some(format!("{e:#}")))
                }
            };
            PluginOutcome {
                id: a.id().to_string(),
                name: a.name().to_string(),
                result,
                error,
            }
        })
        .collect()
}

pub fn builtin_analyzers(grid: GridTopology) -> Vec<Box<dyn DrawAnalyzer>> {
    vec![
        Box::new(SpatialPatternsAnalyzer { grid }),
        Box::new(GridHeatmapAnalyzer { grid }),
        Box::new(BondCensusAnalyzer { max: grid.max(), recent: 10 }),
        Box::new(EchoCensusAnalyzer),
    ]
}

/// Forme et motifs spatiaux du dernier tirage, fréquence des motifs sur l'historique.
pub struct SpatialPatternsAnalyzer {
    pub grid: GridTopology,
}

impl DrawAnalyzer for SpatialPatternsAnalyzer {
    fn id(&self) -> &str {
        "spatial-patterns"
    }

    fn name(&self) -> &str {
        "Motifs spatiaux"
    }

    fn run(&self, draws: &[Draw]) -> Result<serde_json::Value> {
        let latest = draws.first().context("Historique vide")?;
        let patterns: Vec<_> = draws.iter().map(|d| self.grid.spatial_patterns(&d.numbers)).collect();
        let total = patterns.len() as f64;
        let share = |count: usize| count as f64 / total;
        Ok(json!({
            "latest": {
                "signature": self.grid.shape_signature(&latest.numbers),
                "patterns": self.grid.spatial_patterns(&latest.numbers),
            },
            "history": {
                "horizontal": share(patterns.iter().filter(|p| p.horizontal_streaks > 0).count()),
                "vertical": share(patterns.iter().filter(|p| p.vertical_streaks > 0).count()),
                "diagonal": share(patterns.iter().filter(|p| p.diagonal_streaks > 0).count()),
                "symmetric_lr": share(patterns.iter().filter(|p| p.symmetry_lr).count()),
                "symmetric_tb": share(patterns.iter().filter(|p| p.symmetry_tb).count()),
            },
        }))
    }
}

pub struct GridHeatmapAnalyzer {
    pub grid: GridTopology,
}

impl DrawAnalyzer for GridHeatmapAnalyzer {
    fn id(&self) -> &str {
        "grid-heatmap"
    }

    fn name(&self) -> &str {
        "Carte de chaleur"
    }

    fn run(&self, draws: &[Draw]) -> Result<serde_json::Value> {
        let mut frequency = vec![0u32; self.grid.max() as usize + 1];
        for &n in draws.iter().flat_map(|d| d.numbers.iter()) {
            if let Some(f) = frequency.get_mut(n as usize) {
                *f += 1;
            }
        }
        Ok(json!({ "rows": self.grid.heatmap(&frequency) }))
    }
}

/// Liaisons complètes du dernier tirage, résultats manquants récents et taux de résolution.
pub struct BondCensusAnalyzer {
    pub max: u8,
    pub recent: usize,
}

impl DrawAnalyzer for BondCensusAnalyzer {
    fn id(&self) -> &str {
        "bond-census"
    }

    fn name(&self) -> &str {
        "Recensement des liaisons"
    }

    fn run(&self, draws: &[Draw]) -> Result<serde_json::Value> {
        let latest = draws.first().context("Historique vide")?;
        let missing: Vec<_> = strongest_missing_results(draws, self.recent, self.max)
            .into_iter()
            .take(10)
            .map(|(number, weight)| json!({ "number": number, "weight": weight }))
            .collect();
        let resolution = partial_bond_resolution(draws, self.max);
        Ok(json!({
            "latest_bonds": detect_algebraic_bonds(&latest.numbers, self.max),
            "strongest_missing": missing,
            "resolution": {
                "partial_bonds": resolution.partial_bonds,
                "rate_3": resolution.rate_3(),
                "rate_5": resolution.rate_5(),
            },
        }))
    }
}

pub struct EchoCensusAnalyzer;

impl DrawAnalyzer for EchoCensusAnalyzer {
    fn id(&self) -> &str {
        "echo-census"
    }

    fn name(&self) -> &str {
        "Échos"
    }

    fn run(&self, draws: &[Draw]) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(echo_stats(draws))?)
    }
}
