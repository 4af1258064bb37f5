use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisSettings;
use crate::chase::ChaseConfig;
use crate::chase::benchmark::BenchmarkConfig;

pub const DEFAULT_CONFIG_PATH: &str = "data/gridlot.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis: AnalysisSettings,
    pub chase: ChaseConfig,
    pub benchmark: BenchmarkConfig,
}

impl EngineConfig {
    /// Fichier absent : configuration par défaut et simple avertissement.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            println!("Configuration {} introuvable, valeurs par défaut utilisées", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .with_context(|| format!("JSON invalide dans {}", path.display()))?;
        config.validate()?;
        log::info!("Configuration chargée depuis {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if a.range.min == 0 || a.range.min > a.range.max {
            bail!("Plage de numéros invalide ({}-{})", a.range.min, a.range.max);
        }
        if a.grid_width == 0 {
            bail!("Largeur de grille nulle");
        }
        if a.pattern_size == 0 {
            bail!("Taille de motif nulle");
        }
        if a.hot_threshold < a.cold_threshold {
            bail!(
                "Seuil chaud ({}) inférieur au seuil froid ({})",
                a.hot_threshold,
                a.cold_threshold
            );
        }
        if a.neural.hidden == 0 || a.neural.lookahead == 0 {
            bail!("Réseau : couche cachée et horizon doivent être non nuls");
        }
        if a.backtest.max_steps == 0 {
            bail!("Backtest : max_steps doit être non nul");
        }
        if let Some(cap) = a.backtest.stakes.capacity() {
            if cap == 0 {
                bail!("Backtest : progression de mises vide");
            }
            if a.backtest.max_steps > cap {
                bail!(
                    "Backtest : max_steps ({}) dépasse la longueur de la progression ({cap})",
                    a.backtest.max_steps
                );
            }
        }
        if self.benchmark.step == 0 {
            bail!("Benchmark : le pas doit être non nul");
        }
        self.chase.validate().context("Configuration de chasse invalide")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chase::{ResetRule, StakeProgression};

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.seed, 42);
        assert_eq!(config.chase.max_steps, 27);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = std::env::temp_dir().join("gridlot_absent_config.json");
        let _ = std::fs::remove_file(&path);
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.benchmark.window, 20);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let path = std::env::temp_dir().join("gridlot_partial_config.json");
        std::fs::write(&path, r#"{ "chase": { "odds": 5.7, "stakes": "fibonacci" }, "analysis": { "seed": 7 } }"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert!((config.chase.odds - 5.7).abs() < 1e-12);
        assert_eq!(config.chase.stakes, StakeProgression::Fibonacci);
        assert_eq!(config.chase.required_hits, 2, "champ absent => défaut");
        assert_eq!(config.analysis.seed, 7);
        assert_eq!(config.analysis.hmm.iterations, 20);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join("gridlot_roundtrip_config.json");
        let mut config = EngineConfig::default();
        config.chase.reset = ResetRule::Yield { fraction: 0.25 };
        config.analysis.neural.epochs = 3;
        config.save(&path).unwrap();
        let restored = EngineConfig::load(&path).unwrap();
        assert_eq!(restored.chase.reset, ResetRule::Yield { fraction: 0.25 });
        assert_eq!(restored.analysis.neural.epochs, 3);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let path = std::env::temp_dir().join("gridlot_invalid_config.json");
        std::fs::write(&path, r#"{ "chase": { "odds": 0.0 } }"#).unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("chasse"), "message : {err:#}");
        let _ = std::fs::remove_file(&path);

        let mut config = EngineConfig::default();
        config.benchmark.step = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.analysis.backtest.stakes = StakeProgression::Custom(vec![]);
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("vide"), "message : {err:#}");

        let mut config = EngineConfig::default();
        config.analysis.backtest.stakes = StakeProgression::Custom(vec![1, 2]);
        config.analysis.backtest.max_steps = 5;
        assert!(config.validate().is_err(), "progression plus courte que max_steps");
        config.analysis.backtest.max_steps = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let path = std::env::temp_dir().join("gridlot_malformed_config.json");
        std::fs::write(&path, "{ pas du json").unwrap();
        assert!(EngineConfig::load(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
