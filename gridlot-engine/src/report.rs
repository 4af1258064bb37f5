//! Rapport d'analyse sauvegardé en JSON, et bilan d'un rapport précédent
//! face aux tirages sortis depuis.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

use crate::analysis::LotteryAnalysis;
use crate::analysis::pairs::Confidence;
use crate::backtest::StrategyResult;
use crate::hmm::HmmSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedNumber {
    pub number: u8,
    pub score: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPair {
    pub pair: (u8, u8),
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub total_draws: usize,
    /// Identifiant du dernier tirage analysé.
    pub latest_draw_id: u32,
    pub top_numbers: Vec<RankedNumber>,
    pub top_pairs: Vec<RankedPair>,
    pub chase_pairs: Vec<RankedPair>,
    pub chase_singles: Vec<u8>,
    pub signal_numbers: Vec<RankedNumber>,
    pub hmm: HmmSummary,
    pub strategies: Vec<StrategyResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportReview {
    pub new_draws: usize,
    /// Numéros du top sortis depuis le rapport.
    pub number_hits: Vec<u8>,
    /// Paires du top sorties ensemble depuis le rapport.
    pub pair_hits: Vec<(u8, u8)>,
}

impl AnalysisReport {
    pub fn from_analysis(analysis: &LotteryAnalysis, latest: &Draw, top: usize) -> Self {
        let signal_numbers = analysis
            .signals
            .as_ref()
            .map(|s| {
                s.singles
                    .iter()
                    .take(top)
                    .map(|x| RankedNumber {
                        number: x.number,
                        score: x.strength,
                        confidence: Confidence::from_thresholds(x.strength, 0.6, 0.4),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_draws: analysis.total_draws,
            latest_draw_id: latest.draw_id,
            top_numbers: analysis
                .ensemble
                .iter()
                .take(top)
                .map(|e| RankedNumber { number: e.number, score: e.score, confidence: e.confidence })
                .collect(),
            top_pairs: analysis
                .pair_predictions
                .iter()
                .take(top)
                .map(|p| RankedPair { pair: p.pair, score: p.score })
                .collect(),
            chase_pairs: analysis
                .chase_pairs
                .iter()
                .take(top)
                .map(|p| RankedPair { pair: p.pair, score: p.readiness })
                .collect(),
            chase_singles: analysis.chase_singles.iter().map(|s| s.number).collect(),
            signal_numbers,
            hmm: analysis.hmm.clone(),
            strategies: analysis.backtest.as_ref().map(|b| b.strategies.clone()).unwrap_or_default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        log::info!("Rapport sauvegardé dans {}", path.display());
        Ok(())
    }

    /// `Ok(None)` si aucun rapport n'existe encore à cet emplacement.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            println!("Aucun rapport précédent dans {}", path.display());
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let report = serde_json::from_str(&json)
            .with_context(|| format!("Rapport invalide dans {}", path.display()))?;
        Ok(Some(report))
    }

    /// Confronte le rapport aux tirages postérieurs (`draws[0]` = plus récent).
    pub fn review(&self, draws: &[Draw]) -> ReportReview {
        let newer: Vec<&Draw> = draws.iter().filter(|d| d.draw_id > self.latest_draw_id).collect();
        let number_hits = self
            .top_numbers
            .iter()
            .map(|r| r.number)
            .filter(|&n| newer.iter().any(|d| d.contains(n)))
            .collect();
        let pair_hits = self
            .top_pairs
            .iter()
            .chain(&self.chase_pairs)
            .map(|r| r.pair)
            .filter(|&(a, b)| newer.iter().any(|d| d.contains(a) && d.contains(b)))
            .fold(Vec::new(), |mut acc, p| {
                if !acc.contains(&p) {
                    acc.push(p);
                }
                acc
            });
        ReportReview { new_draws: newer.len(), number_hits, pair_hits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisSettings, analyze_lottery_data};
    use crate::make_test_draws;

    fn sample_report() -> AnalysisReport {
        let draws = make_test_draws(30);
        let analysis = analyze_lottery_data(&draws, &AnalysisSettings::default(), &[]).unwrap();
        AnalysisReport::from_analysis(&analysis, &draws[0], 5)
    }

    #[test]
    fn test_from_analysis() {
        let report = sample_report();
        assert_eq!(report.total_draws, 30);
        assert_eq!(report.latest_draw_id, 30);
        assert_eq!(report.top_numbers.len(), 5);
        assert!(report.signal_numbers.is_empty(), "30 tirages : pas de capteurs");
        assert!(report.strategies.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let report = sample_report();
        let path = std::env::temp_dir().join("gridlot_test_report.json");
        report.save(&path).unwrap();
        let restored = AnalysisReport::load(&path).unwrap().expect("rapport présent");
        assert_eq!(restored.latest_draw_id, report.latest_draw_id);
        assert_eq!(restored.top_numbers.len(), report.top_numbers.len());
        assert_eq!(restored.top_numbers[0].number, report.top_numbers[0].number);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_report() {
        let path = std::env::temp_dir().join("gridlot_absent_report.json");
        let _ = std::fs::remove_file(&path);
        assert!(AnalysisReport::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_review_counts_only_newer_draws() {
        let mut report = sample_report();
        report.latest_draw_id = 10;
        report.top_numbers = vec![
            RankedNumber { number: 3, score: 0.5, confidence: Confidence::High },
            RankedNumber { number: 44, score: 0.4, confidence: Confidence::High },
        ];
        report.top_pairs = vec![RankedPair { pair: (3, 7), score: 1.0 }];
        report.chase_pairs = vec![RankedPair { pair: (3, 7), score: 1.0 }, RankedPair { pair: (1, 2), score: 1.0 }];

        let draws = vec![
            Draw::new(12, vec![3, 7, 20]),
            Draw::new(11, vec![5, 6, 8]),
            Draw::new(10, vec![44, 1, 2]),
        ];
        let review = report.review(&draws);
        assert_eq!(review.new_draws, 2);
        assert_eq!(review.number_hits, vec![3]);
        assert_eq!(review.pair_hits, vec![(3, 7)], "paire dédoublonnée, tirage 10 exclu");
    }
}
