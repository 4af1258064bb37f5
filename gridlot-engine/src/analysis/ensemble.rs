use serde::{Deserialize, Serialize};

use super::gaps::GapStats;
use super::pairs::Confidence;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaseSingle {
    pub number: u8,
    pub weeks_since_last: usize,
    pub avg_gap: f64,
    pub due_score: f64,
    pub expected_in: usize,
    /// 1.5 si l'absence est à moins de 3 tirages de l'écart moyen.
    pub multiplier: f64,
}

/// Numéros dont l'absence est dans [0.6, 3] × leur écart moyen. Triés par score de retard.
pub fn chase_singles(gaps: &[GapStats]) -> Vec<ChaseSingle> {
    let mut singles: Vec<ChaseSingle> = gaps
        .iter()
        .filter_map(|g| {
            let avg = g.avg_gap?;
            let wsl = g.weeks_since_last?;
            let w = wsl as f64;
            if w < avg * 0.6 || w > avg * 3.0 {
                return None;
            }
            Some(ChaseSingle {
                number: g.number,
                weeks_since_last: wsl,
                avg_gap: avg,
                due_score: w / avg,
                expected_in: (avg - w).round().max(1.0) as usize,
                multiplier: if (avg - w).abs() < 3.0 { 1.5 } else { 1.0 },
            })
        })
        .collect();
    singles.sort_by(|a, b| b.due_score.partial_cmp(&a.due_score).unwrap_or(std::cmp::Ordering::Equal));
    singles
}

/// Entrées d'un numéro pour le mélange linéaire.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChannelInputs {
    pub binary: f64,
    pub bayesian: f64,
    pub root: f64,
    pub pattern: f64,
    pub momentum: f64,
    pub urgency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleScore {
    pub number: u8,
    pub score: f64,
    pub confidence: Confidence,
    pub chase_bonus: f64,
    pub inputs: ChannelInputs,
}

pub fn chase_bonus(single: Option<&ChaseSingle>) -> f64 {
    match single {
        Some(s) => 0.2 + (s.due_score * s.multiplier).min(3.0) * 0.05,
        None => 0.0,
    }
}

pub fn ensemble_score(number: u8, inputs: ChannelInputs, single: Option<&ChaseSingle>) -> EnsembleScore {
    let bonus = chase_bonus(single);
    let norm_urgency = (inputs.urgency / 2.0).min(1.0);
    let raw = inputs.binary * 0.30
        + inputs.bayesian * 0.20
        + inputs.root * 0.10
        + inputs.pattern * 0.10
        + inputs.momentum.max(0.0) * 0.10
        + norm_urgency * 0.20
        + bonus;
    let score = raw.min(0.99);
    EnsembleScore {
        number,
        score,
        confidence: Confidence::from_thresholds(score, 0.3, 0.15),
        chase_bonus: bonus,
        inputs,
    }
}
