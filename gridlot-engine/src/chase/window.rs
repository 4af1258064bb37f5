//! Chasses à fenêtre fixe : chaque origine de graine est chassée indépendamment
//! pendant L tirages avec une progression de Fibonacci classique.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

use super::StakeProgression;
use crate::clusters::detect_seed_origins;
use crate::grid::GridTopology;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowResult {
    pub length: usize,
    pub chases: usize,
    pub wins: usize,
    pub success_rate: f64,
    pub investment: f64,
    pub revenue: f64,
    pub net_profit: f64,
    pub roi: f64,
}

/// `draws` du plus récent au plus ancien. Une chasse gagne dès `required_hits`
/// numéros de la graine dans un même tirage. Les chasses qui dépasseraient la fin
/// de l'historique sont ignorées.
pub fn run_fixed_windows(
    draws: &[Draw],
    lengths: &[usize],
    odds: f64,
    required_hits: usize,
    grid: &GridTopology,
) -> Result<Vec<WindowResult>> {
    if let Some(&zero) = lengths.iter().find(|&&l| l == 0) {
        bail!("Longueur de fenêtre invalide : {zero} (doit être > 0)");
    }
    if required_hits == 0 || required_hits > 3 {
        bail!("required_hits ({required_hits}) hors de [1, 3] pour une graine");
    }
    if odds.is_nan() || odds <= 0.0 {
        bail!("Cote invalide : {odds} (doit être > 0)");
    }

    let chrono: Vec<&Draw> = draws.iter().rev().collect();
    let total = chrono.len();
    let origins: Vec<_> = chrono.iter().map(|d| detect_seed_origins(&d.numbers, grid)).collect();

    let results: Vec<WindowResult> = lengths
        .iter()
        .map(|&length| {
            let stakes = StakeProgression::ClassicFibonacci.sequence(length);
            let mut r = WindowResult {
                length,
                chases: 0,
                wins: 0,
                success_rate: 0.0,
                investment: 0.0,
                revenue: 0.0,
                net_profit: 0.0,
                roi: 0.0,
            };
            for (i, found) in origins.iter().enumerate() {
                if i + length >= total {
                    break;
                }
                for origin in found {
                    r.chases += 1;
                    for (k, &stake) in stakes.iter().enumerate() {
                        let draw = chrono[i + 1 + k];
                        r.investment += stake as f64;
                        let hits = origin.seed.iter().filter(|&&n| draw.contains(n)).count();
                        if hits >= required_hits {
                            r.wins += 1;
                            r.revenue += stake as f64 * odds;
                            break;
                        }
                    }
                }
            }
            r.net_profit = r.revenue - r.investment;
            r.success_rate = if r.chases > 0 { r.wins as f64 / r.chases as f64 * 100.0 } else { 0.0 };
            r.roi = if r.investment > 0.0 { r.net_profit / r.investment * 100.0 } else { 0.0 };
            r
        })
        .collect();
    Ok(results)
}
