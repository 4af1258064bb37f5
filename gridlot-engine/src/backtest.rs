//! Backtest historique : pour chacune des dernières semaines, meilleure paire et
//! meilleur numéro calculés avec le seul passé, puis trois stratégies de mise
//! rejouées sur les mêmes semaines.

use serde::{Deserialize, Serialize};

use crate::analysis::gaps::{GapStats, gaps_from_appearances, mean_and_std};
use crate::analysis::history::History;
use crate::analysis::pairs::PairHistory;
use crate::chase::StakeProgression;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Nombre maximal de semaines rejouées.
    pub weeks: usize,
    /// Tirages réservés au démarrage, jamais rejoués.
    pub warmup: usize,
    pub banker_odds: f64,
    pub pair_odds: f64,
    pub single_odds: f64,
    pub max_steps: usize,
    pub banker_min_readiness: f64,
    pub stakes: StakeProgression,
    pub single_lookback: usize,
    /// Une paire candidate doit être sortie strictement plus de fois que ce seuil.
    pub min_pair_appearances: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            weeks: 100,
            warmup: 20,
            banker_odds: 2.0,
            pair_odds: 11.5,
            single_odds: 5.0,
            max_steps: 10,
            banker_min_readiness: 1.0,
            stakes: StakeProgression::Fibonacci,
            single_lookback: 100,
            min_pair_appearances: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    pub name: String,
    pub bets: usize,
    pub wins: usize,
    pub investment: f64,
    pub revenue: f64,
    pub net_profit: f64,
    pub roi: f64,
    pub success_rate: f64,
}

impl StrategyResult {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bets: 0,
            wins: 0,
            investment: 0.0,
            revenue: 0.0,
            net_profit: 0.0,
            roi: 0.0,
            success_rate: 0.0,
        }
    }

    fn finish(mut self) -> Self {
        self.net_profit = self.revenue - self.investment;
        self.roi = if self.investment > 0.0 { self.net_profit / self.investment * 100.0 } else { 0.0 };
        self.success_rate = if self.bets > 0 { self.wins as f64 / self.bets as f64 * 100.0 } else { 0.0 };
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekLog {
    /// Index chronologique du tirage rejoué.
    pub index: usize,
    pub best_pair: Option<(u8, u8)>,
    pub pair_readiness: f64,
    pub best_single: Option<u8>,
    pub single_readiness: f64,
    pub ensemble_hit: bool,
    pub banker_hit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub weeks: usize,
    pub ensemble_predictions: usize,
    pub ensemble_hits: usize,
    pub ensemble_hit_rate: f64,
    pub banker_predictions: usize,
    pub banker_hits: usize,
    pub banker_hit_rate: f64,
    pub strategies: Vec<StrategyResult>,
    pub log: Vec<WeekLog>,
}

/// Paire la plus en retard au tirage `t`, d'après ses apparitions antérieures.
fn best_pair_at(pairs: &PairHistory, t: usize, min_appearances: usize) -> Option<((u8, u8), f64)> {
    let mut best: Option<((u8, u8), f64)> = None;
    for (&pair, apps) in pairs {
        if apps.len() <= min_appearances {
            continue;
        }
        // index 1-based : les apparitions antérieures au tirage t sont ≤ t
        let before: Vec<usize> = apps.iter().copied().take_while(|&a| a <= t).collect();
        if before.len() < 2 {
            continue;
        }
        let (avg, _) = mean_and_std(&gaps_from_appearances(&before));
        if avg <= 0.0 {
            continue;
        }
        let wsl = (t - before[before.len() - 1]) as f64;
        let overdue = wsl >= avg;
        let in_window = wsl >= avg * 0.7 && wsl <= avg * 3.0;
        if !(overdue || in_window) {
            continue;
        }
        let ready = wsl / avg;
        if best.is_none_or(|(_, r)| ready > r) {
            best = Some((pair, ready));
        }
    }
    best
}

/// Numéro le plus « mûr » au tirage `t`. Un numéro absent des `lookback` derniers tirages n'est pas candidat.
fn best_single_at(history: &History, gaps: &[GapStats], t: usize, lookback: usize) -> Option<(u8, f64)> {
    let mut best: Option<(u8, f64)> = None;
    for g in gaps {
        let n = g.number;
        let Some(last) = (t.saturating_sub(lookback)..t).rev().find(|&k| history.present(k, n)) else {
            continue;
        };
        let wsl = (t - 1 - last) as f64;
        let ready = wsl / g.avg_gap.unwrap_or(10.0);
        if ready > 0.8 && best.is_none_or(|(_, r)| ready > r) {
            best = Some((n, ready));
        }
    }
    best
}

#[derive(Default)]
struct Chase<T> {
    target: Option<(T, usize)>,
}

impl<T: Copy> Chase<T> {
    /// Mise de la semaine ; démarre une chasse sur `candidate` si aucune n'est en cours.
    fn play(
        &mut self,
        candidate: Option<T>,
        stakes: &[f64],
        odds: f64,
        hit: impl Fn(T) -> bool,
        result: &mut StrategyResult,
    ) {
        if self.target.is_none() {
            if let Some(c) = candidate {
                self.target = Some((c, 0));
                result.bets += 1;
            }
        }
        let Some((target, step)) = self.target else {
            return;
        };
        let Some(&stake) = stakes.get(step) else {
            self.target = None;
            return;
        };
        result.investment += stake;
        if hit(target) {
            result.wins += 1;
            result.revenue += stake * odds;
            self.target = None;
        } else if step + 1 >= stakes.len() {
            self.target = None;
        } else {
            self.target = Some((target, step + 1));
        }
    }
}

/// `gaps` : statistiques d'écart de tout l'historique, une entrée par numéro.
pub fn run_backtest(history: &History, pairs: &PairHistory, gaps: &[GapStats], config: &BacktestConfig) -> BacktestReport {
    let total = history.len();
    let weeks = config.weeks.min(total.saturating_sub(config.warmup));
    let stakes: Vec<f64> = config
        .stakes
        .sequence(config.max_steps.max(1))
        .into_iter()
        .map(|s| s as f64)
        .collect();

    let mut banker = StrategyResult::new("Banquière sélective");
    let mut pair_result = StrategyResult::new("Chasse de paire");
    let mut single_result = StrategyResult::new("Chasse de numéro");
    let mut pair_chase: Chase<(u8, u8)> = Chase::default();
    let mut single_chase: Chase<u8> = Chase::default();

    let mut log = Vec::with_capacity(weeks);
    let (mut ens_pred, mut ens_hits, mut bank_pred, mut bank_hits) = (0, 0, 0, 0);

    for t in total - weeks..total {
        let pair = best_pair_at(pairs, t, config.min_pair_appearances);
        let single = best_single_at(history, gaps, t, config.single_lookback);

        let either = |(a, b): (u8, u8)| history.present(t, a) || history.present(t, b);
        let both = |(a, b): (u8, u8)| history.present(t, a) && history.present(t, b);

        let ensemble_hit = single.is_some_and(|(n, r)| r > 0.75 && history.present(t, n));
        let banker_hit = pair.is_some_and(|(p, _)| either(p));
        if single.is_some() {
            ens_pred += 1;
            ens_hits += ensemble_hit as usize;
        }
        if pair.is_some() {
            bank_pred += 1;
            bank_hits += banker_hit as usize;
        }

        if let Some((p, ready)) = pair {
            if ready >= config.banker_min_readiness {
                banker.bets += 1;
                banker.investment += 1.0;
                if either(p) {
                    banker.wins += 1;
                    banker.revenue += config.banker_odds;
                }
            }
        }
        pair_chase.play(pair.map(|(p, _)| p), &stakes, config.pair_odds, both, &mut pair_result);
        single_chase.play(
            single.map(|(n, _)| n),
            &stakes,
            config.single_odds,
            |n| history.present(t, n),
            &mut single_result,
        );

        log.push(WeekLog {
            index: t,
            best_pair: pair.map(|(p, _)| p),
            pair_readiness: pair.map(|(_, r)| r).unwrap_or(0.0),
            best_single: single.map(|(n, _)| n),
            single_readiness: single.map(|(_, r)| r).unwrap_or(0.0),
            ensemble_hit,
            banker_hit,
        });
    }

    let rate = |hits: usize, n: usize| if n > 0 { hits as f64 / n as f64 * 100.0 } else { 0.0 };
    BacktestReport {
        weeks,
        ensemble_predictions: ens_pred,
        ensemble_hits: ens_hits,
        ensemble_hit_rate: rate(ens_hits, ens_pred),
        banker_predictions: bank_pred,
        banker_hits: bank_hits,
        banker_hit_rate: rate(bank_hits, bank_pred),
        strategies: vec![banker.finish(), pair_result.finish(), single_result.finish()],
        log,
    }
}
