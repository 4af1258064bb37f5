//! Paires : corrélations, fenêtres de chasse « READY », prédictions de paires,
//! paires banquières (au moins un des deux numéros) et leurs chasses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::gaps::{gaps_from_appearances, mean_and_std};
use super::history::History;

/// Index 1-based des co-apparitions de chaque paire triée.
pub type PairHistory = BTreeMap<(u8, u8), Vec<usize>>;

pub fn pair_history(history: &History) -> PairHistory {
    let range = history.range();
    let mut map: PairHistory = BTreeMap::new();
    for (t, draw) in history.draws().iter().enumerate() {
        let nums: Vec<u8> = draw.numbers.iter().copied().filter(|&n| range.contains(n)).collect();
        for i in 0..nums.len() {
            for j in (i + 1)..nums.len() {
                let key = (nums[i].min(nums[j]), nums[i].max(nums[j]));
                map.entry(key).or_default().push(t + 1);
            }
        }
    }
    map
}

pub fn pair_label(pair: (u8, u8)) -> String {
    format!("{}-{}", pair.0, pair.1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChasePair {
    pub pair: (u8, u8),
    pub weeks_since_last: usize,
    pub avg_gap: f64,
    pub std_dev: f64,
    pub expected_in: usize,
    pub readiness: f64,
    pub reliability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalChaseWin {
    pub pair: (u8, u8),
    pub weeks_to_win: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairChaseStats {
    pub chases_started: usize,
    pub wins: usize,
    pub avg_wait: f64,
    pub win_rate: f64,
}

pub struct ChasePairScan {
    pub ready: Vec<ChasePair>,
    pub wins: Vec<HistoricalChaseWin>,
    pub stats: PairChaseStats,
}

/// Fenêtre de récolte : volatilité propre, fenêtre d'or 12-24, ou retard plafonné à 4× la moyenne.
pub fn scan_chase_pairs(pairs: &PairHistory, total: usize) -> ChasePairScan {
    let mut ready = Vec::new();
    let mut wins = Vec::new();
    let mut started = 0usize;

    for (&pair, apps) in pairs {
        if apps.len() < 2 {
            continue;
        }
        let gaps = gaps_from_appearances(apps);
        let (avg, sd) = mean_and_std(&gaps);
        let last = apps[apps.len() - 1];
        let wsl = total.saturating_sub(last);
        let w = wsl as f64;

        let harvest_start = (avg - sd * 1.5).max(5.0);
        let harvest_end = avg + sd * 2.5;
        let golden = (12..=24).contains(&wsl);
        let overdue = w >= avg && w <= avg * 4.0;

        if (w >= harvest_start && w <= harvest_end) || golden || overdue {
            let expected_in = if w > avg {
                1
            } else {
                ((avg - w).round() as usize).max(1)
            };
            let mut readiness = (w / avg) * (1.0 + 1.0 / (sd + 1.0));
            if w > avg * 2.5 {
                readiness *= 0.5;
            }
            ready.push(ChasePair {
                pair,
                weeks_since_last: wsl,
                avg_gap: avg,
                std_dev: sd,
                expected_in,
                readiness,
                reliability: apps.len() as f64 / total.max(1) as f64,
            });
        }

        // Rejeu historique avec la moyenne finale (approximation)
        let sim_start = (avg - sd * 0.8).max(5.0);
        let sim_end = avg + sd * 2.0;
        for &gap in &gaps {
            let g = gap as f64;
            if g >= sim_start {
                started += 1;
                if g <= sim_end + 10.0 {
                    wins.push(HistoricalChaseWin {
                        pair,
                        weeks_to_win: gap as i64 - sim_start.round() as i64,
                    });
                }
            }
        }
    }

    ready.sort_by(|a, b| b.readiness.partial_cmp(&a.readiness).unwrap_or(std::cmp::Ordering::Equal));

    let stats = PairChaseStats {
        chases_started: started,
        wins: wins.len(),
        avg_wait: if wins.is_empty() {
            0.0
        } else {
            wins.iter().map(|w| w.weeks_to_win as f64).sum::<f64>() / wins.len() as f64
        },
        win_rate: if started > 0 { wins.len() as f64 / started as f64 * 100.0 } else { 0.0 },
    };

    ChasePairScan { ready, wins, stats }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_thresholds(score: f64, high: f64, medium: f64) -> Self {
        if score > high {
            Confidence::High
        } else if score > medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "HAUTE"),
            Confidence::Medium => write!(f, "MOYENNE"),
            Confidence::Low => write!(f, "faible"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairPrediction {
    pub pair: (u8, u8),
    pub score: f64,
    pub synergy: f64,
    pub gap_score: f64,
    pub correlation: usize,
    pub confidence: Confidence,
}

/// `ensemble` : score d'ensemble par numéro (indexé par numéro, 0 si absent).
pub fn pair_predictions(pairs: &PairHistory, total: usize, ensemble: &[f64]) -> Vec<PairPrediction> {
    let score_of = |n: u8| ensemble.get(n as usize).copied().unwrap_or(0.0);
    let max_corr = pairs.values().map(|a| a.len()).max().unwrap_or(0).max(1) as f64;

    let mut preds: Vec<PairPrediction> = pairs
        .iter()
        .map(|(&pair, apps)| {
            let correlation = apps.len();
            let synergy = score_of(pair.0) + score_of(pair.1);
            let last = apps.last().copied().unwrap_or(0);
            let wsl = total.saturating_sub(last) as f64;
            let avg = if apps.len() > 1 {
                mean_and_std(&gaps_from_appearances(apps)).0
            } else {
                total as f64 / correlation.max(1) as f64
            };
            let gap_score = wsl / avg.max(1.0);
            let score = synergy * 0.40 + (correlation as f64 / max_corr) * 0.15 + gap_score.min(4.0) * 0.45;
            PairPrediction {
                pair,
                score,
                synergy,
                gap_score,
                correlation,
                confidence: Confidence::from_thresholds(score, 0.5, 0.3),
            }
        })
        .collect();

    preds.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    preds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankerPair {
    pub pair: (u8, u8),
    pub reliability: f64,
    pub union_count: usize,
    pub weeks_since_last_hit: usize,
    pub urgency: f64,
    pub score: f64,
    pub is_chase: bool,
}

/// Tirages écoulés depuis la dernière sortie de `a` ou `b`.
fn weeks_since_either(history: &History, a: u8, b: u8) -> usize {
    let total = history.len();
    let last = (0..total)
        .rev()
        .find(|&t| history.present(t, a) || history.present(t, b))
        .map(|t| t + 1)
        .unwrap_or(0);
    total - last
}

pub fn banker_pairs(history: &History, pairs: &PairHistory) -> Vec<BankerPair> {
    let total = history.len();
    if total == 0 {
        return Vec::new();
    }
    let mut bankers: Vec<BankerPair> = pairs
        .iter()
        .filter_map(|(&(a, b), apps)| {
            let union_count = history.frequency(a) + history.frequency(b) - apps.len();
            let reliability = union_count as f64 / total as f64 * 100.0;
            if reliability <= 35.0 {
                return None;
            }
            let wsl = weeks_since_either(history, a, b);
            let avg = 100.0 / reliability;
            let urgency = wsl as f64 / avg.max(1.0);
            Some(BankerPair {
                pair: (a, b),
                reliability,
                union_count,
                weeks_since_last_hit: wsl,
                urgency,
                score: reliability + urgency * 15.0,
                is_chase: false,
            })
        })
        .collect();
    bankers.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    bankers
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaseBanker {
    pub pair: (u8, u8),
    pub weeks_since_last: usize,
    pub avg_gap: f64,
    pub reliability: f64,
    pub due_score: f64,
    pub expected_in: usize,
}

/// Parmi les 50 meilleures banquières, celles dont l'absence est dans [0.7, 4] × l'écart moyen.
/// Les banquières retenues sont marquées et voient leur fiabilité relevée (plafond 99).
pub fn chase_bankers(bankers: &mut [BankerPair]) -> Vec<ChaseBanker> {
    let mut chases = Vec::new();
    for bp in bankers.iter_mut().take(50) {
        let avg = 100.0 / bp.reliability;
        let w = bp.weeks_since_last_hit as f64;
        if w >= avg * 0.7 && w <= avg * 4.0 {
            chases.push(ChaseBanker {
                pair: bp.pair,
                weeks_since_last: bp.weeks_since_last_hit,
                avg_gap: avg,
                reliability: bp.reliability,
                due_score: w / avg,
                expected_in: ((avg - w).round().max(1.0)) as usize,
            });
            bp.reliability = (bp.reliability * 1.5).min(99.0);
            bp.is_chase = true;
        }
    }
    chases.sort_by(|a, b| b.due_score.partial_cmp(&a.due_score).unwrap_or(std::cmp::Ordering::Equal));
    chases
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlot_db::models::{Draw, NumberRange};

    fn chrono(rows: &[Vec<u8>]) -> Vec<Draw> {
        rows.iter()
            .enumerate()
            .rev()
            .map(|(i, r)| Draw::new(i as u32 + 1, r.clone()))
            .collect()
    }

    #[test]
    fn test_pair_history_sorted_keys() {
        let draws = chrono(&[vec![5, 2, 9], vec![2, 5]]);
        let h = History::new(&draws, NumberRange::default());
        let ph = pair_history(&h);
        assert_eq!(ph.get(&(2, 5)), Some(&vec![1, 2]));
        assert_eq!(ph.get(&(5, 9)), Some(&vec![1]));
        assert!(ph.get(&(5, 2)).is_none());
        assert_eq!(pair_label((2, 5)), "2-5");
    }

    #[test]
    fn test_chase_pair_ready_and_expected() {
        // (1,2) sort tous les 10 tirages puis plus rien pendant 10 tirages
        let rows: Vec<Vec<u8>> = (1..=40)
            .map(|t| if t % 10 == 0 && t <= 30 { vec![1, 2] } else { vec![40 + (t % 5) as u8] })
            .collect();
        let draws = chrono(&rows);
        let h = History::new(&draws, NumberRange::default());
        let scan = scan_chase_pairs(&pair_history(&h), h.len());
        let cp = scan.ready.iter().find(|c| c.pair == (1, 2)).expect("paire prête");
        assert_eq!(cp.weeks_since_last, 10);
        assert!((cp.avg_gap - 10.0).abs() < 1e-9);
        assert_eq!(cp.std_dev, 0.0);
        assert_eq!(cp.expected_in, 1);
        // 10/10 * (1 + 1/1)
        assert!((cp.readiness - 2.0).abs() < 1e-9);
        assert_eq!(scan.stats.chases_started, 2);
        assert_eq!(scan.stats.wins, 2);
        assert!((scan.stats.win_rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pair_predictions_scoring() {
        let draws = chrono(&[vec![1, 2], vec![3, 4], vec![1, 2]]);
        let h = History::new(&draws, NumberRange::default());
        let ph = pair_history(&h);
        let mut ensemble = vec![0.0; 50];
        ensemble[1] = 0.2;
        ensemble[2] = 0.3;
        let preds = pair_predictions(&ph, h.len(), &ensemble);
        let p12 = preds.iter().find(|p| p.pair == (1, 2)).unwrap();
        // synergy 0.5, corr 2/2, wsl 0, avg 2
        assert!((p12.score - (0.5 * 0.4 + 0.15)).abs() < 1e-9);
        assert_eq!(p12.confidence, Confidence::Medium);
        let p34 = preds.iter().find(|p| p.pair == (3, 4)).unwrap();
        // une seule apparition : avg = 3/1, wsl = 1
        assert!((p34.gap_score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_banker_pairs_and_chase() {
        // 1 sort un tirage sur deux, 2 jamais avec 1 : union élevée
        let rows: Vec<Vec<u8>> = (0..20)
            .map(|t| if t % 2 == 0 { vec![1, 3] } else { vec![2, 3] })
            .collect();
        let mut rows = rows;
        rows.push(vec![30, 31]);
        rows.push(vec![32, 33]);
        let draws = chrono(&rows);
        let h = History::new(&draws, NumberRange::default());
        let ph = pair_history(&h);
        let mut bankers = banker_pairs(&h, &ph);
        let b13 = bankers.iter().find(|b| b.pair == (1, 3)).unwrap();
        // union = 10 + 20 - 10 = 20 sur 22
        assert_eq!(b13.union_count, 20);
        assert_eq!(b13.weeks_since_last_hit, 2);
        assert!(bankers.windows(2).all(|w| w[0].score >= w[1].score));

        let chases = chase_bankers(&mut bankers);
        assert!(chases.iter().any(|c| c.pair == (1, 3)));
        let promoted = bankers.iter().find(|b| b.pair == (1, 3)).unwrap();
        assert!(promoted.is_chase);
        assert!(promoted.reliability <= 99.0);
    }
}
