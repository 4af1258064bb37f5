//! Capteurs de signal par numéro, calculés incrémentalement du plus ancien au
//! plus récent tirage sans jamais regarder le futur.
//!
//! Huit capteurs dans [0, 1] : gap, velocity, markov, pattern, algebraic, echo,
//! hmm, neural. La force d'un numéro est leur mélange pondéré ; elle classe les
//! singles, les banquières (un des deux suffit) et les alphas (les deux).

use std::collections::HashSet;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

use crate::analysis::channels::TransitionCounts;
use crate::analysis::history::History;
use crate::analysis::pairs::PairHistory;
use crate::bonds::harmonic_field;
use crate::neural::{N_FEATURES, NeuralConfig, Sample, SignalTrainer};

const VELOCITY_WINDOW: usize = 10;
const FIELD_DEPTH: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub gap: f64,
    pub velocity: f64,
    pub markov: f64,
    pub pattern: f64,
    pub algebraic: f64,
    pub echo: f64,
    pub hmm: f64,
    pub neural: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            gap: 0.15,
            velocity: 0.10,
            markov: 0.15,
            pattern: 0.10,
            algebraic: 0.15,
            echo: 0.10,
            hmm: 0.10,
            neural: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    pub weights: SignalWeights,
    /// Nombre de singles retenus pour former les paires.
    pub pair_pool: usize,
    pub top_pairs: usize,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            pair_pool: 12,
            top_pairs: 10,
        }
    }
}

/// Entrées du réseau, dans l'ordre attendu par [`crate::neural`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Features {
    pub velocity: f64,
    pub gap: f64,
    pub markov: f64,
    pub pattern: f64,
    pub algebraic: f64,
    pub lag1: f64,
    pub lag2: f64,
    pub hmm: f64,
}

impl Features {
    pub fn to_array(&self) -> Array1<f64> {
        let v = [
            self.velocity,
            self.gap,
            self.markov,
            self.pattern,
            self.algebraic,
            self.lag1,
            self.lag2,
            self.hmm,
        ];
        debug_assert_eq!(v.len(), N_FEATURES);
        Array1::from(v.to_vec())
    }

    pub fn echo(&self) -> f64 {
        if self.lag1 > 0.0 {
            1.0
        } else if self.lag2 > 0.0 {
            0.5
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SensorReading {
    pub gap: f64,
    pub velocity: f64,
    pub markov: f64,
    pub pattern: f64,
    pub algebraic: f64,
    pub echo: f64,
    pub hmm: f64,
    pub neural: f64,
}

impl SensorReading {
    pub fn from_features(f: &Features, neural: f64) -> Self {
        Self {
            gap: f.gap,
            velocity: f.velocity,
            markov: f.markov,
            pattern: f.pattern,
            algebraic: f.algebraic,
            echo: f.echo(),
            hmm: f.hmm,
            neural,
        }
    }

    pub fn strength(&self, w: &SignalWeights) -> f64 {
        self.gap * w.gap
            + self.velocity * w.velocity
            + self.markov * w.markov
            + self.pattern * w.pattern
            + self.algebraic * w.algebraic
            + self.echo * w.echo
            + self.hmm * w.hmm
            + self.neural * w.neural
    }
}

/// État incrémental de tous les numéros jusqu'au tirage courant inclus.
pub struct SensorTracker<'h, 'a> {
    history: &'h History<'a>,
    hmm: &'h [Array1<f64>],
    current: Option<usize>,
    count: Vec<usize>,
    last_seen: Vec<Option<usize>>,
    gap_sum: Vec<usize>,
    gap_count: Vec<usize>,
    transitions: Vec<TransitionCounts>,
    /// (occurrences, suivies d'une sortie) pour chacun des 8 motifs de 3 bits.
    patterns: Vec<[(usize, usize); 8]>,
    field: Vec<f64>,
}

impl<'h, 'a> SensorTracker<'h, 'a> {
    /// `hmm` : probabilités filtrées par tirage chronologique (peut être vide).
    pub fn new(history: &'h History<'a>, hmm: &'h [Array1<f64>]) -> Self {
        let size = history.range().size();
        Self {
            history,
            hmm,
            current: None,
            count: vec![0; size],
            last_seen: vec![None; size],
            gap_sum: vec![0; size],
            gap_count: vec![0; size],
            transitions: vec![TransitionCounts::default(); size],
            patterns: vec![[(0, 0); 8]; size],
            field: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    fn code(&self, n: u8, end: usize) -> usize {
        let h = self.history;
        (h.present(end - 2, n) as usize) << 2 | (h.present(end - 1, n) as usize) << 1 | h.present(end, n) as usize
    }

    /// Intègre le tirage chronologique suivant. Renvoie `false` en fin d'historique.
    pub fn advance(&mut self) -> bool {
        let t = match self.current {
            None => 0,
            Some(c) => c + 1,
        };
        if t >= self.history.len() {
            return false;
        }
        let range = self.history.range();
        for n in range.iter() {
            let i = range.index_of(n);
            let present = self.history.present(t, n);
            if t > 0 {
                let c = &mut self.transitions[i];
                if self.history.present(t - 1, n) {
                    c.one_total += 1;
                    c.one_to_one += present as usize;
                } else {
                    c.zero_total += 1;
                    c.zero_to_one += present as usize;
                }
            }
            if t >= 3 {
                let code = self.code(n, t - 1);
                let entry = &mut self.patterns[i][code];
                entry.0 += 1;
                entry.1 += present as usize;
            }
            if present {
                if let Some(last) = self.last_seen[i] {
                    self.gap_sum[i] += t - last;
                    self.gap_count[i] += 1;
                }
                self.last_seen[i] = Some(t);
                self.count[i] += 1;
            }
        }

        let window: Vec<Draw> = (0..FIELD_DEPTH)
            .filter_map(|k| t.checked_sub(k))
            .map(|k| self.history.draw(k).clone())
            .collect();
        let mut field = harmonic_field(&window, FIELD_DEPTH, range.max);
        let peak = field.iter().copied().fold(0.0, f64::max);
        if peak > 0.0 {
            field.iter_mut().for_each(|v| *v /= peak);
        }
        self.field = field;
        self.current = Some(t);
        true
    }

    /// Écart moyen et tirages depuis la dernière sortie, au tirage courant.
    pub fn gap_state(&self, n: u8) -> (f64, usize) {
        let Some(t) = self.current else {
            return (0.0, 0);
        };
        let i = self.history.range().index_of(n);
        let total = t + 1;
        let avg = if self.gap_count[i] > 0 {
            self.gap_sum[i] as f64 / self.gap_count[i] as f64
        } else {
            total as f64 / self.count[i].max(1) as f64
        };
        let wsl = match self.last_seen[i] {
            Some(last) => t - last,
            None => total,
        };
        (avg, wsl)
    }

    pub fn features(&self, n: u8) -> Features {
        let Some(t) = self.current else {
            return Features::default();
        };
        let h = self.history;
        let i = h.range().index_of(n);
        let total = t + 1;

        let (avg, wsl) = self.gap_state(n);
        let gap = (wsl as f64 / avg / 2.0).min(1.0);

        let w = VELOCITY_WINDOW.min(total);
        let recent = (total - w..total).filter(|&k| h.present(k, n)).count() as f64 / w as f64;
        let overall = self.count[i] as f64 / total as f64;
        let velocity = (0.5 + recent - overall).clamp(0.0, 1.0);

        let lag1 = h.present(t, n);
        let lag2 = t >= 1 && h.present(t - 1, n);
        let markov = if lag1 { self.transitions[i].p11() } else { self.transitions[i].p01() };

        let pattern = if t >= 2 {
            let (matches, followed) = self.patterns[i][self.code(n, t)];
            if matches > 0 { followed as f64 / matches as f64 } else { 0.0 }
        } else {
            0.0
        };

        let algebraic = self.field.get(n as usize).copied().unwrap_or(0.0);
        let lag1 = lag1 as u8 as f64;

        let hmm = match self.hmm.get(t) {
            Some(p) => p[0] * gap + p[1] * algebraic + p[2] * lag1,
            None => 0.0,
        };

        Features {
            velocity,
            gap,
            markov,
            pattern,
            algebraic,
            lag1,
            lag2: lag2 as u8 as f64,
            hmm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSingle {
    pub number: u8,
    pub strength: f64,
    pub sensors: SensorReading,
    pub expected_window: usize,
    pub resonance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPair {
    pub pair: (u8, u8),
    pub strength: f64,
    pub expected_window: usize,
    pub resonance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReport {
    pub singles: Vec<SignalSingle>,
    pub bankers: Vec<SignalPair>,
    pub alphas: Vec<SignalPair>,
    pub training_samples: usize,
    pub training_mse: f64,
}

/// Pipeline complet : suivi incrémental, entraînement des réseaux, classements.
/// `resonant` : numéros prédits par les clusters du dernier tirage.
pub fn compute_signals(
    history: &History,
    hmm: &[Array1<f64>],
    pairs: &PairHistory,
    resonant: &HashSet<u8>,
    settings: &SignalSettings,
    neural: &NeuralConfig,
    seed: u64,
) -> SignalReport {
    let range = history.range();
    let total = history.len();
    let train_start = total.saturating_sub(neural.training_window);
    let mut samples: Vec<Vec<Sample>> = vec![Vec::new(); range.size()];

    let mut tracker = SensorTracker::new(history, hmm);
    while tracker.advance() {
        let Some(t) = tracker.current() else { break };
        if t < train_start || t + neural.lookahead >= total {
            continue;
        }
        for n in range.iter() {
            let label = (t + 1..=t + neural.lookahead).any(|k| history.present(k, n));
            samples[range.index_of(n)].push((tracker.features(n).to_array(), label as u8 as f64));
        }
    }

    let trainer = SignalTrainer::new(neural.clone(), seed);
    let mut mse_total = 0.0;
    let mut singles: Vec<SignalSingle> = range
        .iter()
        .map(|n| {
            let features = tracker.features(n);
            let (net, mse) = trainer.train(n, &samples[range.index_of(n)]);
            mse_total += mse;
            let sensors = SensorReading::from_features(&features, net.predict(&features.to_array()));
            let (avg, wsl) = tracker.gap_state(n);
            SignalSingle {
                number: n,
                strength: sensors.strength(&settings.weights),
                sensors,
                expected_window: (avg - wsl as f64).round().max(1.0) as usize,
                resonance: resonant.contains(&n),
            }
        })
        .collect();
    singles.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));

    let pool = &singles[..settings.pair_pool.min(singles.len())];
    let max_corr = pairs.values().map(|a| a.len()).max().unwrap_or(0).max(1) as f64;
    let mut bankers = Vec::new();
    let mut alphas = Vec::new();
    for (i, a) in pool.iter().enumerate() {
        for b in &pool[i + 1..] {
            let pair = (a.number.min(b.number), a.number.max(b.number));
            let corr = pairs.get(&pair).map(|v| v.len()).unwrap_or(0) as f64;
            bankers.push(SignalPair {
                pair,
                strength: 1.0 - (1.0 - a.strength) * (1.0 - b.strength),
                expected_window: a.expected_window.min(b.expected_window),
                resonance: a.resonance || b.resonance,
            });
            alphas.push(SignalPair {
                pair,
                strength: (a.strength * b.strength).sqrt() * (1.0 + 0.1 * corr / max_corr),
                expected_window: a.expected_window.max(b.expected_window),
                resonance: a.resonance && b.resonance,
            });
        }
    }
    for list in [&mut bankers, &mut alphas] {
        list.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
        list.truncate(settings.top_pairs);
    }

    let training_samples = samples.iter().map(|s| s.len()).sum();
    log::info!("Capteurs de signal : {} échantillons d'entraînement", training_samples);

    SignalReport {
        training_mse: if singles.is_empty() { 0.0 } else { mse_total / singles.len() as f64 },
        singles,
        bankers,
        alphas,
        training_samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pairs::pair_history;
    use crate::make_test_draws;
    use gridlot_db::models::NumberRange;

    fn chrono(rows: &[Vec<u8>]) -> Vec<Draw> {
        rows.iter()
            .enumerate()
            .rev()
            .map(|(i, r)| Draw::new(i as u32 + 1, r.clone()))
            .collect()
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = SignalWeights::default();
        let all = SensorReading {
            gap: 1.0,
            velocity: 1.0,
            markov: 1.0,
            pattern: 1.0,
            algebraic: 1.0,
            echo: 1.0,
            hmm: 1.0,
            neural: 1.0,
        };
        assert!((all.strength(&w) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tracker_matches_direct_counts() {
        // 5 : 1 0 1 1 0 1
        let rows = vec![vec![5, 10], vec![11], vec![5], vec![5, 12], vec![13], vec![5]];
        let draws = chrono(&rows);
        let h = History::new(&draws, NumberRange::default());
        let mut tracker = SensorTracker::new(&h, &[]);
        while tracker.advance() {}
        assert_eq!(tracker.current(), Some(5));

        let (avg, wsl) = tracker.gap_state(5);
        // sorties en 0,2,3,5 => écarts 2,1,2
        assert!((avg - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(wsl, 0);

        let f = tracker.features(5);
        assert_eq!(f.lag1, 1.0);
        assert_eq!(f.lag2, 0.0);
        assert_eq!(f.echo(), 1.0);
        assert_eq!(f.gap, 0.0);
        // transitions depuis 1 : 1->0, 1->1, 1->0 ; présent au dernier tirage
        assert!((f.markov - 1.0 / 3.0).abs() < 1e-9);
        // motif courant (1,0,1) déjà vu en 0..2, suivi d'une sortie en 3
        assert!((f.pattern - 1.0).abs() < 1e-9);
        assert_eq!(f.hmm, 0.0, "sans HMM le capteur reste nul");
    }

    #[test]
    fn test_tracker_never_seen_number() {
        let draws = chrono(&[vec![1], vec![2]]);
        let h = History::new(&draws, NumberRange::default());
        let mut tracker = SensorTracker::new(&h, &[]);
        while tracker.advance() {}
        let (avg, wsl) = tracker.gap_state(40);
        assert_eq!(wsl, 2);
        assert!((avg - 2.0).abs() < 1e-9);
        assert_eq!(tracker.features(40).gap, 0.5);
    }

    #[test]
    fn test_compute_signals_rankings() {
        let draws = make_test_draws(120);
        let h = History::new(&draws, NumberRange::default());
        let pairs = pair_history(&h);
        let resonant: HashSet<u8> = [7u8].into_iter().collect();
        let neural = NeuralConfig { epochs: 3, training_window: 40, ..Default::default() };
        let report = compute_signals(&h, &[], &pairs, &resonant, &SignalSettings::default(), &neural, 42);

        assert_eq!(report.singles.len(), 49);
        assert!(report.singles.windows(2).all(|w| w[0].strength >= w[1].strength));
        assert!(report.singles.iter().all(|s| s.strength >= 0.0 && s.strength <= 1.0 + 1e-9));
        assert!(report.singles.iter().all(|s| s.expected_window >= 1));
        assert!(report.singles.iter().find(|s| s.number == 7).unwrap().resonance);
        // 40 tirages d'entraînement moins les 5 sans fenêtre future complète
        assert_eq!(report.training_samples, 35 * 49);

        assert_eq!(report.bankers.len(), 10);
        assert_eq!(report.alphas.len(), 10);
        for b in &report.bankers {
            assert!(b.pair.0 < b.pair.1);
            assert!(b.strength <= 1.0);
        }
    }
}
