//! Modèle de Markov caché à 3 états sur l'« humeur » des tirages :
//! dormant, structurel (liaisons algébriques), magnétique (échos).
//!
//! Baum-Welch avec alpha/beta normalisés à chaque pas pour éviter l'underflow.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

use crate::bonds::{bond_intensity, echo_count};

pub const N_STATES: usize = 3;
pub const N_SYMBOLS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HmmState {
    Dormant,
    Structural,
    Magnetic,
}

impl HmmState {
    pub fn from_index(i: usize) -> Self {
        match i {
            0 => HmmState::Dormant,
            1 => HmmState::Structural,
            _ => HmmState::Magnetic,
        }
    }
}

impl std::fmt::Display for HmmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HmmState::Dormant => write!(f, "Dormant"),
            HmmState::Structural => write!(f, "Structurel"),
            HmmState::Magnetic => write!(f, "Magnétique"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmConfig {
    pub iterations: usize,
    /// Amplitude de la perturbation aléatoire des matrices initiales.
    pub init_noise: f64,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self { iterations: 20, init_noise: 0.1 }
    }
}

/// Symbole observé : 2 si écho ≥ 3, sinon 1 si intensité de liaison ≥ 2, sinon 0.
pub fn discretize(bond_intensity: usize, echo_count: usize) -> usize {
    if echo_count >= 3 {
        2
    } else if bond_intensity >= 2 {
        1
    } else {
        0
    }
}

/// Séquence d'observations, du plus ancien au plus récent. `draws` est du plus récent au plus ancien.
pub fn observation_sequence(draws: &[Draw], max: u8) -> Vec<usize> {
    let chrono: Vec<&Draw> = draws.iter().rev().collect();
    chrono
        .iter()
        .enumerate()
        .map(|(t, d)| {
            let echo = if t > 0 { echo_count(&d.numbers, &chrono[t - 1].numbers) } else { 0 };
            discretize(bond_intensity(&d.numbers, max), echo)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Hmm {
    /// a[[i, j]] = P(état j | état i)
    pub a: Array2<f64>,
    /// b[[i, k]] = P(symbole k | état i)
    pub b: Array2<f64>,
    pub pi: Array1<f64>,
}

fn normalize_rows(m: &mut Array2<f64>) {
    for mut row in m.rows_mut() {
        let s = row.sum();
        if s > 0.0 {
            row /= s;
        }
    }
}

fn normalize(v: &mut Array1<f64>) -> f64 {
    let s = v.sum();
    if s > 0.0 {
        *v /= s;
    }
    s
}

impl Hmm {
    pub fn uniform() -> Self {
        Self {
            a: Array2::from_elem((N_STATES, N_STATES), 1.0 / N_STATES as f64),
            b: Array2::from_elem((N_STATES, N_SYMBOLS), 1.0 / N_SYMBOLS as f64),
            pi: Array1::from_elem(N_STATES, 1.0 / N_STATES as f64),
        }
    }

    /// Une initialisation strictement uniforme est un point fixe de Baum-Welch :
    /// on la perturbe avec un générateur graine pour que les états se différencient.
    pub fn seeded(seed: u64, noise: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut hmm = Self::uniform();
        hmm.a.mapv_inplace(|v| v * (1.0 + noise * (rng.random::<f64>() * 2.0 - 1.0)));
        hmm.b.mapv_inplace(|v| v * (1.0 + noise * (rng.random::<f64>() * 2.0 - 1.0)));
        normalize_rows(&mut hmm.a);
        normalize_rows(&mut hmm.b);
        hmm
    }

    fn forward(&self, obs: &[usize]) -> Array2<f64> {
        let t_len = obs.len();
        let mut alpha = Array2::zeros((t_len, N_STATES));
        for i in 0..N_STATES {
            alpha[[0, i]] = self.pi[i] * self.b[[i, obs[0]]];
        }
        let mut first = alpha.row(0).to_owned();
        normalize(&mut first);
        alpha.row_mut(0).assign(&first);

        for t in 0..t_len - 1 {
            let mut next = Array1::zeros(N_STATES);
            for j in 0..N_STATES {
                let s: f64 = (0..N_STATES).map(|i| alpha[[t, i]] * self.a[[i, j]]).sum();
                next[j] = s * self.b[[j, obs[t + 1]]];
            }
            normalize(&mut next);
            alpha.row_mut(t + 1).assign(&next);
        }
        alpha
    }

    fn backward(&self, obs: &[usize]) -> Array2<f64> {
        let t_len = obs.len();
        let mut beta = Array2::zeros((t_len, N_STATES));
        beta.row_mut(t_len - 1).fill(1.0);
        for t in (0..t_len - 1).rev() {
            let mut cur = Array1::zeros(N_STATES);
            for i in 0..N_STATES {
                cur[i] = (0..N_STATES)
                    .map(|j| self.a[[i, j]] * self.b[[j, obs[t + 1]]] * beta[[t + 1, j]])
                    .sum();
            }
            normalize(&mut cur);
            beta.row_mut(t).assign(&cur);
        }
        beta
    }

    /// Baum-Welch. Sans effet si moins de 2 observations.
    pub fn train(&mut self, obs: &[usize], iterations: usize) {
        let t_len = obs.len();
        if t_len < 2 {
            return;
        }

        for _ in 0..iterations {
            let alpha = self.forward(obs);
            let beta = self.backward(obs);

            let mut gamma = &alpha * &beta;
            normalize_rows(&mut gamma);

            let mut xi_sum = Array2::<f64>::zeros((N_STATES, N_STATES));
            for t in 0..t_len - 1 {
                let mut xi = Array2::<f64>::zeros((N_STATES, N_STATES));
                for i in 0..N_STATES {
                    for j in 0..N_STATES {
                        xi[[i, j]] = alpha[[t, i]] * self.a[[i, j]] * self.b[[j, obs[t + 1]]] * beta[[t + 1, j]];
                    }
                }
                let denom = xi.sum();
                if denom > 0.0 {
                    xi_sum += &(xi / denom);
                }
            }

            self.pi.assign(&gamma.row(0));

            for i in 0..N_STATES {
                let denom_a: f64 = (0..t_len - 1).map(|t| gamma[[t, i]]).sum();
                for j in 0..N_STATES {
                    self.a[[i, j]] = if denom_a > 0.0 { xi_sum[[i, j]] / denom_a } else { 1.0 / N_STATES as f64 };
                }

                let denom_b: f64 = gamma.column(i).sum();
                for k in 0..N_SYMBOLS {
                    let num_b: f64 = (0..t_len).filter(|&t| obs[t] == k).map(|t| gamma[[t, i]]).sum();
                    self.b[[i, k]] = if denom_b > 0.0 { num_b / denom_b } else { 1.0 / N_SYMBOLS as f64 };
                }
            }
        }
    }

    /// Probabilités filtrées de l'état courant (algorithme forward).
    pub fn state_probabilities(&self, obs: &[usize]) -> Array1<f64> {
        match self.filter(obs).last() {
            Some(p) => p.clone(),
            None => self.pi.clone(),
        }
    }

    /// Probabilités filtrées après chaque observation.
    pub fn filter(&self, obs: &[usize]) -> Vec<Array1<f64>> {
        if obs.is_empty() {
            return Vec::new();
        }
        let alpha = self.forward(obs);
        alpha.rows().into_iter().map(|r| r.to_owned()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmmSummary {
    pub state_probabilities: [f64; N_STATES],
    pub hot_state_probability: f64,
    pub current_state: HmmState,
    pub observations: usize,
}

impl HmmSummary {
    pub fn from_probabilities(p: &Array1<f64>, observations: usize) -> Self {
        let probs = [p[0], p[1], p[2]];
        let best = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);
        Self {
            state_probabilities: probs,
            hot_state_probability: probs[1] + probs[2],
            current_state: HmmState::from_index(best),
            observations,
        }
    }
}

/// Entraîne sur tout l'historique et renvoie le modèle avec ses probabilités filtrées par tirage.
pub fn fit_history(draws: &[Draw], max: u8, config: &HmmConfig, seed: u64) -> (Hmm, Vec<Array1<f64>>) {
    let obs = observation_sequence(draws, max);
    let mut hmm = Hmm::seeded(seed, config.init_noise);
    hmm.train(&obs, config.iterations);
    let filtered = hmm.filter(&obs);
    log::info!("HMM entraîné sur {} observations ({} itérations)", obs.len(), config.iterations);
    (hmm, filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;

    fn assert_stochastic(m: &Array2<f64>) {
        for row in m.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6, "ligne non stochastique : {:?}", row);
            assert!(row.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn test_discretize() {
        assert_eq!(discretize(0, 3), 2);
        assert_eq!(discretize(5, 3), 2);
        assert_eq!(discretize(2, 1), 1);
        assert_eq!(discretize(1, 2), 0);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = Hmm::seeded(7, 0.1);
        let b = Hmm::seeded(7, 0.1);
        assert_eq!(a.a, b.a);
        assert_eq!(a.b, b.b);
        assert_stochastic(&a.a);
        assert_stochastic(&a.b);
    }

    #[test]
    fn test_train_keeps_distributions() {
        let obs = vec![0, 0, 1, 2, 2, 2, 0, 1, 1, 0, 2, 2, 0, 0, 1];
        let mut hmm = Hmm::seeded(42, 0.1);
        hmm.train(&obs, 20);
        assert_stochastic(&hmm.a);
        assert_stochastic(&hmm.b);
        assert!((hmm.pi.sum() - 1.0).abs() < 1e-6);

        let p = hmm.state_probabilities(&obs);
        assert!((p.sum() - 1.0).abs() < 1e-6);
        assert_eq!(hmm.filter(&obs).len(), obs.len());
    }

    #[test]
    fn test_train_short_sequence_is_noop() {
        let mut hmm = Hmm::uniform();
        hmm.train(&[1], 20);
        assert_eq!(hmm.a, Hmm::uniform().a);
        assert_eq!(hmm.state_probabilities(&[]), hmm.pi);
    }

    #[test]
    fn test_fit_history_and_summary() {
        let draws = make_test_draws(80);
        let (_, filtered) = fit_history(&draws, 49, &HmmConfig::default(), 42);
        assert_eq!(filtered.len(), 80);
        let summary = HmmSummary::from_probabilities(filtered.last().unwrap(), 80);
        let total: f64 = summary.state_probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(summary.hot_state_probability >= 0.0 && summary.hot_state_probability <= 1.0 + 1e-9);
    }
}
