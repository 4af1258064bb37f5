//! Petit réseau feed-forward 8-12-1 (sigmoïde), un par numéro.
//! Canal heuristique parmi d'autres : pas de validation, pas d'arrêt précoce.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::{Deserialize, Serialize};

/// velocity, gap, markov, pattern, algebraic, lag1, lag2, hmm
pub const N_FEATURES: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    pub hidden: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Le label vaut 1 si le numéro sort dans les `lookahead` tirages suivants.
    pub lookahead: usize,
    /// Nombre de tirages les plus récents utilisés pour l'entraînement.
    pub training_window: usize,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            hidden: 12,
            learning_rate: 0.1,
            epochs: 20,
            lookahead: 5,
            training_window: 300,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone)]
pub struct FeedForward {
    w_ih: Array2<f64>,
    b_h: Array1<f64>,
    w_ho: Array1<f64>,
    b_o: f64,
    learning_rate: f64,
}

impl FeedForward {
    /// Poids et biais uniformes dans [-1, 1].
    pub fn new(inputs: usize, hidden: usize, learning_rate: f64, rng: &mut StdRng) -> Self {
        let mut uniform = || rng.random::<f64>() * 2.0 - 1.0;
        let w_ih = Array2::from_shape_fn((hidden, inputs), |_| uniform());
        let b_h = Array1::from_shape_fn(hidden, |_| uniform());
        let w_ho = Array1::from_shape_fn(hidden, |_| uniform());
        let b_o = uniform();
        Self { w_ih, b_h, w_ho, b_o, learning_rate }
    }

    fn hidden(&self, x: &Array1<f64>) -> Array1<f64> {
        (self.w_ih.dot(x) + &self.b_h).mapv(sigmoid)
    }

    pub fn predict(&self, x: &Array1<f64>) -> f64 {
        sigmoid(self.w_ho.dot(&self.hidden(x)) + self.b_o)
    }

    /// Une passe de rétropropagation. Renvoie l'erreur quadratique avant mise à jour.
    pub fn train(&mut self, x: &Array1<f64>, target: f64) -> f64 {
        let h = self.hidden(x);
        let o = sigmoid(self.w_ho.dot(&h) + self.b_o);
        let err = target - o;

        let grad_o = err * o * (1.0 - o) * self.learning_rate;
        self.w_ho.scaled_add(grad_o, &h);
        self.b_o += grad_o;

        // Les erreurs cachées sont propagées à travers les poids de sortie déjà mis à jour.
        let hidden_err = &self.w_ho * err;
        let grad_h = Array1::from_shape_fn(h.len(), |i| hidden_err[i] * h[i] * (1.0 - h[i]) * self.learning_rate);

        for (i, mut row) in self.w_ih.rows_mut().into_iter().enumerate() {
            row.scaled_add(grad_h[i], x);
        }
        self.b_h += &grad_h;

        err * err
    }
}

/// Échantillon d'entraînement : vecteur de features et label binaire.
pub type Sample = (Array1<f64>, f64);

pub struct SignalTrainer {
    config: NeuralConfig,
    seed: u64,
}

impl SignalTrainer {
    pub fn new(config: NeuralConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    pub fn config(&self) -> &NeuralConfig {
        &self.config
    }

    /// Chaque numéro a son propre générateur (graine + numéro) : l'ordre d'entraînement n'influe pas.
    pub fn train(&self, number: u8, samples: &[Sample]) -> (FeedForward, f64) {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(number as u64));
        let mut net = FeedForward::new(N_FEATURES, self.config.hidden, self.config.learning_rate, &mut rng);
        let mut mse = 0.0;
        for _ in 0..self.config.epochs {
            let total: f64 = samples.iter().map(|(x, y)| net.train(x, *y)).sum();
            mse = if samples.is_empty() { 0.0 } else { total / samples.len() as f64 };
        }
        (net, mse)
    }
}
