//! Canaux heuristiques par numéro : fréquence, momentum, transitions binaires,
//! racine numérique, bayésien, motif et auto-transition de Markov.

use serde::{Deserialize, Serialize};

use super::history::History;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub number: u8,
    pub count: usize,
    pub percentage: f64,
}

/// Numéros sortis au moins une fois, par fréquence décroissante.
pub fn frequency_table(history: &History) -> Vec<FrequencyEntry> {
    let total = history.len().max(1) as f64;
    let mut table: Vec<FrequencyEntry> = history
        .range()
        .iter()
        .map(|n| (n, history.frequency(n)))
        .filter(|&(_, c)| c > 0)
        .map(|(number, count)| FrequencyEntry {
            number,
            count,
            percentage: count as f64 / total * 100.0,
        })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count).then(a.number.cmp(&b.number)));
    table
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawSummary {
    pub index: usize,
    pub numbers: Vec<u8>,
    pub sum: u32,
    pub even: usize,
    pub odd: usize,
    pub low: usize,
    pub high: usize,
}

pub fn summarize_draws(history: &History) -> Vec<DrawSummary> {
    let half = history.range().max as f64 / 2.0;
    history
        .draws()
        .iter()
        .enumerate()
        .map(|(t, d)| {
            let even = d.numbers.iter().filter(|&&n| n % 2 == 0).count();
            let low = d.numbers.iter().filter(|&&n| (n as f64) <= half).count();
            DrawSummary {
                index: t + 1,
                numbers: d.sorted_numbers(),
                sum: d.numbers.iter().map(|&n| n as u32).sum(),
                even,
                odd: d.numbers.len() - even,
                low,
                high: d.numbers.len() - low,
            }
        })
        .collect()
}

/// Fréquence récente (sur `recent` tirages) moins fréquence globale.
pub fn momentum(history: &History, n: u8, recent: usize) -> f64 {
    let total = history.len();
    if total == 0 {
        return 0.0;
    }
    let recent = recent.clamp(1, total);
    let recent_hits = (total - recent..total).filter(|&t| history.present(t, n)).count();
    recent_hits as f64 / recent as f64 - history.frequency(n) as f64 / total as f64
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub zero_to_one: usize,
    pub zero_total: usize,
    pub one_to_one: usize,
    pub one_total: usize,
}

impl TransitionCounts {
    pub fn p01(&self) -> f64 {
        if self.zero_total > 0 { self.zero_to_one as f64 / self.zero_total as f64 } else { 0.0 }
    }

    pub fn p11(&self) -> f64 {
        if self.one_total > 0 { self.one_to_one as f64 / self.one_total as f64 } else { 0.0 }
    }
}

pub fn transition_counts(history: &History, n: u8) -> TransitionCounts {
    let mut c = TransitionCounts::default();
    for t in 0..history.len().saturating_sub(1) {
        let next = history.present(t + 1, n);
        if history.present(t, n) {
            c.one_total += 1;
            if next {
                c.one_to_one += 1;
            }
        } else {
            c.zero_total += 1;
            if next {
                c.zero_to_one += 1;
            }
        }
    }
    c
}

/// 80 % probabilité de transition depuis l'état courant, 20 % fréquence globale.
pub fn binary_transition_score(history: &History, n: u8) -> f64 {
    let total = history.len();
    if total == 0 {
        return 0.0;
    }
    let counts = transition_counts(history, n);
    let present_now = history.present(total - 1, n);
    let trans = if present_now { counts.p11() } else { counts.p01() };
    trans * 0.8 + history.frequency(n) as f64 / total as f64 * 0.2
}

pub fn digital_root(n: u8) -> u8 {
    (n.max(1) - 1) % 9 + 1
}

/// Fréquence de la classe de racine numérique de chaque numéro, normalisée par la
/// classe la plus fréquente. Indexé par `range.index_of(n)`.
pub fn digital_root_scores(history: &History) -> Vec<f64> {
    let range = history.range();
    let mut root_freq = [0usize; 10];
    for n in range.iter() {
        root_freq[digital_root(n) as usize] += history.frequency(n);
    }
    let max_root = root_freq.iter().copied().max().unwrap_or(0).max(1) as f64;
    range
        .iter()
        .map(|n| root_freq[digital_root(n) as usize] as f64 / max_root)
        .collect()
}

/// Moyenne a posteriori d'une Beta(1,1).
pub fn bayesian_score(history: &History, n: u8) -> f64 {
    (history.frequency(n) as f64 + 1.0) / (history.len() as f64 + 2.0)
}

/// Probabilité empirique d'une apparition après le motif binaire courant de taille `size`.
pub fn pattern_score(history: &History, n: u8, size: usize) -> f64 {
    let seq = history.sequence(n);
    if size == 0 || seq.len() <= size {
        return 0.0;
    }
    let current = &seq[seq.len() - size..];
    let mut matches = 0usize;
    let mut followed = 0usize;
    for i in 0..seq.len() - size {
        if &seq[i..i + size] == current {
            matches += 1;
            if seq[i + size] {
                followed += 1;
            }
        }
    }
    if matches > 0 { followed as f64 / matches as f64 } else { 0.0 }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfTransition {
    pub number: u8,
    pub probability: f64,
    pub repeats: usize,
    pub total: usize,
}

pub fn self_transition(history: &History, n: u8) -> SelfTransition {
    let c = transition_counts(history, n);
    SelfTransition {
        number: n,
        probability: c.p11(),
        repeats: c.one_to_one,
        total: c.one_total,
    }
}

/// Fiabilité × retard : `apparitions/total · (1 + log10(wsl + 1))`.
pub fn urgency(appearances: usize, weeks_since_last: usize, total: usize) -> f64 {
    if appearances < 2 || total == 0 {
        return 0.0;
    }
    appearances as f64 / total as f64 * (1.0 + (weeks_since_last as f64 + 1.0).log10())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlot_db::models::{Draw, NumberRange};

    /// Construit un historique à partir de lignes chronologiques (la première est la plus ancienne).
    fn chrono(rows: &[&[u8]]) -> Vec<Draw> {
        rows.iter()
            .enumerate()
            .rev()
            .map(|(i, r)| Draw::new(i as u32 + 1, r.to_vec()))
            .collect()
    }

    #[test]
    fn test_frequency_table() {
        let draws = chrono(&[&[1, 2], &[1, 3], &[1, 2]]);
        let h = History::new(&draws, NumberRange::default());
        let table = frequency_table(&h);
        assert_eq!(table[0].number, 1);
        assert_eq!(table[0].count, 3);
        assert!((table[0].percentage - 100.0).abs() < 1e-9);
        assert_eq!(table[1].number, 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_transitions_and_binary_score() {
        // 5 : 1,1,0,1 ; présent au dernier tirage
        let draws = chrono(&[&[5], &[5], &[6], &[5]]);
        let h = History::new(&draws, NumberRange::default());
        let c = transition_counts(&h, 5);
        assert_eq!(c.one_total, 2);
        assert_eq!(c.one_to_one, 1);
        assert_eq!(c.zero_total, 1);
        assert_eq!(c.zero_to_one, 1);
        let score = binary_transition_score(&h, 5);
        assert!((score - (0.5 * 0.8 + 0.75 * 0.2)).abs() < 1e-9);
        let st = self_transition(&h, 5);
        assert!((st.probability - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_momentum() {
        let draws = chrono(&[&[1], &[2], &[2], &[1], &[1], &[1]]);
        let h = History::new(&draws, NumberRange::default());
        // récents (3) : 1,1,1 => 1.0 ; global 4/6
        assert!((momentum(&h, 1, 3) - (1.0 - 4.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_digital_root() {
        assert_eq!(digital_root(1), 1);
        assert_eq!(digital_root(9), 9);
        assert_eq!(digital_root(10), 1);
        assert_eq!(digital_root(49), 4);
        let draws = chrono(&[&[1, 10], &[19]]);
        let h = History::new(&draws, NumberRange::default());
        let scores = digital_root_scores(&h);
        assert!((scores[0] - 1.0).abs() < 1e-9, "classe 1 la plus fréquente");
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_bayesian() {
        let draws = chrono(&[&[1], &[2], &[1]]);
        let h = History::new(&draws, NumberRange::default());
        assert!((bayesian_score(&h, 1) - 3.0 / 5.0).abs() < 1e-9);
        assert!((bayesian_score(&h, 9) - 1.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_score() {
        // 7 : 1 0 0 1 0 0 1 0 0 ; motif courant "1 0 0", toujours suivi de 1
        let rows: Vec<Vec<u8>> = (0..9).map(|i| if i % 3 == 0 { vec![7] } else { vec![8] }).collect();
        let refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();
        let draws = chrono(&refs);
        let h = History::new(&draws, NumberRange::default());
        assert!((pattern_score(&h, 7, 3) - 1.0).abs() < 1e-9);

        let short = chrono(&[&[7], &[8], &[7]]);
        let hs = History::new(&short, NumberRange::default());
        assert_eq!(pattern_score(&hs, 7, 3), 0.0);
    }

    #[test]
    fn test_urgency() {
        assert_eq!(urgency(1, 5, 10), 0.0);
        let u = urgency(5, 9, 10);
        assert!((u - 0.5 * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_summaries() {
        let draws = chrono(&[&[30, 2, 25]]);
        let h = History::new(&draws, NumberRange::default());
        let s = &summarize_draws(&h)[0];
        assert_eq!(s.numbers, vec![2, 25, 30]);
        assert_eq!(s.sum, 57);
        assert_eq!((s.even, s.odd), (2, 1));
        assert_eq!((s.low, s.high), (1, 2));
    }
}
