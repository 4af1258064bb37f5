//! Liaisons algébriques à l'intérieur d'un tirage (A+B=C, A×B=C, A²=B)
//! et résultats « manquants » qui compléteraient une liaison.
//!
//! Les historiques sont passés du plus récent au plus ancien (`draws[0]` = dernier tirage).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondKind {
    Addition,
    Multiplication,
    Square,
}

impl std::fmt::Display for BondKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BondKind::Addition => write!(f, "+"),
            BondKind::Multiplication => write!(f, "×"),
            BondKind::Square => write!(f, "²"),
        }
    }
}

/// Liaison complète : `result` est présent dans le tirage. Pour un carré, `a == b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bond {
    pub kind: BondKind,
    pub a: u8,
    pub b: u8,
    pub result: u8,
}

pub fn detect_algebraic_bonds(numbers: &[u8], max: u8) -> Vec<Bond> {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    let present: HashSet<u32> = sorted.iter().map(|&n| n as u32).collect();
    let max = max as u32;
    let mut bonds = Vec::new();

    for i in 0..sorted.len() {
        for j in (i + 1)..sorted.len() {
            let (a, b) = (sorted[i] as u32, sorted[j] as u32);
            let sum = a + b;
            let product = a * b;
            if present.contains(&sum) {
                bonds.push(Bond { kind: BondKind::Addition, a: sorted[i], b: sorted[j], result: sum as u8 });
            }
            if product <= max && present.contains(&product) {
                bonds.push(Bond { kind: BondKind::Multiplication, a: sorted[i], b: sorted[j], result: product as u8 });
            }
        }
    }

    for &v in &sorted {
        let sq = v as u32 * v as u32;
        if sq <= max && present.contains(&sq) {
            bonds.push(Bond { kind: BondKind::Square, a: v, b: v, result: sq as u8 });
        }
    }

    bonds
}

/// Intensité de liaison d'un tirage : nombre de liaisons complètes.
pub fn bond_intensity(numbers: &[u8], max: u8) -> usize {
    detect_algebraic_bonds(numbers, max).len()
}

/// Résultats absents du tirage qui compléteraient une liaison, avec leur multiplicité.
pub fn detect_partial_results(numbers: &[u8], max: u8) -> BTreeMap<u8, u32> {
    let present: HashSet<u32> = numbers.iter().map(|&n| n as u32).collect();
    let max = max as u32;
    let mut results = BTreeMap::new();

    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            let (a, b) = (numbers[i] as u32, numbers[j] as u32);
            let sum = a + b;
            let product = a * b;
            if sum <= max && !present.contains(&sum) {
                *results.entry(sum as u8).or_insert(0) += 1;
            }
            if product > 1 && product <= max && !present.contains(&product) {
                *results.entry(product as u8).or_insert(0) += 1;
            }
        }
    }

    for &v in numbers {
        let sq = v as u32 * v as u32;
        if sq > 1 && sq <= max && !present.contains(&sq) {
            *results.entry(sq as u8).or_insert(0) += 1;
        }
    }

    results
}

/// Agrège les liaisons partielles des `limit` derniers tirages, pondérées par récence.
/// Trié par intensité décroissante.
pub fn strongest_missing_results(draws: &[Draw], limit: usize, max: u8) -> Vec<(u8, f64)> {
    if limit == 0 {
        return Vec::new();
    }
    let mut aggregate: BTreeMap<u8, f64> = BTreeMap::new();
    for (idx, draw) in draws.iter().take(limit).enumerate() {
        let weight = (limit - idx) as f64 / limit as f64;
        for (num, count) in detect_partial_results(&draw.numbers, max) {
            *aggregate.entry(num).or_insert(0.0) += count as f64 * weight;
        }
    }
    let mut ranked: Vec<(u8, f64)> = aggregate.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Champ harmonique sur les `depth` derniers tirages. Indexé par numéro (longueur max+1).
pub fn harmonic_field(draws: &[Draw], depth: usize, max: u8) -> Vec<f64> {
    let mut field = vec![0.0; max as usize + 1];
    if depth == 0 {
        return field;
    }
    let max = max as u32;

    for (idx, draw) in draws.iter().take(depth).enumerate() {
        let weight = (depth - idx) as f64 / depth as f64;
        let nums = &draw.numbers;
        let present: HashSet<u32> = nums.iter().map(|&n| n as u32).collect();
        let mut add = |s: u32, w: f64| {
            if s >= 1 && s <= max && !present.contains(&s) {
                field[s as usize] += w;
            }
        };

        for i in 0..nums.len() {
            let a = nums[i] as u32;
            for &nb in &nums[(i + 1)..] {
                let b = nb as u32;
                add(a + b, weight * 0.1);
                add(a * b, weight * 0.1);
                add(a.abs_diff(b), weight * 0.1);
                if a % b == 0 {
                    add(a / b, weight * 0.1);
                }
                if b % a == 0 {
                    add(b / a, weight * 0.1);
                }
            }
            add(a * a, weight * 0.2);
        }
    }

    field
}

/// Nombre de numéros communs à deux tirages.
pub fn echo_count(current: &[u8], previous: &[u8]) -> usize {
    current.iter().filter(|n| previous.contains(n)).count()
}

#[derive(Debug, Clone, Serialize)]
pub struct EchoStats {
    pub lag1_rate: f64,
    pub lag2_rate: f64,
    pub avg_repeats: f64,
}

/// Taux de répétition à 1 et 2 tirages d'écart.
pub fn echo_stats(draws: &[Draw]) -> EchoStats {
    let active: Vec<&Draw> = draws.iter().filter(|d| !d.numbers.is_empty()).collect();
    let lag = |k: usize| -> (usize, usize) {
        let mut possible = 0;
        let mut actual = 0;
        for i in 0..active.len().saturating_sub(k) {
            possible += active[i].numbers.len();
            actual += echo_count(&active[i + k].numbers, &active[i].numbers);
        }
        (possible, actual)
    };
    let (p1, a1) = lag(1);
    let (p2, a2) = lag(2);
    let rate = |a: usize, p: usize| if p > 0 { a as f64 / p as f64 } else { 0.0 };

    EchoStats {
        lag1_rate: rate(a1, p1),
        lag2_rate: rate(a2, p2),
        avg_repeats: if active.len() > 1 { a1 as f64 / (active.len() - 1) as f64 } else { 0.0 },
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionStats {
    pub partial_bonds: usize,
    pub resolved_within_3: usize,
    pub resolved_within_5: usize,
}

impl ResolutionStats {
    pub fn rate_3(&self) -> f64 {
        if self.partial_bonds == 0 { 0.0 } else { self.resolved_within_3 as f64 / self.partial_bonds as f64 }
    }

    pub fn rate_5(&self) -> f64 {
        if self.partial_bonds == 0 { 0.0 } else { self.resolved_within_5 as f64 / self.partial_bonds as f64 }
    }
}

/// Pour chaque somme ou produit (> 2) absent d'un tirage, apparaît-il dans les
/// 3 ou 5 tirages suivants ? Seuls les tirages disposant de 5 successeurs comptent.
pub fn partial_bond_resolution(draws: &[Draw], max: u8) -> ResolutionStats {
    let chrono: Vec<&Draw> = draws.iter().rev().collect();
    let max = max as u32;
    let mut stats = ResolutionStats::default();

    for i in 0..chrono.len().saturating_sub(5) {
        let nums = &chrono[i].numbers;
        if nums.is_empty() {
            continue;
        }
        let present: HashSet<u32> = nums.iter().map(|&n| n as u32).collect();
        let resolves = |target: u32, horizon: usize| {
            (1..=horizon).any(|off| chrono[i + off].numbers.iter().any(|&n| n as u32 == target))
        };

        for a_idx in 0..nums.len() {
            for b_idx in (a_idx + 1)..nums.len() {
                let (a, b) = (nums[a_idx] as u32, nums[b_idx] as u32);
                let product = a * b;
                let sum = a + b;
                let candidates = [
                    (product, product > 2 && product <= max),
                    (sum, sum <= max),
                ];
                for (target, valid) in candidates {
                    if !valid || present.contains(&target) {
                        continue;
                    }
                    stats.partial_bonds += 1;
                    if resolves(target, 3) {
                        stats.resolved_within_3 += 1;
                    }
                    if resolves(target, 5) {
                        stats.resolved_within_5 += 1;
                    }
                }
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws_from(rows: &[&[u8]]) -> Vec<Draw> {
        // rows[0] = le plus récent
        rows.iter()
            .enumerate()
            .map(|(i, r)| Draw::new((rows.len() - i) as u32, r.to_vec()))
            .collect()
    }

    #[test]
    fn test_detect_bonds() {
        let bonds = detect_algebraic_bonds(&[2, 3, 5, 6, 4], 49);
        assert!(bonds.iter().any(|b| b.kind == BondKind::Addition && b.a == 2 && b.b == 3 && b.result == 5));
        assert!(bonds.iter().any(|b| b.kind == BondKind::Multiplication && b.a == 2 && b.b == 3 && b.result == 6));
        assert!(bonds.iter().any(|b| b.kind == BondKind::Square && b.a == 2 && b.result == 4));
        assert_eq!(bond_intensity(&[10, 20, 45], 49), 0);
    }

    #[test]
    fn test_product_above_max_ignored() {
        let bonds = detect_algebraic_bonds(&[7, 8, 49], 49);
        assert!(bonds.iter().all(|b| b.kind != BondKind::Multiplication));
    }

    #[test]
    fn test_partial_results() {
        let partial = detect_partial_results(&[2, 3], 49);
        assert_eq!(partial.get(&5), Some(&1));
        assert_eq!(partial.get(&6), Some(&1));
        assert_eq!(partial.get(&4), Some(&1), "carré de 2");
        assert_eq!(partial.get(&9), Some(&1), "carré de 3");
        // 1×1 n'est jamais un produit valide, et 1² non plus
        let ones = detect_partial_results(&[1, 40], 49);
        assert!(!ones.contains_key(&1));
        assert_eq!(ones.get(&41), Some(&1));
    }

    #[test]
    fn test_strongest_missing_weights() {
        let draws = draws_from(&[&[2, 3], &[2, 3]]);
        let ranked = strongest_missing_results(&draws, 2, 49);
        let five = ranked.iter().find(|(n, _)| *n == 5).unwrap();
        // poids 1.0 + 0.5
        assert!((five.1 - 1.5).abs() < 1e-9, "intensité = {}", five.1);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_harmonic_field() {
        let draws = draws_from(&[&[2, 6]]);
        let field = harmonic_field(&draws, 3, 49);
        // 8 (somme), 12 (produit), 4 (différence et carré de 2), 3 (quotient), 36 (carré de 6)
        assert!((field[8] - 0.1).abs() < 1e-9);
        assert!((field[12] - 0.1).abs() < 1e-9);
        assert!((field[3] - 0.1).abs() < 1e-9);
        assert!((field[4] - 0.3).abs() < 1e-9, "différence + carré : {}", field[4]);
        assert!((field[36] - 0.2).abs() < 1e-9);
        assert_eq!(field[2], 0.0, "les numéros tirés ne reçoivent rien");
        assert_eq!(field[6], 0.0);
    }

    #[test]
    fn test_echo_stats() {
        let draws = draws_from(&[&[1, 2, 3], &[1, 2, 4], &[1, 5, 6]]);
        assert_eq!(echo_count(&[1, 2, 3], &[1, 2, 4]), 2);
        let stats = echo_stats(&draws);
        // lag1 : (2 + 1) / 6
        assert!((stats.lag1_rate - 0.5).abs() < 1e-9);
        // lag2 : 1 / 3
        assert!((stats.lag2_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_repeats - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_partial_bond_resolution_looks_forward() {
        // Chronologique : [2,3] puis 5 apparaît au tirage suivant.
        let draws = draws_from(&[&[40], &[41], &[42], &[43], &[5, 44], &[2, 3]]);
        let stats = partial_bond_resolution(&draws, 49);
        // 2+3=5 et 2×3=6
        assert_eq!(stats.partial_bonds, 2);
        assert_eq!(stats.resolved_within_3, 1);
        assert_eq!(stats.resolved_within_5, 1);
        assert!((stats.rate_5() - 0.5).abs() < 1e-9);
    }
}
