use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Operation;
use crate::grid::GridTopology;

/// Triplet « graine » (pivot M, s1, s2) dont une paire observée (A, B) pourrait dériver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOrigin {
    pub pair: [u8; 2],
    pub seed: [u8; 3],
    pub middle: u8,
    pub operation: Operation,
    pub orthogonal: bool,
}

fn derive(op: Operation, a: u8, b: u8, m: u8) -> Option<(u8, u8)> {
    match op {
        Operation::Addition => Some((a.checked_sub(m)?, b.checked_sub(m)?)),
        Operation::Multiplication => {
            if a % m == 0 && b % m == 0 {
                Some((a / m, b / m))
            } else {
                None
            }
        }
    }
}

/// Recherche inverse : pour chaque paire du tirage et chaque pivot M de la grille,
/// reconstruit s1, s2 par soustraction ou division exacte. La graine est valide si
/// s1, s2 sont dans la grille, distincts entre eux et de M, et tous deux adjacents à M.
/// Dédupliqué sur la graine triée, la première occurrence l'emporte.
pub fn detect_seed_origins(numbers: &[u8], grid: &GridTopology) -> Vec<SeedOrigin> {
    let mut results = Vec::new();
    let mut seen: HashSet<[u8; 3]> = HashSet::new();
    let n = numbers.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (numbers[i], numbers[j]);
            for m in 1..=grid.max() {
                for op in [Operation::Addition, Operation::Multiplication] {
                    let Some((s1, s2)) = derive(op, a, b, m) else {
                        continue;
                    };
                    if !grid.contains(s1) || !grid.contains(s2) {
                        continue;
                    }
                    if s1 == s2 || s1 == m || s2 == m {
                        continue;
                    }
                    if !(grid.are_adjacent(m, s1) && grid.are_adjacent(m, s2)) {
                        continue;
                    }

                    let mut seed = [m, s1, s2];
                    seed.sort_unstable();
                    if !seen.insert(seed) {
                        continue;
                    }
                    let mut pair = [a, b];
                    pair.sort_unstable();

                    results.push(SeedOrigin {
                        pair,
                        seed,
                        middle: m,
                        operation: op,
                        orthogonal: grid.are_orthogonal(m, s1) && grid.are_orthogonal(m, s2),
                    });
                }
            }
        }
    }

    results
}
