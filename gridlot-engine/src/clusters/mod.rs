pub mod seed;

use serde::{Deserialize, Serialize};

use crate::grid::GridTopology;

pub use seed::{detect_seed_origins, SeedOrigin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Addition,
    Multiplication,
}

impl Operation {
    pub fn apply(&self, a: u8, b: u8) -> u32 {
        match self {
            Operation::Addition => a as u32 + b as u32,
            Operation::Multiplication => a as u32 * b as u32,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Addition => write!(f, "addition"),
            Operation::Multiplication => write!(f, "multiplication"),
        }
    }
}

/// Triplet isolé d'un tirage et les deux numéros qu'il projette depuis son pivot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub numbers: [u8; 3],
    pub middle: u8,
    pub predictions: [u8; 2],
    pub operation: Operation,
}

struct HubHit {
    middle: u8,
    predictions: [u8; 2],
    operation: Operation,
}

/// Résultats distincts de `mid op s` dans [1, max], triés. `None` sauf s'il y en a exactement deux.
fn two_results(op: Operation, mid: u8, siblings: [u8; 2], max: u8) -> Option<[u8; 2]> {
    let mut results: Vec<u8> = siblings
        .iter()
        .map(|&s| op.apply(mid, s))
        .filter(|&r| r >= 1 && r <= max as u32)
        .map(|r| r as u8)
        .collect();
    results.sort_unstable();
    results.dedup();
    match results.as_slice() {
        [a, b] => Some([*a, *b]),
        _ => None,
    }
}

/// Détecte les triplets isolés d'un tirage.
///
/// Un triplet (ordre positionnel du tirage) est retenu si aucun de ses membres n'est
/// adjacent à un numéro hors du triplet. Chaque membre adjacent à ses deux frères est
/// un pivot candidat ; il produit un résultat pour chaque opération donnant exactement
/// deux valeurs distinctes. Le pivot orthogonal à ses deux frères est préféré, sinon
/// le premier pivot valide. Tous les résultats de ce pivot sont émis.
pub fn detect_isolated_clusters(numbers: &[u8], grid: &GridTopology) -> Vec<Cluster> {
    let mut results = Vec::new();
    let n = numbers.len();
    let max = grid.max();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let triple = [numbers[i], numbers[j], numbers[k]];

                let isolated = numbers
                    .iter()
                    .filter(|o| !triple.contains(o))
                    .all(|&o| triple.iter().all(|&t| !grid.are_adjacent(t, o)));
                if !isolated {
                    continue;
                }

                let mut hits: Vec<HubHit> = Vec::new();
                for idx in 0..3 {
                    let mid = triple[idx];
                    let sibs = siblings(&triple, idx);
                    if !(grid.are_adjacent(mid, sibs[0]) && grid.are_adjacent(mid, sibs[1])) {
                        continue;
                    }
                    for op in [Operation::Addition, Operation::Multiplication] {
                        if let Some(predictions) = two_results(op, mid, sibs, max) {
                            hits.push(HubHit { middle: mid, predictions, operation: op });
                        }
                    }
                }
                if hits.is_empty() {
                    continue;
                }

                let mut hubs: Vec<u8> = Vec::new();
                for h in &hits {
                    if !hubs.contains(&h.middle) {
                        hubs.push(h.middle);
                    }
                }
                let best = hubs
                    .iter()
                    .copied()
                    .find(|&m| {
                        let idx = triple.iter().position(|&t| t == m).unwrap_or(0);
                        let sibs = siblings(&triple, idx);
                        grid.are_orthogonal(m, sibs[0]) && grid.are_orthogonal(m, sibs[1])
                    })
                    .unwrap_or(hubs[0]);

                results.extend(hits.into_iter().filter(|h| h.middle == best).map(|h| Cluster {
                    numbers: triple,
                    middle: h.middle,
                    predictions: h.predictions,
                    operation: h.operation,
                }));
            }
        }
    }

    results
}

fn siblings(triple: &[u8; 3], idx: usize) -> [u8; 2] {
    match idx {
        0 => [triple[1], triple[2]],
        1 => [triple[0], triple[2]],
        _ => [triple[0], triple[1]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridTopology {
        GridTopology::default()
    }

    #[test]
    fn test_reference_cluster_hub_17() {
        let clusters = detect_isolated_clusters(&[9, 17, 18, 40, 41, 42], &grid());
        assert_eq!(clusters.len(), 1, "clusters : {:?}", clusters);
        let c = &clusters[0];
        assert_eq!(c.numbers, [9, 17, 18]);
        assert_eq!(c.middle, 17);
        assert_eq!(c.predictions, [26, 35]);
        assert_eq!(c.operation, Operation::Addition);
    }

    #[test]
    fn test_reference_cluster_hub_2_both_operations() {
        let clusters = detect_isolated_clusters(&[1, 2, 3, 40, 41], &grid());
        assert_eq!(clusters.len(), 2, "clusters : {:?}", clusters);
        assert!(clusters.iter().all(|c| c.middle == 2 && c.numbers == [1, 2, 3]));
        let add = clusters.iter().find(|c| c.operation == Operation::Addition).unwrap();
        assert_eq!(add.predictions, [3, 5]);
        let mul = clusters.iter().find(|c| c.operation == Operation::Multiplication).unwrap();
        assert_eq!(mul.predictions, [2, 6]);
    }

    #[test]
    fn test_not_isolated() {
        // 10 touche 9 et 17 : le triplet 9-17-18 n'est plus isolé
        let clusters = detect_isolated_clusters(&[9, 17, 18, 10], &grid());
        assert!(clusters.iter().all(|c| c.numbers != [9, 17, 18]));
    }

    #[test]
    fn test_too_small_draw() {
        assert!(detect_isolated_clusters(&[1, 2], &grid()).is_empty());
        assert!(detect_isolated_clusters(&[], &grid()).is_empty());
    }

    #[test]
    fn test_invariants_on_many_draws() {
        let g = grid();
        let draws: Vec<Vec<u8>> = (0..200u32)
            .map(|i| {
                let mut d = Vec::new();
                let mut k = 0u32;
                while d.len() < 6 && k < 200 {
                    let n = ((i * 17 + k * k * 5 + k * 3) % 49 + 1) as u8;
                    if !d.contains(&n) {
                        d.push(n);
                    }
                    k += 1;
                }
                d
            })
            .collect();

        for draw in &draws {
            for c in detect_isolated_clusters(draw, &g) {
                assert_ne!(c.predictions[0], c.predictions[1]);
                assert!(c.predictions.iter().all(|&p| (1..=49).contains(&p)));
                assert!(c.predictions[0] < c.predictions[1], "prédictions triées");
                for &member in &c.numbers {
                    for &other in draw.iter().filter(|o| !c.numbers.contains(o)) {
                        assert!(!g.are_adjacent(member, other), "isolation violée pour {:?}", draw);
                    }
                }
                // déterminisme
                assert_eq!(detect_isolated_clusters(draw, &g), detect_isolated_clusters(draw, &g));
            }
        }
    }

    #[test]
    fn test_orthogonal_hub_preferred() {
        // Les trois membres sont pivots valides ; seul 10 est orthogonal à ses deux frères.
        let clusters = detect_isolated_clusters(&[17, 9, 10, 45], &grid());
        assert!(!clusters.is_empty());
        assert!(clusters.iter().all(|c| c.middle == 10), "clusters : {:?}", clusters);
    }
}
