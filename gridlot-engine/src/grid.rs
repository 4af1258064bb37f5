//! Topologie de la grille : les numéros 1..=49 sont disposés en 7 lignes de 7,
//! ligne par ligne. Toute la détection spatiale repose sur ces prédicats.

use serde::Serialize;

pub const GRID_WIDTH: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPosition {
    pub row: u8,
    pub col: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridTopology {
    width: u8,
    max: u8,
}

impl Default for GridTopology {
    fn default() -> Self {
        Self { width: GRID_WIDTH, max: GRID_WIDTH * GRID_WIDTH }
    }
}

impl GridTopology {
    pub fn new(width: u8, max: u8) -> Self {
        Self { width: width.max(1), max }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn rows(&self) -> u8 {
        self.max.div_ceil(self.width)
    }

    pub fn contains(&self, n: u8) -> bool {
        n >= 1 && n <= self.max
    }

    pub fn position(&self, n: u8) -> GridPosition {
        let idx = n.saturating_sub(1);
        GridPosition {
            row: idx / self.width,
            col: idx % self.width,
        }
    }

    /// Voisinage de roi (8 voisins). Un numéro n'est jamais adjacent à lui-même.
    pub fn are_adjacent(&self, a: u8, b: u8) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        let (pa, pb) = (self.position(a), self.position(b));
        pa.row.abs_diff(pb.row) <= 1 && pa.col.abs_diff(pb.col) <= 1
    }

    /// Voisinage orthogonal (4 voisins).
    pub fn are_orthogonal(&self, a: u8, b: u8) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let (pa, pb) = (self.position(a), self.position(b));
        (pa.row == pb.row && pa.col.abs_diff(pb.col) == 1)
            || (pa.col == pb.col && pa.row.abs_diff(pb.row) == 1)
    }

    pub fn neighbors(&self, n: u8) -> Vec<u8> {
        (1..=self.max).filter(|&m| self.are_adjacent(n, m)).collect()
    }

    /// Signature binaire de la forme : une chaîne de 0/1 par ligne, séparées par `|`.
    pub fn shape_signature(&self, numbers: &[u8]) -> String {
        let mut cells = vec![vec!['0'; self.width as usize]; self.rows() as usize];
        for &n in numbers.iter().filter(|&&n| self.contains(n)) {
            let pos = self.position(n);
            cells[pos.row as usize][pos.col as usize] = '1';
        }
        cells
            .iter()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn spatial_patterns(&self, numbers: &[u8]) -> SpatialPatterns {
        let coords: Vec<GridPosition> = numbers
            .iter()
            .filter(|&&n| self.contains(n))
            .map(|&n| self.position(n))
            .collect();
        let last_col = self.width - 1;
        let last_row = self.rows().saturating_sub(1);

        let mut horizontal = 0;
        let mut vertical = 0;
        let mut diagonal = 0;
        let mut symmetry_lr = true;
        let mut symmetry_tb = true;

        for p in &coords {
            if coords.iter().any(|c| c.row == p.row && c.col.abs_diff(p.col) == 1) {
                horizontal += 1;
            }
            if coords.iter().any(|c| c.col == p.col && c.row.abs_diff(p.row) == 1) {
                vertical += 1;
            }
            if coords.iter().any(|c| c.row.abs_diff(p.row) == 1 && c.col.abs_diff(p.col) == 1) {
                diagonal += 1;
            }
            if !coords.iter().any(|c| c.row == p.row && c.col == last_col - p.col) {
                symmetry_lr = false;
            }
            if !coords.iter().any(|c| c.col == p.col && c.row == last_row - p.row) {
                symmetry_tb = false;
            }
        }

        SpatialPatterns {
            horizontal_streaks: horizontal / 2,
            vertical_streaks: vertical / 2,
            diagonal_streaks: diagonal / 2,
            symmetry_lr,
            symmetry_tb,
        }
    }

    /// Carte de chaleur lignes × colonnes à partir de fréquences indexées par numéro.
    pub fn heatmap(&self, frequency: &[u32]) -> Vec<Vec<u32>> {
        (0..self.rows())
            .map(|r| {
                (0..self.width)
                    .map(|c| {
                        let n = r as usize * self.width as usize + c as usize + 1;
                        frequency.get(n).copied().unwrap_or(0)
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpatialPatterns {
    pub horizontal_streaks: usize,
    pub vertical_streaks: usize,
    pub diagonal_streaks: usize,
    pub symmetry_lr: bool,
    pub symmetry_tb: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position() {
        let grid = GridTopology::default();
        assert_eq!(grid.position(1), GridPosition { row: 0, col: 0 });
        assert_eq!(grid.position(7), GridPosition { row: 0, col: 6 });
        assert_eq!(grid.position(8), GridPosition { row: 1, col: 0 });
        assert_eq!(grid.position(49), GridPosition { row: 6, col: 6 });
    }

    #[test]
    fn test_adjacency() {
        let grid = GridTopology::default();
        assert!(grid.are_adjacent(17, 9), "diagonale");
        assert!(grid.are_adjacent(17, 18), "même ligne");
        assert!(grid.are_adjacent(17, 10), "même colonne");
        assert!(!grid.are_adjacent(17, 17));
        assert!(!grid.are_adjacent(7, 8), "fin de ligne / début de ligne suivante");
        assert!(!grid.are_adjacent(17, 19));
    }

    #[test]
    fn test_orthogonal() {
        let grid = GridTopology::default();
        assert!(grid.are_orthogonal(17, 18));
        assert!(grid.are_orthogonal(17, 10));
        assert!(!grid.are_orthogonal(17, 9), "la diagonale n'est pas orthogonale");
        assert!(!grid.are_orthogonal(17, 17));
    }

    #[test]
    fn test_neighbors() {
        let grid = GridTopology::default();
        assert_eq!(grid.neighbors(1), vec![2, 8, 9]);
        assert_eq!(grid.neighbors(25).len(), 8);
        for n in 1..=49 {
            for m in grid.neighbors(n) {
                assert!(grid.neighbors(m).contains(&n), "l'adjacence doit être symétrique");
            }
        }
    }

    #[test]
    fn test_shape_signature() {
        let grid = GridTopology::default();
        let sig = grid.shape_signature(&[1, 9, 49]);
        let rows: Vec<&str> = sig.split('|').collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0], "1000000");
        assert_eq!(rows[1], "0100000");
        assert_eq!(rows[6], "0000001");
    }

    #[test]
    fn test_spatial_patterns() {
        let grid = GridTopology::default();
        let p = grid.spatial_patterns(&[1, 2, 8]);
        assert_eq!(p.horizontal_streaks, 1);
        assert_eq!(p.vertical_streaks, 1);
        assert_eq!(p.diagonal_streaks, 1);
        assert!(!p.symmetry_lr);

        let sym = grid.spatial_patterns(&[1, 7, 43, 49]);
        assert!(sym.symmetry_lr);
        assert!(sym.symmetry_tb);
    }

    #[test]
    fn test_heatmap() {
        let grid = GridTopology::default();
        let mut freq = vec![0u32; 50];
        freq[1] = 3;
        freq[49] = 5;
        let map = grid.heatmap(&freq);
        assert_eq!(map.len(), 7);
        assert_eq!(map[0][0], 3);
        assert_eq!(map[6][6], 5);
    }
}
