use gridlot_db::models::{Draw, NumberRange};

/// Vue chronologique (du plus ancien au plus récent) d'un historique, avec une
/// matrice de présence dense. Les index d'apparition exposés sont 1-based.
pub struct History<'a> {
    draws: Vec<&'a Draw>,
    range: NumberRange,
    presence: Vec<Vec<bool>>,
}

impl<'a> History<'a> {
    /// `draws` est fourni du plus récent au plus ancien.
    pub fn new(draws: &'a [Draw], range: NumberRange) -> Self {
        let chrono: Vec<&Draw> = draws.iter().rev().collect();
        let presence = chrono
            .iter()
            .map(|d| {
                let mut row = vec![false; range.size()];
                for &n in d.numbers.iter().filter(|&&n| range.contains(n)) {
                    row[range.index_of(n)] = true;
                }
                row
            })
            .collect();
        Self { draws: chrono, range, presence }
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn range(&self) -> NumberRange {
        self.range
    }

    /// Tirage d'index chronologique `t` (0-based).
    pub fn draw(&self, t: usize) -> &'a Draw {
        self.draws[t]
    }

    pub fn draws(&self) -> &[&'a Draw] {
        &self.draws
    }

    pub fn latest(&self) -> Option<&'a Draw> {
        self.draws.last().copied()
    }

    pub fn present(&self, t: usize, n: u8) -> bool {
        self.range.contains(n) && self.presence[t][self.range.index_of(n)]
    }

    /// Index 1-based des tirages contenant `n`.
    pub fn appearances(&self, n: u8) -> Vec<usize> {
        if !self.range.contains(n) {
            return Vec::new();
        }
        let idx = self.range.index_of(n);
        self.presence
            .iter()
            .enumerate()
            .filter(|(_, row)| row[idx])
            .map(|(t, _)| t + 1)
            .collect()
    }

    pub fn frequency(&self, n: u8) -> usize {
        if !self.range.contains(n) {
            return 0;
        }
        let idx = self.range.index_of(n);
        self.presence.iter().filter(|row| row[idx]).count()
    }

    /// Séquence binaire de présence de `n`, du plus ancien au plus récent.
    pub fn sequence(&self, n: u8) -> Vec<bool> {
        (0..self.len()).map(|t| self.present(t, n)).collect()
    }
}
