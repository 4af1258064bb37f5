use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Un tirage enregistré. Les numéros gardent l'ordre positionnel du tirage :
/// la sélection du pivot d'un cluster en dépend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub draw_id: u32,
    pub date: String,
    pub numbers: Vec<u8>,
}

impl Draw {
    pub fn new(draw_id: u32, numbers: Vec<u8>) -> Self {
        Self {
            draw_id,
            date: String::new(),
            numbers,
        }
    }

    pub fn contains(&self, n: u8) -> bool {
        self.numbers.contains(&n)
    }

    pub fn sorted_numbers(&self) -> Vec<u8> {
        let mut sorted = self.numbers.clone();
        sorted.sort_unstable();
        sorted
    }
}

/// Plage de numéros jouables, bornes incluses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberRange {
    pub min: u8,
    pub max: u8,
}

impl Default for NumberRange {
    fn default() -> Self {
        Self { min: 1, max: 49 }
    }
}

impl NumberRange {
    pub fn size(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    pub fn contains(&self, n: u8) -> bool {
        n >= self.min && n <= self.max
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }

    /// Index 0-based d'un numéro dans la plage (pour les tableaux denses).
    pub fn index_of(&self, n: u8) -> usize {
        (n - self.min) as usize
    }
}

#[derive(Debug, Clone)]
pub struct NumberStats {
    pub number: u8,
    pub frequency: u32,
    pub gap: u32,
}

pub fn validate_draw(numbers: &[u8], range: NumberRange) -> Result<()> {
    if numbers.is_empty() {
        bail!("Tirage vide");
    }
    for &n in numbers {
        if !range.contains(n) {
            bail!("Numéro {} hors limites ({}-{})", n, range.min, range.max);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Numéro en double : {}", numbers[i]);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_draw_ok() {
        let range = NumberRange::default();
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], range).is_ok());
        assert!(validate_draw(&[49, 48, 47], range).is_ok());
    }

    #[test]
    fn test_validate_draw_out_of_range() {
        let range = NumberRange::default();
        assert!(validate_draw(&[0, 2, 3], range).is_err());
        assert!(validate_draw(&[1, 2, 50], range).is_err());
    }

    #[test]
    fn test_validate_draw_duplicate() {
        assert!(validate_draw(&[7, 8, 7], NumberRange::default()).is_err());
    }

    #[test]
    fn test_validate_draw_empty() {
        assert!(validate_draw(&[], NumberRange::default()).is_err());
    }

    #[test]
    fn test_number_range() {
        let range = NumberRange { min: 1, max: 49 };
        assert_eq!(range.size(), 49);
        assert!(range.contains(49));
        assert!(!range.contains(0));
        assert_eq!(range.iter().count(), 49);
        assert_eq!(range.index_of(1), 0);
        assert_eq!(range.index_of(49), 48);
    }

    #[test]
    fn test_draw_helpers() {
        let draw = Draw::new(1, vec![18, 9, 17]);
        assert!(draw.contains(9));
        assert!(!draw.contains(10));
        assert_eq!(draw.sorted_numbers(), vec![9, 17, 18]);
        assert_eq!(draw.numbers, vec![18, 9, 17], "l'ordre positionnel est conservé");
    }
}
