use gridlot_db::models::{Draw, NumberRange, NumberStats};

/// Fréquence et retard de chaque numéro de la plage. `draws[0]` est le plus récent :
/// le retard est l'index de la dernière sortie, ou la taille de la fenêtre si absent.
pub fn compute_stats(draws: &[Draw], range: NumberRange) -> Vec<NumberStats> {
    let mut stats: Vec<NumberStats> = range
        .iter()
        .map(|n| NumberStats {
            number: n,
            frequency: 0,
            gap: draws.len() as u32,
        })
        .collect();

    for (i, draw) in draws.iter().enumerate() {
        for &n in &draw.numbers {
            if !range.contains(n) {
                continue;
            }
            let stat = &mut stats[range.index_of(n)];
            if stat.frequency == 0 {
                stat.gap = i as u32;
            }
            stat.frequency += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_stats() {
        let draws = vec![
            Draw::new(3, vec![1, 2, 3]),
            Draw::new(2, vec![3, 4, 5]),
            Draw::new(1, vec![1, 6, 7]),
        ];
        let stats = compute_stats(&draws, NumberRange::default());
        assert_eq!(stats.len(), 49);

        assert_eq!(stats[0].frequency, 2);
        assert_eq!(stats[0].gap, 0, "1 est sorti au dernier tirage");
        assert_eq!(stats[3].frequency, 1);
        assert_eq!(stats[3].gap, 1);
        assert_eq!(stats[6].gap, 2);
        assert_eq!(stats[48].frequency, 0);
        assert_eq!(stats[48].gap, 3, "jamais sorti : taille de la fenêtre");
    }

    #[test]
    fn test_compute_stats_wider_range() {
        let draws = vec![Draw::new(2, vec![55, 59]), Draw::new(1, vec![1, 55])];
        let stats = compute_stats(&draws, NumberRange { min: 1, max: 59 });
        assert_eq!(stats.len(), 59);
        assert_eq!(stats[54].number, 55);
        assert_eq!(stats[54].frequency, 2);
        assert_eq!(stats[58].gap, 0);
        assert_eq!(stats[0].gap, 1);
    }
}
