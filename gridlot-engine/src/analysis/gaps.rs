use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapStatus {
    NeverAppeared,
    Overdue,
    Normal,
}

impl std::fmt::Display for GapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapStatus::NeverAppeared => write!(f, "JAMAIS"),
            GapStatus::Overdue => write!(f, "EN RETARD"),
            GapStatus::Normal => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GapStats {
    pub number: u8,
    pub appearances: Vec<usize>,
    pub gaps: Vec<usize>,
    pub weeks_since_last: Option<usize>,
    pub avg_gap: Option<f64>,
    pub std_dev: Option<f64>,
    /// Infini si le numéro n'est jamais sorti.
    pub due_score: f64,
    pub status: GapStatus,
}

impl GapStats {
    /// `appearances` : index 1-based croissants, `total` : nombre de tirages.
    pub fn compute(number: u8, appearances: Vec<usize>, total: usize, overdue_threshold: f64) -> Self {
        let Some(&last) = appearances.last() else {
            return Self {
                number,
                appearances,
                gaps: Vec::new(),
                weeks_since_last: None,
                avg_gap: None,
                std_dev: None,
                due_score: f64::INFINITY,
                status: GapStatus::NeverAppeared,
            };
        };

        let wsl = total.saturating_sub(last);
        let gaps = gaps_from_appearances(&appearances);
        if gaps.is_empty() {
            // Une seule sortie : pas de moyenne, échelle arbitraire de 3 tirages
            return Self {
                number,
                appearances,
                gaps,
                weeks_since_last: Some(wsl),
                avg_gap: None,
                std_dev: None,
                due_score: wsl as f64 / 3.0,
                status: GapStatus::Normal,
            };
        }

        let (avg, sd) = mean_and_std(&gaps);
        let status = if wsl as f64 >= avg * overdue_threshold {
            GapStatus::Overdue
        } else {
            GapStatus::Normal
        };
        Self {
            number,
            appearances,
            gaps,
            weeks_since_last: Some(wsl),
            avg_gap: Some(avg),
            std_dev: Some(sd),
            due_score: wsl as f64 / avg,
            status,
        }
    }

    pub fn appearance_count(&self) -> usize {
        self.appearances.len()
    }
}

pub fn gaps_from_appearances(appearances: &[usize]) -> Vec<usize> {
    appearances.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Inverse de [`gaps_from_appearances`].
pub fn reconstruct_appearances(first: usize, gaps: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(gaps.len() + 1);
    out.push(first);
    let mut cur = first;
    for &g in gaps {
        cur += g;
        out.push(cur);
    }
    out
}

/// Moyenne et écart-type (population).
pub fn mean_and_std(values: &[usize]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_round_trip() {
        let apps = vec![2, 5, 6, 11, 20];
        let gaps = gaps_from_appearances(&apps);
        assert_eq!(gaps, vec![3, 1, 5, 9]);
        assert_eq!(reconstruct_appearances(apps[0], &gaps), apps);
    }

    #[test]
    fn test_overdue_status() {
        // gaps 2,2 => moyenne 2 ; dernier à 5 sur 10 => wsl 5 >= 2*1.5
        let g = GapStats::compute(7, vec![1, 3, 5], 10, 1.5);
        assert_eq!(g.status, GapStatus::Overdue);
        assert_eq!(g.weeks_since_last, Some(5));
        assert!((g.avg_gap.unwrap() - 2.0).abs() < 1e-9);
        assert!((g.due_score - 2.5).abs() < 1e-9);
        assert_eq!(g.std_dev, Some(0.0));
    }

    #[test]
    fn test_single_and_never() {
        let single = GapStats::compute(3, vec![4], 10, 1.5);
        assert_eq!(single.status, GapStatus::Normal);
        assert!(single.avg_gap.is_none());
        assert!((single.due_score - 2.0).abs() < 1e-9);

        let never = GapStats::compute(3, vec![], 10, 1.5);
        assert_eq!(never.status, GapStatus::NeverAppeared);
        assert!(never.due_score.is_infinite());
        assert!(never.weeks_since_last.is_none());
    }

    #[test]
    fn test_mean_and_std() {
        let (m, sd) = mean_and_std(&[2, 4, 4, 4, 5, 5, 7, 9]);
        assert!((m - 5.0).abs() < 1e-9);
        assert!((sd - 2.0).abs() < 1e-9);
        assert_eq!(mean_and_std(&[]), (0.0, 0.0));
    }
}
