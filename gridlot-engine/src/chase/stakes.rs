use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Progression des mises d'une chasse, pas par pas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeProgression {
    /// 1, 2, 3, 5, 8, …
    Fibonacci,
    /// 1, 1, 2, 3, 5, …
    ClassicFibonacci,
    /// 1, 2, 3 puis chaque terme suivant deux fois : 5, 5, 8, 8, …
    Repeated,
    /// 1, 1, 2, 2, 3, 3, 5, 5, …
    Doubled,
    /// 2, 2, 3, 5, 5, 8, 13, 13, … (un terme sur deux répété)
    #[default]
    Staggered,
    Custom(Vec<u64>),
}

/// Suite de Fibonacci démarrant à (a, b), `len` termes.
fn fib_from(a: u64, b: u64, len: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(len);
    let (mut x, mut y) = (a, b);
    while out.len() < len {
        out.push(x);
        (x, y) = (y, x.saturating_add(y));
    }
    out
}

impl StakeProgression {
    /// Les `len` premières mises. `Custom` renvoie au plus ses propres valeurs.
    pub fn sequence(&self, len: usize) -> Vec<u64> {
        match self {
            StakeProgression::Fibonacci => fib_from(1, 2, len),
            StakeProgression::ClassicFibonacci => fib_from(1, 1, len),
            StakeProgression::Repeated => {
                let base = fib_from(1, 2, len + 3);
                let mut out: Vec<u64> = base.iter().take(3).copied().collect();
                for &v in &base[3..] {
                    out.extend([v, v]);
                }
                out.truncate(len);
                out
            }
            StakeProgression::Doubled => fib_from(1, 2, len.div_ceil(2))
                .into_iter()
                .flat_map(|v| [v, v])
                .take(len)
                .collect(),
            StakeProgression::Staggered => {
                let base = fib_from(2, 3, len);
                let mut out = Vec::with_capacity(len + len / 2);
                for (i, &v) in base.iter().enumerate() {
                    out.push(v);
                    if i % 2 == 0 {
                        out.push(v);
                    }
                }
                out.truncate(len);
                out
            }
            StakeProgression::Custom(values) => values.iter().take(len).copied().collect(),
        }
    }

    /// Nombre maximal de pas disponibles (illimité pour les suites générées).
    pub fn capacity(&self) -> Option<usize> {
        match self {
            StakeProgression::Custom(values) => Some(values.len()),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            StakeProgression::Fibonacci => "fibonacci".to_string(),
            StakeProgression::ClassicFibonacci => "classic".to_string(),
            StakeProgression::Repeated => "repeated".to_string(),
            StakeProgression::Doubled => "doubled".to_string(),
            StakeProgression::Staggered => "staggered".to_string(),
            StakeProgression::Custom(values) => values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl std::fmt::Display for StakeProgression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `fibonacci`, `classic`, `repeated`, `doubled`, `staggered` ou une liste `1,2,4,8`.
impl FromStr for StakeProgression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fibonacci" | "fib" => Ok(StakeProgression::Fibonacci),
            "classic" | "classic-fibonacci" => Ok(StakeProgression::ClassicFibonacci),
            "repeated" => Ok(StakeProgression::Repeated),
            "doubled" => Ok(StakeProgression::Doubled),
            "staggered" => Ok(StakeProgression::Staggered),
            other => other
                .split(',')
                .map(|v| v.trim().parse::<u64>().map_err(|e| format!("mise invalide '{v}' : {e}")))
                .collect::<Result<Vec<_>, _>>()
                .map(StakeProgression::Custom),
        }
    }
}
