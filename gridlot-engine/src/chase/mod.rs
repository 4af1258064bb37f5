//! Simulateur de chasses : un passage du plus ancien au plus récent tirage, des
//! paris actifs semés par les clusters ou les origines de graines, une
//! progression de mises et une règle de remise à zéro globale.

pub mod benchmark;
pub mod hubs;
pub mod stakes;
pub mod sweep;
pub mod window;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use gridlot_db::models::Draw;

use crate::clusters::{Operation, detect_isolated_clusters, detect_seed_origins};
use crate::grid::GridTopology;

pub use stakes::StakeProgression;

/// Ce que l'on chasse à partir d'un tirage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// Les deux prédictions d'un cluster isolé.
    #[value(name = "clusters")]
    IsolatedClusters,
    /// La graine [M, s1, s2] d'une origine.
    #[value(name = "seeds")]
    SeedOrigins,
    /// La paire (A, B) d'une origine.
    #[value(name = "pairs")]
    SeedPairs,
}

impl TargetSource {
    pub fn target_size(&self) -> usize {
        match self {
            TargetSource::IsolatedClusters | TargetSource::SeedPairs => 2,
            TargetSource::SeedOrigins => 3,
        }
    }
}

impl std::fmt::Display for TargetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetSource::IsolatedClusters => write!(f, "clusters"),
            TargetSource::SeedOrigins => write!(f, "graines"),
            TargetSource::SeedPairs => write!(f, "paires"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ResetRule {
    None,
    /// Recette ≥ encours des survivants × (1 + marge).
    BreakevenPlus { margin: f64 },
    /// PnL de session (depuis la dernière remise à zéro) ≥ seuil.
    SessionProfit { threshold: f64 },
    /// Bénéfice du tirage ≥ fraction de l'encours avant mises.
    Yield { fraction: f64 },
}

impl std::fmt::Display for ResetRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetRule::None => write!(f, "aucune"),
            ResetRule::BreakevenPlus { margin } => write!(f, "breakeven+{:.0}%", margin * 100.0),
            ResetRule::SessionProfit { threshold } => write!(f, "session≥{threshold}"),
            ResetRule::Yield { fraction } => write!(f, "rendement≥{:.0}%", fraction * 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResetKind {
    None,
    Breakeven,
    Session,
    Yield,
}

impl ResetKind {
    /// Valeur retenue quand `--reset-value` est omis.
    pub fn default_value(self) -> f64 {
        match self {
            ResetKind::None => 0.0,
            ResetKind::Breakeven | ResetKind::Yield => 0.5,
            ResetKind::Session => 100.0,
        }
    }

    pub fn into_rule(self, value: f64) -> ResetRule {
        match self {
            ResetKind::None => ResetRule::None,
            ResetKind::Breakeven => ResetRule::BreakevenPlus { margin: value },
            ResetKind::Session => ResetRule::SessionProfit { threshold: value },
            ResetKind::Yield => ResetRule::Yield { fraction: value },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    pub stakes: StakeProgression,
    pub odds: f64,
    pub required_hits: usize,
    pub max_steps: usize,
    pub reset: ResetRule,
    pub source: TargetSource,
    /// Ne garder que les `top_n` premières cibles détectées par tirage.
    pub top_n: Option<usize>,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            stakes: StakeProgression::Staggered,
            odds: 11.5,
            required_hits: 2,
            max_steps: 27,
            reset: ResetRule::BreakevenPlus { margin: 0.5 },
            source: TargetSource::IsolatedClusters,
            top_n: None,
        }
    }
}

impl ChaseConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(cap) = self.stakes.capacity() {
            if cap == 0 {
                bail!("Progression de mises vide");
            }
            if self.max_steps > cap {
                bail!("max_steps ({}) dépasse la longueur de la progression ({cap})", self.max_steps);
            }
        }
        if self.max_steps == 0 {
            bail!("max_steps doit être > 0");
        }
        if self.odds.is_nan() || self.odds <= 0.0 {
            bail!("Cote invalide : {} (doit être > 0)", self.odds);
        }
        let size = self.source.target_size();
        if self.required_hits == 0 || self.required_hits > size {
            bail!(
                "required_hits ({}) hors de [1, {size}] pour la source {}",
                self.required_hits,
                self.source
            );
        }
        Ok(())
    }

    pub fn label(&self) -> String {
        let top = self.top_n.map(|n| format!(" top{n}")).unwrap_or_default();
        format!(
            "{} {}×{} @{} {}≥{}{top}",
            self.source, self.stakes, self.max_steps, self.odds, self.reset, self.required_hits
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaseOrigin {
    /// Index chronologique (0 = plus ancien) du tirage d'origine.
    pub draw_index: usize,
    pub hub: u8,
    pub operation: Operation,
}

/// Cible détectée dans un tirage, avant déduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaseTarget {
    pub numbers: Vec<u8>,
    pub hub: u8,
    pub operation: Operation,
}

/// Cibles d'un tirage selon la source, dans l'ordre de détection.
pub fn detect_targets(numbers: &[u8], grid: &GridTopology, source: TargetSource) -> Vec<ChaseTarget> {
    match source {
        TargetSource::IsolatedClusters => detect_isolated_clusters(numbers, grid)
            .into_iter()
            .map(|c| ChaseTarget {
                numbers: c.predictions.to_vec(),
                hub: c.middle,
                operation: c.operation,
            })
            .collect(),
        TargetSource::SeedOrigins => detect_seed_origins(numbers, grid)
            .into_iter()
            .map(|s| ChaseTarget {
                numbers: s.seed.to_vec(),
                hub: s.middle,
                operation: s.operation,
            })
            .collect(),
        TargetSource::SeedPairs => detect_seed_origins(numbers, grid)
            .into_iter()
            .map(|s| ChaseTarget {
                numbers: s.pair.to_vec(),
                hub: s.middle,
                operation: s.operation,
            })
            .collect(),
    }
}

#[derive(Debug, Clone)]
struct ActiveChase {
    target: Vec<u8>,
    origin: ChaseOrigin,
    step: usize,
    /// Encours depuis la dernière remise à zéro.
    spent: f64,
    /// Total misé sur toute la vie de la chasse.
    invested: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaseOutcome {
    Won,
    Expired,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaseRecord {
    pub target: Vec<u8>,
    pub origin: ChaseOrigin,
    /// Index chronologique du dernier tirage misé (`None` si jamais misé).
    pub closed_at: Option<usize>,
    pub invested: f64,
    pub revenue: f64,
    pub outcome: ChaseOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChaseSummary {
    pub draws: usize,
    pub total_investment: f64,
    pub total_revenue: f64,
    pub net_profit: f64,
    pub roi: f64,
    pub wins: usize,
    pub losses: usize,
    pub resets: usize,
    pub max_drawdown: f64,
    pub final_capital: f64,
    pub win_rate: f64,
    pub still_active: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaseReport {
    pub config: ChaseConfig,
    pub summary: ChaseSummary,
    /// Capital après chaque tirage.
    pub equity: Vec<f64>,
    /// Chasses closes puis chasses encore actives.
    pub ledger: Vec<ChaseRecord>,
}

pub struct ChaseSimulator {
    config: ChaseConfig,
    stakes: Vec<f64>,
    grid: GridTopology,
}

impl ChaseSimulator {
    pub fn new(config: ChaseConfig) -> Result<Self> {
        config.validate()?;
        let stakes = config.stakes.sequence(config.max_steps).into_iter().map(|s| s as f64).collect();
        Ok(Self {
            config,
            stakes,
            grid: GridTopology::default(),
        })
    }

    pub fn with_grid(mut self, grid: GridTopology) -> Self {
        self.grid = grid;
        self
    }

    pub fn config(&self) -> &ChaseConfig {
        &self.config
    }

    /// `draws` du plus récent au plus ancien.
    pub fn run(&self, draws: &[Draw]) -> ChaseReport {
        let cfg = &self.config;
        let mut active: Vec<ActiveChase> = Vec::new();
        let mut ledger: Vec<ChaseRecord> = Vec::new();
        let mut s = ChaseSummary::default();
        let mut capital = 0.0;
        let mut session = 0.0;
        let mut equity = Vec::with_capacity(draws.len());

        for (t, draw) in draws.iter().rev().enumerate() {
            let at_risk_before: f64 = active.iter().map(|c| c.spent).sum();
            let mut investment = 0.0;
            let mut revenue = 0.0;

            let mut survivors = Vec::with_capacity(active.len());
            for mut chase in active.drain(..) {
                let stake = self.stakes[chase.step];
                investment += stake;
                chase.spent += stake;
                chase.invested += stake;

                let hits = chase.target.iter().filter(|&&n| draw.contains(n)).count();
                if hits >= cfg.required_hits {
                    let payout = stake * cfg.odds;
                    revenue += payout;
                    s.wins += 1;
                    ledger.push(record(chase, t, payout, ChaseOutcome::Won));
                    continue;
                }
                chase.step += 1;
                if chase.step >= cfg.max_steps {
                    s.losses += 1;
                    log::debug!("Chasse {:?} expirée au tirage {t}", chase.target);
                    ledger.push(record(chase, t, 0.0, ChaseOutcome::Expired));
                    continue;
                }
                survivors.push(chase);
            }
            active = survivors;

            s.total_investment += investment;
            s.total_revenue += revenue;
            capital += revenue - investment;
            if capital < s.max_drawdown {
                s.max_drawdown = capital;
            }
            session += revenue - investment;

            let outstanding: f64 = active.iter().map(|c| c.spent).sum();
            let reset = match cfg.reset {
                ResetRule::None => false,
                ResetRule::BreakevenPlus { margin } => {
                    revenue > 0.0 && !active.is_empty() && revenue >= outstanding * (1.0 + margin)
                }
                ResetRule::SessionProfit { threshold } => session >= threshold,
                ResetRule::Yield { fraction } => revenue > 0.0 && revenue - investment >= at_risk_before * fraction,
            };
            if reset {
                for chase in &mut active {
                    chase.step = 0;
                    chase.spent = 0.0;
                }
                session = 0.0;
                s.resets += 1;
                log::debug!("Remise à zéro au tirage {t} ({} chasses actives)", active.len());
            }

            equity.push(capital);

            let mut targets = detect_targets(&draw.numbers, &self.grid, cfg.source);
            if let Some(n) = cfg.top_n {
                targets.truncate(n);
            }
            for target in targets {
                if active.iter().any(|c| c.target == target.numbers) {
                    continue;
                }
                active.push(ActiveChase {
                    target: target.numbers,
                    origin: ChaseOrigin {
                        draw_index: t,
                        hub: target.hub,
                        operation: target.operation,
                    },
                    step: 0,
                    spent: 0.0,
                    invested: 0.0,
                });
            }
        }

        s.draws = draws.len();
        s.still_active = active.len();
        s.net_profit = s.total_revenue - s.total_investment;
        s.roi = if s.total_investment > 0.0 { s.net_profit / s.total_investment * 100.0 } else { 0.0 };
        s.final_capital = capital;
        let closed = s.wins + s.losses;
        s.win_rate = if closed > 0 { s.wins as f64 / closed as f64 * 100.0 } else { 0.0 };

        for chase in active {
            let closed_at = (chase.invested > 0.0).then(|| draws.len() - 1);
            ledger.push(ChaseRecord {
                target: chase.target,
                origin: chase.origin,
                closed_at,
                invested: chase.invested,
                revenue: 0.0,
                outcome: ChaseOutcome::Active,
            });
        }

        ChaseReport {
            config: cfg.clone(),
            summary: s,
            equity,
            ledger,
        }
    }
}

fn record(chase: ActiveChase, t: usize, revenue: f64, outcome: ChaseOutcome) -> ChaseRecord {
    ChaseRecord {
        target: chase.target,
        origin: chase.origin,
        closed_at: Some(t),
        invested: chase.invested,
        revenue,
        outcome,
    }
}
