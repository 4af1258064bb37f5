pub mod channels;
pub mod ensemble;
pub mod gaps;
pub mod history;
pub mod pairs;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use gridlot_db::models::{Draw, NumberRange};

use crate::backtest::{BacktestConfig, BacktestReport, run_backtest};
use crate::bonds::{Bond, detect_algebraic_bonds, strongest_missing_results};
use crate::clusters::{Cluster, SeedOrigin, detect_isolated_clusters, detect_seed_origins};
use crate::grid::{GRID_WIDTH, GridTopology};
use crate::hmm::{HmmConfig, HmmSummary, fit_history};
use crate::neural::NeuralConfig;
use crate::plugins::{DrawAnalyzer, PluginOutcome, run_analyzers};
use crate::signals::{SignalReport, SignalSettings, compute_signals};

use channels::{DrawSummary, FrequencyEntry, SelfTransition};
use ensemble::{ChannelInputs, ChaseSingle, EnsembleScore};
use gaps::GapStats;
use history::History;
use pairs::{BankerPair, ChaseBanker, ChasePair, HistoricalChaseWin, PairChaseStats, PairPrediction};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub range: NumberRange,
    pub grid_width: u8,
    pub recent_weeks: usize,
    pub overdue_threshold: f64,
    pub hot_threshold: f64,
    pub cold_threshold: f64,
    pub pattern_size: usize,
    /// En dessous, ni capteurs de signal ni backtest.
    pub min_signal_draws: usize,
    /// Graine du HMM et des réseaux.
    pub seed: u64,
    pub signals: SignalSettings,
    pub hmm: HmmConfig,
    pub neural: NeuralConfig,
    pub backtest: BacktestConfig,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            range: NumberRange::default(),
            grid_width: GRID_WIDTH,
            recent_weeks: 3,
            overdue_threshold: 1.5,
            hot_threshold: 0.3,
            cold_threshold: 0.1,
            pattern_size: 3,
            min_signal_draws: 50,
            seed: 42,
            signals: SignalSettings::default(),
            hmm: HmmConfig::default(),
            neural: NeuralConfig::default(),
            backtest: BacktestConfig::default(),
        }
    }
}

impl AnalysisSettings {
    pub fn grid(&self) -> GridTopology {
        GridTopology::new(self.grid_width, self.range.max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LotteryAnalysis {
    pub total_draws: usize,
    pub avg_sum: f64,
    pub frequency: Vec<FrequencyEntry>,
    pub hot_numbers: Vec<u8>,
    pub cold_numbers: Vec<u8>,
    /// Une entrée par numéro de la plage, dans l'ordre croissant.
    pub gaps: Vec<GapStats>,
    pub processed: Vec<DrawSummary>,
    pub markov: Vec<SelfTransition>,
    pub chase_pairs: Vec<ChasePair>,
    pub chase_wins: Vec<HistoricalChaseWin>,
    pub chase_stats: PairChaseStats,
    pub chase_singles: Vec<ChaseSingle>,
    pub ensemble: Vec<EnsembleScore>,
    pub pair_predictions: Vec<PairPrediction>,
    pub banker_pairs: Vec<BankerPair>,
    pub chase_bankers: Vec<ChaseBanker>,
    pub latest_clusters: Vec<Cluster>,
    pub latest_seeds: Vec<SeedOrigin>,
    pub latest_bonds: Vec<Bond>,
    pub missing_results: Vec<(u8, f64)>,
    pub hmm: HmmSummary,
    pub signals: Option<SignalReport>,
    pub backtest: Option<BacktestReport>,
    pub plugins: Vec<PluginOutcome>,
}

const MAX_PAIR_PREDICTIONS: usize = 100;

/// Analyse complète d'un historique (`draws[0]` = tirage le plus récent).
/// `None` si l'historique est vide.
pub fn analyze_lottery_data(
    draws: &[Draw],
    settings: &AnalysisSettings,
    analyzers: &[Box<dyn DrawAnalyzer>],
) -> Option<LotteryAnalysis> {
    let latest = draws.first()?;
    let range = settings.range;
    let grid = settings.grid();
    let h = History::new(draws, range);
    let total = h.len();
    log::info!("Analyse de {total} tirages");

    // Fréquences
    let frequency = channels::frequency_table(&h);
    let ratio = |n: u8| h.frequency(n) as f64 / total as f64;
    let hot_numbers: Vec<u8> = range.iter().filter(|&n| ratio(n) >= settings.hot_threshold).collect();
    let cold_numbers: Vec<u8> = range.iter().filter(|&n| ratio(n) <= settings.cold_threshold).collect();

    let gaps: Vec<GapStats> = range
        .iter()
        .map(|n| GapStats::compute(n, h.appearances(n), total, settings.overdue_threshold))
        .collect();

    let processed = channels::summarize_draws(&h);
    let avg_sum = processed.iter().map(|d| d.sum as f64).sum::<f64>() / total as f64;
    let markov: Vec<SelfTransition> = range.iter().map(|n| channels::self_transition(&h, n)).collect();

    // Paires
    let pair_hist = pairs::pair_history(&h);
    let scan = pairs::scan_chase_pairs(&pair_hist, total);

    // Ensemble
    let chase_singles = ensemble::chase_singles(&gaps);
    let roots = channels::digital_root_scores(&h);
    let mut ensemble: Vec<EnsembleScore> = gaps
        .iter()
        .map(|g| {
            let n = g.number;
            let inputs = ChannelInputs {
                binary: channels::binary_transition_score(&h, n),
                bayesian: channels::bayesian_score(&h, n),
                root: roots[range.index_of(n)],
                pattern: channels::pattern_score(&h, n, settings.pattern_size),
                momentum: channels::momentum(&h, n, settings.recent_weeks),
                urgency: channels::urgency(g.appearance_count(), g.weeks_since_last.unwrap_or(0), total),
            };
            let single = chase_singles.iter().find(|s| s.number == n);
            ensemble::ensemble_score(n, inputs, single)
        })
        .collect();
    ensemble.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut by_number = vec![0.0; range.max as usize + 1];
    for e in &ensemble {
        by_number[e.number as usize] = e.score;
    }
    let mut pair_predictions = pairs::pair_predictions(&pair_hist, total, &by_number);
    pair_predictions.truncate(MAX_PAIR_PREDICTIONS);

    let mut banker_pairs = pairs::banker_pairs(&h, &pair_hist);
    let chase_bankers = pairs::chase_bankers(&mut banker_pairs);

    // Structure du dernier tirage
    let latest_clusters = detect_isolated_clusters(&latest.numbers, &grid);
    let latest_seeds = detect_seed_origins(&latest.numbers, &grid);
    let latest_bonds = detect_algebraic_bonds(&latest.numbers, range.max);
    let missing_results: Vec<(u8, f64)> = strongest_missing_results(draws, 10, range.max).into_iter().take(10).collect();

    // Canaux appris
    let (_, filtered) = fit_history(draws, range.max, &settings.hmm, settings.seed);
    let hmm = match filtered.last() {
        Some(p) => HmmSummary::from_probabilities(p, filtered.len()),
        None => HmmSummary::from_probabilities(&ndarray::Array1::from_elem(3, 1.0 / 3.0), 0),
    };

    let (signals, backtest) = if total >= settings.min_signal_draws {
        let resonant: HashSet<u8> = latest_clusters.iter().flat_map(|c| c.predictions).collect();
        let signals = compute_signals(
            &h,
            &filtered,
            &pair_hist,
            &resonant,
            &settings.signals,
            &settings.neural,
            settings.seed,
        );
        let backtest = run_backtest(&h, &pair_hist, &gaps, &settings.backtest);
        (Some(signals), Some(backtest))
    } else {
        log::info!(
            "{total} tirages < {} : capteurs de signal et backtest ignorés",
            settings.min_signal_draws
        );
        (None, None)
    };

    let plugins = run_analyzers(analyzers, draws);

    Some(LotteryAnalysis {
        total_draws: total,
        avg_sum,
        frequency,
        hot_numbers,
        cold_numbers,
        gaps,
        processed,
        markov,
        chase_pairs: scan.ready,
        chase_wins: scan.wins,
        chase_stats: scan.stats,
        chase_singles,
        ensemble,
        pair_predictions,
        banker_pairs,
        chase_bankers,
        latest_clusters,
        latest_seeds,
        latest_bonds,
        missing_results,
        hmm,
        signals,
        backtest,
        plugins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;
    use crate::plugins::builtin_analyzers;
    use pairs::Confidence;

    fn fast_settings() -> AnalysisSettings {
        AnalysisSettings {
            neural: NeuralConfig { epochs: 2, training_window: 30, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_history() {
        assert!(analyze_lottery_data(&[], &AnalysisSettings::default(), &[]).is_none());
    }

    #[test]
    fn test_small_history_skips_learned_layers() {
        let draws = make_test_draws(20);
        let a = analyze_lottery_data(&draws, &fast_settings(), &[]).unwrap();
        assert_eq!(a.total_draws, 20);
        assert!(a.signals.is_none());
        assert!(a.backtest.is_none());
        assert_eq!(a.gaps.len(), 49);
        assert_eq!(a.processed.len(), 20);
        assert_eq!(a.hmm.observations, 20);
    }

    #[test]
    fn test_full_analysis() {
        let draws = make_test_draws(120);
        let analyzers = builtin_analyzers(GridTopology::default());
        let a = analyze_lottery_data(&draws, &fast_settings(), &analyzers).unwrap();

        assert_eq!(a.ensemble.len(), 49);
        assert!(a.ensemble.windows(2).all(|w| w[0].score >= w[1].score), "ensemble trié");
        assert!(a.ensemble.iter().all(|e| e.score <= 0.99));
        for e in &a.ensemble {
            let expected = Confidence::from_thresholds(e.score, 0.3, 0.15);
            assert_eq!(e.confidence, expected);
        }
        assert!(a.frequency.windows(2).all(|w| w[0].count >= w[1].count));
        assert!(a.pair_predictions.len() <= MAX_PAIR_PREDICTIONS);
        assert!(a.banker_pairs.iter().all(|b| b.reliability <= 99.0 || !b.is_chase));
        assert!(a.signals.is_some());
        assert!(a.backtest.is_some());
        assert_eq!(a.plugins.len(), 4);

        let latest = &draws[0];
        let sum: u32 = latest.numbers.iter().map(|&n| n as u32).sum();
        assert_eq!(a.processed.last().unwrap().sum, sum, "le dernier résumé correspond au dernier tirage");
    }

    #[test]
    fn test_hot_and_cold() {
        // 1 sort à chaque tirage, 2 jamais
        let draws: Vec<Draw> = (0..10u32).map(|i| Draw::new(10 - i, vec![1, 3 + (i % 5) as u8])).collect();
        let a = analyze_lottery_data(&draws, &fast_settings(), &[]).unwrap();
        assert!(a.hot_numbers.contains(&1));
        assert!(a.cold_numbers.contains(&2));
        assert!(!a.hot_numbers.contains(&2));
        let g2 = &a.gaps[1];
        assert_eq!(g2.number, 2);
        assert!(g2.due_score.is_infinite());
    }

    #[test]
    fn test_deterministic_with_seed() {
        let draws = make_test_draws(60);
        let s = fast_settings();
        let a = analyze_lottery_data(&draws, &s, &[]).unwrap();
        let b = analyze_lottery_data(&draws, &s, &[]).unwrap();
        let sa = a.signals.unwrap();
        let sb = b.signals.unwrap();
        for (x, y) in sa.singles.iter().zip(&sb.singles) {
            assert_eq!(x.number, y.number);
            assert_eq!(x.strength, y.strength);
        }
        assert_eq!(a.hmm.state_probabilities, b.hmm.state_probabilities);
    }
}
