use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use gridlot_db::db;

use gridlot_engine::analysis::analyze_lottery_data;
use gridlot_engine::chase::benchmark::run_benchmark;
use gridlot_engine::chase::hubs::hub_performance;
use gridlot_engine::chase::sweep::{generate_grid, run_sweep};
use gridlot_engine::chase::window::run_fixed_windows;
use gridlot_engine::chase::{ChaseSimulator, ResetKind, StakeProgression, TargetSource};
use gridlot_engine::config::{EngineConfig, DEFAULT_CONFIG_PATH};
use gridlot_engine::display;
use gridlot_engine::plugins::builtin_analyzers;
use gridlot_engine::report::AnalysisReport;

#[derive(Parser)]
#[command(name = "gridlot-engine", about = "Analyse de motifs sur grille 7×7 et simulateur de chasses")]
struct Cli {
    /// Configuration JSON (valeurs par défaut si absente)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rapport complet : numéros, paires, banquières, chasses, HMM, signaux, backtest
    Analyze {
        /// Ne garder que les N derniers tirages (0 = tout l'historique)
        #[arg(long, default_value = "0")]
        window: u32,
        #[arg(long, default_value = "10")]
        top: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Sauvegarder le rapport (et faire le bilan du précédent)
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Clusters isolés et origines de graines des derniers tirages
    Clusters {
        #[arg(long, default_value = "10")]
        last: usize,
    },
    /// Une simulation de chasse
    Simulate {
        #[arg(long)]
        source: Option<TargetSource>,
        /// fibonacci, classic, repeated, doubled, staggered ou liste « 1,2,4 »
        #[arg(long)]
        stakes: Option<StakeProgression>,
        #[arg(long)]
        odds: Option<f64>,
        #[arg(long)]
        hits: Option<usize>,
        #[arg(long)]
        max_steps: Option<usize>,
        #[arg(long)]
        reset: Option<ResetKind>,
        #[arg(long)]
        reset_value: Option<f64>,
        #[arg(long)]
        top_n: Option<usize>,
        /// Afficher la courbe de capital
        #[arg(long)]
        chart: bool,
    },
    /// Balayage parallèle progressions × remises à zéro × cotes × sources
    Sweep {
        #[arg(short, long, default_value = "gridlot_sweep.json")]
        output: String,
        #[arg(long, default_value = "20")]
        top: usize,
    },
    /// Chasses indépendantes sur fenêtres fixes
    Window {
        #[arg(long, value_delimiter = ',', default_value = "5,8,12")]
        lengths: Vec<usize>,
        #[arg(long, default_value = "5.7")]
        odds: f64,
        #[arg(long, default_value = "2")]
        hits: usize,
    },
    /// Taux de sortie des origines de graines en 5/10/15/20 tirages
    Benchmark {
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        step: Option<usize>,
        #[arg(long)]
        skip: Option<usize>,
    },
    /// Performance des chasses par pivot
    Hubs {
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = EngineConfig::load(&cli.config)?;

    let db_path = db::db_path();
    let conn = db::open_db(&db_path)?;
    db::migrate(&conn)?;

    let draw_count = db::count_draws(&conn)?;
    if draw_count == 0 {
        anyhow::bail!("Aucun tirage en base. Importez d'abord avec gridlot import.");
    }

    let draws = db::fetch_last_draws(&conn, draw_count)?;
    println!("{} tirages chargés", draws.len());
    log::info!("Historique chargé depuis {}", db_path.display());

    let grid = config.analysis.grid();

    match cli.command {
        Command::Analyze { window, top, seed, save } => {
            if let Some(seed) = seed {
                config.analysis.seed = seed;
            }
            let used = if window > 0 { &draws[..draws.len().min(window as usize)] } else { &draws[..] };
            let analyzers = builtin_analyzers(grid);
            let Some(analysis) = analyze_lottery_data(used, &config.analysis, &analyzers) else {
                anyhow::bail!("Historique vide");
            };
            display::display_analysis(&analysis, top);

            if let Some(path) = save {
                if let Some(previous) = AnalysisReport::load(&path)? {
                    display::display_review(&previous.review(&draws));
                }
                AnalysisReport::from_analysis(&analysis, &used[0], top).save(&path)?;
                println!("\nRapport sauvegardé dans {}", path.display());
            }
        }
        Command::Clusters { last } => {
            display::display_clusters(&draws, &grid, last);
        }
        Command::Simulate {
            source,
            stakes,
            odds,
            hits,
            max_steps,
            reset,
            reset_value,
            top_n,
            chart,
        } => {
            let chase = &mut config.chase;
            if let Some(source) = source {
                chase.source = source;
            }
            if let Some(stakes) = stakes {
                chase.stakes = stakes;
            }
            if let Some(odds) = odds {
                chase.odds = odds;
            }
            if let Some(hits) = hits {
                chase.required_hits = hits;
            }
            if let Some(max_steps) = max_steps {
                chase.max_steps = max_steps;
            }
            if let Some(kind) = reset {
                chase.reset = kind.into_rule(reset_value.unwrap_or(kind.default_value()));
            }
            if top_n.is_some() {
                chase.top_n = top_n;
            }

            let report = ChaseSimulator::new(config.chase.clone())?.with_grid(grid).run(&draws);
            display::display_chase_report(&report);
            if chart {
                display::display_equity_chart(&report.equity);
            }
        }
        Command::Sweep { output, top } => {
            let configs = generate_grid();
            println!("{} configurations à évaluer", configs.len());
            let results = run_sweep(&draws, &configs, &grid, &output)?;
            display::display_sweep_top(&results, top);
            println!("\nMeilleure configuration : {}", results.best_config.label());
        }
        Command::Window { lengths, odds, hits } => {
            let results = run_fixed_windows(&draws, &lengths, odds, hits, &grid)?;
            display::display_windows(&results);
        }
        Command::Benchmark { window, step, skip } => {
            let bench = &mut config.benchmark;
            if let Some(window) = window {
                bench.window = window;
            }
            if let Some(step) = step {
                bench.step = step;
            }
            if let Some(skip) = skip {
                bench.skip = skip;
            }
            let report = run_benchmark(&draws, &config.benchmark, &grid);
            display::display_benchmark(&report);
        }
        Command::Hubs { top } => {
            let report = ChaseSimulator::new(config.chase.clone())?.with_grid(grid).run(&draws);
            println!("Simulation : {}", report.config.label());
            display::display_hubs(&hub_performance(&report.ledger), top);
        }
    }

    Ok(())
}
