use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use textplots::{Chart, Plot, Shape};

use gridlot_db::models::Draw;

use crate::analysis::LotteryAnalysis;
use crate::analysis::gaps::GapStatus;
use crate::analysis::pairs::{pair_label, Confidence};
use crate::backtest::BacktestReport;
use crate::chase::benchmark::{BenchmarkReport, HIT_WINDOWS};
use crate::chase::hubs::HubStats;
use crate::chase::sweep::SweepResults;
use crate::chase::window::WindowResult;
use crate::chase::ChaseReport;
use crate::clusters::{detect_isolated_clusters, detect_seed_origins};
use crate::grid::GridTopology;
use crate::plugins::PluginOutcome;
use crate::report::ReportReview;
use crate::signals::{SignalPair, SignalReport};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn confidence_cell(c: Confidence) -> Cell {
    let color = match c {
        Confidence::High => Color::Green,
        Confidence::Medium => Color::Yellow,
        Confidence::Low => Color::White,
    };
    Cell::new(c.to_string()).fg(color)
}

fn roi_cell(roi: f64) -> Cell {
    let color = if roi >= 0.0 { Color::Green } else { Color::Red };
    Cell::new(format!("{roi:+.2}%")).fg(color)
}

pub fn format_numbers(numbers: &[u8]) -> String {
    numbers.iter().map(|n| format!("{n:2}")).collect::<Vec<_>>().join(" ")
}

pub fn display_analysis(analysis: &LotteryAnalysis, top: usize) {
    println!("\n== Analyse sur {} tirages (somme moyenne {:.1}) ==", analysis.total_draws, analysis.avg_sum);
    println!("Chauds : {}", format_numbers(&analysis.hot_numbers));
    println!("Froids : {}", format_numbers(&analysis.cold_numbers));

    println!("\n── Top numéros (ensemble) ──");
    let mut table = new_table();
    table.set_header(vec!["#", "Numéro", "Score", "Confiance", "Bonus chasse", "Écart", "Statut"]);
    for (i, e) in analysis.ensemble.iter().take(top).enumerate() {
        let gap = analysis.gaps.iter().find(|g| g.number == e.number);
        let wsl = gap
            .and_then(|g| g.weeks_since_last)
            .map(|w| w.to_string())
            .unwrap_or_else(|| "—".to_string());
        let status = gap.map(|g| g.status);
        let status_cell = match status {
            Some(GapStatus::Overdue) => Cell::new("EN RETARD").fg(Color::Red),
            Some(s) => Cell::new(s.to_string()),
            None => Cell::new("—"),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(e.number),
            Cell::new(format!("{:.4}", e.score)),
            confidence_cell(e.confidence),
            Cell::new(format!("{:.3}", e.chase_bonus)),
            Cell::new(wsl),
            status_cell,
        ]);
    }
    println!("{table}");

    println!("\n── Top paires ──");
    let mut table = new_table();
    table.set_header(vec!["Paire", "Score", "Synergie", "Écart", "Co-sorties", "Confiance"]);
    for p in analysis.pair_predictions.iter().take(top) {
        table.add_row(vec![
            Cell::new(pair_label(p.pair)),
            Cell::new(format!("{:.3}", p.score)),
            Cell::new(format!("{:.3}", p.synergy)),
            Cell::new(format!("{:.2}", p.gap_score)),
            Cell::new(p.correlation),
            confidence_cell(p.confidence),
        ]);
    }
    println!("{table}");

    if !analysis.chase_pairs.is_empty() {
        println!("\n── Paires à chasser (PRÊTES) ──");
        let mut table = new_table();
        table.set_header(vec!["Paire", "Absence", "Écart moyen", "σ", "Dans", "Maturité", "Fiabilité"]);
        for c in analysis.chase_pairs.iter().take(top) {
            table.add_row(vec![
                Cell::new(pair_label(c.pair)),
                Cell::new(c.weeks_since_last),
                Cell::new(format!("{:.1}", c.avg_gap)),
                Cell::new(format!("{:.1}", c.std_dev)),
                Cell::new(c.expected_in),
                Cell::new(format!("{:.2}", c.readiness)),
                Cell::new(format!("{:.1}%", c.reliability * 100.0)),
            ]);
        }
        println!("{table}");
    }
    let s = &analysis.chase_stats;
    println!(
        "Chasses historiques : {} lancées, {} gagnées ({:.1}%), attente moyenne {:.1}",
        s.chases_started, s.wins, s.win_rate, s.avg_wait
    );

    if !analysis.chase_singles.is_empty() {
        println!("\n── Numéros dus ──");
        let mut table = new_table();
        table.set_header(vec!["Numéro", "Absence", "Écart moyen", "Dû", "Dans", "Mult."]);
        for c in analysis.chase_singles.iter().take(top) {
            table.add_row(vec![
                Cell::new(c.number),
                Cell::new(c.weeks_since_last),
                Cell::new(format!("{:.1}", c.avg_gap)),
                Cell::new(format!("{:.2}", c.due_score)),
                Cell::new(c.expected_in),
                Cell::new(format!("{:.1}", c.multiplier)),
            ]);
        }
        println!("{table}");
    }

    println!("\n── Paires banquières ──");
    let mut table = new_table();
    table.set_header(vec!["Paire", "Fiabilité", "Absence", "Urgence", "Score", "Chasse"]);
    for b in analysis.banker_pairs.iter().take(top) {
        let chase = if b.is_chase { Cell::new("OUI").fg(Color::Green) } else { Cell::new("") };
        table.add_row(vec![
            Cell::new(pair_label(b.pair)),
            Cell::new(format!("{:.1}%", b.reliability)),
            Cell::new(b.weeks_since_last_hit),
            Cell::new(format!("{:.2}", b.urgency)),
            Cell::new(format!("{:.1}", b.score)),
            chase,
        ]);
    }
    println!("{table}");

    println!("\n── Dernier tirage ──");
    for c in &analysis.latest_clusters {
        println!(
            "  Cluster {} pivot {} ({}) => {}",
            format_numbers(&c.numbers),
            c.middle,
            c.operation,
            format_numbers(&c.predictions)
        );
    }
    for b in &analysis.latest_bonds {
        println!("  Liaison {} {} {} = {}", b.a, b.kind, b.b, b.result);
    }
    if !analysis.missing_results.is_empty() {
        let missing: Vec<String> = analysis
            .missing_results
            .iter()
            .map(|(n, w)| format!("{n} ({w:.1})"))
            .collect();
        println!("  Résultats manquants : {}", missing.join(", "));
    }

    let h = &analysis.hmm;
    println!(
        "\nHMM : état {} (P = [{:.3}, {:.3}, {:.3}], chaud {:.1}%) sur {} observations",
        h.current_state,
        h.state_probabilities[0],
        h.state_probabilities[1],
        h.state_probabilities[2],
        h.hot_state_probability * 100.0,
        h.observations
    );

    match &analysis.signals {
        Some(s) => display_signals(s, top),
        None => println!("\nCapteurs de signal : historique trop court"),
    }
    if let Some(b) = &analysis.backtest {
        display_backtest(b);
    }
    display_plugins(&analysis.plugins);
}

fn signal_pair_table(title: &str, pairs: &[SignalPair], top: usize) {
    println!("\n── {title} ──");
    let mut table = new_table();
    table.set_header(vec!["Paire", "Force", "Fenêtre", "Résonance"]);
    for p in pairs.iter().take(top) {
        table.add_row(vec![
            Cell::new(pair_label(p.pair)),
            Cell::new(format!("{:.3}", p.strength)),
            Cell::new(format!("{} sem.", p.expected_window)),
            Cell::new(if p.resonance { "●" } else { "" }),
        ]);
    }
    println!("{table}");
}

pub fn display_signals(report: &SignalReport, top: usize) {
    println!(
        "\n== Capteurs de signal ({} échantillons, MSE {:.4}) ==",
        report.training_samples, report.training_mse
    );
    let mut table = new_table();
    table.set_header(vec![
        "Numéro", "Force", "Écart", "Vitesse", "Markov", "Motif", "Algèbre", "Écho", "HMM", "Réseau", "Fenêtre",
    ]);
    for s in report.singles.iter().take(top) {
        let r = &s.sensors;
        let number = if s.resonance {
            Cell::new(format!("{}●", s.number)).fg(Color::Green)
        } else {
            Cell::new(s.number)
        };
        table.add_row(vec![
            number,
            Cell::new(format!("{:.3}", s.strength)),
            Cell::new(format!("{:.2}", r.gap)),
            Cell::new(format!("{:.2}", r.velocity)),
            Cell::new(format!("{:.2}", r.markov)),
            Cell::new(format!("{:.2}", r.pattern)),
            Cell::new(format!("{:.2}", r.algebraic)),
            Cell::new(format!("{:.2}", r.echo)),
            Cell::new(format!("{:.2}", r.hmm)),
            Cell::new(format!("{:.2}", r.neural)),
            Cell::new(format!("{} sem.", s.expected_window)),
        ]);
    }
    println!("{table}");
    signal_pair_table("Banquières (l'un ou l'autre)", &report.bankers, top);
    signal_pair_table("Alphas (les deux)", &report.alphas, top);
}

pub fn display_backtest(report: &BacktestReport) {
    println!("\n== Backtest sur {} semaines ==", report.weeks);
    println!(
        "Ensemble : {}/{} ({:.1}%)   Banquière : {}/{} ({:.1}%)",
        report.ensemble_hits,
        report.ensemble_predictions,
        report.ensemble_hit_rate,
        report.banker_hits,
        report.banker_predictions,
        report.banker_hit_rate
    );
    let mut table = new_table();
    table.set_header(vec!["Stratégie", "Paris", "Gains", "Mise", "Retour", "Net", "ROI", "Réussite"]);
    for s in &report.strategies {
        table.add_row(vec![
            Cell::new(&s.name),
            Cell::new(s.bets),
            Cell::new(s.wins),
            Cell::new(format!("{:.0}", s.investment)),
            Cell::new(format!("{:.1}", s.revenue)),
            Cell::new(format!("{:+.1}", s.net_profit)),
            roi_cell(s.roi),
            Cell::new(format!("{:.1}%", s.success_rate)),
        ]);
    }
    println!("{table}");
}

pub fn display_plugins(outcomes: &[PluginOutcome]) {
    if outcomes.is_empty() {
        return;
    }
    println!("\n== Analyseurs ==");
    for o in outcomes {
        match (&o.result, &o.error) {
            (_, Some(e)) => println!("  {} : ÉCHEC ({e})", o.name),
            (Some(v), None) => {
                let json = serde_json::to_string(v).unwrap_or_default();
                let short: String = json.chars().take(100).collect();
                println!("  {} : {short}", o.name);
            }
            (None, None) => println!("  {} : —", o.name),
        }
    }
}

pub fn display_clusters(draws: &[Draw], grid: &GridTopology, last: usize) {
    println!("\n== Clusters isolés et graines ({} derniers tirages) ==\n", last);
    let mut table = new_table();
    table.set_header(vec!["Tirage", "Numéros", "Clusters", "Graines"]);
    for d in draws.iter().take(last) {
        let clusters: Vec<String> = detect_isolated_clusters(&d.numbers, grid)
            .iter()
            .map(|c| format!("{}⇒{},{} ({})", c.middle, c.predictions[0], c.predictions[1], c.operation))
            .collect();
        let seeds: Vec<String> = detect_seed_origins(&d.numbers, grid)
            .iter()
            .map(|s| {
                let mark = if s.orthogonal { "⊥" } else { "" };
                format!("{}-{}{mark}⇒{}", s.pair[0], s.pair[1], format_numbers(&s.seed))
            })
            .collect();
        table.add_row(vec![
            Cell::new(d.draw_id),
            Cell::new(format_numbers(&d.sorted_numbers())),
            Cell::new(clusters.join("\n")),
            Cell::new(seeds.join("\n")),
        ]);
    }
    println!("{table}");
}

pub fn display_chase_report(report: &ChaseReport) {
    let s = &report.summary;
    println!("\n== Simulation : {} ==\n", report.config.label());
    let mut table = new_table();
    table.set_header(vec!["Métrique", "Valeur"]);
    let rows: Vec<(&str, Cell)> = vec![
        ("Tirages", Cell::new(s.draws)),
        ("Investissement", Cell::new(format!("{:.0}", s.total_investment))),
        ("Retour", Cell::new(format!("{:.1}", s.total_revenue))),
        ("Net", Cell::new(format!("{:+.1}", s.net_profit))),
        ("ROI", roi_cell(s.roi)),
        ("Gains / pertes", Cell::new(format!("{} / {}", s.wins, s.losses))),
        ("Taux de gain", Cell::new(format!("{:.1}%", s.win_rate))),
        ("Remises à zéro", Cell::new(s.resets)),
        ("Drawdown max", Cell::new(format!("{:.1}", s.max_drawdown))),
        ("Capital final", Cell::new(format!("{:+.1}", s.final_capital))),
        ("Chasses actives", Cell::new(s.still_active)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), value]);
    }
    println!("{table}");
}

pub fn display_equity_chart(equity: &[f64]) {
    if equity.len() < 2 {
        println!("  (Pas de données à afficher)");
        return;
    }
    println!("\n── Courbe de capital ──\n");
    let points: Vec<(f32, f32)> = equity.iter().enumerate().map(|(i, &v)| (i as f32, v as f32)).collect();
    let y_min = equity.iter().copied().fold(f64::INFINITY, f64::min) as f32;
    let y_max = equity.iter().copied().fold(f64::NEG_INFINITY, f64::max) as f32;
    let pad = ((y_max - y_min) * 0.05).max(1.0);
    let mut chart = Chart::new_with_y_range(120, 40, 0.0, (equity.len() - 1) as f32, y_min - pad, y_max + pad);
    println!("{}", chart.lineplot(&Shape::Lines(&points)));
}

pub fn display_sweep_top(results: &SweepResults, top_n: usize) {
    println!("\n== Top {} configurations (sur {}) ==\n", top_n, results.results.len());
    let mut table = new_table();
    table.set_header(vec!["#", "Configuration", "Mise", "Net", "ROI", "Gains", "Pertes", "Drawdown"]);
    for (i, r) in results.results.iter().take(top_n).enumerate() {
        let s = &r.summary;
        let rank = if i == 0 { Cell::new(i + 1).fg(Color::Green) } else { Cell::new(i + 1) };
        table.add_row(vec![
            rank,
            Cell::new(&r.label),
            Cell::new(format!("{:.0}", s.total_investment)),
            Cell::new(format!("{:+.1}", s.net_profit)),
            roi_cell(s.roi),
            Cell::new(s.wins),
            Cell::new(s.losses),
            Cell::new(format!("{:.1}", s.max_drawdown)),
        ]);
    }
    println!("{table}");
}

pub fn display_windows(results: &[WindowResult]) {
    println!("\n== Chasses à fenêtre fixe ==\n");
    let mut table = new_table();
    table.set_header(vec!["Fenêtre", "Chasses", "Gains", "Réussite", "Mise", "Retour", "Net", "ROI"]);
    for r in results {
        table.add_row(vec![
            Cell::new(r.length),
            Cell::new(r.chases),
            Cell::new(r.wins),
            Cell::new(format!("{:.1}%", r.success_rate)),
            Cell::new(format!("{:.0}", r.investment)),
            Cell::new(format!("{:.1}", r.revenue)),
            Cell::new(format!("{:+.1}", r.net_profit)),
            roi_cell(r.roi),
        ]);
    }
    println!("{table}");
}

pub fn display_benchmark(report: &BenchmarkReport) {
    println!("\n== Benchmark des fenêtres de sortie ({} tirages échantillonnés) ==\n", report.sampled_draws);
    let mut header = vec!["Cible".to_string(), "Origines".to_string()];
    header.extend(HIT_WINDOWS.iter().map(|w| format!("≤{w}")));
    header.push("Attente moy.".to_string());
    header.push("Médiane".to_string());

    let mut table = new_table();
    table.set_header(header);
    for b in [&report.pair_both, &report.seed_two, &report.seed_three] {
        let mut row = vec![b.label.clone(), b.origins.to_string()];
        row.extend(b.hit_rates.iter().map(|r| format!("{r:.1}%")));
        row.push(b.avg_wait.map(|w| format!("{w:.1}")).unwrap_or_else(|| "—".to_string()));
        row.push(b.median_wait.map(|w| format!("{w:.1}")).unwrap_or_else(|| "—".to_string()));
        table.add_row(row);
    }
    println!("{table}");
}

pub fn display_hubs(stats: &[HubStats], top: usize) {
    println!("\n== Performance par pivot ==\n");
    let mut table = new_table();
    table.set_header(vec!["Opération", "Pivot", "Chasses", "Gains", "Pertes", "Mise", "Retour", "ROI"]);
    for h in stats.iter().take(top) {
        table.add_row(vec![
            Cell::new(h.operation),
            Cell::new(h.hub),
            Cell::new(h.chases),
            Cell::new(h.wins),
            Cell::new(h.losses),
            Cell::new(format!("{:.0}", h.investment)),
            Cell::new(format!("{:.1}", h.revenue)),
            roi_cell(h.roi),
        ]);
    }
    println!("{table}");
}

pub fn display_review(review: &ReportReview) {
    println!("\n── Bilan du rapport précédent ({} nouveaux tirages) ──", review.new_draws);
    if review.new_draws == 0 {
        println!("  Aucun tirage depuis");
        return;
    }
    println!("  Numéros sortis : {}", format_numbers(&review.number_hits));
    let pairs: Vec<String> = review.pair_hits.iter().map(|&p| pair_label(p)).collect();
    println!("  Paires sorties : {}", if pairs.is_empty() { "aucune".to_string() } else { pairs.join(", ") });
}
