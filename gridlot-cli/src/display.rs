use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::import::ImportResult;
use gridlot_db::models::{Draw, NumberStats};

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Tirage", "Date", "Numéros (ordre du tirage)", "Triés"]);

    let join = |numbers: &[u8]| {
        numbers
            .iter()
            .map(|n| format!("{:2}", n))
            .collect::<Vec<_>>()
            .join(" - ")
    };

    for draw in draws {
        let date = if draw.date.is_empty() { "—".to_string() } else { draw.date.clone() };
        table.add_row(vec![
            Cell::new(draw.draw_id),
            Cell::new(date),
            Cell::new(join(&draw.numbers)),
            Cell::new(join(&draw.sorted_numbers())).fg(Color::Green),
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_stats(stats: &[NumberStats], window: u32) {
    println!("\nStatistiques sur les {} derniers tirages\n", window);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Numéro", "Fréquence", "Retard"]);

    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));

    for stat in &sorted {
        let gap = if stat.gap >= window {
            Cell::new(stat.gap).fg(Color::Red)
        } else {
            Cell::new(stat.gap)
        };
        table.add_row(vec![Cell::new(format!("{:2}", stat.number)), Cell::new(stat.frequency), gap]);
    }
    println!("{table}");
}
