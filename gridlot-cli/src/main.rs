mod analysis;
mod display;
mod import;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::analysis::compute_stats;
use crate::display::{display_draws, display_import_summary, display_stats};
use gridlot_db::db::{count_draws, db_path, fetch_last_draws, insert_draw, migrate, next_draw_id, open_db};
use gridlot_db::models::{validate_draw, Draw, NumberRange};
use gridlot_db::rusqlite::Connection;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum ImportFormat {
    #[default]
    Csv,
    Js,
}

#[derive(Parser)]
#[command(name = "gridlot", about = "Gestion de l'historique des tirages")]
struct Cli {
    /// Plus petit numéro tirable
    #[arg(long, global = true, default_value = "1")]
    min: u8,

    /// Plus grand numéro tirable (doit correspondre à analysis.range du moteur)
    #[arg(long, global = true, default_value = "49")]
    max: u8,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn range(&self) -> Result<NumberRange> {
        if self.min == 0 || self.min > self.max {
            bail!("Plage de numéros invalide ({}-{})", self.min, self.max);
        }
        Ok(NumberRange { min: self.min, max: self.max })
    }
}

#[derive(Subcommand)]
enum Command {
    /// Importer un historique (du plus récent au plus ancien)
    Import {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, default_value = "csv")]
        format: ImportFormat,

        /// Nom de la constante exportée (format js)
        #[arg(long, default_value = "truestdata")]
        constant: String,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Fréquences et retards par numéro
    Stats {
        #[arg(short, long, default_value = "100")]
        window: u32,
    },

    /// Ajouter un tirage manuellement
    Add,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let range = cli.range()?;
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file, format, constant } => {
            let result = match format {
                ImportFormat::Csv => import::import_csv(&conn, &file, range)?,
                ImportFormat::Js => import::import_js(&conn, &file, &constant, range)?,
            };
            display_import_summary(&result);
            Ok(())
        }
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Stats { window } => cmd_stats(&conn, window, range),
        Command::Add => cmd_add(&conn, range),
    }
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if count_draws(conn)? == 0 {
        println!("Base vide. Lancez d'abord : gridlot import");
        return Ok(());
    }
    let draws = fetch_last_draws(conn, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(conn: &Connection, window: u32, range: NumberRange) -> Result<()> {
    let n = count_draws(conn)?;
    if n == 0 {
        println!("Base vide. Lancez d'abord : gridlot import");
        return Ok(());
    }
    let effective_window = window.min(n);
    let draws = fetch_last_draws(conn, effective_window)?;
    let stats = compute_stats(&draws, range);
    display_stats(&stats, effective_window);
    Ok(())
}

fn cmd_add(conn: &Connection, range: NumberRange) -> Result<()> {
    println!("Ajout d'un tirage manuellement\n");

    let draw_id = next_draw_id(conn)?;
    let raw_date = prompt("Date (JJ/MM/AAAA, vide = aujourd'hui) : ")?;
    let date = if raw_date.is_empty() {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    } else {
        import::parse_date(&raw_date)?
    };
    let numbers = prompt_numbers(range)?;

    let draw = Draw { draw_id, date, numbers };

    println!("\nTirage à insérer :");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.trim().to_lowercase() == "o" {
        if insert_draw(conn, &draw)? {
            println!("Tirage inséré avec succès.");
        } else {
            println!("Ce tirage existe déjà (doublon ignoré).");
        }
    } else {
        println!("Insertion annulée.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}

fn prompt_numbers(range: NumberRange) -> Result<Vec<u8>> {
    loop {
        let input = prompt(&format!(
            "Numéros dans l'ordre du tirage (séparés par des espaces, {}-{}) : ",
            range.min, range.max
        ))?;
        let nums: Result<Vec<u8>, _> = input.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(v) => match validate_draw(&v, range) {
                Ok(()) => return Ok(v),
                Err(e) => println!("{e}. Réessayez."),
            },
            Err(_) => println!("Saisie illisible. Réessayez."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_flags() {
        let cli = Cli::try_parse_from(["gridlot", "stats", "--max", "59"]).unwrap();
        assert_eq!(cli.range().unwrap(), NumberRange { min: 1, max: 59 });

        let cli = Cli::try_parse_from(["gridlot", "list"]).unwrap();
        assert_eq!(cli.range().unwrap(), NumberRange::default());

        let cli = Cli::try_parse_from(["gridlot", "--min", "10", "--max", "5", "list"]).unwrap();
        assert!(cli.range().is_err());
    }
}
