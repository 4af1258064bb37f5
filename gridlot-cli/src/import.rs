use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use gridlot_db::db::insert_draw;
use gridlot_db::models::{validate_draw, Draw, NumberRange};
use gridlot_db::rusqlite::Connection;

/// Normalise une date en AAAA-MM-JJ. Accepte JJ/MM/AAAA et AAAA-MM-JJ.
pub fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .with_context(|| format!("Format de date invalide: '{}'", raw))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn looks_like_date(field: &str) -> bool {
    field.contains('/') || field.contains('-')
}

/// Une ligne : date optionnelle puis les numéros. `None` pour une ligne d'en-tête.
fn parse_record(record: &csv::StringRecord, range: NumberRange) -> Result<Option<(String, Vec<u8>)>> {
    let fields: Vec<&str> = record.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if fields.iter().all(|f| f.parse::<u8>().is_err() && !looks_like_date(f)) {
        return Ok(None);
    }
    let (date, rest) = match fields.first() {
        Some(first) if looks_like_date(first) => (parse_date(first)?, &fields[1..]),
        _ => (String::new(), &fields[..]),
    };
    let numbers = rest
        .iter()
        .map(|s| s.parse::<u8>().with_context(|| format!("Impossible de parser '{}'", s)))
        .collect::<Result<Vec<u8>>>()?;
    validate_draw(&numbers, range)?;
    Ok(Some((date, numbers)))
}

/// Extrait `export const <name> = [[...], ...];` d'un source JavaScript.
pub fn extract_js_constant(source: &str, name: &str) -> Result<Vec<Vec<u8>>> {
    let marker = format!("export const {name}");
    let Some(start) = source.find(&marker) else {
        bail!("Constante '{}' introuvable", name);
    };
    let after = &source[start + marker.len()..];
    let Some(open) = after.find('[') else {
        bail!("Tableau de la constante '{}' introuvable", name);
    };

    let mut rows: Vec<Vec<u8>> = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut digits = String::new();
    let mut depth = 0usize;

    let flush = |digits: &mut String, current: &mut Vec<u8>| -> Result<()> {
        if !digits.is_empty() {
            let n = digits.parse::<u8>().with_context(|| format!("Numéro invalide '{}'", digits))?;
            current.push(n);
            digits.clear();
        }
        Ok(())
    };

    for c in after[open..].chars() {
        match c {
            '[' => {
                depth += 1;
                if depth > 2 {
                    bail!("Imbrication inattendue dans '{}'", name);
                }
            }
            ']' => {
                flush(&mut digits, &mut current)?;
                depth -= 1;
                match depth {
                    0 => return Ok(rows),
                    1 => rows.push(std::mem::take(&mut current)),
                    _ => {}
                }
            }
            '0'..='9' if depth == 2 => digits.push(c),
            _ => flush(&mut digits, &mut current)?,
        }
    }
    bail!("Tableau de la constante '{}' non terminé", name)
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Les lignes arrivent du plus récent au plus ancien : le plus ancien reçoit l'identifiant 1.
fn store_rows(conn: &Connection, rows: Vec<(String, Vec<u8>)>, result: &mut ImportResult) -> Result<()> {
    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;
    let total = rows.len() as u32;
    for (i, (date, numbers)) in rows.into_iter().enumerate() {
        let draw = Draw {
            draw_id: total - i as u32,
            date,
            numbers,
        };
        match insert_draw(&tx, &draw) {
            Ok(true) => result.inserted += 1,
            Ok(false) => result.skipped += 1,
            Err(e) => {
                eprintln!("Erreur insertion tirage {}: {}", draw.draw_id, e);
                result.errors += 1;
            }
        }
    }
    tx.commit().context("Échec du commit")?;
    log::info!("{} tirages insérés, {} doublons", result.inserted, result.skipped);
    Ok(())
}

pub fn import_csv(conn: &Connection, path: &Path, range: NumberRange) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };
    let mut rows = Vec::new();

    for record_result in reader.records() {
        result.total_records += 1;
        let line = result.total_records;
        match record_result {
            Ok(record) => match parse_record(&record, range) {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => result.total_records -= 1,
                Err(e) => {
                    eprintln!("Erreur parsing ligne {}: {:#}", line, e);
                    log::warn!("Ligne {} rejetée", line);
                    result.errors += 1;
                }
            },
            Err(e) => {
                eprintln!("Erreur lecture ligne {}: {}", line, e);
                result.errors += 1;
            }
        }
    }

    store_rows(conn, rows, &mut result)?;
    Ok(result)
}

pub fn import_js(conn: &Connection, path: &Path, constant: &str, range: NumberRange) -> Result<ImportResult> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {:?}", path))?;
    let raw = extract_js_constant(&source, constant)?;

    let mut result = ImportResult {
        total_records: raw.len() as u32,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };
    let mut rows = Vec::with_capacity(raw.len());
    for (i, numbers) in raw.into_iter().enumerate() {
        match validate_draw(&numbers, range) {
            Ok(()) => rows.push((String::new(), numbers)),
            Err(e) => {
                eprintln!("Tirage {} rejeté : {}", i + 1, e);
                log::warn!("Tirage {} rejeté", i + 1);
                result.errors += 1;
            }
        }
    }

    store_rows(conn, rows, &mut result)?;
    Ok(result)
}
