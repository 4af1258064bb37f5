use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::models::Draw;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    draw_id  INTEGER PRIMARY KEY,
    date     TEXT NOT NULL DEFAULT '',
    numbers  TEXT NOT NULL
);
";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("gridlot.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

fn encode_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_numbers(raw: &str) -> Result<Vec<u8>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<u8>()
                .with_context(|| format!("Numéro illisible en base : '{}'", s))
        })
        .collect()
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (draw_id, date, numbers) VALUES (?1, ?2, ?3)",
        rusqlite::params![draw.draw_id, draw.date, encode_numbers(&draw.numbers)],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

/// Derniers tirages, du plus récent au plus ancien.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT draw_id, date, numbers FROM draws ORDER BY draw_id DESC LIMIT ?1"
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(draw_id, date, raw)| {
            let numbers = decode_numbers(&raw)
                .with_context(|| format!("Tirage {} corrompu", draw_id))?;
            Ok(Draw { draw_id, date, numbers })
        })
        .collect()
}

pub fn fetch_all_draws(conn: &Connection) -> Result<Vec<Draw>> {
    let n = count_draws(conn)?;
    fetch_last_draws(conn, n)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

pub fn next_draw_id(conn: &Connection) -> Result<u32> {
    let max: Option<u32> = conn.query_row("SELECT MAX(draw_id) FROM draws", [], |row| row.get(0))?;
    Ok(max.map(|m| m + 1).unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_draw(id: u32, numbers: &[u8]) -> Draw {
        Draw {
            draw_id: id,
            date: format!("2024-01-{:02}", id),
            numbers: numbers.to_vec(),
        }
    }

    #[test]
    fn test_insert_and_count() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_draw(1, &[1, 2, 3])).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let inserted = insert_draw(&conn, &test_draw(1, &[1, 2, 3])).unwrap();
        assert!(inserted);
        let inserted = insert_draw(&conn, &test_draw(1, &[4, 5, 6])).unwrap();
        assert!(!inserted);
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_fetch_order_and_positional_numbers() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        insert_draw(&conn, &test_draw(1, &[9, 17, 18])).unwrap();
        insert_draw(&conn, &test_draw(3, &[42, 40, 41])).unwrap();
        insert_draw(&conn, &test_draw(2, &[5, 6, 7])).unwrap();

        let draws = fetch_last_draws(&conn, 10).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].draw_id, 3);
        assert_eq!(draws[1].draw_id, 2);
        assert_eq!(draws[2].draw_id, 1);
        assert_eq!(draws[0].numbers, vec![42, 40, 41], "l'ordre positionnel doit survivre");

        let limited = fetch_last_draws(&conn, 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(fetch_all_draws(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_next_draw_id() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(next_draw_id(&conn).unwrap(), 1);
        insert_draw(&conn, &test_draw(7, &[1, 2, 3])).unwrap();
        assert_eq!(next_draw_id(&conn).unwrap(), 8);
    }

    #[test]
    fn test_decode_numbers() {
        assert_eq!(decode_numbers("1,2, 49").unwrap(), vec![1, 2, 49]);
        assert!(decode_numbers("1,x").is_err());
        assert_eq!(encode_numbers(&[3, 1, 2]), "3,1,2");
    }
}
