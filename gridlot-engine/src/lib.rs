pub mod analysis;
pub mod backtest;
pub mod bonds;
pub mod chase;
pub mod clusters;
pub mod config;
pub mod display;
pub mod grid;
pub mod hmm;
pub mod neural;
pub mod plugins;
pub mod report;
pub mod signals;

/// Historique synthétique déterministe de `n` tirages de 6 numéros, du plus récent au plus ancien.
#[cfg(test)]
pub fn make_test_draws(n: usize) -> Vec<gridlot_db::models::Draw> {
    (0..n)
        .map(|i| {
            let step = 5 + i % 4;
            let mut numbers: Vec<u8> = Vec::with_capacity(6);
            for k in 0..200 {
                if numbers.len() == 6 {
                    break;
                }
                let v = ((i * 7 + (i / 3) * 11 + k * k * 13 + k * step) % 49 + 1) as u8;
                if !numbers.contains(&v) {
                    numbers.push(v);
                }
            }
            let mut draw = gridlot_db::models::Draw::new((n - i) as u32, numbers);
            draw.date = format!("2024-{:02}-{:02}", (i / 28) % 12 + 1, i % 28 + 1);
            draw
        })
        .collect()
}
