use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ChaseOutcome, ChaseRecord};
use crate::clusters::Operation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubStats {
    pub operation: Operation,
    pub hub: u8,
    pub chases: usize,
    pub wins: usize,
    pub losses: usize,
    pub investment: f64,
    pub revenue: f64,
    pub roi: f64,
}

/// Performance des chasses closes par (opération, pivot), triée par ROI décroissant.
pub fn hub_performance(ledger: &[ChaseRecord]) -> Vec<HubStats> {
    let mut map: BTreeMap<(Operation, u8), HubStats> = BTreeMap::new();
    for rec in ledger.iter().filter(|r| r.outcome != ChaseOutcome::Active) {
        let key = (rec.origin.operation, rec.origin.hub);
        let entry = map.entry(key).or_insert_with(|| HubStats {
            operation: key.0,
            hub: key.1,
            chases: 0,
            wins: 0,
            losses: 0,
            investment: 0.0,
            revenue: 0.0,
            roi: 0.0,
        });
        entry.chases += 1;
        match rec.outcome {
            ChaseOutcome::Won => entry.wins += 1,
            _ => entry.losses += 1,
        }
        entry.investment += rec.invested;
        entry.revenue += rec.revenue;
    }

    let mut stats: Vec<HubStats> = map
        .into_values()
        .map(|mut h| {
            h.roi = if h.investment > 0.0 { (h.revenue - h.investment) / h.investment * 100.0 } else { 0.0 };
            h
        })
        .collect();
    stats.sort_by(|a, b| b.roi.partial_cmp(&a.roi).unwrap_or(std::cmp::Ordering::Equal));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chase::ChaseOrigin;

    fn rec(hub: u8, operation: Operation, invested: f64, revenue: f64, outcome: ChaseOutcome) -> ChaseRecord {
        ChaseRecord {
            target: vec![1, 2],
            origin: ChaseOrigin { draw_index: 0, hub, operation },
            closed_at: Some(3),
            invested,
            revenue,
            outcome,
        }
    }

    #[test]
    fn test_hub_aggregation() {
        let ledger = vec![
            rec(17, Operation::Addition, 3.0, 23.0, ChaseOutcome::Won),
            rec(17, Operation::Addition, 10.0, 0.0, ChaseOutcome::Expired),
            rec(17, Operation::Multiplication, 4.0, 0.0, ChaseOutcome::Expired),
            rec(2, Operation::Addition, 1.0, 0.0, ChaseOutcome::Active),
        ];
        let stats = hub_performance(&ledger);
        assert_eq!(stats.len(), 2, "les chasses actives ne comptent pas");
        let add = &stats[0];
        assert_eq!((add.operation, add.hub), (Operation::Addition, 17));
        assert_eq!((add.chases, add.wins, add.losses), (2, 1, 1));
        assert!((add.roi - 10.0 / 13.0 * 100.0).abs() < 1e-9);
        assert!((stats[1].roi + 100.0).abs() < 1e-9);
    }
}
