//! Ranking engine: given all guesses and the actual outcome, computes a
//! normalized 2D distance per guess and assigns dense competition ranks.
//! Pure and stateless — the close workflow runs it once for real, and the
//! close-form preview re-runs it on every input change.
//!
//! Date and weight are normalized into [0,1] against the min/max of the
//! guess population plus the actual outcome, so "10 days off" and "2 lbs off"
//! are weighted by their spread within this pool, not by absolute units.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::RANK_TIE_DECIMALS;
use crate::dates::noon_millis;
use crate::error::{AppError, Result};
use crate::types::Outcome;

/// One guess as the ranking engine sees it. Weight in ounces.
#[derive(Debug, Clone)]
pub struct RankEntry {
    pub guess_id: Uuid,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub weight_oz: f64,
}

/// Ranking output, ordered best to worst.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGuess {
    pub guess_id: Uuid,
    pub name: Option<String>,
    pub distance: f64,
    /// 1-based dense rank: ties share a rank, next group is rank + 1.
    pub rank: u32,
}

/// Rank guesses by closeness to the actual outcome.
///
/// Fails fast if the outcome is unusable (non-finite or non-positive weight);
/// the close workflow checks this before calling, but the engine does not
/// trust its caller. An empty guess list is not an error.
pub fn rank(entries: &[RankEntry], actual: &Outcome) -> Result<Vec<RankedGuess>> {
    if !actual.weight_oz.is_finite() || actual.weight_oz <= 0.0 {
        return Err(AppError::Precondition(format!(
            "actual birth weight must be a positive number, got {}",
            actual.weight_oz
        )));
    }
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let actual_date_ms = noon_millis(actual.date);

    // Normalization basis: min/max over all guesses plus the actual, per axis.
    let date_positions: Vec<f64> = entries.iter().map(|e| noon_millis(e.date)).collect();
    let (date_min, date_range) = axis_basis(&date_positions, actual_date_ms);
    let weights: Vec<f64> = entries.iter().map(|e| e.weight_oz).collect();
    let (weight_min, weight_range) = axis_basis(&weights, actual.weight_oz);

    let actual_date_norm = (actual_date_ms - date_min) / date_range;
    let actual_weight_norm = (actual.weight_oz - weight_min) / weight_range;

    let mut ranked: Vec<RankedGuess> = entries
        .iter()
        .zip(date_positions.iter())
        .map(|(entry, &date_ms)| {
            let date_norm = (date_ms - date_min) / date_range;
            let weight_norm = (entry.weight_oz - weight_min) / weight_range;
            let distance = ((date_norm - actual_date_norm).powi(2)
                + (weight_norm - actual_weight_norm).powi(2))
            .sqrt();
            RankedGuess {
                guess_id: entry.guess_id,
                name: entry.name.clone(),
                distance,
                rank: 0,
            }
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    assign_dense_ranks(&mut ranked);
    Ok(ranked)
}

/// Min and range of an axis over the guess values plus the actual value.
/// A degenerate zero range becomes 1 so identical values divide cleanly
/// instead of producing NaN.
fn axis_basis(values: &[f64], actual: f64) -> (f64, f64) {
    let mut min = actual;
    let mut max = actual;
    for &v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    let range = max - min;
    (min, if range == 0.0 { 1.0 } else { range })
}

/// Single linear scan over the sorted list: consecutive entries whose
/// distances round equal at 3 decimals form a tied group sharing one rank;
/// the next distinct group gets rank + 1 (dense, no gaps).
fn assign_dense_ranks(sorted: &mut [RankedGuess]) {
    let mut rank = 0u32;
    let mut prev_key = f64::NAN;
    for entry in sorted.iter_mut() {
        let key = round_distance(entry.distance);
        if key != prev_key {
            rank += 1;
            prev_key = key;
        }
        entry.rank = rank;
    }
}

fn round_distance(d: f64) -> f64 {
    let factor = 10f64.powi(RANK_TIE_DECIMALS as i32);
    (d * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_ymd;

    fn entry(date: &str, weight_oz: f64) -> RankEntry {
        RankEntry {
            guess_id: Uuid::new_v4(),
            name: None,
            date: parse_ymd(date).unwrap(),
            weight_oz,
        }
    }

    fn actual(date: &str, weight_oz: f64) -> Outcome {
        Outcome {
            date: parse_ymd(date).unwrap(),
            weight_oz,
        }
    }

    #[test]
    fn exact_guess_wins_with_distance_zero() {
        let entries = vec![entry("2025-12-07", 121.6), entry("2025-12-08", 121.6)];
        let winner_id = entries[0].guess_id;

        let ranked = rank(&entries, &actual("2025-12-07", 121.6)).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].guess_id, winner_id);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].distance, 0.0);
        assert_eq!(ranked[1].rank, 2);
        assert!(ranked[1].distance > 0.0);
    }

    #[test]
    fn ties_share_a_rank_and_next_group_is_dense() {
        // Two guesses equidistant on opposite sides of the actual date, one
        // clearly further out: ranks must be [1, 1, 2], never [1, 1, 3].
        let entries = vec![
            entry("2025-12-06", 121.6),
            entry("2025-12-08", 121.6),
            entry("2025-12-12", 121.6),
        ];
        let ranked = rank(&entries, &actual("2025-12-07", 121.6)).unwrap();
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 1);
        assert_eq!(ranked[2].rank, 2);
    }

    #[test]
    fn empty_guess_list_is_not_an_error() {
        let ranked = rank(&[], &actual("2025-12-07", 121.6)).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn identical_guesses_matching_actual_all_rank_first() {
        let entries = vec![
            entry("2025-12-07", 121.6),
            entry("2025-12-07", 121.6),
            entry("2025-12-07", 121.6),
        ];
        let ranked = rank(&entries, &actual("2025-12-07", 121.6)).unwrap();
        for r in &ranked {
            assert_eq!(r.rank, 1);
            assert_eq!(r.distance, 0.0);
        }
    }

    #[test]
    fn degenerate_axis_does_not_divide_by_zero() {
        // Every date identical — the date range collapses; weight still ranks.
        let entries = vec![entry("2025-12-07", 100.0), entry("2025-12-07", 130.0)];
        let ranked = rank(&entries, &actual("2025-12-07", 128.0)).unwrap();
        assert!(ranked.iter().all(|r| r.distance.is_finite()));
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        // closer weight wins
        assert!((ranked[0].distance) < (ranked[1].distance));
    }

    #[test]
    fn rank_is_idempotent() {
        let entries = vec![
            entry("2025-12-05", 118.0),
            entry("2025-12-09", 125.0),
            entry("2025-12-07", 121.6),
            entry("2025-12-20", 140.0),
        ];
        let out = actual("2025-12-07", 121.6);
        let a = rank(&entries, &out).unwrap();
        let b = rank(&entries, &out).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ordered_best_to_worst() {
        let entries = vec![
            entry("2025-12-20", 140.0),
            entry("2025-12-07", 121.6),
            entry("2025-12-09", 125.0),
        ];
        let ranked = rank(&entries, &actual("2025-12-07", 121.6)).unwrap();
        for pair in ranked.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
            assert!(pair[0].rank <= pair[1].rank);
        }
    }

    #[test]
    fn unusable_outcome_is_a_precondition_error() {
        let entries = vec![entry("2025-12-07", 121.6)];
        assert!(rank(&entries, &actual("2025-12-07", f64::NAN)).is_err());
        assert!(rank(&entries, &actual("2025-12-07", 0.0)).is_err());
        assert!(rank(&entries, &actual("2025-12-07", f64::INFINITY)).is_err());
    }
}
