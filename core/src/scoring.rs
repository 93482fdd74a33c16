//! Raw score functions over match rows, and min-max normalization.
//!
//! Every scorer sees the same rows, so every matched document gets an entry
//! in every score map.

use crate::matcher::MatchRow;
use crate::{DocId, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

pub type Scores = HashMap<DocId, f64>;

/// A pluggable ranking factor.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    fn raw_scores(&self, rows: &[MatchRow]) -> Scores;

    /// Whether a lower raw score ranks higher.
    fn small_is_better(&self) -> bool {
        false
    }

    /// Raw scores scaled into `[0, 1]`, 1 being best.
    fn score(&self, rows: &[MatchRow]) -> Scores {
        normalize_scores(&self.raw_scores(rows), self.small_is_better())
    }
}

/// The built-in factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// More matching rows is better.
    Frequency,
    /// Terms appearing earlier in the document is better.
    Location,
    /// Query terms appearing close together is better.
    Distance,
}

impl Scorer for ScoreKind {
    fn name(&self) -> &str {
        match self {
            ScoreKind::Frequency => "frequency",
            ScoreKind::Location => "location",
            ScoreKind::Distance => "distance",
        }
    }

    fn raw_scores(&self, rows: &[MatchRow]) -> Scores {
        match self {
            ScoreKind::Frequency => frequency_score(rows),
            ScoreKind::Location => location_score(rows),
            ScoreKind::Distance => distance_score(rows),
        }
    }

    fn small_is_better(&self) -> bool {
        matches!(self, ScoreKind::Location | ScoreKind::Distance)
    }
}

/// Number of rows per document.
pub fn frequency_score(rows: &[MatchRow]) -> Scores {
    let mut scores = Scores::new();
    for row in rows {
        *scores.entry(row.document_id).or_insert(0.0) += 1.0;
    }
    scores
}

/// Smallest sum of positions over a document's rows.
pub fn location_score(rows: &[MatchRow]) -> Scores {
    min_per_document(rows, |row| row.positions.iter().map(|&p| f64::from(p)).sum())
}

/// Smallest spread over a document's rows, where the spread of a row is the
/// distance walked visiting its positions in query order. Zero for a
/// single-term query.
pub fn distance_score(rows: &[MatchRow]) -> Scores {
    min_per_document(rows, |row| {
        row.positions.windows(2).map(|w| distance(w[0], w[1]) as f64).sum()
    })
}

fn min_per_document(rows: &[MatchRow], value: impl Fn(&MatchRow) -> f64) -> Scores {
    let mut scores = Scores::new();
    for row in rows {
        let v = value(row);
        scores
            .entry(row.document_id)
            .and_modify(|best| *best = best.min(v))
            .or_insert(v);
    }
    scores
}

/// Distance between two token positions.
pub fn distance(p: Position, q: Position) -> u64 {
    u64::from(p.abs_diff(q))
}

/// Manhattan distance between two points of equal dimension. Extra
/// coordinates of the longer point are ignored.
pub fn manhattan(p: &[i64], q: &[i64]) -> u64 {
    p.iter().zip(q).map(|(a, b)| a.abs_diff(*b)).sum()
}

/// Min-max scale `scores` into `[0, 1]`.
///
/// A single entry, or entries that are all equal, map to `1.0` since no scale
/// can be established. With `small_is_better` the scale is inverted.
pub fn normalize_scores<K: Eq + Hash + Clone>(
    scores: &HashMap<K, f64>,
    small_is_better: bool,
) -> HashMap<K, f64> {
    let min = scores.values().copied().fold(f64::INFINITY, f64::min);
    let max = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    scores
        .iter()
        .map(|(k, &v)| {
            let n = if scores.len() == 1 || range <= 0.0 {
                1.0
            } else if small_is_better {
                (max - v) / range
            } else {
                (v - min) / range
            };
            (k.clone(), n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn named(pairs: &[(&'static str, f64)]) -> HashMap<&'static str, f64> {
        pairs.iter().copied().collect()
    }

    fn assert_close(got: &HashMap<&'static str, f64>, want: &[(&'static str, f64)]) {
        assert_eq!(got.len(), want.len());
        for (k, v) in want {
            assert!((got[k] - v).abs() < EPS, "{k}: got {}, want {v}", got[k]);
        }
    }

    fn sample_rows() -> Vec<MatchRow> {
        vec![MatchRow::new(1, vec![3, 7]), MatchRow::new(1, vec![15, 7])]
    }

    #[test]
    fn normalize_is_proportional() {
        let input = named(&[("zero", 0.0), ("quarter", 25.0), ("half", 50.0), ("whole", 100.0)]);
        let want = [("zero", 0.0), ("quarter", 0.25), ("half", 0.5), ("whole", 1.0)];
        assert_close(&normalize_scores(&input, false), &want);

        let input = named(&[("zero", 25.0), ("quarter", 50.0), ("half", 100.0), ("whole", 125.0)]);
        let want = [("zero", 0.0), ("quarter", 0.25), ("half", 0.75), ("whole", 1.0)];
        assert_close(&normalize_scores(&input, false), &want);
    }

    #[test]
    fn normalize_is_shift_invariant() {
        let base = named(&[("a", 0.0), ("b", 25.0), ("c", 50.0), ("d", 100.0)]);
        let shifted = named(&[("a", 25.0), ("b", 50.0), ("c", 75.0), ("d", 125.0)]);
        let x = normalize_scores(&base, false);
        let y = normalize_scores(&shifted, false);
        for k in ["a", "b", "c", "d"] {
            assert!((x[k] - y[k]).abs() < EPS);
        }
    }

    #[test]
    fn normalize_empty_and_single() {
        assert!(normalize_scores(&HashMap::<u64, f64>::new(), false).is_empty());
        assert_close(&normalize_scores(&named(&[("zero", 1.0)]), false), &[("zero", 1.0)]);
        assert_close(&normalize_scores(&named(&[("zero", 10.0)]), true), &[("zero", 1.0)]);
    }

    #[test]
    fn small_is_better_is_the_complement() {
        let input = named(&[("zero", 0.0), ("quarter", 25.0), ("half", 50.0), ("whole", 100.0)]);
        let big = normalize_scores(&input, false);
        let small = normalize_scores(&input, true);
        for k in input.keys() {
            assert!((small[k] - (1.0 - big[k])).abs() < EPS);
        }
        assert_close(
            &small,
            &[("zero", 1.0), ("quarter", 0.75), ("half", 0.5), ("whole", 0.0)],
        );
    }

    #[test]
    fn all_equal_scores_map_to_one() {
        let got = normalize_scores(&named(&[("a", 4.0), ("b", 4.0)]), true);
        assert_close(&got, &[("a", 1.0), ("b", 1.0)]);
    }

    #[test]
    fn distances() {
        assert_eq!(distance(0, 2), 2);
        assert_eq!(distance(9, 4), 5);
        assert_eq!(manhattan(&[0, 0], &[0, 2]), 2);
        assert_eq!(manhattan(&[0, 0], &[2, 0]), 2);
        assert_eq!(manhattan(&[-1, 3], &[2, -1]), 7);
    }

    #[test]
    fn single_document_scores_one_everywhere() {
        let rows = sample_rows();
        for kind in [ScoreKind::Frequency, ScoreKind::Location, ScoreKind::Distance] {
            assert_eq!(kind.score(&rows), Scores::from([(1, 1.0)]), "{}", kind.name());
        }
    }

    #[test]
    fn empty_rows_score_nothing() {
        for kind in [ScoreKind::Frequency, ScoreKind::Location, ScoreKind::Distance] {
            assert!(kind.score(&[]).is_empty());
        }
    }

    #[test]
    fn raw_scores_aggregate_with_min() {
        let rows = vec![
            MatchRow::new(1, vec![3, 7]),
            MatchRow::new(1, vec![15, 7]),
            MatchRow::new(2, vec![0, 20]),
        ];
        assert_eq!(frequency_score(&rows), Scores::from([(1, 2.0), (2, 1.0)]));
        assert_eq!(location_score(&rows), Scores::from([(1, 10.0), (2, 20.0)]));
        assert_eq!(distance_score(&rows), Scores::from([(1, 4.0), (2, 20.0)]));
    }

    #[test]
    fn distance_walks_columns_in_query_order() {
        let rows = vec![MatchRow::new(5, vec![10, 2, 6]), MatchRow::new(6, vec![4])];
        assert_eq!(distance_score(&rows), Scores::from([(5, 12.0), (6, 0.0)]));
    }

    #[test]
    fn location_and_distance_prefer_small() {
        let rows = vec![MatchRow::new(1, vec![0, 1]), MatchRow::new(2, vec![10, 30])];
        let loc = ScoreKind::Location.score(&rows);
        let dist = ScoreKind::Distance.score(&rows);
        assert_eq!(loc[&1], 1.0);
        assert_eq!(loc[&2], 0.0);
        assert_eq!(dist[&1], 1.0);
        assert_eq!(dist[&2], 0.0);
    }
}
