use crate::error::SearchError;
use crate::matcher::MatchRow;
use crate::scoring::{Scorer, Scores};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A search query: raw text to tokenize, or words that are already split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    Text(String),
    Terms(Vec<String>),
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::Text(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::Text(text)
    }
}

impl From<Vec<String>> for Query {
    fn from(terms: Vec<String>) -> Self {
        Query::Terms(terms)
    }
}

impl From<Vec<&str>> for Query {
    fn from(terms: Vec<&str>) -> Self {
        Query::Terms(terms.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Query {
    fn from(terms: &[&str]) -> Self {
        Query::Terms(terms.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Query {
    fn from(terms: [&str; N]) -> Self {
        Query::Terms(terms.iter().map(|t| t.to_string()).collect())
    }
}

/// Untyped callers (JSON bodies, CLI input) must hand over a string or an
/// array of strings.
impl TryFrom<serde_json::Value> for Query {
    type Error = SearchError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;
        match value {
            Value::String(text) => Ok(Query::Text(text)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(SearchError::InvalidQuery(format!(
                        "query terms must be strings, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Query::Terms),
            other => Err(SearchError::InvalidQuery(format!(
                "search must be called with a string or a list, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: f64,
    pub document_id: DocId,
}

/// One entry of the weight table.
#[derive(Clone)]
pub struct Weighted {
    pub weight: f64,
    pub scorer: Arc<dyn Scorer>,
}

impl Weighted {
    pub fn new(weight: f64, scorer: Arc<dyn Scorer>) -> Self {
        Self { weight, scorer }
    }
}

impl std::fmt::Debug for Weighted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.weight, self.scorer.name())
    }
}

/// Weighted sum of normalized scores, best first. Equal totals are ordered by
/// document id, highest first.
pub fn rank(weights: &[Weighted], rows: &[MatchRow]) -> Vec<SearchHit> {
    let mut totals: HashMap<DocId, f64> = rows.iter().map(|r| (r.document_id, 0.0)).collect();
    for w in weights {
        let scores: Scores = w.scorer.score(rows);
        for (doc, total) in totals.iter_mut() {
            *total += w.weight * scores.get(doc).copied().unwrap_or(0.0);
        }
    }

    let mut hits: Vec<SearchHit> = totals
        .into_iter()
        .map(|(document_id, score)| SearchHit { score, document_id })
        .collect();
    hits.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| b.document_id.cmp(&a.document_id))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreKind;
    use serde_json::json;

    fn table(pairs: &[(f64, ScoreKind)]) -> Vec<Weighted> {
        pairs.iter().map(|&(w, k)| Weighted::new(w, Arc::new(k))).collect()
    }

    #[test]
    fn weighted_sum_orders_documents() {
        let rows = vec![
            MatchRow::new(1, vec![0, 1]),
            MatchRow::new(2, vec![40, 50]),
            MatchRow::new(2, vec![60, 50]),
        ];
        // doc 2 wins on frequency, doc 1 on location and distance
        let hits = rank(&table(&[(1.0, ScoreKind::Frequency)]), &rows);
        assert_eq!(hits[0].document_id, 2);

        let hits = rank(
            &table(&[(1.0, ScoreKind::Frequency), (1.0, ScoreKind::Location), (1.0, ScoreKind::Distance)]),
            &rows,
        );
        assert_eq!(hits.iter().map(|h| h.document_id).collect::<Vec<_>>(), vec![1, 2]);
        assert!((hits[0].score - 2.0).abs() < 1e-9);
        assert!((hits[1].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ties_break_by_document_id_descending() {
        let rows = vec![
            MatchRow::new(3, vec![5]),
            MatchRow::new(8, vec![5]),
            MatchRow::new(1, vec![5]),
        ];
        let hits = rank(&table(&[(1.0, ScoreKind::Location)]), &rows);
        assert_eq!(hits.iter().map(|h| h.document_id).collect::<Vec<_>>(), vec![8, 3, 1]);
    }

    #[test]
    fn no_rows_no_hits() {
        assert!(rank(&table(&[(1.0, ScoreKind::Frequency)]), &[]).is_empty());
    }

    #[test]
    fn json_queries() {
        assert_eq!(Query::try_from(json!("test things")).unwrap(), Query::from("test things"));
        assert_eq!(
            Query::try_from(json!(["test", "things"])).unwrap(),
            Query::from(["test", "things"])
        );
        for bad in [json!(42), json!({"q": "x"}), json!(null), json!(["ok", 1])] {
            assert!(matches!(Query::try_from(bad), Err(SearchError::InvalidQuery(_))));
        }
    }
}
