//! Conjunctive multi-term matching over posting lists.
//!
//! Every query word becomes one column. A document matches when every column
//! has at least one posting in it, and it yields one row per combination of
//! positions, like an N-way self-join of the postings table on `document_id`.

use crate::config::{SearchConfig, UnknownTermPolicy};
use crate::error::{Result, SearchError};
use crate::store::IndexStore;
use crate::{DocId, Position, TermId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    pub document_id: DocId,
    /// One position per query column, in query order.
    pub positions: Vec<Position>,
}

impl MatchRow {
    pub fn new(document_id: DocId, positions: Vec<Position>) -> Self {
        Self { document_id, positions }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    pub rows: Vec<MatchRow>,
    /// Term id of each column. Repeats when a query repeats a word.
    pub term_ids: Vec<TermId>,
}

impl MatchSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Postings of one term grouped per document, ascending by document id.
type Grouped = Vec<(DocId, Vec<Position>)>;

fn group_by_document<S: IndexStore + ?Sized>(store: &S, term_id: TermId) -> Result<Grouped> {
    let mut grouped: Grouped = Vec::new();
    for p in store.postings_for_term(term_id)? {
        match grouped.last_mut() {
            Some((doc, positions)) if *doc == p.document_id => positions.push(p.position),
            _ => grouped.push((p.document_id, vec![p.position])),
        }
    }
    Ok(grouped)
}

/// Resolve already-stemmed query `terms` in `namespace` and join their postings.
///
/// Stop words are skipped. Words with no term row are dropped or empty the
/// result depending on `config.unknown_terms`.
pub fn match_terms<S: IndexStore + ?Sized>(
    store: &S,
    namespace: &str,
    config: &SearchConfig,
    terms: &[String],
) -> Result<MatchSet> {
    let mut term_ids = Vec::with_capacity(terms.len());
    let mut dropped = 0usize;
    for word in terms {
        if config.is_stop_word(word) {
            continue;
        }
        match store.find_term(word, namespace)? {
            Some(id) => term_ids.push(id),
            None => match config.unknown_terms {
                UnknownTermPolicy::Ignore => dropped += 1,
                UnknownTermPolicy::RequireAll => {
                    tracing::debug!(namespace, word = word.as_str(), "unknown term, no match");
                    return Ok(MatchSet::default());
                }
            },
        }
    }
    if term_ids.is_empty() {
        tracing::debug!(namespace, dropped, "no known query terms");
        return Ok(MatchSet::default());
    }

    // Fetch each distinct term once; columns point into `lists`.
    let mut lists: Vec<Grouped> = Vec::new();
    let mut list_of: HashMap<TermId, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(term_ids.len());
    for &id in &term_ids {
        let slot = match list_of.get(&id) {
            Some(&slot) => slot,
            None => {
                lists.push(group_by_document(store, id)?);
                list_of.insert(id, lists.len() - 1);
                lists.len() - 1
            }
        };
        columns.push(slot);
    }

    let shared = join(&lists);
    let total = shared.iter().fold(0u64, |acc, cursors| {
        let per_doc = columns
            .iter()
            .fold(1u64, |n, &slot| n.saturating_mul(lists[slot][cursors[slot]].1.len() as u64));
        acc.saturating_add(per_doc)
    });
    if config.max_match_rows > 0 && total > config.max_match_rows {
        tracing::warn!(namespace, rows = total, limit = config.max_match_rows, "query too broad");
        return Err(SearchError::QueryTooBroad { rows: total, limit: config.max_match_rows });
    }

    let mut rows = Vec::new();
    for cursors in &shared {
        let document_id = lists[0][cursors[0]].0;
        let per_column: Vec<&[Position]> =
            columns.iter().map(|&slot| lists[slot][cursors[slot]].1.as_slice()).collect();
        push_combinations(document_id, &per_column, &mut rows);
    }
    tracing::debug!(
        namespace,
        kept = term_ids.len(),
        dropped,
        rows = rows.len(),
        "matched query terms"
    );
    Ok(MatchSet { rows, term_ids })
}

/// Merge-join the sorted lists on document id. Each shared document comes
/// back as the index of its entry in every list.
fn join(lists: &[Grouped]) -> Vec<Vec<usize>> {
    let mut shared = Vec::new();
    let Some(driver) = (0..lists.len()).min_by_key(|&i| lists[i].len()) else {
        return shared;
    };
    let mut cursors = vec![0usize; lists.len()];

    'docs: for (d, (doc, _)) in lists[driver].iter().enumerate() {
        cursors[driver] = d;
        for (i, list) in lists.iter().enumerate() {
            if i == driver {
                continue;
            }
            let c = &mut cursors[i];
            while *c < list.len() && list[*c].0 < *doc {
                *c += 1;
            }
            if *c == list.len() {
                break 'docs;
            }
            if list[*c].0 != *doc {
                continue 'docs;
            }
        }
        shared.push(cursors.clone());
    }
    shared
}

fn push_combinations(document_id: DocId, columns: &[&[Position]], rows: &mut Vec<MatchRow>) {
    let mut idx = vec![0usize; columns.len()];
    loop {
        let positions = idx.iter().zip(columns).map(|(&i, col)| col[i]).collect();
        rows.push(MatchRow::new(document_id, positions));

        // odometer, last column fastest
        let mut k = columns.len();
        loop {
            if k == 0 {
                return;
            }
            k -= 1;
            idx[k] += 1;
            if idx[k] < columns[k].len() {
                break;
            }
            idx[k] = 0;
        }
    }
}
