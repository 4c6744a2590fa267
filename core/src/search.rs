use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::index::DocId;
use crate::record::VideoRecord;
use crate::store::{ActivePair, DatasetStore};
use crate::tokenizer::distinct_tokens;

/// Longest description excerpt returned with a hit, in characters.
pub const EXCERPT_CHARS: usize = 140;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    /// Number of distinct query tokens the record matched.
    pub score: u32,
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub query: String,
    /// Matching records before truncation to the limit.
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

/// Search and fetch against whatever pair the store holds when a call starts.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<DatasetStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    pub fn search(&self, query: &str, limit: usize) -> Result<SearchResult> {
        search_pair(&self.store.current(), query, limit)
    }

    pub fn fetch(&self, id: &str) -> Result<VideoRecord> {
        fetch_pair(&self.store.current(), id)
    }
}

/// Rank records of `pair` by how many distinct query tokens they contain.
///
/// Equal scores fall back to the index's popularity rank: more views, then
/// newer, then identifier order.
pub fn search_pair(pair: &ActivePair, query: &str, limit: usize) -> Result<SearchResult> {
    if limit == 0 {
        return Err(Error::invalid("limit must be positive"));
    }
    let terms = distinct_tokens(query);
    if terms.is_empty() {
        return Err(Error::invalid("query has no searchable words"));
    }

    let index = &pair.index;
    let mut scores: HashMap<DocId, u32> = HashMap::new();
    for term in &terms {
        for &doc in index.postings(term) {
            *scores.entry(doc).or_insert(0) += 1;
        }
    }

    let mut scored: Vec<(DocId, u32)> = scores.into_iter().collect();
    scored.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| index.rank(a.0).cmp(&index.rank(b.0))));
    let total_hits = scored.len();

    let results = scored
        .into_iter()
        .take(limit)
        .filter_map(|(doc, score)| {
            pair.snapshot.get(doc).map(|rec| SearchHit {
                id: rec.id.clone(),
                title: rec.title.clone(),
                score,
                url: rec.url.clone(),
                text: excerpt(&rec.description, EXCERPT_CHARS),
            })
        })
        .collect();

    Ok(SearchResult { query: query.to_string(), total_hits, results })
}

pub fn fetch_pair(pair: &ActivePair, id: &str) -> Result<VideoRecord> {
    pair.snapshot
        .find(id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("no video with id {id:?}")))
}

/// Collapse whitespace and cut to at most `width` characters on a word
/// boundary, marking the cut with "...".
pub fn excerpt(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let joined = words.join(" ");
    if joined.chars().count() <= width {
        return joined;
    }
    const MARK: &str = "...";
    let budget = width.saturating_sub(MARK.len());
    let mut out = String::new();
    for word in words {
        if out.is_empty() && word.chars().count() > budget {
            // a single word longer than the budget is cut mid-word
            out.extend(word.chars().take(budget));
            break;
        }
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > budget {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.push_str(MARK);
    out
}
