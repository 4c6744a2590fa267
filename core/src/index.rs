use std::collections::{BTreeSet, HashMap};

use crate::record::DatasetSnapshot;
use crate::tokenizer::tokenize;

/// Position of a record inside the snapshot it was indexed from.
pub type DocId = u32;

/// Keyword index over one snapshot.
///
/// Built once per snapshot and never mutated afterwards. Postings refer to
/// records by their position in that snapshot, so an index is meaningless
/// against any other snapshot; [`InvertedIndex::snapshot_fingerprint`] names
/// the one it belongs to.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    snapshot_fingerprint: String,
    /// token -> documents containing it in title or description, ascending.
    postings: HashMap<String, Vec<DocId>>,
    /// Documents ordered by views desc, then publish time desc, then identifier.
    popularity: Vec<DocId>,
    /// Inverse of `popularity`: rank[doc] is the doc's place in that order.
    rank: Vec<u32>,
    num_docs: u32,
}

impl InvertedIndex {
    /// Derive the index and sort keys for `snapshot`. Deterministic.
    pub fn build(snapshot: &DatasetSnapshot) -> Self {
        let mut postings: HashMap<String, Vec<DocId>> = HashMap::new();
        for (pos, rec) in snapshot.records().iter().enumerate() {
            let doc_id = pos as DocId;
            let terms: BTreeSet<String> = tokenize(&rec.title)
                .into_iter()
                .chain(tokenize(&rec.description))
                .collect();
            for term in terms {
                // docs are visited in ascending order, so each list stays sorted
                postings.entry(term).or_default().push(doc_id);
            }
        }

        let records = snapshot.records();
        let mut popularity: Vec<DocId> = (0..records.len() as DocId).collect();
        popularity.sort_by(|&a, &b| {
            let (ra, rb) = (&records[a as usize], &records[b as usize]);
            rb.view_count
                .cmp(&ra.view_count)
                .then_with(|| rb.published_at.cmp(&ra.published_at))
                .then_with(|| ra.id.cmp(&rb.id))
        });
        let mut rank = vec![0u32; records.len()];
        for (place, &doc) in popularity.iter().enumerate() {
            rank[doc as usize] = place as u32;
        }

        tracing::debug!(
            terms = postings.len(),
            docs = records.len(),
            fingerprint = snapshot.fingerprint(),
            "index built"
        );
        Self {
            snapshot_fingerprint: snapshot.fingerprint().to_string(),
            postings,
            popularity,
            rank,
            num_docs: records.len() as u32,
        }
    }

    pub fn snapshot_fingerprint(&self) -> &str {
        &self.snapshot_fingerprint
    }

    pub fn postings(&self, term: &str) -> &[DocId] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Tie-break rank of a document; lower sorts first.
    pub fn rank(&self, doc: DocId) -> u32 {
        self.rank.get(doc as usize).copied().unwrap_or(u32::MAX)
    }

    pub fn most_popular(&self, n: usize) -> &[DocId] {
        &self.popularity[..n.min(self.popularity.len())]
    }
}
