use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use time::{OffsetDateTime, UtcOffset};

use crate::error::{Error, Result};
use crate::index::DocId;

/// One short-form video as served to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub duration_secs: u32,
    pub url: String,
    pub thumbnail_url: String,
}

impl VideoRecord {
    pub fn watch_url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={id}")
    }

    pub fn default_thumbnail(id: &str) -> String {
        format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub query: String,
    pub days: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Records accepted from the source before deduplication.
    pub source_count: u64,
    pub final_count: u64,
}

/// An immutable, fully assembled dataset.
///
/// Records are ordered by publish time, newest first, with the identifier
/// breaking ties so the order is reproducible.
#[derive(Debug)]
pub struct DatasetSnapshot {
    meta: SnapshotMeta,
    records: Vec<VideoRecord>,
    by_id: HashMap<String, DocId>,
    fingerprint: String,
}

impl DatasetSnapshot {
    /// Freeze deduplicated records into a snapshot, applying the canonical order.
    pub fn assemble(
        query: impl Into<String>,
        days: u32,
        created_at: OffsetDateTime,
        source_count: u64,
        records: impl IntoIterator<Item = VideoRecord>,
    ) -> Result<Self> {
        let mut records: Vec<VideoRecord> = records.into_iter().collect();
        records.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        let meta = SnapshotMeta {
            query: query.into(),
            days,
            created_at: created_at.to_offset(UtcOffset::UTC),
            source_count,
            final_count: records.len() as u64,
        };
        Self::from_parts(meta, records)
    }

    /// Build a snapshot from records already in their stored order.
    ///
    /// Fails when an identifier is empty or repeated, or when the metadata
    /// count disagrees with the records.
    pub fn from_parts(meta: SnapshotMeta, records: Vec<VideoRecord>) -> Result<Self> {
        if meta.final_count != records.len() as u64 {
            return Err(Error::invalid(format!(
                "metadata declares {} records but {} are present",
                meta.final_count,
                records.len()
            )));
        }
        if records.len() > DocId::MAX as usize {
            return Err(Error::invalid("too many records for one snapshot"));
        }
        let mut by_id = HashMap::with_capacity(records.len());
        for (pos, rec) in records.iter().enumerate() {
            if rec.id.is_empty() {
                return Err(Error::invalid(format!("record at position {pos} has no identifier")));
            }
            if by_id.insert(rec.id.clone(), pos as DocId).is_some() {
                return Err(Error::invalid(format!("duplicate identifier {}", rec.id)));
            }
        }
        let fingerprint = fingerprint(&meta, &records);
        Ok(Self { meta, records, by_id, fingerprint })
    }

    pub fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, doc_id: DocId) -> Option<&VideoRecord> {
        self.records.get(doc_id as usize)
    }

    pub fn doc_id(&self, id: &str) -> Option<DocId> {
        self.by_id.get(id).copied()
    }

    pub fn find(&self, id: &str) -> Option<&VideoRecord> {
        self.doc_id(id).and_then(|d| self.get(d))
    }

    /// Hex SHA-1 over the creation time and the ordered identifiers.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(meta: &SnapshotMeta, records: &[VideoRecord]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(meta.created_at.unix_timestamp_nanos().to_le_bytes());
    for rec in records {
        hasher.update(rec.id.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use time::macros::datetime;

    pub(crate) fn video(id: &str, title: &str, views: u64, published_at: OffsetDateTime) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            channel: "channel".to_string(),
            published_at,
            view_count: views,
            like_count: 0,
            comment_count: 0,
            duration_secs: 30,
            url: VideoRecord::watch_url(id),
            thumbnail_url: VideoRecord::default_thumbnail(id),
        }
    }

    #[test]
    fn assemble_orders_newest_first_then_by_id() {
        let snap = DatasetSnapshot::assemble(
            "q",
            3,
            datetime!(2025-01-10 00:00 UTC),
            4,
            vec![
                video("b", "x", 1, datetime!(2025-01-05 00:00 UTC)),
                video("c", "x", 1, datetime!(2025-01-08 00:00 UTC)),
                video("a", "x", 1, datetime!(2025-01-05 00:00 UTC)),
            ],
        )
        .unwrap();
        let ids: Vec<&str> = snap.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(snap.meta().final_count, 3);
        assert_eq!(snap.meta().source_count, 4);
        assert_eq!(snap.find("a").map(|r| r.id.as_str()), Some("a"));
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let at = datetime!(2025-01-01 00:00 UTC);
        let err = DatasetSnapshot::assemble("q", 1, at, 2, vec![video("a", "x", 1, at), video("a", "y", 2, at)])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn fingerprint_depends_on_ids_and_creation_time() {
        let at = datetime!(2025-01-01 00:00 UTC);
        let a = DatasetSnapshot::assemble("q", 1, at, 1, vec![video("a", "x", 1, at)]).unwrap();
        let b = DatasetSnapshot::assemble("other", 1, at, 1, vec![video("a", "x", 1, at)]).unwrap();
        let c = DatasetSnapshot::assemble("q", 1, datetime!(2025-01-02 00:00 UTC), 1, vec![video("a", "x", 1, at)]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
