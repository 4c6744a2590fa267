//! Columnar dataset file.
//!
//! A dataset is stored as one bincode value: a header (magic, format version,
//! column schema, snapshot metadata) followed by one vector per record field.
//! Files are always written whole into a temporary sibling and renamed over
//! the target, so readers only ever see a complete file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::record::{DatasetSnapshot, SnapshotMeta, VideoRecord};

const MAGIC: [u8; 4] = *b"TWDS";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Utf8,
    UInt32,
    UInt64,
    TimestampNanos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnType,
}

/// Column layout written by this version, in storage order.
pub fn schema() -> Vec<ColumnSpec> {
    use ColumnType::*;
    [
        ("id", Utf8),
        ("title", Utf8),
        ("description", Utf8),
        ("channel", Utf8),
        ("published_at", TimestampNanos),
        ("view_count", UInt64),
        ("like_count", UInt64),
        ("comment_count", UInt64),
        ("duration_secs", UInt32),
        ("url", Utf8),
        ("thumbnail_url", Utf8),
    ]
    .into_iter()
    .map(|(name, kind)| ColumnSpec { name: name.to_string(), kind })
    .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct MetaBlock {
    query: String,
    days: u32,
    created_at_nanos: i128,
    source_count: u64,
    final_count: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Columns {
    id: Vec<String>,
    title: Vec<String>,
    description: Vec<String>,
    channel: Vec<String>,
    published_at: Vec<i128>,
    view_count: Vec<u64>,
    like_count: Vec<u64>,
    comment_count: Vec<u64>,
    duration_secs: Vec<u32>,
    url: Vec<String>,
    thumbnail_url: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatasetFile {
    magic: [u8; 4],
    version: u32,
    schema: Vec<ColumnSpec>,
    meta: MetaBlock,
    columns: Columns,
}

pub struct DatasetPaths {
    pub file: PathBuf,
}

impl DatasetPaths {
    pub fn new<P: AsRef<Path>>(file: P) -> Self {
        Self { file: file.as_ref().to_path_buf() }
    }

    /// Directory that receives the temporary file before the rename.
    pub fn dir(&self) -> PathBuf {
        match self.file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Lock file guarding ingestion runs that target this dataset.
    pub fn lock(&self) -> PathBuf {
        let mut name = self.file.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

/// Write `snapshot` to `path`, replacing any previous file atomically.
pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &DatasetSnapshot) -> Result<()> {
    let paths = DatasetPaths::new(path);
    let dir = paths.dir();
    fs::create_dir_all(&dir)?;

    let file = to_file(snapshot);
    let bytes = bincode::serialize(&file)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".dataset-")
        .suffix(".tmp")
        .tempfile_in(&dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&paths.file).map_err(|e| e.error)?;

    tracing::info!(
        path = %paths.file.display(),
        records = snapshot.len(),
        bytes = bytes.len(),
        fingerprint = snapshot.fingerprint(),
        "dataset written"
    );
    Ok(())
}

/// Read and validate a dataset file.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<DatasetSnapshot> {
    let path = path.as_ref();
    let buf = fs::read(path)?;
    let file: DatasetFile = bincode::deserialize(&buf).map_err(|e| Error::corrupt(path, e))?;
    let snapshot = from_file(file).map_err(|e| match e {
        Error::InvalidArgument(msg) => Error::corrupt(path, msg),
        other => other,
    })?;
    tracing::info!(
        path = %path.display(),
        records = snapshot.len(),
        fingerprint = snapshot.fingerprint(),
        "dataset loaded"
    );
    Ok(snapshot)
}

fn to_file(snapshot: &DatasetSnapshot) -> DatasetFile {
    let meta = snapshot.meta();
    let n = snapshot.len();
    let mut c = Columns {
        id: Vec::with_capacity(n),
        title: Vec::with_capacity(n),
        description: Vec::with_capacity(n),
        channel: Vec::with_capacity(n),
        published_at: Vec::with_capacity(n),
        view_count: Vec::with_capacity(n),
        like_count: Vec::with_capacity(n),
        comment_count: Vec::with_capacity(n),
        duration_secs: Vec::with_capacity(n),
        url: Vec::with_capacity(n),
        thumbnail_url: Vec::with_capacity(n),
    };
    for r in snapshot.records() {
        c.id.push(r.id.clone());
        c.title.push(r.title.clone());
        c.description.push(r.description.clone());
        c.channel.push(r.channel.clone());
        c.published_at.push(r.published_at.unix_timestamp_nanos());
        c.view_count.push(r.view_count);
        c.like_count.push(r.like_count);
        c.comment_count.push(r.comment_count);
        c.duration_secs.push(r.duration_secs);
        c.url.push(r.url.clone());
        c.thumbnail_url.push(r.thumbnail_url.clone());
    }
    DatasetFile {
        magic: MAGIC,
        version: FORMAT_VERSION,
        schema: schema(),
        meta: MetaBlock {
            query: meta.query.clone(),
            days: meta.days,
            created_at_nanos: meta.created_at.unix_timestamp_nanos(),
            source_count: meta.source_count,
            final_count: meta.final_count,
        },
        columns: c,
    }
}

fn from_file(file: DatasetFile) -> Result<DatasetSnapshot> {
    if file.magic != MAGIC {
        return Err(Error::invalid("not a dataset file (bad magic)"));
    }
    if file.version != FORMAT_VERSION {
        return Err(Error::invalid(format!("unsupported format version {}", file.version)));
    }
    if file.schema != schema() {
        return Err(Error::invalid("column schema does not match this reader"));
    }

    let c = file.columns;
    let n = c.id.len();
    let lengths = [
        c.title.len(),
        c.description.len(),
        c.channel.len(),
        c.published_at.len(),
        c.view_count.len(),
        c.like_count.len(),
        c.comment_count.len(),
        c.duration_secs.len(),
        c.url.len(),
        c.thumbnail_url.len(),
    ];
    if lengths.iter().any(|&len| len != n) {
        return Err(Error::invalid("columns have different lengths"));
    }

    let created_at = timestamp(file.meta.created_at_nanos)?;
    let mut records = Vec::with_capacity(n);
    let rows = c
        .id
        .into_iter()
        .zip(c.title)
        .zip(c.description)
        .zip(c.channel)
        .zip(c.published_at)
        .zip(c.view_count)
        .zip(c.like_count)
        .zip(c.comment_count)
        .zip(c.duration_secs)
        .zip(c.url)
        .zip(c.thumbnail_url);
    for ((((((((((id, title), description), channel), published), views), likes), comments), duration), url), thumb) in rows {
        records.push(VideoRecord {
            id,
            title,
            description,
            channel,
            published_at: timestamp(published)?,
            view_count: views,
            like_count: likes,
            comment_count: comments,
            duration_secs: duration,
            url,
            thumbnail_url: thumb,
        });
    }

    let meta = SnapshotMeta {
        query: file.meta.query,
        days: file.meta.days,
        created_at,
        source_count: file.meta.source_count,
        final_count: file.meta.final_count,
    };
    DatasetSnapshot::from_parts(meta, records)
}

fn timestamp(nanos: i128) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| Error::invalid(format!("timestamp out of range: {e}")))
}
