use time::macros::datetime;
use time::OffsetDateTime;
use trendwatch_core::{DatasetSnapshot, Result, VideoRecord};

/// Small built-in dataset for running a server without upstream access.
pub fn sample_snapshot(created_at: OffsetDateTime) -> Result<DatasetSnapshot> {
    let rows = [
        (
            "dQw4w9WgXcQ",
            "Never Gonna Give You Up",
            "Classic hit used as example data.",
            "Rick Astley",
            datetime!(1987-07-27 00:00 UTC),
            1_000_000,
            50_000,
            213,
        ),
        (
            "2vjPBrBU-TM",
            "Chandelier",
            "Another demo record for testing.",
            "Sia",
            datetime!(2014-03-06 00:00 UTC),
            2_000_000,
            150_000,
            232,
        ),
        (
            "kJQP7kiw5Fk",
            "Despacito",
            "Third sample video entry.",
            "Luis Fonsi",
            datetime!(2017-01-12 00:00 UTC),
            5_000_000,
            300_000,
            282,
        ),
    ];
    let records: Vec<VideoRecord> = rows
        .into_iter()
        .map(|(id, title, description, channel, published_at, views, likes, secs)| VideoRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            channel: channel.to_string(),
            published_at,
            view_count: views,
            like_count: likes,
            comment_count: 0,
            duration_secs: secs,
            url: VideoRecord::watch_url(id),
            thumbnail_url: VideoRecord::default_thumbnail(id),
        })
        .collect();
    DatasetSnapshot::assemble("sample", 1, created_at, records.len() as u64, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_newest_first() {
        let snap = sample_snapshot(OffsetDateTime::now_utc()).unwrap();
        let ids: Vec<&str> = snap.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["kJQP7kiw5Fk", "2vjPBrBU-TM", "dQw4w9WgXcQ"]);
    }
}
