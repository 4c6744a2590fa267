use lazy_static::lazy_static;
use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use trendwatch_core::VideoRecord;

use crate::source::RawVideo;

lazy_static! {
    static ref ISO_DURATION: Regex =
        Regex::new(r"^P(?:(\d+)D)?T?(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("valid regex");
}

/// Why an upstream item did not become a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingId,
    BadPublishTime(String),
}

/// Turn one upstream item into a record: trim text, coerce counters, fill
/// the canonical and thumbnail URLs.
pub fn normalize(raw: RawVideo) -> Result<VideoRecord, Rejection> {
    let id = raw.id.as_deref().map(str::trim).unwrap_or_default().to_string();
    if id.is_empty() {
        return Err(Rejection::MissingId);
    }

    let snippet = raw.snippet.unwrap_or_default();
    let published_raw = snippet.published_at.as_deref().map(str::trim).unwrap_or_default();
    let published_at = OffsetDateTime::parse(published_raw, &Rfc3339)
        .map_err(|_| Rejection::BadPublishTime(published_raw.to_string()))?
        .to_offset(UtcOffset::UTC);

    let stats = raw.statistics.unwrap_or_default();
    let thumbnail_url = snippet
        .thumbnails
        .and_then(|t| [t.high, t.medium, t.default].into_iter().flatten().find_map(|th| th.url))
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| VideoRecord::default_thumbnail(&id));
    let duration_secs = raw
        .content_details
        .and_then(|c| c.duration)
        .map(|d| iso8601_duration_secs(&d))
        .unwrap_or(0);

    Ok(VideoRecord {
        title: clean(snippet.title),
        description: clean(snippet.description),
        channel: clean(snippet.channel_title),
        published_at,
        view_count: count(stats.view_count.as_ref()),
        like_count: count(stats.like_count.as_ref()),
        comment_count: count(stats.comment_count.as_ref()),
        duration_secs,
        url: VideoRecord::watch_url(&id),
        thumbnail_url,
        id,
    })
}

fn clean(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string()).unwrap_or_default()
}

/// Non-negative counter from a JSON string or number; anything else is 0.
fn count(value: Option<&serde_json::Value>) -> u64 {
    match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

/// Seconds in an ISO-8601 duration such as `PT1M5S`; 0 when unparseable.
pub fn iso8601_duration_secs(text: &str) -> u32 {
    let Some(caps) = ISO_DURATION.captures(text.trim()) else {
        return 0;
    };
    // components are not length-limited, so every step saturates
    let part = |i: usize| caps.get(i).map_or(0, |m| m.as_str().parse::<u64>().unwrap_or(u64::MAX));
    let total = part(1)
        .saturating_mul(86_400)
        .saturating_add(part(2).saturating_mul(3_600))
        .saturating_add(part(3).saturating_mul(60))
        .saturating_add(part(4));
    u32::try_from(total).unwrap_or(u32::MAX)
}
