//! Media session snapshot reported by applications through
//! `org.hbbtv.app.state.media`, and the validation applied to it.

use serde_json::{Map, Value};
use thiserror::Error;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Playback state tag of the last reported media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    NoMedia,
    Error,
    Buffering,
    Paused,
    Playing,
    Stopped,
}

impl MediaState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no-media" => Some(Self::NoMedia),
            "error" => Some(Self::Error),
            "buffering" => Some(Self::Buffering),
            "paused" => Some(Self::Paused),
            "playing" => Some(Self::Playing),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMedia => "no-media",
            Self::Error => "error",
            Self::Buffering => "buffering",
            Self::Paused => "paused",
            Self::Playing => "playing",
            Self::Stopped => "stopped",
        }
    }

    fn has_timeline(&self) -> bool {
        matches!(self, Self::Buffering | Self::Paused | Self::Playing)
    }
}

/// Which intents the application currently accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvailableActions {
    pub pause: bool,
    pub play: bool,
    pub fast_forward: bool,
    pub fast_reverse: bool,
    pub stop: bool,
    pub seek_content: bool,
    pub seek_relative: bool,
    pub seek_live: bool,
    pub seek_wallclock: bool,
}

impl AvailableActions {
    /// Read the flags from an `availableActions` object. Anything that is not
    /// literally `true` counts as unavailable.
    pub fn from_json(actions: &Map<String, Value>) -> Self {
        let flag = |name: &str| actions.get(name).and_then(Value::as_bool).unwrap_or(false);
        Self {
            pause: flag("pause"),
            play: flag("play"),
            fast_forward: flag("fast-forward"),
            fast_reverse: flag("fast-reverse"),
            stop: flag("stop"),
            seek_content: flag("seek-content"),
            seek_relative: flag("seek-relative"),
            seek_live: flag("seek-live"),
            seek_wallclock: flag("seek-wallclock"),
        }
    }
}

/// Known media timeline, in local epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn clamp(&self, t: i64) -> i64 {
        t.max(self.start).min(self.end)
    }
}

/// Last-known media session of one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSnapshot {
    /// `None` until the application first reports its state.
    pub state: Option<MediaState>,
    pub actions: AvailableActions,
    pub title: String,
    pub secondary_title: String,
    pub synopsis: String,
    pub media_id: String,
    pub range: Option<TimeRange>,
    /// Peer-reported current time minus local time when it was reported.
    pub bias: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid state media notification: {0}")]
pub struct InvalidMedia(pub &'static str);

/// Validate the params of an `org.hbbtv.app.state.media` notification and
/// turn them into a snapshot. `now` is local epoch seconds.
pub fn parse_state_media(params: &Map<String, Value>, now: i64) -> Result<MediaSnapshot, InvalidMedia> {
    let state = params
        .get("state")
        .and_then(Value::as_str)
        .and_then(MediaState::parse)
        .ok_or(InvalidMedia("state"))?;
    let actions = params
        .get("availableActions")
        .and_then(Value::as_object)
        .ok_or(InvalidMedia("availableActions"))?;

    let mut snapshot = MediaSnapshot {
        state: Some(state),
        actions: AvailableActions::from_json(actions),
        ..Default::default()
    };

    if matches!(state, MediaState::NoMedia | MediaState::Error) {
        return Ok(snapshot);
    }

    let kind = params.get("kind").and_then(Value::as_str);
    if !matches!(kind, Some("audio") | Some("audio-video")) {
        return Err(InvalidMedia("kind"));
    }
    let media_type = params.get("type").and_then(Value::as_str);
    if !matches!(media_type, Some("live") | Some("on-demand")) {
        return Err(InvalidMedia("type"));
    }

    let metadata = params
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or(InvalidMedia("metadata"))?;
    let text = |key: &str| {
        metadata
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    snapshot.title = text("title");
    snapshot.secondary_title = text("secondaryTitle");
    snapshot.synopsis = text("synopsis");
    snapshot.media_id = text("mediaId");
    if snapshot.title.is_empty() {
        return Err(InvalidMedia("metadata.title"));
    }

    if !state.has_timeline() {
        return Ok(snapshot);
    }

    let current = params.get("currentTime").ok_or(InvalidMedia("currentTime"))?;
    let range = params
        .get("range")
        .and_then(Value::as_object)
        .ok_or(InvalidMedia("range"))?;
    let start = range.get("start").ok_or(InvalidMedia("range.start"))?;
    let end = range.get("end").ok_or(InvalidMedia("range.end"))?;

    let (current, start, end, bias) = resolve_timeline(current, start, end, now)?;
    if current < 0 || start < 0 || end < 0 || current < start || current > end {
        return Err(InvalidMedia("currentTime outside range"));
    }
    snapshot.range = Some(TimeRange { start, end });
    snapshot.bias = bias;

    let accessibility = params.get("accessibility").and_then(Value::as_object);
    for item in ["subtitles", "audioDescription", "signLanguage"] {
        let entry = accessibility
            .and_then(|a| a.get(item))
            .and_then(Value::as_object);
        let ok = entry.is_some_and(|e| {
            e.get("enabled").is_some_and(Value::is_boolean)
                && e.get("available").is_some_and(Value::is_boolean)
        });
        if !ok {
            return Err(InvalidMedia("accessibility"));
        }
    }

    Ok(snapshot)
}

/// Returns `(current, start, end, bias)` in local epoch seconds.
///
/// Numeric times are media-relative and get re-based onto `now`. ISO-8601
/// times are absolute, and the bias records how far the peer's clock is from
/// ours.
fn resolve_timeline(
    current: &Value,
    start: &Value,
    end: &Value,
    now: i64,
) -> Result<(i64, i64, i64, i64), InvalidMedia> {
    match (current, start, end) {
        (Value::Number(c), Value::Number(s), Value::Number(e)) => {
            let (c, s, e) = match (c.as_f64(), s.as_f64(), e.as_f64()) {
                (Some(c), Some(s), Some(e)) => (c, s, e),
                _ => return Err(InvalidMedia("range")),
            };
            let start = now as f64 + (s - c);
            let end = now as f64 + (e - c);
            let limit = i32::MAX as f64;
            if !(start.is_finite() && end.is_finite()) || start.abs() > limit || end.abs() > limit {
                return Err(InvalidMedia("range"));
            }
            Ok((now, start as i64, end as i64, 0))
        }
        (Value::String(c), Value::String(s), Value::String(e)) => {
            let c = parse_iso8601(c).ok_or(InvalidMedia("currentTime"))?;
            let s = parse_iso8601(s).ok_or(InvalidMedia("range.start"))?;
            let e = parse_iso8601(e).ok_or(InvalidMedia("range.end"))?;
            Ok((c, s, e, c - now))
        }
        _ => Err(InvalidMedia("currentTime and range must share a representation")),
    }
}

/// Parse an ISO-8601 date-time to epoch seconds. A missing offset means UTC.
pub fn parse_iso8601(s: &str) -> Option<i64> {
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(t.unix_timestamp());
    }
    if let Ok(t) = OffsetDateTime::parse(s, &Iso8601::DEFAULT) {
        return Some(t.unix_timestamp());
    }
    PrimitiveDateTime::parse(s, &Iso8601::DEFAULT)
        .ok()
        .map(|t| t.assume_utc().unix_timestamp())
}

/// Format epoch seconds as an RFC 3339 UTC timestamp, e.g. `2024-05-01T12:00:00Z`.
pub fn format_iso8601(secs: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()?
        .format(&Rfc3339)
        .ok()
}
