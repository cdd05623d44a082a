//! Voice-originated intents sent from the terminal to applications.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::media::{format_iso8601, parse_iso8601, MediaState, TimeRange};
use super::methods::*;
use super::registry::ConnectionData;

/// Reference point of a content seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Pause,
    Play,
    FastForward,
    FastReverse,
    Stop,
    SeekContent { anchor: Anchor, offset: i64 },
    SeekRelative { offset: i64 },
    SeekLive { offset: i64 },
    /// `date_time` is an ISO-8601 timestamp.
    SeekWallclock { date_time: String },
    Search { query: String },
    Display { media_id: String },
    Playback {
        media_id: String,
        anchor: Option<Anchor>,
        offset: Option<i64>,
    },
}

impl Intent {
    pub fn method(&self) -> &'static str {
        match self {
            Intent::Pause => INTENT_MEDIA_PAUSE,
            Intent::Play => INTENT_MEDIA_PLAY,
            Intent::FastForward => INTENT_MEDIA_FAST_FORWARD,
            Intent::FastReverse => INTENT_MEDIA_FAST_REVERSE,
            Intent::Stop => INTENT_MEDIA_STOP,
            Intent::SeekContent { .. } => INTENT_MEDIA_SEEK_CONTENT,
            Intent::SeekRelative { .. } => INTENT_MEDIA_SEEK_RELATIVE,
            Intent::SeekLive { .. } => INTENT_MEDIA_SEEK_LIVE,
            Intent::SeekWallclock { .. } => INTENT_MEDIA_SEEK_WALLCLOCK,
            Intent::Search { .. } => INTENT_SEARCH,
            Intent::Display { .. } => INTENT_DISPLAY,
            Intent::Playback { .. } => INTENT_PLAYBACK,
        }
    }

    /// Request params. Always carries `"origin": "voice"`.
    pub fn params(&self) -> Value {
        let mut params = Map::new();
        params.insert("origin".into(), json!("voice"));
        match self {
            Intent::SeekContent { anchor, offset } => {
                params.insert("anchor".into(), json!(anchor));
                params.insert("offset".into(), json!(offset));
            }
            Intent::SeekRelative { offset } | Intent::SeekLive { offset } => {
                params.insert("offset".into(), json!(offset));
            }
            Intent::SeekWallclock { date_time } => {
                params.insert("date-time".into(), json!(date_time));
            }
            Intent::Search { query } => {
                params.insert("query".into(), json!(query));
            }
            Intent::Display { media_id } => {
                params.insert("mediaId".into(), json!(media_id));
            }
            Intent::Playback {
                media_id,
                anchor,
                offset,
            } => {
                params.insert("mediaId".into(), json!(media_id));
                if let Some(anchor) = anchor {
                    params.insert("anchor".into(), json!(anchor));
                }
                if let Some(offset) = offset {
                    params.insert("offset".into(), json!(offset));
                }
            }
            _ => {}
        }
        Value::Object(params)
    }

    /// Media intents are only sent while the application reports a usable
    /// media state.
    pub fn is_media_gated(&self) -> bool {
        !matches!(
            self,
            Intent::Search { .. } | Intent::Display { .. } | Intent::Playback { .. }
        )
    }

    fn action_available(&self, c: &ConnectionData) -> bool {
        let a = &c.media.actions;
        match self {
            Intent::Pause => a.pause,
            Intent::Play => a.play,
            Intent::FastForward => a.fast_forward,
            Intent::FastReverse => a.fast_reverse,
            Intent::Stop => a.stop,
            Intent::SeekContent { .. } => a.seek_content,
            Intent::SeekRelative { .. } => a.seek_relative,
            Intent::SeekLive { .. } => a.seek_live,
            Intent::SeekWallclock { .. } => a.seek_wallclock,
            _ => true,
        }
    }

    /// Whether a connection should receive this intent.
    pub fn is_eligible(&self, c: &ConnectionData, require_voice_ready: bool) -> bool {
        if require_voice_ready && !c.voice_ready {
            return false;
        }
        if !c.terminal_to_app.contains(self.method()) {
            return false;
        }
        if !self.is_media_gated() {
            return true;
        }
        match c.media.state {
            None | Some(MediaState::NoMedia) | Some(MediaState::Error) => false,
            Some(MediaState::Stopped) => matches!(self, Intent::Play) && c.media.actions.play,
            Some(state) => match self {
                Intent::Pause => c.media.actions.pause && state != MediaState::Paused,
                other => other.action_available(c),
            },
        }
    }

    /// Clamp the requested position into the connection's known time range
    /// and rewrite the offset or date-time accordingly. Intents without a
    /// time component come back unchanged.
    ///
    /// `now` is local epoch seconds.
    pub fn reanchored(&self, range: Option<TimeRange>, bias: i64, now: i64) -> Result<Intent, ReanchorSkipped> {
        let needs_range = matches!(
            self,
            Intent::SeekContent { .. }
                | Intent::SeekRelative { .. }
                | Intent::SeekLive { .. }
                | Intent::SeekWallclock { .. }
                | Intent::Playback { offset: Some(_), .. }
        );
        if !needs_range {
            return Ok(self.clone());
        }
        let range = range.ok_or(ReanchorSkipped::UnknownRange)?;

        let anchor_time = |anchor: Option<Anchor>| match anchor {
            Some(Anchor::Start) => range.start,
            Some(Anchor::End) => range.end,
            None => now + bias,
        };
        let clamp_offset = |anchor: Option<Anchor>, offset: i64| {
            let base = anchor_time(anchor);
            range.clamp(base.saturating_add(offset)) - base
        };

        let intent = match self {
            Intent::SeekContent { anchor, offset } => Intent::SeekContent {
                anchor: *anchor,
                offset: clamp_offset(Some(*anchor), *offset),
            },
            Intent::SeekRelative { offset } => Intent::SeekRelative {
                offset: clamp_offset(None, *offset),
            },
            Intent::SeekLive { offset } => Intent::SeekLive {
                offset: clamp_offset(None, *offset),
            },
            Intent::Playback {
                media_id,
                anchor,
                offset: Some(offset),
            } => Intent::Playback {
                media_id: media_id.clone(),
                anchor: *anchor,
                offset: Some(clamp_offset(*anchor, *offset)),
            },
            Intent::SeekWallclock { date_time } => {
                let target = parse_iso8601(date_time).ok_or(ReanchorSkipped::BadDateTime)?;
                let date_time =
                    format_iso8601(range.clamp(target)).ok_or(ReanchorSkipped::BadDateTime)?;
                Intent::SeekWallclock { date_time }
            }
            other => other.clone(),
        };
        Ok(intent)
    }
}

/// Why an intent went out without re-anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReanchorSkipped {
    #[error("media time range is not known")]
    UnknownRange,
    #[error("date-time is not valid ISO-8601")]
    BadDateTime,
}
