//! Playback control exchanged with an operator application's video window.

use serde_json::{json, Value};

use super::methods::*;

/// Terminal -> operator application commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpPlayerCommand {
    SelectChannel {
        channel_type: i64,
        id_type: i64,
        ip_broadcast_id: String,
    },
    Play { session_id: i64 },
    Pause { session_id: i64 },
    Stop { session_id: i64 },
    Resume { session_id: i64 },
    Seek {
        session_id: i64,
        offset: i64,
        reference: i64,
    },
    SetVideoWindow {
        session_id: i64,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    SetRelativeVolume { session_id: i64, volume: i64 },
    SelectComponents {
        session_id: i64,
        video: Vec<i64>,
        audio: Vec<i64>,
        subtitles: Vec<i64>,
    },
    ResolveTimeline {
        session_id: i64,
        timeline_selector: String,
    },
}

impl IpPlayerCommand {
    pub fn method(&self) -> &'static str {
        match self {
            Self::SelectChannel { .. } => IPPLAYER_SELECT_CHANNEL,
            Self::Play { .. } => IPPLAYER_PLAY,
            Self::Pause { .. } => IPPLAYER_PAUSE,
            Self::Stop { .. } => IPPLAYER_STOP,
            Self::Resume { .. } => IPPLAYER_RESUME,
            Self::Seek { .. } => IPPLAYER_SEEK,
            Self::SetVideoWindow { .. } => IPPLAYER_SET_VIDEO_WINDOW,
            Self::SetRelativeVolume { .. } => IPPLAYER_SET_RELATIVE_VOLUME,
            Self::SelectComponents { .. } => IPPLAYER_SELECT_COMPONENTS,
            Self::ResolveTimeline { .. } => IPPLAYER_RESOLVE_TIMELINE,
        }
    }

    pub fn params(&self) -> Value {
        match self {
            Self::SelectChannel {
                channel_type,
                id_type,
                ip_broadcast_id,
            } => json!({
                "channelType": channel_type,
                "idType": id_type,
                "ipBroadcastID": ip_broadcast_id,
            }),
            Self::Play { session_id }
            | Self::Pause { session_id }
            | Self::Stop { session_id }
            | Self::Resume { session_id } => json!({ "sessionID": session_id }),
            Self::Seek {
                session_id,
                offset,
                reference,
            } => json!({
                "sessionID": session_id,
                "offset": offset,
                "reference": reference,
            }),
            Self::SetVideoWindow {
                session_id,
                x,
                y,
                width,
                height,
            } => json!({
                "sessionID": session_id,
                "x": x,
                "y": y,
                "width": width,
                "height": height,
            }),
            Self::SetRelativeVolume { session_id, volume } => json!({
                "sessionID": session_id,
                "volume": volume,
            }),
            Self::SelectComponents {
                session_id,
                video,
                audio,
                subtitles,
            } => json!({
                "sessionID": session_id,
                "videoComponents": video,
                "audioComponents": audio,
                "subtitleComponents": subtitles,
            }),
            Self::ResolveTimeline {
                session_id,
                timeline_selector,
            } => json!({
                "sessionID": session_id,
                "timelineSelector": timeline_selector,
            }),
        }
    }
}

/// Operator application -> terminal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpPlaybackMethod {
    StatusUpdate,
    MediaPositionUpdate,
    SetComponents,
    SetTimelineMapping,
    SetPresentFollowing,
}

impl IpPlaybackMethod {
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            IPPLAYBACK_STATUS_UPDATE => Some(Self::StatusUpdate),
            IPPLAYBACK_MEDIA_POSITION_UPDATE => Some(Self::MediaPositionUpdate),
            IPPLAYBACK_SET_COMPONENTS => Some(Self::SetComponents),
            IPPLAYBACK_SET_TIMELINE_MAPPING => Some(Self::SetTimelineMapping),
            IPPLAYBACK_SET_PRESENT_FOLLOWING => Some(Self::SetPresentFollowing),
            _ => None,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::StatusUpdate => IPPLAYBACK_STATUS_UPDATE,
            Self::MediaPositionUpdate => IPPLAYBACK_MEDIA_POSITION_UPDATE,
            Self::SetComponents => IPPLAYBACK_SET_COMPONENTS,
            Self::SetTimelineMapping => IPPLAYBACK_SET_TIMELINE_MAPPING,
            Self::SetPresentFollowing => IPPLAYBACK_SET_PRESENT_FOLLOWING,
        }
    }
}
