use serde_json::{Map, Value};

use super::error::RpcError;
use super::methods::{Feature, NOTIFY};
use super::registry::{ConnectionId, ConnectionRegistry};

/// Features named by a subscribe or unsubscribe request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub subtitles: bool,
    pub dialogue_enhancement: bool,
    pub ui_magnifier: bool,
    pub high_contrast_ui: bool,
    pub screen_reader: bool,
    pub response_to_user_action: bool,
    pub audio_description: bool,
    pub in_vision_signing: bool,
}

impl SubscribeOptions {
    pub fn set(&mut self, feature: Feature) {
        let flag = match feature {
            Feature::Subtitles => &mut self.subtitles,
            Feature::DialogueEnhancement => &mut self.dialogue_enhancement,
            Feature::UiMagnifier => &mut self.ui_magnifier,
            Feature::HighContrastUi => &mut self.high_contrast_ui,
            Feature::ScreenReader => &mut self.screen_reader,
            Feature::ResponseToUserAction => &mut self.response_to_user_action,
            Feature::AudioDescription => &mut self.audio_description,
            Feature::InVisionSigning => &mut self.in_vision_signing,
        };
        *flag = true;
    }
}

/// A validated `msgType` list.
#[derive(Debug, Clone)]
pub struct MsgTypes {
    /// The array exactly as received, echoed back in the response.
    pub raw: Vec<Value>,
    pub topics: Vec<String>,
    pub options: SubscribeOptions,
}

/// Validate `params.msgType`. Every entry must be `<feature>PrefChange` for a
/// known feature; one bad entry rejects the whole list.
pub fn parse_msg_types(params: Option<&Map<String, Value>>) -> Result<MsgTypes, RpcError> {
    let raw = params
        .and_then(|p| p.get("msgType"))
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or(RpcError::InvalidParams)?;

    let mut topics = Vec::with_capacity(raw.len());
    let mut options = SubscribeOptions::default();
    for entry in raw {
        let topic = entry.as_str().ok_or(RpcError::InvalidParams)?;
        let feature = Feature::from_pref_change_topic(topic).ok_or(RpcError::InvalidParams)?;
        options.set(feature);
        topics.push(topic.to_owned());
    }

    Ok(MsgTypes {
        raw: raw.clone(),
        topics,
        options,
    })
}

/// Connections that must receive a preference change for `feature`: those
/// subscribed to its topic that also negotiated `org.hbbtv.notify`.
pub fn notify_targets(registry: &ConnectionRegistry, feature: Feature) -> Vec<ConnectionId> {
    let topic = feature.pref_change_topic();
    registry.select(|_, c| c.subscriptions.contains(&topic) && c.terminal_to_app.contains(NOTIFY))
}
