//! Accessibility feature settings, as carried in feature settings query
//! responses and preference-change notifications.

use serde::Serialize;
use serde_json::{json, Value};

use super::methods::Feature;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitlesSettings {
    pub enabled: bool,
    pub size: i64,
    pub font_family: String,
    pub text_colour: String,
    pub text_opacity: i64,
    pub edge_type: String,
    pub edge_colour: String,
    pub background_colour: String,
    pub background_opacity: i64,
    pub window_colour: String,
    pub window_opacity: i64,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueEnhancementSettings {
    pub gain_preference: i64,
    pub gain: i64,
    pub limit_min: i64,
    pub limit_max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenReaderSettings {
    pub enabled: bool,
    pub speed: i64,
    pub voice: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDescriptionSettings {
    pub enabled: bool,
    pub gain_preference: i64,
    pub pan_azimuth_preference: i64,
}

/// Current settings of one accessibility feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSettings {
    Subtitles(SubtitlesSettings),
    DialogueEnhancement(DialogueEnhancementSettings),
    UiMagnifier { enabled: bool, mag_type: String },
    HighContrastUi { enabled: bool, hc_type: String },
    ScreenReader(ScreenReaderSettings),
    ResponseToUserAction { enabled: bool, kind: String },
    AudioDescription(AudioDescriptionSettings),
    InVisionSigning { enabled: bool },
}

impl FeatureSettings {
    pub fn feature(&self) -> Feature {
        match self {
            Self::Subtitles(_) => Feature::Subtitles,
            Self::DialogueEnhancement(_) => Feature::DialogueEnhancement,
            Self::UiMagnifier { .. } => Feature::UiMagnifier,
            Self::HighContrastUi { .. } => Feature::HighContrastUi,
            Self::ScreenReader(_) => Feature::ScreenReader,
            Self::ResponseToUserAction { .. } => Feature::ResponseToUserAction,
            Self::AudioDescription(_) => Feature::AudioDescription,
            Self::InVisionSigning { .. } => Feature::InVisionSigning,
        }
    }

    /// The `value` object sent on the wire.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Subtitles(s) => json!(s),
            Self::DialogueEnhancement(d) => json!({
                "dialogueEnhancementGainPreference": d.gain_preference,
                "dialogueEnhancementGain": d.gain,
                "dialogueEnhancementLimit": {
                    "min": d.limit_min,
                    "max": d.limit_max,
                },
            }),
            Self::UiMagnifier { enabled, mag_type } => json!({
                "enabled": enabled,
                "magType": mag_type,
            }),
            Self::HighContrastUi { enabled, hc_type } => json!({
                "enabled": enabled,
                "hcType": hc_type,
            }),
            Self::ScreenReader(s) => json!(s),
            Self::ResponseToUserAction { enabled, kind } => json!({
                "enabled": enabled,
                "type": kind,
            }),
            Self::AudioDescription(a) => json!(a),
            Self::InVisionSigning { enabled } => json!({ "enabled": enabled }),
        }
    }
}
