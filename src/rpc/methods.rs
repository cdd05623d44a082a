//! Method name catalogue and the fixed negotiation tables.
//!
//! Every string here is part of the wire compatibility surface and must be
//! reproduced verbatim.

pub const NEGOTIATE_METHODS: &str = "org.hbbtv.negotiateMethods";
pub const SUBSCRIBE: &str = "org.hbbtv.subscribe";
pub const UNSUBSCRIBE: &str = "org.hbbtv.unsubscribe";
pub const NOTIFY: &str = "org.hbbtv.notify";

pub const AF_FEATURE_SUPPORT_INFO: &str = "org.hbbtv.af.featureSupportInfo";
pub const AF_FEATURE_SETTINGS_QUERY: &str = "org.hbbtv.af.featureSettingsQuery";
pub const AF_FEATURE_SUPPRESS: &str = "org.hbbtv.af.featureSuppress";
pub const AF_DIALOGUE_ENHANCEMENT_OVERRIDE: &str = "org.hbbtv.af.dialogueEnhancementOverride";
pub const AF_TRIGGER_RESPONSE_TO_USER_ACTION: &str = "org.hbbtv.af.triggerResponseToUserAction";

pub const VOICE_READY: &str = "org.hbbtv.app.voice.ready";
pub const STATE_MEDIA: &str = "org.hbbtv.app.state.media";

pub const INTENT_MEDIA_PAUSE: &str = "org.hbbtv.app.intent.media.pause";
pub const INTENT_MEDIA_PLAY: &str = "org.hbbtv.app.intent.media.play";
pub const INTENT_MEDIA_FAST_FORWARD: &str = "org.hbbtv.app.intent.media.fast-forward";
pub const INTENT_MEDIA_FAST_REVERSE: &str = "org.hbbtv.app.intent.media.fast-reverse";
pub const INTENT_MEDIA_STOP: &str = "org.hbbtv.app.intent.media.stop";
pub const INTENT_MEDIA_SEEK_CONTENT: &str = "org.hbbtv.app.intent.media.seek-content";
pub const INTENT_MEDIA_SEEK_RELATIVE: &str = "org.hbbtv.app.intent.media.seek-relative";
pub const INTENT_MEDIA_SEEK_LIVE: &str = "org.hbbtv.app.intent.media.seek-live";
pub const INTENT_MEDIA_SEEK_WALLCLOCK: &str = "org.hbbtv.app.intent.media.seek-wallclock";
pub const INTENT_SEARCH: &str = "org.hbbtv.app.intent.search";
pub const INTENT_DISPLAY: &str = "org.hbbtv.app.intent.display";
pub const INTENT_PLAYBACK: &str = "org.hbbtv.app.intent.playback";

// Operator application video window -> terminal
pub const IPPLAYBACK_STATUS_UPDATE: &str = "org.hbbtv.ipplayback.statusUpdate";
pub const IPPLAYBACK_MEDIA_POSITION_UPDATE: &str = "org.hbbtv.ipplayback.mediaPositionUpdate";
pub const IPPLAYBACK_SET_COMPONENTS: &str = "org.hbbtv.ipplayback.setComponents";
pub const IPPLAYBACK_SET_TIMELINE_MAPPING: &str = "org.hbbtv.ipplayback.setTimelineMapping";
pub const IPPLAYBACK_SET_PRESENT_FOLLOWING: &str = "org.hbbtv.ipplayback.setPresentFollowing";

// Terminal -> operator application video window
pub const IPPLAYER_SELECT_CHANNEL: &str = "org.hbbtv.ipplayer.selectChannel";
pub const IPPLAYER_STOP: &str = "org.hbbtv.ipplayer.stop";
pub const IPPLAYER_PLAY: &str = "org.hbbtv.ipplayer.play";
pub const IPPLAYER_SET_VIDEO_WINDOW: &str = "org.hbbtv.ipplayer.setVideoWindow";
pub const IPPLAYER_SET_RELATIVE_VOLUME: &str = "org.hbbtv.ipplayer.setRelativeVolume";
pub const IPPLAYER_PAUSE: &str = "org.hbbtv.ipplayer.pause";
pub const IPPLAYER_RESUME: &str = "org.hbbtv.ipplayer.resume";
pub const IPPLAYER_SEEK: &str = "org.hbbtv.ipplayer.seek";
pub const IPPLAYER_SELECT_COMPONENTS: &str = "org.hbbtv.ipplayer.selectComponents";
pub const IPPLAYER_RESOLVE_TIMELINE: &str = "org.hbbtv.ipplayer.resolveTimeline";

/// Methods any peer may negotiate in the app -> terminal direction.
pub const SUPPORTED_APP_TO_TERMINAL: &[&str] = &[
    NEGOTIATE_METHODS,
    SUBSCRIBE,
    UNSUBSCRIBE,
    AF_FEATURE_SUPPORT_INFO,
    AF_FEATURE_SETTINGS_QUERY,
    AF_FEATURE_SUPPRESS,
    AF_DIALOGUE_ENHANCEMENT_OVERRIDE,
    AF_TRIGGER_RESPONSE_TO_USER_ACTION,
    VOICE_READY,
    STATE_MEDIA,
];

/// Methods any peer may negotiate in the terminal -> app direction.
pub const SUPPORTED_TERMINAL_TO_APP: &[&str] = &[
    NOTIFY,
    INTENT_MEDIA_PAUSE,
    INTENT_MEDIA_PLAY,
    INTENT_MEDIA_FAST_FORWARD,
    INTENT_MEDIA_FAST_REVERSE,
    INTENT_MEDIA_STOP,
    INTENT_MEDIA_SEEK_CONTENT,
    INTENT_MEDIA_SEEK_RELATIVE,
    INTENT_MEDIA_SEEK_LIVE,
    INTENT_MEDIA_SEEK_WALLCLOCK,
    INTENT_SEARCH,
    INTENT_DISPLAY,
    INTENT_PLAYBACK,
];

/// Extra app -> terminal methods only an operator application may negotiate.
pub const SUPPORTED_OPAPP_TO_TERMINAL: &[&str] = &[
    IPPLAYBACK_STATUS_UPDATE,
    IPPLAYBACK_MEDIA_POSITION_UPDATE,
    IPPLAYBACK_SET_COMPONENTS,
    IPPLAYBACK_SET_TIMELINE_MAPPING,
    IPPLAYBACK_SET_PRESENT_FOLLOWING,
];

/// Extra terminal -> app methods only an operator application may negotiate.
pub const SUPPORTED_TERMINAL_TO_OPAPP: &[&str] = &[
    IPPLAYER_SELECT_CHANNEL,
    IPPLAYER_STOP,
    IPPLAYER_PLAY,
    IPPLAYER_SET_VIDEO_WINDOW,
    IPPLAYER_SET_RELATIVE_VOLUME,
    IPPLAYER_PAUSE,
    IPPLAYER_RESUME,
    IPPLAYER_SEEK,
    IPPLAYER_SELECT_COMPONENTS,
    IPPLAYER_RESOLVE_TIMELINE,
];

/// Suffix that turns a feature name into a subscribable message type.
pub const PREF_CHANGE_SUFFIX: &str = "PrefChange";

/// Accessibility features with their stable protocol ids (0-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Subtitles,
    DialogueEnhancement,
    UiMagnifier,
    HighContrastUi,
    ScreenReader,
    ResponseToUserAction,
    AudioDescription,
    InVisionSigning,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Subtitles,
        Feature::DialogueEnhancement,
        Feature::UiMagnifier,
        Feature::HighContrastUi,
        Feature::ScreenReader,
        Feature::ResponseToUserAction,
        Feature::AudioDescription,
        Feature::InVisionSigning,
    ];

    pub fn id(self) -> u8 {
        match self {
            Feature::Subtitles => 0,
            Feature::DialogueEnhancement => 1,
            Feature::UiMagnifier => 2,
            Feature::HighContrastUi => 3,
            Feature::ScreenReader => 4,
            Feature::ResponseToUserAction => 5,
            Feature::AudioDescription => 6,
            Feature::InVisionSigning => 7,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Wire name of the feature (e.g. `"highContrastUI"`).
    pub fn name(self) -> &'static str {
        match self {
            Feature::Subtitles => "subtitles",
            Feature::DialogueEnhancement => "dialogueEnhancement",
            Feature::UiMagnifier => "uiMagnifier",
            Feature::HighContrastUi => "highContrastUI",
            Feature::ScreenReader => "screenReader",
            Feature::ResponseToUserAction => "responseToUserAction",
            Feature::AudioDescription => "audioDescription",
            Feature::InVisionSigning => "inVisionSigning",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Subscription topic for preference changes of this feature.
    pub fn pref_change_topic(self) -> String {
        format!("{}{}", self.name(), PREF_CHANGE_SUFFIX)
    }

    /// Resolve a `<feature>PrefChange` message type back to its feature.
    pub fn from_pref_change_topic(topic: &str) -> Option<Self> {
        topic
            .strip_suffix(PREF_CHANGE_SUFFIX)
            .and_then(Self::from_name)
    }
}
