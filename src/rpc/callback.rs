use serde_json::Value;
use tracing::info;

use super::envelope::RequestId;
use super::ipplayback::IpPlaybackMethod;
use super::media::MediaState;
use super::methods::Feature;
use super::registry::ConnectionId;
use super::subscription::SubscribeOptions;

/// Application-side logic behind the JSON-RPC service.
///
/// Every call has already been validated. Requests carrying an `id` are
/// expected to be answered later through the matching `respond_*` method on
/// [`super::service::JsonRpcService`].
pub trait SessionCallback: Send + Sync {
    fn negotiate_methods_requested(&self);

    fn subscribe(&self, options: SubscribeOptions);

    fn unsubscribe(&self, options: SubscribeOptions);

    fn feature_support_info(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature);

    fn feature_settings_query(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature);

    fn feature_suppress(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature);

    /// `gain` is `None` when the request carried no params, which asks the
    /// terminal to drop any override.
    fn dialogue_enhancement_override(&self, connection_id: ConnectionId, id: &RequestId, gain: Option<i64>);

    /// `magnitude` is one of `triggerPrimary`, `triggerSecondary`,
    /// `triggerException`.
    fn trigger_response_to_user_action(&self, connection_id: ConnectionId, id: &RequestId, magnitude: &str);

    fn voice_ready(&self, ready: bool);

    fn state_media(&self, state: MediaState);

    /// An application confirmed an intent or IP player request.
    fn receive_confirm(&self, connection_id: ConnectionId, id: &RequestId, method: &str);

    fn receive_confirm_select_channel(
        &self,
        connection_id: ConnectionId,
        id: &RequestId,
        method: &str,
        session_id: i64,
    );

    /// A peer reported an error of its own.
    fn receive_error(&self, code: i64, message: &str, method: Option<&str>, data: Option<&str>);

    /// One of the `org.hbbtv.ipplayback.*` reports from an operator
    /// application, with its raw params.
    fn ip_playback(&self, method: IpPlaybackMethod, params: &Value);

    /// Text for the voice assistant to speak.
    fn respond_message(&self, message: &str);
}

/// Session callback that only logs. Used by the standalone server.
#[derive(Debug, Default)]
pub struct LoggingSessionCallback;

impl SessionCallback for LoggingSessionCallback {
    fn negotiate_methods_requested(&self) {
        info!("negotiate methods requested");
    }

    fn subscribe(&self, options: SubscribeOptions) {
        info!(?options, "subscribe");
    }

    fn unsubscribe(&self, options: SubscribeOptions) {
        info!(?options, "unsubscribe");
    }

    fn feature_support_info(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature) {
        info!(connection_id, %id, feature = feature.name(), "feature support info requested");
    }

    fn feature_settings_query(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature) {
        info!(connection_id, %id, feature = feature.name(), "feature settings query");
    }

    fn feature_suppress(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature) {
        info!(connection_id, %id, feature = feature.name(), "feature suppress requested");
    }

    fn dialogue_enhancement_override(&self, connection_id: ConnectionId, id: &RequestId, gain: Option<i64>) {
        info!(connection_id, %id, ?gain, "dialogue enhancement override");
    }

    fn trigger_response_to_user_action(&self, connection_id: ConnectionId, id: &RequestId, magnitude: &str) {
        info!(connection_id, %id, magnitude, "trigger response to user action");
    }

    fn voice_ready(&self, ready: bool) {
        info!(ready, "voice ready");
    }

    fn state_media(&self, state: MediaState) {
        info!(state = state.as_str(), "media state");
    }

    fn receive_confirm(&self, connection_id: ConnectionId, id: &RequestId, method: &str) {
        info!(connection_id, %id, method, "confirmed");
    }

    fn receive_confirm_select_channel(
        &self,
        connection_id: ConnectionId,
        id: &RequestId,
        method: &str,
        session_id: i64,
    ) {
        info!(connection_id, %id, method, session_id, "select channel confirmed");
    }

    fn receive_error(&self, code: i64, message: &str, method: Option<&str>, data: Option<&str>) {
        info!(code, message, ?method, ?data, "peer reported error");
    }

    fn ip_playback(&self, method: IpPlaybackMethod, params: &Value) {
        info!(method = method.method(), %params, "ip playback report");
    }

    fn respond_message(&self, message: &str) {
        info!(message, "voice response");
    }
}
