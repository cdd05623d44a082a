use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::callback::SessionCallback;
use super::envelope::{self, RequestId, RpcRequest, RpcResponse, JSONRPC_VERSION};
use super::error::{RpcError, DIALOGUE_ENHANCEMENT_OVERRIDE_FAILED, DIALOGUE_ENHANCEMENT_OVERRIDE_FAILED_MESSAGE};
use super::intent::Intent;
use super::ipplayback::{IpPlaybackMethod, IpPlayerCommand};
use super::media::parse_state_media;
use super::methods::{self, Feature};
use super::negotiation::filter_methods;
use super::registry::{ConnectionId, ConnectionRegistry, Direction};
use super::settings::FeatureSettings;
use super::subscription::{notify_targets, parse_msg_types};

/// Transport side of the service: delivers serialized messages.
pub trait MessageSink: Send + Sync {
    fn send(&self, connection_id: ConnectionId, text: String);
}

/// Source of local epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// Endpoint and policy settings for [`JsonRpcService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Path clients connect on.
    pub endpoint: String,
    /// Path operator applications connect on, if any.
    pub opapp_endpoint: Option<String>,
    /// Only send intents to connections that reported voice readiness.
    pub require_voice_ready: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::config::DEFAULT_ENDPOINT.to_owned(),
            opapp_endpoint: None,
            require_voice_ready: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Handler {
    NegotiateMethods,
    Subscribe,
    Unsubscribe,
    FeatureSupportInfo,
    FeatureSettingsQuery,
    FeatureSuppress,
    DialogueEnhancementOverride,
    TriggerResponseToUserAction,
    VoiceReady,
    StateMedia,
    Confirm,
    ConfirmSelectChannel,
    IpPlayback(IpPlaybackMethod),
}

fn handler_table() -> HashMap<&'static str, Handler> {
    let mut table = HashMap::from([
        (methods::NEGOTIATE_METHODS, Handler::NegotiateMethods),
        (methods::SUBSCRIBE, Handler::Subscribe),
        (methods::UNSUBSCRIBE, Handler::Unsubscribe),
        (methods::AF_FEATURE_SUPPORT_INFO, Handler::FeatureSupportInfo),
        (methods::AF_FEATURE_SETTINGS_QUERY, Handler::FeatureSettingsQuery),
        (methods::AF_FEATURE_SUPPRESS, Handler::FeatureSuppress),
        (methods::AF_DIALOGUE_ENHANCEMENT_OVERRIDE, Handler::DialogueEnhancementOverride),
        (methods::AF_TRIGGER_RESPONSE_TO_USER_ACTION, Handler::TriggerResponseToUserAction),
        (methods::VOICE_READY, Handler::VoiceReady),
        (methods::STATE_MEDIA, Handler::StateMedia),
    ]);
    // Intents and IP player commands come back as confirmations.
    for method in methods::SUPPORTED_TERMINAL_TO_APP
        .iter()
        .chain(methods::SUPPORTED_TERMINAL_TO_OPAPP)
        .filter(|m| **m != methods::NOTIFY)
    {
        table.insert(*method, Handler::Confirm);
    }
    table.insert(methods::IPPLAYER_SELECT_CHANNEL, Handler::ConfirmSelectChannel);
    for method in methods::SUPPORTED_OPAPP_TO_TERMINAL {
        if let Some(m) = IpPlaybackMethod::from_method(method) {
            table.insert(*method, Handler::IpPlayback(m));
        }
    }
    table
}

const MAGNITUDES: [&str; 3] = ["triggerPrimary", "triggerSecondary", "triggerException"];

/// The terminal's JSON-RPC endpoint: validates inbound messages, keeps
/// per-connection state and fans out notifications and intents.
pub struct JsonRpcService {
    registry: ConnectionRegistry,
    callback: Arc<dyn SessionCallback>,
    sink: Arc<dyn MessageSink>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    handlers: HashMap<&'static str, Handler>,
}

impl JsonRpcService {
    pub fn new(
        config: ServiceConfig,
        callback: Arc<dyn SessionCallback>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        info!(endpoint = %config.endpoint, opapp_endpoint = ?config.opapp_endpoint, "json-rpc service created");
        Self {
            registry: ConnectionRegistry::new(),
            callback,
            sink,
            clock: Arc::new(SystemClock),
            config,
            handlers: handler_table(),
        }
    }

    /// Replace the wall clock, mainly for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Transport lifecycle
    // -----------------------------------------------------------------------

    /// Whether `path` is one of the service endpoints.
    pub fn accepts_path(&self, path: &str) -> bool {
        path == self.config.endpoint || self.config.opapp_endpoint.as_deref() == Some(path)
    }

    /// Validate the endpoint and register the connection. Returns false if
    /// the connection must be refused.
    pub fn on_connection(&self, connection_id: ConnectionId, path: &str) -> bool {
        let op_app = if path == self.config.endpoint {
            false
        } else if self.config.opapp_endpoint.as_deref() == Some(path) {
            true
        } else {
            warn!(connection_id, path, expected = %self.config.endpoint, "unknown endpoint");
            return false;
        };
        self.registry.create(connection_id, op_app);
        info!(connection_id, op_app, "connected");
        true
    }

    pub fn on_disconnected(&self, connection_id: ConnectionId) {
        self.registry.destroy(connection_id);
        info!(connection_id, "disconnected");
    }

    /// Handle one inbound text message. Responses go to the sink.
    pub fn on_message(&self, connection_id: ConnectionId, text: &str) {
        debug!(connection_id, text, "message received");
        let obj: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                debug!(connection_id, ?e, "unparseable message");
                self.reply_error(connection_id, RpcError::ParseError, &Value::Null);
                return;
            }
        };
        if let Err(e) = self.dispatch(connection_id, &obj) {
            self.reply_error(connection_id, e, &obj);
        }
    }

    fn dispatch(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(RpcError::InvalidRequest);
        }

        if obj.get("error").is_some_and(Value::is_object) {
            self.receive_error(obj);
            return Ok(());
        }

        let method = obj
            .get("method")
            .and_then(Value::as_str)
            .ok_or(RpcError::InvalidRequest)?;
        if !self
            .registry
            .is_negotiated(connection_id, Direction::AppToTerminal, method)
        {
            return Err(RpcError::MethodNotFound);
        }
        // A response-shaped message names its real method inside `result`.
        let method = envelope::result_method(obj).unwrap_or(method);
        let handler = *self.handlers.get(method).ok_or(RpcError::MethodNotFound)?;

        self.invoke(handler, connection_id, obj)
    }

    fn reply_error(&self, connection_id: ConnectionId, err: RpcError, obj: &Value) {
        if !err.is_answered() {
            error!(connection_id, "notification failed validation");
            return;
        }
        let id = if err.has_null_id() {
            Value::Null
        } else {
            envelope::request_id(obj).map_or(Value::Null, RequestId::into_value)
        };
        let response = RpcResponse::error(id, err.code(), err.message(), None);
        self.sink.send(connection_id, response.to_string());
    }

    fn reply(&self, connection_id: ConnectionId, id: &RequestId, result: Value) {
        let response = RpcResponse::success(id.as_value().clone(), result);
        self.sink.send(connection_id, response.to_string());
    }

    // -----------------------------------------------------------------------
    // Inbound handlers
    // -----------------------------------------------------------------------

    fn invoke(&self, handler: Handler, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        match handler {
            Handler::NegotiateMethods => self.negotiate_methods(connection_id, obj),
            Handler::Subscribe => self.subscribe(connection_id, obj, true),
            Handler::Unsubscribe => self.subscribe(connection_id, obj, false),
            Handler::FeatureSupportInfo
            | Handler::FeatureSettingsQuery
            | Handler::FeatureSuppress => self.feature_request(handler, connection_id, obj),
            Handler::DialogueEnhancementOverride => self.dialogue_enhancement_override(connection_id, obj),
            Handler::TriggerResponseToUserAction => self.trigger_response_to_user_action(connection_id, obj),
            Handler::VoiceReady => self.voice_ready(connection_id, obj),
            Handler::StateMedia => self.state_media(connection_id, obj),
            Handler::Confirm => self.confirm(connection_id, obj),
            Handler::ConfirmSelectChannel => self.confirm_select_channel(connection_id, obj),
            Handler::IpPlayback(method) => self.ip_playback(method, connection_id, obj),
        }
    }

    fn negotiate_methods(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let params = envelope::params(obj).ok_or(RpcError::InvalidParams)?;
        let terminal_to_app = params
            .get("terminalToApp")
            .and_then(Value::as_array)
            .ok_or(RpcError::InvalidParams)?;
        let app_to_terminal = params
            .get("appToTerminal")
            .and_then(Value::as_array)
            .ok_or(RpcError::InvalidParams)?;

        let terminal_to_app =
            filter_methods(&self.registry, connection_id, terminal_to_app, Direction::TerminalToApp);
        let app_to_terminal =
            filter_methods(&self.registry, connection_id, app_to_terminal, Direction::AppToTerminal);

        self.callback.negotiate_methods_requested();
        self.reply(
            connection_id,
            &id,
            json!({
                "method": methods::NEGOTIATE_METHODS,
                "terminalToApp": terminal_to_app,
                "appToTerminal": app_to_terminal,
            }),
        );
        Ok(())
    }

    fn subscribe(&self, connection_id: ConnectionId, obj: &Value, subscribe: bool) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let msg_types = parse_msg_types(envelope::params(obj))?;

        for topic in &msg_types.topics {
            if subscribe {
                self.registry.subscribe(connection_id, topic);
            } else {
                self.registry.unsubscribe(connection_id, topic);
            }
        }
        if subscribe {
            self.callback.subscribe(msg_types.options);
        } else {
            self.callback.unsubscribe(msg_types.options);
        }
        self.reply(connection_id, &id, json!({ "msgType": msg_types.raw }));
        Ok(())
    }

    fn feature_request(&self, handler: Handler, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let feature = envelope::params(obj)
            .and_then(|p| envelope::str_field(p, "feature"))
            .and_then(Feature::from_name)
            .ok_or(RpcError::InvalidParams)?;
        match handler {
            Handler::FeatureSupportInfo => self.callback.feature_support_info(connection_id, &id, feature),
            Handler::FeatureSettingsQuery => self.callback.feature_settings_query(connection_id, &id, feature),
            Handler::FeatureSuppress => self.callback.feature_suppress(connection_id, &id, feature),
            _ => return Err(RpcError::InvalidRequest),
        }
        Ok(())
    }

    fn dialogue_enhancement_override(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let gain = match obj.get("params") {
            None => None,
            Some(params) => match params.get("dialogueEnhancementGain").and_then(Value::as_i64) {
                Some(gain) => Some(gain),
                None => {
                    self.respond_error(
                        connection_id,
                        Some(&id),
                        DIALOGUE_ENHANCEMENT_OVERRIDE_FAILED,
                        DIALOGUE_ENHANCEMENT_OVERRIDE_FAILED_MESSAGE,
                        None,
                    );
                    return Err(RpcError::NotificationError);
                }
            },
        };
        self.callback.dialogue_enhancement_override(connection_id, &id, gain);
        Ok(())
    }

    fn trigger_response_to_user_action(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let magnitude = envelope::params(obj)
            .and_then(|p| envelope::str_field(p, "magnitude"))
            .filter(|m| MAGNITUDES.contains(m))
            .ok_or(RpcError::InvalidParams)?;
        self.callback
            .trigger_response_to_user_action(connection_id, &id, magnitude);
        Ok(())
    }

    fn voice_ready(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let ready = envelope::params(obj)
            .and_then(|p| envelope::bool_field(p, "ready"))
            .ok_or(RpcError::NotificationError)?;
        self.registry.set_voice_ready(connection_id, ready);
        self.callback.voice_ready(ready);
        Ok(())
    }

    fn state_media(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let params = envelope::params(obj).ok_or(RpcError::NotificationError)?;
        let snapshot = parse_state_media(params, self.clock.now()).map_err(|e| {
            error!(connection_id, %e, "rejected media state");
            RpcError::NotificationError
        })?;
        let Some(state) = snapshot.state else {
            return Err(RpcError::NotificationError);
        };
        debug!(connection_id, state = state.as_str(), title = %snapshot.title, range = ?snapshot.range, "media state stored");
        self.registry.set_media(connection_id, snapshot);
        self.callback.state_media(state);
        Ok(())
    }

    fn confirm(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let method = envelope::result_method(obj).ok_or(RpcError::InvalidParams)?;
        self.callback.receive_confirm(connection_id, &id, method);
        Ok(())
    }

    fn confirm_select_channel(&self, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let method = envelope::result_method(obj).ok_or(RpcError::InvalidParams)?;
        let session_id = obj
            .get("result")
            .and_then(|r| r.get("sessionID"))
            .and_then(Value::as_i64)
            .ok_or(RpcError::InvalidParams)?;
        self.callback
            .receive_confirm_select_channel(connection_id, &id, method, session_id);
        Ok(())
    }

    fn ip_playback(&self, method: IpPlaybackMethod, connection_id: ConnectionId, obj: &Value) -> Result<(), RpcError> {
        let id = envelope::request_id(obj).ok_or(RpcError::InvalidParams)?;
        let params = obj
            .get("params")
            .filter(|p| p.is_object())
            .ok_or(RpcError::InvalidParams)?;
        self.callback.ip_playback(method, params);
        self.reply(connection_id, &id, json!({ "method": method.method() }));
        Ok(())
    }

    fn receive_error(&self, obj: &Value) {
        let error = &obj["error"];
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
        let method = error.get("method").and_then(Value::as_str);
        let data = error.get("data").and_then(Value::as_str);
        self.callback.receive_error(code, message, method, data);
    }

    // -----------------------------------------------------------------------
    // Outbound responses
    // -----------------------------------------------------------------------

    pub fn respond_feature_support_info(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature, value: &str) {
        self.reply(
            connection_id,
            id,
            json!({
                "method": methods::AF_FEATURE_SUPPORT_INFO,
                "feature": feature.name(),
                "value": value,
            }),
        );
    }

    pub fn respond_feature_settings(&self, connection_id: ConnectionId, id: &RequestId, settings: &FeatureSettings) {
        self.reply(
            connection_id,
            id,
            json!({
                "method": methods::AF_FEATURE_SETTINGS_QUERY,
                "feature": settings.feature().name(),
                "value": settings.to_value(),
            }),
        );
    }

    pub fn respond_feature_suppress(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature, value: &str) {
        self.reply(
            connection_id,
            id,
            json!({
                "method": methods::AF_FEATURE_SUPPRESS,
                "feature": feature.name(),
                "value": value,
            }),
        );
    }

    /// `gain` of `None` omits `dialogueEnhancementGain` from the result.
    pub fn respond_dialogue_enhancement_override(&self, connection_id: ConnectionId, id: &RequestId, gain: Option<i64>) {
        let mut result = json!({ "method": methods::AF_DIALOGUE_ENHANCEMENT_OVERRIDE });
        if let Some(gain) = gain {
            result["dialogueEnhancementGain"] = json!(gain);
        }
        self.reply(connection_id, id, result);
    }

    pub fn respond_trigger_response_to_user_action(&self, connection_id: ConnectionId, id: &RequestId, actioned: bool) {
        self.reply(
            connection_id,
            id,
            json!({
                "method": methods::AF_TRIGGER_RESPONSE_TO_USER_ACTION,
                "actioned": actioned,
            }),
        );
    }

    pub fn respond_error(
        &self,
        connection_id: ConnectionId,
        id: Option<&RequestId>,
        code: i64,
        message: &str,
        data: Option<&str>,
    ) {
        let id = id.map_or(Value::Null, |id| id.as_value().clone());
        let response = RpcResponse::error(id, code, message, data.map(str::to_owned));
        self.sink.send(connection_id, response.to_string());
    }

    // -----------------------------------------------------------------------
    // Terminal-initiated messages
    // -----------------------------------------------------------------------

    /// Send a `<feature>PrefChange` notification to every subscribed
    /// connection that negotiated `org.hbbtv.notify`. Returns the recipients.
    pub fn notify_preference_change(&self, settings: &FeatureSettings) -> Vec<ConnectionId> {
        let feature = settings.feature();
        let text = RpcRequest::notify(json!({
            "msgType": feature.pref_change_topic(),
            "value": settings.to_value(),
        }))
        .to_string();
        let targets = notify_targets(&self.registry, feature);
        for &connection_id in &targets {
            self.sink.send(connection_id, text.clone());
        }
        targets
    }

    /// Send a voice intent to every eligible connection. Returns the
    /// recipients.
    pub fn send_intent(&self, intent: &Intent) -> Vec<ConnectionId> {
        let require_voice_ready = self.config.require_voice_ready;
        let targets = self
            .registry
            .select(|_, c| intent.is_eligible(c, require_voice_ready));
        let now = self.clock.now();

        let mut sent = Vec::with_capacity(targets.len());
        for connection_id in targets {
            let Some(id) = self.registry.next_intent_id(connection_id) else {
                continue;
            };
            let media = self.registry.media(connection_id);
            let intent = match intent.reanchored(media.range, media.bias, now) {
                Ok(adjusted) => adjusted,
                Err(e) => {
                    warn!(connection_id, method = intent.method(), %e, "sending intent without re-anchoring");
                    intent.clone()
                }
            };
            let request = RpcRequest::client(id, intent.method(), intent.params());
            self.sink.send(connection_id, request.to_string());
            sent.push(connection_id);
        }
        sent
    }

    /// Send an IP player command to every connection that negotiated it.
    /// Returns the recipients.
    pub fn send_ip_player(&self, command: &IpPlayerCommand) -> Vec<ConnectionId> {
        let method = command.method();
        debug!(method, "sending ip player command");
        let targets = self
            .registry
            .select(|_, c| c.terminal_to_app.contains(method));
        let params = command.params();

        let mut sent = Vec::with_capacity(targets.len());
        for connection_id in targets {
            let Some(id) = self.registry.next_intent_id(connection_id) else {
                continue;
            };
            let request = RpcRequest::client(id, method, params.clone());
            self.sink.send(connection_id, request.to_string());
            sent.push(connection_id);
        }
        sent
    }

    /// Describe what each connection is playing to the voice assistant.
    pub fn voice_request_description(&self) {
        let ids = self.registry.connection_ids();
        if ids.is_empty() {
            self.callback.respond_message(NO_MEDIA_MESSAGE);
            return;
        }
        for connection_id in ids {
            let media = self.registry.media(connection_id);
            if media.title.is_empty() {
                self.callback.respond_message(NO_MEDIA_MESSAGE);
                continue;
            }
            let mut message = format!("You're watching {}", media.title);
            if !media.secondary_title.is_empty() {
                message.push_str(&format!(" {{Secondary title: {}}}", media.secondary_title));
            }
            if !media.synopsis.is_empty() {
                message.push_str(&format!(" \nSynopsis: {}", media.synopsis));
            }
            self.callback.respond_message(&message);
        }
    }
}

const NO_MEDIA_MESSAGE: &str = "No media is playing";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_inbound_method_has_a_handler() {
        let table = handler_table();
        for m in methods::SUPPORTED_APP_TO_TERMINAL
            .iter()
            .chain(methods::SUPPORTED_OPAPP_TO_TERMINAL)
        {
            assert!(table.contains_key(m), "{m} has no handler");
        }
        assert!(!table.contains_key(methods::NOTIFY));
    }

    #[test]
    fn intents_wait_for_voice_ready_by_default() {
        assert!(ServiceConfig::default().require_voice_ready);
    }

    #[test]
    fn confirmations_are_registered_for_outbound_methods() {
        let table = handler_table();
        assert!(matches!(table[methods::INTENT_MEDIA_PAUSE], Handler::Confirm));
        assert!(matches!(table[methods::IPPLAYER_SEEK], Handler::Confirm));
        assert!(matches!(
            table[methods::IPPLAYER_SELECT_CHANNEL],
            Handler::ConfirmSelectChannel
        ));
    }
}
