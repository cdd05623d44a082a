#![allow(dead_code)]

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::{json, Value};
use tvrpc::app::{AppId, ApplicationCallback};
use tvrpc::rpc::ipplayback::IpPlaybackMethod;
use tvrpc::rpc::media::MediaState;
use tvrpc::rpc::settings::FeatureSettings;
use tvrpc::rpc::subscription::SubscribeOptions;
use tvrpc::rpc::{
    Clock, ConnectionId, Feature, JsonRpcService, MessageSink, RequestId, ServiceConfig,
    SessionCallback,
};

pub const ENDPOINT: &str = "/hbbtv/jsonrpc";
pub const OPAPP_ENDPOINT: &str = "/hbbtv/opapp";

/// Session callback that records each call as a short line. Once given the
/// service it also answers some requests from inside the callback.
#[derive(Default)]
pub struct RecordingCallback {
    pub calls: Mutex<Vec<String>>,
    responder: Mutex<Option<Weak<JsonRpcService>>>,
}

impl RecordingCallback {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock())
    }

    fn responder(&self) -> Option<Arc<JsonRpcService>> {
        self.responder.lock().as_ref().and_then(Weak::upgrade)
    }

    fn push(&self, line: String) {
        self.calls.lock().push(line);
    }
}

impl SessionCallback for RecordingCallback {
    fn negotiate_methods_requested(&self) {
        self.push("negotiate".into());
    }

    fn subscribe(&self, options: SubscribeOptions) {
        self.push(format!("subscribe subtitles={}", options.subtitles));
        if let Some(service) = self.responder() {
            if options.in_vision_signing {
                service.notify_preference_change(&FeatureSettings::InVisionSigning { enabled: true });
            }
        }
    }

    fn unsubscribe(&self, options: SubscribeOptions) {
        self.push(format!("unsubscribe subtitles={}", options.subtitles));
    }

    fn feature_support_info(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature) {
        self.push(format!("support {connection_id} {id} {}", feature.name()));
        if let Some(service) = self.responder() {
            service.respond_feature_support_info(connection_id, id, feature, "tvosSupport");
        }
    }

    fn feature_settings_query(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature) {
        self.push(format!("settings {connection_id} {id} {}", feature.name()));
    }

    fn feature_suppress(&self, connection_id: ConnectionId, id: &RequestId, feature: Feature) {
        self.push(format!("suppress {connection_id} {id} {}", feature.name()));
    }

    fn dialogue_enhancement_override(&self, connection_id: ConnectionId, id: &RequestId, gain: Option<i64>) {
        self.push(format!("de-override {connection_id} {id} {gain:?}"));
    }

    fn trigger_response_to_user_action(&self, connection_id: ConnectionId, id: &RequestId, magnitude: &str) {
        self.push(format!("trigger {connection_id} {id} {magnitude}"));
    }

    fn voice_ready(&self, ready: bool) {
        self.push(format!("voice-ready {ready}"));
    }

    fn state_media(&self, state: MediaState) {
        self.push(format!("state-media {}", state.as_str()));
    }

    fn receive_confirm(&self, connection_id: ConnectionId, id: &RequestId, method: &str) {
        self.push(format!("confirm {connection_id} {id} {method}"));
    }

    fn receive_confirm_select_channel(
        &self,
        connection_id: ConnectionId,
        id: &RequestId,
        method: &str,
        session_id: i64,
    ) {
        self.push(format!("confirm-channel {connection_id} {id} {method} {session_id}"));
    }

    fn receive_error(&self, code: i64, message: &str, method: Option<&str>, data: Option<&str>) {
        self.push(format!("error {code} {message} {method:?} {data:?}"));
    }

    fn ip_playback(&self, method: IpPlaybackMethod, params: &Value) {
        self.push(format!("ipplayback {} {params}", method.method()));
    }

    fn respond_message(&self, message: &str) {
        self.push(format!("say {message}"));
    }
}

/// Sink that keeps every outbound message, parsed.
#[derive(Default)]
pub struct CapturingSink {
    pub sent: Mutex<Vec<(ConnectionId, Value)>>,
}

impl CapturingSink {
    pub fn take(&self) -> Vec<(ConnectionId, Value)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Messages sent to one connection, draining everything.
    pub fn take_for(&self, connection_id: ConnectionId) -> Vec<Value> {
        self.take()
            .into_iter()
            .filter(|(c, _)| *c == connection_id)
            .map(|(_, v)| v)
            .collect()
    }
}

impl MessageSink for CapturingSink {
    fn send(&self, connection_id: ConnectionId, text: String) {
        let value = serde_json::from_str(&text).expect("service sent invalid JSON");
        self.sent.lock().push((connection_id, value));
    }
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

pub struct Harness {
    pub service: Arc<JsonRpcService>,
    pub callback: Arc<RecordingCallback>,
    pub sink: Arc<CapturingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig {
            endpoint: ENDPOINT.into(),
            opapp_endpoint: Some(OPAPP_ENDPOINT.into()),
            require_voice_ready: false,
        })
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let callback = Arc::new(RecordingCallback::default());
        let sink = Arc::new(CapturingSink::default());
        let service = Arc::new(
            JsonRpcService::new(config, callback.clone(), sink.clone())
                .with_clock(Arc::new(FixedClock(NOW))),
        );
        Self {
            service,
            callback,
            sink,
        }
    }

    /// Let the callback answer feature support queries and push the current
    /// signing preference on subscribe, synchronously.
    pub fn answering_inline(self) -> Self {
        *self.callback.responder.lock() = Some(Arc::downgrade(&self.service));
        self
    }

    pub fn connect(&self, connection_id: ConnectionId) {
        assert!(self.service.on_connection(connection_id, ENDPOINT));
    }

    pub fn connect_opapp(&self, connection_id: ConnectionId) {
        assert!(self.service.on_connection(connection_id, OPAPP_ENDPOINT));
    }

    pub fn send(&self, connection_id: ConnectionId, message: Value) {
        self.service.on_message(connection_id, &message.to_string());
    }

    /// Negotiate and drop the response.
    pub fn negotiate(&self, connection_id: ConnectionId, terminal_to_app: &[&str], app_to_terminal: &[&str]) {
        self.send(
            connection_id,
            json!({
                "jsonrpc": "2.0",
                "id": "negotiate",
                "method": "org.hbbtv.negotiateMethods",
                "params": {
                    "terminalToApp": terminal_to_app,
                    "appToTerminal": app_to_terminal,
                }
            }),
        );
        self.sink.take();
        self.callback.take();
    }

    /// Report a playing media session with every action available.
    pub fn playing(&self, connection_id: ConnectionId, state: &str) {
        self.send(connection_id, media_notification(state, 100, 0, 1000));
        self.callback.take();
    }
}

/// Local time used by every harness.
pub const NOW: i64 = 1_700_000_000;

pub fn media_notification(state: &str, current: i64, start: i64, end: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "org.hbbtv.app.state.media",
        "params": {
            "state": state,
            "kind": "audio-video",
            "type": "on-demand",
            "currentTime": current,
            "range": {"start": start, "end": end},
            "availableActions": {
                "pause": true, "play": true, "fast-forward": true, "fast-reverse": true,
                "stop": true, "seek-content": true, "seek-relative": true,
                "seek-live": true, "seek-wallclock": true
            },
            "metadata": {"title": "Evening News", "secondaryTitle": "Part 1", "synopsis": "Headlines"},
            "accessibility": {
                "subtitles": {"enabled": false, "available": true},
                "audioDescription": {"enabled": false, "available": false},
                "signLanguage": {"enabled": false, "available": false}
            }
        }
    })
}

/// Application callback recording lifecycle notifications.
#[derive(Default)]
pub struct RecordingAppCallback {
    pub events: Mutex<Vec<String>>,
}

impl RecordingAppCallback {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl ApplicationCallback for RecordingAppCallback {
    fn state_changed(&self, app_id: AppId, previous: &str, next: &str) {
        self.events.lock().push(format!("{app_id} {previous}->{next}"));
    }

    fn show(&self, app_id: AppId) {
        self.events.lock().push(format!("{app_id} show"));
    }

    fn hide(&self, app_id: AppId) {
        self.events.lock().push(format!("{app_id} hide"));
    }
}
