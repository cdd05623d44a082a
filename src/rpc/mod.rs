//! JSON-RPC control protocol between the terminal and connected
//! applications.
//!
//! [`JsonRpcService`] is the entry point. It is transport-agnostic: inbound
//! text is handed to [`JsonRpcService::on_message`] and everything outbound
//! leaves through a [`MessageSink`].

pub mod callback;
pub mod envelope;
pub mod error;
pub mod intent;
pub mod ipplayback;
pub mod media;
pub mod methods;
pub mod negotiation;
pub mod registry;
pub mod service;
pub mod settings;
pub mod subscription;

pub use callback::{LoggingSessionCallback, SessionCallback};
pub use envelope::RequestId;
pub use error::RpcError;
pub use intent::{Anchor, Intent};
pub use ipplayback::{IpPlaybackMethod, IpPlayerCommand};
pub use methods::Feature;
pub use registry::{ConnectionId, ConnectionRegistry, Direction};
pub use service::{Clock, JsonRpcService, MessageSink, ServiceConfig, SystemClock};
pub use settings::FeatureSettings;
