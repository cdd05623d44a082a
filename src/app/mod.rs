//! The running interactive application and its lifecycle.

pub mod countdown;
pub mod host;
pub mod opapp;

use tracing::info;

pub use host::ApplicationHost;
pub use opapp::{OpAppState, StateRequest};

pub type AppId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    /// Broadcast-related HbbTV application.
    Hbbtv,
    /// Operator application.
    OpApp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: AppId,
    pub kind: AppKind,
    pub loaded_url: String,
    pub base_url: String,
    pub entry_url: String,
    pub broadcast_related: bool,
    /// Lifecycle state, operator applications only.
    pub state: Option<OpAppState>,
}

/// Launch description of an application signalled by the broadcaster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppDescriptor {
    pub base_url: String,
    pub initial_path: String,
    /// Extra query parameters appended to the loaded URL, without a leading
    /// `?` or `&`.
    pub url_params: String,
    pub broadcast_related: bool,
}

impl AppDescriptor {
    /// Base URL joined with the initial path.
    pub fn entry_url(&self) -> String {
        match (self.base_url.ends_with('/'), self.initial_path.starts_with('/')) {
            (true, true) => format!("{}{}", self.base_url, &self.initial_path[1..]),
            (false, false) if !self.initial_path.is_empty() => {
                format!("{}/{}", self.base_url, self.initial_path)
            }
            _ => format!("{}{}", self.base_url, self.initial_path),
        }
    }

    /// Entry URL with the extra parameters merged into its query string.
    pub fn loaded_url(&self) -> String {
        let entry = self.entry_url();
        if self.url_params.is_empty() {
            return entry;
        }
        let (before_fragment, fragment) = match entry.find('#') {
            Some(i) => entry.split_at(i),
            None => (entry.as_str(), ""),
        };
        let sep = if before_fragment.contains('?') { '&' } else { '?' };
        format!("{before_fragment}{sep}{}{fragment}", self.url_params)
    }
}

/// Lifecycle and visibility notifications. State names are the hyphenated
/// forms returned by [`OpAppState::as_str`].
pub trait ApplicationCallback: Send + Sync {
    fn state_changed(&self, app_id: AppId, previous: &str, next: &str);

    fn show(&self, app_id: AppId);

    fn hide(&self, app_id: AppId);
}

/// Application callback that only logs.
#[derive(Debug, Default)]
pub struct LoggingApplicationCallback;

impl ApplicationCallback for LoggingApplicationCallback {
    fn state_changed(&self, app_id: AppId, previous: &str, next: &str) {
        info!(app_id, previous, next, "operator application state changed");
    }

    fn show(&self, app_id: AppId) {
        info!(app_id, "show application");
    }

    fn hide(&self, app_id: AppId) {
        info!(app_id, "hide application");
    }
}
