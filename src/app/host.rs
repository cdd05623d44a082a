use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::countdown::{Countdown, CountdownExpired};
use super::opapp::{self, OpAppState, StateRequest};
use super::{AppDescriptor, AppId, AppKind, Application, ApplicationCallback};

pub const DEFAULT_COUNTDOWN: Duration = Duration::from_secs(60);

/// Owns the single current application and drives its lifecycle.
///
/// Cheap to clone. Created inside a tokio runtime, whose handle then runs the
/// countdowns and the expiry task, so every other method may be called from
/// any thread. The expiry task ends once every clone is dropped.
#[derive(Clone)]
pub struct ApplicationHost {
    inner: Arc<Mutex<HostInner>>,
    callback: Arc<dyn ApplicationCallback>,
}

struct HostInner {
    next_id: AppId,
    current: Option<Running>,
    countdown_duration: Duration,
    expired_tx: mpsc::UnboundedSender<CountdownExpired>,
    runtime: Handle,
}

struct Running {
    app: Application,
    countdown: Countdown,
}

/// Callback invocations collected under the lock and fired after release.
enum Notice {
    StateChanged {
        app_id: AppId,
        previous: OpAppState,
        next: OpAppState,
    },
    Show(AppId),
    Hide(AppId),
}

impl ApplicationHost {
    pub fn new(callback: Arc<dyn ApplicationCallback>, countdown_duration: Duration) -> Self {
        let runtime = Handle::current();
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Mutex::new(HostInner {
            next_id: 1,
            current: None,
            countdown_duration,
            expired_tx,
            runtime: runtime.clone(),
        }));
        runtime.spawn(expiry_loop(
            Arc::downgrade(&inner),
            callback.clone(),
            expired_rx,
        ));
        Self { inner, callback }
    }

    /// Launch an application directly from a URL, replacing the current one.
    pub fn launch_url(&self, kind: AppKind, url: &str, broadcast_related: bool) -> AppId {
        self.launch(kind, url.to_owned(), url.to_owned(), url.to_owned(), broadcast_related)
    }

    /// Launch an application from a signalled descriptor.
    pub fn launch_descriptor(&self, kind: AppKind, descriptor: &AppDescriptor) -> AppId {
        self.launch(
            kind,
            descriptor.loaded_url(),
            descriptor.base_url.clone(),
            descriptor.entry_url(),
            descriptor.broadcast_related,
        )
    }

    fn launch(
        &self,
        kind: AppKind,
        loaded_url: String,
        base_url: String,
        entry_url: String,
        broadcast_related: bool,
    ) -> AppId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let app = Application {
            id,
            kind,
            loaded_url,
            base_url,
            entry_url,
            broadcast_related,
            state: (kind == AppKind::OpApp).then_some(OpAppState::Background),
        };
        let countdown = Countdown::new(
            inner.runtime.clone(),
            id,
            inner.countdown_duration,
            inner.expired_tx.clone(),
        );
        if let Some(old) = inner.current.replace(Running { app, countdown }) {
            debug!(app_id = old.app.id, "replacing current application");
        }
        info!(app_id = id, ?kind, "application launched");
        id
    }

    /// Destroy the current application. Its countdown is cancelled and any
    /// late expiry is ignored.
    pub fn kill(&self) -> Option<AppId> {
        let old = self.inner.lock().current.take()?;
        info!(app_id = old.app.id, "application killed");
        Some(old.app.id)
    }

    /// Snapshot of the current application.
    pub fn current(&self) -> Option<Application> {
        self.inner.lock().current.as_ref().map(|r| r.app.clone())
    }

    pub fn state(&self) -> Option<OpAppState> {
        self.inner.lock().current.as_ref().and_then(|r| r.app.state)
    }

    pub fn countdown_armed(&self) -> bool {
        self.inner
            .lock()
            .current
            .as_ref()
            .is_some_and(|r| r.countdown.is_armed())
    }

    /// Request a lifecycle state for the current operator application.
    /// Returns `false` when there is none or the transition is illegal.
    pub fn set_state(&self, target: OpAppState) -> bool {
        let notices = {
            let mut inner = self.inner.lock();
            let Some(running) = inner.current.as_mut() else {
                warn!(requested = %target, "state request without a running application");
                return false;
            };
            let Some(current) = running.app.state else {
                warn!(app_id = running.app.id, "state request for a non-operator application");
                return false;
            };
            match opapp::request(current, target) {
                StateRequest::Rejected => {
                    warn!(app_id = running.app.id, from = %current, to = %target, "illegal state transition");
                    return false;
                }
                StateRequest::Unchanged => {
                    rearm(running, target);
                    Vec::new()
                }
                StateRequest::Changed { previous, next } => enter(running, previous, next),
            }
        };
        self.fire(notices);
        true
    }

    /// Terminal-driven activation of a backgrounded operator application,
    /// e.g. on the operator key. Requests alone never leave the background.
    pub fn activate(&self) -> bool {
        let notices = {
            let mut inner = self.inner.lock();
            let Some(running) = inner.current.as_mut() else {
                return false;
            };
            if running.app.state != Some(OpAppState::Background) {
                return false;
            }
            enter(running, OpAppState::Background, OpAppState::Foreground)
        };
        self.fire(notices);
        true
    }

    /// Presentation-driven move between a state and its overlaid form.
    /// Returns `false` when the overlay does not apply to the current state.
    pub fn set_overlaid(&self, overlaid: bool) -> bool {
        let notices = {
            let mut inner = self.inner.lock();
            let Some(running) = inner.current.as_mut() else {
                return false;
            };
            let Some(current) = running.app.state else {
                return false;
            };
            let Some(next) = opapp::overlay_target(current, overlaid) else {
                debug!(app_id = running.app.id, state = %current, overlaid, "overlay not applicable");
                return false;
            };
            enter(running, current, next)
        };
        self.fire(notices);
        true
    }

    /// Change whether the current application is broadcast-related. An
    /// operator application only accepts this while in the foreground.
    pub fn set_broadcast_related(&self, broadcast_related: bool) -> bool {
        let mut inner = self.inner.lock();
        let Some(running) = inner.current.as_mut() else {
            return false;
        };
        match running.app.state {
            Some(state) if state != OpAppState::Foreground => {
                warn!(app_id = running.app.id, state = %state, "broadcast-related change refused");
                false
            }
            _ => {
                running.app.broadcast_related = broadcast_related;
                true
            }
        }
    }

    fn fire(&self, notices: Vec<Notice>) {
        fire(self.callback.as_ref(), notices);
    }
}

// ---------------------------------------------------------------------------
// Transition helpers (run under the host lock, never call out)
// ---------------------------------------------------------------------------

fn rearm(running: &mut Running, state: OpAppState) {
    if state.is_transient() {
        running.countdown.start();
    } else {
        running.countdown.stop();
    }
}

fn enter(running: &mut Running, previous: OpAppState, next: OpAppState) -> Vec<Notice> {
    let app_id = running.app.id;
    running.app.state = Some(next);
    rearm(running, next);
    info!(app_id, from = %previous, to = %next, "operator application state changed");
    let visibility = if next == OpAppState::Background {
        Notice::Hide(app_id)
    } else {
        Notice::Show(app_id)
    };
    vec![
        Notice::StateChanged {
            app_id,
            previous,
            next,
        },
        visibility,
    ]
}

fn fire(callback: &dyn ApplicationCallback, notices: Vec<Notice>) {
    for notice in notices {
        match notice {
            Notice::StateChanged {
                app_id,
                previous,
                next,
            } => callback.state_changed(app_id, previous.as_str(), next.as_str()),
            Notice::Show(app_id) => callback.show(app_id),
            Notice::Hide(app_id) => callback.hide(app_id),
        }
    }
}

async fn expiry_loop(
    inner: Weak<Mutex<HostInner>>,
    callback: Arc<dyn ApplicationCallback>,
    mut expired_rx: mpsc::UnboundedReceiver<CountdownExpired>,
) {
    while let Some(event) = expired_rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let notices = {
            let mut guard = inner.lock();
            match guard.current.as_mut() {
                Some(running) if running.countdown.is_current(&event) => {
                    running.countdown.stop();
                    match running.app.state {
                        Some(state) if state.is_transient() => {
                            enter(running, state, OpAppState::Background)
                        }
                        _ => Vec::new(),
                    }
                }
                _ => {
                    debug!(app_id = event.app_id, "stale countdown expiry ignored");
                    Vec::new()
                }
            }
        };
        fire(callback.as_ref(), notices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ApplicationCallback for Recorder {
        fn state_changed(&self, app_id: AppId, previous: &str, next: &str) {
            self.0.lock().push(format!("{app_id}:{previous}->{next}"));
        }
        fn show(&self, app_id: AppId) {
            self.0.lock().push(format!("{app_id}:show"));
        }
        fn hide(&self, app_id: AppId) {
            self.0.lock().push(format!("{app_id}:hide"));
        }
    }

    fn host() -> (ApplicationHost, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (ApplicationHost::new(recorder.clone(), DEFAULT_COUNTDOWN), recorder)
    }

    #[tokio::test]
    async fn ids_increase_and_opapps_start_in_background() {
        let (host, _) = host();
        let first = host.launch_url(AppKind::Hbbtv, "http://a.tv/", true);
        let second = host.launch_url(AppKind::OpApp, "http://op.tv/", false);
        assert!(second > first);
        let app = host.current().unwrap();
        assert_eq!(app.id, second);
        assert_eq!(app.state, Some(OpAppState::Background));
        assert_eq!(app.entry_url, "http://op.tv/");
    }

    #[tokio::test]
    async fn hbbtv_app_has_no_lifecycle() {
        let (host, recorder) = host();
        host.launch_url(AppKind::Hbbtv, "http://a.tv/", true);
        assert!(!host.set_state(OpAppState::Foreground));
        assert!(host.set_broadcast_related(false));
        assert!(recorder.0.lock().is_empty());
    }

    #[tokio::test]
    async fn kill_clears_current() {
        let (host, _) = host();
        let id = host.launch_url(AppKind::OpApp, "http://op.tv/", false);
        assert_eq!(host.kill(), Some(id));
        assert!(host.current().is_none());
        assert!(!host.set_state(OpAppState::Background));
    }

    #[tokio::test]
    async fn activate_only_from_background() {
        let (host, recorder) = host();
        let id = host.launch_url(AppKind::OpApp, "http://op.tv/", false);
        assert!(host.activate());
        assert_eq!(host.state(), Some(OpAppState::Foreground));
        assert!(!host.activate());
        assert_eq!(
            *recorder.0.lock(),
            vec![format!("{id}:background->foreground"), format!("{id}:show")]
        );
    }

    #[tokio::test]
    async fn background_refuses_broadcast_related_change() {
        let (host, _) = host();
        host.launch_url(AppKind::OpApp, "http://op.tv/", true);
        assert!(!host.set_broadcast_related(false));
        assert!(host.current().unwrap().broadcast_related);
    }
}
