use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::dispatch::host::api::{HostApi, PageVisibility, VisibilityState};

/// In-memory host page.
///
/// Clones share state, so a test can keep one clone while the dispatcher
/// owns another. With [`MockHost::with_installed_app`] an app handoff hides
/// the page after the given delay, the way a real native app would
/// background the tab.
#[derive(Clone)]
pub struct MockHost {
    navigations: Arc<Mutex<Vec<String>>>,
    visibility: Arc<watch::Sender<VisibilityState>>,
    app_start_delay: Option<Duration>,
}

impl MockHost {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(VisibilityState::default());
        Self {
            navigations: Arc::new(Mutex::new(Vec::new())),
            visibility: Arc::new(tx),
            app_start_delay: None,
        }
    }

    pub fn with_installed_app(mut self, start_delay: Duration) -> Self {
        self.app_start_delay = Some(start_delay);
        self
    }

    pub fn hide(&self) {
        log::debug!("[HOST] page hidden");
        self.visibility
            .send_modify(|v| v.transition(PageVisibility::Hidden));
    }

    pub fn show(&self) {
        log::debug!("[HOST] page visible");
        self.visibility
            .send_modify(|v| v.transition(PageVisibility::Visible));
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_navigation(&self) -> Option<String> {
        self.navigations().last().cloned()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

fn is_web_uri(uri: &str) -> bool {
    uri.starts_with("https://") || uri.starts_with("http://")
}

impl HostApi for MockHost {
    fn navigate(&mut self, uri: &str) {
        log::debug!("[HOST] navigate {}", uri);
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(uri.to_string());

        let Some(delay) = self.app_start_delay else {
            return;
        };
        if is_web_uri(uri) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let visibility = self.visibility.clone();
                rt.spawn(async move {
                    tokio::time::sleep(delay).await;
                    log::debug!("[HOST] app claimed handoff after {:?}", delay);
                    visibility.send_modify(|v| v.transition(PageVisibility::Hidden));
                });
            }
            Err(_) => log::warn!("[HOST] no runtime, cannot simulate app start"),
        }
    }

    fn visibility(&self) -> watch::Receiver<VisibilityState> {
        self.visibility.subscribe()
    }
}
