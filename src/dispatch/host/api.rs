use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageVisibility {
    #[default]
    Visible,
    Hidden,
}

impl PageVisibility {
    pub fn is_hidden(&self) -> bool {
        matches!(self, PageVisibility::Hidden)
    }
}

/// Visibility as published by the host.
///
/// `hidden_transitions` counts every Visible to Hidden edge and never goes
/// down, so a watcher that compares it against an earlier reading sees a
/// hide even when a show was published before it woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityState {
    pub current: PageVisibility,
    pub hidden_transitions: u64,
}

impl VisibilityState {
    /// Records a move to `next`, counting Visible to Hidden edges.
    pub fn transition(&mut self, next: PageVisibility) {
        if next.is_hidden() && !self.current.is_hidden() {
            self.hidden_transitions += 1;
        }
        self.current = next;
    }

    /// True if the page is hidden now or went hidden after `baseline` was
    /// read.
    pub fn hidden_since(&self, baseline: u64) -> bool {
        self.current.is_hidden() || self.hidden_transitions > baseline
    }
}

/// Minimal host page interface used by the dispatcher.
///
/// Hosts fold every "page went away" notification they have
/// (`visibilitychange`, `pagehide`, `blur`) into [`PageVisibility::Hidden`].
/// The dispatcher never learns whether a handoff succeeded; it only
/// watches this signal.
pub trait HostApi: Send + 'static {
    /// Navigates the browsing context. For app URIs this is the native
    /// handoff; for store URIs it is a plain page navigation.
    fn navigate(&mut self, uri: &str);

    /// Subscribes to page visibility. The receiver must start from the
    /// current value, and every hide must be published through
    /// [`VisibilityState::transition`] so none is lost to a later show.
    fn visibility(&self) -> watch::Receiver<VisibilityState>;
}
