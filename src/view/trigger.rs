use crate::dispatch::domain::{DeepLinkAddress, DeepLinkConfig, PlatformInfo};
use crate::dispatch::engine::AttemptId;
use crate::dispatch::host::HostApi;
use crate::dispatch::runtime::{Dispatcher, OpenCallbacks, Opening};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOptions {
    pub label: String,
    /// Render on desktop too. Desktop has no native handoff target, so the
    /// trigger is hidden there unless this is set.
    pub show_on_desktop: bool,
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self {
            label: "Abrir en la app".to_string(),
            show_on_desktop: false,
        }
    }
}

/// What the inline trigger renders when eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerView {
    pub label: String,
    /// Set while any attempt of the underlying [`Dispatcher`] is pending, to
    /// block repeat activation. Triggers sharing one dispatcher disable
    /// together.
    pub disabled: bool,
    pub href: String,
}

/// Inline "open in app" action bound to one piece of content.
///
/// Dropping the trigger is the view teardown: an attempt it started and
/// that is still pending gets cancelled, silently.
pub struct OpenInAppTrigger<H: HostApi> {
    dispatcher: Dispatcher<H>,
    config: DeepLinkConfig,
    options: TriggerOptions,
    started: Option<AttemptId>,
}

impl<H: HostApi> OpenInAppTrigger<H> {
    pub fn new(dispatcher: Dispatcher<H>, config: DeepLinkConfig, options: TriggerOptions) -> Self {
        Self {
            dispatcher,
            config,
            options,
            started: None,
        }
    }

    pub fn platform(&self) -> PlatformInfo {
        self.dispatcher.platform()
    }

    pub fn deep_link(&self) -> DeepLinkAddress {
        self.dispatcher.deep_link(&self.config)
    }

    pub fn is_opening(&self) -> bool {
        self.dispatcher.is_opening()
    }

    pub fn is_eligible(&self) -> bool {
        self.platform().is_mobile() || self.options.show_on_desktop
    }

    /// `None` means render nothing.
    pub fn render(&self) -> Option<TriggerView> {
        if !self.is_eligible() {
            return None;
        }
        Some(TriggerView {
            label: self.options.label.clone(),
            disabled: self.is_opening(),
            href: self.deep_link().primary_uri,
        })
    }

    /// User activation. Ignored (`None`) when the trigger is not rendered.
    pub fn activate(&mut self, callbacks: OpenCallbacks) -> Option<Opening> {
        if !self.is_eligible() {
            log::debug!("[TRIGGER] activation ignored on {:?}", self.platform().kind());
            return None;
        }
        let opening = self.dispatcher.open(&self.config, callbacks);
        if let Opening::Started(handle) = &opening {
            self.started = Some(handle.id());
        }
        Some(opening)
    }
}

impl<H: HostApi> Drop for OpenInAppTrigger<H> {
    fn drop(&mut self) {
        if let Some(id) = self.started.take() {
            self.dispatcher.cancel(id);
        }
    }
}
