use crate::dispatch::domain::{AddressBuilder, DeepLinkAddress, DeepLinkConfig, PlatformInfo};
use crate::dispatch::engine::{
    AttemptCommand, AttemptEngine, AttemptEvent, AttemptId, AttemptStatus, DispatchPolicy, Signals,
};
use crate::dispatch::host::{HostApi, VisibilityState};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;

type Callback = Box<dyn FnOnce() + Send>;

/// The two outcome callbacks of an open attempt. Cancellation calls neither.
#[derive(Default)]
pub struct OpenCallbacks {
    on_app_opened: Option<Callback>,
    on_app_not_installed: Option<Callback>,
}

impl OpenCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_app_opened<F: FnOnce() + Send + 'static>(mut self, f: F) -> Self {
        self.on_app_opened = Some(Box::new(f));
        self
    }

    pub fn on_app_not_installed<F: FnOnce() + Send + 'static>(mut self, f: F) -> Self {
        self.on_app_not_installed = Some(Box::new(f));
        self
    }
}

/// Single-resolution view of one attempt's outcome. Any number of handles
/// may observe the same attempt.
#[derive(Debug, Clone)]
pub struct AttemptHandle {
    id: AttemptId,
    outcome: watch::Receiver<AttemptStatus>,
}

impl AttemptHandle {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    /// Current status without waiting.
    pub fn status(&self) -> AttemptStatus {
        *self.outcome.borrow()
    }

    /// Waits for the terminal status.
    pub async fn outcome(&mut self) -> AttemptStatus {
        let resolved = self
            .outcome
            .wait_for(AttemptStatus::is_terminal)
            .await
            .map(|status| *status);
        match resolved {
            Ok(status) => status,
            Err(_) => {
                let last = *self.outcome.borrow();
                if last.is_terminal() {
                    last
                } else {
                    AttemptStatus::Cancelled
                }
            }
        }
    }
}

/// Result of [`Dispatcher::open`].
#[derive(Debug)]
pub enum Opening {
    Started(AttemptHandle),
    /// Another attempt was pending; the handle observes that one.
    AlreadyOpening(AttemptHandle),
}

impl Opening {
    pub fn handle(&self) -> &AttemptHandle {
        match self {
            Opening::Started(h) | Opening::AlreadyOpening(h) => h,
        }
    }

    pub fn into_handle(self) -> AttemptHandle {
        match self {
            Opening::Started(h) | Opening::AlreadyOpening(h) => h,
        }
    }
}

struct LiveAttempt {
    callbacks: OpenCallbacks,
    outcome: watch::Sender<AttemptStatus>,
    race: Option<JoinHandle<()>>,
}

struct Shared<H> {
    engine: AttemptEngine,
    host: H,
    live: HashMap<AttemptId, LiveAttempt>,
}

/// Work that must run after the state lock is released.
enum Followup {
    Call(Callback),
    Redirect(String),
}

/// **Dispatcher**
///
/// This component acts as the **Imperative Shell** around [`AttemptEngine`].
/// It has three main responsibilities:
/// 1. **Build addresses** for the classified platform and feed open requests to the engine.
/// 2. **Race the signals**: one task per attempt waits for page visibility loss or
///    the deadline, whichever comes first, and reports what it saw.
/// 3. **Execute Side Effects** (Commands) emitted by the engine: navigation,
///    arming/disarming, callbacks and the store redirect.
///
/// Clones share the same engine. Callbacks run outside the state lock, so
/// they may call back into the dispatcher.
pub struct Dispatcher<H> {
    inner: Arc<Mutex<Shared<H>>>,
    builder: Arc<AddressBuilder>,
    platform: PlatformInfo,
    t0: Instant,
}

impl<H> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            builder: self.builder.clone(),
            platform: self.platform,
            t0: self.t0,
        }
    }
}

impl<H: HostApi> Dispatcher<H> {
    pub fn new(host: H, platform: PlatformInfo, builder: AddressBuilder, policy: DispatchPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Shared {
                engine: AttemptEngine::new(policy),
                host,
                live: HashMap::new(),
            })),
            builder: Arc::new(builder),
            platform,
            t0: Instant::now(),
        }
    }

    pub fn platform(&self) -> PlatformInfo {
        self.platform
    }

    /// Addresses `config` would open on this dispatcher's platform.
    pub fn deep_link(&self, config: &DeepLinkConfig) -> DeepLinkAddress {
        self.builder.build(config, &self.platform)
    }

    pub fn is_opening(&self) -> bool {
        self.lock().engine.is_opening()
    }

    /// Starts an attempt, or joins the pending one depending on the
    /// re-entry policy. Must be called within a tokio runtime.
    pub fn open(&self, config: &DeepLinkConfig, callbacks: OpenCallbacks) -> Opening {
        let address = self.deep_link(config);
        self.info(&format!("open {} -> {}", config.link_type(), address.primary_uri));

        let now = tokio::time::Instant::now().into_std();
        let (opening, followups) = {
            let mut shared = self.lock();
            let cmds = shared
                .engine
                .handle_event(AttemptEvent::OpenRequested { address, now });
            self.execute(&mut shared, cmds, Some(callbacks))
        };
        self.run_followups(followups);

        match opening {
            Some(opening) => opening,
            None => unreachable!("open request answered without Navigate or AlreadyOpening"),
        }
    }

    /// Cancels `id` if it is still pending. No callback fires.
    pub fn cancel(&self, id: AttemptId) {
        self.process(AttemptEvent::Cancel { id });
    }

    /// Cancels whatever attempt is pending.
    pub fn cancel_pending(&self) {
        let pending = self.lock().engine.pending().map(|a| a.id);
        if let Some(id) = pending {
            self.cancel(id);
        }
    }

    fn signal(&self, id: AttemptId, signals: Signals) {
        self.trace(&format!("{:?} observed {:?}", id, signals));
        self.process(AttemptEvent::Signalled { id, signals });
    }

    /// Feeds an event into the engine and executes all resulting commands.
    fn process(&self, event: AttemptEvent) {
        let (_, followups) = {
            let mut shared = self.lock();
            let cmds = shared.engine.handle_event(event);
            self.execute(&mut shared, cmds, None)
        };
        self.run_followups(followups);
    }

    fn execute(
        &self,
        shared: &mut Shared<H>,
        cmds: Vec<AttemptCommand>,
        mut callbacks: Option<OpenCallbacks>,
    ) -> (Option<Opening>, Vec<Followup>) {
        let mut opening = None;
        let mut followups = Vec::new();

        for cmd in cmds {
            self.trace(&format!("cmd: {:?}", cmd));
            match cmd {
                AttemptCommand::Navigate { id, uri } => {
                    let (tx, rx) = watch::channel(AttemptStatus::Pending);
                    shared.live.insert(
                        id,
                        LiveAttempt {
                            callbacks: callbacks.take().unwrap_or_default(),
                            outcome: tx,
                            race: None,
                        },
                    );
                    opening = Some(Opening::Started(AttemptHandle { id, outcome: rx }));
                    shared.host.navigate(&uri);
                }

                AttemptCommand::Arm { id, deadline } => {
                    let visibility = shared.host.visibility();
                    let baseline = visibility.borrow().hidden_transitions;
                    let deadline = tokio::time::Instant::from_std(deadline);
                    let this = self.clone();
                    let task = tokio::spawn(async move {
                        let signals = race(visibility, baseline, deadline).await;
                        this.signal(id, signals);
                    });
                    match shared.live.get_mut(&id) {
                        Some(live) => live.race = Some(task),
                        None => task.abort(),
                    }
                }

                AttemptCommand::Disarm { id } => {
                    if let Some(task) = shared.live.get_mut(&id).and_then(|l| l.race.take()) {
                        task.abort();
                    }
                }

                AttemptCommand::AlreadyOpening { id } => {
                    // The live record and the engine's pending attempt are
                    // created by Navigate and dropped by Resolve together.
                    let Some(live) = shared.live.get(&id) else {
                        unreachable!("{:?} pending in the engine but not tracked", id);
                    };
                    self.info(&format!("{:?} already opening", id));
                    opening = Some(Opening::AlreadyOpening(AttemptHandle {
                        id,
                        outcome: live.outcome.subscribe(),
                    }));
                }

                AttemptCommand::Resolve { id, status } => {
                    let Some(mut live) = shared.live.remove(&id) else {
                        log::error!("[DISPATCH] resolve for unknown {:?}", id);
                        continue;
                    };
                    self.info(&format!("{:?} -> {:?}", id, status));
                    live.outcome.send_replace(status);

                    let cb = match status {
                        AttemptStatus::Opened => live.callbacks.on_app_opened.take(),
                        AttemptStatus::NotInstalled => live.callbacks.on_app_not_installed.take(),
                        AttemptStatus::Cancelled | AttemptStatus::Pending => None,
                    };
                    if let Some(cb) = cb {
                        followups.push(Followup::Call(cb));
                    }
                }

                AttemptCommand::RedirectToStore { id, uri } => {
                    self.info(&format!("{:?} redirecting to store {}", id, uri));
                    followups.push(Followup::Redirect(uri));
                }
            }
        }

        (opening, followups)
    }

    fn run_followups(&self, followups: Vec<Followup>) {
        for f in followups {
            match f {
                Followup::Call(cb) => cb(),
                Followup::Redirect(uri) => self.lock().host.navigate(&uri),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<H>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn t(&self) -> u128 {
        self.t0.elapsed().as_micros()
    }

    fn info(&self, msg: &str) {
        log::info!("[DISPATCH] {:>8}us: {}", self.t(), msg);
    }

    fn trace(&self, msg: &str) {
        log::trace!("[DISPATCH] {:>8}us: {}", self.t(), msg);
    }
}

/// Waits for the first of visibility loss or the deadline, then samples
/// both. Visibility is lost once the page is hidden or has gone hidden at
/// least once since `baseline`, so a hide followed by a show before this
/// task runs still counts.
async fn race(
    mut visibility: watch::Receiver<VisibilityState>,
    baseline: u64,
    deadline: tokio::time::Instant,
) -> Signals {
    let lost = async {
        let closed = visibility
            .wait_for(|v| v.hidden_since(baseline))
            .await
            .is_err();
        if closed {
            // Host went away: only the deadline can decide.
            std::future::pending::<()>().await;
        }
    };

    let deadline_won = tokio::select! {
        biased;
        _ = lost => false,
        _ = tokio::time::sleep_until(deadline) => true,
    };

    if deadline_won {
        // Let a visibility change raised in this same turn land first.
        tokio::task::yield_now().await;
    }

    Signals {
        visibility_lost: visibility.borrow().hidden_since(baseline),
        deadline_elapsed: tokio::time::Instant::now() >= deadline,
    }
}
