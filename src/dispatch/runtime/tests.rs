#[cfg(test)]
mod tests {
    use crate::dispatch::domain::{
        AddressBuilder, DeepLinkConfig, DeepLinkType, PlatformInfo, PlatformKind,
    };
    use crate::dispatch::engine::{AttemptStatus, DispatchPolicy, ReentryPolicy};
    use crate::dispatch::host::MockHost;
    use crate::dispatch::runtime::{Dispatcher, OpenCallbacks, Opening};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    // --- Helpers ---

    #[derive(Clone, Default)]
    struct Counters {
        opened: Arc<AtomicUsize>,
        not_installed: Arc<AtomicUsize>,
    }

    impl Counters {
        fn callbacks(&self) -> OpenCallbacks {
            let opened = self.opened.clone();
            let not_installed = self.not_installed.clone();
            OpenCallbacks::new()
                .on_app_opened(move || {
                    opened.fetch_add(1, Ordering::SeqCst);
                })
                .on_app_not_installed(move || {
                    not_installed.fetch_add(1, Ordering::SeqCst);
                })
        }

        fn get(&self) -> (usize, usize) {
            (
                self.opened.load(Ordering::SeqCst),
                self.not_installed.load(Ordering::SeqCst),
            )
        }
    }

    fn dispatcher(host: MockHost, go_to_store: bool, reentry: ReentryPolicy) -> Dispatcher<MockHost> {
        Dispatcher::new(
            host,
            PlatformInfo::new(PlatformKind::Android),
            AddressBuilder::default(),
            DispatchPolicy {
                timeout: Duration::from_millis(1500),
                go_to_store_on_not_installed: go_to_store,
                reentry,
            },
        )
    }

    fn divisas() -> DeepLinkConfig {
        DeepLinkConfig::new(DeepLinkType::Category, "divisas")
    }

    const PLAY_STORE: &str = "https://play.google.com/store/apps/details?id=com.finanzas.app";

    // --- Tests ---

    #[tokio::test(start_paused = true)]
    async fn timeout_without_visibility_loss_is_not_installed() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), true, ReentryPolicy::JoinInFlight);
        let counters = Counters::default();

        let mut handle = d.open(&divisas(), counters.callbacks()).into_handle();
        assert!(d.is_opening());
        assert_eq!(handle.status(), AttemptStatus::Pending);

        assert_eq!(handle.outcome().await, AttemptStatus::NotInstalled);
        tokio::task::yield_now().await;

        assert_eq!(counters.get(), (0, 1));
        assert!(!d.is_opening());
        assert_eq!(
            host.navigations(),
            vec![
                "intent://category/divisas#Intent;scheme=finanzasapp;package=com.finanzas.app;end"
                    .to_string(),
                PLAY_STORE.to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_without_store_flag_stays_on_page() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), false, ReentryPolicy::JoinInFlight);

        let mut handle = d.open(&divisas(), OpenCallbacks::new()).into_handle();
        assert_eq!(handle.outcome().await, AttemptStatus::NotInstalled);

        assert_eq!(host.navigations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn installed_app_hides_page_and_resolves_opened() {
        let host = MockHost::new().with_installed_app(Duration::from_millis(300));
        let d = dispatcher(host.clone(), true, ReentryPolicy::JoinInFlight);
        let counters = Counters::default();

        let mut handle = d.open(&divisas(), counters.callbacks()).into_handle();
        assert_eq!(handle.outcome().await, AttemptStatus::Opened);

        // Let the deadline pass too; nothing else may fire.
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(counters.get(), (1, 0));
        assert_eq!(host.navigations().len(), 1, "no store redirect after success");
    }

    #[tokio::test(start_paused = true)]
    async fn hide_at_deadline_instant_counts_as_opened() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), true, ReentryPolicy::JoinInFlight);
        let counters = Counters::default();

        let hider = host.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            hider.hide();
        });

        let mut handle = d.open(&divisas(), counters.callbacks()).into_handle();
        assert_eq!(handle.outcome().await, AttemptStatus::Opened);
        assert_eq!(counters.get(), (1, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn hide_then_show_in_same_turn_counts_as_opened() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), true, ReentryPolicy::JoinInFlight);
        let counters = Counters::default();

        let hider = host.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            hider.hide();
        });
        let shower = host.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            shower.show();
        });

        let mut handle = d.open(&divisas(), counters.callbacks()).into_handle();
        assert_eq!(handle.outcome().await, AttemptStatus::Opened);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(counters.get(), (1, 0));
        assert_eq!(host.navigations().len(), 1, "no store redirect");
    }

    #[tokio::test(start_paused = true)]
    async fn hide_before_open_does_not_count() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), false, ReentryPolicy::JoinInFlight);

        host.hide();
        host.show();

        let mut handle = d.open(&divisas(), OpenCallbacks::new()).into_handle();
        assert_eq!(handle.outcome().await, AttemptStatus::NotInstalled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_any_signal_is_silent() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), true, ReentryPolicy::JoinInFlight);
        let counters = Counters::default();

        let mut handle = d.open(&divisas(), counters.callbacks()).into_handle();

        tokio::time::sleep(Duration::from_millis(50)).await;
        d.cancel(handle.id());

        assert!(!d.is_opening());
        assert_eq!(handle.outcome().await, AttemptStatus::Cancelled);

        // Neither a late hide nor the old deadline may reach a callback.
        host.hide();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(counters.get(), (0, 0));
        assert_eq!(host.navigations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_open_joins_in_flight_attempt() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), false, ReentryPolicy::JoinInFlight);
        let first = Counters::default();
        let second = Counters::default();

        let started = d.open(&divisas(), first.callbacks());
        let joined = d.open(&divisas(), second.callbacks());

        assert!(matches!(started, Opening::Started(_)));
        let mut joined = match joined {
            Opening::AlreadyOpening(h) => h,
            other => panic!("expected AlreadyOpening, got {:?}", other),
        };
        assert_eq!(joined.id(), started.handle().id());

        assert_eq!(joined.outcome().await, AttemptStatus::NotInstalled);
        tokio::task::yield_now().await;

        assert_eq!(first.get(), (0, 1));
        assert_eq!(second.get(), (0, 0));
        assert_eq!(host.navigations().len(), 1, "only one handoff issued");
    }

    #[tokio::test(start_paused = true)]
    async fn second_open_supersedes_when_configured() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), false, ReentryPolicy::Supersede);
        let first = Counters::default();
        let second = Counters::default();

        let mut old = d.open(&divisas(), first.callbacks()).into_handle();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let mut new = d.open(&divisas(), second.callbacks()).into_handle();

        assert_ne!(old.id(), new.id());
        assert_eq!(old.outcome().await, AttemptStatus::Cancelled);

        // The old deadline (t=1500) passes without effect.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(d.is_opening());

        assert_eq!(new.outcome().await, AttemptStatus::NotInstalled);
        tokio::task::yield_now().await;

        assert_eq!(first.get(), (0, 0));
        assert_eq!(second.get(), (0, 1));
        assert_eq!(host.navigations().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn callbacks_may_reenter_dispatcher() {
        let host = MockHost::new();
        let d = dispatcher(host.clone(), false, ReentryPolicy::JoinInFlight);

        let inner = d.clone();
        let saw_opening = Arc::new(AtomicUsize::new(usize::MAX));
        let flag = saw_opening.clone();
        let callbacks = OpenCallbacks::new().on_app_not_installed(move || {
            flag.store(inner.is_opening() as usize, Ordering::SeqCst);
        });

        let mut handle = d.open(&divisas(), callbacks).into_handle();
        handle.outcome().await;
        tokio::task::yield_now().await;

        assert_eq!(saw_opening.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn deep_link_projection_matches_builder() {
        let d = dispatcher(MockHost::new(), false, ReentryPolicy::JoinInFlight);
        let addr = d.deep_link(&divisas());
        assert!(addr.primary_uri.starts_with("intent://category/divisas"));
        assert_eq!(addr.store_uri, PLAY_STORE);
        assert!(d.platform().is_android());
    }
}
