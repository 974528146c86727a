use crate::dispatch::domain::PlatformInfo;
use crate::persistence::{DismissalSlot, DismissalStore};

/// Page-level "get the app" banner eligibility.
///
/// Visible only on mobile, and there only while not dismissed unless
/// `force_show` is set. `force_show` bypasses the dismissal record without
/// erasing it.
#[derive(Debug)]
pub struct BannerEligibility<S> {
    platform: PlatformInfo,
    store: DismissalStore<S>,
    force_show: bool,
}

impl<S: DismissalSlot> BannerEligibility<S> {
    pub fn new(platform: PlatformInfo, store: DismissalStore<S>) -> Self {
        Self {
            platform,
            store,
            force_show: false,
        }
    }

    pub fn force_show(mut self, force: bool) -> Self {
        self.force_show = force;
        self
    }

    pub fn platform(&self) -> PlatformInfo {
        self.platform
    }

    pub fn is_visible(&self, now_millis: i64) -> bool {
        self.platform.is_mobile() && (self.force_show || !self.store.is_dismissed(now_millis))
    }

    pub fn dismiss(&mut self, now_millis: i64) {
        self.store.dismiss(now_millis);
    }

    pub fn store(&self) -> &DismissalStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DismissalStore<S> {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::domain::PlatformKind;
    use crate::persistence::MemorySlot;

    fn banner(kind: PlatformKind) -> BannerEligibility<MemorySlot> {
        BannerEligibility::new(PlatformInfo::new(kind), DismissalStore::new(MemorySlot::new()))
    }

    #[test]
    fn visible_on_mobile_until_dismissed() {
        let mut b = banner(PlatformKind::Ios);
        assert!(b.is_visible(0));

        b.dismiss(0);
        assert!(!b.is_visible(1));
        assert!(b.is_visible(86_400_001));
    }

    #[test]
    fn never_visible_off_mobile() {
        for force in [false, true] {
            let mut b = banner(PlatformKind::Desktop).force_show(force);
            assert!(!b.is_visible(0));
            b.dismiss(0);
            assert!(!b.is_visible(1));
            assert!(!b.is_visible(86_400_001));
        }
    }

    #[test]
    fn force_show_bypasses_without_erasing() {
        let mut b = banner(PlatformKind::Android).force_show(true);
        b.dismiss(0);

        assert!(b.is_visible(1));
        assert!(b.store().is_dismissed(1));

        let b = b.force_show(false);
        assert!(!b.is_visible(1));
    }
}
