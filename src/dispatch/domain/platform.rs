//! Platform classification from an environment probe.
//!
//! Pure and idempotent: callers may classify as often as they like. The
//! process-wide handle in [`current`] exists only so hosts can probe once
//! and share the result by reference.

use std::sync::OnceLock;

/// What the hosting page can tell us about its environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentProbe {
    pub user_agent: Option<String>,
    /// `navigator.maxTouchPoints`; distinguishes iPadOS from macOS.
    pub max_touch_points: u32,
}

impl EnvironmentProbe {
    pub fn from_user_agent(ua: impl Into<String>) -> Self {
        Self {
            user_agent: Some(ua.into()),
            max_touch_points: 0,
        }
    }

    pub fn with_touch_points(mut self, n: u32) -> Self {
        self.max_touch_points = n;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlatformKind {
    Ios,
    Android,
    OtherMobile,
    #[default]
    Desktop,
}

/// Classified platform. Exactly one kind, flags derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformInfo {
    kind: PlatformKind,
}

impl PlatformInfo {
    pub const DESKTOP: Self = Self { kind: PlatformKind::Desktop };

    pub fn new(kind: PlatformKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> PlatformKind {
        self.kind
    }

    pub fn is_ios(&self) -> bool {
        self.kind == PlatformKind::Ios
    }

    pub fn is_android(&self) -> bool {
        self.kind == PlatformKind::Android
    }

    pub fn is_mobile(&self) -> bool {
        matches!(
            self.kind,
            PlatformKind::Ios | PlatformKind::Android | PlatformKind::OtherMobile
        )
    }

    pub fn is_desktop(&self) -> bool {
        !self.is_mobile()
    }
}

const IOS_MARKERS: &[&str] = &["iphone", "ipad", "ipod"];
const OTHER_MOBILE_MARKERS: &[&str] = &[
    "mobile",
    "webos",
    "blackberry",
    "iemobile",
    "opera mini",
    "windows phone",
];

/// Maps a probe to a platform. Absent or unrecognized probes are Desktop.
pub fn classify(probe: &EnvironmentProbe) -> PlatformInfo {
    let Some(ua) = probe.user_agent.as_deref() else {
        return PlatformInfo::DESKTOP;
    };
    let ua = ua.to_ascii_lowercase();

    let kind = if IOS_MARKERS.iter().any(|m| ua.contains(m))
        || (ua.contains("macintosh") && probe.max_touch_points > 1)
    {
        PlatformKind::Ios
    } else if ua.contains("android") {
        PlatformKind::Android
    } else if OTHER_MOBILE_MARKERS.iter().any(|m| ua.contains(m)) {
        PlatformKind::OtherMobile
    } else {
        PlatformKind::Desktop
    };

    PlatformInfo::new(kind)
}

static PROCESS_PLATFORM: OnceLock<PlatformInfo> = OnceLock::new();

/// Process-wide platform handle.
///
/// The first call classifies `probe`; every later call returns the same
/// value and ignores its argument.
pub fn current(probe: &EnvironmentProbe) -> &'static PlatformInfo {
    PROCESS_PLATFORM.get_or_init(|| {
        let info = classify(probe);
        log::debug!("[PLATFORM] classified process as {:?}", info.kind());
        info
    })
}
