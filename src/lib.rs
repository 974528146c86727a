pub mod dispatch;
pub mod persistence;
pub mod view;

pub use dispatch::domain::{
    classify, AddressBuilder, AppManifest, DeepLinkAddress, DeepLinkConfig, DeepLinkType,
    EnvironmentProbe, PlatformInfo, PlatformKind,
};
pub use dispatch::engine::{AttemptStatus, DispatchPolicy, ReentryPolicy};
pub use dispatch::host::{HostApi, MockHost, PageVisibility, VisibilityState};
pub use dispatch::runtime::{AttemptHandle, Dispatcher, OpenCallbacks, Opening};
pub use persistence::{BannerDismissal, DismissalStore, FileSlot, MemorySlot};
pub use view::{BannerEligibility, OpenInAppTrigger, TriggerOptions};
