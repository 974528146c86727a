pub mod api;
pub mod mock;

pub use api::{HostApi, PageVisibility, VisibilityState};
pub use mock::MockHost;
