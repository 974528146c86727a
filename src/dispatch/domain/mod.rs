pub mod address;
pub mod config;
pub mod platform;

pub use address::{AddressBuilder, DeepLinkAddress};
pub use config::{AppManifest, DeepLinkConfig, DeepLinkType};
pub use platform::{classify, EnvironmentProbe, PlatformInfo, PlatformKind};
