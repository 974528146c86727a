// Deep link address builder

use crate::dispatch::domain::config::{AppManifest, DeepLinkConfig, DeepLinkType};
use crate::dispatch::domain::platform::{PlatformInfo, PlatformKind};

/// Materialized addresses for one [`DeepLinkConfig`] on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkAddress {
    /// URI handed to the native-handoff mechanism.
    pub primary_uri: String,
    /// Store listing (or generic download page) for the platform.
    pub store_uri: String,
    /// `{scheme}://{target}`
    pub native_uri: String,
    /// `https://{universal_host}/{target}`
    pub universal_uri: String,
}

/// Builds addresses from a manifest. Pure: no network or filesystem access.
#[derive(Debug, Clone, Default)]
pub struct AddressBuilder {
    manifest: AppManifest,
}

impl AddressBuilder {
    pub fn new(manifest: AppManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &AppManifest {
        &self.manifest
    }

    pub fn build(&self, config: &DeepLinkConfig, platform: &PlatformInfo) -> DeepLinkAddress {
        let target = target_of(config);
        let m = &self.manifest;

        let native_uri = format!("{}://{}", m.scheme, target);
        let universal_uri = format!("https://{}/{}", m.universal_host, target);

        let primary_uri = match platform.kind() {
            PlatformKind::Android => intent_uri(&target, m),
            _ => native_uri.clone(),
        };

        DeepLinkAddress {
            primary_uri,
            store_uri: self.store_uri(platform),
            native_uri,
            universal_uri,
        }
    }

    /// Static platform → store table.
    pub fn store_uri(&self, platform: &PlatformInfo) -> String {
        match platform.kind() {
            PlatformKind::Ios => self.manifest.ios_store_uri(),
            PlatformKind::Android => self.manifest.android_store_uri(),
            PlatformKind::OtherMobile | PlatformKind::Desktop => self.manifest.download_url.clone(),
        }
    }
}

/// Path + query part shared by every encoding, without a leading `/`.
fn target_of(config: &DeepLinkConfig) -> String {
    let path = encode_path(config.path());

    let mut target = match config.link_type() {
        DeepLinkType::Home => String::new(),
        DeepLinkType::Discover => "discover".to_string(),
        DeepLinkType::Category => join_segment("category", &path),
        DeepLinkType::Tag => join_segment("tag", &path),
        DeepLinkType::Article => path,
    };

    if !config.params().is_empty() {
        let query: Vec<String> = config
            .params()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        target.push('?');
        target.push_str(&query.join("&"));
    }

    target
}

fn join_segment(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

/// Escapes each segment, keeps separators, drops empty segments.
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Chrome intent form. `target` carries its own query string, which goes
/// before the fragment.
fn intent_uri(target: &str, m: &AppManifest) -> String {
    format!(
        "intent://{}#Intent;scheme={};package={};end",
        target, m.scheme, m.android_package
    )
}
