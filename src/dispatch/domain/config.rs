use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Kind of in-app content a link addresses.
///
/// The type is the only part of a [`DeepLinkConfig`] the engine interprets:
/// it selects the URI template. Everything else is opaque payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeepLinkType {
    #[default]
    Home,
    Discover,
    Category,
    Tag,
    Article,
}

impl DeepLinkType {
    /// Parses a type name, falling back to [`DeepLinkType::Home`] for
    /// anything unrecognized. Never fails.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" | "" => Self::Home,
            "discover" => Self::Discover,
            "category" => Self::Category,
            "tag" => Self::Tag,
            "article" => Self::Article,
            other => {
                log::warn!("[LINK] unknown deep link type {:?}, defaulting to home", other);
                Self::Home
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Discover => "discover",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Article => "article",
        }
    }
}

impl fmt::Display for DeepLinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic description of a piece of content to open in the app.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeepLinkConfig {
    link_type: DeepLinkType,
    path: String,
    /// Insertion ordered; a repeated key replaces the value in place.
    params: Vec<(String, String)>,
}

impl DeepLinkConfig {
    pub fn new(link_type: DeepLinkType, path: impl Into<String>) -> Self {
        Self {
            link_type,
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn home() -> Self {
        Self::new(DeepLinkType::Home, "")
    }

    /// Adds a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Builds a config from routing context.
    ///
    /// Route segments select the type and path; the extra query pairs become
    /// params. Unknown leading segments are treated as an article path.
    pub fn from_route<S, K, V>(segments: &[S], query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        S: AsRef<str>,
        K: Into<String>,
        V: Into<String>,
    {
        let segs: Vec<&str> = segments
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.is_empty())
            .collect();

        let base = match segs.split_first() {
            None => Self::home(),
            Some((&"discover", _)) => Self::new(DeepLinkType::Discover, ""),
            Some((&"category", rest)) => Self::new(DeepLinkType::Category, rest.join("/")),
            Some((&"tag", rest)) => Self::new(DeepLinkType::Tag, rest.join("/")),
            Some(_) => Self::new(DeepLinkType::Article, segs.join("/")),
        };

        query
            .into_iter()
            .fold(base, |cfg, (k, v)| cfg.param(k, v))
    }

    pub fn link_type(&self) -> DeepLinkType {
        self.link_type
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Static identifiers of the native application.
///
/// Store targets are keyed by platform only; they never depend on the
/// link being opened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppManifest {
    /// Custom URI scheme registered by the app, without `://`.
    pub scheme: String,
    /// Host serving the universal / app links.
    pub universal_host: String,
    /// Numeric App Store identifier.
    pub ios_app_id: String,
    /// Android application package.
    pub android_package: String,
    /// Landing page used where no store applies.
    pub download_url: String,
}

impl Default for AppManifest {
    fn default() -> Self {
        Self {
            scheme: "finanzasapp".to_string(),
            universal_host: "app.finanzas.example".to_string(),
            ios_app_id: "1234567890".to_string(),
            android_package: "com.finanzas.app".to_string(),
            download_url: "https://finanzas.example/descargar".to_string(),
        }
    }
}

impl AppManifest {
    /// Loads a manifest from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading app manifest {}", path.display()))?;
        let manifest = serde_json::from_str(&raw)
            .with_context(|| format!("parsing app manifest {}", path.display()))?;
        Ok(manifest)
    }

    pub fn ios_store_uri(&self) -> String {
        format!("https://apps.apple.com/app/id{}", self.ios_app_id)
    }

    pub fn android_store_uri(&self) -> String {
        format!(
            "https://play.google.com/store/apps/details?id={}",
            self.android_package
        )
    }
}
