//! The release configuration consumed by the compiler.
//!
//! A [`Configuration`] is assembled elsewhere (command line, config files) and
//! handed over as an immutable value. Platform descriptors live in ordered maps,
//! so every platform axis is enumerated in the same, sorted order on every run.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stages::Stage;

/// Patterns left out of the push to releases whenever partner repacks ship
/// separately.
pub const DEFAULT_EXCLUSIONS: [&str; 2] = [".*-EME-free/.*", ".*/win32-sha1/.*"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub branch: String,
    pub repo_path: String,
    #[serde(default = "default_product")]
    pub product: String,
    pub version: String,
    pub build_number: u32,
    #[serde(rename = "en_US_config")]
    pub en_us: EnUsConfig,
    #[serde(rename = "l10n_config", default)]
    pub l10n: L10nConfig,
    /// Previous releases to generate partial updates from, in declared order.
    #[serde(default)]
    pub partial_updates: Vec<PartialUpdate>,
    #[serde(default)]
    pub release_channels: Vec<String>,
    #[serde(default)]
    pub final_verify_channels: Vec<String>,
    #[serde(default)]
    pub partner_repacks_platforms: Vec<String>,
    #[serde(flatten)]
    pub features: Features,
    #[serde(default = "default_exclusions")]
    pub push_to_releases_exclusions: Vec<String>,
}

fn default_product() -> String {
    "firefox".into()
}

fn default_exclusions() -> Vec<String> {
    DEFAULT_EXCLUSIONS.iter().map(ToString::to_string).collect()
}

fn default_chunks() -> u32 {
    1
}

/// Boolean toggles deciding which stages end up in the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub checksums_enabled: bool,
    pub updates_enabled: bool,
    pub push_to_candidates_enabled: bool,
    pub push_to_releases_enabled: bool,
    /// When false, a human decision task gates the push to releases.
    pub push_to_releases_automatic: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnUsConfig {
    pub platforms: BTreeMap<String, EnUsPlatform>,
}

/// A finished en-US build living outside of the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnUsPlatform {
    pub task_id: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct L10nConfig {
    #[serde(default)]
    pub platforms: BTreeMap<String, L10nPlatform>,
    /// Locale to l10n repository revision.
    #[serde(default)]
    pub changesets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L10nPlatform {
    pub locales: Vec<String>,
    pub en_us_binary_url: String,
    #[serde(default = "default_chunks")]
    pub chunks: u32,
}

impl L10nPlatform {
    /// Chunk indices, starting at 1.
    pub fn chunk_indices(&self) -> RangeInclusive<u32> {
        1..=self.chunks
    }

    /// Locales handled by the given 1-based chunk. Locales are spread as evenly
    /// as possible, earlier chunks take the remainder.
    pub fn chunk_locales(&self, chunk: u32) -> &[String] {
        if chunk == 0 || chunk > self.chunks {
            return &[];
        }

        let total = self.locales.len();
        let chunks = self.chunks as usize;
        let index = chunk as usize - 1;
        let base = total / chunks;
        let extra = total % chunks;

        let start = index * base + index.min(extra);
        let len = base + usize::from(index < extra);

        &self.locales[start..start + len]
    }
}

/// A previous release a partial update is computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialUpdate {
    pub version: String,
    pub build_number: u32,
}

impl PartialUpdate {
    pub fn new(version: impl Into<String>, build_number: u32) -> Self {
        Self {
            version: version.into(),
            build_number,
        }
    }
}

impl fmt::Display for PartialUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}build{}", self.version, self.build_number)
    }
}

impl Configuration {
    /// Parses a JSON document and validates it.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Configuration = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn en_us_platforms(&self) -> impl Iterator<Item = &str> {
        self.en_us.platforms.keys().map(String::as_str)
    }

    pub fn l10n_platforms(&self) -> impl Iterator<Item = (&str, &L10nPlatform)> {
        self.l10n
            .platforms
            .iter()
            .map(|(name, platform)| (name.as_str(), platform))
    }

    /// Exclusion patterns for the push to releases. They only apply when
    /// partner repacks are part of this release.
    pub fn active_exclusions(&self) -> &[String] {
        if self.partner_repacks_platforms.is_empty() {
            &[]
        } else {
            &self.push_to_releases_exclusions
        }
    }

    /// Checks the structural invariants the stages rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branch.is_empty() {
            return Err(ConfigError::MissingField("branch"));
        }
        if self.product.is_empty() {
            return Err(ConfigError::MissingField("product"));
        }
        if self.version.is_empty() {
            return Err(ConfigError::MissingField("version"));
        }
        if self.build_number == 0 {
            return Err(ConfigError::MissingField("build_number"));
        }
        if self.en_us.platforms.is_empty() {
            return Err(ConfigError::MissingField("en_US_config.platforms"));
        }

        for (platform, descriptor) in self.l10n_platforms() {
            self.require_platform(platform, "l10n_config")?;

            let locales = descriptor.locales.len();
            if descriptor.chunks == 0 || descriptor.chunks as usize > locales {
                return Err(ConfigError::Chunks {
                    platform: platform.to_string(),
                    chunks: descriptor.chunks,
                    locales,
                });
            }

            if let Some(locale) = descriptor
                .locales
                .iter()
                .find(|locale| !self.l10n.changesets.contains_key(*locale))
            {
                return Err(ConfigError::UndeclaredLocale {
                    platform: platform.to_string(),
                    locale: locale.clone(),
                });
            }
        }

        for platform in &self.partner_repacks_platforms {
            self.require_platform(platform, "partner_repacks_platforms")?;
        }

        if self.features.updates_enabled {
            if self.partial_updates.is_empty() {
                return Err(ConfigError::MissingStageData {
                    stage: Stage::PartialUpdates,
                    field: "partial_updates".into(),
                });
            }
            if self.release_channels.is_empty() {
                return Err(ConfigError::MissingStageData {
                    stage: Stage::PartialUpdates,
                    field: "release_channels".into(),
                });
            }
        }

        if let Some(channel) = self
            .final_verify_channels
            .iter()
            .find(|channel| !self.release_channels.contains(channel))
        {
            return Err(ConfigError::UnknownChannel(channel.clone()));
        }

        for pattern in &self.push_to_releases_exclusions {
            glob::Pattern::new(pattern).map_err(|source| ConfigError::Exclusion {
                pattern: pattern.clone(),
                source,
            })?;
        }

        Ok(())
    }

    fn require_platform(&self, platform: &str, referrer: &'static str) -> Result<(), ConfigError> {
        if self.en_us.platforms.contains_key(platform) {
            Ok(())
        } else {
            Err(ConfigError::UndeclaredPlatform {
                platform: platform.to_string(),
                referrer,
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// The beta release used throughout the test suite.
    pub(crate) fn beta() -> Configuration {
        let en_us = ["macosx64", "win32"]
            .into_iter()
            .zip(["xyz", "xyy"])
            .map(|(platform, task_id)| {
                (
                    platform.to_string(),
                    EnUsPlatform {
                        task_id: task_id.into(),
                        artifacts: vec![],
                    },
                )
            })
            .collect();

        let l10n = [
            ("win32", "https://queue.taskcluster.net/something/firefox.exe"),
            ("macosx64", "https://queue.taskcluster.net/something/firefox.tar.xz"),
        ]
        .into_iter()
        .map(|(platform, url)| {
            (
                platform.to_string(),
                L10nPlatform {
                    locales: vec!["de".into(), "en-GB".into(), "zh-TW".into()],
                    en_us_binary_url: url.into(),
                    chunks: 1,
                },
            )
        })
        .collect();

        let changesets = ["de", "en-GB", "zh-TW"]
            .into_iter()
            .map(|locale| (locale.to_string(), "default".to_string()))
            .collect();

        Configuration {
            branch: "mozilla-beta".into(),
            repo_path: "releases/mozilla-beta".into(),
            product: "firefox".into(),
            version: "42.0b2".into(),
            build_number: 3,
            en_us: EnUsConfig { platforms: en_us },
            l10n: L10nConfig {
                platforms: l10n,
                changesets,
            },
            partial_updates: vec![PartialUpdate::new("38.0", 1), PartialUpdate::new("37.0", 2)],
            release_channels: vec!["beta".into(), "release".into()],
            final_verify_channels: vec!["beta".into(), "release".into()],
            partner_repacks_platforms: vec!["win32".into(), "macosx64".into()],
            features: Features {
                checksums_enabled: true,
                updates_enabled: true,
                push_to_candidates_enabled: true,
                push_to_releases_enabled: true,
                push_to_releases_automatic: false,
            },
            push_to_releases_exclusions: default_exclusions(),
        }
    }

    #[test]
    fn test_beta_is_valid() {
        beta().validate().unwrap();
    }

    #[test]
    fn test_platforms_sorted() {
        let config = beta();
        let en_us: Vec<_> = config.en_us_platforms().collect();
        let l10n: Vec<_> = config.l10n_platforms().map(|(name, _)| name).collect();
        assert_eq!(en_us, ["macosx64", "win32"]);
        assert_eq!(l10n, ["macosx64", "win32"]);
    }

    #[test]
    fn test_undeclared_partner_platform() {
        let mut config = beta();
        config.partner_repacks_platforms.push("linux64".into());
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UndeclaredPlatform { ref platform, referrer: "partner_repacks_platforms" }
                if platform == "linux64"
        ));
    }

    #[test]
    fn test_undeclared_l10n_platform() {
        let mut config = beta();
        let descriptor = config.l10n.platforms["win32"].clone();
        config.l10n.platforms.insert("linux".into(), descriptor);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UndeclaredPlatform { .. })
        ));
    }

    #[test]
    fn test_undeclared_locale() {
        let mut config = beta();
        config.l10n.changesets.remove("zh-TW");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredLocale { ref locale, .. } if locale == "zh-TW"));
    }

    #[test]
    fn test_updates_need_partials() {
        let mut config = beta();
        config.partial_updates.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingStageData {
                stage: Stage::PartialUpdates,
                ..
            })
        ));

        config.features.updates_enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn test_updates_need_release_channels() {
        let mut config = beta();
        config.release_channels.clear();
        config.final_verify_channels.clear();

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingStageData { stage: Stage::PartialUpdates, ref field }
                if field == "release_channels"
        ));

        config.features.updates_enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn test_final_verify_channel_must_be_release_channel() {
        let mut config = beta();
        config.final_verify_channels.push("esr".into());
        assert!(matches!(config.validate(), Err(ConfigError::UnknownChannel(c)) if c == "esr"));
    }

    #[test]
    fn test_invalid_exclusion() {
        let mut config = beta();
        config.push_to_releases_exclusions.push("[".into());
        assert!(matches!(config.validate(), Err(ConfigError::Exclusion { .. })));
    }

    #[test]
    fn test_too_many_chunks() {
        let mut config = beta();
        if let Some(platform) = config.l10n.platforms.get_mut("win32") {
            platform.chunks = 4;
        }
        assert!(matches!(config.validate(), Err(ConfigError::Chunks { chunks: 4, .. })));
    }

    #[test]
    fn test_exclusions_need_partner_repacks() {
        let mut config = beta();
        assert_eq!(config.active_exclusions(), DEFAULT_EXCLUSIONS);

        config.partner_repacks_platforms.clear();
        assert!(config.active_exclusions().is_empty());
    }

    #[test]
    fn test_chunk_locales() {
        let platform = L10nPlatform {
            locales: ["a", "b", "c", "d", "e"].map(String::from).to_vec(),
            en_us_binary_url: String::new(),
            chunks: 2,
        };

        assert_eq!(platform.chunk_locales(1), ["a", "b", "c"]);
        assert_eq!(platform.chunk_locales(2), ["d", "e"]);
        assert!(platform.chunk_locales(3).is_empty());
        assert_eq!(platform.chunk_indices().collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn test_from_json() {
        let text = r#"{
            "branch": "mozilla-beta",
            "repo_path": "releases/mozilla-beta",
            "version": "42.0b2",
            "build_number": 3,
            "en_US_config": { "platforms": { "win32": { "task_id": "xyy" } } },
            "checksums_enabled": true
        }"#;

        let config = Configuration::from_json_str(text).unwrap();
        assert_eq!(config.product, "firefox");
        assert!(config.features.checksums_enabled);
        assert!(!config.features.push_to_releases_automatic);
        assert_eq!(config.push_to_releases_exclusions, DEFAULT_EXCLUSIONS);
        assert!(config.l10n.platforms.is_empty());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Configuration::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
