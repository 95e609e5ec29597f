use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::parser::extract::MAX_CATEGORY_TOKENS;
use crate::sources::feed::GO_AFFIRMATIONS_FEED;
use crate::sources::html_pages::HOWARD_BROWN_CATEGORIES;

const DEFAULT_CONFIG_FILE: &str = "radremedy";
const ENV_PREFIX: &str = "RADREMEDY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Upsert policy when the caller does not choose one: leave existing
    /// resources untouched on rescrape.
    pub lazy: bool,
    pub max_category_tokens: usize,
    pub http: HttpSettings,
    pub howard_brown: HowardBrownSettings,
    pub go_affirmations: FeedSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HowardBrownSettings {
    pub enabled: bool,
    pub category_ids: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub enabled: bool,
    pub feed_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_path: PathBuf::from("data/radremedy.sqlite"),
            lazy: true,
            max_category_tokens: MAX_CATEGORY_TOKENS,
            http: HttpSettings::default(),
            howard_brown: HowardBrownSettings::default(),
            go_affirmations: FeedSettings::default(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            user_agent: concat!("rad_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for HowardBrownSettings {
    fn default() -> Self {
        HowardBrownSettings {
            enabled: true,
            category_ids: HOWARD_BROWN_CATEGORIES.to_vec(),
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        FeedSettings {
            enabled: true,
            feed_url: GO_AFFIRMATIONS_FEED.to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Defaults, then `radremedy.toml` (or `file`) if present, then
    /// `RADREMEDY_*` environment variables (`__` separates nested keys).
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert!(s.lazy);
        assert_eq!(s.max_category_tokens, 10);
        assert_eq!(s.howard_brown.category_ids, vec![2722, 2706, 2723, 2725, 2715, 2475]);
        assert_eq!(s.http.timeout(), Duration::from_secs(30));
        assert!(s.go_affirmations.enabled);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = std::env::temp_dir().join(format!("rad_scraper_settings_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("custom.toml");
        std::fs::write(
            &path,
            "lazy = false\nmax_category_tokens = 4\n[howard_brown]\ncategory_ids = [1, 2]\n",
        )
        .unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert!(!s.lazy);
        assert_eq!(s.max_category_tokens, 4);
        assert_eq!(s.howard_brown.category_ids, vec![1, 2]);
        assert!(s.howard_brown.enabled);
        assert_eq!(s.http.timeout_secs, 30);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
