use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_kanjidamage_url")]
    pub kanjidamage_url: String,
    #[serde(default = "default_tangorin_url")]
    pub tangorin_url: String,
    #[serde(default = "default_request_delay")]
    pub request_delay: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnkiConfig {
    #[serde(default = "default_connect_url")]
    pub connect_url: String,
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default = "default_deck")]
    pub deck: String,
    #[serde(default = "default_reordered_deck")]
    pub reordered_deck: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_read_template")]
    pub read_template: String,
    #[serde(default = "default_template_prefix")]
    pub template_prefix: String,
    #[serde(default = "default_words_deck")]
    pub words_deck: String,
    #[serde(default = "default_words_model")]
    pub words_model: String,
    #[serde(default = "default_words_template_prefix")]
    pub words_template_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
    #[serde(default = "default_freq_file")]
    pub freq_file: String,
    #[serde(default = "default_template_dir")]
    pub template_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_top_per_group")]
    pub top_per_group: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for the rolling log file; an empty string disables it.
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_filename")]
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sites: SiteConfig,

    #[serde(default)]
    pub anki: AnkiConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

// Default implementations
impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            kanjidamage_url: default_kanjidamage_url(),
            tangorin_url: default_tangorin_url(),
            request_delay: default_request_delay(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for AnkiConfig {
    fn default() -> Self {
        Self {
            connect_url: default_connect_url(),
            package: default_package(),
            deck: default_deck(),
            reordered_deck: default_reordered_deck(),
            model: default_model(),
            read_template: default_read_template(),
            template_prefix: default_template_prefix(),
            words_deck: default_words_deck(),
            words_model: default_words_model(),
            words_template_prefix: default_words_template_prefix(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
            cache_file: default_cache_file(),
            freq_file: default_freq_file(),
            template_dir: default_template_dir(),
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            top_per_group: default_top_per_group(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
            filename: default_log_filename(),
        }
    }
}

impl Config {
    /// Loads the configuration file at `path`, falling back to defaults when
    /// the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::FileRead)?;

        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("sites.kanjidamage_url", &self.sites.kanjidamage_url),
            ("sites.tangorin_url", &self.sites.tangorin_url),
            ("anki.connect_url", &self.anki.connect_url),
        ] {
            if !url.starts_with("http") {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must start with http(s): {}",
                    name, url
                ))
                .into());
            }
        }

        if self.sites.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "sites.max_retries must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sites.request_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "sites.request_timeout must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, value) in [
            ("anki.deck", &self.anki.deck),
            ("anki.reordered_deck", &self.anki.reordered_deck),
            ("anki.model", &self.anki.model),
            ("anki.read_template", &self.anki.read_template),
            ("anki.words_deck", &self.anki.words_deck),
            ("anki.words_model", &self.anki.words_model),
            ("anki.package", &self.anki.package),
        ] {
            if value.is_empty() {
                return Err(
                    ConfigError::InvalidValue(format!("{} cannot be empty", name)).into(),
                );
            }
        }

        if self.merge.top_per_group == 0 {
            return Err(ConfigError::InvalidValue(
                "merge.top_per_group must be greater than 0".to_string(),
            )
            .into());
        }

        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}

fn default_kanjidamage_url() -> String {
    "https://www.kanjidamage.com".to_string()
}

fn default_tangorin_url() -> String {
    "https://tangorin.com".to_string()
}

fn default_request_delay() -> u64 {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_url() -> String {
    "http://127.0.0.1:8765".to_string()
}

fn default_package() -> String {
    "Official_KanjiDamage_deck_REORDERED.apkg".to_string()
}

fn default_deck() -> String {
    "KanjiDamage".to_string()
}

fn default_reordered_deck() -> String {
    "KanjiDamage Reordered".to_string()
}

fn default_model() -> String {
    "KanjiDamage".to_string()
}

fn default_read_template() -> String {
    "Read".to_string()
}

fn default_template_prefix() -> String {
    "kd".to_string()
}

fn default_words_deck() -> String {
    "KanjiDamage Words".to_string()
}

fn default_words_model() -> String {
    "KanjiDamage Words".to_string()
}

fn default_words_template_prefix() -> String {
    "words".to_string()
}

fn default_media_dir() -> String {
    "media".to_string()
}

fn default_cache_file() -> String {
    "tangorin-cache.json".to_string()
}

fn default_freq_file() -> String {
    "word-freq.txt".to_string()
}

fn default_template_dir() -> String {
    "templates".to_string()
}

fn default_top_per_group() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_filename() -> String {
    "anki-kanji.log".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.anki.deck, "KanjiDamage");
        assert_eq!(config.merge.top_per_group, 1);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let config: Config = toml::from_str(
            r#"
            [merge]
            top_per_group = 3

            [sites]
            request_delay = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.merge.top_per_group, 3);
        assert_eq!(config.sites.request_delay, 0);
        assert_eq!(config.sites.kanjidamage_url, "https://www.kanjidamage.com");
        assert_eq!(config.anki.words_deck, "KanjiDamage Words");
    }

    #[test]
    fn rejects_non_http_url() {
        let config: Config = toml::from_str(
            r#"
            [anki]
            connect_url = "localhost:8765"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_top_per_group() {
        let config: Config = toml::from_str(
            r#"
            [merge]
            top_per_group = 0
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }
}
