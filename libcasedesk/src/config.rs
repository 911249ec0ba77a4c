#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use config::Config;
#[cfg(not(target_arch = "wasm32"))]
use config::{Environment, File};
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::option_filter::OptionFilterOptions;
use crate::populator::PopulatorOptions;
use crate::tag_filter::TagFilterOptions;

#[cfg(not(target_arch = "wasm32"))]
pub const CONFIG_FILE: &str = "casedesk.toml";
const DEFAULT_CONFIG: &str = include_str!("../default_config.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Prefixed to relative request URLs.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    /// Also record events for [`crate::logs::take_diagnostics`].
    pub diagnostics: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            diagnostics: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CasedeskConfig {
    #[serde(default)]
    pub option_filters: Vec<OptionFilterOptions>,
    pub populator: PopulatorOptions,
    pub tags: TagFilterOptions,
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CasedeskConfig {
    #[cfg(target_arch = "wasm32")]
    pub fn new(_force_default_config: bool) -> Result<Self> {
        Self::new_from_toml(DEFAULT_CONFIG)
    }

    /// Embedded defaults, overridden by `casedesk.toml` in the working directory and
    /// by `CASEDESK_*` environment variables (`CASEDESK_POPULATOR__FOR_TYPE=suite`).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(force_default_config: bool) -> Result<Self> {
        let file = (!force_default_config).then(|| (Path::new(CONFIG_FILE), false));
        Self::layered(file)
    }

    /// Embedded defaults overridden by `path`, which must exist.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &Path) -> Result<Self> {
        use eyre::Context;

        Self::layered(Some((path, true)))
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn layered(file: Option<(&Path, bool)>) -> Result<Self> {
        use eyre::anyhow;

        let mut config = Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ));
        if let Some((file, required)) = file {
            config = config.add_source(File::from(file).required(required)).add_source(
                Environment::with_prefix("casedesk")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        config
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow!("Failed to parse config {e}"))
    }

    pub fn new_from_toml(config: &str) -> Result<Self> {
        Ok(toml::from_str(config)?)
    }

    /// Only the defaults, without any file or environment.
    pub fn defaults() -> Result<Self> {
        Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .build()?
            .try_deserialize()
            .map_err(|e| eyre::anyhow!("Failed to parse default config {e}"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::option_filter::FilterTarget;

    #[test]
    fn default_config_parses() {
        let config = CasedeskConfig::new_from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.populator, PopulatorOptions::default());
        assert_eq!(config.tags, TagFilterOptions::default());
        assert_eq!(config.option_filters, vec![OptionFilterOptions::default()]);
        assert_eq!(config.http.timeout_ms, 30000);
        assert_eq!(config.http.base_url, None);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn defaults_through_config_layers() {
        assert_eq!(
            CasedeskConfig::defaults().unwrap(),
            CasedeskConfig::new_from_toml(DEFAULT_CONFIG).unwrap()
        );
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[populator]
ajax_url_root = "/api/v1/suiteselection/?product="
for_type = "run"

[[option_filters]]
trigger_field = "id_product"
target = "multiunselected"
multiselect_widget = true
"#
        )
        .unwrap();

        let config = CasedeskConfig::load(file.path()).unwrap();
        assert_eq!(config.populator.for_type.as_deref(), Some("run"));
        assert_eq!(
            config.populator.ajax_url_root,
            "/api/v1/suiteselection/?product="
        );
        assert!(config.populator.refetch_on_trigger);
        assert_eq!(config.option_filters.len(), 1);
        assert_eq!(config.option_filters[0].target, FilterTarget::UnselectedPane);
        assert!(config.option_filters[0].multiselect_widget);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CasedeskConfig::load(&dir.path().join("nope.toml")).is_err());
    }
}
