//! Configuration management for Trellis.
//!
//! Parses `trellis.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.tree`
//! - `render.headers.*` values

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the page tree file.
    pub tree: Option<PathBuf>,
    /// Override the resolution mode.
    pub mode: Option<Mode>,
    /// Override part inheritance during rendering.
    pub inherit_parts: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "trellis.toml";

/// Default page tree filename, relative to the config directory.
const DEFAULT_TREE: &str = "site.yaml";

/// Largest accepted `resolver.max_depth`.
const MAX_DEPTH_LIMIT: usize = 4096;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site configuration (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Resolver configuration.
    pub resolver: ResolverConfig,
    /// Render configuration.
    pub render: RenderConfig,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Resolution mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only published pages are visible.
    #[default]
    Live,
    /// Every page is visible.
    Preview,
}

/// Raw site configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SiteConfigRaw {
    tree: Option<String>,
    mode: Option<Mode>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SiteConfig {
    /// YAML page tree file.
    pub tree: PathBuf,
    /// Default resolution mode.
    pub mode: Mode,
}

/// Resolver configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Bound on descent depth.
    pub max_depth: usize,
    /// Normalize request paths before resolving.
    pub normalize: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            normalize: true,
        }
    }
}

/// Render configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Render a part inherited from an ancestor when a page lacks its own.
    pub inherit_parts: bool,
    /// Headers added to every response.
    pub headers: BTreeMap<String, String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.tree`").
        field: String,
        /// Error message (e.g., "${`TRELLIS_TREE`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `trellis.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(tree) = &settings.tree {
            self.site_resolved.tree.clone_from(tree);
        }
        if let Some(mode) = settings.mode {
            self.site_resolved.mode = mode;
        }
        if let Some(inherit_parts) = settings.inherit_parts {
            self.render.inherit_parts = inherit_parts;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfigRaw::default(),
            resolver: ResolverConfig::default(),
            render: RenderConfig::default(),
            site_resolved: SiteConfig {
                tree: base.join(DEFAULT_TREE),
                mode: Mode::Live,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_resolver()?;
        self.validate_render()?;
        Ok(())
    }

    fn validate_resolver(&self) -> Result<(), ConfigError> {
        let max_depth = self.resolver.max_depth;
        if max_depth == 0 {
            return Err(ConfigError::Validation(
                "resolver.max_depth must be greater than 0".to_owned(),
            ));
        }
        if max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::Validation(format!(
                "resolver.max_depth cannot exceed {MAX_DEPTH_LIMIT}"
            )));
        }
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        for name in self.render.headers.keys() {
            let valid = !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
            if !valid {
                return Err(ConfigError::Validation(format!(
                    "render.headers: invalid header name {name:?}"
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref tree) = self.site.tree {
            self.site.tree = Some(expand::expand_env(tree, "site.tree")?);
        }

        for (name, value) in &mut self.render.headers {
            let expanded = expand::expand_env(value, &format!("render.headers.{name}"))?;
            *value = expanded;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.site_resolved = SiteConfig {
            tree: config_dir.join(self.site.tree.as_deref().unwrap_or(DEFAULT_TREE)),
            mode: self.site.mode.unwrap_or_default(),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.site_resolved.tree, PathBuf::from("/test/site.yaml"));
        assert_eq!(config.site_resolved.mode, Mode::Live);
        assert_eq!(config.resolver.max_depth, 64);
        assert!(config.resolver.normalize);
        assert!(!config.render.inherit_parts);
        assert!(config.render.headers.is_empty());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.resolver.max_depth, 64);
        assert!(config.resolver.normalize);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[site]
tree = "content/tree.yaml"
mode = "preview"

[resolver]
max_depth = 16
normalize = false

[render]
inherit_parts = true

[render.headers]
"X-Powered-By" = "trellis"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.site_resolved.tree,
            PathBuf::from("/project/content/tree.yaml")
        );
        assert_eq!(config.site_resolved.mode, Mode::Preview);
        assert_eq!(config.resolver.max_depth, 16);
        assert!(!config.resolver.normalize);
        assert!(config.render.inherit_parts);
        assert_eq!(
            config.render.headers.get("X-Powered-By").map(String::as_str),
            Some("trellis")
        );
    }

    #[test]
    fn test_parse_invalid_mode() {
        let result: Result<Config, _> = toml::from_str("[site]\nmode = \"draft\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_paths_default_tree() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.site_resolved.tree, PathBuf::from("/project/site.yaml"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            tree: Some(PathBuf::from("/other/tree.yaml")),
            mode: Some(Mode::Preview),
            inherit_parts: Some(true),
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.site_resolved.tree, PathBuf::from("/other/tree.yaml"));
        assert_eq!(config.site_resolved.mode, Mode::Preview);
        assert!(config.render.inherit_parts);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.site_resolved.tree, PathBuf::from("/test/site.yaml"));
        assert_eq!(config.site_resolved.mode, Mode::Live);
        assert!(!config.render.inherit_parts);
    }

    #[test]
    fn test_expand_env_vars_tree() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TEST_TRELLIS_TREE", "from-env.yaml");
        }

        let toml = r#"
[site]
tree = "${TEST_TRELLIS_TREE}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.site_resolved.tree,
            PathBuf::from("/project/from-env.yaml")
        );

        unsafe {
            std::env::remove_var("TEST_TRELLIS_TREE");
        }
    }

    #[test]
    fn test_expand_env_vars_header_default() {
        let toml = r#"
[render.headers]
"X-Site" = "${TEST_TRELLIS_SITE_UNSET:-docs}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.render.headers["X-Site"], "docs");
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_TRELLIS_TEST");
        }

        let toml = r#"
[render.headers]
"X-Site" = "${MISSING_VAR_TRELLIS_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_TRELLIS_TEST"));
        assert!(err.to_string().contains("render.headers.X-Site"));
    }

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_depth_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.resolver.max_depth = 0;
        assert_validation_error(&config, &["resolver.max_depth", "greater than 0"]);
    }

    #[test]
    fn test_validate_max_depth_too_large() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.resolver.max_depth = 5000;
        assert_validation_error(&config, &["resolver.max_depth", "4096"]);
    }

    #[test]
    fn test_validate_header_name() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config
            .render
            .headers
            .insert("Bad Header".to_owned(), "x".to_owned());
        assert_validation_error(&config, &["render.headers", "Bad Header"]);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        std::fs::write(&path, "[site]\ntree = \"pages.yaml\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.site_resolved.tree, dir.path().join("pages.yaml"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        std::fs::write(&path, "[resolver]\nmax_depth = 0\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_applies_cli_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        std::fs::write(&path, "[site]\nmode = \"live\"\n").unwrap();
        let settings = CliSettings {
            mode: Some(Mode::Preview),
            ..CliSettings::default()
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.site_resolved.mode, Mode::Preview);
    }
}
