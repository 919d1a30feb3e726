//! apiprint configuration loading from `.apiprintrc.toml`.
//!
//! Configuration is optional: apiprint uses sensible defaults if no config
//! file exists, and command-line flags always win over file settings.
//!
//! # Example Configuration
//!
//! ```toml
//! [analysis]
//! check_inheritance = true
//! search_paths = ["lib/net48"]
//!
//! [files]
//! include = ["**/Contoso.*.dll"]
//!
//! [output]
//! format = "table"
//! color = true
//!
//! [stamp]
//! file_name = "AssemblyInfo.cs"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name searched for in the working directory.
pub const CONFIG_FILE_NAME: &str = ".apiprintrc.toml";

/// Default name of the source file carrying version stamps.
pub const DEFAULT_STAMP_FILE: &str = "AssemblyInfo.cs";

/// Root configuration structure loaded from `.apiprintrc.toml`.
///
/// All sections are optional and will use defaults if not specified.
#[derive(Debug, Deserialize, Default)]
pub struct ApiprintConfig {
    /// Extraction settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Which module files to compare.
    #[serde(default)]
    pub files: FilesConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,

    /// Version stamp patching.
    #[serde(default)]
    pub stamp: StampConfig,
}

/// Extraction settings shared by `extract` and `compare`.
#[derive(Debug, Deserialize, Default)]
pub struct AnalysisConfig {
    /// Emit `|INHERITS:` and restrict members to declared ones.
    #[serde(default)]
    pub check_inheritance: bool,

    /// Directories probed for referenced modules.
    ///
    /// Only the first entry is used for `<name>.exe` / `<name>.dll` probing;
    /// every entry is pre-registered for direct resolution.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

/// File selection for directory comparisons.
#[derive(Debug, Deserialize, Default)]
pub struct FilesConfig {
    /// Glob patterns over paths relative to the compared directories.
    ///
    /// Empty means "every `.dll`".
    #[serde(default)]
    pub include: Vec<String>,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Valid values: `table`, `json`. Default: `table`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output. Defaults to auto-detection.
    #[serde(default)]
    pub color: Option<bool>,
}

/// Version stamp settings.
#[derive(Debug, Deserialize, Default)]
pub struct StampConfig {
    /// Name of the files to patch below the stamp directory.
    #[serde(default)]
    pub file_name: Option<String>,
}

impl ApiprintConfig {
    /// Load configuration from `.apiprintrc.toml` in the given directory.
    ///
    /// If the config file doesn't exist or can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE_NAME, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE_NAME, e);
                }
            }
        }
        Self::default()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Configured color override, or `None` to auto-detect.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    /// Inheritance tracking, enabled by either the flag or the file.
    pub fn check_inheritance(&self, flag: bool) -> bool {
        flag || self.analysis.check_inheritance
    }

    /// Search path: the flag if given, else the first configured one.
    pub fn search_path(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.analysis.search_paths.first().cloned())
    }

    /// Additional directories whose modules are registered up front.
    pub fn reference_dirs(&self) -> &[PathBuf] {
        &self.analysis.search_paths
    }

    /// File globs: flags if any were given, else the configured ones.
    pub fn include_patterns(&self, flags: Vec<String>) -> Vec<String> {
        if flags.is_empty() {
            self.files.include.clone()
        } else {
            flags
        }
    }

    pub fn stamp_file_name(&self) -> &str {
        self.stamp.file_name.as_deref().unwrap_or(DEFAULT_STAMP_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiprintConfig::default();
        assert!(!config.analysis.check_inheritance);
        assert!(config.analysis.search_paths.is_empty());
        assert!(config.files.include.is_empty());
        assert!(config.output.format.is_none());
        assert_eq!(config.stamp_file_name(), "AssemblyInfo.cs");
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[analysis]
check_inheritance = true
search_paths = ["lib/net48", "lib/extra"]

[files]
include = ["**/Contoso.*.dll"]

[output]
format = "json"
color = false

[stamp]
file_name = "VersionInfo.cs"
"#;
        let config: ApiprintConfig = toml::from_str(toml_content).unwrap();

        assert!(config.check_inheritance(false));
        assert_eq!(config.search_path(None), Some(PathBuf::from("lib/net48")));
        assert_eq!(config.reference_dirs().len(), 2);
        assert_eq!(config.include_patterns(vec![]), vec!["**/Contoso.*.dll"]);
        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.use_color(), Some(false));
        assert_eq!(config.stamp_file_name(), "VersionInfo.cs");
    }

    #[test]
    fn test_flags_override_config() {
        let toml_content = r#"
[analysis]
search_paths = ["lib"]

[files]
include = ["*.dll"]
"#;
        let config: ApiprintConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(
            config.search_path(Some(PathBuf::from("other"))),
            Some(PathBuf::from("other"))
        );
        assert_eq!(
            config.include_patterns(vec!["*.exe".to_string()]),
            vec!["*.exe"]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ApiprintConfig::load(dir.path());
        assert!(config.default_format().is_none());
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[analysis\nbroken").unwrap();
        let config = ApiprintConfig::load(dir.path());
        assert!(!config.analysis.check_inheritance);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[output]\nformat = \"json\"\n",
        )
        .unwrap();
        let config = ApiprintConfig::load(dir.path());
        assert_eq!(config.default_format(), Some("json"));
    }
}
