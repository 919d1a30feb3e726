//! Output formatting module for the apiprint CLI
//!
//! Provides unified output formatting across all commands with support for
//! two formats: table (human-readable, coloured) and json (machine-readable).
//!
//! Automatically detects TTY context to adjust colors.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;

mod json;

pub use self::json::JsonOutput;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// The output format to use
    pub format: OutputFormat,
    /// Disable colored output
    pub no_color: bool,
    /// Compact mode (single-line JSON)
    pub compact: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_color: false,
            compact: false,
        }
    }

    /// Create an OutputConfig with automatic TTY detection
    ///
    /// Colors are disabled when stdout is piped or redirected.
    pub fn auto_detect(format: OutputFormat) -> Self {
        Self {
            no_color: !is_tty(),
            ..Self::new(format)
        }
    }

    /// Builder: force colors on or off, `None` keeps the detected setting
    pub fn with_color(mut self, color: Option<bool>) -> Self {
        if let Some(color) = color {
            self.no_color = !color;
        }
        self
    }

    /// Check if colors should be used
    pub fn use_colors(&self) -> bool {
        !self.no_color
    }

    /// Builder: enable compact mode
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

/// Trait for types that can be formatted as output
pub trait Outputter: Serialize + Sized {
    /// Render as human-readable report
    fn to_table(&self, config: &OutputConfig) -> String;

    /// Render as JSON format
    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(self, config)
    }

    /// Render using the format specified in config
    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Table => self.to_table(config),
            OutputFormat::Json => self.to_json(config),
        }
    }

    /// Render and print to stdout
    fn output(&self, config: &OutputConfig) {
        println!("{}", self.render(config));
    }
}

/// Result wrapper for formatted output with automatic format selection
pub struct Output<T> {
    data: T,
    config: OutputConfig,
}

impl<T: Outputter> Output<T> {
    /// Create a new output wrapper rendering with `config`
    pub fn new(data: T, config: OutputConfig) -> Self {
        Self { data, config }
    }

    /// Render the output to stdout
    pub fn render(&self) -> anyhow::Result<()> {
        colored::control::set_override(self.config.use_colors());
        self.data.output(&self.config);
        Ok(())
    }

    /// Get the rendered string without printing
    #[cfg(test)]
    pub fn render_to_string(&self) -> String {
        self.data.render(&self.config)
    }
}

/// Detect if stdout is a TTY
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: String,
    }

    impl Outputter for Sample {
        fn to_table(&self, _config: &OutputConfig) -> String {
            format!("name: {}", self.name)
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_config_builder() {
        let config = OutputConfig::new(OutputFormat::Json)
            .with_color(Some(false))
            .compact();

        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.use_colors());
        assert!(config.compact);
    }

    #[test]
    fn test_color_override_keeps_detection_when_unset() {
        let config = OutputConfig::new(OutputFormat::Table).with_color(None);
        assert!(config.use_colors());
        let config = config.with_color(Some(false)).with_color(None);
        assert!(!config.use_colors());
    }

    #[test]
    fn test_render_selects_format() {
        let sample = Sample {
            name: "Contoso".to_string(),
        };
        assert_eq!(
            Output::new(sample, OutputConfig::new(OutputFormat::Table)).render_to_string(),
            "name: Contoso"
        );

        let sample = Sample {
            name: "Contoso".to_string(),
        };
        let json = Output::new(sample, OutputConfig::new(OutputFormat::Json)).render_to_string();
        assert!(json.contains("\"name\": \"Contoso\""));
    }
}
