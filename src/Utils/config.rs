//! Settings of the command-line driver read from a TOML document.
//!
//! ```toml
//! [plot]
//! xmin = -10.0
//! xmax = 10.0
//! samples = 1000
//! margin = 2.0
//! width = 800
//! height = 600
//! output = "function.png"
//!
//! [logging]
//! level = "info"      # debug | info | warn | error | off
//! console = true
//! file = "auto"       # "auto" gives log_<date>_<time>.txt; omit for no log file
//! ```
//! Every key is optional.
use chrono::Local;
use simplelog::LevelFilter;
use std::fmt;
use std::fs;
use std::path::Path;
use toml::{Table, Value};

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Toml(String),
    /// a key is present but has the wrong type or an unusable value
    InvalidValue { key: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "cannot read configuration: {}", msg),
            ConfigError::Toml(msg) => write!(f, "configuration is not valid TOML: {}", msg),
            ConfigError::InvalidValue { key, reason } => {
                write!(f, "invalid value for '{}': {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// sampling window and chart geometry
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    pub xmin: f64,
    pub xmax: f64,
    pub samples: usize,
    /// extra room kept around a marked point outside the window
    pub margin: f64,
    pub width: u32,
    pub height: u32,
    pub output: String,
}

impl Default for PlotSettings {
    fn default() -> Self {
        PlotSettings {
            xmin: -10.0,
            xmax: 10.0,
            samples: 1000,
            margin: 2.0,
            width: 800,
            height: 600,
            output: "function.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: LevelFilter,
    pub console: bool,
    /// log file name, `None` for console only
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LevelFilter::Warn,
            console: true,
            file: None,
        }
    }
}

/// log file name stamped with the current date and time
pub fn timestamped_log_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerConfig {
    pub plot: PlotSettings,
    pub logging: LoggingConfig,
}

impl AnalyzerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table = text
            .parse::<Table>()
            .map_err(|e| ConfigError::Toml(e.to_string()))?;
        let mut config = AnalyzerConfig::default();
        if let Some(plot) = section(&table, "plot")? {
            let p = &mut config.plot;
            if let Some(v) = float(plot, "plot.xmin")? {
                p.xmin = v;
            }
            if let Some(v) = float(plot, "plot.xmax")? {
                p.xmax = v;
            }
            if let Some(v) = positive_int(plot, "plot.samples")? {
                p.samples = v as usize;
            }
            if let Some(v) = float(plot, "plot.margin")? {
                p.margin = v;
            }
            if let Some(v) = positive_int(plot, "plot.width")? {
                p.width = u32::try_from(v).map_err(|e| invalid("plot.width", e))?;
            }
            if let Some(v) = positive_int(plot, "plot.height")? {
                p.height = u32::try_from(v).map_err(|e| invalid("plot.height", e))?;
            }
            if let Some(v) = string(plot, "plot.output")? {
                p.output = v;
            }
            if p.xmin >= p.xmax {
                return Err(invalid("plot.xmin", "xmin must be smaller than xmax"));
            }
            if p.samples < 2 {
                return Err(invalid("plot.samples", "at least 2 samples are needed"));
            }
        }
        if let Some(logging) = section(&table, "logging")? {
            let l = &mut config.logging;
            if let Some(level) = string(logging, "logging.level")? {
                l.level = level_filter(&level)?;
            }
            if let Some(v) = logging.get("console") {
                l.console = v
                    .as_bool()
                    .ok_or_else(|| invalid("logging.console", "expected true or false"))?;
            }
            l.file = match string(logging, "logging.file")?.as_deref() {
                None => None,
                Some("auto") => Some(timestamped_log_name()),
                Some(name) => Some(name.to_string()),
            };
        }
        Ok(config)
    }
}

fn invalid(key: &str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn last_key(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

fn section<'a>(table: &'a Table, name: &str) -> Result<Option<&'a Table>, ConfigError> {
    match table.get(name) {
        None => Ok(None),
        Some(Value::Table(t)) => Ok(Some(t)),
        Some(_) => Err(invalid(name, "expected a section")),
    }
}

fn float(table: &Table, key: &str) -> Result<Option<f64>, ConfigError> {
    match table.get(last_key(key)) {
        None => Ok(None),
        Some(Value::Float(v)) => Ok(Some(*v)),
        Some(Value::Integer(v)) => Ok(Some(*v as f64)),
        Some(_) => Err(invalid(key, "expected a number")),
    }
}

fn positive_int(table: &Table, key: &str) -> Result<Option<i64>, ConfigError> {
    match table.get(last_key(key)) {
        None => Ok(None),
        Some(Value::Integer(v)) if *v > 0 => Ok(Some(*v)),
        Some(_) => Err(invalid(key, "expected a positive integer")),
    }
}

fn string(table: &Table, key: &str) -> Result<Option<String>, ConfigError> {
    match table.get(last_key(key)) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(key, "expected a string")),
    }
}

fn level_filter(level: &str) -> Result<LevelFilter, ConfigError> {
    match level.to_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" => Ok(LevelFilter::Off),
        other => Err(invalid(
            "logging.level",
            format!("'{}' is not one of debug, info, warn, error, off", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.plot.xmin, -10.0);
        assert_eq!(config.plot.xmax, 10.0);
        assert_eq!(config.plot.samples, 1000);
        assert_eq!(config.plot.margin, 2.0);
    }

    #[test]
    fn test_full_document() {
        let text = r#"
            [plot]
            xmin = -5
            xmax = 5.5
            samples = 200
            margin = 1.0
            width = 640
            height = 480
            output = "out.png"

            [logging]
            level = "debug"
            console = false
            file = "analysis.log"
        "#;
        let config = AnalyzerConfig::from_toml_str(text).unwrap();
        assert_eq!(config.plot.xmin, -5.0);
        assert_eq!(config.plot.xmax, 5.5);
        assert_eq!(config.plot.samples, 200);
        assert_eq!(config.plot.width, 640);
        assert_eq!(config.plot.output, "out.png");
        assert_eq!(config.logging.level, LevelFilter::Debug);
        assert!(!config.logging.console);
        assert_eq!(config.logging.file.as_deref(), Some("analysis.log"));
    }

    #[test]
    fn test_auto_log_name() {
        let config = AnalyzerConfig::from_toml_str("[logging]\nfile = \"auto\"").unwrap();
        let name = config.logging.file.unwrap();
        assert!(name.starts_with("log_") && name.ends_with(".txt"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            AnalyzerConfig::from_toml_str("[plot]\nsamples = -3"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AnalyzerConfig::from_toml_str("[plot]\nxmin = 3\nxmax = 1"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AnalyzerConfig::from_toml_str("[logging]\nlevel = \"loud\""),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AnalyzerConfig::from_toml_str("plot = 3"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AnalyzerConfig::from_toml_str("[plot"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[plot]\nxmax = 20").unwrap();
        let config = AnalyzerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.plot.xmax, 20.0);
        assert!(matches!(
            AnalyzerConfig::from_file(Path::new("/definitely/not/here.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
