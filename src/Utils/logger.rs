use crate::Utils::config::LoggingConfig;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;

/// Installs the global logger: terminal output and/or a log file, as configured.
///
/// Returns false when a logger was already installed or nothing was requested; the
/// analysis itself runs the same either way.
pub fn init_logger(config: &LoggingConfig) -> bool {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if config.console {
        loggers.push(TermLogger::new(
            config.level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if let Some(name) = &config.file {
        match File::create(name) {
            Ok(file) => loggers.push(WriteLogger::new(config.level, Config::default(), file)),
            Err(e) => eprintln!("cannot create log file {}: {}", name, e),
        }
    }
    if loggers.is_empty() {
        return false;
    }
    let logger_instance = CombinedLogger::init(loggers);
    match logger_instance {
        Ok(()) => true,
        Err(_) => false,
    }
}
