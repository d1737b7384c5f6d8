//! Structured logging for the synchronization core
//!
//! Every subsystem logs through a single [`SignalLogger`] so that a
//! telemetry consumer or CLI can filter by level and by subsystem without
//! each detector needing its own logging policy.

use std::fmt;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to record.
    pub level: LogLevel,

    /// Per-subsystem enable flags. Subsystem names match the constants
    /// in this module (`DECIMATE`, `TICK`, `MARKER`, `BCD`, `CARRIER`,
    /// `SYNC`, `GATE`, `BUS`, `CONTROL`).
    pub enable_decimate: bool,
    pub enable_detectors: bool,
    pub enable_sync: bool,
    pub enable_bus: bool,
    pub enable_control: bool,

    /// Maximum number of log entries retained in the ring.
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            enable_decimate: true,
            enable_detectors: true,
            enable_sync: true,
            enable_bus: true,
            enable_control: true,
            max_entries: 1000,
        }
    }
}

impl LogConfig {
    /// Verbose logging for debugging a receiver session.
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            max_entries: 5000,
            ..Default::default()
        }
    }

    /// Quiet logging suitable for an unattended deployment.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Warn,
            enable_decimate: false,
            enable_detectors: false,
            max_entries: 200,
            ..Default::default()
        }
    }

    /// Disable all logging.
    pub fn disabled() -> Self {
        Self {
            level: LogLevel::Error,
            enable_decimate: false,
            enable_detectors: false,
            enable_sync: false,
            enable_bus: false,
            enable_control: false,
            max_entries: 0,
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub subsystem: &'static str,
    pub message: String,
}

/// Logger that collects structured log entries in a bounded ring.
#[derive(Debug, Clone)]
pub struct SignalLogger {
    config: LogConfig,
    entries: Vec<LogEntry>,
}

impl SignalLogger {
    pub fn new(config: LogConfig) -> Self {
        let capacity = config.max_entries.min(1000);
        Self {
            config,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Log a message at the specified level, subject to level and
    /// subsystem filtering.
    pub fn log(&mut self, level: LogLevel, subsystem: &'static str, message: impl fmt::Display) {
        if level < self.config.level {
            return;
        }

        let enabled = match subsystem {
            "DECIMATE" => self.config.enable_decimate,
            "TICK" | "MARKER" | "BCD" | "CARRIER" => self.config.enable_detectors,
            "SYNC" | "GATE" => self.config.enable_sync,
            "BUS" => self.config.enable_bus,
            "CONTROL" => self.config.enable_control,
            _ => true,
        };

        if !enabled {
            return;
        }

        let entry = LogEntry {
            level,
            subsystem,
            message: message.to_string(),
        };

        if self.config.max_entries > 0 {
            if self.entries.len() >= self.config.max_entries {
                self.entries.remove(0);
            }
            self.entries.push(entry);
        }

        #[cfg(any(test, debug_assertions))]
        {
            eprintln!("[{}] {}: {}", level, subsystem, message);
        }
    }

    pub fn trace(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Trace, subsystem, message);
    }

    pub fn debug(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Debug, subsystem, message);
    }

    pub fn info(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Info, subsystem, message);
    }

    pub fn warn(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Warn, subsystem, message);
    }

    pub fn error(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Error, subsystem, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_for_subsystem(&self, subsystem: &str) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.subsystem == subsystem)
            .collect()
    }

    pub fn entries_at_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level >= level).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Count of entries at each level, in (trace, debug, info, warn, error) order.
    pub fn level_counts(&self) -> (usize, usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0, 0);
        for entry in &self.entries {
            match entry.level {
                LogLevel::Trace => counts.0 += 1,
                LogLevel::Debug => counts.1 += 1,
                LogLevel::Info => counts.2 += 1,
                LogLevel::Warn => counts.3 += 1,
                LogLevel::Error => counts.4 += 1,
            }
        }
        counts
    }
}

impl Default for SignalLogger {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl fmt::Display for SignalLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}] {}: {}", e.level, e.subsystem, e.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_level() {
        let config = LogConfig {
            level: LogLevel::Info,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.trace("TICK", "trace message");
        logger.debug("TICK", "debug message");
        logger.info("TICK", "info message");
        logger.warn("TICK", "warn message");

        assert_eq!(logger.entries().len(), 2);
    }

    #[test]
    fn filters_by_subsystem() {
        let config = LogConfig {
            level: LogLevel::Debug,
            enable_decimate: false,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.info("DECIMATE", "dropped");
        logger.info("SYNC", "kept");

        assert_eq!(logger.entries().len(), 1);
        assert_eq!(logger.entries()[0].subsystem, "SYNC");
    }

    #[test]
    fn respects_max_entries() {
        let config = LogConfig {
            level: LogLevel::Debug,
            max_entries: 3,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.info("BUS", "message 1");
        logger.info("BUS", "message 2");
        logger.info("BUS", "message 3");
        logger.info("BUS", "message 4");

        assert_eq!(logger.entries().len(), 3);
        assert!(logger.entries()[0].message.contains("message 2"));
    }
}
