// src/utils/log.rs

//! Run-scoped console log with server-style formatting.
//!
//! A [`RunLog`] is opened when a run starts, passed to every stage that
//! reports progress, and finished when the run ends. Every line carries a
//! timestamp and level so the orchestrator can relay it verbatim.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Instant;

use chrono::Local;

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Format a log line with timestamp and level.
fn format_log(level: LogLevel, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, level.as_str(), message)
}

/// Console sink for one run.
pub struct RunLog {
    level: LogLevel,
    out: Mutex<Box<dyn Write + Send>>,
    opened_at: Instant,
}

impl RunLog {
    /// Open a log writing to stdout.
    pub fn stdout(level: &str) -> Self {
        Self::with_writer(LogLevel::parse(level), Box::new(io::stdout()))
    }

    /// Open a log writing to any sink.
    pub fn with_writer(level: LogLevel, writer: Box<dyn Write + Send>) -> Self {
        Self {
            level,
            out: Mutex::new(writer),
            opened_at: Instant::now(),
        }
    }

    /// A log that discards everything.
    pub fn sink() -> Self {
        Self::with_writer(LogLevel::Error, Box::new(io::sink()))
    }

    fn should_log(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut out) = self.out.lock() {
            // A closed console must not abort the run.
            let _ = writeln!(out, "{line}");
        }
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if self.should_log(level) {
            self.write_line(&format_log(level, message));
        }
    }

    /// Log a debug message
    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    /// Log an info message
    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message);
    }

    /// Log an error message
    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }

    /// Log a success message (always shown)
    pub fn success(&self, message: &str) {
        self.write_line(&format_log(LogLevel::Info, &format!("✓ {message}")));
    }

    /// Log a step in a process
    pub fn step(&self, step_num: usize, total: usize, message: &str) {
        self.info(&format!("[STEP {step_num}/{total}] {message}"));
    }

    /// Log a header
    pub fn header(&self, title: &str) {
        let border = "═".repeat(60);
        self.info(&border);
        self.info(&format!("  {title}"));
        self.info(&border);
    }

    /// Log a summary section
    pub fn summary(&self, title: &str, items: &[(&str, String)]) {
        self.info(&format!("[SUMMARY] {title}"));
        for (key, value) in items {
            self.info(&format!("    {key}: {value}"));
        }
    }

    /// Close the log, reporting how long it was open.
    pub fn finish(self) {
        let elapsed = self.opened_at.elapsed();
        self.debug(&format!("Log closed after {:.1}s", elapsed.as_secs_f64()));
        if let Ok(mut out) = self.out.lock() {
            let _ = out.flush();
        }
    }
}
