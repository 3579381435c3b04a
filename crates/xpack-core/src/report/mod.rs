//! Log lines produced during a run and their rendering.
//!
//! A [`LogBook`] is owned by whoever observes the run (normally the CLI's
//! console logger). It keeps the rendered lines so they can be turned into a
//! PNG snapshot with [`render::save_log_image`] once the run is over.

pub mod render;

use std::collections::VecDeque;
use std::fmt;

use crate::archive::ArchiveProgressEvent;

/// Lines kept by a default [`LogBook`].
pub const DEFAULT_MAX_LINES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Ok,
    Error,
}

impl Severity {
    /// Fixed-width prefix so messages line up in a terminal.
    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Info => "[INFO]",
            Severity::Ok => "[OK]  ",
            Severity::Error => "[ERR] ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub severity: Severity,
    pub message: String,
}

impl LogLine {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Severity::Ok, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Describe an archiver progress event as a log line.
    pub fn from_event(event: &ArchiveProgressEvent) -> Self {
        match event {
            ArchiveProgressEvent::EntryStarted { entry } => {
                Self::info(format!("Compressing: {}", entry.relative_path))
            }
            ArchiveProgressEvent::EntryCompleted { entry } => {
                Self::ok(format!("{} done", entry.relative_path))
            }
            ArchiveProgressEvent::EntryFailed { entry, error } => {
                Self::error(format!("{}: {error}", entry.relative_path))
            }
            ArchiveProgressEvent::EntrySkipped { path, reason } => {
                Self::info(format!("Skipped {path} ({reason})"))
            }
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.prefix(), self.message)
    }
}

/// Bounded history of log lines; the oldest lines fall off first.
#[derive(Debug, Clone)]
pub struct LogBook {
    lines: VecDeque<LogLine>,
    max_lines: Option<usize>,
}

impl Default for LogBook {
    fn default() -> Self {
        Self::with_capacity_limit(DEFAULT_MAX_LINES)
    }
}

impl LogBook {
    pub fn with_capacity_limit(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines.min(1024)),
            max_lines: Some(max_lines),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: None,
        }
    }

    pub fn push(&mut self, line: LogLine) {
        if self.max_lines == Some(0) {
            return;
        }
        self.lines.push_back(line);
        if let Some(max) = self.max_lines {
            while self.lines.len() > max {
                self.lines.pop_front();
            }
        }
    }

    pub fn lines(&self) -> impl ExactSizeIterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
