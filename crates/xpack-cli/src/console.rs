//! Colored run log on stdout.
//!
//! Every line printed here is also kept in a [`LogBook`] so the run can be
//! rendered to an image afterwards. Diagnostics go through `tracing` on
//! stderr and are not part of this log.

use std::io::{self, IsTerminal};

use colored::Colorize;
use xpack_core::archive::ArchiveProgressEvent;
use xpack_core::report::{LogBook, LogLine, Severity};

pub(crate) struct ConsoleLog {
    book: LogBook,
}

impl ConsoleLog {
    pub(crate) fn new(max_lines: usize) -> Self {
        Self {
            book: LogBook::with_capacity_limit(max_lines),
        }
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.emit(LogLine::info(message));
    }

    pub(crate) fn ok(&mut self, message: impl Into<String>) {
        self.emit(LogLine::ok(message));
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.emit(LogLine::error(message));
    }

    pub(crate) fn on_event(&mut self, event: &ArchiveProgressEvent) {
        self.emit(LogLine::from_event(event));
    }

    pub(crate) fn book(&self) -> &LogBook {
        &self.book
    }

    fn emit(&mut self, line: LogLine) {
        println!("{}", paint(&line));
        self.book.push(line);
    }
}

/// Turn colors off when stdout is not a terminal. `colored` already honours
/// `NO_COLOR` on its own.
pub(crate) fn init_colors() {
    if !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

fn paint(line: &LogLine) -> String {
    let prefix = line.severity.prefix();
    let prefix = match line.severity {
        Severity::Info => prefix.yellow(),
        Severity::Ok => prefix.green(),
        Severity::Error => prefix.red(),
    };
    format!("{prefix} {}", line.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncolored_output_matches_plain_line() {
        colored::control::set_override(false);
        let line = LogLine::ok("a.txt done");
        assert_eq!(paint(&line), line.to_string());
    }

    #[test]
    fn every_printed_line_is_recorded() {
        let mut console = ConsoleLog::new(2);
        console.info("Start");
        console.ok("one");
        console.error("two");
        let kept: Vec<String> = console.book().lines().map(|l| l.message.clone()).collect();
        assert_eq!(kept, vec!["one", "two"]);
    }
}
