/// Status lines printed while the child runs.
///
/// These are the tool's user-facing output, not diagnostics: every line goes
/// to stdout and is flushed immediately so a CI runner sees it as activity.
use crossterm::style::{style, Stylize};
use std::io::Write;

const HEADER: &str = "Travis-wait ❱";

/// How a status line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Neutral information (startup banner).
    Info,
    /// Still waiting on the child.
    Pending,
    /// The child exited cleanly.
    Good,
    /// Timeout kill or non-zero exit.
    Failure,
}

/// Anything that can emit a status line at a given severity.
pub trait Reporter {
    fn report(&mut self, severity: Severity, message: &str);
}

/// Writes styled status lines to a terminal (stdout by default).
pub struct ConsoleReporter<W: Write = std::io::Stdout> {
    out: W,
    color: bool,
}

impl ConsoleReporter {
    pub fn stdout(color: bool) -> Self {
        Self::new(std::io::stdout(), color)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    fn render(&self, severity: Severity, message: &str) -> String {
        if !self.color {
            return format!("{HEADER} {message}");
        }
        let header = style(HEADER).magenta().bold();
        match severity {
            Severity::Info => format!("{header} {message}"),
            Severity::Pending => format!("{header} {}", style(message).yellow()),
            Severity::Good => format!("{header} {}", style(message).green().bold()),
            Severity::Failure => format!("{header} {}", style(message).red().bold()),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, severity: Severity, message: &str) {
        let line = self.render(severity, message);
        // A closed stdout must not take the supervisor down with it.
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write status line");
        }
    }
}

/// Records status lines in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CaptureReporter {
    pub lines: Vec<(Severity, String)>,
}

#[cfg(test)]
impl CaptureReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, line)| line.contains(needle))
    }

    /// Severities of all lines containing `needle`, in order.
    pub fn severities_of(&self, needle: &str) -> Vec<Severity> {
        self.lines
            .iter()
            .filter(|(_, line)| line.contains(needle))
            .map(|(severity, _)| *severity)
            .collect()
    }
}

#[cfg(test)]
impl Reporter for CaptureReporter {
    fn report(&mut self, severity: Severity, message: &str) {
        self.lines.push((severity, message.to_string()));
    }
}
