//! Plain-text report lines, one per measurement.

use core::fmt;
use std::time::Duration;

use crate::timing::Speedup;

#[derive(Clone, Debug, PartialEq)]
pub enum ReportLine {
    /// Free-form context such as problem size or thread count.
    Note(String),
    /// `<label>: <seconds> s`
    Elapsed { label: String, elapsed: Duration },
    /// `<label>: <value>`
    Value { label: String, value: f64 },
    /// `<label> diff: <value>`
    Difference { label: String, diff: f64 },
    /// `<label> speedup: <value>`
    Speedup { label: String, speedup: Speedup },
    /// `<label>: failed: <reason>`
    Failure { label: String, reason: String },
}

impl ReportLine {
    pub fn is_failure(&self) -> bool {
        matches!(self, ReportLine::Failure { .. })
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportLine::Note(text) => f.write_str(text),
            ReportLine::Elapsed { label, elapsed } => {
                write!(f, "{label}: {:.6} s", elapsed.as_secs_f64())
            }
            ReportLine::Value { label, value } => write!(f, "{label}: {value:.12}"),
            ReportLine::Difference { label, diff } => write!(f, "{label} diff: {diff:.6e}"),
            ReportLine::Speedup { label, speedup } => write!(f, "{label} speedup: {speedup}"),
            ReportLine::Failure { label, reason } => write!(f, "{label}: failed: {reason}"),
        }
    }
}

/// Ordered report lines of one benchmark.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    lines: Vec<ReportLine>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, text: impl Into<String>) {
        self.lines.push(ReportLine::Note(text.into()));
    }

    pub fn elapsed(&mut self, label: impl Into<String>, elapsed: Duration) {
        self.lines.push(ReportLine::Elapsed {
            label: label.into(),
            elapsed,
        });
    }

    pub fn value(&mut self, label: impl Into<String>, value: f64) {
        self.lines.push(ReportLine::Value {
            label: label.into(),
            value,
        });
    }

    pub fn difference(&mut self, label: impl Into<String>, diff: f64) {
        self.lines.push(ReportLine::Difference {
            label: label.into(),
            diff,
        });
    }

    pub fn speedup(&mut self, label: impl Into<String>, speedup: Speedup) {
        self.lines.push(ReportLine::Speedup {
            label: label.into(),
            speedup,
        });
    }

    pub fn failure(&mut self, label: impl Into<String>, reason: impl fmt::Display) {
        self.lines.push(ReportLine::Failure {
            label: label.into(),
            reason: reason.to_string(),
        });
    }

    pub fn lines(&self) -> &[ReportLine] {
        &self.lines
    }

    pub fn failures(&self) -> usize {
        self.lines.iter().filter(|l| l.is_failure()).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_formats() {
        let mut r = Report::new();
        r.elapsed("sequential add", Duration::from_millis(1500));
        r.speedup("add", Speedup::Ratio(2.5));
        r.speedup("sub", Speedup::Unavailable);
        r.failure("mul", "invalid argument: dimension mismatch");
        let text = r.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sequential add: 1.500000 s");
        assert_eq!(lines[1], "add speedup: 2.500000");
        assert_eq!(lines[2], "sub speedup: no timing available");
        assert_eq!(lines[3], "mul: failed: invalid argument: dimension mismatch");
        assert_eq!(r.failures(), 1);
    }
}
