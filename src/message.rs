// LSPL - a compiler and matcher for linguistic patterns.
// Copyright (C) 2025 Free Software Foundation, Inc.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <http://www.gnu.org/licenses/>.

//! Diagnostics for pattern compilation.
//!
//! The parser and the semantic builder record [`Diagnostic`]s into an
//! [`ErrorProcessor`] instead of failing fast, so that one bad definition
//! does not hide problems in the definitions after it.  The processor keeps
//! diagnostics grouped by source line and dumps them in line order.

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    io::{Result as IoResult, Write},
    ops::Range,
};

use enum_map::Enum;
use unicode_width::UnicodeWidthStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum)]
pub enum Severity {
    /// The current definition is unusable, but processing continues with the
    /// remaining definitions.
    Error,

    /// Processing cannot continue at all.
    CriticalError,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::CriticalError => "critical error",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A location within the patterns file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number.
    pub line: usize,

    /// Byte range of the offending segment within the line, if known.
    pub segment: Option<Range<usize>>,
}

/// A single diagnostic message.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Option<Location>,

    /// The text of the offending source line, for the excerpt.
    pub source: Option<String>,

    pub text: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            location: None,
            source: None,
            text: text.into(),
        }
    }

    pub fn with_location(mut self, location: Location, source: impl Into<String>) -> Self {
        self.location = Some(location);
        self.source = Some(source.into());
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(location) = &self.location {
            write!(f, "{}: ", location.line)?;
        }
        write!(f, "{}: {}", self.severity, self.text)?;

        if let (Some(location), Some(source)) = (&self.location, &self.source) {
            write!(f, "\n{:5} | {}", location.line, source)?;
            if let Some(segment) = &location.segment {
                let c0 = source.get(..segment.start).map_or(0, |s| s.width());
                let c1 = source
                    .get(..segment.end)
                    .map_or_else(|| source.width(), |s| s.width());
                write!(f, "\n      | ")?;
                for _ in 0..c0 {
                    f.write_str(" ")?;
                }
                f.write_str("^")?;
                for _ in c0 + 1..c1 {
                    f.write_str("~")?;
                }
            }
        }
        Ok(())
    }
}

/// Collects diagnostics for one patterns file.
///
/// `add_error` is pure record; [`has_any_errors`](Self::has_any_errors) and
/// [`has_critical_errors`](Self::has_critical_errors) gate the later
/// pipeline stages.
#[derive(Debug, Default)]
pub struct ErrorProcessor {
    has_critical: bool,
    errors: Vec<Diagnostic>,
}

impl ErrorProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.has_critical = false;
        self.errors.clear();
    }

    pub fn add_error(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::CriticalError {
            self.has_critical = true;
        }
        self.errors.push(diagnostic);
    }

    pub fn has_any_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_critical_errors(&self) -> bool {
        self.has_critical
    }

    /// Writes every collected diagnostic to `out`, ordered by source line
    /// (diagnostics without a location come first, in insertion order).
    pub fn print_errors<W>(&self, out: &mut W, filename: &str) -> IoResult<()>
    where
        W: Write,
    {
        let mut ordered: Vec<&Diagnostic> = self.errors.iter().collect();
        ordered.sort_by_key(|d| d.location.as_ref().map_or(0, |l| l.line));
        for diagnostic in ordered {
            writeln!(out, "{filename}:{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, ErrorProcessor, Location, Severity};

    #[test]
    fn diagnostic_rendering() {
        let d = Diagnostic::new(Severity::Error, "closing brace `}` expected").with_location(
            Location {
                line: 3,
                segment: Some(5..7),
            },
            "NP = { A N",
        );
        assert_eq!(
            d.to_string(),
            "3: error: closing brace `}` expected\n    3 | NP = { A N\n      |      ^~"
        );
    }

    #[test]
    fn errors_ordered_by_line() {
        let mut processor = ErrorProcessor::new();
        processor.add_error(
            Diagnostic::new(Severity::Error, "second").with_location(
                Location {
                    line: 7,
                    segment: None,
                },
                "x",
            ),
        );
        processor.add_error(
            Diagnostic::new(Severity::Error, "first").with_location(
                Location {
                    line: 2,
                    segment: None,
                },
                "y",
            ),
        );
        assert!(processor.has_any_errors());
        assert!(!processor.has_critical_errors());

        let mut out = Vec::new();
        processor.print_errors(&mut out, "patterns.lspl").unwrap();
        let text = String::from_utf8(out).unwrap();
        let first = text.find("first").unwrap();
        let second = text.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn critical_errors_are_flagged() {
        let mut processor = ErrorProcessor::new();
        assert!(!processor.has_any_errors());
        processor.add_error(Diagnostic::new(Severity::CriticalError, "cannot read file"));
        assert!(processor.has_critical_errors());
        processor.reset();
        assert!(!processor.has_any_errors());
        assert!(!processor.has_critical_errors());
    }
}
