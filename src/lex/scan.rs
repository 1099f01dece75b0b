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

use std::ops::Range;

use thiserror::Error as ThisError;

use super::token::{LocatedToken, Punct, Token};

/// Tab stops every 8 columns, matching how the diagnostics count columns.
const TAB_SIZE: usize = 8;

#[derive(ThisError, Clone, Debug, PartialEq, Eq)]
pub enum ScanError {
    /// Unterminated regular expression.
    #[error("unterminated regular expression")]
    UnterminatedRegexp,

    /// Number too large for a repetition bound.
    #[error("number `{0}` is out of range")]
    NumberOutOfRange(String),

    /// Unexpected character.
    #[error("unexpected character {0:?} in input")]
    UnexpectedChar(char),
}

/// A [`ScanError`] located within its definition.
#[derive(Clone, Debug)]
pub struct LocatedScanError {
    pub error: ScanError,
    pub line: usize,
    pub segment: Range<usize>,
}

/// One line of a definition, tabs already expanded.
#[derive(Clone, Debug)]
pub struct SourceLine {
    /// 1-based line number within the patterns file.
    pub number: usize,
    pub text: String,
}

/// One blank-line-delimited definition of a patterns file.
#[derive(Clone, Debug, Default)]
pub struct Definition {
    pub lines: Vec<SourceLine>,
}

impl Definition {
    /// The text of line `number`, for diagnostics.
    pub fn line_text(&self, number: usize) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.number == number)
            .map(|line| line.text.as_str())
    }

    pub fn first_line(&self) -> usize {
        self.lines.first().map_or(0, |line| line.number)
    }
}

fn expand_tabs(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut offset = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = TAB_SIZE - (offset % TAB_SIZE);
            for _ in 0..spaces {
                result.push(' ');
            }
            offset += spaces;
        } else {
            result.push(c);
            offset += 1;
        }
    }
    result
}

/// Splits a patterns file into definitions at blank-line boundaries.
pub fn split_definitions(source: &str) -> Vec<Definition> {
    let mut definitions = Vec::new();
    let mut current = Definition::default();
    for (index, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.lines.is_empty() {
                definitions.push(std::mem::take(&mut current));
            }
        } else {
            current.lines.push(SourceLine {
                number: index + 1,
                text: expand_tabs(line),
            });
        }
    }
    if !current.lines.is_empty() {
        definitions.push(current);
    }
    definitions
}

/// Tokenizes one definition.
///
/// Stops at the first lexical error; the parser reports it and abandons the
/// definition.
pub fn scan_definition(definition: &Definition) -> Result<Vec<LocatedToken>, LocatedScanError> {
    let mut tokens = Vec::new();
    for line in &definition.lines {
        scan_line(line, &mut tokens).map_err(|(error, segment)| LocatedScanError {
            error,
            line: line.number,
            segment,
        })?;
    }
    Ok(tokens)
}

fn scan_line(
    line: &SourceLine,
    tokens: &mut Vec<LocatedToken>,
) -> Result<(), (ScanError, Range<usize>)> {
    let text = line.text.as_str();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        let (token, end) = if c.is_alphabetic() {
            let mut end = start + c.len_utf8();
            while let Some((index, c)) = chars.peek().copied() {
                if c.is_alphanumeric() {
                    chars.next();
                    end = index + c.len_utf8();
                } else {
                    break;
                }
            }
            (Token::Id(text[start..end].into()), end)
        } else if c.is_ascii_digit() {
            let mut end = start + 1;
            while let Some((index, c)) = chars.peek().copied() {
                if c.is_ascii_digit() {
                    chars.next();
                    end = index + 1;
                } else {
                    break;
                }
            }
            let digits = &text[start..end];
            let number = digits
                .parse()
                .map_err(|_| (ScanError::NumberOutOfRange(digits.into()), start..end))?;
            (Token::Number(number), end)
        } else if c == '"' {
            let mut end = None;
            for (index, c) in chars.by_ref() {
                if c == '"' {
                    end = Some(index);
                    break;
                }
            }
            let Some(end) = end else {
                return Err((ScanError::UnterminatedRegexp, start..text.len()));
            };
            (Token::Regexp(text[start + 1..end].into()), end + 1)
        } else {
            let two = chars.peek().map(|(_, c2)| (c, *c2));
            let double = match two {
                Some(('=', '=')) => Some(Punct::DoubleEquals),
                Some(('!', '=')) => Some(Punct::NotEquals),
                Some(('<', '<')) => Some(Punct::DoubleLt),
                Some(('>', '>')) => Some(Punct::DoubleGt),
                Some(('~', '>')) => Some(Punct::TildeGt),
                _ => None,
            };
            if let Some(punct) = double {
                chars.next();
                (Token::Punct(punct), start + 2)
            } else {
                let punct = match c {
                    '=' => Punct::Equals,
                    '.' => Punct::Dot,
                    ',' => Punct::Comma,
                    '(' => Punct::LParen,
                    ')' => Punct::RParen,
                    '{' => Punct::LCurly,
                    '}' => Punct::RCurly,
                    '[' => Punct::LSquare,
                    ']' => Punct::RSquare,
                    '<' => Punct::Lt,
                    '>' => Punct::Gt,
                    '|' => Punct::VBar,
                    '~' => Punct::Tilde,
                    '#' => Punct::Hash,
                    other => {
                        return Err((
                            ScanError::UnexpectedChar(other),
                            start..start + other.len_utf8(),
                        ))
                    }
                };
                (Token::Punct(punct), start + 1)
            }
        };

        tokens.push(LocatedToken {
            token,
            line: line.number,
            segment: start..end,
        });
    }
    Ok(())
}
