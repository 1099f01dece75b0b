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

//! # LSPL in Rust
//!
//! LSPL is a pattern language for searching in morphologically annotated
//! text.  Authors declare named patterns over word classes and their
//! attributes; the compiler expands each pattern into a finite set of linear
//! word variants under a size budget, lowers agreement and dictionary
//! conditions onto concrete word positions, and assembles all variants into
//! a single matching automaton.  The matcher walks an annotated text and
//! reports every occurrence of every pattern.
//!
//! The pipeline, leaves first:
//!
//! - [`config`] loads the attribute schema that classifies every word sign
//!   as the main sign, an enumeration, or an open string set.
//! - [`lex`] splits a patterns file into definitions and tokenizes them.
//! - [`parser`] parses each definition and resolves names against the
//!   schema, producing [`pattern::Pattern`]s.
//! - [`pattern`] expands patterns into variants and lowers conditions.
//! - [`text`] loads the annotated input text.
//! - [`matcher`] builds the state table from the variants and runs it.
//!
//! The `lspl` binary ties the stages together:
//!
//! ```text
//! lspl CONFIGURATION PATTERNS TEXT RESULT
//! ```

pub mod config;
pub mod lex;
pub mod matcher;
pub mod message;
pub mod ordered;
pub mod parser;
pub mod pattern;
pub mod text;
