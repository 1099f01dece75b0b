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

//! Lexical analysis of patterns files.
//!
//! A patterns file is free-form text holding `name = body` definitions
//! separated by blank lines.  [`split_definitions`] cuts the file into
//! [`Definition`]s, and [`scan_definition`] turns one definition into the
//! located token stream the parser consumes.

mod scan;
mod token;

pub use scan::{scan_definition, split_definitions, Definition, LocatedScanError, ScanError};
pub use token::{LocatedToken, Punct, Token};
