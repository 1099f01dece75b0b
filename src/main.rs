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

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use lspl::{
    config::Configuration,
    matcher::{AutomatonBuilder, MatchContext},
    message::ErrorProcessor,
    parser::PatternsBuilder,
    pattern::BuildContext,
    text,
};

/// The expansion budget the tool compiles every pattern with.
const PATTERN_SIZE: usize = 12;

/// LSPL, a compiler and matcher for linguistic patterns.
///
/// Compiles the patterns against the attribute schema in CONFIGURATION,
/// matches them over the annotated TEXT, and writes every occurrence to
/// RESULT.  Diagnostics go to standard error.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with the attribute schema.
    configuration: PathBuf,

    /// Patterns file.
    patterns: PathBuf,

    /// JSON file with the annotated text.
    text: PathBuf,

    /// Output file for the matches.
    result: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let configuration = Arc::new(
        Configuration::load_from_file(&cli.configuration)
            .with_context(|| cli.configuration.display().to_string())?,
    );

    let source = fs::read_to_string(&cli.patterns)
        .with_context(|| cli.patterns.display().to_string())?;
    let mut errors = ErrorProcessor::new();
    let mut builder = PatternsBuilder::new(configuration, &mut errors);
    builder.read_source(&source);
    let patterns = builder.finish();
    if errors.has_any_errors() {
        errors.print_errors(
            &mut io::stderr().lock(),
            &cli.patterns.display().to_string(),
        )?;
        return Err(anyhow!("patterns did not compile"));
    }

    let text =
        text::load_from_file(&patterns, &cli.text).with_context(|| cli.text.display().to_string())?;

    let mut automaton = AutomatonBuilder::new(&patterns);
    for pattern in patterns.iter() {
        let mut context = BuildContext::new(&patterns);
        let variants = pattern.build(&mut context, PATTERN_SIZE);
        automaton.add_pattern(pattern.reference(), &variants)?;
    }
    let states = automaton.finish();

    let mut context = MatchContext::new(&text, &states);
    context.match_all();

    let mut out = BufWriter::new(
        File::create(&cli.result).with_context(|| cli.result.display().to_string())?,
    );
    for found in context.matches() {
        let name = patterns
            .resolve_reference(found.pattern)
            .map(|pattern| pattern.name().to_owned())
            .unwrap_or_default();
        write!(out, "{name} {{")?;
        for index in found.begin..=found.end {
            if index > found.begin {
                write!(out, " ")?;
            }
            write!(out, "{}", text.word(index).text)?;
        }
        writeln!(out, "}}")?;
    }
    out.flush()?;
    Ok(())
}
