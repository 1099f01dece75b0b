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

//! Morphologically annotated text.
//!
//! Every [`Word`] carries one or more [`Annotation`]s.  An annotation is a
//! fixed-width string over a small alphabet, one code unit per word sign, so
//! that the matcher can test attribute restrictions with a single regular
//! expression match and compare agreement windows as plain slices.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fs,
    ops::Range,
    path::Path,
};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error as ThisError;

use crate::{
    config::{SignIndex, SignType, ValueId, MAIN_SIGN},
    ordered::OrderedList,
    pattern::Patterns,
};

/// One code unit of the attribute encoding.
pub type AttributeValue = ValueId;

/// Matches any *present* value of a sign.
pub const ANY_ATTRIBUTE_VALUE: AttributeValue = 128;

/// Marks the start of the agreement window when a restriction is projected
/// onto the encoding.
pub const BEGIN_ATTRIBUTE_VALUE: AttributeValue = 129;

/// The value of a sign the annotation does not bind.
pub const NULL_ATTRIBUTE_VALUE: AttributeValue = 130;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgreementPower {
    None,
    Weak,
    Strong,
}

/// One morphological reading of a word.
#[derive(Clone, Debug)]
pub struct Annotation {
    values: Vec<AttributeValue>,
    encoded: String,
}

impl Annotation {
    pub fn new(values: Vec<AttributeValue>) -> Self {
        let encoded = values
            .iter()
            .map(|&value| char::from_u32(u32::from(value)).unwrap_or('\u{fffd}'))
            .collect();
        Self { values, encoded }
    }

    pub fn value(&self, sign: SignIndex) -> AttributeValue {
        self.values[sign]
    }

    /// The fixed-width encoding the attribute regexes run over.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn matches(&self, attributes_regex: &Regex) -> bool {
        attributes_regex.is_match(&self.encoded)
    }

    /// How well two annotations agree.
    ///
    /// Agreement on the main sign spans the whole agreement `window`;
    /// agreement on any other sign compares that one position.  Positions
    /// where either side is unbound degrade the power to weak; a bound,
    /// unequal, non-wildcard position defeats agreement.
    pub fn agreement(
        &self,
        other: &Self,
        window: Range<usize>,
        sign: SignIndex,
    ) -> AgreementPower {
        let positions = if sign == MAIN_SIGN {
            window
        } else {
            sign..sign + 1
        };
        let mut strong = true;
        for position in positions {
            let a = self.values[position];
            let b = other.values[position];
            if a == NULL_ATTRIBUTE_VALUE || b == NULL_ATTRIBUTE_VALUE {
                strong = false;
            } else if a != b && a != ANY_ATTRIBUTE_VALUE && b != ANY_ATTRIBUTE_VALUE {
                return AgreementPower::None;
            }
        }
        if strong {
            AgreementPower::Strong
        } else {
            AgreementPower::Weak
        }
    }
}

/// Indices into a word's annotation list.
pub type AnnotationIndices = OrderedList<usize>;

/// Annotation-index sets for the two words of an agreement pair.
pub type Agreement = (AnnotationIndices, AnnotationIndices);

/// A word of the input text with all its readings.
#[derive(Clone, Debug)]
pub struct Word {
    pub text: String,
    pub annotations: Vec<Annotation>,
}

impl Word {
    pub fn annotation_indices(&self) -> AnnotationIndices {
        (0..self.annotations.len()).collect()
    }

    pub fn match_word(&self, word_regex: &Regex) -> bool {
        word_regex.is_match(&self.text)
    }

    /// The readings whose attribute encoding satisfies `attributes_regex`.
    pub fn match_attributes(&self, attributes_regex: &Regex) -> AnnotationIndices {
        self.annotations
            .iter()
            .enumerate()
            .filter(|(_, annotation)| annotation.matches(attributes_regex))
            .map(|(index, _)| index)
            .collect()
    }
}

type AgreementKey = ((usize, usize), SignIndex);

/// The annotated text plus a cache of pairwise agreements.
#[derive(Debug)]
pub struct Text {
    words: Vec<Word>,
    window: Range<usize>,
    cache: RefCell<HashMap<AgreementKey, (Agreement, Agreement)>>,
}

impl Text {
    pub fn new(words: Vec<Word>, window: Range<usize>) -> Self {
        Self {
            words,
            window,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, index: usize) -> &Word {
        &self.words[index]
    }

    /// The annotation-index sets of the two keyed words that agree on the
    /// keyed sign, at the requested strength.
    pub fn agreement(&self, key: AgreementKey, strong: bool) -> Agreement {
        if let Some((weak, strict)) = self.cache.borrow().get(&key) {
            return if strong { strict.clone() } else { weak.clone() };
        }
        let computed = self.compute_agreement(key);
        let result = if strong {
            computed.1.clone()
        } else {
            computed.0.clone()
        };
        self.cache.borrow_mut().insert(key, computed);
        result
    }

    fn compute_agreement(&self, ((first, second), sign): AgreementKey) -> (Agreement, Agreement) {
        let mut weak: Agreement = Default::default();
        let mut strict: Agreement = Default::default();
        for (i, a) in self.words[first].annotations.iter().enumerate() {
            for (j, b) in self.words[second].annotations.iter().enumerate() {
                match a.agreement(b, self.window.clone(), sign) {
                    AgreementPower::None => (),
                    AgreementPower::Weak => {
                        weak.0.add(i);
                        weak.1.add(j);
                    }
                    AgreementPower::Strong => {
                        weak.0.add(i);
                        weak.1.add(j);
                        strict.0.add(i);
                        strict.1.add(j);
                    }
                }
            }
        }
        (weak, strict)
    }
}

#[derive(Debug, ThisError)]
pub enum TextError {
    #[error("cannot read text: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed text: {0}")]
    Json(#[from] serde_json::Error),

    #[error("word #{0} has an empty surface string")]
    EmptyWord(usize),

    #[error("word #{0} has no annotations")]
    NoAnnotations(usize),

    #[error("word #{word} annotation #{annotation} does not bind the main sign")]
    MissingMainAttribute { word: usize, annotation: usize },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawText {
    text: Vec<RawWord>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWord {
    word: String,
    annotations: Vec<BTreeMap<String, String>>,
}

/// Loads a text file against the schema and string pool of `patterns`.
pub fn load_from_file<P>(patterns: &Patterns, path: P) -> Result<Text, TextError>
where
    P: AsRef<Path>,
{
    from_json(patterns, &fs::read_to_string(path)?)
}

pub fn from_json(patterns: &Patterns, json: &str) -> Result<Text, TextError> {
    let raw: RawText = serde_json::from_str(json)?;
    let signs = patterns.configuration().word_signs();

    let mut words = Vec::with_capacity(raw.text.len());
    for (word_index, raw_word) in raw.text.into_iter().enumerate() {
        if raw_word.word.is_empty() {
            return Err(TextError::EmptyWord(word_index));
        }
        if raw_word.annotations.is_empty() {
            return Err(TextError::NoAnnotations(word_index));
        }

        let mut annotations = Vec::with_capacity(raw_word.annotations.len());
        for (annotation_index, attributes) in raw_word.annotations.into_iter().enumerate() {
            let mut values = vec![NULL_ATTRIBUTE_VALUE; signs.len()];
            for (name, value) in &attributes {
                // Attribute names outside the schema are ignored.
                let Some(sign_index) = signs.find(name) else {
                    continue;
                };
                let sign = &signs[sign_index];
                // A value outside the domain maps to the id one past it, so
                // it still counts as present but equals nothing known.
                values[sign_index] = match sign.sign_type {
                    SignType::String => patterns
                        .string_index(value)
                        .unwrap_or(patterns.strings_len() as ValueId),
                    _ => sign
                        .values
                        .find(value)
                        .map_or(sign.values.len() as ValueId, |id| id as ValueId),
                };
            }
            if values[MAIN_SIGN] == NULL_ATTRIBUTE_VALUE {
                return Err(TextError::MissingMainAttribute {
                    word: word_index,
                    annotation: annotation_index,
                });
            }
            annotations.push(Annotation::new(values));
        }

        words.push(Word {
            text: raw_word.word,
            annotations,
        });
    }

    Ok(Text::new(words, signs.agreement_window()))
}
