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

//! The attribute schema.
//!
//! A configuration is a frozen, ordered catalogue of *word signs*: named
//! attributes that annotations of text words may carry.  The sign at index 0
//! is the *main* sign; every annotation must bind it, and pattern elements
//! are named after its values.  The catalogue orders the remaining signs so
//! that all agreement-participating signs form a suffix, which lets the
//! matcher compare agreement windows as plain slices.

use std::{collections::HashMap, fs::File, io::BufReader, ops::Range, path::Path};

use serde::Deserialize;
use thiserror::Error as ThisError;

use crate::ordered::OrderedList;

/// Index of a sign within [`WordSigns`].
pub type SignIndex = usize;

/// Index of a value within a sign's value domain.
pub type ValueId = u16;

/// Index of the main sign.
pub const MAIN_SIGN: SignIndex = 0;

/// The largest admissible value domain.
///
/// Value ids must stay below the sentinel range of the attribute encoding
/// (see [`crate::text`]), and one id above the domain is reserved for values
/// that appear in a text but not in the schema.
pub const MAX_SIGN_VALUES: usize = 127;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignType {
    /// Exactly one per configuration; every annotation must carry a value.
    Main,

    /// A finite value set.
    Enum,

    /// An open value set, interned on use.
    String,
}

/// One named attribute in the schema.
#[derive(Clone, Debug)]
pub struct WordSign {
    pub sign_type: SignType,

    /// Aliases, all unique across the whole schema.  The first alias in
    /// sorted order is the display name.
    pub names: OrderedList<String>,

    /// Canonical values; empty for [`SignType::String`].  A value's id is
    /// its position in sorted order.
    pub values: OrderedList<String>,

    /// True if this sign participates in agreement.
    pub consistent: bool,
}

impl WordSign {
    pub fn name(&self) -> &str {
        self.names.value(0)
    }
}

/// The frozen, ordered sign catalogue.
#[derive(Debug)]
pub struct WordSigns {
    signs: Vec<WordSign>,
    name_index: HashMap<String, SignIndex>,
    agreement_begin: usize,
}

impl WordSigns {
    pub fn is_empty(&self) -> bool {
        self.signs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.signs.len()
    }

    pub fn main_sign(&self) -> &WordSign {
        &self.signs[MAIN_SIGN]
    }

    /// Looks a sign up by any of its aliases.
    pub fn find(&self, name: &str) -> Option<SignIndex> {
        self.name_index.get(name).copied()
    }

    /// The suffix of sign positions that participate in agreement.
    pub fn agreement_window(&self) -> Range<usize> {
        self.agreement_begin..self.signs.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WordSign> {
        self.signs.iter()
    }
}

impl std::ops::Index<SignIndex> for WordSigns {
    type Output = WordSign;

    fn index(&self, index: SignIndex) -> &Self::Output {
        &self.signs[index]
    }
}

/// Validates and orders word signs into a [`WordSigns`] catalogue.
///
/// Signs are reordered as: the main sign, then signs outside agreement, then
/// agreement-participating signs, preserving relative order within each
/// bucket.
#[derive(Default)]
pub struct WordSignsBuilder {
    main_signs: Vec<WordSign>,
    consistent_signs: Vec<WordSign>,
    not_consistent_signs: Vec<WordSign>,
}

impl WordSignsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word_sign: WordSign) {
        match word_sign.sign_type {
            SignType::Main => self.main_signs.push(word_sign),
            _ if word_sign.consistent => self.consistent_signs.push(word_sign),
            _ => self.not_consistent_signs.push(word_sign),
        }
    }

    pub fn build(self) -> Result<WordSigns, ConfigError> {
        match self.main_signs.len() {
            0 => return Err(ConfigError::NoMainSign),
            1 => (),
            _ => return Err(ConfigError::MultipleMainSigns),
        }

        let agreement_begin = 1 + self.not_consistent_signs.len();
        let signs: Vec<WordSign> = self
            .main_signs
            .into_iter()
            .chain(self.not_consistent_signs)
            .chain(self.consistent_signs)
            .collect();

        let mut name_index = HashMap::new();
        for (index, sign) in signs.iter().enumerate() {
            if sign.names.is_empty() {
                return Err(ConfigError::UnnamedSign);
            }
            match sign.sign_type {
                SignType::String => {
                    if !sign.values.is_empty() {
                        return Err(ConfigError::ValuesOnStringSign(sign.name().into()));
                    }
                }
                SignType::Main | SignType::Enum => {
                    if sign.values.is_empty() {
                        return Err(ConfigError::NoValues(sign.name().into()));
                    }
                    if sign.values.len() > MAX_SIGN_VALUES {
                        return Err(ConfigError::TooManyValues(sign.name().into()));
                    }
                }
            }
            for name in &sign.names {
                if name_index.insert(name.clone(), index).is_some() {
                    return Err(ConfigError::DuplicateSignName(name.clone()));
                }
            }
        }

        Ok(WordSigns {
            signs,
            name_index,
            agreement_begin,
        })
    }
}

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration defines no main sign")]
    NoMainSign,

    #[error("configuration defines more than one main sign")]
    MultipleMainSigns,

    #[error("sign without names")]
    UnnamedSign,

    #[error("sign name \"{0}\" is used by more than one sign")]
    DuplicateSignName(String),

    #[error("sign \"{0}\" lists the same value twice")]
    DuplicateValue(String),

    #[error("sign \"{0}\" needs at least one value")]
    NoValues(String),

    #[error("sign \"{0}\" has more than {MAX_SIGN_VALUES} values")]
    TooManyValues(String),

    #[error("string sign \"{0}\" must not list values")]
    ValuesOnStringSign(String),
}

/// The JSON schema the configuration file must conform to.
///
/// Exposed so that tests (and external tooling) can validate configurations
/// without loading them.
pub const JSON_CONFIGURATION_SCHEMA: &str = r##"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "title": "LSPL configuration",
    "type": "object",
    "required": ["signs"],
    "additionalProperties": false,
    "properties": {
        "signs": {
            "type": "array",
            "minItems": 1,
            "items": {
                "type": "object",
                "required": ["type", "names", "consistent"],
                "additionalProperties": false,
                "properties": {
                    "type": { "enum": ["main", "enum", "string"] },
                    "names": {
                        "type": "array",
                        "minItems": 1,
                        "items": { "type": "string", "minLength": 1 }
                    },
                    "values": {
                        "type": "array",
                        "items": { "type": "string", "minLength": 1 }
                    },
                    "consistent": { "type": "boolean" }
                }
            }
        }
    }
}"##;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfiguration {
    signs: Vec<RawSign>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSign {
    #[serde(rename = "type")]
    sign_type: RawSignType,
    names: Vec<String>,
    #[serde(default)]
    values: Vec<String>,
    consistent: bool,
}

#[derive(Copy, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawSignType {
    Main,
    Enum,
    String,
}

impl TryFrom<RawSign> for WordSign {
    type Error = ConfigError;

    fn try_from(raw: RawSign) -> Result<Self, Self::Error> {
        let mut names = OrderedList::new();
        for name in raw.names {
            if !names.add(name.clone()) {
                return Err(ConfigError::DuplicateSignName(name));
            }
        }
        let display = names
            .iter()
            .next()
            .cloned()
            .ok_or(ConfigError::UnnamedSign)?;
        let mut values = OrderedList::new();
        for value in raw.values {
            if !values.add(value) {
                return Err(ConfigError::DuplicateValue(display.clone()));
            }
        }
        Ok(WordSign {
            sign_type: match raw.sign_type {
                RawSignType::Main => SignType::Main,
                RawSignType::Enum => SignType::Enum,
                RawSignType::String => SignType::String,
            },
            names,
            values,
            consistent: raw.consistent,
        })
    }
}

/// The loaded attribute schema.
#[derive(Debug)]
pub struct Configuration {
    word_signs: WordSigns,
}

impl Configuration {
    pub fn word_signs(&self) -> &WordSigns {
        &self.word_signs
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfiguration = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    pub fn load_from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let reader = BufReader::new(File::open(path)?);
        let raw: RawConfiguration = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfiguration) -> Result<Self, ConfigError> {
        let mut builder = WordSignsBuilder::new();
        for sign in raw.signs {
            builder.add(sign.try_into()?);
        }
        Ok(Self {
            word_signs: builder.build()?,
        })
    }
}
