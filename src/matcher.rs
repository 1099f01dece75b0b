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

//! The matching automaton.
//!
//! [`AutomatonBuilder`] folds every expanded variant of every pattern into
//! one tree-structured state table: transitions match the next text word by
//! surface regexp or by attribute-encoding regexp, and states carry the
//! actions lowered from pattern conditions.  [`MatchContext`] walks the
//! table depth-first from every start position, narrowing per-word
//! annotation-index sets through an undo log, and records a match range for
//! every reached report action.

use std::mem;

use regex::Regex;
use smallvec::SmallVec;
use thiserror::Error as ThisError;

use crate::{
    pattern::{Patterns, ReferenceId, Variants},
    text::{AnnotationIndices, Text, Word},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConditionKind {
    Agreement,
    Dictionary,
}

/// A condition lowered onto a concrete word of a variant.
///
/// `offsets` are distances measured backwards from the word the condition
/// is attached to; [`WordCondition::OFFSET_MAX`] separates the positional
/// groups of a dictionary call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordCondition {
    pub kind: ConditionKind,
    pub strong: bool,

    /// The sign to agree on, or the interned dictionary name id.
    pub param: usize,

    pub offsets: SmallVec<[u8; 4]>,
}

impl WordCondition {
    /// Group separator sentinel; real offsets stay below it.
    pub const OFFSET_MAX: u8 = u8::MAX;
}

/// What a state does when the automaton reaches it.  Actions fail fast: the
/// first failing action abandons the match attempt at this state.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Agreement(WordCondition),
    Dictionary(WordCondition),

    /// The walk consumed a complete variant of this pattern.
    Report(ReferenceId),
}

/// An arc of the state table.
#[derive(Debug)]
pub struct Transition {
    /// True to match the word's surface string, false to match its
    /// attribute encoding.
    word_match: bool,

    /// The regex source, which identifies the transition for state sharing.
    source: String,

    regex: Regex,
    next: usize,
}

impl Transition {
    pub fn next(&self) -> usize {
        self.next
    }

    /// The annotation indices this transition admits for `word`, or `None`
    /// when the word does not match at all.
    pub fn matches(&self, word: &Word) -> Option<AnnotationIndices> {
        if self.word_match {
            word.match_word(&self.regex)
                .then(|| word.annotation_indices())
        } else {
            let indices = word.match_attributes(&self.regex);
            (!indices.is_empty()).then_some(indices)
        }
    }
}

#[derive(Debug, Default)]
pub struct State {
    pub actions: Vec<Action>,
    pub transitions: Vec<Transition>,
}

/// The immutable state table; state 0 is the start state.
#[derive(Debug)]
pub struct States(Vec<State>);

impl States {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn state(&self, index: usize) -> &State {
        &self.0[index]
    }
}

#[derive(Debug, ThisError)]
pub enum BuildError {
    #[error("invalid regular expression: {0}")]
    Regexp(#[from] regex::Error),
}

/// Builds the state table from pattern variants.
pub struct AutomatonBuilder<'a> {
    patterns: &'a Patterns,
    states: Vec<State>,
}

impl<'a> AutomatonBuilder<'a> {
    pub fn new(patterns: &'a Patterns) -> Self {
        Self {
            patterns,
            states: vec![State::default()],
        }
    }

    /// Adds every variant of one pattern, sharing transition prefixes with
    /// the variants already added.
    pub fn add_pattern(
        &mut self,
        reference: ReferenceId,
        variants: &Variants,
    ) -> Result<(), BuildError> {
        for variant in variants.iter() {
            if variant.is_empty() {
                continue;
            }
            let mut current = 0;
            for word in &variant.words {
                let (word_match, source) = match &word.regexp {
                    Some(regexp) => (true, format!("^(?:{regexp})$")),
                    None => (
                        false,
                        word.sign_restrictions
                            .build(self.patterns.configuration()),
                    ),
                };
                current = self.transition(current, word_match, source)?;
                for condition in &word.conditions {
                    let action = match condition.kind {
                        ConditionKind::Agreement => Action::Agreement(condition.clone()),
                        ConditionKind::Dictionary => Action::Dictionary(condition.clone()),
                    };
                    self.add_action(current, action);
                }
            }
            self.add_action(current, Action::Report(reference));
        }
        Ok(())
    }

    pub fn finish(self) -> States {
        States(self.states)
    }

    fn add_action(&mut self, state: usize, action: Action) {
        let actions = &mut self.states[state].actions;
        if !actions.contains(&action) {
            actions.push(action);
        }
    }

    fn transition(
        &mut self,
        from: usize,
        word_match: bool,
        source: String,
    ) -> Result<usize, BuildError> {
        if let Some(transition) = self.states[from]
            .transitions
            .iter()
            .find(|t| t.word_match == word_match && t.source == source)
        {
            return Ok(transition.next);
        }
        let regex = Regex::new(&source)?;
        let next = self.states.len();
        self.states.push(State::default());
        self.states[from].transitions.push(Transition {
            word_match,
            source,
            regex,
            next,
        });
        Ok(next)
    }
}

/// One reported occurrence; `begin..=end` are word indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MatchRange {
    pub pattern: ReferenceId,
    pub begin: usize,
    pub end: usize,
}

/// One dictionary call emitted during matching; resolution is out of scope,
/// so the call is recorded and the action succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictionaryCall {
    pub dictionary: usize,
    pub groups: Vec<String>,
}

/// A depth-first walk of the state table over one text.
///
/// Per consumed word the context tracks the set of annotation indices still
/// admissible; agreement actions narrow those sets through an undo log that
/// rolls the narrowing back when the walk leaves the state that applied it.
pub struct MatchContext<'a> {
    text: &'a Text,
    states: &'a States,
    initial_word: usize,
    data: Vec<AnnotationIndices>,
    log: Vec<(usize, AnnotationIndices)>,
    matches: Vec<MatchRange>,
    dictionary_calls: Vec<DictionaryCall>,
}

impl<'a> MatchContext<'a> {
    pub fn new(text: &'a Text, states: &'a States) -> Self {
        Self {
            text,
            states,
            initial_word: 0,
            data: Vec::with_capacity(32),
            log: Vec::new(),
            matches: Vec::new(),
            dictionary_calls: Vec::new(),
        }
    }

    pub fn matches(&self) -> &[MatchRange] {
        &self.matches
    }

    pub fn dictionary_calls(&self) -> &[DictionaryCall] {
        &self.dictionary_calls
    }

    pub fn into_matches(self) -> Vec<MatchRange> {
        self.matches
    }

    /// Tries every start position in order.
    pub fn match_all(&mut self) {
        for word_index in 0..self.text.len() {
            self.match_from(word_index);
        }
    }

    /// Reports every pattern occurrence starting at `initial_word`.
    pub fn match_from(&mut self, initial_word: usize) {
        self.initial_word = initial_word;
        self.match_state(0, initial_word);
        debug_assert!(self.data.is_empty());
        debug_assert!(self.log.is_empty());
    }

    fn match_state(&mut self, state_index: usize, next_word: usize) {
        let states = self.states;
        let state = states.state(state_index);

        let mark = self.log.len();
        if self.run_actions(state) && next_word < self.text.len() {
            for transition in &state.transitions {
                if let Some(indices) = transition.matches(self.text.word(next_word)) {
                    self.data.push(indices);
                    self.match_state(transition.next, next_word + 1);
                    self.data.pop();
                }
            }
        }
        self.rollback(mark);
    }

    fn run_actions(&mut self, state: &State) -> bool {
        for action in &state.actions {
            let ok = match action {
                Action::Agreement(condition) => self.run_agreement(condition),
                Action::Dictionary(condition) => self.run_dictionary(condition),
                Action::Report(pattern) => self.run_report(*pattern),
            };
            if !ok {
                return false;
            }
        }
        true
    }

    fn run_agreement(&mut self, condition: &WordCondition) -> bool {
        let Some(index2) = self.data.len().checked_sub(1) else {
            return true;
        };
        let word2 = self.initial_word + index2;
        for &offset in &condition.offsets {
            let offset = usize::from(offset);
            if offset == 0 {
                continue;
            }
            if offset > index2 {
                return false;
            }
            let index1 = index2 - offset;
            let (first, second) = self
                .text
                .agreement(((word2 - offset, word2), condition.param), condition.strong);
            let first = AnnotationIndices::intersection(&first, &self.data[index1]);
            let second = AnnotationIndices::intersection(&second, &self.data[index2]);
            if first.is_empty() || second.is_empty() {
                return false;
            }
            self.set(index1, first);
            self.set(index2, second);
        }
        true
    }

    fn run_dictionary(&mut self, condition: &WordCondition) -> bool {
        let Some(index2) = self.data.len().checked_sub(1) else {
            return true;
        };
        let word2 = self.initial_word + index2;
        let mut groups = vec![String::new()];
        for &offset in &condition.offsets {
            if offset == WordCondition::OFFSET_MAX {
                groups.push(String::new());
                continue;
            }
            let offset = usize::from(offset);
            if offset > index2 {
                return false;
            }
            let group = groups.last_mut().unwrap();
            if !group.is_empty() {
                group.push(' ');
            }
            group.push_str(&self.text.word(word2 - offset).text);
        }
        self.dictionary_calls.push(DictionaryCall {
            dictionary: condition.param,
            groups,
        });
        true
    }

    fn run_report(&mut self, pattern: ReferenceId) -> bool {
        if !self.data.is_empty() {
            self.matches.push(MatchRange {
                pattern,
                begin: self.initial_word,
                end: self.initial_word + self.data.len() - 1,
            });
        }
        true
    }

    /// The undo log: every narrowing is recorded and undone when the walk
    /// leaves the state that applied it.
    fn set(&mut self, index: usize, value: AnnotationIndices) {
        let previous = mem::replace(&mut self.data[index], value);
        self.log.push((index, previous));
    }

    fn rollback(&mut self, mark: usize) {
        while self.log.len() > mark {
            let (index, value) = self.log.pop().unwrap();
            self.data[index] = value;
        }
    }
}
