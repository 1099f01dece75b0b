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

//! Patterns and their expansion into word variants.
//!
//! A [`Pattern`] owns an abstract syntax tree of [`PatternNode`]s.  Given a
//! size budget, [`Pattern::build`] expands the tree into a deduplicated,
//! canonically ordered list of linear [`Variant`]s, each a sequence of
//! [`PatternWord`]s ready for the automaton builder in [`crate::matcher`].
//! Expansion tracks per-pattern-name budgets through [`BuildContext`] so
//! that self-referential patterns always terminate.

use std::{cmp::min, collections::HashMap, fmt::Write as _, sync::Arc};

use indexmap::IndexMap;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::{
    config::{Configuration, SignIndex, SignType, ValueId, MAIN_SIGN, MAX_SIGN_VALUES},
    matcher::{ConditionKind, WordCondition},
    ordered::OrderedList,
    parser::IndexedName,
    text::{ANY_ATTRIBUTE_VALUE, NULL_ATTRIBUTE_VALUE},
};

/// A word-class binding, packed as `index * main_values_count + value_id`.
pub type ElementId = usize;

/// A pattern binding, packed as `index * patterns_count + pattern_position`.
pub type ReferenceId = usize;

/// The longest admissible variant.  Word distances inside a variant must fit
/// the `u8` offsets of [`WordCondition`], whose maximum is the group
/// separator sentinel.
pub const MAX_VARIANT_SIZE: usize = (WordCondition::OFFSET_MAX - 1) as usize;

/// The most sequence parts `~` may reorder.
pub const MAX_TRANSPOSITION_SIZE: usize = 8;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    #[default]
    None,

    /// `A7`: a word class.
    Element,

    /// `N7.c`: a sign of a word class.
    ElementSign,

    /// `Sub.Pa`: an argument of a referenced pattern.
    ReferenceElement,

    /// `Sub.c`: a sign of a referenced pattern's head argument.
    ReferenceElementSign,
}

/// A resolved name a pattern may bind or a condition may constrain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PatternArgument {
    pub kind: ArgumentKind,
    pub element: ElementId,
    pub reference: ReferenceId,
    pub sign: SignIndex,
}

impl PatternArgument {
    pub fn element(element: ElementId) -> Self {
        Self {
            kind: ArgumentKind::Element,
            element,
            ..Self::default()
        }
    }

    pub fn defined(&self) -> bool {
        self.kind != ArgumentKind::None
    }

    pub fn has_sign(&self) -> bool {
        matches!(
            self.kind,
            ArgumentKind::ElementSign | ArgumentKind::ReferenceElementSign
        )
    }

    pub fn has_reference(&self) -> bool {
        matches!(
            self.kind,
            ArgumentKind::ReferenceElement | ArgumentKind::ReferenceElementSign
        )
    }

    /// The same argument with the sign slot zeroed, the key used to bind
    /// condition arguments to variant words.
    pub fn without_sign(&self) -> Self {
        Self {
            kind: match self.kind {
                ArgumentKind::ElementSign => ArgumentKind::Element,
                ArgumentKind::ReferenceElementSign => ArgumentKind::ReferenceElement,
                other => other,
            },
            sign: 0,
            ..*self
        }
    }

    /// Two arguments contradict when both are defined and disagree about
    /// their sign.
    pub fn inconsistent(&self, other: &Self) -> bool {
        if !self.defined() || !other.defined() {
            return false;
        }
        self.has_sign() != other.has_sign() || self.sign != other.sign
    }

    /// True if a word carrying `id` realizes this formal argument.
    fn matches_word(&self, id: &PatternArgument) -> bool {
        match (self.kind, id.kind) {
            (ArgumentKind::Element | ArgumentKind::ElementSign, ArgumentKind::Element) => {
                self.element == id.element
            }
            (
                ArgumentKind::ReferenceElement | ArgumentKind::ReferenceElementSign,
                ArgumentKind::ReferenceElement,
            ) => self.element == id.element && self.reference == id.reference,
            _ => false,
        }
    }

    fn render(&self, patterns: &Patterns, out: &mut String) {
        if self.has_reference() {
            out.push_str(&patterns.reference_name(self.reference));
            out.push('.');
        }
        out.push_str(&patterns.element_name(self.element));
        if self.has_sign() {
            out.push('.');
            out.push_str(patterns.sign_name(self.sign));
        }
    }
}

pub type SignValues = OrderedList<ValueId>;

/// A constraint on one sign of one element: the set of permitted values, or
/// the set of forbidden values when `exclude` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignRestriction {
    element: ElementId,
    sign: SignIndex,
    exclude: bool,
    values: SignValues,
}

impl SignRestriction {
    pub fn new(element: ElementId, sign: SignIndex, values: SignValues, exclude: bool) -> Self {
        debug_assert!(!values.is_empty());
        Self {
            element,
            sign,
            exclude,
            values,
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn sign(&self) -> SignIndex {
        self.sign
    }

    /// Narrows this restriction by another on the same sign.
    pub fn intersection(&mut self, other: &SignRestriction) {
        debug_assert_eq!(self.sign, other.sign);
        match (self.exclude, other.exclude) {
            (true, true) => self.values = SignValues::union(&self.values, &other.values),
            (true, false) => {
                self.exclude = false;
                self.values = SignValues::difference(&other.values, &self.values);
            }
            (false, true) => self.values = SignValues::difference(&self.values, &other.values),
            (false, false) => self.values = SignValues::intersection(&self.values, &other.values),
        }
    }

    /// True if no word can satisfy the restriction.
    pub fn is_empty(&self, configuration: &Configuration) -> bool {
        let word_sign = &configuration.word_signs()[self.sign];
        if self.exclude {
            match word_sign.sign_type {
                // An open value set cannot be exhausted by exclusion.
                SignType::String => false,
                _ => self.values.len() == word_sign.values.len(),
            }
        } else {
            self.values.is_empty()
        }
    }

    /// Appends the character class over the attribute alphabet that words
    /// satisfying this restriction match at the sign's position.
    fn build_class(&self, out: &mut String) {
        out.push('[');
        if self.exclude {
            out.push('^');
        }
        for &value in &self.values {
            let _ = write!(out, "\\x{{{value:02x}}}");
        }
        if self.exclude {
            // An absent value never satisfies a restriction.
            let _ = write!(out, "\\x{{{NULL_ATTRIBUTE_VALUE:02x}}}");
        } else {
            // A wildcard annotation value satisfies any inclusion.
            let _ = write!(out, "\\x{{{ANY_ATTRIBUTE_VALUE:02x}}}");
        }
        out.push(']');
    }

    fn render(&self, patterns: &Patterns, out: &mut String) {
        out.push_str(patterns.sign_name(self.sign));
        out.push_str(if self.exclude { "!=" } else { "=" });
        for (index, &value) in self.values.iter().enumerate() {
            if index > 0 {
                out.push('|');
            }
            out.push_str(&patterns.sign_value(self.sign, value));
        }
    }
}

/// All sign restrictions of one word, sorted by (element, sign).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignRestrictions {
    data: Vec<SignRestriction>,
}

impl SignRestrictions {
    /// Inserts a restriction unless one with the same element and sign is
    /// already present; returns whether it was inserted.
    pub fn add(&mut self, restriction: SignRestriction) -> bool {
        let key = (restriction.element(), restriction.sign());
        match self
            .data
            .binary_search_by_key(&key, |r| (r.element(), r.sign()))
        {
            Ok(_) => false,
            Err(index) => {
                self.data.insert(index, restriction);
                true
            }
        }
    }

    /// Projects `restrictions` rows for `element` onto this set: rows with a
    /// matching sign are intersected, the rest are inserted.
    pub fn intersection(&mut self, restrictions: &SignRestrictions, element: ElementId) {
        for restriction in restrictions
            .data
            .iter()
            .filter(|r| r.element() == element)
        {
            match self.data.binary_search_by_key(&restriction.sign(), |r| r.sign()) {
                Ok(index) => self.data[index].intersection(restriction),
                Err(index) => self.data.insert(index, restriction.clone()),
            }
        }
    }

    /// True if any row rejects every word.
    pub fn is_empty(&self, configuration: &Configuration) -> bool {
        self.data.iter().any(|r| r.is_empty(configuration))
    }

    /// Compiles the restrictions to a regular expression over the attribute
    /// encoding of annotations (one code unit per sign).
    pub fn build(&self, configuration: &Configuration) -> String {
        let mut source = String::from("(?s)^");
        for sign in 0..configuration.word_signs().len() {
            match self.data.iter().find(|r| r.sign() == sign) {
                Some(restriction) => restriction.build_class(&mut source),
                None => source.push('.'),
            }
        }
        source.push('$');
        source
    }

    fn render(&self, patterns: &Patterns, out: &mut String) {
        if self.data.is_empty() {
            return;
        }
        out.push('<');
        for (index, restriction) in self.data.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            restriction.render(patterns, out);
        }
        out.push('>');
    }
}

/// One `<< ... >>` condition: an agreement chain or a dictionary call.
#[derive(Clone, Debug)]
pub struct Condition {
    strong: bool,
    dictionary: Option<usize>,
    arguments: Vec<PatternArgument>,
}

impl Condition {
    pub fn agreement(strong: bool, arguments: Vec<PatternArgument>) -> Self {
        debug_assert!(arguments.len() >= 2);
        debug_assert!(arguments
            .iter()
            .all(|arg| arg.has_sign() == arguments[0].has_sign()));
        Self {
            strong,
            dictionary: None,
            arguments,
        }
    }

    /// `dictionary` is the interned name id; `arguments` holds the word
    /// references with an undefined argument terminating each positional
    /// group.
    pub fn dictionary(dictionary: usize, arguments: Vec<PatternArgument>) -> Self {
        debug_assert!(!arguments.is_empty());
        Self {
            strong: false,
            dictionary: Some(dictionary),
            arguments,
        }
    }

    pub fn is_agreement(&self) -> bool {
        self.dictionary.is_none()
    }

    pub fn arguments(&self) -> &[PatternArgument] {
        &self.arguments
    }
}

/// The condition bundle of one alternative.
///
/// Lowering anchors every condition to the last word of each expanded
/// variant; offsets count backwards from there.
#[derive(Clone, Debug, Default)]
pub struct Conditions {
    data: Vec<Condition>,

    /// Condition indices by argument, the argument's sign slot zeroed.
    indices: HashMap<PatternArgument, Vec<usize>>,
}

impl Conditions {
    pub fn new(conditions: Vec<Condition>) -> Self {
        let mut indices: HashMap<PatternArgument, Vec<usize>> = HashMap::new();
        for (index, condition) in conditions.iter().enumerate() {
            for argument in &condition.arguments {
                if argument.defined() {
                    indices.entry(argument.without_sign()).or_default().push(index);
                }
            }
        }
        Self {
            data: conditions,
            indices,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lowers the bundle onto one expanded variant.  A condition whose
    /// arguments cannot all be bound to words of this variant is omitted for
    /// this variant.
    fn apply(&self, variant: &mut Variant) {
        if self.data.is_empty() || variant.words.is_empty() {
            return;
        }

        // The per-variant pass: argument -> word positions, in word order.
        let mut positions: HashMap<PatternArgument, Vec<usize>> = HashMap::new();
        for (index, word) in variant.words.iter().enumerate() {
            if !word.id.defined() {
                continue;
            }
            let key = word.id.without_sign();
            if self.indices.contains_key(&key) {
                positions.entry(key).or_default().push(index);
            }
        }

        let anchor = variant.words.len() - 1;
        let mut lowered = Vec::new();
        'conditions: for condition in &self.data {
            if condition.is_agreement() {
                let mut linked = OrderedList::new();
                for argument in &condition.arguments {
                    match positions.get(&argument.without_sign()) {
                        Some(list) => {
                            for &position in list {
                                linked.add(position);
                            }
                        }
                        None => continue 'conditions,
                    }
                }
                let mut offsets = SmallVec::new();
                for &position in &linked {
                    match u8::try_from(anchor - position) {
                        Ok(offset) => offsets.push(offset),
                        Err(_) => continue 'conditions,
                    }
                }
                let sign = if condition.arguments[0].has_sign() {
                    condition.arguments[0].sign
                } else {
                    MAIN_SIGN
                };
                lowered.push(WordCondition {
                    kind: ConditionKind::Agreement,
                    strong: condition.strong,
                    param: sign,
                    offsets,
                });
            } else {
                let mut offsets = SmallVec::new();
                for argument in &condition.arguments {
                    if !argument.defined() {
                        offsets.push(WordCondition::OFFSET_MAX);
                        continue;
                    }
                    match positions.get(&argument.without_sign()) {
                        Some(list) => {
                            for &position in list {
                                match u8::try_from(anchor - position) {
                                    Ok(offset) => offsets.push(offset),
                                    Err(_) => continue 'conditions,
                                }
                            }
                        }
                        None => continue 'conditions,
                    }
                }
                lowered.push(WordCondition {
                    kind: ConditionKind::Dictionary,
                    strong: false,
                    param: condition.dictionary.unwrap_or_default(),
                    offsets,
                });
            }
        }

        if let Some(last) = variant.words.last_mut() {
            last.conditions.extend(lowered);
        }
    }
}

/// The pattern syntax tree.
#[derive(Clone, Debug)]
pub enum PatternNode {
    /// Consecutive parts; with `transposition`, every reordering of the
    /// parts is admitted as an additional variant.
    Sequence {
        elements: Vec<PatternNode>,
        transposition: bool,
    },

    /// A `|` choice between alternatives.
    Alternatives(Vec<PatternNode>),

    /// One branch of a choice, carrying its condition bundle.
    Alternative {
        element: Box<PatternNode>,
        conditions: Conditions,
    },

    /// `{ ... }<min,max>`; `max = None` is bounded by the expansion budget.
    Repeating {
        element: Box<PatternNode>,
        min_count: usize,
        max_count: Option<usize>,
    },

    /// A word class with optional sign restrictions.
    Element {
        element: ElementId,
        signs: SignRestrictions,
    },

    /// An invocation of another pattern.
    Reference {
        reference: ReferenceId,
        signs: SignRestrictions,
    },

    /// A surface-word regular expression.
    Regexp(String),
}

impl PatternNode {
    /// The smallest number of words any variant of this node can have.
    pub fn min_size(&self) -> usize {
        match self {
            Self::Sequence { elements, .. } => elements.iter().map(Self::min_size).sum(),
            Self::Alternatives(alternatives) => alternatives
                .iter()
                .map(Self::min_size)
                .min()
                .unwrap_or_default(),
            Self::Alternative { element, .. } => element.min_size(),
            Self::Repeating { min_count, .. } => *min_count,
            Self::Element { .. } | Self::Reference { .. } | Self::Regexp(_) => 1,
        }
    }

    /// Expands this node into all variants of at most `max_size` words.
    pub fn build(&self, context: &mut BuildContext, max_size: usize) -> Variants {
        match self {
            Self::Sequence {
                elements,
                transposition,
            } => {
                let mut variants = Variants::default();
                let Some(all_sub) = self.collect_all_sub_variants(elements, context, max_size)
                else {
                    return variants;
                };
                let sub_refs: Vec<&Variants> = all_sub.iter().collect();
                BuildContext::add_variants(&sub_refs, &mut variants, max_size);

                if *transposition {
                    for permutation in (0..all_sub.len())
                        .permutations(all_sub.len())
                        .filter(|p| p.iter().enumerate().any(|(i, &j)| i != j))
                    {
                        let permuted: Vec<&Variants> =
                            permutation.iter().map(|&i| &all_sub[i]).collect();
                        BuildContext::add_variants(&permuted, &mut variants, max_size);
                    }
                }
                variants
            }

            Self::Alternatives(alternatives) => {
                let mut variants = Variants::default();
                for alternative in alternatives {
                    variants.0.extend(alternative.build(context, max_size).0);
                }
                variants.sort_and_remove_duplicates(context.patterns());
                variants
            }

            Self::Alternative {
                element,
                conditions,
            } => {
                let mut variants = element.build(context, max_size);
                for variant in &mut variants.0 {
                    conditions.apply(variant);
                }
                variants.sort_and_remove_duplicates(context.patterns());
                variants
            }

            Self::Repeating {
                element,
                min_count,
                max_count,
            } => Self::build_repeating(element, *min_count, *max_count, context, max_size),

            Self::Element { element, signs } => {
                let mut variants = Variants::default();
                if max_size >= 1 {
                    // The word class itself restricts the main sign.
                    let main_values = context
                        .patterns()
                        .configuration()
                        .word_signs()
                        .main_sign()
                        .values
                        .len();
                    let mut implied = SignRestrictions::default();
                    implied.add(SignRestriction::new(
                        *element,
                        MAIN_SIGN,
                        std::iter::once((element % main_values) as ValueId).collect(),
                        false,
                    ));
                    let mut restrictions = signs.clone();
                    restrictions.intersection(&implied, *element);
                    variants.0.push(Variant::of_element(
                        PatternArgument::element(*element),
                        restrictions,
                    ));
                }
                variants
            }

            Self::Reference { reference, signs } => {
                Self::build_reference(*reference, signs, context, max_size)
            }

            Self::Regexp(regexp) => {
                let mut variants = Variants::default();
                if max_size >= 1 {
                    variants.0.push(Variant::of_regexp(regexp.clone()));
                }
                variants
            }
        }
    }

    /// Expands each part of a sequence with the slack the other parts'
    /// minima leave it.  Returns `None` when any part has no variants.
    fn collect_all_sub_variants(
        &self,
        elements: &[PatternNode],
        context: &mut BuildContext,
        max_size: usize,
    ) -> Option<Vec<Variants>> {
        if max_size == 0 {
            return None;
        }
        let min_size = self.min_size();
        if min_size > max_size {
            return None;
        }

        let mut all_sub = Vec::with_capacity(elements.len());
        for element in elements {
            let element_max_size = max_size - min_size + element.min_size();
            let sub_variants = element.build(context, element_max_size);
            if sub_variants.0.is_empty() {
                return None;
            }
            all_sub.push(sub_variants);
        }
        Some(all_sub)
    }

    fn build_repeating(
        element: &PatternNode,
        min_count: usize,
        max_count: Option<usize>,
        context: &mut BuildContext,
        max_size: usize,
    ) -> Variants {
        debug_assert!(max_count.is_none_or(|max_count| min_count <= max_count));

        let mut variants = Variants::default();
        if min_count == 0 {
            variants.0.push(Variant::default());
        }
        if max_size == 0 || max_count == Some(0) {
            return variants;
        }

        let start = min_count.max(1);
        let nmsp = element.min_size().max(1);
        let nsmsp = nmsp * start;
        if nsmsp > max_size {
            return variants;
        }

        let finish = min(max_count.unwrap_or(usize::MAX), max_size / nmsp);
        // The body budget leaves one instance the slack the other minimum
        // instances do not consume; never below the body's own minimum.
        let element_max_size = (finish + nmsp).saturating_sub(nsmsp).max(nmsp);

        let sub_variants = element.build(context, element_max_size);
        if sub_variants.0.is_empty() {
            return variants;
        }

        let base = variants.0.len();
        let sub_refs: Vec<&Variants> = std::iter::repeat(&sub_variants).take(start).collect();
        BuildContext::add_variants(&sub_refs, &mut variants, max_size);

        // Each further count extends the previous count's variants.
        let mut round = base..variants.0.len();
        for _count in start + 1..=finish {
            let next_round_start = variants.0.len();
            for index in round.clone() {
                for sub_variant in &sub_variants.0 {
                    if variants.0[index].len() + sub_variant.len() <= max_size {
                        let mut extended = variants.0[index].clone();
                        extended.extend(sub_variant);
                        variants.0.push(extended);
                    }
                }
            }
            round = next_round_start..variants.0.len();
        }
        variants
    }

    fn build_reference(
        reference: ReferenceId,
        signs: &SignRestrictions,
        context: &mut BuildContext,
        max_size: usize,
    ) -> Variants {
        if max_size == 0 {
            return Variants::default();
        }
        let patterns = context.patterns();
        let Some(pattern) = patterns.resolve_reference(reference) else {
            return Variants::default();
        };
        let mut variants = pattern.build(context, max_size);

        let configuration = patterns.configuration();
        variants.0.retain_mut(|variant| {
            for word in &mut variant.words {
                if word.id.kind == ArgumentKind::ReferenceElement {
                    word.id.reference = reference;
                    word.sign_restrictions.intersection(signs, word.id.element);
                    if word.sign_restrictions.is_empty(configuration) {
                        return false;
                    }
                } else {
                    debug_assert_eq!(word.id.kind, ArgumentKind::None);
                }
            }
            true
        });
        variants
    }
}

/// A named pattern: its syntax tree plus its formal arguments.
#[derive(Debug)]
pub struct Pattern {
    name: String,
    reference: ReferenceId,
    root: PatternNode,
    arguments: Vec<PatternArgument>,
}

impl Pattern {
    pub fn new(
        name: String,
        reference: ReferenceId,
        root: PatternNode,
        arguments: Vec<PatternArgument>,
    ) -> Self {
        debug_assert!(!name.is_empty());
        Self {
            name,
            reference,
            root,
            arguments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> ReferenceId {
        self.reference
    }

    pub fn arguments(&self) -> &[PatternArgument] {
        &self.arguments
    }

    pub fn min_size(&self) -> usize {
        self.root.min_size()
    }

    /// Expands the pattern into all variants of at most `max_size` words,
    /// then rebinds each word id: a word realizing formal argument `i`
    /// becomes a reference element at argument position `i`, every other id
    /// is cleared.
    pub fn build(&self, context: &mut BuildContext, max_size: usize) -> Variants {
        let max_size = max_size.min(MAX_VARIANT_SIZE);
        let corrected_max_size = context.push_max_size(&self.name, max_size);
        let mut variants = self.root.build(context, corrected_max_size);
        let top_max_size = context.pop_max_size(&self.name);
        debug_assert_eq!(top_max_size, corrected_max_size);

        let main_size = context
            .patterns()
            .configuration()
            .word_signs()
            .main_sign()
            .values
            .len();
        for variant in &mut variants.0 {
            for word in &mut variant.words {
                if !word.id.defined() {
                    continue;
                }
                let position = self
                    .arguments
                    .iter()
                    .position(|argument| argument.matches_word(&word.id));
                word.id = match position {
                    Some(index) => PatternArgument {
                        kind: ArgumentKind::ReferenceElement,
                        element: word.id.element % main_size + index * main_size,
                        reference: self.reference,
                        sign: 0,
                    },
                    None => PatternArgument::default(),
                };
            }
        }
        variants
    }
}

/// One word of an expanded variant: a regexp or an attribute-restricted
/// word slot, plus the conditions lowered onto it.
#[derive(Clone, Debug, Default)]
pub struct PatternWord {
    pub id: PatternArgument,
    pub regexp: Option<String>,
    pub sign_restrictions: SignRestrictions,
    pub conditions: Vec<WordCondition>,
}

impl PatternWord {
    fn of_regexp(regexp: String) -> Self {
        Self {
            regexp: Some(regexp),
            ..Self::default()
        }
    }

    fn of_element(id: PatternArgument, sign_restrictions: SignRestrictions) -> Self {
        Self {
            id,
            sign_restrictions,
            ..Self::default()
        }
    }

    fn render(&self, patterns: &Patterns, out: &mut String) {
        if let Some(regexp) = &self.regexp {
            out.push('"');
            out.push_str(regexp);
            out.push('"');
        } else {
            if self.id.defined() {
                self.id.render(patterns, out);
            }
            self.sign_restrictions.render(patterns, out);
        }
    }
}

/// One linear expansion of a pattern.
#[derive(Clone, Debug, Default)]
pub struct Variant {
    pub words: Vec<PatternWord>,
}

impl Variant {
    fn of_regexp(regexp: String) -> Self {
        Self {
            words: vec![PatternWord::of_regexp(regexp)],
        }
    }

    fn of_element(id: PatternArgument, signs: SignRestrictions) -> Self {
        Self {
            words: vec![PatternWord::of_element(id, signs)],
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn extend(&mut self, other: &Variant) {
        self.words.extend(other.words.iter().cloned());
    }

    /// The canonical rendering that defines variant identity.
    pub fn render(&self, patterns: &Patterns) -> String {
        let mut out = String::new();
        for (index, word) in self.words.iter().enumerate() {
            if index > 0 {
                out.push(' ');
            }
            word.render(patterns, &mut out);
        }
        out
    }
}

/// A set of variants.
#[derive(Clone, Debug, Default)]
pub struct Variants(pub Vec<Variant>);

impl Variants {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variant> {
        self.0.iter()
    }

    /// Sorts lexicographically by canonical rendering and drops variants
    /// that render identically.
    pub fn sort_and_remove_duplicates(&mut self, patterns: &Patterns) {
        let mut pairs: Vec<(String, Variant)> = std::mem::take(&mut self.0)
            .into_iter()
            .map(|variant| (variant.render(patterns), variant))
            .collect();
        pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
        pairs.dedup_by(|(a, _), (b, _)| a == b);
        self.0 = pairs.into_iter().map(|(_, variant)| variant).collect();
    }
}

/// The append-only pattern table plus the interning pools shared by the
/// compiler and the text loader.
#[derive(Debug)]
pub struct Patterns {
    patterns: Vec<Option<Pattern>>,
    names: IndexMap<String, ReferenceId>,
    strings: Vec<String>,
    dictionaries: Vec<String>,
    configuration: Arc<Configuration>,
}

impl Patterns {
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self {
            patterns: Vec::new(),
            names: IndexMap::new(),
            strings: Vec::new(),
            dictionaries: Vec::new(),
            configuration,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter().filter_map(Option::as_ref)
    }

    /// Registers a pattern name, reserving its position.  Returns `None` if
    /// the name is already taken.
    pub(crate) fn register_name(&mut self, name: &str) -> Option<ReferenceId> {
        if self.names.contains_key(name) {
            return None;
        }
        let position = self.names.len();
        self.names.insert(name.into(), position);
        self.patterns.push(None);
        Some(position)
    }

    pub(crate) fn set_pattern(&mut self, pattern: Pattern) {
        let position = pattern.reference() % self.names.len();
        self.patterns[position] = Some(pattern);
    }

    /// The position of pattern `name`, decorated with `name_index`.
    pub fn pattern_reference(&self, name: &str, name_index: usize) -> Option<ReferenceId> {
        self.names
            .get(name)
            .map(|&position| position + name_index * self.names.len())
    }

    pub fn resolve_reference(&self, reference: ReferenceId) -> Option<&Pattern> {
        if self.names.is_empty() {
            return None;
        }
        self.patterns
            .get(reference % self.names.len())
            .and_then(Option::as_ref)
    }

    /// Renders a packed element id back to its decorated name.
    pub fn element_name(&self, element: ElementId) -> String {
        let values = &self.configuration.word_signs().main_sign().values;
        IndexedName {
            name: values.value(element % values.len()).clone(),
            index: element / values.len(),
        }
        .normalize()
    }

    /// Renders a packed reference id back to its decorated name.
    pub fn reference_name(&self, reference: ReferenceId) -> String {
        let count = self.names.len();
        if count == 0 {
            return String::new();
        }
        let name = self
            .resolve_reference(reference)
            .map(|pattern| pattern.name().to_owned())
            .or_else(|| {
                self.names
                    .get_index(reference % count)
                    .map(|(name, _)| name.clone())
            })
            .unwrap_or_default();
        IndexedName {
            name,
            index: reference / count,
        }
        .normalize()
    }

    pub fn sign_name(&self, sign: SignIndex) -> &str {
        self.configuration.word_signs()[sign].name()
    }

    /// Renders a value id of `sign` back to its text.
    pub fn sign_value(&self, sign: SignIndex, value: ValueId) -> String {
        let word_sign = &self.configuration.word_signs()[sign];
        match word_sign.sign_type {
            SignType::String => self
                .strings
                .get(usize::from(value))
                .cloned()
                .unwrap_or_default(),
            _ => word_sign.values.value(usize::from(value)).clone(),
        }
    }

    /// The interned id of a string-sign value, if it was interned.
    pub fn string_index(&self, value: &str) -> Option<ValueId> {
        self.strings
            .iter()
            .position(|s| s == value)
            .map(|index| index as ValueId)
    }

    /// The number of interned string-sign values.
    pub fn strings_len(&self) -> usize {
        self.strings.len()
    }

    /// Interns a string-sign value; `None` when the pool is full.
    pub(crate) fn intern_string(&mut self, value: &str) -> Option<ValueId> {
        if let Some(index) = self.string_index(value) {
            return Some(index);
        }
        if self.strings.len() >= MAX_SIGN_VALUES {
            return None;
        }
        self.strings.push(value.into());
        Some((self.strings.len() - 1) as ValueId)
    }

    pub fn dictionary_name(&self, dictionary: usize) -> &str {
        &self.dictionaries[dictionary]
    }

    pub(crate) fn intern_dictionary(&mut self, name: &str) -> usize {
        match self.dictionaries.iter().position(|d| d == name) {
            Some(index) => index,
            None => {
                self.dictionaries.push(name.into());
                self.dictionaries.len() - 1
            }
        }
    }
}

/// Scratch state for one expansion: the per-name budget stacks that bound
/// recursion.
pub struct BuildContext<'a> {
    patterns: &'a Patterns,
    max_sizes: HashMap<String, Vec<usize>>,
}

impl<'a> BuildContext<'a> {
    pub fn new(patterns: &'a Patterns) -> Self {
        Self {
            patterns,
            max_sizes: HashMap::new(),
        }
    }

    pub fn patterns(&self) -> &'a Patterns {
        self.patterns
    }

    /// Records entry into pattern `name` with budget `max_size` and returns
    /// the corrected budget: a re-entry that does not shrink the budget is
    /// forced one smaller than the enclosing entry, so self-reference
    /// always runs out.
    pub fn push_max_size(&mut self, name: &str, max_size: usize) -> usize {
        let stack = self.max_sizes.entry(name.into()).or_default();
        let corrected = match stack.last() {
            Some(&top) if max_size >= top => top.saturating_sub(1),
            _ => max_size,
        };
        stack.push(corrected);
        corrected
    }

    pub fn pop_max_size(&mut self, name: &str) -> usize {
        let stack = self
            .max_sizes
            .get_mut(name)
            .expect("budget stack must exist for every entered pattern");
        stack.pop().expect("budget stack push/pop must balance")
    }

    /// Appends every in-budget combination of one variant from each part.
    pub fn add_variants(all_sub: &[&Variants], variants: &mut Variants, max_size: usize) {
        debug_assert!(all_sub.iter().all(|sub| !sub.0.is_empty()));
        let mut indices = vec![0; all_sub.len()];
        loop {
            let mut variant = Variant::default();
            for (sub, &index) in all_sub.iter().zip(&indices) {
                variant.extend(&sub.0[index]);
            }
            if variant.len() <= max_size {
                variants.0.push(variant);
            }
            if !Self::next_indices(all_sub, &mut indices) {
                break;
            }
        }
    }

    fn next_indices(all_sub: &[&Variants], indices: &mut [usize]) -> bool {
        for position in (0..indices.len()).rev() {
            if indices[position] + 1 < all_sub[position].0.len() {
                indices[position] += 1;
                return true;
            }
            indices[position] = 0;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        ArgumentKind, BuildContext, Condition, Conditions, Pattern, PatternArgument, PatternNode,
        Patterns, SignRestriction, SignRestrictions, SignValues, Variants,
    };
    use crate::{
        config::{Configuration, MAIN_SIGN},
        matcher::{ConditionKind, WordCondition},
    };

    fn configuration() -> Arc<Configuration> {
        Arc::new(
            Configuration::from_json(
                r#"{
                    "signs": [
                        {
                            "type": "main",
                            "names": ["class", "c"],
                            "values": ["A", "N", "V"],
                            "consistent": true
                        },
                        {
                            "type": "enum",
                            "names": ["case"],
                            "values": ["nom", "gen", "acc"],
                            "consistent": true
                        },
                        {
                            "type": "string",
                            "names": ["lemma"],
                            "consistent": false
                        }
                    ]
                }"#,
            )
            .unwrap(),
        )
    }

    fn patterns() -> Patterns {
        Patterns::new(configuration())
    }

    fn values(ids: &[u16]) -> SignValues {
        ids.iter().copied().collect()
    }

    fn regexp(source: &str) -> PatternNode {
        PatternNode::Regexp(source.into())
    }

    fn renderings(variants: &Variants, patterns: &Patterns) -> Vec<String> {
        variants.iter().map(|v| v.render(patterns)).collect()
    }

    fn expand(patterns: &Patterns, node: &PatternNode, max_size: usize) -> Vec<String> {
        let mut context = BuildContext::new(patterns);
        let mut variants = node.build(&mut context, max_size);
        variants.sort_and_remove_duplicates(patterns);
        renderings(&variants, patterns)
    }

    // The `case` sign (domain nom/gen/acc) sits at index 2 after reordering.
    const CASE: usize = 2;

    #[test]
    fn restriction_intersection_include_include() {
        let mut a = SignRestriction::new(0, CASE, values(&[0, 1]), false);
        let b = SignRestriction::new(0, CASE, values(&[1, 2]), false);
        a.intersection(&b);
        assert_eq!(a, SignRestriction::new(0, CASE, values(&[1]), false));
    }

    #[test]
    fn restriction_intersection_include_exclude() {
        let mut a = SignRestriction::new(0, CASE, values(&[0, 1]), false);
        let b = SignRestriction::new(0, CASE, values(&[1]), true);
        a.intersection(&b);
        assert_eq!(a, SignRestriction::new(0, CASE, values(&[0]), false));
    }

    #[test]
    fn restriction_intersection_exclude_include() {
        let mut a = SignRestriction::new(0, CASE, values(&[0]), true);
        let b = SignRestriction::new(0, CASE, values(&[0, 2]), false);
        a.intersection(&b);
        assert_eq!(a, SignRestriction::new(0, CASE, values(&[2]), false));
    }

    #[test]
    fn restriction_intersection_exclude_exclude() {
        let mut a = SignRestriction::new(0, CASE, values(&[0]), true);
        let b = SignRestriction::new(0, CASE, values(&[2]), true);
        a.intersection(&b);
        assert_eq!(a, SignRestriction::new(0, CASE, values(&[0, 2]), true));
    }

    /// Membership in an intersection equals membership in both operands,
    /// across all four exclude combinations.
    #[test]
    fn restriction_intersection_membership() {
        let domain: Vec<u16> = vec![0, 1, 2];
        let member = |r: &SignRestriction, v: u16| {
            let included = r.values.has(&v);
            if r.exclude {
                !included
            } else {
                included
            }
        };
        for a_exclude in [false, true] {
            for b_exclude in [false, true] {
                let a = SignRestriction::new(0, CASE, values(&[0, 1]), a_exclude);
                let b = SignRestriction::new(0, CASE, values(&[1, 2]), b_exclude);
                let mut c = a.clone();
                c.intersection(&b);
                for &v in &domain {
                    assert_eq!(
                        member(&c, v),
                        member(&a, v) && member(&b, v),
                        "value {v} under exclude=({a_exclude},{b_exclude})"
                    );
                }
            }
        }
    }

    #[test]
    fn restriction_emptiness() {
        let patterns = patterns();
        let configuration = patterns.configuration();
        // Excluding the entire enum domain rejects everything.
        let full = SignRestriction::new(0, CASE, values(&[0, 1, 2]), true);
        assert!(full.is_empty(configuration));
        let partial = SignRestriction::new(0, CASE, values(&[0, 1]), true);
        assert!(!partial.is_empty(configuration));
        // A string sign can never be exhausted by exclusion.
        let string = SignRestriction::new(0, 1, values(&[0]), true);
        assert!(!string.is_empty(configuration));
    }

    #[test]
    fn restrictions_add_is_by_element_and_sign() {
        let mut restrictions = SignRestrictions::default();
        assert!(restrictions.add(SignRestriction::new(0, CASE, values(&[0]), false)));
        assert!(!restrictions.add(SignRestriction::new(0, CASE, values(&[1]), false)));
        assert!(restrictions.add(SignRestriction::new(1, CASE, values(&[1]), false)));
    }

    #[test]
    fn attribute_regex_construction() {
        let patterns = patterns();
        let mut restrictions = SignRestrictions::default();
        restrictions.add(SignRestriction::new(0, CASE, values(&[0, 2]), false));
        assert_eq!(
            restrictions.build(patterns.configuration()),
            "(?s)^..[\\x{00}\\x{02}\\x{80}]$"
        );

        let mut excluded = SignRestrictions::default();
        excluded.add(SignRestriction::new(0, CASE, values(&[1]), true));
        assert_eq!(
            excluded.build(patterns.configuration()),
            "(?s)^..[^\\x{01}\\x{82}]$"
        );
    }

    #[test]
    fn regexp_respects_budget() {
        let patterns = patterns();
        assert!(expand(&patterns, &regexp("x"), 0).is_empty());
        assert_eq!(expand(&patterns, &regexp("x"), 1), ["\"x\""]);
    }

    #[test]
    fn bounded_repetition() {
        let patterns = patterns();
        let node = PatternNode::Repeating {
            element: Box::new(regexp("x")),
            min_count: 2,
            max_count: Some(4),
        };
        assert_eq!(
            expand(&patterns, &node, 3),
            ["\"x\" \"x\"", "\"x\" \"x\" \"x\""],
        );
    }

    #[test]
    fn optional_element_in_sequence() {
        let patterns = patterns();
        let node = PatternNode::Sequence {
            elements: vec![
                PatternNode::Repeating {
                    element: Box::new(regexp("x")),
                    min_count: 0,
                    max_count: Some(1),
                },
                regexp("y"),
            ],
            transposition: false,
        };
        assert_eq!(expand(&patterns, &node, 2), ["\"x\" \"y\"", "\"y\""]);
    }

    #[test]
    fn unbounded_repetition_is_capped_by_the_budget() {
        let patterns = patterns();
        let node = PatternNode::Repeating {
            element: Box::new(regexp("x")),
            min_count: 0,
            max_count: None,
        };
        assert_eq!(
            expand(&patterns, &node, 3),
            ["", "\"x\"", "\"x\" \"x\"", "\"x\" \"x\" \"x\""],
        );
    }

    #[test]
    fn transposition_admits_reorderings() {
        let patterns = patterns();
        let node = PatternNode::Sequence {
            elements: vec![regexp("x"), regexp("y")],
            transposition: true,
        };
        assert_eq!(expand(&patterns, &node, 2), ["\"x\" \"y\"", "\"y\" \"x\""]);

        let plain = PatternNode::Sequence {
            elements: vec![regexp("x"), regexp("y")],
            transposition: false,
        };
        assert_eq!(expand(&patterns, &plain, 2), ["\"x\" \"y\""]);
    }

    #[test]
    fn min_size_prediction() {
        let node = PatternNode::Sequence {
            elements: vec![
                regexp("x"),
                PatternNode::Repeating {
                    element: Box::new(regexp("y")),
                    min_count: 2,
                    max_count: Some(5),
                },
                PatternNode::Alternatives(vec![
                    PatternNode::Sequence {
                        elements: vec![regexp("a"), regexp("b")],
                        transposition: false,
                    },
                    regexp("c"),
                ]),
            ],
            transposition: false,
        };
        assert_eq!(node.min_size(), 4);
        // A node whose minimum exceeds the budget yields nothing.
        let patterns = patterns();
        assert!(expand(&patterns, &node, 3).is_empty());
    }

    /// Budget growth only ever adds variants.
    #[test]
    fn expansion_is_monotonic_in_the_budget() {
        let patterns = patterns();
        let node = PatternNode::Sequence {
            elements: vec![
                PatternNode::Repeating {
                    element: Box::new(regexp("x")),
                    min_count: 0,
                    max_count: None,
                },
                regexp("y"),
            ],
            transposition: false,
        };
        let mut previous = Vec::new();
        for budget in 0..6 {
            let current = expand(&patterns, &node, budget);
            for rendering in &previous {
                assert!(current.contains(rendering), "budget regression: {rendering}");
            }
            previous = current;
        }
    }

    #[test]
    fn dedup_is_idempotent() {
        let patterns = patterns();
        let node = PatternNode::Alternatives(vec![regexp("x"), regexp("x"), regexp("y")]);
        let mut context = BuildContext::new(&patterns);
        let mut variants = node.build(&mut context, 1);
        variants.sort_and_remove_duplicates(&patterns);
        let once = renderings(&variants, &patterns);
        variants.sort_and_remove_duplicates(&patterns);
        assert_eq!(once, renderings(&variants, &patterns));
        assert_eq!(once, ["\"x\"", "\"y\""]);
    }

    /// Sub(Pa) = Pa; Top(Sub.Pa) = Sub: expanding Top rebinds the word that
    /// realized Sub's argument to Top's argument position 0.
    #[test]
    fn reference_argument_rebinding() {
        let mut patterns = patterns();
        let sub = patterns.register_name("Sub").unwrap();
        let top = patterns.register_name("Top").unwrap();
        let main_size = 3;

        // Pa: word class A (value id 0) decorated with index 1.
        let pa = main_size;
        patterns.set_pattern(Pattern::new(
            "Sub".into(),
            sub,
            PatternNode::Element {
                element: pa,
                signs: SignRestrictions::default(),
            },
            vec![PatternArgument::element(pa)],
        ));

        let sub_arg0 = PatternArgument {
            kind: ArgumentKind::ReferenceElement,
            element: pa % main_size,
            reference: sub,
            sign: 0,
        };
        patterns.set_pattern(Pattern::new(
            "Top".into(),
            top,
            PatternNode::Reference {
                reference: sub,
                signs: SignRestrictions::default(),
            },
            vec![sub_arg0],
        ));

        let mut context = BuildContext::new(&patterns);
        let variants = patterns
            .resolve_reference(top)
            .unwrap()
            .build(&mut context, 1);
        assert_eq!(variants.len(), 1);
        let word = &variants.0[0].words[0];
        assert_eq!(word.id.kind, ArgumentKind::ReferenceElement);
        assert_eq!(word.id.reference, top);
        assert_eq!(word.id.element, 0, "argument position 0, base value A");
    }

    /// Restrictions at the call site project onto the callee's words and
    /// empty projections discard the variant.
    #[test]
    fn reference_projection() {
        let mut patterns = patterns();
        let sub = patterns.register_name("Sub").unwrap();
        let top = patterns.register_name("Top").unwrap();

        let noun = 1;
        let mut callee_signs = SignRestrictions::default();
        callee_signs.add(SignRestriction::new(noun, CASE, values(&[0, 1]), false));
        patterns.set_pattern(Pattern::new(
            "Sub".into(),
            sub,
            PatternNode::Element {
                element: noun,
                signs: callee_signs,
            },
            vec![PatternArgument::element(noun)],
        ));

        // Rebased argument 0 keeps element id 1 (N is value id 1).
        let mut caller_signs = SignRestrictions::default();
        caller_signs.add(SignRestriction::new(noun, CASE, values(&[1, 2]), false));
        patterns.set_pattern(Pattern::new(
            "Top".into(),
            top,
            PatternNode::Reference {
                reference: sub,
                signs: caller_signs,
            },
            vec![],
        ));

        let mut context = BuildContext::new(&patterns);
        let variants = patterns
            .resolve_reference(top)
            .unwrap()
            .build(&mut context, 1);
        assert_eq!(variants.len(), 1);
        let word = &variants.0[0].words[0];
        let mut expected = SignRestrictions::default();
        expected.add(SignRestriction::new(noun, MAIN_SIGN, values(&[1]), false));
        expected.add(SignRestriction::new(noun, CASE, values(&[1]), false));
        assert_eq!(word.sign_restrictions, expected);

        // A projection that empties the restriction discards the variant.
        let mut disjoint = SignRestrictions::default();
        disjoint.add(SignRestriction::new(noun, CASE, values(&[2]), false));
        let node = PatternNode::Reference {
            reference: sub,
            signs: disjoint,
        };
        let mut context = BuildContext::new(&patterns);
        assert!(node.build(&mut context, 1).is_empty());
    }

    /// A pattern that references itself terminates at every budget and
    /// never exceeds it.
    #[test]
    fn self_recursion_terminates() {
        let mut patterns = patterns();
        let p = patterns.register_name("P").unwrap();
        let noun = 1;
        patterns.set_pattern(Pattern::new(
            "P".into(),
            p,
            PatternNode::Alternatives(vec![
                PatternNode::Element {
                    element: noun,
                    signs: SignRestrictions::default(),
                },
                PatternNode::Sequence {
                    elements: vec![
                        PatternNode::Element {
                            element: noun,
                            signs: SignRestrictions::default(),
                        },
                        PatternNode::Reference {
                            reference: p,
                            signs: SignRestrictions::default(),
                        },
                    ],
                    transposition: false,
                },
            ]),
            vec![],
        ));

        for budget in 0..6 {
            let mut context = BuildContext::new(&patterns);
            let variants = patterns
                .resolve_reference(p)
                .unwrap()
                .build(&mut context, budget);
            assert!(variants.iter().all(|v| v.len() <= budget));
            let min_size = patterns.resolve_reference(p).unwrap().min_size();
            assert!(variants.iter().all(|v| v.len() >= min_size));
        }
    }

    /// `Agree = A N << A = N >>`: the variant is produced unchanged and its
    /// last word carries one weak main-sign agreement with offsets [1, 0].
    #[test]
    fn agreement_condition_lowering() {
        let patterns = patterns();
        let adjective = PatternArgument::element(0);
        let noun = PatternArgument::element(1);
        let node = PatternNode::Alternative {
            element: Box::new(PatternNode::Sequence {
                elements: vec![
                    PatternNode::Element {
                        element: 0,
                        signs: SignRestrictions::default(),
                    },
                    PatternNode::Element {
                        element: 1,
                        signs: SignRestrictions::default(),
                    },
                ],
                transposition: false,
            }),
            conditions: Conditions::new(vec![Condition::agreement(false, vec![adjective, noun])]),
        };

        let mut context = BuildContext::new(&patterns);
        let variants = node.build(&mut context, 2);
        assert_eq!(variants.len(), 1);
        let variant = &variants.0[0];
        assert!(variant.words[0].conditions.is_empty());
        assert_eq!(
            variant.words[1].conditions,
            vec![WordCondition {
                kind: ConditionKind::Agreement,
                strong: false,
                param: MAIN_SIGN,
                offsets: smallvec::smallvec![1, 0],
            }],
        );
    }

    /// A condition whose argument binds no word is dropped for that variant
    /// while the variant itself survives.
    #[test]
    fn unbindable_condition_is_omitted() {
        let patterns = patterns();
        let noun = PatternArgument::element(1);
        let verb = PatternArgument::element(2);
        let node = PatternNode::Alternative {
            element: Box::new(PatternNode::Element {
                element: 1,
                signs: SignRestrictions::default(),
            }),
            conditions: Conditions::new(vec![Condition::agreement(false, vec![noun, verb])]),
        };
        let mut context = BuildContext::new(&patterns);
        let variants = node.build(&mut context, 1);
        assert_eq!(variants.len(), 1);
        assert!(variants.0[0].words[0].conditions.is_empty());
    }

    /// Dictionary conditions lower to offset lists with the group
    /// separator sentinel between positional groups.
    #[test]
    fn dictionary_condition_lowering() {
        let mut patterns = patterns();
        let dictionary = patterns.intern_dictionary("collocation");
        let adjective = PatternArgument::element(0);
        let noun = PatternArgument::element(1);
        let node = PatternNode::Alternative {
            element: Box::new(PatternNode::Sequence {
                elements: vec![
                    PatternNode::Element {
                        element: 0,
                        signs: SignRestrictions::default(),
                    },
                    PatternNode::Element {
                        element: 1,
                        signs: SignRestrictions::default(),
                    },
                ],
                transposition: false,
            }),
            conditions: Conditions::new(vec![Condition::dictionary(
                dictionary,
                vec![adjective, PatternArgument::default(), noun],
            )]),
        };

        let mut context = BuildContext::new(&patterns);
        let variants = node.build(&mut context, 2);
        assert_eq!(variants.len(), 1);
        assert_eq!(
            variants.0[0].words[1].conditions,
            vec![WordCondition {
                kind: ConditionKind::Dictionary,
                strong: false,
                param: dictionary,
                offsets: smallvec::smallvec![1, WordCondition::OFFSET_MAX, 0],
            }],
        );
    }
}
