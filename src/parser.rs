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

//! Parsing and semantic resolution of pattern definitions.
//!
//! [`PatternsBuilder`] drives two passes over a patterns file: the first
//! registers every definition's name so references resolve in any order,
//! the second parses each definition with a recursive-descent parser that
//! resolves word classes, sign names and values against the schema as it
//! goes.  Errors are recorded into the shared [`ErrorProcessor`]; the first
//! error in a definition abandons that definition only.

use std::sync::Arc;

use regex::Regex;

use crate::{
    config::{Configuration, SignType, ValueId, MAIN_SIGN},
    lex::{
        scan_definition, split_definitions, Definition, LocatedScanError, LocatedToken, Punct,
        Token,
    },
    message::{Diagnostic, ErrorProcessor, Location, Severity},
    pattern::{
        ArgumentKind, Condition, Conditions, ElementId, Pattern, PatternArgument, PatternNode,
        Patterns, ReferenceId, SignRestriction, SignRestrictions, SignValues,
        MAX_TRANSPOSITION_SIZE, MAX_VARIANT_SIZE,
    },
};

/// A name factored into its base and a trailing numeric index, so that
/// `N7` denotes the seventh distinct binding of word class `N`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedName {
    pub name: String,
    pub index: usize,
}

impl IndexedName {
    pub fn parse(raw: &str) -> Self {
        let base = raw.trim_end_matches(|c: char| c.is_ascii_digit());
        if base.len() == raw.len() || base.is_empty() {
            return Self {
                name: raw.into(),
                index: 0,
            };
        }
        match raw[base.len()..].parse() {
            Ok(index) => Self {
                name: base.into(),
                index,
            },
            Err(_) => Self {
                name: raw.into(),
                index: 0,
            },
        }
    }

    pub fn normalize(&self) -> String {
        if self.index == 0 {
            self.name.clone()
        } else {
            format!("{}{}", self.name, self.index)
        }
    }
}

/// Parses a patterns file into a [`Patterns`] table.
pub struct PatternsBuilder<'e> {
    configuration: Arc<Configuration>,
    patterns: Patterns,
    errors: &'e mut ErrorProcessor,
}

impl<'e> PatternsBuilder<'e> {
    pub fn new(configuration: Arc<Configuration>, errors: &'e mut ErrorProcessor) -> Self {
        Self {
            patterns: Patterns::new(Arc::clone(&configuration)),
            configuration,
            errors,
        }
    }

    /// Parses all definitions of `source`, collecting diagnostics instead of
    /// stopping at the first bad definition.
    pub fn read_source(&mut self, source: &str) {
        let definitions = split_definitions(source);
        let mut scanned = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            match scan_definition(definition) {
                Ok(tokens) => scanned.push(Some(tokens)),
                Err(error) => {
                    self.add_scan_error(definition, error);
                    scanned.push(None);
                }
            }
        }

        // First pass: register every definition's name so that references
        // resolve independently of definition order.
        let mut references = Vec::with_capacity(definitions.len());
        for (definition, tokens) in definitions.iter().zip(&scanned) {
            references.push(tokens.as_ref().and_then(|tokens| {
                self.register_definition_name(definition, tokens)
            }));
        }

        // Second pass: parse the bodies.
        for ((definition, tokens), reference) in
            definitions.iter().zip(&scanned).zip(references)
        {
            if let (Some(tokens), Some(reference)) = (tokens, reference) {
                DefinitionParser {
                    configuration: &self.configuration,
                    patterns: &mut self.patterns,
                    errors: &mut *self.errors,
                    definition,
                    tokens,
                    position: 0,
                }
                .parse(reference);
            }
        }
    }

    pub fn finish(self) -> Patterns {
        self.patterns
    }

    fn register_definition_name(
        &mut self,
        definition: &Definition,
        tokens: &[LocatedToken],
    ) -> Option<ReferenceId> {
        let (name, located) = match tokens.first() {
            Some(located) => match &located.token {
                Token::Id(name) => (name.clone(), located),
                _ => {
                    self.add_error_at(definition, Some(located), "pattern name expected");
                    return None;
                }
            },
            None => return None,
        };
        match self.patterns.register_name(&name) {
            Some(reference) => Some(reference),
            None => {
                self.add_error_at(
                    definition,
                    Some(located),
                    &format!("pattern `{name}` is already defined"),
                );
                None
            }
        }
    }

    fn add_scan_error(&mut self, definition: &Definition, error: LocatedScanError) {
        let source = definition.line_text(error.line).unwrap_or_default();
        self.errors.add_error(
            Diagnostic::new(Severity::Error, error.error.to_string()).with_location(
                Location {
                    line: error.line,
                    segment: Some(error.segment),
                },
                source,
            ),
        );
    }

    fn add_error_at(
        &mut self,
        definition: &Definition,
        token: Option<&LocatedToken>,
        text: &str,
    ) {
        let location = match token {
            Some(token) => Location {
                line: token.line,
                segment: Some(token.segment.clone()),
            },
            None => Location {
                line: definition.first_line(),
                segment: None,
            },
        };
        let source = definition.line_text(location.line).unwrap_or_default();
        self.errors
            .add_error(Diagnostic::new(Severity::Error, text).with_location(location, source));
    }
}

enum ResolvedName {
    Element(ElementId),
    Reference(ReferenceId),
}

/// Parses one definition.  Every method returns `None` after recording a
/// diagnostic, which abandons the definition; the two deliberate exceptions
/// (inconsistent `=`/`==` mixing, duplicate sign restrictions) record the
/// diagnostic and keep parsing.
struct DefinitionParser<'a> {
    configuration: &'a Configuration,
    patterns: &'a mut Patterns,
    errors: &'a mut ErrorProcessor,
    definition: &'a Definition,
    tokens: &'a [LocatedToken],
    position: usize,
}

impl<'a> DefinitionParser<'a> {
    fn parse(mut self, reference: ReferenceId) {
        let _ = self.parse_pattern(reference);
    }

    fn parse_pattern(&mut self, reference: ReferenceId) -> Option<()> {
        let Some(name) = self.take_id() else {
            self.error("pattern name expected");
            return None;
        };
        let arguments = self.parse_pattern_arguments()?;
        if !self.match_punct(Punct::Equals) {
            self.error("equal sign `=` expected");
            return None;
        }
        let root = self.parse_alternatives()?;
        self.parse_text_extraction()?;
        if self.has() {
            self.error("end of pattern definition expected");
            return None;
        }
        self.patterns
            .set_pattern(Pattern::new(name, reference, root, arguments));
        Some(())
    }

    // pattern := Ident [ "(" ext_name { "," ext_name } ")" ] "=" ...
    fn parse_pattern_arguments(&mut self) -> Option<Vec<PatternArgument>> {
        let mut arguments = Vec::new();
        if self.match_punct(Punct::LParen) {
            loop {
                arguments.push(self.parse_extended_name()?);
                if !self.match_punct(Punct::Comma) {
                    break;
                }
            }
            if !self.match_punct(Punct::RParen) {
                self.error("closing parenthesis `)` expected");
                return None;
            }
        }
        Some(arguments)
    }

    // alternatives := alternative { "|" alternative }
    fn parse_alternatives(&mut self) -> Option<PatternNode> {
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.parse_alternative()?);
            if !self.match_punct(Punct::VBar) {
                break;
            }
        }
        Some(PatternNode::Alternatives(alternatives))
    }

    // alternative := elements { "~" elements } [ "<<" cond { "," cond } ">>" ]
    fn parse_alternative(&mut self) -> Option<PatternNode> {
        let mut groups = vec![self.parse_elements()?];
        while self.match_punct(Punct::Tilde) {
            groups.push(self.parse_elements()?);
        }
        if groups.len() > MAX_TRANSPOSITION_SIZE {
            self.error(&format!(
                "at most {MAX_TRANSPOSITION_SIZE} transposition parts are supported"
            ));
            return None;
        }
        let element = if groups.len() == 1 {
            groups.pop()?
        } else {
            PatternNode::Sequence {
                elements: groups,
                transposition: true,
            }
        };
        let conditions = self.parse_alternative_conditions()?;
        Some(PatternNode::Alternative {
            element: Box::new(element),
            conditions,
        })
    }

    // elements := element { element }
    fn parse_elements(&mut self) -> Option<PatternNode> {
        let mut elements = Vec::new();
        while let Some(element) = self.parse_element()? {
            elements.push(element);
        }
        if elements.is_empty() {
            self.error("at least one pattern element expected");
            return None;
        }
        Some(if elements.len() == 1 {
            elements.pop()?
        } else {
            PatternNode::Sequence {
                elements,
                transposition: false,
            }
        })
    }

    /// `Ok(Some(_))` is an element, `Ok(None)` means the next token cannot
    /// start one; in this parser's idiom, the outer `None` aborts.
    fn parse_element(&mut self) -> Option<Option<PatternNode>> {
        let tokens = self.tokens;
        let Some(located) = tokens.get(self.position) else {
            return Some(None);
        };
        match &located.token {
            Token::Regexp(source) => {
                if Regex::new(&format!("^(?:{source})$")).is_err() {
                    self.error("invalid regular expression");
                    return None;
                }
                let node = PatternNode::Regexp(source.clone());
                self.next();
                Some(Some(node))
            }

            Token::Id(_) => self.parse_element_node().map(Some),

            Token::Punct(Punct::LCurly) => {
                self.next();
                let alternatives = self.parse_alternatives()?;
                if !self.match_punct(Punct::RCurly) {
                    self.error("closing brace `}` expected");
                    return None;
                }
                let (min_count, max_count) = self.parse_repetition_bounds()?;
                Some(Some(PatternNode::Repeating {
                    element: Box::new(alternatives),
                    min_count,
                    max_count,
                }))
            }

            Token::Punct(Punct::LSquare) => {
                self.next();
                let alternatives = self.parse_alternatives()?;
                if !self.match_punct(Punct::RSquare) {
                    self.error("closing bracket `]` expected");
                    return None;
                }
                // [ X ] is { X }<0,1>.
                Some(Some(PatternNode::Repeating {
                    element: Box::new(alternatives),
                    min_count: 0,
                    max_count: Some(1),
                }))
            }

            Token::Punct(Punct::LParen) => {
                self.next();
                let alternatives = self.parse_alternatives()?;
                if !self.match_punct(Punct::RParen) {
                    self.error("closing parenthesis `)` expected");
                    return None;
                }
                Some(Some(alternatives))
            }

            _ => Some(None),
        }
    }

    // [ "<" Num [ "," Num ] ">" ], defaulting to (0, budget-bounded).
    fn parse_repetition_bounds(&mut self) -> Option<(usize, Option<usize>)> {
        if !self.match_punct(Punct::Lt) {
            return Some((0, None));
        }
        let Some(min) = self.take_number() else {
            self.error("number (0, 1, 2, etc.) expected");
            return None;
        };
        let max = if self.match_punct(Punct::Comma) {
            match self.take_number() {
                Some(max) => max,
                None => {
                    self.error("number (0, 1, 2, etc.) expected");
                    return None;
                }
            }
        } else {
            min
        };
        if !self.match_punct(Punct::Gt) {
            self.error("greater than sign `>` expected");
            return None;
        }
        if min > max {
            self.error("lower repetition bound exceeds the upper bound");
            return None;
        }
        if max > MAX_VARIANT_SIZE as u64 {
            self.error(&format!("repetition bound exceeds {MAX_VARIANT_SIZE}"));
            return None;
        }
        Some((min as usize, Some(max as usize)))
    }

    // element := Ident [ "<" elemCond { "," elemCond } ">" ]
    fn parse_element_node(&mut self) -> Option<PatternNode> {
        let Some(raw) = self.take_id() else {
            self.error("word class or pattern name expected");
            return None;
        };
        match self.resolve_name(&raw) {
            Some(ResolvedName::Element(element)) => {
                let signs = self.parse_element_conditions(element)?;
                Some(PatternNode::Element { element, signs })
            }
            Some(ResolvedName::Reference(reference)) => {
                let signs = if self.check_punct(Punct::Lt) {
                    let Some(head) = self.reference_head_element(reference) else {
                        self.error(&format!(
                            "pattern `{raw}` has no argument to restrict, or is not yet defined"
                        ));
                        return None;
                    };
                    self.parse_element_conditions(head)?
                } else {
                    SignRestrictions::default()
                };
                Some(PatternNode::Reference { reference, signs })
            }
            None => {
                self.error(&format!("unknown word class or pattern name `{raw}`"));
                None
            }
        }
    }

    fn parse_element_conditions(&mut self, element: ElementId) -> Option<SignRestrictions> {
        let mut signs = SignRestrictions::default();
        if self.match_punct(Punct::Lt) {
            loop {
                self.parse_element_condition(element, &mut signs)?;
                if !self.match_punct(Punct::Comma) {
                    break;
                }
            }
            if !self.match_punct(Punct::Gt) {
                self.error("greater than sign `>` expected");
                return None;
            }
        }
        Some(signs)
    }

    // elemCond := [ Ident ] ("=" | "!=") value { "|" value }
    fn parse_element_condition(
        &mut self,
        element: ElementId,
        signs: &mut SignRestrictions,
    ) -> Option<()> {
        let name = if matches!(self.peek(0), Some(Token::Id(_)))
            && (self.check_punct_at(Punct::Equals, 1) || self.check_punct_at(Punct::NotEquals, 1))
        {
            self.take_id()
        } else {
            None
        };

        let exclude = if self.match_punct(Punct::NotEquals) {
            true
        } else if self.match_punct(Punct::Equals) {
            false
        } else {
            self.error("equal sign `=` or `!=` expected");
            return None;
        };

        let sign = match &name {
            Some(name) => match self.configuration.word_signs().find(name) {
                Some(sign) => sign,
                None => {
                    self.error(&format!("unknown sign name `{name}`"));
                    return None;
                }
            },
            // A bare operator restricts the main sign.
            None => MAIN_SIGN,
        };

        let mut values = SignValues::new();
        loop {
            let value = match self.peek(0) {
                Some(Token::Id(value)) => value.clone(),
                Some(Token::Regexp(value)) => value.clone(),
                _ => {
                    self.error("regular expression or sign value expected");
                    return None;
                }
            };
            self.next();
            values.add(self.resolve_sign_value(sign, &value)?);
            if !self.match_punct(Punct::VBar) {
                break;
            }
        }

        if !signs.add(SignRestriction::new(element, sign, values, exclude)) {
            // Report, but the definition stays usable.
            self.error("duplicate restriction for the same sign");
        }
        Some(())
    }

    fn resolve_sign_value(&mut self, sign: usize, value: &str) -> Option<ValueId> {
        let word_sign = &self.configuration.word_signs()[sign];
        match word_sign.sign_type {
            SignType::String => match self.patterns.intern_string(value) {
                Some(id) => Some(id),
                None => {
                    self.error("too many distinct string values in patterns");
                    None
                }
            },
            _ => match word_sign.values.find(&value.to_owned()) {
                Some(id) => Some(id as u16),
                None => {
                    self.error(&format!(
                        "unknown value `{value}` of sign `{}`",
                        word_sign.name()
                    ));
                    None
                }
            },
        }
    }

    fn parse_alternative_conditions(&mut self) -> Option<Conditions> {
        let mut conditions = Vec::new();
        if self.match_punct(Punct::DoubleLt) {
            loop {
                self.parse_alternative_condition(&mut conditions)?;
                if !self.match_punct(Punct::Comma) {
                    break;
                }
            }
            if !self.match_punct(Punct::DoubleGt) {
                self.error("double greater than sign `>>` expected");
                return None;
            }
        }
        Some(Conditions::new(conditions))
    }

    // One token of lookahead tells a dictionary call from an agreement.
    fn parse_alternative_condition(&mut self, conditions: &mut Vec<Condition>) -> Option<()> {
        if self.check_punct_at(Punct::LParen, 1) {
            self.parse_dictionary_condition(conditions)
        } else {
            self.parse_matching_condition(conditions)
        }
    }

    // matchCond := ext_name ("=" | "==") ext_name { ("=" | "==") ext_name }
    fn parse_matching_condition(&mut self, conditions: &mut Vec<Condition>) -> Option<()> {
        let mut arguments = vec![self.parse_extended_name()?];
        let strong = if self.match_punct(Punct::DoubleEquals) {
            true
        } else if self.match_punct(Punct::Equals) {
            false
        } else {
            self.error("equal sign `=` or double equal sign `==` expected");
            return None;
        };

        loop {
            arguments.push(self.parse_extended_name()?);
            if (self.check_punct(Punct::Equals) && strong)
                || (self.check_punct(Punct::DoubleEquals) && !strong)
            {
                // Reported at the offending token; the chain keeps parsing.
                self.error("inconsistent equal sign `=` and double equal sign `==`");
            }
            if !(self.match_punct(Punct::Equals) || self.match_punct(Punct::DoubleEquals)) {
                break;
            }
        }

        if arguments
            .iter()
            .any(|argument| argument.inconsistent(&arguments[0]))
        {
            self.error("agreement arguments disagree about the sign");
            return Some(());
        }
        conditions.push(Condition::agreement(strong, arguments));
        Some(())
    }

    // dictCond := Ident "(" group { "," group } ")", group := Ident { Ident }
    fn parse_dictionary_condition(&mut self, conditions: &mut Vec<Condition>) -> Option<()> {
        let Some(name) = self.take_id() else {
            self.error("dictionary name expected");
            return None;
        };
        let dictionary = self.patterns.intern_dictionary(&name);
        if !self.match_punct(Punct::LParen) {
            self.error("opening parenthesis `(` expected");
            return None;
        }

        let mut arguments = Vec::new();
        loop {
            let group_start = arguments.len();
            while matches!(self.peek(0), Some(Token::Id(_))) {
                let Some(raw) = self.take_id() else { break };
                match self.resolve_name(&raw) {
                    Some(ResolvedName::Element(element)) => {
                        arguments.push(PatternArgument::element(element));
                    }
                    _ => {
                        self.error(&format!("unknown word class `{raw}`"));
                        return None;
                    }
                }
            }
            if arguments.len() == group_start {
                self.error("at least one pattern element expected");
                return None;
            }
            if !self.match_punct(Punct::Comma) {
                break;
            }
            // An undefined argument terminates the positional group.
            arguments.push(PatternArgument::default());
        }

        if !self.match_punct(Punct::RParen) {
            self.error("closing parenthesis `)` expected");
            return None;
        }
        conditions.push(Condition::dictionary(dictionary, arguments));
        Some(())
    }

    // ext_name := Ident [ "." Ident ]
    fn parse_extended_name(&mut self) -> Option<PatternArgument> {
        let Some(first) = self.take_id() else {
            self.error("word class or pattern name expected");
            return None;
        };
        let second = if self.match_punct(Punct::Dot) {
            match self.take_id() {
                Some(second) => Some(second),
                None => {
                    self.error("word class attribute name expected");
                    return None;
                }
            }
        } else {
            None
        };
        self.resolve_argument(&first, second.as_deref())
    }

    fn resolve_argument(&mut self, first: &str, second: Option<&str>) -> Option<PatternArgument> {
        match self.resolve_name(first) {
            Some(ResolvedName::Element(element)) => match second {
                None => Some(PatternArgument::element(element)),
                Some(name) => match self.configuration.word_signs().find(name) {
                    Some(sign) => Some(PatternArgument {
                        kind: ArgumentKind::ElementSign,
                        element,
                        reference: 0,
                        sign,
                    }),
                    None => {
                        self.error(&format!("unknown sign name `{name}`"));
                        None
                    }
                },
            },
            Some(ResolvedName::Reference(reference)) => {
                let Some(name) = second else {
                    self.error(&format!(
                        "`{first}` names a pattern; an argument or sign must follow"
                    ));
                    return None;
                };
                self.resolve_reference_argument(first, reference, name)
            }
            None => {
                self.error(&format!("unknown word class or pattern name `{first}`"));
                None
            }
        }
    }

    /// Resolves `P.x`: `x` is either a formal argument of `P`, or a sign of
    /// `P`'s head argument.
    fn resolve_reference_argument(
        &mut self,
        first: &str,
        reference: ReferenceId,
        name: &str,
    ) -> Option<PatternArgument> {
        let main_size = self.configuration.word_signs().main_sign().values.len();
        let arguments: Vec<PatternArgument> = match self.patterns.resolve_reference(reference) {
            Some(pattern) => pattern.arguments().to_vec(),
            None => {
                self.error(&format!(
                    "pattern `{first}` must be defined before its arguments are referenced"
                ));
                return None;
            }
        };

        if let Some(ResolvedName::Element(element)) = self.resolve_name(name) {
            if let Some(index) = arguments
                .iter()
                .position(|argument| !argument.has_reference() && argument.element == element)
            {
                return Some(PatternArgument {
                    kind: ArgumentKind::ReferenceElement,
                    element: element % main_size + index * main_size,
                    reference,
                    sign: 0,
                });
            }
        }
        if let Some(sign) = self.configuration.word_signs().find(name) {
            let Some(head) = arguments.first() else {
                self.error(&format!("pattern `{first}` has no arguments"));
                return None;
            };
            return Some(PatternArgument {
                kind: ArgumentKind::ReferenceElementSign,
                element: head.element % main_size,
                reference,
                sign,
            });
        }
        self.error(&format!(
            "`{name}` is neither an argument of `{first}` nor a sign name"
        ));
        None
    }

    /// The head argument of a referenced pattern, rebased to argument
    /// position 0, which is where call-site restrictions project.
    fn reference_head_element(&self, reference: ReferenceId) -> Option<ElementId> {
        let pattern = self.patterns.resolve_reference(reference)?;
        let main_size = self.configuration.word_signs().main_sign().values.len();
        pattern
            .arguments()
            .first()
            .map(|argument| argument.element % main_size)
    }

    fn resolve_name(&self, raw: &str) -> Option<ResolvedName> {
        let values = &self.configuration.word_signs().main_sign().values;
        if let Some(id) = values.find(&raw.to_owned()) {
            return Some(ResolvedName::Element(id));
        }
        let indexed = IndexedName::parse(raw);
        if indexed.index > 0 {
            if let Some(id) = values.find(&indexed.name) {
                return Some(ResolvedName::Element(indexed.index * values.len() + id));
            }
        }
        if let Some(reference) = self.patterns.pattern_reference(raw, 0) {
            return Some(ResolvedName::Reference(reference));
        }
        if indexed.index > 0 {
            if let Some(reference) = self.patterns.pattern_reference(&indexed.name, indexed.index)
            {
                return Some(ResolvedName::Reference(reference));
            }
        }
        None
    }

    // [ "=" "text" ">" text_tail ]: validated and discarded.
    fn parse_text_extraction(&mut self) -> Option<()> {
        let is_prefix = self.check_punct(Punct::Equals)
            && matches!(self.peek(1), Some(Token::Id(id)) if id == "text")
            && self.check_punct_at(Punct::Gt, 2);
        if !is_prefix {
            return Some(());
        }
        self.position += 3;
        loop {
            self.parse_text_extraction_pattern()?;
            if !self.match_punct(Punct::Comma) {
                break;
            }
        }
        Some(())
    }

    fn parse_text_extraction_pattern(&mut self) -> Option<()> {
        self.parse_text_extraction_element(true)?;
        while self.parse_text_extraction_element(false)? {}

        if self.match_punct(Punct::DoubleLt) {
            loop {
                self.parse_raw_extended_name()?;
                if !self.match_punct(Punct::TildeGt) {
                    self.error("tilde and greater than sign `~>` expected");
                    return None;
                }
                self.parse_raw_extended_name()?;
                if !self.match_punct(Punct::Comma) {
                    break;
                }
            }
            if !self.match_punct(Punct::DoubleGt) {
                self.error("double greater than sign `>>` expected");
                return None;
            }
        }
        Some(())
    }

    fn parse_text_extraction_element(&mut self, required: bool) -> Option<bool> {
        if matches!(self.peek(0), Some(Token::Regexp(_))) {
            self.next();
        } else if self.match_punct(Punct::Hash) {
            if !self.match_id() {
                self.error("word class or pattern name expected");
                return None;
            }
        } else if self.match_id() {
            if self.match_punct(Punct::Lt) {
                while self.match_id() {
                    if matches!(self.peek(0), Some(Token::Regexp(_))) {
                        self.next();
                    } else if !self.match_id() {
                        self.error("regular expression or sign value expected");
                        return None;
                    }
                }
                if !self.match_punct(Punct::Gt) {
                    self.error("greater than sign `>` expected");
                    return None;
                }
            }
        } else {
            if required {
                self.error("text extraction element expected");
                return None;
            }
            return Some(false);
        }
        Some(true)
    }

    fn parse_raw_extended_name(&mut self) -> Option<()> {
        if !self.match_id() {
            self.error("word class or pattern name expected");
            return None;
        }
        if self.match_punct(Punct::Dot) && !self.match_id() {
            self.error("word class attribute name expected");
            return None;
        }
        Some(())
    }

    fn has(&self) -> bool {
        self.position < self.tokens.len()
    }

    fn peek(&self, offset: usize) -> Option<&'a Token> {
        self.tokens
            .get(self.position + offset)
            .map(|located| &located.token)
    }

    fn check_punct(&self, punct: Punct) -> bool {
        self.check_punct_at(punct, 0)
    }

    fn check_punct_at(&self, punct: Punct, offset: usize) -> bool {
        matches!(self.peek(offset), Some(token) if token.is_punct(punct))
    }

    fn match_punct(&mut self, punct: Punct) -> bool {
        if self.check_punct(punct) {
            self.next();
            true
        } else {
            false
        }
    }

    fn match_id(&mut self) -> bool {
        if matches!(self.peek(0), Some(Token::Id(_))) {
            self.next();
            true
        } else {
            false
        }
    }

    fn take_id(&mut self) -> Option<String> {
        match self.peek(0) {
            Some(Token::Id(id)) => {
                let id = id.clone();
                self.next();
                Some(id)
            }
            _ => None,
        }
    }

    fn take_number(&mut self) -> Option<u64> {
        match self.peek(0) {
            Some(Token::Number(number)) => {
                let number = *number;
                self.next();
                Some(number)
            }
            _ => None,
        }
    }

    fn next(&mut self) {
        self.position += 1;
    }

    fn error(&mut self, text: &str) {
        let token = self
            .tokens
            .get(self.position)
            .or_else(|| self.tokens.last());
        let location = match token {
            Some(token) => Location {
                line: token.line,
                segment: Some(token.segment.clone()),
            },
            None => Location {
                line: self.definition.first_line(),
                segment: None,
            },
        };
        let source = self.definition.line_text(location.line).unwrap_or_default();
        self.errors
            .add_error(Diagnostic::new(Severity::Error, text).with_location(location, source));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{IndexedName, PatternsBuilder};
    use crate::{
        config::Configuration,
        matcher::{ConditionKind, WordCondition},
        message::ErrorProcessor,
        pattern::{BuildContext, Patterns},
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

    fn parse(source: &str) -> (Patterns, ErrorProcessor) {
        let mut errors = ErrorProcessor::new();
        let mut builder = PatternsBuilder::new(configuration(), &mut errors);
        builder.read_source(source);
        (builder.finish(), errors)
    }

    fn parse_ok(source: &str) -> Patterns {
        let (patterns, errors) = parse(source);
        assert!(!errors.has_any_errors(), "unexpected diagnostics");
        patterns
    }

    fn expand(patterns: &Patterns, name: &str, budget: usize) -> Vec<String> {
        let reference = patterns.pattern_reference(name, 0).unwrap();
        let pattern = patterns.resolve_reference(reference).unwrap();
        let mut context = BuildContext::new(patterns);
        let variants = pattern.build(&mut context, budget);
        variants.iter().map(|v| v.render(patterns)).collect()
    }

    #[test]
    fn indexed_names_factor_and_normalize() {
        assert_eq!(
            IndexedName::parse("N7"),
            IndexedName {
                name: "N".into(),
                index: 7
            }
        );
        assert_eq!(
            IndexedName::parse("NP"),
            IndexedName {
                name: "NP".into(),
                index: 0
            }
        );
        assert_eq!(IndexedName::parse("N7").normalize(), "N7");
        assert_eq!(IndexedName::parse("N").normalize(), "N");
    }

    #[test]
    fn parses_a_simple_sequence() {
        let patterns = parse_ok("NP = A N<case=nom>");
        assert_eq!(patterns.len(), 1);
        assert_eq!(
            expand(&patterns, "NP", 4),
            ["<class=A> <class=N,case=nom>"],
        );
    }

    #[test]
    fn optional_brackets_are_bounded_repetition_sugar() {
        let sugar = parse_ok("P = [ \"x\" ] \"y\"");
        let spelled = parse_ok("P = { \"x\" }<0,1> \"y\"");
        assert_eq!(expand(&sugar, "P", 2), expand(&spelled, "P", 2));
        assert_eq!(expand(&sugar, "P", 2), ["\"x\" \"y\"", "\"y\""]);
    }

    #[test]
    fn repetition_bounds_cut_expansion() {
        let patterns = parse_ok("P = { \"x\" }<2,4>");
        assert_eq!(expand(&patterns, "P", 3), ["\"x\" \"x\"", "\"x\" \"x\" \"x\""]);
    }

    #[test]
    fn transposition_against_plain_sequence() {
        let transposed = parse_ok("P = \"x\" ~ \"y\"");
        assert_eq!(expand(&transposed, "P", 2), ["\"x\" \"y\"", "\"y\" \"x\""]);
        let plain = parse_ok("P = \"x\" \"y\"");
        assert_eq!(expand(&plain, "P", 2), ["\"x\" \"y\""]);
    }

    #[test]
    fn alternatives_union_and_deduplicate() {
        let patterns = parse_ok("P = A | \"x\" | A");
        assert_eq!(expand(&patterns, "P", 1), ["\"x\"", "<class=A>"]);
    }

    #[test]
    fn agreement_condition_reaches_the_last_word() {
        let patterns = parse_ok("Agree = A N << A = N >>");
        let reference = patterns.pattern_reference("Agree", 0).unwrap();
        let mut context = BuildContext::new(&patterns);
        let variants = patterns
            .resolve_reference(reference)
            .unwrap()
            .build(&mut context, 2);
        assert_eq!(variants.len(), 1);
        let words = &variants.0[0].words;
        assert!(words[0].conditions.is_empty());
        assert_eq!(words[1].conditions.len(), 1);
        let condition = &words[1].conditions[0];
        assert_eq!(condition.kind, ConditionKind::Agreement);
        assert!(!condition.strong);
        assert_eq!(condition.offsets.as_slice(), [1, 0]);
    }

    #[test]
    fn sign_scoped_agreement_uses_that_sign() {
        let patterns = parse_ok("Agree = A N << A.case == N.case >>");
        let reference = patterns.pattern_reference("Agree", 0).unwrap();
        let mut context = BuildContext::new(&patterns);
        let variants = patterns
            .resolve_reference(reference)
            .unwrap()
            .build(&mut context, 2);
        let condition = &variants.0[0].words[1].conditions[0];
        assert!(condition.strong);
        // `case` sits at index 2 after schema reordering.
        assert_eq!(condition.param, 2);
    }

    #[test]
    fn dictionary_condition_groups() {
        let patterns = parse_ok("P = A N V << verbs(V, A N) >>");
        let reference = patterns.pattern_reference("P", 0).unwrap();
        let mut context = BuildContext::new(&patterns);
        let variants = patterns
            .resolve_reference(reference)
            .unwrap()
            .build(&mut context, 3);
        let condition = &variants.0[0].words[2].conditions[0];
        assert_eq!(condition.kind, ConditionKind::Dictionary);
        assert_eq!(
            condition.offsets.as_slice(),
            [0, WordCondition::OFFSET_MAX, 2, 1],
        );
    }

    #[test]
    fn forward_references_resolve() {
        let patterns = parse_ok("Top = Sub V\n\nSub = A N");
        assert_eq!(
            expand(&patterns, "Top", 4),
            ["<class=A> <class=N> <class=V>"],
        );
    }

    #[test]
    fn reference_arguments_rebind_to_the_caller() {
        let patterns = parse_ok("Sub(N1) = A N1\n\nTop(Sub.N1) = Sub");
        let top = patterns.pattern_reference("Top", 0).unwrap();
        let pattern = patterns.resolve_reference(top).unwrap();
        let mut context = BuildContext::new(&patterns);
        let variants = pattern.build(&mut context, 4);
        assert_eq!(variants.len(), 1);
        let words = &variants.0[0].words;
        assert!(!words[0].id.defined());
        assert!(words[1].id.defined());
        assert_eq!(words[1].id.reference, top);
        // Argument position 0 with base value N (id 1).
        assert_eq!(words[1].id.element, 1);
    }

    #[test]
    fn self_recursion_is_bounded() {
        let patterns = parse_ok("P = N | N P");
        let renderings = expand(&patterns, "P", 3);
        assert_eq!(
            renderings,
            [
                "<class=N>",
                "<class=N> <class=N>",
                "<class=N> <class=N> <class=N>",
            ],
        );
    }

    #[test]
    fn text_extraction_tail_is_validated_and_discarded() {
        let patterns = parse_ok("P = A N = text > \"x\" #N A<case nom>");
        assert_eq!(expand(&patterns, "P", 2), ["<class=A> <class=N>"]);
    }

    #[test]
    fn unknown_names_are_diagnosed() {
        let (_, errors) = parse("P = Q");
        assert!(errors.has_any_errors());

        let (_, errors) = parse("P = A<tense=past>");
        assert!(errors.has_any_errors());

        let (_, errors) = parse("P = A<case=dative>");
        assert!(errors.has_any_errors());
    }

    #[test]
    fn missing_equals_is_diagnosed() {
        let (_, errors) = parse("P A N");
        assert!(errors.has_any_errors());
    }

    #[test]
    fn bad_repetition_bounds_are_diagnosed() {
        let (_, errors) = parse("P = { A }<3,2>");
        assert!(errors.has_any_errors());
        let (_, errors) = parse("P = { A }<0,300>");
        assert!(errors.has_any_errors());
    }

    #[test]
    fn duplicate_pattern_names_are_diagnosed() {
        let (patterns, errors) = parse("P = A\n\nP = N");
        assert!(errors.has_any_errors());
        assert_eq!(patterns.len(), 1);
    }

    #[test]
    fn inconsistent_equality_mixing_is_reported_but_not_fatal() {
        let (patterns, errors) = parse("P = A N V << A = N == V >>");
        assert!(errors.has_any_errors());
        // The pattern itself still parses.
        assert_eq!(patterns.iter().count(), 1);
    }

    #[test]
    fn one_bad_definition_does_not_hide_the_next() {
        let (patterns, errors) = parse("P = Q\n\nR = A");
        assert!(errors.has_any_errors());
        assert!(patterns.pattern_reference("R", 0).is_some());
        assert_eq!(expand(&patterns, "R", 1), ["<class=A>"]);
    }

    #[test]
    fn string_sign_values_are_interned() {
        let patterns = parse_ok("P = N<lemma=машина>");
        assert_eq!(patterns.string_index("машина"), Some(0));
        assert_eq!(expand(&patterns, "P", 1), ["<class=N,lemma=машина>"]);
    }
}
