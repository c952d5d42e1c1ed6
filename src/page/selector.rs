//! CSS selector subset for the in-memory page
//!
//! Supported: type and universal selectors, `#id`, `.class`, `[attr]`,
//! `[attr=value]`, descendant and child (`>`) combinators, and `,` groups.
//! Anything else is rejected the way a browser rejects an invalid selector.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use logos::Logos;
use thiserror::Error;

use super::dom::{Document, NodeId};
use crate::error::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[regex(r"-?[A-Za-z_][A-Za-z0-9_-]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Quoted(String),

    #[token("#")]
    Hash,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("=")]
    Equals,

    // Whitespace around `>` and `,` belongs to the punctuation
    #[regex(r"[ \t\r\n\f]*>[ \t\r\n\f]*")]
    Child,
    #[regex(r"[ \t\r\n\f]*,[ \t\r\n\f]*")]
    Comma,
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,
}

/// The selector could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{selector}' is not a valid selector")]
pub struct SelectorError {
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq)]
struct Compound(Vec<Part>);

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    first: Compound,
    rest: Vec<(Combinator, Compound)>,
}

/// A parsed selector group
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(Vec<Complex>);

fn lex(input: &str) -> Option<Vec<(Token, Span)>> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| tok.ok().map(|t| (t, span)))
        .collect()
}

impl SelectorList {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let invalid = || SelectorError {
            selector: selector.to_string(),
        };
        let input = selector.trim();
        let len = input.len();
        let tokens = lex(input).ok_or_else(invalid)?;

        let token_stream = Stream::from_iter(tokens.into_iter().map(|(t, s)| (t, s.into())))
            .map((len..len).into(), |(t, s): (_, _)| (t, s));

        selector_parser()
            .parse(token_stream)
            .into_result()
            .map_err(|_| invalid())
    }

    /// Whether an element matches any selector in the group
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.tag(node).is_some() && self.0.iter().any(|complex| complex.matches(doc, node))
    }
}

fn selector_parser<'a, I>() -> impl Parser<'a, I, SelectorList, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let ident = select! {
        Token::Ident(s) => s,
    };

    let value = select! {
        Token::Ident(s) => s,
        Token::Quoted(s) => s,
    };

    let type_selector = choice((
        just(Token::Star).to(Part::Universal),
        ident
            .clone()
            .map(|name: String| Part::Type(name.to_ascii_lowercase())),
    ));

    let attribute = ident
        .clone()
        .then(just(Token::Equals).ignore_then(value).or_not())
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
        .map(|(name, value)| Part::Attribute {
            name: name.to_ascii_lowercase(),
            value,
        });

    let qualifier = choice((
        just(Token::Hash).ignore_then(ident.clone()).map(Part::Id),
        just(Token::Dot).ignore_then(ident).map(Part::Class),
        attribute,
    ));

    let compound = type_selector
        .or_not()
        .then(qualifier.repeated().collect::<Vec<_>>())
        .try_map(|(head, rest), span| {
            if head.is_none() && rest.is_empty() {
                return Err(Rich::custom(span, "expected a selector"));
            }
            Ok(Compound(head.into_iter().chain(rest).collect()))
        });

    let combinator = choice((
        just(Token::Child).to(Combinator::Child),
        just(Token::Whitespace).to(Combinator::Descendant),
    ));

    let complex = compound
        .clone()
        .then(combinator.then(compound).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| Complex { first, rest });

    complex
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(SelectorList)
}

impl Part {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            Part::Universal => true,
            Part::Type(name) => doc.tag(node) == Some(name.as_str()),
            Part::Id(id) => doc.attribute(node, "id") == Some(id.as_str()),
            Part::Class(class) => doc.has_class(node, class),
            Part::Attribute { name, value } => match (doc.attribute(node, name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.0.iter().all(|part| part.matches(doc, node))
    }
}

impl Complex {
    fn compound(&self, index: usize) -> &Compound {
        if index == 0 {
            &self.first
        } else {
            &self.rest[index - 1].1
        }
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.rest.len())
    }

    // Right to left: `index` is the compound that must match `node`
    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.compound(index).matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.rest[index - 1].0 {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut ancestor = doc.parent(node);
                while let Some(candidate) = ancestor {
                    if self.matches_at(doc, candidate, index - 1) {
                        return true;
                    }
                    ancestor = doc.parent(candidate);
                }
                false
            }
        }
    }
}
