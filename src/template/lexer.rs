//! Placeholder lexer for template bodies using logos
//!
//! A body is split into literal text and substitution points. Two forms are
//! recognised: `%name`, which is greedy over identifier characters, and
//! `%{name}`, which delimits the name explicitly so it can be followed by
//! identifier text (`'%{x}px'`). A `%` that starts neither form is literal.

use logos::Logos;

use crate::error::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Segment {
    #[regex(r"%[A-Za-z_][A-Za-z0-9_]*")]
    Placeholder,

    #[regex(r"%\{[A-Za-z_][A-Za-z0-9_]*\}")]
    Delimited,

    #[token("%")]
    Percent,

    #[regex(r"[^%]+")]
    Text,
}

/// A piece of a template body
#[derive(Debug, Clone, PartialEq)]
pub enum Piece<'a> {
    /// Literal text, copied to the output unchanged
    Text(&'a str),
    /// A substitution point and where it sits in the body
    Placeholder { name: &'a str, span: Span },
}

/// Split a template body into pieces, in order
pub fn scan(body: &str) -> impl Iterator<Item = Piece<'_>> + '_ {
    Segment::lexer(body).spanned().map(move |(segment, span)| {
        let slice = &body[span.clone()];
        match segment {
            Ok(Segment::Placeholder) => Piece::Placeholder {
                name: &slice[1..],
                span,
            },
            Ok(Segment::Delimited) => Piece::Placeholder {
                name: &slice[2..slice.len() - 1],
                span,
            },
            Ok(Segment::Percent) | Ok(Segment::Text) | Err(_) => Piece::Text(slice),
        }
    })
}

/// All placeholder references in a body, with their spans
pub fn references(body: &str) -> Vec<(&str, Span)> {
    scan(body)
        .filter_map(|piece| match piece {
            Piece::Placeholder { name, span } => Some((name, span)),
            Piece::Text(_) => None,
        })
        .collect()
}
