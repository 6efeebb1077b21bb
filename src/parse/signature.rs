//! Decoding of printed signatures back into [`ColoredTree`]s.
//!
//! ```text
//! node   := '[' symbol (',' color)? ']' branch?
//! branch := '(' child+ ')'
//! child  := edge-label node
//! ```

use nom::{
    bytes::complete::take_while,
    character::complete::char,
    combinator::{cut, map_res, opt},
    error::{ErrorKind, FromExternalError, ParseError as NomParseError},
    sequence::{delimited, pair, preceded},
    IResult,
};
use thiserror::Error;

use crate::{
    ColoredTree, COLOR_SEPARATOR, END_BRANCH_SYMBOL, END_NODE_SYMBOL, START_BRANCH_SYMBOL,
    START_NODE_SYMBOL,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Signature string is empty")]
    Empty,
    #[error("Unbalanced brackets at offset {offset}")]
    Unbalanced { offset: usize },
    #[error("Invalid color tag `{tag}` at offset {offset}")]
    InvalidColor { tag: String, offset: usize },
    #[error("Unexpected character `{found}` at offset {offset}")]
    UnexpectedCharacter { found: char, offset: usize },
}

/// Where parsing stopped, and whether it stopped inside a color tag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DecodeError<'a> {
    input: &'a str,
    in_color: bool,
}

impl<'a> NomParseError<&'a str> for DecodeError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            in_color: false,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DecodeError<'a> {
    fn from_external_error(input: &'a str, _kind: ErrorKind, _e: E) -> Self {
        Self {
            input,
            in_color: true,
        }
    }
}

type Res<'a, T> = IResult<&'a str, T, DecodeError<'a>>;

fn is_reserved(c: char) -> bool {
    c == START_NODE_SYMBOL
        || c == END_NODE_SYMBOL
        || c == START_BRANCH_SYMBOL
        || c == END_BRANCH_SYMBOL
}

/// Color tags are positive integers written without a sign or leading zeros, so that
/// printing a decoded tree gives back the same text.
fn color_value(tag: &str) -> Result<usize, &'static str> {
    if tag.is_empty() || tag.starts_with('0') || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return Err("color tags are positive integers");
    }
    tag.parse::<usize>().map_err(|_| "color tag out of range")
}

fn parse_color(input: &str) -> Res<usize> {
    map_res(take_while(|c: char| !is_reserved(c)), color_value)(input)
}

/// `[symbol]` or `[symbol,color]`, without any branch that follows.
fn parse_atom(input: &str) -> Res<(&str, usize)> {
    let (input, (symbol, color)) = delimited(
        char(START_NODE_SYMBOL),
        pair(
            take_while(|c: char| !is_reserved(c) && c != COLOR_SEPARATOR),
            opt(preceded(char(COLOR_SEPARATOR), cut(parse_color))),
        ),
        cut(char(END_NODE_SYMBOL)),
    )(input)?;
    Ok((input, (symbol, color.unwrap_or(0))))
}

/// An edge label followed by an atom.
fn parse_child_atom(input: &str) -> Res<(&str, (&str, usize))> {
    pair(take_while(|c: char| !is_reserved(c)), parse_atom)(input)
}

/// Decode a signature string into a tree, keeping child order and color tags as written.
///
/// Atoms are parsed with nom while branches are tracked on an explicit stack, so the
/// nesting depth is bounded by memory rather than by the call stack.
pub fn parse_signature(signature: &str) -> Result<ColoredTree, ParseError> {
    if signature.is_empty() {
        return Err(ParseError::Empty);
    }

    let (mut rest, (symbol, color)) =
        parse_atom(signature).map_err(|e| failure(signature, e))?;
    let mut tree = ColoredTree::new(symbol, color);
    let mut current = tree.root();
    // Nodes whose branch is open, innermost last.
    let mut open: Vec<usize> = Vec::new();

    loop {
        if let Some(after) = rest.strip_prefix(START_BRANCH_SYMBOL) {
            open.push(current);
            rest = after;
        } else {
            while !open.is_empty() {
                match rest.strip_prefix(END_BRANCH_SYMBOL) {
                    Some(after) => {
                        open.pop();
                        rest = after;
                    }
                    None => break,
                }
            }
            if open.is_empty() {
                if rest.is_empty() {
                    return Ok(tree);
                }
                return Err(classify(
                    signature,
                    DecodeError {
                        input: rest,
                        in_color: false,
                    },
                ));
            }
        }

        let parent = open[open.len() - 1];
        let (after, (edge_label, (symbol, color))) =
            parse_child_atom(rest).map_err(|e| failure(signature, e))?;
        current = tree.add_child(parent, edge_label, symbol, color);
        rest = after;
    }
}

fn failure(signature: &str, error: nom::Err<DecodeError>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => classify(signature, e),
        nom::Err::Incomplete(_) => ParseError::Unbalanced {
            offset: signature.len(),
        },
    }
}

fn classify(signature: &str, error: DecodeError) -> ParseError {
    let offset = signature.len() - error.input.len();
    if error.in_color {
        let tag = error
            .input
            .split(|c: char| is_reserved(c))
            .next()
            .unwrap_or_default();
        return ParseError::InvalidColor {
            tag: tag.to_string(),
            offset,
        };
    }

    match error.input.chars().next() {
        None => ParseError::Unbalanced { offset },
        Some(c) if c == END_NODE_SYMBOL || c == END_BRANCH_SYMBOL => {
            ParseError::Unbalanced { offset }
        }
        Some(found) => ParseError::UnexpectedCharacter { found, offset },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_node() {
        let tree = parse_signature("[C]").unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.node(0).label, "C");
        assert_eq!(tree.node(0).color, 0);
    }

    #[test]
    fn test_parse_colors_and_edge_labels() {
        let tree = parse_signature("[C](=[O][C,12](-[N,3]))").unwrap();
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.node(1).edge_label, "=");
        assert_eq!(tree.node(1).label, "O");
        assert_eq!(tree.node(2).edge_label, "");
        assert_eq!(tree.node(2).color, 12);
        assert_eq!(tree.node(3).edge_label, "-");
        assert_eq!(tree.node(3).color, 3);
        assert_eq!(tree.node(3).parent, Some(2));
        assert_eq!(tree.node(0).children, vec![1, 2]);
    }

    #[test]
    fn test_parse_empty_symbol() {
        let tree = parse_signature("[]([,1])").unwrap();
        assert_eq!(tree.node(0).label, "");
        assert_eq!(tree.node(1).color, 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_signature(""), Err(ParseError::Empty));
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(parse_signature("[C"), Err(ParseError::Unbalanced { offset: 2 }));
        assert_eq!(parse_signature("[C]("), Err(ParseError::Unbalanced { offset: 4 }));
        assert_eq!(parse_signature("[C]([H]"), Err(ParseError::Unbalanced { offset: 7 }));
        assert_eq!(parse_signature("[C]]"), Err(ParseError::Unbalanced { offset: 3 }));
        assert_eq!(parse_signature("[C]([H]))"), Err(ParseError::Unbalanced { offset: 8 }));
        assert_eq!(parse_signature("[C]()"), Err(ParseError::Unbalanced { offset: 4 }));
    }

    #[test]
    fn test_invalid_color() {
        assert_eq!(
            parse_signature("[C,x]"),
            Err(ParseError::InvalidColor {
                tag: "x".to_string(),
                offset: 3
            })
        );
        assert_eq!(
            parse_signature("[C]([H,])"),
            Err(ParseError::InvalidColor {
                tag: String::new(),
                offset: 7
            })
        );
        assert!(matches!(
            parse_signature("[C,0]"),
            Err(ParseError::InvalidColor { .. })
        ));
        assert!(matches!(
            parse_signature("[C,+1]"),
            Err(ParseError::InvalidColor { .. })
        ));
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            parse_signature("C"),
            Err(ParseError::UnexpectedCharacter { found: 'C', offset: 0 })
        );
        assert_eq!(
            parse_signature("[C]x"),
            Err(ParseError::UnexpectedCharacter { found: 'x', offset: 3 })
        );
        assert_eq!(
            parse_signature("[C(]"),
            Err(ParseError::UnexpectedCharacter { found: '(', offset: 2 })
        );
    }

    #[test]
    fn test_deeply_nested_path() {
        let depth = 10_000;
        let text = format!(
            "{}[C]{}",
            "[C](".repeat(depth),
            ")".repeat(depth)
        );
        let tree = parse_signature(&text).unwrap();
        assert_eq!(tree.node_count(), depth + 1);
        assert_eq!(tree.height(), depth);
        assert_eq!(tree.to_string(), text);

        let unclosed = &text[..text.len() - 1];
        assert_eq!(
            parse_signature(unclosed),
            Err(ParseError::Unbalanced {
                offset: unclosed.len()
            })
        );
    }
}
