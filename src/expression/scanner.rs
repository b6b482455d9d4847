//! Paren- and quote-aware scanning of expression text.
//!
//! The scanner never tokenizes the whole input. It answers narrow questions
//! about a piece of text: where its top-level operator of a given precedence
//! class is, whether it is wrapped in parentheses, whether it is a function
//! call and what its arguments are. All positions it reports are byte offsets
//! of ASCII characters, so slicing at them is always valid UTF-8.

use crate::expression::operator::{BinaryOperator, PrecedenceClass};
use crate::expression::{ExpressionError, ExpressionResult};

const QUOTE: u8 = b'\'';

/// A binary split of expression text around one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    pub operator: BinaryOperator,
    pub left: &'a str,
    pub right: &'a str,
}

/// Remove whitespace that is not inside a quoted literal
pub fn strip_whitespace(text: &str) -> String {
    let mut in_quote = false;
    text.chars()
        .filter(|c| {
            if *c == '\'' {
                in_quote = !in_quote;
            }
            in_quote || !c.is_whitespace()
        })
        .collect()
}

/// Verify that parentheses balance and quotes are closed
pub fn check_balanced(text: &str) -> ExpressionResult<()> {
    let mut depth = 0i32;
    let mut in_quote = false;
    for b in text.bytes() {
        match b {
            QUOTE => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ExpressionError::MismatchedParentheses {
            expression: text.to_string(),
        });
    }
    if in_quote {
        return Err(ExpressionError::invalid(text, "unterminated string literal"));
    }
    Ok(())
}

/// Index of the parenthesis closing the one opened at `open`
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_quote = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            QUOTE => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether the whole text is one parenthesized group
pub fn is_fully_parenthesized(text: &str) -> bool {
    !text.is_empty() && matching_paren(text, 0) == Some(text.len() - 1)
}

/// Strip fully wrapping parenthesis layers: `((a+b))` becomes `a+b`, while
/// `(a)+(b)` is left alone.
pub fn strip_outer_parens(mut text: &str) -> &str {
    while is_fully_parenthesized(text) {
        text = &text[1..text.len() - 1];
    }
    text
}

/// Recognize `name(body)` where the parenthesis after the name closes at the
/// last character. Names start with a letter. Returns the name and the body.
pub fn function_call(text: &str) -> Option<(&str, &str)> {
    let starts_alphabetic = text
        .bytes()
        .next()
        .map(|b| b.is_ascii_alphabetic())
        .unwrap_or(false);
    let name_len = text
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if !starts_alphabetic || text.as_bytes().get(name_len) != Some(&b'(') {
        return None;
    }
    let close = matching_paren(text, name_len)?;
    if close != text.len() - 1 {
        return None;
    }
    Some((&text[..name_len], &text[name_len + 1..close]))
}

/// Split a function body on its top-level commas. An empty body has no arguments.
pub fn split_arguments(body: &str) -> Vec<&str> {
    if body.is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;
    for (i, b) in body.bytes().enumerate() {
        match b {
            QUOTE => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            b',' if !in_quote && depth == 0 => {
                args.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(&body[start..]);
    args
}

/// Find the top-level operator of `class` to split `text` at.
///
/// Index 0 is never a split point. Left-associative classes report their last
/// top-level match, power reports its first.
pub fn find_operator(text: &str, class: PrecedenceClass) -> Option<Split<'_>> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut found: Option<(usize, &'static str)> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            QUOTE => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            _ if in_quote || depth != 0 || i == 0 => {}
            _ => {
                if let Some(token) = token_at(bytes, i, class) {
                    if is_binary_position(text, i, token) {
                        found = Some((i, token));
                        if !class.splits_at_last() {
                            break;
                        }
                        i += token.len();
                        continue;
                    }
                }
            }
        }
        i += 1;
    }

    let (at, token) = found?;
    Some(Split {
        operator: BinaryOperator::from_token(token)?,
        left: &text[..at],
        right: &text[at + token.len()..],
    })
}

/// First top-level operator in the lowest class that has one
pub fn find_any_operator(text: &str) -> Option<Split<'_>> {
    PrecedenceClass::ORDER
        .iter()
        .find_map(|class| find_operator(text, *class))
}

fn token_at(bytes: &[u8], i: usize, class: PrecedenceClass) -> Option<&'static str> {
    class
        .tokens()
        .iter()
        .copied()
        .find(|token| bytes[i..].starts_with(token.as_bytes()))
}

/// A `+` or `-` right after another operator, an open paren or a comma is a
/// sign; one right after the exponent marker of a number literal belongs to
/// the literal.
fn is_binary_position(text: &str, i: usize, token: &str) -> bool {
    if token != "+" && token != "-" {
        return true;
    }
    let bytes = text.as_bytes();
    let prev = bytes[i - 1];
    if b"+-*/^<>=!&|(,".contains(&prev) {
        return false;
    }
    if prev == b'e' || prev == b'E' {
        let start = text[..i]
            .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_'))
            .map(|p| p + 1)
            .unwrap_or(0);
        let mantissa = &text[start..i - 1];
        let numeric_start = mantissa
            .bytes()
            .next()
            .map(|b| b.is_ascii_digit() || b == b'.')
            .unwrap_or(false);
        if numeric_start && mantissa.parse::<f64>().is_ok() {
            return false;
        }
    }
    true
}
