//! Character-based string functions.

use super::{integral, Invocation};
use crate::column::TypedColumn;
use crate::expression::broadcast::Broadcast;
use crate::expression::ExpressionResult;

/// `substr(s, start, length)`. Out-of-range bounds clamp to the string.
pub fn substring(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let name = invocation.name;
    let text = invocation.strings(0)?;
    let starts = invocation.floats(1)?;
    let lengths = invocation.floats(2)?;
    let shape = Broadcast::new(name, &[text.len(), starts.len(), lengths.len()])?;
    (0..shape.len())
        .map(|i| {
            let start = integral(name, starts[shape.index(1, i)])?.max(0) as usize;
            let length = integral(name, lengths[shape.index(2, i)])?.max(0) as usize;
            Ok(text[shape.index(0, i)]
                .chars()
                .skip(start)
                .take(length)
                .collect::<String>())
        })
        .collect::<ExpressionResult<Vec<_>>>()
        .map(TypedColumn::String)
}

fn char_position(haystack: &str, needle: &str) -> i64 {
    haystack
        .find(needle)
        .map(|byte| haystack[..byte].chars().count() as i64)
        .unwrap_or(-1)
}

fn pairwise(
    invocation: &Invocation<'_, '_>,
    f: fn(&str, &str) -> i64,
) -> ExpressionResult<TypedColumn> {
    let text = invocation.strings(0)?;
    let target = invocation.strings(1)?;
    let shape = Broadcast::new(invocation.name, &[text.len(), target.len()])?;
    Ok(TypedColumn::Int64(
        (0..shape.len())
            .map(|i| f(&text[shape.index(0, i)], &target[shape.index(1, i)]))
            .collect(),
    ))
}

/// `strPos(s, target)`: character index of the first match, or -1
pub fn position(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    pairwise(invocation, char_position)
}

/// `strCount(s, target)`: non-overlapping matches; an empty target never matches
pub fn count(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    pairwise(invocation, |haystack, needle| {
        if needle.is_empty() {
            0
        } else {
            haystack.matches(needle).count() as i64
        }
    })
}

pub fn length(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let text = invocation.strings(0)?;
    Ok(TypedColumn::Int64(
        text.iter().map(|s| s.chars().count() as i64).collect(),
    ))
}

pub fn upper(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let text = invocation.strings(0)?;
    Ok(TypedColumn::String(text.iter().map(|s| s.to_uppercase()).collect()))
}

pub fn lower(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let text = invocation.strings(0)?;
    Ok(TypedColumn::String(text.iter().map(|s| s.to_lowercase()).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::functions::testing::{call, floats, strings};

    #[test]
    fn test_substring_clamps() {
        let s = strings(&["héllo", "ab"]);
        assert_eq!(
            call("substr", substring, &[s.clone(), floats(&[1.0]), floats(&[3.0])]).unwrap(),
            strings(&["éll", "b"])
        );
        assert_eq!(
            call("substr", substring, &[s, floats(&[-2.0]), floats(&[100.0])]).unwrap(),
            strings(&["héllo", "ab"])
        );
        assert!(call(
            "substr",
            substring,
            &[strings(&["abc"]), floats(&[0.5]), floats(&[1.0])]
        )
        .is_err());
    }

    #[test]
    fn test_position_counts_characters() {
        assert_eq!(
            call("strPos", position, &[strings(&["日本語", "abc"]), strings(&["語"])]).unwrap(),
            TypedColumn::Int64(vec![2, -1])
        );
    }

    #[test]
    fn test_count_non_overlapping() {
        assert_eq!(
            call("strCount", count, &[strings(&["aaaa", "abc"]), strings(&["aa", ""])]).unwrap(),
            TypedColumn::Int64(vec![2, 0])
        );
    }

    #[test]
    fn test_case_and_length() {
        let s = strings(&["Mixed", ""]);
        assert_eq!(
            call("strLen", length, &[s.clone()]).unwrap(),
            TypedColumn::Int64(vec![5, 0])
        );
        assert_eq!(call("upper", upper, &[s.clone()]).unwrap(), strings(&["MIXED", ""]));
        assert_eq!(call("lower", lower, &[s]).unwrap(), strings(&["mixed", ""]));
    }
}
