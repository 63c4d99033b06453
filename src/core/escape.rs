/// Escape handling: resolves backslash sequences before syntax scanning.
///
/// The scanners in the parser only treat a character as syntax when it
/// was not escaped, so `\[` stays a literal bracket all the way through.

use crate::core::grammar::{SyntaxError, SyntaxErrorKind};

pub const ESCAPE_CHAR: char = '\\';

/// Characters that carry syntax somewhere in a rule and may be escaped.
pub const SPECIAL_CHARS: &[char] = &['[', ']', '^', '|', '"', '\'', '\\', '#'];

/// A character of rule text with its escape state and source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleChar {
    pub ch: char,
    pub escaped: bool,
    pub column: usize,
}

impl RuleChar {
    /// True when this is the unescaped syntax character `c`.
    pub fn is(&self, c: char) -> bool {
        !self.escaped && self.ch == c
    }

    pub fn is_whitespace(&self) -> bool {
        !self.escaped && self.ch.is_whitespace()
    }
}

/// Resolve escapes in `text`. `first_column` is the 1-based column of the
/// first character of `text` within its source line.
pub fn unescape(
    text: &str,
    line: usize,
    first_column: usize,
) -> Result<Vec<RuleChar>, SyntaxError> {
    let mut chars = Vec::with_capacity(text.len());
    let mut iter = text.chars().enumerate();

    while let Some((offset, c)) = iter.next() {
        let column = first_column + offset;
        if c != ESCAPE_CHAR {
            chars.push(RuleChar {
                ch: c,
                escaped: false,
                column,
            });
            continue;
        }

        let resolved = match iter.next() {
            Some((_, 'n')) => '\n',
            Some((_, 't')) => '\t',
            Some((_, next)) if SPECIAL_CHARS.contains(&next) => next,
            Some((_, next)) => {
                return Err(SyntaxError::at(
                    line,
                    column,
                    SyntaxErrorKind::UnknownEscape(next),
                ))
            }
            None => {
                return Err(SyntaxError::at(
                    line,
                    column,
                    SyntaxErrorKind::DanglingEscape,
                ))
            }
        };
        chars.push(RuleChar {
            ch: resolved,
            escaped: true,
            column,
        });
    }

    Ok(chars)
}

/// Collect resolved characters back into plain text.
pub fn text(chars: &[RuleChar]) -> String {
    chars.iter().map(|c| c.ch).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn plain_text_passes_through() {
        let chars = unescape("a [b]", 1, 1).unwrap();
        assert_eq!(text(&chars), "a [b]");
        assert!(chars.iter().all(|c| !c.escaped));
        assert_eq!(chars[2].column, 3);
        assert!(chars[2].is('['));
    }

    #[rstest]
    #[case("\\[", '[')]
    #[case("\\]", ']')]
    #[case("\\^", '^')]
    #[case("\\|", '|')]
    #[case("\\\"", '"')]
    #[case("\\'", '\'')]
    #[case("\\\\", '\\')]
    #[case("\\#", '#')]
    #[case("\\n", '\n')]
    #[case("\\t", '\t')]
    fn escapes_resolve_to_literal(#[case] input: &str, #[case] expected: char) {
        let chars = unescape(input, 1, 1).unwrap();
        assert_eq!(chars.len(), 1);
        assert_eq!(chars[0].ch, expected);
        assert!(chars[0].escaped);
        assert!(!chars[0].is(expected));
    }

    #[test]
    fn escaped_block_is_not_syntax() {
        let chars = unescape("\\[not a block\\]", 1, 5).unwrap();
        assert_eq!(text(&chars), "[not a block]");
        assert!(!chars.iter().any(|c| c.is('[') || c.is(']')));
        assert_eq!(chars[0].column, 5);
    }

    #[test]
    fn unknown_escape_is_error() {
        let err = unescape("ab\\q", 4, 2).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.column, Some(4));
        assert_eq!(err.kind, SyntaxErrorKind::UnknownEscape('q'));
    }

    #[test]
    fn trailing_escape_is_error() {
        let err = unescape("ab\\", 1, 1).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::DanglingEscape);
    }
}
