/// Line lexer: classifies grammar source lines as symbol headers or rules.

use std::iter::Enumerate;
use std::str::Lines;

use crate::core::escape::ESCAPE_CHAR;
use crate::core::grammar::{SyntaxError, SyntaxErrorKind};

/// Starts a comment that runs to the end of the line, unless escaped.
pub const COMMENT_MARKER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// A zero-indent line opening a symbol; holds the trimmed name.
    Header(&'a str),
    /// An indented line belonging to the current symbol.
    Rule {
        /// Leading whitespace width, in characters.
        indent: usize,
        /// Rule text with indentation, comment and trailing space removed.
        text: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number.
    pub number: usize,
    pub kind: LineKind<'a>,
}

/// Iterator over the meaningful lines of grammar source.
///
/// Blank and comment-only lines are skipped and leave the current symbol
/// block open. The first rule of a block fixes its indentation; a sibling
/// rule with a different width is a `BadIndentation` error, after which
/// lexing continues with the established width.
pub struct Lexer<'a> {
    lines: Enumerate<Lines<'a>>,
    current_symbol: Option<&'a str>,
    block_indent: Option<usize>,
}

pub fn lex(source: &str) -> Lexer<'_> {
    Lexer {
        lines: source.lines().enumerate(),
        current_symbol: None,
        block_indent: None,
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Line<'a>, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        for (i, raw) in self.lines.by_ref() {
            let number = i + 1;
            let content = strip_comment(raw).trim_end();
            if content.trim_start().is_empty() {
                continue;
            }

            let body = content.trim_start();
            let indent = content.chars().count() - body.chars().count();

            if indent == 0 {
                self.current_symbol = Some(body);
                self.block_indent = None;
                return Some(Ok(Line {
                    number,
                    kind: LineKind::Header(body),
                }));
            }

            if let Some(symbol) = self.current_symbol {
                match self.block_indent {
                    None => self.block_indent = Some(indent),
                    Some(expected) if expected != indent => {
                        return Some(Err(SyntaxError::at(
                            number,
                            1,
                            SyntaxErrorKind::BadIndentation {
                                symbol: symbol.to_string(),
                                expected,
                                found: indent,
                            },
                        )));
                    }
                    Some(_) => {}
                }
            }

            return Some(Ok(Line {
                number,
                kind: LineKind::Rule { indent, text: body },
            }));
        }
        None
    }
}

/// Cut `line` at the first unescaped comment marker.
pub fn strip_comment(line: &str) -> &str {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE_CHAR {
            escaped = true;
        } else if c == COMMENT_MARKER {
            return &line[..i];
        }
    }
    line
}
