/// Grammar parser: groups lexed lines into symbols and compiles rule text.

use log::debug;
use rustc_hash::FxHashSet;

use crate::core::bracket;
use crate::core::escape::{self, RuleChar};
use crate::core::grammar::{
    Grammar, Rule, Segment, Symbol, SyntaxError, SyntaxErrorKind, DEFAULT_WEIGHT,
};
use crate::core::lexer::{self, Line, LineKind};

/// Compile grammar source, stopping at the first structural defect.
pub fn parse(source: &str) -> Result<Grammar, SyntaxError> {
    let (symbols, mut errors) = compile(source, true);
    if !errors.is_empty() {
        return Err(errors.swap_remove(0));
    }
    Ok(finish(symbols))
}

/// Compile grammar source, collecting every structural defect before
/// reporting. Used by validate-only tooling.
pub fn parse_validated(source: &str) -> Result<Grammar, Vec<SyntaxError>> {
    let (symbols, errors) = compile(source, false);
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(finish(symbols))
}

/// Parse a standalone pattern, the body of a rule given as input rather
/// than read from a grammar. Errors are reported against line 1.
pub fn parse_pattern(pattern: &str) -> Result<Rule, SyntaxError> {
    parse_rule_text(pattern, 1, 1)
}

fn finish(symbols: Vec<Symbol>) -> Grammar {
    let rules: usize = symbols.iter().map(|s| s.rules.len()).sum();
    debug!("parsed grammar: {} symbols, {} rules", symbols.len(), rules);
    Grammar::from(symbols)
}

/// Where incoming rule lines go.
enum Block {
    /// No symbol header seen yet.
    None,
    Open(usize),
    /// The header was rejected; its rules are checked but dropped.
    Discarded,
}

struct Compiler {
    symbols: Vec<Symbol>,
    declared: FxHashSet<String>,
    block: Block,
    /// Whether the open block has seen a rule line, valid or not.
    saw_rule: bool,
    errors: Vec<SyntaxError>,
}

fn compile(source: &str, fail_fast: bool) -> (Vec<Symbol>, Vec<SyntaxError>) {
    let mut compiler = Compiler {
        symbols: Vec::new(),
        declared: FxHashSet::default(),
        block: Block::None,
        saw_rule: false,
        errors: Vec::new(),
    };

    for line in lexer::lex(source) {
        match line {
            Ok(line) => compiler.line(line),
            Err(err) => compiler.errors.push(err),
        }
        if fail_fast && !compiler.errors.is_empty() {
            return (compiler.symbols, compiler.errors);
        }
    }
    compiler.close_block();

    (compiler.symbols, compiler.errors)
}

impl Compiler {
    fn line(&mut self, line: Line<'_>) {
        match line.kind {
            LineKind::Header(name) => self.header(name, line.number),
            LineKind::Rule { indent, text } => self.rule(text, line.number, indent + 1),
        }
    }

    fn header(&mut self, name: &str, number: usize) {
        self.close_block();

        if !bracket::is_valid_symbol_name(name) {
            self.errors.push(SyntaxError::at(
                number,
                1,
                SyntaxErrorKind::InvalidSymbolName(name.to_string()),
            ));
            self.block = Block::Discarded;
        } else if !self.declared.insert(name.to_string()) {
            self.errors.push(SyntaxError::at(
                number,
                1,
                SyntaxErrorKind::DuplicateSymbol(name.to_string()),
            ));
            self.block = Block::Discarded;
        } else {
            self.symbols.push(Symbol {
                name: name.to_string(),
                rules: Vec::new(),
                line: number,
            });
            self.block = Block::Open(self.symbols.len() - 1);
        }
    }

    fn rule(&mut self, text: &str, number: usize, column: usize) {
        if let Block::None = self.block {
            self.errors.push(SyntaxError::at(
                number,
                column,
                SyntaxErrorKind::RuleBeforeSymbol,
            ));
            return;
        }
        self.saw_rule = true;

        match parse_rule_text(text, number, column) {
            Ok(rule) => {
                if let Block::Open(i) = self.block {
                    self.symbols[i].rules.push(rule);
                }
            }
            Err(err) => self.errors.push(err),
        }
    }

    fn close_block(&mut self) {
        if let Block::Open(i) = self.block {
            let symbol = &self.symbols[i];
            if symbol.rules.is_empty() && !self.saw_rule {
                self.errors.push(SyntaxError::new(
                    symbol.line,
                    SyntaxErrorKind::EmptySymbol(symbol.name.clone()),
                ));
            }
        }
        self.block = Block::None;
        self.saw_rule = false;
    }
}

/// Compile one rule's text. `column` is where the text starts on its line.
pub(crate) fn parse_rule_text(
    text: &str,
    line: usize,
    column: usize,
) -> Result<Rule, SyntaxError> {
    let chars = escape::unescape(text, line, column)?;
    parse_rule_chars(&chars, line)
}

/// Compile a rule body: segments followed by an optional `^weight`.
pub(crate) fn parse_rule_chars(chars: &[RuleChar], line: usize) -> Result<Rule, SyntaxError> {
    let (segments, weight) = parse_body(chars, line, true, 0)?;
    Ok(Rule::with_weight(segments, weight.unwrap_or(DEFAULT_WEIGHT)))
}

/// Split a body into literal and bracketed segments. With `allow_weight`,
/// an unescaped caret ends the body and must be followed by a weight.
/// `depth` is the number of brackets around the body.
pub(crate) fn parse_body(
    chars: &[RuleChar],
    line: usize,
    allow_weight: bool,
    depth: usize,
) -> Result<(Vec<Segment>, Option<f64>), SyntaxError> {
    let mut segments = Vec::new();
    let mut literal: Vec<RuleChar> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is('[') {
            flush_literal(&mut literal, &mut segments);
            let close = bracket::matching_bracket(chars, i, line)?;
            let interior = &chars[i + 1..close];
            segments.push(bracket::parse_block(interior, line, c.column, depth + 1)?);
            i = close + 1;
        } else if c.is(']') {
            return Err(SyntaxError::at(
                line,
                c.column,
                SyntaxErrorKind::UnbalancedBracket(']'),
            ));
        } else if c.is('^') {
            if !allow_weight {
                return Err(SyntaxError::at(
                    line,
                    c.column,
                    SyntaxErrorKind::UnexpectedText(escape::text(&chars[i..])),
                ));
            }
            let weight = parse_weight(&chars[i + 1..], line, c.column)?;
            while literal.last().is_some_and(RuleChar::is_whitespace) {
                literal.pop();
            }
            flush_literal(&mut literal, &mut segments);
            return Ok((segments, Some(weight)));
        } else {
            literal.push(c);
            i += 1;
        }
    }

    flush_literal(&mut literal, &mut segments);
    Ok((segments, None))
}

fn flush_literal(literal: &mut Vec<RuleChar>, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(escape::text(literal)));
        literal.clear();
    }
}

/// Parse the text after a caret as a non-negative decimal weight.
fn parse_weight(rest: &[RuleChar], line: usize, column: usize) -> Result<f64, SyntaxError> {
    let raw = escape::text(rest);
    let token = raw.trim();
    let malformed = || {
        SyntaxError::at(
            line,
            column,
            SyntaxErrorKind::MalformedWeight(token.to_string()),
        )
    };

    if rest.iter().any(|c| c.escaped) {
        return Err(malformed());
    }
    if let Some(magnitude) = token.strip_prefix('-') {
        if is_decimal(magnitude) {
            return Err(SyntaxError::at(
                line,
                column,
                SyntaxErrorKind::NegativeWeight(token.to_string()),
            ));
        }
    }
    if !is_decimal(token) {
        return Err(malformed());
    }
    match token.parse::<f64>() {
        Ok(weight) if weight.is_finite() => Ok(weight),
        _ => Err(malformed()),
    }
}

/// Digits with at most one decimal point: `4`, `0.5`, `.25`, `3.`.
fn is_decimal(token: &str) -> bool {
    let mut digits = 0;
    let mut points = 0;
    for c in token.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grammar::{Modifier, Reference, Target};
    use rstest::rstest;

    fn lit(text: &str) -> Segment {
        Segment::Literal(text.to_string())
    }

    fn sym(name: &str) -> Segment {
        Segment::Reference(Reference {
            target: Target::Symbol(name.to_string()),
            modifiers: vec![],
        })
    }

    #[test]
    fn parse_two_symbols() {
        let grammar = parse("output\n    a [noun]\nnoun\n    cat\n    dog\n").unwrap();
        assert_eq!(grammar.len(), 2);
        let output = grammar.symbol("output").unwrap();
        assert_eq!(output.line, 1);
        assert_eq!(output.rules, vec![Rule::new(vec![lit("a "), sym("noun")])]);
        let noun = grammar.symbol("noun").unwrap();
        assert_eq!(
            noun.rules,
            vec![Rule::new(vec![lit("cat")]), Rule::new(vec![lit("dog")])]
        );
    }

    #[rstest]
    #[case("string^0.5", "string", 0.5)]
    #[case("string ^0.5", "string", 0.5)]
    #[case("string ^4  ", "string", 4.0)]
    #[case("string^.25", "string", 0.25)]
    #[case("never ^0", "never", 0.0)]
    #[case("plain", "plain", 1.0)]
    fn rule_weights(#[case] text: &str, #[case] literal: &str, #[case] weight: f64) {
        let rule = parse_pattern(text).unwrap();
        assert_eq!(rule.segments, vec![lit(literal)]);
        assert_eq!(rule.weight, weight);
    }

    #[test]
    fn weight_after_reference() {
        let rule = parse_pattern("[noun] ^3").unwrap();
        assert_eq!(rule.segments, vec![sym("noun")]);
        assert_eq!(rule.weight, 3.0);
    }

    #[rstest]
    #[case("string ^-5", SyntaxErrorKind::NegativeWeight("-5".into()))]
    #[case("string ^abc", SyntaxErrorKind::MalformedWeight("abc".into()))]
    #[case("string ^", SyntaxErrorKind::MalformedWeight("".into()))]
    #[case("string ^1.2.3", SyntaxErrorKind::MalformedWeight("1.2.3".into()))]
    #[case("string ^2 [noun]", SyntaxErrorKind::MalformedWeight("2 [noun]".into()))]
    #[case("string ^2^3", SyntaxErrorKind::MalformedWeight("2^3".into()))]
    fn malformed_weights(#[case] text: &str, #[case] kind: SyntaxErrorKind) {
        assert_eq!(parse_pattern(text).unwrap_err().kind, kind);
    }

    #[test]
    fn overflowing_weight_is_malformed() {
        let digits = "9".repeat(400);
        let err = parse_pattern(&format!("heads ^{}", digits)).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::MalformedWeight(digits));

        let huge = format!("1{}", "0".repeat(308));
        let rule = parse_pattern(&format!("heads ^{}", huge)).unwrap();
        assert!(rule.weight.is_finite());
    }

    #[test]
    fn escaped_weight_is_literal() {
        let rule = parse_pattern("not a weight \\^2").unwrap();
        assert_eq!(rule.segments, vec![lit("not a weight ^2")]);
        assert_eq!(rule.weight, DEFAULT_WEIGHT);
    }

    #[test]
    fn escaped_block_is_literal() {
        let rule = parse_pattern("\\[not a block\\]").unwrap();
        assert_eq!(rule.segments, vec![lit("[not a block]")]);
    }

    #[test]
    fn unbalanced_brackets() {
        let err = parse_pattern("string [").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnbalancedBracket('['));
        assert_eq!(err.column, Some(8));

        let err = parse_pattern("string ]").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnbalancedBracket(']'));
    }

    #[test]
    fn modifier_chain_parsed() {
        let rule = parse_pattern("[animal.a.upper]").unwrap();
        assert_eq!(
            rule.segments,
            vec![Segment::Reference(Reference {
                target: Target::Symbol("animal".into()),
                modifiers: vec![Modifier::Article, Modifier::Upper],
            })]
        );
    }

    #[test]
    fn rule_before_symbol() {
        let err = parse("  orphan\nnoun\n  cat\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.kind, SyntaxErrorKind::RuleBeforeSymbol);
    }

    #[test]
    fn duplicate_symbol() {
        let err = parse("noun\n  cat\nnoun\n  dog\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, SyntaxErrorKind::DuplicateSymbol("noun".into()));
    }

    #[test]
    fn empty_symbol() {
        let err = parse("noun\nverb\n  run\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.kind, SyntaxErrorKind::EmptySymbol("noun".into()));

        let err = parse("noun\n  cat\nverb\n").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::EmptySymbol("verb".into()));
    }

    #[test]
    fn invalid_symbol_name() {
        let err = parse("big noun\n  cat\n").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidSymbolName("big noun".into()));
    }

    #[test]
    fn error_line_and_column_for_rule() {
        let err = parse("noun\n  cat\n  dog [x.q]\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.column, Some(10));
        assert_eq!(err.kind, SyntaxErrorKind::UnknownModifier("q".into()));
    }

    #[test]
    fn fail_fast_reports_first_defect() {
        let source = "noun\n  cat ^x\n  dog [\nnoun\n  cow\n";
        let err = parse(source).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn validation_collects_every_defect() {
        let source = "  orphan\nnoun\n  cat ^x\n  dog [\n   bad indent\nnoun\n  cow\nempty\nok\n  fine\n";
        let errors = parse_validated(source).unwrap_err();
        let kinds: Vec<_> = errors.iter().map(|e| (e.line, e.kind.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (1, SyntaxErrorKind::RuleBeforeSymbol),
                (3, SyntaxErrorKind::MalformedWeight("x".into())),
                (4, SyntaxErrorKind::UnbalancedBracket('[')),
                (
                    5,
                    SyntaxErrorKind::BadIndentation {
                        symbol: "noun".into(),
                        expected: 2,
                        found: 3,
                    }
                ),
                (6, SyntaxErrorKind::DuplicateSymbol("noun".into())),
                (8, SyntaxErrorKind::EmptySymbol("empty".into())),
            ]
        );
    }

    #[test]
    fn validation_accepts_clean_source() {
        let grammar = parse_validated("noun\n  cat\n").unwrap();
        assert!(grammar.contains("noun"));
    }

    #[test]
    fn comments_and_escaped_hash() {
        let grammar = parse("# header\nnoun # the nouns\n  issue \\#4 # trailing\n").unwrap();
        assert_eq!(
            grammar.symbol("noun").unwrap().rules[0].segments,
            vec![lit("issue #4")]
        );
    }
}
