/// Bracket parser: recursive descent over the interior of `[...]`.
///
/// Forms, tried in order on the trimmed interior:
/// - `['text'.mods]` → quoted literal
/// - `["pattern".mods]` → inner pattern
/// - `[a|b^2|c]` → inline choice, split on top-level bars
/// - `[[inner].mods]` → dereference
/// - `[1-6.mods]`, `[a-f.mods]` → range
/// - `[name.mods]` → symbol reference

use crate::core::escape::{self, RuleChar};
use crate::core::grammar::{
    Modifier, RangeSpec, Reference, Rule, Segment, SyntaxError, SyntaxErrorKind, Target,
    DEFAULT_WEIGHT,
};
use crate::core::parser;

/// Deepest bracket nesting a rule may use.
pub const MAX_NESTING: usize = 128;

pub fn is_valid_symbol_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Index of the `]` closing the `[` at `open`. Quoted literals directly
/// inside a bracket are skipped, so `['a]b']` closes at the last bracket.
pub(crate) fn matching_bracket(
    chars: &[RuleChar],
    open: usize,
    line: usize,
) -> Result<usize, SyntaxError> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        let c = &chars[i];
        if c.is('[') {
            depth += 1;
            if let Some(quote_close) = quoted_literal_close(chars, i + 1, line)? {
                i = quote_close;
            }
        } else if c.is(']') {
            depth -= 1;
            if depth == 0 {
                return Ok(i);
            }
        }
        i += 1;
    }
    Err(SyntaxError::at(
        line,
        chars[open].column,
        SyntaxErrorKind::UnbalancedBracket('['),
    ))
}

/// If a quoted literal opens at `start` (after optional whitespace),
/// the index of its closing quote.
fn quoted_literal_close(
    chars: &[RuleChar],
    start: usize,
    line: usize,
) -> Result<Option<usize>, SyntaxError> {
    let Some(open) = (start..chars.len()).find(|&i| !chars[i].is_whitespace()) else {
        return Ok(None);
    };
    if !chars[open].is('\'') {
        return Ok(None);
    }
    closing(chars, open, '\'', line).map(Some)
}

/// Index of the unescaped `quote` closing the one at `open`, skipping
/// nested brackets.
fn closing(
    chars: &[RuleChar],
    open: usize,
    quote: char,
    line: usize,
) -> Result<usize, SyntaxError> {
    let mut i = open + 1;
    while i < chars.len() {
        if chars[i].is(quote) {
            return Ok(i);
        }
        if quote != '\'' && chars[i].is('[') {
            i = matching_bracket(chars, i, line)?;
        }
        i += 1;
    }
    Err(SyntaxError::at(
        line,
        chars[open].column,
        SyntaxErrorKind::UnclosedQuote(quote),
    ))
}

fn trim(chars: &[RuleChar]) -> &[RuleChar] {
    let start = chars
        .iter()
        .position(|c| !c.is_whitespace())
        .unwrap_or(chars.len());
    let end = chars
        .iter()
        .rposition(|c| !c.is_whitespace())
        .map_or(start, |i| i + 1);
    &chars[start..end]
}

/// Parse the interior of a bracket whose `[` sits at `open_column`.
/// `depth` counts the brackets enclosing the interior, this one included.
pub(crate) fn parse_block(
    interior: &[RuleChar],
    line: usize,
    open_column: usize,
    depth: usize,
) -> Result<Segment, SyntaxError> {
    if depth > MAX_NESTING {
        return Err(SyntaxError::at(
            line,
            open_column,
            SyntaxErrorKind::NestingTooDeep(MAX_NESTING),
        ));
    }
    let trimmed = trim(interior);
    let Some(first) = trimmed.first() else {
        return Err(SyntaxError::at(
            line,
            open_column,
            SyntaxErrorKind::EmptyBracket,
        ));
    };

    if first.is('\'') || first.is('"') {
        // `['a'|'b']` is a choice whose branches happen to start with quotes.
        return match parse_reference(trimmed, line, depth) {
            Err(err) => {
                let bars = top_level_bars(interior, line)?;
                if bars.is_empty() {
                    return Err(err);
                }
                parse_choice(interior, &bars, line, depth)
            }
            parsed => parsed,
        };
    }

    let bars = top_level_bars(interior, line)?;
    if !bars.is_empty() {
        return parse_choice(interior, &bars, line, depth);
    }

    parse_reference(trimmed, line, depth)
}

fn top_level_bars(chars: &[RuleChar], line: usize) -> Result<Vec<usize>, SyntaxError> {
    let mut bars = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = &chars[i];
        if c.is('[') {
            i = matching_bracket(chars, i, line)?;
        } else if c.is(']') {
            return Err(SyntaxError::at(
                line,
                c.column,
                SyntaxErrorKind::UnbalancedBracket(']'),
            ));
        } else if c.is('|') {
            bars.push(i);
        }
        i += 1;
    }
    Ok(bars)
}

/// Each branch is a rule body of its own and may carry a `^weight`.
fn parse_choice(
    chars: &[RuleChar],
    bars: &[usize],
    line: usize,
    depth: usize,
) -> Result<Segment, SyntaxError> {
    let mut branches = Vec::with_capacity(bars.len() + 1);
    let mut start = 0;
    for &bar in bars.iter().chain(std::iter::once(&chars.len())) {
        let (segments, weight) = parser::parse_body(&chars[start..bar], line, true, depth)?;
        branches.push(Rule::with_weight(segments, weight.unwrap_or(DEFAULT_WEIGHT)));
        start = bar + 1;
    }
    Ok(Segment::Choice(branches))
}

fn parse_reference(
    chars: &[RuleChar],
    line: usize,
    depth: usize,
) -> Result<Segment, SyntaxError> {
    let first = chars[0];

    let (target, rest) = if first.is('[') {
        let close = matching_bracket(chars, 0, line)?;
        let inner = parse_block(&chars[1..close], line, first.column, depth + 1)?;
        (Target::Dereference(Box::new(inner)), &chars[close + 1..])
    } else if first.is('\'') {
        let close = closing(chars, 0, '\'', line)?;
        (
            Target::Quoted(escape::text(&chars[1..close])),
            &chars[close + 1..],
        )
    } else if first.is('"') {
        let close = closing(chars, 0, '"', line)?;
        let (segments, _) = parser::parse_body(&chars[1..close], line, false, depth)?;
        (Target::Pattern(segments), &chars[close + 1..])
    } else {
        let end = chars
            .iter()
            .position(|c| c.is('.'))
            .unwrap_or(chars.len());
        let head = escape::text(&chars[..end]);
        let target = match parse_range(&head) {
            Some(Ok(range)) => Target::Range(range),
            Some(Err(kind)) => return Err(SyntaxError::at(line, first.column, kind)),
            None if is_valid_symbol_name(&head) => Target::Symbol(head),
            None => {
                return Err(SyntaxError::at(
                    line,
                    first.column,
                    SyntaxErrorKind::InvalidSymbolName(head),
                ))
            }
        };
        (target, &chars[end..])
    };

    let modifiers = parse_modifiers(rest, line)?;
    Ok(Segment::Reference(Reference { target, modifiers }))
}

/// Parse `.tok.tok...` following a reference target.
fn parse_modifiers(rest: &[RuleChar], line: usize) -> Result<Vec<Modifier>, SyntaxError> {
    let mut modifiers = Vec::new();
    let Some(first) = rest.first() else {
        return Ok(modifiers);
    };
    if !first.is('.') {
        return Err(SyntaxError::at(
            line,
            first.column,
            SyntaxErrorKind::UnexpectedText(escape::text(rest)),
        ));
    }

    let mut i = 1;
    loop {
        let end = rest[i..]
            .iter()
            .position(|c| c.is('.'))
            .map_or(rest.len(), |offset| i + offset);
        let token = escape::text(&rest[i..end]);
        let column = rest.get(i).map_or(rest[i - 1].column + 1, |c| c.column);
        match Modifier::from_token(&token) {
            Some(modifier) => modifiers.push(modifier),
            None => {
                return Err(SyntaxError::at(
                    line,
                    column,
                    SyntaxErrorKind::UnknownModifier(token),
                ))
            }
        }
        if end == rest.len() {
            return Ok(modifiers);
        }
        i = end + 1;
    }
}

/// `Some` when `text` has the shape of a range; `Err` for a letter range
/// whose bounds differ in case.
fn parse_range(text: &str) -> Option<Result<RangeSpec, SyntaxErrorKind>> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() == 3
        && chars[1] == '-'
        && chars[0].is_ascii_alphabetic()
        && chars[2].is_ascii_alphabetic()
    {
        let (a, b) = (chars[0], chars[2]);
        if a.is_ascii_uppercase() != b.is_ascii_uppercase() {
            return Some(Err(SyntaxErrorKind::InvalidRange(text.to_string())));
        }
        return Some(Ok(RangeSpec::Alpha {
            low: a.min(b),
            high: a.max(b),
        }));
    }

    for (i, _) in text.match_indices('-').filter(|&(i, _)| i > 0) {
        if let (Ok(a), Ok(b)) = (text[..i].parse::<i64>(), text[i + 1..].parse::<i64>()) {
            return Some(Ok(RangeSpec::Numeric {
                low: a.min(b),
                high: a.max(b),
            }));
        }
    }
    None
}
