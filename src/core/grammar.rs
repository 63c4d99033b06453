/// Compiled grammar: symbols, weighted rules, segments, and syntax errors.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::escape::ESCAPE_CHAR;
use crate::core::parser;

/// Weight given to rules and choice branches without a `^` annotation.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// What went wrong while parsing grammar source or a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("indentation of {found} does not match the {expected} established for symbol '{symbol}'")]
    BadIndentation {
        symbol: String,
        expected: usize,
        found: usize,
    },
    #[error("production rule given before any symbol")]
    RuleBeforeSymbol,
    #[error("symbol '{0}' is declared more than once")]
    DuplicateSymbol(String),
    #[error("symbol '{0}' closed with no production rules")]
    EmptySymbol(String),
    #[error("invalid symbol name '{0}'")]
    InvalidSymbolName(String),
    #[error("unbalanced '{0}'")]
    UnbalancedBracket(char),
    #[error("unclosed quote {0}")]
    UnclosedQuote(char),
    #[error("empty brackets")]
    EmptyBracket,
    #[error("malformed weight '{0}'")]
    MalformedWeight(String),
    #[error("weight must be non-negative; was {0}")]
    NegativeWeight(String),
    #[error("unknown escape sequence '\\{0}'")]
    UnknownEscape(char),
    #[error("escape character at end of line")]
    DanglingEscape,
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("unexpected text '{0}'")]
    UnexpectedText(String),
    #[error("invalid range '{0}'")]
    InvalidRange(String),
    #[error("brackets nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// A structural defect, located by 1-based line and (when known) column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}{col}: {kind}", col = column_suffix(.column))]
pub struct SyntaxError {
    pub line: usize,
    pub column: Option<usize>,
    pub kind: SyntaxErrorKind,
}

fn column_suffix(column: &Option<usize>) -> String {
    match column {
        Some(column) => format!(", column {}", column),
        None => String::new(),
    }
}

impl SyntaxError {
    pub fn new(line: usize, kind: SyntaxErrorKind) -> Self {
        Self {
            line,
            column: None,
            kind,
        }
    }

    pub fn at(line: usize, column: usize, kind: SyntaxErrorKind) -> Self {
        Self {
            line,
            column: Some(column),
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),
}

/// Post-processing applied to the text a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// `.a`: prefix an indefinite article.
    Article,
    /// `.s`: pluralize.
    Plural,
    /// `.th`: number to ordinal.
    Ordinal,
    /// `.capitalize`: uppercase the first letter.
    Capitalize,
    Lower,
    Upper,
    /// `.title`: uppercase the first letter of every word.
    Title,
}

impl Modifier {
    pub fn from_token(token: &str) -> Option<Modifier> {
        match token {
            "a" => Some(Self::Article),
            "s" => Some(Self::Plural),
            "th" => Some(Self::Ordinal),
            "capitalize" => Some(Self::Capitalize),
            "lower" => Some(Self::Lower),
            "upper" => Some(Self::Upper),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Article => "a",
            Self::Plural => "s",
            Self::Ordinal => "th",
            Self::Capitalize => "capitalize",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Title => "title",
        }
    }
}

/// An inclusive range drawn from uniformly: `[1-6]`, `[a-f]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeSpec {
    Numeric { low: i64, high: i64 },
    Alpha { low: char, high: char },
}

/// What a bracketed reference resolves against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// `[name]`: expand a symbol looked up by name.
    Symbol(String),
    /// `[[inner]]`: expand `inner`, then expand the symbol it names.
    Dereference(Box<Segment>),
    /// `['text']`: verbatim text.
    Quoted(String),
    /// `["text [ref]"]`: an inner pattern.
    Pattern(Vec<Segment>),
    Range(RangeSpec),
}

/// A reference node with its modifier chain, applied left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub target: Target,
    pub modifiers: Vec<Modifier>,
}

/// A unit of a rule's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    /// Literal text with escapes already resolved.
    Literal(String),
    Reference(Reference),
    /// `[a|b^2|c]`: an anonymous weighted choice between branches.
    Choice(Vec<Rule>),
}

/// One weighted production: a symbol's rule or a choice branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub segments: Vec<Segment>,
    pub weight: f64,
}

impl Rule {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            weight: DEFAULT_WEIGHT,
        }
    }

    pub fn with_weight(segments: Vec<Segment>, weight: f64) -> Self {
        Self { segments, weight }
    }

    /// Names of every symbol this rule refers to directly, in order of
    /// appearance, including those inside choices and patterns.
    ///
    /// Dereferenced names are computed at expansion time and are not
    /// included, though symbols used to compute them are.
    pub fn referenced_symbols(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_symbols(&self.segments, &mut names);
        names
    }
}

fn collect_symbols<'a>(segments: &'a [Segment], names: &mut Vec<&'a str>) {
    for segment in segments {
        collect_segment_symbols(segment, names);
    }
}

fn collect_segment_symbols<'a>(segment: &'a Segment, names: &mut Vec<&'a str>) {
    match segment {
        Segment::Literal(_) => {}
        Segment::Reference(reference) => match &reference.target {
            Target::Symbol(name) => names.push(name),
            Target::Dereference(inner) => collect_segment_symbols(inner, names),
            Target::Pattern(segments) => collect_symbols(segments, names),
            Target::Quoted(_) | Target::Range(_) => {}
        },
        Segment::Choice(branches) => {
            for branch in branches {
                collect_symbols(&branch.segments, names);
            }
        }
    }
}

/// A named non-terminal and its rules, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub rules: Vec<Rule>,
    /// Line of the symbol header, or 0 when built programmatically.
    #[serde(default)]
    pub line: usize,
}

impl Symbol {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
            line: 0,
        }
    }
}

/// An immutable, name-indexed table of symbols.
///
/// Symbols refer to each other by name only, so self- and mutually
/// recursive symbols need no shared ownership.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Symbol>", into = "Vec<Symbol>")]
pub struct Grammar {
    symbols: Vec<Symbol>,
    index: FxHashMap<String, usize>,
}

impl From<Vec<Symbol>> for Grammar {
    fn from(symbols: Vec<Symbol>) -> Self {
        let mut index = FxHashMap::default();
        for (i, symbol) in symbols.iter().enumerate() {
            index.entry(symbol.name.clone()).or_insert(i);
        }
        Self { symbols, index }
    }
}

impl From<Grammar> for Vec<Symbol> {
    fn from(grammar: Grammar) -> Self {
        grammar.symbols
    }
}

impl Grammar {
    /// Compile grammar source, failing on the first structural defect.
    pub fn parse(source: &str) -> Result<Grammar, SyntaxError> {
        parser::parse(source)
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The first declared symbol, the default start for generation.
    pub fn start_symbol(&self) -> Option<&Symbol> {
        self.symbols.first()
    }

    /// Every rule of every symbol, in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = (&Symbol, &Rule)> + '_ {
        self.symbols
            .iter()
            .flat_map(|symbol| symbol.rules.iter().map(move |rule| (symbol, rule)))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Serialize the compiled grammar to RON.
    pub fn to_ron(&self) -> Result<String, GrammarError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load a compiled grammar previously written by [`Grammar::to_ron`].
    pub fn from_ron(input: &str) -> Result<Grammar, GrammarError> {
        Ok(ron::from_str(input)?)
    }
}

// Display renders back to grammar syntax.

const LITERAL_SPECIALS: &[char] = &['[', ']', '^', '|', '\\', '#', '"', '\''];

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str, specials: &[char]) -> fmt::Result {
    for c in text.chars() {
        match c {
            '\n' => write!(f, "{}n", ESCAPE_CHAR)?,
            '\t' => write!(f, "{}t", ESCAPE_CHAR)?,
            c if specials.contains(&c) => write!(f, "{}{}", ESCAPE_CHAR, c)?,
            c => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric { low, high } => write!(f, "{}-{}", low, high),
            Self::Alpha { low, high } => write!(f, "{}-{}", low, high),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        match &self.target {
            Target::Symbol(name) => write!(f, "{}", name)?,
            Target::Dereference(inner) => write!(f, "{}", inner)?,
            Target::Quoted(text) => {
                write!(f, "'")?;
                write_escaped(f, text, &['\'', '\\'])?;
                write!(f, "'")?;
            }
            Target::Pattern(segments) => {
                write!(f, "\"")?;
                for segment in segments {
                    write!(f, "{}", segment)?;
                }
                write!(f, "\"")?;
            }
            Target::Range(range) => write!(f, "{}", range)?,
        }
        for modifier in &self.modifiers {
            write!(f, ".{}", modifier.token())?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write_escaped(f, text, LITERAL_SPECIALS),
            Self::Reference(reference) => write!(f, "{}", reference),
            Self::Choice(branches) => {
                write!(f, "[")?;
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", branch)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{}", segment)?;
        }
        if self.weight != DEFAULT_WEIGHT {
            write!(f, "^{}", self.weight)?;
        }
        Ok(())
    }
}
