/// Expansion engine: walks a grammar from a symbol or pattern to text.
///
/// Expansion is a pure function of the grammar, the start input, the RNG
/// state, the inflector and the limits. Every call gets its own depth
/// counter and step budget; the only thing consumed is randomness.

use log::trace;
use rand::Rng;
use thiserror::Error;

use crate::core::grammar::{
    Grammar, Modifier, RangeSpec, Reference, Rule, Segment, Symbol, SyntaxError, Target,
};
use crate::core::inflect::{self, EnglishInflector, Inflector};
use crate::core::parser;
use crate::core::select;

/// Nesting depth allowed before expansion gives up on a symbol.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Owner reported for choices written in an ad-hoc pattern.
pub const PATTERN_OWNER: &str = "<pattern>";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpansionError {
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("every choice for '{symbol}' has zero weight")]
    EmptyChoice { symbol: String },
    #[error("recursion limit exceeded while expanding '{symbol}' (depth {depth})")]
    RecursionLimitExceeded { symbol: String, depth: usize },
    #[error("step budget of {budget} exhausted")]
    ResourceExhausted { budget: u64 },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] SyntaxError),
}

/// Expands symbols and patterns of one grammar.
///
/// The expander holds no mutable state, so one value can serve any number
/// of calls as long as each brings its own RNG.
#[derive(Clone, Copy)]
pub struct Expander<'g> {
    grammar: &'g Grammar,
    inflector: &'g dyn Inflector,
    max_depth: usize,
    step_budget: Option<u64>,
}

impl<'g> Expander<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            inflector: &EnglishInflector,
            max_depth: DEFAULT_MAX_DEPTH,
            step_budget: None,
        }
    }

    pub fn with_inflector(mut self, inflector: &'g dyn Inflector) -> Self {
        self.inflector = inflector;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Limit the number of segments a single call may expand.
    pub fn step_budget(mut self, budget: Option<u64>) -> Self {
        self.step_budget = budget;
        self
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Expand `input`: a declared symbol name, or else a pattern such as
    /// `"a [noun] and [noun.s]"`.
    pub fn expand<R>(&self, input: &str, rng: &mut R) -> Result<String, ExpansionError>
    where
        R: Rng + ?Sized,
    {
        if self.grammar.contains(input) {
            return self.expand_symbol(input, rng);
        }
        let rule = parser::parse_pattern(input)?;
        self.expand_rule(PATTERN_OWNER, &rule, rng)
    }

    pub fn expand_symbol<R>(&self, name: &str, rng: &mut R) -> Result<String, ExpansionError>
    where
        R: Rng + ?Sized,
    {
        self.walk(rng).symbol(name)
    }

    /// Expand one specific rule, bypassing selection at the top level.
    /// Choices inside the rule are named after `owner` in errors.
    pub fn expand_rule<R>(
        &self,
        owner: &str,
        rule: &Rule,
        rng: &mut R,
    ) -> Result<String, ExpansionError>
    where
        R: Rng + ?Sized,
    {
        self.walk(rng).segments(owner, &rule.segments)
    }

    /// Expand every rule of every symbol once, in declaration order,
    /// regardless of weight. Calling again restarts the sequence.
    pub fn enumerate_all<'a, R>(&'a self, rng: &'a mut R) -> Enumeration<'a, 'g, R>
    where
        R: Rng + ?Sized,
    {
        Enumeration {
            expander: self,
            rng,
            symbol: 0,
            rule: 0,
        }
    }

    fn walk<'a, R: Rng + ?Sized>(&'a self, rng: &'a mut R) -> Walk<'a, 'g, R> {
        Walk {
            expander: self,
            rng,
            depth: 0,
            steps_left: self.step_budget,
        }
    }
}

/// The outcome of expanding one rule during enumeration.
#[derive(Debug)]
pub struct EnumeratedRule<'g> {
    pub symbol: &'g Symbol,
    pub rule: &'g Rule,
    pub output: Result<String, ExpansionError>,
}

/// Iterator returned by [`Expander::enumerate_all`].
pub struct Enumeration<'a, 'g, R: ?Sized> {
    expander: &'a Expander<'g>,
    rng: &'a mut R,
    symbol: usize,
    rule: usize,
}

impl<'a, 'g, R: Rng + ?Sized> Iterator for Enumeration<'a, 'g, R> {
    type Item = EnumeratedRule<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        let grammar: &'g Grammar = self.expander.grammar;
        loop {
            let symbol = grammar.symbols().get(self.symbol)?;
            if let Some(rule) = symbol.rules.get(self.rule) {
                self.rule += 1;
                let output = self.expander.expand_rule(&symbol.name, rule, &mut *self.rng);
                return Some(EnumeratedRule {
                    symbol,
                    rule,
                    output,
                });
            }
            self.symbol += 1;
            self.rule = 0;
        }
    }
}

/// State of a single expansion call.
struct Walk<'a, 'g, R: ?Sized> {
    expander: &'a Expander<'g>,
    rng: &'a mut R,
    depth: usize,
    steps_left: Option<u64>,
}

impl<'a, 'g, R: Rng + ?Sized> Walk<'a, 'g, R> {
    fn step(&mut self) -> Result<(), ExpansionError> {
        if let Some(left) = self.steps_left.as_mut() {
            if *left == 0 {
                return Err(ExpansionError::ResourceExhausted {
                    budget: self.expander.step_budget.unwrap_or(0),
                });
            }
            *left -= 1;
        }
        Ok(())
    }

    fn symbol(&mut self, name: &str) -> Result<String, ExpansionError> {
        let grammar = self.expander.grammar;
        let symbol = grammar
            .symbol(name)
            .ok_or_else(|| ExpansionError::UnknownSymbol(name.to_string()))?;

        self.depth += 1;
        if self.depth > self.expander.max_depth {
            return Err(ExpansionError::RecursionLimitExceeded {
                symbol: name.to_string(),
                depth: self.depth,
            });
        }
        trace!("{:indent$}[{}] depth {}", "", name, self.depth, indent = self.depth - 1);

        let rule = select::select(&symbol.rules, &mut *self.rng).ok_or_else(|| {
            ExpansionError::EmptyChoice {
                symbol: name.to_string(),
            }
        })?;
        let text = self.segments(name, &rule.segments)?;
        self.depth -= 1;
        Ok(text)
    }

    fn segments(&mut self, owner: &str, segments: &[Segment]) -> Result<String, ExpansionError> {
        let mut out = String::new();
        for segment in segments {
            out.push_str(&self.segment(owner, segment)?);
        }
        Ok(inflect::resolve_inline(&out, self.expander.inflector))
    }

    fn segment(&mut self, owner: &str, segment: &Segment) -> Result<String, ExpansionError> {
        self.step()?;
        match segment {
            Segment::Literal(text) => Ok(text.clone()),
            Segment::Reference(reference) => self.reference(owner, reference),
            Segment::Choice(branches) => {
                let branch = select::select(branches, &mut *self.rng).ok_or_else(|| {
                    ExpansionError::EmptyChoice {
                        symbol: owner.to_string(),
                    }
                })?;
                self.segments(owner, &branch.segments)
            }
        }
    }

    fn reference(&mut self, owner: &str, reference: &Reference) -> Result<String, ExpansionError> {
        let text = match &reference.target {
            Target::Symbol(name) => self.symbol(name)?,
            Target::Dereference(inner) => {
                let name = self.segment(owner, inner)?;
                self.symbol(name.trim())?
            }
            Target::Quoted(text) => text.clone(),
            Target::Pattern(segments) => self.segments(owner, segments)?,
            Target::Range(range) => self.range(*range),
        };
        Ok(reference
            .modifiers
            .iter()
            .fold(text, |text, modifier| self.modify(*modifier, text)))
    }

    fn range(&mut self, range: RangeSpec) -> String {
        match range {
            RangeSpec::Numeric { low, high } => self.rng.gen_range(low..=high).to_string(),
            RangeSpec::Alpha { low, high } => self.rng.gen_range(low..=high).to_string(),
        }
    }

    fn modify(&self, modifier: Modifier, text: String) -> String {
        let inflector = self.expander.inflector;
        match modifier {
            Modifier::Article => format!("{} {}", inflector.article(&text), text),
            Modifier::Plural => inflector.plural(&text),
            Modifier::Ordinal => inflector.ordinal(&text),
            Modifier::Capitalize => inflect::capitalize(&text),
            Modifier::Lower => text.to_lowercase(),
            Modifier::Upper => text.to_uppercase(),
            Modifier::Title => inflect::title_case(&text),
        }
    }
}
