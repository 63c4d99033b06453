/// The top-level generator: a grammar, a seeded RNG and expansion limits.
///
/// Wires together parsing, configuration and the expansion engine.

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::{ConfigError, GeneratorConfig};
use crate::core::expand::{EnumeratedRule, ExpansionError, Expander};
use crate::core::grammar::{Grammar, GrammarError, SyntaxError};
use crate::core::inflect::InflectorKind;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("expansion error: {0}")]
    Expansion(#[from] ExpansionError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no grammar given to the builder")]
    NoGrammar,
    #[error("grammar declares no symbols")]
    NoStartSymbol,
}

/// Generates text from a grammar. Built via `Generator::builder()`.
pub struct Generator {
    grammar: Grammar,
    config: GeneratorConfig,
    rng: StdRng,
}

/// Where the builder gets its grammar from.
enum GrammarSource {
    Compiled(Grammar),
    Text(String),
    Ron(String),
    /// A `.ron` file holds a compiled grammar; anything else is source.
    File(PathBuf),
}

/// Builder for constructing a `Generator`.
pub struct GeneratorBuilder {
    source: Option<GrammarSource>,
    config: GeneratorConfig,
}

impl Generator {
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder {
            source: None,
            config: GeneratorConfig::default(),
        }
    }

    /// Expand a symbol name or an ad-hoc pattern.
    pub fn generate(&mut self, input: &str) -> Result<String, GeneratorError> {
        let expander = expander(&self.grammar, &self.config);
        Ok(expander.expand(input, &mut self.rng)?)
    }

    /// Expand the first declared symbol.
    pub fn generate_start(&mut self) -> Result<String, GeneratorError> {
        let expander = expander(&self.grammar, &self.config);
        let start = self
            .grammar
            .start_symbol()
            .ok_or(GeneratorError::NoStartSymbol)?;
        Ok(expander.expand_symbol(&start.name, &mut self.rng)?)
    }

    /// Expand `input` `count` times. Fails on the first failed expansion.
    pub fn generate_variants(
        &mut self,
        input: &str,
        count: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        (0..count).map(|_| self.generate(input)).collect()
    }

    /// Expand every rule once, ignoring weights, to check that each one
    /// expands without error.
    pub fn self_test(&mut self) -> Vec<EnumeratedRule<'_>> {
        let expander = expander(&self.grammar, &self.config);
        expander.enumerate_all(&mut self.rng).collect()
    }

    /// Restart the random sequence from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

fn expander<'g>(grammar: &'g Grammar, config: &GeneratorConfig) -> Expander<'g> {
    Expander::new(grammar)
        .with_inflector(config.inflector.inflector())
        .max_depth(config.max_depth)
        .step_budget(config.step_budget)
}

impl GeneratorBuilder {
    /// Use an already compiled grammar.
    pub fn grammar(mut self, grammar: Grammar) -> Self {
        self.source = Some(GrammarSource::Compiled(grammar));
        self
    }

    /// Compile grammar source text at build time.
    pub fn grammar_source(mut self, source: &str) -> Self {
        self.source = Some(GrammarSource::Text(source.to_string()));
        self
    }

    /// Load a compiled grammar serialized with [`Grammar::to_ron`].
    pub fn grammar_ron(mut self, ron: &str) -> Self {
        self.source = Some(GrammarSource::Ron(ron.to_string()));
        self
    }

    pub fn grammar_file(mut self, path: &str) -> Self {
        self.source = Some(GrammarSource::File(PathBuf::from(path)));
        self
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn step_budget(mut self, budget: Option<u64>) -> Self {
        self.config.step_budget = budget;
        self
    }

    pub fn inflector(mut self, kind: InflectorKind) -> Self {
        self.config.inflector = kind;
        self
    }

    pub fn build(self) -> Result<Generator, GeneratorError> {
        let grammar = match self.source.ok_or(GeneratorError::NoGrammar)? {
            GrammarSource::Compiled(grammar) => grammar,
            GrammarSource::Text(source) => Grammar::parse(&source)?,
            GrammarSource::Ron(ron) => Grammar::from_ron(&ron)?,
            GrammarSource::File(path) => load_grammar(&path)?,
        };

        debug!(
            "generator ready: {} symbols, seed {}, max depth {}, inflector {:?}",
            grammar.len(),
            self.config.seed,
            self.config.max_depth,
            self.config.inflector
        );

        Ok(Generator {
            grammar,
            rng: StdRng::seed_from_u64(self.config.seed),
            config: self.config,
        })
    }
}

fn load_grammar(path: &Path) -> Result<Grammar, GeneratorError> {
    let contents = std::fs::read_to_string(path)?;
    if path.extension().is_some_and(|ext| ext == "ron") {
        Ok(Grammar::from_ron(&contents)?)
    } else {
        Ok(Grammar::parse(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANIMALS: &str = "\
sentence
    [animal.a] sees [animal.a]
animal
    elephant
    dog
    owl^2
";

    #[test]
    fn builder_defaults() {
        let generator = Generator::builder().grammar_source(ANIMALS).build().unwrap();
        assert_eq!(generator.config(), &GeneratorConfig::default());
        assert_eq!(generator.grammar().len(), 2);
    }

    #[test]
    fn builder_without_grammar_fails() {
        assert!(matches!(
            Generator::builder().build(),
            Err(GeneratorError::NoGrammar)
        ));
    }

    #[test]
    fn builder_reports_syntax_errors() {
        let result = Generator::builder().grammar_source("  orphan\n").build();
        assert!(matches!(result, Err(GeneratorError::Syntax(_))));
    }

    #[test]
    fn same_seed_same_text() {
        let mut a = Generator::builder()
            .grammar_source(ANIMALS)
            .seed(42)
            .build()
            .unwrap();
        let mut b = Generator::builder()
            .grammar_source(ANIMALS)
            .seed(42)
            .build()
            .unwrap();
        assert_eq!(
            a.generate_variants("sentence", 20).unwrap(),
            b.generate_variants("sentence", 20).unwrap()
        );
    }

    #[test]
    fn reseed_restarts_sequence() {
        let mut generator = Generator::builder()
            .grammar_source(ANIMALS)
            .seed(1)
            .build()
            .unwrap();
        let first = generator.generate_variants("sentence", 10).unwrap();
        generator.reseed(1);
        assert_eq!(generator.generate_variants("sentence", 10).unwrap(), first);
    }

    #[test]
    fn generate_start_uses_first_symbol() {
        let mut generator = Generator::builder().grammar_source(ANIMALS).build().unwrap();
        let text = generator.generate_start().unwrap();
        assert!(text.contains(" sees "), "{}", text);
    }

    #[test]
    fn empty_grammar_has_no_start() {
        let mut generator = Generator::builder()
            .grammar(Grammar::default())
            .build()
            .unwrap();
        assert!(matches!(
            generator.generate_start(),
            Err(GeneratorError::NoStartSymbol)
        ));
    }

    #[test]
    fn config_limits_are_applied() {
        let mut generator = Generator::builder()
            .grammar_source("loop\n    [loop]\n")
            .max_depth(8)
            .build()
            .unwrap();
        assert!(matches!(
            generator.generate("loop"),
            Err(GeneratorError::Expansion(
                ExpansionError::RecursionLimitExceeded { depth: 9, .. }
            ))
        ));

        let mut generator = Generator::builder()
            .grammar_source(ANIMALS)
            .step_budget(Some(1))
            .build()
            .unwrap();
        assert!(matches!(
            generator.generate("sentence"),
            Err(GeneratorError::Expansion(ExpansionError::ResourceExhausted {
                budget: 1
            }))
        ));
    }

    #[test]
    fn fallback_inflector_from_config() {
        let config = GeneratorConfig {
            inflector: InflectorKind::Fallback,
            ..GeneratorConfig::default()
        };
        let mut generator = Generator::builder()
            .grammar_source("x\n    y\n")
            .config(config)
            .build()
            .unwrap();
        assert_eq!(generator.generate("['hour'.a]").unwrap(), "a hour");
        generator.reseed(0);
        assert_eq!(generator.config().inflector, InflectorKind::Fallback);
    }

    #[test]
    fn grammar_ron_source() {
        let grammar = Grammar::parse(ANIMALS).unwrap();
        let ron = grammar.to_ron().unwrap();
        let mut generator = Generator::builder().grammar_ron(&ron).build().unwrap();
        assert_eq!(generator.grammar().symbols(), grammar.symbols());
        assert!(generator.generate("sentence").is_ok());
    }

    #[test]
    fn self_test_covers_every_rule() {
        let mut generator = Generator::builder().grammar_source(ANIMALS).build().unwrap();
        let results = generator.self_test();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|item| item.output.is_ok()));
        assert_eq!(results[3].output.as_deref(), Ok("owl"));
    }
}
