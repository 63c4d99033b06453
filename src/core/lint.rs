/// Static grammar checks: problems that parse cleanly but fail or loop
/// at expansion time.

use rustc_hash::FxHashSet;
use std::fmt;

use crate::core::grammar::{Grammar, Segment, Symbol, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintIssue {
    /// A rule refers to a symbol that is never declared.
    UndefinedReference {
        symbol: String,
        line: usize,
        target: String,
    },
    /// Every rule of the symbol has weight 0, so it can never be expanded.
    ZeroWeight { symbol: String, line: usize },
    /// No positive-weight path from the symbol reaches plain text.
    NoExit { symbol: String, line: usize },
}

impl LintIssue {
    pub fn symbol(&self) -> &str {
        match self {
            Self::UndefinedReference { symbol, .. }
            | Self::ZeroWeight { symbol, .. }
            | Self::NoExit { symbol, .. } => symbol,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::UndefinedReference { line, .. }
            | Self::ZeroWeight { line, .. }
            | Self::NoExit { line, .. } => *line,
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedReference {
                symbol,
                line,
                target,
            } => write!(
                f,
                "line {}: symbol '{}' refers to undeclared symbol '{}'",
                line, symbol, target
            ),
            Self::ZeroWeight { symbol, line } => {
                write!(f, "line {}: every rule of '{}' has weight 0", line, symbol)
            }
            Self::NoExit { symbol, line } => {
                write!(f, "line {}: symbol '{}' can never finish expanding", line, symbol)
            }
        }
    }
}

/// Check a compiled grammar. Issues come grouped by kind, each group in
/// declaration order.
pub fn lint(grammar: &Grammar) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    for symbol in grammar.symbols() {
        let mut reported = FxHashSet::default();
        for rule in &symbol.rules {
            for target in rule.referenced_symbols() {
                if !grammar.contains(target) && reported.insert(target) {
                    issues.push(LintIssue::UndefinedReference {
                        symbol: symbol.name.clone(),
                        line: symbol.line,
                        target: target.to_string(),
                    });
                }
            }
        }
    }

    let zero_weight: Vec<&Symbol> = grammar
        .symbols()
        .iter()
        .filter(|symbol| symbol.rules.iter().all(|rule| rule.weight <= 0.0))
        .collect();
    issues.extend(zero_weight.iter().map(|symbol| LintIssue::ZeroWeight {
        symbol: symbol.name.clone(),
        line: symbol.line,
    }));

    let productive = productive_symbols(grammar);
    issues.extend(
        grammar
            .symbols()
            .iter()
            .filter(|symbol| !productive.contains(symbol.name.as_str()))
            .filter(|symbol| !zero_weight.iter().any(|z| z.name == symbol.name))
            .map(|symbol| LintIssue::NoExit {
                symbol: symbol.name.clone(),
                line: symbol.line,
            }),
    );

    issues
}

/// Symbols with at least one positive-weight derivation that ends.
///
/// Undeclared references count as productive here since they are
/// reported on their own.
fn productive_symbols(grammar: &Grammar) -> FxHashSet<&str> {
    let mut productive = FxHashSet::default();
    loop {
        let before = productive.len();
        for symbol in grammar.symbols() {
            if productive.contains(symbol.name.as_str()) {
                continue;
            }
            let finishes = symbol.rules.iter().any(|rule| {
                rule.weight > 0.0 && segments_finish(grammar, &rule.segments, &productive)
            });
            if finishes {
                productive.insert(symbol.name.as_str());
            }
        }
        if productive.len() == before {
            return productive;
        }
    }
}

fn segments_finish(
    grammar: &Grammar,
    segments: &[Segment],
    productive: &FxHashSet<&str>,
) -> bool {
    segments
        .iter()
        .all(|segment| segment_finishes(grammar, segment, productive))
}

fn segment_finishes(
    grammar: &Grammar,
    segment: &Segment,
    productive: &FxHashSet<&str>,
) -> bool {
    match segment {
        Segment::Literal(_) => true,
        Segment::Choice(branches) => branches.iter().any(|branch| {
            branch.weight > 0.0 && segments_finish(grammar, &branch.segments, productive)
        }),
        Segment::Reference(reference) => match &reference.target {
            Target::Symbol(name) => {
                productive.contains(name.as_str()) || !grammar.contains(name)
            }
            Target::Dereference(inner) => segment_finishes(grammar, inner, productive),
            Target::Pattern(segments) => segments_finish(grammar, segments, productive),
            Target::Quoted(_) | Target::Range(_) => true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues(source: &str) -> Vec<LintIssue> {
        lint(&Grammar::parse(source).unwrap())
    }

    #[test]
    fn clean_grammar() {
        let source = "output\n    a [noun]\nnoun\n    cat\n    [noun] and [noun]\n";
        assert!(issues(source).is_empty());
    }

    #[test]
    fn undefined_reference_reported_once_per_symbol() {
        let source = "out\n    [ghost] [ghost]\n    [[ghost]]\n";
        assert_eq!(
            issues(source),
            vec![LintIssue::UndefinedReference {
                symbol: "out".to_string(),
                line: 1,
                target: "ghost".to_string(),
            }]
        );
    }

    #[test]
    fn zero_weight_symbol() {
        let source = "out\n    x\ndead\n    a^0\n    b^0\n";
        assert_eq!(
            issues(source),
            vec![LintIssue::ZeroWeight {
                symbol: "dead".to_string(),
                line: 3,
            }]
        );
    }

    #[test]
    fn cycles_without_exit() {
        let source = "a\n    [b]\nb\n    [a]\n    end^0\nc\n    [c] or [d]\nd\n    done\n";
        let found = issues(source);
        assert_eq!(
            found,
            vec![
                LintIssue::NoExit {
                    symbol: "a".to_string(),
                    line: 1,
                },
                LintIssue::NoExit {
                    symbol: "b".to_string(),
                    line: 3,
                },
                LintIssue::NoExit {
                    symbol: "c".to_string(),
                    line: 6,
                },
            ]
        );
        assert_eq!(found[2].symbol(), "c");
        assert_eq!(found[2].line(), 6);
    }

    #[test]
    fn choice_with_exit_is_productive() {
        let source = "loop\n    [again [loop]|stop]\n";
        assert!(issues(source).is_empty());

        let source = "loop\n    [again [loop]|stop^0]\n";
        assert_eq!(issues(source).len(), 1);
    }

    #[test]
    fn display() {
        let issue = LintIssue::UndefinedReference {
            symbol: "out".to_string(),
            line: 4,
            target: "ghost".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "line 4: symbol 'out' refers to undeclared symbol 'ghost'"
        );
    }
}
