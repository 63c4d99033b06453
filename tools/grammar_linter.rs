/// Grammar Linter: validates grammar files and self-tests every rule.
///
/// Usage: grammar_linter <file.mh | dir> [--seed <n>]

use mayhap::core::expand::Expander;
use mayhap::core::grammar::Grammar;
use mayhap::core::lint::{self, LintIssue};
use mayhap::core::parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: grammar_linter <file.mh | dir> [--seed <n>]");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let mut seed = 0u64;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--seed" && i + 1 < args.len() {
            i += 1;
            seed = match args[i].parse() {
                Ok(seed) => seed,
                Err(_) => {
                    eprintln!("ERROR: seed must be a non-negative integer, got '{}'", args[i]);
                    process::exit(2);
                }
            };
        }
        i += 1;
    }

    let mut files = Vec::new();
    if target.is_file() {
        files.push(target.to_path_buf());
    } else if target.is_dir() {
        collect_grammar_files(target, &mut files);
        files.sort();
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target.display());
        process::exit(1);
    }

    let mut total_errors = 0;
    let mut total_warnings = 0;
    for path in &files {
        let (errors, warnings) = lint_file(path, seed);

        println!("\n=== {} ===\n", path.display());
        if errors.is_empty() && warnings.is_empty() {
            println!("All checks passed!");
        }
        for warning in &warnings {
            println!("WARNING: {}", warning);
        }
        for error in &errors {
            println!("ERROR: {}", error);
        }

        total_errors += errors.len();
        total_warnings += warnings.len();
    }

    println!(
        "\nSummary: {} files, {} errors, {} warnings",
        files.len(),
        total_errors,
        total_warnings
    );

    if total_errors == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_grammar_files(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_grammar_files(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("mh") {
                files.push(path);
            }
        }
    }
}

fn lint_file(path: &Path, seed: u64) -> (Vec<String>, Vec<String>) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => return (vec![format!("cannot read file: {}", e)], Vec::new()),
    };

    let grammar = match parser::parse_validated(&source) {
        Ok(grammar) => grammar,
        Err(errors) => return (errors.iter().map(ToString::to_string).collect(), Vec::new()),
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for issue in lint::lint(&grammar) {
        match issue {
            LintIssue::ZeroWeight { .. } => warnings.push(issue.to_string()),
            LintIssue::UndefinedReference { .. } | LintIssue::NoExit { .. } => {
                errors.push(issue.to_string())
            }
        }
    }

    // Rules of symbols that cannot finish would only repeat the lint errors.
    if errors.is_empty() {
        errors.extend(self_test(&grammar, seed));
    }

    (errors, warnings)
}

/// Expand every rule once and report the ones that fail.
fn self_test(grammar: &Grammar, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let expander = Expander::new(grammar);
    expander
        .enumerate_all(&mut rng)
        .filter_map(|item| {
            item.output.err().map(|e| {
                format!(
                    "line {}: rule '{}' of '{}' failed: {}",
                    item.symbol.line, item.rule, item.symbol.name, e
                )
            })
        })
        .collect()
}
