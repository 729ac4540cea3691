//! Integration Test: Engine Core Isolation
//!
//! **Policy**: The engine core must stay usable from any surface. It must
//! not parse command lines, load `.env` files, or write to the terminal;
//! those concerns belong to the CLI crate. Observability goes through
//! `tracing`, results go through return values.

use std::fs;
use std::path::{Path, PathBuf};

/// The crate that must stay surface-agnostic
const CORE_DIR: &str = "engine/core/src";

/// Test that the engine core carries no CLI concerns
#[test]
fn test_core_has_no_cli_concerns() {
    let violations = find_cli_concern_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CLI concerns found in the engine core!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN in engine core:");
        eprintln!("  - clap (argument parsing belongs to the CLI)");
        eprintln!("  - dotenvy (.env loading belongs to the CLI)");
        eprintln!("  - println!/eprintln!/print! (use tracing or return values)");

        panic!(
            "\nFound {} CLI-concern violation(s) in the engine core.\nFix these before merging!",
            violations.len()
        );
    }
}

fn find_cli_concern_violations() -> Vec<String> {
    let root = workspace_root();
    let core = root.join(CORE_DIR);
    assert!(
        core.exists(),
        "core directory missing: {} (was the tree restructured?)",
        core.display()
    );

    let mut violations = Vec::new();
    for entry in walkdir::WalkDir::new(&core)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            check_file(entry.path(), &mut violations);
        }
    }

    violations
}

/// Workspace root, derived from this package's manifest location
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("workspace root should be two levels above this package")
        .to_path_buf()
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    let lines: Vec<&str> = content.lines().collect();
    let mut in_test_module = false;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]") {
            // Everything below is test code; terminal output there is noise,
            // not an architecture break
            in_test_module = true;
        }
        if in_test_module {
            continue;
        }

        // Strip comments and doc lines
        let code_part = line.split("//").next().unwrap_or(line);
        let line_number = idx + 1;

        if code_part.contains("use clap") || code_part.contains("clap::") {
            violations.push(format!(
                "{}:{} - Argument parsing in core: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }

        if code_part.contains("dotenvy") {
            violations.push(format!(
                "{}:{} - Environment file loading in core: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }

        if code_part.contains("println!(")
            || code_part.contains("eprintln!(")
            || code_part.contains("print!(")
        {
            violations.push(format!(
                "{}:{} - Terminal output in core: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_flags_terminal_output() {
        let dir = std::env::temp_dir().join("deckhand-core-isolation-check");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(
            &file,
            "fn report() {\n    println!(\"done\");\n}\n",
        )
        .unwrap();

        let mut violations = Vec::new();
        check_file(&file, &mut violations);

        fs::remove_file(&file).ok();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("Terminal output"));
    }

    #[test]
    fn test_detector_ignores_doc_examples() {
        let dir = std::env::temp_dir().join("deckhand-core-isolation-check");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("doc_sample.rs");
        fs::write(
            &file,
            "//! println!(\"example output\");\nfn quiet() {}\n",
        )
        .unwrap();

        let mut violations = Vec::new();
        check_file(&file, &mut violations);

        fs::remove_file(&file).ok();
        assert!(violations.is_empty());
    }

    #[test]
    fn test_detector_ignores_test_modules() {
        let dir = std::env::temp_dir().join("deckhand-core-isolation-check");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("test_sample.rs");
        fs::write(
            &file,
            "fn quiet() {}\n#[cfg(test)]\nmod tests {\n    fn helper() { println!(\"debug\"); }\n}\n",
        )
        .unwrap();

        let mut violations = Vec::new();
        check_file(&file, &mut violations);

        fs::remove_file(&file).ok();
        assert!(violations.is_empty());
    }
}
