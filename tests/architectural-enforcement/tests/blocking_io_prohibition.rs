//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code in the engine core and CLI must not perform
//! blocking I/O from async contexts.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::process` instead of
//! `std::fs`, `std::net`, `std::process` in async code.
//!
//! Blocking calls are acceptable in non-async setup paths (config loading
//! before the runtime starts) and inside tests. Top-level `use std::fs`
//! imports count as violations: they invite blocking calls from anywhere in
//! the file.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees, relative to the workspace root
const PRODUCTION_DIRS: [&str; 2] = ["engine/core/src", "engine/cli/src"];

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O found in async production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN in async code:");
        eprintln!("  - std::fs::read(), std::fs::write(), std::fs::File");
        eprintln!("  - std::net::TcpStream, std::net::TcpListener");
        eprintln!("  - std::process::Command::output()");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("\n✅ REQUIRED:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - tokio::net::TcpStream::connect().await");
        eprintln!("  - tokio::process::Command::output().await");
        eprintln!("\n✅ ACCEPTABLE blocking I/O:");
        eprintln!("  - Non-async functions (config loading before the runtime)");
        eprintln!("  - Test code");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in production code
fn find_blocking_io_violations() -> Vec<String> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        check_directory(&root.join(dir), &mut violations);
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

fn check_directory(path: &Path, violations: &mut Vec<String>) {
    assert!(
        path.exists(),
        "production directory missing: {} (was the tree restructured?)",
        path.display()
    );

    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            check_file(entry.path(), violations);
        }
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let line_number = idx + 1;

        // Strip comments and doc lines
        let code_part = line.split("//").next().unwrap_or(line);

        if is_in_test_function(&lines, idx) {
            continue;
        }

        // Blocking I/O is fine before the runtime starts
        if is_in_non_async_function(&lines, idx) {
            continue;
        }

        if code_part.contains("std::fs::") || code_part.contains("use std::fs") {
            violations.push(format!(
                "{}:{} - Blocking file I/O: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }

        if code_part.contains("std::net::") || code_part.contains("use std::net") {
            violations.push(format!(
                "{}:{} - Blocking network I/O: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }

        if code_part.contains("std::process::Command") && !code_part.contains("tokio::process") {
            violations.push(format!(
                "{}:{} - Blocking process I/O: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }

        if code_part.contains("reqwest::blocking") {
            violations.push(format!(
                "{}:{} - Blocking HTTP client: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }

        if (code_part.contains("std::io::stdin()") || code_part.contains("std::io::stdout()"))
            && is_in_async_function(&lines, idx)
        {
            violations.push(format!(
                "{}:{} - Blocking stdin/stdout in async: {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }
    }
}

/// Whether a line opens a function, visibility modifiers included
fn is_fn_signature(line: &str) -> bool {
    line.starts_with("fn ") || line.contains(" fn ")
}

/// Check if line is inside a test function
fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    // Scan backwards to find the enclosing function
    let mut found_fn_idx = None;
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if is_fn_signature(line) {
            found_fn_idx = Some(i);
            break;
        }

        // Stop at module boundaries
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }

    // If we found a function, check if it has a test marker
    if let Some(fn_idx) = found_fn_idx {
        for i in (0..fn_idx).rev() {
            let line = lines[i].trim();

            if line.starts_with("#[test]")
                || line.starts_with("#[tokio::test")
                || line.starts_with("#[cfg(test)]")
            {
                return true;
            }

            if is_fn_signature(line) || line.starts_with("mod ") || line.starts_with("impl ") {
                break;
            }
        }
    }

    false
}

/// Check if line is inside an async function
fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.contains("async fn ") {
            return true;
        }

        if is_fn_signature(line) && !line.contains("async") {
            return false;
        }

        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }
    false
}

/// Check if line is inside a non-async function (acceptable for blocking I/O)
fn is_in_non_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.contains("async fn ") {
            return false;
        }

        if is_fn_signature(line) {
            return true;
        }

        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detection() {
        let test_code = vec![
            "async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];

        assert!(
            is_in_async_function(&test_code, 1),
            "Should detect async function"
        );
        assert!(
            !is_in_non_async_function(&test_code, 1),
            "Should not be in non-async function"
        );
    }

    #[test]
    fn test_public_sync_function_detection() {
        let test_code = vec![
            "pub fn load_settings() -> Result<Settings, Error> {",
            "    let contents = std::fs::read_to_string(\"settings.toml\")?;",
            "}",
        ];

        assert!(
            is_in_non_async_function(&test_code, 1),
            "Visibility modifiers should not hide the function"
        );
    }

    #[test]
    fn test_public_async_function_detection() {
        let test_code = vec![
            "pub async fn fetch() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];

        assert!(is_in_async_function(&test_code, 1));
        assert!(!is_in_non_async_function(&test_code, 1));
    }

    #[test]
    fn test_test_function_detection() {
        let test_code = vec![
            "#[test]",
            "fn test_something() {",
            "    let contents = std::fs::read_to_string(\"test.txt\")?;",
            "}",
        ];

        assert!(
            is_in_test_function(&test_code, 2),
            "Should detect test function"
        );
    }
}
