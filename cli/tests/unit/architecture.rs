//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries
//! (domain → application → infra → presentation) are maintained.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

fn src_dir(layer: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(layer)
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Production (non-test, non-comment) lines of a file, with 1-based line numbers.
fn production_lines(file: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(file) else {
        return Vec::new();
    };
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") || trimmed.starts_with("/*") {
                None
            } else {
                Some((i + 1, line.to_string()))
            }
        })
        .collect()
}

/// Scan a layer for forbidden substrings in production code.
fn violations_in(layer: &str, forbidden: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir(layer)) {
        let rel = relative(&file);
        for (lineno, line) in production_lines(&file) {
            for needle in forbidden {
                if line.contains(needle) {
                    violations.push(format!("{rel}:{lineno}: found `{needle}`: {}", line.trim()));
                }
            }
        }
    }
    violations
}

// ── Domain purity ────────────────────────────────────────────────────────────

#[test]
fn domain_has_no_outer_layer_imports_or_io() {
    let violations = violations_in(
        "domain",
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
            "reqwest",
        ],
    );

    assert!(
        violations.is_empty(),
        "domain/ must stay pure:\n{}",
        violations.join("\n")
    );
}

// ── Application layer boundary ───────────────────────────────────────────────

#[test]
fn application_has_no_infra_or_output_imports() {
    let violations = violations_in(
        "application",
        &["crate::infra", "crate::output", "crate::commands", "crate::app::"],
    );

    assert!(
        violations.is_empty(),
        "application/ must depend only on domain/ and its own ports:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_has_no_blocking_io() {
    let violations = violations_in(
        "application",
        &["std::fs::", "std::process::Command", "std::thread::sleep"],
    );

    assert!(
        violations.is_empty(),
        "application/ must not perform blocking I/O:\n{}",
        violations.join("\n")
    );
}

// ── Infra boundary ───────────────────────────────────────────────────────────

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = violations_in("infra", &["crate::commands", "crate::output", "crate::app::"]);

    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = violations_in("infra", &["println!", "eprintln!"]);

    assert!(
        violations.is_empty(),
        "infra/ must log through tracing, not print macros:\n{}",
        violations.join("\n")
    );
}

// ── Command handlers ─────────────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir("commands")) {
        let rel = relative(&file);
        for (lineno, line) in production_lines(&file) {
            let trimmed = line.trim();
            if line.contains("json: bool")
                || trimmed.starts_with("if json")
                || trimmed.starts_with("if !json")
                || trimmed.starts_with("if app.is_json()")
            {
                violations.push(format!("{rel}:{lineno}: inline JSON branch: {trimmed}"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found inline JSON branching in commands/: use app.renderer() instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn process_spawning_stays_in_infra() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let infra = src_dir("infra");

    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&src) {
        if file.starts_with(&infra) {
            continue;
        }
        let rel = relative(&file);
        for (lineno, line) in production_lines(&file) {
            if line.contains("Command::new(") {
                violations.push(format!("{rel}:{lineno}: {}", line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "External processes must be spawned through infra/command_runner:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_module_level_dead_code_allows_in_layers() {
    let mut violations: Vec<String> = Vec::new();

    for layer in ["domain", "application", "infra", "output", "commands"] {
        for file in collect_rs_files(&src_dir(layer)) {
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            if content.contains("#![allow(dead_code)]") {
                violations.push(relative(&file));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Module-level #![allow(dead_code)] hides unused code:\n{}",
        violations.join("\n")
    );
}
