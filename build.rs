use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "examples"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");
    println!("cargo:rerun-if-changed=src");

    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=CONDUCTOR_GIT_SHA={}", sha);

    let root = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"));
    let files = collect_rust_files(&root);

    enforce_line_limits(&root, &files);
    enforce_no_dead_code_allows(&root, &files);
    enforce_serial_for_env_mutations(&root, &files);
}

fn collect_rust_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in ["src", "tests"] {
        walk_directory(&root.join(dir), &mut files);
    }
    files
}

fn walk_directory(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            if !EXCLUDED_DIRS.contains(&name.as_ref()) {
                walk_directory(&path, files);
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
            files.push(path);
        }
    }
}

fn relative<'a>(path: &'a Path, root: &Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let count = content.lines().filter(|l| !l.trim().is_empty()).count();
        if count > MAX_LINES {
            violations.push((file, count));
        }
    }

    if !violations.is_empty() {
        eprintln!("\n========================================");
        eprintln!("FILE LINE LIMIT EXCEEDED ({} non-empty lines)", MAX_LINES);
        eprintln!("========================================");
        for (path, count) in &violations {
            eprintln!("  {}: {} lines", relative(path, root), count);
        }
        eprintln!("\nSplit large files into focused modules.");
        eprintln!("========================================\n");
        panic!("Build failed: {} file(s) exceed the line limit.", violations.len());
    }
}

fn enforce_no_dead_code_allows(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push(format!("{}:{}", relative(file, root), line_num + 1));
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n========================================");
        eprintln!("#[allow(dead_code)] IS NOT ALLOWED");
        eprintln!("========================================");
        for location in &violations {
            eprintln!("  {}", location);
        }
        eprintln!("\nDelete unused code, or gate test helpers with #[cfg(test)].");
        eprintln!("========================================\n");
        panic!(
            "Build failed: {} #[allow(dead_code)] occurrence(s) found.",
            violations.len()
        );
    }
}

/// Tests that touch process environment must run under `#[serial]`.
fn enforce_serial_for_env_mutations(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        let mut has_serial = false;
        let mut in_test_fn = false;
        let mut test_fn_name = String::new();
        let mut depth: i32 = 0;

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed == "#[serial]" || trimmed == "#[serial_test::serial]" {
                has_serial = true;
            }
            if trimmed == "#[test]" || trimmed.starts_with("#[tokio::test") {
                if let Some(sig) = lines.iter().skip(i + 1).take(4).find(|l| l.contains("fn ")) {
                    test_fn_name = sig
                        .split("fn ")
                        .nth(1)
                        .and_then(|rest| rest.split('(').next())
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    in_test_fn = true;
                    depth = 0;
                }
            }
            if !in_test_fn {
                continue;
            }
            for c in line.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            let mutates = !trimmed.starts_with("//")
                && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"));
            if mutates && !has_serial {
                violations.push(format!(
                    "{}:{} test `{}` mutates env without #[serial]",
                    relative(file, root),
                    i + 1,
                    test_fn_name
                ));
                in_test_fn = false;
            }
            if depth == 0 && trimmed.ends_with('}') {
                in_test_fn = false;
                has_serial = false;
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n========================================");
        eprintln!("ENV MUTATION WITHOUT #[serial]");
        eprintln!("========================================");
        for violation in &violations {
            eprintln!("  {}", violation);
        }
        eprintln!("\nAdd #[serial] from serial_test to the test.");
        eprintln!("========================================\n");
        panic!("Build failed: {} unserialized env mutation(s).", violations.len());
    }
}
