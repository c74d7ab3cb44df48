//! Best-effort naming of the expression passed to a dump call.
//!
//! Everything here may come back empty: sources move, lines get reformatted,
//! binaries ship without their source tree.

use std::panic::Location;
use std::path::{Path, PathBuf};

/// Call syntaxes whose first argument is the dumped expression.
const CALL_NAMES: [&str; 2] = ["capture", "p"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub variable: String,
}

impl CallSite {
    pub fn from_location(location: &Location<'_>) -> Self {
        let file = location.file().to_string();
        let line = location.line();
        let variable = read_source_line(Path::new(&file), line)
            .and_then(|src| variable_name(&src))
            .unwrap_or_default();
        Self {
            file,
            line,
            variable,
        }
    }
}

fn read_source_line(file: &Path, line: u32) -> Option<String> {
    let idx = usize::try_from(line).ok()?.checked_sub(1)?;
    let cwd = std::env::current_dir().ok()?;
    let text = std::fs::read_to_string(source_path(file, &cwd)).ok()?;
    text.lines().nth(idx).map(str::to_string)
}

/// Relative locations are relative to the caller's build root, which is the
/// working directory under `cargo run` and `cargo test`.
fn source_path(file: &Path, cwd: &Path) -> PathBuf {
    if file.is_relative() {
        cwd.join(file)
    } else {
        file.to_path_buf()
    }
}

/// Extracts the first argument of a recognized call on `line`.
///
/// `prof.capture(&user.roles, 3, None)` yields `user.roles`.
pub fn variable_name(line: &str) -> Option<String> {
    let start = CALL_NAMES.iter().find_map(|name| find_call(line, name))?;
    let rest = line.get(start..)?;

    let mut depth = 0usize;
    let mut end = rest.len();
    for (i, c) in rest.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => {
                end = i;
                break;
            }
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    let arg = rest.get(..end)?.trim();
    let arg = arg.strip_prefix("&mut ").unwrap_or(arg);
    let arg = arg.strip_prefix('&').unwrap_or(arg).trim();
    (!arg.is_empty()).then(|| arg.to_string())
}

/// Byte offset just past `name(` where `name` stands alone as an identifier.
fn find_call(line: &str, name: &str) -> Option<usize> {
    let needle = format!("{name}(");
    let mut from = 0;
    while let Some(pos) = line.get(from..)?.find(&needle) {
        let at = from + pos;
        let standalone = line[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        if standalone {
            return Some(at + needle.len());
        }
        from = at + needle.len();
    }
    None
}
