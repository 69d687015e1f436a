use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_TEMPLATE: &str = "treepack_%datetime%_%rand%.zip";

/// Resolves the output file path. A path without an extension is treated as a
/// directory and gets the default file name template.
///
/// Placeholders (case-insensitive): `%datetime%`, `%date%`, `%time%`, `%unix%`,
/// `%rand%`, `%longrand%`, `%pwd%`. Only the file name is expanded, never the
/// archive contents, so packed bytes stay reproducible.
pub fn create_file_name(input: &str) -> Result<PathBuf> {
    let input_path = Path::new(input);

    let is_file = input_path
        .extension()
        .map(|ext| !ext.is_empty())
        .unwrap_or(false);

    let (dir, template) = if is_file {
        let name = input_path
            .file_name()
            .context("Invalid file name in path")?
            .to_string_lossy()
            .to_string();
        (input_path.parent().unwrap_or_else(|| Path::new("")), name)
    } else {
        (input_path, DEFAULT_TEMPLATE.to_string())
    };

    Ok(dir.join(expand_placeholders(&template)))
}

fn expand_placeholders(template: &str) -> String {
    let now = Utc::now();
    let pwd = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "unknown".into());

    let replacements = [
        ("%datetime%", now.format("%Y-%m-%d_%H-%M-%S").to_string()),
        ("%date%", now.format("%Y-%m-%d").to_string()),
        ("%time%", now.format("%H-%M-%S").to_string()),
        ("%unix%", now.timestamp().to_string()),
        ("%longrand%", random_string(12)),
        ("%rand%", random_string(5)),
        ("%pwd%", pwd),
    ];

    let mut name = template.to_string();
    for (pattern, value) in replacements {
        name = replace_case_insensitive(&name, pattern, &value);
    }
    name
}

/// Generates a random lowercase alphanumeric string.
fn random_string(len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}

/// Case-insensitive substring replacement; `pattern` must be ASCII.
fn replace_case_insensitive(s: &str, pattern: &str, replacement: &str) -> String {
    let lower_s = s.to_ascii_lowercase();
    let lower_pattern = pattern.to_ascii_lowercase();

    let mut result = String::new();
    let mut last_end = 0;
    while let Some(pos) = lower_s[last_end..].find(&lower_pattern) {
        let abs_pos = last_end + pos;
        result.push_str(&s[last_end..abs_pos]);
        result.push_str(replacement);
        last_end = abs_pos + pattern.len();
    }

    result.push_str(&s[last_end..]);
    result
}
