use anyhow::{Context, Result, bail};
use glob::Pattern;
use treepack_lib::path::{SEPARATOR, is_dir_entry, resolve};
use treepack_lib::{Config, Storage, enumerate};

/// Lists the relative paths to pack: the configured `include` list, or a walk of
/// `base_path + target_dir`, minus anything matching a `skip` pattern.
///
/// A skipped directory takes its whole subtree with it.
pub fn list_entries<S: Storage>(storage: &S, config: &Config) -> Result<Vec<String>> {
    let base_path = config.base_path.as_deref().unwrap_or_default();
    let target_dir = config.target_dir.as_deref().unwrap_or_default();

    let entries = match &config.include {
        Some(include) => include.clone(),
        None => enumerate(storage, base_path, target_dir)
            .with_context(|| format!("listing {base_path:?} (target dir {target_dir:?})"))?,
    };

    // Compile skip patterns with proper error handling
    let skip_patterns: Vec<Pattern> = config
        .skip
        .as_ref()
        .map(|patterns| {
            patterns
                .iter()
                .map(|p| Pattern::new(p).with_context(|| format!("invalid skip pattern: {p}")))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(filter_skipped(entries, &skip_patterns))
}

fn is_skipped(path: &str, patterns: &[Pattern]) -> bool {
    let path = path.trim_end_matches(SEPARATOR);
    patterns.iter().any(|p| p.matches(path))
}

fn filter_skipped(entries: Vec<String>, patterns: &[Pattern]) -> Vec<String> {
    if patterns.is_empty() {
        return entries;
    }

    let mut skipped_dirs: Vec<String> = Vec::new();
    entries
        .into_iter()
        .filter(|entry| {
            if skipped_dirs.iter().any(|dir| entry.starts_with(dir.as_str())) {
                return false;
            }
            if is_skipped(entry, patterns) {
                if is_dir_entry(entry) {
                    skipped_dirs.push(entry.clone());
                }
                tracing::debug!(entry = %entry, "skipped by pattern");
                return false;
            }
            true
        })
        .collect()
}

/// Sums the sizes of all non-directory entries and checks them against `max_size`.
pub fn total_size<S: Storage>(storage: &S, config: &Config, entries: &[String]) -> Result<u64> {
    let base_path = config.base_path.as_deref().unwrap_or_default();

    let mut total: u64 = 0;
    for entry in entries.iter().filter(|e| !is_dir_entry(e)) {
        let path = resolve(base_path, entry);
        let meta = storage
            .stat(&path)
            .with_context(|| format!("reading metadata of {path}"))?;
        if !meta.is_dir {
            total += meta.len;
        }
    }

    if let Some(limit_str) = config.max_size.as_deref() {
        let limit = parse_size(limit_str)?;
        if limit > 0 && total > limit {
            bail!(
                "total size {} exceeds limit {} ({} bytes)",
                encode_size(total),
                limit_str,
                limit
            );
        }
    }

    Ok(total)
}

/// Parse human-readable sizes in both binary (Ki/Mi/Gi) and decimal (KB/MB/GB) units.
/// Examples: "512Mi", "10Gi", "1MB", "500kb", "1024", "2.5GB"
pub fn parse_size(s: &str) -> Result<u64> {
    const SUFFIXES: [(&str, u64); 8] = [
        ("ki", 1 << 10),
        ("mi", 1 << 20),
        ("gi", 1 << 30),
        ("ti", 1 << 40),
        ("kb", 1_000),
        ("mb", 1_000_000),
        ("gb", 1_000_000_000),
        ("tb", 1_000_000_000_000),
    ];

    let s = s.trim().to_ascii_lowercase();
    let (multiplier, number_str) = SUFFIXES
        .iter()
        .find_map(|(suffix, mult)| s.strip_suffix(suffix).map(|n| (*mult, n)))
        .unwrap_or((1, s.as_str()));

    let number: f64 = number_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {s}"))?;
    if number < 0.0 {
        bail!("Size must not be negative: {s}");
    }

    Ok((number * multiplier as f64) as u64)
}

/// Convert bytes into a human-friendly string using binary (KiB, MiB, GiB...) units.
pub fn encode_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    // Format with one decimal if needed (e.g., 1.0 MiB -> 1 MiB)
    if (size * 10.0) % 10.0 == 0.0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
