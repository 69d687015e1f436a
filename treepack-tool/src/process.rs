use anyhow::{Context, Result};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use treepack_lib::{Config, DiskStorage, PackSummary, archive};

use crate::fs_utils::{encode_size, list_entries, total_size};
use crate::naming::create_file_name;
use crate::sink::{OutSink, save_file::create_file_writer, send_net::send_http};

fn get_output_sink(output: &str) -> Result<OutSink> {
    if output.starts_with("http://") || output.starts_with("https://") {
        Ok(OutSink::UploadToUrl(output.to_string()))
    } else {
        Ok(OutSink::SaveToFile(create_file_name(output)?))
    }
}

/// Lists, checks and packs according to the merged configuration.
pub fn run(config: &Config) -> Result<()> {
    let storage = DiskStorage;
    let base_path = config.base_path.as_deref().unwrap_or_default();

    let entries = list_entries(&storage, config)?;

    if config.list == Some(true) {
        for entry in &entries {
            println!("{entry}");
        }
        return Ok(());
    }

    let total = total_size(&storage, config, &entries)?;
    let sink = get_output_sink(config.output.as_deref().unwrap_or_default())?;

    if config.dry == Some(true) {
        println!("--- DRY RUN ---");
        println!("{}", serde_yaml::to_string(config)?);
        println!("Total entries: {}", entries.len());
        println!("Total size: {}", encode_size(total));
        for entry in &entries {
            println!("  {entry}");
        }
        println!("Output: {sink:?}");
        return Ok(());
    }

    let summary = match sink {
        OutSink::SaveToFile(path) => {
            let mut writer = create_file_writer(&path)?;
            let packed = archive(&storage, &mut writer, base_path, &entries)
                .map_err(anyhow::Error::from)
                .and_then(|summary| {
                    writer.flush()?;
                    Ok(summary)
                });
            if packed.is_err() {
                drop(writer);
                discard_partial(&path);
            }
            let summary = packed.with_context(|| format!("writing {}", path.display()))?;
            println!("Archive written to {}", path.display());
            summary
        }
        OutSink::UploadToUrl(url) => {
            let mut buffer = Cursor::new(Vec::new());
            let summary = archive(&storage, &mut buffer, base_path, &entries)
                .context("building archive for upload")?;
            send_http(&url, buffer.into_inner())?;
            println!("Archive uploaded to {url}");
            summary
        }
    };

    report(&summary);
    Ok(())
}

/// Removes a half-written archive. Returns whether the file was removed.
fn discard_partial(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not remove partial archive"
            );
            false
        }
    }
}

fn report(summary: &PackSummary) {
    println!(
        "Packed {} files ({}), skipped {} directories",
        summary.files,
        encode_size(summary.bytes),
        summary.directories_skipped
    );
}
