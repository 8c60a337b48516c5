//! `posmon export`: download a diagnostic archive to disk.

use std::path::Path;

use bytesize::ByteSize;

use posmon_core::{ActionPayload, Monitor};

use crate::cli::ExportArgs;
use crate::commands::{Ctx, util};
use crate::error::CliError;

pub async fn handle(monitor: &Monitor, args: ExportArgs, ctx: &Ctx) -> Result<(), CliError> {
    let mask = args.mask.unwrap_or_else(|| ctx.cfg.export.mask.clone());
    let out = args
        .out
        .unwrap_or_else(|| posmon_config::default_export_path(&ctx.cfg));

    let result = monitor.dispatcher().export_diagnostics(&mask).await;
    let Some(ActionPayload::Archive(bytes)) = util::finish(result, ctx)? else {
        return Ok(());
    };

    write_archive(&out, &bytes)?;
    if !ctx.quiet {
        eprintln!("Saved {} to {}", size_label(bytes.len()), out.display());
    }
    Ok(())
}

fn size_label(len: usize) -> String {
    ByteSize::b(u64::try_from(len).unwrap_or(u64::MAX)).to_string()
}

/// Write the archive verbatim, creating the parent directory if needed.
fn write_archive(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    tracing::debug!(path = %path.display(), len = bytes.len(), "archive written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("export.zip");
        write_archive(&path, b"PK\x03\x04data").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04data");
    }

    #[test]
    fn size_label_is_human_readable() {
        assert_eq!(size_label(512), "512 B");
        assert!(size_label(3 * 1024 * 1024).ends_with('B'));
        assert_ne!(size_label(3 * 1024 * 1024), "3145728 B");
    }
}
