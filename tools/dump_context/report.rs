//! Write the concatenated context report.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::compress::{compress_content, CompressionMode};
use crate::walker::{collect_files, display_relative};

const BLOCK_RULE: &str = "====================";
const NAME_RULE: &str = "--------------------";

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("'{0}' is not a valid directory")]
    NotADirectory(PathBuf),
    #[error("cannot open output file '{path}': {source}")]
    OutputOpen { path: PathBuf, source: io::Error },
    #[error("failed to scan '{path}': {source}")]
    Scan { path: PathBuf, source: io::Error },
    #[error("failed to write report: {0}")]
    Write(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    pub output: PathBuf,
    pub written: usize,
    /// Unreadable files and directories below the root.
    pub skipped: usize,
}

/// Walk `root`, then write every dumpable file into `output`.
pub fn generate_project_context(
    root: &Path,
    output: &Path,
    mode: CompressionMode,
) -> Result<DumpSummary, DumpError> {
    if !root.is_dir() {
        return Err(DumpError::NotADirectory(root.to_path_buf()));
    }
    let root = root
        .canonicalize()
        .map_err(|source| DumpError::Scan { path: root.to_path_buf(), source })?;

    info!("Scanning directory: {}", root.display());
    info!("Compression level: {}", mode.label());

    let mut files = Vec::new();
    let unreadable_dirs = collect_files(&root, &mut files)
        .map_err(|source| DumpError::Scan { path: root.clone(), source })?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|source| DumpError::OutputOpen { path: output.to_path_buf(), source })?;
        }
    }
    let file = File::create(output)
        .map_err(|source| DumpError::OutputOpen { path: output.to_path_buf(), source })?;

    // The report may live inside the tree being dumped; never include it.
    if let Ok(out_canon) = output.canonicalize() {
        files.retain(|p| p.canonicalize().map(|c| c != out_canon).unwrap_or(true));
    }

    let mut out = BufWriter::new(file);
    let (written, unreadable_files) = write_report(&root, &files, mode, &mut out)?;
    out.flush()?;

    let output = output.canonicalize().unwrap_or_else(|_| output.to_path_buf());
    Ok(DumpSummary {
        output,
        written,
        skipped: unreadable_dirs + unreadable_files,
    })
}

/// Write the header and one block per readable file. Returns (written, skipped).
pub fn write_report<W: Write>(
    root: &Path,
    files: &[PathBuf],
    mode: CompressionMode,
    out: &mut W,
) -> io::Result<(usize, usize)> {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    write!(out, "该路径名称: {root_name}\n\n")?;

    let mut written = 0;
    let mut skipped = 0;
    for path in files {
        let rel = display_relative(root, path);
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!("Cannot read file {}: {}", rel, e);
                skipped += 1;
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        let content = compress_content(&content, mode);

        info!("Processing: {}", rel);
        writeln!(out, "{BLOCK_RULE}")?;
        writeln!(out, "文件名: {rel}")?;
        writeln!(out, "{NAME_RULE}")?;
        write!(out, "下面是完整代码:\n\n")?;
        out.write_all(content.as_bytes())?;
        write!(out, "\n\n")?;
        written += 1;
    }
    Ok((written, skipped))
}
