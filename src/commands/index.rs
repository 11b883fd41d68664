use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use wikidump::import::{open_text_file, IndexReader, IndexSummaryReader};

const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Print wrap-corrected index entries, or one `offset<TAB>count` line per segment
pub fn show_index(path: PathBuf, summary: bool) -> Result<()> {
    let reader = open_text_file(&path, READ_BUFFER_SIZE)
        .with_context(|| format!("Failed to open index {}", path.display()))?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut lines = 0u64;
    if summary {
        for chunk in IndexSummaryReader::new(reader)? {
            let chunk = chunk?;
            writeln!(out, "{}\t{}", chunk.offset, chunk.count)?;
            lines += 1;
        }
    } else {
        for entry in IndexReader::new(reader) {
            writeln!(out, "{}", entry?)?;
            lines += 1;
        }
    }
    out.flush()?;

    info!("Wrote {} lines from {}", lines, path.display());
    Ok(())
}
