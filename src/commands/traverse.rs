use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use wikidump::config::Config;
use wikidump::import::{
    DumpLayout, FileSource, IndexedReader, Page, PageStream, SingleStreamReader,
    TraverseProgress,
};
use wikidump::wikitext::{parse_coords, CoordError};

/// Arguments of the `traverse` command
pub struct TraverseOptions {
    pub dump: PathBuf,
    pub index: Option<PathBuf>,
    pub workers: Option<usize>,
    pub parse_coords: bool,
    pub errors: Option<PathBuf>,
    pub quiet: bool,
}

/// A page whose coordinates could not be parsed, as written to the errors file
#[derive(Serialize)]
struct CoordFailure<'a> {
    error: String,
    page: &'a Page,
}

pub fn traverse_dump(config: Config, options: TraverseOptions) -> Result<()> {
    if !options.dump.exists() {
        anyhow::bail!("Dump file not found: {}", options.dump.display());
    }

    let mut reader_config = config.reader.clone();
    if let Some(workers) = options.workers {
        reader_config.workers = workers;
    }
    let parse = options.parse_coords || config.traverse.parse_coords;

    let stream: Box<dyn PageStream> = match options.index {
        Some(ref index) => {
            info!(
                "Reading multistream dump {} with index {}",
                options.dump.display(),
                index.display()
            );
            let index = FileSource::open(index)
                .with_context(|| format!("Failed to open index {}", index.display()))?;
            let payload = FileSource::open(&options.dump)
                .with_context(|| format!("Failed to open dump {}", options.dump.display()))?;
            Box::new(IndexedReader::with_config(index, payload, &reader_config)?)
        }
        None => {
            if DumpLayout::detect(&options.dump) == DumpLayout::Multistream {
                info!("No index given, reading multistream dump sequentially");
            }
            let payload = FileSource::open(&options.dump)
                .with_context(|| format!("Failed to open dump {}", options.dump.display()))?;
            Box::new(SingleStreamReader::open(payload)?)
        }
    };

    let site = stream.site_info();
    info!("Got site info: {} ({})", site.site_name, site.generator);

    let mut errors_out = match options.errors {
        Some(ref path) => Some(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create errors file {}", path.display()))?,
        )),
        None => None,
    };

    let progress = TraverseProgress::new(config.traverse.report_interval, options.quiet);

    for result in stream {
        let page = match result {
            Ok(page) => page,
            Err(e) if e.is_fatal() => {
                progress.cancel();
                return Err(e).context("Traversal aborted");
            }
            Err(e) => {
                warn!("{}", e);
                progress.error(&e.to_string());
                continue;
            }
        };

        progress.page_read(&page.title);

        if parse {
            match parse_coords(page.text()) {
                Ok(_) => progress.coords(true),
                Err(CoordError::NotFound) => {}
                Err(e) => {
                    progress.coords(false);
                    warn!("Error parsing coords from {:?}: {}", page.title, e);
                    if let Some(ref mut out) = errors_out {
                        let record = CoordFailure {
                            error: e.to_string(),
                            page: &page,
                        };
                        serde_json::to_writer(&mut *out, &record)?;
                        out.write_all(b"\n")?;
                    }
                }
            }
        }
    }

    if let Some(mut out) = errors_out {
        out.flush()?;
    }

    progress.finish();
    let stats = progress.get_stats();
    info!(
        "Finished after {:.1}s: {} pages, {} errors ({:.1} pages/s)",
        stats.elapsed_seconds, stats.pages_read, stats.errors, stats.pages_per_second
    );
    if !options.quiet {
        progress.print_summary(parse);
    }

    Ok(())
}
