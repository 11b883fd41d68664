//! Parallel reader for multistream dumps
//!
//! ```text
//!   index ──► distributor ──► work queue ──► worker 1..N ──► result queue ──► consumer
//!                                              │ seek + BzDecoder per chunk
//!                                              ▼
//!                                           payload
//! ```
//!
//! The distributor summarizes the index into chunks (one per compressed
//! segment) and feeds them to a bounded queue. Each worker owns its own
//! payload handle, seeks to a chunk's offset and decodes exactly the pages
//! the index declared for it. A coordinator thread waits for everyone and
//! closes the result queue, which ends iteration. Pages arrive in completion
//! order; within a chunk they keep their dump order.

use super::index::{IndexChunk, IndexSummaryReader, Summary};
use super::page::{Page, PageDecoder, SiteInfo};
use super::payload::{open_text, SeekableSource};
use super::source::ImportError;
use crate::config::ReaderConfig;
use bzip2::read::BzDecoder;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type PageResult = Result<Page, ImportError>;

/// Pages of a multistream dump, decoded by a pool of workers
pub struct IndexedReader {
    site_info: SiteInfo,
    results: Receiver<PageResult>,
    stop: Arc<AtomicBool>,
    coordinator: Option<JoinHandle<()>>,
    finished: bool,
}

impl IndexedReader {
    /// Start reading with default queue sizes and `workers` threads
    pub fn open<I, P>(index: I, payload: P, workers: usize) -> Result<Self, ImportError>
    where
        I: SeekableSource,
        P: SeekableSource,
    {
        Self::with_config(index, payload, &ReaderConfig::with_workers(workers))
    }

    /// Read the dump's site info, then start the distributor and worker threads
    ///
    /// Fails before any thread starts if the configuration is invalid or the
    /// payload head is not a MediaWiki export.
    pub fn with_config<I, P>(index: I, payload: P, config: &ReaderConfig) -> Result<Self, ImportError>
    where
        I: SeekableSource,
        P: SeekableSource,
    {
        if config.workers == 0 {
            return Err(ImportError::Config("at least one worker is required".into()));
        }
        if config.work_queue_capacity == 0 || config.result_queue_capacity == 0 {
            return Err(ImportError::Config("queue capacities must be positive".into()));
        }

        let site_info = read_head(&payload, config.read_buffer_size)?;
        tracing::info!(
            "Reading {} with {} workers (index {})",
            payload.describe(),
            config.workers,
            index.describe()
        );

        let (work_tx, work_rx) = bounded::<IndexChunk>(config.work_queue_capacity);
        let (result_tx, results) = bounded::<PageResult>(config.result_queue_capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let payload = Arc::new(payload);

        let mut handles = Vec::with_capacity(config.workers + 1);
        for id in 0..config.workers {
            let worker = SegmentWorker {
                id,
                payload: Arc::clone(&payload),
                work: work_rx.clone(),
                results: result_tx.clone(),
                stop: Arc::clone(&stop),
                buffer_size: config.read_buffer_size,
            };
            let handle = thread::Builder::new()
                .name(format!("wikidump-worker-{}", id))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }
        drop(work_rx);

        let distributor = {
            let results = result_tx.clone();
            let stop = Arc::clone(&stop);
            let buffer_size = config.read_buffer_size;
            thread::Builder::new()
                .name("wikidump-distributor".into())
                .spawn(move || distribute(index, buffer_size, work_tx, results, stop))?
        };
        handles.push(distributor);

        let coordinator = thread::Builder::new()
            .name("wikidump-coordinator".into())
            .spawn(move || coordinate(handles, result_tx))?;

        Ok(Self {
            site_info,
            results,
            stop,
            coordinator: Some(coordinator),
            finished: false,
        })
    }

    pub fn site_info(&self) -> &SiteInfo {
        &self.site_info
    }

    /// Ask all threads to stop; pages already decoded may still be returned
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

impl Iterator for IndexedReader {
    type Item = PageResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.results.recv() {
            Ok(Err(e)) if e.is_fatal() => {
                self.cancel();
                self.finished = true;
                Some(Err(e))
            }
            Ok(item) => Some(item),
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

impl Drop for IndexedReader {
    fn drop(&mut self) {
        self.cancel();
        // Workers stop at their next page; draining unblocks any pending send
        while self.results.recv().is_ok() {}
        if let Some(handle) = self.coordinator.take() {
            let _ = handle.join();
        }
    }
}

/// Read `<mediawiki><siteinfo>` from the first segment of the payload
fn read_head<P: SeekableSource>(payload: &P, buffer_size: usize) -> Result<SiteInfo, ImportError> {
    let reader = payload.open_reader()?;
    let mut decoder = PageDecoder::new(BufReader::with_capacity(buffer_size, BzDecoder::new(reader)));
    decoder.read_site_info()
}

/// Summarize the index and hand out chunks until it is exhausted
fn distribute<I: SeekableSource>(
    index: I,
    buffer_size: usize,
    work: Sender<IndexChunk>,
    results: Sender<PageResult>,
    stop: Arc<AtomicBool>,
) {
    let fail = |e: ImportError| {
        let e = e.on_index();
        tracing::error!("Index {} unusable: {}", index.describe(), e);
        stop.store(true, Ordering::Relaxed);
        let _ = results.send(Err(e));
    };

    let mut summary = match index
        .open_reader()
        .and_then(|r| open_text(r, buffer_size))
        .map_err(ImportError::from)
        .and_then(IndexSummaryReader::new)
    {
        Ok(summary) => summary,
        Err(e) => return fail(e),
    };

    let mut chunks = 0u64;
    let mut pages = 0u64;
    loop {
        if stop.load(Ordering::Relaxed) {
            tracing::debug!("Distributor stopping after {} chunks", chunks);
            return;
        }

        let step = match summary.next_summary() {
            Ok(step) => step,
            Err(e) => return fail(e),
        };
        let chunk = step.chunk();
        if chunk.count > 0 {
            tracing::debug!("Chunk at {} with {} pages", chunk.offset, chunk.count);
            if work.send(chunk).is_err() {
                return;
            }
            chunks += 1;
            pages += chunk.count as u64;
        }
        if let Summary::Final(_) | Summary::Exhausted = step {
            break;
        }
    }

    tracing::info!("Index summarized: {} chunks, {} pages declared", chunks, pages);
}

/// Decodes chunks pulled from the work queue
struct SegmentWorker<P> {
    id: usize,
    payload: Arc<P>,
    work: Receiver<IndexChunk>,
    results: Sender<PageResult>,
    stop: Arc<AtomicBool>,
    buffer_size: usize,
}

/// How a chunk ended
enum ChunkOutcome {
    Done,
    /// A segment failed but the next chunk may still be readable
    Failed(ImportError),
    /// The worker cannot continue
    Exit,
}

impl<P: SeekableSource> SegmentWorker<P> {
    fn run(self) {
        let mut handle = match self.payload.open_reader() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Worker {} cannot open payload: {}", self.id, e);
                let _ = self.results.send(Err(ImportError::Worker {
                    worker: self.id,
                    reason: e.to_string(),
                }));
                return;
            }
        };

        let mut decoded_chunks = 0usize;
        for chunk in self.work.iter() {
            if self.stopped() {
                break;
            }
            match self.decode_chunk(&mut handle, chunk) {
                ChunkOutcome::Done => decoded_chunks += 1,
                ChunkOutcome::Failed(e) => {
                    tracing::warn!("Worker {}: {}", self.id, e);
                    if self.results.send(Err(e)).is_err() {
                        return;
                    }
                }
                ChunkOutcome::Exit => return,
            }
        }
        tracing::debug!("Worker {} finished after {} chunks", self.id, decoded_chunks);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn decode_chunk<R: Read + Seek>(&self, handle: &mut R, chunk: IndexChunk) -> ChunkOutcome {
        let segment_error = |decoded: usize, reason: String| {
            ChunkOutcome::Failed(ImportError::Segment {
                offset: chunk.offset,
                decoded,
                declared: chunk.count,
                reason,
            })
        };

        let Ok(position) = u64::try_from(chunk.offset) else {
            return segment_error(0, "negative offset".into());
        };
        if let Err(e) = handle.seek(SeekFrom::Start(position)) {
            let _ = self.results.send(Err(ImportError::Worker {
                worker: self.id,
                reason: format!("seek to {} failed: {}", position, e),
            }));
            return ChunkOutcome::Exit;
        }

        let segment = BufReader::with_capacity(self.buffer_size, BzDecoder::new(handle.by_ref()));
        let mut decoder = PageDecoder::new(segment);

        for decoded in 0..chunk.count {
            if self.stopped() {
                return ChunkOutcome::Exit;
            }
            match decoder.next_page() {
                Ok(Some(page)) => {
                    if self.results.send(Ok(page)).is_err() {
                        return ChunkOutcome::Exit;
                    }
                }
                Ok(None) => return segment_error(decoded, "segment ended early".into()),
                Err(ImportError::Io(e)) if !ImportError::is_corrupt_data(&e) => {
                    tracing::warn!("Worker {} lost its payload handle: {}", self.id, e);
                    let _ = self.results.send(Err(ImportError::Worker {
                        worker: self.id,
                        reason: format!("read at segment {} failed: {}", chunk.offset, e),
                    }));
                    return ChunkOutcome::Exit;
                }
                Err(e) => return segment_error(decoded, e.to_string()),
            }
        }
        ChunkOutcome::Done
    }
}

/// Wait for every pipeline thread, then close the result queue
fn coordinate(handles: Vec<JoinHandle<()>>, results: Sender<PageResult>) {
    for handle in handles {
        let name = handle.thread().name().unwrap_or("unnamed").to_string();
        if handle.join().is_err() {
            tracing::error!("Thread {} panicked", name);
            let _ = results.send(Err(ImportError::Internal(format!("thread {} panicked", name))));
        }
    }
    tracing::debug!("All reader threads finished");
}
