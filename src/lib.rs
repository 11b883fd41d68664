//! wikidump: readers for Wikimedia XML dumps
//!
//! - Sequential reading of single-stream or multistream dumps, plain or bzip2
//! - Parallel decoding of multistream dumps driven by their page index,
//!   with offset wraparound correction for published indexes
//! - Helpers for coordinates, links and file references in wikitext

pub mod config;
pub mod import;
pub mod wikitext;

pub use config::Config;
pub use import::{open_indexed, open_single, ImportError, Page, PageStream, SiteInfo};
