//! CLI command implementations

mod index;
mod init;
mod traverse;

pub use index::show_index;
pub use init::init_config;
pub use traverse::{traverse_dump, TraverseOptions};
