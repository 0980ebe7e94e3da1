#![warn(unused_crate_dependencies)]
#![warn(unused_qualifications)]
#![warn(clippy::print_stdout)]

//! Line-indexing and search engine for interactively viewing very large
//! text files, driven over a newline-delimited JSON protocol on stdio.

pub mod byte_source;
pub mod config;
pub mod encoding;
pub mod error;
pub mod ignore_poison;
pub mod line_index;
pub mod parsing;
pub mod protocol;
pub mod query;
pub mod session;
pub mod watcher;
