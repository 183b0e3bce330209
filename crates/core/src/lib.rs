//! Core library: comic-folder scanning, paging, title cleaning, poster
//! resolution and the local caches behind it.

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod history;
pub mod library;
pub mod pagination;
pub mod resolver;
pub mod scanner;
pub mod title;

pub use library::Library;
pub use providers::{Entry, Metadata, ScanPage};
