//! # Directory Watcher
//!
//! Detects media files in the source directory: once at startup through
//! [`BootstrapScanner`], then live through [`DirectoryWatcher`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  BootstrapScanner ──────────────────────┐                       │
//! │                                          ▼                       │
//! │  notify ──► FileEvent ──► [Debouncer] ──► mpsc ──► consumer      │
//! │               │                                                 │
//! │               ▼                                                 │
//! │           classify()                                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod scanner;
pub mod watcher;

pub use config::WatchConfig;
pub use debounce::Debouncer;
pub use error::{Result, WatcherError};
pub use event::{FileEvent, FileEventKind};
pub use scanner::{BootstrapScanner, ScanResult};
pub use watcher::DirectoryWatcher;
