//! # Marca Daemon
//!
//! Keeps a target directory filled with watermarked copies of the images and
//! videos in a source directory.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ProcessSupervisor                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  BootstrapScanner ──┐                                            │
//! │                     ├──► Job ──► WorkDispatcher ──► image slots  │
//! │  DirectoryWatcher ──┘               │          └──► video slots  │
//! │                                     ▼                            │
//! │                              MediaProcessor                      │
//! │                                     │                            │
//! │                                     ▼                            │
//! │                          target_dir/ma_<name>                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use marca_daemon::{ProcessSupervisor, RunContext};
//! use marca_media::WatermarkConfig;
//!
//! # async fn example() -> marca_daemon::Result<()> {
//! let context = RunContext::new("/srv/in", "/srv/out", WatermarkConfig::new("/srv/wm.png"));
//! let summary = ProcessSupervisor::new(context)
//!     .run(marca_daemon::signal::shutdown_signal()?)
//!     .await?;
//! println!("{} files watermarked", summary.stats.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod signal;
pub mod supervisor;

pub use cli::Cli;
pub use config::RunContext;
pub use dispatcher::{DispatcherConfig, DispatcherStats, WorkDispatcher};
pub use error::{DaemonError, Result};
pub use job::Job;
pub use supervisor::{ProcessSupervisor, RunSummary};
