//! # Directory Mirror
//!
//! This crate mirrors source directory trees into destination trees,
//! driven by live file system notifications.
//!
//! ## Features
//!
//! - **Quiet-window Debouncing**: Drop repeated events for the same path
//! - **Settle Delays**: Wait out slow writers before copying a file
//! - **Structure-preserving Copies**: Files keep their relative path and timestamps
//! - **Initial Copy**: Baseline mirror of every existing node before watching
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Mirror Service                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  BindingConfig ──► WatchBinding ──► BindingWatcher (notify)     │
//! │                                          │                      │
//! │                                          ▼                      │
//! │                    MirrorSession: Debouncer ──► settle check    │
//! │                                          │                      │
//! │                                          ▼                      │
//! │                                   writer::mirror                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod binding;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod initial;
pub mod session;
pub mod settle;
pub mod watcher;
pub mod writer;

pub use binding::WatchBinding;
pub use config::{BindingConfig, MirrorConfig, ServiceOptions};
pub use debounce::{Debouncer, Decision, PendingEventState};
pub use error::{MirrorError, Result};
pub use event::{MirrorReport, MirrorTask, NotificationKind, RawNotification, SkipReason, TaskKind};
pub use initial::{InitialCopyStats, copy_subtree, initial_copy};
pub use session::MirrorSession;
pub use settle::SettleVerdict;
pub use watcher::{BindingWatcher, MirrorService, MirrorStats};
pub use writer::MirrorOutcome;
