//! # feedperf - Incremental XML Feed Ingestion with Comparable Parser Timings
//!
//! `feedperf` downloads an RSS-style feed of songs, turns it into [`Item`]
//! records batch by batch, and measures how long each run spent waiting on
//! the network and inside the parser. Two interchangeable parser backends
//! share the same extraction rules, so their timings can be compared
//! sample for sample.
//!
//! ## Key Features
//!
//! - **Two backends**: an event-tree backend that parses the whole payload
//!   with `roxmltree`, and a push backend that feeds every received chunk
//!   into a streaming `quick-xml` parser without building a tree.
//!
//! - **One extraction model**: element classification ([`matcher`]),
//!   character accumulation ([`accumulator`]) and item assembly
//!   ([`assembler`]) are shared, so for a well-formed feed both backends
//!   produce identical items.
//!
//! - **Batched delivery**: finished items cross from the worker thread to
//!   the consumer in owned batches of at most eleven, then the remainder at
//!   the end of the run.
//!
//! - **Timing statistics**: every completed run writes one
//!   [`RunStatistic`] to an SQLite-backed [`StatisticsStore`] that answers
//!   per-backend counts and means.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feedperf::prelude::*;
//!
//! let store = StatisticsStore::open("stats.sqlite")?;
//! let transport = transport_for_url("feed.xml", &TransportConfig::default())?;
//! let mut engine = ParseEngine::for_kind(BackendKind::Push, transport);
//!
//! let mut delegate = CollectingDelegate::default();
//! match engine.run("feed.xml", &mut delegate, &store)? {
//!     RunOutcome::Completed { statistic, item_count, .. } => {
//!         println!("{} items in {:.4}s", item_count, statistic.total_duration);
//!     }
//!     RunOutcome::Failed(error) => eprintln!("run failed: {}", error),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`model`]: `Item`, `RunStatistic` and `BackendKind`
//! - [`matcher`]: `(prefix, local name)` to field role classification
//! - [`accumulator`]: byte buffer for split character data
//! - [`date`]: release-date parsing and display
//! - [`assembler`]: per-run item state machine shared by both backends
//! - [`backend`]: the two parser backends
//! - [`transport`]: file, memory and HTTP fetch collaborators
//! - [`engine`]: run lifecycle, worker thread and consumer dispatch
//! - [`stats`]: SQLite statistics store

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod accumulator;
pub mod assembler;
pub mod backend;
pub mod date;
pub mod engine;
pub mod matcher;
pub mod model;
pub mod stats;
pub mod transport;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::backend::{
        backend_for, EventTreeBackend, FeedBackend, PushBackend, PushParser, XmlSyntaxError,
    };
    pub use crate::engine::{
        CollectingDelegate, EngineConfig, EngineError, FeedDelegate, ParseEngine, RunError,
        RunOutcome, RunState,
    };
    pub use crate::model::{BackendKind, Item, RunStatistic};
    pub use crate::stats::{BackendSummary, StatisticsStore, StatsError};
    pub use crate::transport::{
        transport_for_url, FileTransport, MemoryTransport, ScriptedFailure, Transport,
        TransportConfig, TransportError,
    };
}

pub use model::{BackendKind, Item, RunStatistic};
pub use stats::StatisticsStore;
