//! # nabud
//!
//! NABU Network Adapter emulator: serves operating-system and cycle content
//! to a NABU Personal Computer over its RS-232 link.
//!
//! ## Architecture
//!
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Serial Link (115200 8N2)                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │              Command Dispatcher / Stage State Machine           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │        Packet Store (framed .pak / raw .nab containers)         │
//! │  ┌───────────────┐  ┌───────────────┐  ┌────────────────────┐   │
//! │  │  Local framed │  │   Local raw   │  │  HTTP origin fetch │   │
//! │  └───────────────┘  └───────────────┘  └────────────────────┘   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │            Packet Builders / CRC-16 / 0x10 Escaping             │
//! └─────────────────────────────────────────────────────────────────┘
//!
//! The engine is byte-driven: the serial link offers no framing, so one
//! command spans many non-blocking byte arrivals and the dispatcher keeps
//! per-command stage state between them.

#![warn(clippy::all, clippy::pedantic)]
// Allow stylistic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]                // ASCII diagrams in docs
#![allow(clippy::cast_possible_truncation)]    // Wire fields are deliberately narrow
#![allow(clippy::missing_panics_doc)]

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod serial;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::SegmentId;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP origin for cycle content, `host/path` without a scheme
pub const DEFAULT_ORIGIN: &str = "nabu.retrotechchris.com/cycle2";

/// Default directory for downloaded and local cycle containers
pub const DEFAULT_CYCLE_DIR: &str = "cycle";
