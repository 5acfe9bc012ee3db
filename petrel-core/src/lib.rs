//! # petrel-core
//!
//! Pure sync logic for petrel (no I/O, instant tests).
//!
//! This crate implements the decision rules of the sync engine without any
//! network or disk I/O:
//! - [`classify`] - envelope classification and group-message normalization
//! - [`CursorState`] - the inbox cursor advancement rule
//! - [`PollPhase`] - the poll lifecycle state machine
//! - [`StallDetector`] - watchdog stall arithmetic
//! - [`avatar`] - the avatar reconciliation decision table
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about the rules the poll loop enforces
//!
//! The actual I/O (swarm fetches, group REST calls, file-server calls) is
//! performed by `petrel-client`, which acts on the decisions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod avatar;
pub mod classify;
pub mod cursor;
pub mod lifecycle;
pub mod watchdog;

pub use avatar::AvatarDecision;
pub use classify::{classify, is_own_group_message, normalize_group_message, Classified};
pub use cursor::CursorState;
pub use lifecycle::{PhaseEvent, PollPhase};
pub use watchdog::{StallDetector, STALL_FACTOR};
