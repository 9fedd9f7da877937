//! Replication Module
//!
//! Keeps the static cluster converging. Every node dials every configured
//! peer's replication endpoint and also accepts inbound sessions, so each
//! pair of live nodes ends up with at least one persistent bidirectional
//! stream between them.
//!
//! ## Core Mechanisms
//! - **Connection table**: live streams register a sender in a shared
//!   registry; the engine loop broadcasts each committed local mutation to
//!   every registered sender without blocking.
//! - **Dial loop**: a task per peer that reconnects with a fixed backoff
//!   whenever the stream drops. Broadcast failures are only logged; repair
//!   belongs here.
//! - **Idempotent apply**: incoming records go through the engine's
//!   replicate command, which drops anything the vector clock has already
//!   seen and never re-broadcasts, keeping the mesh cycle-free.

pub mod handlers;
pub mod service;

#[cfg(test)]
mod tests;
