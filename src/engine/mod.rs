//! Storage Engine Module
//!
//! The authoritative per-node state and the single-writer loop that guards
//! it.
//!
//! ## Architecture Overview
//! The engine is an actor with an inbox:
//! 1. **Submission**: HTTP handlers and replication stream readers enqueue
//!    commands on a bounded channel. Mutations attach a one-shot reply.
//! 2. **Execution**: One spawned task dequeues commands and is the only code
//!    that ever touches the primary index, the spatial index, the vector
//!    clock, or the transaction log. Dequeue order is the ordering guarantee.
//! 3. **Commit**: Each accepted local mutation updates both indexes, appends
//!    to the transaction log, and is broadcast to every connected replica
//!    before the caller is acked.
//! 4. **Recovery**: On startup the engine replays the checkpoint and then
//!    the transaction log before the loop accepts its first command.
//!
//! ## Submodules
//! - **`engine`**: The `Engine` state, command loop, recovery, and the
//!   checkpoint procedure.
//! - **`handle`**: The cloneable client side of the inbox.
//! - **`types`**: Commands, transaction records, errors, and stats DTOs.
//! - **`handlers`**: HTTP request handlers for the Axum web server.

pub mod engine;
pub mod handle;
pub mod handlers;
pub mod types;
