//! Durability Module
//!
//! Everything the engine persists lives here.
//!
//! ## Files per node
//! - **Transaction log** (`transaction_<node>.log`): append-only,
//!   newline-delimited JSON, one committed mutation per line. Replayed on
//!   startup, truncated by a checkpoint.
//! - **Checkpoint** (`checkpoint_<node>.json`): a full snapshot of the
//!   primary index in the same record schema, written to a temp file and
//!   renamed into place so readers never observe a partial snapshot.
//! - **Vector clock sidecar** (`vclock_<node>.json`): the engine's vector
//!   clock at checkpoint time, written with the same rename discipline.
//!   Without it, a node whose newest local mutations were deletes would
//!   reissue their log sequence numbers after a restart.

pub mod checkpoint;
pub mod log;
