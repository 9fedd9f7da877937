//! Geospatial Replicated Store Library
//!
//! This library crate defines the core modules that make up one storage node.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`engine`**: The storage engine itself. A single-writer command loop
//!   owns the primary index, the spatial index, the vector clock and the
//!   transaction log, and executes every mutation and query in arrival order.
//! - **`feature`**: GeoJSON plumbing. Extracts numeric feature ids and
//!   derives axis-aligned bounding boxes from feature geometries.
//! - **`spatial`**: The R-tree index answering rectangle intersection
//!   queries over feature bounding boxes.
//! - **`wal`**: Durability layer. The append-only transaction log plus the
//!   atomic checkpoint writer used for crash recovery.
//! - **`replication`**: The cluster layer. Maintains persistent streams to
//!   every peer, broadcasts committed local mutations, and feeds incoming
//!   remote mutations back into the engine.

pub mod config;
pub mod engine;
pub mod feature;
pub mod replication;
pub mod server;
pub mod spatial;
pub mod wal;
