//! Spatial Index Module
//!
//! An R-tree over feature bounding boxes, answering "which features intersect
//! this rectangle" in expected sub-linear time.
//!
//! ## Core Concepts
//! - **Keys**: Entries are keyed by `(feature id, bounding box)`. Removal must
//!   present the same pair that was inserted, so a replace that moves a
//!   feature removes the old box before inserting the new one.
//! - **Handles**: The tree stores feature ids only; the engine's primary
//!   index owns the feature payloads and resolves ids after a search.
//! - **Visit callback**: Searches push candidates through a caller-supplied
//!   callback whose return value decides whether the walk continues.

pub mod index;
