//! GeoJSON Feature Module
//!
//! Helpers around `geojson::Feature`, the payload type the engine stores and
//! replicates. The engine only ever inspects two things about a feature: its
//! numeric id and the bounding box of its geometry. `properties` and any
//! foreign members ride along untouched.

pub mod types;

#[cfg(test)]
mod tests;
