use geo::BoundingRect;
use geojson::feature::Id;
use geojson::Feature;

use crate::spatial::index::Rect;

/// Reads a feature's id as the unsigned integer the engine assigns.
///
/// String ids and fractional or negative numbers are not ids this store ever
/// hands out, so they read as absent.
pub fn feature_id(feature: &Feature) -> Option<u64> {
    match feature.id.as_ref() {
        Some(Id::Number(number)) => number.as_u64(),
        _ => None,
    }
}

/// Stamps a server-assigned id onto a feature.
pub fn assign_feature_id(feature: &mut Feature, id: u64) {
    feature.id = Some(Id::Number(serde_json::Number::from(id)));
}

/// Derives the axis-aligned bounding box of a feature's geometry.
///
/// Returns `None` for features without a geometry or whose geometry has no
/// extent (e.g. an empty collection); such features cannot be indexed.
pub fn feature_bounds(feature: &Feature) -> Option<Rect> {
    let geometry = feature.geometry.as_ref()?;
    let geometry: geo_types::Geometry<f64> = geometry.value.clone().try_into().ok()?;
    let bounds = geometry.bounding_rect()?;
    Some(Rect::new(
        [bounds.min().x, bounds.min().y],
        [bounds.max().x, bounds.max().y],
    ))
}
