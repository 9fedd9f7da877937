#[cfg(test)]
mod tests {
    use crate::feature::types::{assign_feature_id, feature_bounds, feature_id};
    use geojson::{Feature, Geometry, Value};

    fn feature_with(value: Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    // ============================================================
    // FEATURE ID TESTS
    // ============================================================

    #[test]
    fn test_assigned_id_reads_back() {
        let mut feature = feature_with(Value::Point(vec![1.0, 2.0]));
        assert_eq!(feature_id(&feature), None);

        assign_feature_id(&mut feature, 42);
        assert_eq!(feature_id(&feature), Some(42));
    }

    #[test]
    fn test_string_id_is_not_an_engine_id() {
        let json = r#"{"type":"Feature","id":"abc","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":null}"#;
        let feature: Feature = serde_json::from_str(json).unwrap();
        assert_eq!(feature_id(&feature), None);
    }

    #[test]
    fn test_negative_id_is_not_an_engine_id() {
        let json = r#"{"type":"Feature","id":-5,"geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":null}"#;
        let feature: Feature = serde_json::from_str(json).unwrap();
        assert_eq!(feature_id(&feature), None);
    }

    // ============================================================
    // BOUNDS TESTS
    // ============================================================

    #[test]
    fn test_point_bounds_are_degenerate() {
        let feature = feature_with(Value::Point(vec![1.0, 2.0]));
        let bounds = feature_bounds(&feature).unwrap();
        assert_eq!(bounds.min, [1.0, 2.0]);
        assert_eq!(bounds.max, [1.0, 2.0]);
    }

    #[test]
    fn test_line_string_bounds_span_endpoints() {
        let feature = feature_with(Value::LineString(vec![
            vec![0.0, 5.0],
            vec![3.0, 1.0],
            vec![-2.0, 2.0],
        ]));
        let bounds = feature_bounds(&feature).unwrap();
        assert_eq!(bounds.min, [-2.0, 1.0]);
        assert_eq!(bounds.max, [3.0, 5.0]);
    }

    #[test]
    fn test_polygon_bounds() {
        let feature = feature_with(Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![4.0, 0.0],
            vec![4.0, 3.0],
            vec![0.0, 3.0],
            vec![0.0, 0.0],
        ]]));
        let bounds = feature_bounds(&feature).unwrap();
        assert_eq!(bounds.min, [0.0, 0.0]);
        assert_eq!(bounds.max, [4.0, 3.0]);
    }

    #[test]
    fn test_multi_point_bounds() {
        let feature = feature_with(Value::MultiPoint(vec![vec![1.0, 1.0], vec![7.0, -2.0]]));
        let bounds = feature_bounds(&feature).unwrap();
        assert_eq!(bounds.min, [1.0, -2.0]);
        assert_eq!(bounds.max, [7.0, 1.0]);
    }

    #[test]
    fn test_feature_without_geometry_has_no_bounds() {
        let feature = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert!(feature_bounds(&feature).is_none());
    }

    #[test]
    fn test_properties_survive_roundtrip() {
        let json = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{"label":"pin","rank":3}}"#;
        let feature: Feature = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&feature).unwrap();
        assert_eq!(back["properties"]["label"], "pin");
        assert_eq!(back["properties"]["rank"], 3);
    }
}
