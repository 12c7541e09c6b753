//! Unit tests for the GeoJSON source.

use super::*;
use geofeature_core::GeometryClass;
use rstest::rstest;

const HARBOURS: &str = r#"{
    "type": "FeatureCollection",
    "name": "Harbours",
    "min_resolution": 500.0,
    "max_resolution": 1.0,
    "features": [
        {
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [1.31, 51.12, 4.0] },
            "properties": {
                "name": "Dover",
                "timestamp": 1700000000000,
                "berths": 7,
                "depth": 11.5,
                "ferry": true,
                "operators": ["P&O", "DFDS"],
                "address": { "country": "GB" },
                "closed": null
            }
        },
        {
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
            },
            "properties": null
        },
        { "type": "Feature", "geometry": null, "properties": { "name": "Nowhere" } }
    ]
}"#;

fn parse(text: &str) -> Result<ParsedFeatureSet, DataSourceError> {
    parse_document(Utf8Path::new("ports.geojson"), text)
}

#[rstest]
fn collections_become_one_feature_set() {
    let set = parse(HARBOURS).expect("valid collection");
    assert_eq!(set.name, "Harbours");
    assert_eq!(set.provider, GEOJSON_PROVIDER);
    assert_eq!(set.thresholds.min_resolution(), Some(500.0));
    assert_eq!(set.thresholds.max_resolution(), Some(1.0));
    assert_eq!(set.features.len(), 3);

    let classes: Vec<GeometryClass> = set
        .features
        .iter()
        .map(|feature| feature.geometry.class())
        .collect();
    assert_eq!(
        classes,
        vec![
            GeometryClass::Point,
            GeometryClass::Polygon,
            GeometryClass::Collection
        ]
    );
}

#[rstest]
fn properties_become_typed_attributes() {
    let set = parse(HARBOURS).expect("valid collection");
    let dover = set.features.first().expect("first feature");
    assert_eq!(dover.name, "Dover");
    assert_eq!(dover.timestamp, Some(1_700_000_000_000));
    let attributes = &dover.attributes;
    assert_eq!(attributes.get_long("berths"), Ok(7));
    assert_eq!(attributes.get_double("depth"), Ok(11.5));
    assert_eq!(attributes.get_int("ferry"), Ok(1));
    assert_eq!(
        attributes.get_string_array("operators"),
        Ok(["P&O".to_owned(), "DFDS".to_owned()].as_slice())
    );
    let address = attributes.get_attribute_set("address").expect("nested set");
    assert_eq!(address.get_string("country"), Ok("GB"));
    assert!(!attributes.contains("closed"));
}

#[rstest]
fn single_features_use_the_file_stem() {
    let text = r#"{ "type": "Feature", "geometry": { "type": "LineString", "coordinates": [[0, 0], [2, 2]] } }"#;
    let set = parse(text).expect("valid feature");
    assert_eq!(set.name, "ports");
    assert_eq!(set.thresholds, DisplayThresholds::UNBOUNDED);
    assert_eq!(set.features.len(), 1);
}

#[rstest]
#[case::not_json("not json")]
#[case::unknown_type(r#"{ "type": "Topology", "features": [] }"#)]
#[case::missing_features(r#"{ "type": "FeatureCollection" }"#)]
fn malformed_documents_fail_to_decode(#[case] text: &str) {
    assert!(matches!(parse(text), Err(DataSourceError::Decode { .. })));
}

#[rstest]
#[case::short_position(r#"{ "type": "Feature", "geometry": { "type": "Point", "coordinates": [1] } }"#)]
#[case::empty_polygon(r#"{ "type": "Feature", "geometry": { "type": "Polygon", "coordinates": [] } }"#)]
#[case::inverted_thresholds(r#"{ "type": "FeatureCollection", "min_resolution": 1, "max_resolution": 5, "features": [] }"#)]
fn invalid_content_is_reported(#[case] text: &str) {
    assert!(matches!(parse(text), Err(DataSourceError::Invalid { .. })));
}

#[rstest]
#[case("a.geojson", true)]
#[case("b.JSON", true)]
#[case("c.kml", false)]
#[case("noext", false)]
fn supports_json_extensions(#[case] path: &str, #[case] expected: bool) {
    assert_eq!(GeoJsonSource.supports(Utf8Path::new(path)), expected);
}
