//! GeoJSON feature source.
//!
//! A file holding a `FeatureCollection` (or a single `Feature`) becomes one
//! feature set. Feature properties become attributes; a string `name`
//! property also names the feature and an integer `timestamp` property sets
//! its timestamp in milliseconds. Optional `name`, `min_resolution` and
//! `max_resolution` members on the collection name the set and set its
//! display thresholds.

use camino::Utf8Path;
use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use geofeature_core::{AttributeSet, DisplayThresholds, FeatureDefinition, Geometry};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::source::{DataSourceError, FeatureDataSource, ParsedFeatureSet};

/// Name reported by [`GeoJsonSource`] and recorded as the provider of the
/// feature sets it produces.
pub const GEOJSON_PROVIDER: &str = "geojson";

const PARSE_VERSION: u32 = 1;

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawDocument {
    FeatureCollection {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        min_resolution: Option<f64>,
        #[serde(default)]
        max_resolution: Option<f64>,
        features: Vec<RawFeature>,
    },
    Feature(RawFeature),
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Self> },
}

/// Parses `.geojson` and `.json` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonSource;

impl FeatureDataSource for GeoJsonSource {
    fn name(&self) -> &str {
        GEOJSON_PROVIDER
    }

    fn parse_version(&self) -> u32 {
        PARSE_VERSION
    }

    fn supports(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
    }

    fn parse(&self, path: &Utf8Path) -> Result<Vec<ParsedFeatureSet>, DataSourceError> {
        let text = geofeature_fs::read_utf8_to_string(path).map_err(|source| {
            DataSourceError::Read {
                path: path.to_owned(),
                source,
            }
        })?;
        parse_document(path, &text).map(|set| vec![set])
    }
}

fn parse_document(path: &Utf8Path, text: &str) -> Result<ParsedFeatureSet, DataSourceError> {
    let document: RawDocument =
        serde_json::from_str(text).map_err(|source| DataSourceError::Decode {
            path: path.to_owned(),
            source,
        })?;
    let (name, min_resolution, max_resolution, raw_features) = match document {
        RawDocument::FeatureCollection {
            name,
            min_resolution,
            max_resolution,
            features,
        } => (name, min_resolution, max_resolution, features),
        RawDocument::Feature(feature) => (None, None, None, vec![feature]),
    };
    let invalid = |reason: String| DataSourceError::Invalid {
        path: path.to_owned(),
        reason,
    };
    let thresholds = DisplayThresholds::new(min_resolution, max_resolution)
        .map_err(|err| invalid(err.to_string()))?;
    let features = raw_features
        .into_iter()
        .enumerate()
        .map(|(index, raw)| convert_feature(raw).map_err(|reason| invalid(format!("feature {index}: {reason}"))))
        .collect::<Result<Vec<_>, _>>()?;
    let set_name = name
        .or_else(|| path.file_stem().map(str::to_owned))
        .unwrap_or_else(|| GEOJSON_PROVIDER.to_owned());
    log::debug!("parsed {} features from {path}", features.len());
    Ok(ParsedFeatureSet {
        provider: GEOJSON_PROVIDER.to_owned(),
        kind: GEOJSON_PROVIDER.to_owned(),
        name: set_name,
        thresholds,
        features,
    })
}

fn convert_feature(raw: RawFeature) -> Result<FeatureDefinition, String> {
    let geometry = match raw.geometry {
        Some(geometry) => convert_geometry(geometry)?,
        None => Geometry::Collection(Vec::new()),
    };
    let properties = raw.properties.unwrap_or_default();
    let name = properties
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let timestamp = properties.get("timestamp").and_then(Value::as_i64);
    let mut definition =
        FeatureDefinition::new(name, geometry).with_attributes(convert_properties(&properties));
    if let Some(millis) = timestamp {
        definition = definition.with_timestamp(millis);
    }
    Ok(definition)
}

fn coord(position: &[f64]) -> Result<Coord<f64>, String> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        _ => Err(format!("position {position:?} needs two finite numbers")),
    }
}

fn line(positions: &[Position]) -> Result<LineString<f64>, String> {
    positions
        .iter()
        .map(|position| coord(position))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, String> {
    let mut converted = rings.iter().map(|ring| line(ring));
    let exterior = converted
        .next()
        .transpose()?
        .ok_or_else(|| "polygon has no exterior ring".to_owned())?;
    let interiors = converted.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn convert_geometry(raw: RawGeometry) -> Result<Geometry, String> {
    Ok(match raw {
        RawGeometry::Point { coordinates } => Geometry::Point(Point(coord(&coordinates)?)),
        RawGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
            coordinates
                .iter()
                .map(|position| coord(position).map(Point))
                .collect::<Result<_, _>>()?,
        )),
        RawGeometry::LineString { coordinates } => Geometry::LineString(line(&coordinates)?),
        RawGeometry::MultiLineString { coordinates } => Geometry::MultiLineString(
            MultiLineString::new(coordinates.iter().map(|part| line(part)).collect::<Result<_, _>>()?),
        ),
        RawGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(&coordinates)?),
        RawGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon::new(
            coordinates
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Result<_, _>>()?,
        )),
        RawGeometry::GeometryCollection { geometries } => Geometry::Collection(
            geometries
                .into_iter()
                .map(convert_geometry)
                .collect::<Result<_, _>>()?,
        ),
    })
}

fn convert_properties(properties: &Map<String, Value>) -> AttributeSet {
    let mut attributes = AttributeSet::new();
    for (key, value) in properties {
        match value {
            Value::Null => {}
            Value::Bool(flag) => {
                attributes.set_int(key.as_str(), i32::from(*flag));
            }
            Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    attributes.set_long(key.as_str(), integer);
                } else if let Some(real) = number.as_f64() {
                    attributes.set_double(key.as_str(), real);
                }
            }
            Value::String(text) => {
                attributes.set_string(key.as_str(), text.clone());
            }
            Value::Array(items) => convert_array(&mut attributes, key, items),
            Value::Object(nested) => {
                attributes.set_attribute_set(key.as_str(), convert_properties(nested));
            }
        }
    }
    attributes
}

fn convert_array(attributes: &mut AttributeSet, key: &str, items: &[Value]) {
    if let Some(integers) = items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>() {
        attributes.set_long_array(key, integers);
    } else if let Some(reals) = items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>() {
        attributes.set_double_array(key, reals);
    } else if let Some(texts) = items
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()
    {
        attributes.set_string_array(key, texts);
    } else {
        log::debug!("skipping mixed array property {key}");
    }
}

#[cfg(test)]
mod tests;
