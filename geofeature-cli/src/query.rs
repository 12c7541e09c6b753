//! Query command implementation for the geofeature CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geofeature_core::{
    Envelope, Feature, FeatureDataStore, FeatureQueryParameters, GeometryClass, SpatialFilter,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::load::{load_store, validate_files};
use crate::{
    ARG_FILES, ARG_QUERY_BBOX, ARG_QUERY_GEOMETRY_TYPE, ARG_QUERY_LIMIT, ARG_QUERY_NAME,
    ARG_QUERY_PROVIDER, CliError, ENV_QUERY_FILES,
};

const GEOMETRY_CLASSES: [GeometryClass; 4] = [
    GeometryClass::Point,
    GeometryClass::LineString,
    GeometryClass::Polygon,
    GeometryClass::Collection,
];

/// CLI arguments for the `query` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Load GeoJSON files into an in-memory feature store and \
                 print every feature matching the query as one JSON object \
                 per line. Constraints combine with AND; repeated values of \
                 one constraint combine with OR. Name and provider values \
                 may use % as a wildcard.",
    about = "Query features loaded from GeoJSON files"
)]
#[ortho_config(prefix = "GEOFEATURE")]
pub(crate) struct QueryArgs {
    /// GeoJSON files to load.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) files: Vec<Utf8PathBuf>,
    /// Feature name or pattern; repeat to accept several.
    #[arg(long = ARG_QUERY_NAME, value_name = "pattern")]
    #[serde(default)]
    pub(crate) names: Vec<String>,
    /// Provider of the owning feature set; repeat to accept several.
    #[arg(long = ARG_QUERY_PROVIDER, value_name = "pattern")]
    #[serde(default)]
    pub(crate) providers: Vec<String>,
    /// Bounding box as `min_x,min_y,max_x,max_y` in degrees.
    #[arg(long = ARG_QUERY_BBOX, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Geometry class (point, linestring, polygon or collection).
    #[arg(long = ARG_QUERY_GEOMETRY_TYPE, value_name = "class")]
    #[serde(default)]
    pub(crate) geometry_types: Vec<String>,
    /// Maximum number of features to print.
    #[arg(long = ARG_QUERY_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

impl QueryArgs {
    pub(crate) fn into_config(self) -> Result<QueryConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        QueryConfig::try_from(merged)
    }
}

/// Resolved `query` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryConfig {
    /// Files to load, in order.
    pub(crate) files: Vec<Utf8PathBuf>,
    /// Accepted feature names or patterns; empty accepts every name.
    pub(crate) names: Vec<String>,
    /// Accepted providers; empty accepts every provider.
    pub(crate) providers: Vec<String>,
    /// Bounding region.
    pub(crate) region: Option<Envelope>,
    /// Accepted geometry classes; empty accepts every class.
    pub(crate) geometry_types: Vec<GeometryClass>,
    /// Maximum number of results.
    pub(crate) limit: Option<usize>,
}

impl QueryConfig {
    /// Query parameters carrying every configured constraint.
    pub(crate) fn parameters(&self) -> FeatureQueryParameters {
        let mut params = FeatureQueryParameters::new();
        if !self.names.is_empty() {
            params = params.with_names(self.names.iter().cloned());
        }
        if !self.providers.is_empty() {
            params = params.with_providers(self.providers.iter().cloned());
        }
        if let Some(region) = self.region {
            params = params.with_spatial_filter(SpatialFilter::Region(region));
        }
        if !self.geometry_types.is_empty() {
            params = params.with_geometry_types(self.geometry_types.iter().copied());
        }
        if let Some(limit) = self.limit {
            params = params.with_limit(limit);
        }
        params
    }
}

impl TryFrom<QueryArgs> for QueryConfig {
    type Error = CliError;

    fn try_from(args: QueryArgs) -> Result<Self, Self::Error> {
        if args.files.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_FILES,
                env: ENV_QUERY_FILES,
            });
        }
        let region = args.bbox.as_deref().map(parse_bbox).transpose()?;
        let geometry_types = args
            .geometry_types
            .iter()
            .map(|value| parse_geometry_class(value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            files: args.files,
            names: args.names,
            providers: args.providers,
            region,
            geometry_types,
            limit: args.limit,
        })
    }
}

/// Parse `min_x,min_y,max_x,max_y`.
pub(crate) fn parse_bbox(value: &str) -> Result<Envelope, CliError> {
    let invalid = |reason| CliError::InvalidArgument {
        field: ARG_QUERY_BBOX,
        value: value.to_owned(),
        reason,
    };
    let bounds = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("bounds must be numbers"))?;
    match bounds.as_slice() {
        [min_x, min_y, max_x, max_y] if bounds.iter().all(|bound| bound.is_finite()) => {
            Ok(Envelope::from_bounds(*min_x, *min_y, *max_x, *max_y))
        }
        [_, _, _, _] => Err(invalid("bounds must be finite")),
        _ => Err(invalid("expected four comma-separated bounds")),
    }
}

/// Parse a geometry class name, ignoring case.
pub(crate) fn parse_geometry_class(value: &str) -> Result<GeometryClass, CliError> {
    GEOMETRY_CLASSES
        .into_iter()
        .find(|class| class.to_string().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| CliError::InvalidArgument {
            field: ARG_QUERY_GEOMETRY_TYPE,
            value: value.to_owned(),
            reason: "expected point, linestring, polygon or collection",
        })
}

/// One output line.
#[derive(Debug, Serialize)]
struct FeatureLine<'a> {
    id: u64,
    feature_set: u64,
    name: &'a str,
    geometry_type: GeometryClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    envelope: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
}

impl<'a> From<&'a Feature> for FeatureLine<'a> {
    fn from(feature: &'a Feature) -> Self {
        Self {
            id: feature.id.0,
            feature_set: feature.feature_set_id.0,
            name: &feature.name,
            geometry_type: feature.geometry.class(),
            envelope: feature
                .geometry
                .envelope()
                .map(|env| [env.min_x, env.min_y, env.max_x, env.max_y]),
            timestamp: feature.timestamp,
        }
    }
}

pub(super) fn run_query(args: QueryArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_query_with(args, &mut stdout)
}

pub(super) fn run_query_with(args: QueryArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_query(&config, writer)
}

pub(super) fn execute_query(config: &QueryConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    validate_files(&config.files)?;
    let store = load_store(&config.files)?;
    for feature in store.query_features(&config.parameters())? {
        let line = serde_json::to_string(&FeatureLine::from(feature.as_ref()))
            .map_err(CliError::SerialiseFeature)?;
        writeln!(writer, "{line}").map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
