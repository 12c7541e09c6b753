//! Geometry values attached to features and their bounding envelopes.
//!
//! Coordinates use WGS84 with `x = longitude` and `y = latitude`, in degrees.
//! Geometries are immutable once attached to a feature: an update replaces the
//! whole value.

use std::fmt;

use geo::{
    Coord, CoordsIter, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Rect,
};

use crate::geodesy;

/// A feature geometry.
///
/// # Examples
///
/// ```
/// use geo::Point;
/// use geofeature_core::{Geometry, GeometryClass};
///
/// let geometry = Geometry::Point(Point::new(1.0, 2.0));
/// assert_eq!(geometry.class(), GeometryClass::Point);
/// let envelope = geometry.envelope().unwrap();
/// assert_eq!((envelope.min_x, envelope.max_y), (1.0, 2.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Geometry {
    /// A single position.
    Point(Point<f64>),
    /// An open or closed path.
    LineString(LineString<f64>),
    /// A polygon with optional interior rings.
    Polygon(Polygon<f64>),
    /// Several positions.
    MultiPoint(MultiPoint<f64>),
    /// Several paths.
    MultiLineString(MultiLineString<f64>),
    /// Several polygons.
    MultiPolygon(MultiPolygon<f64>),
    /// A heterogeneous collection of geometries.
    Collection(Vec<Self>),
}

impl Geometry {
    /// Convenience constructor for a point geometry.
    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::Point(Point::new(x, y))
    }

    /// Runtime class used by the geometry-type index.
    ///
    /// Multi geometries are reported as [`GeometryClass::Collection`].
    #[must_use]
    pub const fn class(&self) -> GeometryClass {
        match self {
            Self::Point(_) => GeometryClass::Point,
            Self::LineString(_) => GeometryClass::LineString,
            Self::Polygon(_) => GeometryClass::Polygon,
            Self::MultiPoint(_)
            | Self::MultiLineString(_)
            | Self::MultiPolygon(_)
            | Self::Collection(_) => GeometryClass::Collection,
        }
    }

    /// Bounding envelope, or `None` for an empty geometry.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            Self::Point(point) => Some(Envelope::from_coord(point.0)),
            Self::LineString(line) => Envelope::from_coords(line.coords_iter()),
            Self::Polygon(polygon) => Envelope::from_coords(polygon.exterior().coords_iter()),
            Self::MultiPoint(points) => Envelope::from_coords(points.coords_iter()),
            Self::MultiLineString(lines) => Envelope::from_coords(lines.coords_iter()),
            Self::MultiPolygon(polygons) => Envelope::from_coords(
                polygons
                    .iter()
                    .flat_map(|polygon| polygon.exterior().coords_iter()),
            ),
            Self::Collection(members) => members
                .iter()
                .filter_map(Self::envelope)
                .reduce(|acc, next| acc.union(&next)),
        }
    }
}

/// Geometry runtime type, the key of the geometry-type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GeometryClass {
    /// [`Geometry::Point`].
    Point,
    /// [`Geometry::LineString`].
    LineString,
    /// [`Geometry::Polygon`].
    Polygon,
    /// Multi geometries and [`Geometry::Collection`].
    Collection,
}

impl fmt::Display for GeometryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Point => "point",
            Self::LineString => "linestring",
            Self::Polygon => "polygon",
            Self::Collection => "collection",
        };
        f.write_str(label)
    }
}

/// Axis-aligned bounding box in degrees.
///
/// Bounds are inclusive. Longitudes are not wrapped: an envelope may extend
/// beyond ±180 to describe a region that crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// Western edge.
    pub min_x: f64,
    /// Southern edge.
    pub min_y: f64,
    /// Eastern edge.
    pub max_x: f64,
    /// Northern edge.
    pub max_y: f64,
}

impl Envelope {
    /// The whole world in normalised coordinates.
    pub const WORLD: Self = Self {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    /// Build an envelope from explicit bounds, normalising swapped edges.
    #[must_use]
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Degenerate envelope covering a single coordinate.
    #[must_use]
    pub const fn from_coord(coord: Coord<f64>) -> Self {
        Self {
            min_x: coord.x,
            min_y: coord.y,
            max_x: coord.x,
            max_y: coord.y,
        }
    }

    /// Smallest envelope covering every coordinate, or `None` when empty.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coord<f64>>,
    {
        coords
            .into_iter()
            .map(Self::from_coord)
            .reduce(|acc, next| acc.union(&next))
    }

    /// Envelope of the region described by its upper-left and lower-right
    /// corners.
    ///
    /// When the upper-left longitude lies east of the lower-right longitude
    /// the region is taken to cross the antimeridian and the eastern edge is
    /// moved past +180.
    #[must_use]
    pub fn from_corners(upper_left: Coord<f64>, lower_right: Coord<f64>) -> Self {
        let max_x = if upper_left.x > lower_right.x {
            geodesy::unwrap_east(upper_left.x, lower_right.x)
        } else {
            lower_right.x
        };
        Self::from_bounds(upper_left.x, lower_right.y, max_x, upper_left.y)
    }

    /// Envelope covering the circle of `radius_m` metres around `center`.
    ///
    /// The north and south edges are the destination points due north and
    /// south; the east and west edges sit at the circle's widest longitude.
    /// A circle reaching a pole spans every longitude.
    #[must_use]
    pub fn around(center: Coord<f64>, radius_m: f64) -> Self {
        geodesy::radius_envelope(center, radius_m)
    }

    /// Smallest envelope covering both inputs.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Whether the envelopes share at least one point. Edges count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Whether `other` lies entirely inside `self`. Edges count.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && other.max_x <= self.max_x
            && self.min_y <= other.min_y
            && other.max_y <= self.max_y
    }

    /// Whether the coordinate lies inside the envelope. Edges count.
    #[must_use]
    pub fn contains_coord(&self, coord: Coord<f64>) -> bool {
        (self.min_x..=self.max_x).contains(&coord.x) && (self.min_y..=self.max_y).contains(&coord.y)
    }

    /// Copy of the envelope moved east by `dx` degrees.
    #[must_use]
    pub fn translate_x(&self, dx: f64) -> Self {
        geodesy::shift_envelope(self, dx)
    }

    /// Whether every bound is a finite number.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Convert into a [`geo::Rect`].
    #[must_use]
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

impl From<Rect<f64>> for Envelope {
    fn from(rect: Rect<f64>) -> Self {
        Self::from_bounds(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, line_string, polygon};
    use rstest::rstest;

    #[rstest]
    #[case(Geometry::point(0.0, 0.0), GeometryClass::Point)]
    #[case(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]), GeometryClass::LineString)]
    #[case(Geometry::MultiPoint(MultiPoint::new(vec![Point::new(0.0, 0.0)])), GeometryClass::Collection)]
    #[case(Geometry::Collection(Vec::new()), GeometryClass::Collection)]
    fn reports_geometry_class(#[case] geometry: Geometry, #[case] expected: GeometryClass) {
        assert_eq!(geometry.class(), expected);
    }

    #[rstest]
    fn polygon_envelope_uses_exterior_ring() {
        let geometry = Geometry::Polygon(polygon![
            (x: -2.0, y: -1.0),
            (x: 3.0, y: -1.0),
            (x: 3.0, y: 4.0),
            (x: -2.0, y: 4.0),
        ]);
        let envelope = geometry.envelope().expect("polygon has an envelope");
        assert_eq!(envelope, Envelope::from_bounds(-2.0, -1.0, 3.0, 4.0));
    }

    #[rstest]
    fn collection_envelope_merges_members() {
        let geometry = Geometry::Collection(vec![
            Geometry::point(10.0, 10.0),
            Geometry::Collection(Vec::new()),
            Geometry::point(-5.0, 2.0),
        ]);
        let envelope = geometry.envelope().expect("collection has an envelope");
        assert_eq!(envelope, Envelope::from_bounds(-5.0, 2.0, 10.0, 10.0));
    }

    #[rstest]
    fn empty_collection_has_no_envelope() {
        assert!(Geometry::Collection(Vec::new()).envelope().is_none());
    }

    #[rstest]
    #[case(Envelope::from_bounds(1.0, 1.0, 2.0, 2.0), true)]
    #[case(Envelope::from_bounds(-1.0, -1.0, 0.0, 0.0), true)]
    #[case(Envelope::from_bounds(0.5, 0.5, 0.6, 0.6), true)]
    #[case(Envelope::from_bounds(1.0000001, 0.0, 2.0, 1.0), false)]
    fn intersection_includes_edges(#[case] other: Envelope, #[case] expected: bool) {
        let unit = Envelope::from_bounds(0.0, 0.0, 1.0, 1.0);
        assert_eq!(unit.intersects(&other), expected);
    }

    #[rstest]
    fn corners_crossing_the_antimeridian_unwrap_east() {
        let envelope =
            Envelope::from_corners(coord! { x: 170.0, y: 10.0 }, coord! { x: -170.0, y: -10.0 });
        assert_eq!(envelope, Envelope::from_bounds(170.0, -10.0, 190.0, 10.0));
    }

    #[rstest]
    fn from_bounds_normalises_swapped_edges() {
        let envelope = Envelope::from_bounds(5.0, 6.0, 1.0, 2.0);
        assert_eq!(envelope, Envelope::from_bounds(1.0, 2.0, 5.0, 6.0));
    }
}
