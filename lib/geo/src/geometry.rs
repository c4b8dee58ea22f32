//! Geometry parsing: GeoJSON objects and WKT strings to `geo_types`
//!
//! The parser applies the field's coordinate policy while reading:
//! - `ignore_z_value`: drop a third ordinate, or reject it
//! - `coerce`: close unclosed polygon rings and wrap out-of-range longitudes
//!
//! Structural checks (ring closure, self-intersection, degenerate areas) live
//! in [`validate`] and run before indexing.

use geo::{Area, Contains, Intersects, MapCoords};
use geo_types::{
    coord, Coord, Geometry, GeometryCollection, Line, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon, Rect,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Reason a raw value could not be turned into an indexable shape
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidShape(pub String);

pub type ShapeResult<T> = std::result::Result<T, InvalidShape>;

fn invalid(reason: impl Into<String>) -> InvalidShape {
    InvalidShape(reason.into())
}

/// Default vertex winding used to resolve ambiguous polygons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Counter-clockwise exterior rings (right-hand rule)
    #[default]
    Right,
    /// Clockwise exterior rings (left-hand rule)
    Left,
}

impl Orientation {
    /// True when exterior rings are expected counter-clockwise
    pub fn is_ccw(&self) -> bool {
        matches!(self, Orientation::Right)
    }
}

impl FromStr for Orientation {
    type Err = InvalidShape;

    fn from_str(s: &str) -> ShapeResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "right" | "ccw" | "counterclockwise" | "right_hand" => Ok(Orientation::Right),
            "left" | "cw" | "clockwise" | "left_hand" => Ok(Orientation::Left),
            other => Err(invalid(format!("Unknown orientation [{}]", other))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Right => write!(f, "right"),
            Orientation::Left => write!(f, "left"),
        }
    }
}

/// Wraps a longitude into [-180, 180], keeping +180 for positive input
pub fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let offset = (lon + 180.0).rem_euclid(360.0);
    if offset == 0.0 && lon > 0.0 {
        180.0
    } else {
        offset - 180.0
    }
}

/// Reads external geometry notation under a field's coordinate policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParser {
    orientation: Orientation,
    coerce: bool,
    ignore_z_value: bool,
}

impl GeometryParser {
    pub fn new(orientation: Orientation, coerce: bool, ignore_z_value: bool) -> Self {
        Self {
            orientation,
            coerce,
            ignore_z_value,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn coerce(&self) -> bool {
        self.coerce
    }

    pub fn ignore_z_value(&self) -> bool {
        self.ignore_z_value
    }

    /// GeoJSON object or WKT string
    pub fn parse(&self, value: &Value) -> ShapeResult<Geometry<f64>> {
        match value {
            Value::String(text) => self.parse_wkt(text),
            Value::Object(object) => self.parse_geojson(object),
            other => Err(invalid(format!(
                "shape must be an object consisting of type and coordinates or a WKT \
                 string, got [{}]",
                other
            ))),
        }
    }

    pub fn parse_wkt(&self, text: &str) -> ShapeResult<Geometry<f64>> {
        if wkt_declares_z(text) && !self.ignore_z_value {
            return Err(invalid(format!(
                "found Z value in [{}] but [ignore_z_value] parameter is [false]",
                text.trim()
            )));
        }
        if !self.coerce && wkt_has_unclosed_ring(text) {
            return Err(invalid(
                "first and last points of the linear ring must be the same (it must close itself)",
            ));
        }
        let geometry: Geometry<f64> = wkt::Wkt::from_str(text)
            .map_err(|e| invalid(format!("WKT parse error: {}", e)))
            .and_then(|w| {
                w.try_into().map_err(|e: wkt::conversion::Error| {
                    invalid(format!("WKT conversion error: {:?}", e))
                })
            })?;
        geometry.try_map_coords(|c| self.coordinate_from(c.x, c.y))
    }

    pub fn parse_geojson(&self, object: &Map<String, Value>) -> ShapeResult<Geometry<f64>> {
        let type_name = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("shape type not included"))?
            .to_ascii_lowercase();

        if type_name == "geometrycollection" {
            let geometries = object
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("geometries not included"))?;
            let parsed = geometries
                .iter()
                .map(|g| {
                    g.as_object()
                        .ok_or_else(|| invalid(format!("expected geometry object, got [{}]", g)))
                        .and_then(|o| self.parse_geojson(o))
                })
                .collect::<ShapeResult<Vec<_>>>()?;
            return Ok(Geometry::GeometryCollection(GeometryCollection::new_from(parsed)));
        }

        let coordinates = object.get("coordinates").ok_or_else(|| {
            invalid(format!("coordinates not included for shape type [{}]", type_name))
        })?;

        match type_name.as_str() {
            "point" => Ok(Geometry::Point(Point::from(self.coordinate(coordinates)?))),
            "multipoint" => {
                let points = self
                    .coordinate_list(coordinates)?
                    .into_iter()
                    .map(Point::from)
                    .collect::<Vec<_>>();
                Ok(Geometry::MultiPoint(MultiPoint::new(points)))
            }
            "linestring" => Ok(Geometry::LineString(self.line_string(coordinates)?)),
            "multilinestring" => {
                let lines = as_array(coordinates)?
                    .iter()
                    .map(|l| self.line_string(l))
                    .collect::<ShapeResult<Vec<_>>>()?;
                Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
            }
            "polygon" => Ok(Geometry::Polygon(self.polygon(coordinates)?)),
            "multipolygon" => {
                let polygons = as_array(coordinates)?
                    .iter()
                    .map(|p| self.polygon(p))
                    .collect::<ShapeResult<Vec<_>>>()?;
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
            }
            "envelope" => self.envelope(coordinates),
            "circle" => Err(invalid("circle shapes are not supported by the [BKD] strategy")),
            other => Err(invalid(format!("unknown geo_shape [{}]", other))),
        }
    }

    fn coordinate(&self, value: &Value) -> ShapeResult<Coord<f64>> {
        let items = value
            .as_array()
            .ok_or_else(|| invalid(format!("expected coordinate array, got [{}]", value)))?;
        if items.len() < 2 {
            return Err(invalid("coordinates must contain at least longitude and latitude"));
        }
        if items.len() > 3 {
            return Err(invalid(format!("found more than three values in coordinate [{}]", value)));
        }
        let number = |v: &Value| {
            v.as_f64()
                .ok_or_else(|| invalid(format!("numeric value expected, got [{}]", v)))
        };
        let lon = number(&items[0])?;
        let lat = number(&items[1])?;
        if items.len() == 3 {
            let z = number(&items[2])?;
            if !self.ignore_z_value {
                return Err(invalid(format!(
                    "found Z value [{}] but [ignore_z_value] parameter is [false]",
                    z
                )));
            }
        }
        self.coordinate_from(lon, lat)
    }

    fn coordinate_from(&self, lon: f64, lat: f64) -> ShapeResult<Coord<f64>> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(invalid(format!("invalid coordinate [{}, {}]", lon, lat)));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(invalid(format!(
                "invalid latitude {}; must be between -90.0 and 90.0",
                lat
            )));
        }
        let lon = if (-180.0..=180.0).contains(&lon) {
            lon
        } else if self.coerce {
            normalize_lon(lon)
        } else {
            return Err(invalid(format!(
                "invalid longitude {}; must be between -180.0 and 180.0",
                lon
            )));
        };
        Ok(coord! { x: lon, y: lat })
    }

    fn coordinate_list(&self, value: &Value) -> ShapeResult<Vec<Coord<f64>>> {
        as_array(value)?.iter().map(|c| self.coordinate(c)).collect()
    }

    fn line_string(&self, value: &Value) -> ShapeResult<LineString<f64>> {
        let coords = self.coordinate_list(value)?;
        if coords.len() < 2 {
            return Err(invalid(format!(
                "invalid number of points in LineString (found [{}] - must be >= 2)",
                coords.len()
            )));
        }
        Ok(LineString::new(coords))
    }

    fn ring(&self, value: &Value) -> ShapeResult<LineString<f64>> {
        let mut coords = self.coordinate_list(value)?;
        if coords.first() != coords.last() {
            if !self.coerce {
                return Err(invalid(
                    "first and last points of the linear ring must be the same (it must \
                     close itself)",
                ));
            }
            if let Some(first) = coords.first().copied() {
                coords.push(first);
            }
        }
        if coords.len() < 4 {
            return Err(invalid(format!(
                "invalid number of points in LinearRing (found [{}] - must be >= 4)",
                coords.len()
            )));
        }
        Ok(LineString::new(coords))
    }

    fn polygon(&self, value: &Value) -> ShapeResult<Polygon<f64>> {
        let rings = as_array(value)?;
        let (exterior, holes) = rings
            .split_first()
            .ok_or_else(|| invalid("invalid LinearRing found (coordinates are empty)"))?;
        let exterior = self.ring(exterior)?;
        let holes = holes
            .iter()
            .map(|h| self.ring(h))
            .collect::<ShapeResult<Vec<_>>>()?;
        Ok(Polygon::new(exterior, holes))
    }

    /// `[[minLon, maxLat], [maxLon, minLat]]`; crossing the dateline when minLon > maxLon
    fn envelope(&self, value: &Value) -> ShapeResult<Geometry<f64>> {
        let corners = self.coordinate_list(value)?;
        if corners.len() != 2 {
            return Err(invalid("envelope must be defined by exactly two corners"));
        }
        let (top_left, bottom_right) = (corners[0], corners[1]);
        if top_left.y < bottom_right.y {
            return Err(invalid(format!(
                "top [{}] of envelope cannot be below bottom [{}]",
                top_left.y, bottom_right.y
            )));
        }
        if top_left.x <= bottom_right.x {
            let rect = Rect::new(top_left, bottom_right);
            return Ok(Geometry::Polygon(rect.to_polygon()));
        }
        let west = Rect::new(top_left, coord! { x: 180.0, y: bottom_right.y });
        let east = Rect::new(coord! { x: -180.0, y: top_left.y }, bottom_right);
        Ok(Geometry::MultiPolygon(MultiPolygon::new(vec![
            west.to_polygon(),
            east.to_polygon(),
        ])))
    }
}

fn as_array(value: &Value) -> ShapeResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| invalid(format!("expected array of coordinates, got [{}]", value)))
}

/// WKT text declares a third ordinate: a `Z`/`ZM` tag, or three numbers
/// in the first coordinate without an `M` tag
fn wkt_declares_z(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    let header = upper.split('(').next().unwrap_or("");
    let tags: Vec<&str> = header.split_whitespace().skip(1).collect();
    if tags.iter().any(|t| *t == "Z" || *t == "ZM") {
        return true;
    }
    if tags.iter().any(|t| *t == "M") {
        return false;
    }
    first_coordinate(&upper)
        .map(|c| c.split_whitespace().count() > 2)
        .unwrap_or(false)
}

fn first_coordinate(text: &str) -> Option<&str> {
    let open = text.find('(')?;
    let body = text[open..].trim_start_matches(|c: char| c == '(' || c.is_whitespace());
    let end = body.find(|c: char| c == ',' || c == ')')?;
    Some(&body[..end])
}

/// Innermost coordinate groups of POLYGON/MULTIPOLYGON text whose first and
/// last coordinate differ
fn wkt_has_unclosed_ring(text: &str) -> bool {
    let upper = text.trim_start().to_ascii_uppercase();
    if !(upper.starts_with("POLYGON") || upper.starts_with("MULTIPOLYGON")) {
        return false;
    }
    let mut rest = upper.as_str();
    while let Some(close) = rest.find(')') {
        let group = &rest[..close];
        if let Some(open) = group.rfind('(') {
            let coords: Vec<&str> = group[open + 1..].split(',').map(str::trim).collect();
            let same = |a: &str, b: &str| {
                let pa: Vec<f64> = a.split_whitespace().filter_map(|n| n.parse().ok()).collect();
                let pb: Vec<f64> = b.split_whitespace().filter_map(|n| n.parse().ok()).collect();
                pa == pb
            };
            if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
                if coords.len() > 1 && !same(first, last) {
                    return true;
                }
            }
        }
        rest = &rest[close + 1..];
    }
    false
}

/// Rejects empty, degenerate and self-intersecting shapes
pub fn validate(geometry: &Geometry<f64>) -> ShapeResult<()> {
    match geometry {
        Geometry::Point(_) | Geometry::Line(_) => Ok(()),
        Geometry::MultiPoint(points) => non_empty(points.0.len(), "MultiPoint"),
        Geometry::LineString(line) => validate_line_string(line),
        Geometry::MultiLineString(lines) => {
            non_empty(lines.0.len(), "MultiLineString")?;
            lines.0.iter().try_for_each(validate_line_string)
        }
        Geometry::Polygon(polygon) => validate_polygon(polygon),
        Geometry::MultiPolygon(polygons) => {
            non_empty(polygons.0.len(), "MultiPolygon")?;
            polygons.0.iter().try_for_each(validate_polygon)
        }
        Geometry::GeometryCollection(collection) => {
            non_empty(collection.0.len(), "GeometryCollection")?;
            collection.0.iter().try_for_each(validate)
        }
        Geometry::Rect(rect) => {
            if rect.width() > 0.0 && rect.height() > 0.0 {
                Ok(())
            } else {
                Err(invalid("degenerate envelope with zero area"))
            }
        }
        Geometry::Triangle(triangle) => {
            if triangle.unsigned_area() > 0.0 {
                Ok(())
            } else {
                Err(invalid("degenerate triangle with zero area"))
            }
        }
    }
}

fn non_empty(len: usize, kind: &str) -> ShapeResult<()> {
    if len == 0 {
        Err(invalid(format!("{} must contain at least one member", kind)))
    } else {
        Ok(())
    }
}

fn validate_line_string(line: &LineString<f64>) -> ShapeResult<()> {
    if line.0.len() < 2 {
        return Err(invalid(format!(
            "invalid number of points in LineString (found [{}] - must be >= 2)",
            line.0.len()
        )));
    }
    Ok(())
}

fn validate_polygon(polygon: &Polygon<f64>) -> ShapeResult<()> {
    let exterior = distinct_ring(polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(distinct_ring)
        .collect::<ShapeResult<Vec<_>>>()?;

    let rings: Vec<&LineString<f64>> = std::iter::once(&exterior).chain(&interiors).collect();
    check_ring_crossings(&rings)?;

    // rings do not cross, so one vertex decides whether a hole is inside
    let shell = Polygon::new(exterior.clone(), vec![]);
    for hole in &interiors {
        if !hole.0.iter().any(|c| shell.contains(c)) {
            return Err(invalid("polygon hole lies outside the exterior ring"));
        }
    }
    Ok(())
}

/// Ring without repeated points, with at least 4 points and a non-zero area
fn distinct_ring(ring: &LineString<f64>) -> ShapeResult<LineString<f64>> {
    let mut coords = ring.0.clone();
    coords.dedup();
    if coords.len() < 4 {
        return Err(invalid(format!(
            "invalid number of distinct points in LinearRing (found [{}] - must be >= 4)",
            coords.len()
        )));
    }
    let ring = LineString::new(coords);
    if Polygon::new(ring.clone(), vec![]).unsigned_area() <= f64::EPSILON {
        return Err(invalid("degenerate polygon ring with zero area"));
    }
    Ok(ring)
}

/// One edge of a polygon ring
#[derive(Debug, Clone, Copy)]
struct Edge {
    ring: usize,
    index: usize,
    line: Line<f64>,
    min_x: f64,
    max_x: f64,
}

/// Sweep over edges sorted by their smallest x. Only edges whose x ranges
/// overlap are tested against each other. Neighbouring edges of the same
/// ring share a vertex and are skipped.
fn check_ring_crossings(rings: &[&LineString<f64>]) -> ShapeResult<()> {
    let mut edges: Vec<Edge> = Vec::new();
    let mut ring_sizes = Vec::with_capacity(rings.len());
    for (ring, line_string) in rings.iter().enumerate() {
        let start = edges.len();
        edges.extend(line_string.lines().enumerate().map(|(index, line)| Edge {
            ring,
            index,
            line,
            min_x: line.start.x.min(line.end.x),
            max_x: line.start.x.max(line.end.x),
        }));
        ring_sizes.push(edges.len() - start);
    }
    edges.sort_by(|a, b| a.min_x.total_cmp(&b.min_x));

    let adjacent = |a: &Edge, b: &Edge| {
        if a.ring != b.ring {
            return false;
        }
        let last = ring_sizes[a.ring] - 1;
        let (lo, hi) = (a.index.min(b.index), a.index.max(b.index));
        hi - lo == 1 || (lo == 0 && hi == last)
    };

    for (i, a) in edges.iter().enumerate() {
        for b in edges[i + 1..].iter().take_while(|b| b.min_x <= a.max_x) {
            if adjacent(a, b) || !a.line.intersects(&b.line) {
                continue;
            }
            return Err(if a.ring == b.ring {
                invalid(format!(
                    "self-intersection between segments {:?} and {:?}",
                    a.line, b.line
                ))
            } else {
                invalid(format!(
                    "polygon rings intersect at segments {:?} and {:?}",
                    a.line, b.line
                ))
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> GeometryParser {
        GeometryParser::new(Orientation::Right, false, true)
    }

    #[test]
    fn test_parse_geojson_polygon() {
        let geom = parser()
            .parse(&json!({
                "type": "polygon",
                "coordinates": [[[100, 0], [101, 0], [101, 1], [100, 1], [100, 0]]]
            }))
            .unwrap();
        match geom {
            Geometry::Polygon(p) => assert_eq!(p.exterior().0.len(), 5),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_wkt_polygon() {
        let geom = parser()
            .parse(&json!("POLYGON ((100 0, 101 0, 101 1, 100 1, 100 0))"))
            .unwrap();
        assert!(matches!(geom, Geometry::Polygon(_)));
    }

    #[test]
    fn test_type_is_case_insensitive() {
        let geom = parser()
            .parse(&json!({"type": "Point", "coordinates": [1.5, 2.5]}))
            .unwrap();
        assert_eq!(geom, Geometry::Point(Point::new(1.5, 2.5)));
    }

    #[test]
    fn test_z_value_policy() {
        let point = json!({"type": "point", "coordinates": [1, 2, 3]});
        assert_eq!(
            parser().parse(&point).unwrap(),
            Geometry::Point(Point::new(1.0, 2.0))
        );

        let strict = GeometryParser::new(Orientation::Right, false, false);
        assert!(strict.parse(&point).is_err());
        assert!(strict.parse(&json!("POINT Z (1 2 3)")).is_err());
        assert!(strict.parse(&json!("POINT (1 2)")).is_ok());
    }

    #[test]
    fn test_unclosed_ring_requires_coerce() {
        let open = json!({"type": "polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1]]]});
        assert!(parser().parse(&open).is_err());

        let coercing = GeometryParser::new(Orientation::Right, true, true);
        match coercing.parse(&open).unwrap() {
            Geometry::Polygon(p) => assert_eq!(p.exterior().0.len(), 5),
            other => panic!("expected polygon, got {:?}", other),
        }

        let open_wkt = json!("POLYGON ((0 0, 1 0, 1 1, 0 1))");
        assert!(parser().parse(&open_wkt).is_err());
        assert!(coercing.parse(&open_wkt).is_ok());
    }

    #[test]
    fn test_longitude_normalization() {
        assert_eq!(normalize_lon(190.0), -170.0);
        assert_eq!(normalize_lon(-190.0), 170.0);
        assert_eq!(normalize_lon(540.0), 180.0);
        assert_eq!(normalize_lon(45.0), 45.0);

        let point = json!({"type": "point", "coordinates": [190, 10]});
        assert!(parser().parse(&point).is_err());
        let coercing = GeometryParser::new(Orientation::Right, true, true);
        assert_eq!(
            coercing.parse(&point).unwrap(),
            Geometry::Point(Point::new(-170.0, 10.0))
        );
    }

    #[test]
    fn test_latitude_out_of_range() {
        let coercing = GeometryParser::new(Orientation::Right, true, true);
        assert!(coercing
            .parse(&json!({"type": "point", "coordinates": [0, 91]}))
            .is_err());
    }

    #[test]
    fn test_envelope_across_dateline() {
        let geom = parser()
            .parse(&json!({"type": "envelope", "coordinates": [[170, 10], [-170, -10]]}))
            .unwrap();
        match geom {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 2),
            other => panic!("expected multipolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_geometry_collection() {
        let geom = parser()
            .parse(&json!({
                "type": "geometrycollection",
                "geometries": [
                    {"type": "point", "coordinates": [1, 1]},
                    {"type": "linestring", "coordinates": [[0, 0], [1, 1]]}
                ]
            }))
            .unwrap();
        match geom {
            Geometry::GeometryCollection(c) => assert_eq!(c.0.len(), 2),
            other => panic!("expected collection, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let p = parser();
        assert!(p.parse(&json!(42)).is_err());
        assert!(p.parse(&json!({"coordinates": [1, 2]})).is_err());
        let circle = json!({"type": "circle", "coordinates": [1, 2], "radius": "1km"});
        assert!(p.parse(&circle).is_err());
        assert!(p.parse(&json!({"type": "linestring", "coordinates": [[0, 0]]})).is_err());
        assert!(p.parse(&json!("NOT WKT")).is_err());
    }

    #[test]
    fn test_validate_self_intersection() {
        // bow-tie
        let geom = parser()
            .parse(&json!({
                "type": "polygon",
                "coordinates": [[[0, 0], [1, 1], [1, 0], [0, 1], [0, 0]]]
            }))
            .unwrap();
        assert!(validate(&geom).is_err());

        let square = parser()
            .parse(&json!({
                "type": "polygon",
                "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]
            }))
            .unwrap();
        assert!(validate(&square).is_ok());
    }

    #[test]
    fn test_validate_degenerate_ring() {
        let flat = parser()
            .parse(&json!({"type": "polygon", "coordinates": [[[0, 0], [1, 0], [2, 0], [0, 0]]]}))
            .unwrap();
        assert!(validate(&flat).is_err());
    }

    #[test]
    fn test_validate_hole_crossing_shell() {
        let crossing = parser()
            .parse(&json!({"type": "polygon", "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[5, 5], [15, 5], [15, 6], [5, 6], [5, 5]]
            ]}))
            .unwrap();
        assert!(validate(&crossing).is_err());

        let crossing_wkt = parser()
            .parse(&json!("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (5 5, 15 5, 15 6, 5 6, 5 5))"))
            .unwrap();
        assert!(validate(&crossing_wkt).is_err());

        let outside = parser()
            .parse(&json!({"type": "polygon", "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[20, 20], [21, 20], [21, 21], [20, 21], [20, 20]]
            ]}))
            .unwrap();
        assert!(validate(&outside).is_err());

        let inside = parser()
            .parse(&json!({"type": "polygon", "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[2, 2], [2, 3], [3, 3], [3, 2], [2, 2]]
            ]}))
            .unwrap();
        assert!(validate(&inside).is_ok());
    }

    #[test]
    fn test_validate_overlapping_holes() {
        let geom = parser()
            .parse(&json!({"type": "polygon", "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[1, 1], [1, 4], [4, 4], [4, 1], [1, 1]],
                [[3, 3], [3, 6], [6, 6], [6, 3], [3, 3]]
            ]}))
            .unwrap();
        assert!(validate(&geom).is_err());
    }

    #[test]
    fn test_validate_large_ring() {
        let n = 20_000;
        let ring: Vec<[f64; 2]> = (0..=n)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * (i % n) as f64 / n as f64;
                [10.0 * angle.cos(), 10.0 * angle.sin()]
            })
            .collect();
        let geom = parser()
            .parse(&json!({"type": "polygon", "coordinates": [ring]}))
            .unwrap();
        assert!(validate(&geom).is_ok());
    }

    #[test]
    fn test_orientation_from_str() {
        assert_eq!("ccw".parse::<Orientation>().unwrap(), Orientation::Right);
        assert_eq!("Clockwise".parse::<Orientation>().unwrap(), Orientation::Left);
        assert!("up".parse::<Orientation>().is_err());
        assert_eq!(Orientation::Left.to_string(), "left");
    }
}
