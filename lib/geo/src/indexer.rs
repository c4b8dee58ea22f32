//! Vector (`BKD`) shape indexing
//!
//! Turns a parsed geometry into the primitives the storage layer indexes:
//! points stay points, linestrings become one line per segment and polygons
//! are ear-cut into triangles. Polygons are first resolved against the
//! dateline and rewound to counter-clockwise exteriors.

use crate::geometry::{validate, Orientation, ShapeResult};
use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, BoundingRect, MapCoords, TriangulateEarcut};
use geo_types::{coord, Coord, Geometry, GeometryCollection, MultiPolygon, Polygon, Rect};
use geomap_core::ShapePrimitive;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoShapeIndexer {
    orientation: Orientation,
    field_name: String,
}

impl GeoShapeIndexer {
    pub fn new(orientation: Orientation, field_name: impl Into<String>) -> Self {
        Self {
            orientation,
            field_name: field_name.into(),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Validated geometry with polygons split at the dateline and rewound
    pub fn prepare(&self, geometry: &Geometry<f64>) -> ShapeResult<Geometry<f64>> {
        validate(geometry)?;
        Ok(self.normalize(geometry))
    }

    pub fn index(&self, geometry: &Geometry<f64>) -> ShapeResult<Vec<ShapePrimitive>> {
        let prepared = self.prepare(geometry)?;
        let primitives = decompose(&prepared);
        tracing::trace!(field = %self.field_name, primitives = primitives.len(), "indexed shape");
        Ok(primitives)
    }

    fn normalize(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        match geometry {
            Geometry::Polygon(polygon) => polygon_geometry(self.polygon_parts(polygon)),
            Geometry::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
                polygons.0.iter().flat_map(|p| self.polygon_parts(p)).collect(),
            )),
            Geometry::Rect(rect) => self.normalize(&Geometry::Polygon(rect.to_polygon())),
            Geometry::Triangle(triangle) => {
                self.normalize(&Geometry::Polygon(triangle.to_polygon()))
            }
            Geometry::GeometryCollection(collection) => {
                let parts = collection.0.iter().map(|g| self.normalize(g)).collect();
                Geometry::GeometryCollection(GeometryCollection::new_from(parts))
            }
            other => other.clone(),
        }
    }

    fn polygon_parts(&self, polygon: &Polygon<f64>) -> Vec<Polygon<f64>> {
        let exterior_ccw = Polygon::new(polygon.exterior().clone(), vec![]).signed_area() > 0.0;
        let span = polygon
            .exterior()
            .bounding_rect()
            .map(|r| r.width())
            .unwrap_or(0.0);

        if exterior_ccw != self.orientation.is_ccw() && span > 180.0 {
            tracing::debug!(field = %self.field_name, span, "splitting polygon at the dateline");
            split_dateline(polygon)
        } else {
            vec![polygon.orient(Direction::Default)]
        }
    }
}

fn polygon_geometry(mut parts: Vec<Polygon<f64>>) -> Geometry<f64> {
    if parts.len() == 1 {
        if let Some(polygon) = parts.pop() {
            return Geometry::Polygon(polygon);
        }
    }
    Geometry::MultiPolygon(MultiPolygon::new(parts))
}

/// Shifts western longitudes by +360 and clips the result into the
/// [0, 180] and [180, 360] bands, the latter shifted back by -360
fn split_dateline(polygon: &Polygon<f64>) -> Vec<Polygon<f64>> {
    let shifted = polygon.map_coords(|c: Coord<f64>| {
        if c.x < 0.0 {
            coord! { x: c.x + 360.0, y: c.y }
        } else {
            c
        }
    });
    let west = Rect::new(coord! { x: 0.0, y: -90.0 }, coord! { x: 180.0, y: 90.0 }).to_polygon();
    let east = Rect::new(coord! { x: 180.0, y: -90.0 }, coord! { x: 360.0, y: 90.0 }).to_polygon();

    let mut parts = shifted.intersection(&west).0;
    parts.extend(
        shifted
            .intersection(&east)
            .0
            .into_iter()
            .map(|p| p.map_coords(|c: Coord<f64>| coord! { x: c.x - 360.0, y: c.y })),
    );
    parts
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .map(|p| p.orient(Direction::Default))
        .collect()
}

/// Primitive decomposition of an already prepared geometry
pub fn decompose(geometry: &Geometry<f64>) -> Vec<ShapePrimitive> {
    let mut out = Vec::new();
    decompose_into(geometry, &mut out);
    out
}

fn decompose_into(geometry: &Geometry<f64>, out: &mut Vec<ShapePrimitive>) {
    match geometry {
        Geometry::Point(p) => out.push(ShapePrimitive::Point { at: [p.x(), p.y()] }),
        Geometry::MultiPoint(points) => out.extend(
            points
                .0
                .iter()
                .map(|p| ShapePrimitive::Point { at: [p.x(), p.y()] }),
        ),
        Geometry::Line(line) => out.push(ShapePrimitive::Line {
            from: [line.start.x, line.start.y],
            to: [line.end.x, line.end.y],
        }),
        Geometry::LineString(line) => out.extend(line.lines().map(|l| ShapePrimitive::Line {
            from: [l.start.x, l.start.y],
            to: [l.end.x, l.end.y],
        })),
        Geometry::MultiLineString(lines) => lines
            .0
            .iter()
            .for_each(|l| decompose_into(&Geometry::LineString(l.clone()), out)),
        Geometry::Polygon(polygon) => triangulate(polygon, out),
        Geometry::MultiPolygon(polygons) => polygons.0.iter().for_each(|p| triangulate(p, out)),
        Geometry::Rect(rect) => triangulate(&rect.to_polygon(), out),
        Geometry::Triangle(triangle) => {
            let [a, b, c] = triangle.to_array();
            out.push(ShapePrimitive::Triangle {
                a: [a.x, a.y],
                b: [b.x, b.y],
                c: [c.x, c.y],
            });
        }
        Geometry::GeometryCollection(collection) => {
            collection.0.iter().for_each(|g| decompose_into(g, out))
        }
    }
}

fn triangulate(polygon: &Polygon<f64>, out: &mut Vec<ShapePrimitive>) {
    for triangle in polygon.earcut_triangles() {
        let [a, b, c] = triangle.to_array();
        out.push(ShapePrimitive::Triangle {
            a: [a.x, a.y],
            b: [b.x, b.y],
            c: [c.x, c.y],
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryParser;
    use geo_types::{line_string, point, polygon};
    use geomap_core::document::extent;
    use serde_json::json;

    fn indexer() -> GeoShapeIndexer {
        GeoShapeIndexer::new(Orientation::Right, "geo")
    }

    #[test]
    fn test_point_and_line_primitives() {
        let primitives = indexer().index(&Geometry::Point(point!(x: 1.0, y: 2.0))).unwrap();
        assert_eq!(primitives, vec![ShapePrimitive::Point { at: [1.0, 2.0] }]);

        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 0.0)];
        let primitives = indexer().index(&Geometry::LineString(line)).unwrap();
        assert_eq!(primitives.len(), 2);
        assert!(primitives.iter().all(|p| matches!(p, ShapePrimitive::Line { .. })));
    }

    #[test]
    fn test_square_is_two_triangles() {
        let square = polygon![
            (x: 100.0, y: 0.0),
            (x: 101.0, y: 0.0),
            (x: 101.0, y: 1.0),
            (x: 100.0, y: 1.0),
            (x: 100.0, y: 0.0),
        ];
        let primitives = indexer().index(&Geometry::Polygon(square)).unwrap();
        assert_eq!(primitives.len(), 2);
        assert_eq!(extent(&primitives), Some([100.0, 0.0, 101.0, 1.0]));
    }

    #[test]
    fn test_clockwise_input_is_rewound() {
        let clockwise = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ];
        match indexer().prepare(&Geometry::Polygon(clockwise)).unwrap() {
            Geometry::Polygon(p) => {
                assert!(Polygon::new(p.exterior().clone(), vec![]).signed_area() > 0.0)
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_dateline_crossing_polygon_is_split() {
        let parser = GeometryParser::new(Orientation::Right, false, true);
        // clockwise under a right-hand orientation, spanning 340 degrees
        let shape = parser
            .parse(&json!({
                "type": "polygon",
                "coordinates": [[[170, 10], [170, -10], [-170, -10], [-170, 10], [170, 10]]]
            }))
            .unwrap();

        match indexer().prepare(&shape).unwrap() {
            Geometry::MultiPolygon(parts) => assert_eq!(parts.0.len(), 2),
            other => panic!("expected two parts, got {:?}", other),
        }
        let primitives = indexer().index(&shape).unwrap();
        assert_eq!(primitives.len(), 4);
        let bounds = extent(&primitives).unwrap();
        assert_eq!(bounds[0], -180.0);
        assert_eq!(bounds[2], 180.0);
    }

    #[test]
    fn test_wide_polygon_matching_orientation_is_kept() {
        let wide = polygon![
            (x: -170.0, y: -10.0),
            (x: 170.0, y: -10.0),
            (x: 170.0, y: 10.0),
            (x: -170.0, y: 10.0),
            (x: -170.0, y: -10.0),
        ];
        assert!(matches!(
            indexer().prepare(&Geometry::Polygon(wide)).unwrap(),
            Geometry::Polygon(_)
        ));
    }

    #[test]
    fn test_self_intersecting_polygon_rejected() {
        let bow_tie = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(indexer().index(&Geometry::Polygon(bow_tie)).is_err());
    }
}
