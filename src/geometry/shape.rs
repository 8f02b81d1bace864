//! Compound shapes assembled from flattened rings

use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, BoundingRect, Contains};
use geo_types::{LineString, MultiPolygon, Point, Polygon, Rect};

use super::path::{format_path, parse_path, Ring};
use super::validation::RingValidator;
use crate::core::error::GeometryError;
use crate::core::types::MapPoint;

/// Areas at or below this are treated as zero
const AREA_EPSILON: f64 = 1e-9;

/// A closed, possibly multi-part shape with holes
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    polygons: MultiPolygon<f64>,
}

impl Shape {
    /// Parse path data into a validated shape with non-zero area
    pub fn parse(path: &str, curve_segments: usize) -> Result<Self, GeometryError> {
        let rings = parse_path(path, curve_segments)?;
        RingValidator::validate(&rings)?;

        let shape = Self::from_rings(rings);
        if shape.area() <= AREA_EPSILON {
            return Err(GeometryError::ZeroArea);
        }
        Ok(shape)
    }

    /// Assemble rings with even-odd nesting: a ring inside an odd number of
    /// other rings is a hole of the innermost ring containing it.
    pub fn from_rings(rings: Vec<Ring>) -> Self {
        let mut rings: Vec<(Ring, f64)> = rings
            .into_iter()
            .map(|r| {
                let area = RingValidator::signed_area(&r).abs();
                (r, area)
            })
            .collect();
        // Larger rings first, so containers are always seen before their contents
        rings.sort_by(|a, b| b.1.total_cmp(&a.1));

        let outlines: Vec<Polygon<f64>> = rings
            .iter()
            .map(|(r, _)| Polygon::new(LineString::from(r.clone()), vec![]))
            .collect();

        // polygon index for every ring that became an exterior
        let mut exterior_slot: Vec<Option<usize>> = vec![None; rings.len()];
        let mut exteriors: Vec<LineString<f64>> = Vec::new();
        let mut holes: Vec<Vec<LineString<f64>>> = Vec::new();

        for (i, (ring, _)) in rings.iter().enumerate() {
            let containers: Vec<usize> = (0..i)
                .filter(|&j| ring.iter().any(|c| outlines[j].contains(&Point::from(*c))))
                .collect();

            let line = LineString::from(ring.clone());
            let innermost_exterior = containers
                .last()
                .and_then(|&j| exterior_slot[j]);

            match innermost_exterior {
                Some(slot) if containers.len() % 2 == 1 => holes[slot].push(line),
                _ => {
                    exterior_slot[i] = Some(exteriors.len());
                    exteriors.push(line);
                    holes.push(Vec::new());
                }
            }
        }

        let polygons: Vec<Polygon<f64>> = exteriors
            .into_iter()
            .zip(holes)
            .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
            .collect();

        Self {
            polygons: MultiPolygon::new(polygons).orient(Direction::Default),
        }
    }

    pub fn from_polygons(polygons: MultiPolygon<f64>) -> Self {
        Self { polygons }
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    pub fn area(&self) -> f64 {
        self.polygons.unsigned_area()
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.polygons.bounding_rect()
    }

    /// Center of the bounding box, the reference point used for targeting
    pub fn center(&self) -> Option<MapPoint> {
        self.bounds().map(|b| {
            let c = b.center();
            MapPoint::new(c.x, c.y)
        })
    }

    pub fn to_path(&self, precision: usize) -> String {
        format_path(&self.polygons, precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_ring_becomes_hole() {
        let shape = Shape::parse("M0,0H10V10H0Z M3,3H7V7H3Z", 8).unwrap();
        assert_eq!(shape.polygons().0.len(), 1);
        assert_eq!(shape.polygons().0[0].interiors().len(), 1);
        assert!((shape.area() - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_island_inside_hole_is_separate_polygon() {
        let shape = Shape::parse("M0,0H10V10H0Z M2,2H8V8H2Z M4,4H6V6H4Z", 8).unwrap();
        assert_eq!(shape.polygons().0.len(), 2);
        assert!((shape.area() - (100.0 - 36.0 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_subpaths_are_separate_parts() {
        let shape = Shape::parse("M0,0H2V2H0Z M5,5H8V8H5Z", 8).unwrap();
        assert_eq!(shape.polygons().0.len(), 2);
        assert!((shape.area() - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_area_rejected() {
        assert_eq!(Shape::parse("M0,0L5,5L10,10Z", 8), Err(GeometryError::ZeroArea));
        assert_eq!(Shape::parse("M0,0L5,5Z", 8), Err(GeometryError::EmptyShape));
    }

    #[test]
    fn test_center_is_bounding_box_center() {
        let shape = Shape::parse("M0,0H10L10,4L0,30Z", 8).unwrap();
        assert_eq!(shape.center(), Some(MapPoint::new(5.0, 15.0)));
    }
}
