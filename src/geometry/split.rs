//! Region splitting by half-plane intersection
//!
//! A shape is cut along a line through its bounding-box center. Each half is
//! the boolean intersection of the shape with a rectangle reaching far past the
//! shape on three sides and lying exactly on the cut line on the fourth, so
//! concave and multi-part shapes split correctly (a piece may itself come out
//! as several parts).

use geo::{Area, BooleanOps};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use super::shape::Shape;
use crate::core::config::SplitConfig;
use crate::core::error::GeometryError;

/// Orientation of the cut line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitAxis {
    /// Horizontal line, 0°
    Horizontal,
    /// Vertical line, 90°
    Vertical,
}

impl SplitAxis {
    /// Taller shapes are cut horizontally, all others vertically
    pub fn for_extent(width: f64, height: f64) -> Self {
        if height > width {
            SplitAxis::Horizontal
        } else {
            SplitAxis::Vertical
        }
    }

    pub fn degrees(self) -> f64 {
        match self {
            SplitAxis::Horizontal => 0.0,
            SplitAxis::Vertical => 90.0,
        }
    }

    pub fn perpendicular(self) -> Self {
        match self {
            SplitAxis::Horizontal => SplitAxis::Vertical,
            SplitAxis::Vertical => SplitAxis::Horizontal,
        }
    }

    /// Unit direction along the line and the unit normal at +90°
    fn frame(self) -> (Coord<f64>, Coord<f64>) {
        match self {
            SplitAxis::Horizontal => (Coord { x: 1.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 }),
            SplitAxis::Vertical => (Coord { x: 0.0, y: 1.0 }, Coord { x: -1.0, y: 0.0 }),
        }
    }
}

/// Both halves of a split, as path data
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    /// The half on the normal side (below a horizontal cut, left of a vertical one)
    pub part_a: String,
    pub part_b: String,
    pub axis: SplitAxis,
}

/// Split the shape described by `path` into two halves.
///
/// Tries the orientation-based axis first and the perpendicular one once if
/// the first attempt leaves a piece at or below `min_piece_area`.
pub fn split_polygon(path: &str, config: &SplitConfig) -> Result<SplitResult, GeometryError> {
    let shape = Shape::parse(path, config.curve_segments)?;
    let bounds = shape.bounds().ok_or(GeometryError::EmptyShape)?;
    let primary = SplitAxis::for_extent(bounds.width(), bounds.height());

    for axis in [primary, primary.perpendicular()] {
        match split_shape(&shape, axis, config.min_piece_area) {
            Some((a, b)) => {
                let part_a = a.to_path(config.precision);
                let part_b = b.to_path(config.precision);
                if part_a.is_empty() || part_b.is_empty() {
                    tracing::debug!(?axis, "split pieces vanished after rounding");
                    continue;
                }
                return Ok(SplitResult { part_a, part_b, axis });
            }
            None => {
                tracing::debug!(?axis, "degenerate split, trying next axis");
            }
        }
    }

    Err(GeometryError::SplitFailed)
}

/// Intersect the shape with both half-planes of `axis`
pub fn split_shape(shape: &Shape, axis: SplitAxis, min_piece_area: f64) -> Option<(Shape, Shape)> {
    let bounds = shape.bounds()?;
    let center = bounds.center();
    let reach = (bounds.width() + bounds.height()) * 2.0 + 1.0;

    let (near, far) = half_planes(center, axis, reach);
    let piece_a = shape.polygons().intersection(&MultiPolygon::new(vec![near]));
    let piece_b = shape.polygons().intersection(&MultiPolygon::new(vec![far]));

    if piece_a.unsigned_area() <= min_piece_area || piece_b.unsigned_area() <= min_piece_area {
        return None;
    }

    Some((Shape::from_polygons(piece_a), Shape::from_polygons(piece_b)))
}

/// The two rectangles sharing the cut line through `center`
fn half_planes(center: Coord<f64>, axis: SplitAxis, reach: f64) -> (Polygon<f64>, Polygon<f64>) {
    let (dir, normal) = axis.frame();
    let along = Coord { x: dir.x * reach, y: dir.y * reach };

    let side = |sign: f64| {
        let out = Coord {
            x: normal.x * reach * 2.0 * sign,
            y: normal.y * reach * 2.0 * sign,
        };
        let p1 = center - along;
        let p2 = center + along;
        Polygon::new(LineString::from(vec![p1, p2, p2 + out, p1 + out]), vec![])
    };

    (side(1.0), side(-1.0))
}
