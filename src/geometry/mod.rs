//! Geometry kernel: path parsing, shape measures and region splitting
//!
//! Everything here is a pure function of its input path data.

mod path;
mod shape;
mod split;
mod validation;

pub use path::{format_path, parse_path, Ring};
pub use shape::Shape;
pub use split::{split_polygon, split_shape, SplitAxis, SplitResult};
pub use validation::RingValidator;

use geo_types::Rect;

use crate::core::error::GeometryError;
use crate::core::types::MapPoint;

/// Area enclosed by a path
pub fn path_area(path: &str, curve_segments: usize) -> Result<f64, GeometryError> {
    Ok(Shape::parse(path, curve_segments)?.area())
}

pub fn path_bounds(path: &str, curve_segments: usize) -> Result<Rect<f64>, GeometryError> {
    Shape::parse(path, curve_segments)?
        .bounds()
        .ok_or(GeometryError::EmptyShape)
}

/// Bounding-box center of a path's shape
pub fn path_center(path: &str, curve_segments: usize) -> Result<MapPoint, GeometryError> {
    Shape::parse(path, curve_segments)?
        .center()
        .ok_or(GeometryError::EmptyShape)
}
