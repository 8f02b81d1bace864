//! Ring validation: vertex counts and self-intersection

use geo_types::Coord;

use super::path::Ring;
use crate::core::error::GeometryError;

pub struct RingValidator;

impl RingValidator {
    /// Check every ring of a shape before it goes into boolean operations
    pub fn validate(rings: &[Ring]) -> Result<(), GeometryError> {
        if rings.is_empty() {
            return Err(GeometryError::EmptyShape);
        }
        for ring in rings {
            if ring.len() < 3 {
                return Err(GeometryError::EmptyShape);
            }
            if Self::is_self_intersecting(ring) {
                return Err(GeometryError::SelfIntersecting);
            }
        }
        Ok(())
    }

    /// Signed shoelace area; positive when counter-clockwise in y-up axes
    pub fn signed_area(ring: &[Coord<f64>]) -> f64 {
        let n = ring.len();
        let mut sum = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            sum += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
        }
        sum / 2.0
    }

    /// Check if ring edges cross each other (excluding adjacent edges)
    pub fn is_self_intersecting(ring: &[Coord<f64>]) -> bool {
        let n = ring.len();
        if n < 4 {
            return false; // Triangle can't self-intersect
        }

        for i in 0..n {
            let a1 = ring[i];
            let a2 = ring[(i + 1) % n];

            for j in (i + 2)..n {
                // Skip adjacent edges
                if j == (i + n - 1) % n {
                    continue;
                }

                let b1 = ring[j];
                let b2 = ring[(j + 1) % n];

                if Self::segments_intersect(a1, a2, b1, b2) {
                    return true;
                }
            }
        }
        false
    }

    /// Proper intersection only; touching endpoints and collinear overlap pass
    fn segments_intersect(a1: Coord<f64>, a2: Coord<f64>, b1: Coord<f64>, b2: Coord<f64>) -> bool {
        let d1 = Self::cross_product_sign(b1, b2, a1);
        let d2 = Self::cross_product_sign(b1, b2, a2);
        let d3 = Self::cross_product_sign(a1, a2, b1);
        let d4 = Self::cross_product_sign(a1, a2, b2);

        ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
            && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    }

    fn cross_product_sign(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }
}
