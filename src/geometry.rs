use crate::error::{Error, Result};
use crate::route::TrackPoint;

use geo_types::Coord;
use std::f64::consts::PI;

// Coordinates are scaled before subtraction so that neighbouring points a
// few micro-degrees apart still give a non-zero vector.
const VECTOR_SCALE: f64 = 1_000_000.0;

fn scaled_delta(from: &TrackPoint, to: &TrackPoint) -> Coord<f64> {
    Coord {
        x: to.lon() * VECTOR_SCALE - from.lon() * VECTOR_SCALE,
        y: to.lat() * VECTOR_SCALE - from.lat() * VECTOR_SCALE,
    }
}

// Angle in degrees between the travel vector and the north reference
// vector (0, |dy|). None when either vector has zero length.
fn angle_to_reference(a: Coord<f64>) -> Option<f64> {
    let b = Coord { x: 0.0, y: a.y.abs() };

    let len_a = (a.x * a.x + a.y * a.y).sqrt();
    let len_b = b.y;

    if len_a == 0.0 || len_b == 0.0 {
        return None;
    }

    let dot = a.x * b.x + a.y * b.y;
    let cos = (dot / (len_a * len_b)).clamp(-1.0, 1.0);

    Some(cos.acos() * 180.0 / PI)
}

/// Camera heading in whole degrees `[0, 360)` seen from `origin`, looking
/// towards the first route point after `index` that yields a usable vector.
///
/// `origin` is usually `points[index]`, but a featured point that is not on
/// the route keeps its own coordinate and only borrows the route index.
///
/// A candidate is skipped when the travel vector or its north reference has
/// zero length (coincident points, or no latitude change at all). If the
/// end of the route is reached first, [`Error::Geometry`] is returned.
pub fn heading_angle(origin: &TrackPoint, points: &[TrackPoint], index: usize)
                     -> Result<u16> {
    let len = points.len();
    if index >= len {
        return Err(Error::Geometry {
            index: index,
            len: len,
        });
    }

    for next in &points[index + 1..] {
        let a = scaled_delta(origin, next);

        if let Some(angle) = angle_to_reference(a) {
            let angle = if a.x < 0.0 { 360.0 - angle } else { angle };

            return Ok((angle as u16) % 360);
        }
    }

    Err(Error::Geometry {
        index: index,
        len: len,
    })
}
