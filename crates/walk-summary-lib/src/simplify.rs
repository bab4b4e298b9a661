//! Douglas-Peucker line simplification with a tolerance in meters
//!
//! Points are projected onto a local equirectangular plane (meters, anchored at the first
//! point's latitude) so the tolerance means the same thing everywhere on a walk-sized route.

use crate::GeoPoint;
use geo::Coord;

/// Earth's mean radius in meters
const EARTH_RADIUS_M: f64 = 6371000.0;

/// Simplify `points`, keeping every point that deviates more than `tolerance_m` meters
/// from the simplified line
///
/// The first and last points are always kept. A tolerance of zero (or less) returns the
/// input unchanged.
pub fn simplify(points: &[GeoPoint], tolerance_m: f64) -> Vec<GeoPoint> {
    simplify_indices(points, tolerance_m)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Indices of the points kept by [`simplify`], in increasing order
pub fn simplify_indices(points: &[GeoPoint], tolerance_m: f64) -> Vec<usize> {
    // NaN tolerances also disable simplification
    if points.len() <= 2 || !(tolerance_m > 0.0) {
        return (0..points.len()).collect();
    }

    let projected = project(points);
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (index, distance) = farthest_from_chord(&projected, start, end);
        if distance > tolerance_m {
            keep[index] = true;
            stack.push((index, end));
            stack.push((start, index));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Find the interior point farthest from the chord `start..end`
///
/// Exact ties resolve to the earliest index.
fn farthest_from_chord(points: &[Coord<f64>], start: usize, end: usize) -> (usize, f64) {
    let (a, b) = (points[start], points[end]);
    let mut best = (start + 1, f64::NEG_INFINITY);

    for (i, p) in points.iter().enumerate().take(end).skip(start + 1) {
        let distance = distance_to_segment(*p, a, b);
        if distance > best.1 {
            best = (i, distance);
        }
    }

    best
}

/// Distance from `p` to the segment `a`-`b`; degenerate segments use the distance to `a`
fn distance_to_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let length_sq = ab.x * ab.x + ab.y * ab.y;

    if length_sq == 0.0 {
        return ap.x.hypot(ap.y);
    }

    let t = ((ap.x * ab.x + ap.y * ab.y) / length_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p.x - closest.x).hypot(p.y - closest.y)
}

/// Project to a local plane in meters around the first point
fn project(points: &[GeoPoint]) -> Vec<Coord<f64>> {
    let origin = points[0];
    let cos_lat = origin.latitude().to_radians().cos();

    points
        .iter()
        .map(|p| Coord {
            x: (p.longitude() - origin.longitude()).to_radians() * cos_lat * EARTH_RADIUS_M,
            y: (p.latitude() - origin.latitude()).to_radians() * EARTH_RADIUS_M,
        })
        .collect()
}
