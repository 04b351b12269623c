//! Polygon approximation using the Ramer-Douglas-Peucker algorithm.
//!
//! [`simplify`] reduces an open polyline; [`approx_closed`] reduces a
//! closed loop, such as a traced contour, to the polygon the document
//! selector tests for four corners.

use crate::types::Point;

/// Simplify an open polyline.
///
/// Points within `tolerance` pixels of the line between their kept
/// neighbours are removed. Endpoints are always kept. A tolerance of
/// 0.0 keeps every point that is not exactly collinear.
///
/// Polylines with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified polyline"]
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    points
        .iter()
        .zip(kept_mask(points, tolerance))
        .filter(|&(_, k)| k)
        .map(|(&p, _)| p)
        .collect()
}

/// Approximate a closed loop with a polygon of fewer vertices.
///
/// The loop is split into two chains at a pair of mutually distant
/// points: `a`, the point farthest from the first point, and `b`, the
/// point farthest from `a`. Each chain is simplified as an open
/// polyline, and the joined polygon is then swept for vertices lying
/// within `epsilon` of the line through their neighbours, which catches
/// the seam where the loop was cut.
///
/// The result is implicitly closed and starts at `a`. Loops of fewer than
/// 3 points are returned unchanged.
#[must_use = "returns the approximated polygon"]
pub fn approx_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    approx_closed_indices(points, epsilon)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// [`approx_closed`], returning the indices into `points` of the kept
/// vertices instead of the vertices themselves.
///
/// Indices follow the loop's own direction, wrapping around once.
#[must_use = "returns the indices of the approximated polygon"]
pub fn approx_closed_indices(points: &[Point], epsilon: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        // Every point coincides.
        return vec![a];
    }

    // Chain a -> b, then b -> a wrapping past the end.
    let forward: Vec<usize> = cyclic_range(n, a, b).collect();
    let backward: Vec<usize> = cyclic_range(n, b, a).collect();

    let mut polygon = simplify_chain(points, &forward, epsilon);
    let second = simplify_chain(points, &backward, epsilon);
    // `second` starts at b (already the last of `polygon`) and ends at a
    // (already the first).
    polygon.extend_from_slice(&second[1..second.len() - 1]);

    remove_collinear(points, &mut polygon, epsilon);
    polygon
}

/// Which points of an open polyline survive simplification.
fn kept_mask(points: &[Point], tolerance: f64) -> Vec<bool> {
    if points.len() < 3 {
        return vec![true; points.len()];
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);
    kept
}

/// Simplify the polyline `chain` (indices into `points`), returning the
/// surviving indices.
fn simplify_chain(points: &[Point], chain: &[usize], tolerance: f64) -> Vec<usize> {
    let polyline: Vec<Point> = chain.iter().map(|&i| points[i]).collect();
    chain
        .iter()
        .zip(kept_mask(&polyline, tolerance))
        .filter(|&(_, k)| k)
        .map(|(&i, _)| i)
        .collect()
}

/// Index of the point farthest from `origin`, first one on ties.
fn farthest_from(points: &[Point], origin: Point) -> usize {
    let mut best = 0;
    let mut best_dist = -1.0;
    for (i, &p) in points.iter().enumerate() {
        let d = p.distance_squared(origin);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Indices from `from` to `to` inclusive on a loop of `n` points,
/// wrapping around.
pub(crate) fn cyclic_range(n: usize, from: usize, to: usize) -> impl Iterator<Item = usize> {
    let count = (to + n - from) % n + 1;
    (0..count).map(move |k| (from + k) % n)
}

/// Drop vertices within `epsilon` of the line through their neighbours,
/// treating `polygon` (indices into `points`) as closed. Never reduces
/// below three vertices.
fn remove_collinear(points: &[Point], polygon: &mut Vec<usize>, epsilon: f64) {
    let mut i = 0;
    let mut since_removal = 0;
    while polygon.len() > 3 && since_removal < polygon.len() {
        let n = polygon.len();
        let idx = i % n;
        let prev = points[polygon[(idx + n - 1) % n]];
        let next = points[polygon[(idx + 1) % n]];
        if perpendicular_distance(points[polygon[idx]], prev, next) <= epsilon {
            polygon.remove(idx);
            since_removal = 0;
            i = idx;
        } else {
            since_removal += 1;
            i = idx + 1;
        }
    }
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line between them. If that distance exceeds `tolerance`, the point is
/// kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
