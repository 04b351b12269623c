//! Document selection: pick the four-cornered outline among the largest
//! contours.

use image::GrayImage;

use crate::contour::{Contour, rank_by_area, trace_contours};
use crate::simplify::{approx_closed_indices, cyclic_range};
use crate::types::{DocumentCorners, Point};

/// Polygon approximation tolerance as a fraction of contour perimeter.
pub const APPROX_TOLERANCE_FRACTION: f64 = 0.02;

/// The ranked contours of one edge map and the document found among them.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Every traced contour, largest enclosed area first.
    pub contours: Vec<Contour>,
    /// The first of the top-ranked contours that reduced to four
    /// vertices, if any.
    pub corners: Option<DocumentCorners>,
}

impl Selection {
    /// The `limit` largest contours (fewer if fewer were traced).
    #[must_use]
    pub fn top(&self, limit: usize) -> &[Contour] {
        &self.contours[..limit.min(self.contours.len())]
    }
}

/// Trace, rank and search an edge map for the document outline.
#[must_use]
pub fn select(edges: &GrayImage, limit: usize) -> Selection {
    let mut contours = trace_contours(edges);
    rank_by_area(&mut contours);
    let corners = find_document_corners(&contours, limit);
    Selection { contours, corners }
}

/// Walk the first `limit` contours of an already-ranked list and return
/// the first whose closed polygon approximation has exactly four
/// vertices.
///
/// The tolerance for each contour is [`APPROX_TOLERANCE_FRACTION`] of its
/// own perimeter. Later candidates are not examined once one matches.
/// The four vertices are then refined with [`refine_corners`].
#[must_use]
pub fn find_document_corners(ranked: &[Contour], limit: usize) -> Option<DocumentCorners> {
    ranked.iter().take(limit).find_map(|contour| {
        let points = contour.points();
        let epsilon = APPROX_TOLERANCE_FRACTION * contour.perimeter();
        let vertices: [usize; 4] = approx_closed_indices(points, epsilon).try_into().ok()?;
        Some(DocumentCorners::new(refine_corners(points, vertices, epsilon)))
    })
}

/// Snap each vertex of a quadrilateral to the intersection of the lines
/// fitted through the contour runs on either side of it.
///
/// Polygon vertices are contour samples, and a traced corner is usually
/// clipped or rounded, so the sample sits a pixel or so inside the true
/// corner. `vertices` index into `points` in loop order. A vertex stays
/// put when a neighbouring run is too short to fit, the two lines are
/// near parallel, or the intersection lands more than `epsilon` away.
#[must_use]
pub fn refine_corners(points: &[Point], vertices: [usize; 4], epsilon: f64) -> [Point; 4] {
    let sides: [Option<Line>; 4] =
        std::array::from_fn(|i| fit_side(points, vertices[i], vertices[(i + 1) % 4]));
    std::array::from_fn(|i| {
        let vertex = points[vertices[i]];
        sides[(i + 3) % 4]
            .zip(sides[i])
            .and_then(|(before, after)| before.intersect(&after))
            .filter(|p| p.distance(vertex) <= epsilon)
            .unwrap_or(vertex)
    })
}

/// An infinite line through `origin` along the unit vector `(dx, dy)`.
#[derive(Debug, Clone, Copy)]
struct Line {
    origin: Point,
    dx: f64,
    dy: f64,
}

impl Line {
    /// Least-squares (orthogonal) fit. `None` for fewer than two distinct
    /// points.
    fn fit(points: &[Point]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = points.len() as f64;
        let cx = points.iter().map(|p| p.x).sum::<f64>() / count;
        let cy = points.iter().map(|p| p.y).sum::<f64>() / count;
        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for p in points {
            let (x, y) = (p.x - cx, p.y - cy);
            sxx += x * x;
            sxy += x * y;
            syy += y * y;
        }
        if sxx + syy == 0.0 {
            return None;
        }
        let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        Some(Self {
            origin: Point::new(cx, cy),
            dx: angle.cos(),
            dy: angle.sin(),
        })
    }

    fn intersect(&self, other: &Self) -> Option<Point> {
        let cross = self.dx.mul_add(other.dy, -(self.dy * other.dx));
        // Sine of the angle between the lines; about 1 degree.
        if cross.abs() < 0.0175 {
            return None;
        }
        let (ox, oy) = (other.origin.x - self.origin.x, other.origin.y - self.origin.y);
        let t = ox.mul_add(other.dy, -(oy * other.dx)) / cross;
        Some(Point::new(
            t.mul_add(self.dx, self.origin.x),
            t.mul_add(self.dy, self.origin.y),
        ))
    }
}

/// Fit the contour run strictly between vertices `from` and `to`,
/// leaving out an eighth of it at each end where the corners bend.
fn fit_side(points: &[Point], from: usize, to: usize) -> Option<Line> {
    let run: Vec<Point> = cyclic_range(points.len(), from, to)
        .map(|i| points[i])
        .collect();
    let inner = run.get(1..run.len().saturating_sub(1))?;
    let trim = inner.len() / 8;
    Line::fit(&inner[trim..inner.len() - trim])
}
