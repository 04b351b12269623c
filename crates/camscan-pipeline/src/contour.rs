//! Contour tracing and ranking.
//!
//! Every border in the edge map is traced as a closed pixel loop, both
//! outer borders and hole borders, with no hierarchy. Each contour
//! carries its enclosed area so the selector can rank candidates without
//! recomputing it.

use geo::{Area, LineString, Polygon};
use image::GrayImage;

use crate::types::Point;

/// A closed loop of border pixels traced from an edge map.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Point>,
    area: f64,
}

impl Contour {
    /// Wrap a closed loop of points, computing its enclosed area.
    ///
    /// The loop is implicitly closed: the last point connects back to
    /// the first.
    #[must_use]
    pub fn new(points: Vec<Point>) -> Self {
        let area = enclosed_area(&points);
        Self { points, area }
    }

    /// The contour's points, in tracing order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the contour has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Absolute enclosed area in square pixels.
    ///
    /// Loops of fewer than three points enclose nothing.
    #[must_use]
    pub const fn area(&self) -> f64 {
        self.area
    }

    /// Length of the closed loop, including the closing segment.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        closed_perimeter(&self.points)
    }
}

fn enclosed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let exterior: LineString<f64> = points.iter().map(|p| (p.x, p.y)).collect();
    Polygon::new(exterior, vec![]).unsigned_area()
}

/// Length of `points` treated as a closed loop.
#[must_use]
pub fn closed_perimeter(points: &[Point]) -> f64 {
    let Some(&last) = points.last() else {
        return 0.0;
    };
    let mut previous = last;
    let mut total = 0.0;
    for &p in points {
        total += previous.distance(p);
        previous = p;
    }
    total
}

/// Trace every border in a binary edge map.
///
/// Non-zero pixels are foreground. Outer and hole borders are both
/// returned, in the order the raster scan discovers them. Every traced
/// point is kept.
#[must_use = "returns the traced contours"]
pub fn trace_contours(edges: &GrayImage) -> Vec<Contour> {
    let traced: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(edges);

    traced
        .into_iter()
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Contour::new(points)
        })
        .collect()
}

/// Sort contours by enclosed area, largest first.
///
/// The sort is stable: contours with equal area keep their tracing order.
pub fn rank_by_area(contours: &mut [Contour]) {
    contours.sort_by(|a, b| b.area.total_cmp(&a.area));
}
