//! Integration tests: synthetic camera frames through the full pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use camscan_pipeline::{
    DebugStage, Dimensions, DocumentCorners, Frame, Pipeline, PipelineConfig, PipelineError,
    Plane, Point, StageImage, config_from_settings, settings::keys,
};

const BACKGROUND: u8 = 30;
const PAPER: u8 = 220;

/// A `width` x `height` luminance buffer filled by `shade(x, y)`.
fn render(width: u32, height: u32, shade: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| shade(x, y))
        .collect()
}

/// Bright paper covering `[x0, x1) x [y0, y1)` on a dark table.
fn sheet(width: u32, height: u32, (x0, y0): (u32, u32), (x1, y1): (u32, u32)) -> Vec<u8> {
    render(width, height, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            PAPER
        } else {
            BACKGROUND
        }
    })
}

/// Odd closing element so the closing introduces no anchor shift.
fn config() -> PipelineConfig {
    PipelineConfig {
        morph_kernel_size: 9,
        ..PipelineConfig::default()
    }
}

/// Every expected corner has a detected corner within `tolerance`.
fn assert_corners_near(found: &DocumentCorners, expected: [(f64, f64); 4], tolerance: f64) {
    for (ex, ey) in expected {
        let target = Point::new(ex, ey);
        let nearest = found
            .points()
            .iter()
            .map(|p| p.distance(target))
            .fold(f64::INFINITY, f64::min);
        assert!(
            nearest <= tolerance,
            "no corner within {tolerance} of ({ex}, {ey}); found {:?}",
            found.points()
        );
    }
}

/// Every expected corner has a detected corner no more than `tolerance`
/// away along each axis.
fn assert_corners_within(found: &DocumentCorners, expected: [(f64, f64); 4], tolerance: f64) {
    for (ex, ey) in expected {
        let hit = found
            .points()
            .iter()
            .any(|p| (p.x - ex).abs() <= tolerance && (p.y - ey).abs() <= tolerance);
        assert!(
            hit,
            "no corner within {tolerance} px of ({ex}, {ey}) on both axes; found {:?}",
            found.points()
        );
    }
}

/// Corner `i` of `a` and of `b` coincide within `tolerance`.
fn assert_same_corners(a: &DocumentCorners, b: &DocumentCorners, tolerance: f64) {
    for (p, q) in a.points().iter().zip(b.points()) {
        assert!(p.distance(*q) <= tolerance, "{p:?} vs {q:?}");
    }
}

#[test]
fn portrait_sheet_is_found() {
    let data = sheet(320, 480, (60, 100), (260, 380));
    let mut pipeline = Pipeline::new(320, 480, config()).unwrap();
    let output = pipeline.process(&Frame::from_luma(320, 480, &data)).unwrap();

    let corners = output.corners.expect("sheet should be detected");
    assert_corners_within(
        &corners,
        [(60.0, 100.0), (259.0, 100.0), (259.0, 379.0), (60.0, 379.0)],
        1.0,
    );
    // No rotation or scaling: working space is the output space.
    assert_same_corners(&corners.to_output_space(pipeline.geometry()), &corners, 1e-9);
    let expected_area = 200.0 * 280.0;
    let area = corners.area();
    assert!(
        (area - expected_area).abs() / expected_area < 0.05,
        "area {area} vs {expected_area}"
    );
}

#[test]
fn default_config_finds_sheet() {
    let data = sheet(320, 480, (60, 100), (260, 380));
    let mut pipeline = Pipeline::new(320, 480, PipelineConfig::default()).unwrap();
    let output = pipeline.process(&Frame::from_luma(320, 480, &data)).unwrap();

    let corners = output.corners.expect("sheet should be detected");
    assert_corners_near(
        &corners,
        [(60.0, 100.0), (259.0, 100.0), (259.0, 379.0), (60.0, 379.0)],
        8.0,
    );
}

#[test]
fn printed_lines_are_suppressed() {
    // Dark three-pixel "text" rows across the page.
    let data = render(320, 480, |x, y| {
        let on_page = (60..260).contains(&x) && (100..380).contains(&y);
        let text = (80..240).contains(&x) && (130..350).contains(&y) && (y - 130) % 12 < 3;
        match (on_page, text) {
            (true, true) => 40,
            (true, false) => PAPER,
            _ => BACKGROUND,
        }
    });
    let mut pipeline = Pipeline::new(320, 480, config()).unwrap();
    let output = pipeline.process(&Frame::from_luma(320, 480, &data)).unwrap();

    let corners = output.corners.expect("page should survive its text");
    assert_corners_near(
        &corners,
        [(60.0, 100.0), (259.0, 100.0), (259.0, 379.0), (60.0, 379.0)],
        6.0,
    );
}

#[test]
fn content_removed_tap_wipes_text() {
    let data = render(320, 480, |x, y| {
        let on_page = (60..260).contains(&x) && (100..380).contains(&y);
        let text = (80..240).contains(&x) && (130..350).contains(&y) && (y - 130) % 12 < 3;
        match (on_page, text) {
            (true, true) => 40,
            (true, false) => PAPER,
            _ => BACKGROUND,
        }
    });
    let mut pipeline = Pipeline::new(
        320,
        480,
        PipelineConfig {
            output_stage: DebugStage::ContentRemoved,
            ..config()
        },
    )
    .unwrap();
    let output = pipeline.process(&Frame::from_luma(320, 480, &data)).unwrap();
    let StageImage::Luma(closed) = output.image else {
        panic!("content_removed is a raster tap");
    };
    for y in 130..350 {
        assert_eq!(closed.get_pixel(160, y).0[0], PAPER, "text left at y={y}");
    }
}

#[test]
fn featureless_frame_has_no_document() {
    // Low-amplitude sensor noise on a flat grey field.
    let mut state: u32 = 0x1234_5678;
    let data: Vec<u8> = (0..320 * 480)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            100 + u8::try_from(state >> 30).unwrap()
        })
        .collect();
    let mut pipeline = Pipeline::new(320, 480, PipelineConfig::default()).unwrap();
    let output = pipeline.process(&Frame::from_luma(320, 480, &data)).unwrap();

    assert!(output.corners.is_none());
    assert_eq!(output.contour_count, 0);
    assert!(!output.diagnostics.summary.corners_found);
    let overlay = output.image.into_rgba();
    assert_eq!(overlay.dimensions(), (320, 480));
    assert!(overlay.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn landscape_frame_is_rotated() {
    let data = sheet(640, 480, (100, 80), (500, 400));
    let mut pipeline = Pipeline::new(640, 480, config()).unwrap();
    let geometry = *pipeline.geometry();
    assert!(geometry.needs_rotation);
    assert_eq!(geometry.oriented, Dimensions::new(480, 640));

    let output = pipeline.process(&Frame::from_luma(640, 480, &data)).unwrap();
    let StageImage::Rgba(overlay) = &output.image else {
        panic!("corners_detected is an overlay");
    };
    assert_eq!(overlay.dimensions(), (480, 640));

    let corners = output.corners.expect("sheet should be detected");
    assert_corners_near(
        &corners.to_frame_space(&geometry),
        [(100.0, 80.0), (499.0, 80.0), (499.0, 399.0), (100.0, 399.0)],
        6.0,
    );
}

#[test]
fn tall_frame_is_downscaled() {
    let data = sheet(480, 960, (80, 160), (400, 800));
    let mut pipeline = Pipeline::new(
        480,
        960,
        PipelineConfig {
            max_image_height: 240,
            ..config()
        },
    )
    .unwrap();
    let geometry = *pipeline.geometry();
    assert!(geometry.needs_scaling);
    assert_eq!(geometry.working, Dimensions::new(120, 240));

    let output = pipeline.process(&Frame::from_luma(480, 960, &data)).unwrap();
    let corners = output.corners.expect("sheet should be detected");
    // Paper covers working pixels [20, 99] x [40, 199].
    assert_corners_within(
        &corners,
        [(20.0, 40.0), (99.0, 40.0), (99.0, 199.0), (20.0, 199.0)],
        1.0,
    );
    let output_space = corners.to_output_space(&geometry);
    assert_same_corners(&output_space, &corners.map(|p| Point::new(p.x * 4.0, p.y * 4.0)), 1.0);
    // One working pixel spans four input pixels.
    assert_corners_within(
        &output_space,
        [(80.0, 160.0), (399.0, 160.0), (399.0, 799.0), (80.0, 799.0)],
        4.0,
    );

    // The overlay comes back at full resolution, with the top edge drawn.
    let overlay = output.image.into_rgba();
    assert_eq!(overlay.dimensions(), (480, 960));
    assert!((145..175).any(|y| overlay.get_pixel(240, y).0[3] > 0));
    assert_eq!(overlay.get_pixel(240, 480).0[3], 0);
    assert_eq!(overlay.get_pixel(10, 10).0[3], 0);
}

#[test]
fn landscape_frame_is_rotated_and_downscaled() {
    // Paper covers frame pixels [200, 999] x [160, 799].
    let data = sheet(1280, 960, (200, 160), (1000, 800));
    let mut pipeline = Pipeline::new(
        1280,
        960,
        PipelineConfig {
            max_image_height: 320,
            ..config()
        },
    )
    .unwrap();
    let geometry = *pipeline.geometry();
    assert!(geometry.needs_rotation && geometry.needs_scaling);
    assert_eq!(geometry.oriented, Dimensions::new(960, 1280));
    assert_eq!(geometry.working, Dimensions::new(240, 320));
    let scale = f64::from(geometry.oriented.height) / f64::from(geometry.working.height);
    assert!((scale - 4.0).abs() < 1e-12);

    let output = pipeline.process(&Frame::from_luma(1280, 960, &data)).unwrap();
    let corners = output.corners.expect("sheet should be detected");

    // Rotated clockwise, the paper covers oriented pixels
    // [160, 799] x [200, 999], so working pixels [40, 199] x [50, 249].
    assert_corners_within(
        &corners,
        [(40.0, 50.0), (199.0, 50.0), (199.0, 249.0), (40.0, 249.0)],
        1.0,
    );

    // Scale up, then undo the clockwise rotation.
    let by_hand = corners.map(|p| Point::new(p.y * scale, 959.0 - p.x * scale));
    let frame_space = corners.to_frame_space(&geometry);
    assert_same_corners(&frame_space, &by_hand, 1.0);
    assert_corners_within(
        &frame_space,
        [(200.0, 160.0), (999.0, 160.0), (999.0, 799.0), (200.0, 799.0)],
        scale,
    );

    let overlay = output.image.into_rgba();
    assert_eq!(overlay.dimensions(), (960, 1280));
}

#[test]
fn raster_taps_come_back_at_working_size() {
    let data = sheet(480, 640, (80, 120), (400, 520));
    for stage in [
        DebugStage::Preprocessed,
        DebugStage::ContentRemoved,
        DebugStage::EdgesDetected,
    ] {
        let mut pipeline = Pipeline::new(
            480,
            640,
            PipelineConfig {
                output_stage: stage,
                max_image_height: 240,
                ..config()
            },
        )
        .unwrap();
        let output = pipeline.process(&Frame::from_luma(480, 640, &data)).unwrap();
        assert_eq!(output.stage, stage);
        assert_eq!(output.image.dimensions(), Dimensions::new(180, 240));
        assert!(output.corners.is_none());
    }
}

#[test]
fn overlay_stages_come_back_at_oriented_size() {
    let data = sheet(480, 640, (80, 120), (400, 520));
    for stage in [DebugStage::ContoursDetected, DebugStage::CornersDetected] {
        let mut pipeline = Pipeline::new(
            480,
            640,
            PipelineConfig {
                output_stage: stage,
                max_image_height: 240,
                ..config()
            },
        )
        .unwrap();
        let output = pipeline.process(&Frame::from_luma(480, 640, &data)).unwrap();
        assert!(matches!(output.image, StageImage::Rgba(_)));
        assert_eq!(output.image.dimensions(), Dimensions::new(480, 640));
        assert!(output.corners.is_some());
    }
}

#[test]
fn first_quadrilateral_wins_over_larger_blob() {
    // A large disc above a smaller sheet: the disc ranks first by area
    // but never reduces to four vertices.
    let (cx, cy, r) = (200_i64, 180_i64, 120_i64);
    let data = render(400, 600, |x, y| {
        let (dx, dy) = (i64::from(x) - cx, i64::from(y) - cy);
        let in_disc = dx * dx + dy * dy <= r * r;
        let in_sheet = (100..300).contains(&x) && (380..560).contains(&y);
        if in_disc || in_sheet { PAPER } else { BACKGROUND }
    });
    let frame = Frame::from_luma(400, 600, &data);

    let mut pipeline = Pipeline::new(400, 600, config()).unwrap();
    let corners = pipeline
        .process(&frame)
        .unwrap()
        .corners
        .expect("sheet should be detected behind the disc");
    assert_corners_near(
        &corners,
        [(100.0, 380.0), (299.0, 380.0), (299.0, 559.0), (100.0, 559.0)],
        6.0,
    );

    // Looking only at the single largest contour finds nothing.
    let mut narrow = Pipeline::new(
        400,
        600,
        PipelineConfig {
            contour_selection_count: 1,
            ..config()
        },
    )
    .unwrap();
    let output = narrow.process(&frame).unwrap();
    assert!(output.corners.is_none());
    assert!(output.contour_count > 1);
}

#[test]
fn padded_rows_and_chroma_planes_are_handled() {
    let (width, height, stride) = (120_u32, 160_u32, 128_usize);
    let tight = sheet(width, height, (20, 30), (100, 130));
    let mut padded = vec![0xAA_u8; stride * height as usize];
    for (dst, src) in padded
        .chunks_exact_mut(stride)
        .zip(tight.chunks_exact(width as usize))
    {
        dst[..width as usize].copy_from_slice(src);
    }
    let chroma = vec![0x80_u8; stride * height as usize / 2];
    let frame = Frame::new(
        width,
        height,
        vec![Plane::new(&padded, stride), Plane::new(&chroma, stride)],
    );

    let mut pipeline = Pipeline::new(
        width,
        height,
        PipelineConfig {
            output_stage: DebugStage::Preprocessed,
            ..config()
        },
    )
    .unwrap();
    let StageImage::Luma(luma) = pipeline.process(&frame).unwrap().image else {
        panic!("preprocessed is a raster tap");
    };
    assert_eq!(luma.as_raw(), &tight);
}

#[test]
fn malformed_frames_are_rejected() {
    let mut pipeline = Pipeline::new(64, 96, PipelineConfig::default()).unwrap();

    let no_planes = Frame::new(64, 96, Vec::new());
    assert!(matches!(
        pipeline.process(&no_planes),
        Err(PipelineError::InvalidFrame(_))
    ));

    let short = vec![0_u8; 64 * 95];
    assert!(matches!(
        pipeline.process(&Frame::from_luma(64, 96, &short)),
        Err(PipelineError::InvalidFrame(_))
    ));

    let other_size = vec![0_u8; 96 * 64];
    assert!(matches!(
        pipeline.process(&Frame::from_luma(96, 64, &other_size)),
        Err(PipelineError::FrameSizeMismatch { .. })
    ));

    // The pipeline is still usable afterwards.
    let good = sheet(64, 96, (10, 15), (54, 80));
    pipeline.process(&Frame::from_luma(64, 96, &good)).unwrap();
}

#[test]
fn invalid_construction_is_rejected() {
    assert!(matches!(
        Pipeline::new(0, 480, PipelineConfig::default()),
        Err(PipelineError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        Pipeline::new(
            640,
            480,
            PipelineConfig {
                canny_lower_hysteresis_threshold: 200.0,
                canny_upper_hysteresis_threshold: 100.0,
                ..PipelineConfig::default()
            }
        ),
        Err(PipelineError::InvalidConfiguration(_))
    ));
}

#[test]
fn settings_drive_the_pipeline() {
    let config = config_from_settings([
        (keys::OUTPUT_STAGE, "2"),
        (keys::MAX_IMAGE_HEIGHT, " 240 "),
        (keys::MORPH_KERNEL_SIZE, "9.0"),
        (keys::CONTOUR_COLOR, "not a color"),
    ])
    .unwrap();
    assert_eq!(config.output_stage, DebugStage::EdgesDetected);
    assert_eq!(config.contour_color, PipelineConfig::DEFAULT_CONTOUR_COLOR);

    let data = sheet(480, 640, (80, 120), (400, 520));
    let mut pipeline = Pipeline::new(480, 640, config).unwrap();
    let output = pipeline.process(&Frame::from_luma(480, 640, &data)).unwrap();
    let StageImage::Luma(edges) = output.image else {
        panic!("edges_detected is a raster tap");
    };
    assert_eq!(edges.dimensions(), (180, 240));
    assert!(edges.pixels().any(|p| p.0[0] == 255));
}

#[test]
fn repeated_frames_give_identical_results() {
    let data = sheet(320, 480, (60, 100), (260, 380));
    let frame = Frame::from_luma(320, 480, &data);
    let mut pipeline = Pipeline::new(320, 480, config()).unwrap();

    let first = pipeline.process(&frame).unwrap();
    let second = pipeline.process(&frame).unwrap();
    assert_eq!(first.corners, second.corners);
    assert_eq!(first.contour_count, second.contour_count);
    assert_eq!(
        first.image.into_rgba().as_raw(),
        second.image.into_rgba().as_raw()
    );
}
