//! Detection on OpenCV's imgproc: blur, grayscale, `hough_circles`, then
//! `in_range` masks intersected with each circle for the color name.

use crate::color::{ColorRange, ColorTable, UNKNOWN_COLOR};
use crate::detection::{BallDetection, DetectionOutcome, OUTLINE_THICKNESS};
use crate::error::VisionError;
use crate::params::DetectionParameters;
use image::RgbImage;
use opencv::{
    core::{self, Mat, Point, Scalar, Size, Vec3f, Vector, BORDER_DEFAULT, CV_8UC1},
    imgproc,
    prelude::*,
};

const LABEL_FONT_SCALE: f64 = 0.9;
const LABEL_THICKNESS: i32 = 2;

fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

pub(crate) fn detect(
    image: &RgbImage,
    params: &DetectionParameters,
    colors: &ColorTable,
    blur_sigma: f32,
) -> Result<DetectionOutcome, VisionError> {
    let mut bgr = rgb_to_bgr(image)?;
    let mut hsv = Mat::default();
    imgproc::cvt_color(&bgr, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;

    let circles = find_circles(&bgr, params, blur_sigma)?;
    let mut balls = Vec::with_capacity(circles.len());

    for circle in circles.iter() {
        let x = circle[0].round().max(0.0) as u32;
        let y = circle[1].round().max(0.0) as u32;
        let radius = circle[2].round().max(0.0) as u32;

        let color = classify(&hsv, colors, x, y, radius)?;
        annotate(&mut bgr, x as i32, y as i32, radius as i32, &color)?;
        balls.push(BallDetection { x, y, color, radius });
    }

    Ok(DetectionOutcome {
        balls,
        annotated: bgr_to_rgb(&bgr)?,
    })
}

fn find_circles(bgr: &Mat, params: &DetectionParameters, blur_sigma: f32) -> Result<Vector<Vec3f>, VisionError> {
    let mut circles = Vector::<Vec3f>::new();
    // OpenCV reads max_radius <= 0 as "unbounded"; here it means nothing to find
    if params.max_radius <= 0 || params.min_radius > params.max_radius {
        return Ok(circles);
    }

    let blurred = if blur_sigma > 0.0 {
        let mut blurred = Mat::default();
        let sigma = blur_sigma as f64;
        imgproc::gaussian_blur(bgr, &mut blurred, Size::new(0, 0), sigma, sigma, BORDER_DEFAULT)?;
        blurred
    } else {
        bgr.try_clone()?
    };

    let mut gray = Mat::default();
    imgproc::cvt_color(&blurred, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

    imgproc::hough_circles(
        &gray,
        &mut circles,
        imgproc::HOUGH_GRADIENT,
        params.dp,
        params.min_distance,
        params.edge_threshold,
        params.accumulator_threshold,
        params.min_radius,
        params.max_radius,
    )?;
    Ok(circles)
}

fn bounds(range: &ColorRange) -> (Scalar, Scalar) {
    let (lo, hi) = (&range.lower, &range.upper);
    (
        Scalar::new(lo.h as f64, lo.s as f64, lo.v as f64, 0.0),
        Scalar::new(hi.h as f64, hi.s as f64, hi.v as f64, 0.0),
    )
}

/// First range with any pixel inside the disc wins.
fn classify(hsv: &Mat, colors: &ColorTable, x: u32, y: u32, radius: u32) -> Result<String, VisionError> {
    let mut disc = Mat::zeros(hsv.rows(), hsv.cols(), CV_8UC1)?.to_mat()?;
    imgproc::circle(
        &mut disc,
        Point::new(x as i32, y as i32),
        radius as i32,
        Scalar::all(255.0),
        imgproc::FILLED,
        imgproc::LINE_8,
        0,
    )?;

    let mut in_color = Mat::default();
    let mut overlap = Mat::default();
    for range in colors.ranges() {
        let (lower, upper) = bounds(range);
        core::in_range(hsv, &lower, &upper, &mut in_color)?;
        core::bitwise_and(&in_color, &disc, &mut overlap, &core::no_array())?;
        if core::count_non_zero(&overlap)? > 0 {
            return Ok(range.name.clone());
        }
    }
    Ok(UNKNOWN_COLOR.to_string())
}

fn annotate(bgr: &mut Mat, x: i32, y: i32, radius: i32, label: &str) -> Result<(), VisionError> {
    imgproc::circle(
        bgr,
        Point::new(x, y),
        radius,
        green(),
        OUTLINE_THICKNESS as i32,
        imgproc::LINE_8,
        0,
    )?;
    imgproc::put_text(
        bgr,
        label,
        Point::new(x - radius, y - radius - 10),
        imgproc::FONT_HERSHEY_SIMPLEX,
        LABEL_FONT_SCALE,
        green(),
        LABEL_THICKNESS,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

fn rgb_to_bgr(image: &RgbImage) -> Result<Mat, VisionError> {
    let flat = Mat::from_slice(image.as_raw().as_slice())?;
    let rgb = flat.reshape(3, image.height() as i32)?.try_clone()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn bgr_to_rgb(bgr: &Mat) -> Result<RgbImage, VisionError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };
    RgbImage::from_raw(width, height, rgb.data_bytes()?.to_vec())
        .ok_or_else(|| VisionError::Processing("Annotated frame size mismatch".to_string()))
}
