//! Circle detection with the Hough gradient method.
//!
//! Edge pixels come from a Canny pass over Sobel gradients. Each edge pixel
//! votes along its gradient, in both directions, for every radius in the
//! configured range. Accumulator peaks become centre candidates. Each candidate
//! gets a radius from the edge distances that support it best.

use crate::params::DetectionParameters;
use image::GrayImage;
use serde::Serialize;
use std::collections::VecDeque;

/// tan(22.5°) and tan(67.5°), the sector boundaries for non-maximum suppression
const TAN_22_5: f32 = 0.414_213_56;
const TAN_67_5: f32 = 2.414_213_6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Accumulator votes at the centre
    pub votes: u32,
}

/// Sobel responses for one image, row-major
#[derive(Debug, Clone)]
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub dx: Vec<i32>,
    pub dy: Vec<i32>,
}

impl Gradients {
    fn at(&self, x: usize, y: usize) -> (i32, i32) {
        let i = y * self.width + x;
        (self.dx[i], self.dy[i])
    }
}

/// 3x3 Sobel with replicated borders
pub fn sobel(image: &GrayImage) -> Gradients {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let raw = image.as_raw();
    let px = |x: isize, y: isize| -> i32 {
        let x = x.clamp(0, width as isize - 1) as usize;
        let y = y.clamp(0, height as isize - 1) as usize;
        raw[y * width + x] as i32
    };

    let mut dx = vec![0i32; width * height];
    let mut dy = vec![0i32; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let gx = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));
            let i = y as usize * width + x as usize;
            dx[i] = gx;
            dy[i] = gy;
        }
    }

    Gradients {
        width,
        height,
        dx,
        dy,
    }
}

/// Canny edge map over precomputed gradients, L1 magnitude.
///
/// Returns the edge pixels as `(x, y)` in row-major order.
pub fn canny(gradients: &Gradients, low: f32, high: f32) -> Vec<(usize, usize)> {
    let (width, height) = (gradients.width, gradients.height);
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let magnitude: Vec<f32> = gradients
        .dx
        .iter()
        .zip(&gradients.dy)
        .map(|(gx, gy)| (gx.abs() + gy.abs()) as f32)
        .collect();
    let mag = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
            0.0
        } else {
            magnitude[y as usize * width + x as usize]
        }
    };

    // 0: suppressed, 1: weak candidate, 2: strong edge
    let mut class = vec![0u8; width * height];
    let mut queue = VecDeque::new();

    for y in 0..height {
        for x in 0..width {
            let m = magnitude[y * width + x];
            if m <= low {
                continue;
            }
            let (gx, gy) = gradients.at(x, y);
            let ax = gx.abs() as f32;
            let ay = gy.abs() as f32;
            let (xi, yi) = (x as isize, y as isize);

            let is_max = if ay < ax * TAN_22_5 {
                m > mag(xi - 1, yi) && m >= mag(xi + 1, yi)
            } else if ay > ax * TAN_67_5 {
                m > mag(xi, yi - 1) && m >= mag(xi, yi + 1)
            } else {
                let s: isize = if (gx < 0) != (gy < 0) { -1 } else { 1 };
                m > mag(xi - s, yi - 1) && m > mag(xi + s, yi + 1)
            };

            if !is_max {
                continue;
            }
            if m > high {
                class[y * width + x] = 2;
                queue.push_back((x, y));
            } else {
                class[y * width + x] = 1;
            }
        }
    }

    // Hysteresis: promote weak candidates 8-connected to a strong edge
    while let Some((x, y)) = queue.pop_front() {
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                let i = ny * width + nx;
                if class[i] == 1 {
                    class[i] = 2;
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    let mut edges = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if class[y * width + x] == 2 {
                edges.push((x, y));
            }
        }
    }
    edges
}

/// Detect circles in an intensity image.
///
/// Results are ordered by accumulator votes, highest first; ties keep
/// row-major accumulator order. An empty or inverted radius range yields no
/// circles.
pub fn hough_circles(image: &GrayImage, params: &DetectionParameters) -> Vec<Circle> {
    if params.max_radius <= 0 || params.min_radius > params.max_radius {
        return Vec::new();
    }
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }

    let gradients = sobel(image);
    let high = params.edge_threshold as f32;
    let edges = canny(&gradients, high / 2.0, high);
    if edges.is_empty() {
        return Vec::new();
    }

    let dp = params.dp.max(1.0) as f32;
    let inv_dp = 1.0 / dp;
    let min_r = params.min_radius.max(0) as u32;
    let max_r = params.max_radius as u32;
    let threshold = params.accumulator_threshold as f32;
    // Edge pixels sit at fractional distances from the centre; vote and
    // count support half a bin either side of the requested radii
    let slack = 0.5 * dp;
    let vote_min = min_r.saturating_sub(1);
    let vote_max = max_r + 1;

    let acols = ((gradients.width as f32 * inv_dp).round() as usize).max(1);
    let arows = ((gradients.height as f32 * inv_dp).round() as usize).max(1);
    // One cell of padding on every side keeps the peak test branch-free
    let stride = acols + 2;
    let mut accumulator = vec![0u32; stride * (arows + 2)];

    for &(x, y) in &edges {
        let (gx, gy) = gradients.at(x, y);
        let (vx, vy) = (gx as f32, gy as f32);
        let norm = (vx * vx + vy * vy).sqrt();
        if norm < 1.0 {
            continue;
        }
        let sx = vx * inv_dp / norm;
        let sy = vy * inv_dp / norm;
        let x0 = x as f32 * inv_dp;
        let y0 = y as f32 * inv_dp;

        for sign in [1.0f32, -1.0] {
            for r in vote_min..=vote_max {
                let cx = (x0 + sign * sx * r as f32).round();
                let cy = (y0 + sign * sy * r as f32).round();
                if cx < 0.0 || cy < 0.0 || cx >= acols as f32 || cy >= arows as f32 {
                    break;
                }
                accumulator[(cy as usize + 1) * stride + cx as usize + 1] += 1;
            }
        }
    }

    let mut centres = Vec::new();
    for y in 1..=arows {
        for x in 1..=acols {
            let i = y * stride + x;
            let v = accumulator[i];
            if v as f32 > threshold
                && v > accumulator[i - 1]
                && v >= accumulator[i + 1]
                && v > accumulator[i - stride]
                && v >= accumulator[i + stride]
            {
                centres.push((i, x - 1, y - 1, v));
            }
        }
    }
    centres.sort_by(|a, b| b.3.cmp(&a.3).then(a.0.cmp(&b.0)));

    let min_dist_sq = (params.min_distance * params.min_distance) as f32;
    let lo = (min_r as f32 - slack).max(0.0);
    let hi = max_r as f32 + slack;
    let (min_r_sq, max_r_sq) = (lo * lo, hi * hi);
    let mut circles: Vec<Circle> = Vec::new();
    let mut distances = Vec::with_capacity(edges.len());

    for (_, ax, ay, votes) in centres {
        let cx = ax as f32 * dp;
        let cy = ay as f32 * dp;

        let too_close = circles.iter().any(|c| {
            let (ddx, ddy) = (c.x - cx, c.y - cy);
            ddx * ddx + ddy * ddy < min_dist_sq
        });
        if too_close {
            continue;
        }

        distances.clear();
        for &(x, y) in &edges {
            let (ddx, ddy) = (x as f32 - cx, y as f32 - cy);
            let d2 = ddx * ddx + ddy * ddy;
            if d2 >= min_r_sq && d2 <= max_r_sq {
                distances.push(d2.sqrt());
            }
        }
        if distances.is_empty() {
            continue;
        }
        distances.sort_by(|a, b| a.total_cmp(b));

        if let Some((radius, support)) = best_radius(&distances, dp) {
            if support as f32 > threshold {
                circles.push(Circle {
                    x: cx,
                    y: cy,
                    radius,
                    votes,
                });
            }
        }
    }

    circles
}

/// Pick the distance group with the highest support per unit radius.
///
/// `sorted` must be ascending. A group collects consecutive distances that
/// lie within `bin_width` of its first member; its radius is the median.
fn best_radius(sorted: &[f32], bin_width: f32) -> Option<(f32, usize)> {
    let mut best: Option<(f32, usize)> = None;
    let mut start = 0;

    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end] - sorted[start] <= bin_width {
            end += 1;
        }
        let count = end - start;
        let radius = sorted[start + (count - 1) / 2];

        let better = match best {
            None => true,
            Some((best_r, best_count)) => count as f32 * best_r > best_count as f32 * radius,
        };
        if better && radius > 0.0 {
            best = Some((radius, count));
        }
        start = end;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Bright discs on a dark background, softened like a camera frame
    fn discs(width: u32, height: u32, centres: &[(i32, i32)], r: i32) -> GrayImage {
        let hard = GrayImage::from_fn(width, height, |x, y| {
            let inside = centres.iter().any(|&(cx, cy)| {
                let (dx, dy) = (x as i32 - cx, y as i32 - cy);
                dx * dx + dy * dy <= r * r
            });
            if inside {
                Luma([200])
            } else {
                Luma([10])
            }
        });
        image::imageops::blur(&hard, 2.0)
    }

    fn params() -> DetectionParameters {
        DetectionParameters {
            dp: 1.0,
            ..DetectionParameters::default()
        }
    }

    #[test]
    fn test_sobel_on_vertical_step() {
        let image = GrayImage::from_fn(6, 3, |x, _| if x < 3 { Luma([0]) } else { Luma([10]) });
        let g = sobel(&image);
        assert_eq!(g.at(2, 1), (40, 0));
        assert_eq!(g.at(0, 1), (0, 0));
    }

    #[test]
    fn test_canny_flat_image_has_no_edges() {
        let image = GrayImage::from_pixel(32, 32, Luma([128]));
        assert!(canny(&sobel(&image), 50.0, 100.0).is_empty());
    }

    #[test]
    fn test_canny_thin_edge_on_step() {
        let image = GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([0]) } else { Luma([200]) });
        let edges = canny(&sobel(&image), 50.0, 100.0);
        assert!(!edges.is_empty());
        // One edge pixel per row after suppression
        for y in 0..10 {
            assert_eq!(edges.iter().filter(|(_, ey)| *ey == y).count(), 1);
        }
    }

    #[test]
    fn test_single_disc_found() {
        let image = discs(160, 120, &[(70, 60)], 22);
        let circles = hough_circles(&image, &params());
        assert_eq!(circles.len(), 1);
        let c = circles[0];
        assert!((c.x - 70.0).abs() <= 2.0, "x = {}", c.x);
        assert!((c.y - 60.0).abs() <= 2.0, "y = {}", c.y);
        assert!((c.radius - 22.0).abs() <= 2.0, "r = {}", c.radius);
    }

    #[test]
    fn test_single_radius_range_still_finds_disc() {
        let image = discs(160, 120, &[(80, 60)], 20);
        for dp in [1.0, 1.2] {
            let exact = DetectionParameters {
                min_radius: 20,
                max_radius: 20,
                dp,
                ..DetectionParameters::default()
            };
            let circles = hough_circles(&image, &exact);
            assert_eq!(circles.len(), 1, "dp = {}: {:?}", dp, circles);
            assert!((circles[0].radius - 20.0).abs() <= 1.0, "r = {}", circles[0].radius);
        }
    }

    #[test]
    fn test_centre_has_no_half_cell_offset() {
        let image = discs(160, 120, &[(70, 60)], 22);
        let circles = hough_circles(&image, &params());
        assert_eq!(circles.len(), 1);
        // Integer centre at dp = 1 must come back on the same pixel
        assert!((circles[0].x - 70.0).abs() < 1.0, "x = {}", circles[0].x);
        assert!((circles[0].y - 60.0).abs() < 1.0, "y = {}", circles[0].y);
    }

    #[test]
    fn test_empty_image_has_no_circles() {
        let image = GrayImage::from_pixel(100, 100, Luma([0]));
        assert!(hough_circles(&image, &params()).is_empty());
    }

    #[test]
    fn test_inverted_radius_range_has_no_circles() {
        let image = discs(160, 120, &[(70, 60)], 22);
        let inverted = DetectionParameters {
            min_radius: 30,
            max_radius: 15,
            ..params()
        };
        assert!(hough_circles(&image, &inverted).is_empty());

        let degenerate = DetectionParameters {
            min_radius: 0,
            max_radius: 0,
            ..params()
        };
        assert!(hough_circles(&image, &degenerate).is_empty());
    }

    #[test]
    fn test_min_distance_separates_discs() {
        let image = discs(240, 120, &[(60, 60), (170, 60)], 20);
        let circles = hough_circles(&image, &params());
        assert_eq!(circles.len(), 2);
        let mut xs: Vec<f32> = circles.iter().map(|c| c.x).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        assert!((xs[0] - 60.0).abs() <= 2.0);
        assert!((xs[1] - 170.0).abs() <= 2.0);
        assert!(circles[0].votes >= circles[1].votes);
    }

    #[test]
    fn test_best_radius_prefers_dense_group() {
        let sorted = [10.0, 20.0, 20.2, 20.4, 20.6, 29.0];
        let (radius, support) = best_radius(&sorted, 1.0).unwrap();
        assert_eq!(support, 4);
        assert!((radius - 20.2).abs() < 1e-4);
        assert!(best_radius(&[], 1.0).is_none());
    }
}
