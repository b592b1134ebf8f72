//! Image processing primitives used by the detection pipeline

pub mod draw;
pub mod filter;
pub mod hough;
pub mod hsv;

pub use hough::{hough_circles, Circle};
pub use hsv::{Hsv, HsvImage};
