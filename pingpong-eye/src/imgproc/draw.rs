//! Raster helpers: disc masks, circle outlines and a small bitmap font

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Filled disc mask with the same dimensions as the frame
pub fn disc_mask(width: u32, height: u32, cx: i32, cy: i32, radius: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for_each_in_disc(width, height, cx, cy, radius, |x, y| {
        mask.put_pixel(x, y, Luma([255]));
    });
    mask
}

pub fn fill_disc(image: &mut RgbImage, cx: i32, cy: i32, radius: u32, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    for_each_in_disc(width, height, cx, cy, radius, |x, y| {
        image.put_pixel(x, y, color);
    });
}

fn for_each_in_disc(
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    radius: u32,
    mut f: impl FnMut(u32, u32),
) {
    let r = radius as i32;
    let r2 = r * r;
    let top = (cy - r).max(0);
    let bottom = (cy + r).min(height as i32 - 1);
    let left = (cx - r).max(0);
    let right = (cx + r).min(width as i32 - 1);
    for y in top..=bottom {
        for x in left..=right {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r2 {
                f(x as u32, y as u32);
            }
        }
    }
}

/// Circle outline of the given thickness, centred on `radius`
pub fn draw_circle(image: &mut RgbImage, cx: i32, cy: i32, radius: u32, thickness: u32, color: Rgb<u8>) {
    let half = thickness as f32 / 2.0;
    let inner = (radius as f32 - half).max(0.0);
    let outer = radius as f32 + half;
    let (inner2, outer2) = (inner * inner, outer * outer);
    let reach = outer.ceil() as i32;

    let width = image.width() as i32;
    let height = image.height() as i32;
    for y in (cy - reach).max(0)..=(cy + reach).min(height - 1) {
        for x in (cx - reach).max(0)..=(cx + reach).min(width - 1) {
            let (dx, dy) = ((x - cx) as f32, (y - cy) as f32);
            let d2 = dx * dx + dy * dy;
            if d2 >= inner2 && d2 < outer2 {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Draw `text` in a 5x7 bitmap font, upper-cased, each dot `scale` pixels
/// wide. `(x, y)` is the top-left corner. Characters without a glyph leave
/// a gap.
pub fn draw_label(image: &mut RgbImage, x: i32, y: i32, text: &str, scale: u32, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let scale = scale.max(1) as i32;
    let mut pen_x = x;

    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 0 {
                        continue;
                    }
                    for sy in 0..scale {
                        for sx in 0..scale {
                            let px = pen_x + col * scale + sx;
                            let py = y + row as i32 * scale + sy;
                            if px >= 0 && px < width && py >= 0 && py < height {
                                image.put_pixel(px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
        }
        pen_x += 6 * scale;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    let bits = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(bits)
}
