//! Pixel drawing primitives
//!
//! All coordinates are signed and clipped to the image, so callers can pass
//! boxes that hang off an edge.

use image::{Rgb, RgbImage};

use super::font::{glyph, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

fn put(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(image.width()) && y < i64::from(image.height()) {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// Fill the inclusive rectangle `(left, top)..=(right, bottom)`
pub(crate) fn fill_rect(
    image: &mut RgbImage,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
    color: Rgb<u8>,
) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    let max_x = i64::from(image.width()) - 1;
    let max_y = i64::from(image.height()) - 1;
    let (left, right) = (left.max(0), right.min(max_x));
    let (top, bottom) = (top.max(0), bottom.min(max_y));

    for y in top..=bottom {
        for x in left..=right {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Outline a rectangle with lines `thickness` pixels wide, drawn inwards
pub(crate) fn stroke_rect(
    image: &mut RgbImage,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
    thickness: i64,
    color: Rgb<u8>,
) {
    let t = thickness.max(1) - 1;
    fill_rect(image, left, top, right, top + t, color);
    fill_rect(image, left, bottom - t, right, bottom, color);
    fill_rect(image, left, top, left + t, bottom, color);
    fill_rect(image, right - t, top, right, bottom, color);
}

/// Draw `text` with its top-left corner at `(x, y)`, each font pixel a
/// `scale` x `scale` block
pub(crate) fn draw_text(image: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let scale = i64::from(scale.max(1));
    let mut cursor = x;

    for ch in text.chars() {
        let rows = glyph(ch);
        for (row, pattern) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let px = cursor + i64::from(col) * scale;
                let py = y + row as i64 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        put(image, px + dx, py + dy, color);
                    }
                }
            }
        }
        cursor += i64::from(GLYPH_ADVANCE) * scale;
    }
}

/// Pixel height of a line of text at `scale`
pub(crate) fn text_height(scale: u32) -> i64 {
    i64::from(GLYPH_HEIGHT * scale.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    #[test]
    fn test_fill_rect_clips() {
        let mut image = RgbImage::new(4, 4);
        fill_rect(&mut image, -10, -10, 1, 1, RED);

        assert_eq!(*image.get_pixel(0, 0), RED);
        assert_eq!(*image.get_pixel(1, 1), RED);
        assert_eq!(*image.get_pixel(2, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_stroke_rect_leaves_interior() {
        let mut image = RgbImage::new(10, 10);
        stroke_rect(&mut image, 0, 0, 9, 9, 2, RED);

        assert_eq!(*image.get_pixel(0, 5), RED);
        assert_eq!(*image.get_pixel(1, 5), RED);
        assert_eq!(*image.get_pixel(9, 9), RED);
        assert_eq!(*image.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_text_off_canvas_is_clipped() {
        let mut image = RgbImage::new(8, 8);
        draw_text(&mut image, -100, -100, "HELLO", 2, RED);
        draw_text(&mut image, 0, 0, "I", 1, RED);

        // Top bar of the I glyph spans columns 1..=3
        assert_eq!(*image.get_pixel(1, 0), RED);
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
    }
}
