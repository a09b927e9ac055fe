use image::{Rgb, RgbImage};

use crate::draw::put_clipped;

const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;
const ADVANCE: u32 = GLYPH_W + 1;

// Rows top to bottom; bit 2 is the leftmost column.
fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        'm' => [0b000, 0b110, 0b111, 0b101, 0b101],
        'p' => [0b000, 0b110, 0b101, 0b110, 0b100],
        'x' => [0b000, 0b101, 0b010, 0b010, 0b101],
        'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        _ => [0; 5],
    }
}

/// Pixel extent of `text` at `scale`.
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    ((n * ADVANCE - 1) * scale, GLYPH_H * scale)
}

/// Draws `text` with its top-left corner at `(x, y)` using the built-in
/// 3x5 font. Characters outside the font render as blanks.
pub fn draw_text(img: &mut RgbImage, x: i32, y: i32, text: &str, scale: u32, color: Rgb<u8>) {
    let s = scale.max(1) as i32;

    for (i, c) in text.chars().enumerate() {
        let gx = x + i as i32 * ADVANCE as i32 * s;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                let px = gx + col as i32 * s;
                let py = y + row as i32 * s;
                for dy in 0..s {
                    for dx in 0..s {
                        put_clipped(img, px + dx, py + dy, color);
                    }
                }
            }
        }
    }
}
