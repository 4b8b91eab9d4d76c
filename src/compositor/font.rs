use crate::compositor::raster::{Paint, RectF, RgbaBuffer, Rgba, Shape};
use crate::geometry::Point;

const GLYPH_COLUMNS: usize = 3;
const GLYPH_ROWS: usize = 5;

/// Rows top to bottom; bit 2 is the left column.
fn glyph(c: char) -> Option<[u8; GLYPH_ROWS]> {
    let rows = match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b010, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        ' ' => [0; GLYPH_ROWS],
        _ => return None,
    };
    Some(rows)
}

fn cell_size(pixel_height: f32) -> f32 {
    (pixel_height / GLYPH_ROWS as f32).max(1.0)
}

/// Size of `text` when drawn with `pixel_height` tall glyphs.
pub fn measure_text(text: &str, pixel_height: f32) -> (f32, f32) {
    let cell = cell_size(pixel_height);
    let count = text.chars().count();
    if count == 0 {
        return (0.0, cell * GLYPH_ROWS as f32);
    }
    let advance = cell * (GLYPH_COLUMNS as f32 + 1.0);
    (
        advance * count as f32 - cell,
        cell * GLYPH_ROWS as f32,
    )
}

/// Draws `text` with its top-left corner at `origin`. Unknown characters render as a box.
pub fn draw_text(target: &mut RgbaBuffer, origin: Point, text: &str, pixel_height: f32, color: Rgba) {
    let cell = cell_size(pixel_height);
    let advance = cell * (GLYPH_COLUMNS as f32 + 1.0);
    let paint = Paint::Solid(color);
    for (index, c) in text.chars().enumerate() {
        let left = origin.x + advance * index as f32;
        let rows = glyph(c).unwrap_or([0b111, 0b101, 0b101, 0b101, 0b111]);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_COLUMNS {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                let cell_rect = RectF::new(
                    left + col as f32 * cell,
                    origin.y + row as f32 * cell,
                    cell,
                    cell,
                );
                target.fill_shape(&Shape::Rect(cell_rect), &paint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_scales_with_height() {
        assert_eq!(measure_text("1.5X", 10.0), (30.0, 10.0));
        assert_eq!(measure_text("", 10.0).0, 0.0);
    }

    #[test]
    fn lowercase_maps_to_uppercase_glyphs() {
        assert_eq!(glyph('x'), glyph('X'));
        assert!(glyph('~').is_none());
    }

    #[test]
    fn draws_top_left_cell_of_seven() {
        let mut buf = RgbaBuffer::new(20, 20, Rgba::TRANSPARENT);
        draw_text(&mut buf, Point::ZERO, "7", 10.0, Rgba::WHITE);
        assert_eq!(buf.pixel(0, 0), Rgba::WHITE);
        assert_eq!(buf.pixel(0, 9).a, 0);
    }
}
