/*
    VComputer

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    devices::tda::draw.rs

    TDA rasterizer. Converts a TdaScreen into a 320x240 texture of 32-bit
    pixels.

*/

use super::{TdaScreen, TextCell, TEXT_COLUMNS, TEXT_ROWS};

pub const TEXTURE_WIDTH: usize = TEXT_COLUMNS * 8;
pub const TEXTURE_HEIGHT: usize = TEXT_ROWS * 8;
pub const TEXTURE_SIZE: usize = TEXTURE_WIDTH * TEXTURE_HEIGHT;

/// Frames per cursor blink period. The cursor is shown for the first half.
pub const CURSOR_BLINK_PERIOD: u32 = 16;

pub type TdaTexture = [u32; TEXTURE_SIZE];

/// The TDA palette, as little-endian RGBA words (red in the low byte).
pub const TDA_PALETTE: [u32; 16] = [
    u32::from_le_bytes([0x00, 0x00, 0x00, 0xFF]), // Black
    u32::from_le_bytes([0x55, 0x55, 0x55, 0xFF]), // Dark gray
    u32::from_le_bytes([0x00, 0x00, 0x80, 0xFF]), // Navy
    u32::from_le_bytes([0x55, 0x55, 0xFF, 0xFF]), // Light blue
    u32::from_le_bytes([0x00, 0x80, 0x00, 0xFF]), // Green
    u32::from_le_bytes([0x55, 0xFF, 0x55, 0xFF]), // Light green
    u32::from_le_bytes([0x00, 0x80, 0x80, 0xFF]), // Teal
    u32::from_le_bytes([0x55, 0xFF, 0xFF, 0xFF]), // Cyan
    u32::from_le_bytes([0x80, 0x00, 0x00, 0xFF]), // Maroon
    u32::from_le_bytes([0xFF, 0x55, 0x55, 0xFF]), // Light red
    u32::from_le_bytes([0x80, 0x00, 0x80, 0xFF]), // Purple
    u32::from_le_bytes([0xFF, 0x55, 0xFF, 0xFF]), // Pink
    u32::from_le_bytes([0x80, 0x80, 0x00, 0xFF]), // Olive
    u32::from_le_bytes([0xFF, 0xFF, 0x55, 0xFF]), // Yellow
    u32::from_le_bytes([0xAA, 0xAA, 0xAA, 0xFF]), // Light gray
    u32::from_le_bytes([0xFF, 0xFF, 0xFF, 0xFF]), // White
];

/// Allocate a zeroed texture on the heap.
pub fn new_texture() -> Box<TdaTexture> {
    Box::new([0; TEXTURE_SIZE])
}

/// Draw the screen into `texture` with RGBA byte order.
///
/// `frames` is the cursor blink counter. It is owned by the caller so that independent
/// displays blink independently, and is advanced once per call while the cursor is enabled.
pub fn tda_to_rgba_texture(screen: &TdaScreen, texture: &mut TdaTexture, frames: &mut u32) {
    let font = screen.font.glyph_table();

    for row in 0..TEXT_ROWS {
        for col in 0..TEXT_COLUMNS {
            draw_glyph(texture, font, screen.cell(row, col), row, col);
        }
    }

    let cursor = &screen.cursor;
    if cursor.enabled {
        if *frames % CURSOR_BLINK_PERIOD < CURSOR_BLINK_PERIOD / 2 {
            draw_cursor(screen, texture);
        }
        *frames = frames.wrapping_add(1);
    }
}

/// Draw the screen into `texture` with BGRA byte order.
pub fn tda_to_bgra_texture(screen: &TdaScreen, texture: &mut TdaTexture, frames: &mut u32) {
    tda_to_rgba_texture(screen, texture, frames);
    swap_red_blue(texture);
}

/// Exchange byte lanes 0 and 2 of every pixel.
pub fn swap_red_blue(texture: &mut [u32]) {
    for pixel in texture.iter_mut() {
        let g_a = *pixel & 0xFF00_FF00;
        let red = *pixel & 0x0000_00FF;
        let blue = *pixel & 0x00FF_0000;
        *pixel = g_a | (red << 16) | (blue >> 16);
    }
}

#[inline]
fn draw_glyph(texture: &mut TdaTexture, font: &[u8], cell: TextCell, row: usize, col: usize) {
    let fg = TDA_PALETTE[cell.fg() as usize];
    let bg = TDA_PALETTE[cell.bg() as usize];
    let glyph = cell.glyph() as usize * 8;

    for y in 0..8 {
        let pixels = font[glyph + y];
        let line = TEXTURE_WIDTH * (y + row * 8) + col * 8;
        for (x, dst) in texture[line..line + 8].iter_mut().enumerate() {
            *dst = if pixels & (0x80 >> x) != 0 { fg } else { bg };
        }
    }
}

fn draw_cursor(screen: &TdaScreen, texture: &mut TdaTexture) {
    let cursor = &screen.cursor;
    let (row, col) = (cursor.row as usize, cursor.col as usize);
    if cursor.start > cursor.end || row >= TEXT_ROWS || col >= TEXT_COLUMNS {
        return;
    }

    let color = TDA_PALETTE[(cursor.color & 0x0F) as usize];
    for y in cursor.start as usize..=(cursor.end as usize).min(7) {
        let line = TEXTURE_WIDTH * (y + row * 8) + col * 8;
        texture[line..line + 8].fill(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::tda::{font::ROM_FONT, CursorState, FontSource, FONT_BUFFER_SIZE};

    const BLACK: u32 = TDA_PALETTE[0];
    const YELLOW: u32 = TDA_PALETTE[13];
    const WHITE: u32 = TDA_PALETTE[15];

    fn pixel(texture: &TdaTexture, x: usize, y: usize) -> u32 {
        texture[x + y * TEXTURE_WIDTH]
    }

    fn letter_a_screen() -> TdaScreen {
        let mut screen = TdaScreen::default();
        screen.txt_buffer[0] = 0x0F41;
        screen.cursor = CursorState {
            enabled: true,
            blink: true,
            row: 0,
            col: 0,
            start: 6,
            end: 7,
            color: 13,
        };
        screen
    }

    #[test]
    fn palette_is_rgba_little_endian() {
        assert_eq!(TDA_PALETTE[0], 0xFF00_0000);
        assert_eq!(TDA_PALETTE[2], 0xFF80_0000);
        assert_eq!(TDA_PALETTE[9], 0xFF55_55FF);
        assert_eq!(TDA_PALETTE[15], 0xFFFF_FFFF);
    }

    #[test]
    fn glyph_pixels_follow_rom_font() {
        let screen = letter_a_screen();
        let mut texture = new_texture();
        let mut frames = 8; // Cursor hidden

        tda_to_rgba_texture(&screen, &mut texture, &mut frames);
        assert_eq!(frames, 9);

        for y in 0..8 {
            let bits = ROM_FONT[0x41 * 8 + y];
            for x in 0..8 {
                let expected = if bits & (0x80 >> x) != 0 { WHITE } else { BLACK };
                assert_eq!(pixel(&texture, x, y), expected, "pixel {},{}", x, y);
            }
        }
        // The rest of the screen is cell 0x0000: black on black
        assert!(texture[8..TEXTURE_WIDTH].iter().all(|&p| p == BLACK));
        assert!(texture[TEXTURE_WIDTH * 8..].iter().all(|&p| p == BLACK));
    }

    #[test]
    fn cursor_blinks_every_sixteen_frames() {
        let screen = letter_a_screen();
        let mut texture = new_texture();
        let mut frames = 0;

        for call in 0..32u32 {
            tda_to_rgba_texture(&screen, &mut texture, &mut frames);
            let shown = call % 16 < 8;
            for y in 6..8 {
                for x in 0..8 {
                    let p = pixel(&texture, x, y);
                    if shown {
                        assert_eq!(p, YELLOW, "call {} pixel {},{}", call, x, y);
                    }
                }
            }
            if !shown {
                let row6 = ROM_FONT[0x41 * 8 + 6];
                let expected = if row6 & 0x80 != 0 { WHITE } else { BLACK };
                assert_eq!(pixel(&texture, 0, 6), expected, "call {}", call);
            }
            // Rows above the cursor keep the glyph
            let row0 = ROM_FONT[0x41 * 8];
            let expected = if row0 & 0x80 != 0 { WHITE } else { BLACK };
            assert_eq!(pixel(&texture, 0, 0), expected);
        }
        assert_eq!(frames, 32);
    }

    #[test]
    fn every_cell_draws_its_glyph() {
        let mut screen = letter_a_screen();
        screen.txt_buffer.fill(0x0F41);
        let mut texture = new_texture();
        let mut frames = 0;

        for call in 0..16u32 {
            tda_to_rgba_texture(&screen, &mut texture, &mut frames);
            let shown = call < 8;

            for y in 0..TEXTURE_HEIGHT {
                let bits = ROM_FONT[0x41 * 8 + y % 8];
                for x in 0..TEXTURE_WIDTH {
                    let in_cursor = x < 8 && (6..8).contains(&y);
                    let expected = if shown && in_cursor {
                        YELLOW
                    }
                    else if bits & (0x80 >> (x % 8)) != 0 {
                        WHITE
                    }
                    else {
                        BLACK
                    };
                    assert_eq!(pixel(&texture, x, y), expected, "call {} pixel {},{}", call, x, y);
                }
            }
        }
        assert_eq!(frames, 16);
    }

    #[test]
    fn disabled_cursor_leaves_counter_alone() {
        let mut screen = letter_a_screen();
        screen.cursor.enabled = false;
        let mut texture = new_texture();
        let mut frames = 3;

        tda_to_rgba_texture(&screen, &mut texture, &mut frames);
        assert_eq!(frames, 3);
        assert_ne!(pixel(&texture, 1, 6), YELLOW);
    }

    #[test]
    fn invalid_cursor_is_not_drawn() {
        let mut screen = TdaScreen::default();
        screen.cursor = CursorState {
            enabled: true,
            start: 5,
            end: 2,
            color: 15,
            ..Default::default()
        };
        let mut texture = new_texture();
        let mut frames = 0;
        tda_to_rgba_texture(&screen, &mut texture, &mut frames);
        assert!(texture.iter().all(|&p| p == BLACK));
        assert_eq!(frames, 1);

        screen.cursor.start = 0;
        screen.cursor.row = 30;
        frames = 0;
        tda_to_rgba_texture(&screen, &mut texture, &mut frames);
        assert!(texture.iter().all(|&p| p == BLACK));

        screen.cursor.row = 29;
        screen.cursor.col = 39;
        frames = 0;
        tda_to_rgba_texture(&screen, &mut texture, &mut frames);
        assert_eq!(pixel(&texture, 319, 239 - 5), WHITE);
        assert_eq!(pixel(&texture, 319, 239), BLACK);
    }

    #[test]
    fn user_font_replaces_rom_font() {
        let mut table = [0u8; FONT_BUFFER_SIZE];
        table[0x41 * 8..0x41 * 8 + 8].copy_from_slice(&[0xF0; 8]);
        let mut screen = letter_a_screen();
        screen.cursor.enabled = false;
        screen.font = FontSource::User(table);

        let mut texture = new_texture();
        tda_to_rgba_texture(&screen, &mut texture, &mut 0);
        for y in 0..8 {
            assert_eq!(pixel(&texture, 3, y), WHITE);
            assert_eq!(pixel(&texture, 4, y), BLACK);
        }
    }

    #[test]
    fn output_is_deterministic() {
        let mut screen = letter_a_screen();
        for (i, cell) in screen.txt_buffer.iter_mut().enumerate() {
            *cell = (i as u16).wrapping_mul(0x9E37);
        }

        let mut first = new_texture();
        let mut second = new_texture();
        second.fill(0xDEAD_BEEF);
        let (mut f1, mut f2) = (5, 5);
        tda_to_rgba_texture(&screen, &mut first, &mut f1);
        tda_to_rgba_texture(&screen, &mut second, &mut f2);
        assert!(first[..] == second[..]);
        assert_eq!(f1, f2);
    }

    #[test]
    fn bgra_swaps_red_and_blue() {
        let mut screen = letter_a_screen();
        for (i, cell) in screen.txt_buffer.iter_mut().enumerate() {
            *cell = (i as u16).wrapping_mul(0x3B1D);
        }

        let mut rgba = new_texture();
        let mut bgra = new_texture();
        let (mut f1, mut f2) = (0, 0);
        tda_to_rgba_texture(&screen, &mut rgba, &mut f1);
        tda_to_bgra_texture(&screen, &mut bgra, &mut f2);

        for (c, b) in rgba.iter().zip(bgra.iter()) {
            let [r, g, bl, a] = c.to_le_bytes();
            assert_eq!(b.to_le_bytes(), [bl, g, r, a]);
        }
        assert_eq!(f1, f2);
    }
}
