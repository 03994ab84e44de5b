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

    devices::tda::font.rs

    Built-in ROM font for the TDA.

    256 glyphs of 8 rows each. Every row byte has the leftmost pixel in the
    most significant bit. The table is assembled once from the font8x8
    bitmaps: 0x00-0x7F basic Latin, 0x80-0x9F block elements, 0xA0-0xFF
    Latin-1 supplement.

*/

use font8x8::{UnicodeFonts, BASIC_FONTS, BLOCK_FONTS, LATIN_FONTS};
use lazy_static::lazy_static;

use super::FONT_BUFFER_SIZE;

pub const GLYPH_HEIGHT: usize = 8;

const BLOCK_ELEMENTS_BASE: u32 = 0x2580;

lazy_static! {
    pub static ref ROM_FONT: [u8; FONT_BUFFER_SIZE] = build_rom_font();
}

fn rom_glyph(code: usize) -> [u8; GLYPH_HEIGHT] {
    let bitmap = match code {
        0x00..=0x7F => char::from_u32(code as u32).and_then(|c| BASIC_FONTS.get(c)),
        0x80..=0x9F => char::from_u32(BLOCK_ELEMENTS_BASE + (code as u32 - 0x80)).and_then(|c| BLOCK_FONTS.get(c)),
        _ => char::from_u32(code as u32).and_then(|c| LATIN_FONTS.get(c)),
    };
    bitmap.unwrap_or([0; GLYPH_HEIGHT])
}

fn build_rom_font() -> [u8; FONT_BUFFER_SIZE] {
    let mut font = [0u8; FONT_BUFFER_SIZE];

    for (code, glyph) in font.chunks_exact_mut(GLYPH_HEIGHT).enumerate() {
        // font8x8 stores the leftmost pixel in bit 0
        for (dst, row) in glyph.iter_mut().zip(rom_glyph(code)) {
            *dst = row.reverse_bits();
        }
    }
    font
}
