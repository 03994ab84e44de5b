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

    benches::tda_bench.rs

    Benchmarks for the TDA rasterizer.

*/

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vcomputer_core::{
    devices::tda::{new_texture, tda_to_bgra_texture, tda_to_rgba_texture, CursorState},
    TdaScreen,
};

fn busy_screen() -> TdaScreen {
    let mut screen = TdaScreen::default();
    for (i, cell) in screen.txt_buffer.iter_mut().enumerate() {
        let glyph = 0x20 + (i % 0x5F) as u16;
        let attr = (i as u16 * 7) & 0xFF;
        *cell = (attr << 8) | glyph;
    }
    screen.cursor = CursorState {
        enabled: true,
        blink: false,
        row: 10,
        col: 20,
        start: 0,
        end: 7,
        color: 15,
    };
    screen
}

pub fn tda_draw_bench(c: &mut Criterion) {
    let screen = busy_screen();

    c.bench_function("tda_bench_rgba_frame", |b| {
        let mut texture = new_texture();
        let mut frames = 0;

        b.iter(|| {
            tda_to_rgba_texture(black_box(&screen), &mut texture, &mut frames);
        });
    });

    c.bench_function("tda_bench_bgra_frame", |b| {
        let mut texture = new_texture();
        let mut frames = 0;

        b.iter(|| {
            tda_to_bgra_texture(black_box(&screen), &mut texture, &mut frames);
        });
    });
}

criterion_group!(benches, tda_draw_bench);
criterion_main!(benches);
