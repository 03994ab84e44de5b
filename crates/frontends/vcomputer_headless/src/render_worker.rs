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

    vcomputer_headless::render_worker.rs

    Rasterizes TDA screens on a separate thread. Screens are sent over a
    bounded channel; the worker owns the texture and the cursor blink
    counter, and hands the last frame back when the channel is closed.

*/

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use vcomputer_config::ChannelOrder;
use vcomputer_core::{
    devices::tda::{new_texture, swap_red_blue, tda_to_bgra_texture, tda_to_rgba_texture, TdaTexture, TEXTURE_HEIGHT, TEXTURE_WIDTH},
    TdaScreen,
};

/// Screens queued ahead of the worker before the sender blocks.
const RENDER_QUEUE_LEN: usize = 2;

/// The final state of the worker.
pub struct RenderedFrame {
    pub order: ChannelOrder,
    pub texture: Box<TdaTexture>,
    pub frames_rendered: u64,
    pub blink_counter: u32,
}

impl RenderedFrame {
    /// Return the texture as RGBA bytes, whatever order it was rendered in.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut pixels = self.texture.to_vec();
        if self.order == ChannelOrder::Bgra {
            swap_red_blue(&mut pixels);
        }
        pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    pub fn save_png(&self, path: &std::path::Path) -> Result<(), anyhow::Error> {
        image::save_buffer(
            path,
            &self.to_rgba_bytes(),
            TEXTURE_WIDTH as u32,
            TEXTURE_HEIGHT as u32,
            image::ExtendedColorType::Rgba8,
        )?;
        log::info!("Wrote screenshot to {}", path.display());
        Ok(())
    }
}

pub struct RenderWorker {
    sender: Sender<TdaScreen>,
    handle: JoinHandle<RenderedFrame>,
}

impl RenderWorker {
    pub fn spawn(order: ChannelOrder) -> Result<Self, anyhow::Error> {
        let (sender, receiver) = crossbeam_channel::bounded(RENDER_QUEUE_LEN);
        let handle = std::thread::Builder::new()
            .name("tda_render".to_string())
            .spawn(move || render_loop(receiver, order))?;
        Ok(Self { sender, handle })
    }

    pub fn submit(&self, screen: TdaScreen) -> Result<(), anyhow::Error> {
        self.sender
            .send(screen)
            .map_err(|_| anyhow::anyhow!("Render worker has exited"))
    }

    /// Close the queue and wait for the worker to draw everything submitted.
    pub fn finish(self) -> Result<RenderedFrame, anyhow::Error> {
        drop(self.sender);
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("Render worker panicked"))
    }
}

fn render_loop(receiver: Receiver<TdaScreen>, order: ChannelOrder) -> RenderedFrame {
    let mut texture = new_texture();
    let mut blink_counter = 0;
    let mut frames_rendered = 0;

    for screen in receiver.iter() {
        match order {
            ChannelOrder::Rgba => tda_to_rgba_texture(&screen, &mut texture, &mut blink_counter),
            ChannelOrder::Bgra => tda_to_bgra_texture(&screen, &mut texture, &mut blink_counter),
        }
        frames_rendered += 1;
    }
    log::debug!("Render worker done: {} frames ({})", frames_rendered, order);

    RenderedFrame {
        order,
        texture,
        frames_rendered,
        blink_counter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcomputer_core::devices::tda::TDA_PALETTE;

    #[test]
    fn worker_renders_every_screen() {
        let worker = RenderWorker::spawn(ChannelOrder::Bgra).unwrap();
        let mut screen = TdaScreen::default();
        screen.txt_buffer[0] = 0x9020; // Space, light red background
        screen.cursor.enabled = true;
        screen.cursor.row = 5;

        for _ in 0..5 {
            worker.submit(screen.clone()).unwrap();
        }
        let frame = worker.finish().unwrap();
        assert_eq!(frame.frames_rendered, 5);
        assert_eq!(frame.blink_counter, 5);

        // BGRA in the texture, RGBA in the byte export
        assert_eq!(frame.texture[0].to_le_bytes(), [0x55, 0x55, 0xFF, 0xFF]);
        let bytes = frame.to_rgba_bytes();
        assert_eq!(bytes.len(), TEXTURE_WIDTH * TEXTURE_HEIGHT * 4);
        assert_eq!(&bytes[0..4], &TDA_PALETTE[9].to_le_bytes());
    }
}
