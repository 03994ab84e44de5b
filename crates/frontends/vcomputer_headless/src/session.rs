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

    vcomputer_headless::session.rs

    A scripted session standing in for guest software. At boot it maps the
    TDA text buffer, arms the keyboard and vsync interrupts and prints a
    banner. Every frame it raises vsync, services interrupts, pulls any
    queued keys and echoes them into the text buffer like a tiny terminal.

*/

use std::collections::VecDeque;

use vcomputer_config::ConfigFileParams;
use vcomputer_core::{
    devices::{
        keyboard::{KeyboardCommand, KEY_STATUS_SHIFT},
        tda::{TdaCommand, TdaScreen, TEXT_COLUMNS, TEXT_ROWS},
    },
    memory::ROM_BASE,
    registers::RegisterBlock,
};

use crate::{
    host::{Host, HostError, KEYBOARD_SLOT, TDA_SLOT},
    render_worker::{RenderWorker, RenderedFrame},
};

pub const TEXT_BUFFER_ADDR: u32 = 0x1000;

pub const VSYNC_MSG: u16 = 0x0010;
pub const KEYBOARD_MSG: u16 = 0x0011;

// White on navy
const TEXT_ATTR: u16 = 0x2F00;
// Yellow on navy
const BANNER_ATTR: u16 = 0x2D00;
// Enabled, blinking, yellow, scanlines 6-7
const CURSOR_SHAPE: u16 = 0x8000 | 0x4000 | 0x0D00 | (7 << 4) | 6;

const BANNER: &str = "VCOMPUTER TDA";
const FIRST_TEXT_ROW: usize = 1;

const KEY_ENTER: u16 = 257;
const KEY_BACKSPACE: u16 = 259;

/// Map a host character to (scancode, keycode, status).
pub fn key_for_char(c: char) -> (u16, u8, u8) {
    match c {
        '\n' | '\r' => (KEY_ENTER, 0x0D, 0),
        '\x08' => (KEY_BACKSPACE, 0x08, 0),
        c if c.is_ascii_control() => (0, b'?', 0),
        c if c.is_ascii_uppercase() => (c as u16, c as u8, KEY_STATUS_SHIFT),
        c if c.is_ascii() => (c.to_ascii_uppercase() as u16, c as u8, 0),
        c if (c as u32) <= 0xFF => (0, c as u8, 0),
        _ => (0, b'?', 0),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u32,
    pub keys_typed: usize,
    pub keys_dropped: usize,
    pub keys_echoed: usize,
    pub vsync_irqs: usize,
    pub keyboard_irqs: usize,
}

pub struct Session {
    host: Host,
    echo: bool,
    row: usize,
    col: usize,
    stats: SessionStats,
}

impl Session {
    /// Boot the session. If `font_in_rom` is set, the font at the start of ROM is mapped
    /// in place of the built-in one.
    pub fn new(host: Host, echo: bool, font_in_rom: bool) -> Result<Self, HostError> {
        let mut session = Self {
            host,
            echo,
            row: FIRST_TEXT_ROW,
            col: 0,
            stats: SessionStats::default(),
        };
        session.boot(font_in_rom)?;
        Ok(session)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn boot(&mut self, font_in_rom: bool) -> Result<(), HostError> {
        self.host.reset();

        let buffer = split_address(TEXT_BUFFER_ADDR);
        self.host.command(TDA_SLOT, buffer, TdaCommand::MapBuffer as u16)?;
        if font_in_rom {
            self.host
                .command(TDA_SLOT, split_address(ROM_BASE), TdaCommand::MapFont as u16)?;
        }
        self.host.command(TDA_SLOT, reg_a(VSYNC_MSG), TdaCommand::SetInt as u16)?;
        self.host
            .command(KEYBOARD_SLOT, reg_a(KEYBOARD_MSG), KeyboardCommand::SetInt as u16)?;

        for row in 0..TEXT_ROWS {
            let attr = if row < FIRST_TEXT_ROW { BANNER_ATTR } else { TEXT_ATTR };
            self.clear_row(row, attr)?;
        }
        let start = (TEXT_COLUMNS - BANNER.len()) / 2;
        for (i, b) in BANNER.bytes().enumerate() {
            self.host.write_word(cell_address(0, start + i), BANNER_ATTR | b as u16)?;
        }

        self.update_cursor()?;
        log::debug!("Session booted, text buffer at {:06X}", TEXT_BUFFER_ADDR);
        Ok(())
    }

    /// Send a character to the keyboard as if typed on the host.
    pub fn type_char(&mut self, c: char) -> Result<(), HostError> {
        let (scancode, keycode, status) = key_for_char(c);
        if self.host.keyboard_mut()?.send_key_event(scancode, keycode, status) {
            self.stats.keys_typed += 1;
        }
        else {
            self.stats.keys_dropped += 1;
        }
        Ok(())
    }

    /// Run one frame and return the screen as it stands at the end of it.
    pub fn step_frame(&mut self) -> Result<TdaScreen, HostError> {
        self.host.tda_mut()?.vsync();

        for event in self.host.service_interrupts() {
            match (event.slot, event.message) {
                (KEYBOARD_SLOT, KEYBOARD_MSG) => {
                    self.stats.keyboard_irqs += 1;
                    self.drain_keys()?;
                }
                (TDA_SLOT, VSYNC_MSG) => self.stats.vsync_irqs += 1,
                (slot, message) => log::warn!("Unexpected interrupt {:04X} from slot {}", message, slot),
            }
        }

        self.stats.frames += 1;
        self.host.dump_screen()
    }

    fn drain_keys(&mut self) -> Result<(), HostError> {
        while self.host.keyboard_mut()?.key_count() > 0 {
            let regs = self
                .host
                .command(KEYBOARD_SLOT, RegisterBlock::default(), KeyboardCommand::PullKey as u16)?;
            log::trace!("Pulled key: scancode {:04X} keycode {:02X} status {}", regs.b, regs.a, regs.c);
            // Keycode 0 carries no character
            if self.echo && regs.a != 0 {
                self.put_char(regs.a as u8)?;
                self.stats.keys_echoed += 1;
            }
        }
        self.update_cursor()
    }

    fn put_char(&mut self, keycode: u8) -> Result<(), HostError> {
        match keycode {
            0x0D => self.new_line()?,
            0x08 => {
                if self.col > 0 {
                    self.col -= 1;
                }
                else if self.row > FIRST_TEXT_ROW {
                    self.row -= 1;
                    self.col = TEXT_COLUMNS - 1;
                }
                self.host.write_word(cell_address(self.row, self.col), TEXT_ATTR)?;
            }
            _ => {
                self.host
                    .write_word(cell_address(self.row, self.col), TEXT_ATTR | keycode as u16)?;
                self.col += 1;
                if self.col == TEXT_COLUMNS {
                    self.new_line()?;
                }
            }
        }
        Ok(())
    }

    fn new_line(&mut self) -> Result<(), HostError> {
        self.col = 0;
        if self.row + 1 < TEXT_ROWS {
            self.row += 1;
            return Ok(());
        }

        // Scroll the text area up one row
        let row_bytes = TEXT_COLUMNS * 2;
        let rows = TEXT_ROWS - FIRST_TEXT_ROW - 1;
        self.host.copy_within(
            cell_address(FIRST_TEXT_ROW + 1, 0),
            rows * row_bytes,
            cell_address(FIRST_TEXT_ROW, 0),
        )?;
        self.clear_row(TEXT_ROWS - 1, TEXT_ATTR)
    }

    fn clear_row(&mut self, row: usize, attr: u16) -> Result<(), HostError> {
        for col in 0..TEXT_COLUMNS {
            self.host.write_word(cell_address(row, col), attr)?;
        }
        Ok(())
    }

    fn update_cursor(&mut self) -> Result<(), HostError> {
        let mut regs = self.host.registers(TDA_SLOT)?;
        regs.d = CURSOR_SHAPE;
        regs.e = ((self.row as u16) << 8) | self.col as u16;
        self.host.set_registers(TDA_SLOT, regs)
    }
}

fn cell_address(row: usize, col: usize) -> u32 {
    TEXT_BUFFER_ADDR + ((row * TEXT_COLUMNS + col) * 2) as u32
}

fn split_address(address: u32) -> RegisterBlock {
    RegisterBlock {
        a: address as u16,
        b: (address >> 16) as u16,
        ..Default::default()
    }
}

fn reg_a(a: u16) -> RegisterBlock {
    RegisterBlock {
        a,
        ..Default::default()
    }
}

pub struct SessionReport {
    pub stats: SessionStats,
    pub last_frame: RenderedFrame,
}

/// Run a full session as described by the configuration: type the configured text one
/// key per frame, render every frame on the worker thread, then write the screenshot and
/// snapshot files if requested.
pub fn run_session(config: &ConfigFileParams) -> Result<SessionReport, anyhow::Error> {
    let mut host = Host::new(config.machine.layout());
    if let Some(rom_image) = &config.machine.rom_image {
        host.load_rom_file(rom_image)?;
    }

    let mut session = Session::new(host, config.keyboard.echo, config.machine.rom_image.is_some())?;
    let worker = RenderWorker::spawn(config.display.channel_order)?;

    let mut text: VecDeque<char> = config.keyboard.text.chars().collect();
    for _ in 0..config.display.frames {
        if let Some(c) = text.pop_front() {
            session.type_char(c)?;
        }
        worker.submit(session.step_frame()?)?;
    }
    if !text.is_empty() {
        log::warn!("Session ended with {} characters left to type", text.len());
    }

    let last_frame = worker.finish()?;

    if let Some(path) = &config.display.screenshot {
        last_frame.save_png(path)?;
    }
    if let Some(path) = &config.snapshot.path {
        session.host().write_snapshot_file(path)?;
    }

    Ok(SessionReport {
        stats: session.stats,
        last_frame,
    })
}
