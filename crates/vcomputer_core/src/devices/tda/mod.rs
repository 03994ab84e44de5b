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

    devices::tda::mod.rs

    Implementation of the Text Display Adapter (TDA).

    The TDA displays a 40x30 grid of character cells. The text buffer and
    an optional user font live in host memory; the CPU maps them with the
    MAP_BUFFER and MAP_FONT commands. The device itself only holds the
    validated pointers. dump_screen() copies the mapped memory into a
    TdaScreen, which the rasterizer in draw.rs turns into a 320x240 texture.

    The TDA can also raise an interrupt on vertical sync. The frame timer
    lives outside the device and calls vsync() once per frame.

*/

pub mod draw;
pub mod font;

pub use draw::*;

use modular_bitfield::{bitfield, prelude::*};
use strum_macros::{Display, FromRepr};

use crate::{
    coreconfig::MemoryLayout,
    device_traits::*,
    interrupt::InterruptLatch,
    memory::MappedPointer,
    registers::RegisterBlock,
    snapshot::{DeviceSnapshot, PropertyValue, SnapshotError},
};

pub const TDA_IDENTITY: DeviceIdentity = DeviceIdentity {
    dev_type:    0x0E, // Graphics
    dev_subtype: 0x01, // TDA compatible
    dev_id:      0x0001,
    vendor_id:   0x1C6C_8B36, // Nya Elektriska
};

pub const TEXT_COLUMNS: usize = 40;
pub const TEXT_ROWS: usize = 30;
pub const TEXT_CELLS: usize = TEXT_COLUMNS * TEXT_ROWS;

/// Size in bytes of the text buffer. Each cell is a little-endian u16.
pub const TXT_BUFFER_SIZE: usize = TEXT_CELLS * 2;
/// Size in bytes of a font: 256 glyphs of 8 rows.
pub const FONT_BUFFER_SIZE: usize = 256 * 8;

const PROP_VSYNC_MSG: &str = "vsync_msg";
const PROP_DO_VSYNC: &str = "do_vsync";
const PROP_CURSOR: &str = "cursor";
const PROP_BLINK: &str = "blink";
const PROP_BUFFER_PTR: &str = "buffer_ptr";
const PROP_FONT_PTR: &str = "font_ptr";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, FromRepr)]
#[repr(u16)]
pub enum TdaCommand {
    MapBuffer = 0x0000,
    MapFont = 0x0001,
    SetInt = 0x0002,
}

/// Cursor position, register E.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct CursorPosition {
    pub col: B8,
    pub row: B8,
}

/// Cursor shape and flags, register D.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct CursorShape {
    pub start: B3,
    #[skip]
    unused0: B1,
    pub end: B3,
    #[skip]
    unused1: B1,
    pub color: B4,
    #[skip]
    unused2: B2,
    pub blink: bool,
    pub enable: bool,
}

/// A text buffer cell. The glyph is the low byte.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct TextCell {
    pub glyph: B8,
    pub fg: B4,
    pub bg: B4,
}

impl From<u16> for TextCell {
    fn from(word: u16) -> Self {
        TextCell::from_bytes(word.to_le_bytes())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontSource {
    /// The built-in font.
    Rom,
    /// A copy of a font mapped by the CPU.
    User([u8; FONT_BUFFER_SIZE]),
}

impl FontSource {
    pub fn glyph_table(&self) -> &[u8; FONT_BUFFER_SIZE] {
        match self {
            FontSource::Rom => &*font::ROM_FONT,
            FontSource::User(table) => table,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, FontSource::User(_))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CursorState {
    pub enabled: bool,
    pub blink: bool,
    pub row: u8,
    pub col: u8,
    /// First scanline painted, 0-7.
    pub start: u8,
    /// Last scanline painted, inclusive.
    pub end: u8,
    /// Palette index.
    pub color: u8,
}

/// Everything the rasterizer needs to draw one frame. Owns its data, so it can be
/// handed to another thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TdaScreen {
    pub txt_buffer: [u16; TEXT_CELLS],
    pub font: FontSource,
    pub cursor: CursorState,
}

impl Default for TdaScreen {
    fn default() -> Self {
        Self {
            txt_buffer: [0; TEXT_CELLS],
            font: FontSource::Rom,
            cursor: CursorState::default(),
        }
    }
}

impl TdaScreen {
    /// Return the cell at the given row and column.
    pub fn cell(&self, row: usize, col: usize) -> TextCell {
        TextCell::from(self.txt_buffer[row * TEXT_COLUMNS + col])
    }
}

#[derive(Clone, Debug)]
pub struct TdaDevice {
    layout: MemoryLayout,
    regs: RegisterBlock,
    buffer_ptr: MappedPointer,
    font_ptr: MappedPointer,
    vsync: InterruptLatch,
    cursor: bool,
    blink: bool,
}

impl Default for TdaDevice {
    fn default() -> Self {
        Self::new(MemoryLayout::default())
    }
}

impl TdaDevice {
    pub fn new(layout: MemoryLayout) -> Self {
        Self {
            layout,
            regs: RegisterBlock::default(),
            buffer_ptr: MappedPointer::UNMAPPED,
            font_ptr: MappedPointer::UNMAPPED,
            vsync: InterruptLatch::new(),
            cursor: false,
            blink: false,
        }
    }

    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    pub fn buffer_ptr(&self) -> MappedPointer {
        self.buffer_ptr
    }

    pub fn font_ptr(&self) -> MappedPointer {
        self.font_ptr
    }

    pub fn cursor_enabled(&self) -> bool {
        self.cursor
    }

    pub fn blink_enabled(&self) -> bool {
        self.blink
    }

    /// Called by the frame timer at the start of vertical retrace. Latches the cursor
    /// flags from register D and requests the vsync interrupt.
    pub fn vsync(&mut self) {
        let shape = CursorShape::from_bytes(self.regs.d.to_le_bytes());
        self.cursor = shape.enable();
        self.blink = shape.blink();
        self.vsync.raise();
    }

    /// Build a snapshot of the screen from the mapped buffers in host memory.
    pub fn dump_screen(&self, ram: &[u8], rom: &[u8]) -> TdaScreen {
        let mut screen = TdaScreen::default();

        if let Some(buf) = self.buffer_ptr.slice(ram, rom, TXT_BUFFER_SIZE) {
            for (cell, bytes) in screen.txt_buffer.iter_mut().zip(buf.chunks_exact(2)) {
                *cell = u16::from_le_bytes([bytes[0], bytes[1]]);
            }
        }
        else if self.buffer_ptr.is_mapped() {
            log::warn!("TDA: text buffer at {:06X} lies outside host memory", self.buffer_ptr.address());
        }

        if let Some(font) = self.font_ptr.slice(ram, rom, FONT_BUFFER_SIZE) {
            let mut table = [0u8; FONT_BUFFER_SIZE];
            table.copy_from_slice(font);
            screen.font = FontSource::User(table);
        }

        let pos = CursorPosition::from_bytes(self.regs.e.to_le_bytes());
        let shape = CursorShape::from_bytes(self.regs.d.to_le_bytes());
        screen.cursor = CursorState {
            enabled: self.cursor,
            blink: self.blink,
            row: pos.row(),
            col: pos.col(),
            start: shape.start(),
            end: shape.end(),
            color: shape.color(),
        };
        screen
    }

    fn map_buffer(&mut self) {
        let address = self.regs.ba_address();
        match self.layout.map_ram(address, TXT_BUFFER_SIZE) {
            Some(ptr) => {
                log::debug!("TDA: text buffer mapped at {:06X}", address);
                self.buffer_ptr = ptr;
            }
            None => log::debug!("TDA: rejected text buffer address {:06X}", address),
        }
    }

    fn map_font(&mut self) {
        let address = self.regs.ba_address();
        match self.layout.map_ram_or_rom(address, FONT_BUFFER_SIZE) {
            Some(ptr) => {
                log::debug!("TDA: font mapped at {:06X} ({:?})", address, ptr.region());
                self.font_ptr = ptr;
            }
            None => log::debug!("TDA: rejected font address {:06X}", address),
        }
    }

    fn restore_pointer(&self, name: &str, address: u32) -> Option<MappedPointer> {
        if address == 0 {
            return Some(MappedPointer::UNMAPPED);
        }
        let ptr = match name {
            PROP_BUFFER_PTR => self.layout.map_ram(address, TXT_BUFFER_SIZE),
            _ => self.layout.map_ram_or_rom(address, FONT_BUFFER_SIZE),
        };
        if ptr.is_none() {
            log::warn!("TDA: snapshot {} {:06X} does not fit host memory, ignored", name, address);
        }
        ptr
    }
}

impl Resettable for TdaDevice {
    fn reset(&mut self) {
        self.regs.clear();
        self.buffer_ptr = MappedPointer::UNMAPPED;
        self.font_ptr = MappedPointer::UNMAPPED;
        self.vsync.clear();
        self.cursor = false;
        self.blink = false;
    }
}

impl CommandTarget for TdaDevice {
    fn identity(&self) -> DeviceIdentity {
        TDA_IDENTITY
    }

    fn registers(&self) -> &RegisterBlock {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut RegisterBlock {
        &mut self.regs
    }

    fn send_cmd(&mut self, cmd: u16) {
        let Some(command) = TdaCommand::from_repr(cmd)
        else {
            log::trace!("TDA: ignoring unknown command {:04X}", cmd);
            return;
        };
        log::trace!("TDA: {}", command);

        match command {
            TdaCommand::MapBuffer => self.map_buffer(),
            TdaCommand::MapFont => self.map_font(),
            TdaCommand::SetInt => self.vsync.set_message(self.regs.a),
        }
    }
}

impl InterruptSource for TdaDevice {
    fn does_interrupt(&self) -> Option<u16> {
        self.vsync.poll()
    }

    fn iack(&mut self) {
        self.vsync.ack();
    }
}

impl Snapshotable for TdaDevice {
    fn get_state(&self) -> DeviceSnapshot {
        let mut state = base_state(self);

        state.set_property(PROP_VSYNC_MSG, PropertyValue::Int(self.vsync.message() as u32));
        state.set_property(PROP_DO_VSYNC, PropertyValue::Bool(self.vsync.is_pending()));
        state.set_property(PROP_CURSOR, PropertyValue::Bool(self.cursor));
        state.set_property(PROP_BLINK, PropertyValue::Bool(self.blink));
        if self.buffer_ptr.is_mapped() {
            state.set_property(PROP_BUFFER_PTR, PropertyValue::Int(self.buffer_ptr.address()));
        }
        if self.font_ptr.is_mapped() {
            state.set_property(PROP_FONT_PTR, PropertyValue::Int(self.font_ptr.address()));
        }
        state
    }

    fn set_state(&mut self, state: &DeviceSnapshot) -> Result<(), SnapshotError> {
        restore_base_state(self, state)?;

        for (name, value) in state.properties() {
            match (name, value) {
                (PROP_VSYNC_MSG, PropertyValue::Int(msg)) => self.vsync.set_message(*msg as u16),
                (PROP_DO_VSYNC, PropertyValue::Bool(pending)) => self.vsync.set_pending(*pending),
                (PROP_CURSOR, PropertyValue::Bool(cursor)) => self.cursor = *cursor,
                (PROP_BLINK, PropertyValue::Bool(blink)) => self.blink = *blink,
                (PROP_BUFFER_PTR, PropertyValue::Int(address)) => {
                    if let Some(ptr) = self.restore_pointer(name, *address) {
                        self.buffer_ptr = ptr;
                    }
                }
                (PROP_FONT_PTR, PropertyValue::Int(address)) => {
                    if let Some(ptr) = self.restore_pointer(name, *address) {
                        self.font_ptr = ptr;
                    }
                }
                (PROP_VSYNC_MSG | PROP_DO_VSYNC | PROP_CURSOR | PROP_BLINK | PROP_BUFFER_PTR | PROP_FONT_PTR, _) => {
                    log::warn!(
                        "Ignoring snapshot property '{}' with unexpected type {}",
                        name,
                        value.kind()
                    );
                }
                _ => {}
            }
        }

        log::debug!(
            "TDA state restored: buffer {:06X}, font {:06X} ({:?})",
            self.buffer_ptr.address(),
            self.font_ptr.address(),
            self.font_ptr.region()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemRegion, ROM_BASE};

    fn layout() -> MemoryLayout {
        MemoryLayout::new(0x20000, 0x8000)
    }

    fn map(tda: &mut TdaDevice, cmd: TdaCommand, address: u32) {
        tda.registers_mut().a = address as u16;
        tda.registers_mut().b = (address >> 16) as u16;
        tda.send_cmd(cmd as u16);
    }

    #[test]
    fn map_buffer_respects_ram_bounds() {
        let mut tda = TdaDevice::new(layout());

        map(&mut tda, TdaCommand::MapBuffer, 0x1000);
        assert_eq!(tda.buffer_ptr(), MappedPointer::ram(0x1000));

        // Last address where the whole buffer fits
        let last = (0x20000 - TXT_BUFFER_SIZE) as u32;
        map(&mut tda, TdaCommand::MapBuffer, last);
        assert_eq!(tda.buffer_ptr().address(), last);

        // One past: rejected, previous mapping kept
        map(&mut tda, TdaCommand::MapBuffer, last + 1);
        assert_eq!(tda.buffer_ptr().address(), last);

        // The text buffer can never live in ROM
        map(&mut tda, TdaCommand::MapBuffer, ROM_BASE);
        assert_eq!(tda.buffer_ptr().address(), last);
    }

    #[test]
    fn map_font_falls_back_to_rom() {
        let mut tda = TdaDevice::new(layout());

        map(&mut tda, TdaCommand::MapFont, 0x8000);
        assert_eq!(tda.font_ptr(), MappedPointer::ram(0x8000));

        map(&mut tda, TdaCommand::MapFont, ROM_BASE + 0x100);
        assert_eq!(tda.font_ptr(), MappedPointer::rom(ROM_BASE + 0x100));
        assert_eq!(tda.font_ptr().region(), MemRegion::Rom);

        // Between the end of RAM and the ROM base
        map(&mut tda, TdaCommand::MapFont, 0x30000);
        assert_eq!(tda.font_ptr(), MappedPointer::rom(ROM_BASE + 0x100));

        // Past the end of ROM
        map(&mut tda, TdaCommand::MapFont, ROM_BASE + 0x8000 - 0x7FF);
        assert_eq!(tda.font_ptr(), MappedPointer::rom(ROM_BASE + 0x100));
        map(&mut tda, TdaCommand::MapFont, ROM_BASE + 0x8000 - 0x800);
        assert_eq!(tda.font_ptr(), MappedPointer::rom(ROM_BASE + 0x7800));
    }

    #[test]
    fn vsync_interrupt_needs_message() {
        let mut tda = TdaDevice::new(layout());
        tda.vsync();
        assert_eq!(tda.does_interrupt(), None);

        tda.registers_mut().a = 0x0055;
        tda.send_cmd(TdaCommand::SetInt as u16);
        assert_eq!(tda.does_interrupt(), Some(0x0055));
        tda.iack();
        assert_eq!(tda.does_interrupt(), None);

        tda.vsync();
        assert_eq!(tda.does_interrupt(), Some(0x0055));
        assert!(!tda.is_sync_dev());
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let mut tda = TdaDevice::new(layout());
        map(&mut tda, TdaCommand::MapBuffer, 0x1000);
        tda.registers_mut().a = 0x2000;
        tda.send_cmd(0x0003);
        tda.send_cmd(0xFFFF);
        assert_eq!(tda.buffer_ptr(), MappedPointer::ram(0x1000));
        assert_eq!(tda.does_interrupt(), None);
    }

    #[test]
    fn reset_unmaps_everything() {
        let mut tda = TdaDevice::new(layout());
        map(&mut tda, TdaCommand::MapBuffer, 0x1000);
        map(&mut tda, TdaCommand::MapFont, 0x2000);
        tda.registers_mut().d = 0xC000;
        tda.vsync();
        tda.reset();

        assert!(!tda.buffer_ptr().is_mapped());
        assert!(!tda.font_ptr().is_mapped());
        assert!(!tda.cursor_enabled());
        assert!(!tda.blink_enabled());
        assert_eq!(*tda.registers(), RegisterBlock::default());
        assert_eq!(tda.get_state().property_count(), 4);
    }

    #[test]
    fn dump_screen_reads_mapped_memory() {
        let mut ram = vec![0u8; 0x20000];
        let mut rom = vec![0u8; 0x8000];
        let mut tda = TdaDevice::new(layout());

        // Unmapped: blank cells and the ROM font
        let screen = tda.dump_screen(&ram, &rom);
        assert!(screen.txt_buffer.iter().all(|&c| c == 0));
        assert_eq!(screen.font, FontSource::Rom);

        ram[0x1000..0x1002].copy_from_slice(&0x1F41u16.to_le_bytes());
        ram[0x1000 + 2 * 41..0x1000 + 2 * 42].copy_from_slice(&0x0F42u16.to_le_bytes());
        rom[0x200] = 0xAA;
        map(&mut tda, TdaCommand::MapBuffer, 0x1000);
        map(&mut tda, TdaCommand::MapFont, ROM_BASE + 0x200);

        let screen = tda.dump_screen(&ram, &rom);
        assert_eq!(screen.txt_buffer[0], 0x1F41);
        let cell = screen.cell(1, 1);
        assert_eq!((cell.glyph(), cell.fg(), cell.bg()), (0x42, 0x0F, 0x00));
        assert!(screen.font.is_user());
        assert_eq!(screen.font.glyph_table()[0], 0xAA);
    }

    #[test]
    fn dump_screen_decodes_cursor_registers() {
        let mut tda = TdaDevice::new(layout());
        tda.registers_mut().e = 0x0C05; // row 12, col 5
        tda.registers_mut().d = 0x8000 | 0x0A00 | (7 << 4) | 2;

        let screen = tda.dump_screen(&[], &[]);
        assert!(!screen.cursor.enabled);

        tda.vsync();
        let screen = tda.dump_screen(&[], &[]);
        assert_eq!(
            screen.cursor,
            CursorState {
                enabled: true,
                blink: false,
                row: 12,
                col: 5,
                start: 2,
                end: 7,
                color: 0x0A,
            }
        );
    }

    #[test]
    fn snapshot_round_trip() {
        let mut tda = TdaDevice::new(layout());
        map(&mut tda, TdaCommand::MapBuffer, 0x1000);
        map(&mut tda, TdaCommand::MapFont, ROM_BASE + 0x800);
        tda.registers_mut().a = 0x0077;
        tda.send_cmd(TdaCommand::SetInt as u16);
        tda.registers_mut().d = 0xC000;
        tda.vsync();

        let state = tda.get_state();
        assert_eq!(state.property(PROP_FONT_PTR), Some(&PropertyValue::Int(ROM_BASE + 0x800)));

        let mut restored = TdaDevice::new(layout());
        restored.set_state(&state).unwrap();
        assert_eq!(restored.buffer_ptr(), MappedPointer::ram(0x1000));
        assert_eq!(restored.font_ptr(), MappedPointer::rom(ROM_BASE + 0x800));
        assert_eq!(restored.does_interrupt(), Some(0x0077));
        assert!(restored.cursor_enabled());
        assert!(restored.blink_enabled());
        assert_eq!(restored.get_state(), state);
    }

    #[test]
    fn font_ptr_restores_into_font_ptr() {
        let mut tda = TdaDevice::new(layout());
        map(&mut tda, TdaCommand::MapBuffer, 0x1000);

        let mut state = TdaDevice::new(layout()).get_state();
        state.set_property(PROP_FONT_PTR, PropertyValue::Int(0x4000));
        tda.set_state(&state).unwrap();

        assert_eq!(tda.buffer_ptr(), MappedPointer::ram(0x1000));
        assert_eq!(tda.font_ptr(), MappedPointer::ram(0x4000));
    }

    #[test]
    fn restore_ignores_bad_properties() {
        let mut tda = TdaDevice::new(layout());
        map(&mut tda, TdaCommand::MapBuffer, 0x1000);
        tda.registers_mut().a = 0x0011;
        tda.send_cmd(TdaCommand::SetInt as u16);

        let mut state = tda.get_state();
        state.set_property(PROP_BUFFER_PTR, PropertyValue::Int(0x1F800));
        state.set_property(PROP_VSYNC_MSG, PropertyValue::Bool(true));
        state.set_property("palette", PropertyValue::Raw(vec![1, 2, 3]));

        tda.set_state(&state).unwrap();
        assert_eq!(tda.buffer_ptr(), MappedPointer::ram(0x1000));
        assert_eq!(tda.get_state().property(PROP_VSYNC_MSG), Some(&PropertyValue::Int(0x0011)));
    }

    #[test]
    fn restore_rejects_keyboard_snapshot() {
        use crate::devices::keyboard::GKeyboard;

        let mut tda = TdaDevice::new(layout());
        map(&mut tda, TdaCommand::MapBuffer, 0x1000);
        let state = GKeyboard::new().get_state();

        assert!(matches!(tda.set_state(&state), Err(SnapshotError::DeviceMismatch { .. })));
        assert_eq!(tda.buffer_ptr(), MappedPointer::ram(0x1000));
    }
}
