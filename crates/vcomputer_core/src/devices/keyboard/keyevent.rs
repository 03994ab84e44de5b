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

    devices::keyboard::keyevent.rs

    Packed key event as stored in the keyboard buffer.

*/

use modular_bitfield::{bitfield, prelude::*};

pub const KEY_STATUS_SHIFT: u8 = 0b0000_0001;
pub const KEY_STATUS_CTRL: u8 = 0b0000_0010;
pub const KEY_STATUS_ALT: u8 = 0b0000_0100;
pub const KEY_STATUS_MASK: u16 = 0b0000_0111;

/// A key event packs into a single 32-bit word:
/// `(status << 24) | (keycode << 16) | scancode`.
#[bitfield]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub scancode: B16,
    pub keycode: B8,
    pub status: B3,
    #[skip]
    unused: B5,
}

impl KeyEvent {
    /// Build an event from raw register values. Out of range bits of the keycode and
    /// status are discarded.
    pub fn pack(scancode: u16, keycode: u16, status: u16) -> Self {
        KeyEvent::new()
            .with_scancode(scancode)
            .with_keycode((keycode & 0xFF) as u8)
            .with_status((status & KEY_STATUS_MASK) as u8)
    }

    #[inline]
    pub fn to_word(self) -> u32 {
        u32::from_le_bytes(self.into_bytes())
    }

    #[inline]
    pub fn from_word(word: u32) -> Self {
        KeyEvent::from_bytes(word.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_into_documented_layout() {
        let ev = KeyEvent::pack(0x001E, 0x41, KEY_STATUS_CTRL as u16);
        assert_eq!(ev.to_word(), 0x0241_001E);

        let ev = KeyEvent::from_word(0x0541_001E);
        assert_eq!(ev.scancode(), 0x001E);
        assert_eq!(ev.keycode(), 0x41);
        assert_eq!(ev.status(), KEY_STATUS_SHIFT | KEY_STATUS_ALT);
    }

    #[test]
    fn excess_bits_are_masked() {
        let ev = KeyEvent::pack(0xFFFF, 0x1FF, 0xFFFF);
        assert_eq!(ev.to_word(), 0x07FF_FFFF);
    }
}
