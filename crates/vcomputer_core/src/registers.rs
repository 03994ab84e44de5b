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

    registers.rs

    The register block shared by every device. Registers a..e are used as
    command arguments and return slots by the CPU.

*/

use serde_derive::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBlock {
    pub a: u16,
    pub b: u16,
    pub c: u16,
    pub d: u16,
    pub e: u16,
}

impl RegisterBlock {
    pub fn clear(&mut self) {
        *self = RegisterBlock::default();
    }

    /// Combine registers b:a into the 32-bit address used by mapping commands.
    #[inline]
    pub fn ba_address(&self) -> u32 {
        ((self.b as u32) << 16) | self.a as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ba_address_uses_b_as_high_word() {
        let regs = RegisterBlock {
            a: 0x2000,
            b: 0x0010,
            ..Default::default()
        };
        assert_eq!(regs.ba_address(), 0x0010_2000);
    }
}
