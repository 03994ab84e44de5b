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

    coreconfig.rs

    Configuration types consumed by the device core. Frontends deserialize
    these from their own configuration files and hand them to the devices.

*/

use serde_derive::{Deserialize, Serialize};

/// Default amount of RAM in the virtual computer (128KB).
pub const DEFAULT_RAM_SIZE: usize = 0x20000;
/// Default amount of ROM in the virtual computer (32KB).
pub const DEFAULT_ROM_SIZE: usize = 0x8000;

const fn _default_ram_size() -> usize {
    DEFAULT_RAM_SIZE
}
const fn _default_rom_size() -> usize {
    DEFAULT_ROM_SIZE
}

/// Sizes of the host address space regions. Devices only need the sizes to validate
/// mapping requests; the bytes themselves stay with the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MemoryLayout {
    #[serde(default = "_default_ram_size")]
    pub ram_size: usize,
    #[serde(default = "_default_rom_size")]
    pub rom_size: usize,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            ram_size: DEFAULT_RAM_SIZE,
            rom_size: DEFAULT_ROM_SIZE,
        }
    }
}

impl MemoryLayout {
    pub fn new(ram_size: usize, rom_size: usize) -> Self {
        Self { ram_size, rom_size }
    }
}
