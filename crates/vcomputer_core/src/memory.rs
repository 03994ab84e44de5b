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

    memory.rs

    Mapped pointers into the host address space.

    Devices never own RAM or ROM. They hold validated offsets into those
    regions, tagged with the region they were resolved against at mapping
    time, and read through byte slices supplied by the host.

*/

use crate::coreconfig::MemoryLayout;

/// ROM is visible on the bus above this address.
pub const ROM_BASE: u32 = 0x100000;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MemRegion {
    #[default]
    Ram,
    Rom,
}

/// A bus address accepted by a device, together with the region backing it.
/// Address 0 is the unmapped sentinel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MappedPointer {
    region:  MemRegion,
    address: u32,
}

impl MappedPointer {
    pub const UNMAPPED: MappedPointer = MappedPointer {
        region:  MemRegion::Ram,
        address: 0,
    };

    pub(crate) fn ram(address: u32) -> Self {
        Self {
            region: MemRegion::Ram,
            address,
        }
    }

    pub(crate) fn rom(address: u32) -> Self {
        Self {
            region: MemRegion::Rom,
            address,
        }
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.address != 0
    }

    /// The bus address as programmed by the CPU.
    #[inline]
    pub fn address(&self) -> u32 {
        self.address
    }

    #[inline]
    pub fn region(&self) -> MemRegion {
        self.region
    }

    /// Offset of the pointer within its backing region, or None for a ROM pointer
    /// below `ROM_BASE`.
    pub fn offset(&self) -> Option<usize> {
        match self.region {
            MemRegion::Ram => Some(self.address as usize),
            MemRegion::Rom => self.address.checked_sub(ROM_BASE).map(|o| o as usize),
        }
    }

    /// Borrow `len` bytes at this pointer from the backing region. Returns None if the
    /// pointer is unmapped or the host region is smaller than the device was told.
    pub fn slice<'a>(&self, ram: &'a [u8], rom: &'a [u8], len: usize) -> Option<&'a [u8]> {
        if !self.is_mapped() {
            return None;
        }
        let src = match self.region {
            MemRegion::Ram => ram,
            MemRegion::Rom => rom,
        };
        let start = self.offset()?;
        src.get(start..start.checked_add(len)?)
    }
}

impl MemoryLayout {
    /// Whether `len` bytes starting at `address` lie entirely within RAM.
    pub fn fits_ram(&self, address: u32, len: usize) -> bool {
        (address as usize)
            .checked_add(len)
            .map_or(false, |end| end <= self.ram_size)
    }

    /// Whether `len` bytes starting at bus `address` lie entirely within ROM.
    pub fn fits_rom(&self, address: u32, len: usize) -> bool {
        match address.checked_sub(ROM_BASE) {
            Some(offset) => (offset as usize)
                .checked_add(len)
                .map_or(false, |end| end <= self.rom_size),
            None => false,
        }
    }

    /// Resolve a RAM-only mapping request.
    pub fn map_ram(&self, address: u32, len: usize) -> Option<MappedPointer> {
        self.fits_ram(address, len).then(|| MappedPointer::ram(address))
    }

    /// Resolve a mapping request that may be backed by RAM or, failing that, by ROM.
    pub fn map_ram_or_rom(&self, address: u32, len: usize) -> Option<MappedPointer> {
        if self.fits_ram(address, len) {
            Some(MappedPointer::ram(address))
        }
        else if self.fits_rom(address, len) {
            Some(MappedPointer::rom(address))
        }
        else {
            None
        }
    }
}
