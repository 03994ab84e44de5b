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

    vcomputer_headless::host.rs

    The host owns system memory and the device bus. It plays the part of the
    CPU and interrupt controller: it writes device registers, issues
    commands, polls devices for interrupts and acknowledges them.

*/

use std::path::Path;

use anyhow::Context;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use vcomputer_core::{
    devices::tda::TdaScreen,
    memory::ROM_BASE,
    registers::RegisterBlock,
    CommandTarget,
    DeviceDispatch,
    DeviceSnapshot,
    GKeyboard,
    InterruptSource,
    MemoryLayout,
    Resettable,
    SnapshotError,
    Snapshotable,
    TdaDevice,
};

pub const KEYBOARD_SLOT: usize = 0;
pub const TDA_SLOT: usize = 1;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("No {0} attached at slot {1}")]
    MissingDevice(&'static str, usize),
    #[error("Address {0:06X} is outside RAM")]
    BadAddress(u32),
    #[error("Snapshot has {found} devices, host has {expected}")]
    DeviceCount { expected: usize, found: usize },
    #[error("Device in slot {0}: {1}")]
    Snapshot(usize, #[source] SnapshotError),
}

/// Serialized state of every device on the bus, in slot order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub devices: Vec<DeviceSnapshot>,
}

/// An interrupt accepted from a device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InterruptEvent {
    pub slot: usize,
    pub message: u16,
}

pub struct Host {
    layout: MemoryLayout,
    ram: Vec<u8>,
    rom: Vec<u8>,
    devices: Vec<DeviceDispatch>,
}

impl Host {
    pub fn new(layout: MemoryLayout) -> Self {
        let devices = vec![GKeyboard::new().into(), TdaDevice::new(layout).into()];
        Self {
            layout,
            ram: vec![0; layout.ram_size],
            rom: vec![0; layout.rom_size],
            devices,
        }
    }

    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    /// Copy an image to the start of ROM. Anything past the end of ROM is discarded.
    pub fn load_rom(&mut self, image: &[u8]) {
        let len = image.len().min(self.rom.len());
        if len < image.len() {
            log::warn!(
                "ROM image is {} bytes, only the first {} fit at {:06X}",
                image.len(),
                len,
                ROM_BASE
            );
        }
        self.rom[..len].copy_from_slice(&image[..len]);
    }

    pub fn load_rom_file(&mut self, path: &Path) -> Result<(), anyhow::Error> {
        let image = std::fs::read(path).with_context(|| format!("Reading ROM image {}", path.display()))?;
        self.load_rom(&image);
        log::debug!("Loaded ROM image {} ({} bytes)", path.display(), image.len());
        Ok(())
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn read_word(&self, address: u32) -> Result<u16, HostError> {
        let a = address as usize;
        match self.ram.get(a..a + 2) {
            Some(bytes) => Ok(u16::from_le_bytes([bytes[0], bytes[1]])),
            None => Err(HostError::BadAddress(address)),
        }
    }

    pub fn write_word(&mut self, address: u32, value: u16) -> Result<(), HostError> {
        let a = address as usize;
        match self.ram.get_mut(a..a + 2) {
            Some(bytes) => {
                bytes.copy_from_slice(&value.to_le_bytes());
                Ok(())
            }
            None => Err(HostError::BadAddress(address)),
        }
    }

    /// Move a block of RAM. Ranges may overlap.
    pub fn copy_within(&mut self, src: u32, len: usize, dst: u32) -> Result<(), HostError> {
        let (s, d) = (src as usize, dst as usize);
        if s + len > self.ram.len() {
            return Err(HostError::BadAddress(src));
        }
        if d + len > self.ram.len() {
            return Err(HostError::BadAddress(dst));
        }
        self.ram.copy_within(s..s + len, d);
        Ok(())
    }

    fn device(&self, slot: usize) -> Result<&DeviceDispatch, HostError> {
        self.devices.get(slot).ok_or(HostError::MissingDevice("device", slot))
    }

    fn device_mut(&mut self, slot: usize) -> Result<&mut DeviceDispatch, HostError> {
        self.devices.get_mut(slot).ok_or(HostError::MissingDevice("device", slot))
    }

    pub fn keyboard_mut(&mut self) -> Result<&mut GKeyboard, HostError> {
        match self.devices.get_mut(KEYBOARD_SLOT) {
            Some(DeviceDispatch::GKeyboard(kb)) => Ok(kb),
            _ => Err(HostError::MissingDevice("keyboard", KEYBOARD_SLOT)),
        }
    }

    pub fn tda(&self) -> Result<&TdaDevice, HostError> {
        match self.devices.get(TDA_SLOT) {
            Some(DeviceDispatch::TdaDevice(tda)) => Ok(tda),
            _ => Err(HostError::MissingDevice("TDA", TDA_SLOT)),
        }
    }

    pub fn tda_mut(&mut self) -> Result<&mut TdaDevice, HostError> {
        match self.devices.get_mut(TDA_SLOT) {
            Some(DeviceDispatch::TdaDevice(tda)) => Ok(tda),
            _ => Err(HostError::MissingDevice("TDA", TDA_SLOT)),
        }
    }

    /// Load the registers of a device, send it a command and return the registers
    /// afterwards.
    pub fn command(&mut self, slot: usize, regs: RegisterBlock, cmd: u16) -> Result<RegisterBlock, HostError> {
        let device = self.device_mut(slot)?;
        *device.registers_mut() = regs;
        device.send_cmd(cmd);
        Ok(*device.registers())
    }

    pub fn registers(&self, slot: usize) -> Result<RegisterBlock, HostError> {
        Ok(*self.device(slot)?.registers())
    }

    pub fn set_registers(&mut self, slot: usize, regs: RegisterBlock) -> Result<(), HostError> {
        *self.device_mut(slot)?.registers_mut() = regs;
        Ok(())
    }

    /// Poll every device in slot order and acknowledge any interrupt found.
    pub fn service_interrupts(&mut self) -> Vec<InterruptEvent> {
        let mut events = Vec::new();
        for (slot, device) in self.devices.iter_mut().enumerate() {
            if let Some(message) = device.does_interrupt() {
                log::trace!("IRQ from slot {}: message {:04X}", slot, message);
                device.iack();
                events.push(InterruptEvent { slot, message });
            }
        }
        events
    }

    pub fn dump_screen(&self) -> Result<TdaScreen, HostError> {
        Ok(self.tda()?.dump_screen(&self.ram, &self.rom))
    }

    pub fn reset(&mut self) {
        for device in self.devices.iter_mut() {
            device.reset();
        }
    }

    pub fn save_state(&self) -> MachineSnapshot {
        MachineSnapshot {
            devices: self.devices.iter().map(|d| d.get_state()).collect(),
        }
    }

    /// Restore every device from a snapshot. Devices are reset first, so state not
    /// present in the snapshot returns to power-on values.
    pub fn restore_state(&mut self, snapshot: &MachineSnapshot) -> Result<(), HostError> {
        if snapshot.devices.len() != self.devices.len() {
            return Err(HostError::DeviceCount {
                expected: self.devices.len(),
                found:    snapshot.devices.len(),
            });
        }
        for (slot, (device, state)) in self.devices.iter().zip(&snapshot.devices).enumerate() {
            state
                .check_identity(device.identity())
                .map_err(|e| HostError::Snapshot(slot, e))?;
        }
        for (slot, (device, state)) in self.devices.iter_mut().zip(&snapshot.devices).enumerate() {
            device.reset();
            device.set_state(state).map_err(|e| HostError::Snapshot(slot, e))?;
        }
        Ok(())
    }

    pub fn write_snapshot_file(&self, path: &Path) -> Result<(), anyhow::Error> {
        let file = std::fs::File::create(path).with_context(|| format!("Creating {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &self.save_state())?;
        log::info!("Wrote device snapshot to {}", path.display());
        Ok(())
    }
}
