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

    device_traits::mod.rs

    Capability traits implemented by every device, and the DeviceDispatch
    enum used to hold a device of any kind without dynamic dispatch.

*/

use std::fmt;

use enum_dispatch::enum_dispatch;
use serde_derive::{Deserialize, Serialize};

use crate::{
    devices::{keyboard::GKeyboard, tda::TdaDevice},
    registers::RegisterBlock,
    snapshot::{DeviceSnapshot, SnapshotError},
};

/// Identifies a device model on the bus. Snapshots carry the identity of the device that
/// produced them and may only be restored into a device with the same identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub dev_type:    u8,
    pub dev_subtype: u8,
    pub dev_id:      u16,
    pub vendor_id:   u32,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:04X} (vendor {:08X})",
            self.dev_type, self.dev_subtype, self.dev_id, self.vendor_id
        )
    }
}

// This enum holds every implementor of the device traits. Used for enum dispatch, to avoid
// the overhead of dynamic dispatch when the bus polls devices every cycle.
#[enum_dispatch]
#[derive(Clone, Debug)]
pub enum DeviceDispatch {
    GKeyboard,
    TdaDevice,
}

#[enum_dispatch(DeviceDispatch)]
pub trait Resettable {
    /// Return the device to its power-on state.
    fn reset(&mut self);
}

#[enum_dispatch(DeviceDispatch)]
pub trait CommandTarget {
    /// Return the identity of the device.
    fn identity(&self) -> DeviceIdentity;

    fn registers(&self) -> &RegisterBlock;

    fn registers_mut(&mut self) -> &mut RegisterBlock;

    /// Execute a command word written by the CPU. The registers provide the command
    /// arguments and receive any results. Unrecognized commands are ignored.
    fn send_cmd(&mut self, cmd: u16);
}

#[enum_dispatch(DeviceDispatch)]
pub trait InterruptSource {
    /// Polled by the bus. Returns the interrupt message if the device has an interrupt
    /// pending and a non-zero message configured.
    fn does_interrupt(&self) -> Option<u16>;

    /// Called by the bus after it has delivered the interrupt message.
    fn iack(&mut self);

    /// Whether the device raises its interrupt from an internal clock tied to vsync.
    fn is_sync_dev(&self) -> bool {
        false
    }
}

#[enum_dispatch(DeviceDispatch)]
pub trait Snapshotable {
    /// Capture the full device state. Never fails.
    fn get_state(&self) -> DeviceSnapshot;

    /// Restore device state from a snapshot.
    ///
    /// Properties missing from the snapshot leave the corresponding state untouched, so
    /// call [Resettable::reset] first if a clean baseline is required. Unknown properties
    /// are ignored.
    fn set_state(&mut self, state: &DeviceSnapshot) -> Result<(), SnapshotError>;
}

/// Base half of [Snapshotable::get_state]: identity and registers.
pub fn base_state<D: CommandTarget + ?Sized>(device: &D) -> DeviceSnapshot {
    DeviceSnapshot::new(device.identity(), *device.registers())
}

/// Base half of [Snapshotable::set_state]: validate the identity, then restore registers.
/// Nothing is modified if validation fails.
pub fn restore_base_state<D: CommandTarget + ?Sized>(device: &mut D, state: &DeviceSnapshot) -> Result<(), SnapshotError> {
    state.check_identity(device.identity())?;
    *device.registers_mut() = *state.registers();
    Ok(())
}
