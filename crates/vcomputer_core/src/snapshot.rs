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

    snapshot.rs

    Device state snapshots.

    A DeviceSnapshot is the only persisted representation of a device. It
    carries the device identity, the register block, and a set of named,
    typed properties for any state beyond the registers. Property names are
    unique within a snapshot; insertion order is kept for stable output but
    restore looks properties up by name only.

*/

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumDiscriminants};
use thiserror::Error;

use crate::{device_traits::DeviceIdentity, registers::RegisterBlock};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(PropertyType), derive(Display))]
pub enum PropertyValue {
    Int(u32),
    Bool(bool),
    /// Untyped byte blob.
    Raw(Vec<u8>),
    /// Length-prefixed sequence of 32-bit words.
    DWords(Vec<u32>),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyType {
        PropertyType::from(self)
    }

    /// Interpret the value as a word sequence. Raw blobs are read as packed
    /// little-endian u32s; a trailing partial word is discarded.
    pub fn to_dwords(&self) -> Option<Vec<u32>> {
        match self {
            PropertyValue::DWords(words) => Some(words.clone()),
            PropertyValue::Raw(bytes) => Some(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot belongs to device {found}, expected device {expected}")]
    DeviceMismatch {
        expected: DeviceIdentity,
        found:    DeviceIdentity,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    identity: DeviceIdentity,
    registers: RegisterBlock,
    properties: IndexMap<String, PropertyValue>,
}

impl DeviceSnapshot {
    pub fn new(identity: DeviceIdentity, registers: RegisterBlock) -> Self {
        Self {
            identity,
            registers,
            properties: IndexMap::new(),
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn registers(&self) -> &RegisterBlock {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterBlock {
        &mut self.registers
    }

    /// Set a property, replacing any existing property of the same name.
    pub fn set_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.properties.insert(name.into(), value);
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.shift_remove(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Base restore check shared by all devices.
    pub fn check_identity(&self, expected: DeviceIdentity) -> Result<(), SnapshotError> {
        if self.identity != expected {
            log::debug!("Rejecting snapshot for {}, expected {}", self.identity, expected);
            return Err(SnapshotError::DeviceMismatch {
                expected,
                found: self.identity,
            });
        }
        Ok(())
    }
}
