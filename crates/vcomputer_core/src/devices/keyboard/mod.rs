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

    devices::keyboard::mod.rs

    Implementation of the generic Western/Latin keyboard.

    The keyboard keeps a small buffer of key events. The CPU pulls events
    out of the buffer one at a time through the PULL_KEY command, and can
    push synthetic events back with PUSH_KEY. New events are inserted at
    the front of the buffer and pulled from the back, so events come out
    in the order they went in.

*/

mod keyevent;

pub use keyevent::*;

use arraydeque::{ArrayDeque, Saturating};
use strum_macros::{Display, FromRepr};

use crate::{
    device_traits::*,
    interrupt::InterruptLatch,
    registers::RegisterBlock,
    snapshot::{DeviceSnapshot, PropertyValue, SnapshotError},
};

/// Maximum number of key events held by the keyboard buffer.
pub const BSIZE: usize = 64;

pub const KEYBOARD_IDENTITY: DeviceIdentity = DeviceIdentity {
    dev_type:    0x03, // HID
    dev_subtype: 0x01, // Western/Latin keyboard
    dev_id:      0x0001,
    vendor_id:   0x0000_0000,
};

const PROP_INT_MSG: &str = "int_msg";
const PROP_DO_INT: &str = "do_int";
const PROP_KEYBUFFER: &str = "keybuffer";

type KeyBuffer = ArrayDeque<KeyEvent, BSIZE, Saturating>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, FromRepr)]
#[repr(u16)]
pub enum KeyboardCommand {
    ClrBuffer = 0x0000,
    PullKey = 0x0001,
    PushKey = 0x0002,
    SetInt = 0x0003,
}

#[derive(Clone, Debug)]
pub struct GKeyboard {
    regs: RegisterBlock,
    keybuffer: KeyBuffer,
    int: InterruptLatch,
}

impl Default for GKeyboard {
    fn default() -> Self {
        Self {
            regs: RegisterBlock::default(),
            keybuffer: KeyBuffer::new(),
            int: InterruptLatch::new(),
        }
    }
}

impl GKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key event captured from the host keyboard and signal the CPU if an
    /// interrupt message is configured. Returns false if the buffer was full and the
    /// event was dropped.
    pub fn send_key_event(&mut self, scancode: u16, keycode: u8, status: u8) -> bool {
        let event = KeyEvent::pack(scancode, keycode as u16, status as u16);
        if !self.push_event(event) {
            log::debug!("Keyboard buffer full, dropping key event {:08X}", event.to_word());
            return false;
        }
        if self.int.message() != 0 {
            self.int.raise();
        }
        true
    }

    /// Number of events waiting in the buffer.
    pub fn key_count(&self) -> usize {
        self.keybuffer.len()
    }

    pub fn is_buffer_full(&self) -> bool {
        self.keybuffer.is_full()
    }

    /// Iterate the buffered events, oldest first.
    pub fn pending_events(&self) -> impl Iterator<Item = KeyEvent> + '_ {
        self.keybuffer.iter().rev().copied()
    }

    pub fn int_msg(&self) -> u16 {
        self.int.message()
    }

    fn push_event(&mut self, event: KeyEvent) -> bool {
        self.keybuffer.push_front(event).is_ok()
    }

    fn pull_event(&mut self) -> Option<KeyEvent> {
        self.keybuffer.pop_back()
    }

    fn handle_pull_key(&mut self) {
        match self.pull_event() {
            Some(event) => {
                self.regs.c = event.status() as u16;
                self.regs.b = event.scancode();
                self.regs.a = event.keycode() as u16;
            }
            None => {
                self.regs.a = 0;
                self.regs.b = 0;
                self.regs.c = 0;
            }
        }
    }

    fn handle_push_key(&mut self) {
        let event = KeyEvent::pack(self.regs.b, self.regs.a, self.regs.c);
        if !self.push_event(event) {
            log::trace!("PUSH_KEY with full buffer, event {:08X} dropped", event.to_word());
        }
    }
}

impl Resettable for GKeyboard {
    fn reset(&mut self) {
        self.regs.clear();
        self.keybuffer.clear();
        self.int.clear();
    }
}

impl CommandTarget for GKeyboard {
    fn identity(&self) -> DeviceIdentity {
        KEYBOARD_IDENTITY
    }

    fn registers(&self) -> &RegisterBlock {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut RegisterBlock {
        &mut self.regs
    }

    fn send_cmd(&mut self, cmd: u16) {
        let Some(command) = KeyboardCommand::from_repr(cmd)
        else {
            log::trace!("Keyboard: ignoring unknown command {:04X}", cmd);
            return;
        };
        log::trace!("Keyboard: {}", command);

        match command {
            KeyboardCommand::ClrBuffer => self.keybuffer.clear(),
            KeyboardCommand::PullKey => self.handle_pull_key(),
            KeyboardCommand::PushKey => self.handle_push_key(),
            KeyboardCommand::SetInt => self.int.set_message(self.regs.a),
        }
    }
}

impl InterruptSource for GKeyboard {
    fn does_interrupt(&self) -> Option<u16> {
        self.int.poll()
    }

    fn iack(&mut self) {
        self.int.ack();
    }
}

impl Snapshotable for GKeyboard {
    fn get_state(&self) -> DeviceSnapshot {
        let mut state = base_state(self);

        state.set_property(PROP_INT_MSG, PropertyValue::Int(self.int.message() as u32));
        state.set_property(PROP_DO_INT, PropertyValue::Bool(self.int.is_pending()));
        // Front to back, newest event first.
        state.set_property(
            PROP_KEYBUFFER,
            PropertyValue::DWords(self.keybuffer.iter().map(|ev| ev.to_word()).collect()),
        );
        state
    }

    fn set_state(&mut self, state: &DeviceSnapshot) -> Result<(), SnapshotError> {
        restore_base_state(self, state)?;

        for (name, value) in state.properties() {
            match (name, value) {
                (PROP_INT_MSG, PropertyValue::Int(msg)) => self.int.set_message(*msg as u16),
                (PROP_DO_INT, PropertyValue::Bool(pending)) => self.int.set_pending(*pending),
                (PROP_KEYBUFFER, value) => match value.to_dwords() {
                    Some(words) => {
                        self.keybuffer.clear();
                        for word in words {
                            if self.keybuffer.push_back(KeyEvent::from_word(word)).is_err() {
                                log::warn!("Keyboard snapshot holds more than {} events, truncating", BSIZE);
                                break;
                            }
                        }
                    }
                    None => log_bad_property(name, value),
                },
                (PROP_INT_MSG | PROP_DO_INT, _) => log_bad_property(name, value),
                _ => {}
            }
        }

        log::debug!("Keyboard state restored: {} buffered events", self.keybuffer.len());
        Ok(())
    }
}

fn log_bad_property(name: &str, value: &PropertyValue) {
    log::warn!("Ignoring snapshot property '{}' with unexpected type {}", name, value.kind());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(kb: &mut GKeyboard, keycode: u16, scancode: u16, status: u16) {
        kb.registers_mut().a = keycode;
        kb.registers_mut().b = scancode;
        kb.registers_mut().c = status;
        kb.send_cmd(KeyboardCommand::PushKey as u16);
    }

    fn pull(kb: &mut GKeyboard) -> (u16, u16, u16) {
        kb.send_cmd(KeyboardCommand::PullKey as u16);
        let regs = kb.registers();
        (regs.a, regs.b, regs.c)
    }

    #[test]
    fn push_then_pull_returns_same_triple() {
        let mut kb = GKeyboard::new();
        push(&mut kb, 0x41, 0x001E, 0x02);

        kb.registers_mut().clear();
        assert_eq!(pull(&mut kb), (0x41, 0x001E, 0x02));
        assert_eq!(kb.key_count(), 0);
    }

    #[test]
    fn pulls_are_fifo_relative_to_pushes() {
        let mut kb = GKeyboard::new();
        for i in 0..BSIZE as u16 {
            push(&mut kb, i & 0xFF, 0x100 + i, i & 7);
        }
        assert!(kb.is_buffer_full());

        for i in 0..BSIZE as u16 {
            assert_eq!(pull(&mut kb), (i & 0xFF, 0x100 + i, i & 7));
        }
        assert_eq!(kb.key_count(), 0);
    }

    #[test]
    fn push_on_full_buffer_drops_newest() {
        let mut kb = GKeyboard::new();
        for i in 0..BSIZE as u16 {
            push(&mut kb, 0x20, i, 0);
        }
        push(&mut kb, 0x21, 0xFFFF, 0);
        assert_eq!(kb.key_count(), BSIZE);
        // Registers are not touched by a dropped push
        assert_eq!(kb.registers().b, 0xFFFF);

        assert!(kb.pending_events().all(|ev| ev.scancode() != 0xFFFF));
        assert_eq!(kb.pending_events().next().map(|ev| ev.scancode()), Some(0));
        assert!(!kb.send_key_event(0x0001, 0x1B, 0));
        assert_eq!(kb.key_count(), BSIZE);
    }

    #[test]
    fn pull_on_empty_zeroes_registers() {
        let mut kb = GKeyboard::new();
        kb.registers_mut().a = 0x1234;
        kb.registers_mut().b = 0x5678;
        kb.registers_mut().c = 0x0007;
        kb.registers_mut().d = 0x00DD;
        assert_eq!(pull(&mut kb), (0, 0, 0));
        assert_eq!(kb.registers().d, 0x00DD);
    }

    #[test]
    fn clear_buffer_empties_queue() {
        let mut kb = GKeyboard::new();
        push(&mut kb, 0x41, 0x1E, 0);
        push(&mut kb, 0x42, 0x30, 0);
        kb.send_cmd(KeyboardCommand::ClrBuffer as u16);
        assert_eq!(kb.key_count(), 0);
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let mut kb = GKeyboard::new();
        push(&mut kb, 0x41, 0x1E, 1);
        let regs = *kb.registers();
        kb.send_cmd(0x0004);
        kb.send_cmd(0xFFFF);
        assert_eq!(*kb.registers(), regs);
        assert_eq!(kb.key_count(), 1);
    }

    #[test]
    fn key_event_raises_interrupt_when_configured() {
        let mut kb = GKeyboard::new();
        kb.send_key_event(0x001E, 0x61, 0);
        assert_eq!(kb.does_interrupt(), None);

        kb.registers_mut().a = 0x0020;
        kb.send_cmd(KeyboardCommand::SetInt as u16);
        assert_eq!(kb.int_msg(), 0x0020);
        assert_eq!(kb.does_interrupt(), None);

        kb.send_key_event(0x0030, 0x62, KEY_STATUS_SHIFT);
        assert_eq!(kb.does_interrupt(), Some(0x0020));
        kb.iack();
        assert_eq!(kb.does_interrupt(), None);
        assert_eq!(kb.int_msg(), 0x0020);

        // Host events come out in arrival order
        assert_eq!(pull(&mut kb), (0x61, 0x001E, 0));
        assert_eq!(pull(&mut kb), (0x62, 0x0030, KEY_STATUS_SHIFT as u16));
    }

    #[test]
    fn zero_message_never_interrupts() {
        let mut kb = GKeyboard::new();
        kb.registers_mut().a = 0;
        kb.send_cmd(KeyboardCommand::SetInt as u16);
        let mut state = kb.get_state();
        state.set_property(PROP_DO_INT, PropertyValue::Bool(true));
        kb.set_state(&state).unwrap();
        assert_eq!(kb.does_interrupt(), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut kb = GKeyboard::new();
        kb.registers_mut().a = 0x0011;
        kb.send_cmd(KeyboardCommand::SetInt as u16);
        kb.send_key_event(0x1E, 0x61, 0);
        kb.reset();

        assert_eq!(*kb.registers(), RegisterBlock::default());
        assert_eq!(kb.key_count(), 0);
        assert_eq!(kb.int_msg(), 0);
        assert_eq!(kb.does_interrupt(), None);
    }

    #[test]
    fn snapshot_round_trip() {
        let mut kb = GKeyboard::new();
        kb.registers_mut().a = 0x0033;
        kb.send_cmd(KeyboardCommand::SetInt as u16);
        push(&mut kb, 0x41, 0x001E, 0x02);
        push(&mut kb, 0x42, 0x0030, 0x00);
        kb.send_key_event(0x002E, 0x43, KEY_STATUS_ALT);
        kb.registers_mut().e = 0xABCD;

        let state = kb.get_state();
        assert_eq!(
            state.property(PROP_KEYBUFFER),
            Some(&PropertyValue::DWords(vec![0x0443_002E, 0x0042_0030, 0x0241_001E]))
        );

        let mut restored = GKeyboard::new();
        restored.reset();
        restored.set_state(&state).unwrap();

        assert_eq!(restored.registers(), kb.registers());
        assert_eq!(restored.does_interrupt(), Some(0x0033));
        assert_eq!(restored.get_state(), state);
        assert_eq!(pull(&mut restored), (0x41, 0x001E, 0x02));
        assert_eq!(pull(&mut restored), (0x42, 0x0030, 0x00));
        assert_eq!(pull(&mut restored), (0x43, 0x002E, KEY_STATUS_ALT as u16));
    }

    #[test]
    fn restore_accepts_legacy_raw_keybuffer() {
        let mut state = GKeyboard::new().get_state();
        let mut raw = Vec::new();
        raw.extend_from_slice(&0x0042_0030u32.to_le_bytes());
        raw.extend_from_slice(&0x0241_001Eu32.to_le_bytes());
        state.set_property(PROP_KEYBUFFER, PropertyValue::Raw(raw));

        let mut kb = GKeyboard::new();
        kb.set_state(&state).unwrap();
        assert_eq!(pull(&mut kb), (0x41, 0x001E, 0x02));
        assert_eq!(pull(&mut kb), (0x42, 0x0030, 0x00));
    }

    #[test]
    fn restore_ignores_unknown_and_keeps_missing() {
        let mut kb = GKeyboard::new();
        kb.registers_mut().a = 0x0099;
        kb.send_cmd(KeyboardCommand::SetInt as u16);
        push(&mut kb, 0x41, 0x001E, 0);

        let mut state = GKeyboard::new().get_state();
        state.remove_property(PROP_INT_MSG);
        state.remove_property(PROP_KEYBUFFER);
        state.set_property("future_feature", PropertyValue::Int(7));
        state.set_property(PROP_DO_INT, PropertyValue::Int(1));

        kb.set_state(&state).unwrap();
        assert_eq!(kb.int_msg(), 0x0099);
        assert_eq!(kb.key_count(), 1);
        assert_eq!(*kb.registers(), RegisterBlock::default());
    }

    #[test]
    fn restore_rejects_foreign_snapshot() {
        let mut kb = GKeyboard::new();
        push(&mut kb, 0x41, 0x001E, 0);
        let regs = *kb.registers();

        let mut foreign = DeviceSnapshot::new(
            DeviceIdentity {
                dev_type: 0x0E,
                ..KEYBOARD_IDENTITY
            },
            RegisterBlock::default(),
        );
        foreign.set_property(PROP_KEYBUFFER, PropertyValue::DWords(vec![]));

        assert!(kb.set_state(&foreign).is_err());
        assert_eq!(*kb.registers(), regs);
        assert_eq!(kb.key_count(), 1);
    }
}
