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

    interrupt.rs

    Interrupt latch shared by devices that can request an interrupt from the
    bus. A latch holds a pending flag and the message word delivered to the
    CPU when the bus accepts the request.

*/

/// A message of zero means no interrupt has been configured and is never dispatched.
pub const NO_INTERRUPT_MSG: u16 = 0x0000;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InterruptLatch {
    pending: bool,
    message: u16,
}

impl InterruptLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.pending = false;
        self.message = NO_INTERRUPT_MSG;
    }

    #[inline]
    pub fn message(&self) -> u16 {
        self.message
    }

    #[inline]
    pub fn set_message(&mut self, message: u16) {
        self.message = message;
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[inline]
    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    /// Arm the latch. The request is only visible to the bus if a message is configured.
    #[inline]
    pub fn raise(&mut self) {
        self.pending = true;
    }

    /// Return the message to deliver, if the latch is pending with a non-zero message.
    #[inline]
    pub fn poll(&self) -> Option<u16> {
        if self.pending && self.message != NO_INTERRUPT_MSG {
            Some(self.message)
        }
        else {
            None
        }
    }

    /// Acknowledge the request. The message is kept for the next request.
    #[inline]
    pub fn ack(&mut self) {
        self.pending = false;
    }
}
