//! Decoded-key buffer between the keyboard IRQ and the polling loop.
//!
//! The interrupt handler pushes decoded characters; the cooperative
//! loop polls and pops them. A small fixed ring — when it overflows
//! (nobody is reading), the newest key is dropped.

use spin::Mutex;

use crate::config::KEY_BUFFER_SIZE;

static BUFFER: Mutex<KeyBuffer> = Mutex::new(KeyBuffer::new());

struct KeyBuffer {
    keys: [char; KEY_BUFFER_SIZE],
    head: usize,
    len: usize,
}

impl KeyBuffer {
    const fn new() -> Self {
        KeyBuffer {
            keys: ['\0'; KEY_BUFFER_SIZE],
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, c: char) {
        if self.len == KEY_BUFFER_SIZE {
            return;
        }
        self.keys[(self.head + self.len) % KEY_BUFFER_SIZE] = c;
        self.len += 1;
    }

    fn pop(&mut self) -> Option<char> {
        if self.len == 0 {
            return None;
        }
        let c = self.keys[self.head];
        self.head = (self.head + 1) % KEY_BUFFER_SIZE;
        self.len -= 1;
        Some(c)
    }
}

/// Called from the keyboard interrupt handler, which already runs with
/// interrupts masked.
pub fn push(c: char) {
    BUFFER.lock().push(c);
}

/// Non-blocking: is at least one key waiting?
pub fn key_pending() -> bool {
    with_buffer(|buf| buf.len > 0)
}

/// Take the oldest buffered key, if any.
pub fn pop() -> Option<char> {
    with_buffer(|buf| buf.pop())
}

// The keyboard IRQ handler takes the same lock. The consumer side must
// mask interrupts while holding it: a handler preempting its own lock
// holder would spin forever on a single core.
#[cfg(target_os = "none")]
fn with_buffer<R>(f: impl FnOnce(&mut KeyBuffer) -> R) -> R {
    x86_64::instructions::interrupts::without_interrupts(|| f(&mut BUFFER.lock()))
}

#[cfg(not(target_os = "none"))]
fn with_buffer<R>(f: impl FnOnce(&mut KeyBuffer) -> R) -> R {
    f(&mut BUFFER.lock())
}
