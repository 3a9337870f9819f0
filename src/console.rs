//! Platform seam between the core and the outside world.
//!
//! The scheduler and shell only ever touch the [`Console`] trait: key
//! polling, one-character output, and logical pacing. The boot binary
//! plugs in [`crate::arch::KernelConsole`]; tests plug in a scripted
//! mock. Nothing in the core knows about UARTs, scancodes, or timers.

/// Character I/O and pacing as the cooperative loop needs them.
///
/// `key_pending` must never block. `read_key` may block and is only
/// called when a key is wanted (after a positive `key_pending`, or in
/// the shell's line-read loop). `pace` is a logical delay counted in
/// scheduler steps, not wall-clock time.
pub trait Console {
    fn key_pending(&mut self) -> bool;
    fn read_key(&mut self) -> char;
    fn emit(&mut self, c: char);
    fn pace(&mut self, steps: u32);

    fn puts(&mut self, s: &str) {
        for c in s.chars() {
            self.emit(c);
        }
    }
}

#[cfg(test)]
pub use mock::MockConsole;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puts_emits_every_character() {
        let mut con = MockConsole::new("");
        con.puts("ab c");
        assert_eq!(con.output(), "ab c");
    }

    #[test]
    fn scripted_keys_drain_in_order() {
        let mut con = MockConsole::new("xy");
        assert!(con.key_pending());
        assert_eq!(con.read_key(), 'x');
        assert_eq!(con.read_key(), 'y');
        assert!(!con.key_pending());
        con.push_key('z');
        assert!(con.key_pending());
    }
}
