//! x86_64 architecture layer: CPU setup and the hardware console.

mod idt;
pub mod interrupts;

use crate::console::Console;
use crate::keyboard;
use crate::serial;

/// Initialize CPU structures (IDT, PIC) and enable interrupts.
pub fn init() {
    idt::init();
    interrupts::init_pic();
    interrupts::enable();
}

/// The real-hardware [`Console`]: serial out, IRQ-fed keyboard in,
/// PIT-tick pacing. `hlt` between polls so the CPU sleeps until the
/// next interrupt instead of spinning.
pub struct KernelConsole;

impl Console for KernelConsole {
    fn key_pending(&mut self) -> bool {
        keyboard::key_pending()
    }

    fn read_key(&mut self) -> char {
        loop {
            if let Some(c) = keyboard::pop() {
                return c;
            }
            x86_64::instructions::hlt();
        }
    }

    fn emit(&mut self, c: char) {
        serial::write_char(c);
    }

    fn pace(&mut self, steps: u32) {
        for _ in 0..steps {
            let start = interrupts::ticks();
            while interrupts::ticks() == start {
                x86_64::instructions::hlt();
            }
        }
    }
}
