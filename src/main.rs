//! TaskOS boot binary.
//!
//! Wires the hardware console into the scheduler and never returns:
//! after initialization the whole system is the cooperative loop in
//! [`taskos::task::scheduler::Scheduler::run`].

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod boot {
    use bootloader_api::config::{BootloaderConfig, Mapping};
    use bootloader_api::{entry_point, BootInfo};
    use core::panic::PanicInfo;

    use taskos::task::scheduler::Scheduler;
    use taskos::{arch, memory, println, serial};

    pub static BOOTLOADER_CONFIG: BootloaderConfig = {
        let mut config = BootloaderConfig::new_default();
        config.mappings.physical_memory = Some(Mapping::Dynamic);
        config
    };

    entry_point!(kernel_main, config = &BOOTLOADER_CONFIG);

    fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
        serial::init();

        println!("TaskOS Shell v0.1.0");
        println!("===================");

        arch::init();
        println!("[OK] CPU initialized");

        memory::init(boot_info);
        println!("[OK] Kernel heap initialized ({} KiB)", memory::HEAP_SIZE / 1024);

        let mut sched = Scheduler::new();
        sched.register_builtins();
        println!("[OK] {} program types registered", sched.registry.len());

        println!("Type 'help' for commands");

        let mut con = arch::KernelConsole;
        sched.run(&mut con)
    }

    /// Panic handler for kernel panics.
    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        println!("\n!!! KERNEL PANIC !!!");
        println!("{}", info);

        loop {
            x86_64::instructions::hlt();
        }
    }
}

/// The kernel image only has meaning on the bare target; a hosted build
/// of this binary is an empty stub so `cargo test` can link it.
#[cfg(not(target_os = "none"))]
fn main() {}
