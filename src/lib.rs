//! TaskOS — a single-core cooperative task scheduler behind a minimal
//! interactive shell, for a freestanding x86_64 environment.
//!
//! Program *types* are registered once at boot; the shell spawns
//! independently stateful *instances* of them, runs one interactively
//! with pause/resume, or enqueues many for round-robin execution with a
//! bounded-iteration safety cutoff.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  Shell (shell.rs)                       │
//! │   read_line · dispatch · help/ls/ps/clear               │
//! ├────────────────────────────────────────────────────────┤
//! │           Scheduler (task/scheduler.rs)                 │
//! │   Mode: Shell | Foreground(id) | QueueRunning           │
//! │   one unit of work per step · anti-livelock budget      │
//! ├──────────────┬─────────────────────┬───────────────────┤
//! │ TypeRegistry │   InstanceStore     │     RunQueue      │
//! │ task/mod.rs  │   task/instance.rs  │   task/queue.rs   │
//! ├──────────────┴─────────────────────┴───────────────────┤
//! │        Console trait (console.rs) — platform seam       │
//! ├────────────────────────────────────────────────────────┤
//! │  arch/ · serial · keyboard · memory  (x86_64 hardware)  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything above the console seam is pure logic and is exercised by
//! host-run unit tests against a scripted mock console.

#![no_std]
#![cfg_attr(target_os = "none", feature(abi_x86_interrupt))]

extern crate alloc;

// The hardware layer only exists on the bare target; everything else
// compiles (and is tested) on the host.
#[cfg(target_os = "none")]
pub mod arch;
pub mod config;
pub mod console;
pub mod keyboard;
#[cfg(target_os = "none")]
pub mod memory;
#[cfg(target_os = "none")]
pub mod serial;
pub mod shell;
pub mod task;
