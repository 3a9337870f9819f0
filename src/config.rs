//! Compile-time configuration.
//!
//! All capacities are fixed at compile time — no structure in the
//! scheduler grows at runtime, which is what makes the anti-livelock
//! bound and the ring-buffer arithmetic meaningful.

/// Maximum number of registered task types.
pub const MAX_TASK_TYPES: usize = 10;

/// Maximum number of spawned task instances. The run queue shares this
/// capacity, since an instance appears in it at most once.
pub const MAX_INSTANCES: usize = 10;

/// Maximum command-line length accepted by the shell; further input is
/// dropped.
pub const MAX_COMMAND_LEN: usize = 50;

/// Ticks printed per output line before the scheduler wraps it.
pub const WRAP_AFTER_TICKS: u32 = 8;

/// Per-task share of the queue runner's iteration budget. A queue run
/// over `n` instances is cut off after `n × ITERATIONS_PER_TASK` total
/// ticks (`n` measured once, when the run starts).
pub const ITERATIONS_PER_TASK: u32 = 100;

/// Logical delay between task ticks, in pacing steps.
pub const TICK_PACE_STEPS: u32 = 4;

/// Logical delay between input polls in the shell's line reader.
pub const POLL_PACE_STEPS: u32 = 1;

/// Key that pauses the foreground task.
pub const PAUSE_KEY: char = ' ';

/// Key that cancels a queue run (ESC).
pub const CANCEL_KEY: char = '\x1b';

/// Decoded characters buffered between the keyboard interrupt and the
/// polling loop.
pub const KEY_BUFFER_SIZE: usize = 32;
