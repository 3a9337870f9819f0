//! Task model for the cooperative scheduler.
//!
//! A *task type* is a registered program kind with a fixed per-tick
//! behavior. A *task instance* (see [`instance`]) is an independently
//! stateful spawn of a type. Types live in the fixed [`TypeRegistry`],
//! populated once at boot and read-only afterwards.

pub mod instance;
pub mod queue;
pub mod scheduler;

use alloc::format;

use crate::config::MAX_TASK_TYPES;
use crate::console::Console;
use instance::Instance;

/// Lifecycle state of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Initial state; also the result of `stop`. Eligible for `run`.
    Stopped,
    /// Executing in the foreground (or mid-tick in the queue runner).
    Running,
    /// Suspended by the pause key; eligible for `run` (resume).
    Paused,
    /// Waiting in the round-robin run queue.
    Queued,
}

impl core::fmt::Display for TaskState {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        // f.pad so `ps` column widths apply.
        f.pad(match self {
            TaskState::Stopped => "STOPPED",
            TaskState::Running => "RUNNING",
            TaskState::Paused => "PAUSED",
            TaskState::Queued => "QUEUED",
        })
    }
}

/// Built-in program behaviors.
///
/// A closed enumeration instead of raw function pointers: every variant
/// is matched exhaustively in [`Program::tick`], and a `TaskType` can
/// never carry an uninitialized jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    /// Odd counter: a counter of 0 initializes to 1, then steps by 2.
    Odd,
    /// Even counter: starts at 0, steps by 2.
    Even,
    /// Plain counter: steps by 1.
    Count,
}

impl Program {
    /// Execute one tick on `inst`: print the instance's id and counter,
    /// then advance the counter by the type-specific step.
    ///
    /// Only the acting instance's own counter is touched.
    pub fn tick(&self, inst: &mut Instance, con: &mut dyn Console) {
        match self {
            Program::Odd => {
                if inst.counter == 0 {
                    inst.counter = 1;
                }
                con.puts(&format!("ODD#{}: {} ", inst.id, inst.counter));
                inst.counter += 2;
            }
            Program::Even => {
                con.puts(&format!("EVEN#{}: {} ", inst.id, inst.counter));
                inst.counter += 2;
            }
            Program::Count => {
                con.puts(&format!("TEST#{}[{}] ", inst.id, inst.counter));
                inst.counter += 1;
            }
        }
    }
}

/// A registered program kind. Immutable after registration.
#[derive(Debug, Clone, Copy)]
pub struct TaskType {
    pub id: usize,
    pub name: &'static str,
    pub program: Program,
}

/// Fixed catalog of task types. Registration past capacity is silently
/// dropped; nothing is ever removed or mutated.
pub struct TypeRegistry {
    types: [Option<TaskType>; MAX_TASK_TYPES],
    count: usize,
}

impl TypeRegistry {
    pub const fn new() -> Self {
        TypeRegistry {
            types: [None; MAX_TASK_TYPES],
            count: 0,
        }
    }

    /// Append a new type while capacity remains.
    pub fn register(&mut self, name: &'static str, program: Program) {
        if self.count < MAX_TASK_TYPES {
            self.types[self.count] = Some(TaskType {
                id: self.count,
                name,
                program,
            });
            self.count += 1;
        }
    }

    /// Linear scan, first exact (case-sensitive) match.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.iter().find(|t| t.name == name).map(|t| t.id)
    }

    pub fn get(&self, id: usize) -> Option<&TaskType> {
        self.types.get(id).and_then(|slot| slot.as_ref())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskType> {
        self.types.iter().filter_map(|slot| slot.as_ref())
    }
}

/// Scheduler and shell operation errors.
///
/// All of these are reported to the user and absorbed; none are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Unknown type name or out-of-range instance id.
    NotFound,
    /// Non-numeric id argument.
    InvalidInput,
    /// Instance pool is full.
    CapacityExceeded,
    /// Redundant start/resume/queue on an active instance.
    AlreadyActive,
    /// Anti-livelock cutoff hit during queue execution.
    IterationBudgetExceeded,
    /// User-initiated interruption.
    Cancelled,
}

impl core::fmt::Display for SchedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            SchedError::NotFound => write!(f, "not found"),
            SchedError::InvalidInput => write!(f, "invalid id"),
            SchedError::CapacityExceeded => write!(f, "capacity reached"),
            SchedError::AlreadyActive => write!(f, "already active"),
            SchedError::IterationBudgetExceeded => write!(f, "maximum iterations reached"),
            SchedError::Cancelled => write!(f, "cancelled"),
        }
    }
}
