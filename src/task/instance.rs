//! Task instance pool.
//!
//! Instances are allocated densely from a fixed arena. An instance id is
//! its slot index, stable for the life of the system: slots are never
//! freed or compacted, a stopped instance keeps its slot and can be run
//! again.

use alloc::format;
use alloc::string::String;

use crate::config::MAX_INSTANCES;
use super::{SchedError, TaskState, TaskType};

/// A spawned, independently stateful instance of a task type.
#[derive(Debug)]
pub struct Instance {
    /// Slot index in the store; never reused.
    pub id: usize,
    /// Index of the owning type in the registry.
    pub type_id: usize,
    /// Derived at creation as `"<type-name>_<id>"`; unique and immutable.
    pub name: String,
    pub counter: u32,
    pub state: TaskState,
    /// Ring-buffer slot index; `Some` exactly while `state == Queued`.
    pub queue_position: Option<usize>,
}

/// Bounded pool of task instances.
pub struct InstanceStore {
    slots: [Option<Instance>; MAX_INSTANCES],
    count: usize,
}

impl InstanceStore {
    pub const fn new() -> Self {
        const EMPTY: Option<Instance> = None;
        InstanceStore {
            slots: [EMPTY; MAX_INSTANCES],
            count: 0,
        }
    }

    /// Allocate the next slot for an instance of `ty`.
    ///
    /// New instances start `Stopped` with a zero counter. Fails with
    /// `CapacityExceeded` once the pool is full, leaving it unchanged.
    pub fn create(&mut self, ty: &TaskType) -> Result<usize, SchedError> {
        if self.count >= MAX_INSTANCES {
            return Err(SchedError::CapacityExceeded);
        }
        let id = self.count;
        self.slots[id] = Some(Instance {
            id,
            type_id: ty.id,
            name: format!("{}_{}", ty.name, id),
            counter: 0,
            state: TaskState::Stopped,
            queue_position: None,
        });
        self.count += 1;
        Ok(id)
    }

    pub fn get(&self, id: usize) -> Option<&Instance> {
        self.slots.get(id).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Instance> {
        self.slots.get_mut(id).and_then(|slot| slot.as_mut())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }
}
