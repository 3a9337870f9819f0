//! Round-robin run queue.
//!
//! A fixed-capacity ring of instance ids with `head`/`tail` cursors
//! (mod capacity). Capacity equals the instance pool's, and an instance
//! appears at most once, so the ring can never overflow.
//!
//! Membership is O(1): each queued instance records its own ring slot in
//! `queue_position`, and the invariant is that `queue_position` is `Some`
//! exactly for the ids currently between `head` (inclusive) and `tail`
//! (exclusive). Removal from the middle compacts the ring toward `head`,
//! preserving the relative order of everything else.

use crate::config::MAX_INSTANCES;
use super::instance::InstanceStore;
use super::TaskState;

pub struct RunQueue {
    slots: [Option<usize>; MAX_INSTANCES],
    head: usize,
    tail: usize,
    len: usize,
}

impl RunQueue {
    pub const fn new() -> Self {
        RunQueue {
            slots: [None; MAX_INSTANCES],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `id` at the tail and mark the instance `Queued`.
    ///
    /// No-op if the instance is already queued or the id is invalid.
    pub fn enqueue(&mut self, store: &mut InstanceStore, id: usize) {
        let Some(inst) = store.get_mut(id) else {
            return;
        };
        if inst.queue_position.is_some() {
            return;
        }
        let slot = self.tail;
        self.slots[slot] = Some(id);
        self.tail = (self.tail + 1) % MAX_INSTANCES;
        self.len += 1;
        inst.state = TaskState::Queued;
        inst.queue_position = Some(slot);
    }

    /// Remove and return the id at the head, clearing its recorded slot.
    ///
    /// The caller decides the instance's next state (the queue runner
    /// marks it `Running` for the duration of one tick).
    pub fn dequeue_head(&mut self, store: &mut InstanceStore) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let id = self.slots[self.head].take()?;
        self.head = (self.head + 1) % MAX_INSTANCES;
        self.len -= 1;
        if let Some(inst) = store.get_mut(id) {
            inst.queue_position = None;
        }
        Some(id)
    }

    /// Remove `id` from wherever it sits in the ring and mark it
    /// `Stopped`. No-op if the instance is not queued.
    ///
    /// Every element behind the removed slot shifts one slot toward
    /// `head` (wrapping), with its recorded position updated, so the
    /// relative order of the remaining elements is preserved. O(n) over
    /// the small fixed capacity.
    pub fn remove(&mut self, store: &mut InstanceStore, id: usize) {
        let Some(pos) = store.get(id).and_then(|inst| inst.queue_position) else {
            return;
        };
        let mut i = pos;
        loop {
            let next = (i + 1) % MAX_INSTANCES;
            if next == self.tail {
                break;
            }
            self.slots[i] = self.slots[next];
            if let Some(moved) = self.slots[i] {
                if let Some(inst) = store.get_mut(moved) {
                    inst.queue_position = Some(i);
                }
            }
            i = next;
        }
        self.slots[i] = None;
        self.tail = i;
        self.len -= 1;
        if let Some(inst) = store.get_mut(id) {
            inst.queue_position = None;
            inst.state = TaskState::Stopped;
        }
    }

    /// Queued ids in head-to-tail order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % MAX_INSTANCES])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use crate::task::{Program, TaskType};

    fn store_with(n: usize) -> InstanceStore {
        let ty = TaskType {
            id: 0,
            name: "test",
            program: Program::Count,
        };
        let mut store = InstanceStore::new();
        for _ in 0..n {
            store.create(&ty).unwrap();
        }
        store
    }

    fn queued_ids(q: &RunQueue) -> Vec<usize> {
        q.iter().collect()
    }

    /// The set in the ring must equal the set of `Queued` instances, and
    /// each recorded `queue_position` must name the slot holding the id.
    fn check_invariant(q: &RunQueue, store: &InstanceStore) {
        let in_ring: Vec<usize> = queued_ids(q);
        for inst in store.iter() {
            let queued = in_ring.contains(&inst.id);
            assert_eq!(inst.state == TaskState::Queued, queued, "id {}", inst.id);
            assert_eq!(inst.queue_position.is_some(), queued, "id {}", inst.id);
            if let Some(pos) = inst.queue_position {
                assert_eq!(q.slots[pos], Some(inst.id));
            }
        }
    }

    #[test]
    fn enqueue_sets_state_and_position() {
        let mut store = store_with(3);
        let mut q = RunQueue::new();
        q.enqueue(&mut store, 1);
        assert_eq!(q.len(), 1);
        assert_eq!(store.get(1).unwrap().state, TaskState::Queued);
        assert_eq!(store.get(1).unwrap().queue_position, Some(0));
        check_invariant(&q, &store);
    }

    #[test]
    fn enqueue_is_noop_when_already_queued() {
        let mut store = store_with(2);
        let mut q = RunQueue::new();
        q.enqueue(&mut store, 0);
        q.enqueue(&mut store, 0);
        assert_eq!(q.len(), 1);
        check_invariant(&q, &store);
    }

    #[test]
    fn dequeue_returns_head_in_fifo_order() {
        let mut store = store_with(3);
        let mut q = RunQueue::new();
        for id in 0..3 {
            q.enqueue(&mut store, id);
        }
        assert_eq!(q.dequeue_head(&mut store), Some(0));
        assert_eq!(q.dequeue_head(&mut store), Some(1));
        assert_eq!(q.dequeue_head(&mut store), Some(2));
        assert_eq!(q.dequeue_head(&mut store), None);
        assert_eq!(store.get(0).unwrap().queue_position, None);
    }

    #[test]
    fn cursors_wrap_around_the_ring() {
        let mut store = store_with(4);
        let mut q = RunQueue::new();
        // Cycle enough execute-then-requeue rounds to push the cursors
        // past the capacity boundary several times.
        for id in 0..4 {
            q.enqueue(&mut store, id);
        }
        let mut order = Vec::new();
        for _ in 0..3 * MAX_INSTANCES {
            let id = q.dequeue_head(&mut store).unwrap();
            order.push(id);
            q.enqueue(&mut store, id);
        }
        assert_eq!(q.len(), 4);
        // Round-robin order is preserved across every wrap.
        for (i, id) in order.iter().enumerate() {
            assert_eq!(*id, i % 4);
        }
        check_invariant(&q, &store);
    }

    #[test]
    fn remove_middle_preserves_order_and_positions() {
        let mut store = store_with(5);
        let mut q = RunQueue::new();
        for id in 0..5 {
            q.enqueue(&mut store, id);
        }
        q.remove(&mut store, 2);
        assert_eq!(queued_ids(&q), alloc::vec![0, 1, 3, 4]);
        assert_eq!(store.get(2).unwrap().state, TaskState::Stopped);
        assert_eq!(store.get(2).unwrap().queue_position, None);
        check_invariant(&q, &store);
    }

    #[test]
    fn remove_head_and_tail_elements() {
        let mut store = store_with(3);
        let mut q = RunQueue::new();
        for id in 0..3 {
            q.enqueue(&mut store, id);
        }
        q.remove(&mut store, 0);
        assert_eq!(queued_ids(&q), alloc::vec![1, 2]);
        q.remove(&mut store, 2);
        assert_eq!(queued_ids(&q), alloc::vec![1]);
        check_invariant(&q, &store);
    }

    #[test]
    fn remove_is_noop_when_not_queued() {
        let mut store = store_with(2);
        let mut q = RunQueue::new();
        q.enqueue(&mut store, 0);
        q.remove(&mut store, 1);
        assert_eq!(q.len(), 1);
        check_invariant(&q, &store);
    }

    #[test]
    fn remove_across_the_wrap_boundary() {
        let mut store = store_with(4);
        let mut q = RunQueue::new();
        // Advance the cursors so the live range straddles the boundary.
        for id in 0..4 {
            q.enqueue(&mut store, id);
        }
        for _ in 0..MAX_INSTANCES - 2 {
            let id = q.dequeue_head(&mut store).unwrap();
            q.enqueue(&mut store, id);
        }
        let before = queued_ids(&q);
        let victim = before[1];
        q.remove(&mut store, victim);
        let after = queued_ids(&q);
        let expected: Vec<usize> = before.into_iter().filter(|id| *id != victim).collect();
        assert_eq!(after, expected);
        check_invariant(&q, &store);
    }
}
