//! Mode controller and cooperative scheduling loop.
//!
//! All mutable system state — type registry, instance pool, run queue,
//! and the current mode — lives in one owned [`Scheduler`] aggregate.
//! The loop is stepwise: [`Scheduler::step`] performs exactly one unit
//! of work for the current mode and returns, so every iteration yields
//! back to the top level and key polling stays responsive.
//!
//! Modes are mutually exclusive:
//! - `Shell`: read one command line and dispatch it.
//! - `Foreground(id)`: give the one foreground instance a single tick,
//!   checking (edge-triggered) for the pause key first.
//! - `QueueRunning`: execute-then-requeue round-robin over the run
//!   queue, one iteration per step, bounded by the anti-livelock budget
//!   fixed at `runqueue` time.

use alloc::format;

use crate::config::{
    CANCEL_KEY, ITERATIONS_PER_TASK, PAUSE_KEY, TICK_PACE_STEPS, WRAP_AFTER_TICKS,
};
use crate::console::Console;
use crate::shell;

use super::instance::InstanceStore;
use super::queue::RunQueue;
use super::{Program, SchedError, TaskState, TypeRegistry};

/// Process-wide execution mode; exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Reading commands at the prompt.
    Shell,
    /// One instance holds the foreground and ticks once per step.
    Foreground(usize),
    /// The run queue is being driven round-robin.
    QueueRunning,
}

/// Whether `run` started a stopped instance or resumed a paused one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Started,
    Resumed,
}

pub struct Scheduler {
    pub registry: TypeRegistry,
    pub store: InstanceStore,
    pub queue: RunQueue,
    mode: Mode,
    /// Pause-key latch: a key is only consumed on a rising edge of
    /// `key_pending`, one pass after a pass that observed no key.
    key_was_pending: bool,
    /// Ticks printed since the last line break (presentation only).
    ticks_on_line: u32,
    /// Total iterations allowed for the current queue run, fixed at
    /// `runqueue` time as `queue length × ITERATIONS_PER_TASK`.
    queue_budget: u32,
    queue_iterations: u32,
}

impl Scheduler {
    pub const fn new() -> Self {
        Scheduler {
            registry: TypeRegistry::new(),
            store: InstanceStore::new(),
            queue: RunQueue::new(),
            mode: Mode::Shell,
            key_was_pending: false,
            ticks_on_line: 0,
            queue_budget: 0,
            queue_iterations: 0,
        }
    }

    /// Register the built-in program catalog. Called once at boot.
    pub fn register_builtins(&mut self) {
        self.registry.register("odd", Program::Odd);
        self.registry.register("even", Program::Even);
        self.registry.register("test", Program::Count);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    // ─── Dispatcher operations ──────────────────────────────────────

    /// Spawn a new instance of the named type.
    pub fn create_instance(&mut self, type_name: &str) -> Result<usize, SchedError> {
        let type_id = self
            .registry
            .find_by_name(type_name)
            .ok_or(SchedError::NotFound)?;
        let ty = *self.registry.get(type_id).ok_or(SchedError::NotFound)?;
        self.store.create(&ty)
    }

    /// Start a stopped instance, or resume a paused one, as the
    /// foreground task.
    pub fn run_instance(&mut self, id: usize) -> Result<RunKind, SchedError> {
        let state = self.store.get(id).ok_or(SchedError::NotFound)?.state;
        let kind = match state {
            TaskState::Stopped => RunKind::Started,
            TaskState::Paused => RunKind::Resumed,
            TaskState::Running | TaskState::Queued => return Err(SchedError::AlreadyActive),
        };
        if let Some(inst) = self.store.get_mut(id) {
            inst.state = TaskState::Running;
        }
        self.mode = Mode::Foreground(id);
        self.key_was_pending = false;
        self.ticks_on_line = 0;
        Ok(kind)
    }

    /// Stop an instance from any state: dequeue it if queued, reset its
    /// counter, and release the foreground if it held it.
    pub fn stop_instance(&mut self, id: usize) -> Result<(), SchedError> {
        if self.store.get(id).is_none() {
            return Err(SchedError::NotFound);
        }
        self.queue.remove(&mut self.store, id);
        if let Some(inst) = self.store.get_mut(id) {
            inst.counter = 0;
            inst.state = TaskState::Stopped;
        }
        if self.mode == Mode::Foreground(id) {
            self.mode = Mode::Shell;
        }
        Ok(())
    }

    /// Enqueue an instance for round-robin execution.
    pub fn queue_instance(&mut self, id: usize) -> Result<(), SchedError> {
        let state = self.store.get(id).ok_or(SchedError::NotFound)?.state;
        match state {
            TaskState::Stopped | TaskState::Paused => {
                self.queue.enqueue(&mut self.store, id);
                Ok(())
            }
            TaskState::Running | TaskState::Queued => Err(SchedError::AlreadyActive),
        }
    }

    /// Enter queue-runner mode. Returns the number of queued instances,
    /// or `None` when the queue is empty.
    ///
    /// The iteration budget is fixed here, from the queue length as it
    /// is right now; requeueing during the run does not extend it.
    pub fn start_queue_run(&mut self) -> Option<usize> {
        let n = self.queue.len();
        if n == 0 {
            return None;
        }
        self.queue_budget = n as u32 * ITERATIONS_PER_TASK;
        self.queue_iterations = 0;
        self.ticks_on_line = 0;
        self.mode = Mode::QueueRunning;
        Some(n)
    }

    /// Cancel a queue run. Returns false if none was active.
    pub fn cancel_queue_run(&mut self) -> bool {
        if self.mode == Mode::QueueRunning {
            self.mode = Mode::Shell;
            true
        } else {
            false
        }
    }

    // ─── The loop ───────────────────────────────────────────────────

    /// Drive the scheduler forever.
    pub fn run<C: Console>(&mut self, con: &mut C) -> ! {
        loop {
            self.step(con);
        }
    }

    /// Perform one unit of work for the current mode.
    pub fn step<C: Console>(&mut self, con: &mut C) {
        match self.mode {
            Mode::Shell => {
                let line = shell::read_line(con);
                shell::dispatch(self, con, &line);
            }
            Mode::Foreground(id) => self.step_foreground(id, con),
            Mode::QueueRunning => self.step_queue(con),
        }
    }

    fn step_foreground<C: Console>(&mut self, id: usize, con: &mut C) {
        // Rising-edge pause check: a key is read only on the first pass
        // that sees it pending after a pass that saw none.
        let pending = con.key_pending();
        if pending && !self.key_was_pending {
            let key = con.read_key();
            if key == PAUSE_KEY {
                self.key_was_pending = false;
                self.pause_foreground(con);
                return;
            }
        }
        self.key_was_pending = pending;

        match self.store.get(id).map(|inst| inst.state) {
            Some(TaskState::Running) => {}
            // Stopped out from under us; fall back to the shell.
            _ => {
                self.mode = Mode::Shell;
                return;
            }
        }
        self.tick_instance(id, con);
        con.pace(TICK_PACE_STEPS);
    }

    fn step_queue<C: Console>(&mut self, con: &mut C) {
        // Any pending key is consumed; only the cancel key acts.
        if con.key_pending() && con.read_key() == CANCEL_KEY {
            con.puts(&format!("\r\n{}. Returning to shell.\r\n", SchedError::Cancelled));
            self.leave_queue_run(con);
            return;
        }
        if self.queue.is_empty() {
            con.puts("\r\nQueue empty. Returning to shell.\r\n");
            self.leave_queue_run(con);
            return;
        }
        if self.queue_iterations >= self.queue_budget {
            con.puts(&format!(
                "\r\n{}. Returning to shell.\r\n",
                SchedError::IterationBudgetExceeded
            ));
            self.leave_queue_run(con);
            return;
        }

        // Classic round-robin: execute the head once, then requeue it
        // at the tail.
        if let Some(id) = self.queue.dequeue_head(&mut self.store) {
            if let Some(inst) = self.store.get_mut(id) {
                inst.state = TaskState::Running;
            }
            self.tick_instance(id, con);
            self.queue.enqueue(&mut self.store, id);
            con.pace(TICK_PACE_STEPS);
            self.queue_iterations += 1;
        }
    }

    /// Run one tick of the instance's program and wrap the output line
    /// after a fixed number of ticks.
    fn tick_instance<C: Console>(&mut self, id: usize, con: &mut C) {
        let program = self
            .store
            .get(id)
            .and_then(|inst| self.registry.get(inst.type_id))
            .map(|ty| ty.program);
        if let (Some(program), Some(inst)) = (program, self.store.get_mut(id)) {
            program.tick(inst, con);
            self.ticks_on_line += 1;
            if self.ticks_on_line >= WRAP_AFTER_TICKS {
                con.puts("\r\n");
                self.ticks_on_line = 0;
            }
        }
    }

    fn pause_foreground<C: Console>(&mut self, con: &mut C) {
        if let Mode::Foreground(id) = self.mode {
            if let Some(inst) = self.store.get_mut(id) {
                inst.state = TaskState::Paused;
                con.puts(&format!("\r\nPaused '{}'. Returning to shell.\r\n", inst.name));
            }
            self.mode = Mode::Shell;
            self.ticks_on_line = 0;
        }
    }

    fn leave_queue_run<C: Console>(&mut self, con: &mut C) {
        con.puts(&format!(
            "[SCHED] Queue run ended after {} iteration(s)\r\n",
            self.queue_iterations
        ));
        self.mode = Mode::Shell;
        self.ticks_on_line = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use crate::console::MockConsole;

    fn sched_with(type_name: &str, instances: usize) -> Scheduler {
        let mut sched = Scheduler::new();
        sched.register_builtins();
        for _ in 0..instances {
            sched.create_instance(type_name).unwrap();
        }
        sched
    }

    #[test]
    fn create_reports_unknown_type() {
        let mut sched = Scheduler::new();
        sched.register_builtins();
        assert_eq!(sched.create_instance("nope"), Err(SchedError::NotFound));
        assert_eq!(sched.store.len(), 0);
    }

    #[test]
    fn run_rejects_out_of_range_id_without_mutating() {
        let mut sched = sched_with("odd", 2);
        assert_eq!(sched.run_instance(5), Err(SchedError::NotFound));
        assert_eq!(sched.mode(), Mode::Shell);
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Stopped);
        assert_eq!(sched.store.get(1).unwrap().state, TaskState::Stopped);
    }

    #[test]
    fn run_rejects_active_instance() {
        let mut sched = sched_with("odd", 2);
        assert_eq!(sched.run_instance(0), Ok(RunKind::Started));
        assert_eq!(sched.run_instance(0), Err(SchedError::AlreadyActive));
        sched.queue_instance(1).unwrap();
        assert_eq!(sched.run_instance(1), Err(SchedError::AlreadyActive));
    }

    #[test]
    fn foreground_step_ticks_the_running_instance() {
        let mut sched = sched_with("odd", 1);
        let mut con = MockConsole::new("");
        sched.run_instance(0).unwrap();
        sched.step(&mut con);
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().counter, 5);
        assert_eq!(con.output(), "ODD#0: 1 ODD#0: 3 ");
    }

    #[test]
    fn foreground_step_paces_after_each_tick() {
        let mut sched = sched_with("test", 1);
        let mut con = MockConsole::new("");
        sched.run_instance(0).unwrap();
        sched.step(&mut con);
        sched.step(&mut con);
        assert_eq!(con.paced(), 2 * TICK_PACE_STEPS);
    }

    #[test]
    fn foreground_output_wraps_after_fixed_tick_count() {
        let mut sched = sched_with("test", 1);
        let mut con = MockConsole::new("");
        sched.run_instance(0).unwrap();
        for _ in 0..WRAP_AFTER_TICKS {
            sched.step(&mut con);
        }
        assert!(con.output().ends_with("\r\n"));
    }

    #[test]
    fn pause_key_is_edge_triggered() {
        let mut sched = sched_with("odd", 1);
        let mut con = MockConsole::new("x");
        sched.run_instance(0).unwrap();

        // Pass 1: rising edge consumes 'x', which is not the pause key,
        // so the tick still happens and the latch is set.
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().counter, 3);

        // Pass 2: no key pending; the latch falls.
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().counter, 5);

        // Pass 3: the pause key on a fresh rising edge pauses the task
        // before any tick.
        con.push_key(PAUSE_KEY);
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().counter, 5);
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Paused);
        assert_eq!(sched.mode(), Mode::Shell);
        assert!(con.output().contains("Paused 'odd_0'"));
    }

    #[test]
    fn resume_continues_from_paused_counter() {
        let mut sched = sched_with("odd", 1);
        let mut con = MockConsole::new("");
        sched.run_instance(0).unwrap();
        sched.step(&mut con);
        con.push_key(PAUSE_KEY);
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Paused);

        assert_eq!(sched.run_instance(0), Ok(RunKind::Resumed));
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().counter, 5);
    }

    #[test]
    fn stop_then_run_resets_counter_before_first_tick() {
        let mut sched = sched_with("odd", 1);
        let mut con = MockConsole::new("");
        sched.run_instance(0).unwrap();
        sched.step(&mut con);
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().counter, 5);

        sched.stop_instance(0).unwrap();
        assert_eq!(sched.store.get(0).unwrap().counter, 0);
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Stopped);
        assert_eq!(sched.mode(), Mode::Shell);

        assert_eq!(sched.run_instance(0), Ok(RunKind::Started));
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().counter, 3);
    }

    #[test]
    fn stop_dequeues_a_queued_instance() {
        let mut sched = sched_with("test", 3);
        for id in 0..3 {
            sched.queue_instance(id).unwrap();
        }
        sched.stop_instance(1).unwrap();
        assert_eq!(sched.queue.iter().collect::<Vec<_>>(), alloc::vec![0, 2]);
        let inst = sched.store.get(1).unwrap();
        assert_eq!(inst.state, TaskState::Stopped);
        assert_eq!(inst.queue_position, None);
        assert_eq!(inst.counter, 0);
    }

    #[test]
    fn queue_allowed_from_paused() {
        let mut sched = sched_with("odd", 1);
        let mut con = MockConsole::new("");
        sched.run_instance(0).unwrap();
        con.push_key(PAUSE_KEY);
        sched.step(&mut con);
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Paused);
        assert_eq!(sched.queue_instance(0), Ok(()));
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Queued);
    }

    #[test]
    fn queue_rejects_queued_instance() {
        let mut sched = sched_with("test", 1);
        sched.queue_instance(0).unwrap();
        assert_eq!(sched.queue_instance(0), Err(SchedError::AlreadyActive));
    }

    #[test]
    fn round_robin_executes_one_tick_each_in_order() {
        let mut sched = sched_with("test", 3);
        let mut con = MockConsole::new("");
        for id in 0..3 {
            sched.queue_instance(id).unwrap();
        }
        assert_eq!(sched.start_queue_run(), Some(3));

        // One full round: exactly one tick per instance, head-to-tail.
        for _ in 0..3 {
            sched.step(&mut con);
        }
        assert_eq!(con.output(), "TEST#0[0] TEST#1[0] TEST#2[0] ");

        // The queue holds the same set afterwards; nothing was lost.
        let mut ids = sched.queue.iter().collect::<Vec<_>>();
        ids.sort_unstable();
        assert_eq!(ids, alloc::vec![0, 1, 2]);
        for id in 0..3 {
            assert_eq!(sched.store.get(id).unwrap().state, TaskState::Queued);
        }
    }

    #[test]
    fn queue_run_stops_at_iteration_budget() {
        let mut sched = sched_with("test", 1);
        let mut con = MockConsole::new("");
        sched.queue_instance(0).unwrap();
        sched.start_queue_run().unwrap();

        // The budget for one queued instance is ITERATIONS_PER_TASK
        // total ticks; the step after that cancels the run.
        for _ in 0..ITERATIONS_PER_TASK {
            sched.step(&mut con);
            assert_eq!(sched.mode(), Mode::QueueRunning);
        }
        sched.step(&mut con);
        assert_eq!(sched.mode(), Mode::Shell);
        assert!(con.output().contains("maximum iterations reached"));
        assert_eq!(sched.store.get(0).unwrap().counter, ITERATIONS_PER_TASK);
        // The instance is still queued for a later run.
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Queued);
    }

    #[test]
    fn budget_is_fixed_at_start_not_per_round() {
        let mut sched = sched_with("test", 2);
        let mut con = MockConsole::new("");
        sched.queue_instance(0).unwrap();
        sched.queue_instance(1).unwrap();
        sched.start_queue_run().unwrap();

        let budget = 2 * ITERATIONS_PER_TASK;
        for _ in 0..budget {
            sched.step(&mut con);
        }
        sched.step(&mut con);
        assert_eq!(sched.mode(), Mode::Shell);
        // Total ticks across both instances equals the budget, even
        // though each was requeued every round.
        let total: u32 = (0..2)
            .map(|id| sched.store.get(id).unwrap().counter)
            .sum();
        assert_eq!(total, budget);
    }

    #[test]
    fn cancel_key_interrupts_queue_run() {
        let mut sched = sched_with("test", 2);
        let mut con = MockConsole::new("");
        sched.queue_instance(0).unwrap();
        sched.queue_instance(1).unwrap();
        sched.start_queue_run().unwrap();

        sched.step(&mut con);
        con.push_key(CANCEL_KEY);
        sched.step(&mut con);
        assert_eq!(sched.mode(), Mode::Shell);
        assert!(con.output().contains("cancelled"));
        // Instances stay queued so the run can be restarted.
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Queued);
        assert_eq!(sched.store.get(1).unwrap().state, TaskState::Queued);
    }

    #[test]
    fn queue_run_of_two_odd_instances() {
        let mut sched = sched_with("odd", 2);
        let mut con = MockConsole::new("");
        sched.queue_instance(0).unwrap();
        sched.queue_instance(1).unwrap();
        sched.start_queue_run().unwrap();

        // First round: both counters initialize to 1 and step to 3.
        sched.step(&mut con);
        sched.step(&mut con);
        assert_eq!(con.output(), "ODD#0: 1 ODD#1: 1 ");
        assert_eq!(sched.store.get(0).unwrap().counter, 3);
        assert_eq!(sched.store.get(1).unwrap().counter, 3);

        // A later cancel leaves both queued with their progress intact.
        con.push_key(CANCEL_KEY);
        sched.step(&mut con);
        assert_eq!(sched.mode(), Mode::Shell);
        assert_eq!(sched.store.get(0).unwrap().state, TaskState::Queued);
        assert_eq!(sched.store.get(1).unwrap().state, TaskState::Queued);
    }

    #[test]
    fn queue_run_end_is_logged_with_iteration_count() {
        let mut sched = sched_with("test", 1);
        let mut con = MockConsole::new("");
        sched.queue_instance(0).unwrap();
        sched.start_queue_run().unwrap();

        sched.step(&mut con);
        con.push_key(CANCEL_KEY);
        sched.step(&mut con);
        assert!(con
            .output()
            .contains("[SCHED] Queue run ended after 1 iteration(s)"));
    }

    #[test]
    fn empty_queue_run_is_refused() {
        let mut sched = sched_with("test", 1);
        assert_eq!(sched.start_queue_run(), None);
        assert_eq!(sched.mode(), Mode::Shell);
    }
}
