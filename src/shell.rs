//! Interactive shell: prompt, line editing, and command dispatch.
//!
//! The grammar is a single word, optionally followed by one argument
//! string. Every failure is reported as one line and absorbed; nothing
//! here can take the system down.

use alloc::format;
use alloc::string::String;

use crate::config::{MAX_COMMAND_LEN, POLL_PACE_STEPS};
use crate::console::Console;
use crate::task::scheduler::{RunKind, Scheduler};
use crate::task::SchedError;

/// Read one full line at the prompt, cooperatively.
///
/// Characters echo as typed; backspace erases; Enter terminates the
/// line. The poll loop never blocks — between polls it pauses for a
/// short logical delay.
pub fn read_line<C: Console>(con: &mut C) -> String {
    con.puts("\r\nOS> ");
    let mut line = String::new();
    loop {
        if !con.key_pending() {
            con.pace(POLL_PACE_STEPS);
            continue;
        }
        match con.read_key() {
            '\r' | '\n' => {
                con.puts("\r\n");
                return line;
            }
            '\x08' | '\x7f' => {
                if line.pop().is_some() {
                    con.puts("\x08 \x08");
                }
            }
            c if (' '..='~').contains(&c) => {
                if line.len() < MAX_COMMAND_LEN {
                    line.push(c);
                    con.emit(c);
                }
            }
            _ => {}
        }
    }
}

/// Split a line into the command word and the (possibly empty) argument.
fn split(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    }
}

/// Parse a decimal instance id.
fn parse_id(arg: &str) -> Result<usize, SchedError> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SchedError::InvalidInput);
    }
    arg.parse().map_err(|_| SchedError::InvalidInput)
}

fn report<C: Console>(con: &mut C, err: SchedError) {
    con.puts(&format!("{}\r\n", err));
}

/// Execute one command line against the scheduler state.
pub fn dispatch<C: Console>(sched: &mut Scheduler, con: &mut C, line: &str) {
    let (cmd, arg) = split(line);
    match cmd {
        "" => {}
        "help" => help(con),
        "ls" => ls(sched, con),
        "ps" => ps(sched, con),
        "clear" => con.puts("\x1b[2J\x1b[H"),
        "create" => match sched.create_instance(arg) {
            Ok(id) => {
                let name = sched.store.get(id).map(|i| i.name.as_str()).unwrap_or("?");
                con.puts(&format!("Created '{}' (id {})\r\n", name, id));
                con.puts(&format!("[SCHED] Spawned {} (id {})\r\n", name, id));
            }
            Err(err) => report(con, err),
        },
        "run" => match parse_id(arg).and_then(|id| sched.run_instance(id).map(|k| (id, k))) {
            Ok((id, kind)) => {
                let name = sched.store.get(id).map(|i| i.name.as_str()).unwrap_or("?");
                let verb = match kind {
                    RunKind::Started => "Started",
                    RunKind::Resumed => "Resumed",
                };
                con.puts(&format!("{} '{}'. Press SPACE to pause.\r\n", verb, name));
            }
            Err(err) => report(con, err),
        },
        "stop" => match parse_id(arg).and_then(|id| sched.stop_instance(id).map(|_| id)) {
            Ok(id) => {
                let name = sched.store.get(id).map(|i| i.name.as_str()).unwrap_or("?");
                con.puts(&format!("Stopped '{}'\r\n", name));
            }
            Err(err) => report(con, err),
        },
        "queue" => match parse_id(arg).and_then(|id| sched.queue_instance(id).map(|_| id)) {
            Ok(id) => {
                let name = sched.store.get(id).map(|i| i.name.as_str()).unwrap_or("?");
                con.puts(&format!("Queued '{}'\r\n", name));
            }
            Err(err) => report(con, err),
        },
        "runqueue" => match sched.start_queue_run() {
            Some(n) => {
                con.puts(&format!(
                    "Running {} queued task(s). Press ESC to cancel.\r\n",
                    n
                ));
                con.puts(&format!("[SCHED] Starting queue run with {} task(s)\r\n", n));
            }
            None => con.puts("queue is empty\r\n"),
        },
        "stopqueue" => {
            if sched.cancel_queue_run() {
                con.puts("Queue execution cancelled.\r\n");
            } else {
                con.puts("queue is not running\r\n");
            }
        }
        _ => con.puts(&format!(
            "Unknown command: '{}'. Type 'help' for available commands.\r\n",
            cmd
        )),
    }
}

fn help<C: Console>(con: &mut C) {
    con.puts("Available commands:\r\n");
    con.puts("  help            - Show this help\r\n");
    con.puts("  ls              - List registered program types\r\n");
    con.puts("  create <type>   - Spawn an instance of a type\r\n");
    con.puts("  run <id>        - Start or resume an instance\r\n");
    con.puts("  stop <id>       - Stop an instance (dequeues it)\r\n");
    con.puts("  queue <id>      - Enqueue an instance for round-robin\r\n");
    con.puts("  runqueue        - Run all queued instances\r\n");
    con.puts("  stopqueue       - Cancel queue execution\r\n");
    con.puts("  ps              - List instances\r\n");
    con.puts("  clear           - Clear screen\r\n");
}

fn ls(sched: &Scheduler, con: &mut impl Console) {
    con.puts("Available programs:\r\n");
    for ty in sched.registry.iter() {
        con.puts(&format!("  {}\r\n", ty.name));
    }
}

fn ps(sched: &Scheduler, con: &mut impl Console) {
    if sched.store.is_empty() {
        con.puts("No instances\r\n");
        return;
    }
    con.puts("Instances:\r\n");
    for inst in sched.store.iter() {
        let mut line = format!(
            "  {:>2}  {:<12} {:<8} counter={}",
            inst.id, inst.name, inst.state, inst.counter
        );
        if let Some(pos) = inst.queue_position {
            line.push_str(&format!("  queue_slot={}", pos));
        }
        line.push_str("\r\n");
        con.puts(&line);
    }
}
