use std::collections::VecDeque;

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use pssh::signals::{ChildEvent, ChildEventKind, ChildEventSource};

/// Child state changes fed to the reaper in a fixed order.
#[derive(Debug, Default)]
pub struct ScriptedChildEvents {
    events: VecDeque<ChildEvent>,
}

impl ScriptedChildEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exited(mut self, pid: i32) -> Self {
        self.push(pid, ChildEventKind::Exited(0));
        self
    }

    pub fn killed(mut self, pid: i32, signal: Signal) -> Self {
        self.push(pid, ChildEventKind::Signaled(signal));
        self
    }

    pub fn stopped(mut self, pid: i32) -> Self {
        self.push(pid, ChildEventKind::Stopped(Signal::SIGTSTP));
        self
    }

    pub fn continued(mut self, pid: i32) -> Self {
        self.push(pid, ChildEventKind::Continued);
        self
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    fn push(&mut self, pid: i32, kind: ChildEventKind) {
        self.events.push_back(ChildEvent::new(Pid::from_raw(pid), kind));
    }
}

impl ChildEventSource for ScriptedChildEvents {
    fn next_event(&mut self) -> Option<ChildEvent> {
        self.events.pop_front()
    }
}
