use std::sync::{Arc, Mutex};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use pssh::signals::Signaller;

/// One recorded delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalCall {
    Process(Pid, Signal),
    Group(Pid, Signal),
}

/// A signaller that records deliveries instead of making them.
///
/// - `failing_with` makes every delivery fail with that errno (nothing is
///   recorded).
/// - Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSignaller {
    calls: Arc<Mutex<Vec<SignalCall>>>,
    fail_with: Option<Errno>,
}

impl RecordingSignaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(errno: Errno) -> Self {
        Self {
            calls: Arc::default(),
            fail_with: Some(errno),
        }
    }

    pub fn calls(&self) -> Vec<SignalCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: SignalCall) -> nix::Result<()> {
        if let Some(errno) = self.fail_with {
            return Err(errno);
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Signaller for RecordingSignaller {
    fn signal_process(&mut self, pid: Pid, signal: Signal) -> nix::Result<()> {
        self.record(SignalCall::Process(pid, signal))
    }

    fn signal_group(&mut self, pgid: Pid, signal: Signal) -> nix::Result<()> {
        self.record(SignalCall::Group(pgid, signal))
    }
}
