use std::sync::{Arc, Mutex};

use nix::unistd::Pid;
use pssh::errors::Result;
use pssh::signals::TerminalControl;

#[derive(Debug)]
struct State {
    owner: Pid,
    handoffs: Vec<Pid>,
}

/// An interactive terminal that exists only in memory.
///
/// Clones share state, so a test can keep one handle and give the other to
/// the code under test.
#[derive(Debug, Clone)]
pub struct FakeTerminal {
    shell_group: Pid,
    state: Arc<Mutex<State>>,
}

impl FakeTerminal {
    pub fn new(shell_group: Pid) -> Self {
        Self {
            shell_group,
            state: Arc::new(Mutex::new(State {
                owner: shell_group,
                handoffs: Vec::new(),
            })),
        }
    }

    pub fn current_owner(&self) -> Pid {
        self.state.lock().unwrap().owner
    }

    /// Every group the terminal was handed to, in order.
    pub fn handoffs(&self) -> Vec<Pid> {
        self.state.lock().unwrap().handoffs.clone()
    }

    pub fn shell_owns(&self) -> bool {
        self.current_owner() == self.shell_group
    }
}

impl TerminalControl for FakeTerminal {
    fn is_interactive(&self) -> bool {
        true
    }

    fn shell_group(&self) -> Pid {
        self.shell_group
    }

    fn owner(&self) -> Option<Pid> {
        Some(self.current_owner())
    }

    fn hand_to(&mut self, pgid: Pid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.owner = pgid;
        state.handoffs.push(pgid);
        Ok(())
    }
}
