// src/signals/names.rs

//! The classic 31 signals, numbered as on Linux, with the abbreviations and
//! descriptions `kill -l` prints.

use nix::sys::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalInfo {
    pub number: i32,
    pub abbrev: &'static str,
    pub description: &'static str,
}

const fn info(number: i32, abbrev: &'static str, description: &'static str) -> SignalInfo {
    SignalInfo {
        number,
        abbrev,
        description,
    }
}

pub const SIGNALS: [SignalInfo; 31] = [
    info(1, "HUP", "Hangup"),
    info(2, "INT", "Interrupt"),
    info(3, "QUIT", "Quit"),
    info(4, "ILL", "Illegal instruction"),
    info(5, "TRAP", "Trace/breakpoint trap"),
    info(6, "ABRT", "Aborted"),
    info(7, "BUS", "Bus error"),
    info(8, "FPE", "Floating point exception"),
    info(9, "KILL", "Killed"),
    info(10, "USR1", "User defined signal 1"),
    info(11, "SEGV", "Segmentation fault"),
    info(12, "USR2", "User defined signal 2"),
    info(13, "PIPE", "Broken pipe"),
    info(14, "ALRM", "Alarm clock"),
    info(15, "TERM", "Terminated"),
    info(16, "STKFLT", "Stack fault"),
    info(17, "CHLD", "Child exited"),
    info(18, "CONT", "Continued"),
    info(19, "STOP", "Stopped (signal)"),
    info(20, "TSTP", "Stopped"),
    info(21, "TTIN", "Stopped (tty input)"),
    info(22, "TTOU", "Stopped (tty output)"),
    info(23, "URG", "Urgent I/O condition"),
    info(24, "XCPU", "CPU time limit exceeded"),
    info(25, "XFSZ", "File size limit exceeded"),
    info(26, "VTALRM", "Virtual timer expired"),
    info(27, "PROF", "Profiling timer expired"),
    info(28, "WINCH", "Window changed"),
    info(29, "IO", "I/O possible"),
    info(30, "PWR", "Power failure"),
    info(31, "SYS", "Bad system call"),
];

/// Resolve a user-supplied signal: a number (`9`) or a name with or without
/// the `SIG` prefix, in any case (`KILL`, `sigkill`).
pub fn lookup(spec: &str) -> Option<Signal> {
    let spec = spec.trim();
    let number = match spec.parse::<i32>() {
        Ok(n) => n,
        Err(_) => {
            let upper = spec.to_ascii_uppercase();
            let name = upper.strip_prefix("SIG").unwrap_or(&upper);
            SIGNALS.iter().find(|s| s.abbrev == name)?.number
        }
    };

    if !(1..=SIGNALS.len() as i32).contains(&number) {
        return None;
    }
    Signal::try_from(number).ok()
}

/// One line of `kill -l` output.
pub fn describe(info: &SignalInfo) -> String {
    format!("{:>2}) SIG{:<7} {}", info.number, info.abbrev, info.description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_accepts_numbers_and_names() {
        assert_eq!(lookup("9"), Some(Signal::SIGKILL));
        assert_eq!(lookup("KILL"), Some(Signal::SIGKILL));
        assert_eq!(lookup("sigterm"), Some(Signal::SIGTERM));
        assert_eq!(lookup("Cont"), Some(Signal::SIGCONT));
        assert_eq!(lookup("0"), None);
        assert_eq!(lookup("64"), None);
        assert_eq!(lookup("BOGUS"), None);
    }

    #[test]
    fn listing_covers_every_signal() {
        let lines: Vec<String> = SIGNALS.iter().map(describe).collect();
        assert_eq!(lines.len(), 31);
        assert_eq!(lines[8], " 9) SIGKILL    Killed");
        assert!(lines[30].starts_with("31) SIGSYS"));
    }
}
