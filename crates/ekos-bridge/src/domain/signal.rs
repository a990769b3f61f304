//! Process signals that trigger shutdown.
//!
//! SIGKILL cannot be intercepted, so the set is fixed to the three signals a
//! supervisor normally sends.

use std::fmt;

/// A signal that starts the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Hangup,
    Interrupt,
    Terminate,
}

impl Signal {
    /// Numeric signal value.
    pub const fn value(self) -> i32 {
        match self {
            Signal::Hangup => 1,
            Signal::Interrupt => 2,
            Signal::Terminate => 15,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Signal::Hangup => "SIGHUP",
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
        }
    }

    /// Exit status reported after a signal-triggered shutdown: `128 + value`.
    pub const fn exit_code(self) -> i32 {
        128 + self.value()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
