// src/orchestrator/signals.rs

//! OS signal identifiers and per-run subscriptions.
//!
//! A [`SignalSet`] is acquired at the start of a run for exactly the signals
//! that have handlers, and dropped when the run returns. Dropping the set
//! releases its streams, so repeated orchestrators in one process don't pile
//! up listeners.
//!
//! Note: once tokio has installed a handler for a signal number, the
//! process-level disposition stays replaced for the lifetime of the process;
//! only delivery to this set stops.

use std::fmt;
use std::future::poll_fn;
use std::str::FromStr;
use std::task::Poll;

use crate::errors::{ExecutorError, Result};

/// An OS signal a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// SIGINT (Ctrl-C).
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
    /// SIGUSR1.
    User1,
    /// SIGUSR2.
    User2,
    /// SIGCHLD.
    Child,
    /// SIGWINCH.
    WindowChange,
    /// Any other signal number.
    Raw(i32),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
            Signal::Hangup => f.write_str("SIGHUP"),
            Signal::Quit => f.write_str("SIGQUIT"),
            Signal::User1 => f.write_str("SIGUSR1"),
            Signal::User2 => f.write_str("SIGUSR2"),
            Signal::Child => f.write_str("SIGCHLD"),
            Signal::WindowChange => f.write_str("SIGWINCH"),
            Signal::Raw(n) => write!(f, "signal {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSignalError(String);

impl fmt::Display for ParseSignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown signal '{}'", self.0)
    }
}

impl std::error::Error for ParseSignalError {}

impl FromStr for Signal {
    type Err = ParseSignalError;

    /// Accepts `INT`, `SIGINT`, `sigint` and raw numbers such as `10`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        let sig = match name {
            "INT" => Signal::Interrupt,
            "TERM" => Signal::Terminate,
            "HUP" => Signal::Hangup,
            "QUIT" => Signal::Quit,
            "USR1" => Signal::User1,
            "USR2" => Signal::User2,
            "CHLD" => Signal::Child,
            "WINCH" => Signal::WindowChange,
            other => match other.parse::<i32>() {
                Ok(n) if n > 0 => Signal::Raw(n),
                _ => return Err(ParseSignalError(s.to_string())),
            },
        };
        Ok(sig)
    }
}

#[cfg(unix)]
mod imp {
    use tokio::signal::unix::{self, SignalKind};

    use super::Signal;

    impl Signal {
        pub(crate) fn kind(self) -> SignalKind {
            match self {
                Signal::Interrupt => SignalKind::interrupt(),
                Signal::Terminate => SignalKind::terminate(),
                Signal::Hangup => SignalKind::hangup(),
                Signal::Quit => SignalKind::quit(),
                Signal::User1 => SignalKind::user_defined1(),
                Signal::User2 => SignalKind::user_defined2(),
                Signal::Child => SignalKind::child(),
                Signal::WindowChange => SignalKind::window_change(),
                Signal::Raw(n) => SignalKind::from_raw(n),
            }
        }
    }

    pub(super) type Stream = unix::Signal;

    pub(super) fn subscribe(sig: Signal) -> std::io::Result<Stream> {
        unix::signal(sig.kind())
    }
}

#[cfg(windows)]
mod imp {
    use tokio::signal::windows;

    use super::Signal;

    pub(super) type Stream = windows::CtrlC;

    /// Only Ctrl-C maps onto a console event on Windows.
    pub(super) fn subscribe(sig: Signal) -> std::io::Result<Stream> {
        match sig {
            Signal::Interrupt => windows::ctrl_c(),
            other => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("{other} is not available on this platform"),
            )),
        }
    }
}

/// Live subscriptions for one run.
#[derive(Debug)]
pub struct SignalSet {
    streams: Vec<(Signal, imp::Stream)>,
}

impl SignalSet {
    /// Subscribe to every signal in `signals`. An empty input yields a set
    /// that never fires.
    pub fn subscribe<I>(signals: I) -> Result<Self>
    where
        I: IntoIterator<Item = Signal>,
    {
        let mut streams = Vec::new();
        for signal in signals {
            let stream = imp::subscribe(signal)
                .map_err(|source| ExecutorError::SignalSubscribe { signal, source })?;
            streams.push((signal, stream));
        }
        Ok(Self { streams })
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.streams.iter().map(|(s, _)| *s)
    }

    /// Wait for the next delivered signal.
    ///
    /// Pending forever when the set is empty. Cancel-safe.
    pub async fn recv(&mut self) -> Signal {
        poll_fn(|cx| {
            for (signal, stream) in self.streams.iter_mut() {
                // `None` means the driver is gone; treat that stream as silent.
                if let Poll::Ready(Some(())) = stream.poll_recv(cx) {
                    return Poll::Ready(*signal);
                }
            }
            Poll::Pending
        })
        .await
    }
}
