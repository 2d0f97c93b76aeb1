//! Msh - a minimal interactive shell
//!
//! The library is organized around an explicit `Shell` context object that
//! owns the background job registry and the interrupt-signal state. The
//! parser turns a raw line into a `CommandLine`; the executor forks one
//! process per command, wiring adjacent commands together with pipes.

#[macro_use]
extern crate log;

/// Logs `Err` results without consuming them, with a formatted prefix.
macro_rules! log_if_err {
    ($result:expr, $($arg:tt)*) => {
        if let Err(ref e) = $result {
            error!("{}: {}", format!($($arg)*), e);
        }
    };
}

pub mod errors;
pub mod jobs;
pub mod parser;
pub mod shell;
pub mod signals;

mod builtins;
mod exec;
mod redirect;

pub use crate::redirect::RedirectSet;
pub use crate::shell::{Shell, ShellConfig, PROMPT};
