//! Interrupt handling
//!
//! The shell never dies on Ctrl-C. While idle at the prompt, an interrupt
//! redraws the prompt on a fresh line; while a foreground child runs, the
//! shell only emits a newline and lets the kernel deliver the signal to the
//! child. The two behaviors are an explicit state machine so transitions
//! can be tested without raising real signals.

use failure::ResultExt;
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd;

use crate::errors::{ErrorKind, Result};
use crate::shell::PROMPT;

/// Which SIGINT disposition is currently installed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandlerState {
    /// At the prompt: redraw it on interrupt.
    Idle,
    /// Waiting on a foreground child: print a newline, the child takes the
    /// signal.
    ForegroundWait,
}

/// Owns the shell's SIGINT disposition.
#[derive(Debug)]
pub struct SignalController {
    state: HandlerState,
    installed: bool,
}

impl SignalController {
    /// Installs the idle handler and returns the controller.
    pub fn new() -> Result<SignalController> {
        let mut controller = SignalController {
            state: HandlerState::Idle,
            installed: true,
        };
        controller.install(HandlerState::Idle)?;
        Ok(controller)
    }

    /// A controller that tracks state without touching process signal
    /// dispositions, so tests do not fight the harness.
    #[cfg(test)]
    pub fn disarmed() -> SignalController {
        SignalController {
            state: HandlerState::Idle,
            installed: false,
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    /// Switches to the foreground-wait disposition for the lifetime of the
    /// returned guard.
    pub fn foreground_wait(&mut self) -> Result<ForegroundGuard> {
        self.transition(HandlerState::ForegroundWait)?;
        Ok(ForegroundGuard { controller: self })
    }

    fn transition(&mut self, state: HandlerState) -> Result<()> {
        if self.installed {
            self.install(state)?;
        }
        debug!("signal state {:?} -> {:?}", self.state, state);
        self.state = state;
        Ok(())
    }

    fn install(&mut self, state: HandlerState) -> Result<()> {
        let handler = match state {
            HandlerState::Idle => SigHandler::Handler(handle_interrupt_idle),
            HandlerState::ForegroundWait => SigHandler::Handler(handle_interrupt_foreground),
        };
        unsafe { signal::signal(Signal::SIGINT, handler) }.context(ErrorKind::Nix)?;
        Ok(())
    }
}

/// Restores the idle disposition when dropped.
pub struct ForegroundGuard<'a> {
    controller: &'a mut SignalController,
}

impl<'a> Drop for ForegroundGuard<'a> {
    fn drop(&mut self) {
        let result = self.controller.transition(HandlerState::Idle);
        log_if_err!(result, "restoring idle interrupt handler");
    }
}

// Only async-signal-safe calls below: raw write(2), nothing that allocates
// or locks.

extern "C" fn handle_interrupt_idle(_signal: libc::c_int) {
    let _ = unistd::write(libc::STDOUT_FILENO, b"\n");
    let _ = unistd::write(libc::STDOUT_FILENO, PROMPT.as_bytes());
}

extern "C" fn handle_interrupt_foreground(_signal: libc::c_int) {
    let _ = unistd::write(libc::STDOUT_FILENO, b"\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_round_trip() {
        let mut controller = SignalController::disarmed();
        assert_eq!(controller.state(), HandlerState::Idle);
        {
            let guard = controller.foreground_wait().unwrap();
            assert_eq!(guard.controller.state(), HandlerState::ForegroundWait);
        }
        assert_eq!(controller.state(), HandlerState::Idle);
    }

    #[test]
    fn test_guard_restores_after_failed_wait() {
        let mut controller = SignalController::disarmed();
        let result: crate::errors::Result<()> = (|| {
            let _guard = controller.foreground_wait()?;
            Err(crate::errors::Error::no_such_job(1))
        })();
        assert!(result.is_err());
        assert_eq!(controller.state(), HandlerState::Idle);
    }
}
