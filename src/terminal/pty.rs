// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pseudo-TTY child-process spawn: `forkpty` the command in
//! `Connect.spawnString` with `TERM` exported, and SIGTERM-then-waitpid on
//! disconnect.
//!
//! Built on the blocking `PtyFd` in `crate::terminal::nbio`, since the
//! HSM run loop is single-threaded and synchronous.

use std::ffi::CString;

use nix::pty::{forkpty, ForkptyResult, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{execvp, ForkResult, Pid};

use crate::error::HsmError;
use crate::terminal::nbio::PtyFd;

fn io_err(detail: impl std::fmt::Display) -> HsmError {
    HsmError::Other { detail: detail.to_string() }
}

/// A spawned child process on its own pseudo-TTY.
pub struct PtyChild {
    pub master: PtyFd,
    pid: Pid,
}

impl PtyChild {
    /// Spawn `command` (program plus arguments) under a pseudo-TTY of the
    /// given size, exporting `TERM=term` in the child's environment.
    ///
    /// `command` must have at least one element. forkpty leaves the child
    /// in a partially-initialized state until `execvp` runs, which is why
    /// the fork is `unsafe`.
    #[allow(unsafe_code)]
    pub fn spawn(command: &[String], cols: u16, rows: u16, term: &str) -> Result<Self, HsmError> {
        if command.is_empty() {
            return Err(io_err("spawn: empty command"));
        }
        let winsize = Winsize { ws_col: cols, ws_row: rows, ws_xpixel: 0, ws_ypixel: 0 };

        // SAFETY: forkpty's child branch below only calls async-signal-safe
        // functions (std::env::set_var, CString construction, execvp) before
        // exec'ing or aborting the process.
        let result = unsafe { forkpty(&winsize, None) }.map_err(io_err)?;
        let ForkptyResult { master, fork_result } = result;

        match fork_result {
            ForkResult::Child => {
                std::env::set_var("TERM", term);
                let c_args: Result<Vec<CString>, _> =
                    command.iter().map(|s| CString::new(s.as_bytes())).collect();
                let Ok(c_args) = c_args else {
                    std::process::exit(127);
                };
                let _ = execvp(&c_args[0], &c_args);
                std::process::exit(127);
            }
            ForkResult::Parent { child } => {
                let master = PtyFd::new(master)?;
                Ok(Self { master, pid: child })
            }
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }
}

impl Drop for PtyChild {
    /// SIGTERM-then-waitpid, with a final SIGKILL if the child outlives
    /// the grace period.
    fn drop(&mut self) {
        let _ = kill(self.pid, Signal::SIGTERM);
        let mut waited = false;
        for _ in 0..50 {
            match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
                _ => {
                    waited = true;
                    break;
                }
            }
        }
        if !waited {
            let _ = kill(self.pid, Signal::SIGKILL);
            let _ = waitpid(self.pid, Some(WaitPidFlag::WNOHANG));
        }
    }
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod pty_tests;
