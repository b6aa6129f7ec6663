// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline-aware, non-blocking I/O over the pseudo-TTY master fd.
//!
//! `PtyFd` wraps an `OwnedFd` set non-blocking at construction, with
//! chunked read/write helpers built on a blocking `nix::poll` wait loop —
//! the terminal façade is driven from the synchronous HSM run loop, not
//! an async task, so there is no executor to hand a readiness future to.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd::{read, write};

use crate::error::HsmError;

fn set_nonblocking(fd: BorrowedFd<'_>) -> Result<(), HsmError> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(io_err)?;
    #[allow(clippy::unwrap_used)]
    let flags = OFlag::from_bits(flags).unwrap_or(OFlag::empty());
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK)).map_err(io_err)?;
    Ok(())
}

fn io_err(e: Errno) -> HsmError {
    HsmError::Other { detail: format!("pty I/O: {e}") }
}

fn poll_timeout(remaining: Duration) -> PollTimeout {
    PollTimeout::try_from(remaining.as_millis().min(i32::MAX as u128) as i32)
        .unwrap_or(PollTimeout::MAX)
}

fn wait_ready(fd: BorrowedFd<'_>, flags: PollFlags, timeout: Duration) -> Result<bool, HsmError> {
    let mut fds = [PollFd::new(fd, flags)];
    let n = poll(&mut fds, poll_timeout(timeout)).map_err(io_err)?;
    Ok(n > 0)
}

/// The pseudo-TTY master fd, set non-blocking at construction.
pub struct PtyFd(OwnedFd);

impl PtyFd {
    pub fn new(fd: OwnedFd) -> Result<Self, HsmError> {
        set_nonblocking(fd.as_fd())?;
        Ok(Self(fd))
    }

    pub fn as_borrowed_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }

    /// Read whatever bytes are available within `timeout`. An empty
    /// result means the deadline passed with nothing to read — not an
    /// error on its own; callers such as `expect_*` decide what a timeout
    /// means for them. A closed peer is reported as `HsmError::Eof`.
    pub fn read_chunk(&self, timeout: Duration) -> Result<Vec<u8>, HsmError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !wait_ready(self.as_borrowed_fd(), PollFlags::POLLIN, remaining)? {
                return Ok(Vec::new());
            }
            let mut buf = [0u8; 4096];
            match read(&self.0, &mut buf) {
                Ok(0) => return Err(HsmError::Eof),
                Ok(n) => return Ok(buf[..n].to_vec()),
                Err(Errno::EAGAIN) | Err(Errno::EINTR) => {
                    if Instant::now() >= deadline {
                        return Ok(Vec::new());
                    }
                    continue;
                }
                Err(e) => return Err(io_err(e)),
            }
        }
    }

    /// Write the full buffer, waiting for writability as needed. No
    /// deadline — a hung child blocking writes indefinitely is a
    /// collaborator failure outside this crate's scope.
    pub fn write_all(&self, mut buf: &[u8]) -> Result<(), HsmError> {
        while !buf.is_empty() {
            if !wait_ready(self.as_borrowed_fd(), PollFlags::POLLOUT, Duration::from_secs(30))? {
                return Err(HsmError::Timeout);
            }
            match write(self.as_borrowed_fd(), buf) {
                Ok(0) => return Err(HsmError::Eof),
                Ok(n) => buf = &buf[n..],
                Err(Errno::EAGAIN) | Err(Errno::EINTR) => continue,
                Err(e) => return Err(io_err(e)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "nbio_tests.rs"]
mod nbio_tests;
