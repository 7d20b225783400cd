use std::{
    mem::MaybeUninit,
    os::unix::io::{FromRawFd, OwnedFd},
};

use nix::errno::Errno;
use utils::{SysError, SysResult};

/// SignalSetup redirects delivery of a set of signals to a readable descriptor.
///
/// The three steps mirror what the host requires: build a signal set, block
/// it so the default disposition no longer applies, then obtain a descriptor
/// that yields one `signalfd_siginfo` record per delivered signal.
pub trait SignalSetup {
    type Mask;

    // mask returns None if any of the signals cannot be part of a signal set.
    fn mask(&self, signals: &[i32]) -> Option<Self::Mask>;

    fn block(&self, mask: &Self::Mask) -> SysResult<()>;

    fn open(&self, mask: &Self::Mask) -> SysResult<OwnedFd>;
}

// HostSetup is backed by sigprocmask(2) and signalfd(2). Sets are built with
// sigaddset(3) so realtime signals are accepted as well.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSetup;

impl SignalSetup for HostSetup {
    type Mask = libc::sigset_t;

    fn mask(&self, signals: &[i32]) -> Option<libc::sigset_t> {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        let mut set = unsafe {
            libc::sigemptyset(set.as_mut_ptr());
            set.assume_init()
        };
        for &signo in signals {
            let signal = linux::Signal(signo);
            if !signal.is_valid() || unsafe { libc::sigaddset(&mut set, signo) } < 0 {
                logger::debug!("signal {} cannot be added to a signal set", signo);
                return None;
            }
            if !signal.is_blockable() {
                logger::warn!("signal {} cannot be blocked and will never be read", signo);
            }
        }
        Some(set)
    }

    fn block(&self, mask: &libc::sigset_t) -> SysResult<()> {
        if unsafe { libc::sigprocmask(libc::SIG_BLOCK, mask, std::ptr::null_mut()) } < 0 {
            return Err(SysError::from_nix_errno(Errno::last()));
        }
        Ok(())
    }

    fn open(&self, mask: &libc::sigset_t) -> SysResult<OwnedFd> {
        let fd = unsafe { libc::signalfd(-1, mask, libc::SFD_CLOEXEC) };
        if fd < 0 {
            return Err(SysError::from_nix_errno(Errno::last()));
        }
        // signalfd returns a fresh descriptor nobody else owns.
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }
}
