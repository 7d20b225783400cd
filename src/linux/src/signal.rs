#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct Signal(pub i32);

impl Signal {
    pub fn is_valid(&self) -> bool {
        *self > Self(0) && *self <= Self::max()
    }

    pub const fn max() -> Self {
        Self(64)
    }

    // SIGKILL and SIGSTOP can never be blocked, so they never reach a signal descriptor.
    pub fn is_blockable(&self) -> bool {
        self.is_valid() && self.0 != libc::SIGKILL && self.0 != libc::SIGSTOP
    }
}

// ChildCode is the si_code of a SIGCHLD record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ChildCode {
    Exited = 1,
    Killed = 2,
    Dumped = 3,
    Trapped = 4,
    Stopped = 5,
    Continued = 6,
}

impl ChildCode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            libc::CLD_EXITED => Some(Self::Exited),
            libc::CLD_KILLED => Some(Self::Killed),
            libc::CLD_DUMPED => Some(Self::Dumped),
            libc::CLD_TRAPPED => Some(Self::Trapped),
            libc::CLD_STOPPED => Some(Self::Stopped),
            libc::CLD_CONTINUED => Some(Self::Continued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}
