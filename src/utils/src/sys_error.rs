use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysErrorKind {
    Libc,
    Nix, // from nix crate
    StdIoError,
    // a signal number that cannot be placed into a signal set
    InvalidSignalSet,
    // short or oversized signal-info record
    MalformedRecord,
    UseAfterClose,
    // dispatch for a descriptor that was never registered
    UnknownDescriptor,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SysError {
    code: i32,
    desc: Option<String>,
    kind: SysErrorKind,
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.desc {
            Some(ref desc) => write!(f, "{:?} (errno {}): {}", self.kind, self.code, desc),
            None => write!(f, "{:?} (errno {})", self.kind, self.code),
        }
    }
}

impl std::error::Error for SysError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl SysError {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            desc: None,
            kind: SysErrorKind::Libc,
        }
    }

    pub fn new_with_msg(code: i32, msg: String) -> Self {
        Self {
            code,
            desc: Some(msg),
            kind: SysErrorKind::Libc,
        }
    }

    pub fn kind(&self) -> SysErrorKind {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    pub fn invalid_signal_set(signals: &[i32]) -> Self {
        Self {
            code: libc::EINVAL,
            desc: Some(format!("{:?} is not a valid signal set", signals)),
            kind: SysErrorKind::InvalidSignalSet,
        }
    }

    pub fn malformed_record(len: usize, want: usize) -> Self {
        Self {
            code: libc::EIO,
            desc: Some(format!("record is {} bytes, expected {}", len, want)),
            kind: SysErrorKind::MalformedRecord,
        }
    }

    pub fn use_after_close(fd: i32) -> Self {
        Self {
            code: libc::EBADF,
            desc: Some(format!("descriptor {} is already closed", fd)),
            kind: SysErrorKind::UseAfterClose,
        }
    }

    pub fn unknown_descriptor(fd: i32) -> Self {
        Self {
            code: libc::ENOENT,
            desc: Some(format!("no handler registered for descriptor {}", fd)),
            kind: SysErrorKind::UnknownDescriptor,
        }
    }

    pub fn from_io_error(e: std::io::Error) -> Self {
        Self {
            code: e.raw_os_error().unwrap_or(-1),
            desc: Some(e.to_string()),
            kind: SysErrorKind::StdIoError,
        }
    }

    pub fn from_nix_errno(e: nix::errno::Errno) -> Self {
        Self {
            code: e as i32,
            desc: Some(e.desc().to_string()),
            kind: SysErrorKind::Nix,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.code == libc::EINTR && matches!(self.kind, SysErrorKind::Libc | SysErrorKind::Nix)
    }
}

impl From<nix::errno::Errno> for SysError {
    fn from(e: nix::errno::Errno) -> Self {
        Self::from_nix_errno(e)
    }
}

impl From<std::io::Error> for SysError {
    fn from(e: std::io::Error) -> Self {
        Self::from_io_error(e)
    }
}

#[macro_export]
macro_rules! err_libc {
    ($libc_code:expr) => {
        Err(SysError::new($libc_code))
    };
}

#[macro_export]
macro_rules! bail_libc {
    ($libc_code:expr) => {
        return Err(SysError::new($libc_code))
    };
}

pub type SysResult<T> = std::result::Result<T, SysError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(fd: i32) -> SysResult<i32> {
        if fd < 0 {
            bail_libc!(libc::EBADF);
        }
        err_libc!(libc::ENOSYS)
    }

    #[test]
    fn kinds_carry_errno() {
        struct Test {
            err: SysError,
            kind: SysErrorKind,
            code: i32,
        }
        for test in [
            Test {
                err: SysError::invalid_signal_set(&[0]),
                kind: SysErrorKind::InvalidSignalSet,
                code: libc::EINVAL,
            },
            Test {
                err: SysError::malformed_record(64, 128),
                kind: SysErrorKind::MalformedRecord,
                code: libc::EIO,
            },
            Test {
                err: SysError::use_after_close(3),
                kind: SysErrorKind::UseAfterClose,
                code: libc::EBADF,
            },
            Test {
                err: SysError::unknown_descriptor(9),
                kind: SysErrorKind::UnknownDescriptor,
                code: libc::ENOENT,
            },
            Test {
                err: nix::errno::Errno::EAGAIN.into(),
                kind: SysErrorKind::Nix,
                code: libc::EAGAIN,
            },
        ] {
            assert_eq!(test.err.kind(), test.kind);
            assert_eq!(test.err.code(), test.code);
        }
    }

    #[test]
    fn macros() {
        assert_eq!(lookup(-1), Err(SysError::new(libc::EBADF)));
        assert_eq!(lookup(0).unwrap_err().code(), libc::ENOSYS);
    }

    #[test]
    fn interrupted() {
        assert!(SysError::from(nix::errno::Errno::EINTR).is_interrupted());
        assert!(!SysError::malformed_record(0, 128).is_interrupted());
    }

    #[test]
    fn display_includes_description() {
        let msg = SysError::unknown_descriptor(7).to_string();
        assert!(msg.contains("UnknownDescriptor"));
        assert!(msg.contains("descriptor 7"));
    }
}
