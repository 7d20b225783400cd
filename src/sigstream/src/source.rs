use std::os::unix::io::{AsRawFd, IntoRawFd, OwnedFd, RawFd};

use linux::{SignalInfo, SIGNAL_INFO_SIZE};
use nix::unistd;
use utils::{SysError, SysResult};

/// Pollable is implemented by every resource that can be handed to a
/// readiness mechanism and a `DispatchTable`.
pub trait Pollable {
    fn descriptor_id(&self) -> RawFd;
}

/// SignalSource owns a descriptor that yields `signalfd_siginfo` records.
///
/// The descriptor is closed exactly once, either by `close` or on drop.
#[derive(Debug)]
pub struct SignalSource {
    fd: RawFd,
    file: Option<OwnedFd>,
}

impl SignalSource {
    pub fn from_owned_fd(file: OwnedFd) -> Self {
        Self {
            fd: file.as_raw_fd(),
            file: Some(file),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    // read_one reads exactly one record. Callers are expected to wait for
    // readiness first; a blocking descriptor blocks here otherwise.
    pub fn read_one(&self) -> SysResult<SignalInfo> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| SysError::use_after_close(self.fd))?;
        let mut buf = [0; SIGNAL_INFO_SIZE];
        let n = unistd::read(file.as_raw_fd(), &mut buf)?;
        let info = SignalInfo::decode(&buf[..n])?;
        logger::trace!("fd {} read {:?}", self.fd, info);
        Ok(info)
    }

    pub fn close(&mut self) -> SysResult<()> {
        let file = self
            .file
            .take()
            .ok_or_else(|| SysError::use_after_close(self.fd))?;
        logger::debug!("closing signal source fd {}", self.fd);
        unistd::close(file.into_raw_fd())?;
        Ok(())
    }
}

impl Pollable for SignalSource {
    fn descriptor_id(&self) -> RawFd {
        self.fd
    }
}

/// StreamSource wraps an ordinary readable descriptor, e.g. stdin or a pipe.
#[derive(Debug)]
pub struct StreamSource<T> {
    inner: T,
}

impl<T: AsRawFd> StreamSource<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    // read issues a single read(2) on the descriptor, bypassing any buffering
    // `T` may do, so that it agrees with what poll reported.
    pub fn read(&mut self, buf: &mut [u8]) -> SysResult<usize> {
        let n = unistd::read(self.inner.as_raw_fd(), buf)?;
        Ok(n)
    }
}

impl<T: AsRawFd> Pollable for StreamSource<T> {
    fn descriptor_id(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::os::unix::io::FromRawFd;

    use nix::{
        errno::Errno,
        fcntl::{fcntl, FcntlArg, OFlag},
        sys::socket::{send, socketpair, AddressFamily, MsgFlags, SockFlag, SockType},
    };
    use utils::SysErrorKind;

    use super::*;

    pub(crate) fn pipe() -> (OwnedFd, OwnedFd) {
        let (r, w) = unistd::pipe().unwrap();
        unsafe { (OwnedFd::from_raw_fd(r), OwnedFd::from_raw_fd(w)) }
    }

    pub(crate) fn record(signo: i32, code: i32, status: i32) -> [u8; SIGNAL_INFO_SIZE] {
        let mut siginfo: libc::signalfd_siginfo = unsafe { std::mem::zeroed() };
        siginfo.ssi_signo = signo as u32;
        siginfo.ssi_code = code;
        siginfo.ssi_status = status;
        siginfo.ssi_pid = 4242;
        siginfo.ssi_utime = 999_999;
        let mut buf = [0; SIGNAL_INFO_SIZE];
        let bytes = unsafe {
            std::slice::from_raw_parts(
                &siginfo as *const libc::signalfd_siginfo as *const u8,
                SIGNAL_INFO_SIZE,
            )
        };
        buf.copy_from_slice(bytes);
        buf
    }

    #[test]
    fn read_records_in_order() {
        let (r, w) = pipe();
        let source = SignalSource::from_owned_fd(r);
        unistd::write(w.as_raw_fd(), &record(libc::SIGALRM, 0, 0)).unwrap();
        unistd::write(w.as_raw_fd(), &record(libc::SIGCHLD, libc::CLD_EXITED, 7)).unwrap();

        let first = source.read_one().unwrap();
        assert_eq!(first.signal_number(), libc::SIGALRM as u32);
        let second = source.read_one().unwrap();
        assert_eq!(second.signal_number(), libc::SIGCHLD as u32);
        assert_eq!(second.code(), libc::CLD_EXITED);
        assert_eq!(second.exit_status(), 7);
        assert_eq!(second.pid(), 4242);
        assert_eq!(second.user_time(), 999_999);
        assert!(second.has_child_exited());
    }

    #[test]
    fn short_read_is_malformed() {
        let (r, w) = pipe();
        let source = SignalSource::from_owned_fd(r);
        unistd::write(w.as_raw_fd(), &record(libc::SIGHUP, 0, 0)[..64]).unwrap();
        let err = source.read_one().unwrap_err();
        assert_eq!(err.kind(), SysErrorKind::MalformedRecord);

        // the handle stays usable after a malformed record
        unistd::write(w.as_raw_fd(), &record(libc::SIGHUP, 0, 0)).unwrap();
        assert_eq!(source.read_one().unwrap().signal_number(), libc::SIGHUP as u32);

        drop(w);
        let err = source.read_one().unwrap_err();
        assert_eq!(err.kind(), SysErrorKind::MalformedRecord);
    }

    #[test]
    fn failed_read_is_an_io_error() {
        let (r, w) = pipe();
        fcntl(r.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).unwrap();
        let source = SignalSource::from_owned_fd(r);

        let err = source.read_one().unwrap_err();
        assert_eq!(err.kind(), SysErrorKind::Nix);
        assert_eq!(err.code(), libc::EAGAIN);
        assert!(!source.is_closed());

        unistd::write(w.as_raw_fd(), &record(libc::SIGUSR1, 0, 0)).unwrap();
        assert_eq!(source.read_one().unwrap().signal_number(), libc::SIGUSR1 as u32);
    }

    #[test]
    fn drop_closes_descriptor() {
        let (local, peer) =
            socketpair(AddressFamily::Unix, SockType::Stream, None, SockFlag::SOCK_CLOEXEC)
                .unwrap();
        let peer = unsafe { OwnedFd::from_raw_fd(peer) };
        let source = SignalSource::from_owned_fd(unsafe { OwnedFd::from_raw_fd(local) });
        assert!(!source.is_closed());

        drop(source);
        assert_eq!(
            send(peer.as_raw_fd(), b"x", MsgFlags::MSG_NOSIGNAL),
            Err(Errno::EPIPE)
        );
    }

    #[test]
    fn use_after_close() {
        let (r, _w) = pipe();
        let mut source = SignalSource::from_owned_fd(r);
        let fd = source.descriptor_id();
        assert!(!source.is_closed());
        source.close().unwrap();
        assert!(source.is_closed());
        assert_eq!(source.descriptor_id(), fd);
        assert_eq!(
            source.read_one().unwrap_err().kind(),
            SysErrorKind::UseAfterClose
        );
        assert_eq!(source.close().unwrap_err().kind(), SysErrorKind::UseAfterClose);
    }

    #[test]
    fn stream_source() {
        let (r, w) = pipe();
        let mut stream = StreamSource::new(r);
        assert_eq!(stream.descriptor_id(), stream.get_ref().as_raw_fd());
        unistd::write(w.as_raw_fd(), b"hi").unwrap();
        let mut buf = [0; 16];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"hi");
    }
}
