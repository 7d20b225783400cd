use std::{convert::TryFrom, fmt, os::unix::io::RawFd};

use nix::errno::Errno;
use utils::{bail_libc, SysError, SysResult};

use crate::source::Pollable;

// Poller is a poll(2) based readiness mechanism. It only reports readiness;
// routing the events is left to a DispatchTable.
#[derive(Default)]
pub struct Poller {
    pfds: Vec<libc::pollfd>,
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.pfds.iter().map(|pfd| (pfd.fd, pfd.events)))
            .finish()
    }
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    // add watches the resource for `events`, replacing any earlier interest.
    pub fn add<P: Pollable + ?Sized>(&mut self, resource: &P, events: u64) -> SysResult<()> {
        let fd = resource.descriptor_id();
        if fd < 0 {
            bail_libc!(libc::EBADF);
        }
        let events = match libc::c_short::try_from(events) {
            Ok(events) => events,
            Err(_) => bail_libc!(libc::EINVAL),
        };
        match self.pfds.iter_mut().find(|pfd| pfd.fd == fd) {
            Some(pfd) => pfd.events = events,
            None => self.pfds.push(libc::pollfd {
                fd,
                events,
                revents: 0,
            }),
        }
        logger::debug!("poll fd {} for events {:#x}", fd, events);
        Ok(())
    }

    pub fn remove(&mut self, fd: RawFd) -> bool {
        let len = self.pfds.len();
        self.pfds.retain(|pfd| pfd.fd != fd);
        len != self.pfds.len()
    }

    pub fn len(&self) -> usize {
        self.pfds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pfds.is_empty()
    }

    // poll waits up to `timeout` milliseconds (negative waits forever) and
    // returns the ready descriptors with their events. An interrupted wait is
    // reported as an empty cycle.
    pub fn poll(&mut self, timeout: i32) -> SysResult<Vec<(RawFd, u64)>> {
        let ret = unsafe {
            libc::poll(
                self.pfds.as_mut_ptr(),
                self.pfds.len() as libc::nfds_t,
                timeout,
            )
        };
        if ret < 0 {
            let err = SysError::from_nix_errno(Errno::last());
            if err.is_interrupted() {
                logger::debug!("poll interrupted");
                return Ok(Vec::new());
            }
            return Err(err);
        }
        let ready = self
            .pfds
            .iter()
            .filter(|pfd| pfd.revents != 0)
            .map(|pfd| (pfd.fd, pfd.revents as u16 as u64))
            .collect::<Vec<_>>();
        logger::trace!("poll returned {} ready of {}", ready.len(), self.pfds.len());
        Ok(ready)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, os::unix::io::AsRawFd, rc::Rc};

    use nix::unistd;
    use utils::SysErrorKind;

    use super::*;
    use crate::{
        dispatch::DispatchTable,
        source::{
            tests::{pipe, record},
            SignalSource,
        },
    };

    struct Fake(RawFd);

    impl Pollable for Fake {
        fn descriptor_id(&self) -> RawFd {
            self.0
        }
    }

    #[test]
    fn add_and_remove() {
        let mut poller = Poller::new();
        assert_eq!(
            poller.add(&Fake(-1), linux::POLL_READABLE_EVENTS),
            Err(SysError::new(libc::EBADF))
        );
        assert_eq!(
            poller.add(&Fake(10), 1 << 20),
            Err(SysError::new(libc::EINVAL))
        );
        assert!(poller.is_empty());
        poller.add(&Fake(10), linux::POLL_READABLE_EVENTS).unwrap();
        poller.add(&Fake(10), linux::POLL_WRITABLE_EVENTS).unwrap();
        assert_eq!(poller.len(), 1);
        assert!(poller.remove(10));
        assert!(!poller.remove(10));
        assert!(poller.is_empty());
    }

    #[test]
    fn reports_readable_pipe() {
        let (r, w) = pipe();
        let source = SignalSource::from_owned_fd(r);
        let mut poller = Poller::new();
        poller.add(&source, linux::POLL_READABLE_EVENTS).unwrap();
        assert!(poller.poll(0).unwrap().is_empty());

        unistd::write(w.as_raw_fd(), &record(libc::SIGTERM, 0, 0)).unwrap();
        let ready = poller.poll(0).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, source.descriptor_id());
        assert_ne!(ready[0].1 & libc::POLLIN as u64, 0);
    }

    #[test]
    fn poll_then_dispatch() {
        let (r, w) = pipe();
        let source = Rc::new(RefCell::new(SignalSource::from_owned_fd(r)));
        let mut poller = Poller::new();
        poller
            .add(&*source.borrow(), linux::POLL_READABLE_EVENTS)
            .unwrap();

        let received = Rc::new(RefCell::new(Vec::new()));
        let mut table = DispatchTable::new();
        {
            let received = Rc::clone(&received);
            table.register_fn(&source, move |source: &mut SignalSource, _| {
                let info = source.read_one()?;
                received.borrow_mut().push(info);
                Ok(())
            });
        }

        for signo in &[libc::SIGUSR1, libc::SIGUSR2] {
            unistd::write(w.as_raw_fd(), &record(*signo, 0, 0)).unwrap();
            let ready = poller.poll(1000).unwrap();
            table.dispatch_all(&ready).unwrap();
        }
        {
            let received = received.borrow();
            assert_eq!(received.len(), 2);
            assert_eq!(received[0].signal_number(), libc::SIGUSR1 as u32);
            assert_eq!(received[1].signal_number(), libc::SIGUSR2 as u32);
        }

        // a hung up stream is still reported so its handler can notice
        drop(w);
        let ready = poller.poll(1000).unwrap();
        assert_eq!(ready.len(), 1);
        let err = table.dispatch_all(&ready).unwrap_err();
        assert_eq!(err.kind(), SysErrorKind::MalformedRecord);
    }
}
