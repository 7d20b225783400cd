use std::{cell::RefCell, collections::HashMap, fmt, os::unix::io::RawFd, rc::Rc};

use utils::{SysError, SysResult};

use crate::source::Pollable;

/// Handler consumes readiness events for one resource.
///
/// `events` is passed through untouched from the readiness mechanism.
pub trait Handler<R> {
    fn handle(&mut self, resource: &mut R, events: u64) -> SysResult<()>;
}

struct FnHandler<F>(F);

impl<R, F> Handler<R> for FnHandler<F>
where
    F: FnMut(&mut R, u64) -> SysResult<()>,
{
    fn handle(&mut self, resource: &mut R, events: u64) -> SysResult<()> {
        (self.0)(resource, events)
    }
}

type Entry = Box<dyn FnMut(u64) -> SysResult<()>>;

/// DispatchTable routes readiness events to the handler registered for the
/// descriptor.
///
/// There is at most one handler per descriptor; registering again replaces
/// it. The table is meant to be driven from a single event loop thread.
#[derive(Default)]
pub struct DispatchTable {
    entries: HashMap<RawFd, Entry>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fds = self.entries.keys().collect::<Vec<_>>();
        fds.sort_unstable();
        f.debug_struct("DispatchTable").field("fds", &fds).finish()
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    // register inserts or replaces the entry for the resource's descriptor and
    // returns that descriptor. Whether the descriptor is still open is not
    // checked.
    pub fn register<R, H>(&mut self, resource: &Rc<RefCell<R>>, mut handler: H) -> RawFd
    where
        R: Pollable + 'static,
        H: Handler<R> + 'static,
    {
        let fd = resource.borrow().descriptor_id();
        let resource = Rc::clone(resource);
        let entry: Entry = Box::new(move |events| {
            // EBUSY if the caller still holds a borrow of the resource
            let mut resource = resource.try_borrow_mut().map_err(|_| {
                SysError::new_with_msg(libc::EBUSY, format!("fd {} is borrowed", fd))
            })?;
            handler.handle(&mut *resource, events)
        });
        if self.entries.insert(fd, entry).is_some() {
            logger::debug!("replaced handler for fd {}", fd);
        } else {
            logger::debug!("registered handler for fd {}", fd);
        }
        fd
    }

    pub fn register_fn<R, F>(&mut self, resource: &Rc<RefCell<R>>, handler: F) -> RawFd
    where
        R: Pollable + 'static,
        F: FnMut(&mut R, u64) -> SysResult<()> + 'static,
    {
        self.register(resource, FnHandler(handler))
    }

    pub fn unregister(&mut self, fd: RawFd) -> bool {
        let removed = self.entries.remove(&fd).is_some();
        if removed {
            logger::debug!("unregistered handler for fd {}", fd);
        }
        removed
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        self.entries.contains_key(&fd)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dispatch(&mut self, fd: RawFd, events: u64) -> SysResult<()> {
        let entry = self
            .entries
            .get_mut(&fd)
            .ok_or_else(|| SysError::unknown_descriptor(fd))?;
        logger::trace!("dispatch fd {} events {:#x}", fd, events);
        entry(events)
    }

    // dispatch_all runs one readiness cycle in the order given, stopping at
    // the first failure.
    pub fn dispatch_all(&mut self, ready: &[(RawFd, u64)]) -> SysResult<usize> {
        for &(fd, events) in ready {
            self.dispatch(fd, events)?;
        }
        Ok(ready.len())
    }
}
