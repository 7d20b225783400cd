//! Signal delivery as a pollable descriptor.
//!
//! `open_signal_source` blocks a set of signals and returns a `SignalSource`
//! that becomes readable whenever one of them is pending. Register it, along
//! with any other descriptors, with a `Poller` and a `DispatchTable`, then
//! drive both from one loop:
//!
//! ```no_run
//! use std::{cell::RefCell, rc::Rc};
//!
//! use sigstream::{DispatchTable, Poller, SignalSource};
//!
//! let source = Rc::new(RefCell::new(sigstream::open_signal_source(&[libc::SIGCHLD])?));
//! let mut poller = Poller::new();
//! poller.add(&*source.borrow(), linux::POLL_READABLE_EVENTS)?;
//! let mut table = DispatchTable::new();
//! table.register_fn(&source, |source: &mut SignalSource, _| {
//!     let info = source.read_one()?;
//!     println!("child {} exited: {}", info.pid(), info.has_child_exited());
//!     Ok(())
//! });
//! loop {
//!     let ready = poller.poll(-1)?;
//!     table.dispatch_all(&ready)?;
//! }
//! # Ok::<(), utils::SysError>(())
//! ```

mod dispatch;
mod poller;
mod report;
mod setup;
mod source;

pub use dispatch::{DispatchTable, Handler};
pub use linux::{ChildCode, SignalInfo, SIGNAL_INFO_SIZE};
pub use poller::Poller;
pub use report::RecordReport;
pub use setup::{HostSetup, SignalSetup};
pub use source::{Pollable, SignalSource, StreamSource};
pub use utils::{SysError, SysErrorKind, SysResult};

// new_signal_source builds the mask for `signals`, blocks it and wraps the
// resulting descriptor. A set the collaborator rejects yields InvalidSignalSet
// and nothing is blocked.
pub fn new_signal_source<S: SignalSetup>(setup: &S, signals: &[i32]) -> SysResult<SignalSource> {
    let mask = setup
        .mask(signals)
        .ok_or_else(|| SysError::invalid_signal_set(signals))?;
    setup.block(&mask)?;
    let source = SignalSource::from_owned_fd(setup.open(&mask)?);
    logger::debug!(
        "signal source fd {} for {:?}",
        source.descriptor_id(),
        signals
    );
    Ok(source)
}

pub fn open_signal_source(signals: &[i32]) -> SysResult<SignalSource> {
    new_signal_source(&HostSetup, signals)
}
