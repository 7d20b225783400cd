use std::fmt;

use utils::{SysError, SysResult};

use crate::{ChildCode, Signal};

// Size of struct signalfd_siginfo. The kernel always writes whole records.
pub const SIGNAL_INFO_SIZE: usize = 128;

const SLOT_SIZE: usize = 4;

const _: () = assert!(std::mem::size_of::<libc::signalfd_siginfo>() == SIGNAL_INFO_SIZE);

// Slot indexes into the record, in units of SLOT_SIZE bytes. The first twelve
// slots are 32-bit; each 64-bit field spans two slots.
mod slot {
    pub const SIGNO: usize = 0;
    pub const ERRNO: usize = 1;
    pub const CODE: usize = 2;
    pub const PID: usize = 3;
    pub const UID: usize = 4;
    pub const FD: usize = 5;
    pub const TID: usize = 6;
    pub const BAND: usize = 7;
    pub const OVERRUN: usize = 8;
    pub const TRAPNO: usize = 9;
    pub const STATUS: usize = 10;
    pub const INT: usize = 11;
    pub const NUM_32: usize = 12;

    pub const PTR: usize = NUM_32;
    pub const UTIME: usize = NUM_32 + 2;
    pub const STIME: usize = NUM_32 + 4;
    pub const ADDR: usize = NUM_32 + 6;
}

/// A decoded `signalfd_siginfo` record.
///
/// The record is kept as raw bytes in host byte order and fields are read on
/// access, so decoding the same record twice always yields the same values.
/// Which fields carry meaning depends on the signal and its code (see
/// signalfd(2)); the accessors never check that.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SignalInfo {
    buf: [u8; SIGNAL_INFO_SIZE],
}

impl SignalInfo {
    pub fn decode(buf: &[u8]) -> SysResult<Self> {
        if buf.len() != SIGNAL_INFO_SIZE {
            return Err(SysError::malformed_record(buf.len(), SIGNAL_INFO_SIZE));
        }
        let mut info = Self {
            buf: [0; SIGNAL_INFO_SIZE],
        };
        info.buf.copy_from_slice(buf);
        Ok(info)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNAL_INFO_SIZE] {
        &self.buf
    }

    fn bytes<const N: usize>(&self, index: usize) -> [u8; N] {
        let start = index * SLOT_SIZE;
        let mut b = [0; N];
        b.copy_from_slice(&self.buf[start..start + N]);
        b
    }

    fn uint32(&self, index: usize) -> u32 {
        u32::from_ne_bytes(self.bytes(index))
    }

    fn int32(&self, index: usize) -> i32 {
        i32::from_ne_bytes(self.bytes(index))
    }

    fn uint64(&self, index: usize) -> u64 {
        u64::from_ne_bytes(self.bytes(index))
    }

    pub fn signal_number(&self) -> u32 {
        self.uint32(slot::SIGNO)
    }

    pub fn signal(&self) -> Signal {
        Signal(self.signal_number() as i32)
    }

    pub fn errno(&self) -> i32 {
        self.int32(slot::ERRNO)
    }

    pub fn code(&self) -> i32 {
        self.int32(slot::CODE)
    }

    pub fn pid(&self) -> u32 {
        self.uint32(slot::PID)
    }

    pub fn uid(&self) -> u32 {
        self.uint32(slot::UID)
    }

    // fd is the descriptor for SIGIO.
    pub fn fd(&self) -> i32 {
        self.int32(slot::FD)
    }

    // tid is the kernel timer id for POSIX timers.
    pub fn tid(&self) -> u32 {
        self.uint32(slot::TID)
    }

    pub fn band(&self) -> u32 {
        self.uint32(slot::BAND)
    }

    pub fn overrun(&self) -> u32 {
        self.uint32(slot::OVERRUN)
    }

    pub fn trapno(&self) -> u32 {
        self.uint32(slot::TRAPNO)
    }

    // exit_status is the exit status or signal for SIGCHLD.
    pub fn exit_status(&self) -> i32 {
        self.int32(slot::STATUS)
    }

    pub fn int(&self) -> i32 {
        self.int32(slot::INT)
    }

    pub fn ptr(&self) -> u64 {
        self.uint64(slot::PTR)
    }

    pub fn user_time(&self) -> u64 {
        self.uint64(slot::UTIME)
    }

    pub fn system_time(&self) -> u64 {
        self.uint64(slot::STIME)
    }

    // addr is the faulting address for hardware-generated signals.
    pub fn addr(&self) -> u64 {
        self.uint64(slot::ADDR)
    }

    pub fn child_code(&self) -> Option<ChildCode> {
        if self.signal_number() != libc::SIGCHLD as u32 {
            return None;
        }
        ChildCode::from_code(self.code())
    }

    pub fn has_child_exited(&self) -> bool {
        self.child_code() == Some(ChildCode::Exited)
    }
}

impl fmt::Debug for SignalInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalInfo")
            .field("signo", &self.signal_number())
            .field("errno", &self.errno())
            .field("code", &self.code())
            .field("pid", &self.pid())
            .field("uid", &self.uid())
            .field("status", &self.exit_status())
            .field("utime", &self.user_time())
            .field("stime", &self.system_time())
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}
