use std::{convert::TryFrom, fmt};

use linux::SignalInfo;
use serde::Serialize;

// RecordReport is the printable view of a record used by sigstream-watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub signal: u32,
    pub name: Option<String>,
    pub code: i32,
    pub pid: u32,
    pub uid: u32,
    pub status: i32,
    pub utime: u64,
    pub stime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<String>,
}

impl From<&SignalInfo> for RecordReport {
    fn from(info: &SignalInfo) -> Self {
        let name = nix::sys::signal::Signal::try_from(info.signal_number() as i32)
            .ok()
            .map(|s| format!("{:?}", s));
        Self {
            signal: info.signal_number(),
            name,
            code: info.code(),
            pid: info.pid(),
            uid: info.uid(),
            status: info.exit_status(),
            utime: info.user_time(),
            stime: info.system_time(),
            child: info.child_code().map(|c| format!("{:?}", c)),
        }
    }
}

impl fmt::Display for RecordReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signal {} ({}) code {} pid {} uid {} status {}",
            self.signal,
            self.name.as_deref().unwrap_or("?"),
            self.code,
            self.pid,
            self.uid,
            self.status
        )?;
        if let Some(ref child) = self.child {
            write!(f, " child {}", child)?;
        }
        Ok(())
    }
}
