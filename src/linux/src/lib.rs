mod poll;
mod signal;
mod signal_info;

pub use poll::*;
pub use signal::*;
pub use signal_info::*;
