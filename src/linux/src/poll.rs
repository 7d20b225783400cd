pub const POLL_READABLE_EVENTS: u64 = (libc::POLLIN | libc::POLLRDNORM) as u64;
pub const POLL_WRITABLE_EVENTS: u64 = (libc::POLLOUT | libc::POLLWRNORM) as u64;
pub const POLL_ERROR_EVENTS: u64 = (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) as u64;
