mod sys_error;

pub use sys_error::*;
