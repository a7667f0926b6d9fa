pub mod complete;
pub mod device;
pub mod household;
pub mod member;
pub mod next;
pub mod notify;
pub mod serve;
pub mod sweep;
pub mod task;
