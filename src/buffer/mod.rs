mod buffer_pool;
mod fifo_replacer;

pub use buffer_pool::*;
pub use fifo_replacer::*;
