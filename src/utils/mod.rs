pub mod buffer_ops;

pub use buffer_ops::{narrow, try_zeroed, widen, NarrowFn, WidenFn};
