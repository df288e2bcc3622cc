//! Audio block pool and refcounted block handles.
//!
//! The host audio graph moves fixed-size blocks of `i16` samples between
//! nodes. Blocks live in a global lock-free pool; ownership is expressed as
//! an exclusive [`BlockHandle`] or a shared [`BlockRef`], and dropping a
//! handle is the release. Every acquire therefore pairs with a release on
//! every control-flow exit, which is what the delay effects rely on.

pub mod pool;
mod handle;

pub use handle::{BlockHandle, BlockRef};
pub use pool::BlockPool;
