//! Resource management for the SMAA chain

mod pool;

pub use pool::{PoolStats, TexturePool};
