pub mod hasher;
pub mod payload;

pub use payload::PayloadStore;
