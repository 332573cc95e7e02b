//! Audio pipeline primitives
//!
//! Chunk lifecycle, interruptible queues, codec byte accounting, the
//! rate-limited output device, and the shared synthesis cache.

pub mod chunk;
pub mod encoding;
pub mod output;
pub mod cache;

pub use chunk::{AudioChunk, ChunkHandle, ChunkState, InterruptibleEvent, InterruptibleQueue};
pub use encoding::{bytes_per_second, AudioEncoding};
pub use output::{MediaSink, RateLimitedOutputDevice};
pub use cache::{AudioCache, CacheStore, MemoryStore};
