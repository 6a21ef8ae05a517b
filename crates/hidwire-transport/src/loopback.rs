use std::collections::VecDeque;

use crate::error::{Result, TransportError};
use crate::traits::{Chunk, ChunkTransport};

/// In-memory transport where every written chunk becomes readable, in order.
///
/// Reading from an empty queue fails with [`TransportError::Closed`] instead of
/// blocking forever.
#[derive(Debug, Default, Clone)]
pub struct LoopbackTransport {
    queue: VecDeque<Chunk>,
    written: usize,
    read: usize,
}

impl LoopbackTransport {
    /// Create an empty loopback transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk for reading without counting it as written.
    pub fn push_inbound(&mut self, chunk: Chunk) {
        self.queue.push_back(chunk);
    }

    /// Chunks currently waiting to be read.
    pub fn pending(&self) -> impl Iterator<Item = &Chunk> {
        self.queue.iter()
    }

    /// Number of chunks waiting to be read.
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Total chunks written through this transport.
    pub fn chunks_written(&self) -> usize {
        self.written
    }

    /// Total chunks read from this transport.
    pub fn chunks_read(&self) -> usize {
        self.read
    }

    /// Drain every pending chunk.
    pub fn drain(&mut self) -> Vec<Chunk> {
        self.queue.drain(..).collect()
    }
}

impl ChunkTransport for LoopbackTransport {
    fn read_chunk(&mut self) -> Result<Chunk> {
        let chunk = self.queue.pop_front().ok_or(TransportError::Closed)?;
        self.read += 1;
        Ok(chunk)
    }

    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        self.queue.push_back(*chunk);
        self.written += 1;
        Ok(())
    }
}
