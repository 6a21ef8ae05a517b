use crate::error::{Result, TransportError};

/// Size of every report exchanged with the device.
pub const CHUNK_SIZE: usize = 64;

/// One fixed-size report. Shorter data is always zero-padded to this size.
pub type Chunk = [u8; CHUNK_SIZE];

/// A blocking channel that moves whole [`Chunk`]s.
///
/// Implementations carry one operation at a time. Protocol layers never retry;
/// any error returned here is surfaced to the caller unchanged.
pub trait ChunkTransport {
    /// Read the next chunk (blocking).
    fn read_chunk(&mut self) -> Result<Chunk>;

    /// Write one chunk (blocking).
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()>;
}

impl<T: ChunkTransport + ?Sized> ChunkTransport for &mut T {
    fn read_chunk(&mut self) -> Result<Chunk> {
        (**self).read_chunk()
    }

    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        (**self).write_chunk(chunk)
    }
}

impl<T: ChunkTransport + ?Sized> ChunkTransport for Box<T> {
    fn read_chunk(&mut self) -> Result<Chunk> {
        (**self).read_chunk()
    }

    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        (**self).write_chunk(chunk)
    }
}

/// Copy an exactly-sized slice into a [`Chunk`].
pub fn chunk_from_slice(data: &[u8]) -> Result<Chunk> {
    data.try_into()
        .map_err(|_| TransportError::ChunkSizeMismatch {
            expected: CHUNK_SIZE,
            actual: data.len(),
        })
}
