//! Chunk Reader
//!
//! Reads a source file as a sequence of fixed-size parts, numbered from 1 in
//! file order. The final part may be shorter; an empty file yields no parts.

use std::path::Path;

use futures::stream::{self, Stream};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// One block of the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based part number
    pub part_number: u64,
    pub data: Vec<u8>,
}

/// Sequential reader over the parts of a file
///
/// The file handle is owned by the reader and closed when it is dropped,
/// including when a consumer stops early.
pub struct ChunkReader {
    file: File,
    chunk_size: u64,
    /// Bytes left according to the length at open time
    remaining: u64,
    next_part: u64,
    done: bool,
}

impl ChunkReader {
    /// Open `path` for reading from byte 0
    pub async fn open(path: impl AsRef<Path>, chunk_size: u64) -> std::io::Result<Self> {
        if chunk_size == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "chunk size must be positive",
            ));
        }

        let file = File::open(path.as_ref()).await?;
        let remaining = file.metadata().await?.len();

        Ok(Self {
            file,
            chunk_size,
            remaining,
            next_part: 1,
            done: false,
        })
    }

    /// Read the next part, or `None` at end of file
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }

        let mut data = Vec::with_capacity(initial_capacity(self.chunk_size, self.remaining));
        (&mut self.file).take(self.chunk_size).read_to_end(&mut data).await?;
        self.remaining = self.remaining.saturating_sub(data.len() as u64);

        if (data.len() as u64) < self.chunk_size {
            self.done = true;
        }
        if data.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk {
            part_number: self.next_part,
            data,
        };
        self.next_part += 1;

        Ok(Some(chunk))
    }

    /// Turn the reader into a stream of parts
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<Chunk>> {
        stream::try_unfold(self, |mut reader| async move {
            let chunk = reader.next_chunk().await?;
            Ok(chunk.map(|chunk| (chunk, reader)))
        })
    }
}

// Up-front allocation never exceeds what is left of the file; `read_to_end`
// grows past it if the file was appended to after open.
fn initial_capacity(chunk_size: u64, remaining: u64) -> usize {
    const MAX_PREALLOC: u64 = 128 * 1024 * 1024;
    chunk_size.min(remaining).min(MAX_PREALLOC) as usize
}

// ============================================================================
// Tests
// ============================================================================
