use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use futures_util::Stream;
use futures_util::stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::trace;

use crate::TransferError;

/// A contiguous byte range of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset of `data[0]` within the file.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Size of this chunk in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset of the first byte after this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

// ---------------------------------------------------------------------------
// ChunkSource
// ---------------------------------------------------------------------------

/// Lazily reads a file in fixed-size chunks, starting at a given offset.
///
/// Nothing is read until [`next_chunk`](Self::next_chunk) is called, so the
/// read of chunk N+1 can overlap with sending chunk N. A source only moves
/// forward; to resume from a different offset, open a new one. The open file
/// handle is owned by the source and closed when it is dropped.
pub struct ChunkSource {
    file: File,
    path: PathBuf,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
}

impl ChunkSource {
    /// Opens `path` for chunked reading from `offset`.
    pub async fn open(path: &Path, offset: u64, chunk_size: usize) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidInput(
                "chunk size must be greater than zero".into(),
            ));
        }

        let mut file = File::open(path)
            .await
            .map_err(|e| TransferError::access(path, e))?;
        let file_size = file
            .metadata()
            .await
            .map_err(|e| TransferError::access(path, e))?
            .len();

        if offset > file_size {
            return Err(TransferError::InvalidInput(format!(
                "offset {offset} is past the end of {} ({file_size} bytes)",
                path.display()
            )));
        }

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| TransferError::access(path, e))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            chunk_size,
            offset,
            file_size,
        })
    }

    /// Reads the next chunk. Returns `None` once `file_size` is reached.
    ///
    /// A file that is shorter than it was at open time yields a
    /// [`TransferError::FileAccess`] with `UnexpectedEof`.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut data = vec![0u8; read_size];
        self.file
            .read_exact(&mut data)
            .await
            .map_err(|e| TransferError::access(&self.path, e))?;

        let chunk = Chunk {
            offset: self.offset,
            data,
        };
        self.offset += read_size as u64;
        trace!(path = %self.path.display(), offset = chunk.offset, len = read_size, "read chunk");
        Ok(Some(chunk))
    }

    /// Consumes the source into a finite stream of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Chunk, TransferError>> {
        stream::try_unfold(self, |mut source| async move {
            Ok(source.next_chunk().await?.map(|chunk| (chunk, source)))
        })
    }

    /// Offset of the next byte to be read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// File size captured when the source was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes left between the current offset and the end of the file.
    pub fn remaining(&self) -> u64 {
        self.file_size - self.offset
    }
}
