use crate::domain::table::RowRecord;

/// Rows per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// A contiguous slice of input rows handled by one worker.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of the chunk; row `i` lives in chunk `i / chunk_size`.
    pub index: usize,
    pub rows: Vec<RowRecord>,
}

/// Splits `rows` positionally into chunks of at most `chunk_size`.
/// The last chunk may be shorter; no rows means no chunks.
pub fn chunk_rows(rows: Vec<RowRecord>, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(chunk_count(rows.len(), chunk_size));
    let mut rows = rows.into_iter().peekable();

    while rows.peek().is_some() {
        chunks.push(Chunk {
            index: chunks.len(),
            rows: rows.by_ref().take(chunk_size).collect(),
        });
    }

    chunks
}

pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size.max(1))
}
