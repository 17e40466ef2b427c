use thiserror::Error;

/// Errors surfaced across the storage, buffer pool, and operator boundaries.
///
/// `DbError` is the single error type threaded through the engine; callers
/// that need to distinguish an I/O failure can match on
/// [`DbError::Io`].
#[derive(Debug, Error)]
pub enum DbError {
    #[error("no empty slot on page")]
    NoEmptySlot,

    #[error("tuple not on page")]
    TupleNotOnPage,

    #[error("read past end of file (page {page_number} of {num_pages})")]
    ReadPastEnd { page_number: usize, num_pages: usize },

    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("invalid page number {0}")]
    InvalidPageNumber(usize),

    #[error("field index {0} out of range")]
    FieldIndexOutOfRange(usize),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("unsupported aggregate operator for string fields (only COUNT is supported)")]
    UnsupportedAggregate,

    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("no such element")]
    NoSuchElement,

    #[error("operator already open")]
    AlreadyOpen,

    #[error("operator iterator not open")]
    IteratorNotOpen,

    #[error("no more tuples")]
    NoMoreTuples,

    #[error("heap file iterator is closed")]
    IteratorClosed,

    #[error("no victim page available for eviction")]
    NoVictim,

    #[error("transaction aborted")]
    TransactionAborted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;
