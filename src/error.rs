use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
/// Enum for various errors in the chunk codec.
pub enum TsdbError {
    #[error("Chunk at full capacity. Max capacity {0}.")]
    CapacityFull(usize),

    #[error("Cannot append to an immutable chunk")]
    ImmutableChunk,

    #[error("Decoding error. {0}")]
    DecodingError(String),

    #[error("Compression error. {0}")]
    CannotCompress(String),

    #[error("Decompression error. {0}")]
    CannotDecompress(String),

    #[error("Invalid chunk encoding. {0}")]
    InvalidEncoding(String),

    #[error("Unsupported operation. {0}")]
    UnsupportedOperation(&'static str),
}

pub type TsdbResult<T = ()> = Result<T, TsdbError>;
