use get_size::GetSize;
use std::fmt::Display;

pub type Timestamp = i64;

/// An owned `(timestamp, value bytes)` pair. Iterators hand out borrowed
/// `(Timestamp, &[u8])` tuples instead; `Sample` is what re-encoding and
/// test helpers collect into.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, GetSize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: Vec<u8>,
}

impl Sample {
    pub fn new(timestamp: Timestamp, value: impl Into<Vec<u8>>) -> Self {
        Sample {
            timestamp,
            value: value.into(),
        }
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {} bytes)", self.timestamp, self.value.len())
    }
}
