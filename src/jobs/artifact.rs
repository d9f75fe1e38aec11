//! Artifact Module
//!
//! The named byte payload a log extraction job hands back.

// == Artifact ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Suggested download name
    pub filename: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
