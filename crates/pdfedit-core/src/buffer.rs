//! Immutable PDF byte buffers
//!
//! A `PdfBuffer` is a shared, read-only snapshot of a complete PDF file.
//! Mutations never touch an existing buffer; they produce a new one, so any
//! clone handed to a render or count task stays valid after the document
//! has moved on.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Read-only snapshot of a complete PDF document
#[derive(Clone, PartialEq, Eq)]
pub struct PdfBuffer(Arc<[u8]>);

impl PdfBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when both handles point at the same allocation
    pub fn ptr_eq(&self, other: &PdfBuffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<u8>> for PdfBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        PdfBuffer(bytes.into())
    }
}

impl From<&[u8]> for PdfBuffer {
    fn from(bytes: &[u8]) -> Self {
        PdfBuffer(bytes.into())
    }
}

impl AsRef<[u8]> for PdfBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for PdfBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PdfBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdfBuffer({} bytes)", self.0.len())
    }
}

/// Identity of a buffer held by the document store
///
/// Assigned on every replacement and never reused within a store, so a task
/// tagged with an id can tell whether its result still applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub(crate) u64);

impl BufferId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_allocation() {
        let a = PdfBuffer::from(b"%PDF-1.7".to_vec());
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(b.as_bytes(), b"%PDF-1.7");
    }

    #[test]
    fn test_equal_contents_are_distinct_snapshots() {
        let a = PdfBuffer::from(&b"abc"[..]);
        let b = PdfBuffer::from(&b"abc"[..]);
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_debug_does_not_dump_bytes() {
        let buffer = PdfBuffer::from(vec![0u8; 42]);
        assert_eq!(format!("{:?}", buffer), "PdfBuffer(42 bytes)");
    }
}
