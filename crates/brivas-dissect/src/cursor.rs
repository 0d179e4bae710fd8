//! Bounds-checked read access over a captured frame

use crate::errors::{DissectError, Result};
use bytes::Bytes;

/// Immutable view over frame bytes.
///
/// Sub-views created with [`ByteCursor::subset`] share the underlying
/// buffer and remember their position in the original frame, so field
/// offsets reported by decoders are always frame-absolute.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    origin: usize,
}

impl ByteCursor {
    pub fn new(data: Bytes) -> Self {
        Self { data, origin: 0 }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Frame-absolute position of this view's first byte
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Translate a view-relative offset into a frame-absolute one
    pub fn absolute(&self, offset: usize) -> usize {
        self.origin + offset
    }

    pub fn remaining(&self, offset: usize) -> usize {
        self.data.len().saturating_sub(offset)
    }

    /// Fail with `Truncated` unless `len` bytes are readable at `offset`
    pub fn ensure(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(DissectError::Truncated {
                offset: self.absolute(offset),
                needed: len,
                available: self.remaining(offset),
            }),
        }
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        self.ensure(offset, 1)?;
        Ok(self.data[offset])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        self.ensure(offset, 2)?;
        Ok(u16::from_be_bytes([self.data[offset], self.data[offset + 1]]))
    }

    pub fn read_u24(&self, offset: usize) -> Result<u32> {
        self.ensure(offset, 3)?;
        let b = &self.data[offset..offset + 3];
        Ok(((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32)
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        self.ensure(offset, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.data[offset..offset + 4]);
        Ok(u32::from_be_bytes(raw))
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64> {
        self.ensure(offset, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.data[offset..offset + 8]);
        Ok(u64::from_be_bytes(raw))
    }

    /// Borrow `len` bytes at `offset`
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.ensure(offset, len)?;
        Ok(&self.data[offset..offset + len])
    }

    /// Zero-copy slice of `len` bytes at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Result<Bytes> {
        self.ensure(offset, len)?;
        Ok(self.data.slice(offset..offset + len))
    }

    /// Everything from `offset` to the end of the view (empty past the end)
    pub fn tail(&self, offset: usize) -> Bytes {
        if offset >= self.data.len() {
            Bytes::new()
        } else {
            self.data.slice(offset..)
        }
    }

    /// Bounded sub-view of `len` bytes at `offset`
    pub fn subset(&self, offset: usize, len: usize) -> Result<ByteCursor> {
        self.ensure(offset, len)?;
        Ok(ByteCursor {
            data: self.data.slice(offset..offset + len),
            origin: self.absolute(offset),
        })
    }

    /// Sub-view of at most `len` bytes; shorter when the view ends first
    pub fn subset_clamped(&self, offset: usize, len: usize) -> ByteCursor {
        let start = offset.min(self.data.len());
        let end = start + len.min(self.remaining(start));
        ByteCursor {
            data: self.data.slice(start..end),
            origin: self.absolute(start),
        }
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }
}

impl From<Bytes> for ByteCursor {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for ByteCursor {
    fn from(data: Vec<u8>) -> Self {
        Self::new(Bytes::from(data))
    }
}
