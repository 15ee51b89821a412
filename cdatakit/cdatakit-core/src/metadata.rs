//! Schema metadata in the interchange layout.
//!
//! The encoding is an `i32` pair count followed, for each pair, by an `i32`
//! key length, the key bytes, an `i32` value length and the value bytes. All
//! integers use native byte order.

use crate::error::NodeError;

const LEN_SIZE: usize = size_of::<i32>();

fn invalid(reason: impl Into<String>) -> NodeError {
    NodeError::InvalidMetadata {
        reason: reason.into(),
    }
}

/// Encode key/value pairs into the interchange metadata layout.
pub fn encode_metadata<K: AsRef<str>, V: AsRef<str>>(
    pairs: &[(K, V)],
) -> Result<Vec<u8>, NodeError> {
    fn push_len(out: &mut Vec<u8>, len: usize) -> Result<(), NodeError> {
        let len = i32::try_from(len).map_err(|_| invalid(format!("length {len} exceeds i32")))?;
        out.extend_from_slice(&len.to_ne_bytes());
        Ok(())
    }

    let mut out = Vec::new();
    push_len(&mut out, pairs.len())?;
    for (key, value) in pairs {
        for part in [key.as_ref(), value.as_ref()] {
            push_len(&mut out, part.len())?;
            out.extend_from_slice(part.as_bytes());
        }
    }
    Ok(out)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], NodeError> {
        let end = self.pos.checked_add(len).ok_or_else(|| invalid("length overflow"))?;
        let bytes = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| invalid(format!("truncated at byte {}", self.pos)))?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_len(&mut self) -> Result<usize, NodeError> {
        let mut raw = [0_u8; LEN_SIZE];
        raw.copy_from_slice(self.take(LEN_SIZE)?);
        let len = i32::from_ne_bytes(raw);
        usize::try_from(len).map_err(|_| invalid(format!("negative length {len}")))
    }

    fn read_string(&mut self) -> Result<String, NodeError> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| invalid(e.to_string()))
    }
}

/// Decode interchange metadata bytes into key/value pairs.
pub fn decode_metadata(bytes: &[u8]) -> Result<Vec<(String, String)>, NodeError> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let count = cursor.read_len()?;
    let mut pairs = Vec::new();
    for _ in 0..count {
        let key = cursor.read_string()?;
        let value = cursor.read_string()?;
        pairs.push((key, value));
    }
    if cursor.pos != bytes.len() {
        return Err(invalid(format!(
            "{} trailing bytes",
            bytes.len() - cursor.pos
        )));
    }
    Ok(pairs)
}

/// Total byte length of the encoding starting at `ptr`.
///
/// # Safety
/// `ptr` must point to a complete, well-formed metadata encoding.
pub(crate) unsafe fn encoded_len(ptr: *const u8) -> Result<usize, NodeError> {
    // SAFETY: guaranteed by the caller for every length prefix visited.
    let read_len = |pos: usize| -> Result<usize, NodeError> {
        let len = unsafe { ptr.add(pos).cast::<i32>().read_unaligned() };
        usize::try_from(len).map_err(|_| invalid(format!("negative length {len}")))
    };

    let count = read_len(0)?;
    let mut pos = LEN_SIZE;
    for _ in 0..count * 2 {
        pos += LEN_SIZE + read_len(pos)?;
    }
    Ok(pos)
}
