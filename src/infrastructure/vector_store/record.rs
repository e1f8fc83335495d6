//! Binary framing of one vector-log record:
//!
//! ```text
//! [key: 7-bit length + UTF-8][content: 7-bit length + UTF-8]
//! [vector length: i32 LE][vector length x f32 LE]
//! ```
//!
//! String lengths use the unsigned LEB128 ("7-bit encoded int") prefix, at
//! most five bytes, capped at `i32::MAX`.

use std::io::{ErrorKind, Read};

use crate::domain::{Result, RetrievalError};

const MAX_PREFIX_SHIFT: u32 = 28;

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub key: String,
    pub content: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Record(LogRecord),
    /// Clean end of file at a record boundary.
    End,
    /// End of file inside the record starting at `offset`.
    Truncated { offset: u64 },
}

pub fn encode_record(key: &str, content: &str, vector: &[f32]) -> Result<Vec<u8>> {
    let vector_len = i32::try_from(vector.len()).map_err(|_| {
        RetrievalError::validation(format!("vector of {} floats is too long", vector.len()))
    })?;

    let mut buf = Vec::with_capacity(key.len() + content.len() + 10 + vector.len() * 4);
    write_prefixed_str(&mut buf, key)?;
    write_prefixed_str(&mut buf, content)?;
    buf.extend_from_slice(&vector_len.to_le_bytes());
    for &value in vector {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    Ok(buf)
}

fn write_prefixed_str(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    let len = i32::try_from(s.len())
        .map_err(|_| RetrievalError::validation(format!("string of {} bytes is too long", s.len())))?;
    write_7bit(buf, len as u32);
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_7bit(buf: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Length of the complete record of `dimension` floats that starts at
/// `bytes[0]`, if one decodes there.
pub fn complete_record_len(bytes: &[u8], dimension: usize) -> Option<usize> {
    let mut at = 0;
    for _ in 0..2 {
        let (len, used) = decode_7bit(bytes.get(at..)?)?;
        at += used;
        let end = at.checked_add(len as usize)?;
        std::str::from_utf8(bytes.get(at..end)?).ok()?;
        at = end;
    }

    let len_bytes: [u8; 4] = bytes.get(at..at.checked_add(4)?)?.try_into().ok()?;
    if usize::try_from(i32::from_le_bytes(len_bytes)).ok()? != dimension {
        return None;
    }
    at += 4;

    let end = at.checked_add(dimension.checked_mul(4)?)?;
    (end <= bytes.len()).then_some(end)
}

/// First offset after the start of `bytes` where a complete record decodes.
/// A torn final record never contains one; a corrupt interior record is
/// followed by at least one.
pub fn find_complete_record(bytes: &[u8], dimension: usize) -> Option<usize> {
    (1..bytes.len()).find(|&start| complete_record_len(&bytes[start..], dimension).is_some())
}

fn decode_7bit(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value = 0u32;
    for (i, &byte) in bytes.iter().take(5).enumerate() {
        let shift = 7 * i as u32;
        if shift == MAX_PREFIX_SHIFT {
            return (byte <= 0x07).then(|| (value | (u32::from(byte) << shift), i + 1));
        }
        value |= u32::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

enum Interrupt {
    Eof,
    Fault(RetrievalError),
}

impl From<RetrievalError> for Interrupt {
    fn from(e: RetrievalError) -> Self {
        Self::Fault(e)
    }
}

/// Streaming decoder that tells a torn final record apart from corruption.
pub struct RecordReader<R> {
    reader: R,
    position: u64,
    expected_dimension: Option<usize>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R, expected_dimension: Option<usize>) -> Self {
        Self {
            reader,
            position: 0,
            expected_dimension,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn next_record(&mut self) -> Result<ReadOutcome> {
        let start = self.position;

        let first = match self.read_byte() {
            Ok(byte) => byte,
            Err(Interrupt::Eof) => return Ok(ReadOutcome::End),
            Err(Interrupt::Fault(e)) => return Err(e),
        };

        match self.read_body(start, first) {
            Ok(record) => Ok(ReadOutcome::Record(record)),
            Err(Interrupt::Eof) => Ok(ReadOutcome::Truncated { offset: start }),
            Err(Interrupt::Fault(e)) => Err(e),
        }
    }

    fn read_body(&mut self, start: u64, first: u8) -> std::result::Result<LogRecord, Interrupt> {
        let key = self.read_string(start, Some(first), "key")?;
        let content = self.read_string(start, None, "content")?;

        let mut len_bytes = [0u8; 4];
        self.fill(&mut len_bytes)?;
        let len = i32::from_le_bytes(len_bytes);
        if len < 0 {
            return Err(RetrievalError::corrupt(start, format!("negative vector length {len}")).into());
        }
        let len = len as usize;
        if let Some(expected) = self.expected_dimension {
            if len != expected {
                return Err(RetrievalError::corrupt(
                    start,
                    format!("vector length {len} does not match dimension {expected}"),
                )
                .into());
            }
        }

        let mut vector = Vec::with_capacity(len.min(4096));
        let mut value = [0u8; 4];
        for _ in 0..len {
            self.fill(&mut value)?;
            vector.push(f32::from_le_bytes(value));
        }

        Ok(LogRecord {
            key,
            content,
            vector,
        })
    }

    fn read_string(
        &mut self,
        start: u64,
        first: Option<u8>,
        field: &str,
    ) -> std::result::Result<String, Interrupt> {
        let len = self.read_7bit(start, first)? as u64;

        let mut bytes = Vec::new();
        (&mut self.reader)
            .take(len)
            .read_to_end(&mut bytes)
            .map_err(|e| Interrupt::Fault(e.into()))?;
        self.position += bytes.len() as u64;
        if (bytes.len() as u64) < len {
            return Err(Interrupt::Eof);
        }

        String::from_utf8(bytes).map_err(|_| {
            RetrievalError::corrupt(start, format!("{field} is not valid UTF-8")).into()
        })
    }

    fn read_7bit(&mut self, start: u64, first: Option<u8>) -> std::result::Result<u32, Interrupt> {
        let mut value = 0u32;
        let mut shift = 0u32;
        let mut pending = first;

        loop {
            let byte = match pending.take() {
                Some(byte) => byte,
                None => self.read_byte()?,
            };

            if shift == MAX_PREFIX_SHIFT {
                // Fifth byte may only carry the top bits of a non-negative i32.
                if byte > 0x07 {
                    return Err(RetrievalError::corrupt(start, "string length prefix overflows").into());
                }
                return Ok(value | (u32::from(byte) << shift));
            }

            value |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn read_byte(&mut self) -> std::result::Result<u8, Interrupt> {
        let mut byte = [0u8; 1];
        self.fill(&mut byte)?;
        Ok(byte[0])
    }

    fn fill(&mut self, buf: &mut [u8]) -> std::result::Result<(), Interrupt> {
        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Interrupt::Eof),
            Err(e) => Err(Interrupt::Fault(e.into())),
        }
    }
}
