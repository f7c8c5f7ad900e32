use crate::error::{DecodeError, Error, FormatError};
use byteorder::ReadBytesExt;
use std::io::{Cursor, Read};

/// A length-prefixed UTF-8 string: one signed length byte followed by that many raw bytes.
///
/// The length byte is kept exactly as read and re-emitted verbatim by [`write`](Self::write),
/// never recomputed, so a decoded save always re-serializes to its original bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedString {
    value: String,
    encoded_len: i8,
}

impl PrefixedString {
    /// Builds a string whose length byte is derived from `value`.
    ///
    /// Fails if the UTF-8 encoding is longer than the 127 bytes a signed length byte can
    /// express.
    ///
    /// # Example
    /// ```
    /// # use kksavecodec::PrefixedString;
    /// let name = PrefixedString::new("cherry high").unwrap();
    /// assert_eq!(name.value(), "cherry high");
    /// assert_eq!(name.encoded_len(), 11);
    /// ```
    pub fn new(value: &str) -> Result<Self, Error> {
        let length = value.len();
        if length > i8::MAX as usize {
            return Err(FormatError::StringTooLong { length }.into());
        }

        Ok(Self {
            value: value.to_owned(),
            encoded_len: length as i8,
        })
    }

    /// Reads one string from the cursor, leaving it positioned at the first byte after the
    /// string. `field` names the surrounding save field for error reporting.
    pub fn read(reader: &mut Cursor<&[u8]>, field: &'static str) -> Result<Self, Error> {
        let offset = reader.position() as usize;
        let encoded_len = reader
            .read_i8()
            .map_err(|_| FormatError::UnexpectedEof { field, offset })?;

        // the format never emits a negative length, so one means the input is not a save file
        if encoded_len < 0 {
            return Err(FormatError::NegativeLength {
                field,
                length: encoded_len,
                offset,
            }
            .into());
        }

        let offset = reader.position() as usize;
        let mut raw = vec![0u8; encoded_len as usize];
        reader
            .read_exact(&mut raw)
            .map_err(|_| FormatError::UnexpectedEof { field, offset })?;

        let value = String::from_utf8(raw).map_err(|source| DecodeError {
            field,
            offset,
            source,
        })?;

        Ok(Self { value, encoded_len })
    }

    /// Appends the stored length byte and the string bytes to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.encoded_len as u8);
        out.extend_from_slice(self.value.as_bytes());
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn encoded_len(&self) -> i8 {
        self.encoded_len
    }
}
