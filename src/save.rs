use crate::card::{find_subslice, CharacterCard, CARD_HEADER};
use crate::error::{Error, FormatError, IndexError};
use crate::string::PrefixedString;
use log::debug;
use std::io::{Cursor, Read};
use std::path::Path;

const LEADING_LEN: usize = 7;
const MID_LEN: usize = 17;

/// A parsed save file: two opaque header regions, the school name and the ordered list
/// of embedded character cards.
///
/// Re-serializing an unmodified save reproduces the input byte for byte.
///
/// # Example
/// ```
/// # use kksavecodec::SaveFile;
/// // 7 leading bytes, a zero-length school name, 17 mid bytes, no cards
/// let bytes = [0u8; 25];
/// let save = SaveFile::from_bytes(&bytes).unwrap();
/// assert_eq!(save.card_count(), 0);
/// assert_eq!(save.to_bytes(), bytes);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    leading: [u8; LEADING_LEN],
    school_name: PrefixedString,
    mid: [u8; MID_LEN],
    cards: Vec<CharacterCard>,
}

impl SaveFile {
    /// Reads and parses the save file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parses a complete save file from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = Cursor::new(bytes);

        let leading = read_fixed(&mut reader, "leading bytes")?;
        let school_name = PrefixedString::read(&mut reader, "school name")?;
        let mid = read_fixed(&mut reader, "mid bytes")?;

        // everything after the fixed header is card segments delimited by the card header
        let tail_start = reader.position() as usize;
        let cards = split_cards(&bytes[tail_start..], tail_start)?;

        debug!(
            "parsed save file: school {:?}, {} cards",
            school_name.value(),
            cards.len()
        );

        Ok(Self {
            leading,
            school_name,
            mid,
            cards,
        })
    }

    /// Serializes the save to `path`. The written bytes equal [`to_bytes`](Self::to_bytes).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Serializes the save file back into its on-disk byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let cards_len: usize = self.cards.iter().map(CharacterCard::byte_len).sum();
        let mut out = Vec::with_capacity(LEADING_LEN + 1 + MID_LEN + cards_len);

        out.extend_from_slice(&self.leading);
        self.school_name.write(&mut out);
        out.extend_from_slice(&self.mid);
        for card in &self.cards {
            card.encode_into(&mut out);
        }

        out
    }

    pub fn school_name(&self) -> &str {
        self.school_name.value()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// The embedded cards in file order.
    pub fn cards(&self) -> &[CharacterCard] {
        &self.cards
    }

    /// The card at `index`, or an index error past the end.
    pub fn card(&self, index: usize) -> Result<&CharacterCard, Error> {
        self.cards.get(index).ok_or_else(|| {
            IndexError {
                index,
                count: self.cards.len(),
            }
            .into()
        })
    }

    /// Swaps the card at `index` for `card`. Purely in-memory, no other field changes.
    pub fn replace_card(&mut self, index: usize, card: CharacterCard) -> Result<(), Error> {
        match self.cards.get_mut(index) {
            Some(slot) => {
                *slot = card;
                Ok(())
            }
            None => Err(IndexError {
                index,
                count: self.cards.len(),
            }
            .into()),
        }
    }
}

/// Reads a fixed-size opaque field, reporting `field` and the offset on short input.
fn read_fixed<const N: usize>(
    reader: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<[u8; N], Error> {
    let offset = reader.position() as usize;
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|_| FormatError::UnexpectedEof { field, offset })?;
    Ok(buf)
}

/// Splits the tail into card segments and decodes each one.
///
/// A manual scan over the raw bytes rather than a split-on-delimiter: every occurrence of
/// [`CARD_HEADER`] starts a segment that runs to the next occurrence (or the end), so each
/// segment keeps the header it was delimited by and its absolute file offset. Bytes before
/// the first occurrence form a headerless segment that the card codec rejects.
fn split_cards(tail: &[u8], base: usize) -> Result<Vec<CharacterCard>, Error> {
    if tail.is_empty() {
        return Ok(Vec::new());
    }

    let mut starts = Vec::new();
    let mut from = 0;
    while let Some(position) = find_subslice(&tail[from..], CARD_HEADER) {
        starts.push(from + position);
        from += position + CARD_HEADER.len();
    }
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }

    let mut cards = Vec::with_capacity(starts.len());
    for (index, &start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(tail.len());
        cards.push(CharacterCard::decode_at(&tail[start..end], base + start)?);
    }

    Ok(cards)
}
