use crate::error::{Error, FormatError};
use byteorder::{BigEndian, ByteOrder};
use log::trace;

/// Constant that prefixes every embedded character card and delimits cards inside the
/// save file's tail.
pub const CARD_HEADER: &[u8] = b"\x64\x00\x00\x00\x12\xe3\x80\x90KoiKatuChara\xe3\x80\x91";

/// Boundary constant inside a card's own framing, separating the primary character
/// data from the additional data.
pub const CARD_SEPARATOR: [u8; 8] = [0xFF; 8];

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// One embedded character record: a PNG thumbnail and two opaque attribute blobs.
///
/// The blobs are byte ranges of the original card, kept verbatim so that
/// [`to_bytes`](Self::to_bytes) reproduces the card exactly. The primary blob keeps its
/// trailing [`CARD_SEPARATOR`]; re-encoding is plain concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterCard {
    thumbnail: Vec<u8>,
    primary_data: Vec<u8>,
    additional_data: Vec<u8>,
}

impl CharacterCard {
    /// Decodes one card from a segment that starts with [`CARD_HEADER`].
    ///
    /// # Example
    /// ```
    /// # use kksavecodec::CharacterCard;
    /// let err = CharacterCard::decode(b"not a card").unwrap_err();
    /// assert_eq!(err.to_string(), "missing card header at offset 0");
    /// ```
    pub fn decode(segment: &[u8]) -> Result<Self, Error> {
        Self::decode_at(segment, 0)
    }

    /// Like [`decode`](Self::decode), with `base` as the segment's absolute file offset so
    /// errors point into the original file.
    pub(crate) fn decode_at(segment: &[u8], base: usize) -> Result<Self, Error> {
        if !segment.starts_with(CARD_HEADER) {
            return Err(FormatError::MissingCardHeader { offset: base }.into());
        }

        let body = &segment[CARD_HEADER.len()..];
        let body_base = base + CARD_HEADER.len();

        // the thumbnail's extent comes from the png's own framing
        let thumbnail_len = png_extent(body, body_base)?;
        let rest = &body[thumbnail_len..];

        // primary data runs up to and including the separator, additional data is the rest
        let separator = find_subslice(rest, &CARD_SEPARATOR).ok_or(FormatError::MissingSeparator {
            offset: body_base + thumbnail_len,
        })?;
        let primary_end = separator + CARD_SEPARATOR.len();

        trace!(
            "card at offset {base}: {thumbnail_len} byte thumbnail, {primary_end} byte primary blob, {} byte additional blob",
            rest.len() - primary_end
        );

        Ok(Self {
            thumbnail: body[..thumbnail_len].to_vec(),
            primary_data: rest[..primary_end].to_vec(),
            additional_data: rest[primary_end..].to_vec(),
        })
    }

    /// Re-encodes the card, reproducing the decoded segment byte for byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        self.encode_into(&mut out);
        out
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(CARD_HEADER);
        out.extend_from_slice(&self.thumbnail);
        out.extend_from_slice(&self.primary_data);
        out.extend_from_slice(&self.additional_data);
    }

    pub(crate) fn byte_len(&self) -> usize {
        CARD_HEADER.len() + self.thumbnail.len() + self.primary_data.len() + self.additional_data.len()
    }

    /// The card's thumbnail, a complete PNG stream.
    pub fn thumbnail(&self) -> &[u8] {
        &self.thumbnail
    }

    /// Core character attributes, opaque to this codec. Ends with [`CARD_SEPARATOR`].
    pub fn primary_data(&self) -> &[u8] {
        &self.primary_data
    }

    /// Extended and plugin attributes, opaque to this codec. May be empty.
    pub fn additional_data(&self) -> &[u8] {
        &self.additional_data
    }
}

/// Returns the byte length of the PNG stream at the start of `body`, found by walking the
/// chunk length fields from the signature up to and including IEND. Chunk CRCs are copied,
/// not checked.
fn png_extent(body: &[u8], base: usize) -> Result<usize, Error> {
    if !body.starts_with(&PNG_SIGNATURE) {
        return Err(FormatError::InvalidThumbnail { offset: base }.into());
    }

    let mut pos = PNG_SIGNATURE.len();
    loop {
        // each chunk is a 4-byte big-endian data length, 4-byte type, data, 4-byte crc
        if pos + 8 > body.len() {
            return Err(FormatError::UnexpectedEof {
                field: "thumbnail chunk",
                offset: base + pos,
            }
            .into());
        }
        let data_len = BigEndian::read_u32(&body[pos..pos + 4]) as usize;
        let chunk_type = &body[pos + 4..pos + 8];
        let chunk_end = pos + 8 + data_len + 4;
        if chunk_end > body.len() {
            return Err(FormatError::UnexpectedEof {
                field: "thumbnail chunk",
                offset: base + pos,
            }
            .into());
        }

        if chunk_type == b"IEND" {
            return Ok(chunk_end);
        }
        pos = chunk_end;
    }
}

/// First occurrence of `needle` in `haystack`.
pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
fn push_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);
    // crc is carried opaquely, a placeholder is fine
    png.extend_from_slice(&[0; 4]);
}

/// Minimal well-formed PNG stream for tests.
#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    let mut png = PNG_SIGNATURE.to_vec();
    push_chunk(&mut png, b"IHDR", &[0; 13]);
    push_chunk(&mut png, b"IDAT", &[1, 2, 3, 4, 5]);
    push_chunk(&mut png, b"IEND", &[]);
    png
}

/// Complete card segment (header included) for tests.
#[cfg(test)]
pub(crate) fn card_segment(primary: &[u8], additional: &[u8]) -> Vec<u8> {
    let mut segment = CARD_HEADER.to_vec();
    segment.extend_from_slice(&tiny_png());
    segment.extend_from_slice(primary);
    segment.extend_from_slice(&CARD_SEPARATOR);
    segment.extend_from_slice(additional);
    segment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_splits_the_three_blobs() {
        let segment = card_segment(b"primary", b"additional");
        let card = CharacterCard::decode(&segment).unwrap();

        assert_eq!(card.thumbnail(), tiny_png());
        assert_eq!(card.primary_data(), b"primary\xff\xff\xff\xff\xff\xff\xff\xff");
        assert_eq!(card.additional_data(), b"additional");
    }

    #[test]
    fn encode_is_the_exact_inverse() {
        let segment = card_segment(b"some primary bytes", b"plugin data");
        let card = CharacterCard::decode(&segment).unwrap();
        assert_eq!(card.to_bytes(), segment);
    }

    #[test]
    fn empty_additional_data_round_trips() {
        let segment = card_segment(b"primary", b"");
        let card = CharacterCard::decode(&segment).unwrap();
        assert_eq!(card.additional_data(), b"");
        assert_eq!(card.to_bytes(), segment);
    }

    #[test]
    fn missing_header_is_rejected() {
        let mut segment = card_segment(b"primary", b"additional");
        segment[0] ^= 1;

        let err = CharacterCard::decode(&segment).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::MissingCardHeader { offset: 0 })
        ));
    }

    #[test]
    fn non_png_thumbnail_is_rejected() {
        let mut segment = CARD_HEADER.to_vec();
        segment.extend_from_slice(b"this is not a png");

        let err = CharacterCard::decode(&segment).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::InvalidThumbnail { .. })
        ));
    }

    #[test]
    fn truncated_png_is_rejected() {
        let mut segment = CARD_HEADER.to_vec();
        let png = tiny_png();
        // cut the stream in the middle of the IDAT chunk
        segment.extend_from_slice(&png[..png.len() - 20]);

        let err = CharacterCard::decode(&segment).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::UnexpectedEof {
                field: "thumbnail chunk",
                ..
            })
        ));
    }

    #[test]
    fn missing_separator_is_rejected() {
        let mut segment = CARD_HEADER.to_vec();
        segment.extend_from_slice(&tiny_png());
        segment.extend_from_slice(b"primary data with no separator");

        let err = CharacterCard::decode(&segment).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::MissingSeparator { .. })
        ));
    }

    #[test]
    fn error_offsets_are_absolute() {
        let err = CharacterCard::decode_at(b"junk", 1000).unwrap_err();
        assert_eq!(err.offset(), Some(1000));
    }

    #[test]
    fn find_subslice_scans_bytes() {
        assert_eq!(find_subslice(b"abcdef", b"cd"), Some(2));
        assert_eq!(find_subslice(b"abcdef", b"xy"), None);
        assert_eq!(find_subslice(b"", b"a"), None);
    }
}
