use thiserror::Error;

/// Any error raised while loading, mutating or saving a save file.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("i/o failure")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the absolute byte offset the error was raised at, when one is known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Format(err) => err.offset(),
            Error::Decode(err) => Some(err.offset),
            _ => None,
        }
    }
}

/// Structural mismatch between the input bytes and the save-file layout.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unexpected end of input reading {field} at offset {offset}")]
    UnexpectedEof { field: &'static str, offset: usize },
    #[error("negative length byte ({length}) for {field} at offset {offset}")]
    NegativeLength {
        field: &'static str,
        length: i8,
        offset: usize,
    },
    #[error("missing card header at offset {offset}")]
    MissingCardHeader { offset: usize },
    #[error("card thumbnail at offset {offset} is not a png stream")]
    InvalidThumbnail { offset: usize },
    #[error("no card separator found after offset {offset}")]
    MissingSeparator { offset: usize },
    #[error("string of {length} bytes does not fit a one-byte length field")]
    StringTooLong { length: usize },
}

impl FormatError {
    /// Absolute byte offset of the mismatch, when the error came from parsing input.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            FormatError::UnexpectedEof { offset, .. } => Some(offset),
            FormatError::NegativeLength { offset, .. } => Some(offset),
            FormatError::MissingCardHeader { offset } => Some(offset),
            FormatError::InvalidThumbnail { offset } => Some(offset),
            FormatError::MissingSeparator { offset } => Some(offset),
            FormatError::StringTooLong { .. } => None,
        }
    }
}

/// Bytes that should hold UTF-8 text failed to decode.
#[derive(Error, Debug)]
#[error("{field} at offset {offset} is not valid utf-8")]
pub struct DecodeError {
    pub field: &'static str,
    pub offset: usize,
    #[source]
    pub source: std::string::FromUtf8Error,
}

/// A card index outside the bounds of the save's card list.
#[derive(Error, Debug)]
#[error("card index {index} out of bounds for {count} cards")]
pub struct IndexError {
    pub index: usize,
    pub count: usize,
}
