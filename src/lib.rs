//! Codec for Koikatu save files: splits a save into its fixed header regions and the
//! embedded character cards, and re-serializes the parts byte-for-byte.

mod card;
mod error;
mod save;
mod string;

pub use card::{CharacterCard, CARD_HEADER, CARD_SEPARATOR};
pub use error::{DecodeError, Error, FormatError, IndexError};
pub use save::SaveFile;
pub use string::PrefixedString;
