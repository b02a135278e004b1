//! FITS header reader
//!
//! Parses the header sections of a FITS file (a sequence of 2880-byte
//! blocks of 80-byte card images) without touching the data units, which
//! are skipped by seeking. Needs random access, so callers stage the
//! object in a [`crate::storage::Scratch`] area first.
//!
//! Malformed cards are kept in [`Header::entries`] as [`CardError`]s so the
//! caller can decide to skip them; only structural problems (not a FITS
//! file, header without END) surface as [`FitsError`].

mod card;
mod reader;

pub use card::{COMMENTARY_KEYWORDS, Card, CardError, Value};
pub use reader::{BLOCK_SIZE, CARD_SIZE, FitsError, HduReader, Header, Result};
