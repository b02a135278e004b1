use std::io::{self, Read, Seek, SeekFrom};

use thiserror::Error;
use tracing::{debug, warn};

use super::card::{Card, CardError, Parsed, Value, parse_card};

/// FITS logical record size
pub const BLOCK_SIZE: usize = 2880;
/// Card image size
pub const CARD_SIZE: usize = 80;
/// Largest `NAXIS` the standard allows
pub const MAX_NAXIS: i128 = 999;

#[derive(Debug, Error)]
pub enum FitsError {
    #[error("not a FITS file: first card is not SIMPLE")]
    NotFits,

    #[error("header of HDU {hdu} ends before its END card")]
    MissingEnd { hdu: usize },

    #[error("HDU {hdu} declares a data size that cannot be represented")]
    InvalidDataSize { hdu: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FitsError>;

/// One header section with every card in file order, malformed ones included
#[derive(Debug, Clone)]
pub struct Header {
    index: usize,
    entries: Vec<std::result::Result<Card, CardError>>,
}

impl Header {
    /// 0-based position of this HDU in the file
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entries(&self) -> &[std::result::Result<Card, CardError>] {
        &self.entries
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.entries.iter().filter_map(|e| e.as_ref().ok())
    }

    /// First card with the given keyword
    pub fn get(&self, keyword: &str) -> Option<&Card> {
        self.cards().find(|c| c.keyword == keyword)
    }

    pub fn integer(&self, keyword: &str) -> Option<i128> {
        match self.get(keyword)?.value {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn logical(&self, keyword: &str) -> Option<bool> {
        match self.get(keyword)?.value {
            Value::Logical(b) => Some(b),
            _ => None,
        }
    }

    /// Size in bytes of the data unit following this header, before padding.
    ///
    /// `|BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`, where random
    /// groups arrays (`GROUPS = T`, `NAXIS1 = 0`) leave out `NAXIS1`.
    /// `None` when `NAXIS` is over [`MAX_NAXIS`] or the size overflows.
    pub fn data_size(&self) -> Option<u64> {
        let naxis = self.integer("NAXIS").unwrap_or(0);
        if naxis <= 0 {
            return Some(0);
        }
        if naxis > MAX_NAXIS {
            return None;
        }

        let random_groups =
            self.logical("GROUPS") == Some(true) && self.integer("NAXIS1") == Some(0);
        let first_axis = if random_groups { 2 } else { 1 };

        let mut elements: i128 = 1;
        for axis in first_axis..=naxis {
            let len = self.integer(&format!("NAXIS{axis}")).unwrap_or(0).max(0);
            if len == 0 {
                elements = 0;
                break;
            }
            elements = elements.checked_mul(len)?;
        }

        let bytes_per_element = self.integer("BITPIX").unwrap_or(8).abs() / 8;
        let pcount = self.integer("PCOUNT").unwrap_or(0).max(0);
        let gcount = self.integer("GCOUNT").unwrap_or(1).max(0);

        let size = bytes_per_element
            .checked_mul(gcount)?
            .checked_mul(pcount.checked_add(elements)?)?;
        u64::try_from(size).ok()
    }

    fn push(&mut self, parsed: std::result::Result<Parsed, CardError>) {
        match parsed {
            Ok(Parsed::Card(card)) => self.entries.push(Ok(card)),
            Ok(Parsed::Continue { fragment, comment }) => self.extend_long_string(fragment, comment),
            Ok(Parsed::End) => {}
            Err(e) => self.entries.push(Err(e)),
        }
    }

    fn extend_long_string(&mut self, fragment: String, comment: String) {
        let target = match self.entries.last_mut() {
            Some(Ok(Card { value: Value::Str(s), comment: c, .. })) if s.ends_with('&') => {
                Some((s, c))
            }
            _ => None,
        };

        match target {
            Some((value, existing)) => {
                value.pop();
                value.push_str(&fragment);
                if !comment.is_empty() {
                    if !existing.is_empty() {
                        existing.push(' ');
                    }
                    existing.push_str(&comment);
                }
            }
            None => self.entries.push(Err(CardError::OrphanContinue)),
        }
    }
}

/// Walks the HDUs of a FITS stream, seeking over each data unit.
///
/// A zero-length source yields no HDUs. Bytes after the last HDU that do
/// not start an extension end the iteration with a warning.
pub struct HduReader<R> {
    inner: R,
    index: usize,
    done: bool,
}

impl<R: Read + Seek> HduReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            index: 0,
            done: false,
        }
    }

    /// Read the next header, or `None` once the stream is exhausted
    pub fn next_header(&mut self) -> Result<Option<Header>> {
        if self.done {
            return Ok(None);
        }

        let mut block = vec![0u8; BLOCK_SIZE];
        let filled = read_block(&mut self.inner, &mut block)?;
        if filled == 0 {
            self.done = true;
            return Ok(None);
        }

        let expected = if self.index == 0 { "SIMPLE" } else { "XTENSION" };
        if !block[..8].starts_with(expected.as_bytes()) {
            self.done = true;
            if self.index == 0 {
                return Err(FitsError::NotFits);
            }
            warn!(hdu = self.index, bytes = filled, "Ignoring trailing bytes after last HDU");
            return Ok(None);
        }

        let mut header = Header {
            index: self.index,
            entries: Vec::new(),
        };

        loop {
            if filled < BLOCK_SIZE {
                self.done = true;
                return Err(FitsError::MissingEnd { hdu: self.index });
            }

            let mut ended = false;
            for raw in block.chunks_exact(CARD_SIZE) {
                let parsed = parse_card(raw);
                if parsed == Ok(Parsed::End) {
                    ended = true;
                    break;
                }
                header.push(parsed);
            }
            if ended {
                break;
            }

            let next = read_block(&mut self.inner, &mut block)?;
            if next < BLOCK_SIZE {
                self.done = true;
                return Err(FitsError::MissingEnd { hdu: self.index });
            }
        }

        let data_size = header
            .data_size()
            .ok_or(FitsError::InvalidDataSize { hdu: self.index })?;
        let padded = data_size.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64;
        let skip = i64::try_from(padded).map_err(|_| FitsError::InvalidDataSize { hdu: self.index })?;
        self.inner.seek(SeekFrom::Current(skip))?;

        debug!(
            hdu = self.index,
            cards = header.entries.len(),
            data_size,
            "Parsed FITS header"
        );

        self.index += 1;
        Ok(Some(header))
    }
}

impl<R: Read + Seek> Iterator for HduReader<R> {
    type Item = Result<Header>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_header() {
            Ok(header) => header.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
