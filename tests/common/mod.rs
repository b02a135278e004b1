//! Shared fixtures: FITS byte builders and an in-memory handler

#![allow(dead_code)]

use fitslake::config::{ExtractorConfig, ScratchKind};
use fitslake::handlers::{EventRecord, FitsHeaderHandler, S3Event};
use fitslake::humanize::ByteSize;
use fitslake::storage::StorageClient;

pub const BLOCK: usize = 2880;
pub const DESTINATION: &str = "fitsstore";

/// Builds a FITS byte stream HDU by HDU
#[derive(Default)]
pub struct FitsBuilder {
    bytes: Vec<u8>,
}

impl FitsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header (END added) followed by `data_len` zero bytes, both block padded
    pub fn hdu(mut self, cards: &[&str], data_len: usize) -> Self {
        let start = self.bytes.len();
        for card in cards.iter().chain(std::iter::once(&"END")) {
            self.bytes.extend(format!("{card:<80}").into_bytes());
        }
        pad(&mut self.bytes, start, b' ');

        if data_len > 0 {
            let start = self.bytes.len();
            self.bytes.resize(start + data_len, 0);
            pad(&mut self.bytes, start, 0);
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn pad(bytes: &mut Vec<u8>, start: usize, fill: u8) {
    let len = bytes.len() - start;
    bytes.resize(start + len.div_ceil(BLOCK) * BLOCK, fill);
}

/// Primary header with no data plus one 8x8 16-bit image extension
pub fn two_hdu_file() -> Vec<u8> {
    FitsBuilder::new()
        .hdu(
            &[
                "SIMPLE  =                    T / conforms to FITS standard",
                "BITPIX  =                    8 / array data type",
                "NAXIS   =                    0 / number of array dimensions",
                "EXTEND  =                    T",
                "HISTORY   created by the test suite",
            ],
            0,
        )
        .hdu(
            &[
                "XTENSION= 'IMAGE   '           / Image extension",
                "BITPIX  =                   16 / array data type",
                "NAXIS   =                    2 / number of array dimensions",
                "NAXIS1  =                    8",
                "NAXIS2  =                    8",
                "PCOUNT  =                    0 / number of parameters",
                "GCOUNT  =                    1 / number of groups",
                "EXPTIME =                 30.0 / exposure time in seconds",
            ],
            8 * 8 * 2,
        )
        .build()
}

pub fn settings() -> ExtractorConfig {
    ExtractorConfig {
        max_object_bytes: ByteSize::mib(1),
        scratch: ScratchKind::Memory,
        scratch_dir: None,
    }
}

pub fn handler(storage: &StorageClient) -> FitsHeaderHandler {
    FitsHeaderHandler::new(storage.clone(), DESTINATION, settings())
}

pub fn event(records: &[(&str, &str, &str)]) -> S3Event {
    S3Event {
        records: records
            .iter()
            .map(|(name, bucket, key)| EventRecord::new(name, bucket, key))
            .collect(),
    }
}

pub async fn read_output(storage: &StorageClient, key: &str) -> String {
    let bytes = storage.download(DESTINATION, key).await.unwrap();
    String::from_utf8(bytes).unwrap()
}
