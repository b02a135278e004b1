//! Scoped staging area for objects that must be parsed with random access

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::ScratchKind;

#[derive(Debug)]
enum Backing {
    File(File),
    Memory(Cursor<Vec<u8>>),
}

/// Seekable scratch buffer, either an anonymous temp file or memory.
///
/// The temp file has no name on disk and is reclaimed when the `Scratch`
/// is dropped, including on early returns from a failed parse.
#[derive(Debug)]
pub struct Scratch {
    backing: Backing,
    written: u64,
}

impl Scratch {
    pub fn acquire(kind: ScratchKind, dir: Option<&Path>) -> io::Result<Self> {
        match kind {
            ScratchKind::File => Self::temp_file(dir),
            ScratchKind::Memory => Ok(Self::in_memory()),
        }
    }

    pub fn temp_file(dir: Option<&Path>) -> io::Result<Self> {
        let file = match dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(Self {
            backing: Backing::File(file),
            written: 0,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(Cursor::new(Vec::new())),
            written: 0,
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }
}

impl Read for Scratch {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.backing {
            Backing::File(f) => f.read(buf),
            Backing::Memory(c) => c.read(buf),
        }
    }
}

impl Write for Scratch {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match &mut self.backing {
            Backing::File(f) => f.write(buf)?,
            Backing::Memory(c) => c.write(buf)?,
        };
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.backing {
            Backing::File(f) => f.flush(),
            Backing::Memory(c) => c.flush(),
        }
    }
}

impl Seek for Scratch {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.backing {
            Backing::File(f) => f.seek(pos),
            Backing::Memory(c) => c.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn round_trip(mut scratch: Scratch) {
        scratch.write_all(b"header bytes").unwrap();
        assert_eq!(scratch.len(), 12);

        scratch.rewind().unwrap();
        scratch.seek(SeekFrom::Current(7)).unwrap();
        let mut tail = String::new();
        scratch.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "bytes");
    }

    #[test]
    fn test_memory_scratch() {
        let scratch = Scratch::acquire(ScratchKind::Memory, None).unwrap();
        assert!(scratch.is_empty());
        round_trip(scratch);
    }

    #[test]
    fn test_file_scratch_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        {
            let scratch = Scratch::acquire(ScratchKind::File, Some(dir.path())).unwrap();
            round_trip(scratch);
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
