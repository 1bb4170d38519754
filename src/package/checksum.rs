use crate::core::{Checksum, ShelfResult};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Reusable MD5 content hasher
///
/// Bytes are fed through [`ContentHasher::reader`]; [`ContentHasher::finish`]
/// returns the digest and resets the state for the next file. Requires
/// `&mut self`, so one hasher can never serve two builds at once.
#[derive(Default)]
pub struct ContentHasher {
    hasher: Md5,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `inner` so that everything read through it is hashed
    pub fn reader<R: Read>(&mut self, inner: R) -> HashingReader<'_, R> {
        HashingReader {
            inner,
            hasher: &mut self.hasher,
            bytes_read: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Digest of everything hashed since the last reset, then reset
    pub fn finish(&mut self) -> Checksum {
        let digest = self.hasher.finalize_reset();
        let mut bytes = [0u8; Checksum::LEN];
        bytes.copy_from_slice(&digest);
        Checksum::from_bytes(bytes)
    }
}

/// A reader that hashes the bytes passing through it
pub struct HashingReader<'h, R> {
    inner: R,
    hasher: &'h mut Md5,
    bytes_read: u64,
}

impl<R> HashingReader<'_, R> {
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for HashingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}

/// Digest of an in-memory buffer
pub fn checksum_bytes(data: &[u8]) -> Checksum {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finish()
}

/// Digest and length of everything `reader` yields
pub fn checksum_reader<R: Read>(reader: R) -> io::Result<(Checksum, u64)> {
    let mut hasher = ContentHasher::new();
    let mut hashing = hasher.reader(reader);
    io::copy(&mut hashing, &mut io::sink())?;
    let size = hashing.bytes_read();
    Ok((hasher.finish(), size))
}

/// Digest and length of a file on disk
pub fn checksum_file(path: &Path) -> ShelfResult<(Checksum, u64)> {
    let file = File::open(path)?;
    Ok(checksum_reader(file)?)
}
