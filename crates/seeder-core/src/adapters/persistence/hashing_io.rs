//! Stream wrappers that digest everything passing through them.

use std::io::{self, Read, Write};

use crate::ports::{Digest256, DigestAccumulator};

/// Writer that digests every byte it forwards.
pub struct HashingWriter<W: Write> {
    inner: W,
    acc: Box<dyn DigestAccumulator>,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W, digest: &dyn Digest256) -> Self {
        Self {
            inner,
            acc: digest.accumulator(),
        }
    }

    /// Stop hashing; returns the inner writer and the digest so far.
    pub fn finish(self) -> (W, [u8; 32]) {
        (self.inner, self.acc.finalize())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.acc.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader that digests every byte it hands out.
pub struct HashingReader<R: Read> {
    inner: R,
    acc: Box<dyn DigestAccumulator>,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R, digest: &dyn Digest256) -> Self {
        Self {
            inner,
            acc: digest.accumulator(),
        }
    }

    /// Stop hashing; returns the inner reader and the digest so far.
    pub fn finish(self) -> (R, [u8; 32]) {
        (self.inner, self.acc.finalize())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.acc.update(&buf[..n]);
        Ok(n)
    }
}
