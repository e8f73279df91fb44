//! Wire formats for the index
//!
//! Two forms, both built from the bitmap library's own serialization:
//!
//! - **Byte-array form**: a sequence of `bit_count + 1` buffers. Element 0 is
//!   the existence bitmap; element `i > 0` is plane `i - 1`. Empty elements
//!   mean "no plane here" and are skipped on decode.
//! - **Stream form**: the existence bitmap's frame followed by each plane's
//!   frame, back to back. Frames are self-delimiting, so reading stops at a
//!   clean end of stream; a frame that dies mid-read is corruption and is
//!   reported with the plane index.

use std::io::{ErrorKind, Read, Write};

use tracing::debug;

use crate::bitmap::Bitmap;
use crate::bsi::BitSliceIndex;
use crate::error::{Error, Result};

/// `Read` wrapper counting consumed bytes, to tell a clean end of stream
/// (zero bytes of a new frame read) from a truncated frame.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    fn bytes_read(&self) -> u64 {
        self.count
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

impl BitSliceIndex {
    /// Serialize to the byte-array form
    pub fn marshal_binary(&self) -> Result<Vec<Vec<u8>>> {
        let mut data = Vec::with_capacity(self.planes.len() + 1);
        data.push(self.existence.to_bytes().map_err(|source| {
            Error::Serialization {
                context: "encoding existence bitmap".to_string(),
                source,
            }
        })?);
        for (j, plane) in self.planes.iter().enumerate() {
            data.push(plane.to_bytes().map_err(|source| Error::Serialization {
                context: format!("encoding bit slice {j}"),
                source,
            })?);
        }
        Ok(data)
    }

    /// Decode the byte-array form produced by
    /// [`marshal_binary`](BitSliceIndex::marshal_binary)
    ///
    /// Element 0 holds the existence bitmap (empty means none). Elements past
    /// 0 are planes in least-to-most significant order; empty elements are
    /// skipped, and the plane stack grows to the highest non-empty element.
    pub fn unmarshal_binary(&mut self, data: &[Vec<u8>]) -> Result<()> {
        for (i, entry) in data.iter().enumerate().skip(1) {
            if entry.is_empty() {
                continue;
            }
            while self.planes.len() < i {
                let mut plane = Bitmap::new();
                if self.run_optimized {
                    plane.run_optimize();
                }
                self.planes.push(plane);
            }
            let mut plane =
                Bitmap::from_bytes(entry).map_err(|source| Error::Serialization {
                    context: format!("decoding bit slice {}", i - 1),
                    source,
                })?;
            if self.run_optimized {
                plane.run_optimize();
            }
            self.planes[i - 1] = plane;
        }

        match data.first() {
            Some(entry) if !entry.is_empty() => {
                let mut existence =
                    Bitmap::from_bytes(entry).map_err(|source| Error::Serialization {
                        context: "decoding existence bitmap".to_string(),
                        source,
                    })?;
                if self.run_optimized {
                    existence.run_optimize();
                }
                self.existence = existence;
            }
            _ => {
                self.existence = Bitmap::new();
                if self.run_optimized {
                    self.existence.run_optimize();
                }
            }
        }
        Ok(())
    }

    /// Write the stream form; returns the bytes written
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<u64> {
        let mut written =
            self.existence
                .write_into(&mut writer)
                .map_err(|source| Error::Serialization {
                    context: "writing existence bitmap".to_string(),
                    source,
                })?;
        for (j, plane) in self.planes.iter().enumerate() {
            written += plane
                .write_into(&mut writer)
                .map_err(|source| Error::Serialization {
                    context: format!("writing bit slice {j}"),
                    source,
                })?;
        }
        debug!(bytes = written, planes = self.planes.len(), "wrote index");
        Ok(written)
    }

    /// Replace this index with the stream form; returns the bytes consumed
    ///
    /// The first frame becomes the existence bitmap; every following frame
    /// becomes the next plane, until the stream ends.
    pub fn read_from<R: Read>(&mut self, reader: R) -> Result<u64> {
        let mut reader = CountingReader::new(reader);

        self.existence =
            Bitmap::read_into(&mut reader).map_err(|source| Error::Serialization {
                context: "reading existence bitmap".to_string(),
                source,
            })?;

        self.planes.clear();
        loop {
            let frame_start = reader.bytes_read();
            match Bitmap::read_into(&mut reader) {
                Ok(plane) => self.planes.push(plane),
                Err(source)
                    if source.kind() == ErrorKind::UnexpectedEof
                        && reader.bytes_read() == frame_start =>
                {
                    // Clean end of stream: no more planes.
                    break;
                }
                Err(source) => {
                    return Err(Error::Serialization {
                        context: format!("reading bit slice {}", self.planes.len()),
                        source,
                    });
                }
            }
        }
        debug!(
            bytes = reader.bytes_read(),
            planes = self.planes.len(),
            "read index"
        );
        Ok(reader.bytes_read())
    }
}
