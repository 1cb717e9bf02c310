//! Byte-image providers: bounded reads of the loaded image by address.
//!
//! The decoder never touches files. It asks a [`ByteImage`] for the bytes
//! at an address, the segment layout with section classification, the
//! entry point and (optionally) symbol addresses that can seed decoding.

pub mod object_image;

pub use object_image::ObjectImage;

use crate::core::binary::{Arch, Endianness};
use crate::core::segment::{SectionKind, Segment, SegmentFlags};
use crate::error::LiftError;

/// Errors that can occur while building or reading an image.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("address out of range: {0:#x}")]
    OutOfRange(u64),
    #[error("segment {name} overlaps an existing segment")]
    Overlap { name: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<ImageError> for LiftError {
    fn from(e: ImageError) -> Self {
        LiftError::InvalidFormat(e.to_string())
    }
}

/// A defined symbol the image knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSymbol {
    pub name: String,
    pub address: u64,
}

/// Read-only view of a loaded binary.
pub trait ByteImage {
    fn arch(&self) -> Arch;

    fn endianness(&self) -> Endianness {
        self.arch().default_endianness()
    }

    fn entry_point(&self) -> Option<u64>;

    fn segments(&self) -> &[Segment];

    /// Bytes from `address` to the end of the segment backing it.
    fn raw_bytes_at(&self, address: u64) -> Option<&[u8]>;

    /// Defined function symbols, used as additional decode seeds.
    fn symbols(&self) -> &[ImageSymbol] {
        &[]
    }

    fn segment_containing(&self, address: u64) -> Option<&Segment> {
        self.segments().iter().find(|s| s.contains(address))
    }
}

/// Image assembled in memory from explicit segments.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    arch: Arch,
    endianness: Endianness,
    entry_point: Option<u64>,
    segments: Vec<Segment>,
    data: Vec<Vec<u8>>,
    symbols: Vec<ImageSymbol>,
}

impl MemoryImage {
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            endianness: arch.default_endianness(),
            entry_point: None,
            segments: Vec::new(),
            data: Vec::new(),
            symbols: Vec::new(),
        }
    }

    pub fn with_entry_point(mut self, address: u64) -> Self {
        self.entry_point = Some(address);
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Add a segment backed by `bytes`. The segment end is clamped to the
    /// bytes actually supplied.
    pub fn add_segment(&mut self, mut segment: Segment, bytes: Vec<u8>) -> Result<(), ImageError> {
        let backed_end = segment.start.saturating_add(bytes.len() as u64);
        segment.end = segment.end.min(backed_end);
        if self
            .segments
            .iter()
            .any(|s| s.start < segment.end && segment.start < s.end)
        {
            return Err(ImageError::Overlap { name: segment.name });
        }
        self.segments.push(segment);
        self.data.push(bytes);
        Ok(())
    }

    /// Add an executable `.text`-style segment at `start`.
    pub fn with_code(mut self, start: u64, bytes: Vec<u8>) -> Result<Self, ImageError> {
        let end = start.saturating_add(bytes.len() as u64);
        let seg = Segment::new(format!("code_{:x}", start), start, end, SectionKind::Code)
            .with_flags(SegmentFlags::READ | SegmentFlags::EXECUTE);
        self.add_segment(seg, bytes)?;
        Ok(self)
    }

    pub fn with_symbol(mut self, name: impl Into<String>, address: u64) -> Self {
        self.symbols.push(ImageSymbol {
            name: name.into(),
            address,
        });
        self
    }
}

impl ByteImage for MemoryImage {
    fn arch(&self) -> Arch {
        self.arch
    }

    fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn entry_point(&self) -> Option<u64> {
        self.entry_point
    }

    fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn raw_bytes_at(&self, address: u64) -> Option<&[u8]> {
        let idx = self.segments.iter().position(|s| s.contains(address))?;
        let seg = &self.segments[idx];
        let off = (address - seg.start) as usize;
        let len = seg.size() as usize;
        self.data[idx].get(off..len)
    }

    fn symbols(&self) -> &[ImageSymbol] {
        &self.symbols
    }
}
