//! Segment type for load-time memory mapping units.
//!
//! A segment is what the byte-image provider reports for each mapped
//! region, together with the classification of its underlying section.
//! The classification decides whether the decoder may treat the bytes as
//! code, as a fallback, or not at all.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address_range::AddressRange;

/// Classification of the section backing a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Code,
    Data,
    CodeAndData,
    ConstData,
    Bss,
    Debug,
    Info,
    Undefined,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectionKind::Code => "code",
            SectionKind::Data => "data",
            SectionKind::CodeAndData => "code/data",
            SectionKind::ConstData => "const data",
            SectionKind::Bss => "bss",
            SectionKind::Debug => "debug",
            SectionKind::Info => "info",
            SectionKind::Undefined => "undefined",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// Permission and loader flags for a segment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SegmentFlags: u8 {
        const READ = 1;
        const WRITE = 2;
        const EXECUTE = 4;
        /// PE `IMAGE_SCN_MEM_DISCARDABLE`
        const DISCARDABLE = 8;
    }
}

/// A mapped region of the byte image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub start: u64,
    /// Exclusive end of the physically backed bytes
    pub end: u64,
    /// Classification of the underlying section, `None` if the segment has
    /// no section information at all
    pub kind: Option<SectionKind>,
    pub flags: SegmentFlags,
    /// Sub-ranges the loader knows must never be decoded (e.g. embedded
    /// import tables inside a code section)
    pub non_decodable: Vec<AddressRange>,
}

impl Segment {
    pub fn new(name: impl Into<String>, start: u64, end: u64, kind: SectionKind) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            kind: Some(kind),
            flags: SegmentFlags::READ,
            non_decodable: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: SegmentFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_non_decodable(mut self, range: AddressRange) -> Self {
        self.non_decodable.push(range);
        self
    }

    /// Segment without any section classification.
    pub fn unclassified(name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            kind: None,
            ..Self::new(name, start, end, SectionKind::Undefined)
        }
    }

    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn range(&self) -> Option<AddressRange> {
        AddressRange::new(self.start, self.end)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:#x} -- {:#x}", self.name, self.start, self.end)
    }
}
