//! `object`-crate backed image loader (ELF, PE, Mach-O).
//!
//! Sections become segments; the section kind reported by `object` is
//! mapped onto [`SectionKind`]. Files are memory-mapped read-only.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use object::{Object, ObjectSection, ObjectSymbol, SectionFlags};
use tracing::{debug, warn};

use super::{ByteImage, ImageError, ImageSymbol};
use crate::core::binary::{Arch, Endianness};
use crate::core::segment::{SectionKind, Segment, SegmentFlags};
use crate::error::Result;

enum Storage {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Mapped(m) => m,
            Storage::Owned(v) => v,
        }
    }
}

/// File offset backing each segment, parallel to `segments`.
#[derive(Debug, Clone, Copy)]
struct Backing {
    file_offset: usize,
}

pub struct ObjectImage {
    storage: Storage,
    arch: Arch,
    endianness: Endianness,
    entry_point: Option<u64>,
    segments: Vec<Segment>,
    backing: Vec<Backing>,
    symbols: Vec<ImageSymbol>,
}

pub(crate) fn classify_section(kind: object::SectionKind) -> SectionKind {
    use object::SectionKind as K;
    match kind {
        K::Text => SectionKind::Code,
        K::Data | K::Tls | K::TlsVariables => SectionKind::Data,
        K::ReadOnlyData | K::ReadOnlyDataWithRel | K::ReadOnlyString => SectionKind::ConstData,
        K::UninitializedData | K::UninitializedTls | K::Common => SectionKind::Bss,
        K::Debug | K::DebugString => SectionKind::Debug,
        K::Note | K::Metadata | K::Linker | K::OtherString => SectionKind::Info,
        _ => SectionKind::Undefined,
    }
}

pub(crate) fn segment_flags(kind: SectionKind, flags: SectionFlags) -> SegmentFlags {
    let mut out = SegmentFlags::READ;
    match flags {
        SectionFlags::Elf { sh_flags } => {
            if sh_flags & u64::from(object::elf::SHF_EXECINSTR) != 0 {
                out |= SegmentFlags::EXECUTE;
            }
            if sh_flags & u64::from(object::elf::SHF_WRITE) != 0 {
                out |= SegmentFlags::WRITE;
            }
        }
        SectionFlags::Coff { characteristics } => {
            if characteristics & object::pe::IMAGE_SCN_MEM_EXECUTE != 0 {
                out |= SegmentFlags::EXECUTE;
            }
            if characteristics & object::pe::IMAGE_SCN_MEM_WRITE != 0 {
                out |= SegmentFlags::WRITE;
            }
            if characteristics & object::pe::IMAGE_SCN_MEM_DISCARDABLE != 0 {
                out |= SegmentFlags::DISCARDABLE;
            }
        }
        _ => {
            if matches!(kind, SectionKind::Code | SectionKind::CodeAndData) {
                out |= SegmentFlags::EXECUTE;
            }
            if matches!(kind, SectionKind::Data) {
                out |= SegmentFlags::WRITE;
            }
        }
    }
    out
}

impl ObjectImage {
    /// Memory-map and parse the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        debug!(path = %path.display(), size, "Opening image");
        if size == 0 {
            return Err(ImageError::Parse("empty file".to_string()).into());
        }
        // Safety: read-only map of a regular file for the image's lifetime.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_storage(Storage::Mapped(mmap))
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_storage(Storage::Owned(data))
    }

    fn from_storage(storage: Storage) -> Result<Self> {
        let (arch, endianness, entry_point, segments, backing, symbols) =
            Self::parse_layout(storage.bytes())?;
        Ok(Self {
            storage,
            arch,
            endianness,
            entry_point,
            segments,
            backing,
            symbols,
        })
    }

    #[allow(clippy::type_complexity)]
    fn parse_layout(
        data: &[u8],
    ) -> Result<(
        Arch,
        Endianness,
        Option<u64>,
        Vec<Segment>,
        Vec<Backing>,
        Vec<ImageSymbol>,
    )> {
        let obj = object::File::parse(data).map_err(|e| ImageError::Parse(e.to_string()))?;

        let arch = Arch::from(obj.architecture());
        let endianness = if obj.is_little_endian() {
            Endianness::Little
        } else {
            Endianness::Big
        };
        let entry_point = Some(obj.entry()).filter(|&e| e != 0);

        let mut segments = Vec::new();
        let mut backing = Vec::new();
        for sec in obj.sections() {
            let start = sec.address();
            // Not loaded.
            if start == 0 || sec.size() == 0 {
                continue;
            }
            let name = sec.name().unwrap_or("").to_string();
            let kind = classify_section(sec.kind());
            let flags = segment_flags(kind, sec.flags());
            let (file_offset, backed) = match sec.file_range() {
                Some((off, len)) => (off as usize, len.min(sec.size())),
                None => (0, 0),
            };
            if file_offset.saturating_add(backed as usize) > data.len() {
                warn!(section = %name, "Section file range exceeds image; skipped");
                continue;
            }
            segments.push(
                Segment::new(name, start, start.saturating_add(backed), kind).with_flags(flags),
            );
            backing.push(Backing { file_offset });
        }

        let mut symbols: Vec<ImageSymbol> = obj
            .symbols()
            .chain(obj.dynamic_symbols())
            .filter(|s| s.is_definition() && s.kind() == object::SymbolKind::Text)
            .filter(|s| s.address() != 0)
            .map(|s| ImageSymbol {
                name: s.name().unwrap_or("").to_string(),
                address: s.address(),
            })
            .collect();
        symbols.sort_by_key(|s| s.address);
        symbols.dedup_by_key(|s| s.address);

        debug!(
            %arch,
            segments = segments.len(),
            symbols = symbols.len(),
            entry = ?entry_point.map(|e| format!("{:#x}", e)),
            "Parsed image"
        );

        Ok((arch, endianness, entry_point, segments, backing, symbols))
    }
}

impl ByteImage for ObjectImage {
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
        let start = self.backing[idx].file_offset + (address - seg.start) as usize;
        let end = self.backing[idx].file_offset + seg.size() as usize;
        self.storage.bytes().get(start..end)
    }

    fn symbols(&self) -> &[ImageSymbol] {
        &self.symbols
    }
}
