//! Initial population of the decodable range sets.

use tracing::debug;

use crate::config::DecoderConfig;
use crate::core::address_range::AddressRangeSet;
use crate::core::segment::{SectionKind, Segment, SegmentFlags};
use crate::image::ByteImage;

/// `allowed` holds code; `alternative` holds bytes that may be decoded only
/// when a seed explicitly lands there.
#[derive(Debug, Clone, Default)]
pub struct DecodeRanges {
    pub allowed: AddressRangeSet,
    pub alternative: AddressRangeSet,
}

impl DecodeRanges {
    /// Ranges for a run over `image` with `config`.
    pub fn for_image(image: &dyn ByteImage, config: &DecoderConfig) -> Self {
        if config.is_selected_decode_only() {
            let mut ranges = Self::default();
            for r in config.decode_only.iter().filter_map(|r| r.to_range()) {
                ranges.allowed.insert_range(r);
            }
            debug!(allowed = %ranges.allowed, "decode-only ranges selected");
            return ranges;
        }
        Self::from_segments(image.segments(), image.entry_point())
    }

    /// Classify each segment into `allowed`, `alternative` or nothing.
    pub fn from_segments(segments: &[Segment], entry_point: Option<u64>) -> Self {
        let mut ranges = Self::default();
        let is_entry = |s: &Segment| entry_point.is_some_and(|ep| s.contains(ep));

        for seg in segments {
            if seg.size() == 0 {
                continue;
            }
            let ep_seg = is_entry(seg);
            let Some(kind) = seg.kind else {
                if ep_seg {
                    ranges.alternative.insert(seg.start, seg.end);
                }
                continue;
            };
            if seg.flags.contains(SegmentFlags::DISCARDABLE) && !ep_seg {
                debug!(segment = %seg.name, "discardable segment skipped");
                continue;
            }
            match kind {
                SectionKind::Code => ranges.allowed.insert(seg.start, seg.end),
                SectionKind::Data | SectionKind::CodeAndData | SectionKind::Undefined => {
                    ranges.alternative.insert(seg.start, seg.end)
                }
                SectionKind::ConstData if ep_seg => ranges.alternative.insert(seg.start, seg.end),
                SectionKind::ConstData
                | SectionKind::Bss
                | SectionKind::Debug
                | SectionKind::Info => {}
            }
        }

        for seg in segments {
            for nd in &seg.non_decodable {
                if entry_point.is_some_and(|ep| nd.contains(ep)) {
                    continue;
                }
                ranges.allowed.remove_range(nd);
                ranges.alternative.remove_range(nd);
            }
        }

        debug!(
            allowed = %ranges.allowed,
            alternative = %ranges.alternative,
            "decode ranges initialised"
        );
        ranges
    }
}
