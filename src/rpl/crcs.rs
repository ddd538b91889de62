//! CRC table generation.
//!
//! The loader verifies each section against a table of CRC-32 values (zlib
//! polynomial, initial value 0). The table holds one entry per section in
//! final section order; the entry for the CRC section itself is forced to
//! zero since it cannot contain its own checksum. Runs after file-info has
//! been appended and before deflation, so the CRCs cover the payloads the
//! loader sees after inflating.

use crate::elf::*;
use crate::rpl::types::{ElfImage, Section, SectionHeader};

/// Compute per-section CRCs and insert the RPL_CRCS section just before
/// file-info, keeping file-info last.
pub fn generate_crcs(image: &mut ElfImage) {
    let mut crcs: Vec<u32> = Vec::with_capacity(image.sections.len() + 1);
    for section in &image.sections {
        let crc = if section.data.is_empty() {
            0
        } else {
            crc32fast::hash(&section.data)
        };
        crcs.push(crc);
    }

    // Zero slot for the CRC section itself, which lands before file-info.
    crcs.insert(crcs.len() - 1, 0);

    let mut data = Vec::with_capacity(crcs.len() * 4);
    for crc in &crcs {
        data.extend_from_slice(&crc.to_be_bytes());
    }

    let at = image.sections.len() - 1;
    image.sections.insert(
        at,
        Section {
            header: SectionHeader {
                sh_type: SHT_RPL_CRCS,
                addralign: 4,
                entsize: 4,
                ..SectionHeader::default()
            },
            name: String::new(),
            data,
        },
    );
}
