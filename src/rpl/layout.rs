//! On-disk offset assignment.
//!
//! The loader mmaps the file in one pass and expects section payloads
//! grouped by how it consumes them: the CRC table first, then file-info,
//! then writable data, read-only data (with imports at the end of the
//! read-only region), code, and finally the loader-only temp sections.
//! Grouping happens purely through offset assignment; the section-header
//! list itself is never reordered, because every cross-reference in the
//! file is a positional index into it.
//!
//! This is also where `header.size` becomes the on-disk length: deflated
//! sections carried their virtual footprint in `size` up to this point.

use crate::elf::*;
use crate::rpl::types::{ElfImage, Section};

/// Sections the grouped passes never place: the three tail sections get
/// dedicated passes, NOBITS has nothing to store, and zero-size sections
/// have nothing to place.
fn exempt_from_grouping(section: &Section) -> bool {
    section.header.size == 0
        || section.header.sh_type == SHT_RPL_FILEINFO
        || section.header.sh_type == SHT_RPL_IMPORTS
        || section.header.sh_type == SHT_RPL_CRCS
        || section.header.sh_type == SHT_NOBITS
}

fn place(section: &mut Section, cursor: &mut u32) {
    section.header.offset = *cursor;
    section.header.size = section.data.len() as u32;
    *cursor += section.header.size;
}

/// Assign every section its file offset, in the mandated group order.
pub fn calculate_offsets(image: &mut ElfImage) -> Result<(), String> {
    let mut cursor = image.header.shoff
        + align_up(image.sections.len() as u32 * ELF32_SHDR_SIZE as u32, 64);

    // Sections with no stored bytes have no offset.
    for section in &mut image.sections {
        if section.header.sh_type == SHT_NOBITS || section.header.sh_type == SHT_NULL {
            section.header.offset = 0;
            section.data.clear();
        }
    }

    for section in &mut image.sections {
        if section.header.sh_type == SHT_RPL_CRCS {
            place(section, &mut cursor);
        }
    }

    for section in &mut image.sections {
        if section.header.sh_type == SHT_RPL_FILEINFO {
            place(section, &mut cursor);
        }
    }

    // Writable allocated data.
    for section in &mut image.sections {
        if exempt_from_grouping(section) {
            continue;
        }
        let flags = section.header.flags;
        if flags & SHF_EXECINSTR == 0 && flags & SHF_WRITE != 0 && flags & SHF_ALLOC != 0 {
            place(section, &mut cursor);
        }
    }

    // Read-only allocated data. Export tables carry EXECINSTR but belong
    // with the read-only group.
    for section in &mut image.sections {
        if exempt_from_grouping(section) {
            continue;
        }
        let flags = section.header.flags;
        if (flags & SHF_EXECINSTR == 0 || section.header.sh_type == SHT_RPL_EXPORTS)
            && flags & SHF_WRITE == 0
            && flags & SHF_ALLOC != 0
        {
            place(section, &mut cursor);
        }
    }

    // Import stubs also carry EXECINSTR but close out the read-only group.
    for section in &mut image.sections {
        if section.header.sh_type == SHT_RPL_IMPORTS {
            place(section, &mut cursor);
        }
    }

    // Code.
    for section in &mut image.sections {
        if exempt_from_grouping(section) {
            continue;
        }
        if section.header.flags & SHF_EXECINSTR != 0
            && section.header.sh_type != SHT_RPL_EXPORTS
        {
            place(section, &mut cursor);
        }
    }

    // Loader-only temp sections (symbol and string tables).
    for section in &mut image.sections {
        if exempt_from_grouping(section) {
            continue;
        }
        let flags = section.header.flags;
        if flags & SHF_EXECINSTR == 0 && flags & SHF_ALLOC == 0 {
            place(section, &mut cursor);
        }
    }

    for (i, section) in image.sections.iter().enumerate() {
        if section.header.offset == 0
            && section.header.sh_type != SHT_NULL
            && section.header.sh_type != SHT_NOBITS
        {
            return Err(format!("no file offset assigned to section {} ({})", i, section.name));
        }
    }
    Ok(())
}
