//! Per-section compression.
//!
//! Every section big enough to be worth it is replaced by a 4-byte
//! big-endian inflated size followed by a zlib stream at level 6, and gets
//! the DEFLATED flag. The CRC table and file-info stay uncompressed so the
//! loader can read them before it has a decompressor running.
//! `header.size` intentionally keeps the uncompressed footprint; the
//! layout stage later records the on-disk length.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::elf::*;
use crate::rpl::types::ElfImage;

/// Compress every eligible section payload in place.
pub fn deflate_sections(image: &mut ElfImage) -> Result<(), String> {
    for (i, section) in image.sections.iter_mut().enumerate() {
        if section.data.len() < DEFLATE_MIN_SECTION_SIZE
            || section.header.sh_type == SHT_RPL_CRCS
            || section.header.sh_type == SHT_RPL_FILEINFO
        {
            continue;
        }

        let mut deflated = Vec::with_capacity(section.data.len() / 2 + 4);
        deflated.extend_from_slice(&(section.data.len() as u32).to_be_bytes());

        let mut encoder = ZlibEncoder::new(deflated, Compression::new(6));
        encoder
            .write_all(&section.data)
            .map_err(|e| format!("compressing section {} ({}): {}", i, section.name, e))?;
        section.data = encoder
            .finish()
            .map_err(|e| format!("compressing section {} ({}): {}", i, section.name, e))?;
        section.header.flags |= SHF_DEFLATED;
    }
    Ok(())
}
