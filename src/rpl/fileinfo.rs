//! File-info section generation.
//!
//! The loader sizes its code, data, and loader-window allocations from one
//! 0x60-byte record at the tail of the section list. The aggregates are
//! virtual footprints, so this stage must run while `header.size` still
//! describes uncompressed sections, i.e. before deflation.

use crate::elf::*;
use crate::rpl::types::{ElfImage, Section, SectionHeader};

/// The 0x60-byte RPL file-info record.
///
/// Field order and widths are loader ABI; everything not computed here is
/// a fixed SDK constant.
#[derive(Clone, Debug)]
pub struct RplFileInfo {
    pub version: u32,
    pub text_size: u32,
    pub text_align: u32,
    pub data_size: u32,
    pub data_align: u32,
    pub load_size: u32,
    pub load_align: u32,
    pub temp_size: u32,
    pub tramp_adjust: u32,
    pub sda_base: u32,
    pub sda2_base: u32,
    pub stack_size: u32,
    pub filename: u32,
    pub flags: u32,
    pub heap_size: u32,
    pub tag_offset: u32,
    pub min_version: u32,
    pub compression_level: i32,
    pub tramp_addition: u32,
    pub file_info_pad: u32,
    pub cafe_sdk_version: u32,
    pub cafe_sdk_revision: u32,
    pub tls_module_index: u16,
    pub tls_align_shift: u16,
    pub runtime_file_info_size: u32,
}

impl RplFileInfo {
    /// The values elf2rpl emits for a fresh conversion; only the region
    /// sizes and the RPX/RPL flag vary per file.
    pub fn new(flags: u32) -> RplFileInfo {
        RplFileInfo {
            version: 0xCAFE_0402,
            text_size: 0,
            text_align: 32,
            data_size: 0,
            data_align: 4096,
            load_size: 0,
            load_align: 4,
            temp_size: 0,
            tramp_adjust: 0,
            sda_base: 0,
            sda2_base: 0,
            stack_size: 0x10000,
            filename: 0,
            flags,
            heap_size: 0x8000,
            tag_offset: 0,
            min_version: 0x5078,
            compression_level: 6,
            tramp_addition: 0,
            file_info_pad: 0,
            cafe_sdk_version: 0x5335,
            cafe_sdk_revision: 0x10D4B,
            tls_module_index: 0,
            tls_align_shift: 0,
            runtime_file_info_size: 0,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; RPL_FILEINFO_SIZE];
        w32(&mut out, 0x00, self.version);
        w32(&mut out, 0x04, self.text_size);
        w32(&mut out, 0x08, self.text_align);
        w32(&mut out, 0x0C, self.data_size);
        w32(&mut out, 0x10, self.data_align);
        w32(&mut out, 0x14, self.load_size);
        w32(&mut out, 0x18, self.load_align);
        w32(&mut out, 0x1C, self.temp_size);
        w32(&mut out, 0x20, self.tramp_adjust);
        w32(&mut out, 0x24, self.sda_base);
        w32(&mut out, 0x28, self.sda2_base);
        w32(&mut out, 0x2C, self.stack_size);
        w32(&mut out, 0x30, self.filename);
        w32(&mut out, 0x34, self.flags);
        w32(&mut out, 0x38, self.heap_size);
        w32(&mut out, 0x3C, self.tag_offset);
        w32(&mut out, 0x40, self.min_version);
        w32(&mut out, 0x44, self.compression_level as u32);
        w32(&mut out, 0x48, self.tramp_addition);
        w32(&mut out, 0x4C, self.file_info_pad);
        w32(&mut out, 0x50, self.cafe_sdk_version);
        w32(&mut out, 0x54, self.cafe_sdk_revision);
        w16(&mut out, 0x58, self.tls_module_index);
        w16(&mut out, 0x5A, self.tls_align_shift);
        w32(&mut out, 0x5C, self.runtime_file_info_size);
        out
    }
}

/// Scan all sections, aggregate per-region sizes, and append the
/// RPL_FILEINFO section. `flags` carries the RPX/RPL distinction.
pub fn generate_fileinfo(image: &mut ElfImage, flags: u32) {
    let mut info = RplFileInfo::new(flags);

    for section in &image.sections {
        let size = if section.header.sh_type == SHT_NOBITS {
            section.header.size
        } else {
            section.data.len() as u32
        };
        let addr = section.header.addr;

        if addr >= CODE_BASE_ADDRESS && addr < DATA_BASE_ADDRESS {
            let val = addr + section.header.size - CODE_BASE_ADDRESS;
            if val > info.text_size {
                info.text_size = val;
            }
        } else if addr >= DATA_BASE_ADDRESS && addr < LOAD_BASE_ADDRESS {
            let val = addr + section.header.size - DATA_BASE_ADDRESS;
            if val > info.data_size {
                info.data_size = val;
            }
        } else if addr >= LOAD_BASE_ADDRESS {
            let val = addr + section.header.size - LOAD_BASE_ADDRESS;
            if val > info.load_size {
                info.load_size = val;
            }
        } else if addr == 0
            && section.header.sh_type != SHT_RPL_CRCS
            && section.header.sh_type != SHT_RPL_FILEINFO
        {
            info.temp_size += size + 128;
        }
    }

    info.text_size = align_up(info.text_size, info.text_align);
    info.data_size = align_up(info.data_size, info.data_align);
    info.load_size = align_up(info.load_size, info.load_align);

    image.sections.push(Section {
        header: SectionHeader {
            sh_type: SHT_RPL_FILEINFO,
            addralign: 4,
            ..SectionHeader::default()
        },
        name: String::new(),
        data: info.to_bytes(),
    });
}
