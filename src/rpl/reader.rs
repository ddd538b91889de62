//! Parsing of the input ELF into an [`ElfImage`].
//!
//! Accepts exactly what the Cafe toolchain links: 32-bit, big-endian,
//! EM_PPC, with a section header table. Input section order is preserved
//! verbatim since every cross-reference in the file is positional.

use crate::elf::*;
use crate::rpl::types::{ElfHeader, ElfImage, Section, SectionHeader};

/// Parse a 32-bit big-endian PowerPC ELF.
///
/// `source_name` is used to label errors. Section payloads are copied out
/// of `data`; NOBITS and zero-size sections get an empty payload.
pub fn read_elf(data: &[u8], source_name: &str) -> Result<ElfImage, String> {
    if data.len() < ELF32_EHDR_SIZE {
        return Err(format!("{}: too small for ELF header", source_name));
    }
    if data[0..4] != ELF_MAGIC {
        return Err(format!("{}: not an ELF file", source_name));
    }
    if data[4] != ELFCLASS32 {
        return Err(format!("{}: not ELF32 (class={})", source_name, data[4]));
    }
    if data[5] != ELFDATA2MSB {
        return Err(format!("{}: not big-endian (encoding={})", source_name, data[5]));
    }
    if data[6] != EV_CURRENT {
        return Err(format!("{}: unexpected ELF version {}", source_name, data[6]));
    }
    let e_machine = read_u16(data, 18);
    if e_machine != EM_PPC {
        return Err(format!(
            "{}: wrong machine type (expected={:#x}, got={:#x})",
            source_name, EM_PPC, e_machine
        ));
    }

    let header = ElfHeader {
        abi: data[7],
        e_type: read_u16(data, 16),
        machine: e_machine,
        version: read_u32(data, 20),
        entry: read_u32(data, 24),
        phoff: read_u32(data, 28),
        shoff: read_u32(data, 32),
        flags: read_u32(data, 36),
        ehsize: read_u16(data, 40),
        phentsize: read_u16(data, 42),
        phnum: read_u16(data, 44),
        shentsize: read_u16(data, 46),
        shnum: read_u16(data, 48),
        shstrndx: read_u16(data, 50),
    };

    let shoff = header.shoff as usize;
    let shnum = header.shnum as usize;
    if shoff == 0 || shnum == 0 {
        return Err(format!("{}: no section headers", source_name));
    }

    // Section headers are laid out back to back at shoff.
    let mut sections = Vec::with_capacity(shnum);
    for i in 0..shnum {
        let off = shoff + i * ELF32_SHDR_SIZE;
        if off + ELF32_SHDR_SIZE > data.len() {
            return Err(format!("{}: section header {} out of bounds", source_name, i));
        }
        let shdr = SectionHeader {
            name: read_u32(data, off),
            sh_type: read_u32(data, off + 4),
            flags: read_u32(data, off + 8),
            addr: read_u32(data, off + 12),
            offset: read_u32(data, off + 16),
            size: read_u32(data, off + 20),
            link: read_u32(data, off + 24),
            info: read_u32(data, off + 28),
            addralign: read_u32(data, off + 32),
            entsize: read_u32(data, off + 36),
        };
        sections.push(Section {
            header: shdr,
            name: String::new(),
            data: Vec::new(),
        });
    }

    // Load payloads for everything that stores bytes in the file.
    for (i, section) in sections.iter_mut().enumerate() {
        if section.header.size == 0 || section.header.sh_type == SHT_NOBITS {
            continue;
        }
        let start = section.header.offset as usize;
        let end = start + section.header.size as usize;
        if end > data.len() {
            return Err(format!("{}: section {} data out of bounds", source_name, i));
        }
        section.data = data[start..end].to_vec();
    }

    // Resolve section names from the section-name string table.
    let shstrndx = header.shstrndx as usize;
    if shstrndx >= sections.len() {
        return Err(format!(
            "{}: shstrndx {} out of range ({} sections)",
            source_name, shstrndx, sections.len()
        ));
    }
    let shstrtab = sections[shstrndx].data.clone();
    for section in &mut sections {
        section.name = read_cstr(&shstrtab, section.header.name as usize);
    }

    Ok(ElfImage { header, sections })
}
