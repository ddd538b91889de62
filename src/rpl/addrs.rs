//! Loader-window address assignment.
//!
//! The linker script places symbol and string tables wherever it likes,
//! but the Cafe loader expects them inside its own address window at
//! 0xC0000000 and above. Each SYMTAB/STRTAB section is rebased there, and
//! everything that referenced the old range (symbol values, relocation
//! offsets targeting the section) is rebased with it.

use crate::elf::*;
use crate::rpl::types::{ElfImage, Rela, Symbol};

/// Move every SYMTAB and STRTAB section into the loader window, marking
/// it allocated.
pub fn fix_loader_addresses(image: &mut ElfImage) {
    let mut load_max = LOAD_BASE_ADDRESS;
    for section in &image.sections {
        let end = section.header.addr.wrapping_add(section.data.len() as u32);
        if end > load_max {
            load_max = end;
        }
    }

    for i in 0..image.sections.len() {
        let sh_type = image.sections[i].header.sh_type;
        if sh_type != SHT_SYMTAB && sh_type != SHT_STRTAB {
            continue;
        }
        let new_addr = align_up(load_max, image.sections[i].header.addralign);
        relocate_section(image, i, new_addr);
        image.sections[i].header.flags |= SHF_ALLOC;
        load_max += image.sections[i].data.len() as u32;
    }
}

/// Rebase section `index` to `new_addr`, dragging along every symbol and
/// relocation offset inside its old address range.
///
/// The range test is inclusive at both ends: a symbol sitting exactly at
/// the section's end address (where two abutting sections meet) belongs to
/// the section being moved.
fn relocate_section(image: &mut ElfImage, index: usize, new_addr: u32) {
    let old_addr = image.sections[index].header.addr;
    let len = if image.sections[index].data.is_empty() {
        image.sections[index].header.size
    } else {
        image.sections[index].data.len() as u32
    };
    let old_end = old_addr + len;

    // Symbols for data, functions, and sections follow the move.
    for section in &mut image.sections {
        if section.header.sh_type != SHT_SYMTAB {
            continue;
        }
        let count = section.data.len() / ELF32_SYM_SIZE;
        for i in 0..count {
            let off = i * ELF32_SYM_SIZE;
            let symbol = Symbol::read(&section.data, off);
            let sym_type = symbol.sym_type();
            if sym_type != STT_OBJECT && sym_type != STT_FUNC && sym_type != STT_SECTION {
                continue;
            }
            if symbol.value >= old_addr && symbol.value <= old_end {
                w32(&mut section.data, off + 4, (symbol.value - old_addr) + new_addr);
            }
        }
    }

    // Relocations applied to this section carry virtual offsets into it.
    for section in &mut image.sections {
        if section.header.sh_type != SHT_RELA || section.header.info as usize != index {
            continue;
        }
        let count = section.data.len() / ELF32_RELA_SIZE;
        for i in 0..count {
            let off = i * ELF32_RELA_SIZE;
            let rela = Rela::read(&section.data, off);
            if rela.offset >= old_addr && rela.offset <= old_end {
                w32(&mut section.data, off, (rela.offset - old_addr) + new_addr);
            }
        }
    }

    image.sections[index].header.addr = new_addr;
}
