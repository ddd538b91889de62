//! Relocation rewriting.
//!
//! The Cafe loader understands only a subset of the PowerPC relocation
//! types the toolchain emits. The one fixable outsider is REL32, which
//! splits into a GHS_REL16_HI / GHS_REL16_LO pair: the HI half overwrites
//! the original entry, the LO half (offset + 2, addend + 2) is appended to
//! the end of that section's table. Anything else outside the supported
//! set is a hard error, reported once per distinct type after the whole
//! file has been scanned so a single run surfaces every offender.

use std::collections::BTreeSet;

use crate::elf::*;
use crate::rpl::types::{ElfImage, Rela};

fn is_supported(rel_type: u32) -> bool {
    matches!(
        rel_type,
        R_PPC_NONE
            | R_PPC_ADDR32
            | R_PPC_ADDR16_LO
            | R_PPC_ADDR16_HI
            | R_PPC_ADDR16_HA
            | R_PPC_REL24
            | R_PPC_REL14
            | R_PPC_DTPMOD32
            | R_PPC_DTPREL32
            | R_PPC_EMB_SDA21
            | R_PPC_EMB_RELSDA
            | R_PPC_DIAB_SDA21_LO
            | R_PPC_DIAB_SDA21_HI
            | R_PPC_DIAB_SDA21_HA
            | R_PPC_DIAB_RELSDA_LO
            | R_PPC_DIAB_RELSDA_HI
            | R_PPC_DIAB_RELSDA_HA
            | R_PPC_GHS_REL16_HI
            | R_PPC_GHS_REL16_LO
    )
}

/// Rewrite every RELA section to the loader-supported relocation set.
///
/// Also clears each RELA section's flags; the loader rejects relocation
/// sections that claim to be allocated.
pub fn fix_relocations(image: &mut ElfImage) -> Result<(), String> {
    let mut unsupported: BTreeSet<u32> = BTreeSet::new();
    let mut dangling = 0usize;

    for i in 0..image.sections.len() {
        if image.sections[i].header.sh_type != SHT_RELA {
            continue;
        }
        image.sections[i].header.flags = 0;

        let symtab = image.sections[i].header.link as usize;
        let num_symbols = image
            .sections
            .get(symtab)
            .map(|s| s.data.len() / ELF32_SYM_SIZE)
            .unwrap_or(0);

        let mut appended: Vec<u8> = Vec::new();
        let data = &mut image.sections[i].data;
        let count = data.len() / ELF32_RELA_SIZE;
        for j in 0..count {
            let off = j * ELF32_RELA_SIZE;
            let rela = Rela::read(data, off);
            let rel_type = rela.rel_type();

            if rel_type == R_PPC_REL32 {
                let sym = rela.sym_index();
                if sym as usize >= num_symbols {
                    println!(
                        "ERROR: no symbol {} for splitting a REL32 relocation at {:#010x}",
                        sym, rela.offset
                    );
                    dangling += 1;
                    continue;
                }
                let hi = Rela {
                    offset: rela.offset,
                    info: (sym << 8) | R_PPC_GHS_REL16_HI,
                    addend: rela.addend,
                };
                hi.write(data, off);
                let lo = Rela {
                    offset: rela.offset + 2,
                    info: (sym << 8) | R_PPC_GHS_REL16_LO,
                    addend: rela.addend.wrapping_add(2),
                };
                appended.extend_from_slice(&lo.to_bytes());
            } else if !is_supported(rel_type) && unsupported.insert(rel_type) {
                println!("ERROR: unsupported relocation type {}", rel_type);
            }
        }
        data.extend_from_slice(&appended);
    }

    if !unsupported.is_empty() || dangling > 0 {
        return Err(format!(
            "{} unsupported relocation type(s), {} unresolvable REL32 relocation(s)",
            unsupported.len(),
            dangling
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpl::types::{Section, SectionHeader};

    fn rela_section(link: u32, entries: &[Rela]) -> Section {
        let mut data = Vec::new();
        for rela in entries {
            data.extend_from_slice(&rela.to_bytes());
        }
        Section {
            header: SectionHeader {
                sh_type: SHT_RELA,
                flags: SHF_ALLOC,
                size: data.len() as u32,
                link,
                info: 2,
                addralign: 4,
                entsize: ELF32_RELA_SIZE as u32,
                ..SectionHeader::default()
            },
            name: ".rela.text".to_string(),
            data,
        }
    }

    fn symtab_section(num_symbols: usize) -> Section {
        Section {
            header: SectionHeader {
                sh_type: SHT_SYMTAB,
                size: (num_symbols * ELF32_SYM_SIZE) as u32,
                entsize: ELF32_SYM_SIZE as u32,
                addralign: 4,
                ..SectionHeader::default()
            },
            name: ".symtab".to_string(),
            data: vec![0u8; num_symbols * ELF32_SYM_SIZE],
        }
    }

    fn image_with(sections: Vec<Section>) -> ElfImage {
        use crate::rpl::tests_support::bare_header;
        ElfImage { header: bare_header(sections.len() as u16), sections }
    }

    #[test]
    fn test_rel32_splits_into_hi_lo_pair() {
        let mut image = image_with(vec![
            symtab_section(2),
            rela_section(0, &[Rela { offset: 8, info: (1 << 8) | R_PPC_REL32, addend: 0 }]),
        ]);
        fix_relocations(&mut image).unwrap();

        let rela = &image.sections[1];
        assert_eq!(rela.header.flags, 0);
        assert_eq!(rela.data.len(), 2 * ELF32_RELA_SIZE);

        let hi = Rela::read(&rela.data, 0);
        assert_eq!(hi.offset, 8);
        assert_eq!(hi.info, (1 << 8) | R_PPC_GHS_REL16_HI);
        assert_eq!(hi.addend, 0);

        let lo = Rela::read(&rela.data, ELF32_RELA_SIZE);
        assert_eq!(lo.offset, 10);
        assert_eq!(lo.info, (1 << 8) | R_PPC_GHS_REL16_LO);
        assert_eq!(lo.addend, 2);
    }

    #[test]
    fn test_lo_entries_append_after_untouched_neighbors() {
        let entries = [
            Rela { offset: 0x10, info: (1 << 8) | R_PPC_REL32, addend: -8 },
            Rela { offset: 0x20, info: (1 << 8) | R_PPC_ADDR32, addend: 4 },
            Rela { offset: 0x30, info: (1 << 8) | R_PPC_REL32, addend: 0 },
        ];
        let mut image = image_with(vec![symtab_section(2), rela_section(0, &entries)]);
        fix_relocations(&mut image).unwrap();

        let rela = &image.sections[1];
        assert_eq!(rela.data.len(), 5 * ELF32_RELA_SIZE);

        // Slots 0 and 2 were rewritten in place; slot 1 is untouched.
        assert_eq!(Rela::read(&rela.data, 0).rel_type(), R_PPC_GHS_REL16_HI);
        let kept = Rela::read(&rela.data, ELF32_RELA_SIZE);
        assert_eq!(kept.info, (1 << 8) | R_PPC_ADDR32);
        assert_eq!(kept.offset, 0x20);
        assert_eq!(Rela::read(&rela.data, 2 * ELF32_RELA_SIZE).rel_type(), R_PPC_GHS_REL16_HI);

        // LO halves land at the end, in scan order.
        let lo_a = Rela::read(&rela.data, 3 * ELF32_RELA_SIZE);
        assert_eq!((lo_a.offset, lo_a.addend), (0x12, -6));
        let lo_b = Rela::read(&rela.data, 4 * ELF32_RELA_SIZE);
        assert_eq!((lo_b.offset, lo_b.addend), (0x32, 2));
    }

    #[test]
    fn test_unsupported_type_fails_after_full_scan() {
        let entries = [
            Rela { offset: 0, info: (1 << 8) | 2, addend: 0 }, // R_PPC_ADDR24
            Rela { offset: 4, info: (1 << 8) | R_PPC_REL32, addend: 0 },
        ];
        let mut image = image_with(vec![symtab_section(2), rela_section(0, &entries)]);
        let err = fix_relocations(&mut image).unwrap_err();
        assert!(err.contains("1 unsupported"));

        // The REL32 after the offender was still processed.
        assert_eq!(image.sections[1].data.len(), 3 * ELF32_RELA_SIZE);
    }

    #[test]
    fn test_rel32_with_out_of_range_symbol_fails() {
        let entries = [Rela { offset: 0, info: (9 << 8) | R_PPC_REL32, addend: 0 }];
        let mut image = image_with(vec![symtab_section(2), rela_section(0, &entries)]);
        let err = fix_relocations(&mut image).unwrap_err();
        assert!(err.contains("1 unresolvable"));
        // The broken entry is left alone and nothing was appended.
        assert_eq!(image.sections[1].data.len(), ELF32_RELA_SIZE);
        assert_eq!(Rela::read(&image.sections[1].data, 0).rel_type(), R_PPC_REL32);
    }
}
