//! The ELF-to-RPL conversion pipeline.
//!
//! One mutable [`ElfImage`] flows through a fixed sequence of stages, each
//! of which rewrites the image in place:
//!
//! 1. `reader` - parse headers and section payloads into the image
//! 2. `relocs` - split REL32 relocations into GHS_REL16 pairs
//! 3. `addrs` - move symbol and string tables into the loader window
//! 4. `fileinfo` - aggregate region sizes and append the file-info section
//! 5. `crcs` - append the per-section CRC-32 table
//! 6. `writer::fix_file_header` - rewrite the ELF header to RPL form
//! 7. `deflate` - compress eligible section payloads
//! 8. `layout` - assign on-disk offsets in the mandated section order
//! 9. `writer::write_rpl` - serialize the final image
//!
//! Stage order is load-bearing: file-info and CRC generation read the
//! uncompressed payloads, so both must run before `deflate`, and the layout
//! stage is the only one allowed to overwrite `header.size` with the
//! on-disk length. Section indices are identity (symbol `shndx`, RELA
//! `link`/`info` all refer to positions in [`ElfImage::sections`]); the
//! only shape changes ever made to the list are the CRC insertion at
//! `len - 1` and the file-info append.

mod addrs;
mod crcs;
mod deflate;
mod fileinfo;
mod layout;
mod reader;
mod relocs;
mod types;
mod writer;

pub use addrs::fix_loader_addresses;
pub use crcs::generate_crcs;
pub use deflate::deflate_sections;
pub use fileinfo::{generate_fileinfo, RplFileInfo};
pub use layout::calculate_offsets;
pub use reader::read_elf;
pub use relocs::fix_relocations;
pub use types::{ElfHeader, ElfImage, Rela, Section, SectionHeader, Symbol};
pub use writer::{fix_file_header, write_rpl};
