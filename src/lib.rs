//! elf2rpl converts a freshly-linked 32-bit big-endian PowerPC ELF into an
//! RPL/RPX file, the loadable binary format of the Wii U dynamic loader.
//!
//! RPL/RPX is a constrained ELF dialect: the ordinary 52-byte header and
//! 40-byte section-header table, plus platform section types, a mandated
//! on-disk section ordering, per-section zlib compression, a CRC-32 table,
//! and a file-info metadata record. The conversion is a fixed sequence of
//! in-place rewrites over one mutable image; see `rpl` for the pipeline.

pub mod driver;
pub mod elf;
pub mod rpl;
