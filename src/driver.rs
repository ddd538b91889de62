//! CLI argument parsing and pipeline sequencing.
//!
//! The parser is a flat `match` over the argument list; two boolean flags
//! and two positionals do not justify a parser dependency. Errors from the
//! pipeline are prefixed with the failing stage's name and printed to
//! standard output by `main`, which then exits with -1.

use std::fs;

use crate::elf::RPL_IS_RPX;
use crate::rpl;

/// One conversion request: a source ELF, a destination path, and whether
/// the output is a shared library (RPL) or an executable (RPX).
pub struct Driver {
    src: String,
    dst: String,
    rpl: bool,
    verbose: bool,
}

fn print_usage(program: &str) {
    println!("{} [options] <src> <dst>", program);
    println!("Convert a big-endian PowerPC ELF into an RPX or RPL file.");
    println!();
    println!("  <src>            Path to the input ELF file");
    println!("  <dst>            Path to the output RPX/RPL file");
    println!("  -r, --rpl        Generate an RPL (library) instead of an RPX");
    println!("  -v, --verbose    Report each conversion stage on stderr");
    println!("  -H, --help       Show this help");
}

impl Driver {
    /// Parse command-line arguments (`args[0]` is the program name).
    ///
    /// Returns `Ok(None)` when help was requested or arguments are
    /// missing; usage has been printed and the process should exit 0.
    pub fn parse_cli_args(args: &[String]) -> Result<Option<Driver>, String> {
        let mut rpl = false;
        let mut verbose = false;
        let mut positional: Vec<&str> = Vec::new();

        for arg in &args[1..] {
            match arg.as_str() {
                "-r" | "--rpl" => rpl = true,
                "-v" | "--verbose" => verbose = true,
                "-H" | "--help" => {
                    print_usage(&args[0]);
                    return Ok(None);
                }
                s if s.starts_with('-') => {
                    return Err(format!("unknown option '{}'", s));
                }
                s => positional.push(s),
            }
        }

        match positional.len() {
            2 => Ok(Some(Driver {
                src: positional[0].to_string(),
                dst: positional[1].to_string(),
                rpl,
                verbose,
            })),
            0 | 1 => {
                print_usage(&args[0]);
                Ok(None)
            }
            _ => Err(format!("unexpected argument '{}'", positional[2])),
        }
    }

    fn note(&self, stage: &str) {
        if self.verbose {
            eprintln!("elf2rpl: {}", stage);
        }
    }

    /// Run the conversion pipeline from `src` to `dst`.
    pub fn run(&self) -> Result<(), String> {
        self.note("reading input");
        let input = fs::read(&self.src)
            .map_err(|e| format!("read_elf: {}: {}", self.src, e))?;
        let mut image = rpl::read_elf(&input, &self.src)
            .map_err(|e| format!("read_elf: {}", e))?;

        self.note("fixing relocations");
        rpl::fix_relocations(&mut image)
            .map_err(|e| format!("fix_relocations: {}", e))?;

        self.note("assigning loader addresses");
        rpl::fix_loader_addresses(&mut image);

        self.note("generating file info");
        let flags = if self.rpl { 0 } else { RPL_IS_RPX };
        rpl::generate_fileinfo(&mut image, flags);

        self.note("generating section CRCs");
        rpl::generate_crcs(&mut image);

        self.note("finalizing file header");
        rpl::fix_file_header(&mut image)
            .map_err(|e| format!("fix_file_header: {}", e))?;

        self.note("compressing sections");
        rpl::deflate_sections(&mut image)
            .map_err(|e| format!("deflate_sections: {}", e))?;

        self.note("calculating file offsets");
        rpl::calculate_offsets(&mut image)
            .map_err(|e| format!("calculate_offsets: {}", e))?;

        self.note("writing output");
        let output = rpl::write_rpl(&image);
        fs::write(&self.dst, &output)
            .map_err(|e| format!("write_rpl: {}: {}", self.dst, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("elf2rpl")
            .chain(list.iter().copied())
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_parse_src_dst() {
        let driver = Driver::parse_cli_args(&args(&["in.elf", "out.rpx"]))
            .unwrap()
            .unwrap();
        assert_eq!(driver.src, "in.elf");
        assert_eq!(driver.dst, "out.rpx");
        assert!(!driver.rpl);
        assert!(!driver.verbose);
    }

    #[test]
    fn test_parse_flags_in_any_position() {
        let driver = Driver::parse_cli_args(&args(&["in.elf", "-r", "out.rpl", "-v"]))
            .unwrap()
            .unwrap();
        assert!(driver.rpl);
        assert!(driver.verbose);
        assert_eq!(driver.src, "in.elf");
        assert_eq!(driver.dst, "out.rpl");

        let driver = Driver::parse_cli_args(&args(&["--rpl", "in.elf", "out.rpl"]))
            .unwrap()
            .unwrap();
        assert!(driver.rpl);
    }

    #[test]
    fn test_missing_arguments_show_help() {
        assert!(Driver::parse_cli_args(&args(&[])).unwrap().is_none());
        assert!(Driver::parse_cli_args(&args(&["only-src"])).unwrap().is_none());
        assert!(Driver::parse_cli_args(&args(&["-H"])).unwrap().is_none());
    }

    #[test]
    fn test_bad_arguments_are_errors() {
        assert!(Driver::parse_cli_args(&args(&["-x", "a", "b"])).is_err());
        assert!(Driver::parse_cli_args(&args(&["a", "b", "c"])).is_err());
    }

    #[test]
    fn test_run_reports_stage_on_failure() {
        let driver = Driver {
            src: "/nonexistent/input.elf".to_string(),
            dst: "/nonexistent/output.rpx".to_string(),
            rpl: false,
            verbose: false,
        };
        let err = driver.run().unwrap_err();
        assert!(err.starts_with("read_elf:"), "unexpected error: {}", err);
    }
}
