//! Shared fixtures for the binary-level tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// chr1 is 1000 bp of repeating ACGT, chr2 is 100 bp of T
pub fn reference_sequence(chrom: &str) -> String {
    match chrom {
        "chr1" => "ACGT".repeat(250),
        "chr2" => "T".repeat(100),
        _ => panic!("unknown test chromosome {chrom}")
    }
}

/// Writes the two-contig test reference with single-line sequences
pub fn write_reference(dir: &Path) -> PathBuf {
    let reference_fn = dir.join("reference.fa");
    let contents = format!(">chr1\n{}\n>chr2\n{}\n", reference_sequence("chr1"), reference_sequence("chr2"));
    std::fs::write(&reference_fn, contents).unwrap();
    reference_fn
}

/// Writes a FASTA index matching `write_reference`
pub fn write_reference_fai(dir: &Path) -> PathBuf {
    let fai_fn = dir.join("reference.fa.fai");
    // ">chr1\n" is 6 bytes, then 1000 bp + newline, then ">chr2\n"
    std::fs::write(&fai_fn, "chr1\t1000\t6\t1000\t1001\nchr2\t100\t1013\t100\t101\n").unwrap();
    fai_fn
}

/// Writes an executable shell script
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
