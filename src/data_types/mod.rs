
/// Contig name to length lookup loaded from a FASTA index
pub mod contig_table;
/// Contains the Patch type as well as flank arithmetic
pub mod patch;
