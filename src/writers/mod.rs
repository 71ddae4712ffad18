
/// Contains the writer for per-patch summary rows
pub mod patch_summary;
