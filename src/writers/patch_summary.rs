use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::polish::PatchResult;

/// This is a wrapper for writing out per-patch results to a file
pub struct PatchSummaryWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of our summary file
#[derive(Serialize)]
struct PatchSummaryRow {
    /// the chromosome of the patch
    chrom: String,
    /// the 0-based start of the patch
    start: u64,
    /// the 0-based end of the patch
    end: u64,
    /// the start of the flanked region that was polished
    flank_start: u64,
    /// the end of the flanked region that was polished
    flank_end: u64,
    /// the number of supporting reads provided for the patch
    num_reads: usize,
    /// the number of variant records lifted back onto the chromosome
    num_variants: usize,
    /// the final lifted variant file
    output_vcf: String
}

impl PatchSummaryWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write the summary to, `.csv` switches the delimiter to commas
    pub fn new(filename: &Path) -> csv::Result<PatchSummaryWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(PatchSummaryWriter {
            csv_writer
        })
    }

    /// Writes the summary row for one polished patch.
    /// # Arguments
    /// * `patch_result` - the result for a single patch
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_result(&mut self, patch_result: &PatchResult) -> Result<(), Box<dyn std::error::Error>> {
        let flanked = &patch_result.flanked_patch;
        let row: PatchSummaryRow = PatchSummaryRow {
            chrom: flanked.patch().chrom().to_string(),
            start: flanked.patch().start(),
            end: flanked.patch().end(),
            flank_start: flanked.flank_start(),
            flank_end: flanked.flank_end(),
            num_reads: flanked.patch().supporting_reads().len(),
            num_variants: patch_result.liftover_stats.records,
            output_vcf: patch_result.output_vcf.display().to_string()
        };
        self.csv_writer.serialize(&row)?;
        self.csv_writer.flush()?;
        Ok(())
    }
}
