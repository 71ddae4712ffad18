use crate::data_types::contig_table::ContigTable;
use crate::data_types::patch::{FlankedPatch, Patch, RegionConvention};
use crate::external::run_logged;
use crate::liftover::{LiftoverRequest, LiftoverStats, liftover_vcf, open_variant_file};

use bio::io::fasta;
use log::{debug, info};
use rust_htslib::faidx;
use simple_error::bail;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The variant file the consensus tool leaves in its output directory
const CONSENSUS_VCF_NAME: &str = "variants.vcf.gz";
/// The filtered variant file, written next to the consensus output
const PATCH_VCF_NAME: &str = "variants.patch.vcf";
/// Stderr capture for the region filter tool
const FILTER_ERR_NAME: &str = "tabix.err";

/// Everything needed to polish a single patch, usually built from the CLI settings
#[derive(Clone, Debug)]
pub struct PolishConfig {
    /// Directory holding all intermediate and final files
    pub output_dir: PathBuf,
    /// Maximum flank before each patch
    pub left_flank: u64,
    /// Maximum flank after each patch
    pub right_flank: u64,
    /// Program invoked to build the consensus and call variants
    pub consensus_tool: String,
    /// Program invoked to filter the called variants to the patch region
    pub filter_tool: String,
    /// Off-by-one handling for the filter region
    pub region_convention: RegionConvention,
    /// If true, the filter tool is asked to keep the VCF header
    pub filter_header: bool
}

/// Result for a single successfully polished patch
#[derive(Debug)]
pub struct PatchResult {
    /// The patch with the flanks that were polished
    pub flanked_patch: FlankedPatch,
    /// Counts from the final liftover
    pub liftover_stats: LiftoverStats,
    /// The lifted variant file
    pub output_vcf: PathBuf
}

/// All the file paths used while polishing one patch
struct PatchFiles {
    draft_fasta: PathBuf,
    reads_fasta: PathBuf,
    consensus_dir_name: String,
    consensus_out: PathBuf,
    consensus_err: PathBuf,
    consensus_vcf: PathBuf,
    patch_vcf: PathBuf,
    filter_err: PathBuf,
    output_vcf: PathBuf
}

impl PatchFiles {
    fn new(output_dir: &Path, basename: &str) -> PatchFiles {
        let consensus_dir_name: String = format!("{basename}_medaka");
        let consensus_dir: PathBuf = output_dir.join(&consensus_dir_name);
        PatchFiles {
            draft_fasta: output_dir.join(format!("{basename}.fasta")),
            reads_fasta: output_dir.join(format!("{basename}.reads.fasta")),
            consensus_out: output_dir.join(format!("{basename}.medaka.out")),
            consensus_err: output_dir.join(format!("{basename}.medaka.err")),
            consensus_vcf: consensus_dir.join(CONSENSUS_VCF_NAME),
            patch_vcf: consensus_dir.join(PATCH_VCF_NAME),
            filter_err: consensus_dir.join(FILTER_ERR_NAME),
            output_vcf: output_dir.join(format!("{basename}.variants.patchpolish.vcf")),
            consensus_dir_name
        }
    }
}

/// Returns the `.fai` path htslib uses for a FASTA file
pub fn fai_path(fasta_fn: &Path) -> PathBuf {
    let mut fai_fn = fasta_fn.to_owned().into_os_string();
    fai_fn.push(".fai");
    PathBuf::from(fai_fn)
}

/// Drives the extract, consensus, filter, and liftover steps for each patch in turn
pub struct PatchPolisher {
    /// Per-patch settings
    config: PolishConfig,
    /// Indexed reference containing the raw patches
    reference_reader: faidx::Reader,
    /// Indexed supporting reads
    reads_reader: faidx::Reader,
    /// Contig lengths of the reference, also the liftover target table
    reference_contigs: ContigTable,
    /// Lengths of every read
    read_lengths: ContigTable
}

impl PatchPolisher {
    /// Opens both FASTA files and prepares the output directory.
    /// Missing `.fai` files are built by htslib when the readers open.
    /// # Arguments
    /// * `reference_fn` - the uncompressed reference FASTA
    /// * `reads_fn` - the uncompressed reads FASTA
    /// * `config` - the per-patch settings
    /// # Errors
    /// * if either FASTA cannot be opened or indexed
    /// * if either `.fai` cannot be parsed
    /// * if the output directory cannot be created
    pub fn new(reference_fn: &Path, reads_fn: &Path, mut config: PolishConfig) -> Result<PatchPolisher, Box<dyn std::error::Error>> {
        let reference_reader: faidx::Reader = faidx::Reader::from_path(reference_fn)?;
        let reference_contigs: ContigTable = ContigTable::from_fai(&fai_path(reference_fn))?;
        let reads_reader: faidx::Reader = faidx::Reader::from_path(reads_fn)?;
        let read_lengths: ContigTable = ContigTable::from_fai(&fai_path(reads_fn))?;

        // the consensus tool runs inside the output directory, so everything is absolute from here on
        std::fs::create_dir_all(&config.output_dir)?;
        config.output_dir = std::fs::canonicalize(&config.output_dir)?;
        debug!("Resolved output directory to {:?}", config.output_dir);

        Ok(PatchPolisher {
            config,
            reference_reader,
            reads_reader,
            reference_contigs,
            read_lengths
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Runs the full workflow for one patch.
    /// # Arguments
    /// * `patch` - the patch to polish
    /// # Errors
    /// * if the patch chromosome or any supporting read is not indexed
    /// * if either external tool fails or the consensus tool produces no variant file
    /// * if the filtered variants cannot be lifted over
    pub fn polish_patch(&self, patch: &Patch) -> Result<PatchResult, Box<dyn std::error::Error>> {
        let contig_length: u64 = match self.reference_contigs.get_length(patch.chrom()) {
            Some(l) => l,
            None => bail!("Patch chromosome {:?} was not found in the reference index", patch.chrom())
        };
        let flanked_patch: FlankedPatch = FlankedPatch::new(
            patch.clone(), contig_length,
            self.config.left_flank, self.config.right_flank
        );
        let basename: String = flanked_patch.basename();
        let files: PatchFiles = PatchFiles::new(&self.config.output_dir, &basename);

        info!("Extracting patch {} as {}...", patch, basename);
        self.write_draft(&flanked_patch, &files.draft_fasta)?;
        info!("Extracting {} supporting reads...", patch.supporting_reads().len());
        self.write_reads(patch, &files.reads_fasta)?;

        self.run_consensus(&files)?;
        self.run_region_filter(&flanked_patch, &files)?;

        info!("Lifting variants onto {} with offset {}...", patch.chrom(), flanked_patch.flank_start());
        let request: LiftoverRequest = LiftoverRequest::new(
            &self.reference_contigs,
            patch.chrom(),
            i64::try_from(flanked_patch.flank_start())?
        )?;
        let reader = open_variant_file(&files.patch_vcf)?;
        let writer = BufWriter::new(File::create(&files.output_vcf)?);
        let liftover_stats: LiftoverStats = liftover_vcf(&request, reader, writer)?;

        Ok(PatchResult {
            flanked_patch,
            liftover_stats,
            output_vcf: files.output_vcf
        })
    }

    /// Writes the flanked reference slice as a single-record FASTA named after the basename
    fn write_draft(&self, flanked_patch: &FlankedPatch, draft_fn: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let chrom: &str = flanked_patch.patch().chrom();
        let start: usize = usize::try_from(flanked_patch.flank_start())?;
        let end: usize = usize::try_from(flanked_patch.flank_end())?;
        if start >= end {
            bail!("Flanked patch {}:{}-{} is empty", chrom, start, end);
        }

        // faidx end coordinates are inclusive
        let sequence: String = self.reference_reader.fetch_seq_string(chrom, start, end - 1)?;
        if sequence.len() != end - start {
            bail!("Expected {} bp from {}:{}-{}, but fetched {} bp", end - start, chrom, start, end, sequence.len());
        }

        let mut fasta_writer = fasta::Writer::to_file(draft_fn)?;
        fasta_writer.write(&flanked_patch.basename(), None, sequence.as_bytes())?;
        fasta_writer.flush()?;
        Ok(())
    }

    /// Writes every supporting read in full, in the order they were listed
    fn write_reads(&self, patch: &Patch, reads_fn: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let mut fasta_writer = fasta::Writer::to_file(reads_fn)?;
        for read_name in patch.supporting_reads().iter() {
            let read_length: usize = match self.read_lengths.get_length(read_name) {
                Some(l) => usize::try_from(l)?,
                None => bail!("Supporting read {:?} for patch {} was not found in the reads index", read_name, patch)
            };
            let sequence: String = if read_length == 0 {
                String::new()
            } else {
                self.reads_reader.fetch_seq_string(read_name, 0, read_length - 1)?
            };
            fasta_writer.write(read_name, None, sequence.as_bytes())?;
        }
        fasta_writer.flush()?;
        Ok(())
    }

    /// Runs the consensus tool inside the output directory and checks that it left a variant file
    fn run_consensus(&self, files: &PatchFiles) -> Result<(), Box<dyn std::error::Error>> {
        let mut command = Command::new(&self.config.consensus_tool);
        command
            .arg("-i").arg(&files.reads_fasta)
            .arg("-d").arg(&files.draft_fasta)
            .arg("-o").arg(&files.consensus_dir_name)
            .current_dir(&self.config.output_dir);
        run_logged(&mut command, &files.consensus_out, &files.consensus_err)?;

        if !files.consensus_vcf.exists() {
            bail!("Consensus tool finished, but {:?} was not created", files.consensus_vcf);
        }
        Ok(())
    }

    /// Restricts the consensus variants to the patch itself, dropping calls in the flanks
    fn run_region_filter(&self, flanked_patch: &FlankedPatch, files: &PatchFiles) -> Result<(), Box<dyn std::error::Error>> {
        let region: String = flanked_patch.filter_region(self.config.region_convention);
        let mut command = Command::new(&self.config.filter_tool);
        if self.config.filter_header {
            command.arg("-h");
        }
        command.arg(&files.consensus_vcf).arg(&region);
        run_logged(&mut command, &files.patch_vcf, &files.filter_err)?;
        Ok(())
    }
}
