use clap::Parser;
use lazy_static::lazy_static;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::data_types::contig_table::ContigTableError;
use crate::data_types::patch::RegionConvention;
use crate::external::SubprocessError;
use crate::liftover::LiftoverError;
use crate::polish::PolishConfig;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.1.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.1.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about = "Polish assembly patches with supporting reads and lift the resulting variants back onto the assembly")]
pub struct PolishSettings {
    /// Reference FASTA file containing the raw patches, must not be gzipped
    #[clap(value_name = "REFERENCE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub reference_filename: PathBuf,

    /// Read FASTA file containing the supporting reads, must not be gzipped
    #[clap(value_name = "READS")]
    #[clap(help_heading = Some("Input/Output"))]
    pub reads_filename: PathBuf,

    /// Patch file in BED-like format; the fourth column is a comma-separated list of supporting reads
    #[clap(value_name = "PATCHES")]
    #[clap(help_heading = Some("Input/Output"))]
    pub patches_filename: PathBuf,

    /// Output directory for all intermediate and final files
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(default_value = "patchpolish_output")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_dir: PathBuf,

    /// Output summary file with one row per patch (optional, csv/tsv)
    #[clap(long = "summary-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub summary_filename: Option<PathBuf>,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Maximum flanking sequence added before each patch
    #[clap(long = "left-flank")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "100000")]
    #[clap(help_heading = Some("Patch Extraction"))]
    pub left_flank: u64,

    /// Maximum flanking sequence added after each patch
    #[clap(long = "right-flank")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "100000")]
    #[clap(help_heading = Some("Patch Extraction"))]
    pub right_flank: u64,

    /// Consensus tool, invoked as `<TOOL> -i <reads> -d <draft> -o <dir>`
    #[clap(long = "consensus-tool")]
    #[clap(value_name = "PROGRAM")]
    #[clap(default_value = "medaka_consensus")]
    #[clap(help_heading = Some("External Tools"))]
    pub consensus_tool: String,

    /// Region filter tool, invoked as `<TOOL> [-h] <variants.vcf.gz> <region>`
    #[clap(long = "filter-tool")]
    #[clap(value_name = "PROGRAM")]
    #[clap(default_value = "tabix")]
    #[clap(help_heading = Some("External Tools"))]
    pub filter_tool: String,

    /// Coordinate convention for the start of the filter region
    #[clap(long = "region-convention")]
    #[clap(value_name = "CONVENTION")]
    #[clap(value_enum)]
    #[clap(default_value = "one-based")]
    #[clap(help_heading = Some("External Tools"))]
    pub region_convention: RegionConvention,

    /// Do not request the VCF header from the region filter tool
    #[clap(long = "no-filter-header")]
    #[clap(help_heading = Some("External Tools"))]
    pub no_filter_header: bool
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about = "Lift variant records onto a named contig with a positional offset")]
pub struct LiftoverSettings {
    /// Input variant file in VCF format (plain or gzip)
    #[clap(value_name = "VCF")]
    pub vcf_filename: PathBuf,

    /// FASTA index file listing all reference contigs
    #[clap(value_name = "FAI")]
    pub fai_filename: PathBuf,

    /// Contig that all variants are moved onto
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "contig")]
    #[clap(value_name = "STR")]
    pub contig: String,

    /// Offset added to every variant position, must be >= 0
    #[clap(required = true)]
    #[clap(short = 'f')]
    #[clap(long = "offset")]
    #[clap(value_name = "INT")]
    #[clap(allow_negative_numbers = true)]
    pub offset: i64,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

impl PolishSettings {
    /// Wrapper function to build the per-patch configuration from our CLI settings
    pub fn polish_config(&self) -> PolishConfig {
        PolishConfig {
            output_dir: self.output_dir.clone(),
            left_flank: self.left_flank,
            right_flank: self.right_flank,
            consensus_tool: self.consensus_tool.clone(),
            filter_tool: self.filter_tool.clone(),
            region_convention: self.region_convention,
            filter_header: !self.no_filter_header
        }
    }
}

pub fn get_raw_polish_settings() -> PolishSettings {
    PolishSettings::parse()
}

pub fn get_raw_liftover_settings() -> LiftoverSettings {
    LiftoverSettings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_polish_settings(settings: PolishSettings) -> PolishSettings {
    check_required_filename(&settings.reference_filename, "Reference file");
    check_required_filename(&settings.reads_filename, "Reads file");
    check_required_filename(&settings.patches_filename, "Patch file");
    info!("Output directory: \"{}\"", settings.output_dir.display());
    if let Some(ref filename) = settings.summary_filename {
        info!("Summary file: \"{}\"", filename.display());
    }

    info!("Patch extraction:");
    info!("\tLeft flank: {} bp", settings.left_flank);
    info!("\tRight flank: {} bp", settings.right_flank);
    if settings.left_flank == 0 && settings.right_flank == 0 {
        warn!("\tBoth flanks are 0, the consensus tool will have no alignment context around each patch.");
    }

    info!("External tools:");
    info!("\tConsensus tool: {}", settings.consensus_tool);
    info!("\tRegion filter tool: {}", settings.filter_tool);
    info!("\tRegion convention: {}", settings.region_convention);
    info!("\tFilter header: {}", if settings.no_filter_header { "DISABLED" } else { "ENABLED" });

    settings
}

/// Checks the liftover inputs exist; contig and offset are checked against the index later.
/// # Arguments
/// * `settings` - the raw settings from clap
pub fn check_liftover_settings(settings: LiftoverSettings) -> LiftoverSettings {
    check_required_filename(&settings.vcf_filename, "Variant file");
    check_required_filename(&settings.fai_filename, "Contig index file");
    info!("Liftover contig: {}", settings.contig);
    info!("Liftover offset: {}", settings.offset);
    settings
}

/// Picks the process exit code for an error that reached the top level
/// # Arguments
/// * `err` - the error to classify
pub fn error_exit_code(err: &(dyn std::error::Error + 'static)) -> exitcode::ExitCode {
    if let Some(e) = err.downcast_ref::<LiftoverError>() {
        match e {
            LiftoverError::Io(_) => exitcode::IOERR,
            e if e.is_config_error() => exitcode::USAGE,
            _ => exitcode::DATAERR
        }
    } else if let Some(e) = err.downcast_ref::<ContigTableError>() {
        match e {
            ContigTableError::Io(_) => exitcode::IOERR,
            _ => exitcode::DATAERR
        }
    } else if err.downcast_ref::<SubprocessError>().is_some() {
        exitcode::SOFTWARE
    } else if err.downcast_ref::<std::io::Error>().is_some() {
        exitcode::IOERR
    } else {
        exitcode::SOFTWARE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definitions() {
        PolishSettings::command().debug_assert();
        LiftoverSettings::command().debug_assert();
    }

    #[test]
    fn test_polish_defaults() {
        let settings = PolishSettings::try_parse_from(["patchpolish", "ref.fa", "reads.fa", "patches.bed"]).unwrap();
        let config = settings.polish_config();
        assert_eq!(config.output_dir, PathBuf::from("patchpolish_output"));
        assert_eq!(config.left_flank, 100000);
        assert_eq!(config.right_flank, 100000);
        assert_eq!(config.consensus_tool, "medaka_consensus");
        assert_eq!(config.filter_tool, "tabix");
        assert_eq!(config.region_convention, RegionConvention::OneBased);
        assert!(config.filter_header);
    }

    #[test]
    fn test_polish_overrides() {
        let settings = PolishSettings::try_parse_from([
            "patchpolish", "ref.fa", "reads.fa", "patches.bed",
            "-o", "out", "--left-flank", "10", "--right-flank", "20",
            "--region-convention", "zero-based", "--no-filter-header"
        ]).unwrap();
        let config = settings.polish_config();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.left_flank, 10);
        assert_eq!(config.right_flank, 20);
        assert_eq!(config.region_convention, RegionConvention::ZeroBased);
        assert!(!config.filter_header);
    }

    #[test]
    fn test_liftover_arguments() {
        let settings = LiftoverSettings::try_parse_from(["liftover_vcf", "in.vcf", "ref.fa.fai", "-c", "chr1", "-f", "100"]).unwrap();
        assert_eq!(settings.contig, "chr1");
        assert_eq!(settings.offset, 100);

        // negative offsets parse so they can be rejected with a clear message later
        let settings = LiftoverSettings::try_parse_from(["liftover_vcf", "in.vcf", "ref.fa.fai", "-c", "chr1", "-f", "-5"]).unwrap();
        assert_eq!(settings.offset, -5);

        // both -c and -f are required
        assert!(LiftoverSettings::try_parse_from(["liftover_vcf", "in.vcf", "ref.fa.fai", "-c", "chr1"]).is_err());
        assert!(LiftoverSettings::try_parse_from(["liftover_vcf", "in.vcf", "ref.fa.fai", "-f", "1"]).is_err());
        assert!(LiftoverSettings::try_parse_from(["liftover_vcf", "in.vcf", "ref.fa.fai", "-c", "chr1", "-f", "x"]).is_err());
    }

    #[test]
    fn test_error_exit_codes() {
        let config_error = LiftoverError::ContigNotFound { contig: "chrZ".to_string() };
        assert_eq!(error_exit_code(&config_error), exitcode::USAGE);
        let parse_error = LiftoverError::InvalidPosition { line_number: 1, value: "x".to_string() };
        assert_eq!(error_exit_code(&parse_error), exitcode::DATAERR);
        let index_error = ContigTableError::TooFewFields { line_number: 1, found: 2 };
        assert_eq!(error_exit_code(&index_error), exitcode::DATAERR);
        let text_error = LiftoverError::InvalidText { line_number: 3 };
        assert_eq!(error_exit_code(&text_error), exitcode::DATAERR);
        let index_text_error = ContigTableError::InvalidText { line_number: 3 };
        assert_eq!(error_exit_code(&index_text_error), exitcode::DATAERR);
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(error_exit_code(&io_error), exitcode::IOERR);

        let boxed: Box<dyn std::error::Error> = Box::new(LiftoverError::NegativeOffset { offset: -1 });
        assert_eq!(error_exit_code(&*boxed), exitcode::USAGE);
    }
}
