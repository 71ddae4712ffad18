use patchpolish::cli::{LiftoverSettings, check_liftover_settings, error_exit_code, get_raw_liftover_settings};
use patchpolish::data_types::contig_table::ContigTable;
use patchpolish::liftover::{LiftoverRequest, LiftoverStats, liftover_vcf, open_variant_file};

use log::{LevelFilter, error, info};
use std::io::{BufRead, BufWriter};

fn main() {
    // get the settings
    let settings: LiftoverSettings = get_raw_liftover_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // logs go to stderr, stdout is reserved for the lifted variants
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let cli_settings: LiftoverSettings = check_liftover_settings(settings);

    let contig_table: ContigTable = match ContigTable::from_fai(&cli_settings.fai_filename) {
        Ok(ct) => ct,
        Err(e) => {
            error!("Error during contig index loading: {}", e);
            std::process::exit(error_exit_code(&e));
        }
    };

    // both configuration checks happen before a single line is read
    let request: LiftoverRequest = match LiftoverRequest::new(&contig_table, &cli_settings.contig, cli_settings.offset) {
        Ok(r) => r,
        Err(e) => {
            error!("{}", e);
            std::process::exit(error_exit_code(&e));
        }
    };

    let reader: Box<dyn BufRead> = match open_variant_file(&cli_settings.vcf_filename) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while opening {:?}: {}", cli_settings.vcf_filename, e);
            std::process::exit(exitcode::IOERR);
        }
    };

    let stdout = std::io::stdout();
    let writer = BufWriter::new(stdout.lock());
    let stats: LiftoverStats = match liftover_vcf(&request, reader, writer) {
        Ok(s) => s,
        Err(e) => {
            error!("Error during liftover: {}", e);
            std::process::exit(error_exit_code(&e));
        }
    };
    info!("Lifted {} records onto {} (offset {}), expanded {} contig headers.",
        stats.records, request.target_contig(), request.offset(), stats.contig_lines);
}
