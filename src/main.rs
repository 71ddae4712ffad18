use patchpolish::cli::{PolishSettings, check_polish_settings, error_exit_code, get_raw_polish_settings};
use patchpolish::data_types::patch::{Patch, load_patches};
use patchpolish::polish::{PatchPolisher, PatchResult};
use patchpolish::writers::patch_summary::PatchSummaryWriter;

use log::{LevelFilter, error, info};
use std::time::Instant;

fn main() {
    // get the settings
    let settings: PolishSettings = get_raw_polish_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: PolishSettings = check_polish_settings(settings);

    let patches: Vec<Patch> = match load_patches(&cli_settings.patches_filename) {
        Ok(p) => p,
        Err(e) => {
            error!("Error during patch file parsing: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!("Loaded {} patches.", patches.len());

    let polisher: PatchPolisher = match PatchPolisher::new(
        &cli_settings.reference_filename,
        &cli_settings.reads_filename,
        cli_settings.polish_config()
    ) {
        Ok(pp) => pp,
        Err(e) => {
            error!("Error during reference and read loading: {}", e);
            std::process::exit(error_exit_code(&*e));
        }
    };

    let mut summary_writer: Option<PatchSummaryWriter> = match cli_settings.summary_filename {
        Some(ref filename) => {
            match PatchSummaryWriter::new(filename) {
                Ok(sw) => Some(sw),
                Err(e) => {
                    error!("Error during summary writer creation: {}", e);
                    std::process::exit(exitcode::IOERR);
                }
            }
        },
        None => None
    };

    // patches run one at a time; the first failure stops the whole run
    let start_time: Instant = Instant::now();
    let mut total_variants: usize = 0;
    for (i, patch) in patches.iter().enumerate() {
        info!("Polishing patch {} / {}: {}", i + 1, patches.len(), patch);
        let patch_result: PatchResult = match polisher.polish_patch(patch) {
            Ok(r) => r,
            Err(e) => {
                error!("Error while polishing patch {}:", patch);
                error!("  {}", e);
                std::process::exit(error_exit_code(&*e));
            }
        };
        info!("Lifted {} variants into {:?}.", patch_result.liftover_stats.records, patch_result.output_vcf);
        total_variants += patch_result.liftover_stats.records;

        if let Some(sw) = summary_writer.as_mut() {
            match sw.write_result(&patch_result) {
                Ok(()) => {},
                Err(e) => {
                    error!("Error while writing summary file: {}", e);
                    std::process::exit(exitcode::IOERR);
                }
            };
        }
    }

    info!("All {} patches ({} variants) finished successfully after {} seconds; results in {:?}.",
        patches.len(), total_variants, start_time.elapsed().as_secs_f64(), polisher.output_dir());
}
