use log::warn;
use simple_error::bail;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of tab-delimited columns in a patch descriptor row
const PATCH_FIELDS: usize = 4;

/// How the filter region is translated from the flanked patch coordinates.
/// Two variants of the original pipeline disagreed here, so it is left to the user.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RegionConvention {
    /// Region is `left_flank+1` to `left_flank+patch_len`, inclusive 1-based
    OneBased,
    /// Region is `left_flank` to `left_flank+patch_len`
    ZeroBased
}

/// A single patch from the descriptor file
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Patch {
    /// The chromosome containing the patch
    chrom: String,
    /// 0-based start of the patch
    start: u64,
    /// 0-based end of the patch, exclusive
    end: u64,
    /// Read names supporting this patch
    supporting_reads: Vec<String>
}

impl Patch {
    /// Creates a new patch, checking the coordinates and reads.
    /// # Errors
    /// * if `start > end`
    /// * if no supporting reads are provided
    pub fn new(chrom: String, start: u64, end: u64, supporting_reads: Vec<String>) -> Result<Patch, Box<dyn std::error::Error>> {
        if start > end {
            bail!("Patch {}:{}-{} has start > end", chrom, start, end);
        }
        if supporting_reads.is_empty() {
            bail!("Patch {}:{}-{} has no supporting reads", chrom, start, end);
        }
        Ok(Patch {
            chrom,
            start,
            end,
            supporting_reads
        })
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn supporting_reads(&self) -> &[String] {
        &self.supporting_reads
    }
}

impl std::fmt::Display for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// Loads all patches from a descriptor file, see `parse_patches`.
pub fn load_patches(patch_fn: &Path) -> Result<Vec<Patch>, Box<dyn std::error::Error>> {
    let patch_file: File = File::open(patch_fn)?;
    parse_patches(patch_file)
}

/// Parses patch rows of the form `chrom\tstart\tend\tread1,read2,...`.
/// # Arguments
/// * `reader` - the raw descriptor stream
/// # Errors
/// * if a row does not have exactly 4 fields
/// * if start/end are not integers, or any `Patch::new` check fails
pub fn parse_patches<R: Read>(reader: R) -> Result<Vec<Patch>, Box<dyn std::error::Error>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut patches: Vec<Patch> = vec![];
    for row in csv_reader.records() {
        let record: csv::StringRecord = row?;
        let line_number: u64 = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() != PATCH_FIELDS {
            bail!("Patch row {} has {} fields, expected {}", line_number, record.len(), PATCH_FIELDS);
        }

        let start: u64 = match record[1].parse() {
            Ok(s) => s,
            Err(e) => bail!("Patch row {} has invalid start {:?}: {}", line_number, &record[1], e)
        };
        let end: u64 = match record[2].parse() {
            Ok(e) => e,
            Err(e) => bail!("Patch row {} has invalid end {:?}: {}", line_number, &record[2], e)
        };
        let supporting_reads: Vec<String> = record[3].split(',')
            .filter(|r| !r.is_empty())
            .map(|r| r.to_string())
            .collect();

        patches.push(Patch::new(record[0].to_string(), start, end, supporting_reads)?);
    }
    Ok(patches)
}

/// A patch with flanking sequence added on each side, clamped to the contig
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlankedPatch {
    /// The original patch
    patch: Patch,
    /// 0-based start of the flanked region
    flank_start: u64,
    /// 0-based end of the flanked region, exclusive
    flank_end: u64
}

impl FlankedPatch {
    /// Adds flanks to a patch.
    /// # Arguments
    /// * `patch` - the patch to flank
    /// * `contig_length` - the full length of `patch.chrom()`, the flanked end is clamped to this
    /// * `left_flank` - the requested flank before the patch
    /// * `right_flank` - the requested flank after the patch
    pub fn new(patch: Patch, contig_length: u64, left_flank: u64, right_flank: u64) -> FlankedPatch {
        if patch.end() > contig_length {
            warn!("Patch {} extends past the contig length {}", patch, contig_length);
        }
        let flank_start: u64 = patch.start().saturating_sub(left_flank);
        let flank_end: u64 = patch.end().saturating_add(right_flank).min(contig_length);
        FlankedPatch {
            patch,
            flank_start,
            flank_end
        }
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn flank_start(&self) -> u64 {
        self.flank_start
    }

    pub fn flank_end(&self) -> u64 {
        self.flank_end
    }

    /// The flank that was actually added before the patch, after clamping
    pub fn left_flank(&self) -> u64 {
        self.patch.start() - self.flank_start
    }

    /// Name shared by the intermediate files and the draft contig, `chrom_flankstart_flankend`
    pub fn basename(&self) -> String {
        format!("{}_{}_{}", self.patch.chrom(), self.flank_start, self.flank_end)
    }

    /// Builds the `contig:start-end` region of the patch on the draft contig.
    /// # Arguments
    /// * `convention` - controls the off-by-one handling of the region start
    pub fn filter_region(&self, convention: RegionConvention) -> String {
        let left_flank: u64 = self.left_flank();
        let region_start: u64 = match convention {
            RegionConvention::OneBased => left_flank + 1,
            RegionConvention::ZeroBased => left_flank
        };
        let region_end: u64 = left_flank + self.patch.len();
        format!("{}:{}-{}", self.basename(), region_start, region_end)
    }
}
