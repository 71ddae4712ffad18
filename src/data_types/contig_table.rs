use log::{debug, info, warn};
use rustc_hash::FxHashMap as HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

/// Minimum number of tab-delimited columns in a FASTA index row
const MIN_FAI_FIELDS: usize = 5;

#[derive(thiserror::Error, Debug)]
pub enum ContigTableError {
    #[error("index row {line_number} has {found} fields, expected at least 5")]
    TooFewFields { line_number: u64, found: usize },
    #[error("index row {line_number} has a non-integer contig length: {value:?}")]
    InvalidLength { line_number: u64, value: String },
    #[error("index row {line_number} is not valid UTF-8 text")]
    InvalidText { line_number: u64 },
    #[error("error while opening contig index: {0}")]
    Io(#[from] std::io::Error)
}

/// Immutable lookup from contig name to contig length, usually loaded from a `.fai` file
#[derive(Clone, Debug, Default)]
pub struct ContigTable {
    /// Map where keys are contig names and values are the contig lengths
    contig_lengths: HashMap<String, u64>,
    /// All contig names in byte-wise ascending order
    sorted_names: Vec<String>
}

impl ContigTable {
    /// Loads a contig table from a FASTA index (`.fai`) file.
    /// # Arguments
    /// * `fai_fn` - the index filename
    /// # Errors
    /// * if the file cannot be opened
    /// * if any row fails to parse, see `from_reader`
    pub fn from_fai(fai_fn: &Path) -> Result<ContigTable, ContigTableError> {
        info!("Loading contig index {:?}...", fai_fn);
        let fai_file: File = File::open(fai_fn)?;
        let contig_table = ContigTable::from_reader(fai_file)?;
        info!("Finished loading {} contigs.", contig_table.len());
        Ok(contig_table)
    }

    /// Parses a contig table from any tab-separated index stream.
    /// Field 0 is the contig name and field 1 is the length; every row needs at least 5 fields.
    /// If a contig name is repeated, the last row wins.
    /// # Arguments
    /// * `reader` - the raw index stream
    /// # Errors
    /// * if a row has fewer than 5 fields
    /// * if the length field is not a non-negative integer
    pub fn from_reader<R: Read>(reader: R) -> Result<ContigTable, ContigTableError> {
        let buf_reader = BufReader::new(reader);
        let mut contig_lengths: HashMap<String, u64> = Default::default();
        for (i, line_result) in buf_reader.lines().enumerate() {
            let line_number: u64 = i as u64 + 1;
            let line: String = line_result.map_err(|e| match e.kind() {
                ErrorKind::InvalidData => ContigTableError::InvalidText { line_number },
                _ => ContigTableError::Io(e)
            })?;

            // blank rows are not skipped, they have 0 fields
            let fields: Vec<&str> = if line.is_empty() { vec![] } else { line.split('\t').collect() };
            if fields.len() < MIN_FAI_FIELDS {
                return Err(ContigTableError::TooFewFields { line_number, found: fields.len() });
            }

            let contig_name: String = fields[0].to_string();
            let contig_length: u64 = fields[1].parse().map_err(|_| ContigTableError::InvalidLength {
                line_number,
                value: fields[1].to_string()
            })?;

            if let Some(previous) = contig_lengths.insert(contig_name.clone(), contig_length) {
                warn!("Contig {:?} is listed more than once, replacing length {} with {}", contig_name, previous, contig_length);
            }
        }

        // byte-wise order, independent of any locale
        let mut sorted_names: Vec<String> = contig_lengths.keys().cloned().collect();
        sorted_names.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        debug!("Contig order: {:?}", sorted_names);

        Ok(ContigTable {
            contig_lengths,
            sorted_names
        })
    }

    pub fn len(&self) -> usize {
        self.contig_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contig_lengths.is_empty()
    }

    pub fn contains(&self, contig: &str) -> bool {
        self.contig_lengths.contains_key(contig)
    }

    /// Returns the length of a contig, or None if it is not in the table
    pub fn get_length(&self, contig: &str) -> Option<u64> {
        self.contig_lengths.get(contig).copied()
    }

    /// All contig names, sorted ascending by their bytes
    pub fn sorted_names(&self) -> &[String] {
        &self.sorted_names
    }
}
