use crate::data_types::contig_table::ContigTable;

use flate2::bufread::MultiGzDecoder;
use log::{debug, trace};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::Path;

/// Header lines starting with this prefix are replaced by one declaration per known contig
const CONTIG_HEADER_PREFIX: &str = "##contig=";

#[derive(thiserror::Error, Debug)]
pub enum LiftoverError {
    #[error("liftover contig not found: {contig:?}")]
    ContigNotFound { contig: String },
    #[error("liftover offset must be non-negative: {offset}")]
    NegativeOffset { offset: i64 },
    #[error("line {line_number}: variant record has {found} field(s), expected a position in field 2")]
    MissingPosition { line_number: usize, found: usize },
    #[error("line {line_number}: position is not an integer: {value:?}")]
    InvalidPosition { line_number: usize, value: String },
    #[error("line {line_number}: not valid UTF-8 text")]
    InvalidText { line_number: usize },
    #[error("line {line_number}: position {position} + offset {offset} overflows")]
    PositionOverflow { line_number: usize, position: i64, offset: i64 },
    #[error("I/O error during liftover: {0}")]
    Io(#[from] std::io::Error)
}

impl LiftoverError {
    /// True for errors in the requested configuration, as opposed to the data stream
    pub fn is_config_error(&self) -> bool {
        matches!(self, LiftoverError::ContigNotFound { .. } | LiftoverError::NegativeOffset { .. })
    }

    /// True for malformed variant records
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            LiftoverError::MissingPosition { .. } | LiftoverError::InvalidPosition { .. } |
            LiftoverError::InvalidText { .. } | LiftoverError::PositionOverflow { .. }
        )
    }
}

/// A validated liftover target: every record is moved onto `target_contig`, shifted by `offset`
#[derive(Clone, Debug)]
pub struct LiftoverRequest {
    /// The contig that replaces field 0 of every record
    target_contig: String,
    /// Added to the position of every record
    offset: i64,
    /// Contig names emitted when a `##contig=` header is expanded, already sorted
    contig_names: Vec<String>
}

impl LiftoverRequest {
    /// Creates a new request, checking it against the contig table before any data is touched.
    /// # Arguments
    /// * `contig_table` - all known contigs, used for validation and header expansion
    /// * `target_contig` - the contig all records are moved onto
    /// * `offset` - the positional shift, must be >= 0
    /// # Errors
    /// * `ContigNotFound` if `target_contig` is not in the table
    /// * `NegativeOffset` if `offset < 0`
    pub fn new(contig_table: &ContigTable, target_contig: &str, offset: i64) -> Result<LiftoverRequest, LiftoverError> {
        if !contig_table.contains(target_contig) {
            return Err(LiftoverError::ContigNotFound { contig: target_contig.to_string() });
        }
        if offset < 0 {
            return Err(LiftoverError::NegativeOffset { offset });
        }
        Ok(LiftoverRequest {
            target_contig: target_contig.to_string(),
            offset,
            contig_names: contig_table.sorted_names().to_vec()
        })
    }

    pub fn target_contig(&self) -> &str {
        &self.target_contig
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

/// Counts of what was written during a liftover
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LiftoverStats {
    /// Header lines copied through unchanged
    pub header_lines: usize,
    /// `##contig=` declarations emitted by header expansion
    pub contig_lines: usize,
    /// Variant records that were shifted
    pub records: usize
}

/// Opens a variant file for line reading, decompressing it first if it ends with `.gz`
/// # Arguments
/// * `vcf_fn` - the plain-text or gzip VCF filename
pub fn open_variant_file(vcf_fn: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let vcf_file: File = File::open(vcf_fn)?;
    let file_reader = BufReader::new(vcf_file);
    if vcf_fn.extension().unwrap_or_default() == "gz" {
        debug!("Detected gzip extension, loading variants with MultiGzDecoder...");
        let gz_decoder = MultiGzDecoder::new(file_reader);
        Ok(Box::new(BufReader::new(gz_decoder)))
    } else {
        Ok(Box::new(file_reader))
    }
}

/// Streams a VCF-like text file into the coordinate space of a `LiftoverRequest`.
/// Lines starting with `#` are headers and are copied, except `##contig=` lines which are replaced by `##contig=<ID=name>` for every known contig.
/// All other lines are records: field 0 becomes the target contig and field 1 is shifted by the offset.
/// # Arguments
/// * `request` - the validated liftover target
/// * `reader` - the input variant stream
/// * `writer` - the output stream, each line is newline terminated
/// # Errors
/// * if a record has no position field or the position is not an integer
/// * if reading or writing fails
/// Anything written before the failing line is left in `writer`.
pub fn liftover_vcf<R: BufRead, W: Write>(request: &LiftoverRequest, reader: R, mut writer: W) -> Result<LiftoverStats, LiftoverError> {
    let mut stats: LiftoverStats = Default::default();
    for (i, line_result) in reader.lines().enumerate() {
        let line_number: usize = i + 1;
        let raw_line: String = line_result.map_err(|e| match e.kind() {
            ErrorKind::InvalidData => LiftoverError::InvalidText { line_number },
            _ => LiftoverError::Io(e)
        })?;
        let line: &str = raw_line.trim_end_matches(&['\r', '\n'][..]);

        if line.starts_with('#') {
            if line.starts_with(CONTIG_HEADER_PREFIX) {
                trace!("Expanding contig header on line {}", line_number);
                for contig in request.contig_names.iter() {
                    writeln!(writer, "{}<ID={}>", CONTIG_HEADER_PREFIX, contig)?;
                }
                stats.contig_lines += request.contig_names.len();
            } else {
                writeln!(writer, "{line}")?;
                stats.header_lines += 1;
            }
        } else {
            let lifted: String = liftover_record(request, line, line_number)?;
            writeln!(writer, "{lifted}")?;
            stats.records += 1;
        }
    }
    writer.flush()?;

    debug!("Liftover to {}+{} finished: {:?}", request.target_contig, request.offset, stats);
    Ok(stats)
}

/// Rewrites a single tab-delimited record, leaving every field after the position untouched
fn liftover_record(request: &LiftoverRequest, line: &str, line_number: usize) -> Result<String, LiftoverError> {
    let mut fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 2 {
        return Err(LiftoverError::MissingPosition { line_number, found: fields.len() });
    }

    let position: i64 = fields[1].parse().map_err(|_| LiftoverError::InvalidPosition {
        line_number,
        value: fields[1].to_string()
    })?;
    let shifted: i64 = position.checked_add(request.offset).ok_or(LiftoverError::PositionOverflow {
        line_number,
        position,
        offset: request.offset
    })?;
    let shifted_string: String = shifted.to_string();

    fields[0] = request.target_contig.as_str();
    fields[1] = shifted_string.as_str();
    Ok(fields.join("\t"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_contig_table() -> ContigTable {
        ContigTable::from_reader("chr2\t2000\t0\t60\t61\nchr1\t1000\t0\t60\t61\n".as_bytes()).unwrap()
    }

    fn run_liftover(request: &LiftoverRequest, input: &str) -> Result<(Vec<String>, LiftoverStats), LiftoverError> {
        let mut output: Vec<u8> = vec![];
        let stats = liftover_vcf(request, input.as_bytes(), &mut output)?;
        let lines: Vec<String> = String::from_utf8(output).unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect();
        Ok((lines, stats))
    }

    #[test]
    fn test_end_to_end() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr2", 100).unwrap();
        let (lines, stats) = run_liftover(&request, "##header\n##contig=<ID=old>\nchr9\t5\tA\tB\n").unwrap();
        assert_eq!(lines, vec![
            "##header",
            "##contig=<ID=chr1>",
            "##contig=<ID=chr2>",
            "chr2\t105\tA\tB"
        ]);
        assert_eq!(stats, LiftoverStats { header_lines: 1, contig_lines: 2, records: 1 });
    }

    #[test]
    fn test_zero_offset() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 0).unwrap();
        let (lines, _) = run_liftover(&request, "chr1_0_500\t17\t.\tA\tG\t30\tPASS\t.\n").unwrap();
        assert_eq!(lines, vec!["chr1\t17\t.\tA\tG\t30\tPASS\t."]);
    }

    #[test]
    fn test_config_errors() {
        let contig_table = two_contig_table();
        let result = LiftoverRequest::new(&contig_table, "chr3", 100);
        match result {
            Err(e) => {
                assert!(e.is_config_error());
                assert!(!e.is_parse_error());
                assert!(e.to_string().contains("liftover contig not found"));
            },
            Ok(_) => panic!("expected ContigNotFound")
        };

        let result = LiftoverRequest::new(&contig_table, "chr1", -1);
        match result {
            Err(e) => {
                assert!(e.is_config_error());
                assert!(e.to_string().contains("liftover offset must be non-negative"));
            },
            Ok(_) => panic!("expected NegativeOffset")
        };
    }

    #[test]
    fn test_header_expansion_ignores_content() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 5).unwrap();
        let (lines, stats) = run_liftover(&request, "##contig=<ID=chr1_0_500,length=500>\n##contig=\n").unwrap();
        assert_eq!(lines, vec![
            "##contig=<ID=chr1>",
            "##contig=<ID=chr2>",
            "##contig=<ID=chr1>",
            "##contig=<ID=chr2>"
        ]);
        assert_eq!(stats.contig_lines, 4);
    }

    #[test]
    fn test_header_passthrough() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 5).unwrap();
        let input = "##fileformat=VCFv4.2\n##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n# contig=lookalike\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        let (lines, stats) = run_liftover(&request, input).unwrap();
        let expected: Vec<String> = input.lines().map(|l| l.to_string()).collect();
        assert_eq!(lines, expected);
        assert_eq!(stats, LiftoverStats { header_lines: 4, contig_lines: 0, records: 0 });
    }

    #[test]
    fn test_record_fields_preserved() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr2", 1000).unwrap();
        let input = "ctg\t1\trs1\tACGT\tA\t12.5\tPASS\tDP=10;AF=0.5\tGT:GQ\t0/1:30\n";
        let (lines, stats) = run_liftover(&request, input).unwrap();
        assert_eq!(stats.records, 1);
        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[0], "chr2");
        assert_eq!(fields[1], "1001");
        assert_eq!(&fields[2..], &["rs1", "ACGT", "A", "12.5", "PASS", "DP=10;AF=0.5", "GT:GQ", "0/1:30"]);
    }

    #[test]
    fn test_two_field_record_and_empty_fields() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 3).unwrap();
        let (lines, _) = run_liftover(&request, "x\t7\n\t8\t\t\n").unwrap();
        assert_eq!(lines, vec!["chr1\t10", "chr1\t11\t\t"]);
    }

    #[test]
    fn test_line_endings_stripped() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 1).unwrap();
        let (lines, _) = run_liftover(&request, "##a\r\nx\t1\tA\r\n").unwrap();
        assert_eq!(lines, vec!["##a", "chr1\t2\tA"]);
    }

    #[test]
    fn test_leading_zeros_dropped() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 0).unwrap();
        let (lines, _) = run_liftover(&request, "x\t007\tA\n").unwrap();
        assert_eq!(lines, vec!["chr1\t7\tA"]);
    }

    #[test]
    fn test_missing_position() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 0).unwrap();
        let mut output: Vec<u8> = vec![];
        let result = liftover_vcf(&request, "##ok\nchr1 100 A\n".as_bytes(), &mut output);
        match result {
            Err(e) => {
                assert!(e.is_parse_error());
                assert!(matches!(e, LiftoverError::MissingPosition { line_number: 2, found: 1 }));
            },
            Ok(_) => panic!("expected MissingPosition")
        };

        // everything before the failing line is still written
        assert_eq!(String::from_utf8(output).unwrap(), "##ok\n");
    }

    #[test]
    fn test_invalid_position() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 0).unwrap();
        let result = run_liftover(&request, "chr1\t1.5\tA\n");
        match result {
            Err(LiftoverError::InvalidPosition { line_number, value }) => {
                assert_eq!(line_number, 1);
                assert_eq!(value, "1.5");
            },
            _ => panic!("expected InvalidPosition")
        };
    }

    #[test]
    fn test_open_variant_file() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let contents = "##fileformat=VCFv4.2\nctg\t10\tA\n";

        let plain_fn = temp_dir.path().join("plain.vcf");
        std::fs::write(&plain_fn, contents).unwrap();
        let gz_fn = temp_dir.path().join("compressed.vcf.gz");
        let mut encoder = GzEncoder::new(File::create(&gz_fn).unwrap(), Compression::default());
        encoder.write_all(contents.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let request = LiftoverRequest::new(&two_contig_table(), "chr2", 90).unwrap();
        for vcf_fn in [plain_fn, gz_fn] {
            let mut output: Vec<u8> = vec![];
            liftover_vcf(&request, open_variant_file(&vcf_fn).unwrap(), &mut output).unwrap();
            assert_eq!(String::from_utf8(output).unwrap(), "##fileformat=VCFv4.2\nchr2\t100\tA\n");
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 0).unwrap();
        let input: &[u8] = b"##ok\nchr1\t5\t\xff\n";
        let mut output: Vec<u8> = vec![];
        let result = liftover_vcf(&request, input, &mut output);
        match result {
            Err(e) => {
                assert!(e.is_parse_error());
                assert!(matches!(e, LiftoverError::InvalidText { line_number: 2 }));
            },
            Ok(_) => panic!("expected InvalidText")
        };
        assert_eq!(String::from_utf8(output).unwrap(), "##ok\n");
    }

    #[test]
    fn test_position_overflow() {
        let request = LiftoverRequest::new(&two_contig_table(), "chr1", 10).unwrap();
        let input = format!("chr1\t{}\tA\n", i64::MAX);
        let result = run_liftover(&request, &input);
        assert!(matches!(result, Err(LiftoverError::PositionOverflow { line_number: 1, .. })));
    }
}
