//! Per-sample configuration tables: batch assignment, exclusion list and sex
//!

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Read};

use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use itertools::Itertools;
use simple_error::{SimpleResult, bail, try_with};

use crate::features::UNBATCHED_LABEL;

/// Sex code used by the sex table for male samples
const MALE_SEX_CODE: i32 = 1;

fn get_table_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .from_reader(reader)
}

/// Read a two column tab-delimited table into (first_column, second_column) pairs
fn read_two_column_table<R: Read>(reader: R, label: &str) -> SimpleResult<Vec<(String, String)>> {
    let mut rdr = get_table_reader(reader);
    let mut rows = Vec::new();
    for (line_index, result) in rdr.records().enumerate() {
        let record = try_with!(
            result,
            "Failed to parse record line {} from {label} file",
            line_index + 1
        );
        let sample_name = record.get(0).unwrap_or_default();
        if sample_name.is_empty() {
            continue;
        }
        let value = match record.get(1) {
            Some(x) if !x.is_empty() => x,
            _ => {
                bail!(
                    "Missing required second column in record line {} from {label} file, for sample '{sample_name}'",
                    line_index + 1
                );
            }
        };
        rows.push((sample_name.to_string(), value.to_string()));
    }
    Ok(rows)
}

fn open_table(filename: &Utf8Path, label: &str) -> SimpleResult<std::fs::File> {
    Ok(try_with!(
        std::fs::File::open(filename),
        "Unable to open {label} file: '{filename}'"
    ))
}

/// Map from sample name to batch label
#[derive(Default)]
pub struct BatchTable {
    batches: HashMap<String, String>,
}

impl BatchTable {
    pub fn from_reader<R: Read>(reader: R) -> SimpleResult<Self> {
        let mut batches = HashMap::new();
        for (sample_name, batch_label) in read_two_column_table(reader, "batch")? {
            if batch_label == UNBATCHED_LABEL {
                bail!(
                    "Batch file contains a batch label of '{UNBATCHED_LABEL}' for sample '{sample_name}'. This label is reserved for samples without a batch assignment."
                );
            }
            batches.insert(sample_name, batch_label);
        }
        Ok(Self { batches })
    }

    pub fn from_path(filename: &Utf8Path) -> SimpleResult<Self> {
        Self::from_reader(open_table(filename, "batch")?)
    }

    /// Batch label for the sample, or the reserved unbatched label
    pub fn batch_label(&self, sample_name: &str) -> &str {
        self.batches
            .get(sample_name)
            .map(|x| x.as_str())
            .unwrap_or(UNBATCHED_LABEL)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.values().unique().count()
    }
}

/// Samples omitted from all clustering
#[derive(Default)]
pub struct ExcludedSamples {
    samples: HashSet<String>,
}

impl ExcludedSamples {
    /// Read one sample name per line
    ///
    /// Every non-empty line is a sample name, with no comment lines.
    ///
    pub fn from_reader<R: Read>(reader: R) -> SimpleResult<Self> {
        let mut samples = HashSet::new();
        for (line_index, line) in BufReader::new(reader).lines().enumerate() {
            let line = try_with!(
                line,
                "Failed to read line {} from sample exclusion file",
                line_index + 1
            );
            let sample_name = line.trim_end();
            if !sample_name.is_empty() {
                samples.insert(sample_name.to_string());
            }
        }
        Ok(Self { samples })
    }

    pub fn from_path(filename: &Utf8Path) -> SimpleResult<Self> {
        Self::from_reader(open_table(filename, "sample exclusion")?)
    }

    pub fn contains(&self, sample_name: &str) -> bool {
        self.samples.contains(sample_name)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Map from sample name to sex code (1 = male, 2 = female)
#[derive(Default)]
pub struct SampleSexTable {
    sex_codes: HashMap<String, i32>,
}

impl SampleSexTable {
    pub fn from_reader<R: Read>(reader: R) -> SimpleResult<Self> {
        let mut sex_codes = HashMap::new();
        for (sample_name, code) in read_two_column_table(reader, "sample sex")? {
            let code = match code.parse::<i32>() {
                Ok(x) => x,
                Err(_) => {
                    bail!("Invalid sex code '{code}' for sample '{sample_name}' in sample sex file");
                }
            };
            sex_codes.insert(sample_name, code);
        }
        Ok(Self { sex_codes })
    }

    pub fn from_path(filename: &Utf8Path) -> SimpleResult<Self> {
        Self::from_reader(open_table(filename, "sample sex")?)
    }

    /// Samples missing from the table are not treated as male
    pub fn is_male(&self, sample_name: &str) -> bool {
        self.sex_codes.get(sample_name) == Some(&MALE_SEX_CODE)
    }
}

/// All per-sample tables used to build clustering features
#[derive(Default)]
pub struct SampleTables {
    pub batches: BatchTable,
    pub excluded: ExcludedSamples,
    pub sex: SampleSexTable,
}

impl SampleTables {
    pub fn from_paths(
        batch_filename: Option<&Utf8Path>,
        exclude_filename: Option<&Utf8Path>,
        sex_filename: Option<&Utf8Path>,
    ) -> SimpleResult<Self> {
        let batches = match batch_filename {
            Some(x) => BatchTable::from_path(x)?,
            None => BatchTable::default(),
        };
        let excluded = match exclude_filename {
            Some(x) => ExcludedSamples::from_path(x)?,
            None => ExcludedSamples::default(),
        };
        let sex = match sex_filename {
            Some(x) => SampleSexTable::from_path(x)?,
            None => SampleSexTable::default(),
        };
        Ok(Self {
            batches,
            excluded,
            sex,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_table() {
        let table = "# sample\tbatch\nS1\tcohort_a\nS2\tcohort_b\n\nS3\tcohort_a\n";
        let batches = BatchTable::from_reader(table.as_bytes()).unwrap();
        assert_eq!(batches.batch_label("S1"), "cohort_a");
        assert_eq!(batches.batch_label("S2"), "cohort_b");
        assert_eq!(batches.batch_label("S4"), UNBATCHED_LABEL);
        assert_eq!(batches.batch_count(), 2);
    }

    #[test]
    fn test_reserved_batch_label() {
        let table = "S1\tcohort_a\nS2\tNone\n";
        let result = BatchTable::from_reader(table.as_bytes());
        assert!(result.is_err());
        let msg = result.err().unwrap().to_string();
        assert!(msg.contains("reserved"), "{msg}");
    }

    #[test]
    fn test_batch_table_missing_column() {
        let table = "S1\tcohort_a\nS2\n";
        assert!(BatchTable::from_reader(table.as_bytes()).is_err());
    }

    #[test]
    fn test_excluded_samples() {
        let list = "S1\n\nS3\n";
        let excluded = ExcludedSamples::from_reader(list.as_bytes()).unwrap();
        assert_eq!(excluded.len(), 2);
        assert!(excluded.contains("S1"));
        assert!(!excluded.contains("S2"));
        assert!(excluded.contains("S3"));

        let list = "#S1\nS2\r\n";
        let excluded = ExcludedSamples::from_reader(list.as_bytes()).unwrap();
        assert_eq!(excluded.len(), 2);
        assert!(excluded.contains("#S1"));
        assert!(excluded.contains("S2"));
    }

    #[test]
    fn test_sample_sex_table() {
        let table = "S1\t1\nS2\t2\n";
        let sex = SampleSexTable::from_reader(table.as_bytes()).unwrap();
        assert!(sex.is_male("S1"));
        assert!(!sex.is_male("S2"));
        assert!(!sex.is_male("S3"));

        let table = "S1\tmale\n";
        assert!(SampleSexTable::from_reader(table.as_bytes()).is_err());
    }
}
