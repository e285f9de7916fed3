//! Text-level VCF record and header handling
//!
//! Records are kept as their raw tab-separated fields so that any record not modified by refinement
//! can be written back out byte-identical to the input line.
//!

use simple_error::{SimpleResult, bail};

use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};

pub const VCF_MISSING_VALUE: &str = ".";

/// Index of the first sample column in a VCF record
const FIRST_SAMPLE_COLUMN: usize = 9;

const CHROM_COLUMN: usize = 0;
const POS_COLUMN: usize = 1;
const ID_COLUMN: usize = 2;
const INFO_COLUMN: usize = 7;
const FORMAT_COLUMN: usize = 8;

/// Header definitions added for refinement output, each given as (header key, ID, full line)
const REFINEMENT_HEADER_DEFINITIONS: [(&str, &str, &str); 4] = [
    (
        "INFO",
        "MEDGQR",
        r#"##INFO=<ID=MEDGQR,Number=1,Type=Float,Description="Median quality for refined GT">"#,
    ),
    (
        "INFO",
        "Q10GQR",
        r#"##INFO=<ID=Q10GQR,Number=1,Type=Float,Description="Q10 quality for refined GT">"#,
    ),
    (
        "FORMAT",
        "GQO",
        r#"##FORMAT=<ID=GQO,Number=1,Type=Integer,Description="Quality of original genotype">"#,
    ),
    (
        "FORMAT",
        "GTO",
        r#"##FORMAT=<ID=GTO,Number=1,Type=String,Description="Genotype before refinement">"#,
    ),
];

/// Get the (key, ID) pair from a structured header line such as `##INFO=<ID=AF,...>`
///
fn get_structured_header_id(line: &str) -> Option<(&str, &str)> {
    let line = line.strip_prefix("##")?;
    let (key, value) = line.split_once('=')?;
    let value = value.strip_prefix('<')?;
    let id = value.strip_prefix("ID=")?;
    let id = id.split([',', '>']).next()?;
    Some((key, id))
}

/// Tracks input header content and adds refinement annotations before the column header line
///
#[derive(Default)]
pub struct VcfHeaderEditor {
    defined_ids: Vec<(String, String)>,
    sample_names: Vec<String>,
}

impl VcfHeaderEditor {
    /// Register one '##' meta line from the input header
    pub fn add_meta_line(&mut self, line: &str) {
        if let Some((key, id)) = get_structured_header_id(line) {
            self.defined_ids.push((key.to_string(), id.to_string()));
        }
    }

    fn is_defined(&self, key: &str, id: &str) -> bool {
        self.defined_ids.iter().any(|(k, i)| k == key && i == id)
    }

    /// Get all header lines to insert ahead of the column header line, each including a trailing
    /// newline
    ///
    pub fn get_added_header_lines(&self) -> String {
        let mut lines = String::new();
        for (key, id, line) in REFINEMENT_HEADER_DEFINITIONS.iter() {
            if !self.is_defined(key, id) {
                lines.push_str(line);
                lines.push('\n');
            }
        }
        let cmdline = std::env::args().collect::<Vec<_>>().join(" ");
        lines.push_str(&format!(
            "##{PROGRAM_NAME}_version=\"{PROGRAM_VERSION}\"\n##{PROGRAM_NAME}_cmdline=\"{cmdline}\"\n"
        ));
        lines
    }

    /// Parse sample names from the '#CHROM' column header line
    pub fn set_column_header_line(&mut self, line: &str) -> SimpleResult<()> {
        let fields = line.trim_end_matches(['\n', '\r']).split('\t').collect::<Vec<_>>();
        if fields.first() != Some(&"#CHROM") {
            bail!("Unexpected VCF column header line: '{}'", line.trim_end());
        }
        self.sample_names = fields
            .iter()
            .skip(FIRST_SAMPLE_COLUMN)
            .map(|x| x.to_string())
            .collect();
        Ok(())
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }
}

/// Get the INFO column of a data line without parsing the rest of the record
///
/// Returns None if the line is too short to have an INFO column.
///
pub fn get_info_column(line: &str) -> Option<&str> {
    line.trim_end_matches(['\n', '\r'])
        .split('\t')
        .nth(INFO_COLUMN)
}

/// Get the value of a key from INFO column text
///
/// Flag keys return an empty string.
///
pub fn get_info_value<'a>(info: &'a str, key: &str) -> Option<&'a str> {
    info.split(';').find_map(|entry| match entry.split_once('=') {
        Some((k, v)) if k == key => Some(v),
        None if entry == key => Some(""),
        _ => None,
    })
}

/// Per-sample FORMAT values of one record
///
/// Sample columns may omit trailing fields. Reads of an omitted field return None, and writes pad
/// the sample column with missing values as needed.
///
#[derive(Clone, Debug, PartialEq)]
pub struct SampleFormatTable {
    keys: Vec<String>,
    samples: Vec<Vec<String>>,
}

impl SampleFormatTable {
    fn from_fields(format: &str, sample_fields: &[String]) -> Self {
        let keys = if format == VCF_MISSING_VALUE || format.is_empty() {
            Vec::new()
        } else {
            format.split(':').map(|x| x.to_string()).collect()
        };
        let samples = sample_fields
            .iter()
            .map(|x| x.split(':').map(|y| y.to_string()).collect())
            .collect();
        Self { keys, samples }
    }

    fn key_index(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|x| x == key)
    }

    pub fn get(&self, sample_index: usize, key: &str) -> Option<&str> {
        let key_index = self.key_index(key)?;
        self.samples
            .get(sample_index)?
            .get(key_index)
            .map(|x| x.as_str())
    }

    /// Set the value for one sample, adding the key to FORMAT if it is not already present
    pub fn set(&mut self, sample_index: usize, key: &str, value: String) {
        let key_index = match self.key_index(key) {
            Some(x) => x,
            None => {
                self.keys.push(key.to_string());
                self.keys.len() - 1
            }
        };
        let sample = &mut self.samples[sample_index];
        if sample.len() <= key_index {
            sample.resize(key_index + 1, VCF_MISSING_VALUE.to_string());
        }
        sample[key_index] = value;
    }

    fn format_field(&self) -> String {
        if self.keys.is_empty() {
            VCF_MISSING_VALUE.to_string()
        } else {
            self.keys.join(":")
        }
    }

    fn sample_fields(&self) -> impl Iterator<Item = String> + '_ {
        self.samples.iter().map(|x| x.join(":"))
    }
}

/// One VCF data record as tab-separated text fields
#[derive(Clone, Debug)]
pub struct VcfRecord {
    fields: Vec<String>,
    format_table: SampleFormatTable,
}

impl VcfRecord {
    /// Parse a data line, with or without its trailing newline
    ///
    /// # Arguments
    /// * `sample_count` - Expected sample column count, from the column header line
    ///
    pub fn from_line(line: &str, sample_count: usize) -> SimpleResult<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut fields = line.split('\t').map(|x| x.to_string()).collect::<Vec<_>>();
        let expected_column_count = if sample_count > 0 {
            FIRST_SAMPLE_COLUMN + sample_count
        } else {
            INFO_COLUMN + 1
        };
        if fields.len() < expected_column_count {
            bail!(
                "VCF record has {} columns where {} are expected: '{}'",
                fields.len(),
                expected_column_count,
                line
            );
        }

        let format_table = if fields.len() > FORMAT_COLUMN {
            let sample_fields = fields.split_off(FIRST_SAMPLE_COLUMN.min(fields.len()));
            SampleFormatTable::from_fields(&fields[FORMAT_COLUMN], &sample_fields)
        } else {
            SampleFormatTable::from_fields(VCF_MISSING_VALUE, &[])
        };
        Ok(Self {
            fields,
            format_table,
        })
    }

    pub fn chrom(&self) -> &str {
        &self.fields[CHROM_COLUMN]
    }

    /// Record ID, or 'chrom:pos' if the ID column is missing
    pub fn variant_id(&self) -> String {
        let id = &self.fields[ID_COLUMN];
        if id == VCF_MISSING_VALUE {
            format!("{}:{}", self.chrom(), self.fields[POS_COLUMN])
        } else {
            id.clone()
        }
    }

    /// Set the value of an INFO key, replacing any existing value in place
    pub fn set_info_value(&mut self, key: &str, value: &str) {
        let info = &self.fields[INFO_COLUMN];
        let new_entry = format!("{key}={value}");
        let mut found = false;
        let mut entries = if info == VCF_MISSING_VALUE || info.is_empty() {
            Vec::new()
        } else {
            info.split(';')
                .map(|entry| {
                    let entry_key = entry.split_once('=').map_or(entry, |(k, _)| k);
                    if entry_key == key {
                        found = true;
                        new_entry.clone()
                    } else {
                        entry.to_string()
                    }
                })
                .collect::<Vec<_>>()
        };
        if !found {
            entries.push(new_entry);
        }
        self.fields[INFO_COLUMN] = entries.join(";");
    }

    pub fn format_table(&self) -> &SampleFormatTable {
        &self.format_table
    }

    pub fn format_table_mut(&mut self) -> &mut SampleFormatTable {
        &mut self.format_table
    }

    /// Full record line including the trailing newline
    pub fn to_line(&self) -> String {
        let mut line = self.fields[..self.fields.len().min(FORMAT_COLUMN)].join("\t");
        if self.fields.len() > FORMAT_COLUMN {
            line.push('\t');
            line.push_str(&self.format_table.format_field());
            for sample_field in self.format_table.sample_fields() {
                line.push('\t');
                line.push_str(&sample_field);
            }
        }
        line.push('\n');
        line
    }
}
