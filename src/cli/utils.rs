use std::path::Path;

use simple_error::{SimpleResult, bail};

fn check_existing_file(filename: &str, label: &str) -> SimpleResult<()> {
    let path = Path::new(filename);
    if !path.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !path.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("Must specify {label} file");
    }
    check_existing_file(filename, label)
}

/// Check an optional input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_optional_filename(filename_opt: Option<&String>, label: &str) -> SimpleResult<()> {
    match filename_opt {
        Some(filename) => check_existing_file(filename, label),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_filenames() {
        assert!(check_required_filename("", "input VCF").is_err());
        assert!(check_required_filename("/nonexistent/gtrefine/input.vcf", "input VCF").is_err());
        assert!(check_optional_filename(None, "batch").is_ok());

        let dir = std::env::temp_dir();
        let dirname = dir.to_str().unwrap().to_string();
        let msg = check_optional_filename(Some(&dirname), "batch")
            .err()
            .unwrap()
            .to_string();
        assert!(msg.contains("not appear to be a file"), "{msg}");
    }
}
