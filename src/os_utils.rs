//! Utilities pertaining to filesystem and other os-level settings
//!

use camino::Utf8Path;

/// Create a novel directory path if it does not exist already
///
/// If the directory already exists no operations are performed. Failure to create the directory
/// ends the program, because no logger can be setup before the output directory exists.
///
/// * `label` - used to describe the error directory in an error message
///
pub fn create_dir_all(dir: &Utf8Path, label: &str) {
    if dir.is_dir() {
        return;
    }
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Can't create new {label} directory at '{dir}': {e}");
        std::process::exit(exitcode::CANTCREAT);
    }
}
