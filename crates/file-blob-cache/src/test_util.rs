//! Helpers for tests that need entries of a given age

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Push a file's modification time `age` into the past
pub fn backdate(path: &Path, age: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}
