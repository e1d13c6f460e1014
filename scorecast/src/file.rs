//! JSON export helpers.

use std::fs::File;
use std::io::{BufWriter, Error};
use std::path::Path;

use serde::Serialize;
use serde_json::to_writer_pretty;

/// JSON-encodes the `value` in pretty-printed form and writes it to a given `path`.
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<(), Error> {
    let file = File::create(path)?;
    Ok(to_writer_pretty(BufWriter::new(file), value)?)
}

pub trait WriteJsonFile<S: Serialize> {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), Error>;
}

impl<S: Serialize> WriteJsonFile<S> for S {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::env;

    #[test]
    fn write_then_read() {
        let path = env::temp_dir().join(format!("scorecast-file-{}.json", std::process::id()));
        let map = BTreeMap::from([("intercept".to_string(), 0.25), ("home_advantage".to_string(), 0.1)]);
        map.write_json_file(&path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        let read: BTreeMap<String, f64> = serde_json::from_str(&json).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(map, read);
    }
}
