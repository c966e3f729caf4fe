//! INI file parameter adapter.
//!
//! Parameters live in a `[parameters]` section; missing or malformed values
//! fall back to the caller-supplied default.

use configparser::ini::Ini;
use std::path::Path;

use crate::ports::param_port::ParameterPort;

const SECTION: &str = "parameters";

pub struct FileParameterAdapter {
    config: Ini,
}

impl FileParameterAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ParameterPort for FileParameterAdapter {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.config
            .getint(SECTION, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(SECTION, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}
