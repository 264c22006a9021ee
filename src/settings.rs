use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::outline::DEFAULT_EXAM_CODE;

/// Run settings: defaults, then `OUTLINE_*` environment variables, then CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub output_dir: PathBuf,
    pub exam_code: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix("OUTLINE"))
    }

    fn from_env(env: Environment) -> Result<Self> {
        Config::builder()
            .set_default("database_path", "data/outline.sqlite")?
            .set_default("output_dir", ".")?
            .set_default("exam_code", DEFAULT_EXAM_CODE)?
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize)
            .context("Failed to load settings")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix("OUTLINE").source(Some(map))
    }

    #[test]
    fn defaults() {
        let s = Settings::from_env(env(&[])).unwrap();
        assert_eq!(s.database_path, PathBuf::from("data/outline.sqlite"));
        assert_eq!(s.output_dir, PathBuf::from("."));
        assert_eq!(s.exam_code, "AI-102");
    }

    #[test]
    fn environment_overrides() {
        let s = Settings::from_env(env(&[("OUTLINE_EXAM_CODE", "AZ-204"), ("OUTLINE_OUTPUT_DIR", "out")])).unwrap();
        assert_eq!(s.exam_code, "AZ-204");
        assert_eq!(s.output_dir, PathBuf::from("out"));
    }
}
