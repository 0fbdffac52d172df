use std::path::PathBuf;

use anyhow::Result;

use crate::aliases::AliasTable;

const DEFAULT_CSV_DIR: &str = "csv";
const DEFAULT_DATASET_PATH: &str = "concat_files/concat_shots.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Folder of per-match shot files.
    pub csv_dir: PathBuf,
    /// Accumulated dataset CSV.
    pub dataset_path: PathBuf,
    /// JSON alias table; the built-in table is used when unset.
    pub alias_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from(DEFAULT_CSV_DIR),
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            alias_path: None,
        }
    }
}

impl Config {
    /// Reads `.env.local`/`.env`, then `SHOTS_CSV_DIR`, `SHOTS_DATASET_PATH`
    /// and `SHOTS_ALIAS_PATH`.
    pub fn from_env() -> Self {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        Self {
            csv_dir: get("SHOTS_CSV_DIR").unwrap_or(defaults.csv_dir),
            dataset_path: get("SHOTS_DATASET_PATH").unwrap_or(defaults.dataset_path),
            alias_path: get("SHOTS_ALIAS_PATH"),
        }
    }

    /// `--csv-dir`, `--dataset` and `--aliases` override the environment.
    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(dir) = arg_value(args, "csv-dir") {
            self.csv_dir = PathBuf::from(dir);
        }
        if let Some(path) = arg_value(args, "dataset") {
            self.dataset_path = PathBuf::from(path);
        }
        if let Some(path) = arg_value(args, "aliases") {
            self.alias_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn alias_table(&self) -> Result<AliasTable> {
        match &self.alias_path {
            Some(path) => AliasTable::load(path),
            None => Ok(AliasTable::builtin().clone()),
        }
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

/// Value of `--name=value` or `--name value`; blank values are ignored.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let long = format!("--{name}");
    let prefixed = format!("{long}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefixed) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if *arg == long {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    let long = format!("--{name}");
    args.iter().any(|arg| *arg == long)
}
