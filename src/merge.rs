use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::dataset::{AccumulatedDataset, load_dataset};
use crate::shots::{DATASET_COLUMNS, ParsedShots, ShotRecord, read_shots, write_shots};

#[derive(Debug, Clone)]
enum CandidateSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// One per-match shot file offered for ingestion, identified by file name.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    source: CandidateSource,
}

impl CandidateFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no usable file name in {}", path.display()))?;
        Ok(Self {
            name,
            source: CandidateSource::Path(path),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: CandidateSource::Bytes(bytes.into()),
        }
    }

    fn parse(&self) -> Result<ParsedShots> {
        match &self.source {
            CandidateSource::Path(path) => {
                let file =
                    File::open(path).with_context(|| format!("open {}", path.display()))?;
                read_shots(file)
            }
            CandidateSource::Bytes(bytes) => read_shots(bytes.as_slice()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub dataset: AccumulatedDataset,
    /// Files whose records were appended, in merge order.
    pub merged_files: Vec<String>,
    pub already_merged: Vec<String>,
    /// Parsed cleanly but had no rows; not recorded, so retried next run.
    pub empty_files: Vec<String>,
    pub errors: Vec<String>,
    pub merged_at: DateTime<Utc>,
    first_new: usize,
}

impl MergeOutcome {
    pub fn nothing_to_do(&self) -> bool {
        self.merged_files.is_empty()
    }

    pub fn new_records(&self) -> &[ShotRecord] {
        &self.dataset.records()[self.first_new..]
    }
}

/// Appends every not-yet-merged candidate's shots to `existing`.
///
/// Each file is parsed in full before any of it is committed; a file that
/// cannot be read is reported and left out without affecting the others.
pub fn merge(
    existing: &AccumulatedDataset,
    candidates: &[CandidateFile],
    already_merged: &BTreeSet<String>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        dataset: existing.clone(),
        merged_files: Vec::new(),
        already_merged: Vec::new(),
        empty_files: Vec::new(),
        errors: Vec::new(),
        merged_at: Utc::now(),
        first_new: existing.len(),
    };

    let mut seen = already_merged.clone();
    let mut pending = Vec::new();
    for candidate in candidates {
        if seen.insert(candidate.name.clone()) {
            pending.push(candidate);
        } else {
            outcome.already_merged.push(candidate.name.clone());
        }
    }

    let parsed = pending
        .par_iter()
        .map(|candidate| (*candidate, candidate.parse()))
        .collect::<Vec<_>>();

    let mut fresh = Vec::new();
    for (candidate, result) in parsed {
        let parsed = match result {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(file = %candidate.name, "skipping unreadable shot file: {err:#}");
                outcome.errors.push(format!("{}: {err:#}", candidate.name));
                continue;
            }
        };
        for row_err in &parsed.errors {
            outcome.errors.push(format!("{}: {row_err}", candidate.name));
        }
        if parsed.records.is_empty() {
            debug!(file = %candidate.name, "no shots in file, leaving for a later run");
            outcome.empty_files.push(candidate.name.clone());
            continue;
        }

        info!(file = %candidate.name, shots = parsed.records.len(), "adding new file");
        fresh.extend(parsed.records.into_iter().map(|mut record| {
            record.source_file = Some(candidate.name.clone());
            record
        }));
        outcome.merged_files.push(candidate.name.clone());
    }

    if !fresh.is_empty() {
        outcome.dataset = existing.appended(fresh);
    }
    outcome
}

/// `*.csv` files directly inside `folder`, by name. `exclude` is skipped.
pub fn list_candidate_files(folder: &Path, exclude: Option<&Path>) -> Result<Vec<CandidateFile>> {
    let entries =
        fs::read_dir(folder).with_context(|| format!("list folder {}", folder.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("read entry in {}", folder.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv || exclude.is_some_and(|skip| same_file(skip, &path)) {
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    paths.into_iter().map(CandidateFile::from_path).collect()
}

/// Merges the new per-match files of `folder` into the accumulated CSV at
/// `output`, creating it (with header) on first use.
pub fn merge_folder_into(folder: &Path, output: &Path) -> Result<MergeOutcome> {
    let loaded = load_dataset(output)?;
    for err in loaded.errors.iter().take(8) {
        warn!(path = %output.display(), "unusable row in dataset: {err}");
    }
    let already = loaded.dataset.merged_files();
    let candidates = list_candidate_files(folder, Some(output))?;
    let outcome = merge(&loaded.dataset, &candidates, &already);

    if outcome.nothing_to_do() {
        info!("no new files to append");
        return Ok(outcome);
    }
    append_shots(output, outcome.new_records())?;
    info!(
        path = %output.display(),
        files = outcome.merged_files.len(),
        shots = outcome.new_records().len(),
        "appended new data"
    );
    Ok(outcome)
}

/// Appends rows to the dataset file without touching what is already there.
/// The result is written next to the target and renamed over it, so a failed
/// write leaves the previous file intact.
pub fn append_shots(output: &Path, records: &[ShotRecord]) -> Result<()> {
    let mut bytes = if output.exists() {
        fs::read(output).with_context(|| format!("read dataset {}", output.display()))?
    } else {
        Vec::new()
    };

    let fresh_file = bytes.iter().all(u8::is_ascii_whitespace);
    if fresh_file {
        bytes.clear();
    } else {
        check_header(&bytes).with_context(|| format!("append to {}", output.display()))?;
        if bytes.last() != Some(&b'\n') {
            bytes.push(b'\n');
        }
    }
    write_shots(&mut bytes, records, fresh_file)?;

    if let Some(dir) = output.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = output.with_extension("csv.tmp");
    fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, output).with_context(|| format!("swap {}", output.display()))?;
    Ok(())
}

fn check_header(bytes: &[u8]) -> Result<()> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = rdr.headers().context("read existing header")?;
    let found = headers.iter().map(str::trim).collect::<Vec<_>>();
    if found != DATASET_COLUMNS {
        return Err(anyhow!(
            "existing header [{}] does not match [{}]",
            found.join(","),
            DATASET_COLUMNS.join(",")
        ));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
