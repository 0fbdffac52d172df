use std::fmt;
use std::io::{Read, Write};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::attribution::Side;

/// FotMob shot maps use a 105 x 68 pitch.
pub const PITCH_LENGTH: f64 = 105.0;
pub const PITCH_WIDTH: f64 = 68.0;

pub const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "playerId",
    "playerName",
    "teamName",
    "x",
    "y",
    "expectedGoals",
    "eventType",
    "isOnTarget",
    "isOwnGoal",
    "matchRound",
];

/// Column order written by this crate.
pub const DATASET_COLUMNS: &[&str] = &[
    "id",
    "playerId",
    "playerName",
    "teamName",
    "x",
    "y",
    "expectedGoals",
    "eventType",
    "isOnTarget",
    "isOwnGoal",
    "matchRound",
    "h_a",
    "source_file",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Goal,
    Miss,
    AttemptSaved,
    Post,
    Other(String),
}

impl EventType {
    pub fn parse(raw: &str) -> EventType {
        match raw.trim() {
            "Goal" => EventType::Goal,
            "Miss" => EventType::Miss,
            "AttemptSaved" => EventType::AttemptSaved,
            "Post" => EventType::Post,
            other => EventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::Goal => "Goal",
            EventType::Miss => "Miss",
            EventType::AttemptSaved => "AttemptSaved",
            EventType::Post => "Post",
            EventType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotRecord {
    pub id: u64,
    pub player_id: u64,
    pub player_name: String,
    pub team_name: String,
    pub x: f64,
    pub y: f64,
    pub expected_goals: f64,
    pub event_type: EventType,
    pub is_on_target: bool,
    pub is_own_goal: bool,
    pub match_round: i64,
    pub side: Side,
    pub source_file: Option<String>,
}

impl ShotRecord {
    pub fn is_goal(&self) -> bool {
        self.event_type == EventType::Goal
    }

    /// Goals always count as on target, whatever the provider flag says.
    pub fn counts_on_target(&self) -> bool {
        self.is_on_target || self.is_goal()
    }
}

/// One CSV row before validation. Every field is text so a bad cell becomes a
/// row diagnostic instead of a reader error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShotRow {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "playerId", default)]
    pub player_id: String,
    #[serde(rename = "playerName", default)]
    pub player_name: String,
    #[serde(rename = "teamName", default)]
    pub team_name: String,
    #[serde(default)]
    pub x: String,
    #[serde(default)]
    pub y: String,
    #[serde(rename = "expectedGoals", default)]
    pub expected_goals: String,
    #[serde(rename = "eventType", default)]
    pub event_type: String,
    #[serde(rename = "isOnTarget", default)]
    pub is_on_target: String,
    #[serde(rename = "isOwnGoal", default)]
    pub is_own_goal: String,
    #[serde(rename = "matchRound", default)]
    pub match_round: String,
    #[serde(default)]
    pub h_a: String,
    #[serde(default)]
    pub source_file: String,
}

impl ShotRow {
    pub fn validate(&self) -> Result<ShotRecord> {
        let id = parse_integer(&self.id).context("id")?;
        let player_id = parse_integer(&self.player_id).context("playerId")?;
        let player_name = required_text(&self.player_name).context("playerName")?;
        let team_name = required_text(&self.team_name).context("teamName")?;

        let x = parse_float(&self.x).context("x")?;
        let y = parse_float(&self.y).context("y")?;
        if !(0.0..=PITCH_LENGTH).contains(&x) || !(0.0..=PITCH_WIDTH).contains(&y) {
            return Err(anyhow!("coordinates ({x}, {y}) outside pitch"));
        }

        let is_own_goal = parse_flag_or(&self.is_own_goal, false).context("isOwnGoal")?;
        // Own goals come without an xG value.
        let expected_goals = if self.expected_goals.trim().is_empty() && is_own_goal {
            0.0
        } else {
            parse_float(&self.expected_goals).context("expectedGoals")?
        };
        if expected_goals < 0.0 {
            return Err(anyhow!("negative expectedGoals {expected_goals}"));
        }

        let event_type = required_text(&self.event_type)
            .map(|raw| EventType::parse(&raw))
            .context("eventType")?;
        let is_on_target = parse_flag(&self.is_on_target).context("isOnTarget")?;
        let match_round = parse_integer(&self.match_round)
            .and_then(|v| i64::try_from(v).map_err(|_| anyhow!("round out of range")))
            .context("matchRound")?;

        let source_file = Some(self.source_file.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ShotRecord {
            id,
            player_id,
            player_name,
            team_name,
            x,
            y,
            expected_goals,
            event_type,
            is_on_target,
            is_own_goal,
            match_round,
            side: Side::from_code(&self.h_a),
            source_file,
        })
    }

    pub fn from_record(record: &ShotRecord) -> Self {
        Self {
            id: record.id.to_string(),
            player_id: record.player_id.to_string(),
            player_name: record.player_name.clone(),
            team_name: record.team_name.clone(),
            x: record.x.to_string(),
            y: record.y.to_string(),
            expected_goals: record.expected_goals.to_string(),
            event_type: record.event_type.to_string(),
            is_on_target: flag_text(record.is_on_target).to_string(),
            is_own_goal: flag_text(record.is_own_goal).to_string(),
            match_round: record.match_round.to_string(),
            h_a: record.side.code().to_string(),
            source_file: record.source_file.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedShots {
    pub records: Vec<ShotRecord>,
    /// Row-level problems; those rows are not in `records`.
    pub errors: Vec<String>,
}

/// Reads a shot CSV. Fails only when the file itself is unusable (unreadable
/// header, required column missing); bad rows are dropped and reported.
pub fn read_shots<R: Read>(reader: R) -> Result<ParsedShots> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("read csv header")?.clone();
    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(anyhow!("missing columns: {}", missing.join(", ")));
    }

    let mut out = ParsedShots::default();
    for (idx, row) in rdr.deserialize::<ShotRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                out.errors.push(format!("line {line}: {err}"));
                continue;
            }
        };
        match row.validate() {
            Ok(record) => out.records.push(record),
            Err(err) => out.errors.push(format!("line {line}: {err:#}")),
        }
    }
    Ok(out)
}

pub fn write_shots<W: Write>(writer: W, records: &[ShotRecord], with_header: bool) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    if with_header {
        wtr.write_record(DATASET_COLUMNS).context("write csv header")?;
    }
    for record in records {
        wtr.serialize(ShotRow::from_record(record))
            .with_context(|| format!("write shot {}", record.id))?;
    }
    wtr.flush().context("flush csv")?;
    Ok(())
}

fn required_text(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("missing value"));
    }
    Ok(trimmed.to_string())
}

// pandas writes integer columns holding NaN as floats ("12.0").
fn parse_integer(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return Ok(v);
    }
    let v = parse_float(trimmed)?;
    if v < 0.0 || v.fract() != 0.0 || v >= u64::MAX as f64 {
        return Err(anyhow!("not a non-negative integer: {trimmed:?}"));
    }
    Ok(v as u64)
}

fn parse_float(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let v = trimmed
        .parse::<f64>()
        .map_err(|_| anyhow!("not a number: {trimmed:?}"))?;
    if !v.is_finite() {
        return Err(anyhow!("non-finite number: {trimmed:?}"));
    }
    Ok(v)
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" => Ok(true),
        "false" | "0" | "0.0" | "no" => Ok(false),
        other => Err(anyhow!("not a boolean: {other:?}")),
    }
}

fn parse_flag_or(raw: &str, default: bool) -> Result<bool> {
    if raw.trim().is_empty() {
        return Ok(default);
    }
    parse_flag(raw)
}

// Same spelling as the original pandas exports.
fn flag_text(v: bool) -> &'static str {
    if v { "True" } else { "False" }
}
