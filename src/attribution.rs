use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aliases::SideMapping;
use crate::normalize::normalize;

/// Which participant of the match took a shot. Persisted as `h`, `a` or `unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "h")]
    Home,
    #[serde(rename = "a")]
    Away,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Side {
    pub fn code(self) -> &'static str {
        match self {
            Side::Home => "h",
            Side::Away => "a",
            Side::Unknown => "unknown",
        }
    }

    /// Lenient parse of the `h_a` column; anything unrecognised is `Unknown`.
    pub fn from_code(raw: &str) -> Side {
        match raw.trim().to_ascii_lowercase().as_str() {
            "h" | "home" => Side::Home,
            "a" | "away" => Side::Away,
            _ => Side::Unknown,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub fn attribute(team_name: Option<&str>, mapping: &SideMapping) -> Side {
    let Some(name) = team_name else {
        return Side::Unknown;
    };
    mapping.get(&normalize(name)).unwrap_or(Side::Unknown)
}

#[derive(Debug, Clone, Default)]
pub struct AttributionReport {
    /// One entry per input, in input order.
    pub sides: Vec<Side>,
    /// Distinct raw team names that matched neither participant.
    pub unresolved: BTreeSet<String>,
    /// Inputs that carried no team name at all.
    pub missing: usize,
}

impl AttributionReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.missing == 0
    }
}

/// Attributes every name in a batch and collects the names the alias table
/// could not place, so it can be extended.
pub fn attribute_batch<'a, I>(team_names: I, mapping: &SideMapping) -> AttributionReport
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut report = AttributionReport::default();
    for name in team_names {
        let side = attribute(name, mapping);
        if side == Side::Unknown {
            match name {
                Some(raw) => {
                    report.unresolved.insert(raw.to_string());
                }
                None => report.missing += 1,
            }
        }
        report.sides.push(side);
    }

    if !report.unresolved.is_empty() {
        warn!(
            names = ?report.unresolved,
            "team names not matched to either side; extend the alias table"
        );
    }
    if report.missing > 0 {
        warn!(count = report.missing, "shots without a team name");
    }
    report
}
