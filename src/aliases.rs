use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::attribution::Side;
use crate::normalize::normalize;

/// Official team name -> alternate spellings seen in provider data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

static DEFAULT_TABLE: Lazy<AliasTable> = Lazy::new(|| {
    AliasTable::from_pairs(&[
        ("Atlético Nacional", &["Atl. Nacional", "Atletico Nacional Medellin"]),
        ("Bolívar", &["Club Bolivar", "Bolivar La Paz"]),
        ("Botafogo", &["Botafogo RJ", "Botafogo FR"]),
        ("Cerro Porteño", &["Club Cerro Porteno"]),
        ("Colo Colo", &["CSD Colo-Colo"]),
        ("Estudiantes de La Plata", &["Estudiantes", "Estudiantes LP"]),
        ("Flamengo", &["CR Flamengo", "Flamengo RJ"]),
        ("Fortaleza", &["Fortaleza EC"]),
        ("Independiente del Valle", &["IDV", "Ind. del Valle"]),
        ("Internacional", &["SC Internacional", "Inter RS"]),
        ("LDU Quito", &["Liga de Quito", "LDU"]),
        ("Nacional", &["Club Nacional", "Nacional Montevideo"]),
        ("Palmeiras", &["SE Palmeiras"]),
        ("Peñarol", &["CA Penarol"]),
        ("Racing Club", &["Racing"]),
        ("River Plate", &["CA River Plate", "River"]),
        ("São Paulo", &["Sao Paulo FC"]),
        ("Universitario", &["Universitario de Deportes"]),
        ("Vélez Sarsfield", &["Velez", "CA Velez Sarsfield"]),
    ])
});

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in table for the current competition. Initialised on first use.
    pub fn builtin() -> &'static AliasTable {
        &DEFAULT_TABLE
    }

    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        let mut table = Self::new();
        for (official, aliases) in pairs {
            table.insert(official, aliases.iter().copied());
        }
        table
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::new());
        }
        serde_json::from_str(trimmed).context("invalid alias table json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read alias table {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parse alias table {}", path.display()))
    }

    pub fn insert<'a>(&mut self, official: &str, aliases: impl IntoIterator<Item = &'a str>) {
        let slot = self.entries.entry(official.to_string()).or_default();
        for alias in aliases {
            if !slot.iter().any(|existing| existing == alias) {
                slot.push(alias.to_string());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(official, aliases)| (official.as_str(), aliases.as_slice()))
    }
}

/// A normalised name that more than one side tried to claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCollision {
    pub key: String,
    pub kept: Side,
    pub rejected: Side,
}

/// Normalised team spelling -> side, for one match.
#[derive(Debug, Clone, Default)]
pub struct SideMapping {
    sides: HashMap<String, Side>,
    collisions: Vec<AliasCollision>,
}

impl SideMapping {
    /// Looks up an already normalised key.
    pub fn get(&self, key: &str) -> Option<Side> {
        self.sides.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.sides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sides.is_empty()
    }

    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    // First claim wins; later conflicting claims are kept as collisions.
    fn claim(&mut self, key: String, side: Side) {
        if key.is_empty() {
            return;
        }
        match self.sides.get(&key) {
            Some(existing) if *existing == side => {}
            Some(existing) => self.collisions.push(AliasCollision {
                key,
                kept: *existing,
                rejected: side,
            }),
            None => {
                self.sides.insert(key, side);
            }
        }
    }
}

/// Builds the spelling -> side lookup for a match between `home_team` and
/// `away_team`.
///
/// Home is claimed before away, so a spelling shared by both participants
/// resolves to home. Such collisions point at bad alias data and are logged
/// and kept on the mapping for the caller to report.
pub fn build_side_mapping(home_team: &str, away_team: &str, table: &AliasTable) -> SideMapping {
    let mut mapping = SideMapping::default();

    for (side, team) in [(Side::Home, home_team), (Side::Away, away_team)] {
        let key = normalize(team);
        mapping.claim(key.clone(), side);
        if key.is_empty() {
            continue;
        }
        for (official, aliases) in table.iter() {
            if normalize(official) != key {
                continue;
            }
            for alias in aliases {
                mapping.claim(normalize(alias), side);
            }
        }
    }

    for collision in &mapping.collisions {
        warn!(
            key = %collision.key,
            home = home_team,
            away = away_team,
            "alias claimed by both sides, keeping {:?}",
            collision.kept
        );
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_both_participants_without_aliases() {
        let mapping = build_side_mapping("Club A", "Club B", &AliasTable::new());
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("club a"), Some(Side::Home));
        assert_eq!(mapping.get("club b"), Some(Side::Away));
        assert!(mapping.collisions().is_empty());
    }

    #[test]
    fn aliases_of_participants_only() {
        let table = AliasTable::from_pairs(&[
            ("Club A", &["CA", "Club A FC"]),
            ("Club B", &["Los B"]),
            ("Club Z", &["Zeta"]),
        ]);
        let mapping = build_side_mapping("Club A", "Club B", &table);
        assert_eq!(mapping.get("ca"), Some(Side::Home));
        assert_eq!(mapping.get("club a fc"), Some(Side::Home));
        assert_eq!(mapping.get("los b"), Some(Side::Away));
        assert_eq!(mapping.get("zeta"), None);
    }

    #[test]
    fn table_keys_match_after_normalisation() {
        let table = AliasTable::from_pairs(&[("PEÑAROL", &["CA Penarol"])]);
        let mapping = build_side_mapping("Nacional", "Peñarol", &table);
        assert_eq!(mapping.get("ca penarol"), Some(Side::Away));
    }

    #[test]
    fn shared_alias_resolves_home_and_is_reported() {
        let table = AliasTable::from_pairs(&[("Club A", &["Club"]), ("Club B", &["Club"])]);
        let mapping = build_side_mapping("Club A", "Club B", &table);
        assert_eq!(mapping.get("club"), Some(Side::Home));
        assert_eq!(
            mapping.collisions(),
            &[AliasCollision {
                key: "club".to_string(),
                kept: Side::Home,
                rejected: Side::Away,
            }]
        );
    }

    #[test]
    fn parses_json_table() {
        let table = AliasTable::from_json_str(r#"{"Club A": ["CA", "Club A FC"]}"#)
            .expect("table should parse");
        assert_eq!(table.len(), 1);
        let (official, aliases) = table.iter().next().expect("one entry");
        assert_eq!(official, "Club A");
        assert_eq!(aliases, ["CA".to_string(), "Club A FC".to_string()].as_slice());
        assert!(AliasTable::from_json_str("null").expect("null is empty").is_empty());
    }

    #[test]
    fn builtin_table_resolves_known_spelling() {
        let mapping = build_side_mapping("River Plate", "São Paulo", AliasTable::builtin());
        assert_eq!(mapping.get("ca river plate"), Some(Side::Home));
        assert_eq!(mapping.get("sao paulo fc"), Some(Side::Away));
    }
}
