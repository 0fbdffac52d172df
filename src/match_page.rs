use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{info, warn};

use crate::aliases::{AliasCollision, AliasTable, build_side_mapping};
use crate::attribution::{AttributionReport, attribute_batch};
use crate::shots::{EventType, PITCH_LENGTH, PITCH_WIDTH, ShotRecord, write_shots};

const NEXT_DATA_SELECTOR: &str = "script#__NEXT_DATA__";

/// Shots of one match as read from its FotMob page.
#[derive(Debug, Clone)]
pub struct MatchShots {
    pub home_team: String,
    pub away_team: String,
    pub match_round: Option<i64>,
    pub records: Vec<ShotRecord>,
    pub attribution: AttributionReport,
    pub collisions: Vec<AliasCollision>,
    /// Shots left out, with the reason.
    pub errors: Vec<String>,
}

/// `https://www.fotmob.com/matches/flamengo-vs-palmeiras/2kx3#4567` -> `flamengo-vs-palmeiras`.
pub fn match_slug(url: &str) -> Option<String> {
    let no_fragment = url.split(['#', '?']).next().unwrap_or_default();
    let path = match no_fragment.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or_default(),
        None => no_fragment,
    };
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    parts.find(|p| *p == "matches")?;
    parts.next().map(str::to_string)
}

/// The JSON blob of the page's `<script id="__NEXT_DATA__">` tag.
pub fn extract_next_data(html: &str) -> Result<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(NEXT_DATA_SELECTOR)
        .map_err(|e| anyhow!("bad selector {NEXT_DATA_SELECTOR}: {e}"))?;
    let script = document
        .select(&selector)
        .next()
        .ok_or_else(|| anyhow!("no __NEXT_DATA__ script in page"))?;
    let body = script.text().collect::<String>();
    serde_json::from_str(body.trim()).context("invalid __NEXT_DATA__ json")
}

pub fn parse_match_page(html: &str, aliases: &AliasTable) -> Result<MatchShots> {
    let root = extract_next_data(html)?;
    parse_next_data(&root, aliases)
}

pub fn parse_next_data(root: &Value, aliases: &AliasTable) -> Result<MatchShots> {
    let page = root
        .get("props")
        .and_then(|v| v.get("pageProps"))
        .ok_or_else(|| anyhow!("missing props.pageProps"))?;
    let general = page.get("general").unwrap_or(&Value::Null);
    let content = page
        .get("content")
        .ok_or_else(|| anyhow!("missing pageProps.content"))?;

    let home = parse_team_ref(general.get("homeTeam")).context("missing general.homeTeam")?;
    let away = parse_team_ref(general.get("awayTeam")).context("missing general.awayTeam")?;
    let match_round = general.get("matchRound").and_then(parse_round);

    let player_teams = parse_player_teams(content.get("playerStats"));
    let raw_shots = content
        .get("shotmap")
        .and_then(|v| v.get("shots"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut errors = Vec::new();
    let mut parsed = Vec::new();
    for (idx, raw) in raw_shots.iter().enumerate() {
        match parse_shot(raw) {
            Some(shot) => parsed.push(shot),
            None => errors.push(format!("shot #{idx}: missing or invalid fields")),
        }
    }

    // playerStats is authoritative; the shot's teamId covers players missing there.
    let team_names = parsed
        .iter()
        .map(|shot| {
            player_teams
                .get(&shot.player_id)
                .cloned()
                .or_else(|| match shot.team_id {
                    Some(id) if Some(id) == home.id => Some(home.name.clone()),
                    Some(id) if Some(id) == away.id => Some(away.name.clone()),
                    _ => None,
                })
        })
        .collect::<Vec<_>>();

    let mapping = build_side_mapping(&home.name, &away.name, aliases);
    let attribution = attribute_batch(team_names.iter().map(Option::as_deref), &mapping);

    let mut records = Vec::with_capacity(parsed.len());
    for ((shot, team), side) in parsed.into_iter().zip(team_names).zip(&attribution.sides) {
        let Some(team_name) = team else {
            errors.push(format!("shot {}: no team for player {}", shot.id, shot.player_id));
            continue;
        };
        records.push(ShotRecord {
            id: shot.id,
            player_id: shot.player_id,
            player_name: shot.player_name,
            team_name,
            x: shot.x,
            y: shot.y,
            expected_goals: shot.expected_goals,
            event_type: shot.event_type,
            is_on_target: shot.is_on_target,
            is_own_goal: shot.is_own_goal,
            match_round: match_round.unwrap_or_default(),
            side: *side,
            source_file: None,
        });
    }

    if match_round.is_none() {
        warn!(home = %home.name, away = %away.name, "match round missing from page");
    }

    Ok(MatchShots {
        home_team: home.name,
        away_team: away.name,
        match_round,
        records,
        collisions: mapping.collisions().to_vec(),
        attribution,
        errors,
    })
}

/// Writes `<dir>/<slug>.csv` and returns its path.
pub fn save_match_csv(dir: &Path, slug: &str, records: &[ShotRecord]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let file_name = if slug.ends_with(".csv") {
        slug.to_string()
    } else {
        format!("{slug}.csv")
    };
    let path = dir.join(file_name);
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    write_shots(file, records, true)?;
    info!(path = %path.display(), shots = records.len(), "match shots saved");
    Ok(path)
}

struct TeamRef {
    id: Option<u64>,
    name: String,
}

struct PageShot {
    id: u64,
    player_id: u64,
    player_name: String,
    team_id: Option<u64>,
    x: f64,
    y: f64,
    expected_goals: f64,
    event_type: EventType,
    is_on_target: bool,
    is_own_goal: bool,
}

fn parse_team_ref(v: Option<&Value>) -> Option<TeamRef> {
    let v = v?;
    let name = v.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(TeamRef {
        id: v.get("id").and_then(as_u64_lenient),
        name: name.to_string(),
    })
}

fn parse_player_teams(v: Option<&Value>) -> HashMap<u64, String> {
    let mut out = HashMap::new();
    let Some(obj) = v.and_then(Value::as_object) else {
        return out;
    };
    for (key, player) in obj {
        let Ok(id) = key.parse::<u64>() else { continue };
        let Some(team) = player.get("teamName").and_then(Value::as_str) else {
            continue;
        };
        out.insert(id, team.to_string());
    }
    out
}

fn parse_shot(v: &Value) -> Option<PageShot> {
    let is_own_goal = v.get("isOwnGoal").and_then(Value::as_bool).unwrap_or(false);
    let expected_goals = match v.get("expectedGoals").and_then(Value::as_f64) {
        Some(xg) if xg.is_finite() && xg >= 0.0 => xg,
        None if is_own_goal => 0.0,
        _ => return None,
    };
    let player_name = v
        .get("playerName")
        .or_else(|| v.get("fullName"))
        .and_then(Value::as_str)?
        .to_string();
    let x = v.get("x")?.as_f64()?;
    let y = v.get("y")?.as_f64()?;
    if !(0.0..=PITCH_LENGTH).contains(&x) || !(0.0..=PITCH_WIDTH).contains(&y) {
        return None;
    }
    Some(PageShot {
        id: v.get("id").and_then(as_u64_lenient)?,
        player_id: v.get("playerId").and_then(as_u64_lenient)?,
        player_name,
        team_id: v.get("teamId").and_then(as_u64_lenient),
        x,
        y,
        expected_goals,
        event_type: EventType::parse(v.get("eventType")?.as_str()?),
        is_on_target: v.get("isOnTarget").and_then(Value::as_bool).unwrap_or(false),
        is_own_goal,
    })
}

fn as_u64_lenient(v: &Value) -> Option<u64> {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

// FotMob sends "3", 3 or "Round 3".
fn parse_round(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    let s = v.as_str()?;
    let digits = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect::<String>();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_match_url() {
        assert_eq!(
            match_slug("https://www.fotmob.com/matches/flamengo-vs-palmeiras/2kx3#4567").as_deref(),
            Some("flamengo-vs-palmeiras")
        );
        assert_eq!(
            match_slug("https://www.fotmob.com/es/matches/river-vs-boca?x=1").as_deref(),
            Some("river-vs-boca")
        );
        assert_eq!(match_slug("https://www.fotmob.com/leagues/45"), None);
        assert_eq!(match_slug("https://www.fotmob.com/matches/"), None);
    }

    #[test]
    fn round_variants() {
        assert_eq!(parse_round(&serde_json::json!(3)), Some(3));
        assert_eq!(parse_round(&serde_json::json!("4")), Some(4));
        assert_eq!(parse_round(&serde_json::json!("Round 5")), Some(5));
        assert_eq!(parse_round(&serde_json::json!("Final")), None);
    }

    #[test]
    fn page_without_next_data_fails() {
        let err = parse_match_page("<html><body></body></html>", &AliasTable::new())
            .expect_err("no embedded json");
        assert!(err.to_string().contains("__NEXT_DATA__"));
    }

    #[test]
    fn earlier_script_mentioning_next_data_is_ignored() {
        let html = r#"<html><head>
<script>var build = window.__NEXT_DATA__ && window.__NEXT_DATA__.buildId;</script>
<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{}}}</script>
</head></html>"#;
        let root = extract_next_data(html).expect("tagged script should be picked");
        assert!(root.pointer("/props/pageProps").is_some());
    }
}
