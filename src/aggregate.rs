use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Result, anyhow};

use crate::attribution::Side;
use crate::shots::ShotRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    PlayerTeam,
    Team,
}

/// Team and player filters compare against the stored names exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShotFilters {
    pub team: Option<String>,
    pub player: Option<String>,
    pub on_target_only: bool,
}

impl ShotFilters {
    pub fn team(team: impl Into<String>) -> Self {
        Self {
            team: Some(team.into()),
            ..Self::default()
        }
    }

    pub fn on_target(mut self) -> Self {
        self.on_target_only = true;
        self
    }

    pub fn matches(&self, shot: &ShotRecord) -> bool {
        if let Some(team) = self.team.as_deref()
            && shot.team_name != team
        {
            return false;
        }
        if let Some(player) = self.player.as_deref()
            && shot.player_name != player
        {
            return false;
        }
        !self.on_target_only || shot.counts_on_target()
    }
}

pub fn filter_shots<'a>(
    shots: &'a [ShotRecord],
    filters: &'a ShotFilters,
) -> impl Iterator<Item = &'a ShotRecord> + 'a {
    shots.iter().filter(move |shot| filters.matches(shot))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// `None` when grouped by team only.
    pub player: Option<String>,
    pub team: String,
    pub shots: usize,
    pub goals: usize,
    pub xg_sum: f64,
    /// Unrounded; callers format for display.
    pub xg_mean: f64,
}

/// Groups the filtered shots, sorts groups by shot count (descending, ties
/// keep first-appearance order) and keeps the first `limit`.
pub fn aggregate(
    shots: &[ShotRecord],
    group_by: GroupBy,
    filters: &ShotFilters,
    limit: usize,
) -> Result<Vec<AggregateRow>> {
    if limit == 0 {
        return Err(anyhow!("aggregate limit must be positive"));
    }
    let mut rows = group_rows(filter_shots(shots, filters), group_by);
    rows.sort_by(|a, b| b.shots.cmp(&a.shots));
    rows.truncate(limit);
    Ok(rows)
}

/// Players ranked by goals among shots on target; players without a goal are left out.
pub fn top_scorers(
    shots: &[ShotRecord],
    team: Option<&str>,
    limit: usize,
) -> Result<Vec<AggregateRow>> {
    if limit == 0 {
        return Err(anyhow!("aggregate limit must be positive"));
    }
    let filters = ShotFilters {
        team: team.map(str::to_string),
        player: None,
        on_target_only: true,
    };
    let mut rows = group_rows(filter_shots(shots, &filters), GroupBy::PlayerTeam);
    rows.retain(|row| row.goals > 0);
    rows.sort_by(|a, b| b.goals.cmp(&a.goals));
    rows.truncate(limit);
    Ok(rows)
}

fn group_rows<'a>(
    shots: impl Iterator<Item = &'a ShotRecord>,
    group_by: GroupBy,
) -> Vec<AggregateRow> {
    let mut index: HashMap<(Option<&str>, &str), usize> = HashMap::new();
    let mut rows: Vec<AggregateRow> = Vec::new();

    for shot in shots {
        let player = match group_by {
            GroupBy::PlayerTeam => Some(shot.player_name.as_str()),
            GroupBy::Team => None,
        };
        let key = (player, shot.team_name.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(AggregateRow {
                player: player.map(str::to_string),
                team: shot.team_name.clone(),
                shots: 0,
                goals: 0,
                xg_sum: 0.0,
                xg_mean: 0.0,
            });
            rows.len() - 1
        });
        let row = &mut rows[slot];
        row.shots += 1;
        if shot.is_goal() {
            row.goals += 1;
        }
        row.xg_sum += shot.expected_goals;
    }

    for row in &mut rows {
        row.xg_mean = row.xg_sum / row.shots as f64;
    }
    rows
}

/// A selectable team or player with its shot count, e.g. `"Peñarol (14)"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCount {
    pub name: String,
    pub count: usize,
}

impl OptionCount {
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.count)
    }
}

pub fn team_options(shots: &[ShotRecord]) -> Vec<OptionCount> {
    value_counts(shots.iter().map(|s| s.team_name.as_str()))
}

/// Players of `team` by shot count. No team selected means no options.
pub fn player_options(shots: &[ShotRecord], team: Option<&str>) -> Vec<OptionCount> {
    let Some(team) = team else {
        return Vec::new();
    };
    value_counts(
        shots
            .iter()
            .filter(|s| s.team_name == team)
            .map(|s| s.player_name.as_str()),
    )
}

fn value_counts<'a>(names: impl Iterator<Item = &'a str>) -> Vec<OptionCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<OptionCount> = Vec::new();
    for name in names {
        match index.get(name) {
            Some(&slot) => out[slot].count += 1,
            None => {
                index.insert(name, out.len());
                out.push(OptionCount {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeAwayRow {
    pub team: String,
    pub home: usize,
    pub away: usize,
    pub unknown: usize,
}

impl HomeAwayRow {
    pub fn total(&self) -> usize {
        self.home + self.away + self.unknown
    }
}

/// Shot counts per team split by side, busiest teams first.
pub fn home_away_split(shots: &[ShotRecord]) -> Vec<HomeAwayRow> {
    let mut by_team: BTreeMap<&str, HomeAwayRow> = BTreeMap::new();
    for shot in shots {
        let row = by_team
            .entry(shot.team_name.as_str())
            .or_insert_with(|| HomeAwayRow {
                team: shot.team_name.clone(),
                ..HomeAwayRow::default()
            });
        match shot.side {
            Side::Home => row.home += 1,
            Side::Away => row.away += 1,
            Side::Unknown => row.unknown += 1,
        }
    }
    let mut rows = by_team.into_values().collect::<Vec<_>>();
    rows.sort_by(|a, b| b.total().cmp(&a.total()));
    rows
}

/// First team with the highest home count (rows keep their split order).
pub fn most_home_shots(rows: &[HomeAwayRow]) -> Option<&HomeAwayRow> {
    first_max_by(rows, |row| row.home)
}

pub fn most_away_shots(rows: &[HomeAwayRow]) -> Option<&HomeAwayRow> {
    first_max_by(rows, |row| row.away)
}

fn first_max_by(rows: &[HomeAwayRow], key: impl Fn(&HomeAwayRow) -> usize) -> Option<&HomeAwayRow> {
    let mut best: Option<&HomeAwayRow> = None;
    for row in rows {
        if best.is_none_or(|b| key(row) > key(b)) {
            best = Some(row);
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamProfile {
    pub team: String,
    pub total_xg: f64,
    pub shots: usize,
    /// Distinct match rounds the team shot in.
    pub games_played: usize,
    pub shots_on_target: usize,
    pub shots_per_game: f64,
    pub xg_per_shot: f64,
    pub xg_per_game: f64,
}

/// Volume and quality profile per team, ordered by team name.
pub fn team_profiles(shots: &[ShotRecord]) -> Vec<TeamProfile> {
    struct Acc {
        xg: f64,
        shots: usize,
        rounds: BTreeSet<i64>,
        on_target: usize,
    }

    let mut by_team: BTreeMap<&str, Acc> = BTreeMap::new();
    for shot in shots {
        let acc = by_team.entry(shot.team_name.as_str()).or_insert(Acc {
            xg: 0.0,
            shots: 0,
            rounds: BTreeSet::new(),
            on_target: 0,
        });
        acc.xg += shot.expected_goals;
        acc.shots += 1;
        acc.rounds.insert(shot.match_round);
        if shot.counts_on_target() {
            acc.on_target += 1;
        }
    }

    by_team
        .into_iter()
        .map(|(team, acc)| {
            let games = acc.rounds.len();
            TeamProfile {
                team: team.to_string(),
                total_xg: acc.xg,
                shots: acc.shots,
                games_played: games,
                shots_on_target: acc.on_target,
                shots_per_game: acc.shots as f64 / games as f64,
                xg_per_shot: acc.xg / acc.shots as f64,
                xg_per_game: acc.xg / games as f64,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetTotals {
    pub teams: usize,
    pub shots: usize,
    pub xg: f64,
}

pub fn totals(shots: &[ShotRecord]) -> DatasetTotals {
    let teams = shots
        .iter()
        .map(|s| s.team_name.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    DatasetTotals {
        teams,
        shots: shots.len(),
        xg: shots.iter().map(|s| s.expected_goals).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shots::EventType;

    fn shot(player: &str, team: &str, xg: f64, goal: bool, on_target: bool) -> ShotRecord {
        ShotRecord {
            id: 0,
            player_id: 0,
            player_name: player.to_string(),
            team_name: team.to_string(),
            x: 90.0,
            y: 34.0,
            expected_goals: xg,
            event_type: if goal { EventType::Goal } else { EventType::Miss },
            is_on_target: on_target,
            is_own_goal: false,
            match_round: 1,
            side: Side::Unknown,
            source_file: None,
        }
    }

    #[test]
    fn zero_limit_is_rejected() {
        let shots = vec![shot("X", "T", 0.1, false, false)];
        assert!(aggregate(&shots, GroupBy::Team, &ShotFilters::default(), 0).is_err());
    }

    #[test]
    fn empty_input_gives_empty_rows() {
        let rows = aggregate(&[], GroupBy::PlayerTeam, &ShotFilters::default(), 10)
            .expect("empty is fine");
        assert!(rows.is_empty());
    }

    #[test]
    fn equal_counts_keep_input_order() {
        let mut shots = Vec::new();
        for _ in 0..3 {
            shots.push(shot("X", "T", 0.1, false, false));
            shots.push(shot("Y", "T", 0.1, false, false));
        }
        let rows = aggregate(&shots, GroupBy::PlayerTeam, &ShotFilters::default(), 2)
            .expect("aggregate");
        let names = rows.iter().map(|r| r.player.as_deref()).collect::<Vec<_>>();
        assert_eq!(names, vec![Some("X"), Some("Y")]);
        assert!(rows.iter().all(|r| r.shots == 3));
    }

    #[test]
    fn same_player_name_on_two_teams_is_two_groups() {
        let shots = vec![shot("X", "A", 0.1, false, false), shot("X", "B", 0.1, false, false)];
        let rows = aggregate(&shots, GroupBy::PlayerTeam, &ShotFilters::default(), 10)
            .expect("aggregate");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn player_filter_narrows_to_one_player() {
        let shots = vec![
            shot("X", "A", 0.1, false, false),
            shot("Y", "A", 0.1, false, false),
            shot("X", "A", 0.2, true, true),
        ];
        let filters = ShotFilters {
            player: Some("X".to_string()),
            ..ShotFilters::default()
        };
        assert_eq!(filter_shots(&shots, &filters).count(), 2);
    }

    #[test]
    fn top_scorers_rank_by_goals() {
        let shots = vec![
            shot("A", "T", 0.5, false, true),
            shot("A", "T", 0.5, false, true),
            shot("A", "T", 0.5, true, true),
            shot("B", "T", 0.5, true, true),
            shot("B", "T", 0.5, true, false),
            shot("C", "U", 0.5, false, true),
        ];
        let rows = top_scorers(&shots, None, 10).expect("scorers");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player.as_deref(), Some("B"));
        assert_eq!(rows[0].goals, 2);
        assert_eq!(rows[1].player.as_deref(), Some("A"));
        assert_eq!(rows[1].goals, 1);

        let only_u = top_scorers(&shots, Some("U"), 10).expect("scorers");
        assert!(only_u.is_empty());
    }

    #[test]
    fn options_sorted_by_count_with_labels() {
        let shots = vec![
            shot("X", "A", 0.1, false, false),
            shot("Y", "B", 0.1, false, false),
            shot("Z", "B", 0.1, false, false),
        ];
        let teams = team_options(&shots);
        assert_eq!(teams[0].label(), "B (2)");
        assert_eq!(teams[1].label(), "A (1)");
        assert!(player_options(&shots, None).is_empty());
        let players = player_options(&shots, Some("B"));
        assert_eq!(
            players.iter().map(OptionCount::label).collect::<Vec<_>>(),
            vec!["Y (1)", "Z (1)"]
        );
    }

    #[test]
    fn home_away_split_and_leaders() {
        let mut shots = Vec::new();
        for (team, side, n) in [
            ("A", Side::Home, 2),
            ("A", Side::Away, 1),
            ("B", Side::Away, 4),
            ("C", Side::Home, 2),
        ] {
            for _ in 0..n {
                let mut s = shot("P", team, 0.1, false, false);
                s.side = side;
                shots.push(s);
            }
        }
        let rows = home_away_split(&shots);
        assert_eq!(
            rows.iter().map(|r| r.team.as_str()).collect::<Vec<_>>(),
            vec!["B", "A", "C"]
        );
        assert_eq!(rows[1].home, 2);
        assert_eq!(rows[1].away, 1);
        assert_eq!(most_home_shots(&rows).map(|r| r.team.as_str()), Some("A"));
        assert_eq!(most_away_shots(&rows).map(|r| r.team.as_str()), Some("B"));
        assert!(most_home_shots(&[]).is_none());
    }

    #[test]
    fn team_profile_rates() {
        let mut shots = vec![
            shot("X", "A", 0.2, true, false),
            shot("X", "A", 0.4, false, true),
            shot("X", "A", 0.6, false, false),
            shot("Y", "A", 0.2, false, false),
        ];
        shots[2].match_round = 2;
        shots[3].match_round = 2;
        let profiles = team_profiles(&shots);
        assert_eq!(profiles.len(), 1);
        let a = &profiles[0];
        assert_eq!(a.shots, 4);
        assert_eq!(a.games_played, 2);
        assert_eq!(a.shots_on_target, 2);
        assert!((a.total_xg - 1.4).abs() < 1e-9);
        assert!((a.shots_per_game - 2.0).abs() < 1e-9);
        assert!((a.xg_per_shot - 0.35).abs() < 1e-9);
        assert!((a.xg_per_game - 0.7).abs() < 1e-9);
    }
}
