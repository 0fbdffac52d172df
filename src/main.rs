use anyhow::{Context, Result};

use libertadores_shots::aggregate::{
    self, AggregateRow, GroupBy, ShotFilters, home_away_split, most_away_shots, most_home_shots,
    player_options, team_options, team_profiles, top_scorers,
};
use libertadores_shots::config::{Config, arg_value, has_flag};
use libertadores_shots::dataset::DatasetStore;
use libertadores_shots::logging;
use libertadores_shots::shots::ShotRecord;

const DEFAULT_LIMIT: usize = 10;

fn main() -> Result<()> {
    logging::init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = Config::from_env().with_args(&args);

    let store = DatasetStore::open(&cfg.dataset_path)?;
    let snapshot = store.snapshot();
    let shots = snapshot.records();

    let limit = match arg_value(&args, "limit") {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid --limit {raw:?}"))?,
        None => DEFAULT_LIMIT,
    };
    let team = arg_value(&args, "team");
    let player = arg_value(&args, "player");
    let on_target_only = has_flag(&args, "on-target");

    let totals = aggregate::totals(shots);
    println!("Dataset: {}", store.path().display());
    println!(
        "Teams: {}  Shots: {}  xG: {:.2}",
        totals.teams, totals.shots, totals.xg
    );
    println!();

    let filters = ShotFilters {
        team,
        player,
        on_target_only,
    };
    match report_kind(&args) {
        Report::Options => print_options(shots, filters.team.as_deref()),
        Report::HomeAway => print_home_away(shots),
        Report::Profiles => print_profiles(shots),
        Report::Teams => {
            let rows = aggregate::aggregate(shots, GroupBy::Team, &filters, limit)?;
            println!("Top {limit} teams by shots");
            print_rows(&rows);
        }
        Report::Scorers => {
            let rows = top_scorers(shots, filters.team.as_deref(), limit)?;
            println!("Top {limit} players by goals");
            print_rows(&rows);
        }
        Report::Players => {
            let rows = aggregate::aggregate(shots, GroupBy::PlayerTeam, &filters, limit)?;
            if filters.on_target_only {
                println!("Top {limit} players by shots on target");
            } else {
                println!("Top {limit} players by shots taken");
            }
            print_rows(&rows);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
    Options,
    HomeAway,
    Profiles,
    Teams,
    Scorers,
    Players,
}

// `--on-target` is a filter only; it never picks the table.
fn report_kind(args: &[String]) -> Report {
    if has_flag(args, "options") {
        Report::Options
    } else if has_flag(args, "home-away") {
        Report::HomeAway
    } else if has_flag(args, "profiles") {
        Report::Profiles
    } else if has_flag(args, "by-team") {
        Report::Teams
    } else if has_flag(args, "scorers") {
        Report::Scorers
    } else {
        Report::Players
    }
}

fn print_rows(rows: &[AggregateRow]) {
    if rows.is_empty() {
        println!("  (no shots match the filters)");
        return;
    }
    println!(
        "  {:<28} {:<26} {:>5} {:>5} {:>6}",
        "Name", "Team", "Shots", "Goals", "xG"
    );
    for row in rows {
        println!(
            "  {:<28} {:<26} {:>5} {:>5} {:>6.2}",
            row.player.as_deref().unwrap_or("-"),
            row.team,
            row.shots,
            row.goals,
            row.xg_mean
        );
    }
}

fn print_options(shots: &[ShotRecord], team: Option<&str>) {
    println!("Teams");
    for option in team_options(shots) {
        println!("  {}", option.label());
    }
    if let Some(team) = team {
        println!();
        println!("Players of {team}");
        for option in player_options(shots, Some(team)) {
            println!("  {}", option.label());
        }
    }
}

fn print_home_away(shots: &[ShotRecord]) {
    let rows = home_away_split(shots);
    println!("Shot count per team (home vs away)");
    println!(
        "  {:<26} {:>10} {:>10} {:>8}",
        "Team", "Home Shots", "Away Shots", "Unknown"
    );
    for row in &rows {
        println!(
            "  {:<26} {:>10} {:>10} {:>8}",
            row.team, row.home, row.away, row.unknown
        );
    }
    println!();
    if let Some(best) = most_home_shots(&rows) {
        println!("Most home shots: {} ({} shots)", best.team, best.home);
    }
    if let Some(best) = most_away_shots(&rows) {
        println!("Most away shots: {} ({} shots)", best.team, best.away);
    }
}

fn print_profiles(shots: &[ShotRecord]) {
    println!("Team shot profiles");
    println!(
        "  {:<26} {:>8} {:>6} {:>6} {:>6} {:>10} {:>8} {:>8}",
        "Team", "Total xG", "Shots", "Games", "On Tgt", "Shots/Game", "xG/Shot", "xG/Game"
    );
    for p in team_profiles(shots) {
        println!(
            "  {:<26} {:>8.2} {:>6} {:>6} {:>6} {:>10.1} {:>8.3} {:>8.2}",
            p.team,
            p.total_xg,
            p.shots,
            p.games_played,
            p.shots_on_target,
            p.shots_per_game,
            p.xg_per_shot,
            p.xg_per_game
        );
    }
}
