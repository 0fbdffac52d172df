use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use libertadores_shots::config::{Config, arg_value};
use libertadores_shots::logging;
use libertadores_shots::match_page::{match_slug, parse_match_page, save_match_csv};

/// Turns a saved FotMob match page into `<csv-dir>/<slug>.csv`.
///
/// `--html <page.html>` is required; the file name comes from `--url`
/// (the match slug) or `--name`.
fn main() -> Result<()> {
    logging::init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = Config::from_env().with_args(&args);

    let html_path = arg_value(&args, "html")
        .map(PathBuf::from)
        .context("missing --html <saved match page>")?;
    let slug = match (arg_value(&args, "name"), arg_value(&args, "url")) {
        (Some(name), _) => name,
        (None, Some(url)) => match_slug(&url)
            .ok_or_else(|| anyhow!("could not extract match slug from {url}"))?,
        (None, None) => return Err(anyhow!("pass --url <match url> or --name <file name>")),
    };
    let round_override = match arg_value(&args, "round") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .with_context(|| format!("invalid --round {raw:?}"))?,
        ),
        None => None,
    };

    let html = fs::read_to_string(&html_path)
        .with_context(|| format!("read {}", html_path.display()))?;
    let aliases = cfg.alias_table()?;
    let mut shots = parse_match_page(&html, &aliases)?;
    if let Some(round) = round_override {
        for record in &mut shots.records {
            record.match_round = round;
        }
    }

    let path = save_match_csv(&cfg.csv_dir, &slug, &shots.records)?;

    println!("{} vs {}", shots.home_team, shots.away_team);
    println!("Match slug: {slug}");
    println!("Shots saved: {}", shots.records.len());
    println!("Data successfully saved to {}", path.display());
    if !shots.attribution.unresolved.is_empty() {
        println!("Unresolved team names (add them to the alias table):");
        for name in &shots.attribution.unresolved {
            println!(" - {name}");
        }
    }
    for collision in &shots.collisions {
        println!(
            "Alias collision: {:?} claimed by both sides, kept {}",
            collision.key, collision.kept
        );
    }
    if !shots.errors.is_empty() {
        println!("Skipped shots: {}", shots.errors.len());
        for err in shots.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}
