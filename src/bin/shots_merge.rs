use anyhow::Result;

use libertadores_shots::config::Config;
use libertadores_shots::logging;
use libertadores_shots::merge;

fn main() -> Result<()> {
    logging::init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = Config::from_env().with_args(&args);

    let outcome = merge::merge_folder_into(&cfg.csv_dir, &cfg.dataset_path)?;

    if outcome.nothing_to_do() {
        println!("No new files to append.");
    } else {
        println!("Merge complete");
        println!("Dataset: {}", cfg.dataset_path.display());
        println!("Files merged: {}", outcome.merged_files.len());
        for name in &outcome.merged_files {
            println!(" + {name}");
        }
        println!("Shots appended: {}", outcome.new_records().len());
        println!("Total shots: {}", outcome.dataset.len());
        println!("Merged at: {}", outcome.merged_at.to_rfc3339());
    }
    if !outcome.empty_files.is_empty() {
        println!("Empty files (retried next run): {}", outcome.empty_files.join(", "));
    }
    if !outcome.errors.is_empty() {
        println!("Errors: {}", outcome.errors.len());
        for err in outcome.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}
