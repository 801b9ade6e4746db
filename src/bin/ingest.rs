use std::path::PathBuf;

use anyhow::{Context, Result};

use formcast::dataset;

fn main() -> Result<()> {
    let data_dir = parse_path_arg("--data-dir").unwrap_or_else(|| PathBuf::from("data"));
    let db_path = parse_path_arg("--db")
        .or_else(dataset::default_db_path)
        .context("unable to resolve sqlite path")?;

    let mut conn = dataset::open_db(&db_path)?;
    let summary = dataset::ingest_dir(&mut conn, db_path.clone(), &data_dir)?;

    println!("Season ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Data dir: {}", data_dir.display());
    println!(
        "Files: {}/{}",
        summary.files_succeeded, summary.files_total
    );
    println!("Rows upserted: {}", summary.rows_upserted);
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
