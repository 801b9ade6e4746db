use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use formcast::dataset;
use formcast::features::{FeatureConfig, compute_features};

fn main() -> Result<()> {
    let db_path = parse_path_arg("--db")
        .or_else(dataset::default_db_path)
        .context("unable to resolve sqlite path")?;

    let cfg = FeatureConfig {
        window: parse_usize_arg("--window").unwrap_or(5).clamp(1, 38),
        elo_k: parse_f64_arg("--elo-k").unwrap_or(20.0).clamp(1.0, 60.0),
        elo_base: parse_f64_arg("--elo-base").unwrap_or(1500.0),
    };

    let mut conn = dataset::open_db(&db_path)?;
    let matches = dataset::load_matches(&conn)?;
    if matches.is_empty() {
        return Err(anyhow!(
            "no matches found in {} (run ingest first)",
            db_path.display()
        ));
    }

    let rows = compute_features(&matches, &cfg)?;
    let teams = dataset::team_names(&matches);
    let without_form = rows
        .iter()
        .filter(|r| r.home_points_last5.is_none() || r.away_points_last5.is_none())
        .count();
    let with_odds = rows.iter().filter(|r| r.odds_home_prob.is_some()).count();
    let stored = dataset::save_features(&mut conn, &rows)?;

    println!("Feature engineering complete");
    println!("DB: {}", db_path.display());
    println!(
        "Window: {} | K: {} | Base: {}",
        cfg.window, cfg.elo_k, cfg.elo_base
    );
    println!("Matches: {} | Teams: {}", rows.len(), teams.len());
    println!("Rows stored: {stored}");
    println!("Rows without full rolling form: {without_form}");
    println!("Rows with bookmaker odds: {with_odds}");
    if let (Some(first), Some(last)) = (rows.iter().map(|r| r.date).min(), rows.iter().map(|r| r.date).max()) {
        println!("Range: {first} -> {last}");
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

fn parse_f64_arg(name: &str) -> Option<f64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<f64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<f64>()
        {
            return Some(v);
        }
    }
    None
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_f64_arg(name).map(|v| v.max(0.0) as usize)
}
