use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use formcast::dataset;
use formcast::features::{FeatureConfig, PrematchSnapshot, replay_states};
use formcast::model::{self, PrematchFeatures};
use formcast::params_store;
use formcast::report::{self, ReportSource};

fn main() -> Result<()> {
    let db_path = parse_path_arg("--db")
        .or_else(dataset::default_db_path)
        .context("unable to resolve sqlite path")?;
    let params_path = parse_path_arg("--params")
        .or_else(params_store::default_params_path)
        .context("unable to resolve params path")?;
    let out_path = parse_path_arg("--out")
        .or_else(report::default_report_path)
        .context("unable to resolve report path")?;

    let home = parse_str_arg("--home").ok_or_else(|| anyhow!("--home <team> is required"))?;
    let away = parse_str_arg("--away").ok_or_else(|| anyhow!("--away <team> is required"))?;
    if home == away {
        return Err(anyhow!("home and away team must differ"));
    }
    let kickoff = match parse_str_arg("--date") {
        Some(raw) => dataset::parse_date(&raw)
            .ok_or_else(|| anyhow!("unparseable --date {raw:?}"))?,
        None => Utc::now().date_naive(),
    };

    // Stage 4 must have passed its gate before anything is predicted.
    let params = params_store::require_params(&params_path)?;

    let conn = dataset::open_db(&db_path)?;
    let matches = dataset::load_matches(&conn)?;
    if matches.is_empty() {
        return Err(anyhow!(
            "no matches in {} (run ingest first)",
            db_path.display()
        ));
    }

    let states = replay_states(&matches, &FeatureConfig::default())?;
    let home_snap = states
        .prematch(&home, kickoff)
        .ok_or_else(|| unknown_team(&home, &matches))?;
    let away_snap = states
        .prematch(&away, kickoff)
        .ok_or_else(|| unknown_team(&away, &matches))?;

    let features = PrematchFeatures {
        home_elo: home_snap.elo,
        away_elo: away_snap.elo,
        home_points_avg: home_snap.points_avg,
        away_points_avg: away_snap.points_avg,
        odds: None,
    };
    let probs = model::predict(&params, &features);
    let prediction = report::from_probs(
        &home,
        &away,
        probs,
        ReportSource::Computed,
        Utc::now().to_rfc3339(),
    );

    println!("FINAL PREDICTION RESULT");
    println!("Fixture: {home} vs {away} on {kickoff}");
    print_snapshot(&home, home_snap);
    print_snapshot(&away, away_snap);
    println!();
    for line in prediction.breakdown_lines() {
        println!("{line}");
    }

    report::save_report(&out_path, &prediction)?;
    println!();
    println!("Report written to {}", out_path.display());

    Ok(())
}

fn print_snapshot(team: &str, snap: PrematchSnapshot) {
    let form = snap
        .points_avg
        .map(|p| format!("{p:.2} pts/match"))
        .unwrap_or_else(|| "insufficient history".to_string());
    let rest = snap
        .days_rest
        .map(|d| format!("{d} days"))
        .unwrap_or_else(|| "n/a".to_string());
    println!("{team}: elo={:.1} form={form} rest={rest}", snap.elo);
}

fn unknown_team(team: &str, matches: &[formcast::features::MatchRecord]) -> anyhow::Error {
    let names = dataset::team_names(matches);
    let mut known: Vec<&String> = names.keys().collect();
    known.sort();
    let sample = known
        .iter()
        .take(8)
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    anyhow!("team {team:?} never appears in the dataset (known teams include: {sample}, ...)")
}

fn parse_str_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_str_arg(name).map(PathBuf::from)
}
