use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use formcast::calibration::Metrics;
use formcast::dataset;
use formcast::model;
use formcast::params_store;

fn main() -> Result<()> {
    let db_path = parse_path_arg("--db")
        .or_else(dataset::default_db_path)
        .context("unable to resolve sqlite path")?;
    let out_path = parse_path_arg("--out")
        .or_else(params_store::default_candidate_path)
        .context("unable to resolve candidate params path")?;

    let conn = dataset::open_db(&db_path)?;
    let rows = dataset::load_features(&conn)?;
    if rows.len() < 50 {
        return Err(anyhow!(
            "only {} feature rows in {} (run features first; tuning needs a real sample)",
            rows.len(),
            db_path.display()
        ));
    }

    let outcomes = model::outcomes_of(&rows);
    let split_idx = model::train_split_index(rows.len());
    let summary = model::fit(&rows[..split_idx], &outcomes[..split_idx]);

    println!("Model tuning complete");
    println!("DB: {}", db_path.display());
    println!(
        "Samples: {} (train {} / holdout {})",
        rows.len(),
        split_idx,
        rows.len() - split_idx
    );
    println!("Grid combinations: {}", summary.combos_tried);
    println!(
        "Best params: home_adv={:.0} draw_base={:.2} form_pts={:.0} odds_blend={:.2} scale={:.2} draw_bias={:+.2}",
        summary.params.elo_home_adv,
        summary.params.draw_base,
        summary.params.form_pts,
        summary.params.odds_blend,
        summary.params.logit_scale,
        summary.params.draw_bias,
    );
    print_metrics("Train raw", summary.train_raw);
    print_metrics("Train calibrated", summary.train_calibrated);

    params_store::save_params(&out_path, &summary.params)?;
    println!("Candidate written to {}", out_path.display());
    println!("Next: backtest --apply validates it against the holdout");

    Ok(())
}

fn print_metrics(label: &str, m: Metrics) {
    println!(
        "{label}: n={} log_loss={:.4} brier={:.4} accuracy={:.3}",
        m.samples, m.log_loss, m.brier, m.accuracy
    );
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
