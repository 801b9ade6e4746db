use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use formcast::calibration::{self, Metrics, Outcome, Prob3};
use formcast::dataset;
use formcast::model::{self, ModelParams};
use formcast::params_store;

const DEFAULT_MIN_GAIN: f64 = 0.0;

fn main() -> Result<()> {
    let db_path = parse_path_arg("--db")
        .or_else(dataset::default_db_path)
        .context("unable to resolve sqlite path")?;
    let candidate_path = parse_path_arg("--candidate")
        .or_else(params_store::default_candidate_path)
        .context("unable to resolve candidate params path")?;
    let params_path = parse_path_arg("--params")
        .or_else(params_store::default_params_path)
        .context("unable to resolve params path")?;

    let apply = has_flag("--apply");
    let force_apply = has_flag("--force-apply");
    let min_gain = parse_f64_arg("--min-gain")
        .unwrap_or(DEFAULT_MIN_GAIN)
        .clamp(0.0, 0.05);

    let params = params_store::load_params(&candidate_path)
        .context("load candidate params (run fit first)")?;

    let conn = dataset::open_db(&db_path)?;
    let rows = dataset::load_features(&conn)?;
    if rows.is_empty() {
        return Err(anyhow!(
            "no feature rows in {} (run features first)",
            db_path.display()
        ));
    }

    let outcomes = model::outcomes_of(&rows);
    let split_idx = model::train_split_index(rows.len());
    let (val_rows, val_outcomes) = (&rows[split_idx..], &outcomes[split_idx..]);
    if val_rows.is_empty() {
        return Err(anyhow!("holdout split is empty; not enough samples"));
    }

    let raw_params = ModelParams {
        logit_scale: 1.0,
        draw_bias: 0.0,
        ..params
    };
    let val_raw_preds = model::predictions(&raw_params, val_rows);
    let val_preds = model::predictions(&params, val_rows);

    let val_raw = calibration::evaluate_probs(&val_raw_preds, val_outcomes);
    let val_cal = calibration::evaluate_probs(&val_preds, val_outcomes);

    let uniform = vec![Prob3::uniform(); val_outcomes.len()];
    let uniform_metrics = calibration::evaluate_probs(&uniform, val_outcomes);
    // Base rates come from the training window only; the holdout stays
    // untouched by anything that gets compared against it.
    let empirical_prob = calibration::empirical_outcome_probs(&outcomes[..split_idx]);
    let empirical = vec![empirical_prob; val_outcomes.len()];
    let empirical_metrics = calibration::evaluate_probs(&empirical, val_outcomes);

    let cal_gain = val_raw.log_loss - val_cal.log_loss;
    let gate_passed = val_cal.log_loss <= uniform_metrics.log_loss
        && val_cal.log_loss <= empirical_metrics.log_loss
        && cal_gain >= min_gain;

    println!("Holdout backtest");
    println!("DB: {}", db_path.display());
    println!(
        "Samples: {} (train {} / holdout {})",
        rows.len(),
        split_idx,
        val_rows.len()
    );
    if let (Some(first), Some(last)) = (val_rows.first(), val_rows.last()) {
        println!("Holdout range: {} -> {}", first.date, last.date);
    }
    println!();
    print_metrics("Holdout raw", val_raw);
    print_metrics("Holdout calibrated", val_cal);
    print_metrics("Uniform baseline", uniform_metrics);
    print_metrics("Empirical baseline", empirical_metrics);
    println!();
    println!(
        "Calibration gain: {cal_gain:+.6} (required {min_gain:.6})"
    );
    println!(
        "Gate status: {} (needs calibrated holdout <= both baselines)",
        if gate_passed { "PASS" } else { "FAIL" }
    );

    println!();
    println!("Home-win calibration bins (holdout):");
    for bin in calibration::calibration_bins(&val_preds, val_outcomes, Outcome::Home, 10) {
        if bin.count == 0 {
            continue;
        }
        println!(
            "  [{:.1},{:.1}) n={:<4} pred={:.3} actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }

    if apply {
        if !gate_passed && !force_apply {
            return Err(anyhow!(
                "refused to apply params: validation gate failed (use --force-apply to override)"
            ));
        }
        params_store::save_params(&params_path, &params)?;
        println!();
        println!("Validated params written to {}", params_path.display());
    } else if gate_passed {
        println!();
        println!("Gate passed; rerun with --apply to persist the params");
    }

    Ok(())
}

fn print_metrics(label: &str, m: Metrics) {
    println!(
        "{label}: n={} log_loss={:.4} brier={:.4} accuracy={:.3}",
        m.samples, m.log_loss, m.brier, m.accuracy
    );
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
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
