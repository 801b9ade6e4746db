use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calibration::{self, Metrics, Outcome, Prob3};
use crate::features::{EnrichedMatchRecord, expected_score};

/// Outcome model over the engineered pre-match features. Four shape knobs
/// plus the logit calibration pair; everything here is fitted, nothing is
/// hand-tuned at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Rating points credited to the home side before the expected score.
    pub elo_home_adv: f64,
    /// Draw probability for two evenly matched sides.
    pub draw_base: f64,
    /// Rating points per unit of points-form differential.
    pub form_pts: f64,
    /// Weight on bookmaker-implied probabilities when a row carries odds.
    pub odds_blend: f64,
    pub logit_scale: f64,
    pub draw_bias: f64,
    /// Size of the sample the params were fitted on.
    pub sample_matches: usize,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            elo_home_adv: 60.0,
            draw_base: 0.28,
            form_pts: 0.0,
            odds_blend: 0.0,
            logit_scale: 1.0,
            draw_bias: 0.0,
            sample_matches: 0,
        }
    }
}

/// The slice of a feature row the model actually consumes. Upcoming fixtures
/// build one from `TeamStates::prematch`; historical rows via
/// `prematch_features`.
#[derive(Debug, Clone, Copy)]
pub struct PrematchFeatures {
    pub home_elo: f64,
    pub away_elo: f64,
    pub home_points_avg: Option<f64>,
    pub away_points_avg: Option<f64>,
    /// Overround-free implied probabilities, when the market priced the game.
    pub odds: Option<(f64, f64, f64)>,
}

pub fn prematch_features(row: &EnrichedMatchRecord) -> PrematchFeatures {
    PrematchFeatures {
        home_elo: row.home_elo_pre,
        away_elo: row.away_elo_pre,
        home_points_avg: row.home_points_last5,
        away_points_avg: row.away_points_last5,
        odds: match (row.odds_home_prob, row.odds_draw_prob, row.odds_away_prob) {
            (Some(h), Some(d), Some(a)) => Some((h, d, a)),
            _ => None,
        },
    }
}

pub fn predict(params: &ModelParams, features: &PrematchFeatures) -> Prob3 {
    let raw = predict_raw(params, features);
    calibration::apply_logit_calibration(raw, params.logit_scale, params.draw_bias)
}

/// Elo expectation with home advantage and a form nudge, split three ways by
/// a draw component that peaks for even matchups, then optionally blended
/// with the market.
pub fn predict_raw(params: &ModelParams, features: &PrematchFeatures) -> Prob3 {
    let mut home_rating = features.home_elo + params.elo_home_adv;
    if let (Some(hp), Some(ap)) = (features.home_points_avg, features.away_points_avg) {
        home_rating += params.form_pts * (hp - ap);
    }
    let e = expected_score(home_rating, features.away_elo);

    let p_draw = (params.draw_base * (1.0 - (2.0 * e - 1.0).powi(2))).clamp(0.0, 0.50);
    let mut p = Prob3 {
        home: e * (1.0 - p_draw),
        draw: p_draw,
        away: (1.0 - e) * (1.0 - p_draw),
    };

    if params.odds_blend > 0.0
        && let Some((oh, od, oa)) = features.odds
    {
        let w = params.odds_blend.clamp(0.0, 1.0);
        p = Prob3 {
            home: (1.0 - w) * p.home + w * oh,
            draw: (1.0 - w) * p.draw + w * od,
            away: (1.0 - w) * p.away + w * oa,
        };
        let sum = (p.home + p.draw + p.away).max(1e-12);
        p = Prob3 {
            home: p.home / sum,
            draw: p.draw / sum,
            away: p.away / sum,
        };
    }

    p
}

#[derive(Debug, Clone, Copy)]
pub struct FitSummary {
    pub params: ModelParams,
    pub train_raw: Metrics,
    pub train_calibrated: Metrics,
    pub combos_tried: usize,
}

/// Chronological 80/20 split point; at least one row lands on each side.
pub fn train_split_index(len: usize) -> usize {
    ((len * 4) / 5).clamp(1, len.saturating_sub(1).max(1))
}

const HOME_ADV_GRID: [f64; 6] = [0.0, 20.0, 40.0, 60.0, 80.0, 100.0];
const DRAW_BASE_GRID: [f64; 6] = [0.20, 0.24, 0.26, 0.28, 0.31, 0.34];
const FORM_PTS_GRID: [f64; 5] = [0.0, 15.0, 30.0, 45.0, 60.0];
const ODDS_BLEND_GRID: [f64; 5] = [0.0, 0.25, 0.50, 0.75, 1.0];

/// Exhaustive grid search over the shape knobs, log loss on the training
/// rows as the objective, then logit calibration fitted on the winner's
/// training predictions. The grid is embarrassingly parallel.
pub fn fit(rows: &[EnrichedMatchRecord], outcomes: &[Outcome]) -> FitSummary {
    debug_assert_eq!(rows.len(), outcomes.len());

    let views: Vec<PrematchFeatures> = rows.iter().map(prematch_features).collect();

    let mut combos: Vec<ModelParams> = Vec::new();
    for adv in HOME_ADV_GRID {
        for draw_base in DRAW_BASE_GRID {
            for form_pts in FORM_PTS_GRID {
                for odds_blend in ODDS_BLEND_GRID {
                    combos.push(ModelParams {
                        elo_home_adv: adv,
                        draw_base,
                        form_pts,
                        odds_blend,
                        logit_scale: 1.0,
                        draw_bias: 0.0,
                        sample_matches: rows.len(),
                    });
                }
            }
        }
    }
    let combos_tried = combos.len();

    let best = combos
        .into_par_iter()
        .map(|params| {
            let preds: Vec<Prob3> = views.iter().map(|v| predict_raw(&params, v)).collect();
            let metrics = calibration::evaluate_probs(&preds, outcomes);
            (params, metrics)
        })
        .min_by(|a, b| {
            a.1.log_loss
                .partial_cmp(&b.1.log_loss)
                .unwrap_or(Ordering::Equal)
        });

    let (mut params, train_raw) = match best {
        Some(found) => found,
        None => (ModelParams::default(), Metrics::empty()),
    };

    let raw_preds: Vec<Prob3> = views.iter().map(|v| predict_raw(&params, v)).collect();
    let (scale, bias, train_calibrated) = calibration::fit_logit_calibration(&raw_preds, outcomes);
    params.logit_scale = scale;
    params.draw_bias = bias;

    FitSummary {
        params,
        train_raw,
        train_calibrated,
        combos_tried,
    }
}

pub fn predictions(params: &ModelParams, rows: &[EnrichedMatchRecord]) -> Vec<Prob3> {
    rows.iter()
        .map(|row| predict(params, &prematch_features(row)))
        .collect()
}

pub fn outcomes_of(rows: &[EnrichedMatchRecord]) -> Vec<Outcome> {
    rows.iter().map(|row| row.result).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        ModelParams, PrematchFeatures, fit, predict, predict_raw, train_split_index,
    };
    use crate::calibration::Outcome;
    use crate::features::{EnrichedMatchRecord, FeatureConfig, MatchRecord, compute_features};

    fn even_matchup() -> PrematchFeatures {
        PrematchFeatures {
            home_elo: 1500.0,
            away_elo: 1500.0,
            home_points_avg: None,
            away_points_avg: None,
            odds: None,
        }
    }

    #[test]
    fn probabilities_are_normalized() {
        let params = ModelParams::default();
        let p = predict(&params, &even_matchup());
        assert!((p.home + p.draw + p.away - 1.0).abs() < 1e-9);
        assert!(p.home > 0.0 && p.draw > 0.0 && p.away > 0.0);
    }

    #[test]
    fn home_advantage_tilts_toward_home() {
        let mut params = ModelParams::default();
        params.elo_home_adv = 0.0;
        let flat = predict_raw(&params, &even_matchup());
        assert!((flat.home - flat.away).abs() < 1e-12);

        params.elo_home_adv = 80.0;
        let tilted = predict_raw(&params, &even_matchup());
        assert!(tilted.home > tilted.away);
    }

    #[test]
    fn form_differential_moves_the_needle() {
        let mut params = ModelParams::default();
        params.elo_home_adv = 0.0;
        params.form_pts = 40.0;
        let mut features = even_matchup();
        features.home_points_avg = Some(2.4);
        features.away_points_avg = Some(0.6);
        let p = predict_raw(&params, &features);
        assert!(p.home > p.away);

        // One side missing form keeps the term out entirely.
        features.away_points_avg = None;
        let q = predict_raw(&params, &features);
        assert!((q.home - q.away).abs() < 1e-12);
    }

    #[test]
    fn full_odds_blend_returns_market_probs() {
        let mut params = ModelParams::default();
        params.odds_blend = 1.0;
        let mut features = even_matchup();
        features.odds = Some((0.55, 0.25, 0.20));
        let p = predict_raw(&params, &features);
        assert!((p.home - 0.55).abs() < 1e-9);
        assert!((p.draw - 0.25).abs() < 1e-9);
        assert!((p.away - 0.20).abs() < 1e-9);
    }

    #[test]
    fn split_index_keeps_both_sides_nonempty() {
        assert_eq!(train_split_index(10), 8);
        assert_eq!(train_split_index(2), 1);
        assert_eq!(train_split_index(5), 4);
    }

    fn synthetic_rows() -> Vec<EnrichedMatchRecord> {
        // Strong side beats weak side most weeks; enough rows for the fit to
        // see real Elo separation.
        let teams = ["Alpha", "Beta", "Gamma", "Delta"];
        let mut matches = Vec::new();
        let start = NaiveDate::from_ymd_opt(2023, 8, 5).unwrap();
        for round in 0..30i64 {
            for (i, home) in teams.iter().enumerate() {
                for (j, away) in teams.iter().enumerate() {
                    if i == j || (i + j + round as usize) % 3 != 0 {
                        continue;
                    }
                    // Lower index is the stronger team.
                    let (hg, ag) = if i < j { (2, 0) } else if i > j { (0, 1) } else { (1, 1) };
                    matches.push(MatchRecord {
                        date: start + chrono::Duration::days(round * 7 + i as i64),
                        home_team: home.to_string(),
                        away_team: away.to_string(),
                        home_goals: Some(hg),
                        away_goals: Some(ag),
                        result: None,
                        home_shots: None,
                        away_shots: None,
                        home_sot: None,
                        away_sot: None,
                        odds_home: None,
                        odds_draw: None,
                        odds_away: None,
                    });
                }
            }
        }
        compute_features(&matches, &FeatureConfig::default()).unwrap()
    }

    #[test]
    fn fit_beats_the_default_parameters_on_train() {
        let rows = synthetic_rows();
        let outcomes: Vec<Outcome> = rows.iter().map(|r| r.result).collect();
        let summary = fit(&rows, &outcomes);

        assert!(summary.combos_tried > 100);
        assert!(summary.train_raw.log_loss.is_finite());

        let default_preds: Vec<_> = rows
            .iter()
            .map(|r| predict_raw(&ModelParams::default(), &super::prematch_features(r)))
            .collect();
        let default_metrics = crate::calibration::evaluate_probs(&default_preds, &outcomes);
        assert!(summary.train_raw.log_loss <= default_metrics.log_loss + 1e-12);
        assert!(summary.train_calibrated.log_loss <= summary.train_raw.log_loss + 1e-12);
    }
}
