use serde::{Deserialize, Serialize};

/// Full-time result from the home side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn from_goals(home_goals: i32, away_goals: i32) -> Self {
        if home_goals > away_goals {
            Outcome::Home
        } else if home_goals < away_goals {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "H" | "HOME" => Some(Outcome::Home),
            "D" | "DRAW" => Some(Outcome::Draw),
            "A" | "AWAY" => Some(Outcome::Away),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Outcome::Home => 'H',
            Outcome::Draw => 'D',
            Outcome::Away => 'A',
        }
    }

    /// Elo actual score for the home side (1 / 0.5 / 0).
    pub fn home_score(self) -> f64 {
        match self {
            Outcome::Home => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Away => 0.0,
        }
    }

    /// League points earned, 3/1/0 rule.
    pub fn home_points(self) -> f64 {
        match self {
            Outcome::Home => 3.0,
            Outcome::Draw => 1.0,
            Outcome::Away => 0.0,
        }
    }

    pub fn away_points(self) -> f64 {
        match self {
            Outcome::Home => 0.0,
            Outcome::Draw => 1.0,
            Outcome::Away => 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn for_class(&self, class: Outcome) -> f64 {
        match class {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

impl Metrics {
    pub fn empty() -> Self {
        Self {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

/// Base rates of the three outcomes over a sample; the "always predict the
/// league average" baseline.
pub fn empirical_outcome_probs(outcomes: &[Outcome]) -> Prob3 {
    if outcomes.is_empty() {
        return Prob3::uniform();
    }

    let mut home = 0usize;
    let mut draw = 0usize;
    let mut away = 0usize;
    for outcome in outcomes {
        match outcome {
            Outcome::Home => home += 1,
            Outcome::Draw => draw += 1,
            Outcome::Away => away += 1,
        }
    }
    let n = outcomes.len() as f64;
    Prob3 {
        home: home as f64 / n,
        draw: draw as f64 / n,
        away: away as f64 / n,
    }
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || outcomes.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::empty();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let y = one_hot(*outcome);
        brier_sum +=
            (p.home - y.home).powi(2) + (p.draw - y.draw).powi(2) + (p.away - y.away).powi(2);

        let actual_prob = p.for_class(*outcome).clamp(1e-12, 1.0);
        log_loss_sum += -actual_prob.ln();

        if argmax(*p) == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

/// Temperature-and-draw-bias adjustment in log space; keeps the distribution
/// normalized.
pub fn apply_logit_calibration(prob: Prob3, logit_scale: f64, draw_bias: f64) -> Prob3 {
    let s = logit_scale.clamp(0.50, 1.80);
    let mut lh = prob.home.clamp(1e-9, 1.0).ln();
    let mut ld = prob.draw.clamp(1e-9, 1.0).ln() + draw_bias;
    let mut la = prob.away.clamp(1e-9, 1.0).ln();

    let mean = (lh + ld + la) / 3.0;
    lh = (lh - mean) * s;
    ld = (ld - mean) * s;
    la = (la - mean) * s;

    let mx = lh.max(ld.max(la));
    let eh = (lh - mx).exp();
    let ed = (ld - mx).exp();
    let ea = (la - mx).exp();
    let den = (eh + ed + ea).max(1e-12);

    Prob3 {
        home: (eh / den).clamp(0.0, 1.0),
        draw: (ed / den).clamp(0.0, 1.0),
        away: (ea / den).clamp(0.0, 1.0),
    }
}

/// Grid-fits (scale, draw_bias) minimizing log loss over the sample.
pub fn fit_logit_calibration(predictions: &[Prob3], outcomes: &[Outcome]) -> (f64, f64, Metrics) {
    if predictions.is_empty() || outcomes.is_empty() || predictions.len() != outcomes.len() {
        return (1.0, 0.0, Metrics::empty());
    }

    let mut best_scale = 1.0;
    let mut best_draw_bias = 0.0;
    let mut best_metrics = evaluate_probs(predictions, outcomes);

    for scale_step in 35..=65 {
        let scale = scale_step as f64 / 50.0; // 0.70..1.30
        for draw_step in -30..=30 {
            let draw_bias = draw_step as f64 / 100.0; // -0.30..0.30
            let metrics = evaluate_calibrated(predictions, outcomes, scale, draw_bias);
            if metrics.log_loss < best_metrics.log_loss {
                best_metrics = metrics;
                best_scale = scale;
                best_draw_bias = draw_bias;
            }
        }
    }

    (best_scale, best_draw_bias, best_metrics)
}

pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let class_prob = p.for_class(class).clamp(0.0, 1.0);
        let idx = ((class_prob * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += class_prob;
        if *outcome == class {
            actual_sum[idx] += 1.0;
        }
    }

    let mut out = Vec::with_capacity(bins);
    for i in 0..bins {
        let start = i as f64 / bins as f64;
        let end = (i + 1) as f64 / bins as f64;
        let count = counts[i];
        let (avg_pred, actual_rate) = if count > 0 {
            (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
        } else {
            (0.0, 0.0)
        };
        out.push(CalibrationBin {
            bucket_start: start,
            bucket_end: end,
            count,
            avg_pred,
            actual_rate,
        });
    }
    out
}

pub fn argmax(p: Prob3) -> Outcome {
    if p.home >= p.draw && p.home >= p.away {
        Outcome::Home
    } else if p.draw >= p.away {
        Outcome::Draw
    } else {
        Outcome::Away
    }
}

fn one_hot(outcome: Outcome) -> Prob3 {
    match outcome {
        Outcome::Home => Prob3 {
            home: 1.0,
            draw: 0.0,
            away: 0.0,
        },
        Outcome::Draw => Prob3 {
            home: 0.0,
            draw: 1.0,
            away: 0.0,
        },
        Outcome::Away => Prob3 {
            home: 0.0,
            draw: 0.0,
            away: 1.0,
        },
    }
}

fn evaluate_calibrated(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    logit_scale: f64,
    draw_bias: f64,
) -> Metrics {
    let calibrated: Vec<Prob3> = predictions
        .iter()
        .copied()
        .map(|p| apply_logit_calibration(p, logit_scale, draw_bias))
        .collect();
    evaluate_probs(&calibrated, outcomes)
}

#[cfg(test)]
mod tests {
    use super::{
        Outcome, Prob3, apply_logit_calibration, argmax, calibration_bins,
        empirical_outcome_probs, evaluate_probs,
    };

    #[test]
    fn perfect_predictions_have_zero_brier() {
        let preds = vec![
            Prob3 {
                home: 1.0,
                draw: 0.0,
                away: 0.0,
            },
            Prob3 {
                home: 0.0,
                draw: 1.0,
                away: 0.0,
            },
            Prob3 {
                home: 0.0,
                draw: 0.0,
                away: 1.0,
            },
        ];
        let outcomes = vec![Outcome::Home, Outcome::Draw, Outcome::Away];
        let m = evaluate_probs(&preds, &outcomes);
        assert_eq!(m.samples, 3);
        assert!(m.brier < 1e-12);
        assert!((m.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn logit_calibration_keeps_distribution_normalized() {
        let p = Prob3 {
            home: 0.44,
            draw: 0.27,
            away: 0.29,
        };
        let q = apply_logit_calibration(p, 1.12, 0.08);
        let sum = q.home + q.draw + q.away;
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(q.home >= 0.0 && q.draw >= 0.0 && q.away >= 0.0);
    }

    #[test]
    fn outcome_conversions_round_trip() {
        assert_eq!(Outcome::from_goals(2, 0), Outcome::Home);
        assert_eq!(Outcome::from_goals(1, 1), Outcome::Draw);
        assert_eq!(Outcome::from_goals(0, 3), Outcome::Away);
        for outcome in [Outcome::Home, Outcome::Draw, Outcome::Away] {
            let label = outcome.as_char().to_string();
            assert_eq!(Outcome::from_label(&label), Some(outcome));
        }
        assert_eq!(Outcome::from_label("x"), None);
    }

    #[test]
    fn empirical_probs_match_base_rates() {
        let outcomes = vec![Outcome::Home, Outcome::Home, Outcome::Draw, Outcome::Away];
        let p = empirical_outcome_probs(&outcomes);
        assert!((p.home - 0.5).abs() < 1e-12);
        assert!((p.draw - 0.25).abs() < 1e-12);
        assert!((p.away - 0.25).abs() < 1e-12);
    }

    #[test]
    fn bins_count_every_sample_once() {
        let preds = vec![
            Prob3 {
                home: 0.15,
                draw: 0.25,
                away: 0.60,
            },
            Prob3 {
                home: 0.85,
                draw: 0.10,
                away: 0.05,
            },
            Prob3 {
                home: 0.50,
                draw: 0.30,
                away: 0.20,
            },
        ];
        let outcomes = vec![Outcome::Away, Outcome::Home, Outcome::Home];
        let bins = calibration_bins(&preds, &outcomes, Outcome::Home, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn argmax_breaks_ties_toward_home_then_draw() {
        assert_eq!(argmax(Prob3::uniform()), Outcome::Home);
        assert_eq!(
            argmax(Prob3 {
                home: 0.2,
                draw: 0.4,
                away: 0.4,
            }),
            Outcome::Draw
        );
    }
}
