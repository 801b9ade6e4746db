use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::calibration::{self, Outcome, Prob3};
use crate::params_store::app_cache_dir;

const REPORT_FILE: &str = "prediction.json";

/// Where the numbers came from. A simulated breakdown must never be shown as
/// a computed one; every consumer keys its labelling off this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Computed,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub home: String,
    pub away: String,
    /// Percentages at one decimal, summing to exactly 100.
    pub p_home: f64,
    pub p_draw: f64,
    pub p_away: f64,
    pub predicted: Outcome,
    pub source: ReportSource,
    pub generated_at: String,
}

impl PredictionReport {
    pub fn winner_label(&self) -> String {
        match self.predicted {
            Outcome::Home => self.home.clone(),
            Outcome::Draw => "Draw".to_string(),
            Outcome::Away => self.away.clone(),
        }
    }

    pub fn winning_pct(&self) -> f64 {
        match self.predicted {
            Outcome::Home => self.p_home,
            Outcome::Draw => self.p_draw,
            Outcome::Away => self.p_away,
        }
    }

    /// The step-by-step breakdown lines shared by the predict bin and the
    /// dashboard.
    pub fn breakdown_lines(&self) -> Vec<String> {
        vec![
            format!("Predicted Winner: {}", self.winner_label()),
            format!("Winning Chance: {:.1}%", self.winning_pct()),
            format!("Home Win ({}): {:.1}%", self.home, self.p_home),
            format!("Draw: {:.1}%", self.p_draw),
            format!("Away Win ({}): {:.1}%", self.away, self.p_away),
        ]
    }
}

/// Rounds to one decimal per class and pushes the rounding residue into the
/// draw cell so the three lines always add up to 100 on screen.
pub fn from_probs(
    home: &str,
    away: &str,
    probs: Prob3,
    source: ReportSource,
    generated_at: String,
) -> PredictionReport {
    let p_home = round1(probs.home * 100.0);
    let p_away = round1(probs.away * 100.0);
    let p_draw = 100.0 - p_home - p_away;

    PredictionReport {
        home: home.to_string(),
        away: away.to_string(),
        p_home,
        p_draw,
        p_away,
        predicted: calibration::argmax(probs),
        source,
        generated_at,
    }
}

/// Placeholder breakdown for when no computed report exists. Random but
/// normalized, and tagged so no layer can mistake it for the real thing.
pub fn simulated(home: &str, away: &str, rng: &mut impl Rng) -> PredictionReport {
    let raw: [f64; 3] = [rng.gen_range(0.05..1.0), rng.gen_range(0.05..1.0), rng.gen_range(0.05..1.0)];
    let total: f64 = raw.iter().sum();
    let probs = Prob3 {
        home: raw[0] / total,
        draw: raw[1] / total,
        away: raw[2] / total,
    };
    from_probs(
        home,
        away,
        probs,
        ReportSource::Simulated,
        chrono::Utc::now().to_rfc3339(),
    )
}

pub fn default_report_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(REPORT_FILE))
}

pub fn load_report(path: &Path) -> Result<PredictionReport> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read report {}", path.display()))?;
    serde_json::from_str::<PredictionReport>(&raw)
        .with_context(|| format!("invalid report json {}", path.display()))
}

pub fn save_report(path: &Path, report: &PredictionReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(&tmp, json).context("write report")?;
    fs::rename(&tmp, path).context("swap report")?;
    Ok(())
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::{PredictionReport, ReportSource, from_probs, simulated};
    use crate::calibration::{Outcome, Prob3};

    #[test]
    fn percentages_sum_to_exactly_one_hundred() {
        let probs = Prob3 {
            home: 0.417,
            draw: 0.266,
            away: 0.317,
        };
        let report = from_probs("Arsenal", "Man United", probs, ReportSource::Computed, "t".into());
        assert!((report.p_home + report.p_draw + report.p_away - 100.0).abs() < 1e-9);
        assert_eq!(report.predicted, Outcome::Home);
        assert_eq!(report.winner_label(), "Arsenal");
    }

    #[test]
    fn residue_lands_in_the_draw_cell() {
        // 1/3 each rounds to 33.3 + 33.3 = 66.6; draw picks up the rest.
        let report = from_probs("A", "B", Prob3::uniform(), ReportSource::Computed, "t".into());
        assert!((report.p_home - 33.3).abs() < 1e-9);
        assert!((report.p_away - 33.3).abs() < 1e-9);
        assert!((report.p_draw - 33.4).abs() < 1e-9);
    }

    #[test]
    fn simulated_reports_carry_the_tag() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let report = simulated("A", "B", &mut rng);
            assert_eq!(report.source, ReportSource::Simulated);
            assert!((report.p_home + report.p_draw + report.p_away - 100.0).abs() < 1e-9);
            assert!(report.p_home >= 0.0 && report.p_draw >= 0.0 && report.p_away >= 0.0);
        }
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = PredictionReport {
            home: "Arsenal".to_string(),
            away: "Man United".to_string(),
            p_home: 45.0,
            p_draw: 25.0,
            p_away: 30.0,
            predicted: Outcome::Home,
            source: ReportSource::Computed,
            generated_at: "2026-08-07T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"computed\""));
        let back: PredictionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn breakdown_lines_name_both_teams() {
        let report = from_probs(
            "Arsenal",
            "Man United",
            Prob3 {
                home: 0.77,
                draw: 0.03,
                away: 0.20,
            },
            ReportSource::Computed,
            "t".into(),
        );
        let lines = report.breakdown_lines();
        assert!(lines[0].contains("Arsenal"));
        assert!(lines.iter().any(|l| l.contains("Man United")));
    }
}
