use std::collections::VecDeque;
use std::path::PathBuf;

use rand::rngs::ThreadRng;

use crate::report::{self, PredictionReport, ReportSource};

pub const PLACEHOLDER_HOME: &str = "ALPHA";
pub const PLACEHOLDER_AWAY: &str = "OMEGA";

#[derive(Debug, Clone)]
pub struct AppState {
    pub report_path: PathBuf,
    pub report: Option<PredictionReport>,
    /// Forces the simulated breakdown even when a computed report exists.
    pub placeholder_enabled: bool,
    pub simulated: Option<PredictionReport>,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(report_path: PathBuf) -> Self {
        Self {
            report_path,
            report: None,
            placeholder_enabled: false,
            simulated: None,
            logs: VecDeque::with_capacity(200),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Re-reads the report file. A missing or unreadable file leaves the
    /// dashboard in placeholder territory rather than showing stale numbers
    /// as fresh.
    pub fn reload_report(&mut self) {
        match report::load_report(&self.report_path) {
            Ok(loaded) => {
                self.push_log(format!(
                    "[INFO] Loaded {} report from {} (generated {})",
                    source_label(loaded.source),
                    self.report_path.display(),
                    loaded.generated_at
                ));
                self.report = Some(loaded);
            }
            Err(err) => {
                self.push_log(format!("[WARN] No prediction report: {err}"));
                self.report = None;
            }
        }
    }

    pub fn toggle_placeholder(&mut self, rng: &mut ThreadRng) {
        self.placeholder_enabled = !self.placeholder_enabled;
        if self.placeholder_enabled {
            self.simulated = Some(report::simulated(PLACEHOLDER_HOME, PLACEHOLDER_AWAY, rng));
            self.push_log("[INFO] Placeholder mode on (simulated data)");
        } else {
            self.push_log("[INFO] Placeholder mode off");
        }
    }

    /// What the screen should render right now. Falls back to a simulated
    /// breakdown when no computed report exists; the caller labels it off
    /// `report.source`, never off anything else.
    pub fn display_report(&mut self, rng: &mut ThreadRng) -> PredictionReport {
        if !self.placeholder_enabled
            && let Some(report) = &self.report
        {
            return report.clone();
        }
        if self.simulated.is_none() {
            self.simulated = Some(report::simulated(PLACEHOLDER_HOME, PLACEHOLDER_AWAY, rng));
            if !self.placeholder_enabled {
                self.push_log("[WARN] Showing simulated data until a report is computed");
            }
        }
        match &self.simulated {
            Some(sim) => sim.clone(),
            None => report::simulated(PLACEHOLDER_HOME, PLACEHOLDER_AWAY, rng),
        }
    }
}

pub fn source_label(source: ReportSource) -> &'static str {
    match source {
        ReportSource::Computed => "COMPUTED",
        ReportSource::Simulated => "SIMULATED",
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{AppState, source_label};
    use crate::report::ReportSource;

    #[test]
    fn log_buffer_is_bounded() {
        let mut state = AppState::new(PathBuf::from("/nonexistent/prediction.json"));
        for i in 0..500 {
            state.push_log(format!("line {i}"));
        }
        assert_eq!(state.logs.len(), 200);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 300"));
    }

    #[test]
    fn missing_report_falls_back_to_simulated() {
        let mut state = AppState::new(PathBuf::from("/nonexistent/prediction.json"));
        state.reload_report();
        assert!(state.report.is_none());

        let mut rng = rand::thread_rng();
        let shown = state.display_report(&mut rng);
        assert_eq!(shown.source, ReportSource::Simulated);
        assert_eq!(source_label(shown.source), "SIMULATED");
    }

    #[test]
    fn placeholder_toggle_generates_fresh_simulation() {
        let mut state = AppState::new(PathBuf::from("/nonexistent/prediction.json"));
        let mut rng = rand::thread_rng();
        state.toggle_placeholder(&mut rng);
        assert!(state.placeholder_enabled);
        assert!(state.simulated.is_some());
        state.toggle_placeholder(&mut rng);
        assert!(!state.placeholder_enabled);
    }
}
