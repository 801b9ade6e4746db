use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::calibration::Outcome;

#[derive(Debug, Clone, Copy)]
pub struct FeatureConfig {
    /// Rolling-form window: how many prior matches feed each form mean.
    pub window: usize,
    pub elo_k: f64,
    pub elo_base: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: 5,
            elo_k: 20.0,
            elo_base: 1500.0,
        }
    }
}

/// One historical match as handed to the engine. Optional fields default at
/// replay time (shots to 0, goals to 0 when a result label is present); the
/// odds columns only produce output when all three prices exist.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: Option<i32>,
    pub away_goals: Option<i32>,
    pub result: Option<Outcome>,
    pub home_shots: Option<f64>,
    pub away_shots: Option<f64>,
    pub home_sot: Option<f64>,
    pub away_sot: Option<f64>,
    pub odds_home: Option<f64>,
    pub odds_draw: Option<f64>,
    pub odds_away: Option<f64>,
}

/// Input row plus everything the replay knew immediately before (and right
/// after) the match. Rolling-form and rest fields stay `None` (never zero)
/// when a team lacks history; an early-season side must not look like a
/// zero-rest, zero-form one.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedMatchRecord {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: i32,
    pub away_goals: i32,
    pub result: Outcome,
    pub home_shots: f64,
    pub away_shots: f64,
    pub home_sot: f64,
    pub away_sot: f64,

    pub home_elo_pre: f64,
    pub away_elo_pre: f64,
    pub elo_home_post: f64,
    pub elo_away_post: f64,
    pub elo_diff: f64,

    pub home_points_last5: Option<f64>,
    pub away_points_last5: Option<f64>,
    pub home_goals_last5: Option<f64>,
    pub away_goals_last5: Option<f64>,
    pub home_shots_last5: Option<f64>,
    pub away_shots_last5: Option<f64>,
    pub home_sot_last5: Option<f64>,
    pub away_sot_last5: Option<f64>,

    pub days_rest_home: Option<i64>,
    pub days_rest_away: Option<i64>,
    pub rest_days_diff: Option<i64>,

    pub odds_home_prob: Option<f64>,
    pub odds_draw_prob: Option<f64>,
    pub odds_away_prob: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowDefect {
    #[error("home and away team are the same")]
    SameTeam,
    #[error("negative goal count")]
    NegativeGoals,
    #[error("no result label and no goals to derive one from")]
    MissingResult,
    #[error("result label contradicts the final score")]
    ResultMismatch,
}

/// A bad row rejects the whole batch: skipping it would corrupt every later
/// Elo and form value for the teams involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no match rows to process")]
    EmptyInput,
    #[error("match {date} {home} vs {away}: {defect}")]
    BadRow {
        date: NaiveDate,
        home: String,
        away: String,
        defect: RowDefect,
    },
}

/// One finished match from a single team's perspective.
#[derive(Debug, Clone, Copy)]
pub struct TeamForm {
    pub points: f64,
    pub goals_for: f64,
    pub goals_against: f64,
    pub shots: f64,
    pub shots_on_target: f64,
}

#[derive(Debug, Clone)]
pub struct TeamState {
    pub elo: f64,
    /// Most-recent-last; only the trailing window is ever read.
    pub recent: Vec<TeamForm>,
    pub last_played: Option<NaiveDate>,
}

impl TeamState {
    fn new(elo_base: f64) -> Self {
        Self {
            elo: elo_base,
            recent: Vec::new(),
            last_played: None,
        }
    }

    /// Mean of `pick` over the trailing `window` entries, or `None` when the
    /// team has played fewer than `window` matches.
    pub fn rolling_mean(&self, window: usize, pick: impl Fn(&TeamForm) -> f64) -> Option<f64> {
        if window == 0 || self.recent.len() < window {
            return None;
        }
        let tail = &self.recent[self.recent.len() - window..];
        Some(tail.iter().map(&pick).sum::<f64>() / window as f64)
    }

    pub fn days_rest(&self, kickoff: NaiveDate) -> Option<i64> {
        self.last_played.map(|d| (kickoff - d).num_days())
    }
}

/// End-of-history team states from one replay. Owned by the caller; nothing
/// here outlives or is shared across engine invocations.
#[derive(Debug)]
pub struct TeamStates {
    window: usize,
    teams: HashMap<String, TeamState>,
}

#[derive(Debug, Clone, Copy)]
pub struct PrematchSnapshot {
    pub elo: f64,
    pub points_avg: Option<f64>,
    pub goals_avg: Option<f64>,
    pub shots_avg: Option<f64>,
    pub sot_avg: Option<f64>,
    pub days_rest: Option<i64>,
}

impl TeamStates {
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// What the engine would snapshot for `team` if it kicked off on
    /// `kickoff`. `None` when the team never appeared in the replayed data.
    pub fn prematch(&self, team: &str, kickoff: NaiveDate) -> Option<PrematchSnapshot> {
        let state = self.teams.get(team)?;
        Some(PrematchSnapshot {
            elo: state.elo,
            points_avg: state.rolling_mean(self.window, |f| f.points),
            goals_avg: state.rolling_mean(self.window, |f| f.goals_for),
            shots_avg: state.rolling_mean(self.window, |f| f.shots),
            sot_avg: state.rolling_mean(self.window, |f| f.shots_on_target),
            days_rest: state.days_rest(kickoff),
        })
    }
}

/// Logistic expected score for a rated side against an opponent.
pub fn expected_score(r_a: f64, r_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-(r_a - r_b) / 400.0))
}

/// Bookmaker prices to overround-free probabilities. All three prices must be
/// present and positive; anything else counts as "no odds".
pub fn normalized_odds_probs(
    home: Option<f64>,
    draw: Option<f64>,
    away: Option<f64>,
) -> Option<(f64, f64, f64)> {
    let (h, d, a) = (home?, draw?, away?);
    if h <= 0.0 || d <= 0.0 || a <= 0.0 {
        return None;
    }
    let (rh, rd, ra) = (1.0 / h, 1.0 / d, 1.0 / a);
    let total = rh + rd + ra;
    Some((rh / total, rd / total, ra / total))
}

/// Replays `matches` in chronological order (stable on same-date ties) and
/// returns one enriched record per input row, in the original input order.
/// Every feature is strictly pre-match except the explicit `_post` Elo
/// fields; team state mutates exactly once per match per side, after its
/// snapshot has been taken.
pub fn compute_features(
    matches: &[MatchRecord],
    cfg: &FeatureConfig,
) -> Result<Vec<EnrichedMatchRecord>, ValidationError> {
    run_replay(matches, cfg).map(|(rows, _)| rows)
}

/// Same replay, returning the end-of-history team states instead of the
/// per-match rows. Used to build the pre-match snapshot for an upcoming
/// fixture.
pub fn replay_states(
    matches: &[MatchRecord],
    cfg: &FeatureConfig,
) -> Result<TeamStates, ValidationError> {
    run_replay(matches, cfg).map(|(_, states)| states)
}

struct ResolvedRow {
    date: NaiveDate,
    home_team: String,
    away_team: String,
    home_goals: i32,
    away_goals: i32,
    result: Outcome,
    home_shots: f64,
    away_shots: f64,
    home_sot: f64,
    away_sot: f64,
    odds: Option<(f64, f64, f64)>,
}

struct SideSnapshot {
    elo: f64,
    points: Option<f64>,
    goals: Option<f64>,
    shots: Option<f64>,
    sot: Option<f64>,
    rest: Option<i64>,
}

fn run_replay(
    matches: &[MatchRecord],
    cfg: &FeatureConfig,
) -> Result<(Vec<EnrichedMatchRecord>, TeamStates), ValidationError> {
    if matches.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let resolved = matches
        .iter()
        .map(validate_row)
        .collect::<Result<Vec<_>, _>>()?;

    // Chronological total order; sort_by_key is stable, so same-date rows
    // keep their input order.
    let mut order: Vec<usize> = (0..resolved.len()).collect();
    order.sort_by_key(|&idx| resolved[idx].date);

    let mut states = TeamStates {
        window: cfg.window,
        teams: HashMap::new(),
    };

    let mut enriched: Vec<(usize, EnrichedMatchRecord)> = Vec::with_capacity(resolved.len());
    for &idx in &order {
        let row = &resolved[idx];

        // Read phase: both snapshots are taken before either side mutates.
        let home_pre = snapshot_side(&mut states, &row.home_team, row.date, cfg);
        let away_pre = snapshot_side(&mut states, &row.away_team, row.date, cfg);

        let exp_home = expected_score(home_pre.elo, away_pre.elo);
        let delta = cfg.elo_k * (row.result.home_score() - exp_home);
        let elo_home_post = home_pre.elo + delta;
        let elo_away_post = away_pre.elo - delta;

        apply_result(
            &mut states,
            &row.home_team,
            elo_home_post,
            row.date,
            TeamForm {
                points: row.result.home_points(),
                goals_for: row.home_goals as f64,
                goals_against: row.away_goals as f64,
                shots: row.home_shots,
                shots_on_target: row.home_sot,
            },
            cfg,
        );
        apply_result(
            &mut states,
            &row.away_team,
            elo_away_post,
            row.date,
            TeamForm {
                points: row.result.away_points(),
                goals_for: row.away_goals as f64,
                goals_against: row.home_goals as f64,
                shots: row.away_shots,
                shots_on_target: row.away_sot,
            },
            cfg,
        );

        enriched.push((
            idx,
            EnrichedMatchRecord {
                date: row.date,
                home_team: row.home_team.clone(),
                away_team: row.away_team.clone(),
                home_goals: row.home_goals,
                away_goals: row.away_goals,
                result: row.result,
                home_shots: row.home_shots,
                away_shots: row.away_shots,
                home_sot: row.home_sot,
                away_sot: row.away_sot,
                home_elo_pre: home_pre.elo,
                away_elo_pre: away_pre.elo,
                elo_home_post,
                elo_away_post,
                elo_diff: elo_home_post - elo_away_post,
                home_points_last5: home_pre.points,
                away_points_last5: away_pre.points,
                home_goals_last5: home_pre.goals,
                away_goals_last5: away_pre.goals,
                home_shots_last5: home_pre.shots,
                away_shots_last5: away_pre.shots,
                home_sot_last5: home_pre.sot,
                away_sot_last5: away_pre.sot,
                days_rest_home: home_pre.rest,
                days_rest_away: away_pre.rest,
                rest_days_diff: match (home_pre.rest, away_pre.rest) {
                    (Some(h), Some(a)) => Some(h - a),
                    _ => None,
                },
                odds_home_prob: row.odds.map(|(h, _, _)| h),
                odds_draw_prob: row.odds.map(|(_, d, _)| d),
                odds_away_prob: row.odds.map(|(_, _, a)| a),
            },
        ));
    }

    // Hand rows back in the original input order.
    enriched.sort_by_key(|(idx, _)| *idx);
    let rows = enriched.into_iter().map(|(_, rec)| rec).collect();
    Ok((rows, states))
}

fn validate_row(m: &MatchRecord) -> Result<ResolvedRow, ValidationError> {
    let bad = |defect: RowDefect| ValidationError::BadRow {
        date: m.date,
        home: m.home_team.clone(),
        away: m.away_team.clone(),
        defect,
    };

    if m.home_team == m.away_team {
        return Err(bad(RowDefect::SameTeam));
    }
    if m.home_goals.is_some_and(|g| g < 0) || m.away_goals.is_some_and(|g| g < 0) {
        return Err(bad(RowDefect::NegativeGoals));
    }

    let derived = match (m.home_goals, m.away_goals) {
        (Some(h), Some(a)) => Some(Outcome::from_goals(h, a)),
        _ => None,
    };
    let result = match (m.result, derived) {
        (Some(label), Some(from_goals)) if label != from_goals => {
            return Err(bad(RowDefect::ResultMismatch));
        }
        (Some(label), _) => label,
        (None, Some(from_goals)) => from_goals,
        (None, None) => return Err(bad(RowDefect::MissingResult)),
    };

    Ok(ResolvedRow {
        date: m.date,
        home_team: m.home_team.clone(),
        away_team: m.away_team.clone(),
        home_goals: m.home_goals.unwrap_or(0),
        away_goals: m.away_goals.unwrap_or(0),
        result,
        home_shots: m.home_shots.unwrap_or(0.0),
        away_shots: m.away_shots.unwrap_or(0.0),
        home_sot: m.home_sot.unwrap_or(0.0),
        away_sot: m.away_sot.unwrap_or(0.0),
        odds: normalized_odds_probs(m.odds_home, m.odds_draw, m.odds_away),
    })
}

fn snapshot_side(
    states: &mut TeamStates,
    team: &str,
    kickoff: NaiveDate,
    cfg: &FeatureConfig,
) -> SideSnapshot {
    let state = states
        .teams
        .entry(team.to_string())
        .or_insert_with(|| TeamState::new(cfg.elo_base));
    SideSnapshot {
        elo: state.elo,
        points: state.rolling_mean(cfg.window, |f| f.points),
        goals: state.rolling_mean(cfg.window, |f| f.goals_for),
        shots: state.rolling_mean(cfg.window, |f| f.shots),
        sot: state.rolling_mean(cfg.window, |f| f.shots_on_target),
        rest: state.days_rest(kickoff),
    }
}

fn apply_result(
    states: &mut TeamStates,
    team: &str,
    elo_post: f64,
    date: NaiveDate,
    form: TeamForm,
    cfg: &FeatureConfig,
) {
    let state = states
        .teams
        .entry(team.to_string())
        .or_insert_with(|| TeamState::new(cfg.elo_base));
    state.elo = elo_post;
    state.last_played = Some(date);
    state.recent.push(form);
}
