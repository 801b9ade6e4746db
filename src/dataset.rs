use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::calibration::Outcome;
use crate::features::{EnrichedMatchRecord, MatchRecord};
use crate::params_store::app_cache_dir;

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub files_total: usize,
    pub files_succeeded: usize,
    pub rows_upserted: usize,
    pub errors: Vec<String>,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("matches.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_date TEXT NOT NULL,
            season TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            result TEXT NULL,
            home_shots REAL NULL,
            away_shots REAL NULL,
            home_sot REAL NULL,
            away_sot REAL NULL,
            odds_home REAL NULL,
            odds_draw REAL NULL,
            odds_away REAL NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (match_date, home_team, away_team)
        );
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            files_total INTEGER NOT NULL,
            files_succeeded INTEGER NOT NULL,
            rows_upserted INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS features (
            match_date TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_goals INTEGER NOT NULL,
            away_goals INTEGER NOT NULL,
            result TEXT NOT NULL,
            home_shots REAL NOT NULL,
            away_shots REAL NOT NULL,
            home_sot REAL NOT NULL,
            away_sot REAL NOT NULL,
            home_elo_pre REAL NOT NULL,
            away_elo_pre REAL NOT NULL,
            elo_home_post REAL NOT NULL,
            elo_away_post REAL NOT NULL,
            elo_diff REAL NOT NULL,
            home_points_last5 REAL NULL,
            away_points_last5 REAL NULL,
            home_goals_last5 REAL NULL,
            away_goals_last5 REAL NULL,
            home_shots_last5 REAL NULL,
            away_shots_last5 REAL NULL,
            home_sot_last5 REAL NULL,
            away_sot_last5 REAL NULL,
            days_rest_home INTEGER NULL,
            days_rest_away INTEGER NULL,
            rest_days_diff INTEGER NULL,
            odds_home_prob REAL NULL,
            odds_draw_prob REAL NULL,
            odds_away_prob REAL NULL,
            computed_at TEXT NOT NULL,
            PRIMARY KEY (match_date, home_team, away_team)
        );
        CREATE INDEX IF NOT EXISTS idx_features_date ON features(match_date);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Combines every `*.csv` season file under `dir` into the matches table.
/// A file that fails to parse is recorded and skipped; rows from the files
/// that do parse are upserted in one transaction per file.
pub fn ingest_dir(conn: &mut Connection, db_path: PathBuf, dir: &Path) -> Result<IngestSummary> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read data dir {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(anyhow!("no csv files found in {}", dir.display()));
    }

    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, files_total, files_succeeded, rows_upserted, errors_json)
         VALUES (?1, NULL, ?2, 0, 0, '[]')",
        params![started_at, files.len() as i64],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    let mut files_succeeded = 0usize;
    let mut rows_upserted = 0usize;
    let mut errors: Vec<String> = Vec::new();

    for file in &files {
        let season = season_from_path(file);
        match parse_season_file(file) {
            Ok(parsed) => {
                let tx = conn.transaction().context("begin ingest transaction")?;
                for row in &parsed.rows {
                    upsert_match(&tx, &season, row)?;
                    rows_upserted += 1;
                }
                tx.commit().context("commit ingest transaction")?;
                files_succeeded += 1;
                for skipped in parsed.skipped {
                    errors.push(format!("{}: {skipped}", file.display()));
                }
            }
            Err(err) => {
                errors.push(format!("{}: {err}", file.display()));
            }
        }
    }

    let finished_at = Utc::now().to_rfc3339();
    let errors_json = serde_json::to_string(&errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, files_succeeded = ?2, rows_upserted = ?3, errors_json = ?4
         WHERE run_id = ?5",
        params![
            finished_at,
            files_succeeded as i64,
            rows_upserted as i64,
            errors_json,
            run_id
        ],
    )
    .context("update ingest run")?;

    Ok(IngestSummary {
        db_path,
        files_total: files.len(),
        files_succeeded,
        rows_upserted,
        errors,
    })
}

pub fn load_matches(conn: &Connection) -> Result<Vec<MatchRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                match_date, home_team, away_team,
                home_goals, away_goals, result,
                home_shots, away_shots, home_sot, away_sot,
                odds_home, odds_draw, odds_away
            FROM matches
            ORDER BY match_date ASC, rowid ASC
            "#,
        )
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i32>>(3)?,
                row.get::<_, Option<i32>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<f64>>(6)?,
                row.get::<_, Option<f64>>(7)?,
                row.get::<_, Option<f64>>(8)?,
                row.get::<_, Option<f64>>(9)?,
                row.get::<_, Option<f64>>(10)?,
                row.get::<_, Option<f64>>(11)?,
                row.get::<_, Option<f64>>(12)?,
            ))
        })
        .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        let (
            raw_date,
            home_team,
            away_team,
            home_goals,
            away_goals,
            result,
            home_shots,
            away_shots,
            home_sot,
            away_sot,
            odds_home,
            odds_draw,
            odds_away,
        ) = row.context("decode match row")?;
        let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
            .with_context(|| format!("bad stored match_date {raw_date}"))?;
        out.push(MatchRecord {
            date,
            home_team,
            away_team,
            home_goals,
            away_goals,
            result: result.as_deref().and_then(Outcome::from_label),
            home_shots,
            away_shots,
            home_sot,
            away_sot,
            odds_home,
            odds_draw,
            odds_away,
        });
    }
    Ok(out)
}

/// Replaces the stored feature rows. Optional fields land as SQL NULL so a
/// later reader still sees "undefined", not zero.
pub fn save_features(conn: &mut Connection, rows: &[EnrichedMatchRecord]) -> Result<usize> {
    let computed_at = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin features transaction")?;
    tx.execute("DELETE FROM features", [])
        .context("clear features table")?;
    for row in rows {
        tx.execute(
            r#"
            INSERT INTO features (
                match_date, home_team, away_team,
                home_goals, away_goals, result,
                home_shots, away_shots, home_sot, away_sot,
                home_elo_pre, away_elo_pre, elo_home_post, elo_away_post, elo_diff,
                home_points_last5, away_points_last5,
                home_goals_last5, away_goals_last5,
                home_shots_last5, away_shots_last5,
                home_sot_last5, away_sot_last5,
                days_rest_home, days_rest_away, rest_days_diff,
                odds_home_prob, odds_draw_prob, odds_away_prob,
                computed_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23,
                ?24, ?25, ?26, ?27, ?28, ?29, ?30
            )
            "#,
            params![
                row.date.format("%Y-%m-%d").to_string(),
                row.home_team,
                row.away_team,
                row.home_goals,
                row.away_goals,
                row.result.as_char().to_string(),
                row.home_shots,
                row.away_shots,
                row.home_sot,
                row.away_sot,
                row.home_elo_pre,
                row.away_elo_pre,
                row.elo_home_post,
                row.elo_away_post,
                row.elo_diff,
                row.home_points_last5,
                row.away_points_last5,
                row.home_goals_last5,
                row.away_goals_last5,
                row.home_shots_last5,
                row.away_shots_last5,
                row.home_sot_last5,
                row.away_sot_last5,
                row.days_rest_home,
                row.days_rest_away,
                row.rest_days_diff,
                row.odds_home_prob,
                row.odds_draw_prob,
                row.odds_away_prob,
                computed_at,
            ],
        )
        .context("insert feature row")?;
    }
    tx.commit().context("commit features transaction")?;
    Ok(rows.len())
}

pub fn load_features(conn: &Connection) -> Result<Vec<EnrichedMatchRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                match_date, home_team, away_team,
                home_goals, away_goals, result,
                home_shots, away_shots, home_sot, away_sot,
                home_elo_pre, away_elo_pre, elo_home_post, elo_away_post, elo_diff,
                home_points_last5, away_points_last5,
                home_goals_last5, away_goals_last5,
                home_shots_last5, away_shots_last5,
                home_sot_last5, away_sot_last5,
                days_rest_home, days_rest_away, rest_days_diff,
                odds_home_prob, odds_draw_prob, odds_away_prob
            FROM features
            ORDER BY match_date ASC, rowid ASC
            "#,
        )
        .context("prepare load features query")?;

    let mut out = Vec::new();
    let mut rows = stmt.query([]).context("query load features")?;
    while let Some(row) = rows.next().context("read feature row")? {
        let raw_date: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
            .with_context(|| format!("bad stored match_date {raw_date}"))?;
        let raw_result: String = row.get(5)?;
        let result = Outcome::from_label(&raw_result)
            .ok_or_else(|| anyhow!("bad stored result label {raw_result}"))?;
        out.push(EnrichedMatchRecord {
            date,
            home_team: row.get(1)?,
            away_team: row.get(2)?,
            home_goals: row.get(3)?,
            away_goals: row.get(4)?,
            result,
            home_shots: row.get(6)?,
            away_shots: row.get(7)?,
            home_sot: row.get(8)?,
            away_sot: row.get(9)?,
            home_elo_pre: row.get(10)?,
            away_elo_pre: row.get(11)?,
            elo_home_post: row.get(12)?,
            elo_away_post: row.get(13)?,
            elo_diff: row.get(14)?,
            home_points_last5: row.get(15)?,
            away_points_last5: row.get(16)?,
            home_goals_last5: row.get(17)?,
            away_goals_last5: row.get(18)?,
            home_shots_last5: row.get(19)?,
            away_shots_last5: row.get(20)?,
            home_sot_last5: row.get(21)?,
            away_sot_last5: row.get(22)?,
            days_rest_home: row.get(23)?,
            days_rest_away: row.get(24)?,
            rest_days_diff: row.get(25)?,
            odds_home_prob: row.get(26)?,
            odds_draw_prob: row.get(27)?,
            odds_away_prob: row.get(28)?,
        });
    }
    Ok(out)
}

fn upsert_match(tx: &rusqlite::Transaction<'_>, season: &str, m: &MatchRecord) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO matches (
            match_date, season, home_team, away_team,
            home_goals, away_goals, result,
            home_shots, away_shots, home_sot, away_sot,
            odds_home, odds_draw, odds_away, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(match_date, home_team, away_team) DO UPDATE SET
            season = excluded.season,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            result = excluded.result,
            home_shots = excluded.home_shots,
            away_shots = excluded.away_shots,
            home_sot = excluded.home_sot,
            away_sot = excluded.away_sot,
            odds_home = excluded.odds_home,
            odds_draw = excluded.odds_draw,
            odds_away = excluded.odds_away,
            updated_at = excluded.updated_at
        "#,
        params![
            m.date.format("%Y-%m-%d").to_string(),
            season,
            m.home_team,
            m.away_team,
            m.home_goals,
            m.away_goals,
            m.result.map(|r| r.as_char().to_string()),
            m.home_shots,
            m.away_shots,
            m.home_sot,
            m.away_sot,
            m.odds_home,
            m.odds_draw,
            m.odds_away,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert match")?;
    Ok(())
}

#[derive(Debug)]
pub struct ParsedSeason {
    pub rows: Vec<MatchRecord>,
    /// Row-level problems that did not fail the file (blank teams, bad date).
    pub skipped: Vec<String>,
}

pub fn parse_season_file(path: &Path) -> Result<ParsedSeason> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read season csv {}", path.display()))?;
    parse_season_records(&raw)
}

/// Parses one season CSV. Column names are a binding detail: the usual
/// football-data headers and their spelled-out variants both resolve.
pub fn parse_season_records(raw: &str) -> Result<ParsedSeason> {
    let mut lines = raw.lines();
    let header_line = lines.next().ok_or_else(|| anyhow!("empty csv"))?;
    let header = split_csv_line(header_line);
    let columns = HeaderMap::resolve(&header)?;

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cells = split_csv_line(line);
        match columns.parse_row(&cells) {
            Ok(Some(record)) => rows.push(record),
            Ok(None) => {}
            Err(err) => skipped.push(format!("line {}: {err}", line_no + 2)),
        }
    }
    Ok(ParsedSeason { rows, skipped })
}

struct HeaderMap {
    date: usize,
    home: usize,
    away: usize,
    home_goals: Option<usize>,
    away_goals: Option<usize>,
    result: Option<usize>,
    home_shots: Option<usize>,
    away_shots: Option<usize>,
    home_sot: Option<usize>,
    away_sot: Option<usize>,
    odds_home: Option<usize>,
    odds_draw: Option<usize>,
    odds_away: Option<usize>,
}

impl HeaderMap {
    fn resolve(header: &[String]) -> Result<Self> {
        let lower: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |names: &[&str]| -> Option<usize> {
            lower
                .iter()
                .position(|column| names.iter().any(|n| column == n))
        };

        let date = find(&["date"]).ok_or_else(|| anyhow!("missing Date column"))?;
        let home =
            find(&["hometeam", "home team", "home"]).ok_or_else(|| anyhow!("missing HomeTeam column"))?;
        let away =
            find(&["awayteam", "away team", "away"]).ok_or_else(|| anyhow!("missing AwayTeam column"))?;

        Ok(Self {
            date,
            home,
            away,
            home_goals: find(&["fthg", "homegoals", "home_goals"]),
            away_goals: find(&["ftag", "awaygoals", "away_goals"]),
            result: find(&["ftr", "result", "res"]),
            home_shots: find(&["hs", "shotshome", "home_shots"]),
            away_shots: find(&["as", "shotsaway", "away_shots"]),
            home_sot: find(&["hst", "shotsontargethome", "home_sot"]),
            away_sot: find(&["ast", "shotsontargetaway", "away_sot"]),
            odds_home: find(&["b365h", "oddshome", "odds_home"]),
            odds_draw: find(&["b365d", "oddsdraw", "odds_draw"]),
            odds_away: find(&["b365a", "oddsaway", "odds_away"]),
        })
    }

    fn parse_row(&self, cells: &[String]) -> Result<Option<MatchRecord>> {
        let cell = |idx: usize| cells.get(idx).map(|s| s.trim()).unwrap_or("");
        let opt_cell = |idx: Option<usize>| idx.map(cell).filter(|s| !s.is_empty());

        let home_team = cell(self.home).to_string();
        let away_team = cell(self.away).to_string();
        let raw_date = cell(self.date);
        if home_team.is_empty() && away_team.is_empty() && raw_date.is_empty() {
            // Trailing filler row; football-data files often end with these.
            return Ok(None);
        }
        if home_team.is_empty() || away_team.is_empty() {
            return Err(anyhow!("missing team name"));
        }
        let date = parse_date(raw_date).ok_or_else(|| anyhow!("unparseable date {raw_date:?}"))?;

        let parse_i32 = |idx: Option<usize>| -> Result<Option<i32>> {
            match opt_cell(idx) {
                Some(s) => Ok(Some(
                    s.parse::<f64>()
                        .map(|v| v as i32)
                        .with_context(|| format!("bad integer {s:?}"))?,
                )),
                None => Ok(None),
            }
        };
        let parse_f64 = |idx: Option<usize>| -> Result<Option<f64>> {
            match opt_cell(idx) {
                Some(s) => Ok(Some(
                    s.parse::<f64>().with_context(|| format!("bad number {s:?}"))?,
                )),
                None => Ok(None),
            }
        };

        Ok(Some(MatchRecord {
            date,
            home_team,
            away_team,
            home_goals: parse_i32(self.home_goals)?,
            away_goals: parse_i32(self.away_goals)?,
            result: opt_cell(self.result).and_then(Outcome::from_label),
            home_shots: parse_f64(self.home_shots)?,
            away_shots: parse_f64(self.away_shots)?,
            home_sot: parse_f64(self.home_sot)?,
            away_sot: parse_f64(self.away_sot)?,
            odds_home: parse_f64(self.odds_home)?,
            odds_draw: parse_f64(self.odds_draw)?,
            odds_away: parse_f64(self.odds_away)?,
        }))
    }
}

/// Day-first formats first: the source files write 17/08/2024.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in ["%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(ch),
        }
    }
    out.push(cur.trim().to_string());
    out
}

fn season_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Collects the HashMap of teams seen in the dataset; handy for bins that
/// want to validate user-supplied team names before predicting.
pub fn team_names(matches: &[MatchRecord]) -> HashMap<String, usize> {
    let mut out: HashMap<String, usize> = HashMap::new();
    for m in matches {
        *out.entry(m.home_team.clone()).or_insert(0) += 1;
        *out.entry(m.away_team.clone()).or_insert(0) += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusqlite::Connection;

    use super::{
        init_schema, load_features, load_matches, parse_date, parse_season_records, save_features,
        split_csv_line, upsert_match,
    };
    use crate::calibration::Outcome;
    use crate::features::{FeatureConfig, compute_features};

    const SAMPLE: &str = "\
Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR,HS,AS,HST,AST,B365H,B365D,B365A
17/08/2024,Arsenal,Wolves,2,0,H,18,6,8,2,1.30,5.50,9.00
24/08/2024,Aston Villa,Arsenal,0,2,A,9,15,3,7,4.20,3.60,1.85
";

    #[test]
    fn split_csv_line_handles_quotes() {
        assert_eq!(split_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(
            split_csv_line("\"Nott'm, Forest\",1, 2"),
            vec!["Nott'm, Forest", "1", "2"]
        );
        assert_eq!(split_csv_line(""), vec![""]);
    }

    #[test]
    fn parse_date_accepts_dayfirst_and_iso() {
        let want = NaiveDate::from_ymd_opt(2024, 8, 17).unwrap();
        assert_eq!(parse_date("17/08/2024"), Some(want));
        assert_eq!(parse_date("17/08/24"), Some(want));
        assert_eq!(parse_date("2024-08-17"), Some(want));
        assert_eq!(parse_date("August 17"), None);
    }

    #[test]
    fn season_csv_parses_into_match_records() {
        let parsed = parse_season_records(SAMPLE).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert!(parsed.skipped.is_empty());
        let first = &parsed.rows[0];
        assert_eq!(first.home_team, "Arsenal");
        assert_eq!(first.home_goals, Some(2));
        assert_eq!(first.result, Some(Outcome::Home));
        assert_eq!(first.home_shots, Some(18.0));
        assert_eq!(first.odds_draw, Some(5.50));
    }

    #[test]
    fn renamed_headers_resolve_too() {
        let raw = "\
Date,HomeTeam,AwayTeam,HomeGoals,AwayGoals,Result
2024-08-17,A,B,1,1,D
";
        let parsed = parse_season_records(raw).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].result, Some(Outcome::Draw));
    }

    #[test]
    fn bad_rows_are_skipped_with_reasons() {
        let raw = "\
Date,HomeTeam,AwayTeam,FTHG,FTAG
someday,A,B,1,0
17/08/2024,,B,1,0
17/08/2024,A,B,1,0
";
        let parsed = parse_season_records(raw).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.skipped.len(), 2);
    }

    #[test]
    fn matches_round_trip_through_sqlite_in_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let parsed = parse_season_records(SAMPLE).unwrap();
        let tx = conn.transaction().unwrap();
        // Insert out of order; the load query sorts by date.
        for row in parsed.rows.iter().rev() {
            upsert_match(&tx, "2024-25", row).unwrap();
        }
        tx.commit().unwrap();

        let loaded = load_matches(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].date < loaded[1].date);
        assert_eq!(loaded[0].home_team, "Arsenal");
        assert_eq!(loaded[1].result, Some(Outcome::Away));
    }

    #[test]
    fn features_round_trip_preserves_null_vs_zero() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let parsed = parse_season_records(SAMPLE).unwrap();
        let rows = compute_features(&parsed.rows, &FeatureConfig::default()).unwrap();
        assert!(rows[0].home_points_last5.is_none());

        save_features(&mut conn, &rows).unwrap();
        let loaded = load_features(&conn).unwrap();
        assert_eq!(loaded.len(), rows.len());
        assert_eq!(loaded, rows);
        assert!(loaded[0].home_points_last5.is_none());
        assert!(loaded[0].odds_home_prob.is_some());
    }
}
