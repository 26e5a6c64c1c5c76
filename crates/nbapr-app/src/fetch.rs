// nba.com stats client (leaguedashplayerstats endpoint).
//
// Only the query used by the simulator is implemented: league-wide base
// player stats for one regular season.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::stats::{PlayerStats, RawPlayerStats};

const STATS_URL: &str = "https://stats.nba.com/stats/leaguedashplayerstats";

/// Browser-like headers; the endpoint rejects bare clients.
const HEADERS: &[(&str, &str)] = &[
    ("authority", "stats.nba.com"),
    ("accept", "application/json, text/plain, */*"),
    ("x-nba-stats-token", "true"),
    ("dnt", "1"),
    ("user-agent", "Mozilla/5.0 (X11; Linux x86_64)"),
    ("x-nba-stats-origin", "stats"),
    ("origin", "https://www.nba.com"),
    ("sec-fetch-site", "same-site"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-dest", "empty"),
    ("referer", "https://www.nba.com/"),
    ("accept-language", "en-US,en;q=0.9"),
];

/// Query parameters that never vary.
const FIXED_PARAMS: &[(&str, &str)] = &[
    ("College", ""),
    ("Conference", ""),
    ("Country", ""),
    ("DateTo", ""),
    ("Division", ""),
    ("DraftPick", ""),
    ("DraftYear", ""),
    ("GameScope", ""),
    ("GameSegment", ""),
    ("Height", ""),
    ("LeagueID", "00"),
    ("Location", ""),
    ("MeasureType", "Base"),
    ("Month", "0"),
    ("OpponentTeamID", "0"),
    ("Outcome", ""),
    ("PORound", "0"),
    ("PaceAdjust", "N"),
    ("Period", "0"),
    ("PlayerExperience", ""),
    ("PlayerPosition", ""),
    ("PlusMinus", "N"),
    ("Rank", "N"),
    ("SeasonSegment", ""),
    ("SeasonType", "Regular Season"),
    ("ShotClockRange", ""),
    ("StarterBench", ""),
    ("TeamID", "0"),
    ("TwoWay", "0"),
    ("VsConference", ""),
    ("VsDivision", ""),
    ("Weight", ""),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Aggregation mode of the returned stat lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PerMode {
    Totals,
    PerGame,
    Per48,
}

impl PerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerMode::Totals => "Totals",
            PerMode::PerGame => "PerGame",
            PerMode::Per48 => "Per48",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode stats response: {0}")]
    Decode(String),

    #[error("unexpected stats response shape: {0}")]
    Shape(String),
}

/// Season code (`YYYY-YY`) of the season in progress on `today`.
/// A new season is assumed to start in October.
pub fn current_season_code(today: NaiveDate) -> String {
    let start = if today.month() >= 10 {
        today.year()
    } else {
        today.year() - 1
    };
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct StatsClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for StatsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsClient {
    pub fn new() -> Self {
        Self::with_base_url(STATS_URL)
    }

    /// Point the client at a different endpoint (mirrors, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        StatsClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch one season of player stats.
    ///
    /// `last_n` limits the lines to each player's last N games; 0 means the
    /// whole season. `date_from` drops games before that date.
    pub async fn player_stats(
        &self,
        season: &str,
        per_mode: PerMode,
        last_n: u32,
        date_from: Option<NaiveDate>,
    ) -> Result<Vec<PlayerStats>, FetchError> {
        let params = query_params(season, per_mode, last_n, date_from);
        let mut request = self.http.get(&self.base_url).query(&params);
        for (name, value) in HEADERS {
            request = request.header(*name, *value);
        }

        info!(
            "Fetching {} player stats for season {} (last {} games, from {:?})",
            per_mode.as_str(),
            season,
            last_n,
            date_from
        );
        let response = request.send().await?.error_for_status()?;
        let body: Value = response.json().await?;
        let players = parse_player_stats(&body)?;
        info!("Fetched {} players", players.len());
        Ok(players)
    }
}

/// Fetch player stats from stats.nba.com with a default client.
pub async fn fetch_player_stats(
    season: &str,
    per_mode: PerMode,
    last_n: u32,
    date_from: Option<NaiveDate>,
) -> Result<Vec<PlayerStats>, FetchError> {
    StatsClient::new()
        .player_stats(season, per_mode, last_n, date_from)
        .await
}

/// Full query string for one request. nba.com expects `DateFrom` as
/// `MM/DD/YYYY`, empty for no limit.
fn query_params(
    season: &str,
    per_mode: PerMode,
    last_n: u32,
    date_from: Option<NaiveDate>,
) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = FIXED_PARAMS
        .iter()
        .map(|&(name, value)| (name, value.to_string()))
        .collect();
    params.push((
        "DateFrom",
        date_from
            .map(|d| d.format("%m/%d/%Y").to_string())
            .unwrap_or_default(),
    ));
    params.push(("LastNGames", last_n.to_string()));
    params.push(("PerMode", per_mode.as_str().to_string()));
    params.push(("Season", season.to_string()));
    params
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Convert a `resultSets[0]` headers/rowSet table into player stats.
/// Rows that do not fit the expected columns are skipped with a warning.
pub fn parse_player_stats(body: &Value) -> Result<Vec<PlayerStats>, FetchError> {
    let result_set = body
        .get("resultSets")
        .and_then(Value::as_array)
        .and_then(|sets| sets.first())
        .ok_or_else(|| FetchError::Shape("missing resultSets[0]".into()))?;

    let headers: Vec<String> = result_set
        .get("headers")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Shape("missing headers".into()))?
        .iter()
        .map(|h| {
            h.as_str()
                .map(str::to_string)
                .ok_or_else(|| FetchError::Shape(format!("non-string header: {h}")))
        })
        .collect::<Result<_, _>>()?;

    let rows = result_set
        .get("rowSet")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Shape("missing rowSet".into()))?;
    debug!("stats response: {} columns, {} rows", headers.len(), rows.len());

    let mut players = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| FetchError::Decode(format!("row {i} is not an array")))?;
        if cells.len() != headers.len() {
            return Err(FetchError::Shape(format!(
                "row {i} has {} cells, expected {}",
                cells.len(),
                headers.len()
            )));
        }
        let record: serde_json::Map<String, Value> =
            headers.iter().cloned().zip(cells.iter().cloned()).collect();
        match serde_json::from_value::<RawPlayerStats>(Value::Object(record)) {
            Ok(raw) => players.push(PlayerStats::from(raw)),
            Err(e) => warn!("skipping player row {}: {}", i, e),
        }
    }
    Ok(players)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
