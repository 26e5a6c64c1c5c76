// Player stats loading and cleaning.
//
// Reads nba.com `leaguedashplayerstats`-format tables (CSV export or the JSON
// endpoint, see `fetch`) and turns them into the player pool the simulation
// engine consumes.

use std::io::Read;
use std::path::Path;

use nbapr_core::{PlayerPool, SimulationError};
use serde::Deserialize;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player's season line. Derived columns (`wfgp`, `wftp`, `probs`) are
/// zero until [`clean_stats`] fills them in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStats {
    pub player_id: i64,
    pub name: String,
    pub team: String,
    pub gp: f64,
    pub min: f64,
    pub fgm: f64,
    pub fga: f64,
    pub fg_pct: f64,
    pub fg3m: f64,
    pub ftm: f64,
    pub fta: f64,
    pub ft_pct: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub pts: f64,
    pub fantasy_pts: Option<f64>,
    /// Field-goal percentage weighted by the player's share of pool attempts.
    pub wfgp: f64,
    /// Free-throw percentage weighted by the player's share of pool attempts.
    pub wftp: f64,
    /// Selection weight used when drafting simulated teams.
    pub probs: f64,
}

/// Filters applied by [`clean_stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanOptions {
    /// Minimum games played; 0 disables the filter.
    pub min_games: f64,
    /// Minimum minutes; 0 disables the filter.
    pub min_minutes: f64,
    /// Drop players whose fantasy value is below the pool mean.
    pub filter_below_mean: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        CleanOptions {
            min_games: 0.0,
            min_minutes: 0.0,
            filter_below_mean: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to build player pool: {0}")]
    Pool(#[from] SimulationError),
}

// ---------------------------------------------------------------------------
// Raw row (nba.com column names)
// ---------------------------------------------------------------------------

/// nba.com player stats row. Extra columns are ignored.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
pub(crate) struct RawPlayerStats {
    PLAYER_ID: i64,
    PLAYER_NAME: String,
    #[serde(default, alias = "TEAM")]
    TEAM_ABBREVIATION: String,
    GP: f64,
    MIN: f64,
    FGM: f64,
    FGA: f64,
    FG_PCT: f64,
    FG3M: f64,
    FTM: f64,
    FTA: f64,
    FT_PCT: f64,
    REB: f64,
    AST: f64,
    STL: f64,
    BLK: f64,
    TOV: f64,
    PTS: f64,
    #[serde(default)]
    NBA_FANTASY_PTS: Option<f64>,
}

impl From<RawPlayerStats> for PlayerStats {
    fn from(raw: RawPlayerStats) -> Self {
        PlayerStats {
            player_id: raw.PLAYER_ID,
            name: raw.PLAYER_NAME.trim().to_string(),
            team: raw.TEAM_ABBREVIATION.trim().to_string(),
            gp: raw.GP,
            min: raw.MIN,
            fgm: raw.FGM,
            fga: raw.FGA,
            fg_pct: raw.FG_PCT,
            fg3m: raw.FG3M,
            ftm: raw.FTM,
            fta: raw.FTA,
            ft_pct: raw.FT_PCT,
            reb: raw.REB,
            ast: raw.AST,
            stl: raw.STL,
            blk: raw.BLK,
            tov: raw.TOV,
            pts: raw.PTS,
            fantasy_pts: raw.NBA_FANTASY_PTS,
            wfgp: 0.0,
            wftp: 0.0,
            probs: 0.0,
        }
    }
}

impl PlayerStats {
    fn counting_values(&self) -> [f64; 16] {
        [
            self.gp, self.min, self.fgm, self.fga, self.fg_pct, self.fg3m, self.ftm, self.fta,
            self.ft_pct, self.reb, self.ast, self.stl, self.blk, self.tov, self.pts,
            self.fantasy_pts.unwrap_or(0.0),
        ]
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub(crate) fn load_stats_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerStats>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayerStats>() {
        match result {
            Ok(raw) => {
                let player = PlayerStats::from(raw);
                if !player.counting_values().iter().all(|v| v.is_finite()) {
                    warn!("skipping player '{}': non-finite stat value", player.name);
                    continue;
                }
                players.push(player);
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

/// Load player stats from an nba.com-format CSV file.
pub fn load_stats(path: &Path) -> Result<Vec<PlayerStats>, StatsError> {
    let path_str = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| StatsError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    let players = load_stats_from_reader(file).map_err(|e| StatsError::Csv {
        path: path_str.clone(),
        source: e,
    })?;
    info!("Loaded {} players from {}", players.len(), path_str);
    Ok(players)
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Fantasy value used for the below-mean filter and selection weights:
/// nba.com fantasy points when every player has them, points otherwise.
fn value_basis(players: &[PlayerStats]) -> Vec<f64> {
    if players.iter().all(|p| p.fantasy_pts.is_some()) {
        players.iter().map(|p| p.fantasy_pts.unwrap_or(0.0)).collect()
    } else {
        if !players.is_empty() {
            warn!("NBA_FANTASY_PTS missing for some players; weighting by PTS instead");
        }
        players.iter().map(|p| p.pts).collect()
    }
}

fn share(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total
    } else {
        0.0
    }
}

/// Prepare raw stats for simulation.
///
/// 1. Apply games/minutes thresholds.
/// 2. Optionally drop players below the mean fantasy value.
/// 3. Add volume-weighted percentages `WFGP` and `WFTP`.
/// 4. Add selection weights `probs` proportional to fantasy value.
/// 5. Negate turnovers so that a larger total ranks higher.
pub fn clean_stats(players: Vec<PlayerStats>, options: &CleanOptions) -> Result<Vec<PlayerStats>, StatsError> {
    let mut players: Vec<PlayerStats> = players
        .into_iter()
        .filter(|p| options.min_games <= 0.0 || p.gp >= options.min_games)
        .filter(|p| options.min_minutes <= 0.0 || p.min >= options.min_minutes)
        .collect();

    if options.filter_below_mean && !players.is_empty() {
        let basis = value_basis(&players);
        let mean = basis.iter().sum::<f64>() / basis.len() as f64;
        players = players
            .into_iter()
            .zip(basis)
            .filter(|(_, value)| *value >= mean)
            .map(|(p, _)| p)
            .collect();
    }

    if players.is_empty() {
        return Err(StatsError::Validation("no players left after filtering".into()));
    }

    let total_fga: f64 = players.iter().map(|p| p.fga).sum();
    let total_fta: f64 = players.iter().map(|p| p.fta).sum();
    let basis = value_basis(&players);
    let total_value: f64 = basis.iter().sum();
    if total_value <= 0.0 {
        return Err(StatsError::Validation(
            "fantasy values sum to zero; cannot derive selection weights".into(),
        ));
    }

    for (p, value) in players.iter_mut().zip(basis) {
        p.wfgp = p.fg_pct * share(p.fga, total_fga);
        p.wftp = p.ft_pct * share(p.fta, total_fta);
        p.probs = (value / total_value).max(0.0);
        p.tov = -p.tov;
    }

    info!("Cleaned pool: {} players", players.len());
    Ok(players)
}

// ---------------------------------------------------------------------------
// Pool construction
// ---------------------------------------------------------------------------

type Accessor = fn(&PlayerStats) -> f64;

/// Numeric pool columns, named as nba.com names them.
const POOL_COLUMNS: &[(&str, Accessor)] = &[
    ("GP", |p: &PlayerStats| p.gp),
    ("MIN", |p: &PlayerStats| p.min),
    ("FGM", |p: &PlayerStats| p.fgm),
    ("FGA", |p: &PlayerStats| p.fga),
    ("FG_PCT", |p: &PlayerStats| p.fg_pct),
    ("WFGP", |p: &PlayerStats| p.wfgp),
    ("FG3M", |p: &PlayerStats| p.fg3m),
    ("FTM", |p: &PlayerStats| p.ftm),
    ("FTA", |p: &PlayerStats| p.fta),
    ("FT_PCT", |p: &PlayerStats| p.ft_pct),
    ("WFTP", |p: &PlayerStats| p.wftp),
    ("REB", |p: &PlayerStats| p.reb),
    ("AST", |p: &PlayerStats| p.ast),
    ("STL", |p: &PlayerStats| p.stl),
    ("BLK", |p: &PlayerStats| p.blk),
    ("TOV", |p: &PlayerStats| p.tov),
    ("PTS", |p: &PlayerStats| p.pts),
    ("probs", |p: &PlayerStats| p.probs),
];

/// Whole numbers without decimals, anything else to one decimal.
fn display_stat(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// Build the engine's player pool. `PLAYER_NAME`, `TEAM`, `GP` and `MIN`
/// pass through to the score table.
pub fn to_pool(players: &[PlayerStats]) -> Result<PlayerPool, StatsError> {
    let mut pool = PlayerPool::new(players.iter().map(|p| p.player_id))?
        .with_label("PLAYER_NAME", players.iter().map(|p| p.name.clone()).collect())?
        .with_label("TEAM", players.iter().map(|p| p.team.clone()).collect())?
        .with_label("GP", players.iter().map(|p| display_stat(p.gp)).collect())?
        .with_label("MIN", players.iter().map(|p| display_stat(p.min)).collect())?;
    for (name, get) in POOL_COLUMNS {
        pool = pool.with_column(name, players.iter().map(get).collect())?;
    }
    Ok(pool)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
PLAYER_ID,PLAYER_NAME,TEAM_ABBREVIATION,GP,MIN,FGM,FGA,FG_PCT,FG3M,FTM,FTA,FT_PCT,REB,AST,STL,BLK,TOV,PTS,NBA_FANTASY_PTS,PLUS_MINUS
1,Alpha,AAA,70,2400,600,1200,0.5,150,300,400,0.75,500,400,80,40,200,1650,3000,120
2,Beta,BBB,60,1800,400,1000,0.4,100,200,250,0.8,300,200,60,20,150,1100,1800,-40
3,Gamma,CCC,20,300,50,125,0.4,10,20,40,0.5,60,30,10,5,25,130,300,-10
";

    fn players() -> Vec<PlayerStats> {
        load_stats_from_reader(CSV.as_bytes()).unwrap()
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn loads_rows_and_ignores_extra_columns() {
        let p = players();
        assert_eq!(p.len(), 3);
        assert_eq!(p[0].player_id, 1);
        assert_eq!(p[0].name, "Alpha");
        assert_eq!(p[0].team, "AAA");
        assert_eq!(p[1].fantasy_pts, Some(1800.0));
    }

    #[test]
    fn accepts_team_alias_and_missing_fantasy_points() {
        let csv = "\
PLAYER_ID,PLAYER_NAME,TEAM,GP,MIN,FGM,FGA,FG_PCT,FG3M,FTM,FTA,FT_PCT,REB,AST,STL,BLK,TOV,PTS
9,Delta,DDD,1,10,1,2,0.5,0,0,0,0,1,1,0,0,0,2
";
        let p = load_stats_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(p[0].team, "DDD");
        assert_eq!(p[0].fantasy_pts, None);
    }

    #[test]
    fn skips_malformed_rows() {
        let csv = "\
PLAYER_ID,PLAYER_NAME,TEAM,GP,MIN,FGM,FGA,FG_PCT,FG3M,FTM,FTA,FT_PCT,REB,AST,STL,BLK,TOV,PTS
9,Delta,DDD,1,10,1,2,0.5,0,0,0,0,1,1,0,0,0,2
x,Broken,EEE,1,10,1,2,0.5,0,0,0,0,1,1,0,0,0,2
";
        assert_eq!(load_stats_from_reader(csv.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn drops_players_below_mean_fantasy_value() {
        // mean fantasy points = 1700; Gamma (300) is dropped
        let cleaned = clean_stats(players(), &CleanOptions::default()).unwrap();
        let names: Vec<&str> = cleaned.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn derives_weighted_percentages_and_weights() {
        let cleaned = clean_stats(players(), &CleanOptions::default()).unwrap();
        let alpha = &cleaned[0];
        // FGA share 1200 / 2200, FTA share 400 / 650
        assert!(approx_eq(alpha.wfgp, 0.5 * 1200.0 / 2200.0));
        assert!(approx_eq(alpha.wftp, 0.75 * 400.0 / 650.0));
        assert!(approx_eq(alpha.probs, 3000.0 / 4800.0));
        let total: f64 = cleaned.iter().map(|p| p.probs).sum();
        assert!(approx_eq(total, 1.0));
    }

    #[test]
    fn negates_turnovers() {
        let cleaned = clean_stats(players(), &CleanOptions::default()).unwrap();
        assert_eq!(cleaned[0].tov, -200.0);
    }

    #[test]
    fn applies_games_and_minutes_thresholds() {
        let options = CleanOptions {
            min_games: 65.0,
            min_minutes: 0.0,
            filter_below_mean: false,
        };
        let cleaned = clean_stats(players(), &options).unwrap();
        assert_eq!(cleaned.len(), 1);

        let options = CleanOptions {
            min_games: 0.0,
            min_minutes: 1000.0,
            filter_below_mean: false,
        };
        assert_eq!(clean_stats(players(), &options).unwrap().len(), 2);
    }

    #[test]
    fn empty_result_is_an_error() {
        let options = CleanOptions {
            min_games: 1000.0,
            ..CleanOptions::default()
        };
        assert!(matches!(
            clean_stats(players(), &options),
            Err(StatsError::Validation(_))
        ));
    }

    #[test]
    fn builds_pool_with_category_and_weight_columns() {
        let cleaned = clean_stats(players(), &CleanOptions::default()).unwrap();
        let pool = to_pool(&cleaned).unwrap();
        assert_eq!(pool.len(), 2);
        for name in crate::config::NINE_CAT {
            assert!(pool.has_column(name), "missing {name}");
        }
        assert_eq!(pool.column("TOV").unwrap(), &[-200.0, -150.0]);
        assert_eq!(pool.labels_of(1), vec!["Beta", "BBB", "60", "1800"]);
        assert_eq!(pool.label_names().collect::<Vec<_>>(), vec!["PLAYER_NAME", "TEAM", "GP", "MIN"]);
    }

    #[test]
    fn fractional_minutes_keep_one_decimal() {
        assert_eq!(display_stat(1220.4), "1220.4");
        assert_eq!(display_stat(72.0), "72");
    }

    #[test]
    fn duplicate_player_ids_are_rejected() {
        let mut p = players();
        p[1].player_id = 1;
        assert!(matches!(to_pool(&p), Err(StatsError::Pool(_))));
    }

    #[test]
    fn load_stats_reports_missing_file() {
        let err = load_stats(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, StatsError::Io { .. }));
    }
}
