// Score table writers: CSV and JSON files, plus a plain-text table for stdout.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use nbapr_core::{PlayerScore, ScoreTable};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Column headers: id, pass-through labels, appearances, one `<CAT>_RK` per
/// category, then `TOT_RK`.
pub fn headers(table: &ScoreTable) -> Vec<String> {
    let mut headers = vec!["PLAYER_ID".to_string()];
    headers.extend(table.label_names.iter().cloned());
    headers.push("APPEARANCES".to_string());
    headers.extend(table.categories.iter().map(|c| format!("{c}_RK")));
    headers.push("TOT_RK".to_string());
    headers
}

fn score_cells(row: &PlayerScore) -> impl Iterator<Item = Option<f64>> + '_ {
    row.category_ranks
        .iter()
        .copied()
        .chain(std::iter::once(row.score))
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write the table as CSV. Missing values are empty fields.
pub fn write_csv<W: Write>(table: &ScoreTable, writer: W) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers(table))?;
    for row in &table.rows {
        let mut record = vec![row.id.to_string()];
        record.extend(row.labels.iter().cloned());
        record.push(row.appearances.to_string());
        record.extend(score_cells(row).map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| OutputError::Csv(e.into()))?;
    Ok(())
}

/// Write the table as a pretty-printed JSON array of records keyed by the
/// column headers. Missing values are `null`.
pub fn write_json<W: Write>(table: &ScoreTable, writer: W) -> Result<(), OutputError> {
    let headers = headers(table);
    let records: Vec<Value> = table
        .rows
        .iter()
        .map(|row| -> Result<Value, serde_json::Error> {
            let mut values = vec![serde_json::to_value(&row.id)?];
            values.extend(row.labels.iter().cloned().map(Value::from));
            values.push(Value::from(row.appearances));
            values.extend(score_cells(row).map(|v| v.map(Value::from).unwrap_or(Value::Null)));
            let record: Map<String, Value> = headers.iter().cloned().zip(values).collect();
            Ok(Value::Object(record))
        })
        .collect::<Result<_, _>>()?;
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

/// Write the table to `path` in the given format.
pub fn save(table: &ScoreTable, path: &Path, format: OutputFormat) -> Result<(), OutputError> {
    let path_str = path.display().to_string();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| OutputError::Io {
            path: path_str.clone(),
            source: e,
        })?;
    }
    let file = std::fs::File::create(path).map_err(|e| OutputError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    let writer = std::io::BufWriter::new(file);
    match format {
        OutputFormat::Csv => write_csv(table, writer)?,
        OutputFormat::Json => write_json(table, writer)?,
    }
    info!("Wrote {} player scores to {}", table.len(), path_str);
    Ok(())
}

// ---------------------------------------------------------------------------
// Text table
// ---------------------------------------------------------------------------

/// Render the first `max_rows` rows as an aligned text table. Values are
/// shown with two decimals; missing values as `-`.
pub fn render_table(table: &ScoreTable, max_rows: usize) -> String {
    let headers = headers(table);
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(max_rows)
        .map(|row| {
            let mut line = vec![row.id.to_string()];
            line.extend(row.labels.iter().cloned());
            line.push(row.appearances.to_string());
            line.extend(score_cells(row).map(|v| match v {
                Some(x) => format!("{x:.2}"),
                None => "-".to_string(),
            }));
            line
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            cells
                .iter()
                .map(|line| line[col].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    // Labels are left-aligned, numbers right-aligned.
    let label_cols = 1..=table.label_names.len();
    let mut out = String::new();
    let mut push_line = |line: &[String]| {
        let rendered: Vec<String> = line
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (cell, &w))| {
                if label_cols.contains(&col) {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect();
        let _ = writeln!(out, "{}", rendered.join("  ").trim_end());
    };
    push_line(&headers);
    for line in &cells {
        push_line(line);
    }
    if table.len() > max_rows {
        let _ = writeln!(out, "... {} more players", table.len() - max_rows);
    }
    out
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nbapr_core::PlayerId;

    fn table() -> ScoreTable {
        ScoreTable {
            categories: vec!["PTS".into(), "REB".into()],
            label_names: vec!["PLAYER_NAME".into()],
            rows: vec![
                PlayerScore {
                    id: PlayerId::Num(7),
                    labels: vec!["Seven".into()],
                    appearances: 12,
                    score: Some(3.5),
                    category_ranks: vec![Some(2.0), Some(1.5)],
                },
                PlayerScore {
                    id: PlayerId::Num(8),
                    labels: vec!["Eight".into()],
                    appearances: 0,
                    score: None,
                    category_ranks: vec![None, None],
                },
            ],
        }
    }

    #[test]
    fn headers_follow_labels_and_categories() {
        assert_eq!(
            headers(&table()),
            vec!["PLAYER_ID", "PLAYER_NAME", "APPEARANCES", "PTS_RK", "REB_RK", "TOT_RK"]
        );
    }

    #[test]
    fn csv_leaves_missing_scores_empty() {
        let mut buf = Vec::new();
        write_csv(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "PLAYER_ID,PLAYER_NAME,APPEARANCES,PTS_RK,REB_RK,TOT_RK");
        assert_eq!(lines[1], "7,Seven,12,2,1.5,3.5");
        assert_eq!(lines[2], "8,Eight,0,,,");
    }

    #[test]
    fn json_uses_null_for_missing_scores() {
        let mut buf = Vec::new();
        write_json(&table(), &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["PLAYER_ID"], 7);
        assert_eq!(rows[0]["TOT_RK"], 3.5);
        assert_eq!(rows[0]["PLAYER_NAME"], "Seven");
        assert!(rows[1]["TOT_RK"].is_null());
        assert!(rows[1]["PTS_RK"].is_null());
    }

    #[test]
    fn text_table_marks_missing_and_truncates() {
        let text = render_table(&table(), 1);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("PLAYER_ID"));
        assert!(lines[1].contains("Seven"));
        assert!(lines[1].ends_with("3.50"));
        assert_eq!(lines[2], "... 1 more players");

        let full = render_table(&table(), 10);
        assert!(full.lines().nth(2).unwrap().ends_with('-'));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!("nbapr_output_test_{}", std::process::id()));
        let path = dir.join("nested").join("scores.json");
        save(&table(), &path, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
