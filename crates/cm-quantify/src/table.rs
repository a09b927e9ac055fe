use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::QuantifyError;
use crate::request::MetricKind;

const IMAGE_COLUMN: &str = "Image";

/// Write locks shared by every `MetricsTable` in the process, one per file.
static TABLE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// One row of the metrics table; `values` is indexed like [`MetricKind::ALL`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub image: String,
    pub values: [Option<f64>; 4],
}

impl TableRow {
    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        self.values[column_index(kind)]
    }
}

/// Column means over the non-empty cells of a metrics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    /// Column title to mean; columns without values are omitted.
    pub means: BTreeMap<String, f64>,
}

/// CSV file with one row per image, rewritten in place on every update.
///
/// Every update within the process is serialized per file, including
/// updates through different `MetricsTable` values for the same path.
/// Separate processes writing the same file are not coordinated.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    path: PathBuf,
}

impl MetricsTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the row for `image` (or appends one) with `values`. Metrics
    /// not listed are left empty.
    pub fn upsert(&self, image: &str, values: &[(MetricKind, f64)]) -> Result<(), QuantifyError> {
        let dir = parent_dir(&self.path);
        fs::create_dir_all(dir).map_err(|e| QuantifyError::io(dir, e))?;

        let lock = file_lock(&self.path);
        let _guard = acquire(&lock)?;

        let mut rows = if self.path.exists() {
            self.read_rows()?
        } else {
            Vec::new()
        };
        rows.retain(|r| r.image != image);

        let mut row = TableRow {
            image: image.to_string(),
            values: [None; 4],
        };
        for &(kind, v) in values {
            row.values[column_index(kind)] = Some(v);
        }
        rows.push(row);

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| QuantifyError::io(dir, e))?;
        tmp.write_all(render(&rows).as_bytes())
            .map_err(|e| QuantifyError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| QuantifyError::io(&self.path, e.error))?;

        debug!(path = %self.path.display(), image, rows = rows.len(), "metrics table updated");
        Ok(())
    }

    pub fn rows(&self) -> Result<Vec<TableRow>, QuantifyError> {
        let lock = file_lock(&self.path);
        let _guard = acquire(&lock)?;
        self.read_rows()
    }

    /// Mean of every metric column. A missing or empty table is an error.
    pub fn summarize(&self) -> Result<TableSummary, QuantifyError> {
        if !self.path.exists() {
            return Err(QuantifyError::Table(format!(
                "table not found: {}",
                self.path.display()
            )));
        }
        let rows = self.rows()?;
        if rows.is_empty() {
            return Err(QuantifyError::Table(format!(
                "table is empty: {}",
                self.path.display()
            )));
        }

        let mut means = BTreeMap::new();
        for kind in MetricKind::ALL {
            let vals: Vec<f64> = rows.iter().filter_map(|r| r.get(kind)).collect();
            if !vals.is_empty() {
                let mean = vals.iter().sum::<f64>() / vals.len() as f64;
                means.insert(kind.column().to_string(), mean);
            }
        }

        Ok(TableSummary {
            rows: rows.len(),
            means,
        })
    }

    fn read_rows(&self) -> Result<Vec<TableRow>, QuantifyError> {
        let text = fs::read_to_string(&self.path).map_err(|e| QuantifyError::io(&self.path, e))?;
        parse(&text)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Lock for the file at `path`. Different spellings of one location share a
/// lock once its directory exists.
fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    let dir = parent_dir(path);
    let dir = fs::canonicalize(dir)
        .or_else(|_| std::path::absolute(dir))
        .unwrap_or_else(|_| dir.to_path_buf());
    let key = match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    };

    let mut locks = TABLE_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}

fn acquire(lock: &Mutex<()>) -> Result<MutexGuard<'_, ()>, QuantifyError> {
    lock.lock()
        .map_err(|_| QuantifyError::Table("table lock poisoned".to_string()))
}

fn column_index(kind: MetricKind) -> usize {
    match kind {
        MetricKind::Length => 0,
        MetricKind::Area => 1,
        MetricKind::MaxWidth => 2,
        MetricKind::AvgWidth => 3,
    }
}

fn render(rows: &[TableRow]) -> String {
    let mut out = String::new();
    out.push_str(IMAGE_COLUMN);
    for kind in MetricKind::ALL {
        out.push(',');
        out.push_str(kind.column());
    }
    out.push('\n');

    for row in rows {
        out.push_str(&quote(&row.image));
        for v in row.values {
            out.push(',');
            if let Some(v) = v {
                out.push_str(&v.to_string());
            }
        }
        out.push('\n');
    }
    out
}

/// Columns are matched by title, so tables with a subset of the metric
/// columns or a different column order are read correctly.
fn parse(text: &str) -> Result<Vec<TableRow>, QuantifyError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };

    let titles = split(header)?;
    let image_col = titles
        .iter()
        .position(|t| t == IMAGE_COLUMN)
        .ok_or_else(|| QuantifyError::Table("missing Image column".to_string()))?;
    let metric_cols: Vec<Option<usize>> = MetricKind::ALL
        .iter()
        .map(|k| titles.iter().position(|t| t == k.column()))
        .collect();

    let mut rows = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let cells = split(line)?;
        let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");

        let mut values = [None; 4];
        for (slot, col) in values.iter_mut().zip(&metric_cols) {
            let Some(col) = *col else { continue };
            let raw = cell(col).trim();
            if raw.is_empty() {
                continue;
            }
            let v = raw.parse::<f64>().map_err(|_| {
                QuantifyError::Table(format!("row {}: not a number: {raw:?}", lineno + 2))
            })?;
            *slot = Some(v);
        }

        rows.push(TableRow {
            image: cell(image_col).to_string(),
            values,
        });
    }
    Ok(rows)
}

/// Line breaks become spaces since every row occupies exactly one line.
fn quote(field: &str) -> String {
    let field = field.replace(['\r', '\n'], " ");
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

fn split(line: &str) -> Result<Vec<String>, QuantifyError> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if cur.is_empty() => in_quotes = true,
            (',', false) => out.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    if in_quotes {
        return Err(QuantifyError::Table(format!("unterminated quote in: {line}")));
    }
    out.push(cur);
    Ok(out)
}
