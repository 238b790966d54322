use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defs::{read_lossy, section_entries};
use crate::parser::strip_comment;

pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_COLUMNS: usize = 10;
/// Larger `rows`/`columns` values are clamped to this.
pub const MAX_DIMENSION: usize = 256;

const SELECT_INFO_SECTION: &str = "Select Info";
const MOTIF_KEY: &str = "motif";

/// Row/column count of the select screen. Only used to lay slot indices out;
/// never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridAddress {
    pub row: usize,
    pub col: usize,
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLUMNS,
        }
    }
}

impl GridDimensions {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn capacity(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }

    pub fn address(&self, index: usize) -> GridAddress {
        let cols = self.cols.max(1);
        GridAddress {
            row: index / cols,
            col: index % cols,
        }
    }

    /// Reads the motif selected by `<data_dir>/mugen.cfg` (or
    /// `<data_dir>/system.def`). Anything unreadable keeps the defaults.
    pub fn resolve(root: &Path, data_dir: &Path) -> Self {
        let motif = motif_path(root, data_dir);
        Self::from_motif_path(&motif)
    }

    pub fn from_motif_path(path: &Path) -> Self {
        match read_lossy(path) {
            Ok(text) => Self::from_motif_text(&text),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "motif unreadable, using default grid");
                Self::default()
            }
        }
    }

    pub fn from_motif_text(text: &str) -> Self {
        let mut dims = Self::default();
        for (key, value) in section_entries(text, SELECT_INFO_SECTION) {
            let target = match key.as_str() {
                "rows" => &mut dims.rows,
                "columns" => &mut dims.cols,
                _ => continue,
            };
            if let Some(parsed) = first_dimension(&value) {
                *target = parsed;
            }
        }
        dims
    }
}

/// Motif file to read grid dimensions from. The last `motif` line naming an
/// existing file wins.
pub fn motif_path(root: &Path, data_dir: &Path) -> PathBuf {
    let mut motif = data_dir.join("system.def");
    let Ok(cfg) = read_lossy(&data_dir.join("mugen.cfg")) else {
        return motif;
    };

    for line in cfg.lines() {
        let line = strip_comment(line).trim();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case(MOTIF_KEY) {
            continue;
        }
        let candidate = root.join(value.trim().trim_matches('"'));
        if candidate.exists() {
            motif = candidate;
        }
    }
    motif
}

/// First comma-separated token as a positive integer, at most
/// `MAX_DIMENSION`.
fn first_dimension(value: &str) -> Option<usize> {
    let token = value.split(',').next()?.trim();
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        let parsed = token.parse::<usize>().unwrap_or(MAX_DIMENSION);
        return (parsed > 0).then_some(parsed.min(MAX_DIMENSION));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_token_of_rows_and_columns() {
        let text = "[Files]\nrows = 99\n[Select Info]\nrows = 4, 2\ncolumns = 12 ; wide\n[Next]\ncolumns = 1\n";
        assert_eq!(GridDimensions::from_motif_text(text), GridDimensions::new(4, 12));
    }

    #[test]
    fn missing_section_or_bad_values_keep_defaults() {
        assert_eq!(GridDimensions::from_motif_text("[Info]\nrows=3\n"), GridDimensions::default());
        let text = "[Select Info]\nrows = many\ncolumns = 0\n";
        assert_eq!(GridDimensions::from_motif_text(text), GridDimensions::new(10, 10));
    }

    #[test]
    fn oversized_dimensions_are_clamped() {
        let text = "[Select Info]\nrows = 99999999999999999999999\ncolumns = 4000\n";
        let dims = GridDimensions::from_motif_text(text);
        assert_eq!(dims, GridDimensions::new(MAX_DIMENSION, MAX_DIMENSION));
        assert_eq!(GridDimensions::new(usize::MAX, 2).capacity(), usize::MAX);
    }

    #[test]
    fn last_existing_motif_line_wins() {
        let root = tempfile::tempdir().expect("tempdir");
        let data = root.path().join("data");
        std::fs::create_dir_all(data.join("a")).expect("mkdir");
        std::fs::create_dir_all(data.join("b")).expect("mkdir");
        std::fs::write(data.join("a/system.def"), "").expect("write");
        std::fs::write(data.join("b/system.def"), "").expect("write");
        std::fs::write(
            data.join("mugen.cfg"),
            "motif = data/a/system.def\nmotif = data/b/system.def\nmotif = data/missing.def\n",
        )
        .expect("write cfg");

        assert_eq!(motif_path(root.path(), &data), root.path().join("data/b/system.def"));
    }

    #[test]
    fn address_maps_index_to_row_and_column() {
        let dims = GridDimensions::new(3, 4);
        assert_eq!(dims.capacity(), 12);
        assert_eq!(dims.address(9), GridAddress { row: 2, col: 1 });
    }

    #[test]
    fn missing_motif_file_falls_back_to_default() {
        let dims = GridDimensions::from_motif_path(Path::new("/definitely/not/here/system.def"));
        assert_eq!(dims, GridDimensions::new(10, 10));
    }
}
