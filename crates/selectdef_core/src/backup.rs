use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub const BACKUP_DIR_NAME: &str = "selectdef_backups";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<dir of file>/selectdef_backups`.
pub fn default_backup_dir(file: &Path) -> PathBuf {
    file.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(BACKUP_DIR_NAME)
}

/// `select.def` at 2024-03-05 14:07:09 becomes `select_20240305_140709.def`.
pub fn backup_file_name(file: &Path, at: DateTime<Local>) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "select".to_string());
    let stamp = at.format(TIMESTAMP_FORMAT);
    match file.extension() {
        Some(ext) => format!("{stem}_{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{stamp}"),
    }
}

/// Copies `file` into `backup_dir`, creating the directory if needed.
pub fn create_backup(file: &Path, backup_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(backup_dir)?;
    let target = backup_dir.join(backup_file_name(file, Local::now()));
    fs::copy(file, &target)?;
    tracing::debug!(source = %file.display(), backup = %target.display(), "backup written");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn backup_name_embeds_timestamp() {
        let at = Local
            .with_ymd_and_hms(2024, 3, 5, 14, 7, 9)
            .single()
            .expect("valid local time");
        assert_eq!(
            backup_file_name(Path::new("data/select.def"), at),
            "select_20240305_140709.def"
        );
    }

    #[test]
    fn create_backup_copies_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("select.def");
        fs::write(&file, "[Characters]\nkfm\n").expect("write");

        let backup = create_backup(&file, &default_backup_dir(&file)).expect("backup");
        assert!(backup.starts_with(dir.path().join(BACKUP_DIR_NAME)));
        assert_eq!(fs::read_to_string(backup).expect("read"), "[Characters]\nkfm\n");
    }

    #[test]
    fn create_backup_fails_for_missing_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.def");
        assert!(create_backup(&missing, dir.path()).is_err());
    }
}
