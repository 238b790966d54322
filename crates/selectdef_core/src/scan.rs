use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const STAGES_PREFIX: &str = "stages/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFile {
    /// Path as written in a roster, e.g. `stages/kfm.def`.
    pub path: String,
    /// File stem, used for display and ordering.
    pub name: String,
}

/// Character tokens under `chars_dir`, sorted. `chars/kfm/kfm.def` is
/// reported as `kfm`; every other definition by its relative path.
pub fn scan_characters(chars_dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = def_files(chars_dir)
        .into_iter()
        .filter_map(|path| character_token(chars_dir, &path))
        .collect();
    out.sort();
    out
}

/// Stage definitions under `stages_dir`, sorted by name.
pub fn scan_stages(stages_dir: &Path) -> Vec<StageFile> {
    let mut out: Vec<StageFile> = def_files(stages_dir)
        .into_iter()
        .filter_map(|path| {
            let rel = relative_slash_path(stages_dir, &path)?;
            let name = path.file_stem()?.to_string_lossy().to_string();
            Some(StageFile {
                path: format!("{STAGES_PREFIX}{rel}"),
                name,
            })
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    out
}

fn character_token(chars_dir: &Path, path: &Path) -> Option<String> {
    let rel = relative_slash_path(chars_dir, path)?;
    let stem = path.file_stem()?.to_string_lossy();
    let folder = path.parent()?.file_name()?.to_string_lossy();
    if rel.matches('/').count() == 1 && folder.eq_ignore_ascii_case(&stem) {
        return Some(folder.to_string());
    }
    Some(rel)
}

fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

/// Every `*.def` below `root`. Unreadable directories are skipped.
fn def_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if is_def_file(&path) {
                out.push(path);
            }
        }
    }
    out
}

fn is_def_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("def"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "[Info]\n").expect("write");
    }

    #[test]
    fn characters_use_folder_name_when_def_matches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let chars = dir.path().join("chars");
        touch(&chars.join("kfm").join("KFM.def"));
        touch(&chars.join("ryu").join("ryu_alt.def"));
        touch(&chars.join("loose.def"));
        touch(&chars.join("pack").join("ken").join("ken.def"));
        touch(&chars.join("kfm").join("readme.txt"));

        assert_eq!(
            scan_characters(&chars),
            vec!["kfm", "loose.def", "pack/ken/ken.def", "ryu/ryu_alt.def"]
        );
    }

    #[test]
    fn stages_are_prefixed_and_sorted_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stages = dir.path().join("stages");
        touch(&stages.join("zeta.def"));
        touch(&stages.join("extra").join("alpha.DEF"));

        let found = scan_stages(&stages);
        let paths: Vec<_> = found.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["stages/extra/alpha.DEF", "stages/zeta.def"]);
        assert_eq!(found[0].name, "alpha");
    }

    #[test]
    fn missing_directory_scans_empty() {
        assert!(scan_characters(Path::new("/no/such/chars")).is_empty());
        assert!(scan_stages(Path::new("/no/such/stages")).is_empty());
    }
}
