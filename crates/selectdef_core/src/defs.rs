//! Readers for the engine's other definition files: the game directory
//! layout, `system.def`'s `[Files]` section and character `[Info]` blocks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::parser::{header_name, strip_comment};
use crate::slot::{EMPTY_CHARACTER, RANDOM_CHARACTER};

const DEF_EXTENSION: &str = "def";

/// Conventional directories under a game root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    pub root: PathBuf,
    pub chars_dir: PathBuf,
    pub stages_dir: PathBuf,
    pub data_dir: PathBuf,
    pub select_def: PathBuf,
}

impl GameLayout {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data_dir = root.join("data");
        Self {
            chars_dir: root.join("chars"),
            stages_dir: root.join("stages"),
            select_def: data_dir.join("select.def"),
            data_dir,
            root,
        }
    }

    /// Points the layout at a `select.def` outside the default location;
    /// its directory becomes the data directory.
    pub fn with_select_def(mut self, select_def: impl Into<PathBuf>) -> Self {
        self.select_def = select_def.into();
        if let Some(parent) = self.select_def.parent() {
            self.data_dir = parent.to_path_buf();
        }
        self
    }
}

/// Key/value pairs of `[section]`, keys lower-cased and values with
/// comments stripped. Reading stops at the next header.
pub fn section_entries(text: &str, section: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut inside = false;
    for line in text.lines() {
        if let Some(name) = header_name(line) {
            if inside {
                break;
            }
            inside = name.eq_ignore_ascii_case(section);
            continue;
        }
        if !inside {
            continue;
        }
        if let Some((key, value)) = strip_comment(line).split_once('=') {
            entries.push((key.trim().to_lowercase(), value.trim().to_string()));
        }
    }
    entries
}

/// `select` entry of `[Files]`, relative to the game root.
pub fn find_select_def(system_def: &Path) -> io::Result<Option<String>> {
    let text = read_lossy(system_def)?;
    Ok(section_entries(&text, "Files")
        .into_iter()
        .find(|(key, _)| key == "select")
        .map(|(_, value)| unquote(&value).to_string())
        .filter(|value| !value.is_empty()))
}

/// Roster named by `system_def`, tried relative to the game root and then
/// to the directory of `system_def`. Falls back to `<root>/data/select.def`.
pub fn locate_select_def(root: &Path, system_def: &Path) -> PathBuf {
    let fallback = GameLayout::from_root(root).select_def;
    let named = match find_select_def(system_def) {
        Ok(Some(named)) => named,
        Ok(None) => return fallback,
        Err(e) => {
            tracing::debug!(path = %system_def.display(), error = %e, "system.def unreadable");
            return fallback;
        }
    };

    let beside_system = system_def.parent().map(|dir| dir.join(&named));
    std::iter::once(root.join(&named))
        .chain(beside_system)
        .find(|candidate| candidate.is_file())
        .unwrap_or(fallback)
}

/// Locates the `.def` file for a roster character token.
pub fn resolve_character_def(chars_dir: &Path, character: &str) -> Option<PathBuf> {
    let character = character.trim();
    if character.is_empty()
        || character.eq_ignore_ascii_case(EMPTY_CHARACTER)
        || character.eq_ignore_ascii_case(RANDOM_CHARACTER)
    {
        return None;
    }

    let path = chars_dir.join(character);
    if path.is_dir() {
        let base = path.file_name()?.to_string_lossy().to_string();
        let def = path.join(format!("{base}.{DEF_EXTENSION}"));
        return def.is_file().then_some(def);
    }
    if path.is_file() {
        return Some(path);
    }
    let with_extension = chars_dir.join(format!("{character}.{DEF_EXTENSION}"));
    if with_extension.is_file() {
        return Some(with_extension);
    }
    let nested = chars_dir
        .join(character)
        .join(format!("{character}.{DEF_EXTENSION}"));
    nested.is_file().then_some(nested)
}

/// `[Info]` of a character definition, values unquoted.
pub fn read_character_info(def_path: &Path) -> io::Result<IndexMap<String, String>> {
    let text = read_lossy(def_path)?;
    Ok(section_entries(&text, "Info")
        .into_iter()
        .map(|(key, value)| {
            let value = unquote(&value).to_string();
            (key, value)
        })
        .collect())
}

pub(crate) fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_entries_stop_at_next_header() {
        let text = "[Info]\nname = \"Kung Fu Man\" ; quoted\n[Files]\nname = other\n";
        let entries = section_entries(text, "info");
        assert_eq!(entries, vec![("name".to_string(), "\"Kung Fu Man\"".to_string())]);
    }

    #[test]
    fn layout_follows_select_def_directory() {
        let layout = GameLayout::from_root("/game").with_select_def("/game/custom/select.def");
        assert_eq!(layout.data_dir, PathBuf::from("/game/custom"));
        assert_eq!(layout.chars_dir, PathBuf::from("/game/chars"));
    }

    #[test]
    fn roster_is_found_beside_system_def() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dir.path().join("data");
        fs::create_dir_all(&data).expect("mkdir");
        fs::write(data.join("system.def"), "[Files]\nselect = roster.def ; custom\n").expect("write");
        fs::write(data.join("roster.def"), "[Characters]\n").expect("write");

        let found = locate_select_def(dir.path(), &data.join("system.def"));
        assert_eq!(found, data.join("roster.def"));
    }

    #[test]
    fn unreadable_system_def_falls_back_to_data_dir() {
        let found = locate_select_def(Path::new("/game"), Path::new("/game/data/missing.def"));
        assert_eq!(found, PathBuf::from("/game/data/select.def"));
    }

    #[test]
    fn sentinels_do_not_resolve() {
        assert_eq!(resolve_character_def(Path::new("/nowhere"), "randomselect"), None);
        assert_eq!(resolve_character_def(Path::new("/nowhere"), "empty"), None);
    }
}
