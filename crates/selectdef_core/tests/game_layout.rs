use std::path::PathBuf;

use selectdef_core::defs::{self, GameLayout};
use selectdef_core::scan;

fn game_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/game")
}

#[test]
fn layout_points_at_conventional_directories() {
    let layout = GameLayout::from_root(game_root());
    assert!(layout.chars_dir.is_dir());
    assert!(layout.stages_dir.is_dir());
    assert!(layout.select_def.is_file());
    assert_eq!(layout.data_dir, game_root().join("data"));
}

#[test]
fn system_def_names_the_roster() {
    let layout = GameLayout::from_root(game_root());
    let select = defs::find_select_def(&layout.data_dir.join("system.def")).expect("read system.def");
    assert_eq!(select.as_deref(), Some("data/select.def"));
    assert_eq!(
        defs::locate_select_def(&layout.root, &layout.data_dir.join("system.def")),
        layout.root.join("data/select.def")
    );
}

#[test]
fn scanner_lists_characters_and_stages() {
    let layout = GameLayout::from_root(game_root());
    assert_eq!(scan::scan_characters(&layout.chars_dir), vec!["kfm", "ryu"]);

    let stages: Vec<String> = scan::scan_stages(&layout.stages_dir)
        .into_iter()
        .map(|stage| stage.path)
        .collect();
    assert_eq!(stages, vec!["stages/kfm.def", "stages/stage0.def"]);
}

#[test]
fn character_info_resolves_through_folder_token() {
    let layout = GameLayout::from_root(game_root());
    let def = defs::resolve_character_def(&layout.chars_dir, "kfm").expect("kfm def");
    let info = defs::read_character_info(&def).expect("read info");
    assert_eq!(info.get("displayname").map(String::as_str), Some("Kung Fu Man"));
    assert_eq!(info.get("author").map(String::as_str), Some("Elecbyte"));

    assert!(defs::resolve_character_def(&layout.chars_dir, "randomselect").is_none());
    assert!(defs::resolve_character_def(&layout.chars_dir, "nobody").is_none());
}
