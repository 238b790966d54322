use std::path::PathBuf;

use selectdef_core::core_api::{Engine, Session};
use selectdef_core::grid::GridDimensions;
use selectdef_core::scan::StageFile;
use selectdef_render::{
    JsonStyle, render_document_json, render_document_text, render_grid_text, render_scan_json,
    render_slot_json, render_slot_text, render_stages_text,
};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_session() -> Session {
    Engine::new()
        .open_path(workspace_root().join("tests/fixtures/select.def"))
        .expect("fixture should open")
}

fn keys(value: &serde_json::Value) -> Vec<&str> {
    value
        .as_object()
        .expect("json should be an object")
        .keys()
        .map(String::as_str)
        .collect()
}

#[test]
fn document_json_uses_canonical_top_level_order() {
    let session = fixture_session();
    let value = render_document_json(&session, GridDimensions::new(2, 4), JsonStyle::CanonicalV1);
    assert_eq!(
        keys(&value),
        vec![
            "path",
            "line_ending",
            "grid",
            "summary",
            "slots",
            "stages",
            "diagnostics",
        ]
    );
    assert_eq!(value["line_ending"], "lf");
    assert_eq!(value["summary"]["slots"], 6);
    assert_eq!(value["slots"][5]["row"], 1);
    assert_eq!(value["slots"][5]["col"], 1);
    assert_eq!(value["slots"][4]["kind"], "group");
    assert_eq!(value["slots"][4]["members"][1]["previous"], "x");
    assert_eq!(value["slots"][1]["params"]["fields"]["music"], "sound/ryu.mp3");
    assert_eq!(value["stages"][1]["path"], "stages/training.def");
}

#[test]
fn slot_json_for_single_keeps_raw_params() {
    let session = fixture_session();
    let value = render_slot_json(&session, GridDimensions::default(), 0, JsonStyle::CanonicalV1)
        .expect("slot 0 exists");
    assert_eq!(
        keys(&value),
        vec!["index", "row", "col", "kind", "character", "raw_params", "params"]
    );
    assert_eq!(value["raw_params"], "stages/kfm.def, order=1");
    assert!(render_slot_json(&session, GridDimensions::default(), 60, JsonStyle::CanonicalV1).is_none());
}

#[test]
fn grid_text_shows_cells_and_overflow() {
    let session = fixture_session();
    let rendered = render_grid_text(&session, GridDimensions::new(1, 4));
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "    0            1            2            3");
    assert_eq!(
        lines[1],
        "0   kfm          ryu          Random       Empty"
    );
    assert_eq!(lines[2], "2 slot(s) beyond the 1x4 grid");
}

#[test]
fn grid_text_clamps_oversized_dimensions() {
    let session = fixture_session();
    let rendered = render_grid_text(&session, GridDimensions::new(usize::MAX, usize::MAX));
    assert_eq!(rendered.lines().count(), 257);
    assert!(rendered.lines().nth(1).expect("first row").starts_with("0   kfm"));
}

#[test]
fn grid_text_pads_unoccupied_cells() {
    let session = fixture_session();
    let rendered = render_grid_text(&session, GridDimensions::new(2, 4));
    assert!(rendered.contains("ken[2]"));
    assert!(rendered.lines().nth(2).expect("second row").ends_with("Empty"));
    assert!(!rendered.contains("beyond"));
}

#[test]
fn slot_text_lists_group_members_and_single_params() {
    let session = fixture_session();
    let grid = GridDimensions::new(10, 4);

    let group = render_slot_text(&session, grid, 4).expect("group slot");
    assert!(group.starts_with("Slot 4 (row 1, col 0): group\n"));
    assert!(group.contains("   0. ken, next=a\n"));
    assert!(group.contains("   1. sagat, previous=x, select=/s+a\n"));

    let single = render_slot_text(&session, grid, 1).expect("single slot");
    assert!(single.contains("Character: ryu\n"));
    assert!(single.contains("Stages: stages/ryu.def\n"));
    assert!(single.contains("  order = 2\n"));
}

#[test]
fn stages_and_document_text_sections() {
    let session = fixture_session();
    let stages = render_stages_text(&session);
    assert!(stages.contains("   1  stages/training.def, music=sound/train.mp3"));

    let document = render_document_text(&session, GridDimensions::default());
    assert!(document.contains("Slots: 6 (3 characters, 1 groups, 1 random, 1 empty)"));
    assert!(document.contains("Grid: 10 rows x 10 columns (100 cells)"));
    assert!(document.contains(" ::: Extra Stages :::"));
    assert!(!document.contains("Warnings"));
}

#[test]
fn document_text_lists_diagnostics() {
    let session = Engine::new().open_bytes("[ExtraStages]\nstages/a.def\n[Characters]\nkfm\n");
    let document = render_document_text(&session, GridDimensions::default());
    assert!(document.contains(" ::: Warnings :::"));
    assert!(document.contains("line 1: [ExtraStages] appears before [Characters]"));
}

#[test]
fn scan_json_orders_characters_then_stages() {
    let characters = vec!["kfm".to_string()];
    let stages = vec![StageFile {
        path: "stages/kfm.def".to_string(),
        name: "kfm".to_string(),
    }];
    let value = render_scan_json(&characters, &stages, JsonStyle::CanonicalV1);
    assert_eq!(keys(&value), vec!["characters", "stages"]);
    assert_eq!(value["stages"][0]["path"], "stages/kfm.def");
}
