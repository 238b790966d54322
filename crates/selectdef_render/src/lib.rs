use std::fmt::Write as _;

use selectdef_core::core_api::{Session, SlotKind, Summary};
use selectdef_core::grid::{GridDimensions, MAX_DIMENSION};
use selectdef_core::scan::StageFile;
use selectdef_core::{Diagnostic, GroupMember, LineEnding, ParamString, Slot, StageEntry};
use serde_json::{Map as JsonMap, Value as JsonValue};

const CELL_NAME_WIDTH: usize = 8;
const CELL_WIDTH: usize = 12;
const ROW_LABEL_WIDTH: usize = 4;
const INDEX_WIDTH: usize = 4;
const EMPTY_LABEL: &str = "Empty";
const RANDOM_LABEL: &str = "Random";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Path, counts, grid, stages and any diagnostics.
pub fn render_document_text(session: &Session, grid: GridDimensions) -> String {
    let mut out = String::new();
    if let Some(path) = session.path() {
        writeln!(out, "File: {}", path.display()).expect("writing to String cannot fail");
    }
    write_summary(&mut out, &session.summary(), grid);
    writeln!(out).expect("writing to String cannot fail");
    out.push_str(&render_grid_text(session, grid));
    writeln!(out).expect("writing to String cannot fail");
    out.push_str(&render_stages_text(session));

    let diagnostics = session.diagnostics();
    if !diagnostics.is_empty() {
        writeln!(out).expect("writing to String cannot fail");
        writeln!(out, " ::: Warnings :::").expect("writing to String cannot fail");
        for diagnostic in diagnostics {
            writeln!(out, "{diagnostic}").expect("writing to String cannot fail");
        }
    }
    out
}

/// One cell per grid position. Slots past the grid's capacity are counted
/// below it. Dimensions past `MAX_DIMENSION` are clamped.
pub fn render_grid_text(session: &Session, grid: GridDimensions) -> String {
    let mut out = String::new();
    let slots = session.slots();
    let grid = GridDimensions::new(grid.rows.min(MAX_DIMENSION), grid.cols.min(MAX_DIMENSION));

    let mut header = " ".repeat(ROW_LABEL_WIDTH);
    for col in 0..grid.cols {
        write!(header, "{:<width$}", col, width = CELL_WIDTH + 1)
            .expect("writing to String cannot fail");
    }
    writeln!(out, "{}", header.trim_end()).expect("writing to String cannot fail");

    for row in 0..grid.rows {
        let mut line = format!("{:<width$}", row, width = ROW_LABEL_WIDTH);
        for col in 0..grid.cols {
            let label = cell_label(slots.get(row.saturating_mul(grid.cols).saturating_add(col)));
            write!(line, "{:<width$} ", label, width = CELL_WIDTH)
                .expect("writing to String cannot fail");
        }
        writeln!(out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }

    let overflow = slots.len().saturating_sub(grid.capacity());
    if overflow > 0 {
        writeln!(
            out,
            "{overflow} slot(s) beyond the {}x{} grid",
            grid.rows, grid.cols
        )
        .expect("writing to String cannot fail");
    }
    out
}

pub fn render_stages_text(session: &Session) -> String {
    let mut out = String::new();
    writeln!(out, " ::: Extra Stages :::").expect("writing to String cannot fail");
    let stages = session.stages();
    if stages.is_empty() {
        writeln!(out, "none").expect("writing to String cannot fail");
    }
    for (index, stage) in stages.iter().enumerate() {
        writeln!(out, "{:>width$}  {}", index, stage.as_str(), width = INDEX_WIDTH)
            .expect("writing to String cannot fail");
    }
    out
}

/// Detail view of one slot, or `None` past the end of the roster.
pub fn render_slot_text(session: &Session, grid: GridDimensions, index: usize) -> Option<String> {
    let slot = session.slot(index)?;
    let address = grid.address(index);
    let mut out = String::new();
    writeln!(
        out,
        "Slot {index} (row {}, col {}): {}",
        address.row,
        address.col,
        SlotKind::of(slot).as_str()
    )
    .expect("writing to String cannot fail");

    match slot {
        Slot::Single {
            character,
            raw_params,
        } => {
            writeln!(out, "Character: {character}").expect("writing to String cannot fail");
            let params = ParamString::parse(raw_params);
            if !params.positional.is_empty() {
                writeln!(out, "Stages: {}", params.positional.join(", "))
                    .expect("writing to String cannot fail");
            }
            for (key, value) in &params.fields {
                writeln!(out, "  {key} = {value}").expect("writing to String cannot fail");
            }
        }
        Slot::Group { members } => {
            for (position, member) in members.iter().enumerate() {
                writeln!(out, "{:>width$}. {}", position, member.to_line(), width = INDEX_WIDTH)
                    .expect("writing to String cannot fail");
            }
        }
    }
    Some(out)
}

pub fn render_scan_text(characters: &[String], stages: &[StageFile]) -> String {
    let mut out = String::new();
    writeln!(out, " ::: Characters ({}) :::", characters.len())
        .expect("writing to String cannot fail");
    for character in characters {
        writeln!(out, "{character}").expect("writing to String cannot fail");
    }
    writeln!(out).expect("writing to String cannot fail");
    writeln!(out, " ::: Stages ({}) :::", stages.len()).expect("writing to String cannot fail");
    for stage in stages {
        writeln!(out, "{:<24} {}", fit_column(&stage.name, 24), stage.path)
            .expect("writing to String cannot fail");
    }
    out
}

fn write_summary(out: &mut String, summary: &Summary, grid: GridDimensions) {
    writeln!(
        out,
        "Slots: {} ({} characters, {} groups, {} random, {} empty)",
        summary.slot_count,
        summary.character_count,
        summary.group_count,
        summary.random_count,
        summary.empty_count
    )
    .expect("writing to String cannot fail");
    writeln!(out, "Extra stages: {}", summary.stage_count).expect("writing to String cannot fail");
    writeln!(
        out,
        "Grid: {} rows x {} columns ({} cells)",
        grid.rows,
        grid.cols,
        grid.capacity()
    )
    .expect("writing to String cannot fail");
}

fn cell_label(slot: Option<&Slot>) -> String {
    let Some(slot) = slot else {
        return EMPTY_LABEL.to_string();
    };
    match SlotKind::of(slot) {
        SlotKind::Empty => EMPTY_LABEL.to_string(),
        SlotKind::Random => RANDOM_LABEL.to_string(),
        SlotKind::Character => short_name(slot.primary_character().unwrap_or_default()),
        SlotKind::Group => {
            let count = slot.characters().len();
            format!(
                "{}[{count}]",
                short_name(slot.primary_character().unwrap_or_default())
            )
        }
    }
}

/// First eight characters, path components included.
fn short_name(name: &str) -> String {
    name.chars().take(CELL_NAME_WIDTH).collect()
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }
    let mut out: String = value.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

pub fn render_document_json(
    session: &Session,
    grid: GridDimensions,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(document_json(session, grid)),
    }
}

pub fn render_slot_json(
    session: &Session,
    grid: GridDimensions,
    index: usize,
    style: JsonStyle,
) -> Option<JsonValue> {
    let slot = session.slot(index)?;
    match style {
        JsonStyle::CanonicalV1 => Some(slot_to_json(index, slot, grid)),
    }
}

pub fn render_scan_json(characters: &[String], stages: &[StageFile], style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => {
            let mut out = JsonMap::new();
            out.insert(
                "characters".to_string(),
                JsonValue::Array(characters.iter().cloned().map(JsonValue::String).collect()),
            );
            out.insert(
                "stages".to_string(),
                JsonValue::Array(
                    stages
                        .iter()
                        .map(|stage| {
                            let mut m = JsonMap::new();
                            m.insert("name".to_string(), JsonValue::String(stage.name.clone()));
                            m.insert("path".to_string(), JsonValue::String(stage.path.clone()));
                            JsonValue::Object(m)
                        })
                        .collect(),
                ),
            );
            JsonValue::Object(out)
        }
    }
}

fn document_json(session: &Session, grid: GridDimensions) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert(
        "path".to_string(),
        match session.path() {
            Some(path) => JsonValue::String(path.display().to_string()),
            None => JsonValue::Null,
        },
    );
    out.insert(
        "line_ending".to_string(),
        JsonValue::String(
            match session.document().line_ending() {
                LineEnding::Lf => "lf",
                LineEnding::CrLf => "crlf",
            }
            .to_string(),
        ),
    );
    out.insert("grid".to_string(), grid_to_json(grid));
    out.insert("summary".to_string(), summary_to_json(&session.summary()));
    out.insert(
        "slots".to_string(),
        JsonValue::Array(
            session
                .slots()
                .iter()
                .enumerate()
                .map(|(index, slot)| slot_to_json(index, slot, grid))
                .collect(),
        ),
    );
    out.insert(
        "stages".to_string(),
        JsonValue::Array(
            session
                .stages()
                .iter()
                .enumerate()
                .map(|(index, stage)| stage_to_json(index, stage))
                .collect(),
        ),
    );
    out.insert(
        "diagnostics".to_string(),
        JsonValue::Array(session.diagnostics().iter().map(diagnostic_to_json).collect()),
    );
    out
}

fn grid_to_json(grid: GridDimensions) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("rows".to_string(), JsonValue::from(grid.rows));
    m.insert("cols".to_string(), JsonValue::from(grid.cols));
    JsonValue::Object(m)
}

fn summary_to_json(summary: &Summary) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("slots".to_string(), JsonValue::from(summary.slot_count));
    m.insert("characters".to_string(), JsonValue::from(summary.character_count));
    m.insert("groups".to_string(), JsonValue::from(summary.group_count));
    m.insert("random".to_string(), JsonValue::from(summary.random_count));
    m.insert("empty".to_string(), JsonValue::from(summary.empty_count));
    m.insert("stages".to_string(), JsonValue::from(summary.stage_count));
    m.insert("sections".to_string(), JsonValue::from(summary.section_count));
    m.insert("diagnostics".to_string(), JsonValue::from(summary.diagnostic_count));
    JsonValue::Object(m)
}

fn slot_to_json(index: usize, slot: &Slot, grid: GridDimensions) -> JsonValue {
    let address = grid.address(index);
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(index));
    m.insert("row".to_string(), JsonValue::from(address.row));
    m.insert("col".to_string(), JsonValue::from(address.col));
    m.insert(
        "kind".to_string(),
        JsonValue::String(SlotKind::of(slot).as_str().to_string()),
    );
    match slot {
        Slot::Single {
            character,
            raw_params,
        } => {
            m.insert("character".to_string(), JsonValue::String(character.clone()));
            m.insert("raw_params".to_string(), JsonValue::String(raw_params.clone()));
            m.insert("params".to_string(), params_to_json(&ParamString::parse(raw_params)));
        }
        Slot::Group { members } => {
            m.insert(
                "members".to_string(),
                JsonValue::Array(members.iter().map(member_to_json).collect()),
            );
        }
    }
    JsonValue::Object(m)
}

fn member_to_json(member: &GroupMember) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("character".to_string(), JsonValue::String(member.character.clone()));
    m.insert("next".to_string(), JsonValue::String(member.next.clone()));
    m.insert("previous".to_string(), JsonValue::String(member.previous.clone()));
    m.insert("select".to_string(), JsonValue::String(member.select.clone()));
    if !member.extra.is_empty() {
        m.insert("extra".to_string(), JsonValue::String(member.extra.clone()));
    }
    JsonValue::Object(m)
}

fn stage_to_json(index: usize, stage: &StageEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(index));
    m.insert("path".to_string(), JsonValue::String(stage.path().to_string()));
    m.insert("line".to_string(), JsonValue::String(stage.as_str().to_string()));
    m.insert("params".to_string(), params_to_json(&stage.params()));
    JsonValue::Object(m)
}

fn params_to_json(params: &ParamString) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "positional".to_string(),
        JsonValue::Array(params.positional.iter().cloned().map(JsonValue::String).collect()),
    );
    let fields: JsonMap<String, JsonValue> = params
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), JsonValue::String(value.clone())))
        .collect();
    m.insert("fields".to_string(), JsonValue::Object(fields));
    JsonValue::Object(m)
}

fn diagnostic_to_json(diagnostic: &Diagnostic) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("line".to_string(), JsonValue::from(diagnostic.line));
    m.insert("message".to_string(), JsonValue::String(diagnostic.to_string()));
    JsonValue::Object(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_labels_follow_slot_kind() {
        assert_eq!(cell_label(None), "Empty");
        assert_eq!(cell_label(Some(&Slot::empty())), "Empty");
        assert_eq!(cell_label(Some(&Slot::random())), "Random");
        assert_eq!(cell_label(Some(&Slot::single("chunli_alpha", ""))), "chunli_a");
        let group = Slot::group(vec![GroupMember::new("ryu"), GroupMember::new("ken")]);
        assert_eq!(cell_label(Some(&group)), "ryu[2]");
    }

    #[test]
    fn fit_column_truncates_with_ellipsis() {
        assert_eq!(fit_column("short", 10), "short");
        assert_eq!(fit_column("a_very_long_stage_name", 10), "a_very_...");
    }
}
