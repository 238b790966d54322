//! Canonical writer. Unstructured sections and section headers are emitted
//! verbatim; slots and stages are rebuilt from the model.

use crate::document::{Document, Section};
use crate::slot::Slot;

const GROUP_OPEN: &str = "slot = {";
const GROUP_CLOSE: &str = "}";
const MEMBER_INDENT: &str = "  ";

pub fn serialize(document: &Document) -> String {
    let eol = document.line_ending().as_str();
    let mut out = String::new();

    for section in document.sections() {
        match section {
            Section::Unstructured { lines } => {
                for line in lines {
                    out.push_str(line);
                }
            }
            Section::Characters { header, slots } => {
                push_verbatim(&mut out, header, eol);
                for slot in slots {
                    write_slot(&mut out, slot, eol);
                }
            }
            Section::ExtraStages { header, stages } => {
                push_verbatim(&mut out, header, eol);
                for stage in stages {
                    push_line(&mut out, stage.as_str(), eol);
                }
            }
        }
    }

    out
}

fn write_slot(out: &mut String, slot: &Slot, eol: &str) {
    match slot {
        Slot::Group { members } => {
            if members.is_empty() {
                return;
            }
            push_line(out, GROUP_OPEN, eol);
            for member in members {
                push_line(out, &format!("{MEMBER_INDENT}{}", member.to_line()), eol);
            }
            push_line(out, GROUP_CLOSE, eol);
        }
        Slot::Single {
            character,
            raw_params,
        } => {
            let character = if character.is_empty() {
                crate::slot::EMPTY_CHARACTER
            } else {
                character.as_str()
            };
            if raw_params.is_empty() {
                push_line(out, character, eol);
            } else {
                push_line(out, &format!("{character}, {raw_params}"), eol);
            }
        }
    }
}

fn push_verbatim(out: &mut String, raw: &str, eol: &str) {
    start_line(out, eol);
    out.push_str(raw);
}

fn push_line(out: &mut String, line: &str, eol: &str) {
    start_line(out, eol);
    out.push_str(line);
    out.push_str(eol);
}

/// The last line of a file may lack a terminator; add one before anything
/// else is appended after it.
fn start_line(out: &mut String, eol: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(eol);
    }
}
