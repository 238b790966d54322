//! Section-aware parser for roster files.
//!
//! Headers are recognized wherever they appear: `[Characters]` and
//! `[ExtraStages]` open structured sections, any other header opens an
//! unstructured one that is kept verbatim. Content the parser cannot place
//! is absorbed into the active section and reported as a [`Diagnostic`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::{Document, LineEnding, Section, StageEntry};
use crate::slot::{GroupMember, Slot};

const CHARACTERS_SECTION: &str = "characters";
const EXTRA_STAGES_SECTION: &str = "extrastages";
const SLOT_KEYWORD: &str = "slot";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    DuplicateSection { name: String },
    StagesBeforeCharacters,
    /// End of file reached inside `slot = {`.
    UnterminatedSlotGroup,
    /// A section header appeared inside `slot = {`.
    InterruptedSlotGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line number.
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::DuplicateSection { name } => {
                write!(f, "line {}: repeated [{}] section", self.line, name)
            }
            DiagnosticKind::StagesBeforeCharacters => write!(
                f,
                "line {}: [ExtraStages] appears before [Characters]",
                self.line
            ),
            DiagnosticKind::UnterminatedSlotGroup => {
                write!(f, "line {}: slot group is never closed", self.line)
            }
            DiagnosticKind::InterruptedSlotGroup => write!(
                f,
                "line {}: section header inside an open slot group",
                self.line
            ),
        }
    }
}

pub fn parse_document(text: &str) -> Document {
    let mut parser = SectionParser::default();
    for (number, raw) in text.split_inclusive('\n').enumerate() {
        parser.feed(number + 1, raw);
    }
    let line_count = text.split_inclusive('\n').count();
    parser.finish(line_count);

    for diagnostic in &parser.diagnostics {
        tracing::warn!(%diagnostic, "roster structure");
    }
    tracing::debug!(
        sections = parser.sections.len(),
        lines = line_count,
        "parsed roster document"
    );

    Document::from_parts(parser.sections, LineEnding::detect(text), parser.diagnostics)
}

/// Name inside `[...]` for header lines.
pub(crate) fn header_name(raw: &str) -> Option<&str> {
    let rest = raw.trim().strip_prefix('[')?;
    let name = rest.split_once(']').map_or(rest, |(name, _)| name);
    Some(name.trim())
}

/// Everything before the first `;`.
pub(crate) fn strip_comment(raw: &str) -> &str {
    raw.split_once(';').map_or(raw, |(content, _)| content)
}

#[derive(Debug)]
struct PendingGroup {
    opened_at: usize,
    members: Vec<GroupMember>,
}

impl PendingGroup {
    fn push_line(&mut self, content: &str) {
        if let Some(member) = GroupMember::from_line(content) {
            self.members.push(member);
        }
    }
}

#[derive(Debug, Default)]
struct SectionParser {
    sections: Vec<Section>,
    diagnostics: Vec<Diagnostic>,
    pending_group: Option<PendingGroup>,
    seen_characters: bool,
    seen_extra_stages: bool,
}

impl SectionParser {
    fn feed(&mut self, number: usize, raw: &str) {
        if let Some(name) = header_name(raw) {
            self.open_section(number, name, raw);
            return;
        }

        match self.sections.last_mut() {
            None => self.sections.push(Section::Unstructured {
                lines: vec![raw.to_string()],
            }),
            Some(Section::Unstructured { lines }) => lines.push(raw.to_string()),
            Some(Section::Characters { .. }) => self.character_line(number, raw),
            Some(Section::ExtraStages { stages, .. }) => {
                let content = strip_comment(raw).trim();
                if !content.is_empty() {
                    stages.push(StageEntry::new(content));
                }
            }
        }
    }

    fn open_section(&mut self, number: usize, name: &str, raw: &str) {
        if self.pending_group.is_some() {
            self.close_group();
            self.diagnostics.push(Diagnostic {
                line: number,
                kind: DiagnosticKind::InterruptedSlotGroup,
            });
        }

        let header = raw.to_string();
        if name.eq_ignore_ascii_case(CHARACTERS_SECTION) {
            if self.seen_characters {
                self.duplicate(number, name);
            }
            self.seen_characters = true;
            self.sections.push(Section::Characters {
                header,
                slots: Vec::new(),
            });
        } else if name.eq_ignore_ascii_case(EXTRA_STAGES_SECTION) {
            if !self.seen_characters {
                self.diagnostics.push(Diagnostic {
                    line: number,
                    kind: DiagnosticKind::StagesBeforeCharacters,
                });
            }
            if self.seen_extra_stages {
                self.duplicate(number, name);
            }
            self.seen_extra_stages = true;
            self.sections.push(Section::ExtraStages {
                header,
                stages: Vec::new(),
            });
        } else {
            self.sections.push(Section::Unstructured {
                lines: vec![header],
            });
        }
    }

    fn character_line(&mut self, number: usize, raw: &str) {
        let content = strip_comment(raw).trim();
        if content.is_empty() {
            return;
        }

        if let Some(group) = self.pending_group.as_mut() {
            match content.split_once('}') {
                Some((last, _)) => {
                    group.push_line(last);
                    self.close_group();
                }
                None => group.push_line(content),
            }
            return;
        }

        if let Some(rest) = slot_group_opening(content) {
            let mut group = PendingGroup {
                opened_at: number,
                members: Vec::new(),
            };
            match rest.split_once('}') {
                Some((inline, _)) => {
                    group.push_line(inline);
                    self.pending_group = Some(group);
                    self.close_group();
                }
                None => {
                    group.push_line(rest);
                    self.pending_group = Some(group);
                }
            }
            return;
        }

        let (character, raw_params) = content.split_once(',').unwrap_or((content, ""));
        self.push_slot(Slot::single(character.trim(), raw_params.trim()));
    }

    /// Empty groups are dropped.
    fn close_group(&mut self) {
        let Some(group) = self.pending_group.take() else {
            return;
        };
        if !group.members.is_empty() {
            self.push_slot(Slot::group(group.members));
        }
    }

    fn push_slot(&mut self, slot: Slot) {
        if let Some(Section::Characters { slots, .. }) = self.sections.last_mut() {
            slots.push(slot);
        }
    }

    fn duplicate(&mut self, number: usize, name: &str) {
        self.diagnostics.push(Diagnostic {
            line: number,
            kind: DiagnosticKind::DuplicateSection {
                name: name.to_string(),
            },
        });
    }

    fn finish(&mut self, last_line: usize) {
        if let Some(group) = &self.pending_group {
            tracing::debug!(opened_at = group.opened_at, "closing slot group at end of file");
            self.diagnostics.push(Diagnostic {
                line: last_line,
                kind: DiagnosticKind::UnterminatedSlotGroup,
            });
            self.close_group();
        }
    }
}

/// Text after `{` when `content` opens a `slot = {` block.
fn slot_group_opening(content: &str) -> Option<&str> {
    let keyword = content.get(..SLOT_KEYWORD.len())?;
    if !keyword.eq_ignore_ascii_case(SLOT_KEYWORD) {
        return None;
    }
    let rest = content[SLOT_KEYWORD.len()..]
        .trim_start()
        .strip_prefix('=')?
        .trim_start()
        .strip_prefix('{')?;
    Some(rest.trim())
}
