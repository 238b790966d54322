use serde::{Deserialize, Serialize};

use crate::grid::MAX_DIMENSION;
use crate::params::{self, CHARACTER_MANAGED_KEYS, ParamString, STAGE_MANAGED_KEYS};
use crate::parser::{self, Diagnostic};
use crate::serializer;
use crate::slot::{GroupMember, Slot};

pub const CHARACTERS_HEADER: &str = "[Characters]";
pub const EXTRA_STAGES_HEADER: &str = "[ExtraStages]";

/// Highest slot count an edit may pad the roster up to: the largest grid a
/// motif can declare.
pub const MAX_SLOTS: usize = MAX_DIMENSION * MAX_DIMENSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn native() -> Self {
        if cfg!(windows) { Self::CrLf } else { Self::Lf }
    }

    /// Terminator of the first line in `text`, or the native one when the
    /// text has no line breaks.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(pos) if text[..pos].ends_with('\r') => Self::CrLf,
            Some(_) => Self::Lf,
            None => Self::native(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// One line of `[ExtraStages]`. Only the leading path is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageEntry {
    line: String,
}

impl StageEntry {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn path(&self) -> &str {
        self.line.split(',').next().unwrap_or("").trim()
    }

    pub fn params(&self) -> ParamString {
        params::parse(&self.line)
    }

    pub fn set_params(&mut self, params: &ParamString) {
        self.line = params.to_string_with(STAGE_MANAGED_KEYS);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    /// Lines reproduced byte-for-byte, terminators included.
    Unstructured { lines: Vec<String> },
    Characters { header: String, slots: Vec<Slot> },
    ExtraStages { header: String, stages: Vec<StageEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("slot index {index} out of range ({len} slots)")]
    SlotOutOfRange { index: usize, len: usize },
    #[error("member index {index} out of range for slot {slot} ({len} members)")]
    MemberOutOfRange {
        slot: usize,
        index: usize,
        len: usize,
    },
    #[error("stage index {index} out of range ({len} stages)")]
    StageOutOfRange { index: usize, len: usize },
    #[error("slot {0} is a slot group, not a single character")]
    NotASingle(usize),
    #[error("slot {0} is not a slot group")]
    NotAGroup(usize),
    #[error("slot group must have at least one character")]
    EmptyGroup,
    #[error("character name cannot be empty")]
    EmptyCharacter,
    #[error("stage path cannot be empty")]
    EmptyStagePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    sections: Vec<Section>,
    line_ending: LineEnding,
    diagnostics: Vec<Diagnostic>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            line_ending: LineEnding::native(),
            diagnostics: Vec::new(),
        }
    }
}

impl Document {
    pub fn parse(text: &str) -> Self {
        parser::parse_document(text)
    }

    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    pub(crate) fn from_parts(
        sections: Vec<Section>,
        line_ending: LineEnding,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            sections,
            line_ending,
            diagnostics,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn to_text(&self) -> String {
        serializer::serialize(self)
    }

    /// Slots of the first `[Characters]` section.
    pub fn slots(&self) -> &[Slot] {
        self.sections
            .iter()
            .find_map(|section| match section {
                Section::Characters { slots, .. } => Some(slots.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots().get(index)
    }

    /// Entries of the first `[ExtraStages]` section.
    pub fn stages(&self) -> &[StageEntry] {
        self.sections
            .iter()
            .find_map(|section| match section {
                Section::ExtraStages { stages, .. } => Some(stages.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn stage(&self, index: usize) -> Option<&StageEntry> {
        self.stages().get(index)
    }

    // -----------------------------------------------------------------------
    // Slot edits
    // -----------------------------------------------------------------------

    /// Replaces slot `index` with a plain character, padding with `empty`
    /// slots when `index` is past the end.
    pub fn assign_character(&mut self, index: usize, character: &str) -> Result<(), EditError> {
        let character = character.trim();
        if character.is_empty() {
            return Err(EditError::EmptyCharacter);
        }
        self.set_slot(index, Slot::single(character, ""))
    }

    pub fn set_slot(&mut self, index: usize, slot: Slot) -> Result<(), EditError> {
        check_padding(self.slots(), index)?;
        let slots = self.slots_mut();
        pad_slots(slots, index);
        slots[index] = slot;
        Ok(())
    }

    pub fn set_raw_params(&mut self, index: usize, raw: &str) -> Result<(), EditError> {
        let raw_params = self.single_params_mut(index)?;
        *raw_params = raw.trim().to_string();
        Ok(())
    }

    /// Sets one key of a single's parameters and re-canonicalizes them.
    pub fn set_character_param(
        &mut self,
        index: usize,
        key: &str,
        value: &str,
    ) -> Result<(), EditError> {
        let raw_params = self.single_params_mut(index)?;
        let mut parsed = params::parse(raw_params);
        parsed.set(key, value);
        *raw_params = parsed.to_string_with(CHARACTER_MANAGED_KEYS);
        Ok(())
    }

    /// Replaces the positional stage tokens of a single.
    pub fn set_character_stages(&mut self, index: usize, stages: &[String]) -> Result<(), EditError> {
        let raw_params = self.single_params_mut(index)?;
        let mut parsed = params::parse(raw_params);
        parsed.set_positional(stages);
        *raw_params = parsed.to_string_with(CHARACTER_MANAGED_KEYS);
        Ok(())
    }

    /// Moves a slot, shifting the ones in between. A destination past the end
    /// pads the roster first.
    pub fn move_slot(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        check_padding(self.slots(), to)?;
        let slots = self.existing_slots_mut(from)?;
        pad_slots(slots, to);
        let slot = slots.remove(from);
        slots.insert(to, slot);
        Ok(())
    }

    pub fn swap_slots(&mut self, a: usize, b: usize) -> Result<(), EditError> {
        check_padding(self.slots(), a.max(b))?;
        let slots = self.existing_slots_mut(a.min(b))?;
        pad_slots(slots, a.max(b));
        slots.swap(a, b);
        Ok(())
    }

    pub fn remove_slot(&mut self, index: usize) -> Result<Slot, EditError> {
        let slots = self.existing_slots_mut(index)?;
        Ok(slots.remove(index))
    }

    /// Drops trailing empty slots; returns how many were removed.
    pub fn truncate_empty_tail(&mut self) -> usize {
        let Some(position) = self.characters_position() else {
            return 0;
        };
        let Section::Characters { slots, .. } = &mut self.sections[position] else {
            return 0;
        };
        let keep = slots
            .iter()
            .rposition(|slot| !slot.is_empty())
            .map_or(0, |pos| pos + 1);
        let removed = slots.len() - keep;
        slots.truncate(keep);
        removed
    }

    // -----------------------------------------------------------------------
    // Slot group edits
    // -----------------------------------------------------------------------

    pub fn make_group(&mut self, index: usize, members: Vec<GroupMember>) -> Result<(), EditError> {
        if members.is_empty() {
            return Err(EditError::EmptyGroup);
        }
        self.set_slot(index, Slot::group(members))
    }

    /// Keeps only the primary character, with no parameters.
    pub fn convert_to_single(&mut self, index: usize) -> Result<(), EditError> {
        let slots = self.existing_slots_mut(index)?;
        let replacement = match &slots[index] {
            Slot::Group { members } => match members.first() {
                Some(primary) => Slot::single(primary.character.clone(), ""),
                None => Slot::empty(),
            },
            Slot::Single { .. } => return Err(EditError::NotAGroup(index)),
        };
        slots[index] = replacement;
        Ok(())
    }

    /// Appends a member. A non-empty single becomes the primary member of a
    /// new group; an empty or missing slot starts a fresh group.
    pub fn add_group_member(&mut self, index: usize, member: GroupMember) -> Result<(), EditError> {
        if member.character.trim().is_empty() {
            return Err(EditError::EmptyCharacter);
        }
        check_padding(self.slots(), index)?;
        let slots = self.slots_mut();
        pad_slots(slots, index);
        let slot = &mut slots[index];
        if let Slot::Group { members } = slot {
            members.push(member);
            return Ok(());
        }

        let mut members = Vec::with_capacity(2);
        if !slot.is_empty()
            && let Some(primary) = slot.primary_character()
        {
            members.push(GroupMember::new(primary));
        }
        members.push(member);
        *slot = Slot::group(members);
        Ok(())
    }

    /// Removing the last member leaves an empty group, which is not written.
    pub fn remove_group_member(&mut self, index: usize, member: usize) -> Result<GroupMember, EditError> {
        let members = self.group_members_mut(index)?;
        check_member(members, index, member)?;
        Ok(members.remove(member))
    }

    pub fn move_group_member(&mut self, index: usize, from: usize, to: usize) -> Result<(), EditError> {
        let members = self.group_members_mut(index)?;
        check_member(members, index, from)?;
        check_member(members, index, to)?;
        let member = members.remove(from);
        members.insert(to, member);
        Ok(())
    }

    pub fn set_group_member_field(
        &mut self,
        index: usize,
        member: usize,
        key: &str,
        value: &str,
    ) -> Result<(), EditError> {
        let members = self.group_members_mut(index)?;
        check_member(members, index, member)?;
        members[member].set_field(key, value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stage edits
    // -----------------------------------------------------------------------

    pub fn add_stage(&mut self, line: &str) -> Result<(), EditError> {
        let entry = stage_entry(line)?;
        self.stages_mut().push(entry);
        Ok(())
    }

    pub fn remove_stage(&mut self, index: usize) -> Result<StageEntry, EditError> {
        let stages = self.existing_stages_mut(index)?;
        Ok(stages.remove(index))
    }

    pub fn update_stage(&mut self, index: usize, line: &str) -> Result<(), EditError> {
        let entry = stage_entry(line)?;
        let stages = self.existing_stages_mut(index)?;
        stages[index] = entry;
        Ok(())
    }

    /// Replaces the leading path token, keeping every other token.
    pub fn set_stage_path(&mut self, index: usize, path: &str) -> Result<(), EditError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(EditError::EmptyStagePath);
        }
        let stages = self.existing_stages_mut(index)?;
        let mut parsed = stages[index].params();
        match parsed.positional.first_mut() {
            Some(first) => *first = path.to_string(),
            None => parsed.positional.push(path.to_string()),
        }
        stages[index].set_params(&parsed);
        Ok(())
    }

    pub fn set_stage_param(&mut self, index: usize, key: &str, value: &str) -> Result<(), EditError> {
        let stages = self.existing_stages_mut(index)?;
        let mut parsed = stages[index].params();
        parsed.set(key, value);
        stages[index].set_params(&parsed);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Section access
    // -----------------------------------------------------------------------

    /// Slots of the first characters section, created when missing. Edits
    /// that only touch existing slots use `existing_slots_mut` instead.
    fn slots_mut(&mut self) -> &mut Vec<Slot> {
        let position = match self.characters_position() {
            Some(position) => position,
            None => {
                let position = self
                    .extra_stages_position()
                    .unwrap_or(self.sections.len());
                let header = format!("{CHARACTERS_HEADER}{}", self.line_ending.as_str());
                self.sections.insert(
                    position,
                    Section::Characters {
                        header,
                        slots: Vec::new(),
                    },
                );
                position
            }
        };
        match &mut self.sections[position] {
            Section::Characters { slots, .. } => slots,
            _ => unreachable!("position points at a characters section"),
        }
    }

    /// Checks `index` against the current roster without creating a section.
    fn existing_slots_mut(&mut self, index: usize) -> Result<&mut Vec<Slot>, EditError> {
        check_slot(self.slots(), index)?;
        Ok(self.slots_mut())
    }

    fn existing_stages_mut(&mut self, index: usize) -> Result<&mut Vec<StageEntry>, EditError> {
        check_stage(self.stages(), index)?;
        Ok(self.stages_mut())
    }

    fn stages_mut(&mut self) -> &mut Vec<StageEntry> {
        let position = match self.extra_stages_position() {
            Some(position) => position,
            None => {
                let position = self
                    .characters_position()
                    .map_or(self.sections.len(), |pos| pos + 1);
                let header = format!("{EXTRA_STAGES_HEADER}{}", self.line_ending.as_str());
                self.sections.insert(
                    position,
                    Section::ExtraStages {
                        header,
                        stages: Vec::new(),
                    },
                );
                position
            }
        };
        match &mut self.sections[position] {
            Section::ExtraStages { stages, .. } => stages,
            _ => unreachable!("position points at an extra stages section"),
        }
    }

    fn characters_position(&self) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| matches!(section, Section::Characters { .. }))
    }

    fn extra_stages_position(&self) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| matches!(section, Section::ExtraStages { .. }))
    }

    fn single_params_mut(&mut self, index: usize) -> Result<&mut String, EditError> {
        let slots = self.existing_slots_mut(index)?;
        match &mut slots[index] {
            Slot::Single { raw_params, .. } => Ok(raw_params),
            Slot::Group { .. } => Err(EditError::NotASingle(index)),
        }
    }

    fn group_members_mut(&mut self, index: usize) -> Result<&mut Vec<GroupMember>, EditError> {
        let slots = self.existing_slots_mut(index)?;
        match &mut slots[index] {
            Slot::Group { members } => Ok(members),
            Slot::Single { .. } => Err(EditError::NotAGroup(index)),
        }
    }
}

/// Padding may grow the roster up to `MAX_SLOTS`, never past it.
fn check_padding(slots: &[Slot], index: usize) -> Result<(), EditError> {
    if index < slots.len().max(MAX_SLOTS) {
        Ok(())
    } else {
        Err(EditError::SlotOutOfRange {
            index,
            len: slots.len(),
        })
    }
}

/// Grows `slots` with `empty` until `index` exists. Callers run
/// `check_padding` first.
fn pad_slots(slots: &mut Vec<Slot>, index: usize) {
    if let Some(len) = index.checked_add(1)
        && slots.len() < len
    {
        slots.resize(len, Slot::empty());
    }
}

fn check_slot(slots: &[Slot], index: usize) -> Result<(), EditError> {
    if index < slots.len() {
        Ok(())
    } else {
        Err(EditError::SlotOutOfRange {
            index,
            len: slots.len(),
        })
    }
}

fn check_member(members: &[GroupMember], slot: usize, index: usize) -> Result<(), EditError> {
    if index < members.len() {
        Ok(())
    } else {
        Err(EditError::MemberOutOfRange {
            slot,
            index,
            len: members.len(),
        })
    }
}

fn check_stage(stages: &[StageEntry], index: usize) -> Result<(), EditError> {
    if index < stages.len() {
        Ok(())
    } else {
        Err(EditError::StageOutOfRange {
            index,
            len: stages.len(),
        })
    }
}

fn stage_entry(line: &str) -> Result<StageEntry, EditError> {
    let entry = StageEntry::new(line.trim());
    if entry.path().is_empty() {
        return Err(EditError::EmptyStagePath);
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse("[Characters]\nkfm, stages/kfm.def, order=1\nryu\n[ExtraStages]\nstages/a.def, music=a.mp3\n")
    }

    #[test]
    fn assign_past_end_pads_with_empty() {
        let mut document = doc();
        document.assign_character(4, "ken").expect("assign");
        let names: Vec<_> = document.slots().iter().map(|s| s.characters()[0]).collect();
        assert_eq!(names, vec!["kfm", "ryu", "empty", "empty", "ken"]);
    }

    #[test]
    fn assign_rejects_blank_name() {
        let mut document = doc();
        assert_eq!(document.assign_character(0, "  "), Err(EditError::EmptyCharacter));
    }

    #[test]
    fn character_param_edit_canonicalizes_order() {
        let mut document = doc();
        document.set_character_param(0, "music", "sound/a.mp3").expect("set");
        assert_eq!(
            document.slot(0),
            Some(&Slot::single("kfm", "stages/kfm.def, music=sound/a.mp3, order=1"))
        );
    }

    #[test]
    fn move_slot_shifts_neighbours() {
        let mut document = doc();
        document.move_slot(0, 1).expect("move");
        assert_eq!(document.slot(0).and_then(Slot::primary_character), Some("ryu"));
        assert_eq!(document.slot(1).and_then(Slot::primary_character), Some("kfm"));
        assert!(matches!(
            document.move_slot(9, 0),
            Err(EditError::SlotOutOfRange { index: 9, len: 2 })
        ));
    }

    #[test]
    fn add_member_to_single_promotes_it_to_group() {
        let mut document = doc();
        document.add_group_member(1, GroupMember::new("ken")).expect("add");
        let Some(Slot::Group { members }) = document.slot(1) else {
            panic!("expected group");
        };
        let names: Vec<_> = members.iter().map(|m| m.character.as_str()).collect();
        assert_eq!(names, vec!["ryu", "ken"]);
    }

    #[test]
    fn convert_group_keeps_primary() {
        let mut document = doc();
        document
            .make_group(0, vec![GroupMember::new("ryu"), GroupMember::new("ken")])
            .expect("group");
        document.convert_to_single(0).expect("convert");
        assert_eq!(document.slot(0), Some(&Slot::single("ryu", "")));
        assert_eq!(document.convert_to_single(0), Err(EditError::NotAGroup(0)));
    }

    #[test]
    fn stage_edits_go_through_codec() {
        let mut document = doc();
        document.set_stage_param(0, "order", "2").expect("param");
        document.set_stage_path(0, "stages/b.def").expect("path");
        assert_eq!(document.stage(0).map(StageEntry::as_str), Some("stages/b.def, music=a.mp3, order=2"));
        assert_eq!(document.add_stage(" , music=x"), Err(EditError::EmptyStagePath));
    }

    #[test]
    fn missing_sections_are_created_in_order() {
        let mut document = Document::parse("[Options]\narcade.maxmatches = 6\n");
        document.add_stage("stages/a.def").expect("stage");
        document.assign_character(0, "kfm").expect("assign");
        assert_eq!(
            document.to_text(),
            "[Options]\narcade.maxmatches = 6\n[Characters]\nkfm\n[ExtraStages]\nstages/a.def\n"
        );
    }

    #[test]
    fn truncate_empty_tail_drops_trailing_empties_only() {
        let mut document = Document::parse("[Characters]\nempty\nkfm\nempty\n\nempty\n");
        assert_eq!(document.truncate_empty_tail(), 2);
        assert_eq!(document.slots().len(), 2);
    }
}
