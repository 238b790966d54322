use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::{create_backup, default_backup_dir};
use crate::document::{Document, EditError, StageEntry};
use crate::params::ParamString;
use crate::parser::Diagnostic;
use crate::slot::{GroupMember, Slot};

use super::error::{CoreError, CoreErrorCode};
use super::types::Summary;

#[derive(Debug, Clone, Copy)]
pub struct Engine {
    backups: bool,
}

/// An open roster: the parsed document plus where it came from.
#[derive(Debug)]
pub struct Session {
    path: Option<PathBuf>,
    document: Document,
    backups: bool,
    dirty: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self { backups: true }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether saving over an existing file copies it aside first.
    pub fn with_backups(mut self, enabled: bool) -> Self {
        self.backups = enabled;
        self
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Session {
        Session {
            path: None,
            document: Document::from_bytes(bytes.as_ref()),
            backups: self.backups,
            dirty: false,
        }
    }

    pub fn open_path(&self, path: impl AsRef<Path>) -> Result<Session, CoreError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        let mut session = self.open_bytes(bytes);
        session.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), slots = session.slots().len(), "opened roster");
        Ok(session)
    }
}

impl Session {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn slots(&self) -> &[Slot] {
        self.document.slots()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.document.slot(index)
    }

    pub fn stages(&self) -> &[StageEntry] {
        self.document.stages()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.document.diagnostics()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::from_slots(self.slots());
        summary.stage_count = self.stages().len();
        summary.section_count = self.document.sections().len();
        summary.diagnostic_count = self.diagnostics().len();
        summary
    }

    pub fn character_params(&self, index: usize) -> Result<ParamString, CoreError> {
        let slot = self.slot(index).ok_or_else(|| {
            CoreError::from(EditError::SlotOutOfRange {
                index,
                len: self.slots().len(),
            })
        })?;
        slot.params()
            .ok_or_else(|| CoreError::from(EditError::NotASingle(index)))
    }

    pub fn stage_params(&self, index: usize) -> Result<ParamString, CoreError> {
        self.document
            .stage(index)
            .map(StageEntry::params)
            .ok_or_else(|| {
                CoreError::from(EditError::StageOutOfRange {
                    index,
                    len: self.stages().len(),
                })
            })
    }

    pub fn assign_character(&mut self, index: usize, character: &str) -> Result<(), CoreError> {
        self.edit(|doc| doc.assign_character(index, character))
    }

    pub fn set_random(&mut self, index: usize) -> Result<(), CoreError> {
        self.set_slot(index, Slot::random())
    }

    pub fn set_empty(&mut self, index: usize) -> Result<(), CoreError> {
        self.set_slot(index, Slot::empty())
    }

    pub fn clear_slot(&mut self, index: usize) -> Result<(), CoreError> {
        self.set_empty(index)
    }

    pub fn set_slot(&mut self, index: usize, slot: Slot) -> Result<(), CoreError> {
        self.edit(|doc| doc.set_slot(index, slot))
    }

    pub fn set_raw_params(&mut self, index: usize, raw: &str) -> Result<(), CoreError> {
        self.edit(|doc| doc.set_raw_params(index, raw))
    }

    pub fn clear_params(&mut self, index: usize) -> Result<(), CoreError> {
        self.set_raw_params(index, "")
    }

    pub fn set_character_param(
        &mut self,
        index: usize,
        key: &str,
        value: &str,
    ) -> Result<(), CoreError> {
        self.edit(|doc| doc.set_character_param(index, key, value))
    }

    pub fn set_character_stages(&mut self, index: usize, stages: &[String]) -> Result<(), CoreError> {
        self.edit(|doc| doc.set_character_stages(index, stages))
    }

    pub fn move_slot(&mut self, from: usize, to: usize) -> Result<(), CoreError> {
        self.edit(|doc| doc.move_slot(from, to))
    }

    pub fn swap_slots(&mut self, a: usize, b: usize) -> Result<(), CoreError> {
        self.edit(|doc| doc.swap_slots(a, b))
    }

    pub fn remove_slot(&mut self, index: usize) -> Result<Slot, CoreError> {
        self.edit(|doc| doc.remove_slot(index))
    }

    pub fn truncate_empty_tail(&mut self) -> usize {
        let removed = self.document.truncate_empty_tail();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    pub fn make_group(&mut self, index: usize, characters: &[String]) -> Result<(), CoreError> {
        let members: Vec<GroupMember> = characters
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(GroupMember::new)
            .collect();
        self.edit(|doc| doc.make_group(index, members))
    }

    pub fn convert_to_single(&mut self, index: usize) -> Result<(), CoreError> {
        self.edit(|doc| doc.convert_to_single(index))
    }

    pub fn add_group_member(&mut self, index: usize, character: &str) -> Result<(), CoreError> {
        let member = GroupMember::new(character.trim());
        self.edit(|doc| doc.add_group_member(index, member))
    }

    pub fn remove_group_member(&mut self, index: usize, member: usize) -> Result<GroupMember, CoreError> {
        self.edit(|doc| doc.remove_group_member(index, member))
    }

    pub fn move_group_member(&mut self, index: usize, from: usize, to: usize) -> Result<(), CoreError> {
        self.edit(|doc| doc.move_group_member(index, from, to))
    }

    pub fn set_group_member_field(
        &mut self,
        index: usize,
        member: usize,
        key: &str,
        value: &str,
    ) -> Result<(), CoreError> {
        self.edit(|doc| doc.set_group_member_field(index, member, key, value))
    }

    pub fn add_stage(&mut self, line: &str) -> Result<(), CoreError> {
        self.edit(|doc| doc.add_stage(line))
    }

    pub fn remove_stage(&mut self, index: usize) -> Result<StageEntry, CoreError> {
        self.edit(|doc| doc.remove_stage(index))
    }

    pub fn update_stage(&mut self, index: usize, line: &str) -> Result<(), CoreError> {
        self.edit(|doc| doc.update_stage(index, line))
    }

    pub fn set_stage_path(&mut self, index: usize, path: &str) -> Result<(), CoreError> {
        self.edit(|doc| doc.set_stage_path(index, path))
    }

    pub fn set_stage_param(&mut self, index: usize, key: &str, value: &str) -> Result<(), CoreError> {
        self.edit(|doc| doc.set_stage_param(index, key, value))
    }

    pub fn to_text(&self) -> String {
        self.document.to_text()
    }

    /// Rewrites the file the session was opened from.
    pub fn save(&mut self) -> Result<(), CoreError> {
        let path = self.path.clone().ok_or_else(|| {
            CoreError::new(CoreErrorCode::Io, "session has no file path to save to")
        })?;
        self.write_to(&path)
    }

    /// Writes to `path` and makes it the session's file.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let path = path.as_ref().to_path_buf();
        self.write_to(&path)?;
        self.path = Some(path);
        Ok(())
    }

    fn write_to(&mut self, path: &Path) -> Result<(), CoreError> {
        if self.backups
            && path.is_file()
            && let Err(e) = create_backup(path, &default_backup_dir(path))
        {
            tracing::warn!(path = %path.display(), error = %e, "backup failed, saving anyway");
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                CoreError::new(
                    CoreErrorCode::Io,
                    format!("failed to create {}: {e}", parent.display()),
                )
            })?;
        }

        fs::write(path, self.to_text()).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to write {}: {e}", path.display()),
            )
        })?;
        self.dirty = false;
        tracing::debug!(path = %path.display(), "saved roster");
        Ok(())
    }

    fn edit<T>(
        &mut self,
        apply: impl FnOnce(&mut Document) -> Result<T, EditError>,
    ) -> Result<T, CoreError> {
        let out = apply(&mut self.document)?;
        self.dirty = true;
        Ok(out)
    }
}
