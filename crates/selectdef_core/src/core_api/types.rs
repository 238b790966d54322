use serde::{Deserialize, Serialize};

use crate::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Empty,
    Random,
    Character,
    Group,
}

impl SlotKind {
    pub fn of(slot: &Slot) -> Self {
        match slot {
            Slot::Group { .. } if slot.is_empty() => Self::Empty,
            Slot::Group { .. } => Self::Group,
            Slot::Single { .. } if slot.is_empty() => Self::Empty,
            Slot::Single { .. } if slot.is_random() => Self::Random,
            Slot::Single { .. } => Self::Character,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Random => "random",
            Self::Character => "character",
            Self::Group => "group",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Summary {
    pub slot_count: usize,
    pub character_count: usize,
    pub group_count: usize,
    pub random_count: usize,
    pub empty_count: usize,
    pub stage_count: usize,
    pub section_count: usize,
    pub diagnostic_count: usize,
}

impl Summary {
    pub fn from_slots(slots: &[Slot]) -> Self {
        let mut summary = Self {
            slot_count: slots.len(),
            character_count: 0,
            group_count: 0,
            random_count: 0,
            empty_count: 0,
            stage_count: 0,
            section_count: 0,
            diagnostic_count: 0,
        };
        for slot in slots {
            match SlotKind::of(slot) {
                SlotKind::Empty => summary.empty_count += 1,
                SlotKind::Random => summary.random_count += 1,
                SlotKind::Character => summary.character_count += 1,
                SlotKind::Group => summary.group_count += 1,
            }
        }
        summary
    }
}
