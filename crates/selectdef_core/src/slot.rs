use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::params::{self, MEMBER_MANAGED_KEYS, ParamString};

pub const EMPTY_CHARACTER: &str = "empty";
pub const RANDOM_CHARACTER: &str = "randomselect";
pub const DEFAULT_NEXT: &str = "w";
pub const DEFAULT_PREVIOUS: &str = "s";

/// One grid cell of the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Slot {
    /// `character, raw_params`. The params stay opaque until an editor asks
    /// for them so unknown keys survive untouched.
    Single {
        character: String,
        raw_params: String,
    },
    /// `slot = { ... }`; the first member is the primary character.
    Group { members: Vec<GroupMember> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub character: String,
    pub next: String,
    pub previous: String,
    pub select: String,
    /// Anything else on the member line, in codec form.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra: String,
}

impl Slot {
    pub fn single(character: impl Into<String>, raw_params: impl Into<String>) -> Self {
        Self::Single {
            character: character.into(),
            raw_params: raw_params.into(),
        }
    }

    pub fn empty() -> Self {
        Self::single(EMPTY_CHARACTER, "")
    }

    pub fn random() -> Self {
        Self::single(RANDOM_CHARACTER, "")
    }

    pub fn group(members: Vec<GroupMember>) -> Self {
        Self::Group { members }
    }

    pub fn primary_character(&self) -> Option<&str> {
        match self {
            Self::Single { character, .. } => {
                Some(character.as_str()).filter(|name| !name.is_empty())
            }
            Self::Group { members } => members.first().map(|m| m.character.as_str()),
        }
    }

    pub fn characters(&self) -> Vec<&str> {
        match self {
            Self::Single { character, .. } => vec![character.as_str()],
            Self::Group { members } => members.iter().map(|m| m.character.as_str()).collect(),
        }
    }

    /// True for a blank or `empty` single, or a group without members.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single { character, .. } => {
                character.is_empty() || character.eq_ignore_ascii_case(EMPTY_CHARACTER)
            }
            Self::Group { members } => members.is_empty(),
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Self::Single { character, .. } if character.eq_ignore_ascii_case(RANDOM_CHARACTER))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }

    /// Parsed view of a single's parameters; `None` for groups.
    pub fn params(&self) -> Option<ParamString> {
        match self {
            Self::Single { raw_params, .. } => Some(params::parse(raw_params)),
            Self::Group { .. } => None,
        }
    }
}

impl GroupMember {
    pub fn new(character: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            next: DEFAULT_NEXT.to_string(),
            previous: DEFAULT_PREVIOUS.to_string(),
            select: String::new(),
            extra: String::new(),
        }
    }

    /// Parses one member line. Lines without a character token yield `None`.
    pub fn from_line(content: &str) -> Option<Self> {
        let mut parsed = params::parse(content);
        if parsed.positional.is_empty() {
            return None;
        }
        let character = parsed.positional.remove(0);

        let mut member = Self::new(character);
        if let Some(next) = parsed.get("next") {
            member.next = next.to_string();
        }
        if let Some(previous) = parsed.get("previous") {
            member.previous = previous.to_string();
        }
        if let Some(select) = parsed.get("select") {
            member.select = select.to_string();
        }
        for key in MEMBER_MANAGED_KEYS {
            parsed.remove(key);
        }
        member.extra = parsed.to_string_with(&[]);
        Some(member)
    }

    /// Canonical member line: keys equal to their default are left out.
    pub fn to_line(&self) -> String {
        let extra = params::parse(&self.extra);

        let mut positional = vec![self.character.clone()];
        positional.extend(extra.positional.iter().cloned());

        let mut fields = IndexMap::new();
        if !self.next.is_empty() && self.next != DEFAULT_NEXT {
            fields.insert("next".to_string(), self.next.clone());
        }
        if !self.previous.is_empty() && self.previous != DEFAULT_PREVIOUS {
            fields.insert("previous".to_string(), self.previous.clone());
        }
        if !self.select.is_empty() {
            fields.insert("select".to_string(), self.select.clone());
        }
        for (key, value) in extra.fields {
            fields.entry(key).or_insert(value);
        }

        params::build(&fields, &positional, MEMBER_MANAGED_KEYS)
    }

    /// `next`/`previous` fall back to their defaults when cleared; any other
    /// key is stored in `extra`.
    pub fn set_field(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "next" => self.next = non_empty_or(value, DEFAULT_NEXT),
            "previous" => self.previous = non_empty_or(value, DEFAULT_PREVIOUS),
            "select" => self.select = value.to_string(),
            other => {
                let mut extra = params::parse(&self.extra);
                extra.set(other, value);
                self.extra = extra.to_string_with(&[]);
            }
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_defaults_apply_when_keys_missing() {
        let member = GroupMember::from_line("ken, next=a").expect("member");
        assert_eq!(member.character, "ken");
        assert_eq!(member.next, "a");
        assert_eq!(member.previous, "s");
        assert_eq!(member.select, "");
        assert_eq!(member.extra, "");
    }

    #[test]
    fn member_line_without_character_is_skipped() {
        assert!(GroupMember::from_line("next=a, previous=d").is_none());
        assert!(GroupMember::from_line("  ").is_none());
    }

    #[test]
    fn member_line_omits_default_keys() {
        let member = GroupMember::from_line("ryu, next=w, previous=s, select=/s+a").expect("member");
        assert_eq!(member.to_line(), "ryu, select=/s+a");
    }

    #[test]
    fn member_line_keeps_unknown_keys() {
        let member = GroupMember::from_line("ryu, order=2, next=d, stages/x.def").expect("member");
        assert_eq!(member.extra, "stages/x.def, order=2");
        assert_eq!(member.to_line(), "ryu, stages/x.def, next=d, order=2");
    }

    #[test]
    fn set_field_restores_defaults_on_clear() {
        let mut member = GroupMember::new("ryu");
        member.set_field("Next", "d");
        assert_eq!(member.next, "d");
        member.set_field("next", "");
        assert_eq!(member.next, "w");
        member.set_field("order", "3");
        assert_eq!(member.to_line(), "ryu, order=3");
    }

    #[test]
    fn sentinels_are_recognized_case_insensitively() {
        assert!(Slot::single("Empty", "").is_empty());
        assert!(Slot::single("", "").is_empty());
        assert!(Slot::single("RandomSelect", "").is_random());
        assert!(Slot::group(Vec::new()).is_empty());
        assert!(!Slot::single("kfm", "").is_empty());
    }

    #[test]
    fn params_are_parsed_lazily_for_singles_only() {
        let single = Slot::single("kfm", "stages/kfm.def, order=1");
        let params = single.params().expect("single params");
        assert_eq!(params.first_positional(), Some("stages/kfm.def"));
        assert!(Slot::group(vec![GroupMember::new("ryu")]).params().is_none());
    }
}
