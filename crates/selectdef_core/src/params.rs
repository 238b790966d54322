//! Codec for the `positional, positional, key=value` parameter microsyntax
//! shared by character lines, slot-group member lines and stage lines.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Keys the character properties editor places deterministically.
pub const CHARACTER_MANAGED_KEYS: &[&str] = &[
    "music",
    "order",
    "ai",
    "rounds",
    "time",
    "vsscreen",
    "victoryscreen",
    "exclude",
    "single",
    "bonus",
    "includestage",
    "hidden",
    "unlock",
    "arcadepath",
    "ratiopath",
    "ordersurvival",
    "select",
    "next",
    "previous",
    "final.music",
    "victory.music",
    "life.music",
    "round.music",
    "round1.music",
    "round2.music",
    "round3.music",
    "round4.music",
    "round5.music",
    "round6.music",
    "round7.music",
    "round8.music",
    "round9.music",
];

/// Keys the stage properties editor places deterministically.
pub const STAGE_MANAGED_KEYS: &[&str] = &[
    "music",
    "final.music",
    "victory.music",
    "life.music",
    "round.music",
    "order",
    "unlock",
    "round1.music",
    "round2.music",
    "round3.music",
];

/// Keys a slot-group member line understands.
pub const MEMBER_MANAGED_KEYS: &[&str] = &["next", "previous", "select"];

const TOKEN_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamString {
    pub positional: Vec<String>,
    pub fields: IndexMap<String, String>,
}

impl ParamString {
    pub fn parse(raw: &str) -> Self {
        parse(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.fields.values().all(String::is_empty)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&normalize_key(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Sets `key` to `value`; an empty value removes the key.
    pub fn set(&mut self, key: &str, value: &str) {
        let key = normalize_key(key);
        let value = value.trim();
        if value.is_empty() {
            self.fields.shift_remove(&key);
        } else {
            self.fields.insert(key, value.to_string());
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.shift_remove(&normalize_key(key))
    }

    pub fn first_positional(&self) -> Option<&str> {
        self.positional.first().map(String::as_str)
    }

    /// Replaces the positional tokens, dropping blank ones.
    pub fn set_positional<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.positional = tokens
            .into_iter()
            .map(|token| token.as_ref().trim().to_string())
            .filter(|token| !token.is_empty())
            .collect();
    }

    pub fn to_string_with(&self, managed_keys: &[&str]) -> String {
        build(&self.fields, &self.positional, managed_keys)
    }
}

/// Splits `raw` on every comma. There is no quoting: a comma inside a value
/// always splits it.
pub fn parse(raw: &str) -> ParamString {
    let mut out = ParamString::default();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.split_once('=') {
            Some((key, value)) => {
                out.fields
                    .insert(normalize_key(key), value.trim().to_string());
            }
            None => out.positional.push(token.to_string()),
        }
    }
    out
}

/// Positional tokens first, then managed keys in `managed_keys` order, then
/// the remaining fields in map order. Empty values are never written.
pub fn build(
    fields: &IndexMap<String, String>,
    positional: &[String],
    managed_keys: &[&str],
) -> String {
    let mut parts: Vec<String> = positional.to_vec();

    for key in managed_keys {
        if let Some(value) = fields.get(*key)
            && !value.is_empty()
        {
            parts.push(format!("{key}={value}"));
        }
    }
    for (key, value) in fields {
        if managed_keys.contains(&key.as_str()) || value.is_empty() {
            continue;
        }
        parts.push(format!("{key}={value}"));
    }

    parts.join(TOKEN_SEPARATOR)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_positional_and_fields() {
        let parsed = parse(" stages/a.def , Music = sound/a.mp3, order=2 ,, ");
        assert_eq!(parsed.positional, vec!["stages/a.def"]);
        assert_eq!(parsed.get("music"), Some("sound/a.mp3"));
        assert_eq!(parsed.get("ORDER"), Some("2"));
        assert_eq!(parsed.fields.len(), 2);
    }

    #[test]
    fn parse_splits_on_first_equals_only() {
        let parsed = parse("unlock=return a==b");
        assert_eq!(parsed.get("unlock"), Some("return a==b"));
    }

    #[test]
    fn parse_empty_input_yields_empty_result() {
        assert_eq!(parse(""), ParamString::default());
        assert!(parse(" , ,").is_empty());
    }

    #[test]
    fn build_places_managed_keys_before_passthrough() {
        let parsed = parse("kfm_stage.def, zzz=1, music=a.mp3, order=3, empty=");
        let rebuilt = build(&parsed.fields, &parsed.positional, &["order", "music"]);
        assert_eq!(rebuilt, "kfm_stage.def, order=3, music=a.mp3, zzz=1");
    }

    #[test]
    fn set_with_empty_value_removes_key() {
        let mut params = parse("order=1, music=a.mp3");
        params.set("Order", "  ");
        assert_eq!(params.get("order"), None);
        assert_eq!(params.to_string_with(&[]), "music=a.mp3");
    }

    #[test]
    fn set_existing_key_keeps_its_position() {
        let mut params = parse("a=1, b=2, c=3");
        params.set("b", "9");
        assert_eq!(params.to_string_with(&[]), "a=1, b=9, c=3");
    }

    #[test]
    fn set_positional_drops_blank_tokens() {
        let mut params = parse("old.def, order=1");
        params.set_positional(["  new.def ", ""]);
        assert_eq!(params.to_string_with(&["order"]), "new.def, order=1");
    }
}
