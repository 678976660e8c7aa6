//! # Roster 模块
//!
//! 角色表：角色 id → 显示名与立绘集。
//!
//! ```json
//! {
//!   "alice": { "name": "爱丽丝", "sprites": { "smile": "sprites/alice/smile.png" } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DocumentError;

/// 角色显示信息
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Character {
    /// 显示名
    pub name: String,
    /// 立绘集：立绘名 → 资源路径
    #[serde(default)]
    pub sprites: BTreeMap<String, String>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sprites: BTreeMap::new(),
        }
    }

    pub fn with_sprite(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.sprites.insert(name.into(), path.into());
        self
    }
}

/// 角色表
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterRoster {
    characters: BTreeMap<String, Character>,
}

impl CharacterRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(|e| DocumentError::malformed(name, &e))
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Serialization {
            document: "characters".to_string(),
            message: e.to_string(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Character> {
        self.characters.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.characters.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, character: Character) -> Option<Character> {
        self.characters.insert(id.into(), character)
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Character> {
        self.characters.remove(id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Character)> {
        self.characters.iter()
    }

    /// 说话者显示名
    ///
    /// 在角色表中的 id 显示为角色名，否则原样显示。
    pub fn display_name<'a>(&'a self, speaker: &'a str) -> &'a str {
        self.get(speaker)
            .map(|character| character.name.as_str())
            .unwrap_or(speaker)
    }

    /// 立绘资源路径
    ///
    /// 说话者立绘集中的名字解析为路径，否则把 `sprite` 当作路径。
    pub fn sprite_path<'a>(&'a self, speaker: Option<&str>, sprite: &'a str) -> &'a str {
        speaker
            .and_then(|id| self.get(id))
            .and_then(|character| character.sprites.get(sprite))
            .map(String::as_str)
            .unwrap_or(sprite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> CharacterRoster {
        let mut roster = CharacterRoster::new();
        roster.insert(
            "alice",
            Character::new("爱丽丝").with_sprite("smile", "sprites/alice/smile.png"),
        );
        roster
    }

    #[test]
    fn test_display_name() {
        let roster = roster();
        assert_eq!(roster.display_name("alice"), "爱丽丝");
        assert_eq!(roster.display_name("路人"), "路人");
    }

    #[test]
    fn test_sprite_path() {
        let roster = roster();
        assert_eq!(
            roster.sprite_path(Some("alice"), "smile"),
            "sprites/alice/smile.png"
        );
        assert_eq!(
            roster.sprite_path(Some("alice"), "sprites/raw.png"),
            "sprites/raw.png"
        );
        assert_eq!(roster.sprite_path(None, "smile"), "smile");
    }

    #[test]
    fn test_parse_without_sprites() {
        let roster = CharacterRoster::from_json("characters.json", r#"{ "bob": { "name": "鲍勃" } }"#)
            .unwrap();
        assert!(roster.get("bob").unwrap().sprites.is_empty());
    }
}
