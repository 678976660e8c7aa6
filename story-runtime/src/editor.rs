//! # Editor 模块
//!
//! 场景编辑器的工作副本。
//!
//! 编辑器持有剧情图和角色表的**副本**，所有修改只作用于副本，
//! 通过 [`SceneEditor::flush`] 写回存储。正在播放的剧情不受影响，
//! 直到宿主层重新加载文档。
//!
//! 不提供撤销。

use crate::document::{Choice, StoryDocument, StoryNode};
use crate::error::EditorError;
use crate::key::NodeKey;
use crate::roster::{Character, CharacterRoster};

/// 文档写回目标
pub trait DocumentSink {
    type Error: std::fmt::Display;

    fn write_story(&mut self, story: &StoryDocument) -> Result<(), Self::Error>;

    fn write_characters(&mut self, roster: &CharacterRoster) -> Result<(), Self::Error>;
}

/// 节点的单个可编辑字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeField {
    Speaker(Option<String>),
    Text(String),
    Background(Option<String>),
    Sprite(Option<String>),
    Bgm(Option<String>),
    Next(Option<NodeKey>),
    End(bool),
}

impl NodeField {
    fn apply(self, node: &mut StoryNode) {
        match self {
            Self::Speaker(speaker) => node.speaker = speaker,
            Self::Text(text) => node.text = text,
            Self::Background(background) => node.background = background,
            Self::Sprite(sprite) => node.sprite = sprite,
            Self::Bgm(bgm) => node.bgm = bgm,
            Self::Next(next) => node.next = next,
            Self::End(end) => node.end = end,
        }
    }
}

/// 场景编辑器
#[derive(Debug, Clone)]
pub struct SceneEditor {
    story: StoryDocument,
    roster: CharacterRoster,
    dirty: bool,
}

impl SceneEditor {
    /// 以文档副本创建编辑器
    pub fn new(story: StoryDocument, roster: CharacterRoster) -> Self {
        Self {
            story,
            roster,
            dirty: false,
        }
    }

    pub fn story(&self) -> &StoryDocument {
        &self.story
    }

    pub fn roster(&self) -> &CharacterRoster {
        &self.roster
    }

    /// 是否有未写回的修改
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn node_mut(&mut self, key: &NodeKey) -> Result<&mut StoryNode, EditorError> {
        self.story
            .get_mut(key)
            .ok_or_else(|| EditorError::NodeNotFound { key: key.clone() })
    }

    /// 新建节点
    pub fn create_node(&mut self, key: NodeKey, node: StoryNode) -> Result<(), EditorError> {
        if self.story.contains(&key) {
            return Err(EditorError::DuplicateKey { key });
        }
        self.story.insert(key, node);
        self.dirty = true;
        Ok(())
    }

    /// 修改节点字段
    pub fn update_node(&mut self, key: &NodeKey, field: NodeField) -> Result<(), EditorError> {
        field.apply(self.node_mut(key)?);
        self.dirty = true;
        Ok(())
    }

    /// 删除节点
    ///
    /// 仍被其他节点（`next` 或选项）引用时拒绝删除。
    pub fn delete_node(&mut self, key: &NodeKey) -> Result<StoryNode, EditorError> {
        if !self.story.contains(key) {
            return Err(EditorError::NodeNotFound { key: key.clone() });
        }

        let referrers: Vec<String> = self
            .story
            .referrers(key)
            .into_iter()
            .filter(|from| *from != key)
            .map(NodeKey::to_string)
            .collect();
        if !referrers.is_empty() {
            return Err(EditorError::NodeReferenced {
                key: key.clone(),
                referrers,
            });
        }

        let removed = self
            .story
            .remove(key)
            .ok_or_else(|| EditorError::NodeNotFound { key: key.clone() })?;
        self.dirty = true;
        Ok(removed)
    }

    /// 追加选项，返回其索引
    pub fn add_choice(&mut self, key: &NodeKey, choice: Choice) -> Result<usize, EditorError> {
        let node = self.node_mut(key)?;
        node.choices.push(choice);
        let index = node.choices.len() - 1;
        self.dirty = true;
        Ok(index)
    }

    /// 替换选项
    pub fn update_choice(
        &mut self,
        key: &NodeKey,
        index: usize,
        choice: Choice,
    ) -> Result<(), EditorError> {
        let slot = self
            .node_mut(key)?
            .choices
            .get_mut(index)
            .ok_or_else(|| EditorError::ChoiceNotFound {
                key: key.clone(),
                index,
            })?;
        *slot = choice;
        self.dirty = true;
        Ok(())
    }

    /// 删除选项
    pub fn remove_choice(&mut self, key: &NodeKey, index: usize) -> Result<Choice, EditorError> {
        let node = self.node_mut(key)?;
        if index >= node.choices.len() {
            return Err(EditorError::ChoiceNotFound {
                key: key.clone(),
                index,
            });
        }
        let removed = node.choices.remove(index);
        self.dirty = true;
        Ok(removed)
    }

    /// 新增或替换角色
    pub fn upsert_character(&mut self, id: impl Into<String>, character: Character) {
        self.roster.insert(id, character);
        self.dirty = true;
    }

    /// 删除角色
    pub fn remove_character(&mut self, id: &str) -> Result<Character, EditorError> {
        let removed = self
            .roster
            .remove(id)
            .ok_or_else(|| EditorError::CharacterNotFound { id: id.to_string() })?;
        self.dirty = true;
        Ok(removed)
    }

    /// 设置角色立绘
    pub fn set_sprite(
        &mut self,
        id: &str,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<(), EditorError> {
        let character = self
            .roster
            .get_mut(id)
            .ok_or_else(|| EditorError::CharacterNotFound { id: id.to_string() })?;
        character.sprites.insert(name.into(), path.into());
        self.dirty = true;
        Ok(())
    }

    /// 写回两份文档
    pub fn flush<S: DocumentSink>(&mut self, sink: &mut S) -> Result<(), EditorError> {
        sink.write_story(&self.story)
            .map_err(|e| EditorError::Flush(e.to_string()))?;
        sink.write_characters(&self.roster)
            .map_err(|e| EditorError::Flush(e.to_string()))?;
        self.dirty = false;
        Ok(())
    }
}
