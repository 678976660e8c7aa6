//! # Document 模块
//!
//! 剧情图（Story Document）的数据模型。
//!
//! ## JSON 格式
//!
//! ```json
//! {
//!   "main-0": { "speaker": "alice", "text": "早上好", "background": "room", "sprite": "smile" },
//!   "main-1": {
//!     "text": "要去哪里？",
//!     "choices": [
//!       { "label": "学校", "target": "school-0" },
//!       { "label": "公园", "target": "park-0" }
//!     ]
//!   }
//! }
//! ```
//!
//! 文档在一次加载内不可变；编辑器在工作副本上修改，见 [`crate::editor`]。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DocumentError;
use crate::key::NodeKey;

/// 选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// 显示文本
    pub label: String,
    /// 选择后跳转的节点
    pub target: NodeKey,
}

impl Choice {
    pub fn new(label: impl Into<String>, target: impl Into<NodeKey>) -> Self {
        Self {
            label: label.into(),
            target: target.into(),
        }
    }
}

/// 剧情节点（一句台词）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoryNode {
    /// 说话者（角色 id 或直接显示的名字；None 表示旁白）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    /// 台词
    #[serde(default)]
    pub text: String,

    /// 背景
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    /// 立绘（说话者立绘集中的名字，或直接的资源路径）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,

    /// 进入该节点时切换的 BGM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm: Option<String>,

    /// 显式指定的后继节点，覆盖 `章节-序号+1` 的推算
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NodeKey>,

    /// 剧情在此节点结束
    #[serde(default, skip_serializing_if = "is_false")]
    pub end: bool,

    /// 选项
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StoryNode {
    /// 创建一句台词
    pub fn line(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_next(mut self, next: impl Into<NodeKey>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn with_bgm(mut self, bgm: impl Into<String>) -> Self {
        self.bgm = Some(bgm.into());
        self
    }

    pub fn ending(mut self) -> Self {
        self.end = true;
        self
    }

    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// 无选项时的后继节点：优先 `next`，否则由 key 推算
    pub fn successor(&self, key: &NodeKey) -> Option<NodeKey> {
        self.next.clone().or_else(|| key.successor())
    }

    /// 该节点引用的所有节点（`next` 与选项目标）
    pub fn references(&self) -> impl Iterator<Item = &NodeKey> {
        self.next
            .iter()
            .chain(self.choices.iter().map(|choice| &choice.target))
    }
}

/// 剧情图
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryDocument {
    nodes: BTreeMap<NodeKey, StoryNode>,
}

impl StoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 解析
    ///
    /// `name` 仅用于错误信息（通常为文件名）。
    pub fn from_json(name: &str, json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(|e| DocumentError::malformed(name, &e))
    }

    /// 序列化为格式化的 JSON
    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Serialization {
            document: "story".to_string(),
            message: e.to_string(),
        })
    }

    pub fn get(&self, key: &NodeKey) -> Option<&StoryNode> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &NodeKey) -> Option<&mut StoryNode> {
        self.nodes.get_mut(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// 插入节点，返回被替换的旧节点
    pub fn insert(&mut self, key: impl Into<NodeKey>, node: StoryNode) -> Option<StoryNode> {
        self.nodes.insert(key.into(), node)
    }

    pub(crate) fn remove(&mut self, key: &NodeKey) -> Option<StoryNode> {
        self.nodes.remove(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, &StoryNode)> {
        self.nodes.iter()
    }

    /// 引用了 `key` 的节点
    pub fn referrers(&self, key: &NodeKey) -> Vec<&NodeKey> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.references().any(|target| target == key))
            .map(|(from, _)| from)
            .collect()
    }
}

impl FromIterator<(NodeKey, StoryNode)> for StoryDocument {
    fn from_iter<I: IntoIterator<Item = (NodeKey, StoryNode)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "main-0": { "speaker": "alice", "text": "早上好", "background": "room", "sprite": "smile", "bgm": "daily" },
        "main-1": {
            "text": "要去哪里？",
            "choices": [
                { "label": "学校", "target": "school-0" },
                { "label": "公园", "target": "park-0" }
            ]
        },
        "school-0": { "text": "到学校了", "end": true },
        "park-0": { "text": "到公园了", "next": "school-0" }
    }"#;

    #[test]
    fn test_parse_sample() {
        let doc = StoryDocument::from_json("story.json", SAMPLE).unwrap();
        assert_eq!(doc.len(), 4);

        let first = doc.get(&NodeKey::start()).unwrap();
        assert_eq!(first.speaker.as_deref(), Some("alice"));
        assert_eq!(first.bgm.as_deref(), Some("daily"));
        assert!(!first.has_choices());

        let branch = doc.get(&NodeKey::from("main-1")).unwrap();
        assert_eq!(branch.choices.len(), 2);
        assert_eq!(branch.choices[1].target, NodeKey::from("park-0"));
        assert!(doc.get(&NodeKey::from("school-0")).unwrap().end);
    }

    #[test]
    fn test_malformed_document() {
        let err = StoryDocument::from_json("story.json", "{ \"main-0\": { \"text\": 3 } }")
            .unwrap_err();
        assert!(matches!(err, DocumentError::Malformed { .. }));
    }

    #[test]
    fn test_successor_prefers_next() {
        let key = NodeKey::from("park-0");
        let plain = StoryNode::line(None, "...");
        assert_eq!(plain.successor(&key), Some(NodeKey::from("park-1")));

        let redirected = StoryNode::line(None, "...").with_next("school-0");
        assert_eq!(redirected.successor(&key), Some(NodeKey::from("school-0")));
    }

    #[test]
    fn test_round_trip_preserves_graph() {
        let doc = StoryDocument::from_json("story.json", SAMPLE).unwrap();
        let json = doc.to_json().unwrap();
        let reloaded = StoryDocument::from_json("story.json", &json).unwrap();
        assert_eq!(doc, reloaded);
        // 省略的可选字段不会被写成 null
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_referrers() {
        let doc = StoryDocument::from_json("story.json", SAMPLE).unwrap();
        let referrers = doc.referrers(&NodeKey::from("school-0"));
        assert_eq!(
            referrers,
            vec![&NodeKey::from("main-1"), &NodeKey::from("park-0")]
        );
    }
}
