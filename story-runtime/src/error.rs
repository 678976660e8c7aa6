//! # Error 模块
//!
//! 定义 story-runtime 中使用的错误类型。

use thiserror::Error;

use crate::key::NodeKey;
use crate::save::SaveError;

/// 文档（剧情图 / 角色表）加载错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// JSON 格式错误
    #[error("{document} 解析失败（第 {line} 行，第 {column} 列）：{message}")]
    Malformed {
        document: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// 序列化失败
    #[error("{document} 序列化失败：{message}")]
    Serialization { document: String, message: String },
}

impl DocumentError {
    pub(crate) fn malformed(document: &str, err: &serde_json::Error) -> Self {
        Self::Malformed {
            document: document.to_string(),
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// 播放错误
///
/// 所有变体都属于编写期错误：播放器拒绝前进，而不是替换成其他节点。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// 当前节点在文档中不存在
    #[error("节点 '{key}' 不存在")]
    MissingNode { key: NodeKey },

    /// 节点的跳转目标不存在
    #[error("节点 '{from}' 引用了不存在的节点 '{target}'")]
    UnresolvedTarget { from: NodeKey, target: NodeKey },

    /// 节点 key 不是 `章节-序号` 格式，无法推算下一个节点
    #[error("节点 '{key}' 无法推算后继节点（key 需为 `章节-序号` 格式，或显式指定 next）")]
    NoSuccessor { key: NodeKey },

    /// 当前节点有选项，必须选择
    #[error("节点 '{key}' 有 {choice_count} 个选项，需要先选择")]
    ChoiceRequired { key: NodeKey, choice_count: usize },

    /// 当前节点没有选项
    #[error("节点 '{key}' 没有选项")]
    NoChoices { key: NodeKey },

    /// 无效的选择索引
    #[error("无效的选择索引 {index}，有效范围是 0..{max}")]
    InvalidChoiceIndex { index: usize, max: usize },
}

/// 编辑器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    /// 节点已存在
    #[error("节点 '{key}' 已存在")]
    DuplicateKey { key: NodeKey },

    /// 节点不存在
    #[error("节点 '{key}' 不存在")]
    NodeNotFound { key: NodeKey },

    /// 节点仍被其他节点引用
    #[error("节点 '{key}' 仍被 {} 引用", .referrers.join(", "))]
    NodeReferenced { key: NodeKey, referrers: Vec<String> },

    /// 选项不存在
    #[error("节点 '{key}' 没有第 {index} 个选项")]
    ChoiceNotFound { key: NodeKey, index: usize },

    /// 角色不存在
    #[error("角色 '{id}' 不存在")]
    CharacterNotFound { id: String },

    /// 写回存储失败
    #[error("写回存储失败：{0}")]
    Flush(String),
}

/// Action 解码错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// 未知的 action 类型
    #[error("未知的 action 类型 '{kind}'")]
    UnknownAction { kind: String },

    /// action 格式错误（类型已知但 payload 不合法）
    #[error("action 格式错误：{0}")]
    Malformed(String),
}

/// story-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoryError {
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),

    #[error("播放错误: {0}")]
    Playback(#[from] PlaybackError),

    #[error("编辑错误: {0}")]
    Editor(#[from] EditorError),

    #[error("Action 错误: {0}")]
    Action(#[from] ActionError),

    #[error("存档错误: {0}")]
    Save(#[from] SaveError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_carries_location() {
        let err = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }").unwrap_err();
        let doc_err = DocumentError::malformed("story.json", &err);

        match &doc_err {
            DocumentError::Malformed { line, .. } => assert_eq!(*line, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(doc_err.to_string().starts_with("story.json 解析失败"));
    }

    #[test]
    fn test_node_referenced_lists_referrers() {
        let err = EditorError::NodeReferenced {
            key: NodeKey::from("main-2"),
            referrers: vec!["main-0".to_string(), "main-1".to_string()],
        };
        assert_eq!(err.to_string(), "节点 'main-2' 仍被 main-0, main-1 引用");
    }

    #[test]
    fn test_story_error_from() {
        let err: StoryError = PlaybackError::InvalidChoiceIndex { index: 3, max: 2 }.into();
        assert!(matches!(err, StoryError::Playback(_)));
    }
}
