//! # Key 模块
//!
//! 剧情节点的复合标识符。
//!
//! 节点 key 的约定格式为 `章节-序号`，例如 `main-0`、`ending_a-12`。
//! 章节名本身可以包含 `-`，解析时以**最后一个** `-` 为分隔。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 入口节点
pub const START_KEY: &str = "main-0";

/// 剧情节点 key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// 入口节点 key（`main-0`）
    pub fn start() -> Self {
        Self::new(START_KEY)
    }

    /// 由章节名和序号组成 key
    pub fn compose(chapter: &str, index: u32) -> Self {
        Self(format!("{chapter}-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 拆分为 `(章节, 序号)`
    ///
    /// 不符合 `章节-序号` 格式时返回 `None`。
    pub fn parts(&self) -> Option<(&str, u32)> {
        let (chapter, index) = self.0.rsplit_once('-')?;
        if chapter.is_empty() {
            return None;
        }
        let index = index.parse().ok()?;
        Some((chapter, index))
    }

    /// 章节名
    pub fn chapter(&self) -> Option<&str> {
        self.parts().map(|(chapter, _)| chapter)
    }

    /// 同一章节中的下一个 key
    pub fn successor(&self) -> Option<NodeKey> {
        let (chapter, index) = self.parts()?;
        let next = index.checked_add(1)?;
        Some(Self::compose(chapter, next))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for NodeKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        assert_eq!(NodeKey::from("main-0").parts(), Some(("main", 0)));
        assert_eq!(NodeKey::from("ending-a-12").parts(), Some(("ending-a", 12)));
        assert_eq!(NodeKey::from("main").parts(), None);
        assert_eq!(NodeKey::from("-3").parts(), None);
        assert_eq!(NodeKey::from("main-x").parts(), None);
    }

    #[test]
    fn test_successor() {
        assert_eq!(
            NodeKey::from("main-0").successor(),
            Some(NodeKey::from("main-1"))
        );
        assert_eq!(
            NodeKey::from("route-b-9").successor(),
            Some(NodeKey::from("route-b-10"))
        );
        assert_eq!(NodeKey::from("prologue").successor(), None);
    }

    #[test]
    fn test_serialized_as_plain_string() {
        let key = NodeKey::start();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"main-0\"");
        let back: NodeKey = serde_json::from_str("\"main-7\"").unwrap();
        assert_eq!(back.chapter(), Some("main"));
    }
}
