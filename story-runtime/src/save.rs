//! # Save 模块
//!
//! 存档/读档系统的数据模型。
//!
//! ## 设计原则
//!
//! - 所有存档数据必须可序列化（JSON）
//! - 必须有版本号，支持向后兼容检测
//! - 存档只保存剧情状态与少量播放上下文，界面状态不入档

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::Action;
use crate::state::{AppState, NarrativeState};

/// 存档格式版本
///
/// 版本号含义：
/// - MAJOR: 不兼容的格式变更
/// - MINOR: 向后兼容的新字段
pub const SAVE_VERSION_MAJOR: u32 = 1;
pub const SAVE_VERSION_MINOR: u32 = 0;

/// 存档版本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveVersion {
    pub major: u32,
    pub minor: u32,
}

impl SaveVersion {
    /// 当前版本
    pub fn current() -> Self {
        Self {
            major: SAVE_VERSION_MAJOR,
            minor: SAVE_VERSION_MINOR,
        }
    }

    /// major 相同即兼容
    pub fn is_compatible(&self) -> bool {
        self.major == SAVE_VERSION_MAJOR
    }
}

impl std::fmt::Display for SaveVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Default for SaveVersion {
    fn default() -> Self {
        Self::current()
    }
}

/// 存档元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// 存档槽位号（1-based）
    pub slot: u32,
    /// 保存时间（Unix 秒）
    pub timestamp: u64,
    /// 存档时所在节点（用于 UI 显示）
    pub node: String,
    /// 存档时的台词摘要（用于 UI 显示）
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// 存档数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    /// 存档格式版本
    pub version: SaveVersion,
    /// 存档元数据
    pub metadata: SaveMetadata,
    /// 剧情状态
    pub narrative: NarrativeState,
    /// 存档时的 BGM
    pub bg_music: String,
    /// 存档来自体验版剧情
    pub demo: bool,
}

impl SaveData {
    /// 从当前应用状态创建存档
    pub fn capture(slot: u32, state: &AppState, timestamp: u64) -> Self {
        Self {
            version: SaveVersion::current(),
            metadata: SaveMetadata {
                slot,
                timestamp,
                node: state.narrative.index.to_string(),
                excerpt: None,
            },
            narrative: state.narrative.clone(),
            bg_music: state.config.bg_music.clone(),
            demo: state.ui.is_demo,
        }
    }

    /// 设置台词摘要
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.metadata.excerpt = Some(excerpt.into());
        self
    }

    /// 读档需要交给 reducer 的 action
    pub fn restore_actions(&self) -> Vec<Action> {
        vec![
            Action::SetDemoMode(self.demo),
            Action::RestoreNarrative(Box::new(self.narrative.clone())),
            Action::ChangeBgm(self.bg_music.clone()),
        ]
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, SaveError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SaveError::SerializationFailed(e.to_string()))
    }

    /// 从 JSON 字符串反序列化
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let data: SaveData = serde_json::from_str(json)
            .map_err(|e| SaveError::DeserializationFailed(e.to_string()))?;

        if !data.version.is_compatible() {
            return Err(SaveError::IncompatibleVersion {
                save_version: data.version.to_string(),
                current_version: SaveVersion::current().to_string(),
            });
        }

        Ok(data)
    }
}

/// 存档错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    #[error("序列化失败: {0}")]
    SerializationFailed(String),

    #[error("反序列化失败: {0}")]
    DeserializationFailed(String),

    #[error("存档版本不兼容: 存档版本 {save_version} vs 当前版本 {current_version}")]
    IncompatibleVersion {
        save_version: String,
        current_version: String,
    },

    #[error("文件操作失败: {0}")]
    IoError(String),

    #[error("存档不存在: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Advance;
    use crate::key::NodeKey;
    use crate::reducer::reduce;
    use crate::state::Surface;

    #[test]
    fn test_save_version_compatibility() {
        assert!(SaveVersion::current().is_compatible());
        assert!(SaveVersion { major: 1, minor: 7 }.is_compatible());
        assert!(!SaveVersion { major: 2, minor: 0 }.is_compatible());
        assert_eq!(SaveVersion { major: 1, minor: 3 }.to_string(), "1.3");
    }

    #[test]
    fn test_save_and_restore() {
        let mut state = AppState::initial();
        state.narrative.advance(&Advance::to("main-1"));
        state.config.bg_music = "daily".to_string();
        state.ui.is_demo = false;

        let json = SaveData::capture(3, &state, 1_700_000_000)
            .with_excerpt("早上好")
            .to_json()
            .unwrap();
        let loaded = SaveData::from_json(&json).unwrap();
        assert_eq!(loaded.metadata.slot, 3);
        assert_eq!(loaded.metadata.node, "main-1");
        assert_eq!(loaded.metadata.excerpt.as_deref(), Some("早上好"));

        let restored = loaded
            .restore_actions()
            .into_iter()
            .fold(AppState::initial(), |state, action| reduce(&state, action));
        assert_eq!(restored.narrative, state.narrative);
        assert_eq!(restored.config.bg_music, "daily");
        assert!(!restored.ui.is_demo);
        assert_eq!(restored.ui.surface, Surface::Scene);
        assert_eq!(restored.narrative.index, NodeKey::from("main-1"));
    }

    #[test]
    fn test_incompatible_version_error() {
        let mut data = SaveData::capture(1, &AppState::initial(), 0);
        data.version = SaveVersion { major: 99, minor: 0 };
        let json = serde_json::to_string(&data).unwrap();

        let result = SaveData::from_json(&json);
        assert!(matches!(result, Err(SaveError::IncompatibleVersion { .. })));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            SaveData::from_json("not json"),
            Err(SaveError::DeserializationFailed(_))
        ));
    }
}
