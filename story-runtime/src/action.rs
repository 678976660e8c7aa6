//! # Action 模块
//!
//! 定义 reducer 接受的全部 action。
//!
//! ## 设计说明
//!
//! - action 词汇表是**封闭**的：[`Action`] 枚举之外不存在其他 action
//! - 来自外部（JSON）的 action 通过 [`Action::from_json`] 解码，未知类型返回
//!   [`ActionError::UnknownAction`]，调用方的状态保持不变
//!
//! JSON 形式与 `{ "type": ..., "payload": ... }` 对齐：
//!
//! ```json
//! { "type": "setVolume", "payload": 30 }
//! { "type": "advanceToNode", "payload": { "target": "main-1" } }
//! { "type": "reset" }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::key::NodeKey;
use crate::state::NarrativeState;

/// 一次选择的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    /// 选项索引
    pub index: usize,
    /// 选项文本
    pub label: String,
}

/// 前进到某个节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    /// 目标节点
    pub target: NodeKey,
    /// 通过选项前进时的选择
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<ChoiceRecord>,
    /// 目标节点是否有选项
    #[serde(default)]
    pub choices_exist: bool,
}

impl Advance {
    /// 直接前进（无选择）
    pub fn to(target: impl Into<NodeKey>) -> Self {
        Self {
            target: target.into(),
            choice: None,
            choices_exist: false,
        }
    }

    /// 通过选项前进
    pub fn choice(target: impl Into<NodeKey>, index: usize, label: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            choice: Some(ChoiceRecord {
                index,
                label: label.into(),
            }),
            choices_exist: false,
        }
    }

    /// 标记目标节点是否有选项
    pub fn with_choices(mut self, choices_exist: bool) -> Self {
        self.choices_exist = choices_exist;
        self
    }
}

/// Reducer action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Action {
    /// 设置 BGM 音量（0 - 100）
    SetVolume(u8),
    BgmToggle,
    BgmOn,
    BgmOff,
    /// 切换设置菜单
    MenuToggle,
    MenuOff,
    SetFullscreen(bool),
    /// 进入 / 离开加载界面
    ToggleLoading,
    /// 确认免责声明
    ShowSplash,
    /// 加载完成，显示标题（或尚未确认的免责声明）
    ShowTitle,
    ShowIntro,
    StartScene,
    StartEditor,
    CloseEditor,
    /// 前进到节点
    AdvanceToNode(Advance),
    /// 切换 BGM
    ChangeBgm(String),
    /// 体验版 / 完整版剧情
    SetDemoMode(bool),
    /// 回到标题，仅保留 BGM 播放开关
    Reset,
    /// 回退一步
    Rewind,
    ToggleBacklog,
    ToggleTextBox,
    ToggleSaveMenu,
    ToggleLoadMenu,
    ToggleSkip,
    SetDebug(bool),
    /// 读档：替换剧情状态
    RestoreNarrative(Box<NarrativeState>),
}

impl Action {
    /// 所有 action 的类型名
    pub const KINDS: [&'static str; 26] = [
        "setVolume",
        "bgmToggle",
        "bgmOn",
        "bgmOff",
        "menuToggle",
        "menuOff",
        "setFullscreen",
        "toggleLoading",
        "showSplash",
        "showTitle",
        "showIntro",
        "startScene",
        "startEditor",
        "closeEditor",
        "advanceToNode",
        "changeBgm",
        "setDemoMode",
        "reset",
        "rewind",
        "toggleBacklog",
        "toggleTextBox",
        "toggleSaveMenu",
        "toggleLoadMenu",
        "toggleSkip",
        "setDebug",
        "restoreNarrative",
    ];

    /// 前进到节点（无选择）
    pub fn advance_to(target: impl Into<NodeKey>) -> Self {
        Self::AdvanceToNode(Advance::to(target))
    }

    /// 类型名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetVolume(_) => "setVolume",
            Self::BgmToggle => "bgmToggle",
            Self::BgmOn => "bgmOn",
            Self::BgmOff => "bgmOff",
            Self::MenuToggle => "menuToggle",
            Self::MenuOff => "menuOff",
            Self::SetFullscreen(_) => "setFullscreen",
            Self::ToggleLoading => "toggleLoading",
            Self::ShowSplash => "showSplash",
            Self::ShowTitle => "showTitle",
            Self::ShowIntro => "showIntro",
            Self::StartScene => "startScene",
            Self::StartEditor => "startEditor",
            Self::CloseEditor => "closeEditor",
            Self::AdvanceToNode(_) => "advanceToNode",
            Self::ChangeBgm(_) => "changeBgm",
            Self::SetDemoMode(_) => "setDemoMode",
            Self::Reset => "reset",
            Self::Rewind => "rewind",
            Self::ToggleBacklog => "toggleBacklog",
            Self::ToggleTextBox => "toggleTextBox",
            Self::ToggleSaveMenu => "toggleSaveMenu",
            Self::ToggleLoadMenu => "toggleLoadMenu",
            Self::ToggleSkip => "toggleSkip",
            Self::SetDebug(_) => "setDebug",
            Self::RestoreNarrative(_) => "restoreNarrative",
        }
    }

    /// 从 JSON 解码
    pub fn from_json(json: &str) -> Result<Self, ActionError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ActionError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// 从 JSON 值解码
    pub fn from_value(value: serde_json::Value) -> Result<Self, ActionError> {
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ActionError::Malformed("缺少字符串字段 'type'".to_string()))?;

        if !Self::KINDS.contains(&kind) {
            return Err(ActionError::UnknownAction {
                kind: kind.to_string(),
            });
        }

        serde_json::from_value(value).map_err(|e| ActionError::Malformed(e.to_string()))
    }
}
