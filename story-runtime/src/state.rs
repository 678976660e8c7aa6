//! # State 模块
//!
//! 定义应用的唯一权威状态 [`AppState`]。
//!
//! ## 设计原则
//!
//! - 所有状态必须**显式建模**
//! - 所有状态必须**可序列化**（支持存档/读档）
//! - 不允许隐式全局状态：状态只通过 [`crate::reducer::reduce`] 变化
//!
//! 状态分为三部分，彼此正交：
//!
//! - [`ConfigState`]：音量、BGM、字体、全屏
//! - [`NarrativeState`]：剧情位置与历史栈
//! - [`UiState`]：当前主界面与覆盖层开关

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::Advance;
use crate::key::NodeKey;

/// 标题界面 BGM
pub const MENU_TRACK: &str = "menu";

/// 默认字体
pub const DEFAULT_FONT: &str = "Handwritten";

/// 配置状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigState {
    /// 当前 BGM
    pub bg_music: String,
    /// BGM 音量（0 - 100）
    pub bgm_volume: u8,
    /// BGM 是否在播放
    pub bgm_playing: bool,
    /// 音效音量（0 - 100）
    pub sound_effect_volume: u8,
    /// 语音音量（0 - 100）
    pub voice_volume: u8,
    /// 字体
    pub font: String,
    /// 是否全屏
    pub is_fullscreen: bool,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            bg_music: MENU_TRACK.to_string(),
            bgm_volume: 50,
            bgm_playing: true,
            sound_effect_volume: 90,
            voice_volume: 100,
            font: DEFAULT_FONT.to_string(),
            is_fullscreen: false,
        }
    }
}

/// 一步前进之前的剧情快照（用于回退）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeFrame {
    /// 离开的节点
    pub index: NodeKey,
    /// 离开的节点是否有选项
    pub choices_exist: bool,
    /// 这一步是否通过选项离开
    pub via_choice: bool,
    /// 离开前 `choices_store[index]` 的值
    pub stored_choice: Option<usize>,
    /// 离开时的 BGM（回退时恢复）
    #[serde(default)]
    pub bg_music: Option<String>,
}

/// 剧情状态
///
/// # 不变量
///
/// - `index_history.len() == state_history.len()`
/// - `choices_history.len() == choices_index_history.len()`
/// - 选项历史的长度等于 `state_history` 中 `via_choice` 的帧数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeState {
    /// 当前节点
    pub index: NodeKey,
    /// 已经过的节点
    pub index_history: Vec<NodeKey>,
    /// 已选择的选项文本
    pub choices_history: Vec<String>,
    /// 已选择的选项索引
    pub choices_index_history: Vec<usize>,
    /// 每一步之前的快照
    pub state_history: Vec<NarrativeFrame>,
    /// 当前节点是否有选项
    pub choices_exist: bool,
    /// 每个节点最近一次的选择
    pub choices_store: BTreeMap<NodeKey, usize>,
}

impl Default for NarrativeState {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeState {
    pub fn new() -> Self {
        Self::starting_at(NodeKey::start())
    }

    /// 从指定节点开始
    pub fn starting_at(index: NodeKey) -> Self {
        Self {
            index,
            index_history: Vec::new(),
            choices_history: Vec::new(),
            choices_index_history: Vec::new(),
            state_history: Vec::new(),
            choices_exist: false,
            choices_store: BTreeMap::new(),
        }
    }

    /// 前进一步
    pub fn advance(&mut self, advance: &Advance) {
        self.advance_from(advance, None);
    }

    /// 前进一步，并记下离开时的 BGM
    pub fn advance_from(&mut self, advance: &Advance, bg_music: Option<String>) {
        let outgoing = std::mem::replace(&mut self.index, advance.target.clone());

        self.state_history.push(NarrativeFrame {
            index: outgoing.clone(),
            choices_exist: self.choices_exist,
            via_choice: advance.choice.is_some(),
            stored_choice: self.choices_store.get(&outgoing).copied(),
            bg_music,
        });

        if let Some(choice) = &advance.choice {
            self.choices_history.push(choice.label.clone());
            self.choices_index_history.push(choice.index);
            self.choices_store.insert(outgoing.clone(), choice.index);
        }

        self.index_history.push(outgoing);
        self.choices_exist = advance.choices_exist;
    }

    /// 回退一步，返回是否发生了回退
    pub fn rewind(&mut self) -> bool {
        self.rewind_frame().is_some()
    }

    /// 回退一步，返回被弹出的快照
    pub fn rewind_frame(&mut self) -> Option<NarrativeFrame> {
        let frame = self.state_history.pop()?;

        self.index_history.pop();
        if frame.via_choice {
            self.choices_history.pop();
            self.choices_index_history.pop();
        }
        match frame.stored_choice {
            Some(index) => self.choices_store.insert(frame.index.clone(), index),
            None => self.choices_store.remove(&frame.index),
        };

        self.index = frame.index.clone();
        self.choices_exist = frame.choices_exist;
        Some(frame)
    }

    /// 已前进的步数
    pub fn depth(&self) -> usize {
        self.state_history.len()
    }

    /// 检查历史栈的一致性
    pub fn is_consistent(&self) -> bool {
        let via_choice = self
            .state_history
            .iter()
            .filter(|frame| frame.via_choice)
            .count();

        self.index_history.len() == self.state_history.len()
            && self.choices_history.len() == self.choices_index_history.len()
            && self.choices_history.len() == via_choice
            && self
                .index_history
                .iter()
                .zip(&self.state_history)
                .all(|(key, frame)| *key == frame.index)
    }
}

/// 主界面
///
/// 同一时刻只有一个主界面可见。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Surface {
    /// 资源加载中
    #[default]
    Loading,
    /// 免责声明
    Disclaimer,
    /// 标题界面
    Title,
    /// 开场
    Intro,
    /// 剧情播放
    Scene,
    /// 场景编辑器
    Editor,
}

impl Surface {
    pub const ALL: [Surface; 6] = [
        Surface::Loading,
        Surface::Disclaimer,
        Surface::Title,
        Surface::Intro,
        Surface::Scene,
        Surface::Editor,
    ];
}

/// 界面状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    /// 当前主界面
    pub surface: Surface,
    /// 进入加载界面前的主界面（`ToggleLoading` 返回时使用）
    pub suspended: Option<Surface>,
    /// 免责声明尚未确认
    pub disclaimer_pending: bool,
    pub config_menu_shown: bool,
    pub backlog_shown: bool,
    pub text_box_shown: bool,
    pub save_menu_shown: bool,
    pub load_menu_shown: bool,
    pub is_skipping: bool,
    pub is_debug: bool,
    /// 播放内置体验版剧情（否则播放编辑器保存的剧情）
    pub is_demo: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            surface: Surface::Loading,
            suspended: None,
            disclaimer_pending: true,
            config_menu_shown: false,
            backlog_shown: false,
            text_box_shown: true,
            save_menu_shown: false,
            load_menu_shown: false,
            is_skipping: false,
            is_debug: false,
            is_demo: true,
        }
    }
}

impl UiState {
    pub fn is_loading(&self) -> bool {
        self.surface == Surface::Loading
    }

    pub fn disclaimer_shown(&self) -> bool {
        self.surface == Surface::Disclaimer
    }

    pub fn title_screen_shown(&self) -> bool {
        self.surface == Surface::Title
    }

    pub fn intro_shown(&self) -> bool {
        self.surface == Surface::Intro
    }

    pub fn scene_is_rendering(&self) -> bool {
        self.surface == Surface::Scene
    }

    pub fn editor_is_rendering(&self) -> bool {
        self.surface == Surface::Editor
    }

    /// 可见主界面的数量（恒为 1）
    pub fn visible_surface_count(&self) -> usize {
        [
            self.is_loading(),
            self.disclaimer_shown(),
            self.title_screen_shown(),
            self.intro_shown(),
            self.scene_is_rendering(),
            self.editor_is_rendering(),
        ]
        .into_iter()
        .filter(|shown| *shown)
        .count()
    }

    /// 加载结束后应进入的界面
    pub(crate) fn after_loading(&self) -> Surface {
        if self.disclaimer_pending {
            Surface::Disclaimer
        } else {
            Surface::Title
        }
    }
}

/// 应用状态
///
/// 这是应用的**唯一可变状态**，由宿主层持有，通过 reducer 变换。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppState {
    pub config: ConfigState,
    pub narrative: NarrativeState,
    pub ui: UiState,
}

impl AppState {
    /// 初始状态
    pub fn initial() -> Self {
        Self::default()
    }
}
