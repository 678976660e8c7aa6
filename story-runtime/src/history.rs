//! # History 模块
//!
//! 历史回看（backlog）数据模型。
//!
//! ## 设计原则
//!
//! - backlog 由剧情状态的历史栈**推导**而来，不单独存储
//! - 回退后重新推导即可，不存在 backlog 与剧情位置不一致的情况

use serde::{Deserialize, Serialize};

use crate::document::StoryDocument;
use crate::key::NodeKey;
use crate::roster::CharacterRoster;
use crate::state::NarrativeState;

/// 默认最多保留的条目数
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// 回看条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BacklogEntry {
    /// 对话
    Dialogue {
        key: NodeKey,
        /// 说话者显示名（None 表示旁白）
        speaker: Option<String>,
        text: String,
    },

    /// 选择
    ChoiceMade { label: String, index: usize },
}

impl BacklogEntry {
    pub fn is_dialogue(&self) -> bool {
        matches!(self, Self::Dialogue { .. })
    }
}

/// 回看记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlog {
    entries: Vec<BacklogEntry>,
}

impl Backlog {
    /// 按播放顺序收集已显示的台词与选择（含当前台词）
    ///
    /// 历史中已不在文档里的节点会被跳过。
    pub fn collect(
        document: &StoryDocument,
        roster: &CharacterRoster,
        narrative: &NarrativeState,
    ) -> Self {
        Self::collect_with_limit(document, roster, narrative, DEFAULT_MAX_ENTRIES)
    }

    /// 同 [`Backlog::collect`]，只保留最后 `max_entries` 条
    pub fn collect_with_limit(
        document: &StoryDocument,
        roster: &CharacterRoster,
        narrative: &NarrativeState,
        max_entries: usize,
    ) -> Self {
        let mut entries = Vec::new();
        let mut choices = narrative
            .choices_history
            .iter()
            .zip(&narrative.choices_index_history);

        let dialogue = |key: &NodeKey| {
            document.get(key).map(|node| BacklogEntry::Dialogue {
                key: key.clone(),
                speaker: node
                    .speaker
                    .as_deref()
                    .map(|id| roster.display_name(id).to_string()),
                text: node.text.clone(),
            })
        };

        for (key, frame) in narrative.index_history.iter().zip(&narrative.state_history) {
            entries.extend(dialogue(key));
            if frame.via_choice {
                if let Some((label, index)) = choices.next() {
                    entries.push(BacklogEntry::ChoiceMade {
                        label: label.clone(),
                        index: *index,
                    });
                }
            }
        }
        entries.extend(dialogue(&narrative.index));

        let overflow = entries.len().saturating_sub(max_entries);
        entries.drain(..overflow);

        Self { entries }
    }

    pub fn entries(&self) -> &[BacklogEntry] {
        &self.entries
    }

    /// 对话条目数量
    pub fn dialogue_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_dialogue()).count()
    }

    /// 最近的 N 条对话（按时间顺序）
    pub fn recent_dialogues(&self, count: usize) -> Vec<&BacklogEntry> {
        let mut recent: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.is_dialogue())
            .rev()
            .take(count)
            .collect();
        recent.reverse();
        recent
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
