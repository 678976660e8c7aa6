//! # Story Runtime
//!
//! 视觉小说播放器与场景编辑器的核心运行时库。
//!
//! ## 架构概述
//!
//! `story-runtime` 是纯逻辑核心，不依赖任何 IO 或渲染引擎。
//! 宿主层（Host）持有唯一的 [`AppState`]，通过 reducer 驱动状态变化：
//!
//! ```text
//! Host                                   Runtime
//!   │                                       │
//!   │── 用户输入 ──► ScenePlayer ──────────►│ advance / select
//!   │◄──────────── Vec<Action> ────────────│
//!   │── reduce(state, action) ─────────────►│
//!   │◄──────────── AppState ───────────────│
//!   │── frame(state) ──────────────────────►│
//!   │◄──────────── Frame ──────────────────│ 渲染
//! ```
//!
//! ## 核心类型
//!
//! - [`StoryDocument`]：剧情图（节点、台词、选项）
//! - [`CharacterRoster`]：角色表
//! - [`AppState`]：配置、剧情、界面三部分状态
//! - [`Action`]：封闭的 action 词汇表
//! - [`ScenePlayer`]：根据剧情图计算画面与推进 action
//! - [`SceneEditor`]：剧情图与角色表的编辑副本
//!
//! ## 使用示例
//!
//! ```ignore
//! use story_runtime::{AppState, ScenePlayer, Step, reduce};
//!
//! let player = ScenePlayer::new(&story, &roster);
//! let mut state = AppState::initial();
//!
//! for action in player.start(&state)? {
//!     state = reduce(&state, action);
//! }
//!
//! loop {
//!     render(player.frame(&state)?);
//!     match wait_for_input() {
//!         Input::Click => match player.advance(&state)? {
//!             Step::Continue(actions) => {
//!                 for action in actions {
//!                     state = reduce(&state, action);
//!                 }
//!             }
//!             Step::Finished => break,
//!         },
//!         Input::Choice(index) => {
//!             for action in player.select(&state, index)? {
//!                 state = reduce(&state, action);
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`key`]：节点 key
//! - [`document`]：剧情图
//! - [`roster`]：角色表
//! - [`state`]：应用状态
//! - [`action`]：action 定义与解码
//! - [`reducer`]：状态机
//! - [`playback`]：播放引擎
//! - [`history`]：历史回看
//! - [`editor`]：场景编辑器
//! - [`diagnostic`]：剧情图静态检查
//! - [`save`]：存档数据模型
//! - [`error`]：错误类型定义

pub mod action;
pub mod diagnostic;
pub mod document;
pub mod editor;
pub mod error;
pub mod history;
pub mod key;
pub mod playback;
pub mod reducer;
pub mod roster;
pub mod save;
pub mod state;

// 重导出核心类型
pub use action::{Action, Advance, ChoiceRecord};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_story};
pub use document::{Choice, StoryDocument, StoryNode};
pub use editor::{DocumentSink, NodeField, SceneEditor};
pub use error::{ActionError, DocumentError, EditorError, PlaybackError, StoryError};
pub use history::{Backlog, BacklogEntry};
pub use key::NodeKey;
pub use playback::{Frame, ScenePlayer, Step};
pub use reducer::{apply, reduce, reduce_json};
pub use roster::{Character, CharacterRoster};
pub use save::{SaveData, SaveError, SaveMetadata, SaveVersion};
pub use state::{AppState, ConfigState, NarrativeFrame, NarrativeState, Surface, UiState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let story = StoryDocument::from_json(
            "story.json",
            r#"{ "main-0": { "speaker": "alice", "text": "Hello", "end": true } }"#,
        )
        .unwrap();
        let roster = CharacterRoster::new();
        let player = ScenePlayer::new(&story, &roster);

        let mut state = AppState::initial();
        for action in player.start(&state).unwrap() {
            state = reduce(&state, action);
        }

        assert!(state.ui.scene_is_rendering());
        assert_eq!(player.frame(&state).unwrap().text, "Hello");
        assert_eq!(player.advance(&state).unwrap(), Step::Finished);
    }
}
