//! # Playback 模块
//!
//! 剧情播放引擎：根据当前状态和剧情图生成画面，并计算推进剧情所需的 action。
//!
//! ## 执行模型
//!
//! ```text
//! frame(state)          -> Frame            当前画面
//! advance(state)        -> Step             无选项时前进
//! select(state, index)  -> Vec<Action>      选择选项
//! ```
//!
//! 播放器本身不修改状态，只产出 action，由持有状态的一方交给 reducer。
//! 引用不存在的节点时返回错误并拒绝前进，不会替换成其他节点。

use crate::action::{Action, Advance};
use crate::document::{StoryDocument, StoryNode};
use crate::error::PlaybackError;
use crate::key::NodeKey;
use crate::roster::CharacterRoster;
use crate::state::AppState;

/// 渲染用的画面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub key: NodeKey,
    /// 说话者显示名（None 表示旁白）
    pub speaker: Option<String>,
    pub text: String,
    pub background: Option<String>,
    /// 立绘资源路径
    pub sprite: Option<String>,
    pub bgm: Option<String>,
    /// 选项文本
    pub choices: Vec<String>,
    /// 剧情在此结束
    pub is_end: bool,
}

/// `advance` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 需要交给 reducer 的 action
    Continue(Vec<Action>),
    /// 剧情已结束
    Finished,
}

/// 剧情播放器
#[derive(Debug, Clone, Copy)]
pub struct ScenePlayer<'a> {
    document: &'a StoryDocument,
    roster: &'a CharacterRoster,
}

impl<'a> ScenePlayer<'a> {
    pub fn new(document: &'a StoryDocument, roster: &'a CharacterRoster) -> Self {
        Self { document, roster }
    }

    pub fn document(&self) -> &'a StoryDocument {
        self.document
    }

    /// 当前节点
    pub fn current(&self, state: &AppState) -> Result<&'a StoryNode, PlaybackError> {
        self.node(&state.narrative.index)
    }

    fn node(&self, key: &NodeKey) -> Result<&'a StoryNode, PlaybackError> {
        self.document
            .get(key)
            .ok_or_else(|| PlaybackError::MissingNode { key: key.clone() })
    }

    /// 生成当前画面
    pub fn frame(&self, state: &AppState) -> Result<Frame, PlaybackError> {
        let key = &state.narrative.index;
        let node = self.node(key)?;
        let speaker = node.speaker.as_deref();

        Ok(Frame {
            key: key.clone(),
            speaker: speaker.map(|id| self.roster.display_name(id).to_string()),
            text: node.text.clone(),
            background: node.background.clone(),
            sprite: node
                .sprite
                .as_deref()
                .map(|sprite| self.roster.sprite_path(speaker, sprite).to_string()),
            bgm: node.bgm.clone(),
            choices: node.choices.iter().map(|c| c.label.clone()).collect(),
            is_end: node.end,
        })
    }

    /// 进入剧情界面
    ///
    /// 校验当前节点存在，并切换到入口节点的 BGM。
    pub fn start(&self, state: &AppState) -> Result<Vec<Action>, PlaybackError> {
        let node = self.current(state)?;
        let mut actions = vec![Action::StartScene];
        actions.extend(music_change(state, node));
        Ok(actions)
    }

    /// 无选项时前进到下一句
    pub fn advance(&self, state: &AppState) -> Result<Step, PlaybackError> {
        let key = &state.narrative.index;
        let node = self.node(key)?;

        if node.has_choices() {
            return Err(PlaybackError::ChoiceRequired {
                key: key.clone(),
                choice_count: node.choices.len(),
            });
        }
        if node.end {
            return Ok(Step::Finished);
        }

        let target = node
            .successor(key)
            .ok_or_else(|| PlaybackError::NoSuccessor { key: key.clone() })?;
        let target_node = self.resolve(key, &target)?;

        Ok(Step::Continue(self.transition(
            state,
            Advance::to(target),
            target_node,
        )))
    }

    /// 选择第 `index` 个选项
    pub fn select(&self, state: &AppState, index: usize) -> Result<Vec<Action>, PlaybackError> {
        let key = &state.narrative.index;
        let node = self.node(key)?;

        if !node.has_choices() {
            return Err(PlaybackError::NoChoices { key: key.clone() });
        }
        let choice = node
            .choices
            .get(index)
            .ok_or(PlaybackError::InvalidChoiceIndex {
                index,
                max: node.choices.len(),
            })?;
        let target_node = self.resolve(key, &choice.target)?;

        Ok(self.transition(
            state,
            Advance::choice(choice.target.clone(), index, choice.label.clone()),
            target_node,
        ))
    }

    fn resolve(&self, from: &NodeKey, target: &NodeKey) -> Result<&'a StoryNode, PlaybackError> {
        self.document
            .get(target)
            .ok_or_else(|| PlaybackError::UnresolvedTarget {
                from: from.clone(),
                target: target.clone(),
            })
    }

    fn transition(&self, state: &AppState, advance: Advance, target: &StoryNode) -> Vec<Action> {
        let mut actions = vec![Action::AdvanceToNode(
            advance.with_choices(target.has_choices()),
        )];
        actions.extend(music_change(state, target));
        actions
    }
}

/// 节点要求的 BGM 与当前不同时，产生切换 action
fn music_change(state: &AppState, node: &StoryNode) -> Option<Action> {
    node.bgm
        .as_ref()
        .filter(|track| **track != state.config.bg_music)
        .map(|track| Action::ChangeBgm(track.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Choice;
    use crate::reducer::reduce;
    use crate::roster::Character;

    fn document() -> StoryDocument {
        let mut doc = StoryDocument::new();
        doc.insert(
            "main-0",
            StoryNode {
                sprite: Some("smile".to_string()),
                background: Some("room".to_string()),
                ..StoryNode::line(Some("alice"), "早上好").with_bgm("daily")
            },
        );
        doc.insert(
            "main-1",
            StoryNode::line(None, "要去哪里？").with_choices(vec![
                Choice::new("学校", "school-0"),
                Choice::new("公园", "park-0"),
                Choice::new("河边", "river-0"),
            ]),
        );
        doc.insert("school-0", StoryNode::line(Some("bob"), "到学校了").ending());
        doc.insert(
            "park-0",
            StoryNode::line(None, "到公园了")
                .with_next("school-0")
                .with_bgm("park"),
        );
        doc
    }

    fn roster() -> CharacterRoster {
        let mut roster = CharacterRoster::new();
        roster.insert(
            "alice",
            Character::new("爱丽丝").with_sprite("smile", "sprites/alice/smile.png"),
        );
        roster
    }

    fn play(state: AppState, actions: Vec<Action>) -> AppState {
        actions
            .into_iter()
            .fold(state, |state, action| reduce(&state, action))
    }

    #[test]
    fn test_frame_resolves_roster() {
        let (doc, roster) = (document(), roster());
        let player = ScenePlayer::new(&doc, &roster);

        let frame = player.frame(&AppState::initial()).unwrap();
        assert_eq!(frame.speaker.as_deref(), Some("爱丽丝"));
        assert_eq!(frame.sprite.as_deref(), Some("sprites/alice/smile.png"));
        assert_eq!(frame.background.as_deref(), Some("room"));
        assert!(frame.choices.is_empty());
    }

    #[test]
    fn test_start_switches_music() {
        let (doc, roster) = (document(), roster());
        let player = ScenePlayer::new(&doc, &roster);

        let actions = player.start(&AppState::initial()).unwrap();
        assert_eq!(
            actions,
            vec![Action::StartScene, Action::ChangeBgm("daily".to_string())]
        );
    }

    #[test]
    fn test_advance_is_deterministic() {
        let (doc, roster) = (document(), roster());
        let player = ScenePlayer::new(&doc, &roster);
        let state = AppState::initial();

        let first = player.advance(&state).unwrap();
        let second = player.advance(&state).unwrap();
        assert_eq!(first, second);

        let Step::Continue(actions) = first else {
            panic!("expected continue");
        };
        assert_eq!(
            actions,
            vec![Action::AdvanceToNode(Advance::to("main-1").with_choices(true))]
        );

        let state = play(state, actions);
        assert_eq!(state.narrative.index, NodeKey::from("main-1"));
        assert!(state.narrative.choices_exist);
    }

    #[test]
    fn test_advance_requires_choice() {
        let (doc, roster) = (document(), roster());
        let player = ScenePlayer::new(&doc, &roster);
        let state = play(AppState::initial(), vec![Action::advance_to("main-1")]);

        let err = player.advance(&state).unwrap_err();
        assert_eq!(
            err,
            PlaybackError::ChoiceRequired {
                key: NodeKey::from("main-1"),
                choice_count: 3
            }
        );
    }

    #[test]
    fn test_select_choice() {
        let (doc, roster) = (document(), roster());
        let player = ScenePlayer::new(&doc, &roster);
        let state = play(AppState::initial(), vec![Action::advance_to("main-1")]);

        let actions = player.select(&state, 1).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::AdvanceToNode(Advance::choice("park-0", 1, "公园")),
                Action::ChangeBgm("park".to_string()),
            ]
        );

        let state = play(state, actions);
        assert_eq!(state.narrative.index, NodeKey::from("park-0"));
        assert_eq!(
            state.narrative.index_history,
            vec![NodeKey::from("main-0"), NodeKey::from("main-1")]
        );
        assert_eq!(state.narrative.choices_index_history, vec![1]);
        assert_eq!(state.config.bg_music, "park");

        // next 覆盖推算的 park-1
        let Step::Continue(actions) = player.advance(&state).unwrap() else {
            panic!("expected continue");
        };
        let state = play(state, actions);
        assert_eq!(state.narrative.index, NodeKey::from("school-0"));
        assert_eq!(player.advance(&state).unwrap(), Step::Finished);
    }

    #[test]
    fn test_unresolved_target_refuses_to_advance() {
        let (doc, roster) = (document(), roster());
        let player = ScenePlayer::new(&doc, &roster);
        let state = play(AppState::initial(), vec![Action::advance_to("main-1")]);

        let err = player.select(&state, 2).unwrap_err();
        assert_eq!(
            err,
            PlaybackError::UnresolvedTarget {
                from: NodeKey::from("main-1"),
                target: NodeKey::from("river-0"),
            }
        );

        assert!(matches!(
            player.select(&state, 3),
            Err(PlaybackError::InvalidChoiceIndex { index: 3, max: 3 })
        ));
    }

    #[test]
    fn test_missing_implicit_successor() {
        let mut doc = StoryDocument::new();
        doc.insert("main-0", StoryNode::line(None, "孤零零的一句"));
        let roster = CharacterRoster::new();
        let player = ScenePlayer::new(&doc, &roster);

        let err = player.advance(&AppState::initial()).unwrap_err();
        assert!(matches!(err, PlaybackError::UnresolvedTarget { .. }));
    }

    #[test]
    fn test_missing_current_node() {
        let doc = StoryDocument::new();
        let roster = CharacterRoster::new();
        let player = ScenePlayer::new(&doc, &roster);

        assert_eq!(
            player.frame(&AppState::initial()).unwrap_err(),
            PlaybackError::MissingNode {
                key: NodeKey::start()
            }
        );
    }

    #[test]
    fn test_select_on_line_without_choices() {
        let (doc, roster) = (document(), roster());
        let player = ScenePlayer::new(&doc, &roster);
        assert!(matches!(
            player.select(&AppState::initial(), 0),
            Err(PlaybackError::NoChoices { .. })
        ));
    }
}
