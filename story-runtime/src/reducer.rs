//! # Reducer 模块
//!
//! 状态机核心：`(state, action) -> state`。
//!
//! ## 设计说明
//!
//! - 纯函数：不做 IO，不读取时间，不持有全局状态
//! - 全函数：每个 action 都对应确定的状态变换
//! - 主界面是 [`Surface`] 枚举，任何变换后都只有一个主界面可见
//! - 未知 action 在解码阶段就被拒绝（见 [`crate::action::Action::from_json`]），
//!   不会走到这里

use crate::action::Action;
use crate::error::ActionError;
use crate::state::{AppState, Surface};

/// 状态变换
pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    apply(&mut next, action);
    next
}

/// 解码并应用一个 JSON action
///
/// 解码失败时返回错误，`state` 不受影响。
pub fn reduce_json(state: &AppState, json: &str) -> Result<AppState, ActionError> {
    let action = Action::from_json(json)?;
    Ok(reduce(state, action))
}

/// 原地应用 action
pub fn apply(state: &mut AppState, action: Action) {
    let ui = &mut state.ui;
    let config = &mut state.config;

    match action {
        Action::SetVolume(volume) => config.bgm_volume = volume.min(100),
        Action::BgmToggle => config.bgm_playing = !config.bgm_playing,
        Action::BgmOn => config.bgm_playing = true,
        Action::BgmOff => config.bgm_playing = false,
        Action::MenuToggle => ui.config_menu_shown = !ui.config_menu_shown,
        Action::MenuOff => ui.config_menu_shown = false,
        Action::SetFullscreen(fullscreen) => config.is_fullscreen = fullscreen,
        Action::ToggleLoading => {
            if ui.is_loading() {
                ui.surface = ui.suspended.take().unwrap_or_else(|| ui.after_loading());
            } else {
                ui.suspended = Some(ui.surface);
                ui.surface = Surface::Loading;
            }
        }
        Action::ShowSplash => {
            ui.disclaimer_pending = false;
            ui.suspended = None;
            ui.surface = Surface::Title;
        }
        Action::ShowTitle => {
            ui.suspended = None;
            ui.surface = ui.after_loading();
        }
        Action::ShowIntro => ui.surface = Surface::Intro,
        Action::StartScene => ui.surface = Surface::Scene,
        Action::StartEditor => ui.surface = Surface::Editor,
        Action::CloseEditor => ui.surface = Surface::Title,
        Action::AdvanceToNode(advance) => {
            let outgoing = Some(config.bg_music.clone());
            state.narrative.advance_from(&advance, outgoing);
        }
        Action::ChangeBgm(track) => config.bg_music = track,
        Action::SetDemoMode(demo) => ui.is_demo = demo,
        Action::Reset => {
            let bgm_playing = config.bgm_playing;
            *state = AppState::initial();
            state.config.bgm_playing = bgm_playing;
            state.ui.surface = Surface::Title;
            state.ui.disclaimer_pending = false;
        }
        Action::Rewind => {
            if let Some(track) = state.narrative.rewind_frame().and_then(|frame| frame.bg_music) {
                config.bg_music = track;
            }
        }
        Action::ToggleBacklog => ui.backlog_shown = !ui.backlog_shown,
        Action::ToggleTextBox => ui.text_box_shown = !ui.text_box_shown,
        Action::ToggleSaveMenu => {
            ui.save_menu_shown = !ui.save_menu_shown;
            ui.load_menu_shown = false;
        }
        Action::ToggleLoadMenu => {
            ui.load_menu_shown = !ui.load_menu_shown;
            ui.save_menu_shown = false;
        }
        Action::ToggleSkip => ui.is_skipping = !ui.is_skipping,
        Action::SetDebug(debug) => ui.is_debug = debug,
        Action::RestoreNarrative(narrative) => {
            state.narrative = *narrative;
            state.ui.save_menu_shown = false;
            state.ui.load_menu_shown = false;
            state.ui.surface = Surface::Scene;
        }
    }
}
