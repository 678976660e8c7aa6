//! # App 模块
//!
//! 终端宿主：持有唯一的 [`AppState`]，把输入命令转换为 action 交给 reducer。
//!
//! ## 职责
//!
//! - 启动：读取内置文档并检查，准备编辑器文档存储、存档目录、加载闸门
//! - 播放：按 `is_demo` 选择内置剧情或编辑器保存的剧情，交给 [`ScenePlayer`]
//! - 编辑：持有 [`SceneEditor`] 会话，保存后重新加载存储中的剧情
//! - 渲染：按当前主界面与覆盖层拼接文本
//!
//! 播放遇到不存在的节点时停在当前节点并报告错误，不会替换成其他节点。

use std::time::{Duration, Instant};

use story_runtime::{
    Action, AppState, Backlog, Character, DiagnosticLevel, DiagnosticResult, PlaybackError,
    SaveData, SceneEditor, ScenePlayer, Step, StoryNode, Surface, analyze_story, apply,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::input::{self, EditCommand, ShellCommand};
use crate::loading::LoadingGate;
use crate::render;
use crate::save_manager::{SaveManager, now_timestamp};
use crate::store::{DocumentStore, Documents, StoreError};

/// 快进时单次最多前进的步数
pub const MAX_SKIP_STEPS: usize = 1000;

/// 启动错误
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{document} 检查发现 {errors} 个错误：\n{report}")]
    Diagnostics {
        document: String,
        errors: usize,
        report: String,
    },
}

/// 事件循环是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 可播放的两套文档
#[derive(Debug, Clone)]
pub struct Library {
    /// 内置体验版剧情
    demo: Documents,
    /// 编辑器保存的剧情
    stored: Documents,
}

impl Library {
    pub fn new(demo: Documents, stored: Documents) -> Self {
        Self { demo, stored }
    }

    pub fn documents(&self, is_demo: bool) -> &Documents {
        if is_demo { &self.demo } else { &self.stored }
    }

    pub fn player(&self, is_demo: bool) -> ScenePlayer<'_> {
        let documents = self.documents(is_demo);
        ScenePlayer::new(&documents.story, &documents.roster)
    }

    pub fn stored(&self) -> &Documents {
        &self.stored
    }

    pub fn replace_stored(&mut self, stored: Documents) {
        self.stored = stored;
    }
}

/// 终端宿主
pub struct Shell {
    config: AppConfig,
    state: AppState,
    library: Library,
    store: DocumentStore,
    saves: SaveManager,
    gate: LoadingGate,
    editor: Option<SceneEditor>,
    /// 本轮命令产生的提示
    notices: Vec<String>,
    /// 本轮命令产生的附加输出（帮助、节点详情等）
    extra: Vec<String>,
}

impl Shell {
    /// 启动
    ///
    /// 内置剧情检查出错误时拒绝启动；编辑器剧情的错误只记录日志，
    /// 播放到出错的位置时才会停下。
    pub fn boot(config: AppConfig, now: Instant) -> Result<Self, ShellError> {
        config.validate()?;

        let demo = Documents::read(&config.story_full_path(), &config.characters_full_path())?;
        info!(
            nodes = demo.story.len(),
            characters = demo.roster.len(),
            "内置剧情加载成功"
        );
        let report = analyze_story(
            &config.story_full_path().display().to_string(),
            &demo.story,
            &demo.roster,
        );
        log_diagnostics(&report, config.debug.story_check);
        if report.has_errors() {
            return Err(ShellError::Diagnostics {
                document: config.story_full_path().display().to_string(),
                errors: report.error_count(),
                report: report.render(DiagnosticLevel::Error),
            });
        }

        let mut store = DocumentStore::new(&config.data_dir);
        store.seed(&demo)?;
        let stored = store.load()?;
        info!(data_dir = %config.data_dir.display(), nodes = stored.story.len(), "编辑器剧情加载成功");
        let report = analyze_story(
            &store.story_path().display().to_string(),
            &stored.story,
            &stored.roster,
        );
        log_diagnostics(&report, config.debug.story_check);

        let saves = SaveManager::new(&config.saves_dir);
        info!(saves_dir = %config.saves_dir.display(), "存档管理器初始化成功");

        let gate = LoadingGate::new(now, config.loading_delay());
        let mut shell = Self {
            state: AppState::initial(),
            library: Library::new(demo, stored),
            store,
            saves,
            gate,
            editor: None,
            notices: Vec::new(),
            extra: Vec::new(),
            config,
        };

        shell.dispatch(Action::SetDebug(shell.config.debug.enabled));
        shell.dispatch(Action::SetVolume(shell.config.audio.bgm_volume));
        shell.dispatch(Action::SetFullscreen(shell.config.window.fullscreen));
        shell.dispatch(Action::SetDemoMode(shell.config.demo));
        if shell.config.audio.muted {
            shell.dispatch(Action::BgmOff);
        }

        Ok(shell)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn editor(&self) -> Option<&SceneEditor> {
        self.editor.as_ref()
    }

    /// 上一条命令产生的提示
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// 事件循环每轮调用：检查加载闸门
    ///
    /// 返回闸门是否在本轮触发。
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.gate.poll(now) {
            Some(action) => {
                info!("加载完成");
                self.dispatch(action);
                true
            }
            None => false,
        }
    }

    /// 距加载完成的剩余时间
    pub fn loading_remaining(&self, now: Instant) -> Option<Duration> {
        self.gate.remaining(now)
    }

    /// 停止：取消尚未触发的加载闸门
    pub fn shutdown(&mut self) {
        if self.gate.is_pending() {
            debug!("加载尚未完成，取消加载闸门");
            self.gate.cancel();
        }
        if self.editor.as_ref().is_some_and(SceneEditor::is_dirty) {
            warn!("编辑器有未保存的修改，已丢弃");
        }
        info!("退出");
    }

    fn dispatch(&mut self, action: Action) {
        debug!(action = action.kind(), "dispatch");
        apply(&mut self.state, action);
    }

    fn dispatch_all(&mut self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    /// 当前播放用的剧情
    fn player(&self) -> ScenePlayer<'_> {
        self.library.player(self.state.ui.is_demo)
    }

    /// 处理一行输入
    pub fn handle_line(&mut self, line: &str) -> Flow {
        self.notices.clear();
        self.extra.clear();

        match input::parse(line, &self.state.ui) {
            Ok(command) => self.handle(command),
            Err(e) => {
                debug!(line, error = %e, "无效输入");
                self.notice(e.to_string());
                Flow::Continue
            }
        }
    }

    /// 执行一条命令
    pub fn handle(&mut self, command: ShellCommand) -> Flow {
        let intro = self.state.ui.intro_shown();

        match command {
            ShellCommand::Quit => {
                self.shutdown();
                return Flow::Quit;
            }
            ShellCommand::Help => self.extra = render::help(self.state.ui.surface),
            ShellCommand::Accept => self.dispatch(Action::ShowSplash),
            ShellCommand::Start => self.start_scene(),
            ShellCommand::Intro => self.dispatch(Action::ShowIntro),
            ShellCommand::OpenEditor => self.open_editor(),
            ShellCommand::Demo(demo) => self.dispatch(Action::SetDemoMode(demo)),
            ShellCommand::Continue | ShellCommand::Skip if intro => self.start_scene(),
            ShellCommand::Continue if self.state.ui.is_skipping => self.fast_forward(),
            ShellCommand::Continue => {
                self.advance();
            }
            ShellCommand::Skip => {
                self.dispatch(Action::ToggleSkip);
                self.fast_forward();
            }
            ShellCommand::Choose(index) => self.select(index),
            ShellCommand::Rewind => self.rewind(),
            ShellCommand::Backlog => self.dispatch(Action::ToggleBacklog),
            ShellCommand::TextBox => self.dispatch(Action::ToggleTextBox),
            ShellCommand::SaveMenu => self.dispatch(Action::ToggleSaveMenu),
            ShellCommand::LoadMenu => self.dispatch(Action::ToggleLoadMenu),
            ShellCommand::Save(slot) => self.save_slot(slot),
            ShellCommand::SaveNext => match self.saves.next_available_slot() {
                Some(slot) => self.save_slot(slot),
                None => self.notice("存档已满，请用 save n 覆盖"),
            },
            ShellCommand::Load(slot) => self.load_slot(slot),
            ShellCommand::DeleteSave(slot) => match self.saves.delete(slot) {
                Ok(()) => self.notice(format!("已删除第 {} 格存档", slot)),
                Err(e) => self.notice(e.to_string()),
            },
            ShellCommand::Menu => self.dispatch(Action::MenuToggle),
            ShellCommand::Volume(volume) => self.dispatch(Action::SetVolume(volume)),
            ShellCommand::Music => self.dispatch(Action::BgmToggle),
            ShellCommand::Fullscreen => {
                let fullscreen = !self.state.config.is_fullscreen;
                self.dispatch(Action::SetFullscreen(fullscreen));
            }
            ShellCommand::Title => self.dispatch(Action::Reset),
            ShellCommand::Edit(command) => self.edit(command),
            ShellCommand::Dispatch(json) => match Action::from_json(&json) {
                Ok(action) => self.dispatch(action),
                Err(e) => {
                    warn!(json = %json, error = %e, "拒绝 action");
                    self.notice(e.to_string());
                }
            },
        }

        Flow::Continue
    }

    //=========================================================================
    // 播放
    //=========================================================================

    fn start_scene(&mut self) {
        match self.player().start(&self.state) {
            Ok(actions) => {
                info!(node = %self.state.narrative.index, demo = self.state.ui.is_demo, "开始播放");
                self.dispatch_all(actions);
            }
            Err(e) => self.halt(e),
        }
    }

    /// 前进一步，返回是否前进了
    fn advance(&mut self) -> bool {
        match self.player().advance(&self.state) {
            Ok(Step::Continue(actions)) => {
                self.dispatch_all(actions);
                true
            }
            Ok(Step::Finished) => {
                info!(node = %self.state.narrative.index, "剧情结束");
                self.notice("剧终，回到标题");
                self.dispatch(Action::Reset);
                false
            }
            Err(e) => {
                self.halt(e);
                false
            }
        }
    }

    /// 快进到下一个选项或结尾
    fn fast_forward(&mut self) {
        for _ in 0..MAX_SKIP_STEPS {
            let ui = &self.state.ui;
            if !ui.is_skipping || !ui.scene_is_rendering() || self.state.narrative.choices_exist {
                return;
            }
            if !self.advance() {
                break;
            }
        }
        if self.state.ui.is_skipping {
            self.dispatch(Action::ToggleSkip);
        }
    }

    fn select(&mut self, index: usize) {
        match self.player().select(&self.state, index) {
            Ok(actions) => {
                self.dispatch_all(actions);
                if self.state.ui.is_skipping {
                    self.fast_forward();
                }
            }
            Err(e) => self.halt(e),
        }
    }

    fn rewind(&mut self) {
        if self.state.narrative.depth() == 0 {
            self.notice("已经是第一句了");
            return;
        }
        self.dispatch(Action::Rewind);
    }

    /// 播放无法继续：停在当前节点并报告
    fn halt(&mut self, e: PlaybackError) {
        match e {
            PlaybackError::ChoiceRequired { choice_count, .. } => {
                self.notice(format!("请选择 1 - {}", choice_count));
            }
            PlaybackError::InvalidChoiceIndex { max, .. } => {
                self.notice(format!("没有这个选项，请选择 1 - {}", max));
            }
            PlaybackError::NoChoices { .. } => self.notice("当前没有选项"),
            e => {
                error!(node = %self.state.narrative.index, error = %e, "播放中止");
                self.notice(format!("播放中止：{}", e));
                if self.state.ui.is_skipping {
                    self.dispatch(Action::ToggleSkip);
                }
            }
        }
    }

    //=========================================================================
    // 存档
    //=========================================================================

    fn save_slot(&mut self, slot: u32) {
        let mut data = SaveData::capture(slot, &self.state, now_timestamp());
        if let Ok(frame) = self.player().frame(&self.state) {
            data = data.with_excerpt(frame.text);
        }

        match self.saves.save(&data) {
            Ok(()) => {
                self.notice(format!("已保存到第 {} 格", slot));
                if self.state.ui.save_menu_shown {
                    self.dispatch(Action::ToggleSaveMenu);
                }
            }
            Err(e) => {
                error!(slot, error = %e, "存档失败");
                self.notice(e.to_string());
            }
        }
    }

    fn load_slot(&mut self, slot: u32) {
        let data = match self.saves.load(slot) {
            Ok(data) => data,
            Err(e) => {
                warn!(slot, error = %e, "读档失败");
                self.notice(e.to_string());
                return;
            }
        };

        // 存档位置必须能在对应剧情中找到
        let key = &data.narrative.index;
        if !self.library.documents(data.demo).story.contains(key) {
            error!(slot, node = %key, "存档位置在剧情中不存在");
            self.notice(format!("无法读档：节点 '{}' 已不存在", key));
            return;
        }

        self.dispatch_all(data.restore_actions());
        self.notice(format!("已读取第 {} 格", slot));
    }

    //=========================================================================
    // 编辑器
    //=========================================================================

    fn open_editor(&mut self) {
        let stored = self.library.stored();
        self.editor = Some(SceneEditor::new(
            stored.story.clone(),
            stored.roster.clone(),
        ));
        info!("打开场景编辑器");
        self.dispatch(Action::StartEditor);
    }

    fn edit(&mut self, command: EditCommand) {
        let Some(mut editor) = self.editor.take() else {
            warn!("编辑器未打开");
            return;
        };

        match command {
            EditCommand::Close => {
                if editor.is_dirty() {
                    warn!("编辑器有未保存的修改，已丢弃");
                    self.notice("未保存的修改已丢弃");
                }
                info!("关闭场景编辑器");
                self.dispatch(Action::CloseEditor);
                return;
            }
            EditCommand::Flush => self.flush(&mut editor),
            command => match apply_edit(&mut editor, command) {
                Ok(lines) => self.extra = lines,
                Err(e) => self.notice(format!("编辑失败：{}", e)),
            },
        }

        self.editor = Some(editor);
    }

    /// 写回存储，并让播放使用新的剧情
    fn flush(&mut self, editor: &mut SceneEditor) {
        if let Err(e) = editor.flush(&mut self.store) {
            error!(error = %e, "保存失败");
            self.notice(e.to_string());
            return;
        }

        match self.store.load() {
            Ok(stored) => {
                let report = analyze_story("编辑中的剧情", &stored.story, &stored.roster);
                info!(
                    nodes = stored.story.len(),
                    errors = report.error_count(),
                    warnings = report.warn_count(),
                    "剧情已保存"
                );
                self.library.replace_stored(stored);
                if report.has_errors() {
                    self.notice(format!(
                        "已保存，但有 {} 个错误（check 查看）",
                        report.error_count()
                    ));
                } else {
                    self.notice("已保存");
                }
            }
            Err(e) => {
                error!(error = %e, "重新加载失败");
                self.notice(e.to_string());
            }
        }
    }

    //=========================================================================
    // 渲染
    //=========================================================================

    /// 渲染当前界面
    pub fn view(&self) -> String {
        let ui = &self.state.ui;
        let title = &self.config.window.title;

        let mut lines = match ui.surface {
            Surface::Loading => render::loading(title),
            Surface::Disclaimer => render::disclaimer(),
            Surface::Title => render::title_screen(title, ui),
            Surface::Intro => render::intro(),
            Surface::Scene => match self.player().frame(&self.state) {
                Ok(frame) => render::frame(&frame, ui),
                Err(e) => vec![format!("无法显示当前节点：{}", e)],
            },
            Surface::Editor => self
                .editor
                .as_ref()
                .map(render::editor_header)
                .unwrap_or_default(),
        };

        if ui.scene_is_rendering() && ui.backlog_shown {
            let documents = self.library.documents(ui.is_demo);
            let backlog = Backlog::collect(
                &documents.story,
                &documents.roster,
                &self.state.narrative,
            );
            lines.extend(render::backlog(&backlog));
        }
        if ui.save_menu_shown || ui.load_menu_shown {
            lines.extend(render::save_slots(
                &self.saves.list_saves(),
                ui.save_menu_shown,
            ));
        }
        if ui.config_menu_shown {
            lines.extend(render::config_menu(&self.state.config));
        }
        if !ui.is_loading() {
            lines.push(render::music(&self.state.config));
        }

        lines.extend(self.extra.iter().cloned());
        lines.extend(self.notices.iter().map(|notice| format!("> {}", notice)));
        lines.join("\n")
    }
}

/// 执行一条编辑命令，返回需要显示的附加输出
fn apply_edit(
    editor: &mut SceneEditor,
    command: EditCommand,
) -> Result<Vec<String>, story_runtime::EditorError> {
    match command {
        EditCommand::List => return Ok(render::editor_listing(editor)),
        EditCommand::Show(key) => {
            let node = editor
                .story()
                .get(&key)
                .ok_or_else(|| story_runtime::EditorError::NodeNotFound { key: key.clone() })?;
            return Ok(render::node_detail(&key, node));
        }
        EditCommand::Check => {
            let report = analyze_story("编辑中的剧情", editor.story(), editor.roster());
            if report.is_empty() {
                return Ok(vec!["检查通过".to_string()]);
            }
            return Ok(report
                .render(DiagnosticLevel::Info)
                .lines()
                .map(str::to_string)
                .collect());
        }
        EditCommand::New { key, speaker, text } => {
            editor.create_node(key, StoryNode::line(speaker.as_deref(), text))?;
        }
        EditCommand::Set { key, field } => editor.update_node(&key, field)?,
        EditCommand::AddChoice { key, choice } => {
            editor.add_choice(&key, choice)?;
        }
        EditCommand::UpdateChoice { key, index, choice } => {
            editor.update_choice(&key, index, choice)?;
        }
        EditCommand::RemoveChoice { key, index } => {
            editor.remove_choice(&key, index)?;
        }
        EditCommand::Delete(key) => {
            editor.delete_node(&key)?;
        }
        EditCommand::Character { id, name } => {
            // 改名时保留已有立绘
            let sprites = editor
                .roster()
                .get(&id)
                .map(|character| character.sprites.clone())
                .unwrap_or_default();
            editor.upsert_character(id, Character { name, sprites });
        }
        EditCommand::RemoveCharacter(id) => {
            editor.remove_character(&id)?;
        }
        EditCommand::Sprite { id, name, path } => editor.set_sprite(&id, name, path)?,
        EditCommand::Flush | EditCommand::Close => {}
    }
    Ok(Vec::new())
}

/// 把诊断写入日志
///
/// Error 总是输出；`verbose` 时才输出 Warn / Info。
fn log_diagnostics(report: &DiagnosticResult, verbose: bool) {
    for d in &report.diagnostics {
        let key = d.key.as_ref().map(ToString::to_string).unwrap_or_default();
        match d.level {
            DiagnosticLevel::Error => {
                error!(document = %d.document, node = %key, message = %d.message, "诊断错误")
            }
            DiagnosticLevel::Warn if verbose => {
                warn!(document = %d.document, node = %key, message = %d.message, "诊断警告")
            }
            DiagnosticLevel::Info if verbose => {
                info!(document = %d.document, node = %key, message = %d.message, "诊断信息")
            }
            _ => {}
        }
    }

    if report.has_errors() {
        warn!(
            errors = report.error_count(),
            warnings = report.warn_count(),
            "剧情检查完成，发现错误"
        );
    } else {
        debug!(warnings = report.warn_count(), "剧情检查通过");
    }
}
