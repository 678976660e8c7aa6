//! # Render 模块
//!
//! 将界面状态渲染为终端文本。
//!
//! 每个函数只负责一个界面或覆盖层，返回若干行文本，
//! 由 [`crate::app::Shell::view`] 按当前状态拼接。

use story_runtime::{
    Backlog, BacklogEntry, CharacterRoster, ConfigState, Frame, NodeKey, SceneEditor, StoryNode,
    Surface, UiState,
};

use crate::save_manager::SaveInfo;

const RULE: &str = "────────────────────────────────────────";

pub const DISCLAIMER: &str = "本作品纯属虚构，与现实中的人物、团体、事件无关。";

pub const INTRO: &str = "这是一个关于选择的故事。\n每一次选择，都会把你带到不同的地方。";

/// 加载界面
pub fn loading(title: &str) -> Vec<String> {
    vec![title.to_string(), "加载中……".to_string()]
}

/// 免责声明
pub fn disclaimer() -> Vec<String> {
    vec![
        DISCLAIMER.to_string(),
        String::new(),
        "[回车] 确认".to_string(),
    ]
}

/// 标题界面
pub fn title_screen(title: &str, ui: &UiState) -> Vec<String> {
    let mode = if ui.is_demo { "体验版" } else { "完整版" };
    vec![
        RULE.to_string(),
        format!("  {}", title),
        RULE.to_string(),
        format!("当前剧情：{}（mode demo / mode full 切换）", mode),
        "start  开始    intro  开场    load [n]  读档".to_string(),
        "editor 场景编辑器    bgm  音乐开关    quit  退出".to_string(),
    ]
}

/// 开场
pub fn intro() -> Vec<String> {
    let mut lines: Vec<String> = INTRO.lines().map(str::to_string).collect();
    lines.push(String::new());
    lines.push("[回车] 继续    skip  跳过".to_string());
    lines
}

/// 剧情画面
pub fn frame(frame: &Frame, ui: &UiState) -> Vec<String> {
    let mut lines = Vec::new();

    let mut stage = Vec::new();
    if let Some(background) = &frame.background {
        stage.push(format!("背景: {}", background));
    }
    if let Some(sprite) = &frame.sprite {
        stage.push(format!("立绘: {}", sprite));
    }
    if !stage.is_empty() {
        lines.push(format!("[{}]", stage.join(" | ")));
    }

    if !ui.text_box_shown {
        lines.push("（文本框已隐藏，输入 hide 显示）".to_string());
        return lines;
    }

    lines.push(RULE.to_string());
    match &frame.speaker {
        Some(speaker) => lines.push(format!("【{}】{}", speaker, frame.text)),
        None => lines.push(frame.text.clone()),
    }
    for (i, label) in frame.choices.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, label));
    }
    if frame.is_end {
        lines.push("—— 完 ——".to_string());
    }
    lines.push(RULE.to_string());

    if ui.is_debug {
        match frame.key.chapter() {
            Some(chapter) => lines.push(format!("node: {} (章节 {})", frame.key, chapter)),
            None => lines.push(format!("node: {}", frame.key)),
        }
    }
    if ui.is_skipping {
        lines.push("快进中（skip 停止）".to_string());
    }
    lines
}

/// 历史回看
pub fn backlog(backlog: &Backlog) -> Vec<String> {
    let mut lines = vec![format!(
        "=== 历史记录（{} 句，log 关闭）===",
        backlog.dialogue_count()
    )];
    if backlog.is_empty() {
        lines.push("（空）".to_string());
    }
    for entry in backlog.entries() {
        lines.push(match entry {
            BacklogEntry::Dialogue {
                speaker: Some(speaker),
                text,
                ..
            } => format!("【{}】{}", speaker, text),
            BacklogEntry::Dialogue { text, .. } => text.clone(),
            BacklogEntry::ChoiceMade { label, .. } => format!("  → {}", label),
        });
    }
    lines
}

/// 存档 / 读档菜单
pub fn save_slots(saves: &[SaveInfo], saving: bool) -> Vec<String> {
    let header = if saving {
        "=== 存档（save n 保存到第 n 格，save new 保存到空格）==="
    } else {
        "=== 读档（load n 读取第 n 格）==="
    };
    let mut lines = vec![header.to_string()];
    if saves.is_empty() {
        lines.push("（没有存档）".to_string());
    }
    for save in saves {
        let excerpt = save.excerpt.as_deref().unwrap_or("");
        let demo = if save.demo { " [体验版]" } else { "" };
        lines.push(format!(
            "  {:>3}. {} {}{} {}",
            save.slot,
            save.formatted_time(),
            save.node,
            demo,
            excerpt
        ));
    }
    lines
}

/// 设置菜单
pub fn config_menu(config: &ConfigState) -> Vec<String> {
    let on_off = |flag: bool| if flag { "开" } else { "关" };
    vec![
        "=== 设置（menu 关闭）===".to_string(),
        format!("  BGM 音量: {}（vol n）", config.bgm_volume),
        format!("  BGM: {}（bgm）", on_off(config.bgm_playing)),
        format!("  全屏: {}（fs）", on_off(config.is_fullscreen)),
        format!("  音效音量: {}", config.sound_effect_volume),
        format!("  语音音量: {}", config.voice_volume),
        format!("  字体: {}", config.font),
    ]
}

/// 音乐状态行
pub fn music(config: &ConfigState) -> String {
    if config.bgm_playing {
        format!("♪ {}（音量 {}）", config.bg_music, config.bgm_volume)
    } else {
        "♪ 静音".to_string()
    }
}

/// 编辑器标题行
pub fn editor_header(editor: &SceneEditor) -> Vec<String> {
    let dirty = if editor.is_dirty() { "（未保存）" } else { "" };
    vec![
        format!(
            "=== 场景编辑器{}：{} 个节点，{} 个角色 ===",
            dirty,
            editor.story().len(),
            editor.roster().len()
        ),
        "输入 list 查看节点，help 查看编辑命令".to_string(),
    ]
}

/// 节点与角色列表
pub fn editor_listing(editor: &SceneEditor) -> Vec<String> {
    let roster = editor.roster();
    let mut lines: Vec<String> = editor
        .story()
        .iter()
        .map(|(key, node)| format!("  {}", node_summary(key, node, roster)))
        .collect();
    for (id, character) in roster.iter() {
        let sprites: Vec<&str> = character.sprites.keys().map(String::as_str).collect();
        lines.push(format!(
            "  @{} {} [{}]",
            id,
            character.name,
            sprites.join(", ")
        ));
    }
    lines
}

fn node_summary(key: &NodeKey, node: &StoryNode, roster: &CharacterRoster) -> String {
    let speaker = node
        .speaker
        .as_deref()
        .map(|id| format!("【{}】", roster.display_name(id)))
        .unwrap_or_default();
    let mut summary = format!("{:<12} {}{}", key.as_str(), speaker, node.text);
    if !node.choices.is_empty() {
        summary.push_str(&format!(" [{} 个选项]", node.choices.len()));
    }
    if node.end {
        summary.push_str(" [结束]");
    }
    summary
}

/// 单个节点的详细信息
pub fn node_detail(key: &NodeKey, node: &StoryNode) -> Vec<String> {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let mut lines = vec![
        format!("=== {} ===", key),
        format!("  speaker: {}", field(&node.speaker)),
        format!("  text:    {}", node.text),
        format!("  bg:      {}", field(&node.background)),
        format!("  sprite:  {}", field(&node.sprite)),
        format!("  bgm:     {}", field(&node.bgm)),
        format!(
            "  next:    {}",
            node.next
                .as_ref()
                .map(NodeKey::to_string)
                .unwrap_or_else(|| "-".to_string())
        ),
        format!("  end:     {}", if node.end { "on" } else { "off" }),
    ];
    for (i, choice) in node.choices.iter().enumerate() {
        lines.push(format!("  {}. {} -> {}", i + 1, choice.label, choice.target));
    }
    lines
}

/// 当前界面的帮助
pub fn help(surface: Surface) -> Vec<String> {
    let commands: &[&str] = match surface {
        Surface::Loading => &["quit  退出"],
        Surface::Disclaimer => &["[回车] / ok  确认"],
        Surface::Title => &[
            "start  开始",
            "intro  开场",
            "load [n]  读档",
            "editor  场景编辑器",
            "mode demo|full  切换剧情",
            "vol n / bgm / fs  音量 / 音乐 / 全屏",
        ],
        Surface::Intro => &["[回车]  开始剧情", "skip  跳过"],
        Surface::Scene => &[
            "[回车] / next  继续",
            "1, 2, …  选择选项",
            "back  回退一步",
            "log  历史记录",
            "hide  隐藏文本框",
            "skip  快进开关",
            "save [n|new] / load [n] / delete n  存档",
            "menu  设置",
            "title  回到标题",
        ],
        Surface::Editor => &[
            "list / show <key>",
            "new <key> <speaker|-> <text>",
            "set <key> speaker|text|bg|sprite|bgm|next|end <value|->",
            "choice <key> <target> <label>",
            "rechoice <key> <n> <target> <label>",
            "unchoice <key> <n>",
            "del <key>",
            "char <id> <name> / unchar <id>",
            "sprite <id> <name> <path>",
            "check  检查剧情图",
            "flush  保存",
            "close  关闭编辑器",
        ],
    };

    let mut lines: Vec<String> = commands.iter().map(|c| format!("  {}", c)).collect();
    lines.push("  help  帮助    quit  退出".to_string());
    lines
}
