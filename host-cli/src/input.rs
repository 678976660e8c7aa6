//! # Input 模块
//!
//! 将终端输入的一行文本解析为 [`ShellCommand`]。
//!
//! ## 设计说明
//!
//! - 解析分两步：先按语法解析，再按当前主界面检查是否可用
//! - 选项编号对玩家从 1 开始，解析后转换为从 0 开始的索引
//! - 编辑命令中 `-` 表示清空可选字段

use std::str::FromStr;

use story_runtime::{Choice, NodeField, NodeKey, Surface, UiState};
use thiserror::Error;

/// 输入错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("未知命令 '{0}'，输入 help 查看可用命令")]
    Unknown(String),

    #[error("命令 '{command}' 在{surface}界面不可用")]
    NotAvailable {
        command: String,
        surface: &'static str,
    },

    #[error("命令 '{command}' 缺少参数 <{argument}>")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{value}' 不是有效的{expected}")]
    InvalidValue {
        value: String,
        expected: &'static str,
    },
}

/// 场景编辑器命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    List,
    Show(NodeKey),
    New {
        key: NodeKey,
        speaker: Option<String>,
        text: String,
    },
    Set {
        key: NodeKey,
        field: NodeField,
    },
    AddChoice {
        key: NodeKey,
        choice: Choice,
    },
    UpdateChoice {
        key: NodeKey,
        index: usize,
        choice: Choice,
    },
    RemoveChoice {
        key: NodeKey,
        index: usize,
    },
    Delete(NodeKey),
    Character {
        id: String,
        name: String,
    },
    RemoveCharacter(String),
    Sprite {
        id: String,
        name: String,
        path: String,
    },
    Check,
    Flush,
    Close,
}

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// 空行或 `next`
    Continue,
    /// 选择选项（0-based）
    Choose(usize),
    Rewind,
    Backlog,
    TextBox,
    Skip,
    SaveMenu,
    LoadMenu,
    Save(u32),
    /// 保存到第一个空槽位
    SaveNext,
    Load(u32),
    DeleteSave(u32),
    Menu,
    Volume(u8),
    Music,
    Fullscreen,
    /// 确认免责声明
    Accept,
    Start,
    Intro,
    OpenEditor,
    Demo(bool),
    /// 回到标题
    Title,
    Help,
    Quit,
    Edit(EditCommand),
    /// 调试：直接派发 JSON action
    Dispatch(String),
}

impl ShellCommand {
    /// 当前界面是否接受该命令
    pub fn allowed(&self, ui: &UiState) -> bool {
        use ShellCommand::*;

        match self {
            Help | Quit => true,
            _ if ui.is_loading() => false,
            Volume(_) | Music | Fullscreen => true,
            Accept => ui.disclaimer_shown(),
            Start | Intro | OpenEditor | Demo(_) => ui.title_screen_shown(),
            Load(_) | LoadMenu => ui.title_screen_shown() || ui.scene_is_rendering(),
            Continue | Skip => ui.intro_shown() || ui.scene_is_rendering(),
            // 标题界面不显示设置菜单按钮
            Menu => !ui.title_screen_shown() && !ui.disclaimer_shown(),
            Choose(_) | Rewind | Backlog | TextBox | SaveMenu | Save(_) | SaveNext
            | DeleteSave(_) | Title => ui.scene_is_rendering(),
            Edit(_) => ui.editor_is_rendering(),
            Dispatch(_) => ui.is_debug,
        }
    }
}

/// 主界面名称
pub fn surface_name(surface: Surface) -> &'static str {
    match surface {
        Surface::Loading => "加载",
        Surface::Disclaimer => "免责声明",
        Surface::Title => "标题",
        Surface::Intro => "开场",
        Surface::Scene => "剧情",
        Surface::Editor => "编辑器",
    }
}

/// 解析一行输入，并检查当前界面是否可用
pub fn parse(line: &str, ui: &UiState) -> Result<ShellCommand, InputError> {
    let command = parse_line(line, ui)?;
    if command.allowed(ui) {
        Ok(command)
    } else {
        Err(InputError::NotAvailable {
            command: line.trim().to_string(),
            surface: surface_name(ui.surface),
        })
    }
}

/// 按语法解析一行输入
///
/// 空行在免责声明界面表示确认，其余界面表示继续。
pub fn parse_line(line: &str, ui: &UiState) -> Result<ShellCommand, InputError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line, ""),
    };
    let mut args = Args::new(rest);

    if let Ok(number) = word.parse::<usize>() {
        return choice_index(number, word).map(ShellCommand::Choose);
    }

    let command = match word {
        "" if ui.disclaimer_shown() => ShellCommand::Accept,
        "" | "next" | "n" => ShellCommand::Continue,
        "ok" | "accept" => ShellCommand::Accept,
        "back" | "b" => ShellCommand::Rewind,
        "log" => ShellCommand::Backlog,
        "hide" => ShellCommand::TextBox,
        "skip" => ShellCommand::Skip,
        "save" if rest.is_empty() => ShellCommand::SaveMenu,
        "save" if rest == "new" => ShellCommand::SaveNext,
        "save" => ShellCommand::Save(args.number("save", "slot")?),
        "load" if rest.is_empty() => ShellCommand::LoadMenu,
        "load" => ShellCommand::Load(args.number("load", "slot")?),
        "delete" => ShellCommand::DeleteSave(args.number("delete", "slot")?),
        "menu" => ShellCommand::Menu,
        "vol" => ShellCommand::Volume(args.number("vol", "0-100")?),
        "bgm" => ShellCommand::Music,
        "fs" => ShellCommand::Fullscreen,
        "start" => ShellCommand::Start,
        "intro" => ShellCommand::Intro,
        "editor" => ShellCommand::OpenEditor,
        "mode" => match args.word("mode", "demo|full")? {
            "demo" => ShellCommand::Demo(true),
            "full" => ShellCommand::Demo(false),
            other => return Err(invalid(other, "模式（demo / full）")),
        },
        "title" => ShellCommand::Title,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        "action" => ShellCommand::Dispatch(args.rest("action", "json")?.to_string()),
        _ => ShellCommand::Edit(parse_edit(word, &mut args)?),
    };

    Ok(command)
}

fn parse_edit(word: &str, args: &mut Args<'_>) -> Result<EditCommand, InputError> {
    let command = match word {
        "list" => EditCommand::List,
        "show" => EditCommand::Show(args.key("show")?),
        "new" => EditCommand::New {
            key: args.key("new")?,
            speaker: optional(args.word("new", "speaker")?),
            text: args.rest("new", "text")?.to_string(),
        },
        "set" => {
            let key = args.key("set")?;
            let field = args.word("set", "field")?;
            let value = args.rest("set", "value")?;
            EditCommand::Set {
                key,
                field: node_field(field, value)?,
            }
        }
        "choice" => EditCommand::AddChoice {
            key: args.key("choice")?,
            choice: args.choice("choice")?,
        },
        "rechoice" => EditCommand::UpdateChoice {
            key: args.key("rechoice")?,
            index: args.choice_index("rechoice")?,
            choice: args.choice("rechoice")?,
        },
        "unchoice" => EditCommand::RemoveChoice {
            key: args.key("unchoice")?,
            index: args.choice_index("unchoice")?,
        },
        "del" => EditCommand::Delete(args.key("del")?),
        "char" => EditCommand::Character {
            id: args.word("char", "id")?.to_string(),
            name: args.rest("char", "name")?.to_string(),
        },
        "unchar" => EditCommand::RemoveCharacter(args.word("unchar", "id")?.to_string()),
        "sprite" => EditCommand::Sprite {
            id: args.word("sprite", "id")?.to_string(),
            name: args.word("sprite", "name")?.to_string(),
            path: args.rest("sprite", "path")?.to_string(),
        },
        "check" => EditCommand::Check,
        "flush" => EditCommand::Flush,
        "close" => EditCommand::Close,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn node_field(field: &str, value: &str) -> Result<NodeField, InputError> {
    let field = match field {
        "speaker" => NodeField::Speaker(optional(value)),
        "text" => NodeField::Text(value.to_string()),
        "bg" => NodeField::Background(optional(value)),
        "sprite" => NodeField::Sprite(optional(value)),
        "bgm" => NodeField::Bgm(optional(value)),
        "next" => NodeField::Next(optional(value).map(NodeKey::from)),
        "end" => match value {
            "on" | "true" => NodeField::End(true),
            "off" | "false" => NodeField::End(false),
            other => return Err(invalid(other, "开关（on / off）")),
        },
        other => {
            return Err(invalid(
                other,
                "字段（speaker / text / bg / sprite / bgm / next / end）",
            ));
        }
    };
    Ok(field)
}

fn optional(value: &str) -> Option<String> {
    (value != "-").then(|| value.to_string())
}

fn invalid(value: &str, expected: &'static str) -> InputError {
    InputError::InvalidValue {
        value: value.to_string(),
        expected,
    }
}

fn choice_index(number: usize, raw: &str) -> Result<usize, InputError> {
    number
        .checked_sub(1)
        .ok_or_else(|| invalid(raw, "选项编号（从 1 开始）"))
}

/// 命令参数游标
struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn new(rest: &'a str) -> Self {
        Self { rest }
    }

    /// 下一个以空白分隔的参数
    fn word(
        &mut self,
        command: &'static str,
        argument: &'static str,
    ) -> Result<&'a str, InputError> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return Err(InputError::MissingArgument { command, argument });
        }
        let (word, remainder) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        self.rest = remainder;
        Ok(word)
    }

    /// 剩余全部文本
    fn rest(
        &mut self,
        command: &'static str,
        argument: &'static str,
    ) -> Result<&'a str, InputError> {
        let rest = self.rest.trim();
        if rest.is_empty() {
            return Err(InputError::MissingArgument { command, argument });
        }
        self.rest = "";
        Ok(rest)
    }

    fn number<T: FromStr>(
        &mut self,
        command: &'static str,
        argument: &'static str,
    ) -> Result<T, InputError> {
        let word = self.word(command, argument)?;
        word.parse().map_err(|_| invalid(word, "数字"))
    }

    fn key(&mut self, command: &'static str) -> Result<NodeKey, InputError> {
        self.word(command, "key").map(NodeKey::from)
    }

    fn choice_index(&mut self, command: &'static str) -> Result<usize, InputError> {
        let word = self.word(command, "n")?;
        let number = word.parse().map_err(|_| invalid(word, "选项编号"))?;
        choice_index(number, word)
    }

    /// `<target> <label...>`
    fn choice(&mut self, command: &'static str) -> Result<Choice, InputError> {
        let target = self.word(command, "target")?;
        let label = self.rest(command, "label")?;
        Ok(Choice::new(label, target))
    }
}
