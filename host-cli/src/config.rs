//! # Config 模块
//!
//! 运行时配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 内置资源根目录
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// 内置剧情图路径（相对于 assets_root）
    #[serde(default = "default_story_path")]
    pub story_path: String,

    /// 内置角色表路径（相对于 assets_root）
    #[serde(default = "default_characters_path")]
    pub characters_path: String,

    /// 编辑器文档目录（story.json / characters.json）
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// 存档目录
    #[serde(default = "default_saves_dir")]
    pub saves_dir: PathBuf,

    /// 启动时播放内置体验版剧情
    #[serde(default = "default_demo")]
    pub demo: bool,

    /// 加载界面停留时间（毫秒），调试模式下忽略
    #[serde(default = "default_loading_delay_ms")]
    pub loading_delay_ms: u64,

    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 调试配置
    #[serde(default)]
    pub debug: DebugConfig,

    /// 音频配置
    #[serde(default)]
    pub audio: AudioConfig,
}

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口标题
    #[serde(default = "default_window_title")]
    pub title: String,

    /// 是否全屏
    #[serde(default)]
    pub fullscreen: bool,
}

/// 调试配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// 调试模式：跳过加载等待，输出 debug 日志
    #[serde(default)]
    pub enabled: bool,

    /// 启动时是否输出剧情检查的 Warn / Info 诊断
    ///
    /// Error 级别的诊断总会阻止启动，与此开关无关。
    #[serde(default = "default_story_check")]
    pub story_check: bool,
}

/// 音频配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// BGM 初始音量 (0 - 100)
    #[serde(default = "default_bgm_volume")]
    pub bgm_volume: u8,

    /// 是否静音启动
    #[serde(default)]
    pub muted: bool,
}

// 默认值函数
fn default_assets_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_story_path() -> String {
    "story/story.json".to_string()
}

fn default_characters_path() -> String {
    "story/characters.json".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_saves_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_demo() -> bool {
    true
}

fn default_loading_delay_ms() -> u64 {
    3500
}

fn default_window_title() -> String {
    "Visual Novel Maker".to_string()
}

fn default_bgm_volume() -> u8 {
    50
}

fn default_story_check() -> bool {
    // 在 debug build 时默认开启
    cfg!(debug_assertions)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets_root: default_assets_root(),
            story_path: default_story_path(),
            characters_path: default_characters_path(),
            data_dir: default_data_dir(),
            saves_dir: default_saves_dir(),
            demo: default_demo(),
            loading_delay_ms: default_loading_delay_ms(),
            window: WindowConfig::default(),
            debug: DebugConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_window_title(),
            fullscreen: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            story_check: default_story_check(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bgm_volume: default_bgm_volume(),
            muted: false,
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；文件存在但无法解析时返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!(path = %path.display(), "配置文件加载成功");
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// 内置剧情图完整路径
    pub fn story_full_path(&self) -> PathBuf {
        self.assets_root.join(&self.story_path)
    }

    /// 内置角色表完整路径
    pub fn characters_full_path(&self) -> PathBuf {
        self.assets_root.join(&self.characters_path)
    }

    /// 实际生效的加载等待时间
    pub fn loading_delay(&self) -> std::time::Duration {
        if self.debug.enabled {
            std::time::Duration::ZERO
        } else {
            std::time::Duration::from_millis(self.loading_delay_ms)
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.assets_root.exists() {
            return Err(ConfigError::ValidationFailed(format!(
                "资源目录不存在: {}",
                self.assets_root.display()
            )));
        }

        for path in [self.story_full_path(), self.characters_full_path()] {
            if !path.exists() {
                return Err(ConfigError::ValidationFailed(format!(
                    "内置文档不存在: {}",
                    path.display()
                )));
            }
        }

        if self.audio.bgm_volume > 100 {
            return Err(ConfigError::ValidationFailed(
                "BGM 音量必须在 0 - 100 之间".to_string(),
            ));
        }

        if self.data_dir == self.saves_dir {
            return Err(ConfigError::ValidationFailed(
                "data_dir 与 saves_dir 不能是同一目录".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),

    #[error("配置文件 {path} 读写失败: {message}")]
    Io { path: PathBuf, message: String },

    #[error("配置文件 {path} 解析失败: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
