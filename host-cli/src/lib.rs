//! # Host 层
//!
//! 视觉小说播放器的终端宿主实现。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 配置与日志
//! - 文档与存档的文件读写
//! - 加载界面计时
//! - 输入采集与文本渲染
//! - 持有唯一的 `AppState`，把输入转换为 action 交给 reducer
//!
//! Host 层不包含剧情逻辑，推进规则全部在 `story-runtime` 中。

pub mod app;
pub mod config;
pub mod input;
pub mod loading;
pub mod render;
pub mod save_manager;
pub mod store;

pub use app::{Flow, Library, Shell, ShellError};
pub use config::{AppConfig, AudioConfig, ConfigError, DebugConfig, WindowConfig};
pub use input::{EditCommand, InputError, ShellCommand};
pub use loading::LoadingGate;
pub use save_manager::{SaveInfo, SaveManager};
pub use store::{DocumentStore, Documents, StoreError};
