//! # Store 模块
//!
//! 编辑器文档的持久化存储。
//!
//! ## 文件布局
//!
//! ```text
//! data/
//! ├── story.json
//! └── characters.json
//! ```
//!
//! 首次运行时以内置文档作为初始内容写入。
//!
//! 每个文件先写入同目录的 `.tmp` 文件再改名，单个文件不会被写成半截。
//! 两个文件之间不是原子的：角色表写入失败时剧情图已经是新内容，
//! 编辑器保持 dirty，再次写回即可补齐。

use std::fs;
use std::path::{Path, PathBuf};

use story_runtime::{CharacterRoster, DocumentError, DocumentSink, StoryDocument};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const STORY_FILE: &str = "story.json";
pub const CHARACTERS_FILE: &str = "characters.json";

/// 一组可播放的文档
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Documents {
    pub story: StoryDocument,
    pub roster: CharacterRoster,
}

impl Documents {
    /// 从两个文件读取
    pub fn read(story_path: &Path, characters_path: &Path) -> Result<Self, StoreError> {
        let story = StoryDocument::from_json(&file_label(story_path), &read(story_path)?)?;
        let roster =
            CharacterRoster::from_json(&file_label(characters_path), &read(characters_path)?)?;
        Ok(Self { story, roster })
    }
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("无法读取 {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("无法写入 {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// 文档存储
#[derive(Debug, Clone)]
pub struct DocumentStore {
    data_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn story_path(&self) -> PathBuf {
        self.data_dir.join(STORY_FILE)
    }

    pub fn characters_path(&self) -> PathBuf {
        self.data_dir.join(CHARACTERS_FILE)
    }

    /// 缺失的文件以 `initial` 补齐
    pub fn seed(&mut self, initial: &Documents) -> Result<(), StoreError> {
        if !self.story_path().exists() {
            self.write_story(&initial.story)?;
            info!(path = %self.story_path().display(), "写入初始剧情图");
        }
        if !self.characters_path().exists() {
            self.write_characters(&initial.roster)?;
            info!(path = %self.characters_path().display(), "写入初始角色表");
        }
        Ok(())
    }

    /// 读取已保存的文档
    pub fn load(&self) -> Result<Documents, StoreError> {
        Documents::read(&self.story_path(), &self.characters_path())
    }

    fn write(&self, path: PathBuf, json: String) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Write {
            path: self.data_dir.clone(),
            source,
        })?;

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|source| StoreError::Write {
            path: staging.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&staging, &path) {
            if let Err(e) = fs::remove_file(&staging) {
                warn!(path = %staging.display(), error = %e, "无法清理临时文件");
            }
            return Err(StoreError::Write { path, source });
        }

        debug!(path = %path.display(), "文档已写入");
        Ok(())
    }
}

impl DocumentSink for DocumentStore {
    type Error = StoreError;

    fn write_story(&mut self, story: &StoryDocument) -> Result<(), StoreError> {
        self.write(self.story_path(), story.to_json()?)
    }

    fn write_characters(&mut self, roster: &CharacterRoster) -> Result<(), StoreError> {
        self.write(self.characters_path(), roster.to_json()?)
    }
}

fn read(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn file_label(path: &Path) -> String {
    path.display().to_string()
}
