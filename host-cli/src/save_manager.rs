//! # SaveManager 模块
//!
//! 存档文件管理，负责存档的读写和 slot 管理。
//!
//! ## 文件布局
//!
//! ```text
//! saves/
//! ├── slot_001.json
//! ├── slot_002.json
//! └── ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use story_runtime::{SaveData, SaveError};
use tracing::{info, warn};

/// 最大存档槽位数
pub const MAX_SAVE_SLOTS: u32 = 99;

/// 存档管理器
#[derive(Debug, Clone)]
pub struct SaveManager {
    /// 存档目录
    saves_dir: PathBuf,
}

impl SaveManager {
    pub fn new(saves_dir: impl AsRef<Path>) -> Self {
        Self {
            saves_dir: saves_dir.as_ref().to_path_buf(),
        }
    }

    /// 确保存档目录存在
    pub fn ensure_dir(&self) -> Result<(), SaveError> {
        fs::create_dir_all(&self.saves_dir)
            .map_err(|e| SaveError::IoError(format!("无法创建存档目录: {}", e)))
    }

    /// 获取存档文件路径
    pub fn slot_path(&self, slot: u32) -> PathBuf {
        self.saves_dir.join(format!("slot_{:03}.json", slot))
    }

    fn check_slot(slot: u32) -> Result<(), SaveError> {
        if (1..=MAX_SAVE_SLOTS).contains(&slot) {
            Ok(())
        } else {
            Err(SaveError::IoError(format!(
                "存档槽位 {} 超出范围 1 - {}",
                slot, MAX_SAVE_SLOTS
            )))
        }
    }

    /// 保存存档
    pub fn save(&self, data: &SaveData) -> Result<(), SaveError> {
        Self::check_slot(data.metadata.slot)?;
        self.ensure_dir()?;

        let path = self.slot_path(data.metadata.slot);
        let json = data.to_json()?;
        fs::write(&path, json)
            .map_err(|e| SaveError::IoError(format!("无法写入存档文件: {}", e)))?;

        info!(slot = data.metadata.slot, path = %path.display(), "存档保存成功");
        Ok(())
    }

    /// 读取存档
    pub fn load(&self, slot: u32) -> Result<SaveData, SaveError> {
        Self::check_slot(slot)?;
        let path = self.slot_path(slot);

        if !path.exists() {
            return Err(SaveError::NotFound(path.display().to_string()));
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| SaveError::IoError(format!("无法读取存档文件: {}", e)))?;
        let data = SaveData::from_json(&json)?;

        info!(slot, path = %path.display(), "存档读取成功");
        Ok(data)
    }

    /// 删除存档
    pub fn delete(&self, slot: u32) -> Result<(), SaveError> {
        let path = self.slot_path(slot);

        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| SaveError::IoError(format!("无法删除存档文件: {}", e)))?;
            info!(slot, "存档删除成功");
        }

        Ok(())
    }

    /// 检查存档是否存在
    pub fn exists(&self, slot: u32) -> bool {
        self.slot_path(slot).exists()
    }

    /// 列出所有存档槽位
    pub fn list_slots(&self) -> Vec<u32> {
        let Ok(entries) = fs::read_dir(&self.saves_dir) else {
            return Vec::new();
        };

        let mut slots: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| parse_slot_file_name(entry.file_name().to_str()?))
            .collect();

        slots.sort_unstable();
        slots
    }

    /// 获取下一个可用的存档槽位
    pub fn next_available_slot(&self) -> Option<u32> {
        (1..=MAX_SAVE_SLOTS).find(|slot| !self.exists(*slot))
    }

    /// 所有可读存档的信息（用于菜单显示）
    ///
    /// 无法读取的存档会被跳过并记录警告。
    pub fn list_saves(&self) -> Vec<SaveInfo> {
        self.list_slots()
            .into_iter()
            .filter_map(|slot| match self.load(slot) {
                Ok(data) => Some(SaveInfo::from(&data)),
                Err(e) => {
                    warn!(slot, error = %e, "存档无法读取");
                    None
                }
            })
            .collect()
    }
}

/// 从文件名解析槽位号，只接受 `slot_NNN.json` 且在 1..=99 内
fn parse_slot_file_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("slot_")?.strip_suffix(".json")?;
    if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let slot: u32 = digits.parse().ok()?;
    (1..=MAX_SAVE_SLOTS).contains(&slot).then_some(slot)
}

/// 存档信息（用于 UI 显示）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveInfo {
    pub slot: u32,
    pub timestamp: u64,
    pub node: String,
    pub excerpt: Option<String>,
    pub demo: bool,
}

impl SaveInfo {
    /// 格式化保存时间（UTC）
    pub fn formatted_time(&self) -> String {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "未知时间".to_string())
    }
}

impl From<&SaveData> for SaveInfo {
    fn from(data: &SaveData) -> Self {
        Self {
            slot: data.metadata.slot,
            timestamp: data.metadata.timestamp,
            node: data.metadata.node.clone(),
            excerpt: data.metadata.excerpt.clone(),
            demo: data.demo,
        }
    }
}

/// 当前 Unix 时间（秒）
pub fn now_timestamp() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
