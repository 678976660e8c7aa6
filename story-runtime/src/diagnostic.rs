//! # 诊断模块
//!
//! 提供剧情图静态检查和诊断 API，不依赖 IO。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 与播放器使用同一套后继规则（[`StoryNode::successor`]），
//!   检查通过的文档在播放时不会遇到不存在的节点

use std::collections::{BTreeSet, VecDeque};

use crate::document::{StoryDocument, StoryNode};
use crate::key::NodeKey;
use crate::roster::CharacterRoster;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 文档名（通常为文件路径）
    pub document: String,
    /// 相关节点
    pub key: Option<NodeKey>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情
    pub detail: Option<String>,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, document: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            document: document.to_string(),
            key: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(document: &str, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, document, message)
    }

    /// 创建警告诊断
    pub fn warn(document: &str, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, document, message)
    }

    /// 创建信息诊断
    pub fn info(document: &str, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, document, message)
    }

    /// 设置相关节点
    pub fn at(mut self, key: &NodeKey) -> Self {
        self.key = Some(key.clone());
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.document)?;
        if let Some(key) = &self.key {
            write!(f, " @ {}", key)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }

    /// 把 `min_level` 及以上的诊断渲染为多行文本
    pub fn render(&self, min_level: DiagnosticLevel) -> String {
        self.filter_by_level(min_level)
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

//=============================================================================
// 剧情图分析 API
//=============================================================================

/// 分析剧情图
///
/// 执行以下检查：
/// - Error：入口节点 `main-0` 不存在
/// - Error：`next` 或选项目标不存在
/// - Error：非结尾、无选项节点的推算后继不存在（或 key 无法推算）
/// - Warn：从入口不可达的节点
/// - Warn：同时标记了 `end` 和选项的节点（选项优先）
/// - Warn：说话者在角色表中，但立绘不在其立绘集中
/// - Info：说话者不在角色表中（按原样显示）
pub fn analyze_story(
    name: &str,
    document: &StoryDocument,
    roster: &CharacterRoster,
) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let start = NodeKey::start();

    if !document.contains(&start) {
        result.push(
            Diagnostic::error(name, format!("入口节点 '{}' 不存在", start))
                .with_detail("剧情总是从 main-0 开始播放"),
        );
    }

    for (key, node) in document.iter() {
        check_links(name, document, key, node, &mut result);
        check_presentation(name, roster, key, node, &mut result);
    }

    if document.contains(&start) {
        let reachable = reachable_from(document, &start);
        for key in document.keys().filter(|key| !reachable.contains(*key)) {
            result.push(
                Diagnostic::warn(name, "节点不可达")
                    .at(key)
                    .with_detail(format!("从 '{}' 出发无法到达该节点", start)),
            );
        }
    }

    result
}

fn check_links(
    name: &str,
    document: &StoryDocument,
    key: &NodeKey,
    node: &StoryNode,
    result: &mut DiagnosticResult,
) {
    if node.has_choices() {
        for (index, choice) in node.choices.iter().enumerate() {
            if !document.contains(&choice.target) {
                result.push(
                    Diagnostic::error(name, format!("选项目标 '{}' 不存在", choice.target))
                        .at(key)
                        .with_detail(format!("第 {} 个选项「{}」", index, choice.label)),
                );
            }
        }
        if node.end {
            result.push(Diagnostic::warn(name, "节点同时有选项和 end 标记，end 被忽略").at(key));
        }
        return;
    }

    if node.end {
        if let Some(next) = &node.next {
            result.push(
                Diagnostic::warn(name, format!("节点有 end 标记，next '{}' 被忽略", next))
                    .at(key),
            );
        }
        return;
    }

    if let Some(next) = &node.next {
        if !document.contains(next) {
            result.push(
                Diagnostic::error(name, format!("next 目标 '{}' 不存在", next)).at(key),
            );
        }
        return;
    }

    match key.successor() {
        Some(successor) if !document.contains(&successor) => result.push(
            Diagnostic::error(name, format!("后继节点 '{}' 不存在", successor))
                .at(key)
                .with_detail("最后一句请标记 end，或用 next 指定后继"),
        ),
        Some(_) => {}
        None => result.push(
            Diagnostic::error(name, "无法推算后继节点")
                .at(key)
                .with_detail("key 需为 `章节-序号` 格式，或用 next 指定后继"),
        ),
    }
}

fn check_presentation(
    name: &str,
    roster: &CharacterRoster,
    key: &NodeKey,
    node: &StoryNode,
    result: &mut DiagnosticResult,
) {
    let Some(speaker) = node.speaker.as_deref() else {
        return;
    };

    match roster.get(speaker) {
        Some(character) => {
            if let Some(sprite) = node.sprite.as_deref() {
                if !character.sprites.contains_key(sprite) && !sprite.contains('/') {
                    result.push(
                        Diagnostic::warn(
                            name,
                            format!("角色 '{}' 没有立绘 '{}'", speaker, sprite),
                        )
                        .at(key),
                    );
                }
            }
        }
        None => result.push(
            Diagnostic::info(name, format!("说话者 '{}' 不在角色表中，按原样显示", speaker))
                .at(key),
        ),
    }
}

/// 从 `start` 出发可达的节点
pub fn reachable_from(document: &StoryDocument, start: &NodeKey) -> BTreeSet<NodeKey> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(key) = queue.pop_front() {
        let Some(node) = document.get(&key) else {
            continue;
        };
        if !seen.insert(key.clone()) {
            continue;
        }

        if node.has_choices() {
            queue.extend(node.choices.iter().map(|c| c.target.clone()));
        } else if !node.end {
            queue.extend(node.successor(&key));
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Choice;
    use crate::roster::Character;

    fn roster() -> CharacterRoster {
        let mut roster = CharacterRoster::new();
        roster.insert(
            "alice",
            Character::new("爱丽丝").with_sprite("smile", "sprites/alice/smile.png"),
        );
        roster
    }

    #[test]
    fn test_valid_story() {
        let mut doc = StoryDocument::new();
        doc.insert("main-0", StoryNode::line(Some("alice"), "你好"));
        doc.insert(
            "main-1",
            StoryNode::line(Some("alice"), "选吧").with_choices(vec![
                Choice::new("A", "a-0"),
                Choice::new("B", "b-0"),
            ]),
        );
        doc.insert("a-0", StoryNode::line(None, "A 线").with_next("b-1"));
        doc.insert("b-0", StoryNode::line(None, "B 线"));
        doc.insert("b-1", StoryNode::line(None, "结局").ending());

        let result = analyze_story("story.json", &doc, &roster());
        assert!(result.is_empty(), "{}", result.render(DiagnosticLevel::Info));
    }

    #[test]
    fn test_missing_start() {
        let mut doc = StoryDocument::new();
        doc.insert("prologue-0", StoryNode::line(None, "...").ending());

        let result = analyze_story("story.json", &doc, &roster());
        assert_eq!(result.error_count(), 1);
        assert!(result.diagnostics[0].message.contains("main-0"));
    }

    #[test]
    fn test_unresolved_links() {
        let mut doc = StoryDocument::new();
        doc.insert(
            "main-0",
            StoryNode::line(None, "选吧").with_choices(vec![Choice::new("去河边", "river-0")]),
        );
        doc.insert("orphan-0", StoryNode::line(None, "孤岛").with_next("void-3"));
        doc.insert("tail-0", StoryNode::line(None, "没有下一句"));

        let result = analyze_story("story.json", &doc, &roster());

        assert_eq!(result.error_count(), 3);
        assert_eq!(result.warn_count(), 2);
        insta::assert_snapshot!(result.render(DiagnosticLevel::Warn), @r"
        [ERROR] story.json @ main-0: 选项目标 'river-0' 不存在
          | 第 0 个选项「去河边」
        [ERROR] story.json @ orphan-0: next 目标 'void-3' 不存在
        [ERROR] story.json @ tail-0: 后继节点 'tail-1' 不存在
          | 最后一句请标记 end，或用 next 指定后继
        [WARN] story.json @ orphan-0: 节点不可达
          | 从 'main-0' 出发无法到达该节点
        [WARN] story.json @ tail-0: 节点不可达
          | 从 'main-0' 出发无法到达该节点
        ");
    }

    #[test]
    fn test_key_without_index() {
        let mut doc = StoryDocument::new();
        doc.insert("main-0", StoryNode::line(None, "开始").with_next("epilogue"));
        doc.insert("epilogue", StoryNode::line(None, "尾声"));

        let result = analyze_story("story.json", &doc, &roster());
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].key, Some(NodeKey::from("epilogue")));
        assert_eq!(result.diagnostics[0].message, "无法推算后继节点");
    }

    #[test]
    fn test_end_node_ignores_dangling_next() {
        let mut doc = StoryDocument::new();
        doc.insert("main-0", StoryNode::line(None, "完").with_next("gone-0").ending());

        let result = analyze_story("story.json", &doc, &roster());
        assert!(!result.has_errors());
        assert_eq!(result.warn_count(), 1);
        assert!(result.diagnostics[0].message.contains("gone-0"));

        // 播放器同样在 end 处结束，不会跟随 next
        let state = crate::state::AppState::initial();
        let roster = roster();
        let player = crate::playback::ScenePlayer::new(&doc, &roster);
        assert_eq!(player.advance(&state).unwrap(), crate::playback::Step::Finished);
    }

    #[test]
    fn test_presentation_checks() {
        let mut doc = StoryDocument::new();
        doc.insert(
            "main-0",
            StoryNode {
                sprite: Some("angry".to_string()),
                ..StoryNode::line(Some("alice"), "哼")
            },
        );
        doc.insert(
            "main-1",
            StoryNode {
                sprite: Some("sprites/bob.png".to_string()),
                ..StoryNode::line(Some("路人"), "嗯？").ending()
            },
        );

        let result = analyze_story("story.json", &doc, &roster());
        assert!(!result.has_errors());
        assert_eq!(result.warn_count(), 1);
        assert_eq!(result.filter_by_level(DiagnosticLevel::Info).len(), 2);
    }

    #[test]
    fn test_end_with_choices_warns() {
        let mut doc = StoryDocument::new();
        doc.insert(
            "main-0",
            StoryNode::line(None, "最后的选择")
                .with_choices(vec![Choice::new("重来", "main-0")])
                .ending(),
        );

        let result = analyze_story("story.json", &doc, &roster());
        assert_eq!(result.warn_count(), 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_reachable_handles_cycles() {
        let mut doc = StoryDocument::new();
        doc.insert("main-0", StoryNode::line(None, "循环").with_next("main-1"));
        doc.insert("main-1", StoryNode::line(None, "回去").with_next("main-0"));

        let reachable = reachable_from(&doc, &NodeKey::start());
        assert_eq!(reachable.len(), 2);
    }

    #[test]
    fn test_diagnostic_result_filter() {
        let mut result = DiagnosticResult::new();
        result.push(Diagnostic::error("story.json", "错误1"));
        result.push(Diagnostic::warn("story.json", "警告1"));
        result.push(Diagnostic::info("story.json", "信息1"));

        assert_eq!(result.filter_by_level(DiagnosticLevel::Error).len(), 1);
        assert_eq!(result.filter_by_level(DiagnosticLevel::Warn).len(), 2);
        assert_eq!(result.filter_by_level(DiagnosticLevel::Info).len(), 3);
    }
}
