//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 story-runtime 覆盖率
//! - `story-check`: 检查剧情图（后继、选项目标、可达性、角色引用）

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use story_runtime::{
    CharacterRoster, DiagnosticLevel, DiagnosticResult, StoryDocument, analyze_story,
};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let sh = Shell::new()?;

            eprintln!("\n==> cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;

            eprintln!("\n==> cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

            eprintln!("\n==> cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;
        }
        "cov-runtime" => {
            let sh = Shell::new()?;
            if cmd!(sh, "cargo llvm-cov --version").quiet().run().is_err() {
                anyhow::bail!(
                    "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
                );
            }

            eprintln!("\n==> cargo llvm-cov -p story-runtime --html");
            cmd!(sh, "cargo llvm-cov -p story-runtime --html").run()?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "story-check" => {
            let path = args.next();
            story_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-runtime     运行 story-runtime 覆盖率报告
  story-check     检查剧情图

STORY-CHECK:
  cargo xtask story-check [path]

  不带参数：检查 assets/ 下所有 story.json
  带路径参数：检查指定文件或目录

  每个 story.json 与同目录的 characters.json（可缺省）一起检查：
    - 入口节点 main-0 是否存在
    - next / 选项目标 / 推算后继是否存在
    - 从入口不可达的节点
    - 说话者与立绘是否在角色表中
"#
    );
}

//=============================================================================
// story-check 命令实现
//=============================================================================

const STORY_FILE: &str = "story.json";
const CHARACTERS_FILE: &str = "characters.json";

/// 默认检查目录（相对于 workspace root）
const DEFAULT_ROOT: &str = "assets";

/// 检查结果汇总
#[derive(Default)]
struct StoryCheckResult {
    /// 检查的剧情图数量
    stories_checked: usize,
    /// 读取或解析失败的数量
    load_errors: usize,
    /// 诊断结果
    diagnostics: DiagnosticResult,
}

fn story_check(path: Option<&str>) -> anyhow::Result<()> {
    let root = PathBuf::from(path.unwrap_or(DEFAULT_ROOT));

    let files = if root.is_file() {
        vec![root]
    } else if root.is_dir() {
        collect_story_files(&root)
    } else if path.is_none() {
        anyhow::bail!(
            "默认目录不存在: {}\n请在 workspace 根目录运行，或指定剧情图路径",
            root.display()
        );
    } else {
        anyhow::bail!("路径不存在: {}", root.display());
    };

    if files.is_empty() {
        eprintln!("未找到剧情图（{}）", STORY_FILE);
        return Ok(());
    }

    eprintln!("==> 检查 {} 个剧情图...\n", files.len());

    let mut result = StoryCheckResult::default();
    for file in &files {
        check_story_file(file, &mut result);
    }

    print_check_result(&result);

    if result.load_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("剧情检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有剧情图
fn collect_story_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == STORY_FILE)
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// 检查单个剧情图
fn check_story_file(file: &Path, result: &mut StoryCheckResult) {
    let name = file.display().to_string();
    result.stories_checked += 1;

    let story = match std::fs::read_to_string(file)
        .map_err(|e| e.to_string())
        .and_then(|json| StoryDocument::from_json(&name, &json).map_err(|e| e.to_string()))
    {
        Ok(story) => story,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", name, e);
            result.load_errors += 1;
            return;
        }
    };

    let roster = match load_roster(file) {
        Ok(roster) => roster,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            result.load_errors += 1;
            return;
        }
    };

    result.diagnostics.merge(analyze_story(&name, &story, &roster));
}

/// 读取同目录的角色表，不存在时视为空
fn load_roster(story_file: &Path) -> Result<CharacterRoster, String> {
    let path = story_file.with_file_name(CHARACTERS_FILE);
    if !path.exists() {
        return Ok(CharacterRoster::new());
    }

    let name = path.display().to_string();
    let json = std::fs::read_to_string(&path).map_err(|e| format!("{}: {}", name, e))?;
    CharacterRoster::from_json(&name, &json).map_err(|e| e.to_string())
}

/// 输出检查结果
fn print_check_result(result: &StoryCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个剧情图", result.stories_checked);
    eprintln!();

    let report = result.diagnostics.render(DiagnosticLevel::Info);
    if !report.is_empty() {
        eprintln!("{}", report);
    }

    let error_count = result.load_errors + result.diagnostics.error_count();
    let warn_count = result.diagnostics.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
