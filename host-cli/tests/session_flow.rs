//! 终端宿主的端到端流程测试
//!
//! 使用仓库内置的体验版剧情（assets/story），文档目录与存档目录放在临时目录中。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use host_cli::{AppConfig, DocumentStore, Flow, Shell, ShellError};
use story_runtime::NodeKey;

fn bundled_assets() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../assets"))
}

fn config(dir: &Path) -> AppConfig {
    AppConfig {
        assets_root: bundled_assets(),
        data_dir: dir.join("data"),
        saves_dir: dir.join("saves"),
        ..AppConfig::default()
    }
}

/// 启动并走到标题界面
fn at_title(config: AppConfig) -> Shell {
    let now = Instant::now();
    let mut shell = Shell::boot(config, now).unwrap();
    assert!(shell.tick(now + Duration::from_secs(10)));
    shell.handle_line("");
    assert!(shell.state().ui.title_screen_shown());
    shell
}

fn send(shell: &mut Shell, lines: &[&str]) {
    for line in lines {
        assert_eq!(shell.handle_line(line), Flow::Continue, "line: {line}");
    }
}

fn index(shell: &Shell) -> &str {
    shell.state().narrative.index.as_str()
}

#[test]
fn loading_gate_leads_to_disclaimer_then_title() {
    let dir = tempfile::tempdir().unwrap();
    let start = Instant::now();
    let mut shell = Shell::boot(config(dir.path()), start).unwrap();

    assert!(shell.state().ui.is_loading());
    shell.handle_line("");
    assert!(shell.notices()[0].contains("不可用"));

    assert!(!shell.tick(start + Duration::from_millis(1000)));
    assert_eq!(
        shell.loading_remaining(start + Duration::from_millis(1000)),
        Some(Duration::from_millis(2500))
    );
    assert!(shell.tick(start + Duration::from_millis(3500)));
    assert!(shell.state().ui.disclaimer_shown());
    assert!(!shell.tick(start + Duration::from_secs(60)));

    shell.handle_line("");
    assert!(shell.state().ui.title_screen_shown());
    assert_eq!(shell.state().ui.visible_surface_count(), 1);
}

#[test]
fn quitting_during_loading_cancels_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let start = Instant::now();
    let mut shell = Shell::boot(config(dir.path()), start).unwrap();

    assert_eq!(shell.handle_line("quit"), Flow::Quit);
    assert!(!shell.tick(start + Duration::from_secs(60)));
    assert!(shell.state().ui.is_loading());
}

#[test]
fn play_through_street_branch() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["start"]);
    assert!(shell.state().ui.scene_is_rendering());
    assert_eq!(index(&shell), "main-0");
    assert_eq!(shell.state().config.bg_music, "daily");

    send(&mut shell, &["", ""]);
    assert_eq!(index(&shell), "main-2");
    assert!(shell.state().narrative.choices_exist);
    assert!(shell.view().contains("  2. 去商店街"));

    // 有选项时不能直接前进
    send(&mut shell, &[""]);
    assert_eq!(index(&shell), "main-2");
    assert_eq!(shell.notices(), ["请选择 1 - 2"]);

    send(&mut shell, &["2"]);
    assert_eq!(index(&shell), "street-0");
    assert_eq!(shell.state().config.bg_music, "street");
    assert_eq!(shell.state().narrative.choices_index_history, vec![1]);

    // street-2 通过 next 跳到 street-end
    send(&mut shell, &["", "", ""]);
    assert_eq!(index(&shell), "street-end");
    assert!(shell.view().contains("—— 完 ——"));

    send(&mut shell, &[""]);
    assert!(shell.state().ui.title_screen_shown());
    assert_eq!(shell.notices(), ["剧终，回到标题"]);
    assert_eq!(shell.state().narrative.index, NodeKey::start());
    assert_eq!(shell.state().config.bg_music, "menu");
}

#[test]
fn backlog_and_rewind() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["start", "", "", "1", "log"]);
    assert_eq!(index(&shell), "river-0");
    assert_eq!(shell.state().config.bg_music, "evening");

    let view = shell.view();
    assert!(view.contains("【花】早上好！今天也是一起走吗？"));
    assert!(view.contains("  → 去河边散步"));
    assert!(view.contains("傍晚的河边很安静"));
    assert!(view.contains("句，log 关闭"));

    send(&mut shell, &["log", "back"]);
    assert_eq!(index(&shell), "main-2");
    assert!(shell.state().narrative.choices_history.is_empty());
    assert!(shell.state().narrative.choices_exist);
    assert!(shell.state().narrative.is_consistent());
    // 回到选项节点时 BGM 也回到之前的曲目
    assert_eq!(shell.state().config.bg_music, "daily");

    send(&mut shell, &["back", "back", "back"]);
    assert_eq!(index(&shell), "main-0");
    assert_eq!(shell.notices(), ["已经是第一句了"]);
}

#[test]
fn save_then_load_from_title() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["start", "", "save 2"]);
    assert_eq!(shell.notices(), ["已保存到第 2 格"]);
    assert!(dir.path().join("saves/slot_002.json").exists());

    send(&mut shell, &["save new"]);
    assert_eq!(shell.notices(), ["已保存到第 1 格"]);
    assert!(dir.path().join("saves/slot_001.json").exists());

    send(&mut shell, &["load"]);
    assert!(shell.view().contains("早上好！今天也是一起走吗？"));

    send(&mut shell, &["load", "title"]);
    assert!(shell.state().ui.title_screen_shown());
    assert_eq!(index(&shell), "main-0");

    send(&mut shell, &["load 2"]);
    assert!(shell.state().ui.scene_is_rendering());
    assert_eq!(index(&shell), "main-1");
    assert_eq!(shell.state().narrative.index_history.len(), 1);
    assert_eq!(shell.state().config.bg_music, "daily");

    send(&mut shell, &["load 7"]);
    assert!(shell.notices()[0].contains("存档不存在"));
    assert_eq!(index(&shell), "main-1");
}

#[test]
fn editor_flush_feeds_full_mode_playback() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["editor", "set main-0 text 改过的开头"]);
    assert!(shell.state().ui.editor_is_rendering());
    assert!(shell.editor().unwrap().is_dirty());

    send(&mut shell, &["flush"]);
    assert_eq!(shell.notices(), ["已保存"]);
    assert!(!shell.editor().unwrap().is_dirty());

    let saved = DocumentStore::new(dir.path().join("data")).load().unwrap();
    assert_eq!(
        saved.story.get(&NodeKey::start()).unwrap().text,
        "改过的开头"
    );
    assert_eq!(&saved, shell.library().stored());

    send(&mut shell, &["close"]);
    assert!(shell.state().ui.title_screen_shown());

    // 体验版不受编辑影响
    send(&mut shell, &["start"]);
    assert!(shell.view().contains("四月的早晨"));

    send(&mut shell, &["title", "mode full", "start"]);
    assert!(!shell.state().ui.is_demo);
    assert!(shell.view().contains("改过的开头"));
}

#[test]
fn editor_refuses_to_delete_referenced_node() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["editor", "del river-0"]);
    assert!(shell.notices()[0].starts_with("编辑失败"));
    assert!(
        shell
            .editor()
            .unwrap()
            .story()
            .contains(&NodeKey::from("river-0"))
    );

    send(&mut shell, &["show main-2"]);
    assert!(shell.view().contains("1. 去河边散步 -> river-0"));
}

#[test]
fn unresolved_successor_halts_playback() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["editor", "set river-2 end off", "flush"]);
    assert!(shell.notices()[0].contains("1 个错误"));

    send(&mut shell, &["close", "mode full", "start", "", "", "1", "", ""]);
    assert_eq!(index(&shell), "river-2");

    send(&mut shell, &[""]);
    assert_eq!(index(&shell), "river-2");
    assert!(shell.notices()[0].starts_with("播放中止"));
    assert!(shell.notices()[0].contains("river-3"));
    assert!(shell.state().ui.scene_is_rendering());
}

#[test]
fn skip_stops_at_choices() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["start", "skip"]);
    assert_eq!(index(&shell), "main-2");
    assert!(shell.state().ui.is_skipping);

    // 选择后继续快进直到结尾
    send(&mut shell, &["1"]);
    assert!(shell.state().ui.title_screen_shown());
    assert!(!shell.state().ui.is_skipping);
}

#[test]
fn debug_dispatch_rejects_unknown_action() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.debug.enabled = true;

    let now = Instant::now();
    let mut shell = Shell::boot(config, now).unwrap();
    assert!(shell.tick(now));
    assert!(shell.state().ui.disclaimer_shown());

    let before = shell.state().clone();
    send(
        &mut shell,
        &[r#"action {"type":"teleport","payload":"main-9"}"#],
    );
    assert!(shell.notices()[0].contains("teleport"));
    assert_eq!(shell.state(), &before);

    send(&mut shell, &[r#"action {"type":"showIntro"}"#]);
    assert!(shell.state().ui.intro_shown());

    send(&mut shell, &[""]);
    assert!(shell.state().ui.scene_is_rendering());
    assert!(shell.view().contains("node: main-0"));
}

#[test]
fn settings_menu_changes_config_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = at_title(config(dir.path()));

    send(&mut shell, &["menu"]);
    assert!(!shell.state().ui.config_menu_shown);

    send(&mut shell, &["start", "menu", "vol 30", "bgm", "fs"]);
    let state = shell.state();
    assert!(state.ui.config_menu_shown);
    assert_eq!(state.config.bgm_volume, 30);
    assert!(!state.config.bgm_playing);
    assert!(state.config.is_fullscreen);
    assert!(shell.view().contains("♪ 静音"));

    // 回到标题只保留 BGM 开关
    send(&mut shell, &["title"]);
    assert!(!shell.state().config.bgm_playing);
    assert_eq!(shell.state().config.bgm_volume, 50);
    assert!(!shell.state().ui.config_menu_shown);
}

#[test]
fn boot_rejects_broken_bundled_story() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    fs::create_dir_all(assets.join("story")).unwrap();
    fs::write(
        assets.join("story/story.json"),
        r#"{ "main-0": { "text": "开头", "next": "main-9" } }"#,
    )
    .unwrap();
    fs::write(assets.join("story/characters.json"), "{}").unwrap();

    let config = AppConfig {
        assets_root: assets,
        ..config(dir.path())
    };
    let err = Shell::boot(config, Instant::now()).err().unwrap();
    assert!(matches!(err, ShellError::Diagnostics { errors: 1, .. }));
    assert!(err.to_string().contains("main-9"));
}

#[test]
fn boot_rejects_malformed_bundled_story() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    fs::create_dir_all(assets.join("story")).unwrap();
    fs::write(assets.join("story/story.json"), "{ \"main-0\": ").unwrap();
    fs::write(assets.join("story/characters.json"), "{}").unwrap();

    let config = AppConfig {
        assets_root: assets,
        ..config(dir.path())
    };
    let err = Shell::boot(config, Instant::now()).err().unwrap();
    assert!(matches!(err, ShellError::Store(_)));
}
