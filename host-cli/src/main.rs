//! Visual Novel Maker - 终端宿主
//!
//! 从标准输入读取命令，把当前界面输出到标准输出，日志写到标准错误。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use host_cli::{AppConfig, Flow, Shell};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "vn-maker")]
#[command(about = "视觉小说播放器与场景编辑器")]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 编辑器文档目录（覆盖配置文件）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 存档目录（覆盖配置文件）
    #[arg(long)]
    saves_dir: Option<PathBuf>,

    /// 调试模式：跳过加载等待，输出 debug 日志
    #[arg(short, long)]
    debug: bool,

    /// 播放编辑器保存的完整剧情而不是内置体验版
    #[arg(long)]
    full: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(saves_dir) = &self.saves_dir {
            config.saves_dir = saves_dir.clone();
        }
        if self.debug {
            config.debug.enabled = true;
        }
        if self.full {
            config.demo = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 日志级别要等配置加载完才能确定，配置文件本身的加载日志会丢失
    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("无法加载配置 {}", cli.config.display()))?;
    cli.apply(&mut config);

    let level = if config.debug.enabled {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let mut shell = Shell::boot(config, Instant::now()).context("启动失败")?;
    run(&mut shell)
}

fn run(shell: &mut Shell) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        // 加载界面不接受输入，等到闸门触发
        if let Some(remaining) = shell.loading_remaining(Instant::now()) {
            writeln!(stdout, "{}\n", shell.view())?;
            std::thread::sleep(remaining);
        }
        shell.tick(Instant::now());

        write!(stdout, "{}\n> ", shell.view())?;
        stdout.flush()?;

        let Some(line) = lines.next() else {
            shell.shutdown();
            break;
        };
        if shell.handle_line(&line?) == Flow::Quit {
            break;
        }
        writeln!(stdout)?;
    }

    info!("再见");
    Ok(())
}
