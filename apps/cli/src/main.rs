//! # Avatar CLI
//!
//! 在模拟设备上运行 Haptic Avatar 力反馈循环。
//!
//! ```bash
//! # 打印默认配置
//! avatar-cli config default > avatar.toml
//!
//! # 运行 10 秒
//! avatar-cli run --config avatar.toml --duration-secs 10
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod settings;
mod trajectory;

use commands::{ConfigCommand, RunCommand};

/// Avatar CLI - 力反馈模拟器
#[derive(Parser, Debug)]
#[command(name = "avatar-cli")]
#[command(about = "Emulator runner for the Haptic Avatar force-feedback loop", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 运行模拟设备
    Run {
        #[command(flatten)]
        args: RunCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    avatar_sdk::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Run { args } => args.execute(),
    }
}
