//! 配置管理命令
//!
//! 打印默认配置或校验配置文件

use crate::settings::EmulatorConfig;
use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印默认配置（TOML）
    Default,

    /// 校验配置文件
    Check {
        /// 配置文件路径
        path: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Default => {
                print!("{}", EmulatorConfig::default().to_toml()?);
                Ok(())
            },
            ConfigCommand::Check { path } => {
                let config = EmulatorConfig::load(&path)?;
                println!("✅ {} is valid", path.display());
                println!(
                    "    device {} on {} (portal {})",
                    config.device.identity, config.device.port, config.device.portal_id
                );
                println!(
                    "    loop {}us, damping {}, floor {}, pacing {:?}",
                    config.loop_config.target_period_us,
                    config.loop_config.damping,
                    config.loop_config.floor_height,
                    config.loop_config.pacing
                );
                Ok(())
            },
        }
    }
}
