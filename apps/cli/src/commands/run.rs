//! run 命令
//!
//! 在模拟设备上运行完整的力反馈循环：工具尖端按脚本轨迹运动，
//! 仿真步由本线程驱动，设备线程与复制线程由 SDK 管理。

use crate::settings::EmulatorConfig;
use crate::trajectory::SineTrajectory;
use anyhow::{Context, Result};
use avatar_sdk::prelude::*;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 指标日志间隔
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 配置文件路径（默认使用内置配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 运行时长（秒），不指定则运行到 Ctrl+C
    #[arg(short, long)]
    pub duration_secs: Option<f64>,

    /// 每 100 个周期输出一次循环耗时（需要 RUST_LOG=avatar_driver=debug）
    #[arg(long)]
    pub debug_timing: bool,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        let mut config = match &self.config {
            Some(path) => EmulatorConfig::load(path)?,
            None => EmulatorConfig::default(),
        };
        if self.debug_timing {
            config.loop_config.debug_timing = true;
        }
        let duration = self
            .duration_secs
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("Invalid --duration-secs")?;

        // 1. Portal 注册表
        let mut portals = PortalManager::new();
        let portal = config.device.portal_descriptor();
        portals.add_portal(portal.clone())?;
        if let Some(companion) = config.device.companion_portal() {
            portals.add_portal(companion)?;
        }

        // 2. 设备
        let mut builder = HapticDeviceBuilder::new()
            .identity(config.device.identity.clone())
            .portal(&portal)
            .loop_config(config.loop_config.clone());
        if let Some(companion) = config.device.companion_info() {
            builder = builder.companion(companion);
        }
        let mut device = builder.build()?;
        device.init(&portals)?;

        let (link, probe) = EmulatedLink::new();
        let mut bridge = device.start(link)?;

        // 3. Ctrl+C
        let running = Arc::new(AtomicBool::new(true));
        {
            let running = running.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nReceived interrupt signal. Shutting down...");
                running.store(false, Ordering::Release);
            })
            .context("Failed to install Ctrl+C handler")?;
        }

        let trajectory = SineTrajectory::new(&config.trajectory, portal.base_rotation());
        if !trajectory.crosses(config.loop_config.floor_height) {
            warn!("Trajectory never reaches the floor; no force will be commanded");
        }

        println!(
            "▶ {} on {} ({}us loop, damping {}, floor {})",
            device.handle().identity,
            device.handle().port_name,
            config.loop_config.target_period_us,
            config.loop_config.damping,
            config.loop_config.floor_height
        );

        // 4. 仿真步
        let step = config.trajectory.step_period()?;
        let metrics = device.metrics();
        let started = Instant::now();
        let mut last_report = started;
        let mut last_sequence = 0;

        while running.load(Ordering::Acquire) {
            let now = Instant::now();
            let elapsed = now - started;
            if duration.is_some_and(|d| elapsed >= d) {
                break;
            }

            let pose = trajectory.pose_at(elapsed.as_secs_f64());
            if let Some(snapshot) = bridge.on_animate_step(&pose) {
                last_sequence = snapshot.sequence;
            }

            if now - last_report >= REPORT_INTERVAL {
                last_report = now;
                let snap = metrics.snapshot();
                info!(
                    "cycles={} seq={} contact={} entries={} exits={} read_fail={} ({:.1}%) write_fail={} last={}us max={}us force={:?}",
                    snap.cycles,
                    last_sequence,
                    bridge.is_in_contact(),
                    snap.contact_entries,
                    snap.contact_exits,
                    snap.read_failures,
                    snap.read_failure_rate() * 100.0,
                    snap.write_failures,
                    snap.last_cycle_us,
                    snap.max_cycle_us,
                    probe.last_force()
                );

                let (device_alive, copy_alive) = device.check_health();
                if !(device_alive && copy_alive) {
                    warn!(
                        "Worker thread exited unexpectedly (device: {}, copy: {})",
                        device_alive, copy_alive
                    );
                    break;
                }
            }

            thread::sleep(step);
        }

        device.stop();

        let snap = metrics.snapshot();
        println!("■ stopped after {:.1}s", started.elapsed().as_secs_f64());
        println!(
            "    {} cycles, {} contacts, {} force commands, {} releases, max cycle {}us",
            snap.cycles,
            snap.contact_entries,
            snap.force_commands,
            snap.force_releases,
            snap.max_cycle_us
        );
        println!("    residual force {:?}", probe.last_force());
        Ok(())
    }
}
