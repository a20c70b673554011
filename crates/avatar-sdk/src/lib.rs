//! Haptic Avatar SDK - 力反馈设备实时控制
//!
//! 以 1kHz 轮询力反馈设备，根据仿真中的工具位姿计算接触力并下发，
//! 同时把设备状态无锁地交给较慢的仿真线程。
//!
//! # 架构设计
//!
//! - **链路层** (`link`): 设备链路抽象（[`DeviceLink`]）、样本类型、模拟设备
//! - **驱动层** (`driver`): 设备线程、复制线程、三缓冲交接、接触力模型、生命周期
//!
//! # 快速开始
//!
//! ```rust
//! use avatar_sdk::prelude::*;
//!
//! let mut portals = PortalManager::new();
//! portals
//!     .add_portal(PortalDescriptor {
//!         id: 1,
//!         rail: 0,
//!         rail_position_mm: 0.0,
//!         flip_angle_deg: 0.0,
//!         tilt_angle_deg: 0.0,
//!         com_port: "COM3".to_string(),
//!     })
//!     .unwrap();
//!
//! let mut device = HapticDeviceBuilder::new().port_name("COM3").build().unwrap();
//! device.init(&portals).unwrap();
//!
//! let (link, _probe) = EmulatedLink::new();
//! let mut bridge = device.start(link).unwrap();
//!
//! // 每个动画步
//! let pose = ToolPose::new(Vector3::new(0.0, 0.2, 0.0), Rotation3::identity());
//! let _snapshot = bridge.on_animate_step(&pose);
//!
//! device.stop();
//! ```

pub use avatar_driver as driver;
pub use avatar_link as link;

pub mod prelude;

// 链路层常用类型
pub use avatar_link::{AngleLengthSample, DeviceLink, EmulatedLink, LinkError, PwmSample};

// 驱动层
pub use avatar_driver::{
    HapticDevice, HapticDeviceBuilder, HapticError, HapticSnapshot, LoopConfig, PacingStrategy,
    SimulationBridge, ToolPose,
};

/// 默认日志过滤规则
pub const DEFAULT_LOG_FILTER: &str =
    "warn,avatar_link=info,avatar_driver=info,avatar_sdk=info,avatar_cli=info";

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，未设置时使用 [`DEFAULT_LOG_FILTER`]。
/// `log` crate 的记录会桥接到 tracing。重复调用不会报错，返回是否由本次调用完成安装。
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_LOG_FILTER)
}

/// 使用指定的默认过滤规则初始化日志（`RUST_LOG` 仍然优先）
pub fn init_tracing_with(default_filter: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok();

    // subscriber 的默认 feature 已经安装过 LogTracer 时这里会失败，忽略即可
    let _ = tracing_log::LogTracer::init();

    if installed {
        log::debug!("avatar-sdk logging initialised");
    }
    installed
}
