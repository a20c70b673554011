//! 驱动层模块
//!
//! 本模块提供力反馈设备的实时驱动功能，包括：
//! - 设备线程（固定周期轮询 + 接触力计算）与复制线程
//! - 单写单读三缓冲交接（设备线程永不等待）
//! - 仿真可见快照（ArcSwap 无锁读取）
//! - Portal 注册表与设备生命周期
//!
//! # 使用场景
//!
//! 仿真宿主通过 [`HapticDeviceBuilder`] 构建设备，启动后只与
//! [`SimulationBridge`] 交互。大多数用户应该使用 `avatar-sdk` 的 prelude。

mod bridge;
mod builder;
pub mod contact;
mod device;
mod error;
pub mod handoff;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod portal;
pub mod state;

pub use bridge::SimulationBridge;
pub use builder::HapticDeviceBuilder;
pub use contact::{ContactForce, ContactState, ContactTransition, compute_force};
pub use device::{CompanionInfo, DeviceHandle, HapticDevice};
pub use error::HapticError;
pub use lifecycle::{AtomicDeviceState, DeviceState};
pub use metrics::{HapticMetrics, MetricsSnapshot};
pub use pipeline::{ContactInputsProvider, LoopConfig, PacingStrategy, copy_loop, device_loop};
pub use portal::{PortId, PortalDescriptor, PortalManager, PortalRegistry};
pub use state::*;
