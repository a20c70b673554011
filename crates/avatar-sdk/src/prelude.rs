//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use avatar_sdk::prelude::*;
//! ```

// 生命周期与仿真接口
pub use avatar_driver::{
    CompanionInfo, DeviceState, HapticDevice, HapticDeviceBuilder, SimulationBridge,
};
// Portal 注册表
pub use avatar_driver::{PortId, PortalDescriptor, PortalManager, PortalRegistry};
// 配置与数据
pub use avatar_driver::{HapticSnapshot, LoopConfig, MetricsSnapshot, PacingStrategy, ToolPose};

// 链路层
pub use avatar_link::{DeviceLink, EmulatedLink};

// 数学类型
pub use nalgebra::{Rotation3, Vector3};

// 错误类型
pub use avatar_driver::HapticError;
pub use avatar_link::LinkError;
