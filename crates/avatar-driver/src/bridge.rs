//! 仿真侧接口
//!
//! 仿真线程每个动画步调用一次 [`SimulationBridge::on_animate_step`]：
//! 把当前工具位姿交给设备线程，并取回复制线程推送的最新快照。

use crate::state::{HapticContext, HapticSnapshot, PoseWriter, ToolPose};
use std::sync::Arc;

/// 仿真线程持有的设备接口
///
/// 设备未就绪（未启动、已停止、初始化失败）时所有操作都是空操作。
pub struct SimulationBridge {
    pose_writer: PoseWriter,
    ctx: Arc<HapticContext>,
}

impl SimulationBridge {
    pub(crate) fn new(pose_writer: PoseWriter, ctx: Arc<HapticContext>) -> Self {
        Self { pose_writer, ctx }
    }

    pub fn is_ready(&self) -> bool {
        self.ctx.is_device_ready()
    }

    /// 发布工具位姿，设备未就绪时返回 `false`
    pub fn update_tool_pose(&mut self, pose: &ToolPose) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.pose_writer.publish(pose);
        true
    }

    /// 仿真可见的最新快照
    pub fn latest_snapshot(&self) -> Option<Arc<HapticSnapshot>> {
        if !self.is_ready() {
            return None;
        }
        Some(self.ctx.latest.load_full())
    }

    /// 一个动画步：先发布位姿，再读取快照
    pub fn on_animate_step(&mut self, pose: &ToolPose) -> Option<Arc<HapticSnapshot>> {
        if !self.update_tool_pose(pose) {
            return None;
        }
        self.latest_snapshot()
    }

    /// 设备线程最近一次接触评估的结果
    pub fn is_in_contact(&self) -> bool {
        self.ctx.is_in_contact()
    }

    /// 设备链路最近一次读取是否成功
    pub fn is_link_ready(&self) -> bool {
        self.ctx.is_link_ready()
    }
}
