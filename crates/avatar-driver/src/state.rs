//! 共享状态结构定义
//!
//! - [`SharedHapticState`]：设备线程 → 复制线程（三缓冲交接，无锁等待）
//! - 工具位姿通道：仿真线程 → 设备线程（同样的三缓冲交接）
//! - [`HapticContext`]：复制线程 → 仿真线程（ArcSwap，每个动画步读取一次）

use crate::handoff::{HandoffReader, HandoffWriter, handoff};
use arc_swap::ArcSwap;
use avatar_link::{AngleLengthSample, PwmSample};
use nalgebra::{Rotation3, Vector3};
use std::sync::atomic::{AtomicBool, Ordering};

/// 设备传感器快照
///
/// 每个设备循环周期整体覆盖，不保留历史。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HapticSnapshot {
    /// 产生该快照的设备循环周期号（从 1 开始，0 表示尚未发布）
    pub sequence: u64,
    /// 关节角度与器械长度
    pub angles_and_length: AngleLengthSample,
    /// 电机 PWM
    pub motor_values: PwmSample,
    /// 读取是否成功
    ///
    /// 读取失败的周期会发布一个零样本快照，`valid == false`。
    pub valid: bool,
}

impl HapticSnapshot {
    /// 原地覆盖（样本在内联容量内时不分配）
    pub fn copy_from(&mut self, other: &Self) {
        self.sequence = other.sequence;
        self.angles_and_length.copy_from(&other.angles_and_length);
        self.motor_values.copy_from(&other.motor_values);
        self.valid = other.valid;
    }

    /// 置为零样本（读取失败时使用）
    pub fn clear_samples(&mut self) {
        self.angles_and_length.angles.clear();
        self.angles_and_length.length = 0.0;
        self.motor_values.values.clear();
        self.valid = false;
    }
}

/// 设备线程与复制线程之间的共享快照
///
/// 只能通过 [`split`](Self::split) 得到一个发布端和一个读取端。
pub struct SharedHapticState {
    publisher: HapticPublisher,
    fetcher: HapticFetcher,
}

impl SharedHapticState {
    pub fn new() -> Self {
        let (writer, reader) = handoff(HapticSnapshot::default());
        Self {
            publisher: HapticPublisher { writer },
            fetcher: HapticFetcher { reader },
        }
    }

    pub fn split(self) -> (HapticPublisher, HapticFetcher) {
        (self.publisher, self.fetcher)
    }
}

impl Default for SharedHapticState {
    fn default() -> Self {
        Self::new()
    }
}

/// 快照发布端（仅设备线程持有）
pub struct HapticPublisher {
    writer: HandoffWriter<HapticSnapshot>,
}

impl HapticPublisher {
    /// 发布快照
    ///
    /// 只交换槽位索引，不会等待读取端。
    pub fn publish(&mut self, snapshot: &HapticSnapshot) {
        self.writer.publish_with(|slot| slot.copy_from(snapshot));
    }
}

/// 快照读取端（仅复制线程持有）
pub struct HapticFetcher {
    reader: HandoffReader<HapticSnapshot>,
}

impl HapticFetcher {
    /// 获取最新快照的副本
    pub fn fetch(&mut self) -> HapticSnapshot {
        self.reader.latest()
    }

    /// 把最新快照复制到 `dst`，返回是否有新发布
    pub fn fetch_into(&mut self, dst: &mut HapticSnapshot) -> bool {
        self.reader.update_with(|slot| dst.copy_from(slot))
    }
}

/// 工具位姿（仿真坐标系）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolPose {
    /// 工具尖端位置
    pub position: Vector3<f64>,
    /// 仿真坐标系到设备坐标系的旋转
    pub rotation: Rotation3<f64>,
}

impl ToolPose {
    pub fn new(position: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        Self { position, rotation }
    }
}

impl Default for ToolPose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Rotation3::identity(),
        }
    }
}

/// 位姿写端（仿真线程）
pub type PoseWriter = HandoffWriter<ToolPose>;
/// 位姿读端（设备线程）
pub type PoseReader = HandoffReader<ToolPose>;

/// 创建位姿通道
pub fn pose_channel(initial: ToolPose) -> (PoseWriter, PoseReader) {
    handoff(initial)
}

/// 设备共享上下文
///
/// 复制线程写入 `latest`，仿真线程每个动画步读取一次。
#[derive(Debug)]
pub struct HapticContext {
    /// 仿真可见的最新快照
    pub latest: ArcSwap<HapticSnapshot>,
    /// 生命周期就绪标志（Running 时为 true）
    pub device_ready: AtomicBool,
    /// 链路就绪标志（最近一次读取成功）
    pub link_ready: AtomicBool,
    /// 最近一次接触评估结果
    pub in_contact: AtomicBool,
}

impl HapticContext {
    pub fn new() -> Self {
        Self {
            latest: ArcSwap::from_pointee(HapticSnapshot::default()),
            device_ready: AtomicBool::new(false),
            link_ready: AtomicBool::new(false),
            in_contact: AtomicBool::new(false),
        }
    }

    pub fn is_device_ready(&self) -> bool {
        self.device_ready.load(Ordering::Acquire)
    }

    pub fn is_link_ready(&self) -> bool {
        self.link_ready.load(Ordering::Acquire)
    }

    pub fn is_in_contact(&self) -> bool {
        self.in_contact.load(Ordering::Acquire)
    }
}

impl Default for HapticContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(seq: u64) -> HapticSnapshot {
        HapticSnapshot {
            sequence: seq,
            angles_and_length: AngleLengthSample::new(&[seq as f32; 4], seq as f32),
            motor_values: PwmSample::new(&[seq as i32; 4]),
            valid: true,
        }
    }

    #[test]
    fn test_fetch_before_publish_is_default() {
        let (_publisher, mut fetcher) = SharedHapticState::new().split();
        let snap = fetcher.fetch();
        assert_eq!(snap.sequence, 0);
        assert!(!snap.valid);
    }

    #[test]
    fn test_fetch_into_reports_freshness() {
        let (mut publisher, mut fetcher) = SharedHapticState::new().split();
        let mut out = HapticSnapshot::default();

        publisher.publish(&snapshot(1));
        assert!(fetcher.fetch_into(&mut out));
        assert_eq!(out, snapshot(1));

        assert!(!fetcher.fetch_into(&mut out));
        assert_eq!(out.sequence, 1);

        publisher.publish(&snapshot(2));
        publisher.publish(&snapshot(3));
        assert!(fetcher.fetch_into(&mut out));
        assert_eq!(out, snapshot(3));
    }

    #[test]
    fn test_clear_samples() {
        let mut snap = snapshot(5);
        snap.clear_samples();
        assert_eq!(snap.sequence, 5);
        assert!(snap.angles_and_length.angles.is_empty());
        assert!(snap.motor_values.values.is_empty());
        assert!(!snap.valid);
    }

    #[test]
    fn test_pose_channel_default_rotation() {
        let (mut writer, mut reader) = pose_channel(ToolPose::default());
        assert_eq!(reader.latest().rotation, Rotation3::identity());

        let pose = ToolPose::new(Vector3::new(1.0, 2.0, 3.0), Rotation3::identity());
        writer.publish(&pose);
        assert_eq!(reader.latest(), pose);
    }

    #[test]
    fn test_context_flags_default_false() {
        let ctx = HapticContext::new();
        assert!(!ctx.is_device_ready());
        assert!(!ctx.is_link_ready());
        assert!(!ctx.is_in_contact());
        assert_eq!(ctx.latest.load().sequence, 0);
    }
}
