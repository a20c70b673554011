//! 设备生命周期状态
//!
//! `Uninitialized → PortalResolved → Ready → Running → Terminating → Stopped`
//!
//! 状态转换不会自动重试；`PortNotFound` 之后设备保持 `Uninitialized`，
//! 直到外部重新配置并再次初始化。

use std::sync::atomic::{AtomicU8, Ordering};

/// 设备生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DeviceState {
    /// 刚构建，端口未解析
    #[default]
    Uninitialized = 0,
    /// 端口已通过 Portal 注册表解析
    PortalResolved = 1,
    /// 伴随设备（IBox）已处理，可以启动线程
    Ready = 2,
    /// 设备线程与复制线程运行中
    Running = 3,
    /// 已设置终止标志，等待线程退出
    Terminating = 4,
    /// 线程已 join
    Stopped = 5,
}

impl DeviceState {
    /// 从 u8 转换
    ///
    /// 无效值返回 `Uninitialized`。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::PortalResolved,
            2 => Self::Ready,
            3 => Self::Running,
            4 => Self::Terminating,
            5 => Self::Stopped,
            _ => Self::Uninitialized,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 线程是否可能存活
    pub fn has_threads(self) -> bool {
        matches!(self, Self::Running | Self::Terminating)
    }
}

/// 设备状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicDeviceState {
    inner: AtomicU8,
}

impl AtomicDeviceState {
    pub fn new(state: DeviceState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> DeviceState {
        DeviceState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: DeviceState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换
    ///
    /// 当前值等于 `current` 时设置为 `new` 并返回 `Ok(())`，
    /// 否则返回实际状态。
    pub fn transition(&self, current: DeviceState, new: DeviceState) -> Result<(), DeviceState> {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(DeviceState::from_u8)
    }
}

impl Default for AtomicDeviceState {
    fn default() -> Self {
        Self::new(DeviceState::Uninitialized)
    }
}
