//! 力反馈设备生命周期
//!
//! [`HapticDevice`] 负责端口解析、伴随设备（IBox）识别、
//! 设备线程与复制线程的启动和关闭。

use crate::bridge::SimulationBridge;
use crate::error::HapticError;
use crate::lifecycle::{AtomicDeviceState, DeviceState};
use crate::metrics::HapticMetrics;
use crate::pipeline::{LoopConfig, copy_loop, device_loop};
use crate::portal::{PortId, PortalRegistry};
use crate::state::{HapticContext, SharedHapticState, ToolPose, pose_channel};
use avatar_link::DeviceLink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// 伴随设备（IBox）信息
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompanionInfo {
    pub port_name: String,
    pub haptic_identity: String,
}

impl CompanionInfo {
    pub fn new(port_name: impl Into<String>, haptic_identity: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            haptic_identity: haptic_identity.into(),
        }
    }
}

/// 一台物理设备及其端口
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceHandle {
    pub identity: String,
    pub port_name: String,
    /// 端口解析成功后才有值
    pub port_id: Option<PortId>,
    /// 伴随设备（解析成功后才有值）
    pub companion: Option<CompanionInfo>,
}

/// 力反馈设备
///
/// 通过 [`HapticDeviceBuilder`](crate::HapticDeviceBuilder) 构建，
/// 依次调用 [`init`](Self::init) 与 [`start`](Self::start)。
///
/// # Example
///
/// ```
/// use avatar_driver::{HapticDeviceBuilder, PortalDescriptor, PortalManager};
/// use avatar_link::EmulatedLink;
///
/// let mut portals = PortalManager::new();
/// portals
///     .add_portal(PortalDescriptor {
///         id: 1,
///         rail: 0,
///         rail_position_mm: 0.0,
///         flip_angle_deg: 0.0,
///         tilt_angle_deg: 0.0,
///         com_port: "COM3".to_string(),
///     })
///     .unwrap();
///
/// let mut device = HapticDeviceBuilder::new().port_name("COM3").build().unwrap();
/// device.init(&portals).unwrap();
///
/// let (link, _probe) = EmulatedLink::new();
/// let bridge = device.start(link).unwrap();
/// assert!(bridge.is_ready());
///
/// device.stop();
/// assert!(!bridge.is_ready());
/// ```
pub struct HapticDevice {
    handle: DeviceHandle,
    requested_companion: Option<CompanionInfo>,
    config: LoopConfig,
    initial_pose: ToolPose,
    state: AtomicDeviceState,
    ctx: Arc<HapticContext>,
    metrics: Arc<HapticMetrics>,
    terminate: Arc<AtomicBool>,
    device_thread: Option<JoinHandle<()>>,
    copy_thread: Option<JoinHandle<()>>,
    /// 端口解析失败已报告
    port_fault_reported: bool,
}

impl HapticDevice {
    pub(crate) fn new(
        identity: String,
        port_name: String,
        companion: Option<CompanionInfo>,
        config: LoopConfig,
        initial_pose: ToolPose,
    ) -> Self {
        Self {
            handle: DeviceHandle {
                identity,
                port_name,
                port_id: None,
                companion: None,
            },
            requested_companion: companion,
            config,
            initial_pose,
            state: AtomicDeviceState::new(DeviceState::Uninitialized),
            ctx: Arc::new(HapticContext::new()),
            metrics: Arc::new(HapticMetrics::new()),
            terminate: Arc::new(AtomicBool::new(false)),
            device_thread: None,
            copy_thread: None,
            port_fault_reported: false,
        }
    }

    /// 解析端口与伴随设备
    ///
    /// 端口未登记时返回 `PortNotFound`，设备保持 `Uninitialized`。
    /// 诊断只输出一次，重复调用直接返回同样的错误。
    pub fn init(&mut self, registry: &dyn PortalRegistry) -> Result<(), HapticError> {
        let current = self.state.get();
        if current != DeviceState::Uninitialized {
            return Err(HapticError::InvalidState {
                expected: DeviceState::Uninitialized,
                actual: current,
            });
        }

        let not_found = || HapticError::PortNotFound {
            port: self.handle.port_name.clone(),
        };
        if self.port_fault_reported {
            return Err(not_found());
        }

        let Some(port_id) = registry.resolve_port(&self.handle.port_name) else {
            let err = not_found();
            error!("Device {}: {}; device disabled", self.handle.identity, err);
            self.metrics.fatal_diagnostics.fetch_add(1, Ordering::Relaxed);
            self.port_fault_reported = true;
            return Err(err);
        };

        self.handle.port_id = Some(port_id);
        self.state.set(DeviceState::PortalResolved);
        info!(
            "Device {} resolved on port '{}' ({})",
            self.handle.identity, self.handle.port_name, port_id
        );

        if let Some(companion) = self.requested_companion.take() {
            if registry.resolve_port(&companion.port_name).is_some() {
                info!(
                    "Device {} connected with IBox: {}",
                    self.handle.identity, companion.haptic_identity
                );
                self.handle.companion = Some(companion);
            } else {
                warn!(
                    "Device {}: IBox port '{}' not registered, continuing without companion",
                    self.handle.identity, companion.port_name
                );
            }
        }

        self.state.set(DeviceState::Ready);
        Ok(())
    }

    /// 启动设备线程与复制线程
    ///
    /// `link` 被移动进设备线程，之后只有该线程访问设备。
    pub fn start<L>(&mut self, link: L) -> Result<SimulationBridge, HapticError>
    where
        L: DeviceLink + Send + 'static,
    {
        let current = self.state.get();
        if current != DeviceState::Ready {
            return Err(HapticError::InvalidState {
                expected: DeviceState::Ready,
                actual: current,
            });
        }

        let thread_id = self.handle.port_id.map(|id| id.0).unwrap_or_default();
        let (publisher, fetcher) = SharedHapticState::new().split();
        let (pose_writer, pose_reader) = pose_channel(self.initial_pose);
        self.terminate.store(false, Ordering::Release);

        let device_thread = {
            let terminate = self.terminate.clone();
            let config = self.config.clone();
            let ctx = self.ctx.clone();
            let metrics = self.metrics.clone();
            thread::Builder::new()
                .name(format!("avatar-device-{}", thread_id))
                .spawn(move || {
                    device_loop(terminate, link, publisher, pose_reader, config, ctx, metrics)
                })
        };
        let device_thread = match device_thread {
            Ok(handle) => handle,
            Err(source) => return Err(self.fail_start("device", source)),
        };

        let copy_thread = {
            let terminate = self.terminate.clone();
            let config = self.config.clone();
            let ctx = self.ctx.clone();
            let metrics = self.metrics.clone();
            thread::Builder::new()
                .name(format!("avatar-copy-{}", thread_id))
                .spawn(move || copy_loop(terminate, fetcher, config, ctx, metrics))
        };
        let copy_thread = match copy_thread {
            Ok(handle) => handle,
            Err(source) => {
                // 已启动的设备线程必须先停下（它会释放力）
                self.terminate.store(true, Ordering::Release);
                if device_thread.join().is_err() {
                    error!("Device {}: device thread panicked", self.handle.identity);
                }
                return Err(self.fail_start("copy", source));
            },
        };

        self.device_thread = Some(device_thread);
        self.copy_thread = Some(copy_thread);
        self.state.set(DeviceState::Running);
        self.ctx.device_ready.store(true, Ordering::Release);
        info!(
            "Device {} running ({}us period)",
            self.handle.identity, self.config.target_period_us
        );

        Ok(SimulationBridge::new(pose_writer, self.ctx.clone()))
    }

    fn fail_start(&mut self, thread: &'static str, source: std::io::Error) -> HapticError {
        let err = HapticError::ThreadStart { thread, source };
        error!("Device {}: {}", self.handle.identity, err);
        self.metrics.fatal_diagnostics.fetch_add(1, Ordering::Relaxed);
        self.ctx.device_ready.store(false, Ordering::Release);
        self.state.set(DeviceState::Stopped);
        err
    }

    /// 停止两个线程并等待退出
    ///
    /// 设备线程退出前会释放力，因此 `stop()` 返回后设备不再输出力。
    /// 非运行状态下调用是空操作。
    pub fn stop(&mut self) {
        if self
            .state
            .transition(DeviceState::Running, DeviceState::Terminating)
            .is_err()
        {
            return;
        }
        self.ctx.device_ready.store(false, Ordering::Release);

        // Release: 线程看到终止标志时也能看到之前的所有写入
        self.terminate.store(true, Ordering::Release);

        if let Some(handle) = self.device_thread.take()
            && handle.join().is_err()
        {
            error!("Device {}: device thread panicked", self.handle.identity);
        }
        if let Some(handle) = self.copy_thread.take()
            && handle.join().is_err()
        {
            error!("Device {}: copy thread panicked", self.handle.identity);
        }

        self.ctx.link_ready.store(false, Ordering::Release);
        self.state.set(DeviceState::Stopped);
        info!("Device {} stopped", self.handle.identity);
    }

    /// 线程运行中且未收到终止请求
    pub fn is_ready(&self) -> bool {
        self.ctx.is_device_ready()
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<HapticMetrics> {
        self.metrics.clone()
    }

    pub fn context(&self) -> Arc<HapticContext> {
        self.ctx.clone()
    }

    /// 检查线程健康状态
    ///
    /// 返回 `(device_alive, copy_alive)`；未启动时均为 `false`。
    pub fn check_health(&self) -> (bool, bool) {
        if !self.state().has_threads() {
            return (false, false);
        }
        let device_alive = self.device_thread.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        let copy_alive = self.copy_thread.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        (device_alive, copy_alive)
    }
}

impl Drop for HapticDevice {
    fn drop(&mut self) {
        self.stop();
    }
}
