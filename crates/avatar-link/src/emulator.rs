//! 模拟设备链路
//!
//! 无硬件时使用的 `DeviceLink` 实现：关节角度按正弦缓慢摆动，
//! PWM 与最近一次下发的力成正比。通过 [`EmulatorProbe`] 可以在其他线程
//! 观察下发的力，或模拟设备断开。

use crate::{AngleLengthSample, DeviceLink, LinkError, PwmSample};
use nalgebra::Vector3;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// 模拟关节数量（yaw, pitch, rotation, jaws）
pub const EMULATED_JOINTS: usize = 4;

/// 模拟电机数量
pub const EMULATED_MOTORS: usize = 4;

/// 每牛顿力对应的 PWM 值
const PWM_PER_NEWTON: f64 = 100.0;

/// 器械默认伸出长度（mm）
const BASE_INSTRUMENT_LENGTH: f32 = 200.0;

/// 关节摆动频率（Hz）
const SWAY_HZ: f32 = 0.5;

/// 关节摆动幅度（弧度）
const SWAY_AMPLITUDE: f32 = 0.05;

#[derive(Debug)]
struct ProbeInner {
    last_force: Mutex<Vector3<f64>>,
    force_commands: AtomicU64,
    releases: AtomicU64,
    disconnected: AtomicBool,
}

impl Default for ProbeInner {
    fn default() -> Self {
        Self {
            last_force: Mutex::new(Vector3::zeros()),
            force_commands: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            disconnected: AtomicBool::new(false),
        }
    }
}

/// 模拟设备观察句柄（可跨线程克隆）
#[derive(Debug, Clone, Default)]
pub struct EmulatorProbe {
    inner: Arc<ProbeInner>,
}

impl EmulatorProbe {
    /// 最近一次下发的力（释放后为零）
    pub fn last_force(&self) -> Vector3<f64> {
        *self.inner.last_force.lock()
    }

    /// `set_force_vector` 成功次数
    pub fn force_commands(&self) -> u64 {
        self.inner.force_commands.load(Ordering::Relaxed)
    }

    /// `release_force` 成功次数
    pub fn releases(&self) -> u64 {
        self.inner.releases.load(Ordering::Relaxed)
    }

    /// 模拟拔线/重新连接
    pub fn set_disconnected(&self, disconnected: bool) {
        self.inner.disconnected.store(disconnected, Ordering::Release);
    }

    fn is_disconnected(&self) -> bool {
        self.inner.disconnected.load(Ordering::Acquire)
    }
}

/// 模拟设备链路
#[derive(Debug)]
pub struct EmulatedLink {
    probe: EmulatorProbe,
    started_at: Instant,
}

impl EmulatedLink {
    /// 创建模拟链路及其观察句柄
    pub fn new() -> (Self, EmulatorProbe) {
        let probe = EmulatorProbe::default();
        info!("Haptic Avatar emulator link created");
        (
            Self {
                probe: probe.clone(),
                started_at: Instant::now(),
            },
            probe,
        )
    }

    fn check_connected(&self) -> Result<(), LinkError> {
        if self.probe.is_disconnected() {
            Err(LinkError::Disconnected)
        } else {
            Ok(())
        }
    }
}

impl DeviceLink for EmulatedLink {
    fn read_angles_and_length(&mut self) -> Result<AngleLengthSample, LinkError> {
        self.check_connected()?;

        let t = self.started_at.elapsed().as_secs_f32();
        let omega = std::f32::consts::TAU * SWAY_HZ;
        let mut angles = [0.0f32; EMULATED_JOINTS];
        for (i, angle) in angles.iter_mut().enumerate() {
            // 各关节相位错开 90°
            *angle = SWAY_AMPLITUDE * (omega * t + i as f32 * std::f32::consts::FRAC_PI_2).sin();
        }

        Ok(AngleLengthSample::new(&angles, BASE_INSTRUMENT_LENGTH))
    }

    fn read_motor_pwm(&mut self) -> Result<PwmSample, LinkError> {
        self.check_connected()?;

        let force = self.probe.last_force();
        let mut values = [0i32; EMULATED_MOTORS];
        values[0] = (force.x * PWM_PER_NEWTON) as i32;
        values[1] = (force.y * PWM_PER_NEWTON) as i32;
        values[2] = (force.z * PWM_PER_NEWTON) as i32;
        values[3] = (force.norm() * PWM_PER_NEWTON) as i32;

        Ok(PwmSample::new(&values))
    }

    fn set_force_vector(&mut self, force: &Vector3<f64>) -> Result<(), LinkError> {
        self.check_connected()?;
        *self.probe.inner.last_force.lock() = *force;
        self.probe.inner.force_commands.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn release_force(&mut self) -> Result<(), LinkError> {
        self.check_connected()?;
        *self.probe.inner.last_force.lock() = Vector3::zeros();
        self.probe.inner.releases.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
