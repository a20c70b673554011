//! 模拟器配置文件
//!
//! ```toml
//! [device]
//! identity = "emulator-0"
//! port = "COM3"
//! portal_id = 1
//!
//! [device.companion]
//! port = "COM4"
//! identity = "IBOX-0"
//!
//! [loop]
//! target_period_us = 1000
//! damping = 1.0
//! floor_height = 0.0
//! pacing = "spin_sleep"
//!
//! [trajectory]
//! step_hz = 60.0
//! amplitude = 0.5
//! offset = 0.1
//! frequency_hz = 0.5
//! ```

use anyhow::{Context, Result, bail};
use avatar_sdk::driver::{CompanionInfo, PortalDescriptor};
use avatar_sdk::{LoopConfig, PacingStrategy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 模拟器完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub device: DeviceSection,
    #[serde(rename = "loop")]
    pub loop_config: LoopConfig,
    pub trajectory: TrajectorySection,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            device: DeviceSection::default(),
            loop_config: LoopConfig {
                // 模拟器不需要占满一个核
                pacing: PacingStrategy::SpinSleep,
                ..Default::default()
            },
            trajectory: TrajectorySection::default(),
        }
    }
}

/// `[device]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub identity: String,
    pub port: String,
    pub portal_id: u32,
    pub rail: u32,
    pub rail_position_mm: f64,
    pub flip_angle_deg: f64,
    pub tilt_angle_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion: Option<CompanionSection>,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            identity: "emulator-0".to_string(),
            port: "COM3".to_string(),
            portal_id: 1,
            rail: 0,
            rail_position_mm: 0.0,
            flip_angle_deg: 0.0,
            tilt_angle_deg: 0.0,
            companion: None,
        }
    }
}

impl DeviceSection {
    pub fn portal_descriptor(&self) -> PortalDescriptor {
        PortalDescriptor {
            id: self.portal_id,
            rail: self.rail,
            rail_position_mm: self.rail_position_mm,
            flip_angle_deg: self.flip_angle_deg,
            tilt_angle_deg: self.tilt_angle_deg,
            com_port: self.port.clone(),
        }
    }

    /// IBox 所在的 Portal（与设备同一导轨位置，id 紧随其后）
    pub fn companion_portal(&self) -> Option<PortalDescriptor> {
        let companion = self.companion.as_ref()?;
        Some(PortalDescriptor {
            id: self.portal_id.checked_add(1)?,
            com_port: companion.port.clone(),
            ..self.portal_descriptor()
        })
    }

    pub fn companion_info(&self) -> Option<CompanionInfo> {
        self.companion
            .as_ref()
            .map(|c| CompanionInfo::new(c.port.clone(), c.identity.clone()))
    }
}

/// `[device.companion]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionSection {
    pub port: String,
    pub identity: String,
}

/// `[trajectory]`：工具尖端的竖直正弦轨迹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectorySection {
    /// 动画步频率（Hz）
    pub step_hz: f64,
    pub amplitude: f64,
    pub offset: f64,
    pub frequency_hz: f64,
}

impl Default for TrajectorySection {
    fn default() -> Self {
        Self {
            step_hz: 60.0,
            amplitude: 0.5,
            offset: 0.1,
            frequency_hz: 0.5,
        }
    }
}

impl TrajectorySection {
    /// 动画步间隔
    pub fn step_period(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(1.0 / self.step_hz)
            .with_context(|| format!("trajectory.step_hz out of range (got {})", self.step_hz))
    }
}

impl EmulatorConfig {
    /// 从 TOML 文件加载并校验
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        self.loop_config.validate()?;

        if self.device.port.is_empty() {
            bail!("device.port must not be empty");
        }
        if let Some(companion) = &self.device.companion
            && companion.port == self.device.port
        {
            bail!("device.companion.port must differ from device.port");
        }
        if self.device.companion.is_some() && self.device.portal_id == u32::MAX {
            bail!("device.portal_id leaves no id for the companion portal");
        }

        let t = &self.trajectory;
        if !(t.step_hz.is_finite() && t.step_hz > 0.0) {
            bail!("trajectory.step_hz must be > 0 (got {})", t.step_hz);
        }
        t.step_period()?;
        if !(t.amplitude.is_finite() && t.offset.is_finite() && t.frequency_hz.is_finite()) {
            bail!("trajectory parameters must be finite");
        }
        Ok(())
    }
}
