//! 模块配置
//!
//! 对应命令行 / 启动参数面：目标机器人、主动臂、控制周期，
//! 以及等待与轨迹的时间参数。

use std::str::FromStr;
use std::time::Duration;

use contour_hal::BodyPart;

/// 主动臂选择（抓握与轮廓跟随使用哪条手臂）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveArm {
    #[default]
    Right,
    Left,
}

impl ActiveArm {
    pub fn body_part(self) -> BodyPart {
        match self {
            ActiveArm::Right => BodyPart::RightArm,
            ActiveArm::Left => BodyPart::LeftArm,
        }
    }
}

impl FromStr for ActiveArm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "right_arm" | "right" => Ok(ActiveArm::Right),
            "left_arm" | "left" => Ok(ActiveArm::Left),
            other => Err(format!(
                "unknown arm '{other}', expected 'right_arm' or 'left_arm'"
            )),
        }
    }
}

impl std::fmt::Display for ActiveArm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ActiveArm::Right => "right_arm",
            ActiveArm::Left => "left_arm",
        })
    }
}

/// 躯干 DOF 使能
///
/// 每根轴独立配置而非按实例硬编码；默认只放开 pitch 和 yaw，
/// roll 留给姿态稳定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorsoDof {
    pub pitch: bool,
    pub roll: bool,
    pub yaw: bool,
}

impl Default for TorsoDof {
    fn default() -> Self {
        Self {
            pitch: true,
            roll: false,
            yaw: true,
        }
    }
}

/// 模块配置
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// 模块名（网络命名空间前缀）
    pub name: String,
    /// 目标机器人标识（选择硬件网络命名空间）
    pub robot: String,
    /// 主动臂
    pub arm: ActiveArm,
    /// 控制节拍周期
    pub period: Duration,
    /// 躯干 DOF 使能
    pub torso: TorsoDof,
    /// 完成查询的轮询间隔
    pub wait_poll: Duration,
    /// 所有有界等待的全局超时
    pub wait_timeout: Duration,
    /// 笛卡尔控制器轨迹响应时间（秒）
    pub traj_time: f64,
    /// 预接触位姿目标的轨迹时间（秒）
    pub approach_time: f64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: "/contour_following".to_string(),
            robot: "icubSim".to_string(),
            arm: ActiveArm::Right,
            period: Duration::from_millis(10),
            torso: TorsoDof::default(),
            wait_poll: Duration::from_millis(100),
            wait_timeout: Duration::from_secs(3),
            traj_time: 1.0,
            approach_time: 3.0,
        }
    }
}
