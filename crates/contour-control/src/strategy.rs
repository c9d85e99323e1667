//! 轮廓跟随控制律扩展点
//!
//! 具体的"接触压力 → 末端修正运动"控制律不属于本层；这里只
//! 规定它必须满足的契约：每拍以通道向量为输入、非阻塞、输出
//! 可选的位姿目标。脚手架默认挂载 [`NoopStrategy`]。

use contour_hal::{AxisAngle, TaxelVector};
use nalgebra::Vector3;

/// 一条末端位姿目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseGoal {
    pub position: Vector3<f64>,
    pub orientation: AxisAngle,
    /// 轨迹时间（秒）
    pub traj_time: f64,
}

/// 轮廓跟随控制律
///
/// `step` 在每个有新触觉数据的节拍被调用一次，必须快速返回；
/// 返回 `Some` 时控制循环把位姿目标非阻塞下发给笛卡尔控制器。
pub trait ContourStrategy: Send {
    fn step(&mut self, taxels: &TaxelVector) -> Option<PoseGoal>;
}

/// 空控制律：观察但不动作
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStrategy;

impl ContourStrategy for NoopStrategy {
    fn step(&mut self, _taxels: &TaxelVector) -> Option<PoseGoal> {
        None
    }
}
