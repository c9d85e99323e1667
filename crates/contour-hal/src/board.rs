//! 设备能力 trait
//!
//! 对应四类外部协作者：
//!
//! - [`PositionBoard`]：每个身体段一块的关节位置控制板
//! - [`CartesianBoard`]：任务空间控制器（工具坐标系、DOF、上下文）
//! - [`FingerKinematics`]：指尖正运动学
//! - [`SkinStream`] / [`TaxelSink`]：皮肤事件输入与压力向量输出
//!
//! 所有实现必须在构造期完成连接与能力校验；运行期方法只在
//! 硬件层面失败时返回 [`HalError`]。

use std::time::Duration;

use nalgebra::{Matrix4, Vector3};

use crate::HalError;
use crate::types::{AxisAngle, ContextId, ControlModeKind, SkinContact, TaxelVector};

/// 关节位置控制板
pub trait PositionBoard: Send {
    /// 控制板自由度
    fn joint_count(&self) -> usize;

    /// 切换全部关节的控制模式
    fn set_control_mode(&self, mode: ControlModeKind) -> Result<(), HalError>;

    /// 设置各关节参考速度（度/秒），长度必须等于 `joint_count`
    fn set_ref_speeds(&self, speeds: &[f64]) -> Result<(), HalError>;

    /// 下发全关节目标角度（度），非阻塞
    fn position_move(&self, targets: &[f64]) -> Result<(), HalError>;

    /// 下发部分关节目标角度（度），非阻塞
    fn position_move_joints(&self, joints: &[usize], targets: &[f64]) -> Result<(), HalError>;

    /// 查询最近一次下发的运动是否完成
    fn check_motion_done(&self) -> Result<bool, HalError>;
}

/// 笛卡尔控制器
///
/// 上下文（DOF 使能 + 轨迹响应时间）是跨进程共享的控制器状态，
/// 调用方必须保证 `store_context` / `restore_context` 成对出现。
pub trait CartesianBoard: Send + Sync {
    /// 把受控点重定位到相对末关节的固定偏移
    ///
    /// 之后所有位姿目标都相对新坐标系解释，必须在第一个
    /// 笛卡尔目标下发之前调用。
    fn attach_tip_frame(&self, translation: Vector3<f64>, orientation: AxisAngle)
    -> Result<(), HalError>;

    /// 快照当前控制器配置，返回可恢复的上下文编号
    fn store_context(&self) -> Result<ContextId, HalError>;

    /// 恢复之前快照的控制器配置
    fn restore_context(&self, id: ContextId) -> Result<(), HalError>;

    /// 读取求解器自由度使能向量
    fn dof(&self) -> Result<Vec<bool>, HalError>;

    /// 写入求解器自由度使能向量（长度必须与 [`Self::dof`] 一致）
    fn set_dof(&self, dof: &[bool]) -> Result<(), HalError>;

    /// 设置轨迹响应时间（秒）
    ///
    /// 该值只表示控制器的响应性，不等于轨迹的实际执行时长。
    fn set_traj_time(&self, seconds: f64) -> Result<(), HalError>;

    /// 下发位姿目标，非阻塞
    fn go_to_pose_sync(
        &self,
        position: Vector3<f64>,
        orientation: AxisAngle,
        traj_time: f64,
    ) -> Result<(), HalError>;

    /// 阻塞等待当前位姿目标完成；超时返回 `false`
    fn wait_motion_done(&self, poll: Duration, timeout: Duration) -> Result<bool, HalError>;

    /// 停止在途的笛卡尔运动
    fn stop_control(&self) -> Result<(), HalError>;
}

/// 指尖正运动学
pub trait FingerKinematics: Send {
    /// 给定手指关节角（弧度），返回指尖相对末关节的 4×4 位姿
    fn tip_pose(&self, joints: &[f64]) -> Matrix4<f64>;
}

/// 皮肤事件流
///
/// 传输层只保证 at-most-latest：读取到的是最近一个未读批次，
/// 更早的未读批次被丢弃。
pub trait SkinStream: Send {
    /// 非阻塞读取最近批次；无新数据返回 `Ok(None)`
    fn read_latest(&self) -> Result<Option<Vec<SkinContact>>, HalError>;

    /// 中断事件流（关闭路径调用，之后 `read_latest` 返回 `Ok(None)`）
    fn interrupt(&self);
}

/// 压力向量观测输出
///
/// 每个控制节拍发布一次，无论是否有新数据，为外部监视器维持
/// 连续的占空信号。
pub trait TaxelSink: Send {
    fn publish(&self, taxels: &TaxelVector);
}
