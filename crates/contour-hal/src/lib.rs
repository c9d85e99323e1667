//! # Contour HAL
//!
//! 硬件抽象层：把接触式轮廓跟随控制器依赖的外部设备收敛为一组
//! 窄接口（关节位置控制板、笛卡尔控制器、指尖正运动学、皮肤事件流）。
//!
//! 设计要点：
//!
//! - 每种能力是一个独立 trait，在构造期一次性获取并校验，
//!   运行期不再出现"句柄能否 view 成某接口"的空值检查。
//! - 所有方法使用 `&self`：句柄代表到外部控制器的连接，
//!   内部可变性由具体后端负责（模拟后端使用 `parking_lot`）。
//! - `mock` feature 提供进程内模拟后端，供测试与无硬件运行使用。

use thiserror::Error;

pub mod board;
pub mod types;

#[cfg(feature = "mock")]
pub mod sim;

pub use board::{CartesianBoard, FingerKinematics, PositionBoard, SkinStream, TaxelSink};
pub use types::{
    AxisAngle, BodyPart, ContextId, ControlModeKind, SkinContact, TAXEL_CHANNELS, TaxelVector,
};

/// 硬件抽象层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    /// 设备打开 / 能力获取失败（启动期致命错误）
    #[error("Device setup failed ({device}): {reason}")]
    Setup { device: String, reason: String },

    /// 皮肤事件流已关闭（中断或对端退出）
    #[error("Skin stream closed")]
    StreamClosed,

    /// 恢复了一个从未存储过的控制器上下文
    #[error("Unknown cartesian context id: {0}")]
    UnknownContext(ContextId),

    /// 关节向量长度与控制板自由度不一致
    #[error("Joint vector length mismatch: expected {expected}, got {actual}")]
    JointCountMismatch { expected: usize, actual: usize },

    /// 关节编号超出控制板自由度
    #[error("Joint index {index} out of range (board has {count} joints)")]
    JointIndexOutOfRange { index: usize, count: usize },
}

impl HalError {
    /// 构造启动期设备错误
    pub fn setup(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Setup {
            device: device.into(),
            reason: reason.into(),
        }
    }
}
