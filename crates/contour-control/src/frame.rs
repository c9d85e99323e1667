//! 运动学坐标系适配
//!
//! 把笛卡尔控制器的受控点从手掌重定位到指尖：以固定参考构型
//! （食指完全伸展、外展 60°）求一次正运动学，取位姿第 3 列平移
//! 作为固定偏移。姿态保持手掌朝向不变，用规范单位轴角表示。

use contour_hal::{AxisAngle, CartesianBoard, FingerKinematics, HalError};
use nalgebra::Vector3;
use tracing::info;

/// 参考构型的关节数（外展 + 两段拇指外关节 + 三指各两关节）
const FINGER_CHAIN_JOINTS: usize = 9;

/// 参考外展角（度）
const REFERENCE_ABDUCTION_DEG: f64 = 60.0;

/// 指尖相对末关节的固定偏移
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerOffset {
    pub translation: Vector3<f64>,
    pub orientation: AxisAngle,
}

/// 固定参考构型：第一关节 60°（弧度），其余为零
pub fn reference_config() -> [f64; FINGER_CHAIN_JOINTS] {
    let mut joints = [0.0; FINGER_CHAIN_JOINTS];
    joints[0] = REFERENCE_ABDUCTION_DEG.to_radians();
    joints
}

/// 计算指尖偏移
///
/// 平移取指尖位姿矩阵的第 3 列；姿态是零角轴角，轴显式取 x
/// 以保持非退化。
pub fn finger_offset(fk: &dyn FingerKinematics) -> FingerOffset {
    let tip = fk.tip_pose(&reference_config());
    let column = tip.column(3);
    FingerOffset {
        translation: Vector3::new(column[0], column[1], column[2]),
        orientation: AxisAngle::identity(),
    }
}

/// 把受控点重定位到指尖
///
/// 必须在设备初始化之后、第一个笛卡尔目标之前恰好调用一次；
/// 之后的所有位姿目标都相对新坐标系解释。
pub fn reanchor(cartesian: &dyn CartesianBoard, offset: &FingerOffset) -> Result<(), HalError> {
    info!(translation = ?offset.translation, "reanchoring tool frame to fingertip");
    cartesian.attach_tip_frame(offset.translation, offset.orientation)
}
