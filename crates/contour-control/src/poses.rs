//! 固定姿态表
//!
//! 关节角单位为度，位姿单位为米。数值来自仿真环境中标定好的
//! 中立姿态与合指构型。

/// 手臂中立姿态（16 关节：肩 3、肘 1、腕 3、手 9）
pub const ARM_HOME: [f64; 16] = [
    -30.0, 30.0, 0.0, 45.0, 0.0, 0.0, 0.0, 60.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

/// 头部中立姿态
pub const HEAD_HOME: [f64; 6] = [0.0; 6];

/// 躯干中立姿态
pub const TORSO_HOME: [f64; 3] = [0.0; 3];

/// 手臂 / 头部参考速度（度/秒）
pub const ARM_REF_SPEED: f64 = 30.0;

/// 躯干参考速度（度/秒），更保守
pub const TORSO_REF_SPEED: f64 = 15.0;

/// 合指第一阶段：非拇指手指关节
pub const FINGER_JOINTS: [usize; 6] = [7, 11, 12, 13, 14, 15];

/// 非拇指手指的合拢目标
pub const FINGER_CLOSED: [f64; 6] = [60.0, 0.0, 2.0, 82.0, 140.0, 230.0];

/// 合指第二阶段：拇指关节
///
/// 拇指必须在其余手指合拢之后再动，依赖第一阶段让出的几何空间。
pub const THUMB_JOINTS: [usize; 3] = [8, 9, 10];

/// 拇指的合拢目标
pub const THUMB_CLOSED: [f64; 3] = [0.0, 0.0, 0.0];

/// 预接触位姿（根坐标系，米）
pub const PRE_CONTACT_0: [f64; 3] = [-0.3, 0.0, 0.0];
pub const PRE_CONTACT_1: [f64; 3] = [-0.4, 0.13, -0.1];

/// 末端绕 pitch 的倾斜角（度），避免手指先于指尖触面
pub const TILT_PITCH_DEG: f64 = -35.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grasp_phases_are_disjoint() {
        for j in FINGER_JOINTS {
            assert!(!THUMB_JOINTS.contains(&j), "joint {} in both phases", j);
        }
    }

    #[test]
    fn test_home_vector_lengths() {
        assert_eq!(ARM_HOME.len(), 16);
        assert_eq!(HEAD_HOME.len(), 6);
        assert_eq!(TORSO_HOME.len(), 3);
    }
}
