//! 核心值类型
//!
//! 身体段标识、皮肤接触事件、taxel 通道向量、轴角姿态。

use std::ops::{Index, IndexMut};

use nalgebra::{Rotation3, Unit, Vector3};

/// 皮肤 taxel 通道数
///
/// 聚合后的压力向量固定为 12 个逻辑通道；传感器枚举出的更高编号
/// 属于调试输出，聚合时直接丢弃。
pub const TAXEL_CHANNELS: usize = 12;

/// 笛卡尔控制器上下文快照编号（由控制器签发，本层视为不透明）
pub type ContextId = u32;

/// 身体段标识
///
/// 每个身体段对应一块独立的位置控制板。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    RightArm,
    LeftArm,
    Head,
    Torso,
}

impl BodyPart {
    /// 全部受管身体段（复合动作按此顺序聚合完成状态）
    pub const ALL: [BodyPart; 4] = [
        BodyPart::RightArm,
        BodyPart::LeftArm,
        BodyPart::Head,
        BodyPart::Torso,
    ];

    /// 该身体段的关节数
    pub fn joint_count(self) -> usize {
        match self {
            BodyPart::RightArm | BodyPart::LeftArm => 16,
            BodyPart::Head => 6,
            BodyPart::Torso => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BodyPart::RightArm => "right_arm",
            BodyPart::LeftArm => "left_arm",
            BodyPart::Head => "head",
            BodyPart::Torso => "torso",
        }
    }
}

impl std::fmt::Display for BodyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 关节控制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlModeKind {
    /// 位置模式（点到点关节运动）
    Position,
    /// 空闲（不接受位置指令）
    #[default]
    Idle,
}

/// 单个皮肤接触事件
///
/// 异步到达，相对控制节拍无序；`taxel` 是接触点的主通道编号。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinContact {
    pub taxel: usize,
    pub pressure: f64,
}

impl SkinContact {
    pub fn new(taxel: usize, pressure: f64) -> Self {
        Self { taxel, pressure }
    }
}

/// 固定长度的 taxel 压力向量
///
/// 每个控制节拍由当拍事件批次归约而来，默认全零；不跨节拍保留。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxelVector([f64; TAXEL_CHANNELS]);

impl TaxelVector {
    /// 全零向量（"本拍无新数据"与"零接触"在本层不可区分）
    pub fn zeros() -> Self {
        Self([0.0; TAXEL_CHANNELS])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// 是否存在非零通道
    pub fn any_contact(&self) -> bool {
        self.0.iter().any(|p| *p != 0.0)
    }
}

impl Default for TaxelVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl From<[f64; TAXEL_CHANNELS]> for TaxelVector {
    fn from(values: [f64; TAXEL_CHANNELS]) -> Self {
        Self(values)
    }
}

impl Index<usize> for TaxelVector {
    type Output = f64;

    fn index(&self, channel: usize) -> &f64 {
        &self.0[channel]
    }
}

impl IndexMut<usize> for TaxelVector {
    fn index_mut(&mut self, channel: usize) -> &mut f64 {
        &mut self.0[channel]
    }
}

/// 轴角姿态描述
///
/// 角度为零时轴仍然必须是单位向量（规范约定取 x 轴），
/// 避免下游对退化轴做特殊处理。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    pub axis: Vector3<f64>,
    pub angle: f64,
}

impl AxisAngle {
    /// 规范单位姿态：x 轴、零角
    pub fn identity() -> Self {
        Self {
            axis: Vector3::x(),
            angle: 0.0,
        }
    }

    /// 从旋转矩阵提取轴角；单位旋转退化为规范单位姿态
    pub fn from_rotation(rotation: &Rotation3<f64>) -> Self {
        match rotation.axis_angle() {
            Some((axis, angle)) => Self {
                axis: axis.into_inner(),
                angle,
            },
            None => Self::identity(),
        }
    }

    /// 还原为旋转矩阵
    pub fn to_rotation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Unit::new_normalize(self.axis), self.angle)
    }
}

impl Default for AxisAngle {
    fn default() -> Self {
        Self::identity()
    }
}
