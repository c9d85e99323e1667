//! # Contour Control
//!
//! 接触式轮廓跟随的控制排序与状态管理层：归位 / 抓握准备状态机、
//! 运动完成看门狗、指尖坐标系重定位、触觉事件聚合与固定周期
//! 控制循环，以及保证关闭时恢复共享控制器配置的生命周期管理。
//!
//! 并发模型是单协作控制线程：节拍、命令、所有姿态等待都在同一
//! 线程上串行执行，有界等待独占该线程。唯一的并发生产者是皮肤
//! 事件源，每拍非阻塞读取一次。
//!
//! 具体的轮廓跟随控制律通过 [`strategy::ContourStrategy`] 注入；
//! 本层只保证它被以正确的节奏、正确的输入、非阻塞地调用。

pub mod command;
pub mod config;
pub mod context;
pub mod control_loop;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod poses;
pub mod sequencer;
pub mod skin;
pub mod strategy;
pub mod watchdog;

pub use command::{CommandRequest, command_channel};
pub use config::{ActiveArm, ModuleConfig, TorsoDof};
pub use context::ContextGuard;
pub use control_loop::{ControlLoop, TickState};
pub use error::{ControlError, StartupStep};
pub use lifecycle::{ContourModule, Devices};
pub use sequencer::PoseSequencer;
pub use skin::TactileAggregator;
pub use strategy::{ContourStrategy, NoopStrategy, PoseGoal};
pub use watchdog::{WaitOutcome, wait_all};
