//! 控制层错误类型定义

use contour_hal::HalError;
use thiserror::Error;

/// 启动序列步骤
///
/// 启动失败时必须能指出失败在哪一步。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    /// 打开全部设备接口
    OpenInterfaces,
    /// 回到初始姿态
    Home,
    /// 抓握准备（主动臂位置模式 + 合指）
    GraspPrepare,
    /// 存储笛卡尔控制器上下文
    StoreContext,
    /// 配置轨迹响应时间与躯干 DOF
    ConfigureSolver,
    /// 把受控点重定位到指尖
    ReanchorFrame,
    /// 移动到预接触姿态
    PreContactPose,
}

impl std::fmt::Display for StartupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StartupStep::OpenInterfaces => "open interfaces",
            StartupStep::Home => "home all segments",
            StartupStep::GraspPrepare => "grasp preparation",
            StartupStep::StoreContext => "store cartesian context",
            StartupStep::ConfigureSolver => "configure solver",
            StartupStep::ReanchorFrame => "reanchor tool frame",
            StartupStep::PreContactPose => "reach pre-contact pose",
        };
        f.write_str(name)
    }
}

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 启动序列中断（首个失败步骤即中止）
    #[error("Startup step '{step}' failed: {source}")]
    Startup {
        step: StartupStep,
        #[source]
        source: HalError,
    },

    /// 运行期硬件错误
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),
}

impl ControlError {
    pub(crate) fn startup(step: StartupStep, source: HalError) -> Self {
        Self::Startup { step, source }
    }
}
