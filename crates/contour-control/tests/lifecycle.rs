//! 生命周期集成测试：完整启动序列、命令服务与关闭路径的
//! 上下文恢复，全部跑在模拟后端上。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use nalgebra::Vector3;
use parking_lot::Mutex;

use contour_control::{
    CommandRequest, ContourModule, ControlError, Devices, ModuleConfig, NoopStrategy, StartupStep,
    command_channel, frame,
};
use contour_hal::sim::{SimBoard, SimCartesian, SimFinger, SimSkin, SimTaxelSink};
use contour_hal::{
    BodyPart, ControlModeKind, FingerKinematics, HalError, PositionBoard, SkinContact, TaxelSink,
    TaxelVector,
};

struct SimRig {
    right: SimBoard,
    cartesian: SimCartesian,
    skin_tx: Sender<Vec<SkinContact>>,
    taxel_rx: Receiver<TaxelVector>,
}

fn sim_devices() -> (SimRig, Devices) {
    let right = SimBoard::new(BodyPart::RightArm);
    let cartesian = SimCartesian::new();
    let (skin_tx, skin) = SimSkin::channel(32);
    let (sink, taxel_rx) = SimTaxelSink::channel(256);

    let devices = Devices {
        right_arm: Box::new(right.clone()),
        left_arm: Box::new(SimBoard::new(BodyPart::LeftArm)),
        head: Box::new(SimBoard::new(BodyPart::Head)),
        torso: Box::new(SimBoard::new(BodyPart::Torso)),
        cartesian: Arc::new(cartesian.clone()),
        finger: Box::new(SimFinger),
        skin: Box::new(skin),
        taxel_out: Box::new(sink),
    };
    (
        SimRig {
            right,
            cartesian,
            skin_tx,
            taxel_rx,
        },
        devices,
    )
}

fn fast_config() -> ModuleConfig {
    ModuleConfig {
        period: Duration::from_millis(1),
        wait_poll: Duration::from_millis(1),
        wait_timeout: Duration::from_millis(50),
        ..ModuleConfig::default()
    }
}

/// 四个接口全部打开、归位按时完成 → 模块到达预接触姿态；
/// 重定位平移 = 固定参考构型下指尖位姿的第 3 列
#[test]
fn test_startup_reaches_pre_contact_pose() {
    let (rig, devices) = sim_devices();
    let mut module =
        ContourModule::open(fast_config(), Box::new(NoopStrategy), move |_| Ok(devices)).unwrap();
    module.configure().unwrap();

    // 归位 + 合指都到达了主动臂
    let moves = rig.right.moves();
    assert_eq!(moves.len(), 3, "home + two grasp phases");

    // 求解器配置：轨迹时间与躯干 DOF
    assert_eq!(rig.cartesian.traj_time(), 1.0);
    let dof = rig.cartesian.current_dof();
    assert!(dof[0] && !dof[1] && dof[2], "pitch+yaw enabled, roll locked");

    // 指尖重定位恰好一次，平移取自位姿第 3 列
    let frames = rig.cartesian.tip_frames();
    assert_eq!(frames.len(), 1);
    let tip = SimFinger.tip_pose(&frame::reference_config());
    assert_eq!(
        frames[0].0,
        Vector3::new(tip[(0, 3)], tip[(1, 3)], tip[(2, 3)])
    );

    // 两个顺序预接触目标
    let goals = rig.cartesian.goals();
    assert_eq!(goals.len(), 2);
    assert_eq!(goals[0].position, Vector3::new(-0.3, 0.0, 0.0));
    assert_eq!(goals[1].position, Vector3::new(-0.4, 0.13, -0.1));
    assert_eq!(goals[0].orientation, goals[1].orientation);
    assert_eq!(goals[0].traj_time, 3.0);

    // 上下文已存储、尚未恢复
    assert!(rig.cartesian.restored_contexts().is_empty());

    module.close();
    assert_eq!(rig.cartesian.restored_contexts().len(), 1);
    assert!(rig.cartesian.stop_calls() >= 1);
}

/// 接口打开失败：启动中止并指出失败步骤，不做部分操作
#[test]
fn test_open_failure_aborts_startup() {
    let err = ContourModule::open(fast_config(), Box::new(NoopStrategy), |_| {
        Err(HalError::setup("head", "remote controlboard unreachable"))
    })
    .err()
    .expect("open must fail");

    match err {
        ControlError::Startup { step, source } => {
            assert_eq!(step, StartupStep::OpenInterfaces);
            assert!(format!("{}", source).contains("head"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// 中断到达时仍有位姿运动在途 → 关闭路径恢复上下文恰好一次，
/// 重复关闭与 Drop 都不会恢复第二次
#[test]
fn test_interrupt_restores_context_exactly_once() {
    let (rig, devices) = sim_devices();
    let mut module =
        ContourModule::open(fast_config(), Box::new(NoopStrategy), move |_| Ok(devices)).unwrap();
    module.configure().unwrap();

    // 模拟在途运动中收到中断：直接走关闭序列
    module.close();
    module.close();
    drop(module);

    assert_eq!(
        rig.cartesian.restored_contexts().len(),
        1,
        "restore must run exactly once, never zero or twice"
    );
}

/// 在存储上下文之后的步骤失败时拒绝轨迹时间设置的控制器
struct RejectTrajTime(SimCartesian);

impl contour_hal::CartesianBoard for RejectTrajTime {
    fn attach_tip_frame(
        &self,
        translation: Vector3<f64>,
        orientation: contour_hal::AxisAngle,
    ) -> Result<(), HalError> {
        self.0.attach_tip_frame(translation, orientation)
    }

    fn store_context(&self) -> Result<contour_hal::ContextId, HalError> {
        self.0.store_context()
    }

    fn restore_context(&self, id: contour_hal::ContextId) -> Result<(), HalError> {
        self.0.restore_context(id)
    }

    fn dof(&self) -> Result<Vec<bool>, HalError> {
        self.0.dof()
    }

    fn set_dof(&self, dof: &[bool]) -> Result<(), HalError> {
        self.0.set_dof(dof)
    }

    fn set_traj_time(&self, _seconds: f64) -> Result<(), HalError> {
        Err(HalError::setup("cartesian", "solver rejected trajectory time"))
    }

    fn go_to_pose_sync(
        &self,
        position: Vector3<f64>,
        orientation: contour_hal::AxisAngle,
        traj_time: f64,
    ) -> Result<(), HalError> {
        self.0.go_to_pose_sync(position, orientation, traj_time)
    }

    fn wait_motion_done(&self, poll: Duration, timeout: Duration) -> Result<bool, HalError> {
        self.0.wait_motion_done(poll, timeout)
    }

    fn stop_control(&self) -> Result<(), HalError> {
        self.0.stop_control()
    }
}

/// 启动在存储上下文之后失败 → 关闭路径仍然恢复上下文恰好一次
#[test]
fn test_context_restored_after_failed_startup() {
    let (rig, mut devices) = sim_devices();
    devices.cartesian = Arc::new(RejectTrajTime(rig.cartesian.clone()));

    let mut module =
        ContourModule::open(fast_config(), Box::new(NoopStrategy), move |_| Ok(devices)).unwrap();
    let err = module.configure().err().expect("solver step must fail");
    match err {
        ControlError::Startup { step, .. } => assert_eq!(step, StartupStep::ConfigureSolver),
        other => panic!("unexpected error: {other}"),
    }

    drop(module);
    assert_eq!(
        rig.cartesian.restored_contexts().len(),
        1,
        "context stored in step 4 must be restored despite the failed startup"
    );
}

/// 运行循环：命令在两拍之间被服务，节拍每拍发布压力向量
#[test]
fn test_run_services_commands_and_publishes_every_tick() {
    let (rig, devices) = sim_devices();
    let mut module =
        ContourModule::open(fast_config(), Box::new(NoopStrategy), move |_| Ok(devices)).unwrap();
    module.configure().unwrap();

    // 一批接触事件排队等第一拍
    rig.skin_tx
        .send(vec![SkinContact::new(4, 0.6), SkinContact::new(4, 0.9)])
        .unwrap();

    let shutdown = Arc::new(AtomicBool::new(false));
    let (cmd_tx, cmd_rx) = command_channel(8);

    let flag = shutdown.clone();
    let worker = std::thread::spawn(move || {
        module.run(&flag, &cmd_rx);
        module
    });

    let (request, reply_rx) = CommandRequest::new("home");
    cmd_tx.send(request).unwrap();
    let reply = reply_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(reply, "Going back home");

    let (request, reply_rx) = CommandRequest::new("follow");
    cmd_tx.send(request).unwrap();
    let reply = reply_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(reply, "Command not recognized. Available commands: home");

    std::thread::sleep(Duration::from_millis(30));
    shutdown.store(true, Ordering::Relaxed);
    let module = worker.join().unwrap();

    assert!(module.ticks() > 0, "loop must have ticked");

    // 占空信号：每拍一个向量；其中一拍带归约后的压力（后写胜出）
    let mut published = Vec::new();
    while let Ok(vector) = rig.taxel_rx.try_recv() {
        published.push(vector);
    }
    assert!(published.len() as u64 >= module.ticks().min(2));
    assert!(
        published.iter().any(|v| v[4] == 0.9),
        "reduced batch must appear on the observability channel"
    );
    assert!(published.iter().any(|v| !v.any_contact()));
}

/// 控制线程上的事件序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEvent {
    Publish,
    ArmCommand,
}

/// 把主动臂控制板的每次调用记入共享事件序的包装
struct TracedBoard {
    inner: SimBoard,
    log: Arc<Mutex<Vec<LoopEvent>>>,
}

impl PositionBoard for TracedBoard {
    fn joint_count(&self) -> usize {
        self.inner.joint_count()
    }

    fn set_control_mode(&self, mode: ControlModeKind) -> Result<(), HalError> {
        self.log.lock().push(LoopEvent::ArmCommand);
        self.inner.set_control_mode(mode)
    }

    fn set_ref_speeds(&self, speeds: &[f64]) -> Result<(), HalError> {
        self.log.lock().push(LoopEvent::ArmCommand);
        self.inner.set_ref_speeds(speeds)
    }

    fn position_move(&self, targets: &[f64]) -> Result<(), HalError> {
        self.log.lock().push(LoopEvent::ArmCommand);
        self.inner.position_move(targets)
    }

    fn position_move_joints(&self, joints: &[usize], targets: &[f64]) -> Result<(), HalError> {
        self.log.lock().push(LoopEvent::ArmCommand);
        self.inner.position_move_joints(joints, targets)
    }

    fn check_motion_done(&self) -> Result<bool, HalError> {
        self.inner.check_motion_done()
    }
}

/// 把每次压力向量发布记入同一事件序的包装
struct TracedSink {
    inner: SimTaxelSink,
    log: Arc<Mutex<Vec<LoopEvent>>>,
}

impl TaxelSink for TracedSink {
    fn publish(&self, taxels: &TaxelVector) {
        self.log.lock().push(LoopEvent::Publish);
        self.inner.publish(taxels);
    }
}

/// 命令与节拍互斥：归位命令的全部控制板调用在两拍之间连续执行，
/// 不被任何一拍的发布拆开
#[test]
fn test_home_command_is_serviced_between_ticks() {
    let log: Arc<Mutex<Vec<LoopEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let (_skin_tx, skin) = SimSkin::channel(32);
    let (sink, _taxel_rx) = SimTaxelSink::channel(256);

    let devices = Devices {
        right_arm: Box::new(TracedBoard {
            inner: SimBoard::new(BodyPart::RightArm),
            log: log.clone(),
        }),
        left_arm: Box::new(SimBoard::new(BodyPart::LeftArm)),
        head: Box::new(SimBoard::new(BodyPart::Head)),
        torso: Box::new(SimBoard::new(BodyPart::Torso)),
        cartesian: Arc::new(SimCartesian::new()),
        finger: Box::new(SimFinger),
        skin: Box::new(skin),
        taxel_out: Box::new(TracedSink {
            inner: sink,
            log: log.clone(),
        }),
    };

    let mut module =
        ContourModule::open(fast_config(), Box::new(NoopStrategy), move |_| Ok(devices)).unwrap();
    module.configure().unwrap();
    // 只观察运行期：丢掉启动序列记下的事件
    log.lock().clear();

    let shutdown = Arc::new(AtomicBool::new(false));
    let (cmd_tx, cmd_rx) = command_channel(8);

    let flag = shutdown.clone();
    let worker = std::thread::spawn(move || {
        module.run(&flag, &cmd_rx);
        module
    });

    // 命令前后都让循环跑几拍，保证事件序里有两侧的发布
    std::thread::sleep(Duration::from_millis(20));
    let (request, reply_rx) = CommandRequest::new("home");
    cmd_tx.send(request).unwrap();
    assert_eq!(
        reply_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        "Going back home"
    );
    std::thread::sleep(Duration::from_millis(20));

    shutdown.store(true, Ordering::Relaxed);
    worker.join().unwrap();

    let events = log.lock().clone();
    let command_idx: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| **e == LoopEvent::ArmCommand)
        .map(|(i, _)| i)
        .collect();

    // 归位在主动臂上恰好三次调用：模式、速度、目标
    assert_eq!(command_idx.len(), 3, "events: {events:?}");
    assert_eq!(
        command_idx[2] - command_idx[0],
        2,
        "command servicing must not be split by a tick's publish: {events:?}"
    );
    assert!(
        command_idx[0] > 0 && command_idx[2] < events.len() - 1,
        "expected publishes on both sides of the command: {events:?}"
    );
}
