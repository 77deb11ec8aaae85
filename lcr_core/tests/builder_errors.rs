use lcr_core::error::BuildError;
use lcr_core::mocks::{ManualClock, ScriptedChamber, TimedLink};
use lcr_core::{
    AbortReason, AcqError, Acquisition, LinkTiming, PidCfg, RunCfg, RunOutcome, RunPlan, RunStatus,
    SegmentDurations, Trajectory,
};
use rstest::rstest;

fn trajectory() -> Trajectory {
    Trajectory::step(vec![30.0], &SegmentDurations::Uniform(60.0)).unwrap()
}

fn link() -> TimedLink {
    TimedLink::new(ManualClock::new(), Vec::new())
}

#[rstest]
fn missing_link_yields_typed_build_error() {
    let err = Acquisition::builder()
        .with_chamber(ScriptedChamber::default())
        .with_trajectory(trajectory())
        .try_build()
        .expect_err("should fail with MissingLink");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingLink) => {}
        other => panic!("expected MissingLink, got: {other:?}"),
    }
}

#[rstest]
fn missing_chamber_yields_typed_build_error() {
    let err = Acquisition::builder()
        .with_link(link())
        .with_trajectory(trajectory())
        .try_build()
        .expect_err("should fail with MissingChamber");

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingChamber)
    ));
}

#[rstest]
fn missing_trajectory_yields_typed_build_error() {
    let err = Acquisition::builder()
        .with_link(link())
        .with_chamber(ScriptedChamber::default())
        .try_build()
        .expect_err("should fail with MissingTrajectory");

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingTrajectory)
    ));
}

#[rstest]
#[case::zero_iterations(PidCfg::default(), LinkTiming::default(), RunCfg { iterations: 0, poll_ms: 50 })]
#[case::zero_poll(PidCfg::default(), LinkTiming::default(), RunCfg { iterations: 1, poll_ms: 0 })]
#[case::non_finite_gain(PidCfg { kp: f64::NAN, ..PidCfg::default() }, LinkTiming::default(), RunCfg::default())]
#[case::zero_period(
    PidCfg::default(),
    LinkTiming { frame_period_s: 0.0, ..LinkTiming::default() },
    RunCfg::default()
)]
fn invalid_settings_are_rejected(#[case] pid: PidCfg, #[case] timing: LinkTiming, #[case] run: RunCfg) {
    let err = Acquisition::builder()
        .with_link(link())
        .with_chamber(ScriptedChamber::default())
        .with_trajectory(trajectory())
        .with_pid(pid)
        .with_link_timing(timing)
        .with_run(run)
        .build()
        .expect_err("invalid settings must not build");

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn complete_builder_starts_unsynchronized() {
    let acq = Acquisition::builder()
        .with_link(link())
        .with_chamber(ScriptedChamber::default())
        .with_trajectory(trajectory())
        .build()
        .unwrap();
    assert!(!acq.decoder().is_synchronized());
    assert!(acq.outcome().is_none());
    assert!(acq.reference().is_none());
}

#[test]
fn plan_settings_and_stop_check_reach_the_loop() {
    let plan = RunPlan {
        pid: PidCfg::default(),
        timing: LinkTiming::default(),
        run: RunCfg {
            iterations: 2,
            poll_ms: 25,
        },
        trajectory: trajectory(),
    };
    let clock = ManualClock::new();
    let mut acq = Acquisition::builder()
        .with_link(TimedLink::new(clock.clone(), Vec::new()))
        .with_chamber(ScriptedChamber::default())
        .with_trajectory(plan.trajectory.clone())
        .with_plan_settings(&plan)
        .with_clock(Box::new(clock.clone()))
        .with_stop_check({
            let clock = clock.clone();
            move || clock.elapsed_s() > 0.049
        })
        .build()
        .unwrap();
    acq.begin();

    assert!(matches!(acq.step().unwrap(), RunStatus::Running));
    assert!(matches!(acq.step().unwrap(), RunStatus::Running));
    // Two 25 ms ticks have passed; the next check cancels.
    assert!(matches!(
        acq.step().unwrap(),
        RunStatus::Aborted(AcqError::Abort(AbortReason::Cancelled))
    ));
    assert_eq!(acq.outcome(), Some(RunOutcome::Cancelled));
}
