use scope_core::capabilities::{ExposureControl, XyStage};
use scope_driver_mock::{HardwareCall, MockMicroscope};
use scope_experiment::config::ImagingConfig;
use scope_experiment::snapshot::{snap_xyfield, snap_zstack};
use scope_experiment::{
    warm_up_camera, Experiment, ExperimentPlan, PositionRegistry, Scheduler, ScopeConfig,
    StageConfig, Topology,
};
use scope_storage::{SessionLayout, SessionRecorder};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn imaging_config(topology: Topology) -> ScopeConfig {
    ScopeConfig {
        topology,
        imaging: Some(ImagingConfig {
            windows: vec![[0.0, 20.0, 10.0]],
            channels: vec!["DIC".into()],
        }),
        ..ScopeConfig::default()
    }
}

async fn experiment(
    hw: &Arc<MockMicroscope>,
    dir: &TempDir,
    config: &ScopeConfig,
    extra_sites: &[(f64, f64)],
) -> Experiment<MockMicroscope> {
    let mut registry = PositionRegistry::new(&**hw, &config.stage).await.unwrap();
    for &(x, y) in extra_sites {
        hw.set_xy_position(x, y).await.unwrap();
        registry.record_current(&**hw).await.unwrap();
    }
    hw.clear_calls().await;
    let recorder = SessionRecorder::new(SessionLayout::new(dir.path()));
    let scheduler = Scheduler::new(Arc::clone(hw), registry, recorder, config.topology);
    Experiment::new(scheduler, ExperimentPlan::from_config(config))
        .with_poll_interval(config.poll_interval())
        .with_roi_center(config.roi_center)
}

#[tokio::test(start_paused = true)]
async fn sequential_runs_each_site_on_a_fresh_clock() {
    let hw = Arc::new(MockMicroscope::new());
    let dir = TempDir::new().unwrap();
    let config = imaging_config(Topology::Sequential);
    let mut expt = experiment(&hw, &dir, &config, &[(100.0, 0.0)]).await;

    expt.run().await.unwrap();

    let snap_xs: Vec<f64> = hw
        .snaps()
        .await
        .into_iter()
        .filter_map(|c| match c {
            HardwareCall::Snap { x, .. } => Some(x),
            _ => None,
        })
        .collect();
    assert_eq!(snap_xs, vec![100.0, 100.0, 0.0, 0.0]);

    for site in ["0", "1"] {
        let site_dir = dir.path().join("DIC").join(site);
        assert!(site_dir.join("0.0.tiff").is_file());
        assert!(site_dir.join("10.0.tiff").is_file());
    }
    assert!(expt.scheduler().tasks().is_empty());
    assert_eq!(expt.scheduler().active_site(), 1);
}

#[tokio::test(start_paused = true)]
async fn parallel_shares_one_clock() {
    let hw = Arc::new(MockMicroscope::new());
    let dir = TempDir::new().unwrap();
    let config = imaging_config(Topology::Parallel);
    let mut expt = experiment(&hw, &dir, &config, &[(100.0, 0.0)]).await;

    let started = tokio::time::Instant::now();
    expt.run().await.unwrap();

    assert_eq!(hw.snaps().await.len(), 4);
    // last firing at t = 10 s; a sequential run would need two full windows
    assert!(started.elapsed() < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn centred_roi_is_applied_for_the_run_and_cleared_after() {
    let hw = Arc::new(MockMicroscope::new());
    let dir = TempDir::new().unwrap();
    let config = ScopeConfig {
        roi_center: true,
        ..imaging_config(Topology::Single)
    };
    let mut expt = experiment(&hw, &dir, &config, &[]).await;

    expt.run().await.unwrap();

    let calls = hw.calls().await;
    assert_eq!(calls[0], HardwareCall::ClearRoi);
    assert_eq!(calls[1], HardwareCall::SetRoi(300, 300, 600, 600));
    assert_eq!(calls.last(), Some(&HardwareCall::ClearRoi));
    assert_eq!(hw.roi().await, None);
}

#[tokio::test(start_paused = true)]
async fn empty_plan_finishes_immediately() {
    let hw = Arc::new(MockMicroscope::new());
    let dir = TempDir::new().unwrap();
    let mut expt = experiment(&hw, &dir, &ScopeConfig::default(), &[]).await;

    expt.run().await.unwrap();
    assert_eq!(hw.frame_count().await, 0);
}

#[tokio::test]
async fn warm_up_takes_a_dark_frame_and_restores_settings() {
    let hw = MockMicroscope::builder().exposure(250.0).build();

    warm_up_camera(&hw, Some("BL1")).await.unwrap();

    assert_eq!(
        hw.calls().await,
        vec![
            HardwareCall::SetExposure(0.0),
            HardwareCall::SetChannel("BL1".into()),
            HardwareCall::SetAutoShutter(false),
            HardwareCall::SetShutterOpen(false),
            HardwareCall::Snap {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                channel: "BL1".into()
            },
            HardwareCall::SetExposure(250.0),
            HardwareCall::SetAutoShutter(true),
        ]
    );
    assert_eq!(hw.exposure().await.unwrap(), 250.0);
}

#[tokio::test]
async fn zstack_scans_around_focus_and_restores_it() {
    let hw = MockMicroscope::builder().position(0.0, 0.0, 50.0).build();
    let dir = TempDir::new().unwrap();
    let registry = PositionRegistry::new(&hw, &StageConfig::default()).await.unwrap();
    let recorder = SessionRecorder::new(SessionLayout::new(dir.path()));

    let paths = snap_zstack(
        &hw,
        &registry,
        &recorder,
        &["DIC".to_string(), "GFP".to_string()],
        20.0,
        5.0,
        "20240309-120000",
    )
    .await
    .unwrap();

    assert_eq!(paths.len(), 8);
    let stack = dir.path().join("20240309-120000_zstack");
    for z in ["40.0", "45.0", "50.0", "55.0"] {
        assert!(stack.join("DIC").join(format!("{}.tiff", z)).is_file());
        assert!(stack.join("GFP").join(format!("{}.tiff", z)).is_file());
    }
    assert_eq!(hw.calls().await.last(), Some(&HardwareCall::SetZ(50.0)));
}

#[tokio::test]
async fn xyfield_walks_a_serpentine_and_returns_home() {
    let hw = MockMicroscope::builder().position(1000.0, 1000.0, 0.0).build();
    let dir = TempDir::new().unwrap();
    let registry = PositionRegistry::new(&hw, &StageConfig::default()).await.unwrap();
    let recorder = SessionRecorder::new(SessionLayout::new(dir.path()));

    let paths = snap_xyfield(&hw, &registry, &recorder, &["DIC".to_string()], 3, 100.0)
        .await
        .unwrap();

    assert_eq!(paths.len(), 9);
    let moves: Vec<(f64, f64)> = hw
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            HardwareCall::SetXy { x, y } => Some((x, y)),
            _ => None,
        })
        .collect();
    assert_eq!(
        moves,
        vec![
            (1100.0, 900.0),
            (1000.0, 900.0),
            (900.0, 900.0),
            (900.0, 1000.0),
            (1000.0, 1000.0),
            (1100.0, 1000.0),
            (1100.0, 1100.0),
            (1000.0, 1100.0),
            (900.0, 1100.0),
            (1000.0, 1000.0),
        ]
    );
    for i in 0..3 {
        for j in 0..3 {
            assert!(dir.path().join("DIC").join(format!("{}_{}.tiff", i, j)).is_file());
        }
    }
}
