//! Mock microscope driven through the capability traits only.

use scope_core::capabilities::{
    snap_image, ChannelControl, FocusDrive, Microscope, ShutterControl, XyStage,
};
use scope_core::error::{DriverErrorKind, ScopeError};
use scope_driver_mock::{Fault, FaultPlan, MockMicroscope, MockMode, Operation, TimingConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

async fn focus_score_at(scope: &dyn Microscope, z: f64) -> f64 {
    scope.set_z_position(z).await.unwrap();
    let frame = snap_image(scope).await.unwrap();
    let pixels = frame.to_f64_pixels();
    let mean = frame.mean();
    pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pixels.len() as f64
}

#[tokio::test]
async fn usable_as_trait_object() {
    let scope: Arc<dyn Microscope> = Arc::new(MockMicroscope::builder().focal_plane(10.0).build());

    let near = focus_score_at(&*scope, 10.0).await;
    let far = focus_score_at(&*scope, 40.0).await;
    assert!(near > far * 10.0);
}

#[tokio::test(start_paused = true)]
async fn realistic_mode_charges_settle_and_exposure_time() {
    let scope = MockMicroscope::builder()
        .mode(MockMode::Realistic)
        .timing(TimingConfig::microscope())
        .exposure(100.0)
        .build();

    let start = Instant::now();
    scope.set_xy_position(10.0, 10.0).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(50));

    let start = Instant::now();
    snap_image(&scope).await.unwrap();
    // wait_for_system round trip + readout + exposure
    assert!(start.elapsed() >= Duration::from_millis(2 + 33 + 100));
}

#[tokio::test]
async fn instant_mode_never_sleeps() {
    let scope = MockMicroscope::builder()
        .timing(TimingConfig::microscope())
        .build();

    let start = std::time::Instant::now();
    for i in 0..50 {
        scope.set_z_position(i as f64).await.unwrap();
    }
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn injected_faults_surface_as_driver_errors() {
    let scope = MockMicroscope::builder()
        .faults(FaultPlan::with(Fault::Timeout(Operation::MoveZ)))
        .build();

    let err = scope.set_z_position(1.0).await.unwrap_err();
    match err {
        ScopeError::Driver(driver) => {
            assert_eq!(driver.kind, DriverErrorKind::Timeout);
            assert_eq!(driver.driver_type, "mock_microscope");
        }
        other => panic!("expected driver error, got {other:?}"),
    }
    // other capabilities keep working
    assert!(scope.set_xy_position(0.0, 0.0).await.is_ok());
}

#[tokio::test]
async fn communication_loss_is_sticky() {
    let scope = MockMicroscope::builder()
        .faults(FaultPlan::with(Fault::LinkLoss))
        .build();

    assert!(scope.set_channel("GFP").await.is_err());
    assert!(scope.set_shutter_open(true).await.is_err());
    assert!(snap_image(&scope).await.is_err());
}
