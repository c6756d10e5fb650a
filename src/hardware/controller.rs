//! Lock-serialized hardware controller.
//!
//! All driver commands from both control endpoints flow through one
//! [`HatController`], whose single async mutex guards the driver and the
//! last-issued servo angles. The lock is held across the settle sleep, so two
//! requests' command sequences can never interleave on the wire.

use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{HatDriver, LightRequest, OrientationRequest, ServoChannel};
use crate::Result;

/// Floor for the servo settle sleep.
const MIN_SETTLE: Duration = Duration::from_millis(100);

/// Settle time for a sweep from `last` to `target` degrees.
///
/// Models the physical sweep of the mount: half a second for a full 180
/// degree sweep, scaled linearly, with a 100ms floor so even a no-op move
/// lets the mechanism stop ringing.
pub fn settle_delay(last: i32, target: i32) -> Duration {
    // Widen before subtracting: the angle span exceeds i32 range at the
    // extremes.
    let sweep = (i64::from(target) - i64::from(last)).unsigned_abs() as f64;
    MIN_SETTLE.max(Duration::from_secs_f64(0.5 * sweep / 180.0))
}

struct Inner {
    driver: Box<dyn HatDriver>,
    last_pan: i32,
    last_tilt: i32,
}

/// Owner of the hardware lock and the last-issued servo angles.
///
/// Angles record the last *successfully issued* command only: a failed
/// `set_angle` leaves the recorded state untouched.
pub struct HatController {
    inner: Mutex<Inner>,
}

impl HatController {
    pub fn new(driver: Box<dyn HatDriver>) -> Self {
        Self { inner: Mutex::new(Inner { driver, last_pan: 0, last_tilt: 0 }) }
    }

    /// One-time board setup: configure the light strip and make sure both
    /// servo channels start de-energized.
    pub async fn initialize(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.driver.configure().await?;
        inner.driver.servo_enable(ServoChannel::Pan, false).await?;
        inner.driver.servo_enable(ServoChannel::Tilt, false).await?;
        info!("hardware initialized, servos disabled");
        Ok(())
    }

    /// Execute an orientation request under the hardware lock.
    ///
    /// Enables both servo channels, issues the requested angle commands
    /// (sign-inverted), sleeps out the larger settle delay, and disables both
    /// channels again on every exit path, error or not. The servos must never
    /// be left energized.
    pub async fn orient(&self, request: OrientationRequest) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let moved = Self::drive(&mut inner, request).await;

        let pan_off = inner.driver.servo_enable(ServoChannel::Pan, false).await;
        let tilt_off = inner.driver.servo_enable(ServoChannel::Tilt, false).await;
        if let Err(e) = &moved {
            warn!(error = %e, "orientation command failed, servos disabled");
        }

        moved?;
        pan_off?;
        tilt_off
    }

    async fn drive(inner: &mut Inner, request: OrientationRequest) -> Result<()> {
        inner.driver.servo_enable(ServoChannel::Pan, true).await?;
        inner.driver.servo_enable(ServoChannel::Tilt, true).await?;

        let mut delay = MIN_SETTLE;
        if let Some(pan) = request.pan {
            // saturating: -i32::MIN does not exist
            let target = pan.saturating_neg();
            delay = delay.max(settle_delay(inner.last_pan, target));
            inner.driver.set_angle(ServoChannel::Pan, target).await?;
            inner.last_pan = target;
        }
        if let Some(tilt) = request.tilt {
            let target = tilt.saturating_neg();
            delay = delay.max(settle_delay(inner.last_tilt, target));
            inner.driver.set_angle(ServoChannel::Tilt, target).await?;
            inner.last_tilt = target;
        }

        debug!(?request, ?delay, "waiting for servo sweep");
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// Apply a resolved light request under the hardware lock: one
    /// `set_pixel` per entry, then exactly one commit.
    pub async fn set_lights(&self, request: LightRequest) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for (index, color) in request.entries() {
            inner.driver.set_pixel(index, color).await?;
        }
        inner.driver.show().await
    }

    /// Last successfully issued `(pan, tilt)` angles, in hardware frame.
    pub async fn last_angles(&self) -> (i32, i32) {
        let inner = self.inner.lock().await;
        (inner.last_pan, inner.last_tilt)
    }

    /// Force the hardware to a safe, de-energized state.
    ///
    /// Runs during supervised teardown; driver failures are logged rather
    /// than propagated so shutdown always completes.
    pub async fn safe_shutdown(&self) {
        let mut inner = self.inner.lock().await;
        for (what, result) in [
            ("disable pan", inner.driver.servo_enable(ServoChannel::Pan, false).await),
            ("disable tilt", inner.driver.servo_enable(ServoChannel::Tilt, false).await),
            ("clear lights", inner.driver.clear().await),
            ("commit lights", inner.driver.show().await),
        ] {
            if let Err(e) = result {
                warn!(error = %e, "shutdown step '{what}' failed");
            }
        }
        info!("hardware left in safe state");
    }
}
