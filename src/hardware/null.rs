//! Log-only driver for rigs without the accessory fitted.

use tracing::debug;

use super::{HatDriver, Rgbw, ServoChannel};
use crate::Result;

/// Driver that accepts every command and only logs it.
///
/// Lets the relay run (and the control plane be exercised) on hardware
/// without the pan-tilt accessory.
#[derive(Debug, Default)]
pub struct NullDriver;

#[async_trait::async_trait]
impl HatDriver for NullDriver {
    async fn configure(&mut self) -> Result<()> {
        debug!("null driver: configure");
        Ok(())
    }

    async fn servo_enable(&mut self, channel: ServoChannel, enabled: bool) -> Result<()> {
        debug!(channel = channel.id(), enabled, "null driver: servo_enable");
        Ok(())
    }

    async fn set_angle(&mut self, channel: ServoChannel, degrees: i32) -> Result<()> {
        debug!(channel = channel.id(), degrees, "null driver: set_angle");
        Ok(())
    }

    async fn set_pixel(&mut self, index: u8, color: Rgbw) -> Result<()> {
        debug!(index, ?color, "null driver: set_pixel");
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        debug!("null driver: clear");
        Ok(())
    }

    async fn show(&mut self) -> Result<()> {
        debug!("null driver: show");
        Ok(())
    }
}
