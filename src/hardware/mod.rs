//! Pan-tilt / light hardware abstraction.
//!
//! The physical accessory (two servo channels plus an 8-pixel RGBW strip) is
//! driven through the [`HatDriver`] capability trait. The crate never talks to
//! the hardware directly: all commands go through [`HatController`], which owns
//! the single hardware lock and the motion-timing logic.

mod controller;
mod null;
mod recording;
mod request;

pub use controller::{HatController, settle_delay};
pub use null::NullDriver;
pub use recording::{DriverCall, RecordingDriver};
pub use request::{LightRequest, MAX_ANGLE, OrientationRequest};

use crate::Result;

/// Number of addressable pixels on the light strip.
pub const PIXEL_COUNT: usize = 8;

/// Reserved light-request index meaning "every pixel".
pub const WILDCARD_INDEX: i32 = -1;

/// One RGBW color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgbw {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Rgbw {
    pub const OFF: Rgbw = Rgbw { r: 0, g: 0, b: 0, w: 0 };

    pub fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }
}

/// Servo channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoChannel {
    Pan,
    Tilt,
}

impl ServoChannel {
    /// Channel id on the accessory board (pan is channel 1, tilt channel 2).
    pub fn id(&self) -> u8 {
        match self {
            ServoChannel::Pan => 1,
            ServoChannel::Tilt => 2,
        }
    }
}

/// Capability interface over the pan-tilt-light accessory.
///
/// Implementations wrap a concrete board driver; the relay also ships
/// [`NullDriver`] for rigs without the accessory and [`RecordingDriver`] for
/// instrumented testing. Calls are only ever issued while the controller's
/// hardware lock is held, so implementations do not need their own
/// synchronization.
#[async_trait::async_trait]
pub trait HatDriver: Send + 'static {
    /// One-time board setup (light mode and pixel type), run once at startup.
    async fn configure(&mut self) -> Result<()>;

    /// Energize or de-energize a servo channel.
    async fn servo_enable(&mut self, channel: ServoChannel, enabled: bool) -> Result<()>;

    /// Command a servo to an absolute angle in degrees.
    async fn set_angle(&mut self, channel: ServoChannel, degrees: i32) -> Result<()>;

    /// Stage a color for one pixel; takes effect on the next [`show`].
    ///
    /// [`show`]: HatDriver::show
    async fn set_pixel(&mut self, index: u8, color: Rgbw) -> Result<()>;

    /// Stage all pixels off.
    async fn clear(&mut self) -> Result<()>;

    /// Commit all staged pixel changes to the strip.
    async fn show(&mut self) -> Result<()>;
}
