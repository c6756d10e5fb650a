//! Instrumented fake driver for tests and bench rigs.
//!
//! Records every driver call in order, so tests can assert on exact command
//! sequences (enable/disable pairing, commit counts, absence of interleaving
//! between concurrent requests). Cloning shares the underlying log.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{HatDriver, Rgbw, ServoChannel};
use crate::{RelayError, Result};

/// One recorded driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Configure,
    ServoEnable { channel: u8, enabled: bool },
    SetAngle { channel: u8, degrees: i32 },
    SetPixel { index: u8, color: Rgbw },
    Clear,
    Show,
}

/// Driver that records calls instead of touching hardware.
#[derive(Debug, Default, Clone)]
pub struct RecordingDriver {
    calls: Arc<Mutex<Vec<DriverCall>>>,
    fail_set_angle: Arc<AtomicBool>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls recorded so far, in issue order.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    /// Make every subsequent `set_angle` fail, for cleanup-path tests.
    pub fn fail_set_angle(&self, fail: bool) {
        self.fail_set_angle.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().expect("call log poisoned").push(call);
    }
}

#[async_trait::async_trait]
impl HatDriver for RecordingDriver {
    async fn configure(&mut self) -> Result<()> {
        self.record(DriverCall::Configure);
        Ok(())
    }

    async fn servo_enable(&mut self, channel: ServoChannel, enabled: bool) -> Result<()> {
        self.record(DriverCall::ServoEnable { channel: channel.id(), enabled });
        Ok(())
    }

    async fn set_angle(&mut self, channel: ServoChannel, degrees: i32) -> Result<()> {
        if self.fail_set_angle.load(Ordering::SeqCst) {
            return Err(RelayError::hardware(format!(
                "set_angle(channel {}, {} degrees)",
                channel.id(),
                degrees
            )));
        }
        self.record(DriverCall::SetAngle { channel: channel.id(), degrees });
        Ok(())
    }

    async fn set_pixel(&mut self, index: u8, color: Rgbw) -> Result<()> {
        self.record(DriverCall::SetPixel { index, color });
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.record(DriverCall::Clear);
        Ok(())
    }

    async fn show(&mut self) -> Result<()> {
        self.record(DriverCall::Show);
        Ok(())
    }
}
