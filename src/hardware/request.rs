//! Typed hardware requests parsed from control-plane query strings.
//!
//! Parsing is all-or-nothing: a request either validates completely or is
//! rejected with the first offending field, before any hardware mutation.

use super::{PIXEL_COUNT, Rgbw, WILDCARD_INDEX};
use crate::{RelayError, Result};

/// A validated orientation command, in request-frame degrees.
///
/// Degrees are sign-inverted by the controller before being issued to the
/// mount, so positive pan in the request turns the camera the way the page
/// expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrientationRequest {
    pub pan: Option<i32>,
    pub tilt: Option<i32>,
}

/// Largest angle accepted on either axis, in degrees.
pub const MAX_ANGLE: i32 = 180;

impl OrientationRequest {
    /// Parse from query pairs (`pan=<int>`, `tilt=<int>`, either or both).
    ///
    /// Keys other than `pan` and `tilt` are ignored. The first malformed or
    /// out-of-range value rejects the whole request; angles are bounded to
    /// [`MAX_ANGLE`] degrees either way.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = OrientationRequest::default();
        for (key, value) in pairs {
            let slot = match key {
                "pan" => &mut request.pan,
                "tilt" => &mut request.tilt,
                _ => continue,
            };
            let degrees: i32 = value
                .parse()
                .map_err(|_| RelayError::bad_request(key, format!("'{value}' is not an integer")))?;
            if !(-MAX_ANGLE..=MAX_ANGLE).contains(&degrees) {
                return Err(RelayError::bad_request(
                    key,
                    format!("'{value}' is outside the -{MAX_ANGLE}..{MAX_ANGLE} degree range"),
                ));
            }
            *slot = Some(degrees);
        }
        Ok(request)
    }
}

/// A validated, fully-resolved light command: one optional color per pixel.
///
/// The wildcard index (`-1`) has already been expanded across all pixels,
/// with explicitly-addressed pixels taking precedence. Indices outside the
/// strip were dropped during parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightRequest {
    pixels: [Option<Rgbw>; PIXEL_COUNT],
}

impl LightRequest {
    /// Parse from query pairs of the form `<index>=<r>,<g>,<b>,<w>`.
    ///
    /// Every key must parse as an integer and every value as exactly four
    /// 8-bit channels, including entries that will later be dropped as out of
    /// range; any failure rejects the whole request.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut wildcard = None;
        let mut explicit = [None; PIXEL_COUNT];

        for (key, value) in pairs {
            let index: i32 = key
                .parse()
                .map_err(|_| RelayError::bad_request(key, "pixel index is not an integer"))?;
            let color = parse_color(key, value)?;

            if index == WILDCARD_INDEX {
                wildcard = Some(color);
            } else if (0..PIXEL_COUNT as i32).contains(&index) {
                explicit[index as usize] = Some(color);
            }
            // Other indices are outside the strip: validated but dropped.
        }

        let mut pixels = [wildcard; PIXEL_COUNT];
        for (slot, overridden) in pixels.iter_mut().zip(explicit) {
            if overridden.is_some() {
                *slot = overridden;
            }
        }
        Ok(Self { pixels })
    }

    /// Resolved `(index, color)` entries in strip order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, Rgbw)> + '_ {
        self.pixels
            .iter()
            .enumerate()
            .filter_map(|(index, color)| color.map(|c| (index as u8, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.iter().all(Option::is_none)
    }
}

fn parse_color(key: &str, value: &str) -> Result<Rgbw> {
    let mut channels = [0u8; 4];
    let mut parts = value.split(',');
    for channel in &mut channels {
        let part = parts
            .next()
            .ok_or_else(|| RelayError::bad_request(key, format!("'{value}' is not r,g,b,w")))?;
        *channel = part.parse().map_err(|_| {
            RelayError::bad_request(key, format!("'{part}' is not an 8-bit channel value"))
        })?;
    }
    if parts.next().is_some() {
        return Err(RelayError::bad_request(key, format!("'{value}' has more than 4 channels")));
    }
    Ok(Rgbw::new(channels[0], channels[1], channels[2], channels[3]))
}
