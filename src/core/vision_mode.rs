//! Color filters applied to captured frames before detection.

use crate::collector::types::Frame;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisionMode {
    #[default]
    Normal,
    /// Grey level mapped onto a red/orange ramp
    Infrared,
    /// Grey level mapped onto a green ramp
    NightVision,
}

impl VisionMode {
    pub const ALL: [VisionMode; 3] = [
        VisionMode::Normal,
        VisionMode::Infrared,
        VisionMode::NightVision,
    ];

    /// Filter a frame. `Normal` returns a cheap clone of the input.
    pub fn apply(self, frame: &Frame) -> Frame {
        let ramp: fn(f32) -> (f32, f32, f32) = match self {
            VisionMode::Normal => return frame.clone(),
            VisionMode::Infrared => |v| (v, v * 0.3, 0.0),
            VisionMode::NightVision => |v| (v * 0.5, v, v * 0.5),
        };

        let mut pixels = frame.pixels().to_vec();
        for px in pixels.chunks_exact_mut(4) {
            let v = (f32::from(px[0]) + f32::from(px[1]) + f32::from(px[2])) / 3.0;
            let (r, g, b) = ramp(v);
            px[0] = r as u8;
            px[1] = g as u8;
            px[2] = b as u8;
        }

        match Frame::with_timestamp(frame.timestamp, frame.width(), frame.height(), pixels) {
            Ok(filtered) => filtered,
            // Same dimensions as an already-valid frame
            Err(_) => frame.clone(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisionMode::Normal => "normal",
            VisionMode::Infrared => "infrared",
            VisionMode::NightVision => "night_vision",
        }
    }
}

impl FromStr for VisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(VisionMode::Normal),
            "infrared" | "infra" => Ok(VisionMode::Infrared),
            "night_vision" | "nightvision" | "nv" => Ok(VisionMode::NightVision),
            other => Err(format!("unknown vision mode: {other}")),
        }
    }
}
