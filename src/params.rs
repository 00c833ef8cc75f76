// src/params.rs

//! Engine parameters and the control-mapping table. Control surfaces hand
//! us normalized [0, 1] values; the table maps them onto each parameter's
//! engineering range and stores the result in a shared atomic.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Scaler for storing float values in atomics.
pub const PARAM_SCALER: f32 = 1_000_000.0;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum ControllableParameter {
    DryWet,
    InputGain,
    MasterVolume,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCurve {
    Linear,
    Exponential,
}

/// One row of the control-mapping table: where a normalized [0, 1] control
/// value lands in the parameter's engineering range.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ParamSpec {
    pub parameter: ControllableParameter,
    pub min: f32,
    pub max: f32,
    pub curve: ControlCurve,
}

impl ParamSpec {
    pub fn apply(&self, normalized: f32) -> f32 {
        let t = normalized.clamp(0.0, 1.0);
        let shaped = match self.curve {
            ControlCurve::Linear => t,
            ControlCurve::Exponential => t * t,
        };
        self.min + (self.max - self.min) * shaped
    }
}

static PARAM_SPECS: Lazy<Vec<ParamSpec>> = Lazy::new(|| {
    vec![
        ParamSpec {
            parameter: ControllableParameter::DryWet,
            min: 0.0,
            max: 1.0,
            curve: ControlCurve::Linear,
        },
        ParamSpec {
            parameter: ControllableParameter::InputGain,
            min: 0.0,
            max: 2.0,
            curve: ControlCurve::Linear,
        },
        ParamSpec {
            parameter: ControllableParameter::MasterVolume,
            min: 0.0,
            max: 1.5,
            curve: ControlCurve::Exponential,
        },
    ]
});

pub fn spec_for(parameter: ControllableParameter) -> ParamSpec {
    PARAM_SPECS
        .iter()
        .copied()
        .find(|s| s.parameter == parameter)
        .unwrap_or(ParamSpec {
            parameter,
            min: 0.0,
            max: 1.0,
            curve: ControlCurve::Linear,
        })
}

/// Shared, automatable engine parameters. Control threads write, the audio
/// thread reads and smooths.
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub dry_wet: Arc<AtomicU32>,
    pub input_gain: Arc<AtomicU32>,
    pub master_volume: Arc<AtomicU32>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            dry_wet: Arc::new(AtomicU32::new((0.5 * PARAM_SCALER) as u32)),
            input_gain: Arc::new(AtomicU32::new((1.0 * PARAM_SCALER) as u32)),
            master_volume: Arc::new(AtomicU32::new((1.0 * PARAM_SCALER) as u32)),
        }
    }
}

impl EngineParams {
    fn atomic_for(&self, parameter: ControllableParameter) -> &Arc<AtomicU32> {
        match parameter {
            ControllableParameter::DryWet => &self.dry_wet,
            ControllableParameter::InputGain => &self.input_gain,
            ControllableParameter::MasterVolume => &self.master_volume,
        }
    }

    pub fn set(&self, parameter: ControllableParameter, value: f32) {
        self.atomic_for(parameter)
            .store((value.max(0.0) * PARAM_SCALER) as u32, Ordering::Relaxed);
    }

    pub fn get(&self, parameter: ControllableParameter) -> f32 {
        self.atomic_for(parameter).load(Ordering::Relaxed) as f32 / PARAM_SCALER
    }

    /// Runs a normalized control value through the mapping table straight
    /// into the parameter's atomic.
    pub fn set_normalized(&self, parameter: ControllableParameter, normalized: f32) {
        self.set(parameter, spec_for(parameter).apply(normalized));
    }
}

/// One-pole smoother that eases parameter jumps to prevent clicks.
#[derive(Debug)]
pub struct ParamSmoother {
    current: f32,
    coeff: f32,
}

const SMOOTHING_COEFF: f32 = 0.9995; // Tune for responsiveness vs. artifacts

impl ParamSmoother {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            coeff: SMOOTHING_COEFF,
        }
    }

    #[inline]
    pub fn next(&mut self, target: f32) -> f32 {
        self.current = self.coeff * self.current + (1.0 - self.coeff) * target;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_hits_both_endpoints() {
        let spec = spec_for(ControllableParameter::InputGain);
        assert_eq!(spec.apply(0.0), 0.0);
        assert_eq!(spec.apply(1.0), 2.0);
        assert!((spec.apply(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn exponential_curve_is_monotonic_and_bounded() {
        let spec = spec_for(ControllableParameter::MasterVolume);
        assert_eq!(spec.apply(0.0), 0.0);
        assert!((spec.apply(1.0) - 1.5).abs() < 1e-6);

        let mut prev = -1.0;
        for i in 0..=100 {
            let v = spec.apply(i as f32 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn apply_clamps_out_of_range_input() {
        let spec = spec_for(ControllableParameter::DryWet);
        assert_eq!(spec.apply(-0.5), 0.0);
        assert_eq!(spec.apply(2.0), 1.0);
    }

    #[test]
    fn params_round_trip_through_atomics() {
        let params = EngineParams::default();
        params.set(ControllableParameter::DryWet, 0.3);
        assert!((params.get(ControllableParameter::DryWet) - 0.3).abs() < 1e-5);

        params.set_normalized(ControllableParameter::InputGain, 0.25);
        assert!((params.get(ControllableParameter::InputGain) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn smoother_converges_to_target() {
        let mut smoother = ParamSmoother::new(0.0);
        let mut value = 0.0;
        for _ in 0..20_000 {
            value = smoother.next(1.0);
        }
        assert!((value - 1.0).abs() < 1e-3);

        // And it never overshoots on the way up.
        let mut smoother = ParamSmoother::new(0.0);
        let mut prev = 0.0;
        for _ in 0..1000 {
            let v = smoother.next(1.0);
            assert!(v >= prev && v <= 1.0);
            prev = v;
        }
    }
}
