//! Named numeric parameters and the flat settings object a host supplies.
//!
//! Every algorithm declares its tunables as [`ParamSpec`] tables with bounds,
//! default and slider step. A UI renders sliders from the tables; the
//! algorithms only ever see resolved numbers.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Metadata for one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
}

impl ParamSpec {
    pub const fn new(
        name: &'static str,
        label: &'static str,
        min: f64,
        max: f64,
        default: f64,
        step: f64,
    ) -> Self {
        Self {
            name,
            label,
            min,
            max,
            default,
            step,
        }
    }
}

/// Flat settings object: parameter values by name plus the few non-numeric options.
///
/// Serialized as a single JSON object, e.g.
/// `{"repulsiveStrength": 80, "seed": 7}` or `{"hub": "channel-42"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Explicit hub node id for the spherical layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub: Option<String>,

    /// Seed for the initial scatter. `None` seeds from entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_hub(mut self, hub: impl Into<String>) -> Self {
        self.hub = Some(hub.into());
        self
    }

    /// Value for `spec`: the supplied number clamped into bounds, or the default.
    pub fn value(&self, spec: &ParamSpec) -> Result<f64> {
        let Some(&value) = self.values.get(spec.name) else {
            return Ok(spec.default);
        };
        if !value.is_finite() {
            return Err(Error::InvalidSetting {
                name: spec.name.to_string(),
                value,
            });
        }
        let clamped = value.clamp(spec.min, spec.max);
        if clamped != value {
            warn!(
                name = spec.name,
                value,
                clamped,
                "setting outside [{}, {}]",
                spec.min,
                spec.max
            );
        }
        Ok(clamped)
    }

    /// Log names that none of `specs` declares.
    pub fn report_unknown(&self, specs: &[ParamSpec]) {
        for name in self.values.keys() {
            if !specs.iter().any(|s| s.name == name) {
                debug!(name = name.as_str(), "ignoring unknown setting");
            }
        }
    }

    /// Random source for initial scatter and tie-breaking.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
