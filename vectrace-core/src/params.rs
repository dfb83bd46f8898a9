//! Tracing and posterization parameters with eager validation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};

/// Sentinel for "pick the threshold from the histogram"
pub const THRESHOLD_AUTO: i32 = -1;
/// Sentinel for "pick the number of posterization steps automatically"
pub const STEPS_AUTO: i32 = -1;

pub const COLOR_AUTO: &str = "auto";
pub const COLOR_TRANSPARENT: &str = "transparent";

/// Rule selecting the outgoing direction at an ambiguous 2x2 pixel
/// configuration during contour tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TurnPolicy {
    Black,
    White,
    Left,
    Right,
    #[default]
    Minority,
    Majority,
}

impl TurnPolicy {
    /// Numeric wire value
    pub const fn value(self) -> u8 {
        match self {
            TurnPolicy::Black => 0,
            TurnPolicy::White => 1,
            TurnPolicy::Left => 2,
            TurnPolicy::Right => 3,
            TurnPolicy::Minority => 4,
            TurnPolicy::Majority => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TurnPolicy::Black => "black",
            TurnPolicy::White => "white",
            TurnPolicy::Left => "left",
            TurnPolicy::Right => "right",
            TurnPolicy::Minority => "minority",
            TurnPolicy::Majority => "majority",
        }
    }
}

impl fmt::Display for TurnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnPolicy {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "black" => Ok(TurnPolicy::Black),
            "white" => Ok(TurnPolicy::White),
            "left" => Ok(TurnPolicy::Left),
            "right" => Ok(TurnPolicy::Right),
            "minority" => Ok(TurnPolicy::Minority),
            "majority" => Ok(TurnPolicy::Majority),
            other => Err(TraceError::invalid_parameter(format!(
                "unknown turn policy \"{other}\""
            ))),
        }
    }
}

/// How the posterizer picks each layer's fill intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FillStrategy {
    #[default]
    Dominant,
    Mean,
    Median,
    Spread,
}

impl FillStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            FillStrategy::Dominant => "dominant",
            FillStrategy::Mean => "mean",
            FillStrategy::Median => "median",
            FillStrategy::Spread => "spread",
        }
    }
}

impl FromStr for FillStrategy {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dominant" => Ok(FillStrategy::Dominant),
            "mean" => Ok(FillStrategy::Mean),
            "median" => Ok(FillStrategy::Median),
            "spread" => Ok(FillStrategy::Spread),
            other => Err(TraceError::invalid_parameter(format!(
                "unknown fill strategy \"{other}\""
            ))),
        }
    }
}

/// How the posterizer distributes thresholds over the traced range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RangeDistribution {
    #[default]
    Auto,
    Equal,
}

impl RangeDistribution {
    pub const fn as_str(self) -> &'static str {
        match self {
            RangeDistribution::Auto => "auto",
            RangeDistribution::Equal => "equal",
        }
    }
}

impl FromStr for RangeDistribution {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(RangeDistribution::Auto),
            "equal" => Ok(RangeDistribution::Equal),
            other => Err(TraceError::invalid_parameter(format!(
                "unknown range distribution \"{other}\""
            ))),
        }
    }
}

/// Posterizer steps: automatic, a layer count, or an explicit ascending
/// list of thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Steps {
    Count(i32),
    List(Vec<i32>),
}

impl Default for Steps {
    fn default() -> Self {
        Steps::Count(STEPS_AUTO)
    }
}

impl Steps {
    fn validate(&self) -> TraceResult<()> {
        match self {
            Steps::Count(n) => {
                if *n != STEPS_AUTO && !(1..=255).contains(n) {
                    return Err(TraceError::invalid_parameter(format!(
                        "steps must be {STEPS_AUTO} (auto) or in 1..=255, got {n}"
                    )));
                }
            }
            Steps::List(values) => {
                if values.is_empty() {
                    return Err(TraceError::invalid_parameter("steps list is empty"));
                }
                for pair in values.windows(2) {
                    if pair[1] <= pair[0] {
                        return Err(TraceError::invalid_parameter(format!(
                            "steps list must be strictly increasing, got {} after {}",
                            pair[1], pair[0]
                        )));
                    }
                }
                if let Some(bad) = values.iter().find(|v| !(0..=255).contains(*v)) {
                    return Err(TraceError::invalid_parameter(format!(
                        "steps entry {bad} outside 0..=255"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Tracing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Ambiguity rule during contour tracing
    pub turn_policy: TurnPolicy,

    /// Minimum enclosed area (pixels) a contour must have to be kept
    pub turd_size: u32,

    /// Corner threshold: smoothing parameters at or above it become corners
    pub alpha_max: f64,

    /// Whether to merge adjacent Bezier segments after smoothing
    pub opt_curve: bool,

    /// Maximum sampled deviation allowed when merging segments
    pub opt_tolerance: f64,

    /// Luminance threshold in 0..=255, or `THRESHOLD_AUTO`
    pub threshold: i32,

    /// Trace dark-on-light when true, light-on-dark when false
    pub black_on_white: bool,

    /// Fill color (CSS color or `COLOR_AUTO`)
    pub color: String,

    /// Background color (CSS color or `COLOR_TRANSPARENT`)
    pub background: String,

    /// Output width override; the path scales accordingly
    pub width: Option<u32>,

    /// Output height override; the path scales accordingly
    pub height: Option<u32>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            turn_policy: TurnPolicy::Minority,
            turd_size: 2,
            alpha_max: 1.0,
            opt_curve: true,
            opt_tolerance: 0.2,
            threshold: THRESHOLD_AUTO,
            black_on_white: true,
            color: COLOR_AUTO.to_string(),
            background: COLOR_TRANSPARENT.to_string(),
            width: None,
            height: None,
        }
    }
}

/// Partial update for [`Params`]; unknown keys are rejected when the patch
/// is deserialized (e.g. from a CLI config file)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ParamsPatch {
    pub turn_policy: Option<TurnPolicy>,
    pub turd_size: Option<u32>,
    pub alpha_max: Option<f64>,
    pub opt_curve: Option<bool>,
    pub opt_tolerance: Option<f64>,
    pub threshold: Option<i32>,
    pub black_on_white: Option<bool>,
    pub color: Option<String>,
    pub background: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ParamsPatch {
    pub(crate) fn validate(&self) -> TraceResult<()> {
        if let Some(alpha_max) = self.alpha_max {
            if !alpha_max.is_finite() || alpha_max < 0.0 {
                return Err(TraceError::invalid_parameter(format!(
                    "alpha_max must be finite and >= 0, got {alpha_max}"
                )));
            }
        }
        if let Some(tol) = self.opt_tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(TraceError::invalid_parameter(format!(
                    "opt_tolerance must be finite and >= 0, got {tol}"
                )));
            }
        }
        if let Some(threshold) = self.threshold {
            if threshold != THRESHOLD_AUTO && !(0..=255).contains(&threshold) {
                return Err(TraceError::invalid_parameter(format!(
                    "threshold must be {THRESHOLD_AUTO} (auto) or in 0..=255, got {threshold}"
                )));
            }
        }
        if let Some(color) = &self.color {
            if color.is_empty() {
                return Err(TraceError::invalid_parameter("color is empty"));
            }
        }
        if let Some(background) = &self.background {
            if background.is_empty() {
                return Err(TraceError::invalid_parameter("background is empty"));
            }
        }
        if self.width == Some(0) {
            return Err(TraceError::invalid_parameter("width must be positive"));
        }
        if self.height == Some(0) {
            return Err(TraceError::invalid_parameter("height must be positive"));
        }
        Ok(())
    }

    /// Merge into `params`, returning whether a trace-affecting key changed
    pub(crate) fn apply(&self, params: &mut Params) -> bool {
        let mut invalidates = false;

        if let Some(value) = self.turn_policy {
            invalidates |= params.turn_policy != value;
            params.turn_policy = value;
        }
        if let Some(value) = self.turd_size {
            invalidates |= params.turd_size != value;
            params.turd_size = value;
        }
        if let Some(value) = self.alpha_max {
            invalidates |= params.alpha_max != value;
            params.alpha_max = value;
        }
        if let Some(value) = self.opt_curve {
            invalidates |= params.opt_curve != value;
            params.opt_curve = value;
        }
        if let Some(value) = self.opt_tolerance {
            invalidates |= params.opt_tolerance != value;
            params.opt_tolerance = value;
        }
        if let Some(value) = self.threshold {
            invalidates |= params.threshold != value;
            params.threshold = value;
        }
        if let Some(value) = self.black_on_white {
            invalidates |= params.black_on_white != value;
            params.black_on_white = value;
        }
        if let Some(value) = &self.color {
            params.color = value.clone();
        }
        if let Some(value) = &self.background {
            params.background = value.clone();
        }
        if let Some(value) = self.width {
            params.width = Some(value);
        }
        if let Some(value) = self.height {
            params.height = Some(value);
        }

        invalidates
    }
}

/// Posterizer parameters: the tracing set plus layering controls
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PosterizerParams {
    #[serde(flatten)]
    pub trace: Params,
    pub steps: Steps,
    pub fill_strategy: FillStrategy,
    pub range_distribution: RangeDistribution,
}

/// Partial update for [`PosterizerParams`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PosterizerParamsPatch {
    pub turn_policy: Option<TurnPolicy>,
    pub turd_size: Option<u32>,
    pub alpha_max: Option<f64>,
    pub opt_curve: Option<bool>,
    pub opt_tolerance: Option<f64>,
    pub threshold: Option<i32>,
    pub black_on_white: Option<bool>,
    pub color: Option<String>,
    pub background: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub steps: Option<Steps>,
    pub fill_strategy: Option<FillStrategy>,
    pub range_distribution: Option<RangeDistribution>,
}

impl PosterizerParamsPatch {
    /// The tracing subset of the patch
    pub(crate) fn trace_patch(&self) -> ParamsPatch {
        ParamsPatch {
            turn_policy: self.turn_policy,
            turd_size: self.turd_size,
            alpha_max: self.alpha_max,
            opt_curve: self.opt_curve,
            opt_tolerance: self.opt_tolerance,
            threshold: self.threshold,
            black_on_white: self.black_on_white,
            color: self.color.clone(),
            background: self.background.clone(),
            width: self.width,
            height: self.height,
        }
    }

    pub(crate) fn validate(&self) -> TraceResult<()> {
        self.trace_patch().validate()?;
        if let Some(steps) = &self.steps {
            steps.validate()?;
        }
        Ok(())
    }

    /// Merge the posterizer-only keys, returning whether one changed
    pub(crate) fn apply_posterizer_keys(&self, params: &mut PosterizerParams) -> bool {
        let mut changed = false;
        if let Some(steps) = &self.steps {
            if params.steps != *steps {
                changed = true;
            }
            params.steps = steps.clone();
        }
        if let Some(strategy) = self.fill_strategy {
            if params.fill_strategy != strategy {
                changed = true;
            }
            params.fill_strategy = strategy;
        }
        if let Some(distribution) = self.range_distribution {
            if params.range_distribution != distribution {
                changed = true;
            }
            params.range_distribution = distribution;
        }
        changed
    }
}
