//! Multi-threshold posterization: layered traces over one image

use std::path::Path;

use image::DynamicImage;
use log::{debug, warn};

use crate::error::TraceResult;
use crate::geometry::DPoint;
use crate::histogram::Histogram;
use crate::luminance::LuminanceData;
use crate::params::{
    FillStrategy, ParamsPatch, PosterizerParams, PosterizerParamsPatch, RangeDistribution, Steps,
    COLOR_AUTO, COLOR_TRANSPARENT, STEPS_AUTO, THRESHOLD_AUTO,
};
use crate::potrace::Potrace;
use crate::progress::Progress;
use crate::svg;

// widest residual luminance range tolerated without inserting an extra
// color stop to preserve dark/bright detail
const EXTRA_STOP_RANGE: i32 = 25;

// beyond this many layers the simple cascade accumulates visible rounding,
// so absolute per-layer opacities are used instead
const CASCADE_LAYER_LIMIT: usize = 10;

/// One posterization layer: a threshold and its target fill intensity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub value: u8,
    pub color_intensity: f64,
}

/// Runs the tracer at several luminance thresholds and stacks the results
/// back-to-front as semi-transparent layers.
#[derive(Debug, Default)]
pub struct Posterizer {
    potrace: Potrace,
    params: PosterizerParams,
    calculated_threshold: Option<u8>,
}

impl Posterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &PosterizerParams {
        &self.params
    }

    /// Validate and merge a parameter patch
    pub fn set_parameters(&mut self, patch: &PosterizerParamsPatch) -> TraceResult<()> {
        patch.validate()?;
        self.potrace.set_parameters(&patch.trace_patch())?;
        patch.trace_patch().apply(&mut self.params.trace);
        patch.apply_posterizer_keys(&mut self.params);
        self.calculated_threshold = None;
        Ok(())
    }

    pub fn load_image(&mut self, image: &DynamicImage) {
        self.potrace.load_image(image);
        self.calculated_threshold = None;
    }

    pub fn load_image_from_path(&mut self, path: &Path) -> TraceResult<()> {
        self.potrace.load_image_from_path(path)?;
        self.calculated_threshold = None;
        Ok(())
    }

    pub fn load_luminance(&mut self, luminance: LuminanceData) {
        self.potrace.load_luminance(luminance);
        self.calculated_threshold = None;
    }

    fn histogram(&self) -> TraceResult<Histogram> {
        Ok(Histogram::from_luminance(self.potrace.luminance_data()?))
    }

    /// The top threshold: the configured one, or a two-level histogram
    /// split picking the side the layers will come from
    fn param_threshold(&mut self) -> TraceResult<u8> {
        if let Some(threshold) = self.calculated_threshold {
            return Ok(threshold);
        }
        let threshold = if self.params.trace.threshold != THRESHOLD_AUTO {
            self.params.trace.threshold as u8
        } else {
            let histogram = self.histogram()?;
            let two = histogram.multilevel_thresholds(2, 0, 255);
            let pick = if self.params.trace.black_on_white {
                two.get(1)
            } else {
                two.first()
            };
            pick.copied().unwrap_or(128)
        };
        self.calculated_threshold = Some(threshold);
        Ok(threshold)
    }

    /// Number of layers the current parameters ask for
    fn steps_count(&mut self) -> TraceResult<usize> {
        match &self.params.steps {
            Steps::List(values) => Ok(values.len()),
            Steps::Count(count) => {
                let count = *count;
                if count == STEPS_AUTO && self.params.trace.threshold == THRESHOLD_AUTO {
                    return Ok(4);
                }
                let threshold = self.param_threshold()? as i32;
                let colors_available = if self.params.trace.black_on_white {
                    threshold
                } else {
                    255 - threshold
                };
                let steps = if count == STEPS_AUTO {
                    if colors_available > 200 {
                        4
                    } else {
                        3
                    }
                } else {
                    count.max(2).min(colors_available)
                };
                Ok(steps.max(1) as usize)
            }
        }
    }

    /// The ordered color stops for the current parameters, widest layer
    /// first
    pub fn color_stops(&mut self) -> TraceResult<Vec<ColorStop>> {
        if let Steps::List(values) = &self.params.steps {
            let explicit: Vec<u8> = values.iter().map(|&v| v as u8).collect();
            return self.ranges_explicit(explicit);
        }
        match self.params.range_distribution {
            RangeDistribution::Auto => self.ranges_auto(),
            RangeDistribution::Equal => self.ranges_equal(),
        }
    }

    fn ranges_explicit(&mut self, mut stops: Vec<u8>) -> TraceResult<Vec<ColorStop>> {
        let black_on_white = self.params.trace.black_on_white;
        let threshold = self.param_threshold()?;

        if black_on_white {
            stops.sort_unstable_by(|a, b| b.cmp(a));
            if stops.first().is_some_and(|&top| top < threshold) {
                stops.insert(0, threshold);
            }
        } else {
            stops.sort_unstable();
            if stops.last().is_some_and(|&top| top < threshold) {
                stops.push(threshold);
            }
        }
        self.color_intensities(stops)
    }

    fn ranges_auto(&mut self) -> TraceResult<Vec<ColorStop>> {
        let steps = self.steps_count()? as u32;
        let black_on_white = self.params.trace.black_on_white;
        let histogram = self.histogram()?;

        let mut stops = if self.params.trace.threshold == THRESHOLD_AUTO {
            histogram.multilevel_thresholds(steps, 0, 255)
        } else {
            let threshold = self.param_threshold()?;
            let mut inner = if black_on_white {
                histogram.multilevel_thresholds(steps.saturating_sub(1), 0, threshold)
            } else {
                histogram.multilevel_thresholds(steps.saturating_sub(1), threshold, 255)
            };
            if black_on_white {
                inner.push(threshold);
            } else {
                inner.insert(0, threshold);
            }
            inner
        };

        if black_on_white {
            stops.reverse();
        }
        let mut ranges = self.color_intensities(stops)?;
        self.add_extra_color_stop(&mut ranges)?;
        Ok(ranges)
    }

    fn ranges_equal(&mut self) -> TraceResult<Vec<ColorStop>> {
        let black_on_white = self.params.trace.black_on_white;
        let threshold = self.param_threshold()? as f64;
        let colors_to_threshold = if black_on_white {
            threshold
        } else {
            255.0 - threshold
        };
        let steps = self.steps_count()?;
        let step_size = colors_to_threshold / steps as f64;

        let mut stops = Vec::with_capacity(steps);
        for i in (0..steps).rev() {
            let mut value = ((i + 1) as f64 * step_size).min(colors_to_threshold);
            if !black_on_white {
                value = 255.0 - value;
            }
            stops.push(value.round() as u8);
        }
        self.color_intensities(stops)
    }

    /// Compute each stop's target intensity per the fill strategy.
    ///
    /// The segment a stop colors runs from the previous stop (exclusive) to
    /// the stop itself, toward the traced extreme.
    fn color_intensities(&mut self, mut stops: Vec<u8>) -> TraceResult<Vec<ColorStop>> {
        // builders keep stops ordered; a duplicate can only appear right at
        // the threshold boundary
        stops.dedup();
        let black_on_white = self.params.trace.black_on_white;
        let strategy = self.params.fill_strategy;
        let count = stops.len();
        let mut histogram = self.histogram()?;

        let mut ranges = Vec::with_capacity(count);
        for (index, &value) in stops.iter().enumerate() {
            if strategy == FillStrategy::Spread {
                // evenly spread intensities; the narrowest (last) layer
                // reaches full saturation
                ranges.push(ColorStop {
                    value,
                    color_intensity: (index + 1) as f64 / count as f64,
                });
                continue;
            }

            let next: i32 = if index + 1 == count {
                if black_on_white {
                    -1
                } else {
                    256
                }
            } else {
                stops[index + 1] as i32
            };
            let range_start = if black_on_white { (next + 1) as u8 } else { value };
            let range_end = if black_on_white { value } else { (next - 1) as u8 };
            let interval_size = range_end as i32 - range_start as i32;

            let stats = histogram.stats(range_start, range_end);
            if stats.pixels == 0 {
                ranges.push(ColorStop {
                    value,
                    color_intensity: 0.0,
                });
                continue;
            }

            let grey = match strategy {
                FillStrategy::Dominant => histogram
                    .dominant_color(range_start, range_end, interval_size.clamp(1, 5) as u8)
                    .map(|g| g as f64),
                FillStrategy::Mean => Some(stats.mean),
                FillStrategy::Median => Some(stats.median as f64),
                FillStrategy::Spread => unreachable!(),
            };

            let color_intensity = match grey {
                None => 0.0,
                Some(mut grey) => {
                    // keep adjacent layers from collapsing onto each other
                    if index != 0 {
                        let spacing = (interval_size as f64 * 0.1).round();
                        grey = if black_on_white {
                            grey.clamp(range_start as f64, range_end as f64 - spacing)
                        } else {
                            grey.clamp(range_start as f64 + spacing, range_end as f64)
                        };
                    }
                    if black_on_white {
                        (255.0 - grey) / 255.0
                    } else {
                        grey / 255.0
                    }
                }
            };

            ranges.push(ColorStop {
                value,
                color_intensity,
            });
        }
        Ok(ranges)
    }

    /// When the final layer still spans a wide luminance range, add one
    /// more stop near the traced extreme so dark (or bright) detail
    /// survives. Skipped for explicit step lists.
    fn add_extra_color_stop(&mut self, ranges: &mut Vec<ColorStop>) -> TraceResult<()> {
        let black_on_white = self.params.trace.black_on_white;
        let Some(last) = ranges.last().copied() else {
            return Ok(());
        };
        let (from, to) = if black_on_white {
            (0u8, last.value)
        } else {
            (last.value, 255u8)
        };
        if to as i32 - from as i32 <= EXTRA_STOP_RANGE || last.color_intensity == 1.0 {
            return Ok(());
        }

        let mut histogram = self.histogram()?;
        let stats = histogram.stats(from, to);
        if stats.pixels == 0 {
            return Ok(());
        }

        // distance of the candidate level from the traced extreme
        let mean_offset = if black_on_white {
            stats.mean
        } else {
            255.0 - stats.mean
        };
        let offset = if mean_offset + stats.std_dev <= EXTRA_STOP_RANGE as f64 {
            mean_offset + stats.std_dev
        } else if mean_offset - stats.std_dev <= EXTRA_STOP_RANGE as f64 {
            mean_offset - stats.std_dev
        } else {
            EXTRA_STOP_RANGE as f64
        };
        let offset = offset.clamp(0.0, 255.0);
        let new_stop = if black_on_white {
            offset.round() as u8
        } else {
            255 - offset.round() as u8
        };

        let tail = if black_on_white {
            histogram.stats(0, new_stop)
        } else {
            histogram.stats(new_stop, 255)
        };
        let color_intensity = if tail.pixels == 0 {
            0.0
        } else if black_on_white {
            (255.0 - tail.mean) / 255.0
        } else {
            tail.mean / 255.0
        };

        debug!("added extra color stop at {new_stop} (intensity {color_intensity:.3})");
        ranges.push(ColorStop {
            value: new_stop,
            color_intensity,
        });
        Ok(())
    }

    fn resolved_fill(&self) -> String {
        let color = &self.potrace.params().color;
        if color == COLOR_AUTO {
            if self.params.trace.black_on_white {
                "black"
            } else {
                "white"
            }
            .to_string()
        } else {
            color.clone()
        }
    }

    /// One `<path>` element per surviving layer, widest first
    fn path_tags(
        &mut self,
        with_fill: bool,
        scale: DPoint,
        progress: &mut Progress<'_>,
    ) -> TraceResult<Vec<String>> {
        let ranges = self.color_stops()?;
        let fill = self.resolved_fill();
        let cascade = ranges.len() <= CASCADE_LAYER_LIMIT;
        let total = ranges.len().max(1) as f64;

        let mut tags = Vec::new();
        let mut accumulated = 0.0f64;
        for (index, stop) in ranges.iter().enumerate() {
            let mut layer_progress =
                progress.subrange(index as f64 / total, (index + 1) as f64 / total);
            let target = stop.color_intensity;
            if target == 0.0 {
                continue;
            }

            let opacity = if cascade {
                // each layer adds just enough cover for the region it is
                // the last to paint to reach its target intensity
                let raw = if accumulated == 0.0 || target == 1.0 {
                    target
                } else {
                    (accumulated - target) / (accumulated - 1.0)
                };
                let raw = ((raw * 1000.0).round() / 1000.0).clamp(0.0, 1.0);
                accumulated += (1.0 - accumulated) * raw;
                raw
            } else {
                // many layers: absolute opacities avoid cascade rounding at
                // the cost of slightly brightened overlaps
                target
            };
            if opacity == 0.0 {
                continue;
            }

            self.potrace.set_parameters(&ParamsPatch {
                threshold: Some(stop.value as i32),
                ..Default::default()
            })?;
            self.potrace.trace_with_progress(&mut layer_progress)?;
            let d = self.potrace.path_data(Some(scale))?;
            let fill = with_fill.then_some(fill.as_str());
            tags.push(svg::path_tag(&d, fill, Some(opacity)));
        }

        if tags.is_empty() {
            warn!("posterization produced no layers");
        }
        Ok(tags)
    }

    /// A complete layered SVG document
    pub fn get_svg(&mut self) -> TraceResult<String> {
        self.get_svg_with_progress(&mut Progress::none())
    }

    /// As [`Posterizer::get_svg`], reporting progress across layers
    pub fn get_svg_with_progress(&mut self, progress: &mut Progress<'_>) -> TraceResult<String> {
        let (width, height, scale) = self.potrace.output_dimensions()?;
        let background = self.potrace.params().background.clone();
        let tags = self.path_tags(true, scale, progress)?;
        let background = (background != COLOR_TRANSPARENT).then_some(background);
        Ok(svg::document(
            width,
            height,
            background.as_deref(),
            &tags.join("\n\t"),
        ))
    }

    /// The layered trace wrapped in a `<symbol>`, without fill colors
    pub fn get_symbol(&mut self, id: &str) -> TraceResult<String> {
        let luminance = self.potrace.luminance_data()?;
        let (width, height) = (luminance.width(), luminance.height());
        let tags = self.path_tags(false, DPoint::new(1.0, 1.0), &mut Progress::none())?;
        Ok(svg::symbol(id, width, height, &tags.join("")))
    }
}
