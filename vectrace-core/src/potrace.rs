//! The tracing engine's object API

use std::path::Path;

use image::DynamicImage;
use log::{debug, info};

use crate::algorithms::decompose::bitmap_to_pathlist;
use crate::algorithms::pipeline::process_paths;
use crate::curve::Curve;
use crate::error::{TraceError, TraceResult};
use crate::geometry::DPoint;
use crate::histogram::Histogram;
use crate::luminance::LuminanceData;
use crate::params::{Params, ParamsPatch, COLOR_AUTO, COLOR_TRANSPARENT, THRESHOLD_AUTO};
use crate::path::TracedPath;
use crate::progress::Progress;
use crate::svg;

#[derive(Debug)]
struct TraceData {
    pathlist: Vec<TracedPath>,
    curves: Vec<Curve>,
    threshold: u8,
}

/// Raster-to-vector tracer.
///
/// Load an image, adjust parameters, then render; tracing runs lazily on
/// the first render and is cached until a trace-affecting parameter or the
/// image changes.
///
/// ```
/// use vectrace_core::{Potrace, ParamsPatch};
///
/// let mut potrace = Potrace::new();
/// potrace.set_parameters(&ParamsPatch {
///     threshold: Some(128),
///     ..ParamsPatch::default()
/// })?;
/// potrace.load_luminance_grid(2, 2, vec![0, 255, 255, 0]);
/// let svg = potrace.get_svg()?;
/// assert!(svg.starts_with("<svg"));
/// # Ok::<(), vectrace_core::TraceError>(())
/// ```
#[derive(Debug, Default)]
pub struct Potrace {
    params: Params,
    luminance: Option<LuminanceData>,
    trace: Option<TraceData>,
}

impl Potrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current canonical parameter values
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Validate and merge a parameter patch. Changing a trace-affecting
    /// key drops the cached trace; the next render recomputes.
    pub fn set_parameters(&mut self, patch: &ParamsPatch) -> TraceResult<()> {
        patch.validate()?;
        if patch.apply(&mut self.params) {
            self.trace = None;
        }
        Ok(())
    }

    /// Load a decoded image, reducing it to a luminance grid
    pub fn load_image(&mut self, image: &DynamicImage) {
        self.luminance = Some(LuminanceData::from_image(image));
        self.trace = None;
    }

    /// Decode an image file and load it
    pub fn load_image_from_path(&mut self, path: &Path) -> TraceResult<()> {
        let image = image::open(path)?;
        info!(
            "loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.load_image(&image);
        Ok(())
    }

    /// Load a raw luminance grid directly
    pub fn load_luminance(&mut self, luminance: LuminanceData) {
        self.luminance = Some(luminance);
        self.trace = None;
    }

    /// Convenience wrapper over [`Potrace::load_luminance`]
    pub fn load_luminance_grid(&mut self, width: u32, height: u32, data: Vec<u8>) {
        self.load_luminance(LuminanceData::new(width, height, data));
    }

    pub fn image_loaded(&self) -> bool {
        self.luminance.is_some()
    }

    pub(crate) fn luminance_data(&self) -> TraceResult<&LuminanceData> {
        self.luminance.as_ref().ok_or(TraceError::UnloadedImage)
    }

    /// The threshold tracing will use: the configured one, or the
    /// histogram's automatic pick
    pub fn resolved_threshold(&self) -> TraceResult<u8> {
        let luminance = self.luminance_data()?;
        if self.params.threshold == THRESHOLD_AUTO {
            let histogram = Histogram::from_luminance(luminance);
            Ok(histogram.auto_threshold(0, 255).unwrap_or(128))
        } else {
            Ok(self.params.threshold as u8)
        }
    }

    /// Force the trace now, reporting progress synchronously
    pub fn trace_with_progress(&mut self, progress: &mut Progress<'_>) -> TraceResult<()> {
        if self.trace.is_some() {
            progress.report(1.0);
            return Ok(());
        }
        let threshold = self.resolved_threshold()?;
        let luminance = self.luminance_data()?;
        debug!(
            "tracing {}x{} at threshold {threshold} (black_on_white: {})",
            luminance.width(),
            luminance.height(),
            self.params.black_on_white
        );

        let bitmap = luminance.to_bitmap(threshold, self.params.black_on_white)?;
        let pathlist = {
            let mut decompose_progress = progress.subrange(0.0, 0.3);
            bitmap_to_pathlist(&bitmap, &self.params, &mut decompose_progress)?
        };
        let curves = {
            let mut pipeline_progress = progress.subrange(0.3, 1.0);
            process_paths(&pathlist, &self.params, &mut pipeline_progress)
        };

        self.trace = Some(TraceData {
            pathlist,
            curves,
            threshold,
        });
        Ok(())
    }

    fn ensure_traced(&mut self) -> TraceResult<&TraceData> {
        self.trace_with_progress(&mut Progress::none())?;
        Ok(self.trace.as_ref().unwrap())
    }

    /// Decomposed contour paths (traces first if needed)
    pub fn paths(&mut self) -> TraceResult<&[TracedPath]> {
        Ok(&self.ensure_traced()?.pathlist)
    }

    /// Final curves, one per contour (traces first if needed)
    pub fn curves(&mut self) -> TraceResult<&[Curve]> {
        Ok(&self.ensure_traced()?.curves)
    }

    /// The threshold the cached trace was produced with
    pub fn traced_threshold(&mut self) -> TraceResult<u8> {
        Ok(self.ensure_traced()?.threshold)
    }

    fn default_fill(&self) -> String {
        if self.params.color == COLOR_AUTO {
            if self.params.black_on_white { "black" } else { "white" }.to_string()
        } else {
            self.params.color.clone()
        }
    }

    pub(crate) fn output_dimensions(&self) -> TraceResult<(u32, u32, DPoint)> {
        let luminance = self.luminance_data()?;
        let width = self.params.width.unwrap_or(luminance.width());
        let height = self.params.height.unwrap_or(luminance.height());
        let scale = DPoint::new(
            width as f64 / luminance.width().max(1) as f64,
            height as f64 / luminance.height().max(1) as f64,
        );
        Ok((width, height, scale))
    }

    /// Path data (`d` attribute) of the full trace
    pub fn path_data(&mut self, scale: Option<DPoint>) -> TraceResult<String> {
        let scale = scale.unwrap_or(DPoint::new(1.0, 1.0));
        let trace = self.ensure_traced()?;
        Ok(svg::render_curves(&trace.curves, scale))
    }

    /// An SVG `<path>` element for the whole trace.
    ///
    /// `fill_color` overrides the configured color; `scale` multiplies
    /// every coordinate.
    pub fn get_path_tag(
        &mut self,
        fill_color: Option<&str>,
        scale: Option<DPoint>,
    ) -> TraceResult<String> {
        let fill = match fill_color {
            Some(color) => color.to_string(),
            None => self.default_fill(),
        };
        let d = self.path_data(scale)?;
        Ok(svg::path_tag(&d, Some(&fill), None))
    }

    /// The trace wrapped in a `<symbol>` carrying the pixel-space view box,
    /// with no fill or background of its own
    pub fn get_symbol(&mut self, id: &str) -> TraceResult<String> {
        let luminance = self.luminance_data()?;
        let (width, height) = (luminance.width(), luminance.height());
        let d = self.path_data(None)?;
        Ok(svg::symbol(id, width, height, &svg::path_tag(&d, None, None)))
    }

    /// A complete SVG document for the trace
    pub fn get_svg(&mut self) -> TraceResult<String> {
        let (width, height, scale) = self.output_dimensions()?;
        let background = (self.params.background != COLOR_TRANSPARENT)
            .then(|| self.params.background.clone());
        let tag = self.get_path_tag(None, Some(scale))?;
        Ok(svg::document(width, height, background.as_deref(), &tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TurnPolicy;

    fn white_grid(width: u32, height: u32) -> LuminanceData {
        LuminanceData::new(width, height, vec![255; (width * height) as usize])
    }

    #[test]
    fn test_render_before_load_fails() {
        let mut potrace = Potrace::new();
        assert!(matches!(
            potrace.get_svg(),
            Err(TraceError::UnloadedImage)
        ));
        assert!(matches!(
            potrace.get_path_tag(None, None),
            Err(TraceError::UnloadedImage)
        ));
        assert!(matches!(
            potrace.get_symbol("glyph"),
            Err(TraceError::UnloadedImage)
        ));
    }

    #[test]
    fn test_parameter_round_trip() {
        let mut potrace = Potrace::new();
        let patch = ParamsPatch {
            turn_policy: Some(TurnPolicy::Left),
            turd_size: Some(7),
            alpha_max: Some(0.8),
            threshold: Some(99),
            ..Default::default()
        };
        potrace.set_parameters(&patch).unwrap();
        assert_eq!(potrace.params().turn_policy, TurnPolicy::Left);
        assert_eq!(potrace.params().turd_size, 7);
        assert_eq!(potrace.params().alpha_max, 0.8);
        assert_eq!(potrace.params().threshold, 99);
    }

    #[test]
    fn test_invalid_parameters_leave_state_untouched() {
        let mut potrace = Potrace::new();
        let bad = ParamsPatch {
            threshold: Some(400),
            ..Default::default()
        };
        assert!(potrace.set_parameters(&bad).is_err());
        assert_eq!(potrace.params().threshold, THRESHOLD_AUTO);
    }

    #[test]
    fn test_parameter_change_invalidates_cache() {
        let mut potrace = Potrace::new();
        potrace.load_luminance(white_grid(4, 4));
        potrace.get_svg().unwrap();
        assert!(potrace.trace.is_some());

        // cosmetic change keeps the cache
        potrace
            .set_parameters(&ParamsPatch {
                color: Some("red".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(potrace.trace.is_some());

        potrace
            .set_parameters(&ParamsPatch {
                turd_size: Some(0),
                ..Default::default()
            })
            .unwrap();
        assert!(potrace.trace.is_none());
    }

    #[test]
    fn test_auto_threshold_on_flat_image_is_midrange() {
        let mut potrace = Potrace::new();
        potrace.load_luminance(white_grid(4, 4));
        // a flat histogram makes every split equally good; the plateau
        // midpoint keeps the pick centered
        assert_eq!(potrace.resolved_threshold().unwrap(), 127);
    }
}
