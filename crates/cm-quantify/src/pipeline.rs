use std::any::Any;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use cm_core::{Image, count_nonzero};
use cm_measure::{PixelScale, WidthProfile, area_px, length_px, width_profile};
use cm_morph::{binarize_u8, threshold_for};
use cm_render::{format_width_label, render_max_width, render_normals, render_skeleton};
use cm_skeleton::{Skeleton, extract_skeleton};
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::QuantifyConfig;
use crate::error::{QuantifyError, Stage};
use crate::request::{
    MetricKind, VisualKind, needs_skeleton, needs_width_profile, parse_metrics, parse_visuals,
};
use crate::result::QuantifyResult;
use crate::table::MetricsTable;

/// One mask to quantify.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantifyRequest {
    pub mask_path: PathBuf,
    pub pixel_size_mm: f64,
    /// Metric names; empty selects none, `all` selects every metric.
    pub metrics: Vec<String>,
    /// Visual names; empty selects none, `all` selects every visual.
    pub visuals: Vec<String>,
}

impl QuantifyRequest {
    pub fn new(mask_path: impl Into<PathBuf>, pixel_size_mm: f64) -> Self {
        Self {
            mask_path: mask_path.into(),
            pixel_size_mm,
            metrics: Vec::new(),
            visuals: Vec::new(),
        }
    }

    pub fn with_metrics<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_visuals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visuals = names.into_iter().map(Into::into).collect();
        self
    }
}

struct Completed {
    summary: String,
    outputs: BTreeMap<String, f64>,
    visualizations: BTreeMap<String, PathBuf>,
}

/// Encoded overlay waiting in a temp file beside its final path.
struct StagedVisual {
    kind: VisualKind,
    path: PathBuf,
    file: NamedTempFile,
}

/// Runs the quantification pipeline with a fixed configuration.
///
/// A `Quantifier` is `Sync`; concurrent calls share its metrics table, whose
/// updates are serialized.
#[derive(Debug)]
pub struct Quantifier {
    config: QuantifyConfig,
    table: Option<MetricsTable>,
}

impl Default for Quantifier {
    fn default() -> Self {
        Self::new(QuantifyConfig::default())
    }
}

impl Quantifier {
    pub fn new(config: QuantifyConfig) -> Self {
        let table = config.metrics_table.clone().map(MetricsTable::new);
        Self { config, table }
    }

    pub fn config(&self) -> &QuantifyConfig {
        &self.config
    }

    pub fn table(&self) -> Option<&MetricsTable> {
        self.table.as_ref()
    }

    /// Quantifies one mask. Never panics and never returns partial outputs:
    /// any failure yields an error result and removes the files this call
    /// had written.
    pub fn quantify(&self, req: &QuantifyRequest) -> QuantifyResult {
        let started = Instant::now();

        match self.run(req) {
            Ok(done) => {
                info!(
                    mask = %req.mask_path.display(),
                    metrics = done.outputs.len(),
                    visuals = done.visualizations.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "quantify finished"
                );
                QuantifyResult::success(done.summary, done.outputs, done.visualizations)
            }
            Err(err) => {
                warn!(
                    mask = %req.mask_path.display(),
                    error = %err.diagnostic(),
                    "quantify failed"
                );
                QuantifyResult::failure(&err)
            }
        }
    }

    /// Quantifies every request on the rayon pool. Results keep input order.
    pub fn quantify_batch(&self, reqs: &[QuantifyRequest]) -> Vec<QuantifyResult> {
        reqs.par_iter().map(|req| self.quantify(req)).collect()
    }

    fn run(&self, req: &QuantifyRequest) -> Result<Completed, QuantifyError> {
        let scale = PixelScale::new(req.pixel_size_mm)
            .ok_or(QuantifyError::InvalidPixelSize(req.pixel_size_mm))?;
        let metrics = parse_metrics(req.metrics.as_slice(), self.config.match_policy)?;
        let visuals = parse_visuals(req.visuals.as_slice(), self.config.match_policy)?;
        let stem = image_stem(&req.mask_path);

        let source = load_image(&req.mask_path)?;
        let mask = guarded(Stage::Binarize, || self.binarize(&source))?;

        let skeleton = if needs_skeleton(&metrics, &visuals) {
            Some(guarded(Stage::Skeleton, || {
                Ok(extract_skeleton(&mask.as_view(), &self.config.skeleton))
            })?)
        } else {
            None
        };
        let profile = match &skeleton {
            Some(sk) if needs_width_profile(&metrics, &visuals) => Some(guarded(Stage::Measure, || {
                Ok(width_profile(&mask.as_view(), sk, &self.config.width))
            })?),
            _ => None,
        };

        let values = guarded(Stage::Measure, || {
            Ok(self.measure(&mask, skeleton.as_ref(), profile.as_ref(), scale, &metrics))
        })?;
        let renders = guarded(Stage::Render, || {
            Ok(self.render(&source, skeleton.as_ref(), profile.as_ref(), scale, &visuals))
        })?;

        // Overlays replace earlier files only once the table is updated.
        let staged = self.stage_visuals(&stem, renders)?;
        if let Some(table) = &self.table
            && !values.is_empty()
        {
            guarded(Stage::Table, || table.upsert(&stem, &values))?;
        }
        let visualizations = commit_visuals(staged)?;

        let outputs: BTreeMap<String, f64> = values
            .iter()
            .map(|(kind, v)| (kind.key().to_string(), *v))
            .collect();
        let summary = format!(
            "quantified {} metric(s) and wrote {} visual(s) for {stem}",
            outputs.len(),
            visualizations.len()
        );

        Ok(Completed {
            summary,
            outputs,
            visualizations,
        })
    }

    fn binarize(&self, source: &DynamicImage) -> Result<Image<u8>, QuantifyError> {
        let luma = source.to_luma8();
        let (w, h) = luma.dimensions();
        let gray = Image::from_vec(w as usize, h as usize, luma.into_raw())
            .map_err(|e| computation(Stage::Binarize, e))?;

        let cutoff = threshold_for(&gray.as_view(), self.config.binarize.policy);
        let mask = binarize_u8(&gray.as_view(), &self.config.binarize)
            .map_err(|e| computation(Stage::Binarize, e))?;

        let foreground = count_nonzero(&mask.as_view());
        debug!(?cutoff, foreground, width = w, height = h, "mask binarized");
        if foreground == 0 {
            warn!("mask has no foreground; every metric is zero");
        }
        Ok(mask)
    }

    fn measure(
        &self,
        mask: &Image<u8>,
        skeleton: Option<&Skeleton>,
        profile: Option<&WidthProfile>,
        scale: PixelScale,
        metrics: &[MetricKind],
    ) -> Vec<(MetricKind, f64)> {
        let view = mask.as_view();

        metrics
            .iter()
            .map(|&kind| {
                let v = match kind {
                    MetricKind::Length => scale.length_mm(skeleton.map_or(0.0, |sk| {
                        length_px(&view, sk, &self.config.length, &self.config.width)
                    })),
                    MetricKind::Area => scale.area_mm2(area_px(&view)),
                    MetricKind::MaxWidth => {
                        scale.length_mm(profile.map_or(0.0, WidthProfile::max_width))
                    }
                    MetricKind::AvgWidth => {
                        scale.length_mm(profile.map_or(0.0, WidthProfile::mean_width))
                    }
                };
                (kind, self.config.round(v))
            })
            .collect()
    }

    fn render(
        &self,
        source: &DynamicImage,
        skeleton: Option<&Skeleton>,
        profile: Option<&WidthProfile>,
        scale: PixelScale,
        visuals: &[VisualKind],
    ) -> Vec<(VisualKind, RgbImage)> {
        if visuals.is_empty() {
            return Vec::new();
        }
        let base = source.to_rgb8();
        let cfg = &self.config.render;

        visuals
            .iter()
            .filter_map(|&kind| {
                let img = match kind {
                    VisualKind::Skeleton => render_skeleton(&base, skeleton?),
                    VisualKind::Normals => render_normals(&base, skeleton?, cfg),
                    VisualKind::MaxWidth => {
                        let profile = profile?;
                        let label =
                            format_width_label(profile.max_width(), Some(scale.mm_per_px()));
                        render_max_width(&base, profile, &label, cfg).0
                    }
                };
                Some((kind, img))
            })
            .collect()
    }

    fn stage_visuals(
        &self,
        stem: &str,
        renders: Vec<(VisualKind, RgbImage)>,
    ) -> Result<Vec<StagedVisual>, QuantifyError> {
        if renders.is_empty() {
            return Ok(Vec::new());
        }

        let dir = &self.config.visual_dir;
        fs::create_dir_all(dir).map_err(|e| QuantifyError::io(dir, e))?;

        renders
            .into_iter()
            .map(|(kind, img)| -> Result<StagedVisual, QuantifyError> {
                let path = dir.join(format!("{stem}{}", kind.file_suffix()));

                let mut png = Cursor::new(Vec::new());
                img.write_to(&mut png, ImageFormat::Png)
                    .map_err(|e| QuantifyError::Computation {
                        stage: Stage::Write,
                        message: format!("{}: {e}", path.display()),
                    })?;

                let mut file = NamedTempFile::new_in(dir).map_err(|e| QuantifyError::io(dir, e))?;
                file.write_all(png.get_ref())
                    .map_err(|e| QuantifyError::io(file.path(), e))?;
                Ok(StagedVisual { kind, path, file })
            })
            .collect()
    }
}

/// Moves staged overlays to their final names, replacing older files.
fn commit_visuals(staged: Vec<StagedVisual>) -> Result<BTreeMap<String, PathBuf>, QuantifyError> {
    let mut written = BTreeMap::new();
    for visual in staged {
        if let Err(e) = visual.file.persist(&visual.path) {
            remove_files(written.values());
            return Err(QuantifyError::io(&visual.path, e.error));
        }
        debug!(path = %visual.path.display(), "visual written");
        written.insert(visual.kind.key().to_string(), visual.path);
    }
    Ok(written)
}

/// Quantifies one mask with the default configuration.
pub fn quantify<M, V>(
    mask_path: impl AsRef<Path>,
    pixel_size_mm: f64,
    metrics: &[M],
    visuals: &[V],
) -> QuantifyResult
where
    M: AsRef<str>,
    V: AsRef<str>,
{
    let req = QuantifyRequest::new(mask_path.as_ref(), pixel_size_mm)
        .with_metrics(metrics.iter().map(|m| m.as_ref().to_string()))
        .with_visuals(visuals.iter().map(|v| v.as_ref().to_string()));
    Quantifier::default().quantify(&req)
}

fn load_image(path: &Path) -> Result<DynamicImage, QuantifyError> {
    let invalid = |reason: String| QuantifyError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(invalid("file not found".to_string()));
    }
    // The decoder is chosen from the file content, not its extension.
    let img = guarded(Stage::Load, || {
        ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| invalid(e.to_string()))?
            .decode()
            .map_err(|e| invalid(e.to_string()))
    })?;
    if img.width() == 0 || img.height() == 0 {
        return Err(invalid("image has zero size".to_string()));
    }

    debug!(path = %path.display(), width = img.width(), height = img.height(), "mask loaded");
    Ok(img)
}

fn image_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "mask".to_string())
}

fn computation(stage: Stage, err: impl std::fmt::Display) -> QuantifyError {
    QuantifyError::Computation {
        stage,
        message: err.to_string(),
    }
}

/// Runs `f`, turning a panic into a `Computation` error for `stage`.
fn guarded<T>(
    stage: Stage,
    f: impl FnOnce() -> Result<T, QuantifyError>,
) -> Result<T, QuantifyError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => Err(computation(stage, panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with a non-string payload".to_string()
    }
}

fn remove_files<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Stage, guarded, image_stem};
    use crate::QuantifyError;

    #[test]
    fn stem_falls_back_for_odd_paths() {
        assert_eq!(image_stem(Path::new("data/crack_01.png")), "crack_01");
        assert_eq!(image_stem(Path::new("noext")), "noext");
        assert_eq!(image_stem(Path::new("/")), "mask");
    }

    #[test]
    fn panics_become_stage_errors() {
        let res: Result<(), QuantifyError> = guarded(Stage::Measure, || panic!("index out of range"));
        match res {
            Err(QuantifyError::Computation { stage, message }) => {
                assert_eq!(stage, Stage::Measure);
                assert_eq!(message, "panic: index out of range");
            }
            other => panic!("unexpected {other:?}"),
        }

        let ok = guarded(Stage::Render, || Ok::<_, QuantifyError>(7));
        assert_eq!(ok.expect("no panic"), 7);
    }
}
