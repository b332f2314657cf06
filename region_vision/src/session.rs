// THEORY:
// A `Session` drives the pipeline over a directory of numbered frames. It is the
// only layer that touches the filesystem for images: it finds the next frame by
// name, decodes it, asks a `DecisionSource` what to do with it, records labels,
// commits tracker state and writes the annotated result.
//
// Key architectural principles:
// 1.  **Sentinel Termination**: Frames are `<prefix><N><suffix>` for N = 1, 2, ...
//     The first missing N ends the run. That is the normal way out, not an error.
// 2.  **Frame-Local Failures**: A frame that cannot be decoded is skipped; an image
//     or dataset write that fails is logged. None of these stop the loop.
// 3.  **Explicit Suspension Point**: The labeling decision is the only place the
//     session waits on the outside world. It is a trait call, so an interactive
//     console, a GUI, or a pre-scripted list of answers can all drive the same loop.

use crate::core_modules::dataset::DatasetRecorder;
use crate::pipeline::{FrameAnalysis, RegionPipeline};
use image::{DynamicImage, ImageError};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("could not read image file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("could not save image to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("input path {0} is not a directory")]
    InputDir(PathBuf),
    #[error("could not create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File naming convention of the frame sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNaming {
    pub prefix: String,
    pub suffix: String,
    pub first_index: u32,
}

impl Default for FrameNaming {
    fn default() -> Self {
        Self {
            prefix: "img".to_string(),
            suffix: "p3.png".to_string(),
            first_index: 1,
        }
    }
}

impl FrameNaming {
    pub fn file_name(&self, index: u32) -> String {
        format!("{}{}{}", self.prefix, index, self.suffix)
    }
}

/// What to do with a frame once it has been analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelDecision {
    /// Continue without recording anything.
    Skip,
    /// Record every extracted region of the frame under this label.
    Label(String),
    /// Stop the session. The current frame is not saved.
    Exit,
}

/// A frame handed to a `DecisionSource`.
#[derive(Debug)]
pub struct FrameReport<'a> {
    pub index: u32,
    pub input_path: &'a Path,
    pub analysis: &'a FrameAnalysis,
}

pub trait DecisionSource {
    fn decide(&mut self, frame: &FrameReport<'_>) -> LabelDecision;
}

/// Never labels. For runs without anyone at the keyboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabeling;

impl DecisionSource for NoLabeling {
    fn decide(&mut self, _frame: &FrameReport<'_>) -> LabelDecision {
        LabelDecision::Skip
    }
}

/// Replays a fixed list of decisions, one per analyzed frame, then skips.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    queue: VecDeque<LabelDecision>,
}

impl ScriptedDecisions {
    pub fn new(decisions: impl IntoIterator<Item = LabelDecision>) -> Self {
        Self {
            queue: decisions.into_iter().collect(),
        }
    }
}

impl DecisionSource for ScriptedDecisions {
    fn decide(&mut self, _frame: &FrameReport<'_>) -> LabelDecision {
        self.queue.pop_front().unwrap_or(LabelDecision::Skip)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub naming: FrameNaming,
    /// Also write each frame's cleaned mask as `mask_<frame name>`.
    pub save_masks: bool,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_processed: u32,
    pub frames_skipped: u32,
    pub frames_saved: u32,
    pub records_written: usize,
    pub exited_early: bool,
}

pub struct Session {
    config: SessionConfig,
    pipeline: RegionPipeline,
    recorder: DatasetRecorder,
}

impl Session {
    /// Checks the input directory and creates the output directory if needed.
    pub fn new(config: SessionConfig, pipeline: RegionPipeline) -> Result<Self, SessionError> {
        if !config.input_dir.is_dir() {
            return Err(SessionError::InputDir(config.input_dir.clone()));
        }
        prepare_output_dir(&config.output_dir)?;
        let recorder = DatasetRecorder::new(config.dataset_path.clone());
        Ok(Self {
            config,
            pipeline,
            recorder,
        })
    }

    /// Processes frames until the sequence ends or `decisions` asks to exit.
    pub fn run(&mut self, decisions: &mut dyn DecisionSource) -> SessionSummary {
        let mut summary = SessionSummary::default();

        for index in self.config.naming.first_index.. {
            let name = self.config.naming.file_name(index);
            let input_path = self.config.input_dir.join(&name);
            if !input_path.exists() {
                log::info!("Finished processing all images.");
                break;
            }

            log::info!("Processing: {}", input_path.display());
            let frame = match load_frame(&input_path) {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("{e}");
                    summary.frames_skipped += 1;
                    continue;
                }
            };

            let analysis = self.pipeline.analyze(&frame);
            summary.frames_processed += 1;

            let report = FrameReport {
                index,
                input_path: &input_path,
                analysis: &analysis,
            };
            match decisions.decide(&report) {
                LabelDecision::Skip => {}
                LabelDecision::Label(label) => {
                    match self.recorder.append(&label, &analysis.regions) {
                        Ok(written) => {
                            log::info!(
                                "Recorded {written} regions as {label:?} in {}",
                                self.recorder.path().display()
                            );
                            summary.records_written += written;
                        }
                        Err(e) => log::error!("{e}"),
                    }
                }
                LabelDecision::Exit => {
                    log::info!("Processing interrupted by user.");
                    summary.exited_early = true;
                    break;
                }
            }

            self.pipeline.commit(&analysis);

            let output_path = self.config.output_dir.join(&name);
            match save_image(&output_path, &DynamicImage::ImageRgb8(analysis.annotated)) {
                Ok(()) => {
                    log::info!("Saved: {}", output_path.display());
                    summary.frames_saved += 1;
                }
                Err(e) => log::error!("{e}"),
            }

            if self.config.save_masks {
                let mask_path = self.config.output_dir.join(format!("mask_{name}"));
                if let Err(e) = save_image(&mask_path, &DynamicImage::ImageLuma8(analysis.mask)) {
                    log::error!("{e}");
                }
            }
        }

        summary
    }
}

/// Creates `path` (and its parents) if it does not exist yet.
pub fn prepare_output_dir(path: &Path) -> Result<(), SessionError> {
    std::fs::create_dir_all(path).map_err(|source| SessionError::OutputDir {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_frame(path: &Path) -> Result<DynamicImage, FrameError> {
    image::open(path).map_err(|source| FrameError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_image(path: &Path, image: &DynamicImage) -> Result<(), FrameError> {
    image.save(path).map_err(|source| FrameError::Save {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_naming() {
        let naming = FrameNaming::default();
        assert_eq!(naming.file_name(1), "img1p3.png");
        assert_eq!(naming.file_name(12), "img12p3.png");
    }

    #[test]
    fn scripted_decisions_run_out_into_skips() {
        let analysis = FrameAnalysis {
            regions: Vec::new(),
            accepted: Vec::new(),
            mask: image::GrayImage::new(1, 1),
            annotated: image::RgbImage::new(1, 1),
        };
        let path = PathBuf::from("img1p3.png");
        let report = FrameReport {
            index: 1,
            input_path: &path,
            analysis: &analysis,
        };

        let mut script = ScriptedDecisions::new([
            LabelDecision::Label("nut".to_string()),
            LabelDecision::Exit,
        ]);
        assert_eq!(script.decide(&report), LabelDecision::Label("nut".to_string()));
        assert_eq!(script.decide(&report), LabelDecision::Exit);
        assert_eq!(script.decide(&report), LabelDecision::Skip);
        assert_eq!(NoLabeling.decide(&report), LabelDecision::Skip);
    }

    #[test]
    fn missing_input_dir_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SessionConfig {
            input_dir: dir.path().join("missing"),
            output_dir: dir.path().join("out"),
            dataset_path: dir.path().join("features.csv"),
            naming: FrameNaming::default(),
            save_masks: false,
        };
        let pipeline = RegionPipeline::new(Default::default(), Default::default());
        assert!(matches!(
            Session::new(config, pipeline),
            Err(SessionError::InputDir(_))
        ));
        assert!(!dir.path().join("out").exists());
    }
}
