//! The page pipeline
//!
//! A document flows through the stages in the order the caller chains them:
//! 1. Load and split into single-page units
//! 2. Rotate pages to an orientation
//! 3. Resize pages to a target size
//! 4. Combine consecutive pages into spreads
//! 5. Build the merged output document
//!
//! Rotate and resize work on every page independently and in parallel.
//! A page that fails keeps its previous content and is reported through
//! [`Pipeline::failures`]; only load, combine and build return errors.
//! A failed combine hands the pipeline back unchanged in [`CombineError`].

mod parallel;
mod stages;

use crate::codec;
use crate::geometry::PageRect;
use crate::options::{SpreadOptions, default_parallelism};
use crate::types::*;
use crate::unit::PageUnit;
use parallel::run_blocking;
use stages::{combine_pair, resize_page, rotate_page};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// An ordered sequence of page units plus output metadata
#[derive(Debug)]
pub struct Pipeline {
    units: Vec<PageUnit>,
    info: DocumentInfo,
    parallelism: usize,
    failures: Vec<PageFailure>,
}

/// A combine that could not build every spread.
///
/// `pipeline` is the input sequence exactly as it was before the call.
#[derive(Error, Debug)]
#[error("Failed to combine pages: {error}")]
pub struct CombineError {
    pub pipeline: Pipeline,
    #[source]
    pub error: SpreadError,
}

impl From<CombineError> for SpreadError {
    fn from(e: CombineError) -> Self {
        e.error
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::empty()
    }
}

impl Pipeline {
    /// A pipeline with no pages
    pub fn empty() -> Self {
        Self::from_units(Vec::new())
    }

    pub fn from_units(units: Vec<PageUnit>) -> Self {
        Self {
            units,
            info: DocumentInfo::default(),
            parallelism: default_parallelism(),
            failures: Vec::new(),
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Read a whole document from `reader` and split it into page units
    pub async fn load<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        Self::load_mem(bytes).await
    }

    pub async fn load_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::load_mem(bytes).await
    }

    pub async fn load_mem(bytes: Vec<u8>) -> Result<Self> {
        let units = tokio::task::spawn_blocking(move || {
            codec::decode(&bytes)?
                .into_iter()
                .map(|mut doc| PageUnit::create(&mut doc))
                .collect::<Result<Vec<_>>>()
        })
        .await??;

        log::info!("Loaded {} page(s)", units.len());
        Ok(Self::from_units(units))
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn with_info(mut self, info: DocumentInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.info.author = author.into();
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.info.creator = creator.into();
        self
    }

    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.info.producer = producer.into();
        self
    }

    /// Maximum number of pages transformed at once
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn units(&self) -> &[PageUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Current size of every page, in order
    pub fn page_rects(&self) -> Vec<Result<PageRect>> {
        self.units.iter().map(PageUnit::rect).collect()
    }

    /// Pages that kept their previous content because a transform failed
    pub fn failures(&self) -> &[PageFailure] {
        &self.failures
    }

    pub fn take_failures(&mut self) -> Vec<PageFailure> {
        std::mem::take(&mut self.failures)
    }

    // =========================================================================
    // Stages
    // =========================================================================

    /// Turn every page that does not have the `wanted` orientation.
    ///
    /// `direction` is used for every page that needs turning.
    pub async fn rotate(mut self, wanted: Orientation, direction: TurnDirection) -> Self {
        let outcomes = run_blocking(self.unit_paths(), self.parallelism, move |_, path| {
            rotate_page(&path, wanted, direction)
        })
        .await;

        let changed = self.record(Stage::Rotate, outcomes);
        log::info!(
            "Rotated {} of {} page(s) to {:?}",
            changed,
            self.units.len(),
            wanted
        );
        self
    }

    /// Fit every page into `target`, keeping aspect ratio.
    pub async fn resize(mut self, target: PageRect) -> Self {
        let outcomes = run_blocking(self.unit_paths(), self.parallelism, move |_, path| {
            resize_page(&path, target)
        })
        .await;

        let changed = self.record(Stage::Resize, outcomes);
        log::info!(
            "Resized {} of {} page(s) to {}x{}",
            changed,
            self.units.len(),
            target.width,
            target.height
        );
        self
    }

    /// Pair consecutive pages into double-wide spreads.
    ///
    /// The sequence shrinks to `ceil(n/2)` units; with an odd count the last
    /// page passes through unchanged. Landscape pages are turned upright with
    /// `direction` before pairing. Input units are never rewritten, so on
    /// error the pipeline comes back intact inside [`CombineError`].
    pub async fn combine(
        mut self,
        direction: TurnDirection,
    ) -> std::result::Result<Self, CombineError> {
        let total = self.units.len();
        let pairs: Vec<(PathBuf, PathBuf)> = self
            .units
            .chunks_exact(2)
            .map(|pair| (pair[0].path().to_path_buf(), pair[1].path().to_path_buf()))
            .collect();

        let outcomes = run_blocking(pairs, self.parallelism, move |pair_index, paths| {
            combine_pair(pair_index * 2, paths, direction)
        })
        .await;

        let mut spreads = Vec::with_capacity(total.div_ceil(2));
        let mut failures = Vec::new();
        for (pair_index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(outcome) => {
                    failures.extend(outcome.failures);
                    spreads.push(outcome.spread);
                }
                Err(error) => {
                    log::error!(
                        "Could not combine pages {} and {}: {}",
                        pair_index * 2 + 1,
                        pair_index * 2 + 2,
                        error
                    );
                    // Spreads built so far are dropped with their files
                    return Err(CombineError {
                        pipeline: self,
                        error,
                    });
                }
            }
        }

        if total % 2 == 1 {
            spreads.extend(self.units.pop());
        }

        log::info!("Combined {} page(s) into {}", total, spreads.len());
        self.units = spreads;
        self.failures.extend(failures);
        Ok(self)
    }

    /// Move all of `other`'s pages onto the end of this pipeline.
    ///
    /// This pipeline's metadata is kept; `other`'s is discarded.
    pub fn append(mut self, other: Pipeline) -> Self {
        let offset = self.units.len();
        self.failures
            .extend(other.failures.into_iter().map(|failure| PageFailure {
                index: failure.index + offset,
                ..failure
            }));
        self.units.extend(other.units);
        self
    }

    /// Apply every stage configured in `options`
    pub async fn run(self, options: &SpreadOptions) -> Result<Self> {
        options.validate()?;

        let mut pipeline = self
            .with_info(options.info.clone())
            .with_parallelism(options.parallelism);

        if let Some(step) = options.rotate {
            pipeline = pipeline.rotate(step.orientation, step.direction).await;
        }
        if let Some(paper) = options.resize {
            pipeline = pipeline.resize(paper.to_rect()).await;
        }
        if let Some(direction) = options.combine {
            pipeline = pipeline.combine(direction).await?;
        }

        Ok(pipeline)
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Merge all pages, in order, into one document
    pub async fn build_to_vec(&self) -> Result<Vec<u8>> {
        let paths = self.unit_paths();
        let info = self.info.clone();

        tokio::task::spawn_blocking(move || {
            let units = paths
                .iter()
                .enumerate()
                .map(|(index, path)| {
                    codec::load_unit(path).map_err(|e| {
                        SpreadError::Merge(format!("page {} is unreadable: {}", index + 1, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let mut merged = codec::merge_all(units, &info)?;
            codec::persist_to_bytes(&mut merged)
        })
        .await?
    }

    /// Merge all pages and write the document to `writer`
    pub async fn build<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.build_to_vec().await?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        log::info!("Built {} page(s), {} bytes", self.units.len(), bytes.len());
        Ok(())
    }

    /// Merge all pages and save the document to `path`
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.build_to_vec().await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    fn unit_paths(&self) -> Vec<PathBuf> {
        self.units
            .iter()
            .map(|unit| unit.path().to_path_buf())
            .collect()
    }

    /// Log and keep per-page failures; returns how many pages changed
    fn record(&mut self, stage: Stage, outcomes: Vec<Result<bool>>) -> usize {
        let mut changed = 0;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(error) => {
                    log::warn!(
                        "{}: page {} left unchanged: {}",
                        stage,
                        index + 1,
                        error
                    );
                    self.failures.push(PageFailure {
                        index,
                        stage,
                        error,
                    });
                }
            }
        }
        changed
    }
}
