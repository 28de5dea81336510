//! Two-stage streaming pipeline: segmenter thread -> bounded channel -> reducer thread.
//!
//! The segmenter stage owns the value block stream. For every `needs_new_block` segment it
//! takes exactly one block and ships it on the internal channel with the segment, so the
//! reducer consumes blocks strictly in flag order and cannot drift. Backpressure comes from the
//! bounded channel: once it is full the segmenter blocks until the reducer catches up.

use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use rowlane_core::{
    MarkedSegment, PartialSumToken, PipelineConfig, Result, RowDescriptor, RowlaneError,
    ValueBlock,
};
use tracing::{debug, warn};

use crate::reduce::BlockReducer;
use crate::segment::{RowSegmenter, TileStats};

/// Totals over every run of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub runs: usize,
    /// Tiles processed over all runs.
    pub tiles: usize,
    pub rows: usize,
    pub segments: usize,
    pub blocks: usize,
    /// Partial sums handed to the sink, tile-end sentinels included.
    pub partial_sums: usize,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// # Errors
    /// [`RowlaneError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every configured run and tile to completion.
    ///
    /// `descriptors` must hold `runs * tiles` tile-terminated descriptor sequences and `blocks`
    /// the matching value blocks. Both accept crossbeam receivers directly. `sink` receives the
    /// partial sums in order on the reducer thread.
    ///
    /// # Errors
    /// The first contract violation seen by either stage; a stage that only saw its peer hang
    /// up reports [`RowlaneError::StreamClosed`] and loses to the root cause.
    pub fn run<D, B, S>(&self, descriptors: D, blocks: B, sink: S) -> Result<PipelineReport>
    where
        D: IntoIterator<Item = RowDescriptor>,
        D::IntoIter: Send,
        B: IntoIterator<Item = ValueBlock>,
        B::IntoIter: Send,
        S: FnMut(PartialSumToken) -> Result<()> + Send,
    {
        let cfg = &self.config;
        debug!(
            lanes = cfg.lanes,
            tiles = cfg.tiles,
            runs = cfg.runs,
            depth = cfg.channel_depth,
            "pipeline start"
        );
        let (tx, rx) = bounded::<MarkedSegment>(cfg.channel_depth);
        let mut descriptors = descriptors.into_iter();
        let mut blocks = blocks.into_iter();

        let (segmented, reduced) = thread::scope(|s| {
            let segmenter =
                s.spawn(move || self.segment_stage(&mut descriptors, &mut blocks, &tx));
            let reducer = s.spawn(move || self.reduce_stage(&rx, sink));
            (
                segmenter
                    .join()
                    .unwrap_or_else(|e| std::panic::resume_unwind(e)),
                reducer
                    .join()
                    .unwrap_or_else(|e| std::panic::resume_unwind(e)),
            )
        });

        let (seg_stats, (red_stats, partial_sums)) = match (segmented, reduced) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
            (Err(a), Err(b)) => return Err(if a.is_stream_closed() { b } else { a }),
        };
        debug_assert_eq!(seg_stats.blocks, red_stats.blocks);
        debug_assert_eq!(seg_stats.segments, red_stats.segments);
        let report = PipelineReport {
            runs: cfg.runs,
            tiles: cfg.runs * cfg.tiles,
            rows: seg_stats.rows,
            segments: seg_stats.segments,
            blocks: seg_stats.blocks,
            partial_sums,
        };
        debug!(?report, "pipeline done");
        Ok(report)
    }

    fn segment_stage<D, B>(
        &self,
        descriptors: &mut D,
        blocks: &mut B,
        tx: &Sender<MarkedSegment>,
    ) -> Result<TileStats>
    where
        D: Iterator<Item = RowDescriptor>,
        B: Iterator<Item = ValueBlock>,
    {
        let cfg = &self.config;
        let segmenter = RowSegmenter::new(cfg.lanes)?;
        let mut totals = TileStats::default();

        for run in 0..cfg.runs {
            let mut consumed = 0usize;
            let mut run_stats = TileStats::default();
            for tile in 0..cfg.tiles {
                let stats = segmenter.segment_tile(tile, descriptors, |token| {
                    let segment = if token.is_tile_end {
                        MarkedSegment::tile_end()
                    } else if token.needs_new_block {
                        if let Some(expected) = cfg.total_blocks {
                            if consumed == expected {
                                warn!(run, tile, expected, "run needs more blocks than configured");
                                return Err(RowlaneError::BlockCount {
                                    run,
                                    expected,
                                    actual: consumed + 1,
                                });
                            }
                        }
                        let Some(block) = blocks.next() else {
                            warn!(run, tile, "value block stream ended");
                            return Err(RowlaneError::BlockStreamEnded { tile });
                        };
                        block.expect_lanes(cfg.lanes)?;
                        consumed += 1;
                        MarkedSegment {
                            token,
                            block: Some(block),
                        }
                    } else {
                        MarkedSegment { token, block: None }
                    };
                    tx.send(segment)
                        .map_err(|_| RowlaneError::StreamClosed("reducer hung up"))
                })?;
                run_stats.merge(stats);
            }
            if let Some(expected) = cfg.total_blocks {
                if consumed != expected {
                    warn!(run, expected, consumed, "run consumed fewer blocks than configured");
                    return Err(RowlaneError::BlockCount {
                        run,
                        expected,
                        actual: consumed,
                    });
                }
            }
            debug!(run, rows = run_stats.rows, blocks = run_stats.blocks, "run segmented");
            totals.merge(run_stats);
        }
        Ok(totals)
    }

    fn reduce_stage<S>(
        &self,
        rx: &Receiver<MarkedSegment>,
        mut sink: S,
    ) -> Result<(TileStats, usize)>
    where
        S: FnMut(PartialSumToken) -> Result<()>,
    {
        let cfg = &self.config;
        let mut reducer = BlockReducer::new(cfg.lanes)?;
        let mut totals = TileStats::default();
        let mut emitted = 0usize;

        for _run in 0..cfg.runs {
            for _tile in 0..cfg.tiles {
                loop {
                    let MarkedSegment { token, block } = rx
                        .recv()
                        .map_err(|_| RowlaneError::StreamClosed("segmenter hung up"))?;
                    totals.blocks += usize::from(block.is_some());
                    let partial = reducer.reduce(&token, block)?;
                    sink(partial)?;
                    emitted += 1;
                    if token.is_tile_end {
                        break;
                    }
                    totals.segments += 1;
                    totals.rows += usize::from(token.is_row_complete);
                }
            }
        }
        Ok((totals, emitted))
    }
}

/// Sink forwarding partial sums into a channel.
pub fn channel_sink(
    tx: Sender<PartialSumToken>,
) -> impl FnMut(PartialSumToken) -> Result<()> + Send {
    move |partial| {
        tx.send(partial)
            .map_err(|_| RowlaneError::StreamClosed("partial sum consumer hung up"))
    }
}
