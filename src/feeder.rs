//! Feeding a recorded Annex-B file into a NAL queue as if it were live.
//!
//! The file is split once up front. Parameter sets become the session's
//! prefix; everything from the first IDR on is pushed unit by unit, paced at
//! the configured frame rate.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use nalcast_source::{split_annex_b, NalError, NalSender, NalUnitType, ParameterSets, QueueError};
use parking_lot::Mutex;
use serde::Serialize;

/// One queue item.
#[derive(Debug, Clone)]
pub struct FeedUnit {
    pub nal_type: NalUnitType,
    /// Unit with a four-byte start code.
    pub data: Bytes,
}

/// An Annex-B stream prepared for feeding.
#[derive(Debug, Clone)]
pub struct ElementaryStream {
    /// SPS then PPS, each with a start code.
    pub param_sets: Option<Bytes>,
    pub units: Vec<FeedUnit>,
    /// Units before the first IDR that were dropped.
    pub skipped: usize,
    counts: BTreeMap<&'static str, usize>,
}

impl ElementaryStream {
    pub fn parse(data: &[u8]) -> Result<Self, NalError> {
        let mut params = ParameterSets::new();
        let mut units = Vec::new();
        let mut counts = BTreeMap::new();
        let mut skipped = 0;
        let mut keyframe_seen = false;

        for unit in split_annex_b(data)? {
            *counts.entry(unit.nal_type.name()).or_insert(0) += 1;

            if params.observe(&unit) {
                continue;
            }
            if !keyframe_seen {
                if unit.nal_type != NalUnitType::IdrSlice {
                    skipped += 1;
                    continue;
                }
                keyframe_seen = true;
            }
            units.push(FeedUnit {
                nal_type: unit.nal_type,
                data: unit.to_annex_b(),
            });
        }

        Ok(Self {
            param_sets: params.to_annex_b(),
            units,
            skipped,
            counts,
        })
    }

    /// Number of coded slices that will be fed.
    pub fn vcl_units(&self) -> usize {
        self.units.iter().filter(|u| u.nal_type.is_vcl()).count()
    }

    pub fn summary(&self, fps: f32) -> StreamSummary {
        let vcl = self.vcl_units();
        StreamSummary {
            total_units: self.counts.values().sum(),
            fed_units: self.units.len(),
            vcl_units: vcl,
            skipped_before_idr: self.skipped,
            param_sets_bytes: self.param_sets.as_ref().map(Bytes::len),
            unit_types: self
                .counts
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
            duration_secs: if fps > 0.0 { vcl as f64 / fps as f64 } else { 0.0 },
        }
    }
}

/// What `inspect` reports about a stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary {
    pub total_units: usize,
    pub fed_units: usize,
    pub vcl_units: usize,
    pub skipped_before_idr: usize,
    pub param_sets_bytes: Option<usize>,
    pub unit_types: BTreeMap<String, usize>,
    pub duration_secs: f64,
}

/// Counters updated while feeding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedStats {
    pub units_sent: u64,
    pub bytes_sent: u64,
    pub frames_sent: u64,
    /// Units dropped because the queue stayed full for a frame interval.
    pub dropped: u64,
    pub loops: u64,
}

/// Pushes a prepared stream into a queue on its own thread.
pub struct Feeder {
    sender: NalSender,
    units: Arc<[FeedUnit]>,
    frame_interval: Duration,
    loop_input: bool,
    stop: Arc<AtomicBool>,
    stats: Arc<Mutex<FeedStats>>,
}

impl Feeder {
    pub fn new(sender: NalSender, stream: &ElementaryStream, fps: f32, loop_input: bool) -> Self {
        let frame_interval = if fps > 0.0 {
            Duration::from_secs_f64(1.0 / fps as f64)
        } else {
            Duration::ZERO
        };

        Self {
            sender,
            units: stream.units.clone().into(),
            frame_interval,
            loop_input,
            stop: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(FeedStats::default())),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn stats(&self) -> Arc<Mutex<FeedStats>> {
        self.stats.clone()
    }

    /// Setting the flag ends the feed after the current unit.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Feed until the stream ends, the stop flag is set, or the consumer
    /// goes away.
    pub fn run(self) -> FeedStats {
        tracing::info!(
            units = self.units.len(),
            interval_ms = self.frame_interval.as_millis() as u64,
            looping = self.loop_input,
            "Feeder started"
        );

        let mut next_frame = Instant::now();

        'feed: loop {
            for unit in self.units.iter() {
                if self.stop.load(Ordering::Relaxed) {
                    break 'feed;
                }

                match self.sender.offer(unit.data.clone(), self.offer_timeout()) {
                    Ok(true) => {
                        let mut stats = self.stats.lock();
                        stats.units_sent += 1;
                        stats.bytes_sent += unit.data.len() as u64;
                    }
                    Ok(false) => {
                        tracing::debug!(
                            nal_type = unit.nal_type.name(),
                            "Queue full, dropping unit"
                        );
                        self.stats.lock().dropped += 1;
                    }
                    Err(QueueError::Disconnected) => {
                        tracing::info!("Consumer closed the queue, stopping feed");
                        break 'feed;
                    }
                    Err(e) => {
                        tracing::error!("Feeding failed: {}", e);
                        break 'feed;
                    }
                }

                if unit.nal_type.is_vcl() {
                    self.stats.lock().frames_sent += 1;
                    next_frame += self.frame_interval;
                    let now = Instant::now();
                    if next_frame > now {
                        thread::sleep(next_frame - now);
                    } else {
                        next_frame = now;
                    }
                }
            }

            if !self.loop_input || self.units.is_empty() {
                break;
            }
            self.stats.lock().loops += 1;
            tracing::debug!("Input exhausted, looping");
        }

        let stats = self.stats.lock().clone();
        tracing::info!(
            units = stats.units_sent,
            frames = stats.frames_sent,
            dropped = stats.dropped,
            "Feeder finished"
        );
        stats
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<FeedStats>> {
        thread::Builder::new()
            .name("nalcast-feeder".to_string())
            .spawn(move || self.run())
    }

    fn offer_timeout(&self) -> Duration {
        self.frame_interval.max(Duration::from_millis(10))
    }
}
