//! Feeds events through extraction and into the accumulator.
use crate::{
    accumulator::EventAccumulator,
    config::AnalysisConfig,
    error::{LoadError, LoadResult, RunError},
    event::{EventFeatures, extract_event},
    frame::WaveformFrame,
};
use dct_common::{
    WireIndex,
    metrics::{
        failures::{self, FailureKind},
        names::{EVENTS_PROCESSED, FAILURES, VALID_WIRES},
    },
};
use itertools::Itertools;
use metrics::counter;
use rayon::prelude::*;
use std::num::NonZeroUsize;
use tracing::{error, info, warn};

/// Wires whose joint validity is counted as a coincidence, unless configured otherwise.
pub const DEFAULT_COINCIDENCE_WIRES: [WireIndex; 3] = [2, 3, 4];

pub struct RunDriver {
    config: AnalysisConfig,
    coincidence_wires: Vec<WireIndex>,
    parallel_chunk: Option<NonZeroUsize>,
}

impl RunDriver {
    pub fn new(config: AnalysisConfig) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            coincidence_wires: DEFAULT_COINCIDENCE_WIRES.to_vec(),
            parallel_chunk: None,
        })
    }

    pub fn with_coincidence_wires(self, coincidence_wires: Vec<WireIndex>) -> Self {
        if let Some(wire) = coincidence_wires
            .iter()
            .find(|&&wire| wire >= self.config.num_wires)
        {
            warn!("Coincidence wire {wire} does not exist, no coincidences will be found");
        }
        Self {
            coincidence_wires,
            ..self
        }
    }

    /// When set, frames are processed concurrently in chunks of the given size.
    pub fn with_parallel_chunk(self, parallel_chunk: Option<NonZeroUsize>) -> Self {
        Self {
            parallel_chunk,
            ..self
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Processes every frame in order, stopping at the first load error.
    #[tracing::instrument(skip_all, fields(
        parallel_chunk = self.parallel_chunk.map(NonZeroUsize::get)
    ))]
    pub fn run<I>(&self, frames: I) -> Result<EventAccumulator, RunError>
    where
        I: IntoIterator<Item = LoadResult<WaveformFrame>>,
    {
        let mut accumulator =
            EventAccumulator::new(self.config.num_wires, self.coincidence_wires.clone());
        let frames = frames.into_iter().enumerate();

        match self.parallel_chunk {
            None => {
                for (index, frame) in frames {
                    let frame = frame.inspect_err(on_load_error)?;
                    let features = extract_event(index, &frame, &self.config);
                    record(features, &mut accumulator);
                }
            }
            Some(chunk_size) => {
                let chunks = frames.chunks(chunk_size.get());
                for chunk in &chunks {
                    let chunk = chunk
                        .map(|(index, frame)| frame.map(|frame| (index, frame)))
                        .collect::<LoadResult<Vec<_>>>()
                        .inspect_err(on_load_error)?;
                    let features: Vec<_> = chunk
                        .par_iter()
                        .map(|(index, frame)| extract_event(*index, frame, &self.config))
                        .collect();
                    for features in features {
                        record(features, &mut accumulator);
                    }
                }
            }
        }
        info!("Processed {} events", accumulator.num_events());
        Ok(accumulator)
    }
}

fn record(features: EventFeatures, accumulator: &mut EventAccumulator) {
    counter!(EVENTS_PROCESSED).increment(1);
    let mut valid = 0;
    for fault in features.wires.iter().map(|wire| wire.verdict.fault()) {
        match fault {
            None => valid += 1,
            Some(fault) => {
                counter!(FAILURES, &[failures::get_label(fault.failure_kind())]).increment(1);
            }
        }
    }
    counter!(VALID_WIRES).increment(valid);
    accumulator.accumulate(features);
}

fn on_load_error(e: &LoadError) {
    error!("{e}");
    counter!(
        FAILURES,
        &[failures::get_label(FailureKind::MalformedRecord)]
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ConfigError, RecordFault},
        loader::EventReader,
    };
    use dct_common::Voltage;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use std::io::Cursor;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            num_wires: 6,
            num_time_steps: 60,
            num_adcs: 12,
            roi_size: 12,
            adc_offsets: vec![2, -2, 1],
            threshold_offsets: vec![0, 5, -5],
            ..Default::default()
        }
    }

    /// Builds random events, some with a pulse per wire and a few saturated channels.
    fn random_frames(
        rng: &mut StdRng,
        config: &AnalysisConfig,
        events: usize,
    ) -> Vec<WaveformFrame> {
        (0..events)
            .map(|_| {
                let channels = (0..config.num_adcs)
                    .map(|_| {
                        let pulse_at = rng.random_range(0..config.num_time_steps);
                        let depth: Voltage = rng.random_range(-400..=0);
                        let saturated = rng.random_bool(0.05);
                        (0..config.num_time_steps)
                            .map(|t| {
                                let noise: Voltage = rng.random_range(-8..=8);
                                let value = match t.abs_diff(pulse_at) {
                                    0 => depth,
                                    1..=3 => depth / 2,
                                    _ => 0,
                                } + noise;
                                if saturated && t == pulse_at { -2500 } else { value }
                            })
                            .collect()
                    })
                    .collect();
                WaveformFrame::from_channels(channels)
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = AnalysisConfig {
            num_time_steps: 0,
            ..Default::default()
        };
        assert!(matches!(
            RunDriver::new(config),
            Err(RunError::Config(ConfigError::NoTimeSteps))
        ));
    }

    #[test]
    fn rejects_empty_roi() {
        let config = AnalysisConfig {
            roi_size: 0,
            min_e_start: 0,
            ..Default::default()
        };
        assert!(matches!(
            RunDriver::new(config),
            Err(RunError::Config(ConfigError::EmptyRoi))
        ));
    }

    #[test]
    fn rerun_is_identical() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let frames = random_frames(&mut rng, &config, 40);
        let driver = RunDriver::new(config).unwrap();

        let first = driver.run(frames.clone().into_iter().map(Ok)).unwrap();
        let second = driver.run(frames.into_iter().map(Ok)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.num_events(), 40);
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(42);
        let frames = random_frames(&mut rng, &config, 37);
        let sequential = RunDriver::new(config.clone())
            .unwrap()
            .run(frames.clone().into_iter().map(Ok))
            .unwrap();
        for chunk in [1, 4, 64] {
            let parallel = RunDriver::new(config.clone())
                .unwrap()
                .with_parallel_chunk(NonZeroUsize::new(chunk))
                .run(frames.clone().into_iter().map(Ok))
                .unwrap();
            assert_eq!(parallel, sequential);
        }
    }

    #[test]
    fn valid_wires_satisfy_roi_invariants() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(7);
        let frames = random_frames(&mut rng, &config, 60);
        let run = RunDriver::new(config)
            .unwrap()
            .run(frames.into_iter().map(Ok))
            .unwrap();

        let mut valid = 0;
        for wire in run.events().iter().flat_map(|event| &event.wires) {
            if wire.is_valid() {
                valid += 1;
                assert!(wire.roi.end > wire.roi.start);
                assert!(wire.min.is_some());
            } else {
                assert_eq!(wire.integral, None);
            }
        }
        assert!(valid > 0);
    }

    #[test]
    fn malformed_record_aborts_with_event_index() {
        let config = AnalysisConfig {
            num_wires: 1,
            num_time_steps: 3,
            num_adcs: 2,
            roi_size: 1,
            adc_offsets: Vec::new(),
            threshold_offsets: Vec::new(),
            ..Default::default()
        };
        let input = "0,0\n-90,0\n0,0\n0,0\n0,oops\n0,0\n";
        let reader = EventReader::new(Cursor::new(input), &config);
        let error = RunDriver::new(config).unwrap().run(reader).unwrap_err();

        assert!(matches!(
            error,
            RunError::Load(LoadError::MalformedRecord {
                event: 1,
                line: 5,
                fault: RecordFault::InvalidToken { .. }
            })
        ));
    }

    #[test]
    fn reads_and_accumulates_text_events() {
        let config = AnalysisConfig {
            num_wires: 1,
            num_time_steps: 4,
            num_adcs: 2,
            roi_size: 2,
            adc_offsets: vec![1],
            threshold_offsets: Vec::new(),
            ..Default::default()
        };
        // Event 0 has a pulse, event 1 is quiet.
        let input = "1,0\n-49,-50\n1,-20\n1,0\n1,0\n1,0\n1,0\n1,0\n";
        let reader = EventReader::new(Cursor::new(input), &config);
        let run = RunDriver::new(config)
            .unwrap()
            .with_coincidence_wires(vec![0])
            .run(reader)
            .unwrap();

        assert_eq!(run.num_events(), 2);
        let series = run.wire(0).unwrap();
        assert_eq!(series.min_value.get(0), Some(-100));
        assert_eq!(series.min_location.get(0), Some(1));
        assert_eq!(series.start.get(0), Some(0));
        assert_eq!(series.drift_time.get(0), Some(3));
        assert_eq!(series.integral.get(0), Some(-120));
        assert_eq!(series.dndt.get(0), Some(0));
        assert_eq!(series.min_value.get(1), None);
        assert_eq!(run.event_min().len(), 2);
        assert_eq!(run.coincidences(), 1);
    }
}
