//! Extracts the features of every wire in an event.
use crate::{
    config::AnalysisConfig,
    detection::{RegionOfInterest, RoiDetector, RoiIntegral},
    error::WireFault,
    extraction::{ChannelExtrema, Extremum, scan_wire},
    frame::WaveformFrame,
};
use dct_common::{EventIndex, Voltage, WireIndex};
use tracing::{trace, warn};

/// Whether a wire's signal may contribute to the run's aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireVerdict {
    Valid,
    Invalid(WireFault),
}

impl WireVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn fault(&self) -> Option<WireFault> {
        match self {
            Self::Valid => None,
            Self::Invalid(fault) => Some(*fault),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFeatures {
    pub wire: WireIndex,
    pub left: ChannelExtrema,
    pub right: ChannelExtrema,
    /// Minimum of the combined signal over the scanned bins.
    pub min: Option<Extremum>,
    pub roi: RegionOfInterest,
    /// Only present for valid wires whose spike closed.
    pub integral: Option<RoiIntegral>,
    pub verdict: WireVerdict,
}

impl WireFeatures {
    pub fn is_valid(&self) -> bool {
        self.verdict.is_valid()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFeatures {
    pub index: EventIndex,
    pub wires: Vec<WireFeatures>,
}

impl EventFeatures {
    pub fn valid_wires(&self) -> impl Iterator<Item = &WireFeatures> {
        self.wires.iter().filter(|wire| wire.is_valid())
    }

    /// The lowest signal minimum among the valid wires.
    pub fn min_value(&self) -> Option<Voltage> {
        self.valid_wires()
            .filter_map(|wire| wire.min)
            .map(|min| min.value)
            .min()
    }
}

/// Runs extraction and detection over one wire's channel pair.
///
/// A wire with an out-of-range sample still has its region of interest
/// searched for over the bins scanned before the fault, but it is never valid.
pub fn extract_wire(
    wire: WireIndex,
    left: &[Voltage],
    right: &[Voltage],
    config: &AnalysisConfig,
) -> WireFeatures {
    let scan = scan_wire(wire, left, right, config);
    let min = scan.signal.min();
    let found = RoiDetector::for_wire(config, wire, min.map(|min| min.location))
        .detect(scan.signal.wire_sum());

    let verdict = match (scan.fault, found) {
        (Some(fault), _) => WireVerdict::Invalid(fault),
        (None, None) => WireVerdict::Invalid(WireFault::NoEventFound {
            threshold: config.wire_threshold(wire),
        }),
        (None, Some(_)) => WireVerdict::Valid,
    };
    let roi = found.unwrap_or_else(|| RegionOfInterest::placeholder(config));
    let integral = (verdict.is_valid() && roi.spike_over)
        .then(|| roi.integrate(scan.signal.wire_sum()))
        .flatten();

    trace!("Wire {wire}: {verdict:?}, {roi:?}");
    WireFeatures {
        wire,
        left: scan.left,
        right: scan.right,
        min,
        roi,
        integral,
        verdict,
    }
}

/// Extracts every wire of a frame. Wires whose channels are missing from the
/// frame are treated as empty signals, short channels are scanned as far as they go.
#[tracing::instrument(skip_all, fields(event = index, valid_wires))]
pub fn extract_event(
    index: EventIndex,
    frame: &WaveformFrame,
    config: &AnalysisConfig,
) -> EventFeatures {
    if frame.num_time_steps() != config.num_time_steps {
        warn!(
            "Event {index} has {} time steps, expected {}",
            frame.num_time_steps(),
            config.num_time_steps
        );
    }
    let wires = (0..config.num_wires)
        .map(|wire| {
            let (left, right) = frame.wire_pair(wire).unwrap_or_default();
            extract_wire(wire, left, right, config)
        })
        .collect();
    let event = EventFeatures { index, wires };
    tracing::Span::current().record("valid_wires", event.valid_wires().count());
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> AnalysisConfig {
        AnalysisConfig {
            num_wires: 2,
            num_time_steps: 50,
            num_adcs: 4,
            roi_size: 10,
            adc_offsets: Vec::new(),
            threshold_offsets: Vec::new(),
            ..Default::default()
        }
    }

    fn pulse(at: usize, depth: Voltage) -> Vec<Voltage> {
        (0..50usize)
            .map(|t| match t.abs_diff(at) {
                0 => depth,
                1 => depth / 2,
                2 => depth / 4,
                _ => 0,
            })
            .collect()
    }

    #[test]
    fn valid_wire() {
        let config = quiet_config();
        let left = pulse(20, -100);
        let right = pulse(20, -60);
        let features = extract_wire(0, &left, &right, &config);

        assert_eq!(features.verdict, WireVerdict::Valid);
        assert_eq!(
            features.min,
            Some(Extremum {
                value: -160,
                location: 20
            })
        );
        // Sum: bin 18 -40, bin 19 -80, bin 20 -160, bin 21 -80, bin 22 -40, bin 23 0.
        // Bin 20 is the first strictly below -80.
        assert_eq!(
            features.roi,
            RegionOfInterest {
                start: 18,
                end: 23,
                spike_over: true
            }
        );
        assert_eq!(
            features.integral,
            Some(RoiIntegral {
                integral: -400,
                dndt: -40
            })
        );
        assert_eq!(
            features.left.max,
            Some(Extremum {
                value: 0,
                location: 0
            })
        );
    }

    #[test]
    fn quiet_wire_gets_placeholder() {
        let config = quiet_config();
        let features = extract_wire(1, &[0; 50], &[-3; 50], &config);
        assert_eq!(
            features.verdict,
            WireVerdict::Invalid(WireFault::NoEventFound { threshold: -80 })
        );
        assert_eq!(
            features.roi,
            RegionOfInterest {
                start: 39,
                end: 49,
                spike_over: false
            }
        );
        assert_eq!(features.integral, None);
    }

    #[test]
    fn saturated_wire_has_no_integral() {
        let config = quiet_config();
        let mut left = pulse(10, -100);
        left[30] = -2500;
        let right = vec![0; 50];
        let features = extract_wire(0, &left, &right, &config);

        assert_eq!(
            features.verdict,
            WireVerdict::Invalid(WireFault::ChannelOutOfRange {
                channel: 0,
                time: 30,
                value: -2500
            })
        );
        assert!(features.roi.spike_over);
        assert_eq!(features.integral, None);
    }

    #[test]
    fn event_minimum_ignores_invalid_wires() {
        let config = quiet_config();
        let mut saturated = pulse(10, -300);
        saturated[40] = 100;
        let frame = WaveformFrame::from_channels(vec![
            saturated,
            vec![0; 50],
            pulse(25, -90),
            vec![0; 50],
        ]);
        let event = extract_event(3, &frame, &config);

        assert_eq!(event.index, 3);
        assert_eq!(event.wires.len(), 2);
        assert!(!event.wires[0].is_valid());
        assert!(event.wires[1].is_valid());
        assert_eq!(event.valid_wires().count(), 1);
        assert_eq!(event.min_value(), Some(-90));
    }

    #[test]
    fn missing_channels_are_empty() {
        let config = quiet_config();
        let frame = WaveformFrame::from_channels(vec![pulse(25, -90), vec![0; 50]]);
        let event = extract_event(0, &frame, &config);
        assert!(event.wires[0].is_valid());
        assert_eq!(
            event.wires[1].verdict,
            WireVerdict::Invalid(WireFault::NoEventFound { threshold: -80 })
        );
        assert_eq!(event.wires[1].min, None);
    }
}
