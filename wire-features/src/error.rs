use dct_common::{Channel, EventIndex, Time, Voltage, metrics::failures::FailureKind};
use thiserror::Error;

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one time step per event is required")]
    NoTimeSteps,
    #[error("Region of interest size must be at least one bin")]
    EmptyRoi,
    #[error("{wires} wires need more than {channels} channels")]
    TooFewChannels { wires: usize, channels: usize },
    #[error("Region of interest size {roi_size} must be less than {time_steps} time steps")]
    RoiTooLarge { roi_size: usize, time_steps: usize },
    #[error("{offsets} ADC offsets given for {channels} channels")]
    TooManyAdcOffsets { offsets: usize, channels: usize },
    #[error("{offsets} threshold offsets given for {wires} wires")]
    TooManyThresholdOffsets { offsets: usize, wires: usize },
    #[error("Safe minimum {minimum} is greater than safe maximum {maximum}")]
    InvertedSafeRange { minimum: Voltage, maximum: Voltage },
    #[error("Threshold fraction must be non-zero")]
    ZeroThresholdFraction,
}

/// Describes what is wrong with a row of the waveform file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordFault {
    #[error("expected {expected} values, found {found}")]
    TokenCount { expected: usize, found: usize },
    #[error("cannot parse '{token}' as an integer")]
    InvalidToken { token: String },
    #[error("subtracting offset {offset} from {value} overflows")]
    OffsetOverflow { value: Voltage, offset: Voltage },
    #[error("input ends after {rows} of {expected} rows")]
    Truncated { rows: usize, expected: usize },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO Error in event {event}: {source}")]
    IO {
        event: EventIndex,
        #[source]
        source: std::io::Error,
    },
    #[error("Read error in event {event}: {source}")]
    Read {
        event: EventIndex,
        #[source]
        source: csv::Error,
    },
    #[error("Malformed record in event {event} at line {line}: {fault}")]
    MalformedRecord {
        event: EventIndex,
        line: usize,
        fault: RecordFault,
    },
}

impl LoadError {
    /// Index of the event being read when the error occurred.
    pub fn event(&self) -> EventIndex {
        match self {
            Self::IO { event, .. }
            | Self::Read { event, .. }
            | Self::MalformedRecord { event, .. } => *event,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Load(#[from] LoadError),
}

/// Reasons a wire's signal is excluded from an event's aggregates.
///
/// These are recorded per wire and never abort a run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireFault {
    #[error("channel {channel} read {value} at bin {time}, outside the safe range")]
    ChannelOutOfRange {
        channel: Channel,
        time: Time,
        value: Voltage,
    },
    #[error("signal never crossed the threshold {threshold} before its minimum")]
    NoEventFound { threshold: Voltage },
}

impl WireFault {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ChannelOutOfRange { .. } => FailureKind::ChannelOutOfRange,
            Self::NoEventFound { .. } => FailureKind::NoEventFound,
        }
    }
}
