//! Analysis constants and calibration tables.
use crate::error::ConfigError;
use dct_common::{Channel, Time, Voltage, WireIndex, right_channel};

/// Determines when a detected spike is considered to be over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCondition {
    /// The spike is over once the signal rises above `threshold + min_e_end_voltage`.
    Additive { min_e_end_voltage: Voltage },
    /// The spike is over once the signal rises above `threshold / thresh_frac`.
    Fractional { thresh_frac: Voltage },
}

impl CloseCondition {
    /// The level a wire signal must exceed for its spike to close.
    ///
    /// Division truncates toward zero, so with the default threshold of `-80` and
    /// a fraction of `8` the closing level is `-10`.
    pub fn closing_level(&self, threshold: Voltage) -> Voltage {
        match *self {
            Self::Additive { min_e_end_voltage } => threshold + min_e_end_voltage,
            Self::Fractional { thresh_frac } => threshold / thresh_frac,
        }
    }
}

/// Determines what happens when the start condition is met again after an event was found.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StartPolicy {
    /// Every later crossing before the spike closes moves the start forward.
    Retrigger,
    /// The first crossing fixes the start for the rest of the event.
    #[default]
    Lock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub num_wires: usize,
    pub num_time_steps: usize,
    pub num_adcs: usize,
    /// Width, in bins, of a region of interest whose spike never closes.
    pub roi_size: usize,
    /// Subtracted from each channel's raw reading. Channels past the end use `0`.
    pub adc_offsets: Vec<Voltage>,
    /// Added to `threshold` per wire. Wires past the end use `0`.
    pub threshold_offsets: Vec<Voltage>,
    pub threshold: Voltage,
    pub safe_minimum: Voltage,
    pub safe_maximum: Voltage,
    /// Number of bins before the threshold crossing included in the region of interest.
    pub min_e_start: usize,
    pub start_policy: StartPolicy,
    pub close_condition: CloseCondition,
}

pub const DEFAULT_ADC_OFFSETS: [Voltage; 16] =
    [-1, 1, -6, -7, 3, 4, -2, -1, 0, 1, -3, -2, -1, -1, -1, -1];
pub const DEFAULT_THRESHOLD_OFFSETS: [Voltage; 8] = [0, -7, 2, 0, 3, 2, -1, -7];

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            num_wires: 8,
            num_time_steps: 1000,
            num_adcs: 32,
            roi_size: 25,
            adc_offsets: DEFAULT_ADC_OFFSETS.to_vec(),
            threshold_offsets: DEFAULT_THRESHOLD_OFFSETS.to_vec(),
            threshold: -80,
            safe_minimum: -2000,
            safe_maximum: 25,
            min_e_start: 2,
            start_policy: StartPolicy::Lock,
            close_condition: CloseCondition::Fractional { thresh_frac: 8 },
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_time_steps == 0 {
            return Err(ConfigError::NoTimeSteps);
        }
        if self.num_wires > 0 && right_channel(self.num_wires - 1) >= self.num_adcs {
            return Err(ConfigError::TooFewChannels {
                wires: self.num_wires,
                channels: self.num_adcs,
            });
        }
        if self.roi_size == 0 {
            return Err(ConfigError::EmptyRoi);
        }
        if self.roi_size >= self.num_time_steps {
            return Err(ConfigError::RoiTooLarge {
                roi_size: self.roi_size,
                time_steps: self.num_time_steps,
            });
        }
        if self.adc_offsets.len() > self.num_adcs {
            return Err(ConfigError::TooManyAdcOffsets {
                offsets: self.adc_offsets.len(),
                channels: self.num_adcs,
            });
        }
        if self.threshold_offsets.len() > self.num_wires {
            return Err(ConfigError::TooManyThresholdOffsets {
                offsets: self.threshold_offsets.len(),
                wires: self.num_wires,
            });
        }
        if self.safe_minimum > self.safe_maximum {
            return Err(ConfigError::InvertedSafeRange {
                minimum: self.safe_minimum,
                maximum: self.safe_maximum,
            });
        }
        if let CloseCondition::Fractional { thresh_frac: 0 } = self.close_condition {
            return Err(ConfigError::ZeroThresholdFraction);
        }
        Ok(())
    }

    pub fn adc_offset(&self, channel: Channel) -> Voltage {
        self.adc_offsets.get(channel).copied().unwrap_or_default()
    }

    /// The wire's start threshold, `threshold + threshold_offsets[wire]`.
    pub fn wire_threshold(&self, wire: WireIndex) -> Voltage {
        self.threshold + self.threshold_offsets.get(wire).copied().unwrap_or_default()
    }

    pub fn in_safe_range(&self, value: Voltage) -> bool {
        (self.safe_minimum..=self.safe_maximum).contains(&value)
    }

    /// Start of the region of interest assigned to wires where no event was found.
    pub fn placeholder_start(&self) -> Time {
        self.num_time_steps - self.roi_size - 1
    }
}
