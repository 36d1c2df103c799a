use clap::{Parser, Subcommand};
use dct_common::Voltage;
use wire_features::{
    AnalysisConfig, CloseCondition, StartPolicy,
    config::{DEFAULT_ADC_OFFSETS, DEFAULT_THRESHOLD_OFFSETS},
};

#[derive(Debug, Clone, Parser)]
pub(crate) struct AnalysisParameters {
    /// Number of wires, each read from two consecutive channels
    #[clap(long, default_value = "8")]
    pub(crate) num_wires: usize,

    /// Number of time steps (rows) in each event
    #[clap(long, default_value = "1000")]
    pub(crate) num_time_steps: usize,

    /// Number of ADC channels (values per row)
    #[clap(long, default_value = "32")]
    pub(crate) num_adcs: usize,

    /// Width of a region of interest whose spike never closes
    #[clap(long, default_value = "25")]
    pub(crate) roi_size: usize,

    /// Subtracted from each channel, in channel order. Unlisted channels use 0
    #[clap(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = DEFAULT_ADC_OFFSETS
    )]
    pub(crate) adc_offsets: Vec<Voltage>,

    /// Added to the threshold of each wire, in wire order. Unlisted wires use 0
    #[clap(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = DEFAULT_THRESHOLD_OFFSETS
    )]
    pub(crate) threshold_offsets: Vec<Voltage>,

    /// Base threshold the wire signal must fall below to start an event
    #[clap(long, default_value = "-80", allow_hyphen_values = true)]
    pub(crate) threshold: Voltage,

    /// Lowest sample accepted before a wire is marked out of range
    #[clap(long, default_value = "-2000", allow_hyphen_values = true)]
    pub(crate) safe_minimum: Voltage,

    /// Highest sample accepted before a wire is marked out of range
    #[clap(long, default_value = "25", allow_hyphen_values = true)]
    pub(crate) safe_maximum: Voltage,

    /// Number of bins before the threshold crossing included in the region of interest
    #[clap(long, default_value = "2")]
    pub(crate) min_e_start: usize,

    /// What to do when the threshold is crossed again before the spike closes
    #[clap(long, value_enum, default_value_t = StartPolicy::Lock)]
    pub(crate) start_policy: StartPolicy,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum CloseMode {
    #[clap(about = "The spike closes once the signal rises above threshold + min_e_end_voltage.")]
    Additive {
        #[clap(long, default_value = "4", allow_hyphen_values = true)]
        min_e_end_voltage: Voltage,
    },
    #[clap(about = "The spike closes once the signal rises above threshold / thresh_frac.")]
    Fractional {
        #[clap(long, default_value = "8", allow_hyphen_values = true)]
        thresh_frac: Voltage,
    },
}

impl From<&CloseMode> for CloseCondition {
    fn from(mode: &CloseMode) -> Self {
        match *mode {
            CloseMode::Additive { min_e_end_voltage } => Self::Additive { min_e_end_voltage },
            CloseMode::Fractional { thresh_frac } => Self::Fractional { thresh_frac },
        }
    }
}

impl AnalysisParameters {
    /// Combines these parameters with the close rule.
    /// Without one, the spike closes at a fraction of 8 of the threshold.
    pub(crate) fn to_config(&self, close_mode: Option<&CloseMode>) -> AnalysisConfig {
        AnalysisConfig {
            num_wires: self.num_wires,
            num_time_steps: self.num_time_steps,
            num_adcs: self.num_adcs,
            roi_size: self.roi_size,
            adc_offsets: self.adc_offsets.clone(),
            threshold_offsets: self.threshold_offsets.clone(),
            threshold: self.threshold,
            safe_minimum: self.safe_minimum,
            safe_maximum: self.safe_maximum,
            min_e_start: self.min_e_start,
            start_policy: self.start_policy,
            close_condition: close_mode
                .map(CloseCondition::from)
                .unwrap_or(CloseCondition::Fractional { thresh_frac: 8 }),
        }
    }
}
