use metrics::{describe_counter, describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "dct_analysis_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "version" => version).set(1);
}

pub fn describe_metrics() {
    describe_counter!(
        names::EVENTS_PROCESSED,
        metrics::Unit::Count,
        "Number of events read and processed"
    );
    describe_counter!(
        names::VALID_WIRES,
        metrics::Unit::Count,
        "Number of wire signals accepted into the run series"
    );
    describe_counter!(
        names::FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
}

pub mod names {
    pub const EVENTS_PROCESSED: &str = "dct_analysis_events_processed";
    pub const VALID_WIRES: &str = "dct_analysis_valid_wires";
    pub const FAILURES: &str = "dct_analysis_failures";
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, strum::IntoStaticStr)]
    #[strum(serialize_all = "snake_case")]
    pub enum FailureKind {
        MalformedRecord,
        ChannelOutOfRange,
        NoEventFound,
        FileWriteFailed,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        ("failure_kind", failure_kind.into())
    }
}
