//! Application phases
//!
//! Options are applied in ascending phase rank. The builder runs its own
//! lifecycle steps (tracer provider, meter provider, server creation) between
//! the `Before*`/`After*` pairs.

use crate::error::AppError;
use std::fmt;

/// Ranked stage of the server bootstrap lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    Default = 0,
    BeforeTracerProvider = 1,
    AfterTracerProvider = 2,
    BeforeMeterProvider = 3,
    AfterMeterProvider = 4,
    BeforeServerCreate = 5,
    AfterServerCreate = 6,
    BeforeServicesAdded = 7,
    AfterServicesAdded = 8,
}

impl Phase {
    /// All phases in application order
    pub const ALL: [Phase; 9] = [
        Phase::Default,
        Phase::BeforeTracerProvider,
        Phase::AfterTracerProvider,
        Phase::BeforeMeterProvider,
        Phase::AfterMeterProvider,
        Phase::BeforeServerCreate,
        Phase::AfterServerCreate,
        Phase::BeforeServicesAdded,
        Phase::AfterServicesAdded,
    ];

    /// Integer rank of the phase
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Default => "default",
            Phase::BeforeTracerProvider => "before_tracer_provider",
            Phase::AfterTracerProvider => "after_tracer_provider",
            Phase::BeforeMeterProvider => "before_meter_provider",
            Phase::AfterMeterProvider => "after_meter_provider",
            Phase::BeforeServerCreate => "before_server_create",
            Phase::AfterServerCreate => "after_server_create",
            Phase::BeforeServicesAdded => "before_services_added",
            Phase::AfterServicesAdded => "after_services_added",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Phase {
    type Error = AppError;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        Phase::ALL
            .get(usize::from(rank))
            .copied()
            .ok_or_else(|| AppError::configuration(format!("unknown phase rank {rank}")))
    }
}
