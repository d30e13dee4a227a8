mod binner;
mod cancellation;
mod engine;
mod error;
mod peak;
mod rolling;
mod series;

pub use self::{
    binner::{OutOfDomainPolicy, TimeBinner},
    cancellation::Cancellation,
    engine::{BinDensity, GroupPeak, PeakReport, PeakRequest, PeakRollingEngine},
    error::Error,
    peak::Peak,
    rolling::{RollingSum, WindowPolicy},
    series::Series,
};
