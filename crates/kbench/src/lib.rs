//! Shared-memory kernel benchmarks.
//!
//! [`GranularityController`] runs the multiply at a chosen loop level under a
//! thread ceiling, [`SectionDispatcher`] runs the four matrix kernels as
//! concurrent sections, and [`harness`] times everything against sequential
//! baselines and turns the measurements into a [`Report`].

pub mod controller;
mod error;
pub mod harness;
pub mod report;
pub mod sections;
pub mod timing;

pub use controller::{ControllerState, GranularityController};
pub use error::BenchError;
pub use harness::{DaxpyBench, GranularityBench, IntegrationBench, MatrixInputs, SectionsBench, ThreadSweep};
pub use report::{Report, ReportLine};
pub use sections::{DispatchReport, Section, SectionDispatcher};
pub use timing::{Speedup, TimingRecord};
