// crates/lattice-reputation/src/lib.rs
//
// lattice-reputation: EigenTrust reputation engine for the Lattice storage
// network.
//
// Every node turns locally reported trust opinions into globally agreed
// trust scores through a damped, iterative fixed-point computation. The
// controller drives iterations of an epoch one after another; the
// calculator computes each iteration's per-peer values in parallel on a
// bounded worker pool and streams them to the intermediate or final sink.

pub mod calculator;
pub mod collector;
pub mod config;
pub mod controller;
pub mod daughters;
pub mod initial;
pub mod policy;
pub mod pool;
pub mod sinks;
pub mod snapshot;

pub use calculator::{CalculatePrm, Calculator, CalculatorPrm};
pub use collector::LocalTrustCollector;
pub use config::EigenTrustConfig;
pub use controller::{AbortSignal, Controller, DaughtersTrustCalculator, EpochReport, EpochState};
pub use daughters::{DaughterTrustIteratorProvider, DaughterTrusts};
pub use initial::{FixedInitialTrust, InitialTrustSource, NetmapInitialTrust};
pub use policy::{FixedIterations, Stabilization, TerminationPolicy};
pub use pool::{Batch, BatchReport, WorkerPool};
pub use sinks::{
    FinalResultTarget, FinalWriter, IntermediateWriter, IntermediateWriterProvider,
    MemoryFinalTarget, MemoryIntermediateTarget,
};
pub use snapshot::GlobalTrust;
