//! Pure strategy engine: ordering, route optimization and simulation.
//!
//! Nothing in here performs I/O. Every call takes the full strategy
//! snapshot plus already-resolved market numbers and returns a fresh value.

pub mod optimizer;
pub mod risk;
pub mod simulator;
pub mod topo;

pub use optimizer::{OptimizeOutcome, RouteIncompatibility, optimize, optimize_with};
pub use risk::RiskLevel;
pub use simulator::{BlockOutcome, Flow, Simulation, SimulationResult, Visit, simulate};
pub use topo::{ExecutionOrder, LoopStage, Stage, execution_order};
