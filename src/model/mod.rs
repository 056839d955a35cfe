pub mod asset;
pub mod block;
pub mod chain;
pub mod edge;
pub mod protocol;
pub mod strategy;
pub mod wrap;

pub use asset::Asset;
pub use block::{Block, BlockId, BlockParams};
pub use chain::Chain;
pub use edge::{Edge, EdgeId};
pub use protocol::{Protocol, ProtocolCategory};
pub use strategy::Strategy;
pub use wrap::WrapStep;
