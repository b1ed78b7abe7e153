//! Remote Object Service interface and an in-memory implementation.

pub mod memory;
pub mod traits;

pub use memory::{MemoryRemote, RemoteOp};
pub use traits::{ByteStream, RemoteObjectService};
