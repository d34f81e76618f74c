//! Packet-forwarding engine for a weft mesh-fabric router node.
//!
//! The forwarder sits on the data path between xgress endpoints and peer
//! links. For each payload it looks up the owning session's forward
//! table, resolves the source address to a destination address, and hands
//! the payload to whatever is registered there. The control plane
//! installs and removes that state through route/unroute; the idle
//! scanner and per-session unroute timeout workers reclaim it when
//! traffic stops.
//!
//! The engine holds no persistent state and exposes no locks to callers:
//! all shared tables use sharded concurrent maps, sized for a data path
//! where lookups dominate mutations by orders of magnitude.

pub mod faulter;
pub mod forwarder;
pub mod logging;
pub mod metrics;
pub mod options;
pub mod scanner;
pub mod shutdown;
pub mod tables;
pub mod trace;

pub use self::faulter::{FaultReport, FaultSink, Faulter};
pub use self::forwarder::{ForwardSpec, Forwarder, RouteSpec};
pub use self::metrics::ForwarderMetrics;
pub use self::options::Options;
pub use self::scanner::Scanner;
pub use self::shutdown::CloseSignal;
pub use self::tables::{AddressMap, ForwardTable, SessionTable};
pub use self::trace::{TraceController, TraceEvent};
