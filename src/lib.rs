//! Asynchronous document indexing service.
//!
//! Wires the pieces from `indexsvc-core` (queue, coordinator, indexer,
//! pools), `indexsvc-job-postgres` (durable storage), `indexsvc-search-es`
//! (bulk search client), and `indexsvc-generators` (document generators)
//! into a running process: [`monitor::IndexJobMonitor`] bridges the queue
//! and [`thread_pool::IndexThreadPool`]; [`rpc`] is the thin HTTP producer
//! surface; [`settings`] loads configuration from the environment.

pub mod monitor;
pub mod rpc;
pub mod settings;
pub mod thread_pool;

pub use monitor::IndexJobMonitor;
pub use rpc::{router, RpcState};
pub use settings::Settings;
pub use thread_pool::IndexThreadPool;
