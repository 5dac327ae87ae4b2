pub mod audit;
pub mod config;
pub mod deadline;
pub mod discovery;
pub mod lock;
pub mod migration;
pub mod permissions;
pub mod results;
pub mod snapshot;
pub mod storage;
pub mod worklist;
