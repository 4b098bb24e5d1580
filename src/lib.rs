pub mod check;
pub mod features;
pub mod group;
pub mod models;
pub mod ports;
pub mod proc;
pub mod registry;
pub mod sync;
pub mod urid;
pub mod worker;

pub use check::{Issue, IssueKind, PluginCheck, PluginKind};
pub use features::BlockLengths;
pub use group::{ControlGroup, GroupSettings};
pub use proc::{PluginState, Processor};
pub use registry::{Lv2Context, PluginInfo};
pub use worker::WorkerMode;
