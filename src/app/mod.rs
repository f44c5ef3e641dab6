//! Application core: the node's phase logic with zero direct I/O.
//!
//! [`service::NodeService`] owns the rolling window, the delivery FIFO,
//! link state and the distrust counter, and runs the read, publish,
//! recover and fusion phases.  All interaction with hardware happens
//! through the **port traits** in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
