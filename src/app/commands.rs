//! Inbound commands to the node service.
//!
//! These represent actions requested by the outside world (button,
//! provisioning, tests) that the [`NodeService`](super::service::NodeService)
//! interprets and acts upon.

use crate::config::NodeConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Flip the publishing-enabled flag (button press).
    TogglePublishing,

    /// Hot-reload configuration.  A changed window size discards the
    /// samples collected so far.
    UpdateConfig(NodeConfig),
}
