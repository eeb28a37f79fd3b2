//! UDP channels to the server
//!
//! - The **command channel** sends requests to the server's command port and
//!   receives server info, responses, messages and, for unicast servers,
//!   frames.
//! - The **data channel** only receives: frames and model definitions
//!   streamed to the multicast group or straight to this host.

mod command;
mod dispatch;
mod socket;
mod stats;

pub(crate) use command::CommandChannel;
pub(crate) use dispatch::{ChannelKind, Dispatcher};
pub(crate) use socket::{bind_command_socket, bind_data_socket};
pub(crate) use stats::ChannelCounters;
pub use stats::ChannelStats;
