//! IP link layer contract
//!
//! The link layer frames IP packets over the data channel. The orchestrator
//! binds it in `AwaitRegistered`, raises carrier in `CarrierOn` and
//! releases it again on the way down.

use std::fmt;
use std::sync::Arc;

use crate::error::LinkError;
use crate::pipe::PipeHandle;

/// IP-carrying layer bound to a logical channel
pub trait IpLink: Send + Sync + fmt::Debug {
    /// Bind to `pipe`
    fn attach(&self, pipe: PipeHandle) -> Result<(), LinkError>;

    /// Unbind; a no-op when nothing is bound
    fn release(&self);

    /// Signal link-up
    fn carrier_on(&self);

    /// Signal link-down
    fn carrier_off(&self);

    /// Publish the link-layer address
    fn set_link_addr(&self, addr: &[u8]) -> Result<(), LinkError>;
}

/// Shared handle to a link layer
pub type LinkHandle = Arc<dyn IpLink>;
