//! Activity ports.
//!
//! A publisher page talks to activities (hosted documents from another
//! origin) through ports:
//! - [`ActivityIframePort`] for a document in an iframe
//! - [`ActivityWindowPort`] for a popup, with redirect as fallback
//! - [`ActivityHost`] for the hosted document's end
//!
//! [`ActivityPorts`] opens them and routes results to their requesters.

pub mod config;
pub mod error;
pub mod host;
pub mod messenger;
pub mod port;
pub mod ports;
pub mod redirect;
pub mod result;
pub mod timeout;

pub use config::{MemoryStorage, OpenOptions, PortsConfig, Storage, USER_TOKEN_KEY};
pub use error::{PortError, Result};
pub use host::ActivityHost;
pub use messenger::{Command, Envelope, Messenger, REQUEST_KEY, RESPONSE_KEY, SENTINEL};
pub use port::{
    ActivityIframePort, ActivityPortDef, ActivityWindowPort, PendingIframePort, PortState,
};
pub use ports::{ActivityPorts, OpenedWindow};
pub use redirect::{RedirectRequest, RedirectResponse};
pub use result::{ActivityMode, ActivityResult, ActivityResultCode};
pub use timeout::with_timeout;
