//! Server selection for hopline.
//!
//! Given one dialer per discovered endpoint, [`ServerSelector`] picks the
//! one to use by [`SelectionPolicy`]: the first, a random one, or the one
//! whose [`HttpProbe`] against a benchmark URL completes first.

pub mod error;
pub mod policy;
pub mod probe;
pub mod selector;

pub use error::{ProbeError, SelectionError};
pub use policy::SelectionPolicy;
pub use probe::{HttpProbe, Probe};
pub use selector::{Selection, ServerSelector};
