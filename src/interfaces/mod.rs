pub mod policy;
pub mod transport;

pub use policy::{NetworkPolicy, PolicyResult, RequestPolicy};
pub use transport::Transport;
