//! Core types shared by every module: privilege levels, sessions,
//! transports and errors

pub mod error;
pub mod privilege;
pub mod session;
pub mod transport;

pub use error::{ContextError, GraphQLExecutionError};
pub use privilege::Privilege;
pub use session::{Session, SessionStrategy};
pub use transport::{ResponseHeaders, Transport};
