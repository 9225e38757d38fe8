//! Registration graph validation.
//!
//! Three independent checks run over a built [`RegistrationGraph`](crate::RegistrationGraph):
//!
//! - **Captive dependencies**: a consumer holding a shorter-lived dependency
//!   (Singleton → Scoped, Singleton → Transient, Scoped → Transient)
//! - **Resolvability**: every dependency reachable from a constructed service
//!   has a registration, is host provided, optional, or an enumerable with at
//!   least one registration
//! - **Implementation compatibility**: registrations written with runtime
//!   types name an implementation that actually provides the service
//!
//! The checks only read the graph and may run in parallel.

mod captive;
mod compatibility;
mod framework;
mod resolvability;

pub use captive::check_captive_dependencies;
pub use compatibility::check_implementation_compatibility;
pub use framework::FrameworkServices;
pub use resolvability::ResolvabilityChecker;
