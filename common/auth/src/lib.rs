pub mod claims;
pub mod client;
pub mod config;
pub mod error;
pub mod extractors;
pub mod gate;
pub mod layer;
pub mod mesh;
pub mod policy;

pub use claims::{ValidationRequest, ValidationResult};
pub use client::{CallContext, ServiceClient, ServiceResponse, TransportError};
pub use config::GateConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::{bearer_token, AuthContext};
pub use gate::{AuthGate, GateRejection, GateStage};
pub use layer::{AuthGuardLayer, AuthGuardService};
pub use mesh::{MeshClient, ServiceResolver, StaticResolver};
pub use policy::AuthPolicy;
