pub mod value;
pub mod rule;
pub mod coil;
pub mod registry;
pub mod param;

pub use value::{ParamValue,RawValue,ValueKind};
pub use rule::EquivalenceRule;
pub use registry::{ParamRegistry,ParamSpec,RegistryConfig,ConfigError};
pub use param::Parameter;
