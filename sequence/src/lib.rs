pub mod imaging;
pub mod compare;

pub use imaging::{ImagingSequence,SourceDescriptor};
pub use compare::{compare,ComplianceReport,Mismatch};
