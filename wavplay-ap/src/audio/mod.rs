//! Audio input path
//!
//! Where clip bytes come from (`source`, `backend`), what they mean
//! (`header`), and how they are adjusted before output (`transform`).

pub mod backend;
pub mod header;
pub mod source;
pub mod transform;

pub use backend::{Backend, EmbeddedBackend, FileBackend};
pub use header::{read_properties, AudioProperties, WavHeader, HEADER_SIZE, PAYLOAD_START};
pub use source::SourceDescriptor;
pub use transform::{apply_volume, swap_sample_bytes, SampleTransform};
