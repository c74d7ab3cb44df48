//! reqprof core library: cycle-safe value dumping and the per-request
//! profile record lifecycle (mark, capture, finalize, history, gc).

mod callsite;
mod clock;
mod config;
mod error;
mod highlight;
mod inspector;
mod profiler;
mod record;
mod registry;
mod request;
mod store;
mod value;

pub use callsite::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use highlight::*;
pub use inspector::*;
pub use profiler::*;
pub use record::*;
pub use registry::*;
pub use request::*;
pub use store::*;
pub use value::*;
