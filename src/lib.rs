//! Accelerator context lifecycle with portable context-binary caching.
//!
//! A [`Context`] owns one native accelerator context. Depending on the
//! [`BackendCache`] state it either compiles the context from scratch or
//! restores it from a previously exported context binary, and it can export
//! the live context as a self-describing container for later restores.
//!
//! ```no_run
//! use std::sync::Arc;
//! use accel_context::{BackendCache, CacheOptions, Context, NativeInterface};
//! use accel_context::handle::{BackendHandle, DeviceHandle};
//!
//! fn compile(native: Arc<dyn NativeInterface>, blob: Vec<u8>) -> accel_context::Result<Vec<u8>> {
//!     let cache = BackendCache::configure(blob, &CacheOptions::default());
//!     let mut ctx = Context::new(
//!         native,
//!         Arc::new(BackendHandle::from_raw(1)),
//!         Arc::new(DeviceHandle::from_raw(1)),
//!         Arc::new(cache),
//!     );
//!     ctx.configure()?;
//!     Ok(ctx.context_binary()?.to_vec())
//! }
//! ```

pub mod binary;
pub mod cache;
pub mod context;
pub mod error;
pub mod handle;
pub mod interface;

#[cfg(test)]
mod mock;

pub use binary::{ContainerBuilder, ContextBinary};
pub use cache::{BackendCache, CacheOptions, CacheState};
pub use context::{Context, ContextVariant, DefaultVariant};
pub use error::{ContextError, ErrorKind, FormatError, NativeStatus, Result};
pub use handle::{OwnedContextHandle, RawContextHandle};
pub use interface::{
    BackendProvider, ContextConfigOption, ContextPriority, DeviceProvider, NativeInterface,
};
