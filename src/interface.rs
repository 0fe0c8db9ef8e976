//! Native interface facade
//!
//! The accelerator vendor's raw context operations, abstracted behind a
//! trait so the context manager never talks to the vendor library directly.

use crate::error::NativeStatus;
use crate::handle::{BackendHandle, DeviceHandle, RawContextHandle};

/// Scheduling priority requested for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPriority {
    Low,
    Normal,
    NormalHigh,
    High,
}

/// One native context configuration option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextConfigOption {
    Priority(ContextPriority),
    /// Restrict deserialization to the named graphs.
    EnableGraphs(Vec<String>),
    /// Upper bound, in bytes, the backend should aim for.
    MemoryLimitHint(u64),
    /// Keep the binary buffer alive for the lifetime of the context.
    PersistentBinary(bool),
}

/// Source of the backend handle a context is created against.
pub trait BackendProvider: Send + Sync {
    fn handle(&self) -> BackendHandle;
}

/// Source of the device handle a context is created against.
pub trait DeviceProvider: Send + Sync {
    fn handle(&self) -> DeviceHandle;
}

impl BackendProvider for BackendHandle {
    fn handle(&self) -> BackendHandle {
        *self
    }
}

impl DeviceProvider for DeviceHandle {
    fn handle(&self) -> DeviceHandle {
        *self
    }
}

/// Raw context operations of the native accelerator library.
///
/// `config` is `None` when no options were assembled; an empty slice is
/// never passed because some native calls treat the two differently.
/// Implementations shared between threads provide their own synchronization.
pub trait NativeInterface: Send + Sync {
    /// Backend identifier, used in diagnostics only.
    fn backend_id(&self) -> u32;

    fn context_create(
        &self,
        backend: BackendHandle,
        device: DeviceHandle,
        config: Option<&[ContextConfigOption]>,
    ) -> Result<RawContextHandle, NativeStatus>;

    fn context_create_from_binary(
        &self,
        backend: BackendHandle,
        device: DeviceHandle,
        config: Option<&[ContextConfigOption]>,
        binary: &[u8],
    ) -> Result<RawContextHandle, NativeStatus>;

    fn context_free(&self, context: RawContextHandle) -> Result<(), NativeStatus>;

    fn context_get_binary_size(&self, context: RawContextHandle) -> Result<u64, NativeStatus>;

    /// Write the context binary into `buffer` and return the number of bytes
    /// the native layer reports as written.
    fn context_get_binary(
        &self,
        context: RawContextHandle,
        buffer: &mut [u8],
    ) -> Result<u64, NativeStatus>;
}

/// Collapse an assembled option list into the form the native calls expect.
#[inline]
pub fn config_ref(options: &[ContextConfigOption]) -> Option<&[ContextConfigOption]> {
    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}
