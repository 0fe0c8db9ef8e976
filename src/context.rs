//! Context management
//!
//! Creates the native context according to the backend cache state, exports
//! it as a portable context binary, and releases it on teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::binary::{self, ContainerBuilder};
use crate::cache::{BackendCache, CacheState};
use crate::error::{ContextError, Result};
use crate::handle::{OwnedContextHandle, RawContextHandle};
use crate::interface::{
    config_ref, BackendProvider, ContextConfigOption, DeviceProvider, NativeInterface,
};

/// Backend-specific hooks around context creation.
///
/// Both methods default to doing nothing, so a backend only overrides the
/// step it needs.
pub trait ContextVariant: Send {
    /// Append the native options this backend wants at creation time.
    fn make_config(&self, _options: &mut Vec<ContextConfigOption>) -> Result<()> {
        Ok(())
    }

    /// Finish setup once the native context exists.
    fn after_configure(
        &mut self,
        _handle: RawContextHandle,
        _interface: &dyn NativeInterface,
    ) -> Result<()> {
        Ok(())
    }
}

/// Variant with no extra options and no post-creation work.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultVariant;

impl ContextVariant for DefaultVariant {}

/// Owns one native context for a backend/device pair.
///
/// Not synchronized: one instance is driven from one thread at a time.
pub struct Context<V: ContextVariant = DefaultVariant> {
    interface: Arc<dyn NativeInterface>,
    backend: Arc<dyn BackendProvider>,
    device: Arc<dyn DeviceProvider>,
    cache: Arc<BackendCache>,
    variant: V,
    handle: OwnedContextHandle,
    binary_buffer: Vec<u8>,
    builder: ContainerBuilder,
}

impl Context<DefaultVariant> {
    pub fn new(
        interface: Arc<dyn NativeInterface>,
        backend: Arc<dyn BackendProvider>,
        device: Arc<dyn DeviceProvider>,
        cache: Arc<BackendCache>,
    ) -> Self {
        Self::with_variant(interface, backend, device, cache, DefaultVariant)
    }
}

impl<V: ContextVariant> Context<V> {
    pub fn with_variant(
        interface: Arc<dyn NativeInterface>,
        backend: Arc<dyn BackendProvider>,
        device: Arc<dyn DeviceProvider>,
        cache: Arc<BackendCache>,
        variant: V,
    ) -> Self {
        let handle = OwnedContextHandle::empty(interface.clone());
        Self {
            interface,
            backend,
            device,
            cache,
            variant,
            handle,
            binary_buffer: Vec::new(),
            builder: ContainerBuilder::new(),
        }
    }

    /// Create the native context.
    ///
    /// Restores from the cached blob in the `Deserialize` state and compiles
    /// fresh in `Serialize`/`OnlinePrepare`. Call once per context.
    pub fn configure(&mut self) -> Result<()> {
        let mut options = Vec::new();
        self.variant.make_config(&mut options).map_err(|e| {
            log::error!("Failed to make context config: {}", e);
            ContextError::internal("make_config", format!("failed to make context config: {e}"))
        })?;
        log::debug!("Context config: {} option(s)", options.len());

        let backend = self.backend.handle();
        let device = self.device.handle();
        let backend_id = self.interface.backend_id();

        let raw = match self.cache.state() {
            CacheState::Deserialize => {
                let info = binary::decode(self.cache.context_blob())?;
                log::info!(
                    "Creating context from binary (signature={}, size={})",
                    info.signature,
                    info.payload.len()
                );
                self.interface
                    .context_create_from_binary(backend, device, config_ref(&options), info.payload)
                    .map_err(|status| {
                        log::error!("Can't create context from binary. Error {}.", status);
                        ContextError::native(
                            "context_create_from_binary",
                            status,
                            "can't create context from binary",
                        )
                    })?
            }
            state @ (CacheState::Serialize | CacheState::OnlinePrepare) => {
                log::info!("Creating context ({:?})", state);
                self.interface
                    .context_create(backend, device, config_ref(&options))
                    .map_err(|status| {
                        log::error!(
                            "Failed to create context for Backend ID {}, error={}",
                            backend_id,
                            status
                        );
                        ContextError::native("context_create", status, "failed to create context")
                    })?
            }
            CacheState::Invalid => {
                log::error!("Context cache is invalid.");
                return Err(ContextError::internal("configure", "context cache is invalid"));
            }
        };

        if raw.is_null() {
            log::error!("Native layer returned a null context handle (Backend ID {})", backend_id);
            return Err(ContextError::internal(
                "context_create",
                "native layer returned a null context handle",
            ));
        }
        self.handle.adopt(raw);

        if let Err(e) = self.variant.after_configure(raw, self.interface.as_ref()) {
            log::error!("Post-creation setup failed: {}", e);
            self.handle.release();
            return Err(e);
        }

        log::info!("Context {:#x} ready (Backend ID {})", raw.as_raw(), backend_id);
        Ok(())
    }

    /// Export the live context as a context binary container.
    ///
    /// The returned bytes live in this context and stay untouched until the
    /// next export or until the context is dropped.
    pub fn context_binary(&mut self) -> Result<&[u8]> {
        if self.handle.is_empty() {
            return Err(ContextError::internal(
                "context_binary",
                "context is not configured",
            ));
        }
        let handle = self.handle.get();

        let binary_size = self.interface.context_get_binary_size(handle).map_err(|status| {
            log::error!(
                "Can't determine the size of graph binary to be saved to cache. Error {}",
                status
            );
            ContextError::native(
                "context_get_binary_size",
                status,
                "can't determine the size of the context binary",
            )
        })?;
        let binary_size = usize::try_from(binary_size).map_err(|_| {
            ContextError::internal(
                "context_get_binary_size",
                format!("binary size {binary_size} does not fit in memory"),
            )
        })?;

        self.builder.reset();
        self.binary_buffer.clear();
        self.binary_buffer.resize(binary_size, 0);

        let bytes_written = self
            .interface
            .context_get_binary(handle, &mut self.binary_buffer)
            .map_err(|status| {
                log::error!("Can't get graph binary to be saved to cache. Error {}", status);
                ContextError::native(
                    "context_get_binary",
                    status,
                    "can't get the context binary",
                )
            })?;

        if bytes_written > binary_size as u64 {
            log::error!(
                "Illegal written buffer size [{}] bytes. Cannot exceed allocated memory of [{}] bytes",
                bytes_written,
                binary_size
            );
            return Err(ContextError::internal(
                "context_get_binary",
                format!(
                    "native layer wrote {bytes_written} bytes into a {binary_size} byte buffer"
                ),
            ));
        }
        let written = &self.binary_buffer[..bytes_written as usize];

        let signature = next_signature();
        log::debug!(
            "Exporting context binary: signature={}, payload_size={}",
            signature,
            written.len()
        );
        Ok(self.builder.finish(&signature, written))
    }

    /// Release the native context. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.handle.release();
    }

    pub fn handle(&self) -> RawContextHandle {
        self.handle.get()
    }

    pub fn is_configured(&self) -> bool {
        !self.handle.is_empty()
    }

    pub fn cache(&self) -> &BackendCache {
        &self.cache
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }
}

static LAST_SIGNATURE: AtomicU64 = AtomicU64::new(0);

/// Freshness token for an exported binary.
///
/// Nanoseconds since the Unix epoch, bumped so that no two calls in this
/// process return the same value even when the clock does not advance.
fn next_signature() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut last = LAST_SIGNATURE.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_SIGNATURE.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next.to_string(),
            Err(actual) => last = actual,
        }
    }
}
