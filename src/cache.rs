//! Backend cache
//!
//! Holds the cache state that decides how a context gets created, plus the
//! previously persisted context blob when one is being restored.

use crate::binary;

/// How the next context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// The cache could not be set up; no context may be created from it.
    Invalid,
    /// No prior blob. Compile fresh; the result will be persisted.
    Serialize,
    /// A prior blob exists and must be restored.
    Deserialize,
    /// No prior blob. Compile fresh with just-in-time preparation.
    OnlinePrepare,
}

impl CacheState {
    /// Map a raw state tag. Unknown tags become `Invalid`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => CacheState::Serialize,
            2 => CacheState::Deserialize,
            3 => CacheState::OnlinePrepare,
            _ => CacheState::Invalid,
        }
    }
}

/// Options used when deriving the cache state from a blob.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Prepare graphs online instead of compiling for serialization.
    pub online_prepare: bool,
}

/// Cache state plus the persisted blob, shared read-only with contexts.
#[derive(Debug, Clone)]
pub struct BackendCache {
    state: CacheState,
    blob: Vec<u8>,
}

impl BackendCache {
    /// Build a cache with an explicit state.
    ///
    /// `blob` is only consulted in the `Deserialize` state.
    pub fn with_state(state: CacheState, blob: Vec<u8>) -> Self {
        Self { state, blob }
    }

    /// Derive the cache state from whatever blob the caller loaded.
    ///
    /// An empty blob means nothing was persisted yet. A non-empty blob must
    /// carry the container magic; otherwise the cache is marked invalid.
    pub fn configure(blob: Vec<u8>, options: &CacheOptions) -> Self {
        if blob.is_empty() {
            let state = if options.online_prepare {
                CacheState::OnlinePrepare
            } else {
                CacheState::Serialize
            };
            log::info!("No context binary cached, using {:?}", state);
            return Self { state, blob };
        }

        // Magic only; the digest is verified when the context decodes it.
        let state = if binary::is_container(&blob) {
            log::info!("Restoring context binary ({} bytes)", blob.len());
            CacheState::Deserialize
        } else {
            log::warn!("Cached context binary rejected: not a context binary container");
            CacheState::Invalid
        };

        Self { state, blob }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    /// The persisted context blob (empty unless restoring).
    pub fn context_blob(&self) -> &[u8] {
        &self.blob
    }
}
