//! Native handle types
//!
//! Backend, device and context handles are opaque identifiers owned by the
//! native layer. Zero is the null sentinel for all of them.

use std::sync::Arc;

use crate::interface::NativeInterface;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// The null (empty) handle.
            #[inline]
            pub const fn null() -> Self {
                Self(0)
            }

            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            #[inline]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::null()
            }
        }
    };
}

define_handle!(
    /// Handle of an initialized native backend.
    BackendHandle
);
define_handle!(
    /// Handle of an opened native device.
    DeviceHandle
);
define_handle!(
    /// Handle of a native context, as returned by the create calls.
    RawContextHandle
);

/// Exclusive owner of one native context.
///
/// Releasing is idempotent: the first `release()` frees the native context
/// and every later call (including the one from `Drop`) is a no-op. Native
/// failures during release are logged, never returned.
pub struct OwnedContextHandle {
    raw: RawContextHandle,
    interface: Arc<dyn NativeInterface>,
}

impl OwnedContextHandle {
    /// An owner that holds nothing yet.
    pub fn empty(interface: Arc<dyn NativeInterface>) -> Self {
        Self {
            raw: RawContextHandle::null(),
            interface,
        }
    }

    /// Take ownership of a freshly created native context.
    ///
    /// Any context already held is released first so that exactly one live
    /// native context is tracked at a time.
    pub fn adopt(&mut self, raw: RawContextHandle) {
        self.release();
        self.raw = raw;
    }

    #[inline]
    pub fn get(&self) -> RawContextHandle {
        self.raw
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_null()
    }

    /// Free the native context if one is held and reset to empty.
    pub fn release(&mut self) {
        if self.raw.is_null() {
            return;
        }

        log::info!("Destroying native context {:#x}", self.raw.as_raw());
        if let Err(status) = self.interface.context_free(self.raw) {
            log::error!(
                "Failed to free native context {:#x}. Backend ID {}, error {}",
                self.raw.as_raw(),
                self.interface.backend_id(),
                status
            );
        }
        self.raw = RawContextHandle::null();
    }
}

impl Drop for OwnedContextHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NativeStatus;
    use crate::mock::{Call, MockInterface};

    #[test]
    fn test_null_sentinel() {
        assert!(RawContextHandle::default().is_null());
        assert!(!BackendHandle::from_raw(7).is_null());
        assert_eq!(DeviceHandle::from_raw(9).as_raw(), 9);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mock = Arc::new(MockInterface::new());
        let mut owned = OwnedContextHandle::empty(mock.clone());
        owned.adopt(RawContextHandle::from_raw(0x10));

        owned.release();
        owned.release();
        assert!(owned.is_empty());
        assert_eq!(mock.count(|c| matches!(c, Call::Free(_))), 1);
    }

    #[test]
    fn test_release_failure_still_empties() {
        let mock = Arc::new(MockInterface::new());
        mock.script().free = Err(NativeStatus(6000));
        let mut owned = OwnedContextHandle::empty(mock.clone());
        owned.adopt(RawContextHandle::from_raw(0x20));

        owned.release();
        assert!(owned.is_empty());
        drop(owned);
        assert_eq!(mock.count(|c| matches!(c, Call::Free(_))), 1);
    }

    #[test]
    fn test_drop_releases_live_handle() {
        let mock = Arc::new(MockInterface::new());
        {
            let mut owned = OwnedContextHandle::empty(mock.clone());
            owned.adopt(RawContextHandle::from_raw(0x30));
        }
        assert_eq!(
            mock.calls(),
            vec![Call::Free(RawContextHandle::from_raw(0x30))]
        );
    }

    #[test]
    fn test_empty_drop_makes_no_native_call() {
        let mock = Arc::new(MockInterface::new());
        drop(OwnedContextHandle::empty(mock.clone()));
        assert!(mock.calls().is_empty());
    }
}
