//! Recording mock of the native interface, for tests.

use std::sync::{Mutex, MutexGuard};

use crate::error::NativeStatus;
use crate::handle::{BackendHandle, DeviceHandle, RawContextHandle};
use crate::interface::{ContextConfigOption, NativeInterface};

/// One recorded native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        backend: BackendHandle,
        device: DeviceHandle,
        config: Option<Vec<ContextConfigOption>>,
    },
    CreateFromBinary {
        backend: BackendHandle,
        device: DeviceHandle,
        config: Option<Vec<ContextConfigOption>>,
        binary: Vec<u8>,
        len: usize,
    },
    Free(RawContextHandle),
    GetBinarySize(RawContextHandle),
    GetBinary {
        context: RawContextHandle,
        capacity: usize,
    },
}

/// Scripted results for each native operation.
pub struct Script {
    pub create: Result<RawContextHandle, NativeStatus>,
    pub create_from_binary: Result<RawContextHandle, NativeStatus>,
    pub free: Result<(), NativeStatus>,
    pub binary_size: Result<u64, NativeStatus>,
    /// Bytes reported as written; `None` reports the full buffer.
    pub written: Option<u64>,
    pub get_binary: Result<(), NativeStatus>,
    /// Fill pattern for exported bytes; byte `i` is `fill(i)`.
    pub fill: fn(usize) -> u8,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            create: Ok(RawContextHandle::from_raw(0xC0FFEE)),
            create_from_binary: Ok(RawContextHandle::from_raw(0xB1A5)),
            free: Ok(()),
            binary_size: Ok(1024),
            written: None,
            get_binary: Ok(()),
            fill: |i| (i % 251) as u8,
        }
    }
}

pub struct MockInterface {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

impl MockInterface {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl NativeInterface for MockInterface {
    fn backend_id(&self) -> u32 {
        6
    }

    fn context_create(
        &self,
        backend: BackendHandle,
        device: DeviceHandle,
        config: Option<&[ContextConfigOption]>,
    ) -> Result<RawContextHandle, NativeStatus> {
        self.record(Call::Create {
            backend,
            device,
            config: config.map(|c| c.to_vec()),
        });
        self.script().create
    }

    fn context_create_from_binary(
        &self,
        backend: BackendHandle,
        device: DeviceHandle,
        config: Option<&[ContextConfigOption]>,
        binary: &[u8],
    ) -> Result<RawContextHandle, NativeStatus> {
        self.record(Call::CreateFromBinary {
            backend,
            device,
            config: config.map(|c| c.to_vec()),
            binary: binary.to_vec(),
            len: binary.len(),
        });
        self.script().create_from_binary
    }

    fn context_free(&self, context: RawContextHandle) -> Result<(), NativeStatus> {
        self.record(Call::Free(context));
        self.script().free
    }

    fn context_get_binary_size(&self, context: RawContextHandle) -> Result<u64, NativeStatus> {
        self.record(Call::GetBinarySize(context));
        self.script().binary_size
    }

    fn context_get_binary(
        &self,
        context: RawContextHandle,
        buffer: &mut [u8],
    ) -> Result<u64, NativeStatus> {
        self.record(Call::GetBinary {
            context,
            capacity: buffer.len(),
        });
        let script = self.script();
        script.get_binary?;
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = (script.fill)(i);
        }
        Ok(script.written.unwrap_or(buffer.len() as u64))
    }
}
