//! Device array views
//!
//! Device memory is not addressable from the host, so a [`DeviceArray`] does
//! not hand out slices. It exposes the raw device pointer through an
//! [`ArrayInterface`] record for device-side consumers and stages data
//! through the engine's [`DeviceTransfer`] for host-side reads and writes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use snapview_engine::{DeviceTransfer, Element};
use snapview_sdk::BufferHandle;

use super::array::{check_dtype, check_len, check_writable, LocalArray};
use super::error::AccessResult;
use super::token::ScopeToken;

/// Array interface version reported by [`DeviceArray::array_interface`]
pub const ARRAY_INTERFACE_VERSION: u32 = 3;

/// Device array description in the CUDA array interface layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayInterface {
    /// `[rows]` for scalar fields, `[rows, width]` otherwise
    pub shape: Vec<usize>,
    /// Numpy-style type string, e.g. `<f8`
    pub typestr: String,
    /// `(device pointer, read_only)`
    pub data: (usize, bool),
    /// Always `None`: rows are C-contiguous
    pub strides: Option<Vec<usize>>,
    pub version: u32,
}

impl ArrayInterface {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// View of device memory
pub struct DeviceArray {
    label: String,
    buffer: BufferHandle,
    token: ScopeToken,
    transfer: Arc<dyn DeviceTransfer>,
}

impl DeviceArray {
    /// # Safety
    /// `buffer` must describe device memory reachable through `transfer` that
    /// stays allocated for as long as `token` is live.
    pub(crate) unsafe fn new(
        label: String,
        buffer: BufferHandle,
        token: ScopeToken,
        transfer: Arc<dyn DeviceTransfer>,
    ) -> Self {
        Self {
            label,
            buffer,
            token,
            transfer,
        }
    }

    /// Describe the device buffer for zero-copy device consumers
    ///
    /// The pointer is only meaningful while the scope is open.
    pub fn array_interface(&self) -> AccessResult<ArrayInterface> {
        self.token.check_live(&self.label)?;
        let (rows, width) = self.buffer.shape();
        let shape = if width == 1 { vec![rows] } else { vec![rows, width] };
        Ok(ArrayInterface {
            shape,
            typestr: self.buffer.dtype().typestr().to_string(),
            data: (self.buffer.address(), self.buffer.is_read_only()),
            strides: None,
            version: ARRAY_INTERFACE_VERSION,
        })
    }

    /// Raw device address
    pub fn device_ptr(&self) -> AccessResult<usize> {
        self.token.check_live(&self.label)?;
        Ok(self.buffer.address())
    }
}

impl LocalArray for DeviceArray {
    fn label(&self) -> &str {
        &self.label
    }

    fn buffer(&self) -> &BufferHandle {
        &self.buffer
    }

    fn token(&self) -> &ScopeToken {
        &self.token
    }

    /// Stage the viewed elements device -> host
    fn to_vec<T: Element>(&self) -> AccessResult<Vec<T>> {
        let _borrow = self.token.shared(&self.label)?;
        check_dtype::<T>(&self.label, &self.buffer)?;
        let mut values = vec![T::zeroed(); self.buffer.element_count()];
        // SAFETY: the token is live so the device buffer is still allocated,
        // and it holds exactly element_count elements of T
        unsafe {
            self.transfer.copy_to_host(
                self.buffer.as_non_null(),
                bytemuck::cast_slice_mut(&mut values),
            );
        }
        Ok(values)
    }

    /// Stage `values` host -> device
    fn assign<T: Element>(&self, values: &[T]) -> AccessResult<()> {
        let _borrow = self.token.exclusive(&self.label)?;
        check_writable(&self.label, &self.buffer)?;
        check_dtype::<T>(&self.label, &self.buffer)?;
        check_len(&self.label, &self.buffer, values.len())?;
        // SAFETY: as in `to_vec`; the exclusive borrow rules out overlapping
        // transfers from this scope
        unsafe {
            self.transfer
                .copy_to_device(bytemuck::cast_slice(values), self.buffer.as_non_null());
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceArray")
            .field("label", &self.label)
            .field("shape", &self.buffer.shape())
            .field("dtype", &self.buffer.dtype())
            .field("read_only", &self.buffer.is_read_only())
            .field("valid", &self.token.is_live())
            .field("transfer", &self.transfer)
            .finish()
    }
}
