//! Array views over engine buffers
//!
//! A view pairs a [`BufferHandle`] with the [`ScopeToken`] of the scope that
//! fetched it. Every access checks the token first, so a view kept past its
//! scope fails with [`ScopeViolation::Expired`] instead of touching freed or
//! unlocked engine memory.
//!
//! [`ScopeViolation::Expired`]: super::ScopeViolation::Expired

use std::fmt;

use snapview_engine::Element;
use snapview_sdk::{BufferHandle, DType};

use super::error::{AccessError, AccessResult};
use super::token::ScopeToken;

/// Contract shared by host and device views
pub trait LocalArray: fmt::Debug {
    /// Request name this view was resolved from
    fn label(&self) -> &str;

    fn buffer(&self) -> &BufferHandle;

    fn token(&self) -> &ScopeToken;

    /// Whether the owning scope is still open
    fn is_valid(&self) -> bool {
        self.token().is_live()
    }

    fn is_read_only(&self) -> bool {
        self.buffer().is_read_only()
    }

    fn dtype(&self) -> DType {
        self.buffer().dtype()
    }

    /// `(rows, width)`
    fn shape(&self) -> (usize, usize) {
        self.buffer().shape()
    }

    /// Number of rows
    fn len(&self) -> usize {
        self.buffer().rows()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the viewed elements, row-major
    fn to_vec<T: Element>(&self) -> AccessResult<Vec<T>>;

    /// Overwrite every element, row-major
    fn assign<T: Element>(&self, values: &[T]) -> AccessResult<()>;

    /// Set every element to `value`
    fn fill<T: Element>(&self, value: T) -> AccessResult<()> {
        let values = vec![value; self.buffer().element_count()];
        self.assign(&values)
    }
}

pub(crate) fn check_dtype<T: Element>(label: &str, buffer: &BufferHandle) -> AccessResult<()> {
    if buffer.dtype() == T::DTYPE {
        Ok(())
    } else {
        Err(AccessError::DTypeMismatch {
            name: label.to_string(),
            stored: buffer.dtype(),
            requested: T::DTYPE,
        })
    }
}

pub(crate) fn check_writable(label: &str, buffer: &BufferHandle) -> AccessResult<()> {
    if buffer.is_read_only() {
        Err(AccessError::ReadOnlyField(label.to_string()))
    } else {
        Ok(())
    }
}

pub(crate) fn check_len(label: &str, buffer: &BufferHandle, actual: usize) -> AccessResult<()> {
    let expected = buffer.element_count();
    if expected == actual {
        Ok(())
    } else {
        Err(AccessError::LengthMismatch {
            name: label.to_string(),
            expected,
            actual,
        })
    }
}

/// Zero-copy view of host memory
///
/// Slices handed to [`read`](Self::read) and [`write`](Self::write) alias
/// engine storage directly; writes are visible to the engine immediately.
pub struct HostArray {
    label: String,
    buffer: BufferHandle,
    token: ScopeToken,
}

impl HostArray {
    /// # Safety
    /// `buffer` must describe host memory that stays valid and unaliased by
    /// the engine for as long as `token` is live.
    pub(crate) unsafe fn new(label: String, buffer: BufferHandle, token: ScopeToken) -> Self {
        Self {
            label,
            buffer,
            token,
        }
    }

    /// Run `f` over the viewed elements
    ///
    /// Holds a shared borrow of the whole scope while `f` runs, not just this
    /// column. Other reads may nest inside `f`, but any write through the
    /// same scope fails with
    /// [`ScopeViolation::Aliased`](crate::access::ScopeViolation::Aliased),
    /// even to another field.
    pub fn read<T: Element, R>(&self, f: impl FnOnce(&[T]) -> R) -> AccessResult<R> {
        let _borrow = self.token.shared(&self.label)?;
        check_dtype::<T>(&self.label, &self.buffer)?;
        // SAFETY: the token is live so the engine still holds this memory for
        // the scope, the dtype matches T, and the shared borrow excludes any
        // concurrent mutable slice from this scope
        let slice = unsafe {
            std::slice::from_raw_parts(self.buffer.as_ptr().cast::<T>(), self.buffer.element_count())
        };
        Ok(f(slice))
    }

    /// Run `f` over the viewed elements mutably
    ///
    /// Holds an exclusive borrow of the whole scope while `f` runs, so no
    /// other view of the scope can be read or written inside `f`.
    pub fn write<T: Element, R>(&self, f: impl FnOnce(&mut [T]) -> R) -> AccessResult<R> {
        let _borrow = self.token.exclusive(&self.label)?;
        check_writable(&self.label, &self.buffer)?;
        check_dtype::<T>(&self.label, &self.buffer)?;
        // SAFETY: as in `read`; the exclusive borrow rules out every other
        // slice into this scope's memory
        let slice = unsafe {
            std::slice::from_raw_parts_mut(
                self.buffer.as_ptr().cast::<T>(),
                self.buffer.element_count(),
            )
        };
        Ok(f(slice))
    }

    /// Element at `(row, col)`
    pub fn get<T: Element>(&self, row: usize, col: usize) -> AccessResult<T> {
        let (rows, width) = self.buffer.shape();
        if row >= rows || col >= width {
            return Err(AccessError::OutOfBounds {
                name: self.label.clone(),
                row,
                col,
                shape: (rows, width),
            });
        }
        self.read(|values: &[T]| values[row * width + col])
    }

    /// Copy one row
    pub fn row<T: Element>(&self, row: usize) -> AccessResult<Vec<T>> {
        let (rows, width) = self.buffer.shape();
        if row >= rows {
            return Err(AccessError::OutOfBounds {
                name: self.label.clone(),
                row,
                col: 0,
                shape: (rows, width),
            });
        }
        self.read(|values: &[T]| values[row * width..(row + 1) * width].to_vec())
    }
}

impl LocalArray for HostArray {
    fn label(&self) -> &str {
        &self.label
    }

    fn buffer(&self) -> &BufferHandle {
        &self.buffer
    }

    fn token(&self) -> &ScopeToken {
        &self.token
    }

    fn to_vec<T: Element>(&self) -> AccessResult<Vec<T>> {
        self.read(|values: &[T]| values.to_vec())
    }

    fn assign<T: Element>(&self, values: &[T]) -> AccessResult<()> {
        check_len(&self.label, &self.buffer, values.len())?;
        self.write(|dst: &mut [T]| dst.copy_from_slice(values))
    }

    fn fill<T: Element>(&self, value: T) -> AccessResult<()> {
        self.write(|dst: &mut [T]| dst.fill(value))
    }
}

impl fmt::Debug for HostArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("label", &self.label)
            .field("shape", &self.buffer.shape())
            .field("dtype", &self.buffer.dtype())
            .field("read_only", &self.buffer.is_read_only())
            .field("valid", &self.token.is_live())
            .finish()
    }
}
