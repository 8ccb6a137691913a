//! Raw engine buffer descriptions
//!
//! A [`BufferHandle`] is what the engine hands out when asked for an array:
//! a pointer to the first selected row, the row count and width, the element
//! type, where the memory lives, and whether callers may write through it.
//!
//! # Row Layout
//!
//! ```text
//! ┌───────────────────────────────┬───────────────────────┐
//! │ local rows (0..n_local)       │ ghost rows (n_ghost)  │
//! └───────────────────────────────┴───────────────────────┘
//!   plain name: ─────────────────┘
//!   ghost_ prefix:                 └──────────────────────┘
//!   _with_ghosts suffix: ────────────────────────────────┘
//! ```

use std::ops::Range;
use std::ptr::NonNull;

use crate::dtype::DType;

/// Where the memory behind a buffer lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Ordinary host memory, directly addressable by the caller
    Host,
    /// Device memory, only reachable through explicit transfers
    Device,
}

/// Addressing flags passed to the engine on every fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GhostFlags {
    /// Select only the ghost rows
    pub ghost_only: bool,
    /// Select local and ghost rows together
    pub include_ghosts: bool,
}

impl GhostFlags {
    /// Local rows only
    pub const LOCAL: Self = Self::new(false, false);

    /// Ghost rows only
    pub const GHOST_ONLY: Self = Self::new(true, false);

    /// Local rows followed by ghost rows
    pub const WITH_GHOSTS: Self = Self::new(false, true);

    pub const fn new(ghost_only: bool, include_ghosts: bool) -> Self {
        Self {
            ghost_only,
            include_ghosts,
        }
    }

    /// Row range selected by these flags
    ///
    /// `ghost_only` takes precedence when both flags are set.
    pub const fn row_range(self, n_local: usize, n_ghost: usize) -> Range<usize> {
        if self.ghost_only {
            n_local..n_local + n_ghost
        } else if self.include_ghosts {
            0..n_local + n_ghost
        } else {
            0..n_local
        }
    }
}

/// Engine-owned raw buffer plus read-only flag
///
/// The handle never owns the memory it points to. It is only meaningful
/// between the engine's scope enter and exit hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle {
    ptr: NonNull<u8>,
    rows: usize,
    width: usize,
    dtype: DType,
    read_only: bool,
    location: MemoryLocation,
}

impl BufferHandle {
    /// Describe an engine buffer
    ///
    /// # Safety
    /// - `ptr` must point to `rows * width` contiguous, properly aligned
    ///   elements of `dtype` in `location` memory
    /// - The memory must stay allocated until the engine's scope exit hook runs
    pub const unsafe fn from_raw_parts(
        ptr: NonNull<u8>,
        rows: usize,
        width: usize,
        dtype: DType,
        read_only: bool,
        location: MemoryLocation,
    ) -> Self {
        Self {
            ptr,
            rows,
            width,
            dtype,
            read_only,
            location,
        }
    }

    /// Pointer to the first selected element
    #[inline]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Pointer as a non-null handle
    #[inline]
    pub const fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Raw address, as reported through array interfaces
    #[inline]
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Number of rows (particles, bonds, ...)
    #[inline]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Elements per row
    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub const fn location(&self) -> MemoryLocation {
        self.location
    }

    /// `(rows, width)`
    #[inline]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.width)
    }

    /// Total number of scalar elements
    #[inline]
    pub const fn element_count(&self) -> usize {
        self.rows * self.width
    }

    /// Total size in bytes
    #[inline]
    pub const fn byte_len(&self) -> usize {
        self.element_count() * self.dtype.size()
    }
}
