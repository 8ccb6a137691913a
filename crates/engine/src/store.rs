//! Column storage for one entity kind
//!
//! Every array of an entity kind is one contiguous column of
//! `(n_local + n_ghost) * width` elements, local rows first. Ghost rows are
//! copies of entities owned by neighbouring domains.

use std::marker::PhantomData;
use std::ptr::NonNull;

use bytemuck::Zeroable;
use snapview_sdk::{ArrayLayout, DType};

use crate::element::Element;
use crate::error::EngineError;

/// Typed backing vector of one array
#[derive(Debug, Clone)]
enum Column {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
}

/// Apply the same expression to whichever vector a column holds
macro_rules! each_column {
    ($column:expr, $vec:ident => $body:expr) => {
        match $column {
            Column::F32($vec) => $body,
            Column::F64($vec) => $body,
            Column::I32($vec) => $body,
            Column::U32($vec) => $body,
            Column::I64($vec) => $body,
            Column::U64($vec) => $body,
        }
    };
}

impl Column {
    fn zeroed(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F32 => Column::F32(vec![0.0; len]),
            DType::F64 => Column::F64(vec![0.0; len]),
            DType::I32 => Column::I32(vec![0; len]),
            DType::U32 => Column::U32(vec![0; len]),
            DType::I64 => Column::I64(vec![0; len]),
            DType::U64 => Column::U64(vec![0; len]),
        }
    }

    fn dtype(&self) -> DType {
        match self {
            Column::F32(_) => DType::F32,
            Column::F64(_) => DType::F64,
            Column::I32(_) => DType::I32,
            Column::U32(_) => DType::U32,
            Column::I64(_) => DType::I64,
            Column::U64(_) => DType::U64,
        }
    }

    fn resize(&mut self, len: usize) {
        each_column!(self, v => v.resize(len, Zeroable::zeroed()))
    }

    fn as_bytes(&self) -> &[u8] {
        each_column!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        each_column!(self, v => bytemuck::cast_slice_mut(v.as_mut_slice()))
    }

    fn base_ptr(&mut self) -> NonNull<u8> {
        let ptr = each_column!(self, v => v.as_mut_ptr().cast::<u8>());
        // SAFETY: Vec::as_mut_ptr is never null (dangling but non-null when empty)
        unsafe { NonNull::new_unchecked(ptr) }
    }
}

/// All arrays of one entity kind
#[derive(Debug, Clone)]
pub struct ArrayStore<K: ArrayLayout> {
    n_local: usize,
    n_ghost: usize,
    columns: Vec<Column>,
    _marker: PhantomData<K>,
}

impl<K: ArrayLayout> ArrayStore<K> {
    /// Create zero-filled storage for `n_local` local and `n_ghost` ghost rows
    pub fn new(n_local: usize, n_ghost: usize) -> Self {
        let rows = n_local + n_ghost;
        let columns = K::ALL
            .iter()
            .map(|array| Column::zeroed(array.dtype(), rows * array.width()))
            .collect();

        Self {
            n_local,
            n_ghost,
            columns,
            _marker: PhantomData,
        }
    }

    /// Number of local rows
    pub fn n_local(&self) -> usize {
        self.n_local
    }

    /// Number of ghost rows
    pub fn n_ghost(&self) -> usize {
        self.n_ghost
    }

    /// Local plus ghost rows
    pub fn rows(&self) -> usize {
        self.n_local + self.n_ghost
    }

    /// Change the row counts, zero-filling any new rows
    ///
    /// Existing values keep their flat position, so ghost rows are not
    /// preserved across a change of `n_local`.
    pub fn resize(&mut self, n_local: usize, n_ghost: usize) {
        self.n_local = n_local;
        self.n_ghost = n_ghost;
        let rows = self.rows();
        for (array, column) in K::ALL.iter().zip(self.columns.iter_mut()) {
            column.resize(rows * array.width());
        }
    }

    /// Whole column (local and ghost rows), flattened row-major
    pub fn get<T: Element>(&self, array: K) -> Result<&[T], EngineError> {
        let column = &self.columns[array.index()];
        check_dtype::<T, K>(array, column.dtype())?;
        bytemuck::try_cast_slice(column.as_bytes()).map_err(|_| EngineError::DTypeMismatch {
            array: array.accessor_name(),
            stored: column.dtype(),
            requested: T::DTYPE,
        })
    }

    /// Mutable whole column
    pub fn get_mut<T: Element>(&mut self, array: K) -> Result<&mut [T], EngineError> {
        let column = &mut self.columns[array.index()];
        let stored = column.dtype();
        check_dtype::<T, K>(array, stored)?;
        bytemuck::try_cast_slice_mut(column.as_bytes_mut()).map_err(|_| {
            EngineError::DTypeMismatch {
                array: array.accessor_name(),
                stored,
                requested: T::DTYPE,
            }
        })
    }

    /// Local rows only
    pub fn local<T: Element>(&self, array: K) -> Result<&[T], EngineError> {
        let end = self.n_local * array.width();
        Ok(&self.get::<T>(array)?[..end])
    }

    /// Ghost rows only
    pub fn ghosts<T: Element>(&self, array: K) -> Result<&[T], EngineError> {
        let start = self.n_local * array.width();
        Ok(&self.get::<T>(array)?[start..])
    }

    /// Overwrite a whole column
    pub fn set<T: Element>(&mut self, array: K, values: &[T]) -> Result<(), EngineError> {
        let expected = self.rows() * array.width();
        if values.len() != expected {
            return Err(EngineError::LengthMismatch {
                array: array.accessor_name(),
                expected,
                actual: values.len(),
            });
        }
        self.get_mut::<T>(array)?.copy_from_slice(values);
        Ok(())
    }

    pub(crate) fn column_bytes(&self, array: K) -> &[u8] {
        self.columns[array.index()].as_bytes()
    }

    pub(crate) fn column_bytes_mut(&mut self, array: K) -> &mut [u8] {
        self.columns[array.index()].as_bytes_mut()
    }

    /// Base pointer of every column, in [`ArrayLayout::ALL`] order
    ///
    /// Taken once per scope so later fetches never re-borrow the columns.
    pub(crate) fn base_ptrs(&mut self) -> Vec<NonNull<u8>> {
        self.columns.iter_mut().map(Column::base_ptr).collect()
    }
}

fn check_dtype<T: Element, K: ArrayLayout>(array: K, stored: DType) -> Result<(), EngineError> {
    if stored == T::DTYPE {
        Ok(())
    } else {
        Err(EngineError::DTypeMismatch {
            array: array.accessor_name(),
            stored,
            requested: T::DTYPE,
        })
    }
}
