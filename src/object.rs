//! Type-erased-by-tag operand views: the object model of the engine.
//!
//! An operand is described by its dimensions, row/column strides, and a set
//! of unary attributes (conjugation, transposition, structural markers).
//! Vectors are m x 1 objects; scalars travel separately as
//! [`Scalar`](crate::dtype::Scalar) attachments.
//!
//! - [`Matrix`]: owned column-major storage
//! - [`MatrixView`]: non-owning immutable view
//! - [`MatrixViewMut`]: non-owning mutable view
//!
//! Views created during blocked partitioning are sub-regions of a parent
//! buffer with adjusted base and dimensions but unchanged strides; they never
//! outlive the parent borrow.

use std::marker::PhantomData;

use crate::dtype::Elem;
use crate::error::{ObError, Result};

// ============================================================================
// Unary attributes and structure
// ============================================================================

/// Which triangle of a structured operand is stored/updated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Uplo {
    Lower,
    Upper,
}

/// Structural marker constraining which regions of an operand are
/// read/written.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Struc {
    General,
    Symmetric,
    Hermitian,
    Triangular,
    Diagonal,
}

/// Unary attribute flags carried by every view.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObjAttrs {
    pub struc: Struc,
    pub uplo: Option<Uplo>,
    pub unit_diag: bool,
    pub conj: bool,
    pub trans: bool,
}

impl Default for ObjAttrs {
    fn default() -> Self {
        ObjAttrs {
            struc: Struc::General,
            uplo: None,
            unit_diag: false,
            conj: false,
            trans: false,
        }
    }
}

// ============================================================================
// Bounds validation
// ============================================================================

/// Validate that all addressed offsets stay within `[0, len)`.
fn validate_bounds(len: usize, m: usize, n: usize, rs: isize, cs: isize, offset: isize) -> Result<()> {
    // A zero-dimension operand addresses nothing.
    if m == 0 || n == 0 {
        return Ok(());
    }
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (dim, stride) in [(m, rs), (n, cs)] {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(ObError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset.checked_add(end).ok_or(ObError::OffsetOverflow)?;
            } else {
                min_offset = min_offset.checked_add(end).ok_or(ObError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset < 0 || max_offset as usize >= len {
        return Err(ObError::OffsetOverflow);
    }
    Ok(())
}

// ============================================================================
// MatrixView
// ============================================================================

/// Immutable strided view of an m x n operand (n = 1 for vectors).
pub struct MatrixView<'a, T> {
    ptr: *const T,
    m: usize,
    n: usize,
    rs: isize,
    cs: isize,
    attrs: ObjAttrs,
    _marker: PhantomData<&'a [T]>,
}

unsafe impl<T: Sync> Send for MatrixView<'_, T> {}
unsafe impl<T: Sync> Sync for MatrixView<'_, T> {}

impl<T> Clone for MatrixView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MatrixView<'_, T> {}

impl<T> std::fmt::Debug for MatrixView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixView")
            .field("m", &self.m)
            .field("n", &self.n)
            .field("rs", &self.rs)
            .field("cs", &self.cs)
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl<'a, T> MatrixView<'a, T> {
    /// Create an m x n view over a borrowed slice.
    pub fn new(data: &'a [T], m: usize, n: usize, rs: isize, cs: isize, offset: isize) -> Result<Self> {
        validate_bounds(data.len(), m, n, rs, cs, offset)?;
        let ptr = unsafe { data.as_ptr().offset(offset) };
        Ok(Self {
            ptr,
            m,
            n,
            rs,
            cs,
            attrs: ObjAttrs::default(),
            _marker: PhantomData,
        })
    }

    /// Create an n-element vector view with the given increment.
    pub fn vector(data: &'a [T], n: usize, inc: isize, offset: isize) -> Result<Self> {
        Self::new(data, n, 1, inc, 0, offset)
    }

    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Vector length (valid for m x 1 objects).
    #[inline]
    pub fn len(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.has_zero_dim()
    }

    /// Dimensions after applying the transposition flag.
    #[inline]
    pub fn logical_dims(&self) -> (usize, usize) {
        if self.attrs.trans {
            (self.n, self.m)
        } else {
            (self.m, self.n)
        }
    }

    #[inline]
    pub fn row_stride(&self) -> isize {
        self.rs
    }

    #[inline]
    pub fn col_stride(&self) -> isize {
        self.cs
    }

    /// Vector increment (valid for m x 1 objects).
    #[inline]
    pub fn inc(&self) -> isize {
        self.rs
    }

    /// A zero-dimension operand participates in no arithmetic; every
    /// operation over it is a guaranteed no-op.
    #[inline]
    pub fn has_zero_dim(&self) -> bool {
        self.m == 0 || self.n == 0
    }

    #[inline]
    pub fn attrs(&self) -> ObjAttrs {
        self.attrs
    }

    #[inline]
    pub fn struc(&self) -> Struc {
        self.attrs.struc
    }

    #[inline]
    pub fn uplo(&self) -> Option<Uplo> {
        self.attrs.uplo
    }

    #[inline]
    pub fn is_conj(&self) -> bool {
        self.attrs.conj
    }

    #[inline]
    pub fn is_trans(&self) -> bool {
        self.attrs.trans
    }

    /// Toggle the conjugation flag (metadata only, no copy).
    pub fn conjugated(mut self) -> Self {
        self.attrs.conj = !self.attrs.conj;
        self
    }

    /// Toggle the transposition flag (metadata only, no copy).
    pub fn transposed(mut self) -> Self {
        self.attrs.trans = !self.attrs.trans;
        self
    }

    /// Declare a structural marker on this view.
    pub fn with_struc(mut self, struc: Struc, uplo: Option<Uplo>) -> Self {
        self.attrs.struc = struc;
        self.attrs.uplo = uplo;
        self
    }

    /// Element at storage-space indices (no attribute applied).
    ///
    /// Debug-asserted bounds; construction already validated the full range.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(i < self.m && j < self.n);
        unsafe { *self.ptr.offset(i as isize * self.rs + j as isize * self.cs) }
    }

    /// Sub-region with unchanged strides and attributes (storage space).
    pub fn subview(&self, i: usize, j: usize, bm: usize, bn: usize) -> Self {
        debug_assert!(i + bm <= self.m && j + bn <= self.n);
        let ptr = unsafe { self.ptr.offset(i as isize * self.rs + j as isize * self.cs) };
        Self {
            ptr,
            m: bm,
            n: bn,
            rs: self.rs,
            cs: self.cs,
            attrs: self.attrs,
            _marker: PhantomData,
        }
    }
}

impl<'a, T: Elem> MatrixView<'a, T> {
    /// Element at logical indices: transposition swaps indices, the
    /// conjugation flag is applied on read.
    #[inline]
    pub fn at_logical(&self, i: usize, j: usize) -> T {
        let v = if self.attrs.trans {
            self.at(j, i)
        } else {
            self.at(i, j)
        };
        if self.attrs.conj {
            v.conj()
        } else {
            v
        }
    }

    /// Block of `bk` logical columns starting at `p0`, preserving unary
    /// attributes. Used by blocked realizations partitioning the long
    /// dimension.
    pub fn logical_col_block(&self, p0: usize, bk: usize) -> Self {
        if self.attrs.trans {
            self.subview(p0, 0, bk, self.n)
        } else {
            self.subview(0, p0, self.m, bk)
        }
    }

    /// Block of `bm` logical rows starting at `i0`, preserving unary
    /// attributes.
    pub fn logical_row_block(&self, i0: usize, bm: usize) -> Self {
        if self.attrs.trans {
            self.subview(0, i0, self.m, bm)
        } else {
            self.subview(i0, 0, bm, self.n)
        }
    }
}

// ============================================================================
// MatrixViewMut
// ============================================================================

/// Mutable strided view of an m x n operand.
pub struct MatrixViewMut<'a, T> {
    ptr: *mut T,
    m: usize,
    n: usize,
    rs: isize,
    cs: isize,
    attrs: ObjAttrs,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for MatrixViewMut<'_, T> {}

impl<T> std::fmt::Debug for MatrixViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixViewMut")
            .field("m", &self.m)
            .field("n", &self.n)
            .field("rs", &self.rs)
            .field("cs", &self.cs)
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl<'a, T> MatrixViewMut<'a, T> {
    /// Create an m x n mutable view over a borrowed slice.
    pub fn new(
        data: &'a mut [T],
        m: usize,
        n: usize,
        rs: isize,
        cs: isize,
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), m, n, rs, cs, offset)?;
        let ptr = unsafe { data.as_mut_ptr().offset(offset) };
        Ok(Self {
            ptr,
            m,
            n,
            rs,
            cs,
            attrs: ObjAttrs::default(),
            _marker: PhantomData,
        })
    }

    /// Create an n-element mutable vector view with the given increment.
    pub fn vector(data: &'a mut [T], n: usize, inc: isize, offset: isize) -> Result<Self> {
        Self::new(data, n, 1, inc, 0, offset)
    }

    /// Reassemble a view from raw parts.
    ///
    /// # Safety
    /// `ptr` must address a live buffer covering every (i, j) of the view for
    /// the chosen lifetime, and no other live view may write to an
    /// overlapping region. Used to hand disjoint partition blocks to worker
    /// threads.
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        m: usize,
        n: usize,
        rs: isize,
        cs: isize,
        attrs: ObjAttrs,
    ) -> Self {
        Self {
            ptr,
            m,
            n,
            rs,
            cs,
            attrs,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.has_zero_dim()
    }

    #[inline]
    pub fn row_stride(&self) -> isize {
        self.rs
    }

    #[inline]
    pub fn col_stride(&self) -> isize {
        self.cs
    }

    #[inline]
    pub fn inc(&self) -> isize {
        self.rs
    }

    #[inline]
    pub fn has_zero_dim(&self) -> bool {
        self.m == 0 || self.n == 0
    }

    #[inline]
    pub fn attrs(&self) -> ObjAttrs {
        self.attrs
    }

    #[inline]
    pub fn struc(&self) -> Struc {
        self.attrs.struc
    }

    #[inline]
    pub fn uplo(&self) -> Option<Uplo> {
        self.attrs.uplo
    }

    pub fn with_struc(mut self, struc: Struc, uplo: Option<Uplo>) -> Self {
        self.attrs.struc = struc;
        self.attrs.uplo = uplo;
        self
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub fn at(&self, i: usize, j: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(i < self.m && j < self.n);
        unsafe { *self.ptr.offset(i as isize * self.rs + j as isize * self.cs) }
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        debug_assert!(i < self.m && j < self.n);
        unsafe {
            *self.ptr.offset(i as isize * self.rs + j as isize * self.cs) = value;
        }
    }

    /// Reborrow as an immutable view with the same attributes.
    pub fn as_view(&self) -> MatrixView<'_, T> {
        MatrixView {
            ptr: self.ptr as *const T,
            m: self.m,
            n: self.n,
            rs: self.rs,
            cs: self.cs,
            attrs: self.attrs,
            _marker: PhantomData,
        }
    }

    /// Reborrow mutably (shortens the lifetime, keeps exclusivity).
    pub fn rb(&mut self) -> MatrixViewMut<'_, T> {
        MatrixViewMut {
            ptr: self.ptr,
            m: self.m,
            n: self.n,
            rs: self.rs,
            cs: self.cs,
            attrs: self.attrs,
            _marker: PhantomData,
        }
    }

    /// Mutable sub-region with unchanged strides and attributes.
    pub fn subview_mut(&mut self, i: usize, j: usize, bm: usize, bn: usize) -> MatrixViewMut<'_, T> {
        debug_assert!(i + bm <= self.m && j + bn <= self.n);
        let ptr = unsafe { self.ptr.offset(i as isize * self.rs + j as isize * self.cs) };
        MatrixViewMut {
            ptr,
            m: bm,
            n: bn,
            rs: self.rs,
            cs: self.cs,
            attrs: self.attrs,
            _marker: PhantomData,
        }
    }

    /// Sub-region detached from the borrow of `self`.
    ///
    /// # Safety
    /// The caller must guarantee that concurrently live detached sub-regions
    /// are pairwise disjoint and that none of them is used after the parent
    /// view's buffer is gone. This is the partitioning seam for parallel
    /// workers, which write disjoint row blocks.
    pub unsafe fn subview_mut_detached(&self, i: usize, j: usize, bm: usize, bn: usize) -> MatrixViewMut<'a, T> {
        debug_assert!(i + bm <= self.m && j + bn <= self.n);
        let ptr = self.ptr.offset(i as isize * self.rs + j as isize * self.cs);
        MatrixViewMut {
            ptr,
            m: bm,
            n: bn,
            rs: self.rs,
            cs: self.cs,
            attrs: self.attrs,
            _marker: PhantomData,
        }
    }
}

// ============================================================================
// Matrix (owned)
// ============================================================================

/// Owned column-major m x n storage.
pub struct Matrix<T> {
    data: Vec<T>,
    m: usize,
    n: usize,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("m", &self.m)
            .field("n", &self.n)
            .finish()
    }
}

impl<T: Clone> Clone for Matrix<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            m: self.m,
            n: self.n,
        }
    }
}

impl<T: Copy + num_traits::Zero> Matrix<T> {
    /// Zero-filled column-major matrix.
    pub fn zeros(m: usize, n: usize) -> Self {
        Self {
            data: vec![T::zero(); m * n],
            m,
            n,
        }
    }
}

impl<T: Copy> Matrix<T> {
    /// Column-major matrix with values produced by `f(i, j)`.
    pub fn from_fn(m: usize, n: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(m * n);
        for j in 0..n {
            for i in 0..m {
                data.push(f(i, j));
            }
        }
        Self { data, m, n }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        assert!(i < self.m && j < self.n);
        self.data[j * self.m + i]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        assert!(i < self.m && j < self.n);
        self.data[j * self.m + i] = value;
    }
}

impl<T> Matrix<T> {
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Immutable view over the whole matrix.
    pub fn view(&self) -> MatrixView<'_, T> {
        MatrixView {
            ptr: self.data.as_ptr(),
            m: self.m,
            n: self.n,
            rs: 1,
            cs: self.m as isize,
            attrs: ObjAttrs::default(),
            _marker: PhantomData,
        }
    }

    /// Mutable view over the whole matrix.
    pub fn view_mut(&mut self) -> MatrixViewMut<'_, T> {
        MatrixViewMut {
            ptr: self.data.as_mut_ptr(),
            m: self.m,
            n: self.n,
            rs: 1,
            cs: self.m as isize,
            attrs: ObjAttrs::default(),
            _marker: PhantomData,
        }
    }
}
