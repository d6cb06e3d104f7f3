//! Datatype tags, attached scalars, and the closed element-type set.
//!
//! Every operand carries a [`DataType`] tag combining a numeric domain
//! (real/complex) with a storage precision (single/double). The engine
//! supports exactly four concrete element types; the [`Elem`] trait is the
//! compile-time face of that closed set, and [`Scalar`] is its runtime face
//! used for attached scaling factors (which may differ in type from the
//! operands they scale).

use num_complex::{Complex32, Complex64};
use num_traits::{One, Zero};

/// Numeric domain of an operand or scalar.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    Real,
    Complex,
}

/// Storage precision of an operand or scalar.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Precision {
    Single,
    Double,
}

/// Runtime tag for the four supported (domain, precision) combinations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
    F64,
    C32,
    C64,
}

impl DataType {
    /// Number of supported datatypes (sizes per-datatype tables).
    pub const COUNT: usize = 4;

    pub fn domain(self) -> Domain {
        match self {
            DataType::F32 | DataType::F64 => Domain::Real,
            DataType::C32 | DataType::C64 => Domain::Complex,
        }
    }

    pub fn precision(self) -> Precision {
        match self {
            DataType::F32 | DataType::C32 => Precision::Single,
            DataType::F64 | DataType::C64 => Precision::Double,
        }
    }

    /// Dense index for per-datatype tables in the execution context.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            DataType::F32 => 0,
            DataType::F64 => 1,
            DataType::C32 => 2,
            DataType::C64 => 3,
        }
    }
}

// ============================================================================
// Scalar attachment
// ============================================================================

/// A typed scalar attached to an operation (alpha, beta).
///
/// Carries its own datatype tag, distinct from the operand datatypes, so a
/// double-precision factor can scale a single-precision operand when the
/// context enables mixed precision. Compared against the additive and
/// multiplicative identities to drive degeneracy elision.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    F32(f32),
    F64(f64),
    C32(Complex32),
    C64(Complex64),
}

impl Scalar {
    pub fn dtype(&self) -> DataType {
        match self {
            Scalar::F32(_) => DataType::F32,
            Scalar::F64(_) => DataType::F64,
            Scalar::C32(_) => DataType::C32,
            Scalar::C64(_) => DataType::C64,
        }
    }

    /// Exact comparison against the additive identity.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::F32(v) => v.is_zero(),
            Scalar::F64(v) => v.is_zero(),
            Scalar::C32(v) => v.is_zero(),
            Scalar::C64(v) => v.is_zero(),
        }
    }

    /// Exact comparison against the multiplicative identity.
    pub fn is_one(&self) -> bool {
        match self {
            Scalar::F32(v) => *v == 1.0,
            Scalar::F64(v) => *v == 1.0,
            Scalar::C32(v) => *v == Complex32::new(1.0, 0.0),
            Scalar::C64(v) => *v == Complex64::new(1.0, 0.0),
        }
    }

    /// Whether the imaginary part is exactly zero (always true for real tags).
    pub fn is_real(&self) -> bool {
        match self {
            Scalar::F32(_) | Scalar::F64(_) => true,
            Scalar::C32(v) => v.im == 0.0,
            Scalar::C64(v) => v.im == 0.0,
        }
    }

    /// Widen to the most general supported type. Internal stepping stone for
    /// precision conversion; see [`Elem::from_scalar`].
    pub(crate) fn widen(self) -> Complex64 {
        match self {
            Scalar::F32(v) => Complex64::new(v as f64, 0.0),
            Scalar::F64(v) => Complex64::new(v, 0.0),
            Scalar::C32(v) => Complex64::new(v.re as f64, v.im as f64),
            Scalar::C64(v) => v,
        }
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::F32(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<Complex32> for Scalar {
    fn from(v: Complex32) -> Self {
        Scalar::C32(v)
    }
}

impl From<Complex64> for Scalar {
    fn from(v: Complex64) -> Self {
        Scalar::C64(v)
    }
}

// ============================================================================
// Element trait (closed set)
// ============================================================================

/// The closed set of element types the engine computes with.
///
/// Realizations are generic over `Elem`; the runtime binding layer resolves
/// a [`DataType`] tag to one of the four implementors once per invocation.
pub trait Elem:
    Copy
    + Send
    + Sync
    + PartialEq
    + std::fmt::Debug
    + Zero
    + One
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Neg<Output = Self>
    + 'static
{
    const DTYPE: DataType;

    /// Complex conjugate (identity for real types).
    fn conj(self) -> Self;

    /// Projection onto the real axis (identity for real types). Used to keep
    /// the diagonal of a Hermitian operand real under accumulation.
    fn real_part(self) -> Self;

    /// `|re| + |im|`, widened to f64. The comparison key for
    /// index-of-max-absolute reductions.
    fn abs1(self) -> f64;

    /// Convert an attached scalar into this element type. Conversion to the
    /// accumulation type is always exact or widening for the combinations
    /// the binding layer admits; a complex scalar converted to a real type
    /// keeps its real part.
    fn from_scalar(s: Scalar) -> Self;

    /// Wrap a concrete value back into the runtime scalar form.
    fn to_scalar(self) -> Scalar;

    fn from_f64(v: f64) -> Self;

    /// Select this type's microkernel bundle from the execution context.
    /// The runtime face of the closed type set: one field per implementor.
    fn microkernels(ctx: &crate::context::ExecContext) -> &crate::kernels::Microkernels<Self>;
}

impl Elem for f32 {
    const DTYPE: DataType = DataType::F32;

    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn real_part(self) -> Self {
        self
    }

    #[inline]
    fn abs1(self) -> f64 {
        self.abs() as f64
    }

    fn from_scalar(s: Scalar) -> Self {
        s.widen().re as f32
    }

    fn to_scalar(self) -> Scalar {
        Scalar::F32(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn microkernels(ctx: &crate::context::ExecContext) -> &crate::kernels::Microkernels<Self> {
        &ctx.mk_f32
    }
}

impl Elem for f64 {
    const DTYPE: DataType = DataType::F64;

    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn real_part(self) -> Self {
        self
    }

    #[inline]
    fn abs1(self) -> f64 {
        self.abs()
    }

    fn from_scalar(s: Scalar) -> Self {
        s.widen().re
    }

    fn to_scalar(self) -> Scalar {
        Scalar::F64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn microkernels(ctx: &crate::context::ExecContext) -> &crate::kernels::Microkernels<Self> {
        &ctx.mk_f64
    }
}

impl Elem for Complex32 {
    const DTYPE: DataType = DataType::C32;

    #[inline]
    fn conj(self) -> Self {
        Complex32::new(self.re, -self.im)
    }

    #[inline]
    fn real_part(self) -> Self {
        Complex32::new(self.re, 0.0)
    }

    #[inline]
    fn abs1(self) -> f64 {
        (self.re.abs() + self.im.abs()) as f64
    }

    fn from_scalar(s: Scalar) -> Self {
        let w = s.widen();
        Complex32::new(w.re as f32, w.im as f32)
    }

    fn to_scalar(self) -> Scalar {
        Scalar::C32(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        Complex32::new(v as f32, 0.0)
    }

    #[inline]
    fn microkernels(ctx: &crate::context::ExecContext) -> &crate::kernels::Microkernels<Self> {
        &ctx.mk_c32
    }
}

impl Elem for Complex64 {
    const DTYPE: DataType = DataType::C64;

    #[inline]
    fn conj(self) -> Self {
        Complex64::new(self.re, -self.im)
    }

    #[inline]
    fn real_part(self) -> Self {
        Complex64::new(self.re, 0.0)
    }

    #[inline]
    fn abs1(self) -> f64 {
        self.re.abs() + self.im.abs()
    }

    fn from_scalar(s: Scalar) -> Self {
        s.widen()
    }

    fn to_scalar(self) -> Scalar {
        Scalar::C64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        Complex64::new(v, 0.0)
    }

    #[inline]
    fn microkernels(ctx: &crate::context::ExecContext) -> &crate::kernels::Microkernels<Self> {
        &ctx.mk_c64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_domain_precision() {
        assert_eq!(DataType::F32.domain(), Domain::Real);
        assert_eq!(DataType::C32.domain(), Domain::Complex);
        assert_eq!(DataType::F32.precision(), Precision::Single);
        assert_eq!(DataType::C64.precision(), Precision::Double);
    }

    #[test]
    fn test_dtype_indices_dense() {
        let mut seen = [false; DataType::COUNT];
        for d in [DataType::F32, DataType::F64, DataType::C32, DataType::C64] {
            seen[d.index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_scalar_identities() {
        assert!(Scalar::F64(0.0).is_zero());
        assert!(Scalar::F64(1.0).is_one());
        assert!(Scalar::C32(Complex32::new(1.0, 0.0)).is_one());
        assert!(!Scalar::C32(Complex32::new(1.0, 0.5)).is_one());
        assert!(Scalar::C64(Complex64::new(0.0, 0.0)).is_zero());
    }

    #[test]
    fn test_scalar_is_real() {
        assert!(Scalar::F32(-3.5).is_real());
        assert!(Scalar::C64(Complex64::new(2.0, 0.0)).is_real());
        assert!(!Scalar::C64(Complex64::new(2.0, 1.0)).is_real());
    }

    #[test]
    fn test_from_scalar_cross_precision() {
        let s = Scalar::F64(2.5);
        assert_eq!(f32::from_scalar(s), 2.5f32);
        assert_eq!(Complex64::from_scalar(s), Complex64::new(2.5, 0.0));
        let c = Scalar::C64(Complex64::new(1.0, -2.0));
        assert_eq!(Complex32::from_scalar(c), Complex32::new(1.0, -2.0));
        // Complex scalar into a real type keeps the real part.
        assert_eq!(f64::from_scalar(c), 1.0);
    }

    #[test]
    fn test_conj_and_real_part() {
        let z = Complex64::new(1.0, 2.0);
        assert_eq!(Elem::conj(z), Complex64::new(1.0, -2.0));
        assert_eq!(z.real_part(), Complex64::new(1.0, 0.0));
        assert_eq!(Elem::conj(3.0f64), 3.0);
    }

    #[test]
    fn test_abs1() {
        assert_eq!(Complex64::new(-3.0, 4.0).abs1(), 7.0);
        assert_eq!((-2.0f32).abs1(), 2.0);
    }
}
