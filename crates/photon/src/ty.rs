//! Scalar and vector types carried by every expression node.
//!
//! A type is a kind (signed int, unsigned int, float, opaque handle), a bit
//! width, and a vector width. `width > 1` denotes a SIMD vector; all lanes
//! share the scalar element type.

use strum::{Display, IntoStaticStr};

/// The four kinds of scalar element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    Int,
    UInt,
    Float,
    Handle,
}

/// An expression type: element kind, element bits, vector width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub kind: TypeKind,
    pub bits: u8,
    pub width: u16,
}

impl Type {
    pub const fn new(kind: TypeKind, bits: u8, width: u16) -> Self {
        assert!(width >= 1, "Type of width zero");
        Self { kind, bits, width }
    }

    pub const fn int(bits: u8) -> Self {
        Self::new(TypeKind::Int, bits, 1)
    }

    pub const fn uint(bits: u8) -> Self {
        Self::new(TypeKind::UInt, bits, 1)
    }

    pub const fn float(bits: u8) -> Self {
        Self::new(TypeKind::Float, bits, 1)
    }

    /// Boolean of the given vector width. Booleans are single-bit unsigned.
    pub const fn bool_of(width: u16) -> Self {
        Self::new(TypeKind::UInt, 1, width)
    }

    pub const I32: Self = Self::int(32);
    pub const F32: Self = Self::float(32);
    pub const BOOL: Self = Self::bool_of(1);

    pub fn is_int(self) -> bool {
        self.kind == TypeKind::Int
    }

    pub fn is_uint(self) -> bool {
        self.kind == TypeKind::UInt
    }

    pub fn is_float(self) -> bool {
        self.kind == TypeKind::Float
    }

    pub fn is_handle(self) -> bool {
        self.kind == TypeKind::Handle
    }

    pub fn is_bool(self) -> bool {
        self.kind == TypeKind::UInt && self.bits == 1
    }

    pub fn is_scalar(self) -> bool {
        self.width == 1
    }

    pub fn is_vector(self) -> bool {
        self.width > 1
    }

    /// The same element type with the given vector width.
    pub fn vector_of(self, width: u16) -> Self {
        Self { width, ..self }
    }

    /// The scalar element type of this type.
    pub fn element_of(self) -> Self {
        Self { width: 1, ..self }
    }

    /// Largest representable value as a wrapped `i32`.
    ///
    /// All constant folding happens in 32-bit two's complement, so the
    /// extrema of 32-bit types wrap: `UInt(32)` yields `-1` (the bit pattern
    /// of `u32::MAX`). Comparisons against these values must reinterpret the
    /// bits according to the type's signedness.
    pub fn imax(self) -> i32 {
        match self.kind {
            TypeKind::Int => {
                if self.bits >= 32 {
                    i32::MAX
                } else {
                    (1i32 << (self.bits - 1)) - 1
                }
            }
            TypeKind::UInt => {
                if self.bits >= 32 {
                    -1 // u32::MAX wrapped
                } else {
                    (1i32 << self.bits) - 1
                }
            }
            _ => panic!("imax of non-integer type"),
        }
    }

    /// Smallest representable value as a wrapped `i32`.
    pub fn imin(self) -> i32 {
        match self.kind {
            TypeKind::Int => {
                if self.bits >= 32 {
                    i32::MIN
                } else {
                    -(1i32 << (self.bits - 1))
                }
            }
            TypeKind::UInt => 0,
            _ => panic!("imin of non-integer type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrema() {
        assert_eq!(Type::int(8).imax(), 127);
        assert_eq!(Type::int(8).imin(), -128);
        assert_eq!(Type::uint(8).imax(), 255);
        assert_eq!(Type::uint(8).imin(), 0);
        assert_eq!(Type::uint(16).imax(), 65535);
        assert_eq!(Type::I32.imax(), i32::MAX);
        assert_eq!(Type::I32.imin(), i32::MIN);
        assert_eq!(Type::uint(32).imax(), -1);
        assert_eq!(Type::BOOL.imax(), 1);
    }

    #[test]
    fn vector_conversions() {
        let t = Type::I32.vector_of(8);
        assert!(t.is_vector());
        assert_eq!(t.element_of(), Type::I32);
        assert!(Type::bool_of(4).is_bool());
    }
}
