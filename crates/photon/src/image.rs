//! The image interfaces consumed by domain inference.
//!
//! [`Image`] is a concrete buffer with known extents; [`Parameter`] is a
//! buffer (or scalar) argument whose dimensions are only known symbolically
//! at compile time, exposed as `name.min.d` / `name.extent.d` variables.
//! Both expose `min(d)` and `extent(d)` as scalar expressions, which is all
//! the symbolic core needs.

use std::rc::Rc;

use crate::{ir::Expr, ty::Type};

#[derive(Debug)]
struct ImageContents {
    name: String,
    ty: Type,
    extents: Vec<i32>,
}

/// A concrete input image. Indices start at zero in every dimension.
#[derive(Debug, Clone)]
pub struct Image(Rc<ImageContents>);

impl Image {
    pub fn new(name: impl Into<String>, ty: Type, extents: &[i32]) -> Self {
        assert!(!extents.is_empty(), "Image with no dimensions");
        Self(Rc::new(ImageContents {
            name: name.into(),
            ty,
            extents: extents.to_vec(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> Type {
        self.0.ty
    }

    pub fn dimensions(&self) -> usize {
        self.0.extents.len()
    }

    pub fn min(&self, d: usize) -> Expr {
        assert!(d < self.dimensions(), "Image dimension out of range");
        Expr::int(0)
    }

    pub fn extent(&self, d: usize) -> Expr {
        assert!(d < self.dimensions(), "Image dimension out of range");
        Expr::int(self.0.extents[d])
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A load with explicit index expressions.
    pub fn at(&self, args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::call_image(self, args)
    }

    /// The whole image, indexed by one implicit variable per dimension.
    /// This is the expression form a bare image takes in a definition.
    pub fn implicit(&self) -> Expr {
        let args: Vec<Expr> = (0..self.dimensions())
            .map(|d| Expr::var(format!("iv.{d}")))
            .collect();
        Expr::call_image(self, args)
    }

    /// Names of the implicit variables used by [`Self::implicit`].
    pub fn implicit_names(&self) -> Vec<String> {
        (0..self.dimensions()).map(|d| format!("iv.{d}")).collect()
    }
}

#[derive(Debug)]
struct ParameterContents {
    name: String,
    ty: Type,
    is_buffer: bool,
    dimensions: usize,
}

/// A scalar or buffer argument bound at run time.
#[derive(Debug, Clone)]
pub struct Parameter(Rc<ParameterContents>);

impl Parameter {
    pub fn scalar(name: impl Into<String>, ty: Type) -> Self {
        Self(Rc::new(ParameterContents {
            name: name.into(),
            ty,
            is_buffer: false,
            dimensions: 0,
        }))
    }

    pub fn buffer(name: impl Into<String>, ty: Type, dimensions: usize) -> Self {
        assert!(dimensions > 0, "Buffer parameter with no dimensions");
        Self(Rc::new(ParameterContents {
            name: name.into(),
            ty,
            is_buffer: true,
            dimensions,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> Type {
        self.0.ty
    }

    pub fn is_buffer(&self) -> bool {
        self.0.is_buffer
    }

    pub fn dimensions(&self) -> usize {
        self.0.dimensions
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Symbolic minimum of dimension `d`, resolved when the buffer is bound.
    pub fn min(&self, d: usize) -> Expr {
        assert!(self.0.is_buffer, "min of scalar parameter");
        assert!(d < self.0.dimensions, "Parameter dimension out of range");
        Expr::var_param(Type::I32, format!("{}.min.{d}", self.0.name), self.clone())
    }

    /// Symbolic extent of dimension `d`.
    pub fn extent(&self, d: usize) -> Expr {
        assert!(self.0.is_buffer, "extent of scalar parameter");
        assert!(d < self.0.dimensions, "Parameter dimension out of range");
        Expr::var_param(Type::I32, format!("{}.extent.{d}", self.0.name), self.clone())
    }

    pub fn at(&self, args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::call_param(self, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::equal;

    #[test]
    fn image_bounds() {
        let img = Image::new("in", Type::uint(8), &[20, 40]);
        assert!(equal(&img.min(1), &Expr::int(0)));
        assert!(equal(&img.extent(1), &Expr::int(40)));
        assert_eq!(img.dimensions(), 2);
    }

    #[test]
    fn parameter_bounds_are_symbolic() {
        let p = Parameter::buffer("input", Type::uint(8), 2);
        assert_eq!(p.min(0).as_variable(), Some("input.min.0"));
        assert_eq!(p.extent(1).as_variable(), Some("input.extent.1"));
    }
}
