//! The expression and statement nodes of the intermediate representation.
//!
//! Nodes are immutable after construction and shared through cheap-clone
//! reference-counted handles ([`Expr`], [`Stmt`]). Every constructor checks
//! the structural invariants of its node kind and panics on violation; a
//! malformed tree is a compiler bug, not a recoverable condition.
//!
//! Pointer identity (`same_as`) is the fast path for equality tests and the
//! key for per-pass caches; structural equality lives in [`crate::equality`].

use std::rc::Rc;

use smallvec::SmallVec;
use strum::{Display, IntoStaticStr};

use crate::{
    function::{Function, ReductionDomain},
    image::{Image, Parameter},
    interval::DomInterval,
    ty::Type,
};

/// How a [`ExprKind::Call`] resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum CallKind {
    /// Load from a concrete image or image parameter.
    Image,
    /// Call to an externally defined function (`sin`, `abs_i32`, ...).
    Extern,
    /// Call to another function in the pipeline.
    Pipeline,
}

/// Execution discipline of a `For` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ForKind {
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
}

/// Border-handling flavours expressed by a `Clamp` node.
///
/// `Replicate` is the ordinary clamp: out-of-range values move to the nearest
/// limit. `Wrap`, `Reflect`, `Reflect101` and `Tile` are the remaining border
/// modes; they are lowered elsewhere and the symbolic core only needs their
/// domain-inference behaviour. `None` applies no clamping at all — it exists
/// so domain inference can express "disallow access outside the valid
/// region".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ClampKind {
    None,
    Replicate,
    Wrap,
    Reflect,
    Reflect101,
    Tile,
}

/// Loop-partitioning annotation carried on `For` statements by the schedule.
#[derive(Debug, Clone, Default)]
pub struct PartitionInfo {
    /// Manually specified interval for the main loop partition.
    pub interval: Option<DomInterval>,
    /// Tristate auto-partition request; `None` when the schedule is silent.
    pub auto_partition: Option<bool>,
}

/// Expression node kinds. Every expression also carries a [`Type`].
#[derive(Debug, Clone)]
pub enum ExprKind {
    IntImm(i32),
    FloatImm(f32),
    Cast(Expr),
    Variable {
        name: String,
        param: Option<Parameter>,
        reduction_domain: Option<ReductionDomain>,
    },
    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Div(Expr, Expr),
    Mod(Expr, Expr),
    Min(Expr, Expr),
    Max(Expr, Expr),
    Eq(Expr, Expr),
    Ne(Expr, Expr),
    Lt(Expr, Expr),
    Le(Expr, Expr),
    Gt(Expr, Expr),
    Ge(Expr, Expr),
    And(Expr, Expr),
    Or(Expr, Expr),
    Not(Expr),
    Select {
        condition: Expr,
        true_value: Expr,
        false_value: Expr,
    },
    Load {
        name: String,
        index: Expr,
        image: Option<Image>,
        param: Option<Parameter>,
    },
    Ramp {
        base: Expr,
        stride: Expr,
        width: u16,
    },
    Broadcast {
        value: Expr,
        width: u16,
    },
    Call {
        name: String,
        args: SmallVec<[Expr; 4]>,
        call: CallKind,
        func: Option<Function>,
        image: Option<Image>,
        param: Option<Parameter>,
    },
    Let {
        name: String,
        value: Expr,
        body: Expr,
    },
    Clamp {
        clamp: ClampKind,
        value: Expr,
        min: Expr,
        max: Expr,
        /// Extra parameter for some clamp kinds; the tile width for `Tile`.
        /// Always defined so tree walkers need no special case.
        tile: Expr,
    },
    /// Solver marker: the body is to be confined to the given intervals, one
    /// per domain kind.
    Solve {
        body: Expr,
        intervals: SmallVec<[DomInterval; 2]>,
    },
    /// Solver marker: the named variable is a solve target within the body.
    /// `source` records the expression the solve was initiated from; it is
    /// not a child node.
    TargetVar {
        name: String,
        body: Expr,
        source: Option<Expr>,
    },
    /// Signed infinity; `count > 0` is positive, `count < 0` negative.
    /// Legal only inside `DomInterval` bounds and solver expressions.
    Infinity {
        count: i32,
    },
}

/// Statement node kinds. Statements carry no type.
#[derive(Debug, Clone)]
pub enum StmtKind {
    LetStmt {
        name: String,
        value: Expr,
        body: Stmt,
    },
    AssertStmt {
        condition: Expr,
        message: String,
    },
    PrintStmt {
        prefix: String,
        args: SmallVec<[Expr; 4]>,
    },
    Pipeline {
        name: String,
        produce: Stmt,
        update: Option<Stmt>,
        consume: Stmt,
    },
    For {
        name: String,
        min: Expr,
        extent: Expr,
        for_kind: ForKind,
        partition: PartitionInfo,
        body: Stmt,
    },
    Store {
        name: String,
        value: Expr,
        index: Expr,
    },
    Provide {
        name: String,
        value: Expr,
        args: SmallVec<[Expr; 4]>,
    },
    Allocate {
        name: String,
        ty: Type,
        size: Expr,
        body: Stmt,
    },
    Free {
        name: String,
    },
    Realize {
        name: String,
        ty: Type,
        bounds: Vec<(Expr, Expr)>,
        body: Stmt,
    },
    Block {
        first: Stmt,
        rest: Option<Stmt>,
    },
    StmtTargetVar {
        name: String,
        body: Stmt,
        source: Option<Stmt>,
    },
}

#[derive(Debug)]
pub struct ExprNode {
    pub ty: Type,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub struct StmtNode {
    pub kind: StmtKind,
}

/// A reference-counted handle to an immutable expression node.
#[derive(Debug, Clone)]
pub struct Expr(Rc<ExprNode>);

/// A reference-counted handle to an immutable statement node.
#[derive(Debug, Clone)]
pub struct Stmt(Rc<StmtNode>);

fn assert_same_type(opname: &str, a: &Expr, b: &Expr) {
    assert!(
        a.ty() == b.ty(),
        "{opname} of mismatched types: {:?} vs {:?}",
        a.ty(),
        b.ty()
    );
}

thread_local! {
    /// Interned integer constants -8..=8; shared pointer identity.
    static SMALL_INT_CACHE: [Expr; 17] = std::array::from_fn(|i| {
        Expr::new(Type::I32, ExprKind::IntImm(i as i32 - 8))
    });
}

impl Expr {
    fn new(ty: Type, kind: ExprKind) -> Self {
        Self(Rc::new(ExprNode { ty, kind }))
    }

    pub fn ty(&self) -> Type {
        self.0.ty
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Pointer identity.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared node, used as a cache key together with a
    /// context id. Stable for the lifetime of any live handle to the node.
    pub fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// A 32-bit integer constant. Values in -8..=8 are interned.
    pub fn int(value: i32) -> Self {
        if (-8..=8).contains(&value) {
            SMALL_INT_CACHE.with(|cache| cache[(value + 8) as usize].clone())
        } else {
            Self::new(Type::I32, ExprKind::IntImm(value))
        }
    }

    /// A 32-bit float constant.
    pub fn float(value: f32) -> Self {
        Self::new(Type::F32, ExprKind::FloatImm(value))
    }

    pub fn cast(ty: Type, value: Expr) -> Self {
        Self::new(ty, ExprKind::Cast(value))
    }

    /// A named variable of type `Int(32)`.
    pub fn var(name: impl Into<String>) -> Self {
        Self::var_typed(Type::I32, name)
    }

    pub fn var_typed(ty: Type, name: impl Into<String>) -> Self {
        Self::new(
            ty,
            ExprKind::Variable {
                name: name.into(),
                param: None,
                reduction_domain: None,
            },
        )
    }

    pub fn var_param(ty: Type, name: impl Into<String>, param: Parameter) -> Self {
        Self::new(
            ty,
            ExprKind::Variable {
                name: name.into(),
                param: Some(param),
                reduction_domain: None,
            },
        )
    }

    pub fn var_reduction(ty: Type, name: impl Into<String>, rdom: ReductionDomain) -> Self {
        Self::new(
            ty,
            ExprKind::Variable {
                name: name.into(),
                param: None,
                reduction_domain: Some(rdom),
            },
        )
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        assert_same_type("Add", &a, &b);
        let ty = a.ty();
        Self::new(ty, ExprKind::Add(a, b))
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        assert_same_type("Sub", &a, &b);
        let ty = a.ty();
        Self::new(ty, ExprKind::Sub(a, b))
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        assert_same_type("Mul", &a, &b);
        let ty = a.ty();
        Self::new(ty, ExprKind::Mul(a, b))
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        assert_same_type("Div", &a, &b);
        let ty = a.ty();
        Self::new(ty, ExprKind::Div(a, b))
    }

    pub fn modulo(a: Expr, b: Expr) -> Self {
        assert_same_type("Mod", &a, &b);
        let ty = a.ty();
        Self::new(ty, ExprKind::Mod(a, b))
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        assert_same_type("Min", &a, &b);
        let ty = a.ty();
        Self::new(ty, ExprKind::Min(a, b))
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        assert_same_type("Max", &a, &b);
        let ty = a.ty();
        Self::new(ty, ExprKind::Max(a, b))
    }

    fn compare(opname: &str, a: Expr, b: Expr, make: fn(Expr, Expr) -> ExprKind) -> Self {
        assert_same_type(opname, &a, &b);
        let ty = Type::bool_of(a.ty().width);
        Self::new(ty, make(a, b))
    }

    pub fn eq(a: Expr, b: Expr) -> Self {
        Self::compare("EQ", a, b, ExprKind::Eq)
    }

    pub fn ne(a: Expr, b: Expr) -> Self {
        Self::compare("NE", a, b, ExprKind::Ne)
    }

    pub fn lt(a: Expr, b: Expr) -> Self {
        Self::compare("LT", a, b, ExprKind::Lt)
    }

    pub fn le(a: Expr, b: Expr) -> Self {
        Self::compare("LE", a, b, ExprKind::Le)
    }

    pub fn gt(a: Expr, b: Expr) -> Self {
        Self::compare("GT", a, b, ExprKind::Gt)
    }

    pub fn ge(a: Expr, b: Expr) -> Self {
        Self::compare("GE", a, b, ExprKind::Ge)
    }

    pub fn and(a: Expr, b: Expr) -> Self {
        assert!(a.ty().is_bool(), "lhs of And is not a bool");
        assert!(b.ty().is_bool(), "rhs of And is not a bool");
        let ty = Type::bool_of(a.ty().width);
        Self::new(ty, ExprKind::And(a, b))
    }

    pub fn or(a: Expr, b: Expr) -> Self {
        assert!(a.ty().is_bool(), "lhs of Or is not a bool");
        assert!(b.ty().is_bool(), "rhs of Or is not a bool");
        let ty = Type::bool_of(a.ty().width);
        Self::new(ty, ExprKind::Or(a, b))
    }

    pub fn not(a: Expr) -> Self {
        assert!(a.ty().is_bool(), "argument of Not is not a bool");
        let ty = Type::bool_of(a.ty().width);
        Self::new(ty, ExprKind::Not(a))
    }

    pub fn select(condition: Expr, true_value: Expr, false_value: Expr) -> Self {
        assert!(condition.ty().is_bool(), "First argument to Select is not a bool");
        assert_same_type("Select", &true_value, &false_value);
        assert!(
            condition.ty().is_scalar() || condition.ty().width == true_value.ty().width,
            "In Select, vector width of condition must either be 1, or equal to vector width of arguments"
        );
        let ty = true_value.ty();
        Self::new(
            ty,
            ExprKind::Select {
                condition,
                true_value,
                false_value,
            },
        )
    }

    pub fn load(
        ty: Type,
        name: impl Into<String>,
        index: Expr,
        image: Option<Image>,
        param: Option<Parameter>,
    ) -> Self {
        assert!(
            ty.width == index.ty().width,
            "Vector width of Load must match vector width of index"
        );
        Self::new(
            ty,
            ExprKind::Load {
                name: name.into(),
                index,
                image,
                param,
            },
        )
    }

    pub fn ramp(base: Expr, stride: Expr, width: u16) -> Self {
        assert!(base.ty().is_scalar(), "Ramp with vector base");
        assert!(stride.ty().is_scalar(), "Ramp with vector stride");
        assert!(width > 1, "Ramp of width <= 1");
        assert_same_type("Ramp", &base, &stride);
        let ty = base.ty().vector_of(width);
        Self::new(ty, ExprKind::Ramp { base, stride, width })
    }

    pub fn broadcast(value: Expr, width: u16) -> Self {
        assert!(value.ty().is_scalar(), "Broadcast of vector");
        assert!(width > 1, "Broadcast of width <= 1");
        let ty = value.ty().vector_of(width);
        Self::new(ty, ExprKind::Broadcast { value, width })
    }

    pub fn call(
        ty: Type,
        name: impl Into<String>,
        args: impl IntoIterator<Item = Expr>,
        call: CallKind,
        func: Option<Function>,
        image: Option<Image>,
        param: Option<Parameter>,
    ) -> Self {
        let args: SmallVec<[Expr; 4]> = args.into_iter().collect();
        if call == CallKind::Image {
            assert!(
                image.is_some() || param.is_some(),
                "Call node to undefined image"
            );
        }
        if call == CallKind::Pipeline {
            assert!(func.is_some(), "Call to undefined pipeline function");
        }
        Self::new(
            ty,
            ExprKind::Call {
                name: name.into(),
                args,
                call,
                func,
                image,
                param,
            },
        )
    }

    /// Call to an externally defined function.
    pub fn call_extern(
        ty: Type,
        name: impl Into<String>,
        args: impl IntoIterator<Item = Expr>,
    ) -> Self {
        Self::call(ty, name, args, CallKind::Extern, None, None, None)
    }

    /// Load from a concrete image.
    pub fn call_image(image: &Image, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::call(
            image.ty(),
            image.name(),
            args,
            CallKind::Image,
            None,
            Some(image.clone()),
            None,
        )
    }

    /// Load from an image parameter.
    pub fn call_param(param: &Parameter, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::call(
            param.ty(),
            param.name(),
            args,
            CallKind::Image,
            None,
            None,
            Some(param.clone()),
        )
    }

    /// A rebuilt call with the same callee but new arguments.
    pub fn call_like(original: &Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        let ExprKind::Call {
            name,
            call,
            func,
            image,
            param,
            ..
        } = original.kind()
        else {
            panic!("call_like applied to a non-Call expression")
        };
        Self::call(
            original.ty(),
            name.clone(),
            args,
            *call,
            *func,
            image.clone(),
            param.clone(),
        )
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        let ty = value.ty();
        Self::new(
            ty,
            ExprKind::Let {
                name: name.into(),
                value,
                body,
            },
        )
    }

    pub fn clamp(clamp: ClampKind, value: Expr, min: Expr, max: Expr, tile: Expr) -> Self {
        assert_same_type("Clamp", &value, &min);
        assert_same_type("Clamp", &value, &max);
        if clamp == ClampKind::Tile {
            assert_same_type("Clamp", &value, &tile);
        }
        let ty = value.ty();
        Self::new(
            ty,
            ExprKind::Clamp {
                clamp,
                value,
                min,
                max,
                tile,
            },
        )
    }

    pub fn solve(body: Expr, intervals: impl IntoIterator<Item = DomInterval>) -> Self {
        let ty = body.ty();
        Self::new(
            ty,
            ExprKind::Solve {
                body,
                intervals: intervals.into_iter().collect(),
            },
        )
    }

    pub fn target_var(name: impl Into<String>, body: Expr, source: Option<Expr>) -> Self {
        let ty = body.ty();
        Self::new(
            ty,
            ExprKind::TargetVar {
                name: name.into(),
                body,
                source,
            },
        )
    }

    /// Signed infinity of the given type. `count` must be nonzero; its sign
    /// is the direction.
    pub fn infinity(ty: Type, count: i32) -> Self {
        assert!(count != 0, "Infinity with zero count");
        Self::new(ty, ExprKind::Infinity { count })
    }

    // Downcast helpers. Each returns `Some` when the node is of the asked
    // kind, mirroring a tag test plus cast.

    pub fn as_int_imm(&self) -> Option<i32> {
        match self.kind() {
            ExprKind::IntImm(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float_imm(&self) -> Option<f32> {
        match self.kind() {
            ExprKind::FloatImm(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self.kind() {
            ExprKind::Variable { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn as_cast(&self) -> Option<&Expr> {
        match self.kind() {
            ExprKind::Cast(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_add(&self) -> Option<(&Expr, &Expr)> {
        match self.kind() {
            ExprKind::Add(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_sub(&self) -> Option<(&Expr, &Expr)> {
        match self.kind() {
            ExprKind::Sub(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_mul(&self) -> Option<(&Expr, &Expr)> {
        match self.kind() {
            ExprKind::Mul(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_div(&self) -> Option<(&Expr, &Expr)> {
        match self.kind() {
            ExprKind::Div(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_min(&self) -> Option<(&Expr, &Expr)> {
        match self.kind() {
            ExprKind::Min(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_max(&self) -> Option<(&Expr, &Expr)> {
        match self.kind() {
            ExprKind::Max(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn as_ramp(&self) -> Option<(&Expr, &Expr, u16)> {
        match self.kind() {
            ExprKind::Ramp { base, stride, width } => Some((base, stride, *width)),
            _ => None,
        }
    }

    pub fn as_broadcast(&self) -> Option<(&Expr, u16)> {
        match self.kind() {
            ExprKind::Broadcast { value, width } => Some((value, *width)),
            _ => None,
        }
    }

    pub fn as_solve(&self) -> Option<(&Expr, &[DomInterval])> {
        match self.kind() {
            ExprKind::Solve { body, intervals } => Some((body, intervals)),
            _ => None,
        }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self.kind(), ExprKind::Infinity { .. })
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Self::int(value)
    }
}

impl From<&Expr> for Expr {
    fn from(value: &Expr) -> Self {
        value.clone()
    }
}

impl From<f32> for Expr {
    fn from(value: f32) -> Self {
        Self::float(value)
    }
}

impl Stmt {
    fn new(kind: StmtKind) -> Self {
        Self(Rc::new(StmtNode { kind }))
    }

    pub fn kind(&self) -> &StmtKind {
        &self.0.kind
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn let_stmt(name: impl Into<String>, value: Expr, body: Stmt) -> Self {
        Self::new(StmtKind::LetStmt {
            name: name.into(),
            value,
            body,
        })
    }

    pub fn assert_stmt(condition: Expr, message: impl Into<String>) -> Self {
        assert!(condition.ty().is_scalar(), "AssertStmt of vector");
        Self::new(StmtKind::AssertStmt {
            condition,
            message: message.into(),
        })
    }

    pub fn print_stmt(prefix: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::new(StmtKind::PrintStmt {
            prefix: prefix.into(),
            args: args.into_iter().collect(),
        })
    }

    pub fn pipeline(name: impl Into<String>, produce: Stmt, update: Option<Stmt>, consume: Stmt) -> Self {
        Self::new(StmtKind::Pipeline {
            name: name.into(),
            produce,
            update,
            consume,
        })
    }

    pub fn for_loop(
        name: impl Into<String>,
        min: Expr,
        extent: Expr,
        for_kind: ForKind,
        body: Stmt,
    ) -> Self {
        Self::for_loop_partitioned(name, min, extent, for_kind, PartitionInfo::default(), body)
    }

    pub fn for_loop_partitioned(
        name: impl Into<String>,
        min: Expr,
        extent: Expr,
        for_kind: ForKind,
        partition: PartitionInfo,
        body: Stmt,
    ) -> Self {
        assert!(min.ty().is_scalar(), "For with vector min");
        assert!(extent.ty().is_scalar(), "For with vector extent");
        Self::new(StmtKind::For {
            name: name.into(),
            min,
            extent,
            for_kind,
            partition,
            body,
        })
    }

    pub fn store(name: impl Into<String>, value: Expr, index: Expr) -> Self {
        Self::new(StmtKind::Store {
            name: name.into(),
            value,
            index,
        })
    }

    pub fn provide(
        name: impl Into<String>,
        value: Expr,
        args: impl IntoIterator<Item = Expr>,
    ) -> Self {
        Self::new(StmtKind::Provide {
            name: name.into(),
            value,
            args: args.into_iter().collect(),
        })
    }

    pub fn allocate(name: impl Into<String>, ty: Type, size: Expr, body: Stmt) -> Self {
        assert!(size.ty().is_scalar(), "Allocate of vector size");
        Self::new(StmtKind::Allocate {
            name: name.into(),
            ty,
            size,
            body,
        })
    }

    pub fn free(name: impl Into<String>) -> Self {
        Self::new(StmtKind::Free { name: name.into() })
    }

    pub fn realize(
        name: impl Into<String>,
        ty: Type,
        bounds: Vec<(Expr, Expr)>,
        body: Stmt,
    ) -> Self {
        for (min, extent) in &bounds {
            assert!(min.ty().is_scalar(), "Realize of vector size");
            assert!(extent.ty().is_scalar(), "Realize of vector size");
        }
        Self::new(StmtKind::Realize {
            name: name.into(),
            ty,
            bounds,
            body,
        })
    }

    pub fn block(first: Stmt, rest: Option<Stmt>) -> Self {
        Self::new(StmtKind::Block { first, rest })
    }

    pub fn stmt_target_var(name: impl Into<String>, body: Stmt, source: Option<Stmt>) -> Self {
        Self::new(StmtKind::StmtTargetVar {
            name: name.into(),
            body,
            source,
        })
    }
}

/// A node handle that can be either an expression or a statement, used where
/// the context manager needs uniform node identity.
#[derive(Debug, Clone)]
pub enum IRHandle {
    Expr(Expr),
    Stmt(Stmt),
}

impl IRHandle {
    pub fn ptr_id(&self) -> usize {
        match self {
            Self::Expr(e) => e.ptr_id(),
            Self::Stmt(s) => s.ptr_id(),
        }
    }

    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Expr(a), Self::Expr(b)) => a.same_as(b),
            (Self::Stmt(a), Self::Stmt(b)) => a.same_as(b),
            _ => false,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Self::Expr(e) => Some(e),
            Self::Stmt(_) => None,
        }
    }

    pub fn as_stmt(&self) -> Option<&Stmt> {
        match self {
            Self::Stmt(s) => Some(s),
            Self::Expr(_) => None,
        }
    }
}

impl From<Expr> for IRHandle {
    fn from(e: Expr) -> Self {
        Self::Expr(e)
    }
}

impl From<Stmt> for IRHandle {
    fn from(s: Stmt) -> Self {
        Self::Stmt(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_are_interned() {
        let a = Expr::int(3);
        let b = Expr::int(3);
        assert!(a.same_as(&b));
        let c = Expr::int(100);
        let d = Expr::int(100);
        assert!(!c.same_as(&d));
    }

    #[test]
    fn comparison_type_is_bool_of_width() {
        let a = Expr::broadcast(Expr::int(1), 4);
        let b = Expr::broadcast(Expr::int(2), 4);
        let c = Expr::lt(a, b);
        assert_eq!(c.ty(), Type::bool_of(4));
    }

    #[test]
    #[should_panic(expected = "mismatched types")]
    fn add_rejects_mismatched_types() {
        let _ = Expr::add(Expr::int(1), Expr::float(1.0));
    }

    #[test]
    #[should_panic(expected = "Ramp of width")]
    fn ramp_rejects_width_one() {
        let _ = Expr::ramp(Expr::int(0), Expr::int(1), 1);
    }
}
