#![doc = include_str!("../../../README.md")]

mod bounds;
mod bounds_simplify;
mod context;
mod ctx;
mod diag;
mod domain;
mod equality;
mod function;
mod image;
mod inline_let;
mod interval;
mod ir;
mod modulus;
mod options;
mod ops;
mod printer;
mod scope;
mod simplify;
mod solver;
mod ty;
mod visit;

pub use crate::{
    bounds::{bounds, BoundsAnalysis},
    bounds_simplify::{bounds_simplify, bounds_simplify_stmt, BoundsSimplify},
    context::{ContextId, ContextManager, DefiningNode, LazyScope, NodeCache},
    ctx::CompilerContext,
    domain::{
        backwards_interval, backwards_interval_single, domain_inference, domain_inference_named,
        BackwardsResult, Domain, DomainType, DOMAIN_TYPES, MAX_DOMAINS,
    },
    equality::{equal, equal_interval, equal_stmt},
    function::{Function, ReductionDomain, ReductionVariable},
    image::{Image, Parameter},
    inline_let::{inline_lets, inline_lets_stmt, variable_occurrences, InlineLet},
    interval::{DomInterval, Interval, Range},
    ir::{
        CallKind, ClampKind, Expr, ExprKind, ForKind, IRHandle, PartitionInfo, Stmt, StmtKind,
    },
    modulus::{modulus_remainder, ModulusRemainder},
    options::Options,
    ops::{
        abs, and, cast, clamp, clamp_none, clamp_of, const_false, const_true, eq, ge, gt,
        infinity_count, is_const, is_negative_const, is_one, is_positive_const, is_zero, le, lt,
        make_bool, make_const, make_infinity, make_one, make_zero, max, min, ne, or, select, sin,
        type_max, type_min,
    },
    scope::Scope,
    simplify::{
        proved, proved_with_disproof, simplify, simplify_stmt, simplify_undef,
        simplify_undef_stmt, Simplify,
    },
    solver::{
        domain_solver, domain_solver_stmt, extract_solutions, extract_solutions_stmt,
        extract_solutions_with_exact, is_constant_expr, solver_pass, Solution, Solver,
    },
    ty::{Type, TypeKind},
    visit::{
        mutate_children_expr, mutate_children_stmt, process_children_expr, process_children_stmt,
        walk_expr, walk_stmt, Mutator, Process, Visitor,
    },
};
