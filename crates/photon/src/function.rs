//! The pipeline-function registry.
//!
//! Functions live in an arena owned by the [`CompilerContext`] and are
//! addressed by a copyable id. A reduction definition's right-hand side may
//! call the function being defined; with ids there is no ownership cycle to
//! break, the `Call` simply stores the id.
//!
//! Defining a function runs domain inference on its pure definition and
//! stores the resulting domains. Reading a domain for further inference
//! locks it; mutating a locked domain is a hard error, because inferences
//! derived from it would silently go stale.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ctx::CompilerContext,
    diag::trace,
    domain::{domain_inference, Domain, DomainType, MAX_DOMAINS},
    interval::DomInterval,
    ir::{CallKind, Expr, ExprKind},
    scope::Scope,
    ty::Type,
    visit::{walk_expr, Visitor},
};

/// One reduction variable with its iteration bounds.
#[derive(Debug, Clone)]
pub struct ReductionVariable {
    pub var: String,
    pub min: Expr,
    pub extent: Expr,
}

/// The iteration domain shared by the reduction variables of an update
/// definition. Identity is by handle.
#[derive(Debug, Clone)]
pub struct ReductionDomain(Rc<Vec<ReductionVariable>>);

impl ReductionDomain {
    pub fn new(vars: Vec<ReductionVariable>) -> Self {
        assert!(!vars.is_empty(), "ReductionDomain with no variables");
        Self(Rc::new(vars))
    }

    pub fn variables(&self) -> &[ReductionVariable] {
        &self.0
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FunctionContents {
    pub name: String,
    pub args: Vec<String>,
    pub value: Option<Expr>,
    pub domains: Vec<Domain>,
    pub reduction_value: Option<Expr>,
    pub reduction_args: Vec<Expr>,
    pub reduction_domain: Option<ReductionDomain>,
}

/// Handle to a function in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Function(u32);

/// Free variables in a definition must be pure arguments, parameters,
/// let-bound names, or reduction variables of a single reduction domain.
struct CheckVars {
    pure_args: Vec<String>,
    defined_internally: Scope<()>,
    reduction_domain: Option<ReductionDomain>,
}

impl Visitor for CheckVars {
    fn visit_expr(&mut self, e: &Expr) {
        match e.kind() {
            ExprKind::Let { name, value, body } => {
                self.visit_expr(value);
                self.defined_internally.push(name.clone(), ());
                self.visit_expr(body);
                self.defined_internally.pop(name);
            }
            ExprKind::Variable {
                name,
                param,
                reduction_domain,
            } => {
                if param.is_some() {
                    return;
                }
                if self.defined_internally.contains(name) {
                    return;
                }
                if self.pure_args.iter().any(|a| a == name) {
                    return;
                }
                if let Some(rdom) = reduction_domain {
                    match &self.reduction_domain {
                        None => self.reduction_domain = Some(rdom.clone()),
                        Some(known) => assert!(
                            known.same_as(rdom),
                            "Multiple reduction domains found in function definition"
                        ),
                    }
                    return;
                }
                panic!("Undefined variable in function definition: {name}");
            }
            _ => walk_expr(self, e),
        }
    }
}

impl Function {
    /// Register a new, undefined function.
    pub fn declare(cc: &CompilerContext, name: impl Into<String>) -> Self {
        let mut funcs = cc.functions.borrow_mut();
        let id = u32::try_from(funcs.len()).expect("function registry overflow");
        funcs.push(FunctionContents {
            name: name.into(),
            ..FunctionContents::default()
        });
        Self(id)
    }

    pub fn name(self, cc: &CompilerContext) -> String {
        cc.functions.borrow()[self.0 as usize].name.clone()
    }

    pub fn args(self, cc: &CompilerContext) -> Vec<String> {
        cc.functions.borrow()[self.0 as usize].args.clone()
    }

    pub fn value(self, cc: &CompilerContext) -> Expr {
        cc.functions.borrow()[self.0 as usize]
            .value
            .clone()
            .expect("Function has no definition")
    }

    pub fn value_type(self, cc: &CompilerContext) -> Type {
        self.value(cc).ty()
    }

    pub fn dimensions(self, cc: &CompilerContext) -> usize {
        cc.functions.borrow()[self.0 as usize].args.len()
    }

    pub fn is_reduction(self, cc: &CompilerContext) -> bool {
        cc.functions.borrow()[self.0 as usize]
            .reduction_value
            .is_some()
    }

    pub fn reduction_value(self, cc: &CompilerContext) -> Option<Expr> {
        cc.functions.borrow()[self.0 as usize].reduction_value.clone()
    }

    pub fn reduction_args(self, cc: &CompilerContext) -> Vec<Expr> {
        cc.functions.borrow()[self.0 as usize].reduction_args.clone()
    }

    pub fn reduction_domain(self, cc: &CompilerContext) -> Option<ReductionDomain> {
        cc.functions.borrow()[self.0 as usize].reduction_domain.clone()
    }

    /// Add the pure definition. All free variables in `value` must appear in
    /// `args`; domain inference runs immediately and the inferred domains
    /// are stored on the function.
    pub fn define(self, cc: &CompilerContext, args: &[&str], value: Expr) {
        {
            let funcs = cc.functions.borrow();
            let f = &funcs[self.0 as usize];
            assert!(!f.name.is_empty(), "A function needs a name");
            assert!(f.value.is_none(), "Function is already defined");
        }
        let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();

        let mut check = CheckVars {
            pure_args: args.clone(),
            defined_internally: Scope::new(),
            reduction_domain: None,
        };
        check.visit_expr(&value);
        assert!(
            check.reduction_domain.is_none(),
            "Reduction domain referenced in pure function definition"
        );

        trace!(cc, 2, "DOMINF", "domain inference for {}", self.name(cc));
        let domains = domain_inference(cc, &args, &value);

        let mut funcs = cc.functions.borrow_mut();
        let f = &mut funcs[self.0 as usize];
        f.args = args;
        f.value = Some(value);
        f.domains = domains;
    }

    /// Add a reduction definition. The function must already have a pure
    /// definition; pure arguments in `args` must match it positionally and
    /// `value` must reference exactly one reduction domain.
    pub fn define_reduction(self, cc: &CompilerContext, args: Vec<Expr>, value: Expr) {
        let stored_args = {
            let funcs = cc.functions.borrow();
            let f = &funcs[self.0 as usize];
            assert!(!f.name.is_empty(), "A function needs a name");
            assert!(
                f.value.is_some(),
                "Can't add a reduction definition without a regular definition first"
            );
            assert!(
                f.reduction_value.is_none(),
                "Function already has a reduction definition"
            );
            assert!(
                args.len() == f.args.len(),
                "Dimensionality of reduction definition must match dimensionality of pure definition"
            );
            // Without this check, allocations would be sized for the wrong
            // element type relative to what update code expects.
            assert!(
                f.value.as_ref().unwrap().ty() == value.ty(),
                "Reduction definition does not match type of pure function definition"
            );
            f.args.clone()
        };

        // The pure args are the naked variables in the argument list that
        // carry neither a parameter nor a reduction domain.
        let mut reduction_pure_args = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            if let ExprKind::Variable {
                name,
                param: None,
                reduction_domain: None,
            } = arg.kind()
            {
                assert!(
                    *name == stored_args[i],
                    "Pure argument to update step must have the same name as the pure \
                     argument of the initial definition in the same dimension"
                );
                reduction_pure_args.push(name.clone());
            }
        }

        let mut check = CheckVars {
            pure_args: reduction_pure_args,
            defined_internally: Scope::new(),
            reduction_domain: None,
        };
        check.visit_expr(&value);
        for arg in &args {
            check.visit_expr(arg);
        }
        let rdom = check
            .reduction_domain
            .expect("No reduction domain referenced in reduction definition");

        let mut funcs = cc.functions.borrow_mut();
        let f = &mut funcs[self.0 as usize];
        f.reduction_args = args;
        f.reduction_value = Some(value);
        f.reduction_domain = Some(rdom);
    }

    /// A call to this function.
    pub fn at(self, cc: &CompilerContext, args: impl IntoIterator<Item = Expr>) -> Expr {
        let (ty, name, arity) = {
            let funcs = cc.functions.borrow();
            let f = &funcs[self.0 as usize];
            let value = f.value.as_ref().expect("Call to undefined function");
            (value.ty(), f.name.clone(), f.args.len())
        };
        let args: Vec<Expr> = args.into_iter().collect();
        assert!(args.len() <= arity, "Call node with too many arguments");
        Expr::call(ty, name, args, CallKind::Pipeline, Some(self), None, None)
    }

    /// The interval of every domain for one dimension. Reading locks all
    /// domains: they have been used for further inference.
    pub fn domain_intervals(
        self,
        cc: &CompilerContext,
        index: usize,
    ) -> SmallVec<[DomInterval; 2]> {
        let mut funcs = cc.functions.borrow_mut();
        let f = &mut funcs[self.0 as usize];
        assert!(
            f.domains.len() >= MAX_DOMAINS,
            "Insufficient domains defined in function {}",
            f.name
        );
        let mut intervals = SmallVec::new();
        for domain in &mut f.domains[..MAX_DOMAINS] {
            intervals.push(domain.intervals[index].clone());
            domain.lock();
        }
        intervals
    }

    /// Inspect a domain; this locks it.
    pub fn domain(self, cc: &CompilerContext, dt: DomainType) -> Domain {
        let mut funcs = cc.functions.borrow_mut();
        let f = &mut funcs[self.0 as usize];
        assert!(
            (dt as usize) < f.domains.len(),
            "Domain of type does not exist"
        );
        f.domains[dt as usize].lock();
        f.domains[dt as usize].clone()
    }

    /// Replace a domain. Panics if the domain was already read for further
    /// inference.
    pub fn set_domain(self, cc: &CompilerContext, dt: DomainType, domain: Domain) {
        trace!(cc, 4, "DOMINF", "writing domain {dt} of {}", self.name(cc));
        let mut funcs = cc.functions.borrow_mut();
        let f = &mut funcs[self.0 as usize];
        assert!(
            (dt as usize) < f.domains.len(),
            "Domain of type does not exist"
        );
        assert!(
            !f.domains[dt as usize].is_locked(),
            "Domain of function has already been used for further inference - cannot modify it"
        );
        f.domains[dt as usize] = domain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    #[test]
    fn define_and_call() {
        let cc = CompilerContext::new();
        let img = Image::new("in", Type::uint(8), &[20, 40]);
        let f = Function::declare(&cc, "f");
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        f.define(&cc, &["x", "y"], img.at([x.clone() - 1, y.clone()]));
        assert_eq!(f.dimensions(&cc), 2);
        let call = f.at(&cc, [x, y]);
        assert_eq!(call.ty(), Type::uint(8));
    }

    #[test]
    #[should_panic(expected = "Undefined variable")]
    fn free_variables_are_rejected() {
        let cc = CompilerContext::new();
        let f = Function::declare(&cc, "f");
        f.define(&cc, &["x"], Expr::var("y") + 1);
    }

    #[test]
    fn internal_lets_are_allowed() {
        let cc = CompilerContext::new();
        let f = Function::declare(&cc, "f");
        let t = Expr::var("t");
        f.define(
            &cc,
            &["x"],
            Expr::let_in("t", Expr::var("x") + 1, t.clone() * 2),
        );
    }

    #[test]
    #[should_panic(expected = "already been used for further inference")]
    fn locked_domains_reject_writes() {
        let cc = CompilerContext::new();
        let img = Image::new("in", Type::uint(8), &[20]);
        let f = Function::declare(&cc, "f");
        f.define(&cc, &["x"], img.at([Expr::var("x")]));
        // Reading the intervals locks every domain.
        let _ = f.domain_intervals(&cc, 0);
        let replacement = Domain::infinite(1);
        f.set_domain(&cc, DomainType::Valid, replacement);
    }

    #[test]
    fn reduction_definitions_self_reference() {
        let cc = CompilerContext::new();
        let img = Image::new("in", Type::uint(8), &[20]);
        let f = Function::declare(&cc, "hist");
        let x = Expr::var("x");
        f.define(&cc, &["x"], img.at([x.clone()]));

        let rdom = ReductionDomain::new(vec![ReductionVariable {
            var: "r".to_owned(),
            min: Expr::int(0),
            extent: Expr::int(20),
        }]);
        let r = Expr::var_reduction(Type::I32, "r", rdom);
        // hist(x) = hist(x) + in(r): the update calls the function itself.
        let update = f.at(&cc, [x.clone()]) + crate::ops::cast(Type::uint(8), img.at([r.clone()]));
        f.define_reduction(&cc, vec![x], update);
        assert!(f.is_reduction(&cc));
        assert!(f.reduction_domain(&cc).is_some());
    }
}
