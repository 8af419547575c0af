//! Textual rendering of IR, types and intervals.
//!
//! The format is for diagnostics and tests; it is not a stable surface and
//! is not meant to be parsed back.

use std::fmt::{self, Display, Formatter};

use crate::{
    interval::{DomInterval, Interval, Range},
    ir::{ClampKind, Expr, ExprKind, Stmt, StmtKind},
    ty::{Type, TypeKind},
};

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TypeKind::Int => "int",
            TypeKind::UInt => "uint",
            TypeKind::Float => "float",
            TypeKind::Handle => "handle",
        };
        write!(f, "{kind}{}", self.bits)?;
        if self.width > 1 {
            write!(f, "x{}", self.width)?;
        }
        Ok(())
    }
}

fn float_str(v: f32) -> String {
    let mut buf = ryu::Buffer::new();
    format!("{}f", buf.format(v))
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use ExprKind as K;
        match self.kind() {
            K::IntImm(v) => write!(f, "{v}"),
            K::FloatImm(v) => write!(f, "{}", float_str(*v)),
            K::Cast(v) => write!(f, "{}({v})", self.ty()),
            K::Variable { name, .. } => write!(f, "{name}"),
            K::Add(a, b) => write!(f, "({a} + {b})"),
            K::Sub(a, b) => write!(f, "({a} - {b})"),
            K::Mul(a, b) => write!(f, "({a}*{b})"),
            K::Div(a, b) => write!(f, "({a}/{b})"),
            K::Mod(a, b) => write!(f, "({a} % {b})"),
            K::Min(a, b) => write!(f, "min({a}, {b})"),
            K::Max(a, b) => write!(f, "max({a}, {b})"),
            K::Eq(a, b) => write!(f, "({a} == {b})"),
            K::Ne(a, b) => write!(f, "({a} != {b})"),
            K::Lt(a, b) => write!(f, "({a} < {b})"),
            K::Le(a, b) => write!(f, "({a} <= {b})"),
            K::Gt(a, b) => write!(f, "({a} > {b})"),
            K::Ge(a, b) => write!(f, "({a} >= {b})"),
            K::And(a, b) => write!(f, "({a} && {b})"),
            K::Or(a, b) => write!(f, "({a} || {b})"),
            K::Not(a) => write!(f, "!{a}"),
            K::Select {
                condition,
                true_value,
                false_value,
            } => write!(f, "select({condition}, {true_value}, {false_value})"),
            K::Load { name, index, .. } => write!(f, "{name}[{index}]"),
            K::Ramp { base, stride, width } => write!(f, "ramp({base}, {stride}, {width})"),
            K::Broadcast { value, width } => write!(f, "broadcast({value}, {width})"),
            K::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            K::Let { name, value, body } => write!(f, "(let {name} = {value} in {body})"),
            K::Clamp {
                clamp,
                value,
                min,
                max,
                tile,
            } => match clamp {
                ClampKind::None => write!(f, "clamp_none({value})"),
                ClampKind::Tile => write!(f, "tile({value}, {min}, {max}, {tile})"),
                ClampKind::Replicate => write!(f, "clamp({value}, {min}, {max})"),
                ClampKind::Wrap => write!(f, "wrap({value}, {min}, {max})"),
                ClampKind::Reflect => write!(f, "reflect({value}, {min}, {max})"),
                ClampKind::Reflect101 => write!(f, "reflect101({value}, {min}, {max})"),
            },
            K::Solve { body, intervals } => {
                write!(f, "solve({body}")?;
                for i in intervals {
                    write!(f, ", {i}")?;
                }
                write!(f, ")")
            }
            K::TargetVar { name, body, .. } => write!(f, "target({name}, {body})"),
            K::Infinity { count } => {
                if *count < 0 {
                    write!(f, "-inf")
                } else {
                    write!(f, "inf")
                }
            }
        }
    }
}

impl Display for DomInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.exact {
            write!(f, "[{}, {}]", self.min, self.max)
        } else {
            write!(f, "~[{}, {}]", self.min, self.max)
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.min {
            Some(m) => write!(f, "[{m}, ")?,
            None => write!(f, "[?, ")?,
        }
        match &self.max {
            Some(m) => write!(f, "{m}]"),
            None => write!(f, "?]"),
        }
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{} for {}]", self.min, self.extent)
    }
}

struct StmtPrinter<'a> {
    stmt: &'a Stmt,
    indent: usize,
}

fn nested(stmt: &Stmt, indent: usize) -> StmtPrinter<'_> {
    StmtPrinter {
        stmt,
        indent: indent + 1,
    }
}

impl Display for StmtPrinter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use StmtKind as K;
        let pad = "  ".repeat(self.indent);
        let indent = self.indent;
        match self.stmt.kind() {
            K::LetStmt { name, value, body } => {
                writeln!(f, "{pad}let {name} = {value}")?;
                write!(f, "{}", nested(body, indent))
            }
            K::AssertStmt { condition, message } => {
                writeln!(f, "{pad}assert({condition}, \"{message}\")")
            }
            K::PrintStmt { prefix, args } => {
                write!(f, "{pad}print(\"{prefix}\"")?;
                for a in args {
                    write!(f, ", {a}")?;
                }
                writeln!(f, ")")
            }
            K::Pipeline {
                name,
                produce,
                update,
                consume,
            } => {
                writeln!(f, "{pad}produce {name} {{")?;
                write!(f, "{}", nested(produce, indent))?;
                if let Some(u) = update {
                    writeln!(f, "{pad}}} update {{")?;
                    write!(f, "{}", nested(u, indent))?;
                }
                writeln!(f, "{pad}}} consume {{")?;
                write!(f, "{}", nested(consume, indent))?;
                writeln!(f, "{pad}}}")
            }
            K::For {
                name,
                min,
                extent,
                for_kind,
                body,
                ..
            } => {
                let kind = format!("{for_kind}").to_lowercase();
                writeln!(f, "{pad}{kind} for ({name}, {min}, {extent}) {{")?;
                write!(f, "{}", nested(body, indent))?;
                writeln!(f, "{pad}}}")
            }
            K::Store { name, value, index } => writeln!(f, "{pad}{name}[{index}] = {value}"),
            K::Provide { name, value, args } => {
                write!(f, "{pad}{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                writeln!(f, ") = {value}")
            }
            K::Allocate {
                name,
                ty,
                size,
                body,
            } => {
                writeln!(f, "{pad}allocate {name}[{ty}*{size}]")?;
                write!(f, "{}", nested(body, indent))
            }
            K::Free { name } => writeln!(f, "{pad}free {name}"),
            K::Realize {
                name,
                ty,
                bounds,
                body,
            } => {
                write!(f, "{pad}realize {name}[{ty}](")?;
                for (i, (min, extent)) in bounds.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[{min}, {extent}]")?;
                }
                writeln!(f, ") {{")?;
                write!(f, "{}", nested(body, indent))?;
                writeln!(f, "{pad}}}")
            }
            K::Block { first, rest } => {
                write!(
                    f,
                    "{}",
                    StmtPrinter {
                        stmt: first,
                        indent: self.indent
                    }
                )?;
                if let Some(r) = rest {
                    write!(
                        f,
                        "{}",
                        StmtPrinter {
                            stmt: r,
                            indent: self.indent
                        }
                    )?;
                }
                Ok(())
            }
            K::StmtTargetVar { name, body, .. } => {
                writeln!(f, "{pad}target {name} {{")?;
                write!(f, "{}", nested(body, indent))?;
                writeln!(f, "{pad}}}")
            }
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            StmtPrinter {
                stmt: self,
                indent: 0
            }
        )
    }
}
