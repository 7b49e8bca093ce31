use super::ast::{BinaryOp, Expr, InterpolationPart, UnaryOp};
use super::value::Value;
use super::{FormulaContext, FormulaErrorKind};

/// Upper bound for strings built by `+`, `*` and f-strings
pub const MAX_STRING_LEN: usize = 100_000;

pub fn evaluate(expr: &Expr, ctx: &FormulaContext) -> Result<Value, FormulaErrorKind> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| FormulaErrorKind::UnknownVariable(name.clone())),
        Expr::Unary { op, operand } => unary(*op, evaluate(operand, ctx)?),
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            binary(*op, l, r)
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            function.call(values)
        }
        Expr::Interpolated(parts) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    InterpolationPart::Text(text) => out.push_str(text),
                    InterpolationPart::Expr { expr, spec } => {
                        let value = evaluate(expr, ctx)?;
                        match spec {
                            Some(spec) => out.push_str(&spec.apply(&value)?),
                            None => out.push_str(&value.to_string()),
                        }
                    }
                }
                check_len(out.len())?;
            }
            Ok(Value::Str(out))
        }
    }
}

fn check_len(len: usize) -> Result<(), FormulaErrorKind> {
    if len > MAX_STRING_LEN {
        return Err(FormulaErrorKind::Value(format!(
            "string result longer than {} characters",
            MAX_STRING_LEN
        )));
    }
    Ok(())
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, FormulaErrorKind> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(FormulaErrorKind::Overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (op, v) => Err(FormulaErrorKind::Type(format!(
            "bad operand type for unary {}: '{}'",
            match op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
            },
            v.type_name()
        ))),
    }
}

fn unsupported(op: BinaryOp, l: &Value, r: &Value) -> FormulaErrorKind {
    FormulaErrorKind::Type(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        l.type_name(),
        r.type_name()
    ))
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, FormulaErrorKind> {
    match (&l, &r) {
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            check_len(a.len() + b.len())?;
            Ok(Value::Str(format!("{}{}", a, b)))
        }
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) if op == BinaryOp::Mul => {
            repeat(s, *n)
        }
        (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            // both sides are numeric here
            let a = l.as_f64().unwrap_or_default();
            let b = r.as_f64().unwrap_or_default();
            float_op(op, a, b)
        }
        _ => Err(unsupported(op, &l, &r)),
    }
}

fn repeat(s: &str, n: i64) -> Result<Value, FormulaErrorKind> {
    if n <= 0 || s.is_empty() {
        return Ok(Value::Str(String::new()));
    }
    let total = (s.len() as u128) * (n as u128);
    if total > MAX_STRING_LEN as u128 {
        return Err(FormulaErrorKind::Value(format!(
            "string result longer than {} characters",
            MAX_STRING_LEN
        )));
    }
    Ok(Value::Str(s.repeat(n as usize)))
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<Value, FormulaErrorKind> {
    let overflow = FormulaErrorKind::Overflow;
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Div => {
            if b == 0 {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            let q = a.checked_div(b).ok_or(overflow)?;
            let adjust = (a % b != 0) && ((a < 0) != (b < 0));
            Ok(Value::Int(if adjust { q - 1 } else { q }))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            let r = a.checked_rem(b).ok_or(overflow)?;
            Ok(Value::Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
        }
        BinaryOp::Pow => {
            if b < 0 {
                return float_op(op, a as f64, b as f64);
            }
            let exp = u32::try_from(b).map_err(|_| FormulaErrorKind::Overflow)?;
            a.checked_pow(exp).map(Value::Int).ok_or(overflow)
        }
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<Value, FormulaErrorKind> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            a / b
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            (a / b).floor()
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err(FormulaErrorKind::Value(
                    "negative number cannot be raised to a fractional power".to_string(),
                ));
            }
            let r = a.powf(b);
            if r.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(FormulaErrorKind::Overflow);
            }
            r
        }
    };
    Ok(Value::Float(result))
}
