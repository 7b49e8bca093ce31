use super::value::Value;
use super::FormulaErrorKind;

/// The only callables a formula can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Round,
    Int,
    Float,
    Str,
    Abs,
    Min,
    Max,
    Len,
    Upper,
    Lower,
    Title,
    Strip,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        let function = match name {
            "round" => Function::Round,
            "int" => Function::Int,
            "float" => Function::Float,
            "str" => Function::Str,
            "abs" => Function::Abs,
            "min" => Function::Min,
            "max" => Function::Max,
            "len" => Function::Len,
            "upper" => Function::Upper,
            "lower" => Function::Lower,
            "title" => Function::Title,
            "strip" => Function::Strip,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Round => "round",
            Function::Int => "int",
            Function::Float => "float",
            Function::Str => "str",
            Function::Abs => "abs",
            Function::Min => "min",
            Function::Max => "max",
            Function::Len => "len",
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Title => "title",
            Function::Strip => "strip",
        }
    }

    /// Checked at parse time
    pub fn check_arity(&self, got: usize) -> Result<(), FormulaErrorKind> {
        let (ok, expected) = match self {
            Function::Round => ((1..=2).contains(&got), "1 or 2"),
            Function::Min | Function::Max => (got >= 2, "at least 2"),
            _ => (got == 1, "1"),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaErrorKind::Arity {
                function: self.name().to_string(),
                expected: expected.to_string(),
                got,
            })
        }
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value, FormulaErrorKind> {
        self.check_arity(args.len())?;
        match self {
            Function::Round => round(&args[0], args.get(1)),
            Function::Int => to_int(&args[0]),
            Function::Float => to_float(&args[0]),
            Function::Str => Ok(Value::Str(args[0].to_string())),
            Function::Abs => match &args[0] {
                Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(FormulaErrorKind::Overflow),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                Value::Str(_) => Err(bad_operand("abs()", &args[0])),
            },
            Function::Min => extreme(args, std::cmp::Ordering::Less),
            Function::Max => extreme(args, std::cmp::Ordering::Greater),
            Function::Len => match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(FormulaErrorKind::Type(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
            },
            Function::Upper => map_str(self, &args[0], |s| s.to_uppercase()),
            Function::Lower => map_str(self, &args[0], |s| s.to_lowercase()),
            Function::Title => map_str(self, &args[0], title_case),
            Function::Strip => map_str(self, &args[0], |s| s.trim().to_string()),
        }
    }
}

fn bad_operand(function: &str, value: &Value) -> FormulaErrorKind {
    FormulaErrorKind::Type(format!(
        "bad operand type for {}: '{}'",
        function,
        value.type_name()
    ))
}

fn map_str(function: &Function, value: &Value, f: impl Fn(&str) -> String) -> Result<Value, FormulaErrorKind> {
    match value {
        Value::Str(s) => Ok(Value::Str(f(s))),
        other => Err(FormulaErrorKind::Type(format!(
            "{}() argument must be str, not {}",
            function.name(),
            other.type_name()
        ))),
    }
}

fn float_to_int(x: f64) -> Result<i64, FormulaErrorKind> {
    if !x.is_finite() {
        return Err(FormulaErrorKind::Value(format!(
            "cannot convert float {} to integer",
            x
        )));
    }
    if x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Ok(x as i64)
    } else {
        Err(FormulaErrorKind::Overflow)
    }
}

/// Banker's rounding; with `ndigits` the result keeps the input type
fn round(value: &Value, ndigits: Option<&Value>) -> Result<Value, FormulaErrorKind> {
    let digits = match ndigits {
        None => None,
        Some(Value::Int(n)) => Some(*n),
        Some(other) => {
            return Err(FormulaErrorKind::Type(format!(
                "'{}' object cannot be interpreted as an integer",
                other.type_name()
            )))
        }
    };

    match (value, digits) {
        (Value::Int(i), None) => Ok(Value::Int(*i)),
        (Value::Float(x), None) => float_to_int(x.round_ties_even()).map(Value::Int),
        (Value::Int(i), Some(n)) if n >= 0 => Ok(Value::Int(*i)),
        (Value::Int(i), Some(n)) => {
            let scale = 10f64.powi(n.saturating_neg().min(308) as i32);
            float_to_int(((*i as f64) / scale).round_ties_even() * scale).map(Value::Int)
        }
        (Value::Float(x), Some(_)) if !x.is_finite() => Ok(Value::Float(*x)),
        (Value::Float(x), Some(n)) if n >= 0 => {
            let formatted = format!("{:.*}", n.min(17) as usize, x);
            formatted
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| FormulaErrorKind::Value(format!("cannot round {}", x)))
        }
        (Value::Float(x), Some(n)) => {
            let scale = 10f64.powi(n.saturating_neg().min(308) as i32);
            Ok(Value::Float((x / scale).round_ties_even() * scale))
        }
        (Value::Str(_), _) => Err(FormulaErrorKind::Type(
            "type str doesn't define __round__ method".to_string(),
        )),
    }
}

fn to_int(value: &Value) -> Result<Value, FormulaErrorKind> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(x) => float_to_int(x.trunc()).map(Value::Int),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            FormulaErrorKind::Value(format!("invalid literal for int() with base 10: '{}'", s))
        }),
    }
}

fn to_float(value: &Value) -> Result<Value, FormulaErrorKind> {
    match value {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| FormulaErrorKind::Value(format!("could not convert string to float: '{}'", s))),
    }
}

/// min/max: the first extreme argument wins, numbers and strings don't mix
fn extreme(args: Vec<Value>, wanted: std::cmp::Ordering) -> Result<Value, FormulaErrorKind> {
    let mut iter = args.into_iter();
    let mut best = match iter.next() {
        Some(v) => v,
        None => return Err(FormulaErrorKind::Value("empty argument list".to_string())),
    };

    for candidate in iter {
        let ordering = match (&candidate, &best) {
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (a, b) if a.is_number() && b.is_number() => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
            }
            (a, b) => {
                return Err(FormulaErrorKind::Type(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    a.type_name(),
                    b.type_name()
                )))
            }
        };
        if ordering == wanted {
            best = candidate;
        }
    }
    Ok(best)
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
