use super::functions::Function;
use super::value::Value;
use super::FormulaErrorKind;
use crate::shared::format::group_thousands;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
    /// f-string
    Interpolated(Vec<InterpolationPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationPart {
    Text(String),
    Expr {
        expr: Box<Expr>,
        spec: Option<FormatSpec>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Default,
    Fixed,
    Percent,
    Integer,
    Str,
}

/// Subset of format specs: `[,][.N](f|%|d|s)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub raw: String,
    pub thousands: bool,
    pub precision: Option<usize>,
    pub kind: SpecKind,
}

impl FormatSpec {
    pub fn parse(raw: &str) -> Result<Self, FormulaErrorKind> {
        let invalid = || FormulaErrorKind::Format(raw.to_string());

        let (thousands, rest) = match raw.strip_prefix(',') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (precision, rest) = match rest.strip_prefix('.') {
            Some(after_dot) => {
                let digits: String = after_dot.chars().take_while(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return Err(invalid());
                }
                let precision = digits.parse::<usize>().map_err(|_| invalid())?;
                (Some(precision.min(30)), &after_dot[digits.len()..])
            }
            None => (None, rest),
        };

        let kind = match rest {
            "" if precision.is_none() => SpecKind::Default,
            "f" | "F" => SpecKind::Fixed,
            "%" => SpecKind::Percent,
            "d" if precision.is_none() => SpecKind::Integer,
            "s" if !thousands => SpecKind::Str,
            _ => return Err(invalid()),
        };

        Ok(Self {
            raw: raw.to_string(),
            thousands,
            precision,
            kind,
        })
    }

    pub fn apply(&self, value: &Value) -> Result<String, FormulaErrorKind> {
        let invalid = || {
            FormulaErrorKind::Format(format!("{} (for {})", self.raw, value.type_name()))
        };

        let text = match (self.kind, value) {
            (SpecKind::Str, Value::Str(s)) => return Ok(s.clone()),
            (SpecKind::Str, _) => return Err(invalid()),
            (SpecKind::Default, Value::Str(s)) if !self.thousands => return Ok(s.clone()),
            (_, Value::Str(_)) => return Err(invalid()),
            (SpecKind::Default, v) => v.to_string(),
            (SpecKind::Integer, Value::Int(i)) => i.to_string(),
            (SpecKind::Integer, _) => return Err(invalid()),
            (SpecKind::Fixed, v) => {
                let x = v.as_f64().ok_or_else(invalid)?;
                format!("{:.*}", self.precision.unwrap_or(6), x)
            }
            (SpecKind::Percent, v) => {
                let x = v.as_f64().ok_or_else(invalid)?;
                format!("{:.*}%", self.precision.unwrap_or(6), x * 100.0)
            }
        };

        if !self.thousands || text.contains('e') || text.contains("inf") || text.contains("nan") {
            return Ok(text);
        }
        let (int_part, rest) = match text.find(|c: char| c == '.' || c == '%') {
            Some(idx) => text.split_at(idx),
            None => (text.as_str(), ""),
        };
        Ok(format!("{}{}", group_thousands(int_part, ','), rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(spec: &str, value: Value) -> Result<String, FormulaErrorKind> {
        FormatSpec::parse(spec)?.apply(&value)
    }

    #[test]
    fn test_fixed_and_grouping() {
        assert_eq!(fmt(".2f", Value::Float(43.559999)).unwrap(), "43.56");
        assert_eq!(fmt(",.2f", Value::Float(1234567.891)).unwrap(), "1,234,567.89");
        assert_eq!(fmt(".0f", Value::Int(5)).unwrap(), "5");
        assert_eq!(fmt(",", Value::Int(1234567)).unwrap(), "1,234,567");
        assert_eq!(fmt(",", Value::Float(1234.5)).unwrap(), "1,234.5");
        assert_eq!(fmt("d", Value::Int(-4200)).unwrap(), "-4200");
        assert_eq!(fmt(",d", Value::Int(-4200)).unwrap(), "-4,200");
    }

    #[test]
    fn test_percent_and_strings() {
        assert_eq!(fmt(".1%", Value::Float(0.215)).unwrap(), "21.5%");
        assert_eq!(fmt("s", Value::from("abc")).unwrap(), "abc");
        assert_eq!(fmt("", Value::from("abc")).unwrap(), "abc");
    }

    #[test]
    fn test_invalid_specs() {
        assert!(FormatSpec::parse(">10").is_err());
        assert!(FormatSpec::parse(".2").is_err());
        assert!(FormatSpec::parse(".2d").is_err());
        assert!(FormatSpec::parse(",s").is_err());
        assert!(fmt("d", Value::Float(1.5)).is_err());
        assert!(fmt(".2f", Value::from("x")).is_err());
        assert!(fmt("s", Value::Int(1)).is_err());
    }
}
