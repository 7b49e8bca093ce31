//! Sandboxed formula language for pricing, weight conversion and SEO text.
//!
//! The grammar is closed: literals, variables, arithmetic, f-string
//! interpolation and calls to a fixed set of functions. Attribute access,
//! indexing, assignment, comparisons, keywords and calls to anything outside
//! [`functions::Function`] are rejected by the parser, so an expression that
//! parses can only compute a value from its context.

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

use std::collections::HashMap;
use thiserror::Error;

pub use ast::{Expr, FormatSpec};
pub use value::Value;

/// Причина ошибки формулы
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaErrorKind {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("{0} is not allowed")]
    Forbidden(String),

    #[error("function '{0}' is not allowed")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },

    #[error("name '{0}' is not defined")]
    UnknownVariable(String),

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Value(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("invalid format spec '{0}'")]
    Format(String),
}

/// Ошибка вычисления формулы вместе с текстом формулы
#[derive(Debug, Clone, PartialEq, Error)]
#[error("formula `{expression}` failed: {kind}")]
pub struct FormulaError {
    pub expression: String,
    pub kind: FormulaErrorKind,
}

impl FormulaError {
    pub fn new(expression: impl Into<String>, kind: FormulaErrorKind) -> Self {
        Self {
            expression: expression.into(),
            kind,
        }
    }

    /// Строка-заглушка для мягкого режима
    pub fn placeholder(&self) -> String {
        format!("[Formula Error: {} in: {}]", self.kind, self.expression)
    }
}

/// Переменные, доступные формуле. Собирается заново для каждой строки.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaContext {
    vars: HashMap<String, Value>,
}

impl FormulaContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Добавляет переменную, только если имя еще не занято
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormulaContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = FormulaContext::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

/// Разобранная формула
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let expr = parser::parse(source).map_err(|kind| FormulaError::new(source, kind))?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, ctx: &FormulaContext) -> Result<Value, FormulaError> {
        evaluator::evaluate(&self.expr, ctx).map_err(|kind| FormulaError::new(&self.source, kind))
    }
}

/// Строгий режим: ошибка разбора или вычисления возвращается вызывающему
pub fn evaluate_strict(source: &str, ctx: &FormulaContext) -> Result<Value, FormulaError> {
    Formula::parse(source)?.evaluate(ctx)
}

/// Мягкий режим: при ошибке возвращается заглушка с текстом формулы и причиной
pub fn evaluate_lenient(source: &str, ctx: &FormulaContext) -> String {
    match evaluate_strict(source, ctx) {
        Ok(value) => value.to_string(),
        Err(err) => err.placeholder(),
    }
}

/// Формула, разобранная один раз на запуск.
/// Ошибка разбора сохраняется и воспроизводится для каждой строки.
#[derive(Debug, Clone)]
pub struct CompiledFormula(Result<Formula, FormulaError>);

impl CompiledFormula {
    pub fn compile(source: &str) -> Self {
        let compiled = Formula::parse(source);
        if let Err(e) = &compiled {
            tracing::warn!("Formula does not compile: {}", e);
        }
        Self(compiled)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_ok()
    }

    pub fn strict(&self, ctx: &FormulaContext) -> Result<Value, FormulaError> {
        match &self.0 {
            Ok(formula) => formula.evaluate(ctx),
            Err(e) => Err(e.clone()),
        }
    }

    /// Строгий режим для числовых полей: строковый результат - ошибка
    pub fn strict_number(&self, ctx: &FormulaContext) -> Result<Value, FormulaError> {
        let value = self.strict(ctx)?;
        if value.is_number() {
            Ok(value)
        } else {
            let source = match &self.0 {
                Ok(formula) => formula.source().to_string(),
                Err(e) => e.expression.clone(),
            };
            Err(FormulaError::new(
                source,
                FormulaErrorKind::Type(format!("expected a number, got {}", value.type_name())),
            ))
        }
    }

    pub fn lenient(&self, ctx: &FormulaContext) -> String {
        match self.strict(ctx) {
            Ok(value) => value.to_string(),
            Err(e) => e.placeholder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FormulaContext {
        [
            ("list_price", Value::Int(100)),
            ("model", Value::from("Stratos 25/1-4")),
            ("vendor", Value::from("Wilo")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_price_formula() {
        let value = evaluate_strict("list_price * 0.36", &ctx()).unwrap();
        assert_eq!(value, Value::Float(36.0));
        assert_eq!(value.to_string(), "36.0");
    }

    #[test]
    fn test_strict_error_carries_expression() {
        let err = evaluate_strict("list_price * discount", &ctx()).unwrap_err();
        assert_eq!(err.expression, "list_price * discount");
        assert_eq!(
            err.kind,
            FormulaErrorKind::UnknownVariable("discount".to_string())
        );
    }

    #[test]
    fn test_lenient_returns_placeholder() {
        let text = evaluate_lenient("model.upper()", &ctx());
        assert_eq!(
            text,
            "[Formula Error: attribute access is not allowed in: model.upper()]"
        );

        let ok = evaluate_lenient("f\"{vendor} {model}\"", &ctx());
        assert_eq!(ok, "Wilo Stratos 25/1-4");
    }

    #[test]
    fn test_forbidden_constructs_rejected_even_when_numeric() {
        let context = ctx();
        for expr in [
            "list_price.real",
            "(list_price, 1)[0]",
            "x = 1",
            "list_price if list_price else 0",
            "lambda: 1",
            "__import__('os')",
            "eval('1')",
            "(round)(list_price)",
            "list_price > 1",
            "not list_price",
            "[list_price][0]",
            "{1: 2}",
            "f'{list_price!r}'",
            "import os",
        ] {
            let err = evaluate_strict(expr, &context).unwrap_err();
            assert!(
                matches!(
                    err.kind,
                    FormulaErrorKind::Forbidden(_)
                        | FormulaErrorKind::UnknownFunction(_)
                        | FormulaErrorKind::Syntax { .. }
                ),
                "{} -> {:?}",
                expr,
                err.kind
            );
        }
    }

    #[test]
    fn test_context_is_not_mutated() {
        let context = ctx();
        evaluate_strict("list_price * 2", &context).unwrap();
        assert_eq!(context, ctx());
        assert_eq!(context.get("list_price"), Some(&Value::Int(100)));
    }

    #[test]
    fn test_compiled_formula_reproduces_parse_error() {
        let formula = CompiledFormula::compile("list_price *");
        assert!(!formula.is_valid());
        let first = formula.strict(&ctx()).unwrap_err();
        let second = formula.strict(&ctx()).unwrap_err();
        assert_eq!(first, second);
        assert!(formula.lenient(&ctx()).starts_with("[Formula Error: syntax error"));
    }

    #[test]
    fn test_strict_number_rejects_text() {
        let formula = CompiledFormula::compile("model");
        let err = formula.strict_number(&ctx()).unwrap_err();
        assert_eq!(
            err.kind,
            FormulaErrorKind::Type("expected a number, got str".to_string())
        );
    }
}
