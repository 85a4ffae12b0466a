// SPDX-License-Identifier: MIT

use crate::adk::error::BoxError;
use crate::adk::tool::FunctionTool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Left undocumented so the schema stays a bare string enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Arguments for the calculator tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculatorArgs {
    pub operation: Operation,
    /// Left operand
    pub a: f64,
    /// Right operand
    pub b: f64,
}

pub fn calculate(args: &CalculatorArgs) -> Result<f64, BoxError> {
    let result = match args.operation {
        Operation::Add => args.a + args.b,
        Operation::Subtract => args.a - args.b,
        Operation::Multiply => args.a * args.b,
        Operation::Divide => {
            if args.b == 0.0 {
                return Err("Division by zero".into());
            }
            args.a / args.b
        }
    };
    Ok(result)
}

pub fn calculator_tool() -> FunctionTool<CalculatorArgs> {
    FunctionTool::new(
        "calculator",
        "Perform basic arithmetic (add, subtract, multiply, divide) on two numbers",
        |args: CalculatorArgs| async move {
            let result = calculate(&args)?;
            Ok::<Value, BoxError>(json!({ "result": result }))
        },
    )
}
