//! Stack-based bytecode interpreter.
//!
//! Follows `binary/vm.rs`'s dispatch-loop shape (a flat `Vec<Instruction>`,
//! an explicit instruction pointer, a `Vec<FieldValue>` operand stack).
//! Runtime type mismatches are absorbed to `false`: a filter runtime error
//! degrades the single document to non-matching, not a search-wide
//! failure. Only a malformed program (stack underflow, a jump or
//! constant-pool index out of range) is a hard failure, and that can only
//! happen if a `CompiledFilter` was hand-constructed or corrupted after
//! `from_bytes` already validated it — the VM still checks defensively
//! rather than trusting the caller.

use crate::filter::ast::like_match;
use crate::filter::bytecode::{CompiledFilter, OpCode};
use crate::types::{Document, FieldValue};

/// Runs a compiled filter against one document. Never panics: any internal
/// inconsistency (which `from_bytes` should already have rejected) degrades
/// to `false` rather than crashing the surrounding search.
pub fn execute(filter: &CompiledFilter, doc: &Document) -> bool {
    let mut stack: Vec<FieldValue> = Vec::new();
    let mut ip: usize = 0;

    loop {
        let Some(instr) = filter.instructions.get(ip) else {
            return false;
        };
        match instr.op {
            OpCode::Halt => {
                return stack.pop().map(|v| v.truthy()).unwrap_or(false);
            }
            OpCode::LoadField => {
                let Some(name) = filter.fields.get(instr.operand as usize) else {
                    return false;
                };
                let value = doc.fields.get(name).map(|f| f.value.clone()).unwrap_or(FieldValue::Null);
                stack.push(value);
            }
            OpCode::PushConst => {
                let Some(value) = filter.constants.get(instr.operand as usize) else {
                    return false;
                };
                stack.push(value.clone());
            }
            OpCode::Eq | OpCode::Neq | OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return false;
                };
                let result = match instr.op {
                    OpCode::Eq => a.eq_ci(&b),
                    OpCode::Neq => !a.eq_ci(&b),
                    OpCode::Lt => a.compare_to(&b) == Some(std::cmp::Ordering::Less),
                    OpCode::Le => matches!(
                        a.compare_to(&b),
                        Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
                    ),
                    OpCode::Gt => a.compare_to(&b) == Some(std::cmp::Ordering::Greater),
                    OpCode::Ge => matches!(
                        a.compare_to(&b),
                        Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
                    ),
                    _ => unreachable!(),
                };
                stack.push(FieldValue::Bool(result));
            }
            OpCode::In => {
                let arity = instr.operand as usize;
                if stack.len() < arity + 1 {
                    return false;
                }
                let values: Vec<FieldValue> = stack.split_off(stack.len() - arity);
                let Some(lhs) = stack.pop() else { return false };
                let found = values.iter().any(|v| lhs.eq_ci(v));
                stack.push(FieldValue::Bool(found));
            }
            OpCode::Contains | OpCode::StartsWith | OpCode::EndsWith | OpCode::Like => {
                let (Some(pattern), Some(lhs)) = (stack.pop(), stack.pop()) else {
                    return false;
                };
                let lhs = lhs.as_str_repr().to_lowercase();
                let pattern = pattern.as_str_repr().to_lowercase();
                let result = match instr.op {
                    OpCode::Contains => lhs.contains(&pattern),
                    OpCode::StartsWith => lhs.starts_with(&pattern),
                    OpCode::EndsWith => lhs.ends_with(&pattern),
                    OpCode::Like => like_match(&lhs, &pattern),
                    _ => unreachable!(),
                };
                stack.push(FieldValue::Bool(result));
            }
            OpCode::Matches => {
                let (Some(pattern), Some(lhs)) = (stack.pop(), stack.pop()) else {
                    return false;
                };
                let lhs = lhs.as_str_repr();
                let pattern = pattern.as_str_repr();
                let matched = regex::RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| re.is_match(&lhs))
                    .unwrap_or(false);
                stack.push(FieldValue::Bool(matched));
            }
            OpCode::IsNull => {
                let Some(v) = stack.pop() else { return false };
                stack.push(FieldValue::Bool(v.is_null()));
            }
            OpCode::Not => {
                let Some(v) = stack.pop() else { return false };
                stack.push(FieldValue::Bool(!v.truthy()));
            }
            OpCode::And | OpCode::Or => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return false;
                };
                let result = if instr.op == OpCode::And { a.truthy() && b.truthy() } else { a.truthy() || b.truthy() };
                stack.push(FieldValue::Bool(result));
            }
            OpCode::JumpIfFalse => {
                let Some(v) = stack.pop() else { return false };
                if !v.truthy() {
                    ip = instr.operand as usize;
                    continue;
                }
            }
            OpCode::JumpIfTrue => {
                let Some(v) = stack.pop() else { return false };
                if v.truthy() {
                    ip = instr.operand as usize;
                    continue;
                }
            }
            OpCode::Jump => {
                ip = instr.operand as usize;
                continue;
            }
        }
        ip += 1;
    }
}
