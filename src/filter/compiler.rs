//! Compiles a `FilterAst` into a `CompiledFilter` bytecode program.
//!
//! Short-circuit control flow (`AND`/`OR`/ternary) is compiled to jumps
//! exactly as a small stack-machine compiler would for any boolean
//! expression language: patch-forward jump targets after emitting the
//! jumped-over block.

use crate::filter::ast::{BoolOp, CompareOp, FilterAst, StringOp};
use crate::filter::bytecode::{CompiledFilter, Instruction, OpCode};
use crate::types::FieldValue;

struct Compiler {
    constants: Vec<FieldValue>,
    fields: Vec<String>,
    instructions: Vec<Instruction>,
}

pub fn compile(ast: &FilterAst) -> CompiledFilter {
    let mut c = Compiler {
        constants: Vec::new(),
        fields: Vec::new(),
        instructions: Vec::new(),
    };
    c.emit_node(ast);
    c.instructions.push(Instruction { op: OpCode::Halt, operand: 0 });
    CompiledFilter {
        constants: c.constants,
        fields: c.fields,
        instructions: c.instructions,
    }
}

impl Compiler {
    fn field_index(&mut self, name: &str) -> i32 {
        if let Some(i) = self.fields.iter().position(|f| f == name) {
            return i as i32;
        }
        self.fields.push(name.to_string());
        (self.fields.len() - 1) as i32
    }

    fn const_index(&mut self, value: FieldValue) -> i32 {
        self.constants.push(value);
        (self.constants.len() - 1) as i32
    }

    fn emit(&mut self, op: OpCode, operand: i32) -> usize {
        self.instructions.push(Instruction { op, operand });
        self.instructions.len() - 1
    }

    fn patch_jump(&mut self, at: usize) {
        let target = self.instructions.len() as i32;
        self.instructions[at].operand = target;
    }

    fn compare_opcode(op: CompareOp) -> OpCode {
        match op {
            CompareOp::Eq => OpCode::Eq,
            CompareOp::Neq => OpCode::Neq,
            CompareOp::Lt => OpCode::Lt,
            CompareOp::Le => OpCode::Le,
            CompareOp::Gt => OpCode::Gt,
            CompareOp::Ge => OpCode::Ge,
        }
    }

    fn string_opcode(op: StringOp) -> OpCode {
        match op {
            StringOp::Contains => OpCode::Contains,
            StringOp::StartsWith => OpCode::StartsWith,
            StringOp::EndsWith => OpCode::EndsWith,
            StringOp::Like => OpCode::Like,
        }
    }

    fn emit_node(&mut self, ast: &FilterAst) {
        match ast {
            FilterAst::Literal(v) => {
                let idx = self.const_index(v.clone());
                self.emit(OpCode::PushConst, idx);
            }
            FilterAst::Value(vf) => {
                let field = self.field_index(&vf.field);
                let value = self.const_index(vf.value.clone());
                self.emit(OpCode::LoadField, field);
                self.emit(OpCode::PushConst, value);
                self.emit(Self::compare_opcode(vf.op), 0);
            }
            FilterAst::Range(rf) => {
                // (field >= min) AND (field <= max), with NONE bounds
                // treated as always-true, compiled identically to an
                // explicit `AND` composite so missing bounds short-circuit
                // the same way.
                let field = self.field_index(&rf.field);
                match &rf.min {
                    Some(min) => {
                        let idx = self.const_index(min.clone());
                        self.emit(OpCode::LoadField, field);
                        self.emit(OpCode::PushConst, idx);
                        self.emit(if rf.min_inclusive { OpCode::Ge } else { OpCode::Gt }, 0);
                    }
                    None => {
                        let idx = self.const_index(FieldValue::Bool(true));
                        self.emit(OpCode::PushConst, idx);
                    }
                }
                let jump_if_false = self.emit(OpCode::JumpIfFalse, -1);
                match &rf.max {
                    Some(max) => {
                        let idx = self.const_index(max.clone());
                        self.emit(OpCode::LoadField, field);
                        self.emit(OpCode::PushConst, idx);
                        self.emit(if rf.max_inclusive { OpCode::Le } else { OpCode::Lt }, 0);
                    }
                    None => {
                        let idx = self.const_index(FieldValue::Bool(true));
                        self.emit(OpCode::PushConst, idx);
                    }
                }
                let jump_over_false_push = self.emit(OpCode::Jump, -1);
                self.patch_jump(jump_if_false);
                let idx = self.const_index(FieldValue::Bool(false));
                self.emit(OpCode::PushConst, idx);
                self.patch_jump(jump_over_false_push);
            }
            FilterAst::In(inf) => {
                let field = self.field_index(&inf.field);
                self.emit(OpCode::LoadField, field);
                for v in &inf.values {
                    let idx = self.const_index(v.clone());
                    self.emit(OpCode::PushConst, idx);
                }
                self.emit(OpCode::In, inf.values.len() as i32);
            }
            FilterAst::StringOp(sf) => {
                let field = self.field_index(&sf.field);
                let pattern = self.const_index(FieldValue::Str(sf.pattern.clone()));
                self.emit(OpCode::LoadField, field);
                self.emit(OpCode::PushConst, pattern);
                self.emit(Self::string_opcode(sf.op), 0);
            }
            FilterAst::Regex(rf) => {
                let field = self.field_index(&rf.field);
                let pattern = self.const_index(FieldValue::Str(rf.pattern.clone()));
                self.emit(OpCode::LoadField, field);
                self.emit(OpCode::PushConst, pattern);
                self.emit(OpCode::Matches, 0);
            }
            FilterAst::Null(nf) => {
                let field = self.field_index(&nf.field);
                self.emit(OpCode::LoadField, field);
                self.emit(OpCode::IsNull, 0);
                if !nf.is_null {
                    self.emit(OpCode::Not, 0);
                }
            }
            FilterAst::Composite(cf) => match cf.op {
                BoolOp::Not => {
                    self.emit_node(&cf.left);
                    self.emit(OpCode::Not, 0);
                }
                BoolOp::And => {
                    self.emit_node(&cf.left);
                    let short_circuit = self.emit(OpCode::JumpIfFalse, -1);
                    if let Some(right) = &cf.right {
                        self.emit_node(right);
                    }
                    let skip_false = self.emit(OpCode::Jump, -1);
                    self.patch_jump(short_circuit);
                    let idx = self.const_index(FieldValue::Bool(false));
                    self.emit(OpCode::PushConst, idx);
                    self.patch_jump(skip_false);
                }
                BoolOp::Or => {
                    self.emit_node(&cf.left);
                    let short_circuit = self.emit(OpCode::JumpIfTrue, -1);
                    if let Some(right) = &cf.right {
                        self.emit_node(right);
                    }
                    let skip_true = self.emit(OpCode::Jump, -1);
                    self.patch_jump(short_circuit);
                    let idx = self.const_index(FieldValue::Bool(true));
                    self.emit(OpCode::PushConst, idx);
                    self.patch_jump(skip_true);
                }
            },
            FilterAst::Ternary(tf) => {
                self.emit_node(&tf.cond);
                let jump_if_false = self.emit(OpCode::JumpIfFalse, -1);
                self.emit_node(&tf.if_true);
                let skip_false_branch = self.emit(OpCode::Jump, -1);
                self.patch_jump(jump_if_false);
                self.emit_node(&tf.if_false);
                self.patch_jump(skip_false_branch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse;
    use crate::filter::vm::execute;
    use crate::types::{Document, Field, FieldValue, InternalId, WeightClass};
    use std::collections::HashMap;

    fn doc_with(field: &str, value: FieldValue) -> Document {
        let mut fields = HashMap::new();
        fields.insert(
            field.to_string(),
            Field {
                value,
                weight: WeightClass::Med,
                indexable: false,
                facetable: true,
            },
        );
        Document {
            key: 1,
            segment: 0,
            internal_id: InternalId::new(0),
            fields,
            text_field: "body".to_string(),
            deleted: false,
        }
    }

    #[test]
    fn compiled_ge_matches_reference_evaluator() {
        let ast = parse("year >= 2000").unwrap();
        let compiled = compile(&ast);
        let doc = doc_with("year", FieldValue::Int(2005));
        assert_eq!(execute(&compiled, &doc), ast.matches(&doc));
        assert!(execute(&compiled, &doc));
    }

    #[test]
    fn and_short_circuits_and_matches_reference() {
        let ast = parse("year >= 2000 AND genre = \"scifi\"").unwrap();
        let compiled = compile(&ast);
        let mut doc = doc_with("year", FieldValue::Int(1990));
        doc.fields.insert(
            "genre".to_string(),
            Field::new(FieldValue::Str("scifi".to_string())),
        );
        assert_eq!(execute(&compiled, &doc), ast.matches(&doc));
        assert!(!execute(&compiled, &doc));
    }

    #[test]
    fn ternary_compiles_to_matching_branches() {
        let ast = parse("age >= 18 ? genre == \"rated-r\" : genre == \"family\"").unwrap();
        let compiled = compile(&ast);
        let mut doc = doc_with("age", FieldValue::Int(12));
        doc.fields.insert("genre".to_string(), Field::new(FieldValue::Str("family".to_string())));
        assert_eq!(execute(&compiled, &doc), ast.matches(&doc));
    }
}
