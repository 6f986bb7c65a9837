//! Filter DSL: a small SQL-like boolean expression language compiled to
//! bytecode and executed by a stack VM, used to post-filter search hits on
//! arbitrary document fields.

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod vm;

use crate::error::InfidexError;
use bytecode::CompiledFilter;

/// Parses and compiles filter source text in one step.
pub fn compile_filter(src: &str) -> Result<CompiledFilter, InfidexError> {
    let ast = parser::parse(src)?;
    Ok(compiler::compile(&ast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, Field, FieldValue, InternalId, WeightClass};
    use std::collections::HashMap;

    #[test]
    fn end_to_end_parse_compile_execute() {
        let filter = compile_filter("genre = \"scifi\" AND year >= 2000").unwrap();
        let mut fields = HashMap::new();
        fields.insert("genre".to_string(), Field::new(FieldValue::Str("scifi".to_string())));
        fields.insert(
            "year".to_string(),
            Field {
                value: FieldValue::Int(2010),
                weight: WeightClass::Med,
                indexable: false,
                facetable: true,
            },
        );
        let doc = Document {
            key: 1,
            segment: 0,
            internal_id: InternalId::new(0),
            fields,
            text_field: "body".to_string(),
            deleted: false,
        };
        assert!(vm::execute(&filter, &doc));
    }

    #[test]
    fn bytecode_round_trips_and_still_executes() {
        let filter = compile_filter("year >= 2000").unwrap();
        let bytes = filter.to_bytes();
        let decoded = CompiledFilter::from_bytes(&bytes).unwrap();
        let mut fields = HashMap::new();
        fields.insert(
            "year".to_string(),
            Field {
                value: FieldValue::Int(1999),
                weight: WeightClass::Med,
                indexable: false,
                facetable: true,
            },
        );
        let doc = Document {
            key: 1,
            segment: 0,
            internal_id: InternalId::new(0),
            fields,
            text_field: "body".to_string(),
            deleted: false,
        };
        assert!(!vm::execute(&decoded, &doc));
    }
}
