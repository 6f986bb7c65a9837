//! Bytecode representation and `INFISCRIPT-V1` binary (de)serialization.
//!
//! Follows `binary/*.rs`'s length-prefixed, tagged-constant-pool format
//! (magic bytes + version, then a pool, then a flat instruction stream);
//! omits a CRC32 footer here, unlike the index snapshot format, since
//! filter programs are small and recompiled cheaply on mismatch (see
//! DESIGN.md).

use crate::error::{InfidexError, SerializationError};
use crate::types::FieldValue;

pub const MAGIC: &[u8; 13] = b"INFISCRIPT-V1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    LoadField = 0,
    PushConst = 1,
    Eq = 2,
    Neq = 3,
    Lt = 4,
    Le = 5,
    Gt = 6,
    Ge = 7,
    In = 8,
    Contains = 9,
    StartsWith = 10,
    EndsWith = 11,
    Like = 12,
    Matches = 13,
    IsNull = 14,
    And = 15,
    Or = 16,
    Not = 17,
    JumpIfFalse = 18,
    JumpIfTrue = 19,
    Jump = 20,
    Halt = 21,
}

impl OpCode {
    pub fn from_u8(byte: u8) -> Result<Self, SerializationError> {
        Ok(match byte {
            0 => OpCode::LoadField,
            1 => OpCode::PushConst,
            2 => OpCode::Eq,
            3 => OpCode::Neq,
            4 => OpCode::Lt,
            5 => OpCode::Le,
            6 => OpCode::Gt,
            7 => OpCode::Ge,
            8 => OpCode::In,
            9 => OpCode::Contains,
            10 => OpCode::StartsWith,
            11 => OpCode::EndsWith,
            12 => OpCode::Like,
            13 => OpCode::Matches,
            14 => OpCode::IsNull,
            15 => OpCode::And,
            16 => OpCode::Or,
            17 => OpCode::Not,
            18 => OpCode::JumpIfFalse,
            19 => OpCode::JumpIfTrue,
            20 => OpCode::Jump,
            21 => OpCode::Halt,
            other => return Err(SerializationError::UnknownOpcode(other)),
        })
    }
}

/// One (opcode, operand) pair. The operand's meaning depends on the opcode:
/// a constant-pool index for `PushConst`/`In`-arity, a field-table index for
/// `LoadField`, an absolute instruction index for jumps, unused (0) for
/// opcodes with no operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: i32,
}

/// A compiled, directly-executable filter expression: a flat instruction
/// stream plus the constant pool and field-name table it references.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub constants: Vec<FieldValue>,
    pub fields: Vec<String>,
    pub instructions: Vec<Instruction>,
}

fn tag_for(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Null => 0,
        FieldValue::Bool(_) => 1,
        FieldValue::Int(_) => 2,
        FieldValue::Float(_) => 3,
        FieldValue::Str(_) => 4,
    }
}

impl CompiledFilter {
    /// Serializes to the `INFISCRIPT-V1` wire format:
    /// `magic(13) | const_count(u32) | [tag(u8), payload]* | field_count(u32)
    /// | [len(u32), utf8 bytes]* | instr_count(u32) | [opcode(u8),
    /// operand(i32)]*`. All integers little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);

        out.extend_from_slice(&(self.constants.len() as u32).to_le_bytes());
        for c in &self.constants {
            out.push(tag_for(c));
            match c {
                FieldValue::Null => {}
                FieldValue::Bool(b) => out.push(*b as u8),
                FieldValue::Int(i) => out.extend_from_slice(&i.to_le_bytes()),
                FieldValue::Float(f) => out.extend_from_slice(&f.to_le_bytes()),
                FieldValue::Str(s) => {
                    let bytes = s.as_bytes();
                    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                    out.extend_from_slice(bytes);
                }
            }
        }

        out.extend_from_slice(&(self.fields.len() as u32).to_le_bytes());
        for f in &self.fields {
            let bytes = f.as_bytes();
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(bytes);
        }

        out.extend_from_slice(&(self.instructions.len() as u32).to_le_bytes());
        for instr in &self.instructions {
            out.push(instr.op as u8);
            out.extend_from_slice(&instr.operand.to_le_bytes());
        }

        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InfidexError> {
        let mut cursor = Cursor { bytes, pos: 0 };

        let magic = cursor.take(13)?;
        if magic != MAGIC.as_slice() {
            return Err(SerializationError::BadMagic {
                expected: "INFISCRIPT-V1",
                found: String::from_utf8_lossy(magic).into_owned(),
            }
            .into());
        }

        let const_count = cursor.take_u32()? as usize;
        let mut constants = Vec::with_capacity(const_count);
        for _ in 0..const_count {
            let tag = cursor.take_u8()?;
            let value = match tag {
                0 => FieldValue::Null,
                1 => FieldValue::Bool(cursor.take_u8()? != 0),
                2 => FieldValue::Int(cursor.take_i64()?),
                3 => FieldValue::Float(cursor.take_f64()?),
                4 => {
                    let len = cursor.take_u32()? as usize;
                    let raw = cursor.take(len)?;
                    FieldValue::Str(String::from_utf8_lossy(raw).into_owned())
                }
                other => return Err(SerializationError::UnknownOpcode(other).into()),
            };
            constants.push(value);
        }

        let field_count = cursor.take_u32()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            let len = cursor.take_u32()? as usize;
            let raw = cursor.take(len)?;
            fields.push(String::from_utf8_lossy(raw).into_owned());
        }

        let instr_count = cursor.take_u32()? as usize;
        let mut instructions = Vec::with_capacity(instr_count);
        let mut saw_halt = false;
        for _ in 0..instr_count {
            let op_byte = cursor.take_u8()?;
            let operand = cursor.take_i32()?;
            let op = OpCode::from_u8(op_byte)?;
            if op == OpCode::Halt {
                saw_halt = true;
            }
            if op == OpCode::PushConst {
                if operand < 0 || operand as usize >= constants.len() {
                    return Err(SerializationError::ConstantIndexOutOfRange {
                        index: operand as u32,
                        pool_len: constants.len() as u32,
                    }
                    .into());
                }
            }
            if op == OpCode::LoadField {
                if operand < 0 || operand as usize >= fields.len() {
                    return Err(SerializationError::FieldIndexOutOfRange {
                        index: operand as u32,
                        field_count: fields.len() as u32,
                    }
                    .into());
                }
            }
            instructions.push(Instruction { op, operand });
        }

        if !saw_halt {
            return Err(SerializationError::MissingHalt.into());
        }
        if cursor.pos != cursor.bytes.len() {
            return Err(SerializationError::TrailingBytes(cursor.bytes.len() - cursor.pos).into());
        }

        Ok(CompiledFilter {
            constants,
            fields,
            instructions,
        })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SerializationError> {
        if self.pos + n > self.bytes.len() {
            return Err(SerializationError::Truncated {
                expected_at_least: self.pos + n,
                found: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, SerializationError> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32, SerializationError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_i32(&mut self) -> Result<i32, SerializationError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_i64(&mut self) -> Result<i64, SerializationError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes(b.try_into().unwrap()))
    }

    fn take_f64(&mut self) -> Result<f64, SerializationError> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes(b.try_into().unwrap()))
    }
}
