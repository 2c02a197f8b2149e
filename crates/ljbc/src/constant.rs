//! Constant encodings
//!
//! Table values and GC constants share one trick: the type tag is a ULEB128
//! value, and any tag at or above the string tag is a string whose byte
//! length is `tag - STRING_TAG`. No separate length field is written.

use serde::{Deserialize, Serialize};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::Result;
use crate::numeric::{bits_to_double, double_to_bits, join_halves, sign_extend, split_halves};

const KTAB_NIL: u32 = 0;
const KTAB_FALSE: u32 = 1;
const KTAB_TRUE: u32 = 2;
const KTAB_INT: u32 = 3;
const KTAB_INT64: u32 = 4;
const KTAB_STR: u32 = 5;

const KGC_CHILD: u32 = 0;
const KGC_TAB: u32 = 1;
const KGC_I64: u32 = 2;
const KGC_U64: u32 = 3;
const KGC_COMPLEX: u32 = 4;
const KGC_STR: u32 = 5;

fn string_tag(base: u32, bytes: &[u8]) -> u32 {
    debug_assert!(bytes.len() <= (u32::MAX - base) as usize);
    base + bytes.len() as u32
}

fn read_u64_halves(reader: &mut ByteReader<'_>) -> Result<u64> {
    let lo = reader.read_uleb128()?;
    let hi = reader.read_uleb128()?;
    Ok(join_halves(lo, hi))
}

fn write_u64_halves(writer: &mut ByteWriter, value: u64) {
    let (lo, hi) = split_halves(value);
    writer.write_uleb128(lo);
    writer.write_uleb128(hi);
}

/// A key or value inside a template table constant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstantTableValue {
    /// `nil`
    Nil,
    /// `false`
    False,
    /// `true`
    True,
    /// 32-bit integer
    Int32(i32),
    /// 64-bit integer, stored as two 32-bit halves
    Int64(i64),
    /// Raw string bytes
    Bytes(Vec<u8>),
}

impl ConstantTableValue {
    /// Read one table value
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let tag = reader.read_uleb128()?;
        Ok(match tag {
            KTAB_NIL => Self::Nil,
            KTAB_FALSE => Self::False,
            KTAB_TRUE => Self::True,
            KTAB_INT => Self::Int32(reader.read_uleb128()? as i32),
            KTAB_INT64 => Self::Int64(read_u64_halves(reader)? as i64),
            _ => {
                let len = (tag - KTAB_STR) as usize;
                Self::Bytes(reader.read_bytes(len)?.to_vec())
            }
        })
    }

    /// Write one table value
    pub fn write(&self, writer: &mut ByteWriter) {
        match self {
            Self::Nil => writer.write_uleb128(KTAB_NIL),
            Self::False => writer.write_uleb128(KTAB_FALSE),
            Self::True => writer.write_uleb128(KTAB_TRUE),
            Self::Int32(value) => {
                writer.write_uleb128(KTAB_INT);
                writer.write_uleb128(*value as u32);
            }
            Self::Int64(value) => {
                writer.write_uleb128(KTAB_INT64);
                write_u64_halves(writer, *value as u64);
            }
            Self::Bytes(bytes) => {
                writer.write_uleb128(string_tag(KTAB_STR, bytes));
                writer.write_bytes(bytes);
            }
        }
    }
}

/// A template table constant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantTable {
    /// Array part, index-addressed from 0
    pub array: Vec<ConstantTableValue>,
    /// Hash part as key/value pairs
    pub hash: Vec<(ConstantTableValue, ConstantTableValue)>,
}

impl ConstantTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether both parts are empty
    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.hash.is_empty()
    }

    /// Read a table: array count, hash count, array values, hash pairs
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let array_len = reader.read_uleb128()? as usize;
        let hash_len = reader.read_uleb128()? as usize;

        let mut array = Vec::with_capacity(array_len.min(reader.remaining()));
        for _ in 0..array_len {
            array.push(ConstantTableValue::read(reader)?);
        }

        let mut hash = Vec::with_capacity(hash_len.min(reader.remaining()));
        for _ in 0..hash_len {
            let key = ConstantTableValue::read(reader)?;
            let value = ConstantTableValue::read(reader)?;
            hash.push((key, value));
        }

        Ok(Self { array, hash })
    }

    /// Write a table
    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_uleb128(self.array.len() as u32);
        writer.write_uleb128(self.hash.len() as u32);
        for value in &self.array {
            value.write(writer);
        }
        for (key, value) in &self.hash {
            key.write(writer);
            value.write(writer);
        }
    }
}

/// Supplies child prototypes to child constants while a prototype is decoded
pub trait ChildResolver {
    /// Claim the most recently decoded unclaimed prototype
    ///
    /// Returns the index it was given in the declaring prototype's children.
    /// `offset` is the position of the child constant, for error reporting.
    fn claim(&mut self, offset: usize) -> Result<usize>;
}

/// A garbage-collected constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GcConstant {
    /// Reference to a child prototype, by index into the declaring
    /// prototype's `children`
    Child(usize),
    /// Template table
    Table(ConstantTable),
    /// Boxed signed 64-bit integer
    Int64(i64),
    /// Boxed unsigned 64-bit integer
    UInt64(u64),
    /// Complex number as (real, imaginary)
    Complex(
        #[serde(with = "double_bits")] f64,
        #[serde(with = "double_bits")] f64,
    ),
    /// Raw string bytes
    Bytes(Vec<u8>),
}

impl GcConstant {
    /// Read one GC constant, resolving child references through `children`
    pub fn read(reader: &mut ByteReader<'_>, children: &mut impl ChildResolver) -> Result<Self> {
        let offset = reader.offset();
        let tag = reader.read_uleb128()?;
        Ok(match tag {
            KGC_CHILD => Self::Child(children.claim(offset)?),
            KGC_TAB => Self::Table(ConstantTable::read(reader)?),
            KGC_I64 => Self::Int64(read_u64_halves(reader)? as i64),
            KGC_U64 => Self::UInt64(read_u64_halves(reader)?),
            KGC_COMPLEX => {
                let re = bits_to_double(read_u64_halves(reader)?);
                let im = bits_to_double(read_u64_halves(reader)?);
                Self::Complex(re, im)
            }
            _ => {
                let len = (tag - KGC_STR) as usize;
                Self::Bytes(reader.read_bytes(len)?.to_vec())
            }
        })
    }

    /// Write one GC constant
    ///
    /// A child reference writes only its tag; the child itself is emitted
    /// ahead of the declaring prototype.
    pub fn write(&self, writer: &mut ByteWriter) {
        match self {
            Self::Child(_) => writer.write_uleb128(KGC_CHILD),
            Self::Table(table) => {
                writer.write_uleb128(KGC_TAB);
                table.write(writer);
            }
            Self::Int64(value) => {
                writer.write_uleb128(KGC_I64);
                write_u64_halves(writer, *value as u64);
            }
            Self::UInt64(value) => {
                writer.write_uleb128(KGC_U64);
                write_u64_halves(writer, *value);
            }
            Self::Complex(re, im) => {
                writer.write_uleb128(KGC_COMPLEX);
                write_u64_halves(writer, double_to_bits(*re));
                write_u64_halves(writer, double_to_bits(*im));
            }
            Self::Bytes(bytes) => {
                writer.write_uleb128(string_tag(KGC_STR, bytes));
                writer.write_bytes(bytes);
            }
        }
    }

    /// Child index, if this is a child reference
    pub fn as_child(&self) -> Option<usize> {
        match self {
            Self::Child(idx) => Some(*idx),
            _ => None,
        }
    }

    /// String bytes, if this is a string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A numeric constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumericConstant {
    /// 32-bit integer
    Int32(i32),
    /// Double
    Float64(#[serde(with = "double_bits")] f64),
}

impl NumericConstant {
    /// Read one numeric constant
    ///
    /// The mark bit of the first ULEB128_33 value selects a double, whose
    /// high word follows as a plain ULEB128.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let (lo, is_double) = reader.read_uleb128_33()?;
        if is_double {
            let hi = reader.read_uleb128()?;
            Ok(Self::Float64(bits_to_double(join_halves(lo, hi))))
        } else {
            Ok(Self::Int32(sign_extend(lo.into(), 4) as i32))
        }
    }

    /// Write one numeric constant
    pub fn write(&self, writer: &mut ByteWriter) {
        match *self {
            Self::Int32(value) => writer.write_uleb128_33(value as u32, false),
            Self::Float64(value) => {
                let (lo, hi) = split_halves(double_to_bits(value));
                writer.write_uleb128_33(lo, true);
                writer.write_uleb128(hi);
            }
        }
    }

    /// Bit-exact comparison, treating NaNs with equal payloads as equal
    pub fn same_bits(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

/// Doubles serialize as their raw bits, so infinities and NaN payloads
/// survive formats without a spelling for them
mod double_bits {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, ResolveFault};

    /// Hands out child indices in claim order
    struct Counter(usize);

    impl ChildResolver for Counter {
        fn claim(&mut self, _offset: usize) -> Result<usize> {
            let idx = self.0;
            self.0 += 1;
            Ok(idx)
        }
    }

    struct NoChildren;

    impl ChildResolver for NoChildren {
        fn claim(&mut self, offset: usize) -> Result<usize> {
            Err(DecodeError::UnresolvedChild(ResolveFault::EmptyStack { offset }))
        }
    }

    fn gc_roundtrip(constant: &GcConstant) -> GcConstant {
        let mut w = ByteWriter::new();
        constant.write(&mut w);
        let mut r = ByteReader::new(w.as_bytes());
        let decoded = GcConstant::read(&mut r, &mut Counter(0)).unwrap();
        assert!(r.is_empty());
        decoded
    }

    fn numeric_roundtrip(constant: NumericConstant) -> NumericConstant {
        let mut w = ByteWriter::new();
        constant.write(&mut w);
        let mut r = ByteReader::new(w.as_bytes());
        let decoded = NumericConstant::read(&mut r).unwrap();
        assert!(r.is_empty());
        decoded
    }

    #[test]
    fn test_string_length_folded_into_tag() {
        let mut w = ByteWriter::new();
        GcConstant::Bytes(b"abc".to_vec()).write(&mut w);
        assert_eq!(w.as_bytes(), [8, b'a', b'b', b'c']);

        let mut w = ByteWriter::new();
        ConstantTableValue::Bytes(Vec::new()).write(&mut w);
        assert_eq!(w.as_bytes(), [5]);
    }

    #[test]
    fn test_table_value_wire_format() {
        let mut w = ByteWriter::new();
        ConstantTableValue::Int32(-1).write(&mut w);
        assert_eq!(w.as_bytes(), [3, 0xff, 0xff, 0xff, 0xff, 0x0f]);

        let mut r = ByteReader::new(w.as_bytes());
        assert_eq!(
            ConstantTableValue::read(&mut r).unwrap(),
            ConstantTableValue::Int32(-1)
        );
    }

    #[test]
    fn test_table_roundtrip() {
        let table = ConstantTable {
            array: vec![
                ConstantTableValue::Nil,
                ConstantTableValue::Int32(7),
                ConstantTableValue::Bytes(b"x".to_vec()),
            ],
            hash: vec![
                (
                    ConstantTableValue::Bytes(b"key".to_vec()),
                    ConstantTableValue::True,
                ),
                (
                    ConstantTableValue::Int64(i64::MIN),
                    ConstantTableValue::False,
                ),
            ],
        };
        let decoded = gc_roundtrip(&GcConstant::Table(table.clone()));
        assert_eq!(decoded, GcConstant::Table(table));
    }

    #[test]
    fn test_gc_scalars_roundtrip() {
        for constant in [
            GcConstant::Int64(-42),
            GcConstant::Int64(i64::MIN),
            GcConstant::UInt64(u64::MAX),
            GcConstant::Complex(1.5, -2.25),
            GcConstant::Bytes(vec![0xff, 0x00, b'z']),
        ] {
            assert_eq!(gc_roundtrip(&constant), constant);
        }
    }

    #[test]
    fn test_child_tag_goes_through_resolver() {
        let mut w = ByteWriter::new();
        GcConstant::Child(0).write(&mut w);
        GcConstant::Child(1).write(&mut w);
        assert_eq!(w.as_bytes(), [0, 0]);

        let mut r = ByteReader::new(w.as_bytes());
        let mut counter = Counter(0);
        assert_eq!(GcConstant::read(&mut r, &mut counter).unwrap(), GcConstant::Child(0));
        assert_eq!(GcConstant::read(&mut r, &mut counter).unwrap(), GcConstant::Child(1));

        let mut r = ByteReader::new(&[0x7f, 0x00]);
        r.read_u8().unwrap();
        assert_eq!(
            GcConstant::read(&mut r, &mut NoChildren),
            Err(DecodeError::UnresolvedChild(ResolveFault::EmptyStack {
                offset: 1
            }))
        );
    }

    #[test]
    fn test_numeric_integers_roundtrip() {
        for value in [i32::MIN, -1, 0, 1, i32::MAX] {
            let decoded = numeric_roundtrip(NumericConstant::Int32(value));
            assert_eq!(decoded, NumericConstant::Int32(value));
        }
    }

    #[test]
    fn test_numeric_doubles_roundtrip() {
        for value in [0.0, -0.0, 1.5, -1.5, f64::MIN, f64::MAX, f64::NAN] {
            let constant = NumericConstant::Float64(value);
            assert!(numeric_roundtrip(constant).same_bits(&constant));
        }
    }

    #[test]
    fn test_numeric_wire_format() {
        let mut w = ByteWriter::new();
        NumericConstant::Int32(1).write(&mut w);
        assert_eq!(w.as_bytes(), [0x02]);

        // 1.5 = 0x3ff8_0000_0000_0000: low word 0 with mark, then high word
        let mut w = ByteWriter::new();
        NumericConstant::Float64(1.5).write(&mut w);
        assert_eq!(w.as_bytes(), [0x01, 0x80, 0x80, 0xe0, 0xff, 0x03]);
    }

    #[test]
    fn test_non_finite_doubles_serialize() {
        let numerics = [
            NumericConstant::Float64(f64::INFINITY),
            NumericConstant::Float64(f64::NEG_INFINITY),
            NumericConstant::Float64(f64::NAN),
        ];
        let json = serde_json::to_string(&numerics).unwrap();
        assert!(!json.contains("null"));
        let back: Vec<NumericConstant> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), numerics.len());
        assert!(back.iter().zip(&numerics).all(|(a, b)| a.same_bits(b)));

        let complex = GcConstant::Complex(f64::INFINITY, -0.0);
        let json = serde_json::to_string(&complex).unwrap();
        match serde_json::from_str(&json).unwrap() {
            GcConstant::Complex(re, im) => {
                assert_eq!(re, f64::INFINITY);
                assert_eq!(im.to_bits(), (-0.0f64).to_bits());
            }
            other => panic!("expected a complex constant, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_string() {
        let mut r = ByteReader::new(&[5 + 4, b'a']);
        assert!(matches!(
            GcConstant::read(&mut r, &mut Counter(0)),
            Err(DecodeError::TruncatedInput { offset: 1, needed: 3 })
        ));
    }
}
