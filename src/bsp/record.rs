//! Fixed-size record codec
//!
//! Lump payloads are decoded field by field with bounds checks, in the byte
//! order the directory ident announces. Nothing is reinterpreted in place.

use crate::bsp::format::ByteOrder;
use crate::error::{BspError, Result};

/// A fixed-size element stored in a lump
pub trait Record: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self>;

    fn encode(&self, writer: &mut FieldWriter);
}

/// Bounds-checked field reader over a byte slice
#[derive(Clone)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

macro_rules! read_fields {
    ($($name:ident => $ty:ty,)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                let bytes = self.read_array()?;
                Ok(match self.order {
                    ByteOrder::Little => <$ty>::from_le_bytes(bytes),
                    ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                })
            }
        )*
    };
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, pos: 0, order }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Read `N` raw bytes
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(BspError::truncated(self.pos, N, self.remaining()));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    read_fields! {
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_u64 => u64,
        read_i64 => i64,
        read_f32 => f32,
    }
}

/// Field writer that appends to an owned buffer
#[derive(Debug, Clone)]
pub struct FieldWriter {
    buf: Vec<u8>,
    order: ByteOrder,
}

macro_rules! write_fields {
    ($($name:ident => $ty:ty,)*) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                match self.order {
                    ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
                    ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
                }
            }
        )*
    };
}

impl FieldWriter {
    pub fn new(order: ByteOrder) -> Self {
        Self::with_capacity(order, 0)
    }

    pub fn with_capacity(order: ByteOrder, capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            order,
        }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    write_fields! {
        write_u16 => u16,
        write_i16 => i16,
        write_u32 => u32,
        write_i32 => i32,
        write_u64 => u64,
        write_i64 => i64,
        write_f32 => f32,
    }
}

macro_rules! primitive_records {
    ($($ty:ty => $read:ident, $write:ident;)*) => {
        $(
            impl Record for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
                    reader.$read()
                }

                fn encode(&self, writer: &mut FieldWriter) {
                    writer.$write(*self)
                }
            }
        )*
    };
}

primitive_records! {
    u8 => read_u8, write_u8;
    i8 => read_i8, write_i8;
    u16 => read_u16, write_u16;
    i16 => read_i16, write_i16;
    u32 => read_u32, write_u32;
    i32 => read_i32, write_i32;
    u64 => read_u64, write_u64;
    i64 => read_i64, write_i64;
    f32 => read_f32, write_f32;
}

/// Decode as many whole records as `bytes` holds; a trailing partial record is ignored
pub fn decode_records<T: Record>(bytes: &[u8], order: ByteOrder) -> Result<Vec<T>> {
    let count = bytes.len() / T::SIZE;
    let mut reader = FieldReader::new(&bytes[..count * T::SIZE], order);
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(T::decode(&mut reader)?);
    }
    Ok(records)
}

/// Encode records back to back
pub fn encode_records<T: Record>(records: &[T], order: ByteOrder) -> Vec<u8> {
    let mut writer = FieldWriter::with_capacity(order, records.len() * T::SIZE);
    for record in records {
        record.encode(&mut writer);
    }
    writer.into_inner()
}
