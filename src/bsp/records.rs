//! Fixed-size records for a handful of common lumps
//!
//! Other lumps can be read through the primitive [`Record`] impls or by
//! implementing [`Record`] for a caller-defined type.

use crate::bsp::record::{FieldReader, FieldWriter, Record};
use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Record for Vector {
    const SIZE: usize = 12;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_f32()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.write_f32(self.x);
        writer.write_f32(self.y);
        writer.write_f32(self.z);
    }
}

/// Planes lump entry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Plane {
    pub normal: Vector,
    pub dist: f32,
    /// Axis identifier
    pub kind: i32,
}

impl Record for Plane {
    const SIZE: usize = 20;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            normal: Vector::decode(reader)?,
            dist: reader.read_f32()?,
            kind: reader.read_i32()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        self.normal.encode(writer);
        writer.write_f32(self.dist);
        writer.write_i32(self.kind);
    }
}

/// Edges lump entry: two vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Edge {
    pub v: [u16; 2],
}

impl Record for Edge {
    const SIZE: usize = 4;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            v: [reader.read_u16()?, reader.read_u16()?],
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.write_u16(self.v[0]);
        writer.write_u16(self.v[1]);
    }
}

/// Brushes lump entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Brush {
    pub first_side: i32,
    pub num_sides: i32,
    pub contents: i32,
}

impl Record for Brush {
    const SIZE: usize = 12;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            first_side: reader.read_i32()?,
            num_sides: reader.read_i32()?,
            contents: reader.read_i32()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.write_i32(self.first_side);
        writer.write_i32(self.num_sides);
        writer.write_i32(self.contents);
    }
}

/// Brush sides lump entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BrushSide {
    pub plane: u16,
    pub tex_info: i16,
    pub disp_info: i16,
    pub bevel: i16,
}

impl Record for BrushSide {
    const SIZE: usize = 8;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            plane: reader.read_u16()?,
            tex_info: reader.read_i16()?,
            disp_info: reader.read_i16()?,
            bevel: reader.read_i16()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.write_u16(self.plane);
        writer.write_i16(self.tex_info);
        writer.write_i16(self.disp_info);
        writer.write_i16(self.bevel);
    }
}

/// Models lump entry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Model {
    pub mins: Vector,
    pub maxs: Vector,
    pub origin: Vector,
    pub head_node: i32,
    pub first_face: i32,
    pub num_faces: i32,
}

impl Record for Model {
    const SIZE: usize = 48;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            mins: Vector::decode(reader)?,
            maxs: Vector::decode(reader)?,
            origin: Vector::decode(reader)?,
            head_node: reader.read_i32()?,
            first_face: reader.read_i32()?,
            num_faces: reader.read_i32()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        self.mins.encode(writer);
        self.maxs.encode(writer);
        self.origin.encode(writer);
        writer.write_i32(self.head_node);
        writer.write_i32(self.first_face);
        writer.write_i32(self.num_faces);
    }
}

/// Byte offsets of one cluster's PVS and PAS rows in the visibility lump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClusterOffsets {
    pub pvs: i32,
    pub pas: i32,
}

impl Record for ClusterOffsets {
    const SIZE: usize = 8;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            pvs: reader.read_i32()?,
            pas: reader.read_i32()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.write_i32(self.pvs);
        writer.write_i32(self.pas);
    }
}

/// Cubemaps lump entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CubemapSample {
    pub origin: [i32; 3],
    /// Resolution, 0 for the default
    pub size: i32,
}

impl Record for CubemapSample {
    const SIZE: usize = 16;

    fn decode(reader: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            origin: [reader.read_i32()?, reader.read_i32()?, reader.read_i32()?],
            size: reader.read_i32()?,
        })
    }

    fn encode(&self, writer: &mut FieldWriter) {
        for value in self.origin {
            writer.write_i32(value);
        }
        writer.write_i32(self.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::format::ByteOrder;
    use crate::bsp::record::{decode_records, encode_records};

    fn encoded_len<T: Record>(record: &T) -> usize {
        let mut writer = FieldWriter::new(ByteOrder::Little);
        record.encode(&mut writer);
        writer.len()
    }

    #[test]
    fn test_sizes_match_encoding() {
        assert_eq!(encoded_len(&Vector::default()), Vector::SIZE);
        assert_eq!(encoded_len(&Plane::default()), Plane::SIZE);
        assert_eq!(encoded_len(&Edge::default()), Edge::SIZE);
        assert_eq!(encoded_len(&Brush::default()), Brush::SIZE);
        assert_eq!(encoded_len(&BrushSide::default()), BrushSide::SIZE);
        assert_eq!(encoded_len(&Model::default()), Model::SIZE);
        assert_eq!(encoded_len(&ClusterOffsets::default()), ClusterOffsets::SIZE);
        assert_eq!(encoded_len(&CubemapSample::default()), CubemapSample::SIZE);
    }

    #[test]
    fn test_brush_field_order() {
        let bytes = [1, 0, 0, 0, 6, 0, 0, 0, 1, 0, 0, 0];
        let brushes: Vec<Brush> = decode_records(&bytes, ByteOrder::Little).unwrap();
        assert_eq!(
            brushes,
            vec![Brush {
                first_side: 1,
                num_sides: 6,
                contents: 1
            }]
        );
    }

    #[test]
    fn test_big_endian_plane() {
        let plane = Plane {
            normal: Vector::new(0.0, 0.0, 1.0),
            dist: 64.0,
            kind: 2,
        };
        let bytes = encode_records(&[plane], ByteOrder::Big);
        assert_eq!(&bytes[8..12], &1.0f32.to_be_bytes());
        assert_eq!(&bytes[16..20], &[0, 0, 0, 2]);

        let decoded: Vec<Plane> = decode_records(&bytes, ByteOrder::Big).unwrap();
        assert_eq!(decoded, vec![plane]);
    }
}
