//! Block model: named, std140/std430-like struct descriptions (component D).

use crate::format::Format;

/// One field of a [`Block`]: a named, counted, strided run of `format`
/// elements at a fixed byte `offset`.
#[derive(Clone, Debug)]
pub struct BlockField {
    pub name: String,
    pub format: Format,
    pub count: u32,
    pub offset: u32,
    pub stride: u32,
}

/// A named struct description with contiguous CPU-side backing memory.
/// [`crate::buffer::Buffer`] nodes may reference a field by name to create a
/// non-owning view that inherits the field's stride and offset.
pub struct Block {
    name: String,
    fields: Vec<BlockField>,
    data: Vec<u8>,
}

impl Block {
    /// Builds a block from an ordered field list and the total byte size of
    /// its backing memory (typically the last field's `offset + stride *
    /// count`, but callers may pad for std140/std430 alignment).
    pub fn new(name: impl Into<String>, fields: Vec<BlockField>, byte_size: usize) -> Block {
        Block {
            name: name.into(),
            fields,
            data: vec![0u8; byte_size],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[BlockField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&BlockField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Byte slice for a single named field, or `None` if no such field
    /// exists.
    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        let f = self.field(name)?;
        let size = (f.stride * f.count) as usize;
        self.data.get(f.offset as usize..f.offset as usize + size)
    }

    pub fn field_bytes_mut(&mut self, name: &str) -> Option<&mut [u8]> {
        let f = self.field(name)?.clone();
        let size = (f.stride * f.count) as usize;
        self.data
            .get_mut(f.offset as usize..f.offset as usize + size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new(
            "Transform",
            vec![
                BlockField {
                    name: "position".into(),
                    format: Format::R32G32B32_SFLOAT,
                    count: 1,
                    offset: 0,
                    stride: 12,
                },
                BlockField {
                    name: "scale".into(),
                    format: Format::R32_SFLOAT,
                    count: 1,
                    offset: 16,
                    stride: 4,
                },
            ],
            20,
        )
    }

    #[test]
    fn field_lookup_by_name() {
        let b = sample_block();
        assert_eq!(b.field("scale").unwrap().offset, 16);
        assert!(b.field("missing").is_none());
    }

    #[test]
    fn field_bytes_slices_within_bounds() {
        let b = sample_block();
        assert_eq!(b.field_bytes("position").unwrap().len(), 12);
        assert_eq!(b.field_bytes("scale").unwrap().len(), 4);
    }

    #[test]
    fn field_bytes_mut_is_writable() {
        let mut b = sample_block();
        b.field_bytes_mut("scale").unwrap().copy_from_slice(&2.0f32.to_le_bytes());
        assert_eq!(b.field_bytes("scale").unwrap(), &2.0f32.to_le_bytes());
    }
}
