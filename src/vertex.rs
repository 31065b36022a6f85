//! Vertex and index buffer layout description.
//!
//! Rather than deriving a layout from a Rust type via `#[repr(C)]` plus a
//! derive macro, this engine's geometry is built at runtime from
//! declarative node parameters, so layouts are plain, inspectable values
//! instead of associated consts.

use crate::format::Format;

/// Index element width.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub fn byte_size(self) -> u32 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// One named attribute within a [`VertexLayout`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub name: String,
    pub format: Format,
    pub offset: u32,
}

/// The layout of interleaved attributes inside a single vertex buffer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VertexLayout {
    pub attributes: Vec<VertexAttribute>,
    pub stride: u32,
}

impl VertexLayout {
    /// Builds a tightly packed layout from `(name, format)` pairs, in
    /// declaration order.
    pub fn packed(attrs: &[(&str, Format)]) -> VertexLayout {
        let mut offset = 0u32;
        let mut attributes = Vec::with_capacity(attrs.len());
        for (name, format) in attrs {
            attributes.push(VertexAttribute {
                name: (*name).to_string(),
                format: *format,
                offset,
            });
            offset += format.info().bytes_per_element;
        }
        VertexLayout {
            attributes,
            stride: offset,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_layout_accumulates_offsets() {
        let layout = VertexLayout::packed(&[
            ("position", Format::R32G32B32_SFLOAT),
            ("uv", Format::R32G32_SFLOAT),
        ]);
        assert_eq!(layout.attribute("position").unwrap().offset, 0);
        assert_eq!(layout.attribute("uv").unwrap().offset, 12);
        assert_eq!(layout.stride, 20);
    }

    #[test]
    fn index_format_byte_sizes() {
        assert_eq!(IndexFormat::U16.byte_size(), 2);
        assert_eq!(IndexFormat::U32.byte_size(), 4);
    }
}
