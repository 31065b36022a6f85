//! Typed CPU buffers with optional GPU mirrors (component D).
//!
//! A [`Buffer`] either owns its CPU bytes or aliases a named field of a
//! [`Block`], and lazily uploads to a GPU mirror the first time a consumer
//! asks for one — most buffers feeding a single draw node never need a
//! mirror materialized at all.

use crate::block::Block;
use crate::error::{EngineError, Result};
use crate::format::Format;
use crate::gpu::{BufferDesc, GpuCtx, GpuHandle};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::RwLock;

bitflags::bitflags! {
    pub struct BufferUsageFlags: u32 {
        const TRANSFER_DST = 0b0000_0001;
        const VERTEX       = 0b0000_0010;
        const INDEX        = 0b0000_0100;
        const UNIFORM      = 0b0000_1000;
        const STORAGE      = 0b0001_0000;
    }
}

enum Storage {
    Owned(Vec<u8>),
    View {
        block: Rc<RwLock<Block>>,
        field: String,
    },
}

/// A typed linear array, optionally backed by a GPU mirror.
pub struct Buffer {
    format: Format,
    count: u32,
    stride: u32,
    storage: Storage,
    usage: BufferUsageFlags,
    revision: Cell<u64>,
    mirror: Cell<Option<GpuHandle>>,
    uploaded_revision: Cell<u64>,
}

impl Buffer {
    fn stride_for(format: Format) -> u32 {
        format.info().bytes_per_element
    }

    /// Builds an owning buffer from inline CPU data; fails with
    /// [`EngineError::InvalidData`] if `bytes` doesn't match `count *
    /// format.bytes_per_element`.
    pub fn from_bytes(format: Format, count: u32, bytes: Vec<u8>, usage: BufferUsageFlags) -> Result<Buffer> {
        let stride = Self::stride_for(format);
        if bytes.len() != stride as usize * count as usize {
            return Err(EngineError::InvalidData);
        }
        Ok(Buffer {
            format,
            count,
            stride,
            storage: Storage::Owned(bytes),
            usage,
            revision: Cell::new(1),
            mirror: Cell::new(None),
            uploaded_revision: Cell::new(0),
        })
    }

    /// Loads CPU data from a file, validating that its length matches
    /// `count * format.bytes_per_element`.
    pub fn from_file(
        format: Format,
        count: u32,
        path: &std::path::Path,
        usage: BufferUsageFlags,
    ) -> Result<Buffer> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(format, count, bytes, usage)
    }

    /// Zero-initialized owning buffer.
    pub fn zeroed(format: Format, count: u32, usage: BufferUsageFlags) -> Buffer {
        let stride = Self::stride_for(format);
        Buffer {
            format,
            count,
            stride,
            storage: Storage::Owned(vec![0u8; stride as usize * count as usize]),
            usage,
            revision: Cell::new(1),
            mirror: Cell::new(None),
            uploaded_revision: Cell::new(0),
        }
    }

    /// A non-owning view into one field of `block`; inherits the field's
    /// format, count and stride.
    pub fn view(block: Rc<RwLock<Block>>, field_name: &str, usage: BufferUsageFlags) -> Result<Buffer> {
        let (format, count, stride) = {
            let b = block.read().map_err(|_| EngineError::Bug)?;
            let f = b.field(field_name).ok_or(EngineError::NotFound)?;
            (f.format, f.count, f.stride)
        };
        Ok(Buffer {
            format,
            count,
            stride,
            storage: Storage::View {
                block,
                field: field_name.to_string(),
            },
            usage,
            revision: Cell::new(1),
            mirror: Cell::new(None),
            uploaded_revision: Cell::new(0),
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.count as usize
    }

    pub fn usage(&self) -> BufferUsageFlags {
        self.usage
    }

    /// Reads the CPU bytes. Panics (via `RwLock` poisoning propagation) only
    /// if a writer panicked while holding a block's lock, matching the
    /// teacher's treatment of shared mutable scene state as unrecoverable.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match &self.storage {
            Storage::Owned(bytes) => f(bytes),
            Storage::View { block, field } => {
                let b = block.read().expect("block lock poisoned");
                f(b.field_bytes(field).expect("view field removed from block"))
            }
        }
    }

    /// Mutates the CPU bytes and bumps the revision counter so a pending
    /// GPU mirror is re-uploaded on next `sync`.
    pub fn with_bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        self.revision.set(self.revision.get() + 1);
        match &mut self.storage {
            Storage::Owned(bytes) => f(bytes),
            Storage::View { block, field } => {
                let mut b = block.write().expect("block lock poisoned");
                f(b.field_bytes_mut(field).expect("view field removed from block"))
            }
        }
    }

    /// Uploads to the GPU mirror if the usage flags call for one and the
    /// CPU data has changed since the last upload. Returns the mirror
    /// handle. A buffer never uploaded by any consumer never allocates one.
    pub fn sync(&self, gpu: &mut dyn GpuCtx) -> Result<GpuHandle> {
        let needs_mirror = self.mirror.get().is_none();
        let handle = if needs_mirror {
            let h = self.with_bytes(|bytes| {
                gpu.create_buffer(BufferDesc {
                    format: self.format,
                    count: self.count,
                    usage: self.usage,
                    initial_data: Some(bytes),
                })
            })?;
            self.mirror.set(Some(h));
            self.uploaded_revision.set(self.revision.get());
            h
        } else {
            self.mirror.get().unwrap()
        };

        if self.uploaded_revision.get() != self.revision.get() {
            self.with_bytes(|bytes| gpu.upload_buffer(handle, 0, bytes))?;
            self.uploaded_revision.set(self.revision.get());
        }
        Ok(handle)
    }

    pub fn gpu_mirror(&self) -> Option<GpuHandle> {
        self.mirror.get()
    }
}

/// Holds a sorted `(timestamp, element_offset)` table plus one packed
/// element buffer; evaluation selects the record with the largest
/// timestamp `<= t` (clamped to the first record if `t` precedes all of
/// them).
pub struct StreamedBuffer {
    timestamps: Vec<f64>,
    element_stride: u32,
    data: Vec<u8>,
    format: Format,
}

impl StreamedBuffer {
    pub fn new(format: Format, timestamps: Vec<f64>, data: Vec<u8>) -> Result<StreamedBuffer> {
        if timestamps.windows(2).any(|w| w[0] > w[1]) {
            return Err(EngineError::InvalidArg);
        }
        if timestamps.iter().any(|t| *t < 0.0) {
            return Err(EngineError::InvalidArg);
        }
        let stride = format.info().bytes_per_element;
        if data.len() != stride as usize * timestamps.len() {
            return Err(EngineError::InvalidData);
        }
        Ok(StreamedBuffer {
            timestamps,
            element_stride: stride,
            data,
            format,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Bytes of the record selected for time `t`.
    pub fn evaluate(&self, t: f64) -> &[u8] {
        let idx = match self
            .timestamps
            .binary_search_by(|probe| probe.partial_cmp(&t).unwrap())
        {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = idx * self.element_stride as usize;
        &self.data[start..start + self.element_stride as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockField;

    #[test]
    fn from_bytes_validates_length() {
        let r = Buffer::from_bytes(Format::R32_SFLOAT, 2, vec![0u8; 4], BufferUsageFlags::VERTEX);
        assert_eq!(r.err(), Some(EngineError::InvalidData));
    }

    #[test]
    fn zeroed_buffer_has_expected_byte_len() {
        let b = Buffer::zeroed(Format::R32G32B32_SFLOAT, 4, BufferUsageFlags::VERTEX);
        assert_eq!(b.byte_len(), 48);
    }

    #[test]
    fn view_inherits_field_layout() {
        let block = Rc::new(RwLock::new(Block::new(
            "B",
            vec![BlockField {
                name: "pos".into(),
                format: Format::R32G32B32_SFLOAT,
                count: 1,
                offset: 0,
                stride: 12,
            }],
            12,
        )));
        let buf = Buffer::view(block, "pos", BufferUsageFlags::UNIFORM).unwrap();
        assert_eq!(buf.count(), 1);
        assert_eq!(buf.stride(), 12);
    }

    #[test]
    fn view_missing_field_is_not_found() {
        let block = Rc::new(RwLock::new(Block::new("B", vec![], 0)));
        let r = Buffer::view(block, "missing", BufferUsageFlags::UNIFORM);
        assert_eq!(r.err(), Some(EngineError::NotFound));
    }

    #[test]
    fn streamed_buffer_rejects_decreasing_timestamps() {
        let r = StreamedBuffer::new(Format::R32_SFLOAT, vec![1.0, 0.5], vec![0u8; 8]);
        assert_eq!(r.err(), Some(EngineError::InvalidArg));
    }

    #[test]
    fn streamed_buffer_evaluate_picks_floor_record() {
        let values = [0.0f32, 1.0, 2.0];
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let sb = StreamedBuffer::new(Format::R32_SFLOAT, vec![0.0, 1.0, 2.0], data).unwrap();
        assert_eq!(sb.evaluate(0.5), &0.0f32.to_le_bytes());
        assert_eq!(sb.evaluate(1.9), &1.0f32.to_le_bytes());
        assert_eq!(sb.evaluate(5.0), &2.0f32.to_le_bytes());
    }

    #[test]
    fn streamed_buffer_evaluate_clamps_before_first_record() {
        let values = [1.0f32, 2.0];
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let sb = StreamedBuffer::new(Format::R32_SFLOAT, vec![1.0, 2.0], data).unwrap();
        assert_eq!(sb.evaluate(0.0), &1.0f32.to_le_bytes());
    }
}
