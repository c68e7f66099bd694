//! The fixed 0x800-byte cache file header in its standard and demo shapes.
//!
//! A header is kept as its raw bytes and every field is read and written
//! through little-endian accessors at the offsets of its [`HeaderShape`].
//! Bytes no field covers are carried through untouched.

use crate::engine::Engine;
use crate::error::MapError;
use cairn_common::bytes;

/// Size in bytes of a cache header in either shape.
pub const HEADER_SIZE: usize = 0x800;

const NAME_WIDTH: usize = 32;
const BUILD_WIDTH: usize = 32;

/// The two header layouts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HeaderShape {
    /// Used by every engine, and by every compressed cache.
    Standard,
    /// Used only by uncompressed legacy demo caches.
    Demo,
}

struct FieldLayout {
    head: usize,
    head_literal: u32,
    engine: usize,
    decompressed_size: usize,
    tag_data_offset: usize,
    tag_data_size: usize,
    name: usize,
    build: usize,
    map_type: usize,
    crc32: usize,
    foot: usize,
    foot_literal: u32,
}

const STANDARD: FieldLayout = FieldLayout {
    head: 0x0,
    head_literal: 0x6865_6164, // 'head'
    engine: 0x4,
    decompressed_size: 0x8,
    tag_data_offset: 0x10,
    tag_data_size: 0x14,
    name: 0x20,
    build: 0x40,
    map_type: 0x60,
    crc32: 0x64,
    foot: 0x7FC,
    foot_literal: 0x666F_6F74, // 'foot'
};

const DEMO: FieldLayout = FieldLayout {
    head: 0x2C0,
    head_literal: 0x4568_6564, // 'Ehed'
    engine: 0x588,
    decompressed_size: 0x5E8,
    tag_data_offset: 0x5EC,
    tag_data_size: 0x2C4,
    name: 0x58C,
    build: 0x2C8,
    map_type: 0x2,
    crc32: 0x5B0,
    foot: 0x7FC,
    foot_literal: 0x4766_6F74, // 'Gfot'
};

impl HeaderShape {
    fn layout(self) -> &'static FieldLayout {
        match self {
            HeaderShape::Standard => &STANDARD,
            HeaderShape::Demo => &DEMO,
        }
    }

    fn matches(self, data: &[u8]) -> bool {
        let layout = self.layout();
        bytes::read_u32(data, layout.head) == Some(layout.head_literal)
            && bytes::read_u32(data, layout.foot) == Some(layout.foot_literal)
    }
}

/// A cache file header.
#[derive(Clone, PartialEq, Eq)]
pub struct CacheHeader {
    shape: HeaderShape,
    data: Box<[u8; HEADER_SIZE]>,
}

impl CacheHeader {
    /// Creates a zeroed header of the given shape with its literals set.
    pub fn new(shape: HeaderShape) -> Self {
        let mut header = Self {
            shape,
            data: Box::new([0; HEADER_SIZE]),
        };
        let layout = shape.layout();
        header.put_u32(layout.head, layout.head_literal);
        header.put_u32(layout.foot, layout.foot_literal);
        header
    }

    /// Creates a zeroed header in the shape `engine` uses when uncompressed.
    pub fn for_engine(engine: Engine) -> Self {
        let shape = if engine.uses_demo_header() {
            HeaderShape::Demo
        } else {
            HeaderShape::Standard
        };
        let mut header = Self::new(shape);
        header.set_engine_raw(engine.raw());
        header
    }

    /// Parses the first [`HEADER_SIZE`] bytes of `data`.
    ///
    /// The shape is detected from the literals. Fails with
    /// [`MapError::InvalidHeader`] if `data` is too short or neither shape's
    /// literals are present.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MapError> {
        let Some(raw) = data.get(..HEADER_SIZE) else {
            return Err(MapError::invalid_header(format!(
                "need {HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        };
        let shape = if HeaderShape::Standard.matches(raw) {
            HeaderShape::Standard
        } else if HeaderShape::Demo.matches(raw) {
            HeaderShape::Demo
        } else {
            return Err(MapError::invalid_header("head/foot literals not found"));
        };
        let mut data = Box::new([0; HEADER_SIZE]);
        data.copy_from_slice(raw);
        Ok(Self { shape, data })
    }

    /// The raw header bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    /// The shape of this header.
    pub fn shape(&self) -> HeaderShape {
        self.shape
    }

    /// Returns `true` if the literals match the shape, the engine enumeration
    /// is known, and a nonzero decompressed size covers at least the header.
    pub fn valid(&self) -> bool {
        let size = self.decompressed_size();
        self.shape.matches(&self.data[..])
            && Engine::identify(self.engine_raw()).is_some()
            && (size == 0 || size as usize >= HEADER_SIZE)
    }

    /// The raw engine enumeration.
    pub fn engine_raw(&self) -> u32 {
        self.get_u32(self.layout().engine)
    }

    /// Sets the raw engine enumeration.
    pub fn set_engine_raw(&mut self, raw: u32) {
        self.put_u32(self.layout().engine, raw);
    }

    /// The decompressed size; zero for an uncompressed cache.
    pub fn decompressed_size(&self) -> u32 {
        self.get_u32(self.layout().decompressed_size)
    }

    /// Sets the decompressed size.
    pub fn set_decompressed_size(&mut self, size: u32) {
        self.put_u32(self.layout().decompressed_size, size);
    }

    /// File offset of the tag data.
    pub fn tag_data_offset(&self) -> u32 {
        self.get_u32(self.layout().tag_data_offset)
    }

    /// Sets the file offset of the tag data.
    pub fn set_tag_data_offset(&mut self, offset: u32) {
        self.put_u32(self.layout().tag_data_offset, offset);
    }

    /// Size in bytes of the tag data.
    pub fn tag_data_size(&self) -> u32 {
        self.get_u32(self.layout().tag_data_size)
    }

    /// Sets the size of the tag data.
    pub fn set_tag_data_size(&mut self, size: u32) {
        self.put_u32(self.layout().tag_data_size, size);
    }

    /// The map name.
    pub fn name(&self) -> String {
        bytes::read_fixed_str(&self.data[..], self.layout().name, NAME_WIDTH).unwrap_or_default()
    }

    /// Sets the map name, truncated to 31 bytes.
    pub fn set_name(&mut self, name: &str) {
        let offset = self.layout().name;
        bytes::write_fixed_str(&mut self.data[..], offset, NAME_WIDTH, name);
    }

    /// The build string.
    pub fn build(&self) -> String {
        bytes::read_fixed_str(&self.data[..], self.layout().build, BUILD_WIDTH).unwrap_or_default()
    }

    /// Sets the build string, truncated to 31 bytes.
    pub fn set_build(&mut self, build: &str) {
        let offset = self.layout().build;
        bytes::write_fixed_str(&mut self.data[..], offset, BUILD_WIDTH, build);
    }

    /// The raw map type field.
    pub fn map_type_raw(&self) -> u16 {
        bytes::read_u16(&self.data[..], self.layout().map_type).unwrap_or_default()
    }

    /// Sets the raw map type field.
    pub fn set_map_type_raw(&mut self, map_type: u16) {
        let offset = self.layout().map_type;
        bytes::write_u16(&mut self.data[..], offset, map_type);
    }

    /// The CRC32 of the cache body.
    pub fn crc32(&self) -> u32 {
        self.get_u32(self.layout().crc32)
    }

    /// Sets the CRC32 of the cache body.
    pub fn set_crc32(&mut self, crc: u32) {
        self.put_u32(self.layout().crc32, crc);
    }

    /// Returns a header in `shape` carrying every field of `self`.
    ///
    /// Bytes that no field covers are zero in the result.
    pub fn reshaped(&self, shape: HeaderShape) -> CacheHeader {
        if shape == self.shape {
            return self.clone();
        }
        let mut out = CacheHeader::new(shape);
        out.set_engine_raw(self.engine_raw());
        out.set_decompressed_size(self.decompressed_size());
        out.set_tag_data_offset(self.tag_data_offset());
        out.set_tag_data_size(self.tag_data_size());
        out.set_name(&self.name());
        out.set_build(&self.build());
        out.set_map_type_raw(self.map_type_raw());
        out.set_crc32(self.crc32());
        out
    }

    fn layout(&self) -> &'static FieldLayout {
        self.shape.layout()
    }

    // Field offsets are constants well inside HEADER_SIZE.
    fn get_u32(&self, offset: usize) -> u32 {
        bytes::read_u32(&self.data[..], offset).unwrap_or_default()
    }

    fn put_u32(&mut self, offset: usize, value: u32) {
        bytes::write_u32(&mut self.data[..], offset, value);
    }
}

impl std::fmt::Debug for CacheHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHeader")
            .field("shape", &self.shape)
            .field("engine", &format_args!("0x{:08X}", self.engine_raw()))
            .field("decompressed_size", &self.decompressed_size())
            .field("tag_data_offset", &self.tag_data_offset())
            .field("tag_data_size", &self.tag_data_size())
            .field("name", &self.name())
            .field("build", &self.build())
            .field("map_type", &self.map_type_raw())
            .field("crc32", &format_args!("0x{:08X}", self.crc32()))
            .finish()
    }
}
