//! Vertex stream layouts and raw vertex record access.
//!
//! A vertex record is a fixed-size byte blob. Its structure is described by a
//! [`VertexLayout`], an ordered list of typed [`VertexStream`]s. Every stream's
//! components are stored contiguously, streams follow each other with no padding.

use std::fmt;
use std::str::FromStr;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// The semantic meaning of a vertex stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StreamKind {
    Position,
    Color,
    Normal,
    Tangent,
    Bitangent,
    DiffuseTextureCoordinate,
    LightmapTextureCoordinate,
    AmbientOcclusionTextureCoordinate,
    DecalTextureCoordinate,
    Bones,
    Weights,
    /// Any application-defined stream
    Custom(String),
}

impl StreamKind {
    const BUILT_IN: [StreamKind; 11] = [
        StreamKind::Position,
        StreamKind::Color,
        StreamKind::Normal,
        StreamKind::Tangent,
        StreamKind::Bitangent,
        StreamKind::DiffuseTextureCoordinate,
        StreamKind::LightmapTextureCoordinate,
        StreamKind::AmbientOcclusionTextureCoordinate,
        StreamKind::DecalTextureCoordinate,
        StreamKind::Bones,
        StreamKind::Weights,
    ];

    /// Returns the stream's name.
    pub fn name(&self) -> &str {
        match self {
            StreamKind::Position => "Position",
            StreamKind::Color => "Color",
            StreamKind::Normal => "Normal",
            StreamKind::Tangent => "Tangent",
            StreamKind::Bitangent => "Bitangent",
            StreamKind::DiffuseTextureCoordinate => "DiffuseTextureCoordinate",
            StreamKind::LightmapTextureCoordinate => "LightmapTextureCoordinate",
            StreamKind::AmbientOcclusionTextureCoordinate => "AmbientOcclusionTextureCoordinate",
            StreamKind::DecalTextureCoordinate => "DecalTextureCoordinate",
            StreamKind::Bones => "Bones",
            StreamKind::Weights => "Weights",
            StreamKind::Custom(name) => name,
        }
    }
}

impl FromStr for StreamKind {
    type Err = std::convert::Infallible;

    /// Stream names match case-insensitively; the old `TC*` names still resolve.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let legacy = match name {
            "TCDiffuse" => Some(StreamKind::DiffuseTextureCoordinate),
            "TCLightmap" => Some(StreamKind::LightmapTextureCoordinate),
            "TCAmbientOcclusion" => Some(StreamKind::AmbientOcclusionTextureCoordinate),
            "TCDecal" => Some(StreamKind::DecalTextureCoordinate),
            _ => None,
        };
        if let Some(kind) = legacy {
            return Ok(kind);
        }

        Ok(Self::BUILT_IN
            .iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| StreamKind::Custom(name.to_string())))
    }
}

impl TryFrom<String> for StreamKind {
    type Error = std::convert::Infallible;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<StreamKind> for String {
    fn from(kind: StreamKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Component storage type of a vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Float,
    UInt8,
}

impl DataType {
    /// Size in bytes of one component.
    pub fn size(self) -> usize {
        match self {
            DataType::Float => 4,
            DataType::UInt8 => 1,
        }
    }
}

/// One named, typed field of a vertex record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexStream {
    kind: StreamKind,
    component_count: u8,
    #[serde(default)]
    data_type: DataType,
}

impl VertexStream {
    /// Creates a float stream. The component count is clamped to 1..=4.
    pub fn new(kind: StreamKind, component_count: u8) -> Self {
        Self::with_data_type(kind, component_count, DataType::Float)
    }

    /// Creates a stream with an explicit component type.
    pub fn with_data_type(kind: StreamKind, component_count: u8, data_type: DataType) -> Self {
        Self {
            kind,
            component_count: component_count.clamp(1, 4),
            data_type,
        }
    }

    #[inline]
    pub fn kind(&self) -> &StreamKind {
        &self.kind
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        usize::from(self.component_count)
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Size in bytes of this stream within a vertex record.
    #[inline]
    pub fn size(&self) -> usize {
        self.component_count() * self.data_type.size()
    }
}

/// Ordered list of vertex streams describing a vertex record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexLayout {
    streams: Vec<VertexStream>,
}

impl VertexLayout {
    pub fn new(streams: Vec<VertexStream>) -> Self {
        Self { streams }
    }

    /// Layout holding only a 3 component float position.
    pub fn position_only() -> Self {
        Self::new(vec![VertexStream::new(StreamKind::Position, 3)])
    }

    #[inline]
    pub fn streams(&self) -> &[VertexStream] {
        &self.streams
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Size in bytes of one vertex record.
    pub fn vertex_size(&self) -> usize {
        self.streams.iter().map(VertexStream::size).sum()
    }

    /// Byte offset of the first stream of the given kind.
    pub fn offset_of(&self, kind: &StreamKind) -> Option<usize> {
        let mut offset = 0;
        for stream in &self.streams {
            if stream.kind() == kind {
                return Some(offset);
            }
            offset += stream.size();
        }
        None
    }

    /// Byte offset of the position stream, if it holds 3 floats.
    pub fn position_offset(&self) -> Option<usize> {
        let offset = self.offset_of(&StreamKind::Position)?;
        let stream = self.streams.iter().find(|s| s.kind() == &StreamKind::Position)?;

        (stream.component_count() == 3 && stream.data_type() == DataType::Float).then_some(offset)
    }

    /// Reads the position out of a vertex record laid out with this layout.
    ///
    /// Returns `None` if the layout has no valid position stream or the
    /// record is too short.
    pub fn read_position(&self, vertex: &[u8]) -> Option<Point3<f32>> {
        let offset = self.position_offset()?;
        (vertex.len() >= offset + 12).then(|| read_point(vertex, offset))
    }

    /// Interpolates every stream of two vertex records into `out`.
    ///
    /// Float components are linearly interpolated; byte components are
    /// interpolated as floats and truncated.
    pub fn interpolate(&self, v0: &[u8], v1: &[u8], out: &mut [u8], t: f32) {
        let mut offset = 0;

        for stream in &self.streams {
            let size = stream.data_type().size();

            for _ in 0..stream.component_count() {
                let range = offset..offset + size;
                match stream.data_type() {
                    DataType::Float => {
                        let a: f32 = bytemuck::pod_read_unaligned(&v0[range.clone()]);
                        let b: f32 = bytemuck::pod_read_unaligned(&v1[range.clone()]);
                        out[range].copy_from_slice(bytemuck::bytes_of(&lerp(a, b, t)));
                    }
                    DataType::UInt8 => {
                        let value = lerp(f32::from(v0[offset]), f32::from(v1[offset]), t);
                        out[offset] = value as u8;
                    }
                }
                offset += size;
            }
        }
    }
}

impl From<Vec<VertexStream>> for VertexLayout {
    fn from(streams: Vec<VertexStream>) -> Self {
        Self::new(streams)
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Reads three floats at `offset` as a point.
pub(crate) fn read_point(vertex: &[u8], offset: usize) -> Point3<f32> {
    let coords: [f32; 3] = bytemuck::pod_read_unaligned(&vertex[offset..offset + 12]);
    Point3::from(coords)
}

/// Writes a point as three floats at `offset`.
pub(crate) fn write_point(vertex: &mut [u8], offset: usize, point: Point3<f32>) {
    let coords: [f32; 3] = point.coords.into();
    vertex[offset..offset + 12].copy_from_slice(bytemuck::bytes_of(&coords));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn textured_layout() -> VertexLayout {
        VertexLayout::new(vec![
            VertexStream::new(StreamKind::Position, 3),
            VertexStream::with_data_type(StreamKind::Color, 4, DataType::UInt8),
            VertexStream::new(StreamKind::DiffuseTextureCoordinate, 2),
        ])
    }

    fn vertex(position: [f32; 3], color: [u8; 4], uv: [f32; 2]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(bytemuck::bytes_of(&position));
        bytes.extend_from_slice(&color);
        bytes.extend_from_slice(bytemuck::bytes_of(&uv));
        bytes
    }

    #[test]
    fn stream_names_parse_case_insensitively() {
        assert_eq!("position".parse::<StreamKind>().unwrap(), StreamKind::Position);
        assert_eq!("NORMAL".parse::<StreamKind>().unwrap(), StreamKind::Normal);
        assert_eq!(
            "TCLightmap".parse::<StreamKind>().unwrap(),
            StreamKind::LightmapTextureCoordinate
        );
        assert_eq!(
            "Wind".parse::<StreamKind>().unwrap(),
            StreamKind::Custom("Wind".to_string())
        );
    }

    #[test]
    fn component_count_is_clamped() {
        assert_eq!(VertexStream::new(StreamKind::Normal, 0).component_count(), 1);
        assert_eq!(VertexStream::new(StreamKind::Normal, 9).component_count(), 4);
    }

    #[test]
    fn layout_offsets_and_size() {
        let layout = textured_layout();
        assert_eq!(layout.vertex_size(), 12 + 4 + 8);
        assert_eq!(layout.position_offset(), Some(0));
        assert_eq!(layout.offset_of(&StreamKind::DiffuseTextureCoordinate), Some(16));
        assert_eq!(layout.offset_of(&StreamKind::Normal), None);

        let no_position = VertexLayout::new(vec![VertexStream::new(StreamKind::Position, 2)]);
        assert_eq!(no_position.position_offset(), None);
    }

    #[test]
    fn interpolate_every_stream() {
        let layout = textured_layout();
        let a = vertex([0.0, 0.0, 0.0], [0, 100, 200, 255], [0.0, 1.0]);
        let b = vertex([4.0, 2.0, -2.0], [100, 100, 0, 255], [1.0, 0.0]);
        let mut out = vec![0u8; layout.vertex_size()];

        layout.interpolate(&a, &b, &mut out, 0.25);

        let position = layout.read_position(&out).unwrap();
        assert_relative_eq!(position.x, 1.0);
        assert_relative_eq!(position.y, 0.5);
        assert_relative_eq!(position.z, -0.5);
        assert_eq!(&out[12..16], &[25, 100, 150, 255]);
        let uv: [f32; 2] = bytemuck::pod_read_unaligned(&out[16..24]);
        assert_relative_eq!(uv[0], 0.25);
        assert_relative_eq!(uv[1], 0.75);
    }

    #[test]
    fn layout_serializes_as_stream_list() {
        let layout = textured_layout();
        let text = ron::to_string(&layout).unwrap();
        assert!(text.contains("\"Position\""));

        let parsed: VertexLayout = ron::from_str(&text).unwrap();
        assert_eq!(parsed, layout);
    }
}
