//! Chart protocol writer with a reusable buffer.

use super::metadata::{ChartMetadata, DimensionMetadata};
use bytes::{BufMut, Bytes, BytesMut};
use std::time::Duration;

/// Writer for the netdata external plugin chart protocol.
///
/// Lines are accumulated in a reusable buffer and handed to the shared
/// [`ProtocolWriter`](crate::ProtocolWriter) in one piece, so a declaration and
/// the update that follows it reach the output together.
///
/// Quoted fields never contain a single quote or a line break: such bytes
/// are dropped while writing.
pub struct ChartWriter {
    buffer: BytesMut,
    collection_duration: bool,
}

impl ChartWriter {
    /// A writer sized for a handful of charts
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            collection_duration: false,
        }
    }

    /// Append the microseconds elapsed since the previous update to BEGIN lines.
    pub fn with_collection_duration(mut self, enabled: bool) -> Self {
        self.collection_duration = enabled;
        self
    }

    /// Declare a chart: one CHART line followed by one DIMENSION line per dimension
    pub fn write_chart_definition(
        &mut self,
        metadata: &ChartMetadata,
        dimensions: &[DimensionMetadata],
    ) {
        self.buffer.put_slice(b"CHART ");
        self.put_chart_id(metadata);
        for field in [
            &metadata.name,
            &metadata.title,
            &metadata.units,
            &metadata.family,
            &metadata.category,
        ] {
            self.buffer.put_u8(b' ');
            self.put_quoted(field);
        }
        self.buffer.put_u8(b'\n');

        for dim in dimensions {
            self.write_dimension_definition(dim);
        }
    }

    fn write_dimension_definition(&mut self, dim: &DimensionMetadata) {
        self.buffer.put_slice(b"DIMENSION ");
        self.put_quoted(&dim.id);
        self.buffer.put_u8(b' ');
        self.put_quoted(&dim.name);
        self.buffer.put_u8(b' ');
        self.buffer.put_slice(dim.algorithm.as_str().as_bytes());
        self.buffer.put_u8(b'\n');
    }

    /// Open the update block of a chart
    ///
    /// When collection durations are enabled and `elapsed` is non-zero, the
    /// microseconds since the previous update are appended so netdata can
    /// interpolate.
    pub fn begin_chart(&mut self, metadata: &ChartMetadata, elapsed: Duration) {
        self.buffer.put_slice(b"BEGIN ");
        self.put_chart_id(metadata);
        if self.collection_duration && !elapsed.is_zero() {
            self.buffer.put_u8(b' ');
            self.write_u64(elapsed.as_micros() as u64);
        }
        self.buffer.put_u8(b'\n');
    }

    /// One `SET` line. Surrounding whitespace of the value is trimmed.
    pub fn write_dimension(&mut self, dimension_id: &str, value: &str) {
        self.buffer.put_slice(b"SET ");
        self.put_quoted(dimension_id);
        self.buffer.put_slice(b" = ");
        self.buffer.put_slice(value.trim().as_bytes());
        self.buffer.put_u8(b'\n');
    }

    /// Close the update block
    pub fn end_chart(&mut self) {
        self.buffer.put_slice(b"END\n");
    }

    fn put_chart_id(&mut self, metadata: &ChartMetadata) {
        self.put_bare(&metadata.chart_type);
        self.buffer.put_u8(b'.');
        self.put_bare(&metadata.id);
    }

    fn put_bare(&mut self, field: &str) {
        for byte in field.bytes() {
            if !matches!(byte, b' ' | b'\'' | b'\n' | b'\r') {
                self.buffer.put_u8(byte);
            }
        }
    }

    fn put_quoted(&mut self, field: &str) {
        self.buffer.put_u8(b'\'');
        for byte in field.bytes() {
            if !matches!(byte, b'\'' | b'\n' | b'\r') {
                self.buffer.put_u8(byte);
            }
        }
        self.buffer.put_u8(b'\'');
    }

    #[inline]
    fn write_u64(&mut self, value: u64) {
        let mut buf = itoa::Buffer::new();
        let s = buf.format(value);
        self.buffer.put_slice(s.as_bytes());
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Lines written since the last clear
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Take the buffered lines, leaving the writer empty
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}

impl Default for ChartWriter {
    fn default() -> Self {
        Self::new()
    }
}
