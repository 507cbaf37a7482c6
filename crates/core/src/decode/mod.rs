//! Reader for ILDA image data transfer files.
//!
//! A file is a run of blocks, each a 32 byte header followed by `point_count`
//! fixed-size records. All multi-byte fields are big-endian. The decoder
//! hands back every block as a [`Frame`] and, while it reads, folds each
//! coordinate into one [`GlobalExtent`] for the whole file.

use std::io::{self, Read};

use crate::{
    show::{Coordinate, Frame, FrameHeader, GlobalExtent, RecordFormat, Show},
    IldaError, Result,
};

/// Marker every header block starts with.
pub const SIGNATURE: &[u8; 4] = b"ILDA";

/// Size of a header block in bytes.
pub const HEADER_SIZE: usize = 32;

/// Maps a signed 16-bit axis value onto the 12-bit working range.
///
/// The value is shifted so that zero lands on the midpoint of 0..=65535, then
/// the low four bits are dropped.
pub fn compress_axis(raw: i16) -> u16 {
    ((i32::from(raw) + (1 << 15)).rem_euclid(1 << 16) >> 4) as u16
}

/// Decodes a whole stream into a show plus the extent of every coordinate in
/// it. Fails without returning a partial show.
pub fn decode<R: Read>(reader: R) -> Result<(Show, GlobalExtent)> {
    let mut decoder = Decoder::new(reader);
    let mut show = Show::default();

    while let Some(frame) = decoder.next_frame()? {
        show.frames.push(frame);
    }

    Ok((show, decoder.extent))
}

/// Parsed header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub format: RecordFormat,
    pub name: [u8; 8],
    pub company: [u8; 8],
    pub point_count: u16,
    pub frame_index: u16,
    pub frame_total: u16,
    pub scanner_head: u8,
}

impl HeaderRecord {
    /// Parses a header that began at byte `offset` of the stream.
    pub fn parse(offset: u64, bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let mut found = [0u8; 4];
        found.copy_from_slice(&bytes[0..4]);
        if &found != SIGNATURE {
            return Err(IldaError::BadSignature { offset, found });
        }

        // bytes 4..7 are reserved
        let format = RecordFormat::from_u8(bytes[7]);

        let mut name = [0u8; 8];
        name.copy_from_slice(&bytes[8..16]);
        let mut company = [0u8; 8];
        company.copy_from_slice(&bytes[16..24]);

        Ok(Self {
            format,
            name,
            company,
            point_count: u16::from_be_bytes([bytes[24], bytes[25]]),
            frame_index: u16::from_be_bytes([bytes[26], bytes[27]]),
            frame_total: u16::from_be_bytes([bytes[28], bytes[29]]),
            scanner_head: bytes[30],
        })
    }

    pub fn frame_header(&self) -> FrameHeader {
        FrameHeader {
            name: text_field(&self.name),
            company: text_field(&self.company),
            point_count: self.point_count,
            frame_index: self.frame_index,
            frame_total: self.frame_total,
            scanner_head: self.scanner_head,
        }
    }
}

fn text_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

/// Incremental block reader. Use [`decode`] unless frames need to be pulled
/// one at a time.
pub struct Decoder<R> {
    reader: R,
    offset: u64,
    extent: GlobalExtent,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            extent: GlobalExtent::default(),
        }
    }

    /// Extent of every coordinate decoded so far.
    pub fn extent(&self) -> &GlobalExtent {
        &self.extent
    }

    /// Number of bytes consumed from the stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next header block and its records. Returns `None` once the
    /// stream ends cleanly on a block boundary.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let start = self.offset;
        let mut raw = [0u8; HEADER_SIZE];
        match self.fill(&mut raw)? {
            0 => return Ok(None),
            HEADER_SIZE => {}
            _ => {
                return Err(IldaError::Truncated {
                    offset: start,
                    expected: HEADER_SIZE,
                    context: "header",
                })
            }
        }

        let header = HeaderRecord::parse(start, &raw)?;
        let mut frame = Frame::new(header.format, header.frame_header());
        tracing::debug!(
            offset = start,
            format = ?header.format,
            points = header.point_count,
            name = %frame.header.name,
            "read header"
        );

        match header.format {
            RecordFormat::ThreeD => {
                frame.coordinates.reserve(usize::from(header.point_count));
                for _ in 0..header.point_count {
                    let mut record = [0u8; 8];
                    self.read_record(&mut record, "3D point record")?;
                    let coordinate = Coordinate {
                        x: compress_axis(i16::from_be_bytes([record[0], record[1]])),
                        y: compress_axis(i16::from_be_bytes([record[2], record[3]])),
                        z: compress_axis(i16::from_be_bytes([record[4], record[5]])),
                        color: record[6],
                        status: record[7],
                    };
                    self.extent.include(&coordinate);
                    frame.coordinates.push(coordinate);
                }
            }
            RecordFormat::TwoD => {
                frame.coordinates.reserve(usize::from(header.point_count));
                for _ in 0..header.point_count {
                    let mut record = [0u8; 6];
                    self.read_record(&mut record, "2D point record")?;
                    let coordinate = Coordinate {
                        x: compress_axis(i16::from_be_bytes([record[0], record[1]])),
                        y: compress_axis(i16::from_be_bytes([record[2], record[3]])),
                        z: 0,
                        color: record[4],
                        status: record[5],
                    };
                    self.extent.include(&coordinate);
                    frame.coordinates.push(coordinate);
                }
            }
            RecordFormat::Palette => {
                // Color tables carry no positions; read past them.
                for _ in 0..header.point_count {
                    let mut record = [0u8; 3];
                    self.read_record(&mut record, "palette record")?;
                }
            }
            RecordFormat::Unknown(selector) => {
                // Nothing to read. A block that declared points leaves them in
                // the stream, where they fail as the next header.
                tracing::warn!(offset = start, selector, "unknown record format");
            }
        }

        Ok(Some(frame))
    }

    fn read_record(&mut self, buf: &mut [u8], context: &'static str) -> Result<()> {
        let start = self.offset;
        if self.fill(buf)? < buf.len() {
            return Err(IldaError::Truncated {
                offset: start,
                expected: buf.len(),
                context,
            });
        }
        Ok(())
    }

    /// Reads until `buf` is full or the stream ends, returning the number of
    /// bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::show::AxisExtent;

    pub(crate) fn header(format: u8, point_count: u16) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.extend_from_slice(SIGNATURE);
        bytes.extend_from_slice(&[0, 0, 0, format]);
        bytes.extend_from_slice(b"frame\0\0\0");
        bytes.extend_from_slice(b"acme    ");
        bytes.extend_from_slice(&point_count.to_be_bytes());
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(&9u16.to_be_bytes());
        bytes.extend_from_slice(&[1, 0]);
        bytes
    }

    /// Builds one block. Points are `(x, y, z, color)`; z is dropped for
    /// format 1 and palette entries are written as three color bytes.
    pub(crate) fn block(format: u8, points: &[(i16, i16, i16, u8)]) -> Vec<u8> {
        let mut bytes = header(format, points.len() as u16);
        for &(x, y, z, color) in points {
            match format {
                0 => {
                    bytes.extend_from_slice(&x.to_be_bytes());
                    bytes.extend_from_slice(&y.to_be_bytes());
                    bytes.extend_from_slice(&z.to_be_bytes());
                    bytes.extend_from_slice(&[color, 0x40]);
                }
                1 => {
                    bytes.extend_from_slice(&x.to_be_bytes());
                    bytes.extend_from_slice(&y.to_be_bytes());
                    bytes.extend_from_slice(&[color, 0x40]);
                }
                _ => bytes.extend_from_slice(&[color, color, color]),
            }
        }
        bytes
    }

    #[test]
    fn compresses_signed_range_onto_twelve_bits() {
        assert_eq!(compress_axis(i16::MIN), 0);
        assert_eq!(compress_axis(-1), 2047);
        assert_eq!(compress_axis(0), 2048);
        assert_eq!(compress_axis(15), 2048);
        assert_eq!(compress_axis(16), 2049);
        assert_eq!(compress_axis(i16::MAX), 4095);
    }

    #[test]
    fn decodes_three_d_records_in_order() {
        let bytes = block(0, &[(0, 16, -32768, 0), (32767, -32768, 0, 5)]);
        let (show, extent) = decode(bytes.as_slice()).unwrap();

        assert_eq!(show.frames.len(), 1);
        let frame = &show.frames[0];
        assert_eq!(frame.format, RecordFormat::ThreeD);
        assert_eq!(
            frame.coordinates,
            vec![
                Coordinate {
                    x: 2048,
                    y: 2049,
                    z: 0,
                    color: 0,
                    status: 0x40,
                },
                Coordinate {
                    x: 4095,
                    y: 0,
                    z: 2048,
                    color: 5,
                    status: 0x40,
                },
            ]
        );

        assert_eq!(extent.x, Some(AxisExtent { min: 2048, max: 4095 }));
        assert_eq!(extent.y, Some(AxisExtent { min: 0, max: 2049 }));
        assert_eq!(extent.z, Some(AxisExtent { min: 0, max: 2048 }));
    }

    #[test]
    fn two_d_records_have_zero_depth() {
        let bytes = block(1, &[(100, -100, 0, 7), (-32768, 32767, 0, 0)]);
        let (show, extent) = decode(bytes.as_slice()).unwrap();

        let frame = &show.frames[0];
        assert_eq!(frame.format, RecordFormat::TwoD);
        assert!(frame.coordinates.iter().all(|c| c.z == 0));
        assert_eq!(frame.coordinates[0].color, 7);
        assert_eq!(extent.z, Some(AxisExtent { min: 0, max: 0 }));
    }

    #[test]
    fn palette_blocks_become_empty_frames() {
        let mut bytes = block(2, &[(0, 0, 0, 255), (0, 0, 0, 128), (0, 0, 0, 1)]);
        bytes.extend(block(1, &[(10, 10, 0, 1)]));
        bytes.extend(block(2, &[]));

        let (show, extent) = decode(bytes.as_slice()).unwrap();

        assert_eq!(show.frames.len(), 3);
        assert_eq!(show.frames[0].format, RecordFormat::Palette);
        assert!(show.frames[0].coordinates.is_empty());
        assert_eq!(show.frames[1].coordinates.len(), 1);
        assert!(show.frames[2].coordinates.is_empty());
        // only the 2D point contributed to the extent
        assert_eq!(extent.x.map(|x| x.range()), Some(0));
    }

    #[test]
    fn empty_stream_is_an_empty_show() {
        let (show, extent) = decode(std::io::empty()).unwrap();
        assert!(show.frames.is_empty());
        assert_eq!(extent, GlobalExtent::default());
    }

    #[test]
    fn keeps_header_metadata() {
        let bytes = block(0, &[(0, 0, 0, 0)]);
        let (show, _) = decode(bytes.as_slice()).unwrap();

        assert_eq!(
            show.frames[0].header,
            FrameHeader {
                name: "frame".to_string(),
                company: "acme".to_string(),
                point_count: 1,
                frame_index: 3,
                frame_total: 9,
                scanner_head: 1,
            }
        );
    }

    #[test]
    fn bad_signature_aborts_decode() {
        let mut bytes = block(0, &[(0, 0, 0, 0)]);
        bytes[0..4].copy_from_slice(b"ILDB");

        let err = decode(bytes.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            IldaError::BadSignature {
                offset: 0,
                found: [b'I', b'L', b'D', b'B'],
            }
        ));
    }

    #[test]
    fn bad_signature_after_valid_block_returns_no_show() {
        let mut bytes = block(1, &[(0, 0, 0, 0)]);
        let second = bytes.len();
        bytes.extend(block(1, &[(0, 0, 0, 0)]));
        bytes[second..second + 4].copy_from_slice(b"JUNK");

        let err = decode(bytes.as_slice()).unwrap_err();
        assert!(
            matches!(err, IldaError::BadSignature { offset, .. } if offset == second as u64)
        );
    }

    #[test]
    fn unknown_format_adds_an_empty_frame() {
        let mut bytes = header(3, 0);
        bytes.extend(block(0, &[(0, 0, 0, 0)]));

        let (show, _) = decode(bytes.as_slice()).unwrap();

        assert_eq!(show.frames.len(), 2);
        assert_eq!(show.frames[0].format, RecordFormat::Unknown(3));
        assert!(show.frames[0].coordinates.is_empty());
        assert_eq!(show.frames[1].coordinates.len(), 1);
    }

    #[test]
    fn unknown_format_with_points_fails_at_the_next_header() {
        let mut bytes = header(5, 2);
        bytes.extend_from_slice(&[0x12; HEADER_SIZE]);

        let err = decode(bytes.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            IldaError::BadSignature {
                offset: 32,
                found: [0x12, 0x12, 0x12, 0x12],
            }
        ));
    }

    #[test]
    fn partial_header_is_truncation() {
        let bytes = header(0, 0);
        let err = decode(&bytes[..20]).unwrap_err();
        assert!(matches!(
            err,
            IldaError::Truncated {
                offset: 0,
                expected: HEADER_SIZE,
                context: "header",
            }
        ));
    }

    #[test]
    fn short_point_record_is_truncation() {
        let mut bytes = block(0, &[(1, 2, 3, 4), (5, 6, 7, 8)]);
        bytes.truncate(bytes.len() - 3);

        let err = decode(bytes.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            IldaError::Truncated {
                offset: 40,
                expected: 8,
                ..
            }
        ));
    }

    #[test]
    fn declared_count_beyond_stream_is_truncation() {
        let bytes = header(2, 4);
        let err = decode(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, IldaError::Truncated { context: "palette record", .. }));
    }
}
