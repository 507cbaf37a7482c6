use std::{fs::File, io::BufReader, io::Read, path::Path};

use serde::{Deserialize, Serialize};

use crate::{decode, normalize, Result};

/// Point record layout selected by a header's format byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordFormat {
    /// Format 0: x, y, z, color, status.
    ThreeD,
    /// Format 1: x, y, color, status. z is always zero.
    TwoD,
    /// Format 2: an r, g, b color table entry. Carries no position.
    Palette,
    /// Any other selector. No records are read for it.
    Unknown(u8),
}

impl RecordFormat {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => RecordFormat::ThreeD,
            1 => RecordFormat::TwoD,
            2 => RecordFormat::Palette,
            other => RecordFormat::Unknown(other),
        }
    }
}

/// One addressable point of a frame.
///
/// Holds the decoder's 12-bit working values until the show is normalized,
/// after which x, y and z are device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: u16,
    pub y: u16,
    pub z: u16,
    pub color: u8,
    /// Raw status byte as read from the file. Beam state never consults it.
    pub status: u8,
}

/// Metadata carried by the header block a frame was read from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameHeader {
    pub name: String,
    pub company: String,
    pub point_count: u16,
    pub frame_index: u16,
    pub frame_total: u16,
    pub scanner_head: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub format: RecordFormat,
    pub header: FrameHeader,
    /// Points in file order. Always empty for palette blocks.
    pub coordinates: Vec<Coordinate>,
}

impl Frame {
    pub fn new(format: RecordFormat, header: FrameHeader) -> Self {
        Self {
            format,
            header,
            coordinates: Vec::new(),
        }
    }
}

/// Every frame of one file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Show {
    pub frames: Vec<Frame>,
}

impl Show {
    /// Opens an ILDA file, decodes it and normalizes it against its own
    /// global extent, ready for playback.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Decodes and normalizes a show from any byte stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        tracing::info!("reading vectors");
        let (mut show, extent) = decode::decode(reader)?;

        tracing::info!(frames = show.frames.len(), "normalizing points");
        normalize::normalize(&mut show, &extent);

        tracing::info!("ready to play");
        Ok(show)
    }

    pub fn point_count(&self) -> usize {
        self.frames.iter().map(|frame| frame.coordinates.len()).sum()
    }

    /// Summarises the show for `--info` style inspection.
    pub fn summary(&self) -> ShowSummary {
        let mut summary = ShowSummary {
            frames: self.frames.len(),
            points: self.point_count(),
            ..Default::default()
        };

        for frame in &self.frames {
            match frame.format {
                RecordFormat::ThreeD => summary.three_d_frames += 1,
                RecordFormat::TwoD => summary.two_d_frames += 1,
                RecordFormat::Palette => summary.palette_frames += 1,
                RecordFormat::Unknown(_) => summary.other_frames += 1,
            }
            for coordinate in &frame.coordinates {
                summary.extent.include(coordinate);
            }
        }

        summary
    }
}

/// Running minimum and maximum of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisExtent {
    pub min: u16,
    pub max: u16,
}

impl AxisExtent {
    /// Observed range, `max - min`.
    pub fn range(&self) -> u16 {
        self.max - self.min
    }
}

/// Per-axis bounds accumulated over every coordinate of a whole show.
///
/// An axis stays `None` until it has seen a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlobalExtent {
    pub x: Option<AxisExtent>,
    pub y: Option<AxisExtent>,
    pub z: Option<AxisExtent>,
}

impl GlobalExtent {
    pub fn include(&mut self, coordinate: &Coordinate) {
        widen(&mut self.x, coordinate.x);
        widen(&mut self.y, coordinate.y);
        widen(&mut self.z, coordinate.z);
    }
}

fn widen(axis: &mut Option<AxisExtent>, value: u16) {
    match axis {
        Some(extent) => {
            extent.min = extent.min.min(value);
            extent.max = extent.max.max(value);
        }
        None => {
            *axis = Some(AxisExtent {
                min: value,
                max: value,
            })
        }
    }
}

/// Shape of a loaded show.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShowSummary {
    pub frames: usize,
    pub points: usize,
    pub three_d_frames: usize,
    pub two_d_frames: usize,
    pub palette_frames: usize,
    pub other_frames: usize,
    pub extent: GlobalExtent,
}
