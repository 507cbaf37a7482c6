use std::io::Write;

use super::{Beam, PlottingSink};
use crate::Result;

const ESC: u8 = 0x1b;
const FF: u8 = 0x0c;
const GS: u8 = 0x1d;
const US: u8 = 0x1f;
const ETX: u8 = 0x03;

/// Switches xterm into its Tektronix 4014 emulation.
const ENTER_TEK: &[u8] = b"\x1b[?38h";

/// Encodes a 12-bit point with Tektronix 4014 extended addressing:
/// high y, extra (low bits of both axes), low y, high x, low x.
pub fn encode_address(x: u16, y: u16) -> [u8; 5] {
    [
        0x20 | ((y >> 7) & 0x1f) as u8,
        0x60 | (((y & 0x03) << 2) | (x & 0x03)) as u8,
        0x60 | ((y >> 2) & 0x1f) as u8,
        0x20 | ((x >> 7) & 0x1f) as u8,
        0x40 | ((x >> 2) & 0x1f) as u8,
    ]
}

/// Draws frames as vector graphics on a Tek 4014 compatible terminal.
pub struct TekSink<W: Write> {
    out: W,
}

impl<W: Write> TekSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PlottingSink for TekSink<W> {
    fn initialize(&mut self) -> Result<()> {
        self.out.write_all(ENTER_TEK)?;
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.out.write_all(&[ESC, FF])?;
        Ok(())
    }

    fn plot(&mut self, beam: Beam, x: u16, y: u16) -> Result<()> {
        // GS starts a fresh vector whose first address is a dark move
        if !beam.is_on() {
            self.out.write_all(&[GS])?;
        }
        self.out.write_all(&encode_address(x, y))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.out.write_all(&[US, ESC, ETX])?;
        self.out.flush()?;
        Ok(())
    }
}
