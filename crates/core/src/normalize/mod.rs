use crate::show::{AxisExtent, GlobalExtent, Show};

/// Addressable x positions of the display.
pub const X_TARGET: u16 = 4096;
/// Addressable y positions. Smaller than x to keep the device's aspect ratio.
pub const Y_TARGET: u16 = 3120;
/// Depth positions.
pub const Z_TARGET: u16 = 1024;

/// Maps `value` from the observed `extent` onto `0..target`.
///
/// A degenerate axis (`max == min`) or one with no observations leaves the
/// value untouched.
pub fn rescale(value: u16, extent: Option<AxisExtent>, target: u16) -> u16 {
    let Some(extent) = extent else {
        return value;
    };
    let range = u32::from(extent.range());
    if range == 0 {
        return value;
    }

    let offset = u32::from(value.saturating_sub(extent.min));
    (offset * (u32::from(target) - 1) / range) as u16
}

/// Rescales every coordinate of every frame in place against the one
/// show-wide extent.
pub fn normalize(show: &mut Show, extent: &GlobalExtent) {
    for frame in &mut show.frames {
        for coordinate in &mut frame.coordinates {
            coordinate.x = rescale(coordinate.x, extent.x, X_TARGET);
            coordinate.y = rescale(coordinate.y, extent.y, Y_TARGET);
            coordinate.z = rescale(coordinate.z, extent.z, Z_TARGET);
        }
    }
}
