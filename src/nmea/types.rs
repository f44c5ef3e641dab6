//! Value types produced by the NMEA scanner.

/// Scaled-fraction number: `value / scale` without floating point during
/// the parse.  `scale == 0` means "no digits were present".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaledFloat {
    pub value: i32,
    pub scale: i32,
}

impl ScaledFloat {
    /// An empty field.
    pub const EMPTY: Self = Self { value: 0, scale: 0 };

    pub const fn new(value: i32, scale: i32) -> Self {
        Self { value, scale }
    }

    /// Plain decimal value.  NaN for an empty field.
    pub fn to_f32(self) -> f32 {
        if self.scale == 0 {
            return f32::NAN;
        }
        self.value as f32 / self.scale as f32
    }

    /// Convert a `[d]ddmm.mmmm` field to decimal degrees.  NaN for an
    /// empty field.
    pub fn to_coord(self) -> f32 {
        if self.scale == 0 {
            return f32::NAN;
        }
        let per_degree = self.scale.saturating_mul(100);
        let degrees = self.value / per_degree;
        let minutes = self.value % per_degree;
        degrees as f32 + minutes as f32 / (60.0 * self.scale as f32)
    }

    /// Multiply the mantissa by a direction sign (1, -1 or 0).
    pub(crate) fn signed(self, direction: i8) -> Self {
        Self {
            value: self.value.saturating_mul(i32::from(direction)),
            scale: self.scale,
        }
    }
}

/// `ddmmyy` date.  Year is the two-digit field as transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NmeaDate {
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

/// `hhmmss[.fff]` time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NmeaTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub microseconds: u32,
}
