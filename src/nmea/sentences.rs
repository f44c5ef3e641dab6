//! Typed sentence parsers built on [`scan`].
//!
//! Each parser checks that the talker suffix names the expected sentence
//! and only then scans its fixed layout.  Coordinates come out with the
//! hemisphere sign already applied.

use super::checksum::check;
use super::scan::{scan, Fields};
use super::types::{NmeaDate, NmeaTime, ScaledFloat};
use crate::error::NmeaError;

/// Sentence kind by talker suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceId {
    /// Framing or checksum check failed.
    Invalid,
    /// Well-formed but not a sentence this module parses.
    Unknown,
    Rmc,
    Gga,
    Gsa,
    Gll,
    Gst,
    Gsv,
    Vtg,
    Zda,
}

/// Classify a sentence.  `strict` requires a checksum.
pub fn sentence_id(sentence: &[u8], strict: bool) -> SentenceId {
    if !check(sentence, strict) {
        return SentenceId::Invalid;
    }
    let Ok(fields) = scan(sentence, "t") else {
        return SentenceId::Invalid;
    };
    let Ok(talker) = fields.reader().talker() else {
        return SentenceId::Invalid;
    };
    match &talker[2..] {
        "RMC" => SentenceId::Rmc,
        "GGA" => SentenceId::Gga,
        "GSA" => SentenceId::Gsa,
        "GLL" => SentenceId::Gll,
        "GST" => SentenceId::Gst,
        "GSV" => SentenceId::Gsv,
        "VTG" => SentenceId::Vtg,
        "ZDA" => SentenceId::Zda,
        _ => SentenceId::Unknown,
    }
}

/// Check the talker suffix, then scan the full `layout`.
fn scan_as<'a>(sentence: &'a [u8], suffix: &str, layout: &str) -> Result<Fields<'a>, NmeaError> {
    let head = scan(sentence, "t")?;
    if &head.reader().talker()?[2..] != suffix {
        return Err(NmeaError::WrongSentence);
    }
    scan(sentence, layout)
}

// ───────────────────────────────────────────────────────────────
// RMC: recommended minimum
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rmc {
    pub time: Option<NmeaTime>,
    pub valid: bool,
    pub latitude: ScaledFloat,
    pub longitude: ScaledFloat,
    /// Knots.
    pub speed: ScaledFloat,
    pub course: ScaledFloat,
    pub date: Option<NmeaDate>,
    pub variation: ScaledFloat,
}

pub fn parse_rmc(sentence: &[u8]) -> Result<Rmc, NmeaError> {
    let fields = scan_as(sentence, "RMC", "tTcfdfdffDfd")?;
    let mut r = fields.reader();
    r.talker()?;
    let time = r.time()?;
    let validity = r.char()?;
    let latitude = r.float()?.signed(r.direction()?);
    let longitude = r.float()?.signed(r.direction()?);
    let speed = r.float()?;
    let course = r.float()?;
    let date = r.date()?;
    let variation = r.float()?.signed(r.direction()?);
    Ok(Rmc {
        time,
        valid: validity == Some(b'A'),
        latitude,
        longitude,
        speed,
        course,
        date,
        variation,
    })
}

// ───────────────────────────────────────────────────────────────
// GGA: fix data
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gga {
    pub time: Option<NmeaTime>,
    pub latitude: ScaledFloat,
    pub longitude: ScaledFloat,
    pub fix_quality: i32,
    pub satellites_tracked: i32,
    pub hdop: ScaledFloat,
    pub altitude: ScaledFloat,
    pub altitude_units: Option<u8>,
    pub height: ScaledFloat,
    pub height_units: Option<u8>,
    pub dgps_age: ScaledFloat,
}

pub fn parse_gga(sentence: &[u8]) -> Result<Gga, NmeaError> {
    let fields = scan_as(sentence, "GGA", "tTfdfdiiffcfcf_")?;
    let mut r = fields.reader();
    r.talker()?;
    Ok(Gga {
        time: r.time()?,
        latitude: r.float()?.signed(r.direction()?),
        longitude: r.float()?.signed(r.direction()?),
        fix_quality: r.int()?,
        satellites_tracked: r.int()?,
        hdop: r.float()?,
        altitude: r.float()?,
        altitude_units: r.char()?,
        height: r.float()?,
        height_units: r.char()?,
        dgps_age: r.float()?,
    })
}

// ───────────────────────────────────────────────────────────────
// GSA: DOP and active satellites
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gsa {
    pub mode: Option<u8>,
    pub fix_type: i32,
    pub sats: [i32; 12],
    pub pdop: ScaledFloat,
    pub hdop: ScaledFloat,
    pub vdop: ScaledFloat,
}

pub fn parse_gsa(sentence: &[u8]) -> Result<Gsa, NmeaError> {
    let fields = scan_as(sentence, "GSA", "tciiiiiiiiiiiiifff")?;
    let mut r = fields.reader();
    r.talker()?;
    let mode = r.char()?;
    let fix_type = r.int()?;
    let mut sats = [0; 12];
    for s in &mut sats {
        *s = r.int()?;
    }
    Ok(Gsa {
        mode,
        fix_type,
        sats,
        pdop: r.float()?,
        hdop: r.float()?,
        vdop: r.float()?,
    })
}

// ───────────────────────────────────────────────────────────────
// GLL: geographic position
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gll {
    pub latitude: ScaledFloat,
    pub longitude: ScaledFloat,
    pub time: Option<NmeaTime>,
    pub status: Option<u8>,
    pub mode: Option<u8>,
}

pub fn parse_gll(sentence: &[u8]) -> Result<Gll, NmeaError> {
    let fields = scan_as(sentence, "GLL", "tfdfdTc;c")?;
    let mut r = fields.reader();
    r.talker()?;
    Ok(Gll {
        latitude: r.float()?.signed(r.direction()?),
        longitude: r.float()?.signed(r.direction()?),
        time: r.time()?,
        status: r.char()?,
        mode: r.char()?,
    })
}

// ───────────────────────────────────────────────────────────────
// GST: pseudorange error statistics
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gst {
    pub time: Option<NmeaTime>,
    pub rms_deviation: ScaledFloat,
    pub semi_major_deviation: ScaledFloat,
    pub semi_minor_deviation: ScaledFloat,
    pub semi_major_orientation: ScaledFloat,
    pub latitude_error_deviation: ScaledFloat,
    pub longitude_error_deviation: ScaledFloat,
    pub altitude_error_deviation: ScaledFloat,
}

pub fn parse_gst(sentence: &[u8]) -> Result<Gst, NmeaError> {
    let fields = scan_as(sentence, "GST", "tTfffffff")?;
    let mut r = fields.reader();
    r.talker()?;
    Ok(Gst {
        time: r.time()?,
        rms_deviation: r.float()?,
        semi_major_deviation: r.float()?,
        semi_minor_deviation: r.float()?,
        semi_major_orientation: r.float()?,
        latitude_error_deviation: r.float()?,
        longitude_error_deviation: r.float()?,
        altitude_error_deviation: r.float()?,
    })
}

// ───────────────────────────────────────────────────────────────
// GSV: satellites in view
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SatInfo {
    pub nr: i32,
    pub elevation: i32,
    pub azimuth: i32,
    pub snr: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gsv {
    pub total_msgs: i32,
    pub msg_nr: i32,
    pub total_sats: i32,
    pub sats: [SatInfo; 4],
}

pub fn parse_gsv(sentence: &[u8]) -> Result<Gsv, NmeaError> {
    let fields = scan_as(sentence, "GSV", "tiii;iiiiiiiiiiiiiiii")?;
    let mut r = fields.reader();
    r.talker()?;
    let total_msgs = r.int()?;
    let msg_nr = r.int()?;
    let total_sats = r.int()?;
    let mut sats = [SatInfo::default(); 4];
    for sat in &mut sats {
        *sat = SatInfo {
            nr: r.int()?,
            elevation: r.int()?,
            azimuth: r.int()?,
            snr: r.int()?,
        };
    }
    Ok(Gsv {
        total_msgs,
        msg_nr,
        total_sats,
        sats,
    })
}

// ───────────────────────────────────────────────────────────────
// VTG: track made good and ground speed
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vtg {
    pub true_track_degrees: ScaledFloat,
    pub magnetic_track_degrees: ScaledFloat,
    pub speed_knots: ScaledFloat,
    pub speed_kph: ScaledFloat,
    pub faa_mode: Option<u8>,
}

pub fn parse_vtg(sentence: &[u8]) -> Result<Vtg, NmeaError> {
    let fields = scan_as(sentence, "VTG", "tfcfcfcfc;c")?;
    let mut r = fields.reader();
    r.talker()?;
    let true_track_degrees = r.float()?;
    let c_true = r.char()?;
    let magnetic_track_degrees = r.float()?;
    let c_magnetic = r.char()?;
    let speed_knots = r.float()?;
    let c_knots = r.char()?;
    let speed_kph = r.float()?;
    let c_kph = r.char()?;
    let faa_mode = r.char()?;

    if c_true != Some(b'T') || c_magnetic != Some(b'M') || c_knots != Some(b'N') || c_kph != Some(b'K') {
        return Err(NmeaError::OutOfRange);
    }
    Ok(Vtg {
        true_track_degrees,
        magnetic_track_degrees,
        speed_knots,
        speed_kph,
        faa_mode,
    })
}

// ───────────────────────────────────────────────────────────────
// ZDA: time and date
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zda {
    pub time: Option<NmeaTime>,
    pub day: i32,
    pub month: i32,
    /// Four-digit year as transmitted.
    pub year: i32,
    pub hour_offset: i32,
    pub minute_offset: i32,
}

pub fn parse_zda(sentence: &[u8]) -> Result<Zda, NmeaError> {
    let fields = scan_as(sentence, "ZDA", "tTiiiii")?;
    let mut r = fields.reader();
    r.talker()?;
    let zda = Zda {
        time: r.time()?,
        day: r.int()?,
        month: r.int()?,
        year: r.int()?,
        hour_offset: r.int()?,
        minute_offset: r.int()?,
    };
    if zda.hour_offset.abs() > 13 || !(0..=59).contains(&zda.minute_offset) {
        return Err(NmeaError::OutOfRange);
    }
    Ok(zda)
}
