//! Effective time encoding
//!
//! A time is stored as an unsigned big-endian count of precision units since
//! the Unix epoch. The width depends on the precision:
//!
//! | Precision   | Width | Range (approx.)   |
//! |-------------|-------|-------------------|
//! | nanosecond  | 8     | until 2554        |
//! | millisecond | 6     | 8 900 years       |
//! | second      | 5     | 34 800 years      |
//! | minute      | 4     | 8 100 years       |
//! | hour        | 3     | 1 900 years       |
//! | day         | 3     | 45 900 years      |
//!
//! Big-endian unsigned counts sort in time order, so the time suffix keeps
//! all versions of a name in ascending time order. Every [`Timestamp`] fits
//! every width; decoding a count past `u64` nanoseconds fails with
//! [`Error::TimeOutOfRange`].

use crate::schema::TemporalPrecision;
use byteorder::{BigEndian, ByteOrder};
use planb_core::{Error, Result, Timestamp};

const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000 * NANOS_PER_MILLI;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: u64 = 24 * NANOS_PER_HOUR;

/// Fixed-width time codec for one precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCodec {
    precision: TemporalPrecision,
}

impl TimeCodec {
    /// Codec for `precision`
    pub const fn new(precision: TemporalPrecision) -> Self {
        TimeCodec { precision }
    }

    /// Precision of this codec
    pub const fn precision(&self) -> TemporalPrecision {
        self.precision
    }

    /// Encoded width in bytes
    pub const fn width(&self) -> usize {
        match self.precision {
            TemporalPrecision::Nanosecond => 8,
            TemporalPrecision::Millisecond => 6,
            TemporalPrecision::Second => 5,
            TemporalPrecision::Minute => 4,
            TemporalPrecision::Hour | TemporalPrecision::Day => 3,
        }
    }

    /// Nanoseconds in one unit
    pub const fn unit_nanos(&self) -> u64 {
        match self.precision {
            TemporalPrecision::Nanosecond => 1,
            TemporalPrecision::Millisecond => NANOS_PER_MILLI,
            TemporalPrecision::Second => NANOS_PER_SECOND,
            TemporalPrecision::Minute => NANOS_PER_MINUTE,
            TemporalPrecision::Hour => NANOS_PER_HOUR,
            TemporalPrecision::Day => NANOS_PER_DAY,
        }
    }

    /// Number of units in `time`, truncated, checked against the width
    pub fn count(&self, time: Timestamp) -> Result<u64> {
        let count = time.as_nanos() / self.unit_nanos();
        let width = self.width();
        if width < 8 && count >> (width * 8) != 0 {
            return Err(Error::TimeOutOfRange(format!(
                "{time} does not fit {width} bytes at {:?} precision",
                self.precision
            )));
        }
        Ok(count)
    }

    /// Append a count produced by [`TimeCodec::count`]
    pub fn write_count(&self, count: u64, buf: &mut Vec<u8>) {
        let width = self.width();
        let mut scratch = [0u8; 8];
        BigEndian::write_uint(&mut scratch[..width], count, width);
        buf.extend_from_slice(&scratch[..width]);
    }

    /// Append the encoding of `time`
    pub fn encode(&self, time: Timestamp, buf: &mut Vec<u8>) -> Result<()> {
        let count = self.count(time)?;
        self.write_count(count, buf);
        Ok(())
    }

    /// Decode exactly [`TimeCodec::width`] bytes
    pub fn decode(&self, bytes: &[u8]) -> Result<Timestamp> {
        let width = self.width();
        if bytes.len() != width {
            return Err(Error::corruption(format!(
                "time is {} bytes, expected {width}",
                bytes.len()
            )));
        }
        let count = BigEndian::read_uint(bytes, width);
        count
            .checked_mul(self.unit_nanos())
            .map(Timestamp::from_nanos)
            .ok_or_else(|| Error::TimeOutOfRange(format!("{count} units overflow nanoseconds")))
    }

    /// `time` rounded down to the precision
    pub fn truncate(&self, time: Timestamp) -> Timestamp {
        let unit = self.unit_nanos();
        Timestamp::from_nanos(time.as_nanos() / unit * unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TemporalPrecision; 6] = [
        TemporalPrecision::Nanosecond,
        TemporalPrecision::Millisecond,
        TemporalPrecision::Second,
        TemporalPrecision::Minute,
        TemporalPrecision::Hour,
        TemporalPrecision::Day,
    ];

    #[test]
    fn test_widths() {
        let widths: Vec<usize> = ALL.iter().map(|p| TimeCodec::new(*p).width()).collect();
        assert_eq!(widths, vec![8, 6, 5, 4, 3, 3]);
    }

    #[test]
    fn test_roundtrip_truncates() {
        let time = Timestamp::from_nanos(1_700_000_123_456_789_012);
        for precision in ALL {
            let codec = TimeCodec::new(precision);
            let mut buf = Vec::new();
            codec.encode(time, &mut buf).unwrap();
            assert_eq!(buf.len(), codec.width());
            assert_eq!(codec.decode(&buf).unwrap(), codec.truncate(time));
        }
    }

    #[test]
    fn test_millisecond_layout() {
        let codec = TimeCodec::new(TemporalPrecision::Millisecond);
        let mut buf = Vec::new();
        codec.encode(Timestamp::from_millis(258), &mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_encoding_sorts_by_time() {
        let codec = TimeCodec::new(TemporalPrecision::Second);
        let mut earlier = Vec::new();
        let mut later = Vec::new();
        codec.encode(Timestamp::from_secs(255), &mut earlier).unwrap();
        codec.encode(Timestamp::from_secs(256), &mut later).unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_every_timestamp_fits() {
        for precision in ALL {
            let codec = TimeCodec::new(precision);
            assert!(codec.encode(Timestamp::MAX, &mut Vec::new()).is_ok());
        }
    }

    #[test]
    fn test_decode_overflow() {
        // 2^24 - 1 days is past the last representable nanosecond
        let codec = TimeCodec::new(TemporalPrecision::Day);
        assert!(matches!(
            codec.decode(&[0xFF, 0xFF, 0xFF]),
            Err(Error::TimeOutOfRange(_))
        ));
    }

    #[test]
    fn test_decode_wrong_width() {
        let codec = TimeCodec::new(TemporalPrecision::Millisecond);
        assert!(matches!(codec.decode(&[0; 5]), Err(Error::Corruption(_))));
    }
}
