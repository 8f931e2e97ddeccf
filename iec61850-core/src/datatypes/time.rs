//! Time types: UTC timestamps and binary entry times

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// UtcTime: 4 bytes seconds since epoch, 3 bytes fraction of second, 1 byte time quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp([u8; 8]);

impl Timestamp {
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn now() -> Self {
        Self::from_date_time(Utc::now())
    }

    /// Encode a point in time with millisecond accuracy (time quality 0x0a)
    pub fn from_date_time(time: DateTime<Utc>) -> Self {
        let seconds = time.timestamp() as u32;
        let fraction = ((time.timestamp_subsec_millis() as u64) << 24) / 1000;
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4] = (fraction >> 16) as u8;
        bytes[5] = (fraction >> 8) as u8;
        bytes[6] = fraction as u8;
        bytes[7] = 0x0a;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn fraction_of_second(&self) -> u32 {
        u32::from_be_bytes([0, self.0[4], self.0[5], self.0[6]])
    }

    pub fn time_quality(&self) -> u8 {
        self.0[7]
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        let fraction_ms = (self.fraction_of_second() as i64 * 1000) >> 24;
        self.seconds() as i64 * 1000 + fraction_ms
    }

    pub fn to_date_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_millis()).single()
    }
}

/// BinaryTime with date: 4 bytes ms since midnight, 2 bytes days since 1984-01-01
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntryTime([u8; 6]);

impl EntryTime {
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn now() -> Self {
        Self::from_date_time(Utc::now())
    }

    pub fn from_date_time(time: DateTime<Utc>) -> Self {
        let days = (time.date_naive() - epoch()).num_days().max(0) as u16;
        let midnight_ms = time.timestamp_millis().rem_euclid(86_400_000) as u32;
        let mut bytes = [0u8; 6];
        bytes[..4].copy_from_slice(&midnight_ms.to_be_bytes());
        bytes[4..].copy_from_slice(&days.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn millis_since_midnight(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn days_since_1984(&self) -> u16 {
        u16::from_be_bytes([self.0[4], self.0[5]])
    }

    pub fn to_date_time(&self) -> Option<DateTime<Utc>> {
        let date = epoch().checked_add_days(chrono::Days::new(self.days_since_1984() as u64))?;
        let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
        Some(midnight + chrono::Duration::milliseconds(self.millis_since_midnight() as i64))
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1984, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_millis() {
        let time = Utc.timestamp_millis_opt(1_700_000_000_500).unwrap();
        let ts = Timestamp::from_date_time(time);
        assert_eq!(ts.seconds(), 1_700_000_000);
        assert_eq!(ts.time_quality(), 0x0a);
        let back = ts.timestamp_millis();
        assert!((back - 1_700_000_000_500).abs() <= 1);
    }

    #[test]
    fn test_entry_time() {
        let time = Utc.with_ymd_and_hms(1984, 1, 2, 0, 0, 1).unwrap();
        let entry = EntryTime::from_date_time(time);
        assert_eq!(entry.days_since_1984(), 1);
        assert_eq!(entry.millis_since_midnight(), 1000);
        assert_eq!(entry.to_date_time(), Some(time));
    }
}
