use chrono::{DateTime, Utc};
use x509_parser::parse_x509_certificate;

/// Certificates with fewer days left than this are reported as expiring.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateExpiry {
    pub not_after: DateTime<Utc>,
    pub days_left: i64,
}

impl CertificateExpiry {
    pub fn expiring_soon(&self) -> bool {
        self.days_left < EXPIRY_WARNING_DAYS
    }
}

/// Read the "not after" date of a DER encoded leaf certificate.
pub fn certificate_expiry(cert_der: &[u8], now: DateTime<Utc>) -> Option<CertificateExpiry> {
    let (_, parsed) = parse_x509_certificate(cert_der).ok()?;
    let not_after = DateTime::from_timestamp(parsed.validity().not_after.timestamp(), 0)?;

    Some(CertificateExpiry {
        not_after,
        days_left: days_until(not_after, now),
    })
}

/// Whole days from `now` until `not_after`, truncated; negative once expired.
pub fn days_until(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_days()
}
