use chrono::{DateTime, Duration, Utc};

/// An outbound proxy. `reuse_after >= now` means the proxy is temporarily
/// parked (cooling down from a ban or rate-limit hint). Once `valid` is
/// cleared it never flips back.
#[derive(Debug, Clone)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub expires_at: DateTime<Utc>,
    valid: bool,
    ban_count: u32,
    reuse_after: DateTime<Utc>,
}

impl Proxy {
    pub fn new(host: String, port: u16, expires_at: DateTime<Utc>) -> Self {
        Self {
            host,
            port,
            expires_at,
            valid: true,
            ban_count: 0,
            reuse_after: Utc::now(),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Valid iff never explicitly invalidated and not past its expiry.
    pub fn is_valid(&self) -> bool {
        self.valid && Utc::now() < self.expires_at
    }

    /// Available iff valid and not currently cooling down.
    pub fn is_available(&self) -> bool {
        self.is_valid() && Utc::now() >= self.reuse_after
    }

    pub fn ban_count(&self) -> u32 {
        self.ban_count
    }

    /// Idempotent: clears the valid flag, never sets it back.
    pub fn mark_invalid(&mut self, reason: &str) {
        if self.valid {
            tracing::debug!(host = %self.host, port = self.port, reason, "proxy marked invalid");
        }
        self.valid = false;
    }

    /// Increments the ban counter and parks the proxy per the ban schedule:
    /// 1st ban 30s, 2nd 60s, 3rd 120s, subsequent bans 60s.
    pub fn mark_banned(&mut self) {
        self.ban_count += 1;
        let wait_secs = match self.ban_count {
            1 => 30,
            2 => 60,
            3 => 120,
            _ => 60,
        };
        self.reuse_after = Utc::now() + Duration::seconds(wait_secs);
        tracing::debug!(
            host = %self.host,
            port = self.port,
            ban_count = self.ban_count,
            reuse_after = %self.reuse_after,
            "proxy banned"
        );
    }

    /// Parks the proxy for 10ms. Defined for parity with the observed
    /// upstream API surface; spec.md §9 notes this is never actually
    /// invoked on the live call path.
    pub fn rate_limit(&mut self) {
        self.reuse_after = Utc::now() + Duration::milliseconds(10);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn far_future() -> DateTime<Utc> {
        Utc::now() + Duration::days(365)
    }

    #[test]
    fn test_fresh_proxy_is_valid_and_available() {
        let p = Proxy::new("1.2.3.4".into(), 8080, far_future());
        assert!(p.is_valid());
        assert!(p.is_available());
    }

    #[test]
    fn test_expired_proxy_is_invalid() {
        let p = Proxy::new("1.2.3.4".into(), 8080, Utc::now() - Duration::seconds(1));
        assert!(!p.is_valid());
        assert!(!p.is_available());
    }

    #[test]
    fn test_mark_invalid_is_idempotent_and_never_flips_back() {
        let mut p = Proxy::new("1.2.3.4".into(), 8080, far_future());
        p.mark_invalid("first");
        assert!(!p.is_valid());
        p.mark_invalid("second");
        assert!(!p.is_valid());
    }

    #[test]
    fn test_ban_schedule() {
        let mut p = Proxy::new("1.2.3.4".into(), 8080, far_future());

        p.mark_banned();
        assert_eq!(p.ban_count(), 1);
        assert!(!p.is_available());
        assert!(p.reuse_after <= Utc::now() + Duration::seconds(31));
        assert!(p.reuse_after > Utc::now() + Duration::seconds(29));

        p.mark_banned();
        assert_eq!(p.ban_count(), 2);
        assert!(p.reuse_after > Utc::now() + Duration::seconds(59));

        p.mark_banned();
        assert_eq!(p.ban_count(), 3);
        assert!(p.reuse_after > Utc::now() + Duration::seconds(119));

        p.mark_banned();
        assert_eq!(p.ban_count(), 4);
        // 4th+ ban falls back to the 60s tier
        assert!(p.reuse_after <= Utc::now() + Duration::seconds(61));
        assert!(p.reuse_after > Utc::now() + Duration::seconds(59));
    }

    #[test]
    fn test_rate_limit_parks_briefly() {
        let mut p = Proxy::new("1.2.3.4".into(), 8080, far_future());
        p.rate_limit();
        assert!(!p.is_available());
        assert!(p.reuse_after <= Utc::now() + Duration::milliseconds(11));
    }
}
