//! Expiry math for bearer tokens.
//!
//! All timestamps are absolute milliseconds since the Unix epoch. Every
//! predicate has an `_at` variant taking the clock explicitly so tests can
//! simulate time.

use chrono::Utc;

/// Buffer applied at boot: an access token this close to expiry is refreshed
/// before the session is declared authenticated.
pub const STARTUP_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Buffer applied on the request hot path. Tighter than the boot buffer so
/// that routine API calls only pay for a refresh when genuinely needed.
pub const REQUEST_REFRESH_BUFFER_MINUTES: i64 = 1;

/// Refresh-token lifetime. The backend mints refresh tokens with a 30-day
/// TTL but does not report it in the token response, so the client mirrors
/// the value. If the backend TTL changes, this constant must change with it.
pub const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 30;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_DAY: i64 = 86_400_000;

/// Current wall-clock time in milliseconds since epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute expiry for a token valid for `expires_in_seconds` from now.
///
/// A non-positive input yields an already-expired timestamp, which is valid
/// input for the predicates below.
pub fn calculate_expiry_time(expires_in_seconds: i64) -> i64 {
    calculate_expiry_time_at(expires_in_seconds, now_ms())
}

/// Like [`calculate_expiry_time`] with an explicit clock.
pub fn calculate_expiry_time_at(expires_in_seconds: i64, now_ms: i64) -> i64 {
    now_ms.saturating_add(expires_in_seconds.saturating_mul(MS_PER_SECOND))
}

/// Absolute expiry for a refresh token minted now.
pub fn refresh_token_expiry_time() -> i64 {
    now_ms().saturating_add(REFRESH_TOKEN_LIFETIME_DAYS.saturating_mul(MS_PER_DAY))
}

/// True if `expires_at` is absent or already past.
pub fn is_expired(expires_at: Option<i64>) -> bool {
    is_expired_at(expires_at, now_ms())
}

/// Like [`is_expired`] with an explicit clock.
pub fn is_expired_at(expires_at: Option<i64>, now_ms: i64) -> bool {
    match expires_at {
        Some(expires_at) => now_ms >= expires_at,
        None => true,
    }
}

/// True if `expires_at` is absent or within `buffer_minutes` of expiring.
pub fn is_expiring_soon(expires_at: Option<i64>, buffer_minutes: i64) -> bool {
    is_expiring_soon_at(expires_at, buffer_minutes, now_ms())
}

/// Like [`is_expiring_soon`] with an explicit clock.
pub fn is_expiring_soon_at(expires_at: Option<i64>, buffer_minutes: i64, now_ms: i64) -> bool {
    match expires_at {
        Some(expires_at) => {
            now_ms >= expires_at.saturating_sub(buffer_minutes.saturating_mul(MS_PER_MINUTE))
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_calculate_expiry_time_adds_seconds() {
        assert_eq!(calculate_expiry_time_at(3600, NOW), NOW + 3_600_000);
        assert_eq!(calculate_expiry_time_at(0, NOW), NOW);
    }

    #[test]
    fn test_negative_expires_in_yields_past_timestamp() {
        let expires_at = calculate_expiry_time_at(-5, NOW);
        assert!(is_expired_at(Some(expires_at), NOW));
    }

    #[test]
    fn test_fresh_expiry_is_not_expired() {
        // P1: for all s >= 0, a freshly calculated expiry is not yet expired
        for s in [1, 60, 3600, 86_400] {
            let expires_at = calculate_expiry_time_at(s, NOW);
            assert!(!is_expired_at(Some(expires_at), NOW), "s={s}");
        }
    }

    #[test]
    fn test_expiry_flips_once_time_passes() {
        let expires_at = calculate_expiry_time_at(30, NOW);

        assert!(!is_expired_at(Some(expires_at), NOW + 29_999));
        assert!(is_expired_at(Some(expires_at), NOW + 30_000));
        assert!(is_expired_at(Some(expires_at), NOW + 31_000));
    }

    #[test]
    fn test_none_is_expired_and_expiring_soon() {
        assert!(is_expired_at(None, NOW));
        assert!(is_expiring_soon_at(None, 0, NOW));
        assert!(is_expiring_soon_at(None, 60, NOW));
    }

    #[test]
    fn test_expired_implies_expiring_soon_for_any_buffer() {
        // P2: is_expired => is_expiring_soon for every buffer >= 0
        let expires_at = Some(NOW - 1);
        assert!(is_expired_at(expires_at, NOW));
        for buffer in [0, 1, 5, 60, 10_000] {
            assert!(is_expiring_soon_at(expires_at, buffer, NOW), "buffer={buffer}");
        }
    }

    #[test]
    fn test_expiring_soon_window() {
        let expires_at = Some(NOW + 3 * MS_PER_MINUTE);

        assert!(!is_expired_at(expires_at, NOW));
        assert!(!is_expiring_soon_at(expires_at, 1, NOW));
        assert!(!is_expiring_soon_at(expires_at, 2, NOW));
        assert!(is_expiring_soon_at(expires_at, 3, NOW));
        assert!(is_expiring_soon_at(expires_at, 10, NOW));
    }

    #[test]
    fn test_zero_buffer_matches_is_expired() {
        for delta in [-1_000, -1, 0, 1, 1_000] {
            let expires_at = Some(NOW + delta);
            assert_eq!(
                is_expiring_soon_at(expires_at, 0, NOW),
                is_expired_at(expires_at, NOW),
                "delta={delta}"
            );
        }
    }

    #[test]
    fn test_buffer_constants_ordering() {
        // The hot-path buffer must stay tighter than the boot buffer.
        assert!(REQUEST_REFRESH_BUFFER_MINUTES < STARTUP_REFRESH_BUFFER_MINUTES);
    }

    #[test]
    fn test_refresh_token_expiry_is_days_out() {
        let before = now_ms();
        let expires_at = refresh_token_expiry_time();
        let after = now_ms();

        assert!(expires_at >= before + REFRESH_TOKEN_LIFETIME_DAYS * MS_PER_DAY);
        assert!(expires_at <= after + REFRESH_TOKEN_LIFETIME_DAYS * MS_PER_DAY);
    }
}
