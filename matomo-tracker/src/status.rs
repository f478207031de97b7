//! Response status classification.
//!
//! Tracking endpoints answer with the tracking GIF (200), with no content
//! when `send_image=0` (204), or with a redirect after recording the hit.
//! Everything else counts as a delivery anomaly. Single and bulk submissions
//! share the same window.

/// Status codes treated as a successful delivery.
pub const SUCCESS_STATUSES: [u16; 7] = [200, 204, 301, 302, 304, 307, 308];

/// Returns true if the endpoint accepted the request.
pub fn is_success(status: u16) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_success_window() {
        for status in [200, 204, 301, 302, 304, 307, 308] {
            assert!(is_success(status), "{} should be accepted", status);
        }
    }

    #[test]
    fn test_anomalies() {
        for status in [201, 202, 203, 205, 300, 303, 305, 400, 404, 500, 503] {
            assert!(!is_success(status), "{} should be an anomaly", status);
        }
    }

    proptest! {
        #[test]
        fn prop_only_listed_statuses_succeed(status in 100u16..600) {
            prop_assert_eq!(is_success(status), SUCCESS_STATUSES.contains(&status));
            if !(200..400).contains(&status) {
                prop_assert!(!is_success(status));
            }
        }
    }
}
