//! Fuzz target for decoding the query IR from untrusted JSON.
//!
//! Decoding, validating, and rendering must never panic, and a decoded
//! query must survive a serialize/deserialize round trip unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;

use analytics_core::AnalyticsQuery;

fuzz_target!(|data: &[u8]| {
    let Ok(query) = serde_json::from_slice::<AnalyticsQuery>(data) else {
        return;
    };

    let _ = query.validate();
    let _ = query.to_parameterized_sql();

    if let Ok(json) = serde_json::to_string(&query) {
        let again: AnalyticsQuery = serde_json::from_str(&json).expect("re-decode");
        assert_eq!(again, query);
    }
});
