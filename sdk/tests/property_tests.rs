use proptest::prelude::*;
use sdk::errors::{EngineError, JudgeErrorExt};
use sdk::types::Verdict;

// Error user hints never echo the raw error payload
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "err_[0-9]{3}[a-z_/]{4,30}") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::InvalidRequest(error_str.clone()),
            EngineError::Serialization(error_str.clone()),
            EngineError::FatalPipelineFailure {
                batch_index: 1,
                total_batches: 1,
                cause: error_str.clone(),
            },
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
        }
    }
}

// Any numeric assessment a model emits lands inside [0, 1]
proptest! {
    #[test]
    fn test_verdict_assessment_always_in_range(
        assessment in -1.0e6..1.0e6f64,
        summary in "\\PC{0,64}",
    ) {
        let value = serde_json::json!({
            "assessment": assessment,
            "summary": summary,
        });

        let verdict = Verdict::from_value(&value).expect("numeric assessment parses");
        prop_assert!((0.0..=1.0).contains(&verdict.assessment));
        prop_assert_eq!(verdict.summary, summary);
    }
}

// Arbitrary JSON-ish strings never panic the verdict builder
proptest! {
    #[test]
    fn test_verdict_from_arbitrary_strings(text in "\\PC{0,128}") {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
            let _ = Verdict::from_value(&value);
        }
        let _ = Verdict::from_value(&serde_json::Value::String(text));
    }
}
