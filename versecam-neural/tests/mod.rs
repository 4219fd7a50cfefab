use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use versecam_neural::prompts::{build_user_prompt, FALLBACK_CAPTION, POEM_FORMAT, SYSTEM_PROMPT};
use versecam_neural::retry::retry_fixed;
use versecam_neural::{DeepSeekPoet, ReplicateCaptioner, ServiceError};

// ============================================================================
// Prompt Tests
// ============================================================================

#[test]
fn test_user_prompt_carries_the_caption() {
    let prompt = build_user_prompt("雨后的屋顶上有两只猫");
    assert!(prompt.contains("场景描述: 雨后的屋顶上有两只猫"));
    assert!(prompt.contains(POEM_FORMAT));
}

#[test]
fn test_user_prompt_strips_markup_characters() {
    let prompt = build_user_prompt("a {cat} on [a roof] with 'string'");
    assert!(!prompt.contains('['));
    assert!(!prompt.contains(']'));
    assert!(!prompt.contains('{'));
    assert!(!prompt.contains('}'));
    assert!(!prompt.contains('\''));
    assert!(prompt.contains("a cat on a roof with string"));
}

#[test]
fn test_user_prompt_starts_with_the_base_instruction() {
    let prompt = build_user_prompt("x");
    assert!(prompt.starts_with("根据我下面描述的细节写一首诗。"));
}

#[test]
fn test_fallback_caption_survives_prompt_building() {
    let prompt = build_user_prompt(FALLBACK_CAPTION);
    assert!(prompt.contains(FALLBACK_CAPTION));
}

#[test]
fn test_system_prompt_is_nonempty() {
    assert!(SYSTEM_PROMPT.contains("诗人"));
}

// ============================================================================
// Retry Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_returns_first_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<&str, &str> = retry_fixed(3, Duration::from_secs(2), || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("poem")
        }
    })
    .await;
    assert_eq!(result, Ok("poem"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_from_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<&str, &str> = retry_fixed(3, Duration::from_secs(2), || {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("transient")
            } else {
                Ok("poem")
            }
        }
    })
    .await;
    assert_eq!(result, Ok("poem"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_gives_up_after_bounded_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let started = tokio::time::Instant::now();
    let result: Result<(), &str> = retry_fixed(3, Duration::from_secs(2), || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("down")
        }
    })
    .await;
    assert_eq!(result, Err("down"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Two fixed delays between three attempts, nothing after the last.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_retry_single_attempt_never_sleeps() {
    let started = tokio::time::Instant::now();
    let result: Result<(), &str> =
        retry_fixed(1, Duration::from_secs(2), || async { Err("down") }).await;
    assert_eq!(result, Err("down"));
    assert!(started.elapsed() < Duration::from_secs(1));
}

// ============================================================================
// Client Tests (structure only - no live server)
// ============================================================================

#[test]
fn test_poet_client_creation() {
    let poet = DeepSeekPoet::new("sk-test");
    let debug = format!("{:?}", poet);
    assert!(debug.contains("deepseek-chat"));
    assert!(debug.contains("api.deepseek.com"));
}

#[test]
fn test_poet_client_custom_base_url_trims_slash() {
    let poet = DeepSeekPoet::with_base_url("http://localhost:8000/v1/", "key", "test-model");
    let debug = format!("{:?}", poet);
    assert!(debug.contains("http://localhost:8000/v1"));
    assert!(!debug.contains("/v1/"));
}

#[test]
fn test_captioner_client_creation() {
    let captioner = ReplicateCaptioner::new("r8-test");
    let debug = format!("{:?}", captioner);
    assert!(debug.contains("api.replicate.com"));
}

// ============================================================================
// ServiceError Tests
// ============================================================================

#[test]
fn test_service_error_malformed_display() {
    let err = ServiceError::Malformed("prediction carried no output".to_string());
    assert!(err.to_string().contains("malformed response"));
    assert!(err.to_string().contains("no output"));
}

#[test]
fn test_service_error_status_display() {
    let err = ServiceError::Status {
        status: reqwest::StatusCode::BAD_GATEWAY,
        body: "upstream gone".to_string(),
    };
    let display = err.to_string();
    assert!(display.contains("502"));
    assert!(display.contains("upstream gone"));
}
