//! Executor Module Tests
//!
//! ## Test Scopes
//! - **Retry**: Attempt counting, exhaustion wrapping, and cancellation between attempts.
//! - **Registry**: Command registration, lookup, and retried dispatch.

#[cfg(test)]
mod tests {
    use crate::error::AdminError;
    use crate::executor::registry::CommandRegistry;
    use crate::executor::retry::{CancelFlag, Retry, RetryPolicy};
    use crate::executor::types::AdminTask;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Ctx {
        calls: AtomicU32,
    }

    fn fast(max_attempts: u32) -> Retry {
        Retry::new(RetryPolicy::new(max_attempts, 0))
    }

    // ============================================================
    // TEST 1: Retry - Attempts, Exhaustion, Cancellation
    // ============================================================

    #[tokio::test]
    async fn test_success_on_last_allowed_attempt_is_reported_as_success() {
        // ARRANGE
        let calls = AtomicU32::new(0);

        // ACT
        let result = fast(3)
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(AdminError::Transport("connection reset".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        // ASSERT
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_final_cause() {
        // ARRANGE
        let calls = AtomicU32::new(0);

        // ACT
        let result: Result<(), AdminError> = fast(4)
            .run("always-fails", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(AdminError::AdminOperationFailed(format!("attempt {}", n))) }
            })
            .await;

        // ASSERT
        match result {
            Err(AdminError::RetryExhausted { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(
                    *source,
                    AdminError::AdminOperationFailed(ref msg) if msg == "attempt 4"
                ));
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_single_attempt_policy_never_retries() {
        // ARRANGE
        let calls = AtomicU32::new(0);

        // ACT
        let result: Result<(), AdminError> = fast(1)
            .run("once", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AdminError::Transport("down".to_string())) }
            })
            .await;

        // ASSERT
        assert!(matches!(result, Err(AdminError::RetryExhausted { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_clamps_zero_attempts() {
        // ACT & ASSERT
        assert_eq!(RetryPolicy::new(0, 5).max_attempts, 1);
    }

    /// Characterizes questionable behavior: failures that can never succeed
    /// (a malformed request, an authorization failure) are still retried until
    /// the ceiling, exactly like transient ones.
    #[tokio::test]
    async fn test_characterized_permanent_errors_are_retried_like_transient_ones() {
        // ARRANGE
        let calls = AtomicU32::new(0);

        // ACT
        let result: Result<(), AdminError> = fast(5)
            .run("malformed", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AdminError::AdminOperationFailed("400 Bad Request".to_string())) }
            })
            .await;

        // ASSERT
        assert!(matches!(result, Err(AdminError::RetryExhausted { attempts: 5, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_cancel_is_observed_between_attempts() {
        // ARRANGE
        let calls = AtomicU32::new(0);
        let cancel = CancelFlag::new();
        let retry = fast(10).with_cancel(cancel.clone());

        // ACT
        let result: Result<(), AdminError> = retry
            .run("cancellable", || {
                calls.fetch_add(1, Ordering::SeqCst);
                // The attempt itself runs to completion; cancellation applies after it.
                cancel.cancel();
                async { Err(AdminError::Transport("timeout".to_string())) }
            })
            .await;

        // ASSERT
        assert!(matches!(result, Err(AdminError::Cancelled { attempts: 1 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_last_cause_unwraps_exhaustion() {
        // ARRANGE
        let err = AdminError::RetryExhausted {
            attempts: 2,
            source: Box::new(AdminError::path("/infra-solr", "quorum lost")),
        };

        // ACT & ASSERT
        assert!(matches!(err.last_cause(), AdminError::CoordinationPath { .. }));
    }

    // ============================================================
    // TEST 2: CommandRegistry - Registration and Dispatch
    // ============================================================

    #[tokio::test]
    async fn test_registry_register_and_execute() {
        // ARRANGE
        let registry = CommandRegistry::<Ctx>::new();
        registry.register("count", |ctx: Arc<Ctx>, payload| async move {
            ctx.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({ "echo": payload["value"] }))
        });

        // ASSERT: Command is registered
        assert!(registry.has_command("count"));
        assert_eq!(registry.command_count(), 1);

        // ACT
        let ctx = Arc::new(Ctx {
            calls: AtomicU32::new(0),
        });
        let task = AdminTask::new("count", serde_json::json!({ "value": 7 }));
        let result = registry.execute(&task, ctx.clone(), &fast(3)).await.unwrap();

        // ASSERT
        assert_eq!(result["echo"], 7);
        assert_eq!(ctx.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registry_unknown_command_is_not_retried() {
        // ARRANGE
        let registry = CommandRegistry::<Ctx>::new();
        let ctx = Arc::new(Ctx {
            calls: AtomicU32::new(0),
        });

        // ACT
        let result = registry
            .execute(&AdminTask::without_payload("nope"), ctx, &fast(3))
            .await;

        // ASSERT
        assert!(matches!(result, Err(AdminError::UnknownCommand(ref name)) if name == "nope"));
    }

    #[tokio::test]
    async fn test_registry_retries_failing_command() {
        // ARRANGE
        let registry = CommandRegistry::<Ctx>::new();
        registry.register("flaky", |ctx: Arc<Ctx>, _payload| async move {
            let n = ctx.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 2 {
                Err(AdminError::Transport("refused".to_string()))
            } else {
                Ok(serde_json::json!(n))
            }
        });

        // ACT
        let ctx = Arc::new(Ctx {
            calls: AtomicU32::new(0),
        });
        let result = registry
            .execute(&AdminTask::without_payload("flaky"), ctx.clone(), &fast(3))
            .await
            .unwrap();

        // ASSERT
        assert_eq!(result, serde_json::json!(2));
        assert_eq!(ctx.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_list_commands_is_sorted() {
        // ARRANGE
        let registry = CommandRegistry::<Ctx>::new();
        registry.register("b", |_ctx: Arc<Ctx>, _p| async { Ok(serde_json::Value::Null) });
        registry.register("a", |_ctx: Arc<Ctx>, _p| async { Ok(serde_json::Value::Null) });

        // ACT & ASSERT
        assert_eq!(registry.list_commands(), vec!["a", "b"]);
    }

    #[test]
    fn test_admin_task_defaults_to_empty_payload() {
        // ACT
        let task: AdminTask = serde_json::from_str(r#"{"command": "list-collections"}"#).unwrap();

        // ASSERT
        assert_eq!(task.command, "list-collections");
        assert!(task.payload.as_object().unwrap().is_empty());
    }
}
