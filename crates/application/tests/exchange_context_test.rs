use dohgate_application::ports::ExchangeContext;
use dohgate_domain::DomainError;
use std::time::Duration;

#[tokio::test]
async fn test_run_passes_through_result() {
    let ctx = ExchangeContext::new(Duration::from_secs(1));
    let value = ctx.run("upstream", async { Ok::<_, DomainError>(7) }).await.unwrap();
    assert_eq!(value, 7);
}

#[tokio::test(start_paused = true)]
async fn test_run_times_out_at_deadline() {
    let ctx = ExchangeContext::new(Duration::from_millis(100));

    let err = ctx
        .run("udp://192.0.2.53:53", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, DomainError>(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::TransportTimeout { ref server } if server == "udp://192.0.2.53:53"));
}

#[tokio::test]
async fn test_cancelled_context_wins() {
    let ctx = ExchangeContext::new(Duration::from_secs(5));
    ctx.cancellation().cancel();

    let err = ctx
        .run("upstream", std::future::pending::<Result<(), DomainError>>())
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Cancelled));
}

#[test]
fn test_narrowed_never_extends_deadline() {
    let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    rt.block_on(async {
        let ctx = ExchangeContext::new(Duration::from_secs(1));
        assert!(ctx.narrowed(Duration::from_secs(60)).deadline() <= ctx.deadline());
        assert!(ctx.narrowed(Duration::from_millis(10)).deadline() < ctx.deadline());
    });
}
