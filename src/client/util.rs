use std::future::Future;
use std::time::Duration;

pub trait Timeout: Sized {
  fn timeout(self, duration: Duration) -> tokio::time::Timeout<Self>;
}

impl<F> Timeout for F
where
  F: Future,
{
  fn timeout(self, duration: Duration) -> tokio::time::Timeout<Self> {
    tokio::time::timeout(duration, self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn elapses() {
    let result = std::future::pending::<()>()
      .timeout(Duration::from_millis(10))
      .await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn completes() {
    assert_eq!(async { 1 }.timeout(Duration::from_secs(1)).await.ok(), Some(1));
  }
}
