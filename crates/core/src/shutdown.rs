use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// 运行关闭信号
///
/// 由信号处理任务触发一次；执行器据此终止子进程，调度器据此停止派发。
/// 发送端被取走即视为已关闭，之后的订阅会拿到一个已触发的接收端。
#[derive(Clone)]
pub struct ShutdownManager {
    sender: Arc<RwLock<Option<broadcast::Sender<()>>>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender: Arc::new(RwLock::new(Some(sender))),
        }
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<()> {
        match self.sender.read().await.as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(1);
                let _ = sender.send(());
                receiver
            }
        }
    }

    /// 触发关闭，重复调用无效果
    pub async fn shutdown(&self) {
        let Some(sender) = self.sender.write().await.take() else {
            debug!("运行已处于关闭状态");
            return;
        };
        info!("触发运行关闭，通知 {} 个订阅者", sender.receiver_count());
        let _ = sender.send(());
    }

    pub async fn is_shutdown(&self) -> bool {
        self.sender.read().await.is_none()
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_in_flight_subscriber_is_notified_through_clone() {
        let manager = ShutdownManager::new();
        let mut rx = manager.subscribe().await;

        manager.clone().shutdown().await;

        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_ok());
        assert!(manager.is_shutdown().await);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_shutdown_immediately() {
        let manager = ShutdownManager::new();
        manager.shutdown().await;
        manager.shutdown().await;

        let mut rx = manager.subscribe().await;
        assert!(rx.try_recv().is_ok());
    }
}
