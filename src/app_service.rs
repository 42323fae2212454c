use crate::app_state::AppEvent;
use crate::linking::Linker;
use log::warn;
use tokio::sync::mpsc;

pub async fn refresh_ui(linker: &Linker, tx: &mpsc::UnboundedSender<AppEvent>) {
    // 1. 重新计算全部农户-作物组合
    match linker.dashboard().await {
        Ok(data) => {
            let _ = tx.send(AppEvent::Dashboard(data));
        }
        Err(e) => {
            warn!("dashboard refresh failed: {}", e);
            let _ = tx.send(AppEvent::Error(format!("✗ 总览刷新失败: {}", e)));
        }
    }

    // 2. 两张表的行数
    refresh_stats(linker, tx).await;
}

pub async fn refresh_stats(linker: &Linker, tx: &mpsc::UnboundedSender<AppEvent>) {
    match linker.database_stats().await {
        Ok(stats) => {
            let _ = tx.send(AppEvent::Stats(stats));
        }
        Err(e) => {
            warn!("stats refresh failed: {}", e);
            let _ = tx.send(AppEvent::Error(format!("✗ 统计刷新失败: {}", e)));
        }
    }
}
