//! 批量下载 - 编排层
//!
//! 把证书列表交给检索流程逐个处理，收集每个证书的结果。
//!
//! - `run_batch`：单个浏览器会话，严格按顺序处理
//! - `run_batch_pooled`：每个浏览器会话一个 worker，从共享计数器领取下一个证书
//!
//! 两种方式都不会提前终止，每个证书有且只有一个结果，结果按输入顺序排列。

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::browser::PageDriver;
use crate::models::{BatchResult, Item, RetrievalOutcome};
use crate::utils::logging::log_batch_complete;
use crate::workflow::{ItemCtx, RetrievalFlow};

/// 顺序处理所有证书
///
/// # 参数
/// - `items`: 证书列表
/// - `working_dir`: 下载目录
/// - `driver`: 页面驱动
/// - `flow`: 检索流程
pub async fn run_batch<D: PageDriver + ?Sized>(
    items: &[Item],
    working_dir: &Path,
    driver: &D,
    flow: &RetrievalFlow,
) -> BatchResult {
    let total = items.len();
    let mut result = BatchResult::default();

    for (idx, item) in items.iter().enumerate() {
        let ctx = ItemCtx::new(idx + 1, total, item.id.clone(), 1);
        result.record(flow.run(driver, item, working_dir, &ctx).await);
    }

    log_batch_complete(result.successes.len(), result.total());
    result
}

/// 多个浏览器会话同时处理
///
/// 每个驱动同一时间只处理一个证书；只有一个驱动时等同于 [`run_batch`]。
pub async fn run_batch_pooled<D: PageDriver>(
    items: &[Item],
    working_dir: &Path,
    drivers: &[D],
    flow: &RetrievalFlow,
) -> BatchResult {
    match drivers {
        [] => {
            warn!("⚠️ 没有可用的浏览器会话，跳过下载");
            return BatchResult::default();
        }
        [driver] => return run_batch(items, working_dir, driver, flow).await,
        _ => {}
    }

    let total = items.len();
    let next_index = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<RetrievalOutcome>>> =
        Mutex::new((0..total).map(|_| None).collect());

    let workers = drivers.iter().enumerate().map(|(session_idx, driver)| {
        let next_index = &next_index;
        let slots = &slots;
        async move {
            let session = session_idx + 1;
            let mut handled = 0usize;
            loop {
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items.get(idx) else {
                    break;
                };
                let ctx = ItemCtx::new(idx + 1, total, item.id.clone(), session);
                let outcome = flow.run(driver, item, working_dir, &ctx).await;
                slots.lock().await[idx] = Some(outcome);
                handled += 1;
            }
            debug!("会话#{} 空闲，共处理 {} 个证书", session, handled);
        }
    });
    join_all(workers).await;

    let result: BatchResult = slots.into_inner().into_iter().flatten().collect();
    log_batch_complete(result.successes.len(), result.total());
    result
}
