//! 会话指标收集模块
//!
//! 记录 tick、同步漂移与分发延迟，并在内存中聚合出会话摘要。

use metrics::{counter, gauge, histogram};

/// 记录一次 tick 的结果
pub fn record_tick(drained: usize, emitted: usize) {
    counter!("udp_events_ticks_total").increment(1);
    if drained > 0 {
        histogram!("udp_events_tick_emitted").record(emitted as f64);
    }
}

/// 记录软事件从接收到写入数据流的延迟 (毫秒)
pub fn record_dispatch_latency_ms(latency_ms: f64) {
    histogram!("udp_events_dispatch_latency_ms").record(latency_ms);
}

/// 记录相邻两次同步之间 soft_sample_zero 的变化量 (采样数)
///
/// 持续增长说明两端时钟存在漂移。
pub fn record_sync_drift(drift_samples: i64) {
    gauge!("udp_events_sync_drift_samples").set(drift_samples as f64);
    histogram!("udp_events_sync_drift_abs_samples").record(drift_samples.unsigned_abs() as f64);
}

/// 导出监听器累计计数
pub fn record_listener_totals(datagrams: u64, decode_errors: u64, acks: u64) {
    gauge!("udp_events_listener_datagrams").set(datagrams as f64);
    gauge!("udp_events_listener_decode_errors").set(decode_errors as f64);
    gauge!("udp_events_listener_acks").set(acks as f64);
}

/// 会话指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    /// tick 总数
    pub total_ticks: u64,

    /// 从队列取出的软事件总数
    pub total_drained: u64,

    /// 写入数据流的事件总数 (含同步标记)
    pub total_emitted: u64,

    /// 完成的同步配对数
    pub total_syncs: u64,

    /// 因未同步而丢弃的事件数
    pub total_unsynchronized: u64,

    /// 上一次同步的 soft_sample_zero
    last_soft_sample_zero: Option<i64>,

    /// 同步漂移统计 (采样数)
    pub drift_stats: RunningStats,

    /// 分发延迟统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 每个非空 tick 取出的事件数
    pub batch_stats: RunningStats,
}

impl SessionMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新 tick 统计
    pub fn record_tick(
        &mut self,
        drained: usize,
        emitted: usize,
        syncs: usize,
        unsynchronized: usize,
    ) {
        self.total_ticks += 1;
        self.total_drained += drained as u64;
        self.total_emitted += emitted as u64;
        self.total_syncs += syncs as u64;
        self.total_unsynchronized += unsynchronized as u64;

        if drained > 0 {
            self.batch_stats.push(drained as f64);
        }
    }

    /// 记录一次完成的同步，返回相对上一次的漂移
    pub fn record_sync(&mut self, soft_sample_zero: i64) -> Option<i64> {
        let drift = self
            .last_soft_sample_zero
            .map(|previous| soft_sample_zero.saturating_sub(previous));
        if let Some(drift) = drift {
            self.drift_stats.push(drift as f64);
        }
        self.last_soft_sample_zero = Some(soft_sample_zero);
        drift
    }

    /// 记录分发延迟
    pub fn record_latency_ms(&mut self, latency_ms: f64) {
        self.latency_stats.push(latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total_ticks: self.total_ticks,
            total_drained: self.total_drained,
            total_emitted: self.total_emitted,
            total_syncs: self.total_syncs,
            total_unsynchronized: self.total_unsynchronized,
            unsynchronized_rate: if self.total_drained > 0 {
                self.total_unsynchronized as f64 / self.total_drained as f64 * 100.0
            } else {
                0.0
            },
            drift_samples: StatsSummary::from(&self.drift_stats),
            dispatch_latency_ms: StatsSummary::from(&self.latency_stats),
            events_per_batch: StatsSummary::from(&self.batch_stats),
        }
    }
}

/// 会话摘要
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub total_ticks: u64,
    pub total_drained: u64,
    pub total_emitted: u64,
    pub total_syncs: u64,
    pub total_unsynchronized: u64,
    pub unsynchronized_rate: f64,
    pub drift_samples: StatsSummary,
    pub dispatch_latency_ms: StatsSummary,
    pub events_per_batch: StatsSummary,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Metrics Summary ===")?;
        writeln!(f, "Ticks: {}", self.total_ticks)?;
        writeln!(f, "Soft events drained: {}", self.total_drained)?;
        writeln!(f, "Stream events emitted: {}", self.total_emitted)?;
        writeln!(f, "Syncs completed: {}", self.total_syncs)?;
        writeln!(
            f,
            "Unsynchronized drops: {} ({:.2}%)",
            self.total_unsynchronized, self.unsynchronized_rate
        )?;
        writeln!(f, "Sync drift (samples): {}", self.drift_samples)?;
        writeln!(f, "Dispatch latency (ms): {}", self.dispatch_latency_ms)?;
        writeln!(f, "Events per batch: {}", self.events_per_batch)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_tick_totals() {
        let mut aggregator = SessionMetricsAggregator::new();
        aggregator.record_tick(0, 0, 0, 0);
        aggregator.record_tick(4, 3, 1, 1);
        aggregator.record_tick(2, 2, 0, 0);

        assert_eq!(aggregator.total_ticks, 3);
        assert_eq!(aggregator.total_drained, 6);
        assert_eq!(aggregator.total_emitted, 5);
        assert_eq!(aggregator.total_syncs, 1);
        assert_eq!(aggregator.batch_stats.count(), 2);

        let summary = aggregator.summary();
        assert!((summary.unsynchronized_rate - 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_sync_drift() {
        let mut aggregator = SessionMetricsAggregator::new();
        assert_eq!(aggregator.record_sync(-3000), None);
        assert_eq!(aggregator.record_sync(-2990), Some(10));
        assert_eq!(aggregator.record_sync(-2985), Some(5));
        assert_eq!(aggregator.drift_stats.count(), 2);
        assert!((aggregator.drift_stats.mean() - 7.5).abs() < 1e-10);
    }

    #[test]
    fn test_sync_drift_saturates() {
        let mut aggregator = SessionMetricsAggregator::new();
        aggregator.record_sync(i64::MIN);
        assert_eq!(aggregator.record_sync(i64::MAX), Some(i64::MAX));
        assert_eq!(aggregator.record_sync(i64::MIN), Some(i64::MIN));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SessionMetricsAggregator::new();
        aggregator.record_tick(10, 9, 1, 1);
        aggregator.record_latency_ms(2.0);

        let output = aggregator.summary().to_string();
        assert!(output.contains("Ticks: 1"));
        assert!(output.contains("Unsynchronized drops: 1 (10.00%)"));
        assert!(output.contains("Sync drift (samples): N/A"));
    }
}
