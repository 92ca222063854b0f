use std::sync::LazyLock;

use prometheus::*;

static METRIC_SEARCH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("clipsearch_search_count", "count of the searches", &["kind"])
        .unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "clipsearch_search_duration",
        "duration of the per-query search in seconds",
        &["kind"],
        exponential_buckets(1e-5, 4.0, 10).unwrap()
    )
    .unwrap()
});

static METRIC_BUILD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("clipsearch_build_duration", "duration of the index build in seconds")
        .unwrap()
});

static METRIC_EVAL_PRECISION: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge!("clipsearch_eval_precision", "mean precision@k of the last evaluation")
        .unwrap()
});

/// 记录一次搜索，kind 为 `approximate` 或 `exact`
pub fn observe_search(kind: &str, duration: f64) {
    METRIC_SEARCH_COUNT.with_label_values(&[kind]).inc();
    METRIC_SEARCH_DURATION.with_label_values(&[kind]).observe(duration);
}

pub fn observe_build(duration: f64) {
    METRIC_BUILD_DURATION.observe(duration);
}

pub fn set_eval_precision(precision: f64) {
    METRIC_EVAL_PRECISION.set(precision);
}

/// 以文本格式导出当前进程中的所有指标
pub fn gather_text() -> anyhow::Result<String> {
    let mut buf = String::new();
    TextEncoder::new().encode_utf8(&prometheus::gather(), &mut buf)?;
    Ok(buf)
}
