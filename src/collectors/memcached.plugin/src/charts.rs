//! Charts declared for every memcached target.

use rt::{Chart, ChartError, DimensionAlgorithm};

use rt::DimensionAlgorithm::{Absolute, Incremental};

type ChartSpec = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str, DimensionAlgorithm)],
);

/// (id, title, units, context, dimensions)
const CHARTS: &[ChartSpec] = &[
    ("uptime", "Uptime", "seconds", "memcached.uptime", &[("uptime", "current", Absolute)]),
    (
        "items",
        "Items",
        "count",
        "memcached.items",
        &[("curr_items", "current", Absolute), ("total_items", "total", Incremental)],
    ),
    (
        "memory",
        "Memory",
        "bytes",
        "memcached.memory",
        &[("bytes", "current", Absolute), ("limit_maxbytes", "max", Absolute)],
    ),
    (
        "connections",
        "Connections",
        "count",
        "memcached.connections",
        &[
            ("max_connections", "max", Absolute),
            ("curr_connections", "current", Absolute),
            ("total_connections", "total", Incremental),
            ("rejected_connections", "rejected", Incremental),
            ("accepting_conns", "accepting", Absolute),
            ("listen_disabled_num", "disabled", Absolute),
            ("conn_yields", "yield", Absolute),
        ],
    ),
    (
        "requests",
        "Requests",
        "requests",
        "memcached.requests",
        &[
            ("cmd_get", "get", Incremental),
            ("cmd_set", "set", Incremental),
            ("cmd_flush", "flush", Incremental),
            ("cmd_touch", "touch", Incremental),
        ],
    ),
    (
        "get_requests",
        "Get requests",
        "requests",
        "memcached.get_requests",
        &[
            ("get_hits", "hits", Incremental),
            ("get_misses", "misses", Incremental),
            ("get_expired", "expired", Incremental),
            ("get_flushed", "flushed", Incremental),
        ],
    ),
    (
        "delete_requests",
        "Delete requests",
        "requests",
        "memcached.delete_requests",
        &[("delete_hits", "hits", Incremental), ("delete_misses", "misses", Incremental)],
    ),
    (
        "incr_requests",
        "Incr requests",
        "requests",
        "memcached.incr_requests",
        &[("incr_hits", "hits", Incremental), ("incr_misses", "misses", Incremental)],
    ),
    (
        "decr_requests",
        "Decr requests",
        "requests",
        "memcached.decr_requests",
        &[("decr_hits", "hits", Incremental), ("decr_misses", "misses", Incremental)],
    ),
    (
        "cas_requests",
        "CAS requests",
        "requests",
        "memcached.cas_requests",
        &[
            ("cas_hits", "hits", Incremental),
            ("cas_misses", "misses", Incremental),
            ("cas_badval", "badval", Incremental),
        ],
    ),
    (
        "touch_requests",
        "Touch requests",
        "requests",
        "memcached.touch_requests",
        &[("touch_hits", "hits", Incremental), ("touch_misses", "misses", Incremental)],
    ),
    (
        "auth_requests",
        "Auth requests",
        "requests",
        "memcached.auth_requests",
        &[("auth_cmds", "total", Incremental), ("auth_errors", "errors", Incremental)],
    ),
    (
        "net",
        "Network",
        "bytes",
        "memcached.net",
        &[("bytes_read", "in", Incremental), ("bytes_written", "out", Incremental)],
    ),
    (
        "lru",
        "LRU",
        "items",
        "memcached.lru",
        &[
            ("expired_unfetched", "expired_unfetched", Incremental),
            ("evicted_unfetched", "evicted_unfetched", Incremental),
            ("evicted_active", "evicted_active", Incremental),
            ("moves_to_cold", "moves_to_cold", Incremental),
            ("moves_to_warm", "moves_to_warm", Incremental),
            ("moves_within_lru", "moves_within_lru", Incremental),
        ],
    ),
    (
        "cpu",
        "CPU usage",
        "percentage",
        "memcached.cpu",
        &[("cpu_user", "user", Absolute), ("cpu_system", "system", Absolute)],
    ),
];

/// Chart type for a target: `memcached_<address>` with separators flattened.
pub fn instance(target: &str) -> String {
    format!("memcached_{}", rt::sanitize(target))
}

/// Every chart of one target. The family is the target address, so chart
/// keys stay unique across targets.
pub fn instance_charts(target: &str) -> Result<Vec<Chart>, ChartError> {
    let chart_type = instance(target);

    CHARTS
        .iter()
        .map(|(id, title, units, context, dimensions)| {
            let mut chart = Chart::new(&chart_type, *id, "", *title, *units, target, *context);
            // stats keys like cpu_user are dimensions, not per-entity series
            chart.set_dynamic_dimensions(false);
            for (dim, name, algorithm) in dimensions.iter() {
                chart.add_dimension(*dim, *name, *algorithm)?;
            }
            Ok(chart)
        })
        .collect()
}
