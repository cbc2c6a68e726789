/// Read-through caching over a [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$fut`, queues the result for a background write with `$ttl` seconds to
/// live, and returns it. Errors from the lookup or from `$fut` propagate
/// with `?`, so the surrounding function must return an `AppResult`.
///
/// ```rust,ignore
/// let popular: Vec<MovieResult> = cached!(cache, CacheKey::Popular(n), ttl, async {
///     recommender.popular(n)
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $fut:expr) => {{
        let key = $key;
        if let Some(hit) = $cache.get_from_cache(&key).await? {
            Ok(hit)
        } else {
            let value = $fut.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
