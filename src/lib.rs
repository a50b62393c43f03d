pub use easymatch_core as core;
pub use easymatch_features as features;

/// Initialize a single global Rayon thread pool for detection, description
/// and matching.
///
/// Call this once at application startup before comparing images.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `EASYMATCH_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    easymatch_core::init_global_thread_pool(num_threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_pool_init_is_idempotent() {
        let first = init_thread_pool(Some(2));
        let second = init_thread_pool(Some(4));
        assert_eq!(first, second);
        assert!(easymatch_core::current_cpu_threads() >= 1);
    }
}
