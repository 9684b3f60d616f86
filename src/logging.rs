//! Log bootstrap for host binaries.

use log::LevelFilter;

/// Installs the colog logger at Info level. Call once at startup, before
/// any manager thread is spawned.
pub fn init() {
    init_with_level(LevelFilter::Info);
}

pub fn init_with_level(level: LevelFilter) {
    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}

/// Routes panics from worker threads into the log instead of stderr.
pub fn install_panic_log_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));
}
