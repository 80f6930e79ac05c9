use std::sync::Once;

use log::LevelFilter;

pub(crate) fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    #[cfg(all(target_arch = "wasm32", feature = "console_error_panic_hook"))]
    console_error_panic_hook::set_once();
}

// guarding with a `Once` prevents us from accidentally initializing the logger more than once
static LOGGER: Once = Once::new();

/// The first feed to be created picks the level.
pub(crate) fn init_logging(level: LevelFilter) {
    LOGGER.call_once(|| {
        set_panic_hook();

        #[cfg(target_arch = "wasm32")]
        {
            if let Some(level) = level.to_level() {
                wasm_logger::init(wasm_logger::Config::new(level));
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            // RUST_LOG still wins, so a single test can be made chatty
            let _ = env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .is_test(cfg!(test))
                .try_init();
        }

        log::info!("Logging initialized");
    });
}
