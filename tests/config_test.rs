#[cfg(test)]
mod tests {
    use std::env;
    use std::path::PathBuf;
    use std::time::Duration;

    use serial_test::serial;

    use errand::core::AppConfig;

    const KEYS: &[&str] = &[
        "ERRAND_ORDER_URL",
        "ERRAND_SLOW_MO_MS",
        "ERRAND_HEADLESS",
        "ERRAND_SCREENSHOT_DIR",
        "ERRAND_TIMEZONE",
    ];

    fn clear() {
        for key in KEYS {
            // Tests touching the environment are serialized
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn it_reads_the_process_environment() {
        clear();
        unsafe {
            env::set_var("ERRAND_ORDER_URL", "http://localhost:8080/order");
            env::set_var("ERRAND_SLOW_MO_MS", "100");
            env::set_var("ERRAND_HEADLESS", "yes");
            env::set_var("ERRAND_SCREENSHOT_DIR", "/tmp/errand-shots");
            env::set_var("ERRAND_TIMEZONE", "America/New_York");
        }

        let config = AppConfig::default();
        assert_eq!(config.order_url, "http://localhost:8080/order");
        assert_eq!(config.slow_mo, Duration::from_millis(100));
        assert!(config.headless);
        assert_eq!(config.screenshot_dir, PathBuf::from("/tmp/errand-shots"));
        assert_eq!(config.default_timezone, "America/New_York");
        clear();
    }

    #[test]
    #[serial]
    fn it_shows_the_browser_by_default() {
        clear();
        let config = AppConfig::default();
        assert!(!config.headless);
        assert_eq!(config.slow_mo, Duration::ZERO);
        assert_eq!(config.default_timezone, "UTC");
    }
}
