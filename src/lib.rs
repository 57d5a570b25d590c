pub mod api;
pub mod core;

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("scrollshot_rust"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // host application installs its own `log` backend
    }
}
