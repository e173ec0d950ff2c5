//! Desktop launcher for the stereo video player

#[cfg(not(target_os = "android"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = stereo_video_core::run_desktop() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

// Android starts through `android_main` in the library
#[cfg(target_os = "android")]
fn main() {}
