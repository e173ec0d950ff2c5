//! Build script for stereo_video_core
//! Links the Android NDK media library used by the MediaCodec decoder

fn main() {
    // Only for Android targets
    if std::env::var("CARGO_CFG_TARGET_OS").map_or(false, |os| os == "android") {
        // AMediaCodec / AMediaExtractor live in libmediandk
        println!("cargo:rustc-link-lib=mediandk");
    }
}
