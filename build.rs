//! Build script for ufw-sweep
//!
//! Handles compile-time configuration for distro packagers and embeds
//! build-time information (git commit, dirty status, build timestamp).

fn main() {
    // Re-run build if the packager override changes
    println!("cargo:rerun-if-env-changed=UFW_SWEEP_SYSTEM_UFW_PATH");

    // Embed git commit, build time, and dirty status
    shadow_rs::ShadowBuilder::builder()
        .build()
        .expect("Failed to generate build info");
}
