//! Check system capabilities.

use lectern_capture_engine::{EncoderFactory, FfmpegEncoderFactory};
use lectern_common::config::config_file_path;
use lectern_media_ffmpeg::capabilities::{
    all_required_available, check_capabilities, print_capability_report,
};

pub fn run() -> anyhow::Result<()> {
    println!("Lectern System Check");
    println!("{}", "=".repeat(50));
    println!("Config file: {}", config_file_path().display());
    println!();

    let capabilities = check_capabilities();
    print_capability_report(&capabilities);

    println!();
    match FfmpegEncoderFactory::new().select_codec() {
        Ok(codec) => println!(
            "[OK] Compiled lectures will be {} ({})",
            codec.container, codec.codecs
        ),
        Err(e) => println!("[MISSING] No usable output format: {e}"),
    }

    println!();
    if all_required_available(&capabilities) {
        println!("All required capabilities are available. Lectern is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
