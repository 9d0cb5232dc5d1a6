//! Build script for marquee-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates marquee.toml at compile time
//! - Embeds the validated configuration as a postcard blob

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use marquee_core::config::MarqueeConfig;

/// Panel geometry the HUB75 driver is built for
const PANEL_WIDTH: u16 = 128;
const PANEL_HEIGHT: u16 = 32;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    setup_linker(&out_dir);
    embed_config(&out_dir);
}

/// Set up linker search paths for memory.x
fn setup_linker(out_dir: &Path) {
    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate marquee.toml and write it to OUT_DIR as a postcard blob
fn embed_config(out_dir: &Path) {
    println!("cargo:rerun-if-changed=marquee.toml");

    let config_path = Path::new("marquee.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: marquee.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a marquee.toml configuration file.        ║\n\
            ║  Please create one in the marquee-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read marquee.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Syntax and field types in one pass
    let config: MarqueeConfig = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid marquee.toml                                     ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    if let Err(e) = config.validate() {
        errors.push(e.to_string());
    }
    if config.display.width != PANEL_WIDTH || config.display.height != PANEL_HEIGHT {
        errors.push(format!(
            "[display] must be {}x{} for this board",
            PANEL_WIDTH, PANEL_HEIGHT
        ));
    }
    if config.feeds.username.is_empty() {
        errors.push("[feeds] username cannot be empty".to_string());
    }
    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in marquee.toml                    ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    if config.credentials.api_key.is_empty() {
        println!("cargo:warning=marquee.toml has no API key; feed requests will be refused");
    }

    let blob = config.to_blob().unwrap();
    fs::write(out_dir.join("marquee.bin"), blob).unwrap();

    println!("cargo:warning=marquee.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
