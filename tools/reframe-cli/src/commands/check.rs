//! Check that the media tools are usable.

use std::path::Path;
use std::process::{Command, Stdio};

use reframe_common::config::AppConfig;
use reframe_render_engine::{ExportEngine, FfmpegBackend};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reframe System Check");
    println!("{}", "=".repeat(50));

    let engine = FfmpegBackend::new(&config.tools.ffmpeg);
    let ffmpeg_ok = engine.is_available();
    report("ffmpeg", &config.tools.ffmpeg, ffmpeg_ok);
    let ffprobe_ok = tool_version(&config.tools.ffprobe).is_some();
    report("ffprobe", &config.tools.ffprobe, ffprobe_ok);

    println!();
    println!("Output directory: {}", config.output_dir().display());
    if let Err(e) = config.render.validate() {
        println!("[WARN] {e}");
    }

    println!();
    if ffmpeg_ok && ffprobe_ok {
        println!("All required tools are available. Reframe is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg or set tool paths in the config.");
    }
    Ok(())
}

fn report(name: &str, path: &Path, ok: bool) {
    if !ok {
        println!("[MISSING] {name}: {}", path.display());
        return;
    }
    match tool_version(path) {
        Some(version) => println!("[OK] {name}: {version}"),
        None => println!("[OK] {name}: {}", path.display()),
    }
}

/// First line of `<tool> -version`.
fn tool_version(path: &Path) -> Option<String> {
    let output = Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}
