use std::{
    path::{Path, PathBuf},
    process::Command,
};

fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

fn poseover_exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_poseover")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "poseover.exe"
            } else {
                "poseover"
            });
            p
        })
}

fn synth_inputs(root: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(root)?;

    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "color=c=0x404040:size=320x180:rate=25",
            "-t",
            "1",
            "-pix_fmt",
            "yuv420p",
            "-c:v",
            "libx264",
        ])
        .arg(root.join("bg.mp4"))
        .status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating bg.mp4");

    let fg_dir = root.join("fg");
    std::fs::create_dir_all(&fg_dir)?;
    for i in 0..3 {
        image::RgbaImage::from_pixel(48, 48, image::Rgba([240, 80, 40, 255]))
            .save(fg_dir.join(format!("{i:04}.png")))?;
    }

    let frames: Vec<serde_json::Value> = (0..3)
        .map(|i| serde_json::json!({"t_ms": i * 40, "roll": 5.0}))
        .collect();
    std::fs::write(
        root.join("timeline.pose.json"),
        serde_json::Value::Array(frames).to_string(),
    )?;

    Ok(())
}

#[test]
fn cli_frame_writes_png() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return Ok(());
    }

    let root = PathBuf::from("target").join("cli_smoke");
    let _ = std::fs::remove_dir_all(&root);
    synth_inputs(&root)?;

    let out_png = root.join("frame0.png");
    let timeline = root.join("timeline.pose.json");
    let bg = root.join("bg.mp4");
    let fg = root.join("fg");

    let status = Command::new(poseover_exe())
        .arg("frame")
        .args(["--timeline"])
        .arg(&timeline)
        .arg("--bg")
        .arg(&bg)
        .arg("--fg-dir")
        .arg(&fg)
        .args(["--canvas-w", "320", "--canvas-h", "180", "--frame", "0", "--out"])
        .arg(&out_png)
        .status()?;

    assert!(status.success());
    assert!(out_png.exists());

    let img = image::open(&out_png)?;
    assert_eq!(img.width(), 320);
    assert_eq!(img.height(), 180);
    Ok(())
}
