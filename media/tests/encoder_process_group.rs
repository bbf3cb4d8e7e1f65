//! The encoder child must not share the daemon's process group, otherwise a
//! terminal Ctrl-C kills encodes that shutdown is supposed to let finish.

#![cfg(target_os = "linux")]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use marca_media::ffmpeg::FfmpegCommand;
use tempfile::TempDir;

/// Stand-in `ffmpeg`: fails when it is in its parent's process group,
/// otherwise writes its last argument like a finished encode.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
read -r _ _ _ _ own _ < /proc/$$/stat
read -r _ _ _ _ parent _ < /proc/$PPID/stat
if [ "$own" = "$parent" ]; then
    echo "shares process group $own with the caller" >&2
    exit 1
fi
sleep 0.2
for last; do :; done
printf encoded > "$last"
"#;

fn install_fake_ffmpeg(bin: &Path) {
    let script = bin.join("ffmpeg");
    std::fs::write(&script, FAKE_FFMPEG).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let path = std::env::var_os("PATH").unwrap_or_default();
    let mut dirs = vec![bin.to_path_buf()];
    dirs.extend(std::env::split_paths(&path));
    let joined = std::env::join_paths(dirs).unwrap();
    // Only test in this binary, nothing else reads the environment concurrently.
    unsafe { std::env::set_var("PATH", joined) };
}

#[tokio::test]
async fn test_encoder_runs_in_its_own_process_group() {
    let dir = TempDir::new().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir(&bin).unwrap();
    install_fake_ffmpeg(&bin);

    let out = dir.path().join(".ma_clip.part.mp4");
    let result = FfmpegCommand::new(&out)
        .input(dir.path().join("clip.mp4"))
        .run()
        .await;

    assert!(result.is_ok(), "encode failed: {result:?}");
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "encoded");
}
