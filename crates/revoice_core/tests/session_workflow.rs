//! End-to-end session workflow tests against stub ffmpeg/ffprobe binaries.
//!
//! The stubs answer probes with canned JSON keyed on the input extension
//! and create output files on invocation, so the full orchestration path
//! (probe, extract, convert, rebuild, cleanup) runs without a real ffmpeg
//! installation.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use revoice_core::{
    FfmpegError, FfmpegSession, FfmpegTool, MediaContainer, Stream, StreamKind,
};

const FFPROBE_STUB: &str = r#"#!/bin/sh
printf '%s\n' "$@" >> "$0.log"
for a in "$@"; do last="$a"; done
case "$last" in
  *.videoonly.mp4) cat <<'EOF'
{"streams":[{"index":0,"codec_name":"h264","codec_type":"video"}],
 "format":{"format_name":"mov,mp4,m4a","duration":"10.000000"}}
EOF
  ;;
  *.mp4|*.mkv) cat <<'EOF'
{"streams":[{"index":0,"codec_name":"h264","codec_type":"video"},
            {"index":1,"codec_name":"aac","codec_type":"audio","tags":{"language":"rus"}}],
 "format":{"format_name":"mov,mp4,m4a","duration":"10.000000"}}
EOF
  ;;
  *.wav) cat <<'EOF'
{"streams":[{"index":0,"codec_name":"pcm_s16le","codec_type":"audio"}],
 "format":{"format_name":"wav","duration":"10.000000"}}
EOF
  ;;
  *) cat <<'EOF'
{"streams":[{"index":0,"codec_name":"aac","codec_type":"audio"}],
 "format":{"format_name":"aac","duration":"10.000000"}}
EOF
  ;;
esac
"#;

const FFMPEG_STUB: &str = r#"#!/bin/sh
printf '%s\n' "$@" >> "$0.log"
for a in "$@"; do last="$a"; done
printf 'stub output' > "$last"
"#;

/// Install the stub binaries into a fresh directory, returning the ffmpeg
/// path. The ffprobe path is derived as its sibling.
fn install_stubs(dir: &Path) -> PathBuf {
    let ffmpeg = dir.join("ffmpeg");
    let ffprobe = dir.join("ffprobe");
    fs::write(&ffmpeg, FFMPEG_STUB).unwrap();
    fs::write(&ffprobe, FFPROBE_STUB).unwrap();
    for bin in [&ffmpeg, &ffprobe] {
        fs::set_permissions(bin, fs::Permissions::from_mode(0o755)).unwrap();
    }
    ffmpeg
}

/// Every argument the stub at `bin` has been invoked with, one per line,
/// across all invocations.
fn recorded_args(bin: &Path) -> Vec<String> {
    let mut log = bin.as_os_str().to_os_string();
    log.push(".log");
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// The argument following each occurrence of `flag`, in order.
fn args_after(argv: &[String], flag: &str) -> Vec<String> {
    argv.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].clone())
        .collect()
}

#[test]
fn get_info_models_probed_streams() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mp4");
    fs::write(&movie, b"original container").unwrap();

    let session = FfmpegSession::open(install_stubs(dir.path())).unwrap();
    let container = session.get_info(&movie).unwrap();

    assert_eq!(container.len(), 2);
    assert_eq!(container.format.as_deref(), Some("mov,mp4,m4a"));
    assert_eq!(container.first_of(StreamKind::Video).unwrap().index, 0);
    let audio = container.first_of(StreamKind::Audio).unwrap();
    assert_eq!(audio.index, 1);
    assert_eq!(audio.language.as_deref(), Some("rus"));
    assert_eq!(audio.source_path, movie);
}

#[test]
fn edit_video_without_replace_creates_suffixed_destination() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mp4");
    fs::write(&movie, b"original container").unwrap();

    let mut session = FfmpegSession::open(install_stubs(dir.path())).unwrap();

    let mut handed_off: Option<PathBuf> = None;
    let dest = session
        .edit_video(
            &movie,
            |wav| {
                handed_off = Some(wav.to_path_buf());
                Ok(())
            },
            false,
        )
        .unwrap();

    // Destination carries the fixed suffix and was materialized
    assert_eq!(dest, dir.path().join("movie_replaced.mp4"));
    assert_eq!(fs::read(&dest).unwrap(), b"stub output");
    // The original is untouched
    assert_eq!(fs::read(&movie).unwrap(), b"original container");

    // The callback received the intermediate wav, which survives until close
    let wav = handed_off.expect("processing callback was invoked");
    assert_eq!(wav.extension().unwrap(), "wav");
    assert!(wav.starts_with(session.temp_dir()));
    assert!(wav.exists());

    session.close();
    assert!(!wav.exists());
    // The destination is not a temp artifact and survives the session
    assert!(dest.exists());
}

#[test]
fn edit_video_with_replace_swaps_original_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mp4");
    fs::write(&movie, b"original container").unwrap();

    let mut session = FfmpegSession::open(install_stubs(dir.path())).unwrap();
    let dest = session.edit_video(&movie, |_| Ok(()), true).unwrap();

    assert_eq!(dest, movie);
    assert_eq!(fs::read(&movie).unwrap(), b"stub output");
    // No sibling suffixed file appears
    assert!(!dir.path().join("movie_replaced.mp4").exists());
}

#[test]
fn edit_video_refuses_existing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mp4");
    fs::write(&movie, b"original container").unwrap();
    let occupied = dir.path().join("movie_replaced.mp4");
    fs::write(&occupied, b"occupied").unwrap();

    let mut session = FfmpegSession::open(install_stubs(dir.path())).unwrap();
    let result = session.edit_video(&movie, |_| Ok(()), false);

    assert!(matches!(result, Err(FfmpegError::DestinationExists(_))));
    assert_eq!(fs::read(&occupied).unwrap(), b"occupied");
}

#[test]
fn processor_failure_surfaces_but_cleanup_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mp4");
    fs::write(&movie, b"original container").unwrap();

    let mut session = FfmpegSession::open(install_stubs(dir.path())).unwrap();

    let mut handed_off: Option<PathBuf> = None;
    let result = session.edit_video(
        &movie,
        |wav| {
            handed_off = Some(wav.to_path_buf());
            Err("tts engine crashed".into())
        },
        false,
    );
    assert!(matches!(result, Err(FfmpegError::ProcessorFailed(_))));

    // No destination was built and the original is untouched
    assert!(!dir.path().join("movie_replaced.mp4").exists());
    assert_eq!(fs::read(&movie).unwrap(), b"original container");

    // Intermediates from before the failure are still cleaned at close
    let wav = handed_off.unwrap();
    assert!(wav.exists());
    assert!(session.close().is_empty());
    assert!(!wav.exists());
}

#[test]
fn extract_audio_fails_on_video_only_container() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("clip.videoonly.mp4");
    fs::write(&movie, b"container").unwrap();

    let mut session = FfmpegSession::open(install_stubs(dir.path())).unwrap();
    let result = session.extract_audio(&movie);

    assert!(matches!(
        result,
        Err(FfmpegError::StreamNotFound {
            kind: StreamKind::Audio,
            nth: 0,
            ..
        })
    ));
}

#[test]
fn extract_and_convert_register_artifacts_deleted_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mkv");
    fs::write(&movie, b"container").unwrap();

    let extracted;
    let converted;
    {
        let mut session = FfmpegSession::open(install_stubs(dir.path())).unwrap();
        extracted = session.extract_audio(&movie).unwrap();
        converted = session
            .convert_audio(&extracted, revoice_core::AudioFormat::Wav)
            .unwrap();
        assert_eq!(extracted.extension().unwrap(), "aac");
        assert_eq!(converted.extension().unwrap(), "wav");
        assert!(extracted.exists());
        assert!(converted.exists());
        // Session dropped without an explicit close
    }
    assert!(!extracted.exists());
    assert!(!converted.exists());
}

#[test]
fn tool_timeout_kills_hanging_process() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = dir.path().join("ffmpeg");
    fs::write(&ffmpeg, "#!/bin/sh\nsleep 5\n").unwrap();
    fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();

    let tool = FfmpegTool::new(&ffmpeg).with_timeout(Duration::from_millis(200));
    let start = Instant::now();
    let result = tool.verify();

    assert!(matches!(result, Err(FfmpegError::ToolTimeout { .. })));
    // The child was killed rather than waited out
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn analyze_folder_aggregates_codecs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"container").unwrap();
    fs::write(dir.path().join("b.mkv"), b"container").unwrap();

    let stub_dir = tempfile::tempdir().unwrap();
    let session = FfmpegSession::open(install_stubs(stub_dir.path())).unwrap();
    let summary = session.analyze_folder(dir.path()).unwrap();

    assert_eq!(summary.files, 2);
    assert!(summary.video_codecs.contains("h264"));
    assert!(summary.audio_codecs.contains("aac"));
    assert!(summary.audio_languages.contains("rus"));
}

#[test]
fn build_maps_streams_across_sources_in_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = install_stubs(dir.path());

    let movie = dir.path().join("movie.mkv");
    let dubbed = dir.path().join("dub.wav");
    fs::write(&movie, b"container").unwrap();
    fs::write(&dubbed, b"audio").unwrap();

    let mut container = MediaContainer::new();
    container
        .add(Stream::new(0, StreamKind::Video, "h264", &movie))
        .unwrap();
    container
        .add(Stream::new(1, StreamKind::Audio, "aac", &movie).with_source_index(1))
        .unwrap();
    container
        .add(Stream::new(2, StreamKind::Audio, "pcm_s16le", &dubbed))
        .unwrap();

    let out = dir.path().join("out.mkv");
    FfmpegTool::new(&ffmpeg)
        .build_container(&out, &container, false)
        .unwrap();

    let argv = recorded_args(&ffmpeg);
    // Each source file is passed once, in first-reference order
    assert_eq!(
        args_after(&argv, "-i"),
        vec![movie.display().to_string(), dubbed.display().to_string()]
    );
    // One map per stream, ascending container index, each against its own
    // input and source-local ordinal
    assert_eq!(args_after(&argv, "-map"), vec!["0:0", "0:1", "1:0"]);
}

#[test]
fn mp4_build_drops_subtitles_and_their_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = install_stubs(dir.path());

    let movie = dir.path().join("movie.mkv");
    let subs = dir.path().join("subs.srt");
    fs::write(&movie, b"container").unwrap();
    fs::write(&subs, b"1\n").unwrap();

    let mut container = MediaContainer::new();
    container
        .add(Stream::new(0, StreamKind::Video, "h264", &movie))
        .unwrap();
    container
        .add(Stream::new(1, StreamKind::Subtitle, "subrip", &subs))
        .unwrap();

    let out = dir.path().join("out.mp4");
    FfmpegTool::new(&ffmpeg)
        .build_container(&out, &container, false)
        .unwrap();

    let argv = recorded_args(&ffmpeg);
    // The subtitle stream and its now-unreferenced source are both absent
    assert_eq!(args_after(&argv, "-i"), vec![movie.display().to_string()]);
    assert_eq!(args_after(&argv, "-map"), vec!["0:0"]);
}

#[test]
fn extract_audio_probes_the_source_once() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mkv");
    fs::write(&movie, b"container").unwrap();

    let mut session = FfmpegSession::open(install_stubs(dir.path())).unwrap();
    session.extract_audio(&movie).unwrap();

    let probes = recorded_args(&dir.path().join("ffprobe"))
        .iter()
        .filter(|a| a.as_str() == "-show_streams")
        .count();
    assert_eq!(probes, 1);
}
