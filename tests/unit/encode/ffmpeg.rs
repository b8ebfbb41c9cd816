use std::sync::Mutex;

use super::*;
use crate::tools::executor::ToolOutput;

#[derive(Default)]
struct Capture {
    last: Mutex<Option<ToolCommand>>,
    exit: i32,
    stdout: &'static str,
}

impl ToolExecutor for Capture {
    fn run(&self, cmd: &ToolCommand) -> FolioResult<ToolOutput> {
        *self.last.lock().unwrap() = Some(cmd.clone());
        Ok(ToolOutput {
            code: Some(self.exit),
            stdout: self.stdout.as_bytes().to_vec(),
            stderr: b"Invalid data found when processing input".to_vec(),
        })
    }
}

fn cfg(out: PathBuf) -> EncodeConfig {
    EncodeConfig {
        frames_dir: PathBuf::from("doc_pdf/frames"),
        frame_format: FrameFormat::Jpg,
        fps: 30,
        resolution: Resolution::default(),
        background: Rgba8::BLACK,
        out_path: out,
        format: VideoFormat::Mp4,
        overwrite: false,
    }
}

#[test]
fn config_validation_catches_bad_values() {
    let mut c = cfg(PathBuf::from("out.mp4"));
    c.validate().unwrap();

    c.fps = 0;
    assert!(c.validate().is_err());

    let mut c = cfg(PathBuf::from("out.mp4"));
    c.resolution = Resolution::new(1921, 1080).unwrap();
    assert!(matches!(c.validate(), Err(FolioError::Config(_))));
}

#[test]
fn command_reads_padded_frame_pattern() {
    let enc = FfmpegEncoder::new(Arc::new(Capture::default()), None);
    let args = enc.command(&cfg(PathBuf::from("doc.mov"))).args_lossy();
    assert_eq!(args[0], "-n");
    let i = args.iter().position(|a| a == "-i").unwrap();
    assert!(args[i + 1].ends_with("%05d.jpg"));
    assert!(!args.iter().any(|a| a == "-s"));
    let r = args.iter().position(|a| a == "-framerate").unwrap();
    assert_eq!(args[r + 1], "30");
    assert_eq!(args.last().unwrap(), "doc.mov");
}

#[test]
fn narrow_frames_are_centred_not_stretched() {
    let enc = FfmpegEncoder::new(Arc::new(Capture::default()), None);
    let mut c = cfg(PathBuf::from("doc.mp4"));
    c.resolution = Resolution::new(16, 8).unwrap();
    c.background = Rgba8 {
        r: 0x12,
        g: 0xab,
        b: 0xff,
        a: 255,
    };
    let args = enc.command(&c).args_lossy();
    let vf = args.iter().position(|a| a == "-vf").unwrap();
    assert_eq!(
        args[vf + 1],
        "scale=16:8:force_original_aspect_ratio=decrease,pad=16:8:(ow-iw)/2:(oh-ih)/2:color=0x12abff"
    );
}

#[test]
fn encode_creates_missing_output_directory() {
    let dir = std::env::temp_dir().join(format!("folio_ffmpeg_nested_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let out = dir.join("videos").join("doc.mp4");
    let enc = FfmpegEncoder::new(Arc::new(Capture::default()), None);
    enc.encode(&cfg(out.clone())).unwrap();
    assert!(out.parent().unwrap().is_dir());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn version_reports_first_line() {
    let exec = Arc::new(Capture {
        stdout: "ffmpeg version 6.1.1 Copyright (c) 2000-2023\nbuilt with gcc\n",
        ..Capture::default()
    });
    let enc = FfmpegEncoder::new(exec.clone(), None);
    assert_eq!(enc.version().unwrap(), "ffmpeg version 6.1.1 Copyright (c) 2000-2023");
    assert_eq!(
        exec.last.lock().unwrap().as_ref().unwrap().args_lossy(),
        ["-version"]
    );

    let silent = FfmpegEncoder::new(Arc::new(Capture::default()), None);
    assert!(matches!(silent.version(), Err(FolioError::ExternalTool { .. })));

    let broken = FfmpegEncoder::new(
        Arc::new(Capture {
            exit: 127,
            ..Capture::default()
        }),
        None,
    );
    assert!(broken.version().is_err());
}

#[test]
fn encoder_failure_is_fatal() {
    let dir = std::env::temp_dir().join(format!("folio_ffmpeg_fail_{}", std::process::id()));
    let exec = Arc::new(Capture {
        exit: 1,
        ..Capture::default()
    });
    let enc = FfmpegEncoder::new(exec.clone(), Some(Duration::from_secs(1)));
    let err = enc.encode(&cfg(dir.join("out.mp4"))).unwrap_err();
    assert!(matches!(err, FolioError::ExternalTool { .. }));
    assert!(err.to_string().contains("Invalid data"));
    assert_eq!(
        exec.last.lock().unwrap().as_ref().unwrap().timeout,
        Some(Duration::from_secs(1))
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn video_format_parsing() {
    assert_eq!("MP4".parse::<VideoFormat>().unwrap(), VideoFormat::Mp4);
    assert_eq!(".mov".parse::<VideoFormat>().unwrap(), VideoFormat::Mov);
    assert_eq!("avi".parse::<VideoFormat>().unwrap().extension(), "avi");
    assert!("gif".parse::<VideoFormat>().is_err());
}

#[test]
fn unique_output_path_inserts_plus_before_extension() {
    let dir = std::env::temp_dir().join(format!("folio_unique_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let target = dir.join("doc.mp4");
    assert_eq!(unique_output_path(&target), target);

    std::fs::write(&target, b"").unwrap();
    assert_eq!(unique_output_path(&target), dir.join("doc+.mp4"));

    std::fs::write(dir.join("doc+.mp4"), b"").unwrap();
    assert_eq!(unique_output_path(&target), dir.join("doc++.mp4"));

    std::fs::remove_dir_all(&dir).unwrap();
}
