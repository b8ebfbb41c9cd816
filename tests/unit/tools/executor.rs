use super::*;

#[test]
fn builder_collects_args() {
    let cmd = ToolCommand::new("magick")
        .arg("in.jpg")
        .args(["-resize", "50.0000%"])
        .arg("in.jpg")
        .timeout(Some(Duration::from_secs(5)));
    assert_eq!(cmd.program, "magick");
    assert_eq!(
        cmd.args_lossy(),
        vec!["in.jpg", "-resize", "50.0000%", "in.jpg"]
    );
    assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
}

#[test]
fn check_maps_nonzero_exit_to_tool_error() {
    assert!(ToolOutput::ok().check("ffmpeg").is_ok());

    let out = ToolOutput {
        code: Some(1),
        stdout: Vec::new(),
        stderr: b"  no such file\n".to_vec(),
    };
    let err = out.check("ffmpeg").unwrap_err();
    match err {
        FolioError::ExternalTool { tool, message } => {
            assert_eq!(tool, "ffmpeg");
            assert_eq!(message, "exit status 1: no such file");
        }
        other => panic!("unexpected error: {other}"),
    }

    let killed = ToolOutput {
        code: None,
        ..ToolOutput::default()
    };
    assert!(
        killed
            .check("magick")
            .unwrap_err()
            .to_string()
            .contains("terminated by signal")
    );
}

#[test]
fn missing_program_is_spawn_error() {
    let cmd = ToolCommand::new("folio-definitely-not-a-real-program");
    let err = SystemExecutor::new().run(&cmd).unwrap_err();
    assert!(matches!(err, FolioError::ExternalTool { .. }));
    assert!(err.to_string().contains("failed to spawn"));
}

#[cfg(unix)]
#[test]
fn captures_output_and_exit_code() {
    let cmd = ToolCommand::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
    let out = SystemExecutor::new().run(&cmd).unwrap();
    assert_eq!(out.code, Some(3));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "out");
    assert_eq!(String::from_utf8_lossy(&out.stderr).trim(), "err");
}

#[cfg(unix)]
#[test]
fn stalled_process_is_killed_at_timeout() {
    let cmd = ToolCommand::new("sh")
        .args(["-c", "sleep 5"])
        .timeout(Some(Duration::from_millis(100)));
    let started = Instant::now();
    let err = SystemExecutor::new().run(&cmd).unwrap_err();
    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(4));
}
