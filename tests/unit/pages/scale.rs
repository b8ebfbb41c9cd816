use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use super::*;
use crate::foundation::core::{PageIndex, Resolution};
use crate::tools::executor::{ToolCommand, ToolExecutor, ToolOutput};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Vec<String>>>,
    fail_on: Option<String>,
}

impl ToolExecutor for Recorder {
    fn run(&self, cmd: &ToolCommand) -> FolioResult<ToolOutput> {
        let args = cmd.args_lossy();
        self.calls.lock().unwrap().push(args.clone());
        if let Some(bad) = &self.fail_on {
            if args[0].ends_with(bad.as_str()) {
                return Ok(ToolOutput {
                    code: Some(1),
                    stdout: Vec::new(),
                    stderr: b"magick: improper image header".to_vec(),
                });
            }
        }
        Ok(ToolOutput::ok())
    }
}

fn refs(n: u32) -> Vec<PageRef> {
    (1..=n)
        .map(|i| PageRef {
            index: PageIndex(i),
            path: PathBuf::from(format!("work/page-{i}.jpg")),
        })
        .collect()
}

fn pool() -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
}

#[test]
fn ratio_follows_animation_axis() {
    let mut cfg = AnimationConfig::new(AnimationStyle::Scroll);
    cfg.resolution = Resolution::new(1920, 1080).unwrap();
    assert_eq!(scale_ratio(&cfg, (1275, 1650)).unwrap(), 1920.0 / 1275.0);

    cfg.style = AnimationStyle::Sequence;
    assert_eq!(scale_ratio(&cfg, (1275, 1650)).unwrap(), 1080.0 / 1650.0);

    assert!(scale_ratio(&cfg, (100, 0)).is_err());
}

#[test]
fn percent_keeps_four_decimals() {
    assert_eq!(percent_arg(0.5), "50.0000%");
    assert_eq!(percent_arg(1920.0 / 1275.0), "150.5882%");
    assert_eq!(percent_arg(1080.0 / 1650.0), "65.4545%");
}

#[test]
fn every_page_is_resized_in_place() {
    let exec = Arc::new(Recorder::default());
    let scaler = MagickScaler::new(exec.clone(), None);
    let coord = ScaleCoordinator::new(AnimationConfig::new(AnimationStyle::Scroll), scaler);

    coord
        .scale_pages(&refs(3), 0.5, &pool(), &CancelToken::new())
        .unwrap();

    let mut calls = exec.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls.len(), 3);
    for (i, call) in calls.iter().enumerate() {
        let page = format!("work/page-{}.jpg", i + 1);
        assert_eq!(call, &vec![page.clone(), "-resize".into(), "50.0000%".into(), page]);
    }
}

#[test]
fn scaler_failure_is_fatal() {
    let exec = Arc::new(Recorder {
        fail_on: Some("page-2.jpg".into()),
        ..Recorder::default()
    });
    let coord = ScaleCoordinator::new(
        AnimationConfig::new(AnimationStyle::Sequence),
        MagickScaler::new(exec, None),
    );
    let err = coord
        .scale_pages(&refs(3), 0.5, &pool(), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, FolioError::ExternalTool { .. }));
    assert!(err.to_string().contains("improper image header"));
}

#[test]
fn cancelled_before_scaling_runs_nothing() {
    let exec = Arc::new(Recorder::default());
    let coord = ScaleCoordinator::new(
        AnimationConfig::new(AnimationStyle::Sequence),
        MagickScaler::new(exec.clone(), None),
    );
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = coord.scale_pages(&refs(3), 0.5, &pool(), &cancel).unwrap_err();
    assert!(matches!(err, FolioError::Cancelled));
    assert!(exec.calls.lock().unwrap().is_empty());
}

#[test]
fn non_positive_ratio_is_rejected() {
    let coord = ScaleCoordinator::new(
        AnimationConfig::new(AnimationStyle::Sequence),
        MagickScaler::new(Arc::new(Recorder::default()), None),
    );
    assert!(
        coord
            .scale_pages(&refs(1), 0.0, &pool(), &CancelToken::new())
            .is_err()
    );
}

#[test]
fn identity_ratio_skips_the_scaler() {
    let exec = Arc::new(Recorder::default());
    let coord = ScaleCoordinator::new(
        AnimationConfig::new(AnimationStyle::Scroll),
        MagickScaler::new(exec.clone(), None),
    );
    coord
        .scale_pages(&refs(4), 1.0, &pool(), &CancelToken::new())
        .unwrap();
    assert!(exec.calls.lock().unwrap().is_empty());
}
