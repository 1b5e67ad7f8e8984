use std::{collections::BTreeMap, path::Path};

use mandelbulb::{
    BulbError, ColorMapConfig, Domain, FailurePolicy, Field, PipelineConfig, Size, VideoConfig,
    is_ffmpeg_on_path, sample_grid,
};

/// Write `inputs` distance/light pairs. Distance comes from the escape-time grid with a
/// per-frame power, light is a radial ramp.
fn write_inputs(dir: &Path, inputs: u32) {
    std::fs::create_dir_all(dir).unwrap();
    for i in 0..inputs {
        let distance = sample_grid(12, 10, 20, 2.0 + f64::from(i), Domain::default()).unwrap();
        distance
            .write_delimited(&dir.join(format!("distance_{i:03}.txt")), ',')
            .unwrap();

        let light: Vec<f64> = (0..10)
            .flat_map(|row| (0..12).map(move |col| f64::from(row * col + i) * 0.25))
            .collect();
        Field::from_vec(Size::new(12, 10).unwrap(), light)
            .unwrap()
            .write_delimited(&dir.join(format!("light_{i:03}.txt")), ',')
            .unwrap();
    }
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: root.join("data"),
        image_dir: root.join("images"),
        stride: 3,
        raster: Size::new(24, 20).unwrap(),
        workers: Some(3),
        video: None,
        ..PipelineConfig::default()
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn read_all(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    listing(dir)
        .into_iter()
        .map(|name| {
            let bytes = std::fs::read(dir.join(&name)).unwrap();
            (name, bytes)
        })
        .collect()
}

#[test]
fn five_frames_produce_fifteen_named_images() {
    let root = tempfile::tempdir().unwrap();
    // 13 inputs with stride 3 -> ceil(13 / 3) = 5 frames.
    write_inputs(&root.path().join("data"), 13);

    let report = mandelbulb::run(&config(root.path())).unwrap();
    assert_eq!(report.frames.len(), 5);
    assert!(report.video.is_none());

    let mut expected = Vec::new();
    for kind in ["distance", "light", "mandelbulb"] {
        for i in 0..5 {
            expected.push(format!("{kind}_{i:03}.png"));
        }
    }
    expected.sort();
    assert_eq!(listing(&root.path().join("images")), expected);

    for path in report.image_paths() {
        assert_eq!(image::image_dimensions(path).unwrap(), (24, 20));
    }
}

#[test]
fn rerun_with_cleanup_is_bit_identical() {
    let root = tempfile::tempdir().unwrap();
    write_inputs(&root.path().join("data"), 6);
    let images = root.path().join("images");

    for colormap in [
        ColorMapConfig::viridis_like(),
        ColorMapConfig::Random {
            seed: 3,
            per_frame: true,
        },
    ] {
        let cfg = PipelineConfig {
            colormap,
            ..config(root.path())
        };
        mandelbulb::run(&cfg).unwrap();
        let first = read_all(&images);

        std::fs::write(images.join("mandelbulb_099.png"), b"stale").unwrap();
        mandelbulb::run(&cfg).unwrap();
        let second = read_all(&images);

        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }
}

#[test]
fn malformed_input_fails_with_frame_index() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    write_inputs(&data, 4);
    std::fs::write(data.join("light_002.txt"), "1,2\n3\n").unwrap();

    let cfg = PipelineConfig {
        stride: 1,
        ..config(root.path())
    };
    let err = mandelbulb::run(&cfg).unwrap_err();
    let BulbError::Render { frame, source } = &err else {
        panic!("expected render failure, got {err}");
    };
    assert_eq!(frame.0, 2);
    assert_eq!(source.kind(), "MissingInput");

    // Continue-and-collect still rendered the other frames.
    let names = listing(&root.path().join("images"));
    assert!(names.contains(&"mandelbulb_003.png".to_string()));
    assert!(!names.contains(&"mandelbulb_002.png".to_string()));
}

#[test]
fn shape_mismatch_fails_only_its_frame() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    write_inputs(&data, 3);
    std::fs::write(data.join("distance_000.txt"), "1,2\n3,4\n").unwrap();

    let cfg = PipelineConfig {
        stride: 1,
        failure_policy: FailurePolicy::ContinueAndCollect,
        ..config(root.path())
    };
    let err = mandelbulb::run(&cfg).unwrap_err();
    assert_eq!(err.frame().map(|f| f.0), Some(0));
    let BulbError::Render { source, .. } = &err else {
        panic!("expected render failure");
    };
    assert_eq!(source.kind(), "ShapeMismatch");
    assert_eq!(listing(&root.path().join("images")).len(), 6);
}

#[test]
fn unmatched_input_fails_only_the_trailing_frame() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    write_inputs(&data, 3);
    std::fs::remove_file(data.join("light_002.txt")).unwrap();

    let cfg = PipelineConfig {
        stride: 1,
        ..config(root.path())
    };
    let err = mandelbulb::run(&cfg).unwrap_err();
    assert_eq!(err.frame().map(|f| f.0), Some(2));
    let BulbError::Render { source, .. } = &err else {
        panic!("expected render failure, got {err}");
    };
    assert_eq!(source.kind(), "MissingInput");

    let names = listing(&root.path().join("images"));
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"mandelbulb_001.png".to_string()));
    assert!(!names.iter().any(|n| n.ends_with("_002.png")));
}

#[test]
fn failed_frame_blocks_encoding() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    write_inputs(&data, 3);
    std::fs::write(data.join("light_001.txt"), "oops\n").unwrap();

    let out = root.path().join("out.mp4");
    let cfg = PipelineConfig {
        stride: 1,
        video: Some(VideoConfig::default().with_out_path(&out)),
        ..config(root.path())
    };
    assert!(mandelbulb::run(&cfg).is_err());
    assert!(!out.exists());
}

#[test]
fn empty_data_directory_is_missing_input() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("data")).unwrap();
    let err = mandelbulb::run(&config(root.path())).unwrap_err();
    assert_eq!(err.kind(), "MissingInput");
}

#[test]
fn full_run_encodes_video_when_ffmpeg_is_available() {
    if !is_ffmpeg_on_path(Path::new("ffmpeg")) {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let root = tempfile::tempdir().unwrap();
    write_inputs(&root.path().join("data"), 15);

    let out = root.path().join("video").join("mandelbulb.mp4");
    let cfg = PipelineConfig {
        video: Some(VideoConfig {
            width: 48,
            fps: 10,
            bitrate: "1M".to_string(),
            ..VideoConfig::default()
        }
        .with_out_path(&out)),
        ..config(root.path())
    };
    let report = mandelbulb::run(&cfg).unwrap();
    let video = report.video.unwrap();
    assert_eq!(video.frames.count, 5);
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}
