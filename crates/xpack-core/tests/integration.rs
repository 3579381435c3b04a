use std::fs::File;
use std::io::Read;
use std::path::Path;

use xpack_core::archive::{self, ArchiveProgressEvent, ArchiveRequest, ErrorPolicy};
use xpack_core::config::parse_config;
use xpack_core::report::render::save_log_image;
use xpack_core::report::{LogBook, LogLine};

fn read_entries(path: &Path) -> Vec<(String, String)> {
    let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut out = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        out.push((entry.name().to_string(), text));
    }
    out
}

#[test]
fn config_driven_run_produces_archive_and_log_image() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("x-tool");
    std::fs::create_dir_all(src.join("sub")).unwrap();
    std::fs::write(src.join("a.txt"), "hello").unwrap();
    std::fs::write(src.join("sub").join("b.txt"), "world").unwrap();

    let yaml = format!(
        "source_dir: {}\ndestination: {}\non_error: continue\nlog_image:\n  enabled: true\n  path: {}\n",
        src.display(),
        tmp.path().join("data.zip").display(),
        tmp.path().join("log.png").display(),
    );
    let config = parse_config(&yaml, Path::new("xpack.yaml")).unwrap();
    let source = config.source_path().unwrap();
    let destination = config.destination_path();

    let mut book = LogBook::with_capacity_limit(config.log_image.max_lines);
    book.push(LogLine::info("Start"));
    let mut on_progress = |event: ArchiveProgressEvent| book.push(LogLine::from_event(&event));

    let mut req = ArchiveRequest::new(&source, &destination);
    req.compression = config.compression;
    req.error_policy = config.on_error;
    assert_eq!(req.error_policy, ErrorPolicy::BestEffort);
    let outcome = archive::run_with_progress(req, Some(&mut on_progress)).unwrap();
    assert!(outcome.is_success());

    assert_eq!(
        read_entries(&destination),
        vec![
            ("a.txt".to_string(), "hello".to_string()),
            ("sub/b.txt".to_string(), "world".to_string()),
        ]
    );

    let rendered: Vec<String> = book.lines().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "[INFO] Start",
            "[INFO] Compressing: a.txt",
            "[OK]   a.txt done",
            "[INFO] Compressing: sub/b.txt",
            "[OK]   sub/b.txt done",
        ]
    );

    let image_path = config.log_image.output_path();
    save_log_image(book.lines(), &image_path, &config.log_image.layout()).unwrap();
    let img = image::open(&image_path).unwrap();
    assert_eq!((img.width(), img.height()), (800, 600));
}

#[test]
fn missing_source_reports_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("absent");
    let dest = tmp.path().join("data.zip");

    let err = archive::run(ArchiveRequest::new(&src, &dest)).unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("absent"));
    assert!(!dest.exists());
}
