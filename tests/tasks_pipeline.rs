// tests/tasks_pipeline.rs

//! Built-in tasks against a real project directory.

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use assetflow::dag::{ExposedTask, TaskPlan};
use assetflow::server::ReloadSignal;
use assetflow::tasks::{clean, copy, css, images};
use assetflow_test_utils::builders::{ConfigFileBuilder, site_context};
use assetflow_test_utils::{init_tracing, with_timeout};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ 0xedb8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

fn adler32(bytes: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for &byte in bytes {
        a = (a + u32::from(byte)) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let mut body = kind.to_vec();
    body.extend_from_slice(data);
    out.extend_from_slice(&body);
    out.extend_from_slice(&crc32(&body).to_be_bytes());
}

/// A single-colour RGBA image stored without compression, so any real
/// optimizer has plenty to win.
fn solid_png(side: u32) -> Vec<u8> {
    let mut raw = Vec::new();
    for _ in 0..side {
        raw.push(0);
        for _ in 0..side {
            raw.extend_from_slice(&[0x20, 0x80, 0xc0, 0xff]);
        }
    }

    let mut zlib = vec![0x78, 0x01];
    let blocks: Vec<&[u8]> = raw.chunks(0xffff).collect();
    for (i, block) in blocks.iter().enumerate() {
        zlib.push(u8::from(i + 1 == blocks.len()));
        let len = block.len() as u16;
        zlib.extend_from_slice(&len.to_le_bytes());
        zlib.extend_from_slice(&(!len).to_le_bytes());
        zlib.extend_from_slice(block);
    }
    zlib.extend_from_slice(&adler32(&raw).to_be_bytes());

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&side.to_be_bytes());
    ihdr.extend_from_slice(&side.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);

    let mut png = PNG_SIGNATURE.to_vec();
    png_chunk(&mut png, b"IHDR", &ihdr);
    png_chunk(&mut png, b"IDAT", &zlib);
    png_chunk(&mut png, b"IEND", &[]);
    png
}

const SITE_SCSS: &str = r#"
$brand: #ff0000;
$pad: 10px;

.button {
  color: $brand;
  background-color: #ffffff;
  margin: 0px 0px 0px 0px;
  padding: $pad $pad * 2 $pad $pad * 2;
  user-select: none;

  .icon {
    width: 16px;
    height: 16px;
  }
}

.card {
  border: 1px solid #000000;
  margin-top: 0px;
}
"#;

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn css_writes_expanded_and_prefixed_minified_copies() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "src/scss/a.scss", SITE_SCSS.as_bytes());
    write(root, "src/scss/_partial.scss", b".p { color: blue; }");

    let ctx = site_context(root, ConfigFileBuilder::new().browsers("safari 12").build());
    let report = css::run(&ctx).await.unwrap();
    assert_eq!(report.compiled, ["a"]);
    assert!(report.errors.is_empty());

    let unminified = fs::read_to_string(root.join("src/css/a.css")).unwrap();
    let dist_plain = fs::read_to_string(root.join("dist/css/a.css")).unwrap();
    let minified = fs::read_to_string(root.join("dist/css/a.min.css")).unwrap();

    assert_eq!(unminified, dist_plain);
    assert!(unminified.contains(".button .icon {"), "{unminified}");
    assert!(unminified.contains("\n  margin-top: 0px;"), "{unminified}");

    assert!(minified.contains("-webkit-user-select:none"), "{minified}");
    assert!(!minified.contains('\n'));
    assert!(minified.len() < unminified.len());

    // Partials are only ever imported.
    assert!(!root.join("dist/css/_partial.css").exists());
    assert!(!root.join("dist/css/partial.css").exists());
}

#[tokio::test]
async fn css_compile_error_is_collected_not_fatal() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "src/scss/broken.scss", b".a { color: $nope; }");
    write(root, "src/scss/ok.scss", b".b { color: red; }");

    let ctx = site_context(root, ConfigFileBuilder::new().build());
    let report = css::run(&ctx).await.unwrap();

    assert_eq!(report.compiled, ["ok"]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, "broken.scss");
    assert!(root.join("dist/css/ok.min.css").exists());
    assert!(!root.join("dist/css/broken.css").exists());
}

#[test]
fn html_copies_are_byte_identical() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let page = b"<!doctype html>\n<html><body>\xe2\x9c\x93 hi</body></html>\n";
    write(root, "src/index.html", page);
    write(root, "src/blog/post.html", b"<p>post</p>");
    let ctx = site_context(root, ConfigFileBuilder::new().build());
    let report = copy::run_html(&ctx).unwrap();

    assert_eq!(report.copied.len(), 2);
    assert_eq!(fs::read(root.join("dist/index.html")).unwrap(), page);
    assert_eq!(
        fs::read(root.join("dist/blog/post.html")).unwrap(),
        b"<p>post</p>"
    );
}

#[test]
fn scripts_are_copied_under_dest_js() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "src/js/app.js", b"console.log(1);");
    write(root, "src/js/vendor/lib.js", b"export {};");

    let ctx = site_context(root, ConfigFileBuilder::new().build());
    copy::run_scripts(&ctx).unwrap();

    assert_eq!(
        fs::read(root.join("dist/js/app.js")).unwrap(),
        b"console.log(1);"
    );
    assert!(root.join("dist/js/vendor/lib.js").is_file());
}

#[test]
fn clean_removes_outputs_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "dist/css/a.css", b"a{}");
    write(root, "dist/js/app.js", b"");
    write(root, "dist/index.html", b"<html>");

    let ctx = site_context(root, ConfigFileBuilder::new().build());
    let first = clean::run(&ctx).unwrap();
    assert_eq!(first.removed.len(), 2);
    assert!(!root.join("dist/css").exists());
    assert!(!root.join("dist/js").exists());
    // Only generated css/js are cleaned.
    assert!(root.join("dist/index.html").exists());

    let second = clean::run(&ctx).unwrap();
    assert!(second.removed.is_empty());
}

#[tokio::test]
async fn css_pushes_both_stylesheets_to_live_reload_clients() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "src/scss/a.scss", b".a { color: red; }");
    write(root, "src/scss/broken.scss", b".b { color: $nope; }");

    let ctx = site_context(root, ConfigFileBuilder::new().build());
    let mut client = ctx.reload.subscribe();

    let report = css::run(&ctx).await.unwrap();
    assert_eq!(report.compiled, ["a"]);
    assert_eq!(report.errors.len(), 1);

    let mut received = Vec::new();
    while let Ok(signal) = client.try_recv() {
        received.push(signal);
    }
    // Nothing for the stylesheet that failed to compile.
    assert_eq!(
        received,
        [
            ReloadSignal::Css {
                file: "a.css".to_string()
            },
            ReloadSignal::Css {
                file: "a.min.css".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn images_run_pngs_through_the_optimizer() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path();
    let original = solid_png(32);
    write(root, "src/images/logo.png", &original);
    write(root, "src/images/favicon.ico", &[0, 1, 2, 3]);

    let ctx = site_context(root, ConfigFileBuilder::new().no_external_optimizers().build());
    assert_eq!(ctx.config.images.png_level, 5);

    let report = images::run(&ctx).await.unwrap();
    assert_eq!(report.optimized, 1);
    assert_eq!(report.verbatim, 1);

    let optimized = fs::read(root.join("dist/images/logo.png")).unwrap();
    assert!(optimized.starts_with(&PNG_SIGNATURE));
    assert!(
        optimized.len() <= original.len(),
        "{} > {}",
        optimized.len(),
        original.len()
    );
}

#[tokio::test]
async fn images_second_run_does_no_work() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "src/images/favicon.ico", &[0, 1, 2, 3]);
    write(root, "src/images/photos/raw.webp", &[4, 5]);

    let ctx = site_context(root, ConfigFileBuilder::new().no_external_optimizers().build());

    let first = images::run(&ctx).await.unwrap();
    assert_eq!(first.verbatim, 2);
    assert_eq!(
        fs::read(root.join("dist/images/photos/raw.webp")).unwrap(),
        [4, 5]
    );

    let second = images::run(&ctx).await.unwrap();
    assert_eq!(second.skipped, 2);
    assert_eq!(second.optimized + second.verbatim, 0);
}

#[tokio::test]
async fn one_shot_plans_run_through_the_real_executor() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "src/index.html", b"<html></html>");
    write(root, "src/js/app.js", b"1;");
    write(root, "src/scss/site.scss", b"a { b: c; }");

    let ctx = site_context(root, ConfigFileBuilder::new().build());

    for task in [ExposedTask::Html, ExposedTask::Js, ExposedTask::Css] {
        let plan = TaskPlan::for_exposed(task).unwrap();
        assert!(!plan.keeps_running());
        let report = with_timeout(assetflow::run_plan(&plan, ctx.clone()))
            .await
            .unwrap();
        assert!(report.is_success(), "{task}: {report:?}");
    }

    assert!(root.join("dist/index.html").is_file());
    assert!(root.join("dist/js/app.js").is_file());
    assert!(root.join("dist/css/site.min.css").is_file());
}
