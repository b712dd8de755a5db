use psyche::{
    aesthetic::AestheticScorer,
    runner::{run, run_loop, run_once, Mode, Summary},
    tagger::AutoTagger,
    tags::Vocabulary,
};
use std::io::{self, Cursor, Write};
use tempfile::tempdir;

mod common;
use common::{write_test_image, BrokenModel, FixedLogits};

fn scorer(logit: f32) -> AestheticScorer<FixedLogits> {
    AestheticScorer::new(FixedLogits(vec![-1.0, logit]), 1)
}

fn tagger() -> AutoTagger<FixedLogits> {
    let vocab = Vocabulary::from_names(vec!["blue_sky".to_string(), "cloud".to_string()]);
    AutoTagger::new(FixedLogits(vec![2.0, 1.0]), vocab, 0.3).unwrap()
}

#[test]
fn test_blank_line_ends_the_stream() {
    let dir = tempdir().unwrap();
    let img1 = write_test_image(dir.path(), "img1.png");
    let img2 = write_test_image(dir.path(), "img2.png");
    let img3 = write_test_image(dir.path(), "img3.png");
    let input = format!(
        "{}\n{}\n\n{}\n",
        img1.display(),
        img2.display(),
        img3.display()
    );

    let mut output = Vec::new();
    let summary = run_loop(&mut scorer(0.0), Cursor::new(input), &mut output);

    assert_eq!(String::from_utf8(output).unwrap(), "5.50\n5.50\n");
    assert_eq!(
        summary,
        Summary {
            processed: 2,
            failed: 0
        }
    );
}

#[test]
fn test_end_of_stream_without_blank_line() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");
    let input = format!("{}", img.display());

    let mut output = Vec::new();
    let summary = run_loop(&mut tagger(), Cursor::new(input), &mut output);

    assert_eq!(String::from_utf8(output).unwrap(), "blue sky,cloud\n");
    assert_eq!(summary.processed, 1);
}

#[test]
fn test_surrounding_whitespace_is_trimmed() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");
    let input = format!("  {}\t\r\n", img.display());

    let mut output = Vec::new();
    run_loop(&mut scorer(0.0), Cursor::new(input), &mut output);

    assert_eq!(String::from_utf8(output).unwrap(), "5.50\n");
}

#[test]
fn test_unreadable_path_yields_sentinel_and_continues() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");
    let missing = dir.path().join("missing.png");
    let input = format!("{}\n{}\n", missing.display(), img.display());

    let mut output = Vec::new();
    let summary = run_loop(&mut scorer(0.0), Cursor::new(input.clone()), &mut output);
    assert_eq!(String::from_utf8(output).unwrap(), "0\n5.50\n");
    assert_eq!(
        summary,
        Summary {
            processed: 2,
            failed: 1
        }
    );

    let mut output = Vec::new();
    run_loop(&mut tagger(), Cursor::new(input), &mut output);
    assert_eq!(String::from_utf8(output).unwrap(), "\nblue sky,cloud\n");
}

#[test]
fn test_undecodable_file_yields_sentinel() {
    let dir = tempdir().unwrap();
    let bogus = dir.path().join("bogus.png");
    std::fs::write(&bogus, b"not an image").unwrap();

    let mut output = Vec::new();
    let summary = run_loop(
        &mut scorer(0.0),
        Cursor::new(format!("{}\n", bogus.display())),
        &mut output,
    );
    assert_eq!(String::from_utf8(output).unwrap(), "0\n");
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_inference_failure_yields_sentinel() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");
    let mut scorer = AestheticScorer::new(BrokenModel, 1);

    let mut output = Vec::new();
    let input = format!("{}\n{}\n", img.display(), img.display());
    let summary = run_loop(&mut scorer, Cursor::new(input), &mut output);

    assert_eq!(String::from_utf8(output).unwrap(), "0\n0\n");
    assert_eq!(summary.failed, 2);
}

#[test]
fn test_one_output_line_per_input_line() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");
    let missing = dir.path().join("missing.png");
    let lines: Vec<String> = (0..10)
        .map(|i| {
            if i % 3 == 0 {
                missing.display().to_string()
            } else {
                img.display().to_string()
            }
        })
        .collect();
    let input = lines.join("\n") + "\n";

    let mut output = Vec::new();
    run_loop(&mut tagger(), Cursor::new(input), &mut output);

    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.matches('\n').count(), lines.len());
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_broken_output_ends_the_loop() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");
    let input = format!("{}\n{}\n", img.display(), img.display());

    let summary = run_loop(&mut scorer(0.0), Cursor::new(input), FailingWriter);
    assert_eq!(summary.processed, 0);
}

#[test]
fn test_invalid_utf8_ends_the_loop() {
    let input: &[u8] = &[0xff, 0xfe, b'\n'];
    let mut output = Vec::new();
    let summary = run_loop(&mut scorer(0.0), input, &mut output);
    assert!(output.is_empty());
    assert_eq!(summary, Summary::default());
}

#[test]
fn test_one_shot_prints_a_single_result() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");

    let mut output = Vec::new();
    let result = run_once(&mut tagger(), &img, &mut output).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(String::from_utf8(output).unwrap(), "blue sky,cloud\n");
}

#[test]
fn test_one_shot_failure_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.png");

    let mut output = Vec::new();
    let result = run(
        &mut scorer(0.0),
        Mode::OneShot(missing),
        Cursor::new(""),
        &mut output,
    );
    assert!(result.is_err());
    assert!(output.is_empty());
}

#[test]
fn test_one_shot_ignores_stdin() {
    let dir = tempdir().unwrap();
    let img = write_test_image(dir.path(), "img.png");
    let other = write_test_image(dir.path(), "other.png");

    let mut output = Vec::new();
    let summary = run(
        &mut scorer(0.0),
        Mode::OneShot(img),
        Cursor::new(format!("{}\n", other.display())),
        &mut output,
    )
    .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(String::from_utf8(output).unwrap(), "5.50\n");
}
