use std::fs;
use std::path::Path;

use image::{GrayImage, Luma};
use orb_cli::{Classifier, ClassifierConfig, Manifest, OrbError, Outcome, SkipReason};

/// Blocky pseudo-random texture at the canonical size, so it is not resampled
fn blocks(seed: u32, block: u32) -> GrayImage {
    GrayImage::from_fn(400, 300, |x, y| {
        let (bx, by) = (x / block, y / block);
        let mut h = bx.wrapping_mul(0x9E37_79B1) ^ by.wrapping_mul(0x85EB_CA77) ^ seed.wrapping_mul(0xC2B2_AE3D);
        h ^= h >> 15;
        h = h.wrapping_mul(0x2C1B_3C6D);
        h ^= h >> 12;
        Luma([(h % 256) as u8])
    })
}

fn texture(seed: u32) -> GrayImage {
    blocks(seed, 8)
}

/// 3 px blocks; its descriptors sit far from those of any 8 px texture
fn fine_texture(seed: u32) -> GrayImage {
    blocks(seed, 3)
}

fn flat() -> GrayImage {
    GrayImage::from_pixel(400, 300, Luma([128]))
}

fn save(dir: &Path, name: &str, img: &GrayImage) {
    img.save_with_format(dir.join(name), image::ImageFormat::Png).unwrap();
}

fn classifier() -> Classifier {
    Classifier::new(ClassifierConfig::default()).unwrap()
}

/// sheep_9 matches `texture(1)` exactly and sorts after the horse distractor,
/// so winning needs a strictly higher score; the rest exercise every skip path
fn build_corpus(dir: &Path) {
    save(dir, "sheep_9.png", &texture(1));
    save(dir, "horse_1.png", &fine_texture(2));
    save(dir, "dog_1.png", &flat());
    save(dir, ".sheep_hidden.png", &texture(1));
    save(dir, "bird_1.png", &texture(1));
    fs::write(dir.join("cow_1.png"), b"not an image").unwrap();
    fs::write(dir.join("README.txt"), b"corpus").unwrap();
}

#[test]
fn identical_image_is_predicted() {
    let corpus_dir = tempfile::tempdir().unwrap();
    build_corpus(corpus_dir.path());
    let query_dir = tempfile::tempdir().unwrap();
    save(query_dir.path(), "query.png", &texture(1));

    let classifier = classifier();
    let corpus = classifier.load_corpus(corpus_dir.path(), None).unwrap();
    let names: Vec<&str> = corpus.entries().iter().map(|e| e.file_name.as_str()).collect();
    assert_eq!(names, vec!["dog_1.png", "horse_1.png", "sheep_9.png"]);
    assert!(corpus.entries()[0].features.is_empty());
    assert_eq!(corpus.entries()[2].image.dimensions(), (400, 300));

    let result = classifier.classify(&query_dir.path().join("query.png"), &corpus).unwrap();
    let scored: Vec<&str> = result.scores.iter().map(|s| s.file_name.as_str()).collect();
    assert_eq!(scored, vec!["horse_1.png", "sheep_9.png"]);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].file_name, "dog_1.png");
    assert_eq!(result.skipped[0].reason, SkipReason::EmptyDescriptors);

    let prediction = result.prediction().unwrap();
    assert_eq!(prediction.label, "sheep");
    assert_eq!(prediction.file_name, "sheep_9.png");
    assert_eq!(prediction.score, 25);
    assert!(prediction.matches.iter().all(|m| m.distance == 0));
    assert!(result.scores[0].score < prediction.score, "distractor scored {}", result.scores[0].score);
}

#[test]
fn pipeline_is_deterministic() {
    let corpus_dir = tempfile::tempdir().unwrap();
    build_corpus(corpus_dir.path());
    let query = corpus_dir.path().join("sheep_9.png");

    let first = {
        let classifier = classifier();
        let corpus = classifier.load_corpus(corpus_dir.path(), None).unwrap();
        classifier.classify(&query, &corpus).unwrap()
    };
    let second = {
        let classifier = classifier();
        let corpus = classifier.load_corpus(corpus_dir.path(), None).unwrap();
        classifier.classify(&query, &corpus).unwrap()
    };
    assert_eq!(first, second);
    assert_eq!(first.prediction().map(|p| p.label.as_str()), Some("sheep"));
}

#[test]
fn empty_corpus_has_no_match() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let query_dir = tempfile::tempdir().unwrap();
    save(query_dir.path(), "query.png", &texture(3));

    let classifier = classifier();
    let corpus = classifier.load_corpus(corpus_dir.path(), None).unwrap();
    assert!(corpus.is_empty());
    let result = classifier.classify(&query_dir.path().join("query.png"), &corpus).unwrap();
    assert_eq!(result.outcome, Outcome::NoMatch);
    assert_eq!(result.report_lines(), vec!["No match found."]);
}

#[test]
fn featureless_query_has_no_match() {
    let corpus_dir = tempfile::tempdir().unwrap();
    build_corpus(corpus_dir.path());
    let query_dir = tempfile::tempdir().unwrap();
    save(query_dir.path(), "query.png", &flat());

    let classifier = classifier();
    let corpus = classifier.load_corpus(corpus_dir.path(), None).unwrap();
    let result = classifier.classify(&query_dir.path().join("query.png"), &corpus).unwrap();
    assert_eq!(result.outcome, Outcome::NoMatch);
    assert!(result.scores.is_empty());
    assert_eq!(result.skipped.len(), corpus.len());
}

#[test]
fn undecodable_query_is_fatal() {
    let corpus_dir = tempfile::tempdir().unwrap();
    build_corpus(corpus_dir.path());

    let classifier = classifier();
    let corpus = classifier.load_corpus(corpus_dir.path(), None).unwrap();
    let result = classifier.classify(&corpus_dir.path().join("cow_1.png"), &corpus);
    assert!(matches!(result, Err(OrbError::Decode { .. })));
}

#[test]
fn missing_corpus_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = classifier().load_corpus(&dir.path().join("absent"), None);
    assert!(matches!(result, Err(OrbError::Io { .. })));
}

#[test]
fn manifest_labels_override_file_names() {
    let corpus_dir = tempfile::tempdir().unwrap();
    save(corpus_dir.path(), "img_a.png", &fine_texture(6));
    save(corpus_dir.path(), "img_b.png", &texture(5));
    save(corpus_dir.path(), "cat_1.png", &texture(5));
    let manifest_path = corpus_dir.path().join("labels.toml");
    fs::write(&manifest_path, "[entries]\n\"img_b.png\" = \"Dog\"\n\"img_a.png\" = \"giraffe\"\n").unwrap();

    let classifier = classifier();
    let manifest = Manifest::load(&manifest_path).unwrap();
    let corpus = classifier.load_corpus(corpus_dir.path(), Some(manifest)).unwrap();
    let labels: Vec<(&str, &str)> = corpus
        .entries()
        .iter()
        .map(|e| (e.file_name.as_str(), e.label.as_str()))
        .collect();
    assert_eq!(labels, vec![("img_a.png", "giraffe"), ("img_b.png", "dog")]);

    let query = corpus_dir.path().join("cat_1.png");
    let result = classifier.classify(&query, &corpus).unwrap();
    let prediction = result.prediction().unwrap();
    assert_eq!((prediction.label.as_str(), prediction.file_name.as_str()), ("dog", "img_b.png"));
}

#[test]
fn labels_are_case_insensitive() {
    let corpus_dir = tempfile::tempdir().unwrap();
    save(corpus_dir.path(), "Cow_7.png", &texture(9));

    let config = ClassifierConfig { labels: vec!["COW".to_string()], ..Default::default() };
    let classifier = Classifier::new(config).unwrap();
    let corpus = classifier.load_corpus(corpus_dir.path(), None).unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.entries()[0].label, "cow");
}

#[test]
fn smaller_images_are_resized() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let small = image::imageops::resize(&texture(4), 200, 150, image::imageops::FilterType::Nearest);
    small.save(corpus_dir.path().join("sheep_2.png")).unwrap();

    let corpus = classifier().load_corpus(corpus_dir.path(), None).unwrap();
    assert_eq!(corpus.entries()[0].image.dimensions(), (400, 300));
}
