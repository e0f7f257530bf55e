//! End-to-end example assembly against a synthetic render tree.

use std::fs;
use std::path::Path;

use glam::Vec3;
use image::{DynamicImage, GrayImage, Rgb32FImage, RgbImage};
use occu_data::{DatasetConfig, ExampleAssembler, MeshStore, SamplingStrategy, Split};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SIZE: u32 = 16;

/// Cube of side 10 centered at the origin, outward winding, as OBJ text.
const CUBE_OBJ: &str = "\
v -5 -5 -5
v 5 -5 -5
v 5 5 -5
v -5 5 -5
v -5 -5 5
v 5 -5 5
v 5 5 5
v -5 5 5
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 4 8 7
f 4 7 3
f 1 5 8
f 1 8 4
f 2 3 7
f 2 7 6
";

const PARAMS_JSON: &str = r#"{
    "center": [0.0, 0.0, 0.0],
    "R": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    "scale_factor": 1.0
}"#;

fn write_view(subject_dir: &Path, yaw: u32) {
    fs::create_dir_all(subject_dir).unwrap();

    let render = RgbImage::from_fn(SIZE, SIZE, |x, _| image::Rgb([(x * 16) as u8, 128, 255]));
    render
        .save(subject_dir.join(format!("rendered_image_{:03}.png", yaw)))
        .unwrap();

    // Foreground in the left half only.
    let mask = GrayImage::from_fn(SIZE, SIZE, |x, _| {
        image::Luma([if x < SIZE / 2 { 255 } else { 0 }])
    });
    mask.save(subject_dir.join(format!("rendered_mask_{:03}.png", yaw)))
        .unwrap();

    fs::write(
        subject_dir.join(format!("rendered_params_{:03}.json", yaw)),
        PARAMS_JSON,
    )
    .unwrap();
}

fn write_normals(normal_dir: &Path, yaw: u32) {
    fs::create_dir_all(normal_dir).unwrap();
    for name in ["nmlF", "nmlB"] {
        let map = Rgb32FImage::from_pixel(SIZE, SIZE, image::Rgb([0.0, 0.0, 1.0]));
        DynamicImage::ImageRgb32F(map)
            .save(normal_dir.join(format!("rendered_{}_{:03}.exr", name, yaw)))
            .unwrap();
    }
}

fn test_config(root: &Path) -> DatasetConfig {
    let mut config = DatasetConfig::default();
    config.render_root = root.join("render");
    config.mesh_root = root.join("meshes");
    config.gt_normal_root = root.join("normals");
    config.gt_parse_root = root.join("parse");
    config.load_size = SIZE;
    config.load_size_global = SIZE / 2;
    config.resolution = SIZE;
    config.use_gt_normal_maps = true;
    config.use_depth_map = false;
    config.use_human_parse_maps = false;
    config
}

fn write_tree(root: &Path, subject: &str) {
    write_view(&root.join("render").join(subject), 0);
    write_normals(&root.join("normals").join(subject), 0);

    let mesh_dir = root.join("meshes").join(subject);
    fs::create_dir_all(&mesh_dir).unwrap();
    fs::write(mesh_dir.join(format!("{}.obj", subject)), CUBE_OBJ).unwrap();
}

#[test]
fn assembles_an_evaluation_example() {
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), "0001");

    let mut config = test_config(tmp.path());
    config.evaluation_mode = true;

    let assembler = ExampleAssembler::new(config.clone(), Split::Train).unwrap();
    assert_eq!(assembler.len(), 1);
    assert_eq!(assembler.item(0), Some(("0001", 0)));

    let store = MeshStore::load(&config.mesh_root, &[], None).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let example = assembler.assemble(0, &store, &mut rng).unwrap();

    assert_eq!(example.name, "0001");
    assert_eq!(example.render.shape(), (3, SIZE as usize, SIZE as usize));
    assert_eq!(
        example.render_low_res.shape(),
        (3, SIZE as usize / 2, SIZE as usize / 2)
    );
    assert!(example.samples.is_empty());
    assert!(example.depth_map.is_none());
    assert!(example.human_parse_map.is_none());

    // b_range = load_size / scale_factor = 16, centered on the camera.
    assert_eq!(example.b_min, Vec3::splat(-8.0));
    assert_eq!(example.b_max, Vec3::splat(8.0));

    // Masked-out right half is exactly zero in every channel.
    let w = SIZE as usize;
    for c in 0..3 {
        assert_eq!(example.render.get(c, 3, w - 1), 0.0);
        assert_eq!(example.normal_front.get(c, 3, w - 1), 0.0);
    }
    assert_eq!(example.mask.get(0, 0, 0), 1.0);
    assert_eq!(example.mask.get(0, 0, w - 1), 0.0);
}

#[test]
fn assembles_a_training_example_with_samples() {
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), "0001");

    let mut config = test_config(tmp.path());
    config.sampling = config
        .sampling
        .with_strategy(SamplingStrategy::DepthOriented)
        .with_num_samples(200);

    let assembler = ExampleAssembler::new(config.clone(), Split::Train).unwrap();
    let store = MeshStore::load(&config.mesh_root, &assembler.subjects(), None).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let example = assembler.assemble(0, &store, &mut rng).unwrap();

    assert_eq!(example.samples.len(), 200);
    assert!(example
        .samples
        .labels()
        .iter()
        .all(|&l| (0.0..=1.0).contains(&l)));
}

#[test]
fn gt_parse_map_is_six_channel_low_res_and_masked_before_expansion() {
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), "0001");

    // Level 0.5 in the foreground left half, level 1.0 in the masked-out
    // right half.
    let parse_dir = tmp.path().join("parse").join("0001");
    fs::create_dir_all(&parse_dir).unwrap();
    let parse = GrayImage::from_fn(SIZE, SIZE, |x, _| {
        image::Luma([if x < SIZE / 2 { 128 } else { 255 }])
    });
    parse.save(parse_dir.join("rendered_parse_000.png")).unwrap();

    let mut config = test_config(tmp.path());
    config.evaluation_mode = true;
    config.use_human_parse_maps = true;
    config.use_gt_human_parse_maps = true;

    let assembler = ExampleAssembler::new(config.clone(), Split::Train).unwrap();
    let store = MeshStore::load(&config.mesh_root, &[], None).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let example = assembler.assemble(0, &store, &mut rng).unwrap();

    let map = example.human_parse_map.unwrap();
    // One channel per body-part level, none for background, at the coarse
    // resolution.
    let low = SIZE as usize / 2;
    assert_eq!(map.shape(), (6, low, low));

    // Foreground pixel carries the level-0.5 channel.
    assert_eq!(map.get(0, 0, 0), 1.0);
    for c in 1..6 {
        assert_eq!(map.get(c, 0, 0), 0.0);
    }
    // Masked background matches no level, even though the raw pixel held
    // level 1.0.
    for c in 0..6 {
        assert_eq!(map.get(c, 0, low - 1), 0.0);
    }
}

#[test]
fn missing_render_root_error_names_the_path() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());

    let err = ExampleAssembler::new(config, Split::Train).unwrap_err();
    assert!(err.to_string().contains("render"));
}

#[test]
fn missing_mask_names_the_offending_view() {
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), "0001");
    fs::remove_file(
        tmp.path()
            .join("render")
            .join("0001")
            .join("rendered_mask_000.png"),
    )
    .unwrap();

    let mut config = test_config(tmp.path());
    config.evaluation_mode = true;

    let assembler = ExampleAssembler::new(config.clone(), Split::Train).unwrap();
    let store = MeshStore::load(&config.mesh_root, &[], None).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let err = assembler.assemble(0, &store, &mut rng).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("0001"));
    assert!(msg.contains("rendered_mask_000.png"));
}

#[test]
fn validation_split_partitions_subjects() {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..10 {
        write_tree(tmp.path(), &format!("{:04}", i));
    }

    let mut config = test_config(tmp.path());
    config.evaluation_mode = true;
    config.use_validation_set = true;
    config.validation_fraction = 0.2;
    config.validation_seed = 10;

    let train = ExampleAssembler::new(config.clone(), Split::Train).unwrap();
    let val = ExampleAssembler::new(config.clone(), Split::Validation).unwrap();

    assert_eq!(train.subjects().len(), 8);
    assert_eq!(val.subjects().len(), 2);
    for subject in val.subjects() {
        assert!(!train.subjects().contains(&subject));
    }

    // Same seed, same partition.
    let val_again = ExampleAssembler::new(config, Split::Validation).unwrap();
    assert_eq!(val.subjects(), val_again.subjects());
}
