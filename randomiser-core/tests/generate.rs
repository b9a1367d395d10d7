mod common;

use fe8_randomiser_core::items::{ItemPlacement, PlacedItem};
use fe8_randomiser_core::layout::*;
use fe8_randomiser_core::patch::{apply_package, PatchPackage, SELF_ITEM_KIND};
use fe8_randomiser_core::rom::Rom;
use fe8_randomiser_core::{generate, run, RandomiserSettings};

fn settings(seed: u64) -> RandomiserSettings {
    RandomiserSettings {
        seed,
        player_name: "Innes".to_string(),
        easier_5x: true,
        player_unit_monsters: true,
        ..RandomiserSettings::default()
    }
}

#[test]
fn same_seed_gives_identical_output() {
    let catalog = common::catalog();
    let base = common::rom();

    let a = generate(&base, &catalog, &settings(1234), &[]).unwrap();
    let b = generate(&base, &catalog, &settings(1234), &[]).unwrap();
    assert!(a.patched == b.patched);
    assert_eq!(
        a.package().unwrap().to_zip().unwrap(),
        b.package().unwrap().to_zip().unwrap()
    );

    let outputs: Vec<Rom> = (0..8)
        .map(|seed| generate(&base, &catalog, &settings(seed), &[]).unwrap().patched)
        .collect();
    assert!(outputs.iter().any(|rom| *rom != outputs[0]));
}

#[test]
fn package_reproduces_patched_image() {
    let catalog = common::catalog();
    let base = common::rom();
    let placements = vec![
        ItemPlacement {
            location: 0,
            item: PlacedItem::Own { item: 3 },
        },
        ItemPlacement {
            location: 23,
            item: PlacedItem::Remote,
        },
    ];
    let generated = generate(&base, &catalog, &settings(99), &placements).unwrap();
    let zipped = generated.package().unwrap().to_zip().unwrap();

    let rebuilt = apply_package(&base, &zipped).unwrap();
    assert!(rebuilt == generated.patched);
    assert_eq!(rebuilt.read_u16(location_info(0)).unwrap(), SELF_ITEM_KIND);
    assert_eq!(rebuilt.read_n(SLOT_NAME_OFFS, 6).unwrap(), b"Innes\0");

    let package = PatchPackage::from_zip(&zipped).unwrap();
    assert_eq!(package.manifest.seed, 99);
    assert!(package.options.easier_5x);
    assert_eq!(package.options.min_endgame_level_cap, 40);
}

#[test]
fn run_writes_package_and_spoiler_log() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    common::write_fixtures(&data_dir);

    let base = common::rom();
    let rom_path = dir.path().join("fe8.gba");
    std::fs::write(&rom_path, &base.data).unwrap();

    let placements_path = dir.path().join("placements.json");
    std::fs::write(
        &placements_path,
        r#"[{"location": 5, "kind": "own", "item": 9}, {"location": 6, "kind": "remote"}]"#,
    )
    .unwrap();

    let settings = RandomiserSettings {
        debug: true,
        input_path: rom_path,
        data_dir,
        output_path: dir.path().join("out"),
        placements_path: Some(placements_path),
        ..settings(7)
    };
    let package_path = run(settings.clone()).unwrap();
    assert!(package_path.exists());
    let spoiler = package_path.with_file_name("spoiler_log.txt");
    assert!(std::fs::read_to_string(spoiler)
        .unwrap()
        .starts_with("FE8 Randomiser seed: 7"));

    let zipped = std::fs::read(&package_path).unwrap();
    let rebuilt = apply_package(&base, &zipped).unwrap();
    assert_eq!(rebuilt.read_u16(location_info(5) + 2).unwrap(), 9);

    let placements = fe8_randomiser_core::load_placements(settings.placements_path.as_ref().unwrap())
        .unwrap();
    let expected = generate(&base, &common::catalog(), &settings, &placements).unwrap();
    assert!(rebuilt == expected.patched);
}

#[test]
fn run_rejects_missing_or_wrong_sized_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = RandomiserSettings {
        input_path: dir.path().join("nope.gba"),
        ..RandomiserSettings::default()
    };
    assert!(run(missing).is_err());

    let short = dir.path().join("short.gba");
    std::fs::write(&short, [0u8; 16]).unwrap();
    let settings = RandomiserSettings {
        input_path: short,
        output_path: dir.path().join("out"),
        ..RandomiserSettings::default()
    };
    assert!(run(settings).is_err());
    assert!(!dir.path().join("out").exists());
}
