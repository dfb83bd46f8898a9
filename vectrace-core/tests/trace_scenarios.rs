//! End-to-end tracing scenarios against the public API

use vectrace_core::{
    algorithms::bitmap_to_pathlist, Bitmap, LuminanceData, Params, ParamsPatch, Potrace, Progress,
    SegTag, Sign, TurnPolicy,
};

fn luminance_from_rows(rows: &[&str]) -> LuminanceData {
    let height = rows.len() as u32;
    let width = rows[0].len() as u32;
    let data = rows
        .iter()
        .flat_map(|row| row.chars().map(|c| if c == '#' { 0u8 } else { 255u8 }))
        .collect();
    LuminanceData::new(width, height, data)
}

fn disk(size: u32, radius: f64) -> LuminanceData {
    let center = size as f64 / 2.0;
    let mut data = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            data.push(if dx * dx + dy * dy <= radius * radius {
                0
            } else {
                255
            });
        }
    }
    LuminanceData::new(size, size, data)
}

#[test]
fn all_white_bitmap_renders_empty_path() {
    let mut potrace = Potrace::new();
    potrace.load_luminance(LuminanceData::new(10, 10, vec![255; 100]));

    let tag = potrace.get_path_tag(None, None).unwrap();
    assert!(tag.starts_with("<path d=\"\""), "tag was {tag}");

    let svg = potrace.get_svg().unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.ends_with("</svg>"));
    assert!(svg.contains("d=\"\""));
}

#[test]
fn five_by_five_square_traces_one_positive_path() {
    let mut potrace = Potrace::new();
    potrace.load_luminance(luminance_from_rows(&[
        "..........",
        "..........",
        "..#####...",
        "..#####...",
        "..#####...",
        "..#####...",
        "..#####...",
        "..........",
        "..........",
        "..........",
    ]));

    {
        let paths = potrace.paths().unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].sign, Sign::Plus);
        assert_eq!(paths[0].area, 25);
        assert_eq!(paths[0].polygon_area(), paths[0].area);
    }

    let svg = potrace.get_svg().unwrap();
    let d_start = svg.find("d=\"").unwrap() + 3;
    assert_eq!(&svg[d_start..d_start + 1], "M");
    assert!(svg.contains(" Z"));
}

#[test]
fn eight_by_eight_square_yields_four_corner_segments() {
    // the smallest square whose corner parameter reaches the default
    // alpha_max, so every vertex stays a corner
    let mut potrace = Potrace::new();
    potrace.load_luminance(luminance_from_rows(&[
        "............",
        "............",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "............",
        "............",
    ]));

    {
        let curves = potrace.curves().unwrap();
        assert_eq!(curves.len(), 1);
        assert_eq!(curves[0].len(), 4);
        assert!(curves[0].segments.iter().all(|s| s.tag == SegTag::Corner));
    }

    let tag = potrace.get_path_tag(None, None).unwrap();
    let d = tag.split("d=\"").nth(1).unwrap().split('"').next().unwrap();
    assert!(d.starts_with("M "));
    assert!(d.ends_with(" Z"));
    assert_eq!(d.matches("L ").count(), 8);
    assert_eq!(d.matches("C ").count(), 0);
    // the corner vertices appear verbatim in the path data
    assert!(d.contains("2,2"));
    assert!(d.contains("10,10"));
}

#[test]
fn checkerboard_with_majority_policy_yields_two_unit_paths() {
    let mut potrace = Potrace::new();
    potrace
        .set_parameters(&ParamsPatch {
            turn_policy: Some(TurnPolicy::Majority),
            turd_size: Some(0),
            threshold: Some(128),
            ..Default::default()
        })
        .unwrap();
    potrace.load_luminance(luminance_from_rows(&["#.", ".#"]));

    let paths = potrace.paths().unwrap();
    assert_eq!(paths.len(), 2);
    for path in paths {
        assert_eq!(path.sign, Sign::Plus);
        assert_eq!(path.area, 1);
        assert!(path.children.is_empty());
    }
}

#[test]
fn filled_disk_traces_to_smooth_curves() {
    let mut potrace = Potrace::new();
    potrace.load_luminance(disk(256, 100.0));

    {
        let paths = potrace.paths().unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].sign, Sign::Plus);
    }
    {
        let curves = potrace.curves().unwrap();
        let curve = &curves[0];
        let curve_segments = curve
            .segments
            .iter()
            .filter(|s| s.tag == SegTag::Curve)
            .count();
        assert!(curve_segments >= 3, "only {curve_segments} curve segments");
        assert_eq!(curve.len(), curve_segments, "unexpected corner on a disk");
    }

    let svg = potrace.get_svg().unwrap();
    let d = svg.split("d=\"").nth(1).unwrap().split('"').next().unwrap();
    assert!(d.starts_with("M "));
    assert!(d.matches("C ").count() >= 3);
    assert!(d.ends_with(" Z"));
}

#[test]
fn auto_threshold_splits_bimodal_image() {
    // 40% of pixels at luminance 30, 60% at 200
    let mut data = vec![30u8; 4000];
    data.extend(vec![200u8; 6000]);
    let mut potrace = Potrace::new();
    potrace.load_luminance(LuminanceData::new(100, 100, data));

    let threshold = potrace.resolved_threshold().unwrap();
    assert!(
        (60..=170).contains(&threshold),
        "threshold {threshold} outside Otsu optimum range"
    );

    // the trace then captures exactly the darker region
    let paths = potrace.paths().unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].sign, Sign::Plus);
    assert_eq!(paths[0].area, 4000);
}

#[test]
fn black_on_white_inversion_flips_signs() {
    let rows = [
        "........",
        "..####..",
        "..####..",
        "..####..",
        "..####..",
        "........",
        "........",
        "........",
    ];
    let mut dark = Potrace::new();
    dark.set_parameters(&ParamsPatch {
        threshold: Some(128),
        turd_size: Some(0),
        ..Default::default()
    })
    .unwrap();
    dark.load_luminance(luminance_from_rows(&rows));
    let dark_paths = dark.paths().unwrap().to_vec();
    assert_eq!(dark_paths.len(), 1);
    assert_eq!(dark_paths[0].sign, Sign::Plus);
    assert_eq!(dark_paths[0].area, 16);

    let mut light = Potrace::new();
    light
        .set_parameters(&ParamsPatch {
            threshold: Some(128),
            turd_size: Some(0),
            black_on_white: Some(false),
            ..Default::default()
        })
        .unwrap();
    light.load_luminance(luminance_from_rows(&rows));
    let light_paths = light.paths().unwrap();

    // the square contour reappears as a hole of the surrounding region
    assert_eq!(light_paths.len(), 2);
    assert_eq!(light_paths[0].sign, Sign::Plus);
    assert_eq!(light_paths[0].area, 64);
    assert_eq!(light_paths[1].sign, Sign::Minus);
    assert_eq!(light_paths[1].area, 16);
    assert_eq!(light_paths[1].min, dark_paths[0].min);
    assert_eq!(light_paths[1].max, dark_paths[0].max);
    assert_eq!(light_paths[0].children, vec![1]);
}

#[test]
fn get_svg_is_idempotent() {
    let mut potrace = Potrace::new();
    potrace.load_luminance(disk(64, 20.0));
    let first = potrace.get_svg().unwrap();
    let second = potrace.get_svg().unwrap();
    assert_eq!(first, second);
}

#[test]
fn width_override_scales_coordinates() {
    let mut potrace = Potrace::new();
    potrace
        .set_parameters(&ParamsPatch {
            width: Some(24),
            height: Some(24),
            threshold: Some(128),
            ..Default::default()
        })
        .unwrap();
    potrace.load_luminance(luminance_from_rows(&[
        "............",
        "............",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "..########..",
        "............",
        "............",
    ]));

    let svg = potrace.get_svg().unwrap();
    assert!(svg.contains("width=\"24\""));
    assert!(svg.contains("viewBox=\"0 0 24 24\""));
    // corner at (10, 10) lands at (20, 20) under the 2x scale
    assert!(svg.contains("20,20"));
}

#[test]
fn progress_reports_cover_the_unit_interval() {
    let mut potrace = Potrace::new();
    potrace.load_luminance(disk(64, 20.0));

    let mut reported = Vec::new();
    let mut cb = |f: f64| reported.push(f);
    let mut progress = Progress::new(&mut cb);
    potrace.trace_with_progress(&mut progress).unwrap();

    assert!(!reported.is_empty());
    assert!(reported.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(*reported.last().unwrap(), 1.0);
}

mod properties {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const POLICIES: [TurnPolicy; 6] = [
        TurnPolicy::Black,
        TurnPolicy::White,
        TurnPolicy::Left,
        TurnPolicy::Right,
        TurnPolicy::Minority,
        TurnPolicy::Majority,
    ];

    fn random_bitmap(seed: u64, size: u32, density: f64) -> Bitmap {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut bm = Bitmap::new(size, size).unwrap();
        for y in 0..size {
            for x in 0..size {
                if rng.gen_bool(density) {
                    bm.set(x as i32, y as i32);
                }
            }
        }
        bm
    }

    /// Net enclosed area of a decomposition: outer areas minus holes
    fn net_area(bm: &Bitmap, policy: TurnPolicy) -> i64 {
        let params = Params {
            turn_policy: policy,
            turd_size: 0,
            ..Params::default()
        };
        let paths = bitmap_to_pathlist(bm, &params, &mut Progress::none()).unwrap();
        paths
            .iter()
            .map(|p| {
                assert_eq!(p.polygon_area(), p.area, "area mismatch");
                assert!(p.len() >= 4);
                for i in 0..p.len() {
                    let a = p.points[i];
                    let b = p.points[(i + 1) % p.len()];
                    assert_eq!(
                        (a.x - b.x).abs() + (a.y - b.y).abs(),
                        1,
                        "non-unit contour step"
                    );
                }
                match p.sign {
                    Sign::Plus => p.area,
                    Sign::Minus => -p.area,
                }
            })
            .sum()
    }

    #[test]
    fn decomposition_accounts_for_every_pixel() {
        for seed in [1u64, 7, 42] {
            for density in [0.2, 0.5, 0.8] {
                let bm = random_bitmap(seed, 64, density);
                let pixels = bm.count_ones() as i64;
                for policy in POLICIES {
                    assert_eq!(
                        net_area(&bm, policy),
                        pixels,
                        "seed {seed} density {density} policy {policy}"
                    );
                }
            }
        }
    }
}
