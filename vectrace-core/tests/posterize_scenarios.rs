//! End-to-end posterization scenarios against the public API

use vectrace_core::{
    FillStrategy, LuminanceData, Posterizer, PosterizerParamsPatch, RangeDistribution, Steps,
};

/// 256x256 grid whose column x has luminance x
fn ramp() -> LuminanceData {
    let mut data = Vec::with_capacity(256 * 256);
    for _y in 0..256 {
        for x in 0..256u32 {
            data.push(x as u8);
        }
    }
    LuminanceData::new(256, 256, data)
}

#[test]
fn ramp_with_equal_spread_produces_four_stacked_layers() {
    let mut posterizer = Posterizer::new();
    posterizer.load_luminance(ramp());
    posterizer
        .set_parameters(&PosterizerParamsPatch {
            steps: Some(Steps::Count(4)),
            threshold: Some(255),
            range_distribution: Some(RangeDistribution::Equal),
            fill_strategy: Some(FillStrategy::Spread),
            black_on_white: Some(true),
            ..Default::default()
        })
        .unwrap();

    let svg = posterizer.get_svg().unwrap();
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<path ").count(), 4);

    // layers are painted widest first: the full-range layer at the quarter
    // intensity, the darkest band reaching full opacity on top
    let opacities: Vec<&str> = svg
        .split("fill-opacity=\"")
        .skip(1)
        .map(|rest| rest.split('"').next().unwrap())
        .collect();
    assert_eq!(opacities, vec!["0.250", "0.333", "0.500", "1"]);
}

#[test]
fn explicit_steps_paint_one_layer_each() {
    let mut posterizer = Posterizer::new();
    posterizer.load_luminance(ramp());
    posterizer
        .set_parameters(&PosterizerParamsPatch {
            steps: Some(Steps::List(vec![60, 140, 220])),
            threshold: Some(220),
            fill_strategy: Some(FillStrategy::Mean),
            ..Default::default()
        })
        .unwrap();

    let svg = posterizer.get_svg().unwrap();
    assert_eq!(svg.matches("<path ").count(), 3);
    assert!(svg.contains("fill=\"black\""));
}

#[test]
fn white_on_black_layers_use_white_fill() {
    let mut posterizer = Posterizer::new();
    posterizer.load_luminance(ramp());
    posterizer
        .set_parameters(&PosterizerParamsPatch {
            steps: Some(Steps::Count(2)),
            threshold: Some(0),
            black_on_white: Some(false),
            range_distribution: Some(RangeDistribution::Equal),
            fill_strategy: Some(FillStrategy::Spread),
            ..Default::default()
        })
        .unwrap();

    let svg = posterizer.get_svg().unwrap();
    assert!(svg.contains("fill=\"white\""));
    assert_eq!(svg.matches("<path ").count(), 2);
}

#[test]
fn background_rect_precedes_layers() {
    let mut posterizer = Posterizer::new();
    posterizer.load_luminance(ramp());
    posterizer
        .set_parameters(&PosterizerParamsPatch {
            steps: Some(Steps::Count(2)),
            threshold: Some(200),
            range_distribution: Some(RangeDistribution::Equal),
            fill_strategy: Some(FillStrategy::Spread),
            background: Some("beige".into()),
            ..Default::default()
        })
        .unwrap();

    let svg = posterizer.get_svg().unwrap();
    let rect = svg.find("<rect").expect("background rect missing");
    let path = svg.find("<path").expect("layers missing");
    assert!(rect < path, "background must be painted first");
    assert!(svg.contains("fill=\"beige\""));
}

#[test]
fn symbol_wraps_layers_without_fill() {
    let mut posterizer = Posterizer::new();
    posterizer.load_luminance(ramp());
    posterizer
        .set_parameters(&PosterizerParamsPatch {
            steps: Some(Steps::Count(2)),
            threshold: Some(200),
            range_distribution: Some(RangeDistribution::Equal),
            fill_strategy: Some(FillStrategy::Spread),
            ..Default::default()
        })
        .unwrap();

    let symbol = posterizer.get_symbol("poster").unwrap();
    assert!(symbol.starts_with("<symbol viewBox=\"0 0 256 256\" id=\"poster\">"));
    assert!(symbol.ends_with("</symbol>"));
    assert!(!symbol.contains(" fill=\""));
    assert!(symbol.contains("fill-opacity"));
}

#[test]
fn posterization_is_idempotent() {
    let mut posterizer = Posterizer::new();
    posterizer.load_luminance(ramp());
    posterizer
        .set_parameters(&PosterizerParamsPatch {
            steps: Some(Steps::Count(3)),
            threshold: Some(240),
            range_distribution: Some(RangeDistribution::Equal),
            fill_strategy: Some(FillStrategy::Spread),
            ..Default::default()
        })
        .unwrap();

    let first = posterizer.get_svg().unwrap();
    let second = posterizer.get_svg().unwrap();
    assert_eq!(first, second);
}
