use std::sync::Arc;

use tracing::info;
use zdim_config::{DemoConfig, DemoUnits};
use zdim_core::entity::{Block, Primitive};
use zdim_core::geometry::Point2;
use zdim_core::style::{DimensionStyle, LinearUnitFormat};
use zdim_engine::Dimension;

use crate::errors::FrontendError;

/// 简易 CLI 演示：按配置构建标注样式，逐一生成各类标注并打印概览。
pub fn run_demo(demo: &DemoConfig) -> Result<(), FrontendError> {
    let style = Arc::new(style_from_demo(demo));

    let mut dimensions: Vec<(&str, Dimension)> = vec![
        (
            "线性",
            Dimension::linear(
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                2.0,
                0.0,
                Arc::clone(&style),
            )?,
        ),
        (
            "对齐",
            Dimension::aligned(
                Point2::new(0.0, 0.0),
                Point2::new(3.0, 4.0),
                1.5,
                Arc::clone(&style),
            )?,
        ),
        (
            "两线角度",
            Dimension::angular_two_line(
                Point2::new(0.0, 0.0),
                Point2::new(5.0, 0.0),
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 3.0),
                3.0,
                Arc::clone(&style),
            )?,
        ),
        (
            "三点角度",
            Dimension::angular_three_point(
                Point2::new(0.0, 0.0),
                Point2::new(6.0, 0.0),
                Point2::new(0.0, 6.0),
                4.0,
                Arc::clone(&style),
            )?,
        ),
        (
            "半径",
            Dimension::radial_from_circle(
                Point2::new(20.0, 0.0),
                5.0,
                45.0,
                7.5,
                Arc::clone(&style),
            )?,
        ),
        (
            "直径",
            Dimension::diametric_from_circle(
                Point2::new(20.0, 0.0),
                5.0,
                30.0,
                8.0,
                Arc::clone(&style),
            )?,
        ),
        (
            "坐标",
            Dimension::ordinate(
                Point2::new(0.0, 0.0),
                Point2::new(8.0, 3.0),
                Point2::new(8.5, 6.0),
                0.0,
                Arc::clone(&style),
            )?,
        ),
    ];
    info!(count = dimensions.len(), "CLI 演示标注统计");

    println!("Rust 版标注引擎 CLI 演示");
    println!(
        "样式：{}，线性格式={:?}，精度={}，全局比例={:.2}",
        style.name, style.linear_format, style.decimal_places, style.scale
    );
    for (index, (label, dimension)) in dimensions.iter_mut().enumerate() {
        let measurement = dimension.measurement();
        let text = dimension.formatted_measurement();
        let block = dimension.build(format!("*D{}", index + 1));
        let bounds = block
            .bounds()
            .map(|bounds| {
                format!(
                    "min=({:.2}, {:.2}), max=({:.2}, {:.2})",
                    bounds.min().x(),
                    bounds.min().y(),
                    bounds.max().x(),
                    bounds.max().y()
                )
            })
            .unwrap_or_else(|| "<空>".to_string());
        println!(
            "  - {}标注 {}: 测量值={:.4}, 文本=\"{}\", {}, 包围盒={}",
            label,
            block.name,
            measurement,
            text,
            summarize(&block),
            bounds
        );
    }
    Ok(())
}

fn style_from_demo(demo: &DemoConfig) -> DimensionStyle {
    let mut style = DimensionStyle::new(&demo.style_name);
    style.linear_format = match demo.units {
        DemoUnits::Decimal => LinearUnitFormat::Decimal,
        DemoUnits::Architectural => LinearUnitFormat::Architectural,
        DemoUnits::Engineering => LinearUnitFormat::Engineering,
        DemoUnits::Fractional => LinearUnitFormat::Fractional,
        DemoUnits::Scientific => LinearUnitFormat::Scientific,
    };
    style.decimal_places = demo.decimal_places;
    style.scale = demo.scale;
    style
}

fn summarize(block: &Block) -> String {
    let mut lines = 0usize;
    let mut arcs = 0usize;
    let mut points = 0usize;
    let mut texts = 0usize;
    let mut arrows = 0usize;
    for entity in block.entities() {
        match entity {
            Primitive::Line(_) => lines += 1,
            Primitive::Arc(_) => arcs += 1,
            Primitive::Point(_) => points += 1,
            Primitive::Text(_) | Primitive::MText(_) => texts += 1,
            Primitive::Arrow(_) => arrows += 1,
        }
    }
    format!("线段={lines}, 圆弧={arcs}, 定义点={points}, 文字={texts}, 箭头={arrows}")
}
