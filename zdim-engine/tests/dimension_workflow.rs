use std::sync::Arc;

use zdim_core::entity::{AttachmentPoint, Primitive};
use zdim_core::geometry::Point2;
use zdim_core::style::{DimensionStyle, FitTextMove, StyleOverride};
use zdim_engine::{Dimension, DimensionError, OrdinateAxis};

fn standard_style() -> Arc<DimensionStyle> {
    Arc::new(DimensionStyle::default())
}

fn text_contents(block: &zdim_core::entity::Block) -> Vec<String> {
    block
        .entities()
        .filter_map(|entity| match entity {
            Primitive::MText(mtext) => Some(mtext.content.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn every_variant_builds_a_block_with_its_measurement_text() {
    let style = standard_style();
    let mut dimensions = vec![
        Dimension::linear(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            0.0,
            Arc::clone(&style),
        )
        .expect("线性标注构造失败"),
        Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
            1.5,
            Arc::clone(&style),
        )
        .expect("对齐标注构造失败"),
        Dimension::angular_two_line(
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 5.0),
            3.0,
            Arc::clone(&style),
        )
        .expect("两线角度标注构造失败"),
        Dimension::angular_three_point(
            Point2::new(0.0, 0.0),
            Point2::new(6.0, 0.0),
            Point2::new(0.0, 6.0),
            4.0,
            Arc::clone(&style),
        )
        .expect("三点角度标注构造失败"),
        Dimension::radial_from_circle(Point2::new(20.0, 0.0), 5.0, 45.0, 7.5, Arc::clone(&style))
            .expect("半径标注构造失败"),
        Dimension::diametric_from_circle(Point2::new(20.0, 0.0), 5.0, 30.0, 8.0, Arc::clone(&style))
            .expect("直径标注构造失败"),
        Dimension::ordinate(
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
            Point2::new(3.5, 8.0),
            0.0,
            Arc::clone(&style),
        )
        .expect("坐标标注构造失败"),
    ];

    for (index, dimension) in dimensions.iter_mut().enumerate() {
        let expected = dimension.formatted_measurement();
        let block = dimension.build(format!("*D{}", index + 1));
        assert!(block.is_anonymous);
        assert!(!block.is_empty(), "块 {} 不应为空", block.name);
        let texts = text_contents(&block);
        assert_eq!(texts, vec![expected], "块 {} 文本不符", block.name);
    }
}

#[test]
fn ordinate_axis_and_measurement_follow_leader_deviation() {
    let dim = Dimension::ordinate(
        Point2::new(0.0, 0.0),
        Point2::new(3.0, 4.0),
        Point2::new(3.5, 8.0),
        0.0,
        standard_style(),
    )
    .expect("坐标标注构造失败");
    match dim.kind() {
        zdim_engine::DimensionKind::Ordinate { axis, .. } => {
            assert_eq!(*axis, OrdinateAxis::Y)
        }
        other => panic!("意外的变体: {other:?}"),
    }
    assert!((dim.measurement() - 3.0).abs() < 1e-9);
}

#[test]
fn reposition_then_rebuild_moves_the_dimension_line() {
    let mut dim = Dimension::aligned(
        Point2::new(0.0, 0.0),
        Point2::new(10.0, 0.0),
        1.0,
        standard_style(),
    )
    .expect("对齐标注构造失败");

    dim.set_dimension_line_position(Point2::new(5.0, 3.0))
        .expect("重定位失败");
    assert!((dim.offset() - 3.0).abs() < 1e-9);

    let block = dim.build("*D1");
    let dim_line = block
        .entities()
        .find_map(|entity| match entity {
            Primitive::Line(line) if line.layer == "0" => Some(line.clone()),
            _ => None,
        })
        .expect("未找到标注线");
    assert!((dim_line.start.y() - 3.0).abs() < 1e-9);
    assert!((dim_line.end.y() - 3.0).abs() < 1e-9);
}

#[test]
fn overrides_flow_into_the_built_text() {
    let mut dim = Dimension::aligned(
        Point2::new(0.0, 0.0),
        Point2::new(10.0, 0.0),
        2.0,
        standard_style(),
    )
    .expect("对齐标注构造失败");
    dim.set_override(StyleOverride::DecimalPlaces(3));
    dim.set_override(StyleOverride::Suffix(" mm".to_string()));

    let block = dim.build("*D1");
    assert_eq!(text_contents(&block), vec!["10.000 mm".to_string()]);
}

#[test]
fn diametric_offset_snaps_to_the_band_edge_in_the_built_block() {
    let mut dim = Dimension::diametric(
        Point2::new(0.0, 0.0),
        Point2::new(5.0, 0.0),
        5.2,
        standard_style(),
    )
    .expect("直径标注构造失败");
    dim.set_override(StyleOverride::TextOffset(0.0));

    let block = dim.build("*D1");
    // 偏移 5.2 落入 (5, 5.36] 吸附带，尾线终点被钳到 5.36
    let snapped = 5.0 + 2.0 * 0.18;
    let tail_reached = block.entities().any(|entity| match entity {
        Primitive::Line(line) => (line.end.x() - snapped).abs() < 1e-9,
        _ => false,
    });
    assert!(tail_reached, "尾线未到达吸附后的偏移位置");
}

#[test]
fn rejected_mutation_keeps_the_block_stable() {
    let mut dim = Dimension::radial(
        Point2::new(0.0, 0.0),
        Point2::new(5.0, 0.0),
        7.0,
        standard_style(),
    )
    .expect("半径标注构造失败");
    let before = dim.build("*D1");

    let err = dim.set_offset(-1.0).unwrap_err();
    assert!(matches!(err, DimensionError::Negative { .. }));

    let after = dim.build("*D2");
    assert_eq!(before.len(), after.len());
    assert_eq!(text_contents(&before), text_contents(&after));
}

#[test]
fn pinned_text_point_is_used_verbatim_when_not_beside_dim_line() {
    let mut dim = Dimension::aligned(
        Point2::new(0.0, 0.0),
        Point2::new(10.0, 0.0),
        2.0,
        standard_style(),
    )
    .expect("对齐标注构造失败");
    dim.set_override(StyleOverride::FitTextMove(FitTextMove::OverDimLineWithoutLeader));

    let pinned = Point2::new(2.0, 7.0);
    dim.set_text_reference_point(pinned);
    let block = dim.build("*D1");

    let mtext = block
        .entities()
        .find_map(|entity| match entity {
            Primitive::MText(mtext) => Some(mtext.clone()),
            _ => None,
        })
        .expect("未找到标注文字");
    assert!(mtext.insert.distance_to(pinned) < 1e-9);
    assert_eq!(mtext.attachment, AttachmentPoint::MiddleCenter);
    assert!(dim.text_position_manually_set());
}
