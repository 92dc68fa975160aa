use std::f64::consts::{FRAC_PI_2, PI};

use tracing::debug;
use zdim_core::entity::{
    ArcPrimitive, ArrowBlock, ArrowPrimitive, AttachmentPoint, Block, Color, DEFPOINTS_LAYER,
    LinePrimitive, Linetype, MTextPrimitive, PointPrimitive, Primitive,
};
use zdim_core::geometry::{Point2, Vector2, direction_angle, normalize_angle, polar};
use zdim_core::style::DimensionStyle;

use crate::dimension::{Dimension, DimensionKind};

/// 标注图元所在图层。参考点另走 Defpoints。
const DIMENSION_LAYER: &str = "0";

/// 按当前几何与生效样式渲染标注为一个匿名块。
///
/// 先触发一次重算：覆盖或样式变更后的文字锚点在此收敛，
/// 未钉住时重算结果会写回实体，因此本函数对实体不是纯查询。
pub fn build_dimension_block(dimension: &mut Dimension, name: impl Into<String>) -> Block {
    dimension.recompute();

    let effective = dimension.style().resolve(dimension.overrides());
    let ctx = Context::new(&effective);
    let mut block = Block::anonymous(name);

    match dimension.kind() {
        DimensionKind::Linear { .. } | DimensionKind::Aligned { .. } => {
            build_line_dimension(&mut block, dimension, &ctx);
        }
        DimensionKind::AngularTwoLine { .. } | DimensionKind::AngularThreePoint { .. } => {
            build_angular_dimension(&mut block, dimension, &ctx);
        }
        DimensionKind::Radial { .. } => build_radial_dimension(&mut block, dimension, &ctx),
        DimensionKind::Diametric { .. } => build_diametric_dimension(&mut block, dimension, &ctx),
        DimensionKind::Ordinate { .. } => build_ordinate_dimension(&mut block, dimension, &ctx),
    }

    debug!(block = %block.name, primitives = block.len(), "标注块构建完成");
    block
}

/// 生效样式的长度派生量，全部已乘整体比例。
struct Context<'a> {
    style: &'a DimensionStyle,
    arrow_size: f64,
    gap: f64,
    ext_offset: f64,
    ext_extend: f64,
    line_extend: f64,
    text_height: f64,
}

impl<'a> Context<'a> {
    fn new(style: &'a DimensionStyle) -> Self {
        let scale = style.scale;
        Self {
            style,
            arrow_size: style.arrow_size * scale,
            gap: style.text_offset * scale,
            ext_offset: style.ext_line_offset * scale,
            ext_extend: style.ext_line_extend * scale,
            line_extend: style.dim_line_extend * scale,
            text_height: style.text_height * scale,
        }
    }

    fn arrow1(&self) -> ArrowBlock {
        self.style.arrow1.clone().unwrap_or_default()
    }

    fn arrow2(&self) -> ArrowBlock {
        self.style.arrow2.clone().unwrap_or_default()
    }

    fn draw_dimension_line(&self) -> bool {
        !(self.style.dim_line1_off || self.style.dim_line2_off)
    }

    /// 普通箭头占据 `arrow_size` 线段；四种无箭身样式改为把线
    /// 越过锚点延长 `dim_line_extend`。
    fn trim_for(&self, arrow: &ArrowBlock) -> f64 {
        if arrow.suppresses_body() {
            -self.line_extend
        } else {
            self.arrow_size
        }
    }
}

fn push_defpoint(block: &mut Block, position: Point2) {
    block.push(Primitive::Point(PointPrimitive {
        position,
        color: Color::ByBlock,
        layer: DEFPOINTS_LAYER.to_string(),
    }));
}

fn push_dim_line(block: &mut Block, ctx: &Context<'_>, start: Point2, end: Point2) {
    block.push(Primitive::Line(LinePrimitive {
        start,
        end,
        color: ctx.style.dim_line_color,
        linetype: ctx.style.dim_line_linetype.clone(),
        lineweight: ctx.style.dim_line_lineweight,
        layer: DIMENSION_LAYER.to_string(),
    }));
}

fn push_arrow(block: &mut Block, ctx: &Context<'_>, arrow: ArrowBlock, at: Point2, rotation: f64) {
    block.push(Primitive::Arrow(ArrowPrimitive {
        block: arrow,
        insert: at,
        rotation: normalize_deg(rotation),
        size: ctx.arrow_size,
        color: ctx.style.dim_line_color,
        layer: DIMENSION_LAYER.to_string(),
    }));
}

fn push_extension_line(
    block: &mut Block,
    ctx: &Context<'_>,
    reference: Point2,
    anchor: Point2,
    linetype: Linetype,
) {
    let Some(direction) = reference.vector_to(anchor).normalize() else {
        return;
    };
    block.push(Primitive::Line(LinePrimitive {
        start: reference.translate(direction.scale(ctx.ext_offset)),
        end: anchor.translate(direction.scale(ctx.ext_extend)),
        color: ctx.style.ext_line_color,
        linetype,
        lineweight: ctx.style.ext_line_lineweight,
        layer: DIMENSION_LAYER.to_string(),
    }));
}

/// 文字发射。模板含 `\X` 时拆成上下两行（上行贴线上方、下行贴线下方），
/// 否则单行，锚点附着方式保证阅读方向朝上。
fn push_text(
    block: &mut Block,
    ctx: &Context<'_>,
    dimension: &Dimension,
    anchor: Point2,
    line_angle: f64,
) {
    let content = dimension.display_text(ctx.style);
    let rotation = readable_deg(line_angle.to_degrees() + dimension.text_rotation());

    let mtext = |content: String, insert: Point2, attachment: AttachmentPoint| {
        Primitive::MText(MTextPrimitive {
            insert,
            content,
            height: ctx.text_height,
            rotation,
            attachment,
            line_spacing_style: dimension.line_spacing_style(),
            line_spacing_factor: dimension.line_spacing_factor(),
            style: ctx.style.text_style.clone(),
            color: ctx.style.text_color,
            layer: DIMENSION_LAYER.to_string(),
        })
    };

    if let Some((above, below)) = content.split_once("\\X") {
        let up = Vector2::from_angle(rotation.to_radians()).perpendicular();
        block.push(mtext(
            above.to_string(),
            anchor.translate(up.scale(ctx.gap)),
            AttachmentPoint::BottomCenter,
        ));
        block.push(mtext(
            below.to_string(),
            anchor.translate(up.scale(-ctx.gap)),
            AttachmentPoint::TopCenter,
        ));
    } else {
        let attachment = if dimension.text_position_manually_set() {
            dimension.attachment()
        } else {
            AttachmentPoint::BottomCenter
        };
        block.push(mtext(content, anchor, attachment));
    }
}

fn build_line_dimension(block: &mut Block, dimension: &Dimension, ctx: &Context<'_>) {
    let Some(layout) = dimension.line_layout() else {
        return;
    };
    let (first, second) = match *dimension.kind() {
        DimensionKind::Linear { first, second, .. }
        | DimensionKind::Aligned { first, second } => (first, second),
        _ => return,
    };

    push_defpoint(block, first);
    push_defpoint(block, second);

    let direction = Vector2::from_angle(layout.angle);
    if ctx.draw_dimension_line() {
        let arrow1 = ctx.arrow1();
        let arrow2 = ctx.arrow2();
        let start = layout.anchor1.translate(direction.scale(ctx.trim_for(&arrow1)));
        let end = layout.anchor2.translate(direction.scale(-ctx.trim_for(&arrow2)));
        push_dim_line(block, ctx, start, end);
        push_arrow(
            block,
            ctx,
            arrow1,
            layout.anchor1,
            layout.angle.to_degrees() + 180.0,
        );
        push_arrow(block, ctx, arrow2, layout.anchor2, layout.angle.to_degrees());
    }

    if !ctx.style.ext_line1_off {
        push_extension_line(
            block,
            ctx,
            first,
            layout.anchor1,
            ctx.style.ext_line1_linetype.clone(),
        );
    }
    if !ctx.style.ext_line2_off {
        push_extension_line(
            block,
            ctx,
            second,
            layout.anchor2,
            ctx.style.ext_line2_linetype.clone(),
        );
    }

    push_text(block, ctx, dimension, dimension.text_reference_point(), layout.angle);
}

fn build_angular_dimension(block: &mut Block, dimension: &Dimension, ctx: &Context<'_>) {
    let Some(layout) = dimension.arc_layout() else {
        return;
    };

    // 每侧延伸参考点：离顶点最远的一端需要尺寸界线补到弧上
    let (side1, side2) = match *dimension.kind() {
        DimensionKind::AngularTwoLine {
            first_start,
            first_end,
            second_start,
            second_end,
        } => {
            push_defpoint(block, first_start);
            push_defpoint(block, first_end);
            push_defpoint(block, second_start);
            push_defpoint(block, second_end);
            let far = |a: Point2, b: Point2| {
                if layout.center.distance_to(a) >= layout.center.distance_to(b) {
                    a
                } else {
                    b
                }
            };
            (far(first_start, first_end), far(second_start, second_end))
        }
        DimensionKind::AngularThreePoint { center, start, end } => {
            push_defpoint(block, center);
            push_defpoint(block, start);
            push_defpoint(block, end);
            (start, end)
        }
        _ => return,
    };

    let sweep = normalize_angle(layout.end_angle - layout.start_angle);
    if ctx.draw_dimension_line() && layout.radius > 0.0 {
        let arrow1 = ctx.arrow1();
        let arrow2 = ctx.arrow2();
        // 弦长换算为圆心角
        let start_adjust = ctx.trim_for(&arrow1) / layout.radius;
        let end_adjust = ctx.trim_for(&arrow2) / layout.radius;
        let (arc_start, arc_end) = if start_adjust.max(0.0) + end_adjust.max(0.0) < sweep {
            (
                layout.start_angle + start_adjust,
                layout.start_angle + sweep - end_adjust,
            )
        } else {
            (layout.start_angle, layout.start_angle + sweep)
        };
        block.push(Primitive::Arc(ArcPrimitive {
            center: layout.center,
            radius: layout.radius,
            start_angle: normalize_angle(arc_start),
            end_angle: normalize_angle(arc_end),
            color: ctx.style.dim_line_color,
            linetype: ctx.style.dim_line_linetype.clone(),
            lineweight: ctx.style.dim_line_lineweight,
            layer: DIMENSION_LAYER.to_string(),
        }));
        push_arrow(
            block,
            ctx,
            arrow1,
            layout.start_anchor,
            (layout.start_angle - FRAC_PI_2).to_degrees(),
        );
        push_arrow(
            block,
            ctx,
            arrow2,
            layout.end_anchor,
            (layout.end_angle + FRAC_PI_2).to_degrees(),
        );
    }

    // 参考几何已经触及弧时不需要尺寸界线
    if !ctx.style.ext_line1_off && layout.center.distance_to(side1) < layout.radius {
        push_extension_line(
            block,
            ctx,
            side1,
            layout.start_anchor,
            ctx.style.ext_line1_linetype.clone(),
        );
    }
    if !ctx.style.ext_line2_off && layout.center.distance_to(side2) < layout.radius {
        push_extension_line(
            block,
            ctx,
            side2,
            layout.end_anchor,
            ctx.style.ext_line2_linetype.clone(),
        );
    }

    let tangent = direction_angle(layout.center, layout.midpoint) + FRAC_PI_2;
    push_text(block, ctx, dimension, dimension.text_reference_point(), tangent);
}

fn build_radial_dimension(block: &mut Block, dimension: &Dimension, ctx: &Context<'_>) {
    let Some(layout) = dimension.radial_layout(
        ctx.style.arrow_size,
        ctx.style.text_offset,
        ctx.style.scale,
    ) else {
        return;
    };

    push_defpoint(block, layout.center);
    push_defpoint(block, layout.reference);

    let outward = Vector2::from_angle(layout.angle);
    if ctx.draw_dimension_line() {
        let arrow = ctx.arrow1();
        let trim = ctx.trim_for(&arrow);
        if layout.outside {
            // 文字在圆外：尾线由参考点向外，箭头指向圆心
            let tail_end = polar(layout.center, layout.offset, layout.angle);
            push_dim_line(
                block,
                ctx,
                layout.reference.translate(outward.scale(trim)),
                tail_end,
            );
            push_arrow(
                block,
                ctx,
                arrow,
                layout.reference,
                layout.angle.to_degrees() + 180.0,
            );
        } else {
            // 文字在圆内：半径线由圆心指向参考点，箭头向外
            push_dim_line(
                block,
                ctx,
                layout.center,
                layout.reference.translate(outward.scale(-trim)),
            );
            push_arrow(block, ctx, arrow, layout.reference, layout.angle.to_degrees());
        }
    }

    push_text(block, ctx, dimension, dimension.text_reference_point(), layout.angle);
}

fn build_diametric_dimension(block: &mut Block, dimension: &Dimension, ctx: &Context<'_>) {
    let Some(layout) = dimension.radial_layout(
        ctx.style.arrow_size,
        ctx.style.text_offset,
        ctx.style.scale,
    ) else {
        return;
    };

    push_defpoint(block, layout.center);
    push_defpoint(block, layout.reference);

    let outward = Vector2::from_angle(layout.angle);
    let opposite = polar(layout.center, layout.radius, layout.angle + PI);
    if ctx.draw_dimension_line() {
        let arrow1 = ctx.arrow1();
        let arrow2 = ctx.arrow2();
        if layout.outside {
            // 标注线要到达对侧：发射穿越圆心的直径线，箭头从外指向圆内
            push_dim_line(
                block,
                ctx,
                opposite.translate(outward.scale(ctx.trim_for(&arrow1))),
                layout.reference.translate(outward.scale(-ctx.trim_for(&arrow2))),
            );
            let tail_end = polar(layout.center, layout.offset, layout.angle);
            push_dim_line(
                block,
                ctx,
                layout.reference.translate(outward.scale(ctx.trim_for(&arrow2))),
                tail_end,
            );
            push_arrow(block, ctx, arrow1, opposite, layout.angle.to_degrees());
            push_arrow(
                block,
                ctx,
                arrow2,
                layout.reference,
                layout.angle.to_degrees() + 180.0,
            );
        } else {
            // 文字在圆内：直径线两端箭头向外
            push_dim_line(
                block,
                ctx,
                opposite.translate(outward.scale(ctx.trim_for(&arrow1))),
                layout.reference.translate(outward.scale(-ctx.trim_for(&arrow2))),
            );
            push_arrow(
                block,
                ctx,
                arrow1,
                opposite,
                layout.angle.to_degrees() + 180.0,
            );
            push_arrow(block, ctx, arrow2, layout.reference, layout.angle.to_degrees());
        }
    }

    push_text(block, ctx, dimension, dimension.text_reference_point(), layout.angle);
}

fn build_ordinate_dimension(block: &mut Block, dimension: &Dimension, ctx: &Context<'_>) {
    let Some(layout) = dimension.ordinate_layout(
        ctx.style.ext_line_offset,
        ctx.style.arrow_size,
        ctx.style.scale,
    ) else {
        return;
    };
    let DimensionKind::Ordinate { origin, feature, .. } = *dimension.kind() else {
        return;
    };

    push_defpoint(block, origin);
    push_defpoint(block, feature);

    if ctx.draw_dimension_line() {
        // 两段引线：先沿轴直行，再斜接引线终点
        push_dim_line(block, ctx, layout.start, layout.knee);
        push_dim_line(block, ctx, layout.knee, layout.end);
    }

    push_text(block, ctx, dimension, dimension.text_reference_point(), layout.direction);
}

/// 文字阅读角：`(90°, 270°]` 区间翻转 180°，保证不倒置。
fn readable_deg(value: f64) -> f64 {
    let normalized = normalize_deg(value);
    if normalized > 90.0 && normalized <= 270.0 {
        normalize_deg(normalized + 180.0)
    } else {
        normalized
    }
}

fn normalize_deg(value: f64) -> f64 {
    normalize_angle(value.to_radians()).to_degrees()
}
