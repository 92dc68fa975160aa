use std::mem;
use std::sync::Arc;

use tracing::debug;
use zdim_core::entity::{AttachmentPoint, Block, LineSpacingStyle};
use zdim_core::geometry::{
    Point2, Vector2, Vector3, direction_angle, intersect_lines, midpoint, normalize_angle, polar,
};
use zdim_core::style::{
    DimensionStyle, FitTextMove, StyleOverride, StyleOverrideKind, StyleOverrideMap,
};
use zdim_core::units::{format_dimension_angle, format_dimension_length};

use crate::errors::DimensionError;

const GEOMETRY_EPSILON: f64 = 1e-9;

const MIN_LINE_SPACING_FACTOR: f64 = 0.25;
const MAX_LINE_SPACING_FACTOR: f64 = 4.0;

/// 坐标标注测量的局部轴。Y 轴引线测 X 坐标，X 轴引线测 Y 坐标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinateAxis {
    X,
    Y,
}

/// 七种标注变体的闭合集合。每个变体携带自己的几何输入，
/// 编译器保证所有分发点覆盖全部变体。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DimensionKind {
    /// 沿任意旋转轴投影的线性标注。`rotation` 为度。
    Linear {
        first: Point2,
        second: Point2,
        rotation: f64,
    },
    /// 与参考线段平行的线性标注。
    Aligned { first: Point2, second: Point2 },
    /// 两条线定义的角度标注，顶点为两线交点，按需计算不缓存。
    AngularTwoLine {
        first_start: Point2,
        first_end: Point2,
        second_start: Point2,
        second_end: Point2,
    },
    /// 顶点加两个绝对端点定义的角度标注。
    AngularThreePoint {
        center: Point2,
        start: Point2,
        end: Point2,
    },
    Radial { center: Point2, reference: Point2 },
    Diametric { center: Point2, reference: Point2 },
    /// 坐标标注：基准原点、特征点、引线终点与局部旋转（度）。
    Ordinate {
        origin: Point2,
        feature: Point2,
        leader_end: Point2,
        rotation: f64,
        axis: OrdinateAxis,
    },
}

impl DimensionKind {
    fn variant_name(&self) -> &'static str {
        match self {
            DimensionKind::Linear { .. } => "linear",
            DimensionKind::Aligned { .. } => "aligned",
            DimensionKind::AngularTwoLine { .. } => "angular two-line",
            DimensionKind::AngularThreePoint { .. } => "angular three-point",
            DimensionKind::Radial { .. } => "radial",
            DimensionKind::Diametric { .. } => "diametric",
            DimensionKind::Ordinate { .. } => "ordinate",
        }
    }

    fn is_angular(&self) -> bool {
        matches!(
            self,
            DimensionKind::AngularTwoLine { .. } | DimensionKind::AngularThreePoint { .. }
        )
    }
}

/// 标注实体。测量值永不存储，始终由当前几何重新推导。
#[derive(Debug, Clone)]
pub struct Dimension {
    kind: DimensionKind,
    offset: f64,
    style: Arc<DimensionStyle>,
    overrides: StyleOverrideMap,
    user_text: Option<String>,
    text_rotation: f64,
    attachment: AttachmentPoint,
    line_spacing_style: LineSpacingStyle,
    line_spacing_factor: f64,
    elevation: f64,
    normal: Vector3,
    definition_point: Point2,
    arc_definition_point: Option<Point2>,
    text_reference_point: Point2,
    text_position_manually_set: bool,
}

/// 文字锚点推导所需的样式参数快照，均为 Copy 标量。
pub(crate) struct PlacementParams {
    pub gap: f64,
    pub arrow_size: f64,
    pub text_offset: f64,
    pub ext_line_offset: f64,
    pub scale: f64,
    pub fit_text_move: FitTextMove,
}

pub(crate) struct LineLayout {
    pub anchor1: Point2,
    pub anchor2: Point2,
    /// 标注线方向角，弧度，已归一化。
    pub angle: f64,
}

pub(crate) struct ArcLayout {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub start_anchor: Point2,
    pub end_anchor: Point2,
    pub midpoint: Point2,
}

pub(crate) struct RadialLayout {
    pub center: Point2,
    pub reference: Point2,
    pub radius: f64,
    /// 中心指向参考点的方向角，弧度。
    pub angle: f64,
    /// 吸附后的生效偏移。
    pub offset: f64,
    pub outside: bool,
}

pub(crate) struct OrdinateLayout {
    pub start: Point2,
    pub knee: Point2,
    pub end: Point2,
    /// 引线行进方向角，弧度。
    pub direction: f64,
}

impl Dimension {
    // ---- 构造 ----

    pub fn linear(
        first: Point2,
        second: Point2,
        offset: f64,
        rotation: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_offset(offset)?;
        Self::with_kind(
            DimensionKind::Linear {
                first,
                second,
                rotation: normalize_deg(rotation),
            },
            offset,
            style,
        )
    }

    pub fn aligned(
        first: Point2,
        second: Point2,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_distinct(first, second, "aligned reference points")?;
        Self::ensure_offset(offset)?;
        Self::with_kind(DimensionKind::Aligned { first, second }, offset, style)
    }

    pub fn angular_two_line(
        first_start: Point2,
        first_end: Point2,
        second_start: Point2,
        second_end: Point2,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_distinct(first_start, first_end, "first line endpoints")?;
        Self::ensure_distinct(second_start, second_end, "second line endpoints")?;
        let d1 = Vector2::from_points(first_start, first_end);
        let d2 = Vector2::from_points(second_start, second_end);
        if intersect_lines(first_start, d1, second_start, d2).is_none() {
            return Err(DimensionError::ParallelLines);
        }
        Self::ensure_positive("offset", offset)?;
        Self::with_kind(
            DimensionKind::AngularTwoLine {
                first_start,
                first_end,
                second_start,
                second_end,
            },
            offset,
            style,
        )
    }

    pub fn angular_three_point(
        center: Point2,
        start: Point2,
        end: Point2,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_distinct(center, start, "vertex and start point")?;
        Self::ensure_distinct(center, end, "vertex and end point")?;
        let sweep = normalize_angle(direction_angle(center, end) - direction_angle(center, start));
        if sweep <= GEOMETRY_EPSILON {
            return Err(DimensionError::ParallelLines);
        }
        Self::ensure_positive("offset", offset)?;
        Self::with_kind(
            DimensionKind::AngularThreePoint { center, start, end },
            offset,
            style,
        )
    }

    /// 由圆弧快捷构造三点角度标注：以圆心加起止角（度）取弧端点。
    pub fn angular_from_arc(
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_positive("radius", radius)?;
        let start = polar(center, radius, start_angle.to_radians());
        let end = polar(center, radius, end_angle.to_radians());
        Self::angular_three_point(center, start, end, offset, style)
    }

    pub fn radial(
        center: Point2,
        reference: Point2,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_distinct(center, reference, "center and reference point")?;
        Self::ensure_offset(offset)?;
        Self::with_kind(DimensionKind::Radial { center, reference }, offset, style)
    }

    /// 由圆快捷构造半径标注：参考点取圆周上给定角度（度）处。
    pub fn radial_from_circle(
        center: Point2,
        radius: f64,
        angle: f64,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_positive("radius", radius)?;
        let reference = polar(center, radius, angle.to_radians());
        Self::radial(center, reference, offset, style)
    }

    pub fn diametric(
        center: Point2,
        reference: Point2,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_distinct(center, reference, "center and reference point")?;
        Self::ensure_offset(offset)?;
        Self::with_kind(DimensionKind::Diametric { center, reference }, offset, style)
    }

    pub fn diametric_from_circle(
        center: Point2,
        radius: f64,
        angle: f64,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_positive("radius", radius)?;
        let reference = polar(center, radius, angle.to_radians());
        Self::diametric(center, reference, offset, style)
    }

    pub fn ordinate(
        origin: Point2,
        feature: Point2,
        leader_end: Point2,
        rotation: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        Self::ensure_distinct(feature, leader_end, "feature point and leader end")?;
        let rotation = normalize_deg(rotation);
        let axis = Self::select_axis(feature, leader_end, rotation);
        Self::with_kind(
            DimensionKind::Ordinate {
                origin,
                feature,
                leader_end,
                rotation,
                axis,
            },
            0.0,
            style,
        )
    }

    fn with_kind(
        kind: DimensionKind,
        offset: f64,
        style: Arc<DimensionStyle>,
    ) -> Result<Self, DimensionError> {
        style.validate()?;
        let mut dimension = Self {
            kind,
            offset,
            style,
            overrides: StyleOverrideMap::new(),
            user_text: None,
            text_rotation: 0.0,
            attachment: AttachmentPoint::default(),
            line_spacing_style: LineSpacingStyle::default(),
            line_spacing_factor: 1.0,
            elevation: 0.0,
            normal: Vector3::unit_z(),
            definition_point: Point2::new(0.0, 0.0),
            arc_definition_point: None,
            text_reference_point: Point2::new(0.0, 0.0),
            text_position_manually_set: false,
        };
        dimension.recompute();
        Ok(dimension)
    }

    // ---- 只读访问 ----

    #[inline]
    pub fn kind(&self) -> &DimensionKind {
        &self.kind
    }

    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[inline]
    pub fn style(&self) -> &Arc<DimensionStyle> {
        &self.style
    }

    #[inline]
    pub fn overrides(&self) -> &StyleOverrideMap {
        &self.overrides
    }

    #[inline]
    pub fn user_text(&self) -> Option<&str> {
        self.user_text.as_deref()
    }

    #[inline]
    pub fn text_rotation(&self) -> f64 {
        self.text_rotation
    }

    #[inline]
    pub fn attachment(&self) -> AttachmentPoint {
        self.attachment
    }

    #[inline]
    pub fn line_spacing_style(&self) -> LineSpacingStyle {
        self.line_spacing_style
    }

    #[inline]
    pub fn line_spacing_factor(&self) -> f64 {
        self.line_spacing_factor
    }

    #[inline]
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    #[inline]
    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    #[inline]
    pub fn definition_point(&self) -> Point2 {
        self.definition_point
    }

    #[inline]
    pub fn arc_definition_point(&self) -> Option<Point2> {
        self.arc_definition_point
    }

    #[inline]
    pub fn text_reference_point(&self) -> Point2 {
        self.text_reference_point
    }

    #[inline]
    pub fn text_position_manually_set(&self) -> bool {
        self.text_position_manually_set
    }

    /// 当前测量值。线性族返回长度，角度族返回度数（`[0, 360)`）。
    pub fn measurement(&self) -> f64 {
        match self.kind {
            DimensionKind::Linear {
                first,
                second,
                rotation,
            } => {
                let distance = first.distance_to(second);
                if distance <= GEOMETRY_EPSILON {
                    return 0.0;
                }
                let reference_angle = direction_angle(first, second);
                (distance * (rotation.to_radians() - reference_angle).cos()).abs()
            }
            DimensionKind::Aligned { first, second } => first.distance_to(second),
            DimensionKind::AngularTwoLine {
                first_start,
                first_end,
                second_start,
                second_end,
            } => {
                let a1 = Vector2::from_points(first_start, first_end).angle();
                let a2 = Vector2::from_points(second_start, second_end).angle();
                normalize_angle(a2 - a1).to_degrees()
            }
            DimensionKind::AngularThreePoint { center, start, end } => {
                let a1 = direction_angle(center, start);
                let a2 = direction_angle(center, end);
                normalize_angle(a2 - a1).to_degrees()
            }
            DimensionKind::Radial { center, reference } => center.distance_to(reference),
            DimensionKind::Diametric { center, reference } => 2.0 * center.distance_to(reference),
            DimensionKind::Ordinate {
                origin,
                feature,
                rotation,
                axis,
                ..
            } => {
                let local =
                    rotate_vector(Vector2::from_points(origin, feature), -rotation.to_radians());
                match axis {
                    OrdinateAxis::Y => local.x().abs(),
                    OrdinateAxis::X => local.y().abs(),
                }
            }
        }
    }

    /// 按当前样式与覆盖格式化测量值（含半径/直径符号与前后缀）。
    pub fn formatted_measurement(&self) -> String {
        let effective = self.style.resolve(&self.overrides);
        self.default_text(&effective)
    }

    // ---- 修改 ----

    /// 样式更换不触发重算；渲染前由构建器惰性重算。
    pub fn set_style(&mut self, style: Arc<DimensionStyle>) -> Result<(), DimensionError> {
        style.validate()?;
        self.style = style;
        Ok(())
    }

    /// 写入覆盖项。同种覆盖重复写入即替换。
    pub fn set_override(&mut self, value: StyleOverride) {
        self.overrides.insert(value.kind(), value);
    }

    pub fn remove_override(&mut self, kind: StyleOverrideKind) -> Option<StyleOverride> {
        self.overrides.remove(&kind)
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// 用户文字模板。`<>` 会被替换为格式化测量值，`\X` 拆分为上下两行。
    pub fn set_user_text(&mut self, text: Option<String>) {
        self.user_text = text;
    }

    pub fn set_text_rotation(&mut self, value: f64) {
        self.text_rotation = normalize_deg(value);
    }

    pub fn set_attachment(&mut self, attachment: AttachmentPoint) {
        self.attachment = attachment;
    }

    pub fn set_line_spacing_style(&mut self, style: LineSpacingStyle) {
        self.line_spacing_style = style;
    }

    pub fn set_line_spacing_factor(&mut self, factor: f64) -> Result<(), DimensionError> {
        if !(MIN_LINE_SPACING_FACTOR..=MAX_LINE_SPACING_FACTOR).contains(&factor) {
            return Err(DimensionError::OutOfRange {
                name: "line_spacing_factor",
                value: factor,
                min: MIN_LINE_SPACING_FACTOR,
                max: MAX_LINE_SPACING_FACTOR,
            });
        }
        self.line_spacing_factor = factor;
        Ok(())
    }

    pub fn set_elevation(&mut self, elevation: f64) {
        self.elevation = elevation;
    }

    pub fn set_normal(&mut self, normal: Vector3) -> Result<(), DimensionError> {
        let unit = normal.normalize().ok_or(DimensionError::ZeroNormal)?;
        self.normal = unit;
        Ok(())
    }

    /// 手工钉住文字锚点。后续重算不再覆盖该点。
    pub fn set_text_reference_point(&mut self, point: Point2) {
        self.text_reference_point = point;
        self.text_position_manually_set = true;
    }

    /// 解除手工文字锚点并立即重算。
    pub fn reset_text_position(&mut self) {
        self.text_position_manually_set = false;
        self.recompute();
    }

    pub fn set_offset(&mut self, value: f64) -> Result<(), DimensionError> {
        if self.kind.is_angular() {
            Self::ensure_positive("offset", value)?;
        } else {
            Self::ensure_offset(value)?;
        }
        self.offset = value;
        self.recompute();
        Ok(())
    }

    pub fn set_linear_points(
        &mut self,
        first: Point2,
        second: Point2,
    ) -> Result<(), DimensionError> {
        match &mut self.kind {
            DimensionKind::Linear {
                first: f,
                second: s,
                ..
            } => {
                *f = first;
                *s = second;
            }
            _ => {
                return Err(DimensionError::VariantMismatch { expected: "linear" });
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn set_rotation(&mut self, value: f64) -> Result<(), DimensionError> {
        match &mut self.kind {
            DimensionKind::Linear { rotation, .. } => {
                *rotation = normalize_deg(value);
            }
            _ => {
                return Err(DimensionError::VariantMismatch { expected: "linear" });
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn set_aligned_points(
        &mut self,
        first: Point2,
        second: Point2,
    ) -> Result<(), DimensionError> {
        Self::ensure_distinct(first, second, "aligned reference points")?;
        match &mut self.kind {
            DimensionKind::Aligned {
                first: f,
                second: s,
            } => {
                *f = first;
                *s = second;
            }
            _ => {
                return Err(DimensionError::VariantMismatch { expected: "aligned" });
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn set_angular_lines(
        &mut self,
        first: (Point2, Point2),
        second: (Point2, Point2),
    ) -> Result<(), DimensionError> {
        Self::ensure_distinct(first.0, first.1, "first line endpoints")?;
        Self::ensure_distinct(second.0, second.1, "second line endpoints")?;
        let d1 = Vector2::from_points(first.0, first.1);
        let d2 = Vector2::from_points(second.0, second.1);
        if intersect_lines(first.0, d1, second.0, d2).is_none() {
            return Err(DimensionError::ParallelLines);
        }
        match &mut self.kind {
            DimensionKind::AngularTwoLine {
                first_start,
                first_end,
                second_start,
                second_end,
            } => {
                *first_start = first.0;
                *first_end = first.1;
                *second_start = second.0;
                *second_end = second.1;
            }
            _ => {
                return Err(DimensionError::VariantMismatch {
                    expected: "angular two-line",
                });
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn set_angular_points(
        &mut self,
        center: Point2,
        start: Point2,
        end: Point2,
    ) -> Result<(), DimensionError> {
        Self::ensure_distinct(center, start, "vertex and start point")?;
        Self::ensure_distinct(center, end, "vertex and end point")?;
        let sweep = normalize_angle(direction_angle(center, end) - direction_angle(center, start));
        if sweep <= GEOMETRY_EPSILON {
            return Err(DimensionError::ParallelLines);
        }
        match &mut self.kind {
            DimensionKind::AngularThreePoint {
                center: c,
                start: s,
                end: e,
            } => {
                *c = center;
                *s = start;
                *e = end;
            }
            _ => {
                return Err(DimensionError::VariantMismatch {
                    expected: "angular three-point",
                });
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn set_radial_geometry(
        &mut self,
        center: Point2,
        reference: Point2,
    ) -> Result<(), DimensionError> {
        Self::ensure_distinct(center, reference, "center and reference point")?;
        match &mut self.kind {
            DimensionKind::Radial {
                center: c,
                reference: r,
            }
            | DimensionKind::Diametric {
                center: c,
                reference: r,
            } => {
                *c = center;
                *r = reference;
            }
            _ => {
                return Err(DimensionError::VariantMismatch {
                    expected: "radial or diametric",
                });
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn set_ordinate_geometry(
        &mut self,
        origin: Point2,
        feature: Point2,
        leader_end: Point2,
    ) -> Result<(), DimensionError> {
        Self::ensure_distinct(feature, leader_end, "feature point and leader end")?;
        match &mut self.kind {
            DimensionKind::Ordinate {
                origin: o,
                feature: f,
                leader_end: l,
                rotation,
                axis,
            } => {
                *o = origin;
                *f = feature;
                *l = leader_end;
                *axis = Self::select_axis(feature, leader_end, *rotation);
            }
            _ => {
                return Err(DimensionError::VariantMismatch { expected: "ordinate" });
            }
        }
        self.recompute();
        Ok(())
    }

    /// 把任意点重释为标注线/弧的新位置。
    /// 线性族得到新的垂直偏移并在需要时交换首末参考点；
    /// 角度族得到新的弧半径并在需要时交换起止输入；
    /// 半径/直径族把参考点旋到面向给定点的圆周位置。
    pub fn set_dimension_line_position(&mut self, point: Point2) -> Result<(), DimensionError> {
        self.apply_dimension_line_position(point)?;
        self.text_position_manually_set = false;
        self.recompute();
        Ok(())
    }

    /// 重新推导定义点、弧中点与（未钉住时的）文字锚点。
    /// 若文字点被手工钉住且样式为"随标注线"，钉住点先被重释为标注线位置。
    pub fn recompute(&mut self) {
        let params = self.placement_params();
        self.calculate_reference_points(&params);
    }

    // ---- 内部 ----

    pub(crate) fn placement_params(&self) -> PlacementParams {
        let effective = self.style.resolve(&self.overrides);
        PlacementParams {
            gap: effective.text_offset * effective.scale,
            arrow_size: effective.arrow_size,
            text_offset: effective.text_offset,
            ext_line_offset: effective.ext_line_offset,
            scale: effective.scale,
            fit_text_move: effective.fit_text_move,
        }
    }

    fn calculate_reference_points(&mut self, params: &PlacementParams) {
        if self.text_position_manually_set && params.fit_text_move == FitTextMove::BesideDimLine {
            // 钉住点被重释为标注线位置；若该点退化则维持原几何
            let pinned = self.text_reference_point;
            if self.apply_dimension_line_position(pinned).is_err() {
                debug!("钉住的文字点无法作为标注线位置，保持原几何");
            }
        }
        let pinned = self.text_position_manually_set;

        match self.kind {
            DimensionKind::Linear { .. } | DimensionKind::Aligned { .. } => {
                if let Some(layout) = self.line_layout() {
                    self.definition_point = layout.anchor2;
                    self.arc_definition_point = None;
                    if !pinned {
                        let mid = midpoint(layout.anchor1, layout.anchor2);
                        self.text_reference_point =
                            offset_text_anchor(mid, layout.angle, params.gap);
                    }
                }
            }
            DimensionKind::AngularTwoLine { .. } | DimensionKind::AngularThreePoint { .. } => {
                if let Some(layout) = self.arc_layout() {
                    self.definition_point = layout.end_anchor;
                    self.arc_definition_point = Some(layout.midpoint);
                    if !pinned {
                        let mid_angle = direction_angle(layout.center, layout.midpoint);
                        self.text_reference_point =
                            polar(layout.center, layout.radius + params.gap, mid_angle);
                    }
                }
            }
            DimensionKind::Radial { .. } | DimensionKind::Diametric { .. } => {
                if let Some(layout) =
                    self.radial_layout(params.arrow_size, params.text_offset, params.scale)
                {
                    self.definition_point = layout.reference;
                    self.arc_definition_point = None;
                    if !pinned {
                        self.text_reference_point =
                            polar(layout.center, layout.offset + params.gap, layout.angle);
                    }
                }
            }
            DimensionKind::Ordinate { origin, .. } => {
                if let Some(layout) =
                    self.ordinate_layout(params.ext_line_offset, params.arrow_size, params.scale)
                {
                    self.definition_point = origin;
                    self.arc_definition_point = None;
                    if !pinned {
                        self.text_reference_point = layout
                            .end
                            .translate(Vector2::from_angle(layout.direction).scale(params.gap));
                    }
                }
            }
        }
    }

    fn apply_dimension_line_position(&mut self, point: Point2) -> Result<(), DimensionError> {
        match &mut self.kind {
            DimensionKind::Linear {
                first,
                second,
                rotation,
            } => {
                let normal = Vector2::from_angle(rotation.to_radians()).perpendicular();
                let mid = midpoint(*first, *second);
                let signed = normal.dot(mid.vector_to(point));
                if signed < 0.0 {
                    mem::swap(first, second);
                    *rotation = normalize_deg(*rotation + 180.0);
                    self.offset = -signed;
                } else {
                    self.offset = signed;
                }
            }
            DimensionKind::Aligned { first, second } => {
                let direction = Vector2::from_points(*first, *second).normalize().ok_or(
                    DimensionError::CoincidentPoints {
                        context: "aligned reference points",
                    },
                )?;
                let mid = midpoint(*first, *second);
                let signed = direction.perpendicular().dot(mid.vector_to(point));
                if signed < 0.0 {
                    mem::swap(first, second);
                    self.offset = -signed;
                } else {
                    self.offset = signed;
                }
            }
            DimensionKind::AngularTwoLine {
                first_start,
                first_end,
                second_start,
                second_end,
            } => {
                let d1 = Vector2::from_points(*first_start, *first_end);
                let d2 = Vector2::from_points(*second_start, *second_end);
                let center = intersect_lines(*first_start, d1, *second_start, d2)
                    .ok_or(DimensionError::ParallelLines)?;
                let distance = center.distance_to(point);
                if distance <= GEOMETRY_EPSILON {
                    return Err(DimensionError::CoincidentPoints {
                        context: "dimension arc position and vertex",
                    });
                }
                let a1 = d1.angle();
                let sweep = normalize_angle(d2.angle() - a1);
                let toward = normalize_angle(direction_angle(center, point) - a1);
                if toward > sweep {
                    mem::swap(first_start, second_start);
                    mem::swap(first_end, second_end);
                }
                self.offset = distance;
            }
            DimensionKind::AngularThreePoint { center, start, end } => {
                let distance = center.distance_to(point);
                if distance <= GEOMETRY_EPSILON {
                    return Err(DimensionError::CoincidentPoints {
                        context: "dimension arc position and vertex",
                    });
                }
                let a1 = direction_angle(*center, *start);
                let a2 = direction_angle(*center, *end);
                let sweep = normalize_angle(a2 - a1);
                let toward = normalize_angle(direction_angle(*center, point) - a1);
                if toward > sweep {
                    mem::swap(start, end);
                }
                self.offset = distance;
            }
            DimensionKind::Radial { center, reference }
            | DimensionKind::Diametric { center, reference } => {
                let distance = center.distance_to(point);
                if distance <= GEOMETRY_EPSILON {
                    return Err(DimensionError::CoincidentPoints {
                        context: "dimension line position and center",
                    });
                }
                let radius = center.distance_to(*reference);
                let direction = center
                    .vector_to(point)
                    .normalize()
                    .ok_or(DimensionError::CoincidentPoints {
                        context: "dimension line position and center",
                    })?;
                *reference = center.translate(direction.scale(radius));
                self.offset = distance;
            }
            DimensionKind::Ordinate {
                feature,
                leader_end,
                rotation,
                axis,
                ..
            } => {
                Self::ensure_distinct(*feature, point, "feature point and leader end")?;
                *leader_end = point;
                *axis = Self::select_axis(*feature, point, *rotation);
            }
        }
        Ok(())
    }

    pub(crate) fn line_layout(&self) -> Option<LineLayout> {
        match self.kind {
            DimensionKind::Linear {
                first,
                second,
                rotation,
            } => Some(offset_line_layout(
                first,
                second,
                rotation.to_radians(),
                self.offset,
            )),
            DimensionKind::Aligned { first, second } => Some(offset_line_layout(
                first,
                second,
                direction_angle(first, second),
                self.offset,
            )),
            _ => None,
        }
    }

    pub(crate) fn arc_layout(&self) -> Option<ArcLayout> {
        let (center, a1, a2) = match self.kind {
            DimensionKind::AngularTwoLine {
                first_start,
                first_end,
                second_start,
                second_end,
            } => {
                let d1 = Vector2::from_points(first_start, first_end);
                let d2 = Vector2::from_points(second_start, second_end);
                let center = intersect_lines(first_start, d1, second_start, d2)?;
                (center, d1.angle(), d2.angle())
            }
            DimensionKind::AngularThreePoint { center, start, end } => (
                center,
                direction_angle(center, start),
                direction_angle(center, end),
            ),
            _ => return None,
        };
        let sweep = normalize_angle(a2 - a1);
        let radius = self.offset;
        Some(ArcLayout {
            center,
            radius,
            start_angle: normalize_angle(a1),
            end_angle: normalize_angle(a1 + sweep),
            start_anchor: polar(center, radius, a1),
            end_anchor: polar(center, radius, a1 + sweep),
            midpoint: polar(center, radius, a1 + sweep * 0.5),
        })
    }

    /// 半径/直径布局。偏移落入半径附近的吸附带时被钳到带边界：
    /// 半径族带宽 `2·arrow_size·scale`，直径族额外加 `text_offset`。
    pub(crate) fn radial_layout(
        &self,
        arrow_size: f64,
        text_offset: f64,
        scale: f64,
    ) -> Option<RadialLayout> {
        let (center, reference, band) = match self.kind {
            DimensionKind::Radial { center, reference } => {
                (center, reference, 2.0 * arrow_size * scale)
            }
            DimensionKind::Diametric { center, reference } => {
                (center, reference, (2.0 * arrow_size + text_offset) * scale)
            }
            _ => return None,
        };
        let radius = center.distance_to(reference);
        let angle = direction_angle(center, reference);
        let mut offset = self.offset;
        if offset >= radius && offset <= radius + band {
            if offset < radius + band {
                debug!(requested = offset, snapped = radius + band, "偏移吸附到带外沿");
            }
            offset = radius + band;
        } else if offset < radius && offset > radius - band {
            let snapped = (radius - band).max(0.0);
            debug!(requested = offset, snapped, "偏移吸附到带内沿");
            offset = snapped;
        }
        Some(RadialLayout {
            center,
            reference,
            radius,
            angle,
            offset,
            outside: offset > radius,
        })
    }

    /// 坐标标注引线布局：先沿所选轴直行，再斜接引线终点。
    pub(crate) fn ordinate_layout(
        &self,
        ext_line_offset: f64,
        arrow_size: f64,
        scale: f64,
    ) -> Option<OrdinateLayout> {
        let DimensionKind::Ordinate {
            feature,
            leader_end,
            rotation,
            axis,
            ..
        } = self.kind
        else {
            return None;
        };
        let rot = rotation.to_radians();
        let delta = rotate_vector(Vector2::from_points(feature, leader_end), -rot);
        let axial = match axis {
            OrdinateAxis::Y => delta.y(),
            OrdinateAxis::X => delta.x(),
        };
        let sign = if axial >= 0.0 { 1.0 } else { -1.0 };
        let local_direction = match axis {
            OrdinateAxis::Y => Vector2::new(0.0, sign),
            OrdinateAxis::X => Vector2::new(sign, 0.0),
        };
        let direction = rotate_vector(local_direction, rot);
        let lead_in = ext_line_offset * scale;
        let min_jog = 2.0 * arrow_size * scale;
        let straight = (axial.abs() - min_jog).max(lead_in);
        Some(OrdinateLayout {
            start: feature.translate(direction.scale(lead_in)),
            knee: feature.translate(direction.scale(straight)),
            end: leader_end,
            direction: direction.angle(),
        })
    }

    /// 测量文本：角度族走角度管线，半径/直径族在无前缀时补 R/Ø 符号。
    pub(crate) fn default_text(&self, effective: &DimensionStyle) -> String {
        match self.kind {
            DimensionKind::AngularTwoLine { .. } | DimensionKind::AngularThreePoint { .. } => {
                format_dimension_angle(self.measurement(), effective)
            }
            DimensionKind::Radial { .. } if effective.prefix.is_empty() => {
                format!("R{}", format_dimension_length(self.measurement(), effective))
            }
            DimensionKind::Diametric { .. } if effective.prefix.is_empty() => {
                format!("Ø{}", format_dimension_length(self.measurement(), effective))
            }
            _ => format_dimension_length(self.measurement(), effective),
        }
    }

    pub(crate) fn display_text(&self, effective: &DimensionStyle) -> String {
        let measured = self.default_text(effective);
        match &self.user_text {
            Some(template) => template.replace("<>", &measured),
            None => measured,
        }
    }

    /// 渲染产物块。先惰性重算（覆盖/样式变更后的收敛点），
    /// 再发射图元；未钉住时会把重算出的文字锚点写回实体。
    pub fn build(&mut self, name: impl Into<String>) -> Block {
        crate::block_builder::build_dimension_block(self, name)
    }

    fn select_axis(feature: Point2, leader_end: Point2, rotation: f64) -> OrdinateAxis {
        let delta =
            rotate_vector(Vector2::from_points(feature, leader_end), -rotation.to_radians());
        if delta.y().abs() >= delta.x().abs() {
            OrdinateAxis::Y
        } else {
            OrdinateAxis::X
        }
    }

    fn ensure_distinct(
        a: Point2,
        b: Point2,
        context: &'static str,
    ) -> Result<(), DimensionError> {
        if a.distance_to(b) <= GEOMETRY_EPSILON {
            Err(DimensionError::CoincidentPoints { context })
        } else {
            Ok(())
        }
    }

    fn ensure_offset(value: f64) -> Result<(), DimensionError> {
        if value < 0.0 {
            Err(DimensionError::Negative {
                name: "offset",
                value,
            })
        } else {
            Ok(())
        }
    }

    fn ensure_positive(name: &'static str, value: f64) -> Result<(), DimensionError> {
        if value <= 0.0 {
            Err(DimensionError::NonPositive { name, value })
        } else {
            Ok(())
        }
    }
}

fn offset_line_layout(first: Point2, second: Point2, angle: f64, offset: f64) -> LineLayout {
    let direction = Vector2::from_angle(angle);
    let normal = direction.perpendicular();
    let line_point = midpoint(first, second).translate(normal.scale(offset));
    let project = |point: Point2| {
        line_point.translate(direction.scale(direction.dot(line_point.vector_to(point))))
    };
    LineLayout {
        anchor1: project(first),
        anchor2: project(second),
        angle: normalize_angle(angle),
    }
}

/// 文字锚点：标注线中点沿外法线偏移 gap，
/// 标注线角落在第二/三象限（`(90°, 270°]`）时翻转方向，避免文字倒置。
fn offset_text_anchor(mid: Point2, angle: f64, gap: f64) -> Point2 {
    let degrees = angle.to_degrees();
    let sign = if degrees > 90.0 && degrees <= 270.0 {
        -1.0
    } else {
        1.0
    };
    mid.translate(Vector2::from_angle(angle).perpendicular().scale(gap * sign))
}

fn rotate_vector(v: Vector2, angle: f64) -> Vector2 {
    let (sin, cos) = angle.sin_cos();
    Vector2::new(v.x() * cos - v.y() * sin, v.x() * sin + v.y() * cos)
}

fn normalize_deg(value: f64) -> f64 {
    normalize_angle(value.to_radians()).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zdim_core::style::StyleOverride;

    fn style() -> Arc<DimensionStyle> {
        Arc::new(DimensionStyle::default())
    }

    #[test]
    fn linear_measurement_projects_onto_rotation_axis() {
        let dim = Dimension::linear(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            0.0,
            style(),
        )
        .expect("valid linear dimension");
        assert!((dim.measurement() - 10.0).abs() < 1e-9);

        let rotated = Dimension::linear(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            90.0,
            style(),
        )
        .expect("valid rotated dimension");
        assert!(rotated.measurement().abs() < 1e-9);
    }

    #[test]
    fn aligned_measurement_is_segment_length() {
        let dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
            1.0,
            style(),
        )
        .expect("valid aligned dimension");
        assert!((dim.measurement() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn aligned_rejects_coincident_points() {
        let err = Dimension::aligned(
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 1.0),
            1.0,
            style(),
        )
        .unwrap_err();
        assert!(matches!(err, DimensionError::CoincidentPoints { .. }));
    }

    #[test]
    fn angular_two_line_rejects_parallel_lines() {
        let err = Dimension::angular_two_line(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 5.0),
            Point2::new(10.0, 5.0),
            2.0,
            style(),
        )
        .unwrap_err();
        assert_eq!(err, DimensionError::ParallelLines);
    }

    #[test]
    fn angular_measurements_stay_in_range() {
        let two_line = Dimension::angular_two_line(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 10.0),
            2.0,
            style(),
        )
        .expect("valid two-line dimension");
        assert!((two_line.measurement() - 90.0).abs() < 1e-9);

        let three_point = Dimension::angular_three_point(
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 5.0),
            Point2::new(5.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid three-point dimension");
        // 从起点逆时针扫到终点
        assert!((three_point.measurement() - 270.0).abs() < 1e-9);
        assert!(three_point.measurement() >= 0.0 && three_point.measurement() < 360.0);
    }

    #[test]
    fn radial_rejects_center_equal_to_reference() {
        let err = Dimension::radial(
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            1.0,
            style(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DimensionError::CoincidentPoints {
                context: "center and reference point"
            }
        ));
    }

    #[test]
    fn radial_and_diametric_measurements() {
        let radial = Dimension::radial(
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            6.0,
            style(),
        )
        .expect("valid radial dimension");
        assert!((radial.measurement() - 5.0).abs() < 1e-9);

        let diametric = Dimension::diametric(
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            6.0,
            style(),
        )
        .expect("valid diametric dimension");
        assert!((diametric.measurement() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn negative_offset_is_rejected_and_state_unchanged() {
        let mut dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid aligned dimension");
        let err = dim.set_offset(-1.0).unwrap_err();
        assert!(matches!(err, DimensionError::Negative { name: "offset", .. }));
        assert!((dim.offset() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn angular_offset_must_be_positive() {
        let mut dim = Dimension::angular_three_point(
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(0.0, 5.0),
            2.0,
            style(),
        )
        .expect("valid dimension");
        let err = dim.set_offset(0.0).unwrap_err();
        assert!(matches!(err, DimensionError::NonPositive { name: "offset", .. }));
        assert!((dim.offset() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn set_dimension_line_position_is_idempotent() {
        let mut dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid aligned dimension");

        let target = Point2::new(5.0, -3.0);
        dim.set_dimension_line_position(target)
            .expect("first reposition");
        let first_measurement = dim.measurement();
        let first_anchor = dim.text_reference_point();
        assert!((dim.offset() - 3.0).abs() < 1e-9);

        dim.set_dimension_line_position(target)
            .expect("second reposition");
        assert!((dim.measurement() - first_measurement).abs() < 1e-9);
        assert!(dim.text_reference_point().distance_to(first_anchor) < 1e-9);
    }

    #[test]
    fn linear_reposition_flips_side_without_changing_measurement() {
        let mut dim = Dimension::linear(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            0.0,
            style(),
        )
        .expect("valid linear dimension");
        let before = dim.measurement();

        dim.set_dimension_line_position(Point2::new(5.0, -4.0))
            .expect("reposition below");
        assert!((dim.offset() - 4.0).abs() < 1e-9);
        assert!((dim.measurement() - before).abs() < 1e-9);
    }

    #[test]
    fn radial_reposition_rotates_reference_point() {
        let mut dim = Dimension::radial(
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            6.0,
            style(),
        )
        .expect("valid radial dimension");

        dim.set_dimension_line_position(Point2::new(0.0, 8.0))
            .expect("reposition to the top");
        match dim.kind() {
            DimensionKind::Radial { reference, .. } => {
                assert!(reference.x().abs() < 1e-9);
                assert!((reference.y() - 5.0).abs() < 1e-9);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert!((dim.offset() - 8.0).abs() < 1e-9);
        assert!((dim.measurement() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn ordinate_selects_axis_from_leader_deviation() {
        let dim = Dimension::ordinate(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 2.0),
            0.0,
            style(),
        )
        .expect("valid ordinate dimension");
        match dim.kind() {
            DimensionKind::Ordinate { axis, .. } => assert_eq!(*axis, OrdinateAxis::Y),
            other => panic!("unexpected kind: {other:?}"),
        }
        assert!((dim.measurement() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pinned_text_point_survives_recompute() {
        let mut dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid aligned dimension");

        // 钉住点在"随标注线"模式下被重释为标注线位置
        let pinned = Point2::new(5.0, 6.0);
        dim.set_text_reference_point(pinned);
        dim.recompute();
        assert!(dim.text_position_manually_set());
        assert!(dim.text_reference_point().distance_to(pinned) < 1e-9);
        assert!((dim.offset() - 6.0).abs() < 1e-9);

        dim.reset_text_position();
        assert!(!dim.text_position_manually_set());
    }

    #[test]
    fn override_changes_take_effect_on_formatting() {
        let mut dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid aligned dimension");
        assert_eq!(dim.formatted_measurement(), "10.00");

        dim.set_override(StyleOverride::DecimalPlaces(0));
        assert_eq!(dim.formatted_measurement(), "10");

        dim.remove_override(StyleOverrideKind::DecimalPlaces);
        assert_eq!(dim.formatted_measurement(), "10.00");
    }

    #[test]
    fn radial_formatting_adds_radius_symbol() {
        let dim = Dimension::radial(
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            6.0,
            style(),
        )
        .expect("valid radial dimension");
        assert_eq!(dim.formatted_measurement(), "R5.00");

        let diametric = Dimension::diametric(
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            6.0,
            style(),
        )
        .expect("valid diametric dimension");
        assert_eq!(diametric.formatted_measurement(), "Ø10.00");
    }

    #[test]
    fn set_normal_rejects_zero_vector() {
        let mut dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid aligned dimension");
        let err = dim.set_normal(Vector3::new(0.0, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, DimensionError::ZeroNormal);
    }

    #[test]
    fn line_spacing_factor_range_is_enforced() {
        let mut dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid aligned dimension");
        assert!(dim.set_line_spacing_factor(1.5).is_ok());
        let err = dim.set_line_spacing_factor(9.0).unwrap_err();
        assert!(matches!(err, DimensionError::OutOfRange { .. }));
        assert!((dim.line_spacing_factor() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn variant_mismatch_is_reported() {
        let mut dim = Dimension::aligned(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            2.0,
            style(),
        )
        .expect("valid aligned dimension");
        let err = dim.set_rotation(45.0).unwrap_err();
        assert!(matches!(err, DimensionError::VariantMismatch { .. }));
    }
}
