pub mod geometry {
    use std::f64::consts::TAU;

    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，保证与主流 CAD 的双精度约定一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance_to(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，提供标注推导所需的基本运算。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        /// 以弧度角构造单位方向向量。
        #[inline]
        pub fn from_angle(angle: f64) -> Self {
            Self(DVec2::new(angle.cos(), angle.sin()))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn dot(self, other: Vector2) -> f64 {
            self.0.dot(other.0)
        }

        /// 逆时针旋转 90° 的垂直向量。
        #[inline]
        pub fn perpendicular(self) -> Self {
            Self(DVec2::new(-self.0.y, self.0.x))
        }

        /// 方向角，归一化到 `[0, 2π)`。
        #[inline]
        pub fn angle(self) -> f64 {
            normalize_angle(self.0.y.atan2(self.0.x))
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 三维向量，用于标注的出平面法向。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn unit_z() -> Self {
            Self(DVec3::Z)
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算图元范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }

    /// 将任意弧度角归一化到 `[0, 2π)`。
    pub fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    /// 极坐标取点：自 `origin` 出发，沿 `angle`（弧度）方向前进 `distance`。
    #[inline]
    pub fn polar(origin: Point2, distance: f64, angle: f64) -> Point2 {
        origin.translate(Vector2::new(distance * angle.cos(), distance * angle.sin()))
    }

    #[inline]
    pub fn midpoint(a: Point2, b: Point2) -> Point2 {
        Point2::from_vec((a.as_vec2() + b.as_vec2()) * 0.5)
    }

    /// `from` 指向 `to` 的方向角，归一化到 `[0, 2π)`。
    #[inline]
    pub fn direction_angle(from: Point2, to: Point2) -> f64 {
        Vector2::from_points(from, to).angle()
    }

    #[inline]
    pub fn cross(a: Vector2, b: Vector2) -> f64 {
        a.x() * b.y() - a.y() * b.x()
    }

    /// 点到过 `origin`、方向为 `direction` 的无限直线的带符号距离。
    /// 方向左侧为正，右侧为负。
    pub fn signed_point_line_distance(point: Point2, origin: Point2, direction: Vector2) -> f64 {
        match direction.normalize() {
            Some(unit) => cross(unit, origin.vector_to(point)),
            None => origin.distance_to(point),
        }
    }

    /// 两条无限直线的交点。平行（含共线）时返回 `None`。
    pub fn intersect_lines(
        origin1: Point2,
        direction1: Vector2,
        origin2: Point2,
        direction2: Vector2,
    ) -> Option<Point2> {
        let (unit1, unit2) = (direction1.normalize()?, direction2.normalize()?);
        let denominator = cross(unit1, unit2);
        if denominator.abs() <= 1e-9 {
            return None;
        }
        let delta = origin1.vector_to(origin2);
        let t = cross(delta, unit2) / denominator;
        Some(origin1.translate(unit1.scale(t)))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::{FRAC_PI_2, PI};

        #[test]
        fn polar_walks_along_angle() {
            let p = polar(Point2::new(1.0, 1.0), 2.0, FRAC_PI_2);
            assert!((p.x() - 1.0).abs() < 1e-9);
            assert!((p.y() - 3.0).abs() < 1e-9);
        }

        #[test]
        fn normalize_angle_wraps_negative_values() {
            assert!((normalize_angle(-FRAC_PI_2) - 1.5 * PI).abs() < 1e-9);
            assert!(normalize_angle(TAU).abs() < 1e-9);
        }

        #[test]
        fn intersect_lines_returns_none_for_parallel_input() {
            let result = intersect_lines(
                Point2::new(0.0, 0.0),
                Vector2::new(1.0, 1.0),
                Point2::new(0.0, 5.0),
                Vector2::new(2.0, 2.0),
            );
            assert!(result.is_none());
        }

        #[test]
        fn intersect_lines_finds_crossing() {
            let result = intersect_lines(
                Point2::new(0.0, 0.0),
                Vector2::new(1.0, 0.0),
                Point2::new(5.0, -5.0),
                Vector2::new(0.0, 1.0),
            )
            .expect("lines should intersect");
            assert!((result.x() - 5.0).abs() < 1e-9);
            assert!(result.y().abs() < 1e-9);
        }

        #[test]
        fn signed_distance_has_side_information() {
            let origin = Point2::new(0.0, 0.0);
            let direction = Vector2::new(1.0, 0.0);
            assert!(signed_point_line_distance(Point2::new(3.0, 2.0), origin, direction) > 0.0);
            assert!(signed_point_line_distance(Point2::new(3.0, -2.0), origin, direction) < 0.0);
        }
    }
}

pub mod entity {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    /// 放置原始参考点的图层名。该图层可查询但不参与出图。
    pub const DEFPOINTS_LAYER: &str = "Defpoints";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Color {
        ByLayer,
        ByBlock,
        Index(u8),
    }

    impl Default for Color {
        fn default() -> Self {
            Color::ByBlock
        }
    }

    /// 线型引用。本核心只要求它是可复制的值引用，不解析线型定义。
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Linetype {
        pub name: String,
    }

    impl Linetype {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }

        #[inline]
        pub fn by_layer() -> Self {
            Self::new("ByLayer")
        }
    }

    impl Default for Linetype {
        fn default() -> Self {
            Self::by_layer()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Lineweight {
        ByLayer,
        ByBlock,
        /// 单位为 0.01 毫米，与 DXF 约定一致。
        Value(i16),
    }

    impl Default for Lineweight {
        fn default() -> Self {
            Lineweight::ByBlock
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub is_visible: bool,
        pub is_plotted: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                is_visible: true,
                is_plotted: true,
            }
        }

        /// 参考点图层：可见、可查询，但出图被抑制。
        pub fn defpoints() -> Self {
            Self {
                name: DEFPOINTS_LAYER.to_string(),
                is_visible: true,
                is_plotted: false,
            }
        }
    }

    /// 文字样式协作者暴露的最小面：名称、宽度因子、倾斜角（度）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TextStyle {
        pub name: String,
        pub width_factor: f64,
        pub oblique_angle: f64,
    }

    impl TextStyle {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                width_factor: 1.0,
                oblique_angle: 0.0,
            }
        }
    }

    impl Default for TextStyle {
        fn default() -> Self {
            Self::new("Standard")
        }
    }

    /// 箭头块资源引用。四种"无箭身"样式需要把标注线延长越过锚点，
    /// 而不是在锚点处截断。
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ArrowBlock {
        pub name: String,
    }

    impl ArrowBlock {
        pub const OBLIQUE: &'static str = "_Oblique";
        pub const ARCH_TICK: &'static str = "_ArchTick";
        pub const INTEGRAL: &'static str = "_Integral";
        pub const NONE: &'static str = "_None";
        pub const CLOSED_FILLED: &'static str = "";
        pub const DOT: &'static str = "_Dot";
        pub const OPEN: &'static str = "_Open";

        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }

        /// 默认实心闭合箭头（DXF 中以空名表示）。
        #[inline]
        pub fn closed_filled() -> Self {
            Self::new(Self::CLOSED_FILLED)
        }

        #[inline]
        pub fn oblique() -> Self {
            Self::new(Self::OBLIQUE)
        }

        #[inline]
        pub fn arch_tick() -> Self {
            Self::new(Self::ARCH_TICK)
        }

        #[inline]
        pub fn integral() -> Self {
            Self::new(Self::INTEGRAL)
        }

        #[inline]
        pub fn none() -> Self {
            Self::new(Self::NONE)
        }

        /// 是否属于四种不绘制箭身的样式（斜线、建筑斜线、积分号、无）。
        pub fn suppresses_body(&self) -> bool {
            matches!(
                self.name.as_str(),
                Self::OBLIQUE | Self::ARCH_TICK | Self::INTEGRAL | Self::NONE
            )
        }
    }

    impl Default for ArrowBlock {
        fn default() -> Self {
            Self::closed_filled()
        }
    }

    /// MText 九宫格锚点。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AttachmentPoint {
        TopLeft,
        TopCenter,
        TopRight,
        MiddleLeft,
        MiddleCenter,
        MiddleRight,
        BottomLeft,
        BottomCenter,
        BottomRight,
    }

    impl Default for AttachmentPoint {
        fn default() -> Self {
            AttachmentPoint::MiddleCenter
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LineSpacingStyle {
        AtLeast,
        Exact,
    }

    impl Default for LineSpacingStyle {
        fn default() -> Self {
            LineSpacingStyle::AtLeast
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LinePrimitive {
        pub start: Point2,
        pub end: Point2,
        pub color: Color,
        pub linetype: Linetype,
        pub lineweight: Lineweight,
        pub layer: String,
    }

    /// 圆弧图元，角度以弧度储存，遵循数学正方向。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ArcPrimitive {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub color: Color,
        pub linetype: Linetype,
        pub lineweight: Lineweight,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PointPrimitive {
        pub position: Point2,
        pub color: Color,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TextPrimitive {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        /// 度。
        pub rotation: f64,
        pub attachment: AttachmentPoint,
        pub style: TextStyle,
        pub color: Color,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MTextPrimitive {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        /// 度。
        pub rotation: f64,
        pub attachment: AttachmentPoint,
        pub line_spacing_style: LineSpacingStyle,
        pub line_spacing_factor: f64,
        pub style: TextStyle,
        pub color: Color,
        pub layer: String,
    }

    /// 箭头图元：以块资源引用 + 插入参数表达，由宿主负责实际展开。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ArrowPrimitive {
        pub block: ArrowBlock,
        pub insert: Point2,
        /// 度，箭头指向方向。
        pub rotation: f64,
        pub size: f64,
        pub color: Color,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Primitive {
        Line(LinePrimitive),
        Arc(ArcPrimitive),
        Point(PointPrimitive),
        Text(TextPrimitive),
        MText(MTextPrimitive),
        Arrow(ArrowPrimitive),
    }

    impl Primitive {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Primitive::Line(line) => &line.layer,
                Primitive::Arc(arc) => &arc.layer,
                Primitive::Point(point) => &point.layer,
                Primitive::Text(text) => &text.layer,
                Primitive::MText(mtext) => &mtext.layer,
                Primitive::Arrow(arrow) => &arrow.layer,
            }
        }

        /// 计算图元的 2D 轴对齐范围，文本与箭头退化为插入点。
        pub fn bounds(&self) -> Bounds2D {
            let mut bounds = Bounds2D::empty();
            match self {
                Primitive::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Primitive::Arc(arc) => {
                    let radius = arc.radius.abs();
                    let center = arc.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Primitive::Point(point) => bounds.include_point(point.position),
                Primitive::Text(text) => bounds.include_point(text.insert),
                Primitive::MText(mtext) => bounds.include_point(mtext.insert),
                Primitive::Arrow(arrow) => bounds.include_point(arrow.insert),
            }
            bounds
        }
    }

    /// 命名的可复用图元容器。标注渲染产物即一个匿名块。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Block {
        pub name: String,
        pub base_point: Point2,
        pub is_anonymous: bool,
        entities: Vec<Primitive>,
    }

    impl Block {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                base_point: Point2::new(0.0, 0.0),
                is_anonymous: false,
                entities: Vec::new(),
            }
        }

        /// 构造匿名块。匿名块由宿主分配的名字通常以 `*D` 开头。
        pub fn anonymous(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                base_point: Point2::new(0.0, 0.0),
                is_anonymous: true,
                entities: Vec::new(),
            }
        }

        #[inline]
        pub fn push(&mut self, primitive: Primitive) {
            self.entities.push(primitive);
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &Primitive> {
            self.entities.iter()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for entity in &self.entities {
                bounds.include_bounds(&entity.bounds());
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

}

pub mod style {
    use std::borrow::Cow;
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::entity::{ArrowBlock, Color, Linetype, Lineweight, TextStyle};

    /// 线性测量值的文本格式。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LinearUnitFormat {
        Scientific,
        Decimal,
        Engineering,
        Architectural,
        Fractional,
    }

    impl Default for LinearUnitFormat {
        fn default() -> Self {
            LinearUnitFormat::Decimal
        }
    }

    /// 角度测量值的文本格式。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AngularUnitFormat {
        DecimalDegrees,
        DegreesMinutesSeconds,
        Gradians,
        Radians,
    }

    impl Default for AngularUnitFormat {
        fn default() -> Self {
            AngularUnitFormat::DecimalDegrees
        }
    }

    /// 文字垂直位置（DIMTAD）。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TextVerticalPlacement {
        Centered,
        Above,
        Outside,
    }

    impl Default for TextVerticalPlacement {
        fn default() -> Self {
            TextVerticalPlacement::Centered
        }
    }

    /// 手工移动文字时的处理方式（DIMTMOVE）。
    /// `BesideDimLine` 会把手工给定的文字点重新解释为新的标注线位置。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FitTextMove {
        BesideDimLine,
        OverDimLineWithLeader,
        OverDimLineWithoutLeader,
    }

    impl Default for FitTextMove {
        fn default() -> Self {
            FitTextMove::BesideDimLine
        }
    }

    /// 角度精度的哨兵值：表示回退到 `decimal_places`。
    pub const ANGULAR_PRECISION_FOLLOWS_LINEAR: i16 = -1;

    /// 命名标注样式。发布后视为不可变值，按实例定制一律通过覆盖表。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DimensionStyle {
        pub name: String,

        // 标注线
        pub dim_line_color: Color,
        pub dim_line_linetype: Linetype,
        pub dim_line_lineweight: Lineweight,
        pub dim_line1_off: bool,
        pub dim_line2_off: bool,
        /// 采用无箭身箭头时标注线越过锚点的延伸量（DIMDLE）。
        pub dim_line_extend: f64,
        pub dim_baseline_spacing: f64,

        // 尺寸界线
        pub ext_line_color: Color,
        pub ext_line1_linetype: Linetype,
        pub ext_line2_linetype: Linetype,
        pub ext_line_lineweight: Lineweight,
        pub ext_line1_off: bool,
        pub ext_line2_off: bool,
        /// 尺寸界线离开参考点的起始间隙（DIMEXO）。
        pub ext_line_offset: f64,
        /// 尺寸界线越过标注线的延伸量（DIMEXE）。
        pub ext_line_extend: f64,

        // 箭头
        pub arrow1: Option<ArrowBlock>,
        pub arrow2: Option<ArrowBlock>,
        pub leader_arrow: Option<ArrowBlock>,
        pub arrow_size: f64,
        pub center_mark_size: f64,

        // 文字
        pub text_style: TextStyle,
        pub text_color: Color,
        pub text_height: f64,
        /// 文字与标注线之间的间隙（DIMGAP）。
        pub text_offset: f64,
        pub text_vertical_placement: TextVerticalPlacement,
        pub fit_text_move: FitTextMove,

        // 整体
        pub scale: f64,

        // 线性单位
        pub linear_format: LinearUnitFormat,
        pub decimal_places: i16,
        pub decimal_separator: char,
        pub suppress_linear_leading_zeros: bool,
        pub suppress_linear_trailing_zeros: bool,
        pub suppress_zero_feet: bool,
        pub suppress_zero_inches: bool,
        pub prefix: String,
        pub suffix: String,
        /// 舍入增量（DIMRND），0 表示不舍入。舍入发生在转文本之前。
        pub round_off: f64,
        pub linear_scale: f64,
        pub fraction_height_scale: f64,

        // 角度单位
        pub angular_format: AngularUnitFormat,
        /// `-1` 哨兵：回退到 `decimal_places`。
        pub angular_precision: i16,
        pub suppress_angular_leading_zeros: bool,
        pub suppress_angular_trailing_zeros: bool,
    }

    impl DimensionStyle {
        /// 以 DXF 惯用缺省值创建样式。
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                dim_line_color: Color::ByBlock,
                dim_line_linetype: Linetype::by_layer(),
                dim_line_lineweight: Lineweight::ByBlock,
                dim_line1_off: false,
                dim_line2_off: false,
                dim_line_extend: 0.0,
                dim_baseline_spacing: 0.38,
                ext_line_color: Color::ByBlock,
                ext_line1_linetype: Linetype::by_layer(),
                ext_line2_linetype: Linetype::by_layer(),
                ext_line_lineweight: Lineweight::ByBlock,
                ext_line1_off: false,
                ext_line2_off: false,
                ext_line_offset: 0.0625,
                ext_line_extend: 0.18,
                arrow1: None,
                arrow2: None,
                leader_arrow: None,
                arrow_size: 0.18,
                center_mark_size: 0.09,
                text_style: TextStyle::default(),
                text_color: Color::ByBlock,
                text_height: 0.18,
                text_offset: 0.09,
                text_vertical_placement: TextVerticalPlacement::default(),
                fit_text_move: FitTextMove::default(),
                scale: 1.0,
                linear_format: LinearUnitFormat::default(),
                decimal_places: 2,
                decimal_separator: '.',
                suppress_linear_leading_zeros: false,
                suppress_linear_trailing_zeros: false,
                suppress_zero_feet: true,
                suppress_zero_inches: true,
                prefix: String::new(),
                suffix: String::new(),
                round_off: 0.0,
                linear_scale: 1.0,
                fraction_height_scale: 1.0,
                angular_format: AngularUnitFormat::default(),
                angular_precision: ANGULAR_PRECISION_FOLLOWS_LINEAR,
                suppress_angular_leading_zeros: false,
                suppress_angular_trailing_zeros: false,
            }
        }

        /// 校验样式字段范围。标注构造时调用，渲染阶段不再复查。
        pub fn validate(&self) -> Result<(), StyleError> {
            if self.name.trim().is_empty() {
                return Err(StyleError::EmptyName);
            }
            for (name, value) in [
                ("arrow_size", self.arrow_size),
                ("text_height", self.text_height),
                ("scale", self.scale),
                ("linear_scale", self.linear_scale),
                ("fraction_height_scale", self.fraction_height_scale),
                ("text_style.width_factor", self.text_style.width_factor),
            ] {
                if value <= 0.0 {
                    return Err(StyleError::NonPositive { name, value });
                }
            }
            for (name, value) in [
                ("text_offset", self.text_offset),
                ("ext_line_offset", self.ext_line_offset),
                ("ext_line_extend", self.ext_line_extend),
                ("dim_line_extend", self.dim_line_extend),
                ("round_off", self.round_off),
            ] {
                if value < 0.0 {
                    return Err(StyleError::Negative { name, value });
                }
            }
            Ok(())
        }

        /// 合并覆盖表得到生效样式。覆盖表为空时直接借用基样式，不发生复制。
        pub fn resolve<'a>(&'a self, overrides: &StyleOverrideMap) -> Cow<'a, DimensionStyle> {
            if overrides.is_empty() {
                return Cow::Borrowed(self);
            }
            let mut effective = self.clone();
            for value in overrides.values() {
                value.apply(&mut effective);
            }
            Cow::Owned(effective)
        }
    }

    impl Default for DimensionStyle {
        fn default() -> Self {
            Self::new("Standard")
        }
    }

    #[derive(Debug, Error, PartialEq)]
    pub enum StyleError {
        #[error("style name must not be empty")]
        EmptyName,
        #[error("{name} must be positive, got {value}")]
        NonPositive { name: &'static str, value: f64 },
        #[error("{name} must not be negative, got {value}")]
        Negative { name: &'static str, value: f64 },
    }

    /// 覆盖项种类判别值。作为覆盖表的键，结构上保证每种至多一项。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum StyleOverrideKind {
        DimLineColor,
        DimLineLinetype,
        DimLineLineweight,
        DimLine1Off,
        DimLine2Off,
        DimLineExtend,
        DimBaselineSpacing,
        ExtLineColor,
        ExtLine1Linetype,
        ExtLine2Linetype,
        ExtLineLineweight,
        ExtLine1Off,
        ExtLine2Off,
        ExtLineOffset,
        ExtLineExtend,
        Arrow1,
        Arrow2,
        LeaderArrow,
        ArrowSize,
        CenterMarkSize,
        TextStyle,
        TextColor,
        TextHeight,
        TextOffset,
        TextVerticalPlacement,
        FitTextMove,
        Scale,
        LinearFormat,
        DecimalPlaces,
        DecimalSeparator,
        SuppressLinearLeadingZeros,
        SuppressLinearTrailingZeros,
        SuppressZeroFeet,
        SuppressZeroInches,
        Prefix,
        Suffix,
        RoundOff,
        LinearScale,
        FractionHeightScale,
        AngularFormat,
        AngularPrecision,
        SuppressAngularLeadingZeros,
        SuppressAngularTrailingZeros,
    }

    /// 按实例样式覆盖。每个变体携带与其种类匹配的负载，
    /// 解析时不需要任何运行时类型转换。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum StyleOverride {
        DimLineColor(Color),
        DimLineLinetype(Linetype),
        DimLineLineweight(Lineweight),
        DimLine1Off(bool),
        DimLine2Off(bool),
        DimLineExtend(f64),
        DimBaselineSpacing(f64),
        ExtLineColor(Color),
        ExtLine1Linetype(Linetype),
        ExtLine2Linetype(Linetype),
        ExtLineLineweight(Lineweight),
        ExtLine1Off(bool),
        ExtLine2Off(bool),
        ExtLineOffset(f64),
        ExtLineExtend(f64),
        Arrow1(Option<ArrowBlock>),
        Arrow2(Option<ArrowBlock>),
        LeaderArrow(Option<ArrowBlock>),
        ArrowSize(f64),
        CenterMarkSize(f64),
        TextStyle(TextStyle),
        TextColor(Color),
        TextHeight(f64),
        TextOffset(f64),
        TextVerticalPlacement(TextVerticalPlacement),
        FitTextMove(FitTextMove),
        Scale(f64),
        LinearFormat(LinearUnitFormat),
        DecimalPlaces(i16),
        DecimalSeparator(char),
        SuppressLinearLeadingZeros(bool),
        SuppressLinearTrailingZeros(bool),
        SuppressZeroFeet(bool),
        SuppressZeroInches(bool),
        Prefix(String),
        Suffix(String),
        RoundOff(f64),
        LinearScale(f64),
        FractionHeightScale(f64),
        AngularFormat(AngularUnitFormat),
        AngularPrecision(i16),
        SuppressAngularLeadingZeros(bool),
        SuppressAngularTrailingZeros(bool),
    }

    /// 覆盖表：以种类为键，重复写入同种覆盖即替换。
    pub type StyleOverrideMap = HashMap<StyleOverrideKind, StyleOverride>;

    impl StyleOverride {
        pub fn kind(&self) -> StyleOverrideKind {
            match self {
                StyleOverride::DimLineColor(_) => StyleOverrideKind::DimLineColor,
                StyleOverride::DimLineLinetype(_) => StyleOverrideKind::DimLineLinetype,
                StyleOverride::DimLineLineweight(_) => StyleOverrideKind::DimLineLineweight,
                StyleOverride::DimLine1Off(_) => StyleOverrideKind::DimLine1Off,
                StyleOverride::DimLine2Off(_) => StyleOverrideKind::DimLine2Off,
                StyleOverride::DimLineExtend(_) => StyleOverrideKind::DimLineExtend,
                StyleOverride::DimBaselineSpacing(_) => StyleOverrideKind::DimBaselineSpacing,
                StyleOverride::ExtLineColor(_) => StyleOverrideKind::ExtLineColor,
                StyleOverride::ExtLine1Linetype(_) => StyleOverrideKind::ExtLine1Linetype,
                StyleOverride::ExtLine2Linetype(_) => StyleOverrideKind::ExtLine2Linetype,
                StyleOverride::ExtLineLineweight(_) => StyleOverrideKind::ExtLineLineweight,
                StyleOverride::ExtLine1Off(_) => StyleOverrideKind::ExtLine1Off,
                StyleOverride::ExtLine2Off(_) => StyleOverrideKind::ExtLine2Off,
                StyleOverride::ExtLineOffset(_) => StyleOverrideKind::ExtLineOffset,
                StyleOverride::ExtLineExtend(_) => StyleOverrideKind::ExtLineExtend,
                StyleOverride::Arrow1(_) => StyleOverrideKind::Arrow1,
                StyleOverride::Arrow2(_) => StyleOverrideKind::Arrow2,
                StyleOverride::LeaderArrow(_) => StyleOverrideKind::LeaderArrow,
                StyleOverride::ArrowSize(_) => StyleOverrideKind::ArrowSize,
                StyleOverride::CenterMarkSize(_) => StyleOverrideKind::CenterMarkSize,
                StyleOverride::TextStyle(_) => StyleOverrideKind::TextStyle,
                StyleOverride::TextColor(_) => StyleOverrideKind::TextColor,
                StyleOverride::TextHeight(_) => StyleOverrideKind::TextHeight,
                StyleOverride::TextOffset(_) => StyleOverrideKind::TextOffset,
                StyleOverride::TextVerticalPlacement(_) => {
                    StyleOverrideKind::TextVerticalPlacement
                }
                StyleOverride::FitTextMove(_) => StyleOverrideKind::FitTextMove,
                StyleOverride::Scale(_) => StyleOverrideKind::Scale,
                StyleOverride::LinearFormat(_) => StyleOverrideKind::LinearFormat,
                StyleOverride::DecimalPlaces(_) => StyleOverrideKind::DecimalPlaces,
                StyleOverride::DecimalSeparator(_) => StyleOverrideKind::DecimalSeparator,
                StyleOverride::SuppressLinearLeadingZeros(_) => {
                    StyleOverrideKind::SuppressLinearLeadingZeros
                }
                StyleOverride::SuppressLinearTrailingZeros(_) => {
                    StyleOverrideKind::SuppressLinearTrailingZeros
                }
                StyleOverride::SuppressZeroFeet(_) => StyleOverrideKind::SuppressZeroFeet,
                StyleOverride::SuppressZeroInches(_) => StyleOverrideKind::SuppressZeroInches,
                StyleOverride::Prefix(_) => StyleOverrideKind::Prefix,
                StyleOverride::Suffix(_) => StyleOverrideKind::Suffix,
                StyleOverride::RoundOff(_) => StyleOverrideKind::RoundOff,
                StyleOverride::LinearScale(_) => StyleOverrideKind::LinearScale,
                StyleOverride::FractionHeightScale(_) => StyleOverrideKind::FractionHeightScale,
                StyleOverride::AngularFormat(_) => StyleOverrideKind::AngularFormat,
                StyleOverride::AngularPrecision(_) => StyleOverrideKind::AngularPrecision,
                StyleOverride::SuppressAngularLeadingZeros(_) => {
                    StyleOverrideKind::SuppressAngularLeadingZeros
                }
                StyleOverride::SuppressAngularTrailingZeros(_) => {
                    StyleOverrideKind::SuppressAngularTrailingZeros
                }
            }
        }

        /// 把单个覆盖写入目标样式。各覆盖相互独立，互不影响。
        pub fn apply(&self, style: &mut DimensionStyle) {
            match self {
                StyleOverride::DimLineColor(value) => style.dim_line_color = *value,
                StyleOverride::DimLineLinetype(value) => style.dim_line_linetype = value.clone(),
                StyleOverride::DimLineLineweight(value) => style.dim_line_lineweight = *value,
                StyleOverride::DimLine1Off(value) => style.dim_line1_off = *value,
                StyleOverride::DimLine2Off(value) => style.dim_line2_off = *value,
                StyleOverride::DimLineExtend(value) => style.dim_line_extend = *value,
                StyleOverride::DimBaselineSpacing(value) => style.dim_baseline_spacing = *value,
                StyleOverride::ExtLineColor(value) => style.ext_line_color = *value,
                StyleOverride::ExtLine1Linetype(value) => style.ext_line1_linetype = value.clone(),
                StyleOverride::ExtLine2Linetype(value) => style.ext_line2_linetype = value.clone(),
                StyleOverride::ExtLineLineweight(value) => style.ext_line_lineweight = *value,
                StyleOverride::ExtLine1Off(value) => style.ext_line1_off = *value,
                StyleOverride::ExtLine2Off(value) => style.ext_line2_off = *value,
                StyleOverride::ExtLineOffset(value) => style.ext_line_offset = *value,
                StyleOverride::ExtLineExtend(value) => style.ext_line_extend = *value,
                StyleOverride::Arrow1(value) => style.arrow1 = value.clone(),
                StyleOverride::Arrow2(value) => style.arrow2 = value.clone(),
                StyleOverride::LeaderArrow(value) => style.leader_arrow = value.clone(),
                StyleOverride::ArrowSize(value) => style.arrow_size = *value,
                StyleOverride::CenterMarkSize(value) => style.center_mark_size = *value,
                StyleOverride::TextStyle(value) => style.text_style = value.clone(),
                StyleOverride::TextColor(value) => style.text_color = *value,
                StyleOverride::TextHeight(value) => style.text_height = *value,
                StyleOverride::TextOffset(value) => style.text_offset = *value,
                StyleOverride::TextVerticalPlacement(value) => {
                    style.text_vertical_placement = *value
                }
                StyleOverride::FitTextMove(value) => style.fit_text_move = *value,
                StyleOverride::Scale(value) => style.scale = *value,
                StyleOverride::LinearFormat(value) => style.linear_format = *value,
                StyleOverride::DecimalPlaces(value) => style.decimal_places = *value,
                StyleOverride::DecimalSeparator(value) => style.decimal_separator = *value,
                StyleOverride::SuppressLinearLeadingZeros(value) => {
                    style.suppress_linear_leading_zeros = *value
                }
                StyleOverride::SuppressLinearTrailingZeros(value) => {
                    style.suppress_linear_trailing_zeros = *value
                }
                StyleOverride::SuppressZeroFeet(value) => style.suppress_zero_feet = *value,
                StyleOverride::SuppressZeroInches(value) => style.suppress_zero_inches = *value,
                StyleOverride::Prefix(value) => style.prefix = value.clone(),
                StyleOverride::Suffix(value) => style.suffix = value.clone(),
                StyleOverride::RoundOff(value) => style.round_off = *value,
                StyleOverride::LinearScale(value) => style.linear_scale = *value,
                StyleOverride::FractionHeightScale(value) => {
                    style.fraction_height_scale = *value
                }
                StyleOverride::AngularFormat(value) => style.angular_format = *value,
                StyleOverride::AngularPrecision(value) => style.angular_precision = *value,
                StyleOverride::SuppressAngularLeadingZeros(value) => {
                    style.suppress_angular_leading_zeros = *value
                }
                StyleOverride::SuppressAngularTrailingZeros(value) => {
                    style.suppress_angular_trailing_zeros = *value
                }
            }
        }
    }

}

pub mod units {
    use serde::{Deserialize, Serialize};

    use crate::style::{
        ANGULAR_PRECISION_FOLLOWS_LINEAR, AngularUnitFormat, DimensionStyle, LinearUnitFormat,
    };

    /// 格式化选项快照，由生效样式导出。格式化函数本身不持有状态。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct UnitStyleFormat {
        pub linear_decimal_places: i16,
        pub angular_decimal_places: i16,
        pub decimal_separator: char,
        pub suppress_linear_leading_zeros: bool,
        pub suppress_linear_trailing_zeros: bool,
        pub suppress_zero_feet: bool,
        pub suppress_zero_inches: bool,
        pub suppress_angular_leading_zeros: bool,
        pub suppress_angular_trailing_zeros: bool,
    }

    impl UnitStyleFormat {
        /// 从生效样式导出，并在此处落实角度精度哨兵的回退。
        pub fn from_style(style: &DimensionStyle) -> Self {
            let angular = if style.angular_precision <= ANGULAR_PRECISION_FOLLOWS_LINEAR {
                style.decimal_places
            } else {
                style.angular_precision
            };
            Self {
                linear_decimal_places: style.decimal_places.max(0),
                angular_decimal_places: angular.max(0),
                decimal_separator: style.decimal_separator,
                suppress_linear_leading_zeros: style.suppress_linear_leading_zeros,
                suppress_linear_trailing_zeros: style.suppress_linear_trailing_zeros,
                suppress_zero_feet: style.suppress_zero_feet,
                suppress_zero_inches: style.suppress_zero_inches,
                suppress_angular_leading_zeros: style.suppress_angular_leading_zeros,
                suppress_angular_trailing_zeros: style.suppress_angular_trailing_zeros,
            }
        }
    }

    impl Default for UnitStyleFormat {
        fn default() -> Self {
            Self::from_style(&DimensionStyle::default())
        }
    }

    /// 按增量舍入。增量为 0 时原样返回。
    pub fn apply_round_off(value: f64, round_off: f64) -> f64 {
        if round_off > 0.0 {
            (value / round_off).round() * round_off
        } else {
            value
        }
    }

    /// 线性测量值转文本。输入应已施加线性比例与舍入增量。
    pub fn format_linear(value: f64, format: LinearUnitFormat, options: &UnitStyleFormat) -> String {
        match format {
            LinearUnitFormat::Decimal => format_decimal(
                value,
                options.linear_decimal_places,
                options.decimal_separator,
                options.suppress_linear_leading_zeros,
                options.suppress_linear_trailing_zeros,
            ),
            LinearUnitFormat::Scientific => format_scientific(value, options),
            LinearUnitFormat::Engineering => format_engineering(value, options),
            LinearUnitFormat::Architectural => format_architectural(value, options),
            LinearUnitFormat::Fractional => format_fractional(value, options),
        }
    }

    /// 角度测量值（度）转文本。
    pub fn format_angular(
        value_deg: f64,
        format: AngularUnitFormat,
        options: &UnitStyleFormat,
    ) -> String {
        let places = options.angular_decimal_places;
        match format {
            AngularUnitFormat::DecimalDegrees => {
                let mut text = format_decimal(
                    value_deg,
                    places,
                    options.decimal_separator,
                    options.suppress_angular_leading_zeros,
                    options.suppress_angular_trailing_zeros,
                );
                text.push('°');
                text
            }
            AngularUnitFormat::Gradians => {
                let mut text = format_decimal(
                    value_deg * 10.0 / 9.0,
                    places,
                    options.decimal_separator,
                    options.suppress_angular_leading_zeros,
                    options.suppress_angular_trailing_zeros,
                );
                text.push('g');
                text
            }
            AngularUnitFormat::Radians => {
                let mut text = format_decimal(
                    value_deg.to_radians(),
                    places,
                    options.decimal_separator,
                    options.suppress_angular_leading_zeros,
                    options.suppress_angular_trailing_zeros,
                );
                text.push('r');
                text
            }
            AngularUnitFormat::DegreesMinutesSeconds => format_dms(value_deg, options),
        }
    }

    /// 完整的线性标注文本管线：线性比例 → 舍入增量 → 格式化 → 前后缀。
    pub fn format_dimension_length(value: f64, style: &DimensionStyle) -> String {
        let scaled = value * style.linear_scale;
        let rounded = apply_round_off(scaled, style.round_off);
        let options = UnitStyleFormat::from_style(style);
        let body = format_linear(rounded, style.linear_format, &options);
        format!("{}{}{}", style.prefix, body, style.suffix)
    }

    /// 完整的角度标注文本管线。舍入增量与线性比例不适用于角度。
    pub fn format_dimension_angle(value_deg: f64, style: &DimensionStyle) -> String {
        let options = UnitStyleFormat::from_style(style);
        format_angular(value_deg, style.angular_format, &options)
    }

    fn format_decimal(
        value: f64,
        places: i16,
        separator: char,
        suppress_leading: bool,
        suppress_trailing: bool,
    ) -> String {
        let places = places.max(0) as usize;
        let mut text = format!("{value:.places$}");
        // 消除 "-0.00" 这类负零
        if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
            text.remove(0);
        }
        if suppress_trailing && text.contains('.') {
            while text.ends_with('0') {
                text.pop();
            }
            if text.ends_with('.') {
                text.pop();
            }
        }
        if suppress_leading {
            if let Some(stripped) = text.strip_prefix("0.") {
                text = format!(".{stripped}");
            } else if let Some(stripped) = text.strip_prefix("-0.") {
                text = format!("-.{stripped}");
            }
        }
        if separator != '.' {
            text = text.replace('.', &separator.to_string());
        }
        text
    }

    fn format_scientific(value: f64, options: &UnitStyleFormat) -> String {
        let places = options.linear_decimal_places.max(0) as usize;
        let raw = format!("{value:.places$e}");
        let (mantissa, exponent) = match raw.split_once('e') {
            Some(parts) => parts,
            None => (raw.as_str(), "0"),
        };
        let mantissa_value: f64 = mantissa.parse().unwrap_or(0.0);
        let exponent_value: i32 = exponent.parse().unwrap_or(0);
        let mantissa_text = format_decimal(
            mantissa_value,
            options.linear_decimal_places,
            options.decimal_separator,
            options.suppress_linear_leading_zeros,
            options.suppress_linear_trailing_zeros,
        );
        let sign = if exponent_value < 0 { '-' } else { '+' };
        format!("{mantissa_text}E{sign}{:02}", exponent_value.abs())
    }

    /// 工程单位：英尺 + 十进制英寸。输入值按图形单位 = 英寸解释。
    fn format_engineering(value: f64, options: &UnitStyleFormat) -> String {
        let negative = value < 0.0;
        let total_inches = value.abs();
        let mut feet = (total_inches / 12.0).trunc();
        let mut inches = total_inches - feet * 12.0;

        let factor = 10f64.powi(options.linear_decimal_places.max(0) as i32);
        inches = (inches * factor).round() / factor;
        if inches >= 12.0 {
            feet += 1.0;
            inches = 0.0;
        }

        let inches_text = format_decimal(
            inches,
            options.linear_decimal_places,
            options.decimal_separator,
            options.suppress_linear_leading_zeros,
            options.suppress_linear_trailing_zeros,
        );
        let feet_value = feet as i64;
        let inches_is_zero = inches.abs() < f64::EPSILON;
        let body = if feet_value == 0 && options.suppress_zero_feet {
            format!("{inches_text}\"")
        } else if inches_is_zero && options.suppress_zero_inches {
            format!("{feet_value}'")
        } else {
            format!("{feet_value}'-{inches_text}\"")
        };
        if negative { format!("-{body}") } else { body }
    }

    /// 建筑单位：英尺 + 二进制分数英寸，分母为精度导出的 2 的幂。
    fn format_architectural(value: f64, options: &UnitStyleFormat) -> String {
        let negative = value < 0.0;
        let total_inches = value.abs();
        let mut feet = (total_inches / 12.0).trunc() as i64;
        let inches = total_inches - feet as f64 * 12.0;
        let (mut whole, numerator, denominator) =
            split_fraction(inches, options.linear_decimal_places);
        if whole >= 12 && numerator == 0 {
            feet += 1;
            whole -= 12;
        }

        let inch_text = fraction_text(whole, numerator, denominator);
        let inches_is_zero = whole == 0 && numerator == 0;
        let body = if feet == 0 && options.suppress_zero_feet {
            format!("{inch_text}\"")
        } else if inches_is_zero && options.suppress_zero_inches {
            format!("{feet}'")
        } else {
            format!("{feet}'-{inch_text}\"")
        };
        if negative { format!("-{body}") } else { body }
    }

    fn format_fractional(value: f64, options: &UnitStyleFormat) -> String {
        let negative = value < 0.0;
        let (whole, numerator, denominator) =
            split_fraction(value.abs(), options.linear_decimal_places);
        let body = fraction_text(whole, numerator, denominator);
        if negative { format!("-{body}") } else { body }
    }

    /// 把数值拆为整数 + 最简二进制分数。分母为 `2^places`，上限 256。
    fn split_fraction(value: f64, places: i16) -> (i64, u64, u64) {
        let exponent = places.clamp(0, 8) as u32;
        let denominator: u64 = 1 << exponent;
        let mut whole = value.trunc() as i64;
        let mut numerator = ((value - value.trunc()) * denominator as f64).round() as u64;
        if numerator == denominator {
            whole += 1;
            numerator = 0;
        }
        if numerator == 0 {
            return (whole, 0, denominator);
        }
        let divisor = gcd(numerator, denominator);
        (whole, numerator / divisor, denominator / divisor)
    }

    fn fraction_text(whole: i64, numerator: u64, denominator: u64) -> String {
        if numerator == 0 {
            format!("{whole}")
        } else if whole == 0 {
            format!("{numerator}/{denominator}")
        } else {
            format!("{whole} {numerator}/{denominator}")
        }
    }

    fn gcd(mut a: u64, mut b: u64) -> u64 {
        while b != 0 {
            let remainder = a % b;
            a = b;
            b = remainder;
        }
        a
    }

    /// 度分秒。精度分层：0 → 仅度；1–2 → 度分；3–4 → 度分秒；
    /// ≥5 → 秒携带小数位，此时零抑制无意义因而禁用。
    fn format_dms(value_deg: f64, options: &UnitStyleFormat) -> String {
        let places = options.angular_decimal_places.max(0);
        let negative = value_deg < 0.0;
        let value = value_deg.abs();

        let body = if places == 0 {
            format!("{}°", value.round() as i64)
        } else if places <= 2 {
            let total_minutes = (value * 60.0).round() as i64;
            let degrees = total_minutes / 60;
            let minutes = total_minutes % 60;
            format!("{degrees}°{minutes:02}'")
        } else if places <= 4 {
            let total_seconds = (value * 3600.0).round() as i64;
            let degrees = total_seconds / 3600;
            let minutes = (total_seconds % 3600) / 60;
            let seconds = total_seconds % 60;
            format!("{degrees}°{minutes:02}'{seconds:02}\"")
        } else {
            let second_places = (places - 4) as usize;
            let degrees = value.trunc();
            let minutes_total = (value - degrees) * 60.0;
            let minutes = minutes_total.trunc();
            let seconds = (minutes_total - minutes) * 60.0;
            format!(
                "{}°{:02}'{:.second_places$}\"",
                degrees as i64, minutes as i64, seconds,
            )
        };
        if negative { format!("-{body}") } else { body }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::style::{AngularUnitFormat, LinearUnitFormat};

        fn defaults() -> UnitStyleFormat {
            UnitStyleFormat {
                linear_decimal_places: 2,
                angular_decimal_places: 2,
                decimal_separator: '.',
                suppress_linear_leading_zeros: false,
                suppress_linear_trailing_zeros: false,
                suppress_zero_feet: false,
                suppress_zero_inches: false,
                suppress_angular_leading_zeros: false,
                suppress_angular_trailing_zeros: false,
            }
        }

        #[test]
        fn decimal_respects_separator_and_suppression() {
            let mut options = defaults();
            assert_eq!(
                format_linear(12.5, LinearUnitFormat::Decimal, &options),
                "12.50"
            );

            options.decimal_separator = ',';
            assert_eq!(
                format_linear(12.5, LinearUnitFormat::Decimal, &options),
                "12,50"
            );

            options.decimal_separator = '.';
            options.suppress_linear_trailing_zeros = true;
            assert_eq!(
                format_linear(12.5, LinearUnitFormat::Decimal, &options),
                "12.5"
            );
            assert_eq!(
                format_linear(12.0, LinearUnitFormat::Decimal, &options),
                "12"
            );

            options.suppress_linear_leading_zeros = true;
            assert_eq!(
                format_linear(0.25, LinearUnitFormat::Decimal, &options),
                ".25"
            );
        }

        #[test]
        fn negative_zero_never_appears() {
            let options = defaults();
            assert_eq!(
                format_linear(-0.0001, LinearUnitFormat::Decimal, &options),
                "0.00"
            );
        }

        #[test]
        fn scientific_keeps_exponent_form() {
            let options = defaults();
            assert_eq!(
                format_linear(1250.0, LinearUnitFormat::Scientific, &options),
                "1.25E+03"
            );
            assert_eq!(
                format_linear(0.05, LinearUnitFormat::Scientific, &options),
                "5.00E-02"
            );
        }

        #[test]
        fn engineering_splits_feet_and_decimal_inches() {
            let options = defaults();
            assert_eq!(
                format_linear(26.25, LinearUnitFormat::Engineering, &options),
                "2'-2.25\""
            );

            let mut suppressing = defaults();
            suppressing.suppress_zero_feet = true;
            assert_eq!(
                format_linear(9.5, LinearUnitFormat::Engineering, &suppressing),
                "9.50\""
            );
            suppressing.suppress_zero_inches = true;
            assert_eq!(
                format_linear(24.0, LinearUnitFormat::Engineering, &suppressing),
                "2'"
            );
        }

        #[test]
        fn architectural_rounds_to_power_of_two_denominator() {
            let mut options = defaults();
            options.linear_decimal_places = 4; // 1/16
            assert_eq!(
                format_linear(26.26, LinearUnitFormat::Architectural, &options),
                "2'-2 1/4\""
            );
            // rounding carries into the next whole foot
            assert_eq!(
                format_linear(11.97, LinearUnitFormat::Architectural, &options),
                "1'-0\""
            );
        }

        #[test]
        fn fractional_reduces_fraction() {
            let mut options = defaults();
            options.linear_decimal_places = 4;
            assert_eq!(
                format_linear(5.5, LinearUnitFormat::Fractional, &options),
                "5 1/2"
            );
            assert_eq!(
                format_linear(0.125, LinearUnitFormat::Fractional, &options),
                "1/8"
            );
        }

        #[test]
        fn dms_precision_tiers() {
            let mut options = defaults();
            options.angular_decimal_places = 0;
            assert_eq!(
                format_angular(30.51, AngularUnitFormat::DegreesMinutesSeconds, &options),
                "31°"
            );
            options.angular_decimal_places = 2;
            assert_eq!(
                format_angular(30.5, AngularUnitFormat::DegreesMinutesSeconds, &options),
                "30°30'"
            );
            options.angular_decimal_places = 4;
            assert_eq!(
                format_angular(30.2575, AngularUnitFormat::DegreesMinutesSeconds, &options),
                "30°15'27\""
            );
            options.angular_decimal_places = 5;
            assert_eq!(
                format_angular(30.25755, AngularUnitFormat::DegreesMinutesSeconds, &options),
                "30°15'27.2\""
            );
        }

        #[test]
        fn gradians_and_radians_carry_suffix() {
            let options = defaults();
            assert_eq!(
                format_angular(90.0, AngularUnitFormat::Gradians, &options),
                "100.00g"
            );
            assert_eq!(
                format_angular(180.0, AngularUnitFormat::Radians, &options),
                "3.14r"
            );
        }

        #[test]
        fn round_off_happens_before_formatting() {
            let mut style = DimensionStyle::default();
            style.round_off = 0.25;
            style.decimal_places = 2;
            assert_eq!(format_dimension_length(10.3, &style), "10.25");
            assert_eq!(format_dimension_length(10.4, &style), "10.50");
        }

        #[test]
        fn linear_scale_applies_before_round_off() {
            let mut style = DimensionStyle::default();
            style.linear_scale = 2.0;
            style.round_off = 1.0;
            assert_eq!(format_dimension_length(5.2, &style), "10.00");
        }

        #[test]
        fn prefix_and_suffix_wrap_linear_text() {
            let mut style = DimensionStyle::default();
            style.prefix = "Ø".to_string();
            style.suffix = " mm".to_string();
            assert_eq!(format_dimension_length(12.0, &style), "Ø12.00 mm");
        }

        #[test]
        fn angular_precision_sentinel_falls_back_to_linear() {
            let mut style = DimensionStyle::default();
            style.decimal_places = 3;
            style.angular_precision = ANGULAR_PRECISION_FOLLOWS_LINEAR;
            let options = UnitStyleFormat::from_style(&style);
            assert_eq!(options.angular_decimal_places, 3);

            style.angular_precision = 1;
            let options = UnitStyleFormat::from_style(&style);
            assert_eq!(options.angular_decimal_places, 1);
        }

        #[test]
        fn formatting_is_deterministic() {
            let options = defaults();
            let first = format_linear(123.456, LinearUnitFormat::Decimal, &options);
            let second = format_linear(123.456, LinearUnitFormat::Decimal, &options);
            assert_eq!(first, second);
        }
    }
}
