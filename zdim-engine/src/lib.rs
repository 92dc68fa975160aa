pub mod block_builder;
pub mod dimension;

pub mod errors {
    use thiserror::Error;
    use zdim_core::style::StyleError;

    /// 标注构造与几何修改阶段的统一错误。
    /// 所有校验在写入前完成，失败的修改不会留下半更新状态。
    #[derive(Debug, Error, PartialEq)]
    pub enum DimensionError {
        #[error("defining lines are parallel, no intersection exists")]
        ParallelLines,
        #[error("{context} must be distinct")]
        CoincidentPoints { context: &'static str },
        #[error("{name} must be positive, got {value}")]
        NonPositive { name: &'static str, value: f64 },
        #[error("{name} must not be negative, got {value}")]
        Negative { name: &'static str, value: f64 },
        #[error("{name} must be within [{min}, {max}], got {value}")]
        OutOfRange {
            name: &'static str,
            value: f64,
            min: f64,
            max: f64,
        },
        #[error("normal must not be the zero vector")]
        ZeroNormal,
        #[error("operation requires a {expected} dimension")]
        VariantMismatch { expected: &'static str },
        #[error(transparent)]
        Style(#[from] StyleError),
    }
}

pub use block_builder::build_dimension_block;
pub use dimension::{Dimension, DimensionKind, OrdinateAxis};
pub use errors::DimensionError;
