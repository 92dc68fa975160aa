use thiserror::Error;
use zdim_engine::DimensionError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("构建演示标注失败: {0}")]
    Dimension(#[from] DimensionError),
}
