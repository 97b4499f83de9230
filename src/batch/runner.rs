//! # 批量执行器
//!
//! 依次处理多个测量文件。单个文件失败不会中断后续文件，
//! 失败信息在结束时汇总。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条

use crate::utils::progress;

use std::path::{Path, PathBuf};

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功，附带说明
    Success(String),
    /// 处理完成但拟合未收敛
    NotConverged(String, String), // (文件路径, 求解器信息)
    /// 处理失败
    Failed(String, String), // (文件路径, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 未收敛数量
    pub not_converged: usize,
    /// 失败数量
    pub failed: usize,
    /// 未收敛详情
    pub warnings: Vec<(String, String)>,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::NotConverged(path, msg) => {
                self.not_converged += 1;
                self.warnings.push((path, msg));
            }
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.not_converged + self.failed
    }
}

/// 顺序批量执行器
#[derive(Debug, Default)]
pub struct BatchRunner {
    /// 是否显示进度条
    show_progress: bool,
}

impl BatchRunner {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }

    /// 依次处理文件列表
    pub fn run<F>(&self, files: &[PathBuf], mut processor: F) -> BatchResult
    where
        F: FnMut(&Path) -> ProcessResult,
    {
        let pb = self
            .show_progress
            .then(|| progress::create_progress_bar(files.len() as u64, "Fitting"));

        let mut batch_result = BatchResult::default();
        for file in files {
            if let Some(pb) = &pb {
                pb.set_message(
                    file.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
            }

            batch_result.merge(processor(file));

            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        batch_result
    }
}
