//! 批量批改处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个批改流程的入口，负责批量图片的调度和统计。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、创建输出目录
//! 2. **批量加载**：扫描输入目录中的所有图片，并按文件名排序
//! 3. **顺序处理**：逐张调用 `GradingFlow`，单张失败只记录不中断
//! 4. **结果展示**：每张图片处理完后打印摘要
//! 5. **全局统计**：汇总成功/失败数量
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个阶段的细节
//! - **错误隔离**：所有单文件错误都在这里被捕获
//! - **向下委托**：委托 workflow::GradingFlow 处理单张图片

use crate::config::Config;
use crate::models::context::GradingContext;
use crate::models::loaders::list_input_images;
use crate::models::teacher_config::TeacherConfig;
use crate::services::ChatModel;
use crate::utils::logging::{
    append_log_line, init_log_file, log_images_loaded, log_startup, print_final_stats,
};
use crate::utils::report::render_summary;
use crate::workflow::{GradingFlow, ImageCtx};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App<M> {
    config: Config,
    context: GradingContext,
    flow: GradingFlow<M>,
}

impl<M: ChatModel> App<M> {
    /// 初始化应用
    pub async fn initialize(
        config: Config,
        model: M,
        teacher_config: TeacherConfig,
        context: GradingContext,
    ) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)
            .with_context(|| format!("无法创建日志文件: {}", config.output_log_file))?;

        log_startup(&config.input_dir);

        let flow = GradingFlow::new(Arc::new(model), &config, teacher_config);
        flow.writer().ensure_dirs().await?;

        Ok(Self {
            config,
            context,
            flow,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchStats> {
        let images = self.load_images().await?;

        if images.is_empty() {
            warn!("⚠️ 没有找到待批改的图片，程序结束");
            return Ok(BatchStats::default());
        }

        log_images_loaded(images.len());

        let stats = self.process_all_images(&images).await;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );
        self.log_to_file(&format!(
            "完成: 成功 {}/{}，失败 {}",
            stats.success, stats.total, stats.failed
        ));

        Ok(stats)
    }

    /// 加载图片，按文件名排序保证结果可复现
    async fn load_images(&self) -> Result<Vec<PathBuf>> {
        info!("\n📁 正在扫描待批改的图片...");
        let mut images = list_input_images(Path::new(&self.config.input_dir)).await?;
        images.sort();
        Ok(images)
    }

    /// 逐张处理所有图片
    async fn process_all_images(&self, images: &[PathBuf]) -> BatchStats {
        let total = images.len();
        let mut stats = BatchStats {
            total,
            ..Default::default()
        };

        for (idx, image_path) in images.iter().enumerate() {
            let ctx = ImageCtx::new(image_path.clone(), idx + 1, total);
            info!("\n{}", "─".repeat(60));
            info!("{} 📄 开始处理", ctx);

            match self.flow.run(&ctx, &self.context).await {
                Ok(graded) => {
                    println!("{}", render_summary(&ctx.file_name(), &graded, &self.context));
                    self.log_to_file(&format!(
                        "{} | 成功 | 校验得分 {:.1}%",
                        ctx.file_name(),
                        graded.validation.score
                    ));
                    stats.success += 1;
                }
                Err(failure) => {
                    error!("{} ❌ 处理失败: {}", ctx, failure);
                    self.log_to_file(&format!("{} | 失败 | {}", ctx.file_name(), failure));
                    stats.failed += 1;
                    stats.failures.push((ctx.file_name(), failure.to_string()));
                }
            }
        }

        stats
    }

    fn log_to_file(&self, line: &str) {
        if let Err(e) = append_log_line(&self.config.output_log_file, line) {
            warn!("⚠️ 写入日志文件失败: {}", e);
        }
    }
}

/// 处理统计
#[derive(Debug, Default, Clone)]
pub struct BatchStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    /// (文件名, 失败原因)
    pub failures: Vec<(String, String)>,
}
