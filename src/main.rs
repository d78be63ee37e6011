use academic_feedback::error::ConfigError;
use academic_feedback::utils::logging;
use academic_feedback::utils::prompt::{collect_grading_context, DEFAULT_WORD_LIMIT};
use academic_feedback::{App, Config, LlmService, TeacherConfig};
use anyhow::Result;
use std::future::Future;
use std::io;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // 读取 .env（可选）
    let _ = dotenvy::dotenv();

    // 加载配置并初始化日志
    let config = Config::from_env();
    logging::init(config.as_ref().map(|c| c.verbose_logging).unwrap_or(false));

    match run_until_interrupt(run(config), tokio::signal::ctrl_c()).await {
        Outcome::Interrupted => {
            info!("收到中断信号，程序退出");
            std::process::exit(0);
        }
        Outcome::Finished(Err(e)) => {
            error!("程序异常退出: {:#}", e);
            eprintln!("An unexpected error occurred; see the log above for details.");
            std::process::exit(1);
        }
        Outcome::Finished(Ok(())) => {}
    }
}

/// 运行结果
enum Outcome {
    Finished(Result<()>),
    Interrupted,
}

/// 运行批改，直到完成或收到中断信号
///
/// 信号处理注册失败时只记录警告，批改继续执行
async fn run_until_interrupt<R, S>(run: R, signal: S) -> Outcome
where
    R: Future<Output = Result<()>>,
    S: Future<Output = io::Result<()>>,
{
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => Outcome::Finished(result),
        signal = signal => match signal {
            Ok(()) => Outcome::Interrupted,
            Err(e) => {
                warn!("无法注册中断信号处理: {}", e);
                Outcome::Finished(run.await)
            }
        },
    }
}

async fn run(config: Result<Config, ConfigError>) -> Result<()> {
    let config = config?;

    // 加载教师配置
    let teacher_config = TeacherConfig::load(&config.teacher_config_dir).await?;
    let default_word_limit = teacher_config
        .preferences()
        .word_limit
        .unwrap_or(DEFAULT_WORD_LIMIT);

    // 录入批改上下文（阻塞读取终端）
    let context = tokio::task::spawn_blocking(move || {
        let mut input = io::stdin().lock();
        let mut output = io::stdout();
        collect_grading_context(&mut input, &mut output, default_word_limit)
    })
    .await??;

    // 初始化并运行应用
    let model = LlmService::new(&config);
    let app = App::initialize(config, model, teacher_config, context).await?;
    app.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interrupt_stops_the_run() {
        let outcome = run_until_interrupt(std::future::pending(), async { Ok(()) }).await;
        assert!(matches!(outcome, Outcome::Interrupted));
    }

    #[tokio::test]
    async fn test_failed_signal_handler_lets_the_run_finish() {
        let run = async {
            tokio::task::yield_now().await;
            Ok(())
        };
        let signal = async { Err(io::Error::other("no signal handler")) };

        let outcome = run_until_interrupt(run, signal).await;
        assert!(matches!(outcome, Outcome::Finished(Ok(()))));
    }

    #[tokio::test]
    async fn test_run_error_is_reported() {
        let outcome =
            run_until_interrupt(async { Err(anyhow::anyhow!("boom")) }, std::future::pending())
                .await;
        assert!(matches!(outcome, Outcome::Finished(Err(_))));
    }
}
