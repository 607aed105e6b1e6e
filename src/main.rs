use anyhow::{anyhow, Result};
use clap::Parser;
use vital_triage::config::{Cli, Commands, Config};
use vital_triage::health::{self, HealthData, HealthError, MembershipModel, Term, Variable};
use vital_triage::server::DiagnosisServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load_with_cli(cli.clone())?;

    // 初始化日志系统（guard 持有到进程退出）
    let _log_guard = config.init_logging()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!("Vital Triage Starting...");
            let server = DiagnosisServer::bind(&config.server).await?;
            tracing::info!("Vital Triage Ready!");
            server.run().await?;
        }
        Commands::Evaluate {
            name,
            temperature,
            heart_rate,
            blood_pressure,
            respiratory_rate,
            oxygen_saturation,
            blood_sugar,
        } => {
            let data = HealthData {
                name,
                temperature,
                heart_rate,
                blood_pressure,
                respiratory_rate,
                oxygen_saturation,
                blood_sugar,
            };
            let response = health::diagnose(&data)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Membership {
            variable,
            value,
            term,
        } => {
            let variable: Variable = variable.parse()?;
            let model = MembershipModel::shared();
            match term {
                Some(term) => {
                    let term: Term = term.parse()?;
                    let linguistic = model
                        .term(variable, term)
                        .ok_or(HealthError::TermNotDefined { variable, term })?;
                    println!("{}.{} = {}", variable, term, linguistic.degree_at(value));
                }
                None => {
                    for (term, degree) in model.profile(variable, value) {
                        println!("{}.{} = {}", variable, term, degree);
                    }
                }
            }
        }
        Commands::ResetConfig => {
            // 重置配置
            let default_config = Config::default();
            let config_path =
                Config::get_user_config_path().ok_or_else(|| anyhow!("无法确定配置文件路径"))?;
            default_config.save_to_file(&config_path)?;
            println!("配置已重置到: {}", config_path.display());
        }
    }

    Ok(())
}
