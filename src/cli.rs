// src/cli.rs

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, LoggingConfig, default_config_path};
use crate::directory_service::{DirectoryClient, DirectoryError, HttpDirectoryClient};
use crate::logging::init_logging;
use crate::mfa_default::{MfaDefaultSetter, SetDefaultOutcome};
use crate::models::{MfaMethodType, UnknownMethodType, mfa::default_method};

// === CLI ===

#[derive(Parser)]
#[command(name = "mfa-default")]
#[command(author, version, about = "Смена метода MFA по умолчанию у учётных записей каталога", long_about = None)]
pub struct Cli {
    /// Путь к config.yaml (по умолчанию ~/.config/mfa-default/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
    #[command(flatten)]
    Directory(DirectoryCommand),
    /// Создать шаблон конфигурации
    InitConfig {
        path: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
}

/// Команды, которым нужна сессия каталога
#[derive(clap::Subcommand)]
pub enum DirectoryCommand {
    /// Назначить метод MFA по умолчанию
    SetDefault {
        /// PhoneAppNotification, OneWaySMS, TwoWayVoiceMobile или PhoneAppOTP
        #[arg(short, long, value_parser = parse_method_type)]
        method: MfaMethodType,
        /// UPN пользователей
        #[arg(required_unless_present = "users_file")]
        users: Vec<String>,
        /// Файл со списком UPN, по одному в строке
        #[arg(long)]
        users_file: Option<PathBuf>,
    },
    /// Показать методы MFA пользователя
    Show {
        user: String,
        #[arg(short, long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        match self.command {
            Command::InitConfig { path, force } => {
                init_logging(&LoggingConfig::default()).ok();
                handle_init_config(path.or(self.config), force)
            }
            Command::Directory(command) => {
                run_against_directory(self.config.as_deref(), command).await
            }
        }
    }
}

async fn run_against_directory(
    config_path: Option<&Path>,
    mut command: DirectoryCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    // Файл со списком читаем до подключения, чтобы не получать токен зря
    if let DirectoryCommand::SetDefault {
        users,
        users_file: Some(path),
        ..
    } = &mut command
    {
        users.extend(read_users_file(path)?);
    }

    let config = AppConfig::load(config_path)?;
    init_logging(&config.logging).map_err(|e| e.to_string())?;

    let credential = config.credential.into_credential()?;
    let client = HttpDirectoryClient::connect(&config.directory, credential).await?;
    let setter = MfaDefaultSetter::new(client);

    match command {
        DirectoryCommand::SetDefault { method, users, .. } => {
            handle_set_default(&setter, &users, &method).await
        }
        DirectoryCommand::Show { user, json } => handle_show(&setter, &user, json).await,
    }
}

// From<String> принимает любое значение, а здесь нужны только известные типы
fn parse_method_type(s: &str) -> Result<MfaMethodType, UnknownMethodType> {
    s.parse()
}

/// Прочитать UPN из файла: пустые строки и `#`-комментарии пропускаются
pub fn read_users_file(path: &Path) -> Result<Vec<String>, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_users(&content))
}

fn parse_users(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

// === Обработчики ===

async fn handle_set_default<C: DirectoryClient>(
    setter: &MfaDefaultSetter<C>,
    principals: &[String],
    method: &MfaMethodType,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = 0usize;

    for principal in principals {
        match setter.set_default_method(principal, method).await {
            Ok(SetDefaultOutcome::Updated { .. }) => {
                println!("✅ {}: метод по умолчанию — {}", principal, method);
            }
            Ok(SetDefaultOutcome::NotConfigured { .. }) => {
                println!("⚠️  {}: метод {} не настроен, изменений нет", principal, method);
            }
            // Сессия недействительна — дальше идти бессмысленно
            Err(e @ DirectoryError::Auth(_)) => return Err(e.into()),
            Err(e) => {
                failed += 1;
                eprintln!("❌ {}: {}", principal, e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} accounts failed", failed, principals.len()).into());
    }
    Ok(())
}

async fn handle_show<C: DirectoryClient>(
    setter: &MfaDefaultSetter<C>,
    user: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let methods = setter.methods(user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&methods)?);
        return Ok(());
    }

    if methods.is_empty() {
        println!("У пользователя {} нет методов MFA", user);
        return Ok(());
    }

    for method in &methods {
        let marker = if method.is_default { "*" } else { " " };
        println!("{} {}", marker, method.method_type);
    }
    if default_method(&methods).is_none() {
        println!("(метод по умолчанию не выбран)");
    }
    Ok(())
}

fn handle_init_config(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = path
        .or_else(default_config_path)
        .ok_or("Cannot determine config directory, pass a path")?;

    if path.exists() && !force {
        return Err(format!("{} already exists, use --force to overwrite", path.display()).into());
    }

    AppConfig::template().save(&path)?;
    println!("✅ Шаблон конфигурации создан: {}", path.display());
    println!("   Секреты задаются через MFA_DEFAULT_CREDENTIAL__CLIENT_SECRET или .env");
    Ok(())
}
