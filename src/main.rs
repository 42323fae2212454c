mod app_service;
mod app_state;
mod commands;
mod config;
mod error;
mod linking;
mod storage;
#[cfg(test)]
mod test_support;
mod ui;
mod validate;

use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::app_service::{refresh_stats, refresh_ui};
use crate::app_state::{App, AppEvent};
use crate::commands::AppCommand;
use crate::config::AppConfig;
use crate::linking::{LinkStatus, Linker, SqliteLinkSource};
use crate::storage::repository::{FieldBoundaryRepository, FormResponseRepository};
use crate::ui::draw;

const HELP_TEXT: &str = "可用命令: link <farmer_id> <crop> | farmer <farmer_id> | dataset | stats | refresh | import <file.json> | export <file.json> | filter [linked|production_only|boundaries_only|no_data|all] [text] | filter clear | quit";

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    let mut startup_info = Vec::new();

    // 先加载 .env，日志目录等配置可能来自其中
    let current_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    startup_info.push(format!("当前工作目录: {}", current_dir.display()));
    match dotenv::dotenv() {
        Ok(path) => startup_info.push(format!("✓ 找到 .env 文件: {}", path.display())),
        Err(_) => startup_info.push("⚠ 未找到 .env 文件，使用系统环境变量".to_string()),
    }

    let config = AppConfig::from_env();

    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    std::fs::create_dir_all(&config.log_dir)?;
    let log_path = config.log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // TUI 占用终端，日志只写文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("fieldlink", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .init();
    startup_info.push(format!("日志文件: {}", log_path.display()));
    info!("config: {:?}", config);

    // 初始化数据库
    startup_info.push(format!("正在连接数据库: {}", config.database_url));
    if config.is_memory_db() {
        startup_info.push("⚠ 使用内存数据库，退出后数据不会保留".to_string());
    }
    let db = match storage::establish_connection(&config.database_url).await {
        Ok(connection) => {
            startup_info.push("✓ 数据库连接成功".to_string());
            Arc::new(connection)
        }
        Err(e) => {
            eprintln!("无法连接数据库: {}", e);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("数据库连接失败: {}", e),
            ));
        }
    };
    startup_info.push(format!("作物匹配方式: {:?}", config.crop_match));

    let linker = Arc::new(Linker::new(Arc::new(SqliteLinkSource::new(
        db.clone(),
        config.crop_match,
    ))));

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 周期性重新计算总览
    {
        let linker = linker.clone();
        let tx = evt_tx.clone();
        let period = Duration::from_secs(config.refresh_secs.max(1));
        tokio::spawn(async move {
            loop {
                refresh_ui(&linker, &tx).await;
                tokio::time::sleep(period).await;
            }
        });
    }

    // 单后台任务模型 (Actor)：串行执行命令
    tokio::spawn(run_actor(db.clone(), linker, cmd_rx, evt_tx));

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(startup_info, cmd_tx, evt_rx);

    let res = match app.evt_rx.take() {
        Some(rx) => run_app_loop(&mut terminal, &mut app, rx).await,
        None => Ok(()),
    };

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        error!("ui loop exited with error: {}", e);
    }
    res
}

async fn run_actor(
    db: Arc<sea_orm::DatabaseConnection>,
    linker: Arc<Linker>,
    mut cmd_rx: mpsc::UnboundedReceiver<AppCommand>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            AppCommand::Link {
                farmer_id,
                crop_type,
            } => match linker.link_farmer_crop(&farmer_id, &crop_type).await {
                Ok(record) => {
                    let _ = evt_tx.send(AppEvent::Log(format!(
                        "{} / {}: {}，田块 {} 块",
                        farmer_id,
                        crop_type,
                        record.status.as_str(),
                        record.metrics.total_fields
                    )));
                    let _ = evt_tx.send(AppEvent::Detail(record));
                }
                Err(e) => {
                    let _ = evt_tx.send(AppEvent::Error(format!("✗ 关联查询失败: {}", e)));
                }
            },
            AppCommand::Farmer { farmer_id } => match linker.farmer_overview(&farmer_id).await {
                Ok(overview) => {
                    if overview.forms.is_empty() && overview.boundaries.is_empty() {
                        let _ = evt_tx.send(AppEvent::Log(format!("⚠ 农户 {} 没有任何记录", farmer_id)));
                    }
                    let _ = evt_tx.send(AppEvent::Farmer(overview));
                }
                Err(e) => {
                    let _ = evt_tx.send(AppEvent::Error(format!("✗ 农户查询失败: {}", e)));
                }
            },
            AppCommand::Dataset => match linker.build_integrated_dataset().await {
                Ok(records) => {
                    let linked = records
                        .iter()
                        .filter(|r| r.status == LinkStatus::Linked)
                        .count();
                    let _ = evt_tx.send(AppEvent::Log(format!(
                        "✓ 综合数据集: {} 条记录，其中完全关联 {} 条",
                        records.len(),
                        linked
                    )));
                }
                Err(e) => {
                    let _ = evt_tx.send(AppEvent::Error(format!("✗ 数据集生成失败: {}", e)));
                }
            },
            AppCommand::Stats => {
                refresh_stats(&linker, &evt_tx).await;
                report_recent(&db, &evt_tx).await;
            }
            AppCommand::Refresh => {
                refresh_ui(&linker, &evt_tx).await;
                let _ = evt_tx.send(AppEvent::Message("已刷新".to_string()));
            }
            AppCommand::Import { path } => {
                commands::import::run(&path, &db, evt_tx.clone()).await;
                refresh_ui(&linker, &evt_tx).await;
            }
            AppCommand::Export { path } => {
                let linker = linker.clone();
                let tx = evt_tx.clone();
                tokio::spawn(async move {
                    commands::export::run(&path, &linker, tx).await;
                });
            }
            AppCommand::Help => {
                let _ = evt_tx.send(AppEvent::Message(HELP_TEXT.to_string()));
            }
            AppCommand::Quit => {
                info!("quit requested");
                break;
            }
            AppCommand::Unknown(msg) => {
                let _ = evt_tx.send(AppEvent::Error(format!("✗ {}", msg)));
            }
        }
    }
}

/// 最近写入的表单与边界，写到日志区
async fn report_recent(db: &sea_orm::DatabaseConnection, tx: &mpsc::UnboundedSender<AppEvent>) {
    match FormResponseRepository::distinct_farmers(db).await {
        Ok(farmers) => {
            let _ = tx.send(AppEvent::Log(format!("有表单的农户: {} 户", farmers.len())));
        }
        Err(e) => {
            let _ = tx.send(AppEvent::Error(format!("✗ 查询失败: {}", e)));
            return;
        }
    }
    if let Ok(forms) = FormResponseRepository::recent(db, 5).await {
        for f in forms {
            let _ = tx.send(AppEvent::Log(format!(
                "  表单 #{} {} {} [{}]",
                f.id, f.submission_date, f.farmer_id, f.crop_type
            )));
        }
    }
    if let Ok(boundaries) = FieldBoundaryRepository::recent(db, 5).await {
        for b in boundaries {
            let _ = tx.send(AppEvent::Log(format!(
                "  边界 #{} {} {} {} ({})",
                b.id, b.creation_date, b.farmer_id, b.field_name, b.crop_type
            )));
        }
    }
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.handle_event(event);
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key_event(key.code) {
                    return Ok(());
                }
            }
        }
    }
}
