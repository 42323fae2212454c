use crate::config::is_memory_url;
use crate::storage::entity::{field_boundary, form_response};
use log::info;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    Schema, Statement,
};
use std::time::Duration;

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let memory = is_memory_url(db_url);

    let mut opt = ConnectOptions::new(db_url.to_owned());
    if memory {
        // 内存库每个连接都是独立的数据库，只能用单连接
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(10)
            .min_connections(2)
            .idle_timeout(Duration::from_secs(8))
            .max_lifetime(Duration::from_secs(8));
    }
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Info);

    let db = Database::connect(opt).await?;

    if !memory {
        // 启用 WAL 模式
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "PRAGMA journal_mode=WAL;".to_string(),
        ))
        .await?;
    }

    // 表已存在（由登记程序创建）时保持原样
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let stmt = builder.build(
        schema
            .create_table_from_entity(form_response::Entity)
            .if_not_exists(),
    );
    db.execute(stmt).await?;

    let stmt = builder.build(
        schema
            .create_table_from_entity(field_boundary::Entity)
            .if_not_exists(),
    );
    db.execute(stmt).await?;

    // 关联查询走 (farmer_id, crop_type)
    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_field_boundaries_farmer_crop ON field_boundaries(farmer_id, crop_type);",
        "CREATE INDEX IF NOT EXISTS idx_form_responses_farmer ON form_responses(farmer_id);",
    ] {
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, sql.to_string()))
            .await?;
    }

    info!(
        "Database connection established ({}) and tables initialized.",
        if memory { "memory" } else { "WAL" }
    );

    Ok(db)
}
