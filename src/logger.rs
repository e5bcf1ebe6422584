use std::io::Write;

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Фильтр по умолчанию, переопределяется через RUST_LOG
pub const DEFAULT_FILTER: &str = "warn,motiondub=info";

pub fn init_logger() {
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);

    let mut builder = Builder::from_env(env);

    // Явно подавляем логи HTTP клиента
    builder
        .filter_module("hyper", LevelFilter::Error)
        .filter_module("hyper_util", LevelFilter::Error)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("rustls", LevelFilter::Error)
        .filter_module("mio", LevelFilter::Error)
        .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
        .target(env_logger::Target::Stderr);

    // Повторная инициализация (например, из тестов) не ошибка
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
