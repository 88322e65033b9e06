//! Logging initialisation
//!
//! Level and output format are fixed once at startup; production gets one
//! JSON object per line for log shippers, development keeps the default
//! human-readable format.

use std::io::Write;

pub struct LogSettings {
    pub level: String,
    pub production: bool,
}

impl LogSettings {
    pub fn init(&self) {
        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.level.as_str()),
        );
        if self.production {
            builder.format(|buf, record| {
                let line = serde_json::json!({
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "level": record.level().to_string(),
                    "target": record.target(),
                    "message": record.args().to_string(),
                });
                writeln!(buf, "{line}")
            });
        }
        builder.init();
    }
}
