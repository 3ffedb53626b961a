use crate::library::logger::interface::Logger;
use chrono::Utc;
use std::sync::Arc;

/// Writes timestamped lines to stderr so stdout stays free for results.
#[derive(Debug, Clone)]
pub struct LoggerConsole {
    namespace: Option<String>,
    timezone: chrono::FixedOffset,
}

impl LoggerConsole {
    pub fn new(timezone: chrono::FixedOffset) -> Self {
        Self {
            namespace: None,
            timezone,
        }
    }

    fn line(&self, level: &str, message: &str) -> String {
        let local_time = Utc::now().with_timezone(&self.timezone);
        let formatted = local_time.format("%Y-%m-%d %I:%M:%S%.3f %p");
        match &self.namespace {
            Some(namespace) => format!("[{}] {} {}: {}", formatted, level, namespace, message),
            None => format!("[{}] {} {}", formatted, level, message),
        }
    }
}

impl Logger for LoggerConsole {
    fn info(&self, message: &str) {
        eprintln!("{}", self.line("INFO", message));
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", self.line("WARN", message));
    }

    fn with_namespace(&self, namespace: &str) -> Arc<dyn Logger + Send + Sync> {
        let new_namespace = match &self.namespace {
            Some(current) => format!("{}:{}", current, namespace),
            None => namespace.to_string(),
        };

        Arc::new(LoggerConsole {
            namespace: Some(new_namespace),
            timezone: self.timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_nested() {
        let logger = LoggerConsole {
            namespace: Some("cli".to_string()),
            timezone: chrono::FixedOffset::east_opt(0).unwrap(),
        };
        let line = logger.line("INFO", "hello");
        assert!(line.ends_with("INFO cli: hello"));

        let plain = LoggerConsole::new(chrono::FixedOffset::east_opt(0).unwrap());
        assert!(plain.line("WARN", "hi").ends_with("WARN hi"));
    }
}
