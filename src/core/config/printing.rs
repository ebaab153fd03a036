use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  base-url: {}", self.base_url());
        println!("  history-exchanges: {}", self.history_exchanges());
        match self.request_timeout() {
            Some(timeout) => println!("  request-timeout: {}s", timeout.as_secs()),
            None => println!("  request-timeout: none"),
        }
        println!("  assistant-name: {}", self.assistant_name());
        match self.data_dir() {
            Some(dir) => println!("  data-dir: {}", path_display(dir)),
            None => println!("  data-dir: (unavailable)"),
        }
    }
}
