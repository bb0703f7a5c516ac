pub mod config;
pub mod error;
pub mod execute;
pub mod remediation;
pub mod report;
pub mod script;
pub mod scripts;

use colored::Colorize;

pub use config::Settings;
pub use error::ReportError;
pub use execute::{ReportOutcome, ReportProgressCallback, execute_report};
pub use report::{ReportFormat, ReportTable};
pub use script::{Column, ReportForm, ReportParams, ReportRegistry, ReportRow, ReportScript};

const BANNER: &str = r#"
   _____ _ _       __          __            _
  / ____(_) |      \ \        / /           | |
 | (___  _| |_ ___  \ \  /\  / /_ _ _ __ __| | ___ _ __
  \___ \| | __/ _ \  \ \/  \/ / _` | '__/ _` |/ _ \ '_ \
  ____) | | ||  __/   \  /\  / (_| | | | (_| |  __/ | | |
 |_____/|_|\__\___|    \/  \/ \__,_|_|  \__,_|\___|_| |_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_blue().bold());
    println!(
        "  {} {}\n",
        "site hierarchy reports & remediation".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
